/// Opaque texture handle shared between the GUI library and the device.
///
/// The device hands these out when it creates a texture; the GUI library only
/// stores them (font atlas, draw commands) and passes them back unchanged.
/// `0` is reserved as the null handle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct TextureId(usize);

impl TextureId {
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn null() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn id(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == 0
    }
}

impl From<usize> for TextureId {
    #[inline]
    fn from(id: usize) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_zero() {
        assert!(TextureId::null().is_null());
        assert_eq!(TextureId::default(), TextureId::null());
        assert!(!TextureId::new(7).is_null());
    }

    #[test]
    fn pointer_sized() {
        assert_eq!(std::mem::size_of::<TextureId>(), std::mem::size_of::<usize>());
    }
}
