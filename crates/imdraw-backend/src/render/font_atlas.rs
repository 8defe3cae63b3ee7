use crate::device::{Device, DeviceError, TextureFormat, TextureLock};
use crate::error::RenderError;
use crate::gui::{FontAtlas, TextureId};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum AtlasState {
    Uninitialized,
    Ready(TextureId),
}

/// Lifecycle of the font atlas texture.
///
/// `Uninitialized --build--> Ready --invalidate--> Uninitialized`. A failed
/// build leaves the manager uninitialized and nothing allocated.
#[derive(Debug)]
pub struct FontAtlasManager {
    state: AtlasState,
}

impl Default for FontAtlasManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FontAtlasManager {
    pub const fn new() -> Self {
        Self {
            state: AtlasState::Uninitialized,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self.state, AtlasState::Ready(_))
    }

    #[inline]
    pub fn texture(&self) -> Option<TextureId> {
        match self.state {
            AtlasState::Ready(id) => Some(id),
            AtlasState::Uninitialized => None,
        }
    }

    /// Uploads the atlas bitmap into a new texture and publishes its handle
    /// through [`FontAtlas::set_tex_id`]. Does nothing when already ready.
    pub fn build<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        fonts: &mut dyn FontAtlas,
    ) -> Result<TextureId, RenderError> {
        if let AtlasState::Ready(id) = self.state {
            return Ok(id);
        }

        let id = upload(device, fonts)?;
        fonts.set_tex_id(Some(id));
        self.state = AtlasState::Ready(id);
        Ok(id)
    }

    /// Releases the texture and clears the published handle.
    pub fn invalidate<D: Device + ?Sized>(&mut self, device: &mut D, fonts: &mut dyn FontAtlas) {
        if let AtlasState::Ready(id) = self.state {
            device.release_texture(id);
            log::debug!("font atlas texture {:?} released", id);
        }
        fonts.set_tex_id(None);
        self.state = AtlasState::Uninitialized;
    }
}

fn upload<D: Device + ?Sized>(device: &mut D, fonts: &mut dyn FontAtlas) -> Result<TextureId, RenderError> {
    let pixels = fonts.tex_data_as_rgba32();
    let (width, height) = (pixels.width, pixels.height);
    let stride = pixels.stride();
    check_bitmap(pixels.pixels.len(), pixels.bytes_per_pixel, stride, height)
        .map_err(RenderError::TextureCreate)?;

    let id = device
        .create_texture(width, height, TextureFormat::Rgba8)
        .map_err(|e| RenderError::from_device(e, RenderError::TextureCreate))?;

    let copied = copy_rows(device, id, pixels.pixels, stride, height as usize);
    if let Err(e) = copied {
        device.release_texture(id);
        return Err(RenderError::from_device(e, RenderError::TextureLock));
    }

    log::info!("font atlas uploaded: {width}x{height} as texture {:?}", id);
    Ok(id)
}

fn check_bitmap(len: usize, bytes_per_pixel: u32, stride: usize, height: u32) -> Result<(), DeviceError> {
    let expected = TextureFormat::Rgba8.bytes_per_pixel();
    if bytes_per_pixel as usize != expected {
        return Err(DeviceError::invalid(format!(
            "atlas has {bytes_per_pixel} bytes per pixel, texture needs {expected}"
        )));
    }
    if stride == 0 || height == 0 {
        return Err(DeviceError::invalid("empty atlas bitmap"));
    }
    let needed = stride * height as usize;
    if len < needed {
        return Err(DeviceError::invalid(format!("atlas bitmap holds {len} of {needed} bytes")));
    }
    Ok(())
}

/// Copies tightly packed rows into the mapped texture, honouring its pitch.
fn copy_rows<D: Device + ?Sized>(
    device: &mut D,
    id: TextureId,
    src: &[u8],
    stride: usize,
    rows: usize,
) -> Result<(), DeviceError> {
    let mut lock = TextureLock::new(device, id)?;
    let pitch = lock.pitch();
    if pitch < stride {
        return Err(DeviceError::invalid(format!("pitch {pitch} below row size {stride}")));
    }

    let dst = lock.bytes_mut()?;
    if rows > 0 && dst.len() < (rows - 1) * pitch + stride {
        return Err(DeviceError::invalid("mapped texture smaller than the atlas"));
    }
    for (y, row) in src.chunks_exact(stride).take(rows).enumerate() {
        dst[y * pitch..y * pitch + stride].copy_from_slice(row);
    }

    lock.unlock()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use crate::gui::{AtlasPixels, FontdueAtlas};

    /// 3×2 atlas with a distinct value in every byte.
    struct Checker {
        pixels: Vec<u8>,
        width: u32,
        height: u32,
        bytes_per_pixel: u32,
        tex_id: Option<TextureId>,
    }

    impl Checker {
        fn new() -> Self {
            Self::sized((0..24).collect(), 3, 2, 4)
        }

        fn sized(pixels: Vec<u8>, width: u32, height: u32, bytes_per_pixel: u32) -> Self {
            Self {
                pixels,
                width,
                height,
                bytes_per_pixel,
                tex_id: None,
            }
        }
    }

    impl FontAtlas for Checker {
        fn tex_data_as_rgba32(&mut self) -> AtlasPixels<'_> {
            AtlasPixels {
                pixels: &self.pixels,
                width: self.width,
                height: self.height,
                bytes_per_pixel: self.bytes_per_pixel,
            }
        }

        fn tex_id(&self) -> Option<TextureId> {
            self.tex_id
        }

        fn set_tex_id(&mut self, id: Option<TextureId>) {
            self.tex_id = id;
        }
    }

    #[test]
    fn rows_land_at_pitch_offsets() {
        let mut dev = HeadlessDevice::new().with_row_alignment(16);
        let mut fonts = Checker::new();
        let mut atlas = FontAtlasManager::new();

        let id = atlas.build(&mut dev, &mut fonts).unwrap();

        assert_eq!(dev.texture_pitch(id), Some(16));
        let bytes = dev.texture_bytes(id).unwrap();
        assert_eq!(&bytes[0..12], &fonts.pixels[0..12]);
        assert_eq!(&bytes[12..16], &[0; 4]);
        assert_eq!(&bytes[16..28], &fonts.pixels[12..24]);
        assert!(!dev.is_texture_locked(id));
    }

    fn assert_rejected(mut fonts: Checker) {
        let mut dev = HeadlessDevice::new();
        let mut atlas = FontAtlasManager::new();

        let err = atlas.build(&mut dev, &mut fonts).unwrap_err();
        assert!(matches!(err, RenderError::TextureCreate(DeviceError::InvalidCall(_))));
        assert!(!atlas.is_ready());
        assert_eq!(fonts.tex_id(), None);
        assert_eq!(dev.live_textures(), 0);
    }

    #[test]
    fn short_bitmap_is_rejected() {
        assert_rejected(Checker::sized(vec![0xff; 16], 4, 4, 4));
    }

    #[test]
    fn non_rgba_bitmap_is_rejected() {
        assert_rejected(Checker::sized(vec![0xff; 48], 4, 4, 3));
    }

    #[test]
    fn zero_width_bitmap_is_rejected() {
        assert_rejected(Checker::sized(Vec::new(), 0, 4, 4));
    }

    #[test]
    fn handle_is_published_and_cleared() {
        let mut dev = HeadlessDevice::new();
        let mut fonts = FontdueAtlas::white_only();
        let mut atlas = FontAtlasManager::new();

        let id = atlas.build(&mut dev, &mut fonts).unwrap();
        assert_eq!(fonts.tex_id(), Some(id));
        assert!(!id.is_null());

        atlas.invalidate(&mut dev, &mut fonts);
        assert_eq!(fonts.tex_id(), None);
        assert_eq!(atlas.texture(), None);
        assert_eq!(dev.live_textures(), 0);

        let again = atlas.build(&mut dev, &mut fonts).unwrap();
        assert_eq!(fonts.tex_id(), Some(again));
        assert!(!again.is_null());
    }

    #[test]
    fn refused_creation_stays_uninitialized() {
        let mut dev = HeadlessDevice::new();
        dev.faults_mut().refuse_texture_creation = true;
        let mut fonts = Checker::new();
        let mut atlas = FontAtlasManager::new();

        assert!(matches!(atlas.build(&mut dev, &mut fonts), Err(RenderError::TextureCreate(_))));
        assert!(!atlas.is_ready());
        assert_eq!(fonts.tex_id(), None);
    }

    #[test]
    fn refused_lock_releases_the_texture() {
        let mut dev = HeadlessDevice::new();
        dev.faults_mut().refuse_texture_lock = true;
        let mut fonts = Checker::new();
        let mut atlas = FontAtlasManager::new();

        assert!(matches!(atlas.build(&mut dev, &mut fonts), Err(RenderError::TextureLock(_))));
        assert!(!atlas.is_ready());
        assert_eq!(dev.live_textures(), 0);
        assert_eq!(fonts.tex_id(), None);
    }

    #[test]
    fn build_when_ready_reuses_texture() {
        let mut dev = HeadlessDevice::new();
        let mut fonts = Checker::new();
        let mut atlas = FontAtlasManager::new();

        let first = atlas.build(&mut dev, &mut fonts).unwrap();
        let second = atlas.build(&mut dev, &mut fonts).unwrap();
        assert_eq!(first, second);
        assert_eq!(dev.live_textures(), 1);
    }
}
