//! Scoped mappings of device memory.
//!
//! A lock is taken in the constructor and released when the guard drops, so
//! an early `?` return never leaves a buffer or texture mapped.

use crate::gui::TextureId;

use super::{BufferId, Device, DeviceError};

/// Write access to a region of a device buffer.
pub struct BufferLock<'d, D: Device + ?Sized> {
    device: &'d mut D,
    id: BufferId,
    released: bool,
}

impl<'d, D: Device + ?Sized> BufferLock<'d, D> {
    /// Maps `len` bytes of `id` starting at `offset`.
    pub fn new(device: &'d mut D, id: BufferId, offset: usize, len: usize) -> Result<Self, DeviceError> {
        device.lock_buffer(id, offset, len)?;
        Ok(Self { device, id, released: false })
    }

    /// The mapped region.
    pub fn bytes_mut(&mut self) -> Result<&mut [u8], DeviceError> {
        self.device
            .locked_buffer_mut(self.id)
            .ok_or_else(|| DeviceError::invalid("buffer is not locked"))
    }

    /// Releases the mapping and reports whether the device accepted it.
    pub fn unlock(mut self) -> Result<(), DeviceError> {
        self.released = true;
        self.device.unlock_buffer(self.id)
    }
}

impl<D: Device + ?Sized> Drop for BufferLock<'_, D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.device.unlock_buffer(self.id) {
            log::warn!("unlocking buffer {:?} failed: {e}", self.id);
        }
    }
}

/// Write access to a whole texture surface.
pub struct TextureLock<'d, D: Device + ?Sized> {
    device: &'d mut D,
    id: TextureId,
    pitch: usize,
    released: bool,
}

impl<'d, D: Device + ?Sized> TextureLock<'d, D> {
    pub fn new(device: &'d mut D, id: TextureId) -> Result<Self, DeviceError> {
        let pitch = device.lock_texture(id)?;
        Ok(Self { device, id, pitch, released: false })
    }

    /// Bytes between the starts of consecutive rows in the mapping.
    #[inline]
    pub fn pitch(&self) -> usize {
        self.pitch
    }

    pub fn bytes_mut(&mut self) -> Result<&mut [u8], DeviceError> {
        self.device
            .locked_texture_mut(self.id)
            .ok_or_else(|| DeviceError::invalid("texture is not locked"))
    }

    pub fn unlock(mut self) -> Result<(), DeviceError> {
        self.released = true;
        self.device.unlock_texture(self.id)
    }
}

impl<D: Device + ?Sized> Drop for TextureLock<'_, D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.device.unlock_texture(self.id) {
            log::warn!("unlocking texture {:?} failed: {e}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{HeadlessDevice, IndexFormat, TextureFormat};

    #[test]
    fn dropped_buffer_lock_unmaps() {
        let mut dev = HeadlessDevice::new();
        let id = dev.create_index_buffer(16, IndexFormat::U16).unwrap();

        {
            let mut lock = BufferLock::new(&mut dev, id, 0, 16).unwrap();
            lock.bytes_mut().unwrap()[0] = 7;
        }

        assert!(!dev.is_buffer_locked(id));
        assert_eq!(dev.buffer_bytes(id).unwrap()[0], 7);
    }

    #[test]
    fn early_return_still_unmaps() {
        fn fill(dev: &mut HeadlessDevice, id: TextureId) -> Result<(), DeviceError> {
            let mut lock = TextureLock::new(dev, id)?;
            lock.bytes_mut()?.fill(1);
            Err(DeviceError::invalid("bail out"))
        }

        let mut dev = HeadlessDevice::new();
        let id = dev.create_texture(2, 2, TextureFormat::Rgba8).unwrap();
        assert!(fill(&mut dev, id).is_err());
        assert!(!dev.is_texture_locked(id));
    }

    #[test]
    fn explicit_unlock_reports_once() {
        let mut dev = HeadlessDevice::new();
        let id = dev.create_texture(2, 2, TextureFormat::Rgba8).unwrap();
        let lock = TextureLock::new(&mut dev, id).unwrap();
        assert!(lock.unlock().is_ok());
        assert!(!dev.is_texture_locked(id));
    }
}
