use crate::config::BackendConfig;
use crate::device::{BufferId, BufferLock, Device, DeviceError, IndexFormat, VertexLayout};
use crate::error::{BufferKind, RenderError};
use crate::gui::{DrawData, DrawIdx};

use super::vertex::{self, ColorOrder, DEVICE_VERTEX_SIZE};

const INDEX_SIZE: usize = std::mem::size_of::<DrawIdx>();

/// Owns the device vertex and index buffers the UI is drawn from.
///
/// Buffers grow to `required + slack` when a frame overflows them and never
/// shrink. Capacities are counted in elements, not bytes.
#[derive(Debug)]
pub struct BufferManager {
    vertex: Option<BufferId>,
    index: Option<BufferId>,
    vertex_capacity: usize,
    index_capacity: usize,
    vertex_slack: usize,
    index_slack: usize,
}

impl BufferManager {
    pub fn new(config: &BackendConfig) -> Self {
        Self {
            vertex: None,
            index: None,
            vertex_capacity: config.initial_vertex_capacity,
            index_capacity: config.initial_index_capacity,
            vertex_slack: config.vertex_slack,
            index_slack: config.index_slack,
        }
    }

    #[inline]
    pub fn vertex_buffer(&self) -> Option<BufferId> {
        self.vertex
    }

    #[inline]
    pub fn index_buffer(&self) -> Option<BufferId> {
        self.index
    }

    /// Vertex capacity of the current (or next) vertex buffer.
    #[inline]
    pub fn vertex_capacity(&self) -> usize {
        self.vertex_capacity
    }

    #[inline]
    pub fn index_capacity(&self) -> usize {
        self.index_capacity
    }

    /// Makes sure both buffers exist and hold at least the given counts.
    ///
    /// An undersized buffer is released before its replacement is created;
    /// if creation fails the slot stays empty and the next call retries.
    pub fn ensure_capacity<D: Device + ?Sized>(
        &mut self,
        device: &mut D,
        vertices: usize,
        indices: usize,
    ) -> Result<(), RenderError> {
        if self.vertex.is_none() || self.vertex_capacity < vertices {
            if let Some(old) = self.vertex.take() {
                device.release_buffer(old);
            }
            let capacity = self.vertex_capacity.max(vertices + self.vertex_slack);
            let id = device
                .create_vertex_buffer(capacity * DEVICE_VERTEX_SIZE, VertexLayout::PositionColorTex)
                .map_err(|e| {
                    RenderError::from_device(e, |source| RenderError::Allocation {
                        resource: BufferKind::Vertex,
                        source,
                    })
                })?;
            log::debug!("vertex buffer allocated: {capacity} vertices");
            self.vertex = Some(id);
            self.vertex_capacity = capacity;
        }

        if self.index.is_none() || self.index_capacity < indices {
            if let Some(old) = self.index.take() {
                device.release_buffer(old);
            }
            let capacity = self.index_capacity.max(indices + self.index_slack);
            let id = device
                .create_index_buffer(capacity * INDEX_SIZE, IndexFormat::for_width(INDEX_SIZE))
                .map_err(|e| {
                    RenderError::from_device(e, |source| RenderError::Allocation {
                        resource: BufferKind::Index,
                        source,
                    })
                })?;
            log::debug!("index buffer allocated: {capacity} indices");
            self.index = Some(id);
            self.index_capacity = capacity;
        }

        Ok(())
    }

    /// Translates every list's vertices and copies its indices, back to back,
    /// into the buffers. [`ensure_capacity`](Self::ensure_capacity) must have
    /// succeeded for `data` first.
    pub fn upload<D: Device + ?Sized>(
        &self,
        device: &mut D,
        data: &DrawData,
        order: ColorOrder,
    ) -> Result<(), RenderError> {
        let missing = |resource| RenderError::BufferLock {
            resource,
            source: DeviceError::UnknownResource,
        };
        let vb = self.vertex.ok_or_else(|| missing(BufferKind::Vertex))?;
        let ib = self.index.ok_or_else(|| missing(BufferKind::Index))?;

        let vtx_bytes = data.total_vtx_count() * DEVICE_VERTEX_SIZE;
        if vtx_bytes > 0 {
            let lock_err = |e| {
                RenderError::from_device(e, |source| RenderError::BufferLock {
                    resource: BufferKind::Vertex,
                    source,
                })
            };
            let mut lock = BufferLock::new(device, vb, 0, vtx_bytes).map_err(lock_err)?;
            let dst = lock.bytes_mut().map_err(lock_err)?;
            let mut at = 0;
            for list in &data.lists {
                at += vertex::write_vertices(&mut dst[at..], &list.vtx_buffer, order);
            }
            lock.unlock().map_err(lock_err)?;
        }

        let idx_bytes = data.total_idx_count() * INDEX_SIZE;
        if idx_bytes > 0 {
            let lock_err = |e| {
                RenderError::from_device(e, |source| RenderError::BufferLock {
                    resource: BufferKind::Index,
                    source,
                })
            };
            let mut lock = BufferLock::new(device, ib, 0, idx_bytes).map_err(lock_err)?;
            let dst = lock.bytes_mut().map_err(lock_err)?;
            let mut at = 0;
            for list in &data.lists {
                at += vertex::write_indices(&mut dst[at..], &list.idx_buffer);
            }
            lock.unlock().map_err(lock_err)?;
        }

        Ok(())
    }

    /// Releases both buffers. Tracked capacities are kept so a recreated
    /// buffer is at least as large as the one released.
    pub fn release<D: Device + ?Sized>(&mut self, device: &mut D) {
        if let Some(vb) = self.vertex.take() {
            device.release_buffer(vb);
        }
        if let Some(ib) = self.index.take() {
            device.release_buffer(ib);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::HeadlessDevice;
    use crate::gui::{ClipRect, DrawCmd, DrawList, DrawVert};

    fn manager() -> BufferManager {
        BufferManager::new(&BackendConfig::default())
    }

    #[test]
    fn first_allocation_adds_slack() {
        let mut dev = HeadlessDevice::new();
        let mut bufs = manager();
        bufs.ensure_capacity(&mut dev, 100, 300).unwrap();

        assert_eq!(bufs.vertex_capacity(), 5100);
        assert_eq!(bufs.index_capacity(), 10300);
        let vb = bufs.vertex_buffer().unwrap();
        assert_eq!(dev.buffer_bytes(vb).unwrap().len(), 5100 * DEVICE_VERTEX_SIZE);
        let ib = bufs.index_buffer().unwrap();
        assert_eq!(dev.buffer_index_format(ib), Some(IndexFormat::U16));
    }

    #[test]
    fn capacity_never_shrinks() {
        let mut dev = HeadlessDevice::new();
        let mut bufs = manager();
        bufs.ensure_capacity(&mut dev, 20_000, 40_000).unwrap();
        let (v, i) = (bufs.vertex_capacity(), bufs.index_capacity());

        bufs.ensure_capacity(&mut dev, 10, 10).unwrap();

        assert!(bufs.vertex_capacity() >= 20_000);
        assert_eq!((bufs.vertex_capacity(), bufs.index_capacity()), (v, i));
        assert_eq!(dev.buffers_created(), 2);
    }

    #[test]
    fn growth_replaces_the_old_buffer() {
        let mut dev = HeadlessDevice::new();
        let mut bufs = manager();
        bufs.ensure_capacity(&mut dev, 10, 10).unwrap();
        let old = bufs.vertex_buffer().unwrap();

        bufs.ensure_capacity(&mut dev, 6000, 10).unwrap();

        assert_ne!(bufs.vertex_buffer(), Some(old));
        assert!(dev.buffer_bytes(old).is_none());
        assert_eq!(bufs.vertex_capacity(), 11_000);
        assert_eq!(dev.live_buffers(), 2);
    }

    #[test]
    fn refused_allocation_leaves_slot_empty_and_retries() {
        let mut dev = HeadlessDevice::new();
        let mut bufs = manager();
        dev.faults_mut().refuse_buffer_creation = true;

        let err = bufs.ensure_capacity(&mut dev, 10, 10).unwrap_err();
        assert!(matches!(err, RenderError::Allocation { resource: BufferKind::Vertex, .. }));
        assert_eq!(bufs.vertex_buffer(), None);
        assert_eq!(dev.live_buffers(), 0);

        dev.faults_mut().refuse_buffer_creation = false;
        bufs.ensure_capacity(&mut dev, 10, 10).unwrap();
        assert_eq!(dev.live_buffers(), 2);
    }

    #[test]
    fn upload_concatenates_lists() {
        let mut dev = HeadlessDevice::new();
        let mut bufs = manager();
        let list = |x: f32| DrawList {
            vtx_buffer: vec![DrawVert::new([x, 0.0], [0.0, 0.0], 0xFF00_0000); 3],
            idx_buffer: vec![0, 1, 2],
            cmd_buffer: vec![DrawCmd::elements(3, ClipRect::default(), None)],
        };
        let data = DrawData::new(vec![list(1.0), list(2.0)]);

        bufs.ensure_capacity(&mut dev, 6, 6).unwrap();
        bufs.upload(&mut dev, &data, ColorOrder::Argb).unwrap();

        let vb = dev.buffer_bytes(bufs.vertex_buffer().unwrap()).unwrap();
        let fourth: vertex::DeviceVertex =
            bytemuck::pod_read_unaligned(&vb[3 * DEVICE_VERTEX_SIZE..4 * DEVICE_VERTEX_SIZE]);
        assert_eq!(fourth.pos[0], 2.0);

        let ib = dev.buffer_bytes(bufs.index_buffer().unwrap()).unwrap();
        assert_eq!(&ib[..12], bytemuck::cast_slice::<DrawIdx, u8>(&[0, 1, 2, 0, 1, 2]));
        assert!(!dev.is_buffer_locked(bufs.vertex_buffer().unwrap()));
    }

    #[test]
    fn release_keeps_capacity() {
        let mut dev = HeadlessDevice::new();
        let mut bufs = manager();
        bufs.ensure_capacity(&mut dev, 8000, 10).unwrap();
        bufs.release(&mut dev);

        assert_eq!(dev.live_buffers(), 0);
        assert_eq!(bufs.vertex_capacity(), 13_000);
    }
}
