//! Host bitmaps backed by device buffers
//!
//! A [`HostBitmap`] never owns its pixels outright: the storage belongs to
//! a host-visible [`DeviceBuffer`](crate::gpu::DeviceBuffer), and the
//! bitmap keeps that buffer alive. On platforms with shared device-buffer/
//! texture memory the same allocation later becomes the texture, so
//! rasterizing into the bitmap is already the upload.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::AllocationError;
use crate::geometry::ISize;
use crate::gpu::{Allocator, BufferDescriptor, DeviceBuffer, StorageMode};
use crate::pixel::ImageInfo;

/// Shared host-visible storage, aliased by a bitmap and its device buffer.
///
/// Joint ownership through the `Arc` makes release atomic: neither side
/// can dangle while the other is alive.
pub type HostStorage = Arc<RwLock<Box<[u8]>>>;

/// Allocate zeroed host storage of the given byte length.
pub fn new_host_storage(length: usize) -> HostStorage {
    Arc::new(RwLock::new(vec![0u8; length].into_boxed_slice()))
}

/// A CPU-writable bitmap whose pixels live in a device buffer.
#[derive(Clone)]
pub struct HostBitmap {
    info: ImageInfo,
    row_bytes: usize,
    storage: HostStorage,
    buffer: Arc<dyn DeviceBuffer>,
    immutable: Arc<AtomicBool>,
}

impl HostBitmap {
    /// Allocate a bitmap backed by a fresh host-visible device buffer.
    ///
    /// The buffer is sized exactly for the pixel grid: full strides for
    /// every row but the last, which only needs its pixels.
    pub fn allocate(allocator: &dyn Allocator, info: ImageInfo) -> Result<Self, AllocationError> {
        if !info.is_valid() {
            return Err(AllocationError::InvalidDimensions);
        }
        let row_bytes = info.min_row_bytes();
        let size = (info.size.height as usize - 1) * row_bytes
            + info.size.width as usize * info.bytes_per_pixel();
        let buffer = allocator
            .create_buffer(&BufferDescriptor {
                storage_mode: StorageMode::HostVisible,
                size,
            })
            .ok_or(AllocationError::DeviceBuffer { size })?;
        let storage = buffer
            .host_storage()
            .ok_or(AllocationError::NotHostVisible)?;
        Ok(Self {
            info,
            row_bytes,
            storage,
            buffer,
            immutable: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn info(&self) -> &ImageInfo {
        &self.info
    }

    pub fn size(&self) -> ISize {
        self.info.size
    }

    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// The device buffer aliasing this bitmap's pixels.
    pub fn device_buffer(&self) -> Arc<dyn DeviceBuffer> {
        self.buffer.clone()
    }

    /// Read access to the raw pixels.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.storage.read())
    }

    /// Write access to the raw pixels. Fails once the bitmap has been
    /// marked immutable.
    pub fn write<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> Result<R, AllocationError> {
        if self.is_immutable() {
            return Err(AllocationError::Immutable);
        }
        Ok(f(&mut self.storage.write()))
    }

    /// Freeze the pixels; further [`write`](Self::write) calls fail.
    pub fn make_immutable(&self) {
        self.immutable.store(true, Ordering::Release);
    }

    pub fn is_immutable(&self) -> bool {
        self.immutable.load(Ordering::Acquire)
    }

    /// A non-owned view over the pixels for `Texture::set_contents`.
    pub fn mapping(&self) -> TextureMapping {
        TextureMapping::new(self.storage.clone(), self.storage.read().len())
    }
}

impl fmt::Debug for HostBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBitmap")
            .field("info", &self.info)
            .field("row_bytes", &self.row_bytes)
            .field("immutable", &self.is_immutable())
            .finish_non_exhaustive()
    }
}

/// A non-owned pixel view that keeps its storage alive.
///
/// Handed to [`Texture::set_contents`](crate::gpu::Texture::set_contents);
/// the texture holds the mapping until the GPU has consumed the pixels,
/// so dropping the last mapping clone is the release point for the host
/// allocation.
#[derive(Clone)]
pub struct TextureMapping {
    storage: HostStorage,
    length: usize,
}

impl TextureMapping {
    pub fn new(storage: HostStorage, length: usize) -> Self {
        Self { storage, length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Read the mapped bytes.
    pub fn read<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        let guard = self.storage.read();
        let end = self.length.min(guard.len());
        f(&guard[..end])
    }
}

impl fmt::Debug for TextureMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureMapping")
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::{AlphaType, ColorType};

    #[test]
    fn storage_is_zeroed() {
        let storage = new_host_storage(16);
        assert!(storage.read().iter().all(|&b| b == 0));
    }

    #[test]
    fn mapping_keeps_storage_alive() {
        let storage = new_host_storage(8);
        let mapping = TextureMapping::new(storage.clone(), 8);
        drop(storage);
        mapping.read(|bytes| assert_eq!(bytes.len(), 8));
    }

    #[test]
    fn invalid_info_is_rejected_before_allocation() {
        struct NoAllocator;
        impl Allocator for NoAllocator {
            fn create_buffer(
                &self,
                _descriptor: &BufferDescriptor,
            ) -> Option<Arc<dyn DeviceBuffer>> {
                panic!("should not be reached");
            }
            fn create_texture(
                &self,
                _descriptor: &crate::gpu::TextureDescriptor,
            ) -> Option<Arc<dyn crate::gpu::Texture>> {
                None
            }
            fn min_bytes_per_row(&self, _format: crate::pixel::PixelFormat) -> usize {
                1
            }
            fn max_texture_size(&self) -> ISize {
                ISize::new(4096, 4096)
            }
        }

        let info = ImageInfo::new(ISize::new(0, 4), ColorType::Alpha8, AlphaType::Opaque);
        assert!(matches!(
            HostBitmap::allocate(&NoAllocator, info),
            Err(AllocationError::InvalidDimensions)
        ));
    }
}
