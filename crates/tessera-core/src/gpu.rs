//! Contracts for the GPU abstraction
//!
//! The pipeline never talks to a concrete graphics API. Everything it
//! needs — buffers, textures, command buffers, blit passes — arrives
//! through the traits below, so backends can be swapped without touching
//! the atlas or decode logic. The reference software implementation lives
//! in `tessera-gpu-none`.

use std::any::Any;
use std::sync::Arc;

use crate::bitmap::{HostStorage, TextureMapping};
use crate::geometry::ISize;
use crate::pixel::PixelFormat;

/// Where a resource's memory lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// CPU-writable memory the GPU can also read.
    HostVisible,
    /// GPU-only memory; filled through blit passes.
    DevicePrivate,
}

/// Whether the backend may compress texture storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompressionType {
    None,
    Lossy,
}

/// Description of a device buffer to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    pub storage_mode: StorageMode,
    pub size: usize,
}

/// Description of a texture to allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub storage_mode: StorageMode,
    pub format: PixelFormat,
    pub size: ISize,
    pub mip_count: u32,
    pub compression: CompressionType,
}

impl TextureDescriptor {
    /// A single-mip, uncompressed descriptor.
    pub fn new(storage_mode: StorageMode, format: PixelFormat, size: ISize) -> Self {
        Self {
            storage_mode,
            format,
            size,
            mip_count: 1,
            compression: CompressionType::None,
        }
    }

    pub fn bytes_per_row(&self) -> usize {
        self.size.width as usize * self.format.bytes_per_pixel()
    }

    pub fn byte_size_of_base_mip(&self) -> usize {
        self.bytes_per_row() * self.size.height as usize
    }

    pub fn is_valid(&self) -> bool {
        !self.size.is_empty() && self.mip_count >= 1
    }
}

/// A range of a device buffer handed to a blit copy.
#[derive(Clone)]
pub struct BufferView {
    pub buffer: Arc<dyn DeviceBuffer>,
    pub offset: usize,
    pub length: usize,
}

impl BufferView {
    /// A view covering the entire buffer.
    pub fn whole(buffer: Arc<dyn DeviceBuffer>) -> Self {
        let length = buffer.length();
        Self {
            buffer,
            offset: 0,
            length,
        }
    }
}

/// Capability queries that steer upload strategy.
pub trait Capabilities: Send + Sync {
    /// Whether a texture can sample the same memory as a host-visible
    /// buffer. This is the sole switch between the zero-copy texture view
    /// and an explicit `set_contents` copy.
    fn supports_shared_device_buffer_texture_memory(&self) -> bool;

    /// Whether buffer-to-texture blit copies are available, enabling the
    /// device-private upload path.
    fn supports_buffer_to_texture_blits(&self) -> bool;
}

/// Allocates device buffers and textures.
pub trait Allocator: Send + Sync {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Option<Arc<dyn DeviceBuffer>>;

    fn create_texture(&self, descriptor: &TextureDescriptor) -> Option<Arc<dyn Texture>>;

    /// Minimum row stride for linear textures of the given format.
    fn min_bytes_per_row(&self, format: PixelFormat) -> usize;

    fn max_texture_size(&self) -> ISize;
}

/// A reference-counted device buffer.
///
/// Host-visible buffers expose their backing storage so bitmaps can alias
/// it; device-private buffers return `None` from [`host_storage`].
///
/// [`host_storage`]: DeviceBuffer::host_storage
pub trait DeviceBuffer: Send + Sync {
    fn length(&self) -> usize;

    fn host_storage(&self) -> Option<HostStorage>;

    /// Reinterpret this buffer as a linear texture without copying.
    ///
    /// Only meaningful on platforms reporting
    /// [`Capabilities::supports_shared_device_buffer_texture_memory`].
    fn as_texture(
        &self,
        descriptor: &TextureDescriptor,
        row_bytes: usize,
    ) -> Option<Arc<dyn Texture>>;
}

/// A reference-counted texture.
pub trait Texture: Send + Sync {
    fn descriptor(&self) -> TextureDescriptor;

    /// Copy the mapped pixels into the base mip level.
    ///
    /// The texture retains `mapping` until the GPU has consumed the
    /// pixels; dropping the mapping is the release point for the host
    /// allocation backing it.
    fn set_contents(&self, mapping: TextureMapping) -> bool;

    fn set_label(&self, label: &str);

    fn is_valid(&self) -> bool;

    /// Concrete access for backends that know their own texture type.
    fn as_any(&self) -> &dyn Any;
}

/// The GPU device handle the pipeline runs against.
pub trait GpuContext: Send + Sync {
    fn resource_allocator(&self) -> Arc<dyn Allocator>;

    fn capabilities(&self) -> Arc<dyn Capabilities>;

    fn create_command_buffer(&self) -> Option<Arc<dyn CommandBuffer>>;
}

/// A single-use command buffer.
///
/// Owned by the thread that created it; must be submitted or dropped
/// before it goes out of scope.
pub trait CommandBuffer: Send + Sync {
    fn set_label(&self, label: &str);

    fn create_blit_pass(&self) -> Option<Box<dyn BlitPass>>;

    fn submit(&self) -> bool;

    /// Block until the submitted work is scheduled (not completed).
    fn wait_until_scheduled(&self);
}

/// A pass restricted to copies and mip generation.
pub trait BlitPass {
    fn set_label(&mut self, label: &str);

    fn add_copy(&mut self, view: BufferView, texture: Arc<dyn Texture>);

    fn generate_mipmap(&mut self, texture: Arc<dyn Texture>);

    /// Finish recording into the parent command buffer.
    fn encode(&mut self, allocator: &dyn Allocator) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_byte_sizes() {
        let desc = TextureDescriptor::new(
            StorageMode::HostVisible,
            PixelFormat::A8Unorm,
            ISize::new(256, 128),
        );
        assert_eq!(desc.bytes_per_row(), 256);
        assert_eq!(desc.byte_size_of_base_mip(), 256 * 128);

        let rgba = TextureDescriptor::new(
            StorageMode::DevicePrivate,
            PixelFormat::R8G8B8A8Unorm,
            ISize::new(64, 64),
        );
        assert_eq!(rgba.bytes_per_row(), 256);
        assert_eq!(rgba.byte_size_of_base_mip(), 256 * 64);
    }

    #[test]
    fn empty_descriptor_is_invalid() {
        let desc = TextureDescriptor::new(
            StorageMode::HostVisible,
            PixelFormat::A8Unorm,
            ISize::new(0, 0),
        );
        assert!(!desc.is_valid());
    }
}
