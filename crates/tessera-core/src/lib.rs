//! Tessera Core: the ground the pipeline stands on
//!
//! Geometry, pixel formats, the GPU contracts, host bitmaps that alias
//! device buffers, and the texture upload paths. The atlas builder
//! (`tessera-atlas`) and the image decoder (`tessera-image`) both build
//! on this crate; concrete GPU and font backends plug in through the
//! traits in [`gpu`].
//!
//! ## The shape of things
//!
//! - [`geometry`] - integer and float sizes, points and rectangles
//! - [`pixel`] - pixel formats, color types and gamut classification
//! - [`gpu`] - the contracts a graphics backend implements
//! - [`bitmap`] - host-visible bitmaps jointly owned with device buffers
//! - [`upload`] - blit-pass and `set_contents` texture upload
//! - [`error`] - the allocation and upload error taxonomy

pub mod bitmap;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod pixel;
pub mod upload;

pub use bitmap::{HostBitmap, HostStorage, TextureMapping};
pub use error::{AllocationError, UploadError};
pub use geometry::{IPoint, IRect, ISize, Point, Rect, Size};
pub use gpu::{
    Allocator, BlitPass, BufferDescriptor, BufferView, Capabilities, CommandBuffer,
    CompressionType, DeviceBuffer, GpuContext, StorageMode, Texture, TextureDescriptor,
};
pub use pixel::{AlphaType, ColorSpace, ColorType, ImageInfo, PixelFormat};
