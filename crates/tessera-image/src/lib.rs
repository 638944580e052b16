//! Tessera Image: descriptors in, textures out
//!
//! The decode half of the pipeline. A caller hands an
//! [`ImageDescriptor`](descriptor::ImageDescriptor) to the
//! [`ImageDecodeService`](service::ImageDecodeService); the concurrent
//! pool decompresses and resamples it into a buffer-backed host bitmap,
//! the IO runner uploads that into a texture, and the UI runner receives
//! the finished [`Image`](service::Image) — or `None`, exactly once,
//! when anything along the way fails.

pub mod decoder;
pub mod descriptor;
pub mod error;
pub mod service;

pub use decoder::{decompress, DecompressResult};
pub use descriptor::{DecodeOptions, ImageDescriptor, Pixmap};
pub use error::DecodeError;
pub use service::{Image, ImageDecodeService, ImageResult, TaskRunner, TaskRunners};
