//! Tessera: glyph atlases and decoded images for a GPU 2D renderer
//!
//! Text and images take different roads to the same place — a texture
//! the renderer can sample. The atlas side dedupes a frame's glyphs,
//! packs them, rasterizes through a pluggable font backend, and reuses
//! or rebuilds the atlas across frames. The image side decompresses a
//! descriptor on a worker pool, resamples it to the requested size, and
//! uploads it from the IO thread, delivering the result to the UI thread
//! exactly once.
//!
//! ## Crates
//!
//! - `tessera-core` - geometry, pixel formats, GPU contracts, host
//!   bitmaps, texture upload
//! - `tessera-atlas` - the glyph atlas builder
//! - `tessera-image` - the image decode service
//! - `tessera-zeno` (backend) - skrifa + zeno glyph rasterization
//! - `tessera-gpu-none` (backend) - software reference GPU and runners
//!
//! ## Building an atlas
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tessera::{AtlasBuilder, AtlasContext, AtlasKind};
//! # use tessera_core::gpu::{Capabilities, GpuContext};
//! # use tessera_atlas::raster::GlyphPainter;
//! # fn gpu() -> Arc<dyn GpuContext> { unimplemented!() }
//! # fn painter() -> Arc<dyn GlyphPainter> { unimplemented!() }
//! # fn capabilities() -> Arc<dyn Capabilities> { unimplemented!() }
//! # fn frames() -> Vec<tessera::TextFrame> { unimplemented!() }
//!
//! let builder = AtlasBuilder::new(gpu(), painter());
//! let mut context = AtlasContext::new();
//! let frames = frames();
//! let atlas = builder.build_atlas(
//!     AtlasKind::AlphaBitmap,
//!     &mut context,
//!     capabilities().as_ref(),
//!     frames.iter(),
//! );
//! # let _ = atlas;
//! ```

pub use tessera_atlas::{
    AtlasBuilder, AtlasContext, AtlasKind, Font, FontGlyphPair, FontMetrics, Glyph, GlyphAtlas,
    GlyphPosition, RectPacker, TextFrame, TextRun, Typeface, TypefaceId,
};
pub use tessera_core::{
    geometry, pixel, Allocator, Capabilities, GpuContext, HostBitmap, ISize, Texture,
    TextureDescriptor,
};
pub use tessera_image::{
    decompress, DecodeOptions, Image, ImageDecodeService, ImageDescriptor, TaskRunners,
};

pub use tessera_atlas;
pub use tessera_core;
pub use tessera_image;
