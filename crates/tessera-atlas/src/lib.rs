//! Tessera Atlas: many small glyphs, one big texture
//!
//! Frames of laid-out text come in; a packed glyph atlas ready for GPU
//! sampling comes out. The work happens in stages — dedupe the frame's
//! `(font, glyph)` pairs, decide between reusing, appending to, or
//! rebuilding the cached atlas, pack rectangles, rasterize through a
//! pluggable [`GlyphPainter`](raster::GlyphPainter), and for
//! signed-distance atlases run the dead-reckoning transform before the
//! pixels reach a texture.
//!
//! The atlas context is not thread-safe; build atlases from the
//! rendering thread that owns it.

pub mod atlas;
pub mod builder;
pub mod error;
pub mod font;
pub mod packer;
pub mod raster;
pub mod sdf;

#[cfg(test)]
mod proptests;

pub use atlas::{AtlasBitmap, AtlasContext, AtlasKind, GlyphAtlas};
pub use builder::{AtlasBuilder, ATLAS_PADDING};
pub use error::AtlasError;
pub use font::{
    Font, FontGlyphPair, FontMetrics, Glyph, GlyphPosition, TextFrame, TextRun, Typeface,
    TypefaceId,
};
pub use packer::RectPacker;
pub use raster::{AtlasCanvas, GlyphColor, GlyphPainter};
pub use sdf::convert_to_signed_distance_field;
