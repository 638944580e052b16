//! The image descriptor contract
//!
//! Codecs live outside this crate. A descriptor wraps one encoded or raw
//! image and answers the questions the decoder needs: its nominal info,
//! whether a codec sits in front of the bytes, and — for compressed
//! sources — a decode-into-pixmap entry point plus the codec's preferred
//! scaled dimensions.

use tessera_core::geometry::ISize;
use tessera_core::pixel::ImageInfo;

/// A mutable pixel grid a codec decodes into.
pub struct Pixmap<'a> {
    pub info: ImageInfo,
    pub row_bytes: usize,
    pub pixels: &'a mut [u8],
}

/// One image, possibly compressed, owned by the caller.
pub trait ImageDescriptor: Send + Sync {
    /// Nominal info of the source: dimensions, color type, alpha and
    /// color space.
    fn image_info(&self) -> ImageInfo;

    /// Whether a codec must run to produce pixels.
    fn is_compressed(&self) -> bool;

    /// Row stride of the raw bytes; meaningful only when uncompressed.
    fn row_bytes(&self) -> usize;

    /// The raw bytes; meaningful only when uncompressed.
    fn data(&self) -> &[u8];

    /// Decode into `pixmap` at its exact info. Returns `false` on codec
    /// failure. Meaningful only when compressed.
    fn get_pixels(&self, pixmap: &mut Pixmap<'_>) -> bool;

    /// The smallest codec-friendly dimensions that still cover
    /// `scale` times the source size. Meaningful only when compressed.
    fn get_scaled_dimensions(&self, scale: f32) -> ISize;
}

/// Static configuration of the decode service.
#[derive(Debug, Clone, Copy)]
pub struct DecodeOptions {
    /// Whether the display pipeline accepts wide-gamut pixel formats.
    pub supports_wide_gamut: bool,
    /// Whether decoded images get a mip chain on the shared upload path.
    pub create_mips: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            supports_wide_gamut: false,
            create_mips: true,
        }
    }
}
