//! The rasterization seam between the builder and a font backend
//!
//! The builder prepares an [`AtlasCanvas`] for every glyph: it carries
//! the destination rectangle, the clip that keeps rasterization from
//! bleeding into neighbors, and the uniform scale. A [`GlyphPainter`]
//! backend fills in coverage; the canvas owns the pixel-format details of
//! landing that coverage in the atlas bitmap.

use tessera_core::geometry::{IRect, ISize};
use tessera_core::pixel::PixelFormat;

use crate::font::FontGlyphPair;

/// Paint color for glyph rasterization.
///
/// Color atlases draw opaque white (so sampled glyphs tint correctly);
/// alpha atlases draw opaque black and only the coverage survives. SDF
/// atlases derive from the alpha rendition afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphColor {
    White,
    Black,
}

/// A clipped, scaled window onto the atlas bitmap for one glyph.
pub struct AtlasCanvas<'a> {
    pixels: &'a mut [u8],
    row_bytes: usize,
    format: PixelFormat,
    dest: IRect,
    clip: IRect,
    scale: f32,
    color: GlyphColor,
}

impl<'a> AtlasCanvas<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pixels: &'a mut [u8],
        row_bytes: usize,
        format: PixelFormat,
        bounds: ISize,
        dest: IRect,
        scale: f32,
        color: GlyphColor,
    ) -> Self {
        let clip = dest.intersection(&IRect::new(0, 0, bounds.width, bounds.height));
        Self {
            pixels,
            row_bytes,
            format,
            dest,
            clip,
            scale,
            color,
        }
    }

    /// The uniform design-space-to-pixel scale the painter must apply.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Destination rectangle in atlas pixels. The glyph's bounding-box
    /// top-left must land at this rectangle's origin.
    pub fn dest(&self) -> IRect {
        self.dest
    }

    pub fn color(&self) -> GlyphColor {
        self.color
    }

    /// Blit an 8-bit coverage mask whose `(0, 0)` is the destination
    /// origin. Writes outside the clip are discarded.
    pub fn blit_coverage(&mut self, mask: &[u8], mask_width: u32, mask_height: u32) {
        if mask.len() < (mask_width as usize) * (mask_height as usize) {
            return;
        }
        for py in self.clip.y..self.clip.bottom() {
            let my = py - self.dest.y;
            if my >= mask_height {
                break;
            }
            for px in self.clip.x..self.clip.right() {
                let mx = px - self.dest.x;
                if mx >= mask_width {
                    break;
                }
                let coverage = mask[(my * mask_width + mx) as usize];
                if coverage == 0 {
                    continue;
                }
                self.store(px, py, coverage);
            }
        }
    }

    fn store(&mut self, px: u32, py: u32, coverage: u8) {
        match self.format {
            PixelFormat::A8Unorm => {
                let idx = py as usize * self.row_bytes + px as usize;
                if let Some(slot) = self.pixels.get_mut(idx) {
                    *slot = coverage;
                }
            }
            PixelFormat::R8G8B8A8Unorm => {
                let idx = py as usize * self.row_bytes + px as usize * 4;
                if idx + 4 > self.pixels.len() {
                    return;
                }
                // Premultiplied: white is coverage in every channel,
                // black is coverage in alpha alone.
                let rgb = match self.color {
                    GlyphColor::White => coverage,
                    GlyphColor::Black => 0,
                };
                self.pixels[idx] = rgb;
                self.pixels[idx + 1] = rgb;
                self.pixels[idx + 2] = rgb;
                self.pixels[idx + 3] = coverage;
            }
            // Atlases are only ever A8 or RGBA8.
            _ => {}
        }
    }
}

/// A font backend able to rasterize single glyphs.
///
/// The canvas supplies scale, destination and clip; the painter supplies
/// coverage via [`AtlasCanvas::blit_coverage`]. Anti-aliased edging with
/// slight hinting is expected; embolden comes from the pair's font
/// metrics. Returns `false` when the glyph cannot be rendered at all.
pub trait GlyphPainter: Send + Sync {
    fn paint(&self, canvas: &mut AtlasCanvas<'_>, pair: &FontGlyphPair) -> bool;
}

/// Rasterize one glyph of `pair` into `pixels` at `dest`.
#[allow(clippy::too_many_arguments)]
pub fn draw_glyph(
    pixels: &mut [u8],
    row_bytes: usize,
    format: PixelFormat,
    bounds: ISize,
    painter: &dyn GlyphPainter,
    pair: &FontGlyphPair,
    dest: IRect,
    color: GlyphColor,
) -> bool {
    let mut canvas = AtlasCanvas::new(
        pixels,
        row_bytes,
        format,
        bounds,
        dest,
        pair.font.metrics().scale,
        color,
    );
    painter.paint(&mut canvas, pair)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_support::{font, pair};

    /// Fills the entire destination with full coverage.
    struct BoxPainter;

    impl GlyphPainter for BoxPainter {
        fn paint(&self, canvas: &mut AtlasCanvas<'_>, _pair: &FontGlyphPair) -> bool {
            let size = canvas.dest().size();
            let mask = vec![255u8; (size.width * size.height) as usize];
            canvas.blit_coverage(&mask, size.width, size.height);
            true
        }
    }

    #[test]
    fn a8_coverage_lands_in_dest_only() {
        let bounds = ISize::new(16, 16);
        let mut pixels = vec![0u8; 16 * 16];
        let f = font(1, 12.0, 1.0);
        let p = pair(&f, 65, 4.0, 4.0);
        let dest = IRect::new(2, 3, 4, 4);
        assert!(draw_glyph(
            &mut pixels,
            16,
            PixelFormat::A8Unorm,
            bounds,
            &BoxPainter,
            &p,
            dest,
            GlyphColor::Black,
        ));
        for y in 0..16u32 {
            for x in 0..16u32 {
                let expected = if (2..6).contains(&x) && (3..7).contains(&y) {
                    255
                } else {
                    0
                };
                assert_eq!(pixels[(y * 16 + x) as usize], expected, "at ({x},{y})");
            }
        }
    }

    #[test]
    fn rgba_white_writes_premultiplied_channels() {
        let bounds = ISize::new(4, 4);
        let mut pixels = vec![0u8; 4 * 4 * 4];
        let f = font(1, 12.0, 1.0);
        let p = pair(&f, 65, 2.0, 2.0);
        assert!(draw_glyph(
            &mut pixels,
            16,
            PixelFormat::R8G8B8A8Unorm,
            bounds,
            &BoxPainter,
            &p,
            IRect::new(0, 0, 2, 2),
            GlyphColor::White,
        ));
        assert_eq!(&pixels[0..4], &[255, 255, 255, 255]);
        // Outside the glyph nothing was touched.
        assert_eq!(&pixels[2 * 4..3 * 4], &[0, 0, 0, 0]);
    }

    #[test]
    fn rasterization_cannot_bleed_past_bitmap_edge() {
        let bounds = ISize::new(8, 8);
        let mut pixels = vec![0u8; 8 * 8];
        let f = font(1, 12.0, 1.0);
        let p = pair(&f, 65, 6.0, 6.0);
        // Destination hangs off the bottom-right corner.
        draw_glyph(
            &mut pixels,
            8,
            PixelFormat::A8Unorm,
            bounds,
            &BoxPainter,
            &p,
            IRect::new(5, 5, 6, 6),
            GlyphColor::Black,
        );
        // Only the 3x3 in-bounds corner is covered.
        let covered = pixels.iter().filter(|&&b| b == 255).count();
        assert_eq!(covered, 9);
    }
}
