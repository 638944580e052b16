//! Zeno Glyph Painter - pure Rust coverage for the atlas
//!
//! Outlines come out of the font via skrifa, get written once as an SVG
//! path for zeno's rasterizer and once as a kurbo path for exact
//! bounds, and land in the atlas as 256-level anti-aliased coverage.
//! No native libraries anywhere in the chain.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::fmt::Write as _;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use kurbo::Shape;
use skrifa::MetadataProvider;

use tessera_atlas::font::{FontGlyphPair, Glyph, Typeface, TypefaceId};
use tessera_atlas::raster::{AtlasCanvas, GlyphPainter};
use tessera_core::geometry::Rect;

/// A typeface backed by raw TTF/OTF bytes.
///
/// The identity is a hash of the bytes, so the same font file loaded
/// twice still dedupes to one atlas entry set.
pub struct OutlineTypeface {
    data: Arc<Vec<u8>>,
    id: TypefaceId,
}

impl OutlineTypeface {
    /// Wrap font bytes, validating that skrifa can parse them.
    pub fn from_bytes(data: Vec<u8>) -> Option<Self> {
        skrifa::FontRef::new(&data).ok()?;
        let mut hasher = DefaultHasher::new();
        data.hash(&mut hasher);
        Some(Self {
            id: TypefaceId(hasher.finish()),
            data: Arc::new(data),
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Build a [`Glyph`] with its design-space bounds at `point_size`.
    ///
    /// Bounds are y-down (top is negative ascent), matching what the
    /// atlas builder expects. Glyphs without an outline (spaces) get
    /// empty bounds.
    pub fn glyph(&self, index: u32, point_size: f32) -> Option<Glyph> {
        let (path, _) = self.outline(index, point_size)?;
        let bbox = path.bounding_box();
        if bbox.x0.is_infinite() || bbox.y0.is_infinite() {
            return Some(Glyph::new(index, Rect::default()));
        }
        Some(Glyph::new(
            index,
            Rect::new(
                bbox.x0 as f32,
                -bbox.y1 as f32,
                (bbox.x1 - bbox.x0) as f32,
                (bbox.y1 - bbox.y0) as f32,
            ),
        ))
    }

    /// Extract one glyph outline at `size_px` pixels, in both formats.
    fn outline(&self, index: u32, size_px: f32) -> Option<(kurbo::BezPath, String)> {
        let font_ref = skrifa::FontRef::new(&self.data).ok()?;
        let outlines = font_ref.outline_glyphs();
        let glyph = outlines.get(skrifa::GlyphId::from(index as u16))?;

        let mut sink = OutlineSink::default();
        let size = skrifa::instance::Size::new(size_px);
        let location = skrifa::instance::LocationRef::default();
        let settings = skrifa::outline::DrawSettings::unhinted(size, location);
        glyph.draw(settings, &mut sink).ok()?;
        Some(sink.finish())
    }
}

impl fmt::Debug for OutlineTypeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutlineTypeface")
            .field("id", &self.id)
            .field("bytes", &self.data.len())
            .finish()
    }
}

impl Typeface for OutlineTypeface {
    fn id(&self) -> TypefaceId {
        self.id
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rasterizes glyph coverage with zeno.
#[derive(Debug, Default)]
pub struct ZenoGlyphPainter;

impl ZenoGlyphPainter {
    pub fn new() -> Self {
        Self
    }
}

impl GlyphPainter for ZenoGlyphPainter {
    fn paint(&self, canvas: &mut AtlasCanvas<'_>, pair: &FontGlyphPair) -> bool {
        use zeno::Mask;

        let Some(typeface) = pair
            .font
            .typeface()
            .as_any()
            .downcast_ref::<OutlineTypeface>()
        else {
            log::error!("zeno painter given a foreign typeface");
            return false;
        };

        let dest_size = canvas.dest().size();
        if dest_size.is_empty() {
            // Empty bounds: a space or other mark with no ink.
            return true;
        }

        let metrics = pair.font.metrics();
        let pixel_size = metrics.point_size * canvas.scale();
        let Some((path, svg)) = typeface.outline(pair.glyph.index, pixel_size) else {
            return false;
        };

        let bbox = path.bounding_box();
        if bbox.x0.is_infinite() || bbox.y0.is_infinite() {
            return true;
        }

        let width = dest_size.width;
        let height = dest_size.height;
        let mut mask = vec![0u8; (width * height) as usize];

        // Shift the outline so its bounding box starts at the mask
        // origin, then render.
        let _placement = Mask::new(svg.as_str())
            .size(width, height)
            .offset((-bbox.x0 as i32, -bbox.y0 as i32))
            .render_into(&mut mask, None);

        // Outlines are y-up, the atlas is y-down.
        flip_rows(&mut mask, width, height);

        if metrics.embolden {
            dilate_horizontal(&mut mask, width, height);
        }

        canvas.blit_coverage(&mask, width, height);
        true
    }
}

/// Flip a tightly packed mask vertically, in place.
fn flip_rows(mask: &mut [u8], width: u32, height: u32) {
    let width = width as usize;
    for y in 0..(height as usize) / 2 {
        let top = y * width;
        let bottom = (height as usize - 1 - y) * width;
        for x in 0..width {
            mask.swap(top + x, bottom + x);
        }
    }
}

/// Widen coverage by one pixel horizontally — the cheap embolden.
fn dilate_horizontal(mask: &mut [u8], width: u32, height: u32) {
    let width = width as usize;
    for y in 0..height as usize {
        let row = y * width;
        let mut previous = 0u8;
        for x in 0..width {
            let current = mask[row + x];
            mask[row + x] = current.max(previous);
            previous = current;
        }
    }
}

/// Streams one skrifa outline into an SVG path string for zeno and a
/// kurbo path for exact bounds, in a single pass.
#[derive(Default)]
struct OutlineSink {
    svg: String,
    path: kurbo::BezPath,
}

impl OutlineSink {
    fn finish(self) -> (kurbo::BezPath, String) {
        (self.path, self.svg)
    }
}

impl skrifa::outline::OutlinePen for OutlineSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let _ = write!(self.svg, "M {x:.2},{y:.2} ");
        self.path.move_to((x as f64, y as f64));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let _ = write!(self.svg, "L {x:.2},{y:.2} ");
        self.path.line_to((x as f64, y as f64));
    }

    fn quad_to(&mut self, cx: f32, cy: f32, x: f32, y: f32) {
        let _ = write!(self.svg, "Q {cx:.2},{cy:.2} {x:.2},{y:.2} ");
        self.path.quad_to((cx as f64, cy as f64), (x as f64, y as f64));
    }

    fn curve_to(&mut self, cx0: f32, cy0: f32, cx1: f32, cy1: f32, x: f32, y: f32) {
        let _ = write!(
            self.svg,
            "C {cx0:.2},{cy0:.2} {cx1:.2},{cy1:.2} {x:.2},{y:.2} "
        );
        self.path.curve_to(
            (cx0 as f64, cy0 as f64),
            (cx1 as f64, cy1 as f64),
            (x as f64, y as f64),
        );
    }

    fn close(&mut self) {
        self.svg.push_str("Z ");
        self.path.close_path();
    }
}
