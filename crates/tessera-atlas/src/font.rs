//! Fonts, glyphs and the text-frame model the builder consumes
//!
//! The shaper and layout engine live elsewhere; by the time text reaches
//! this crate it is already a sequence of positioned glyph indices. What
//! matters here is identity: which `(font, glyph)` pairs are on screen,
//! so the builder can dedupe them across a frame.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tessera_core::geometry::{ISize, Point, Rect};

/// Stable identity of a typeface, used for hashing and equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypefaceId(pub u64);

/// An opaque typeface handle.
///
/// Glyph painters that need concrete font data downcast through
/// [`as_any`](Typeface::as_any); the pipeline itself only ever looks at
/// the identity.
pub trait Typeface: fmt::Debug + Send + Sync {
    fn id(&self) -> TypefaceId;

    fn as_any(&self) -> &dyn Any;
}

/// Scaling and style parameters attached to a font instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontMetrics {
    /// Nominal point size the shaper worked at.
    pub point_size: f32,
    /// Uniform scale from design space to atlas pixels.
    pub scale: f32,
    pub scale_x: f32,
    pub skew_x: f32,
    pub embolden: bool,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            point_size: 12.0,
            scale: 1.0,
            scale_x: 1.0,
            skew_x: 0.0,
            embolden: false,
        }
    }
}

/// A typeface at a particular size and scale.
///
/// Equality and hashing use the typeface identity plus the point-size and
/// scale bits — the discriminator that decides whether two runs can share
/// atlas entries.
#[derive(Debug, Clone)]
pub struct Font {
    typeface: Arc<dyn Typeface>,
    metrics: FontMetrics,
}

impl Font {
    pub fn new(typeface: Arc<dyn Typeface>, metrics: FontMetrics) -> Self {
        Self { typeface, metrics }
    }

    pub fn typeface(&self) -> &Arc<dyn Typeface> {
        &self.typeface
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }
}

impl PartialEq for Font {
    fn eq(&self, other: &Self) -> bool {
        self.typeface.id() == other.typeface.id()
            && self.metrics.point_size.to_bits() == other.metrics.point_size.to_bits()
            && self.metrics.scale.to_bits() == other.metrics.scale.to_bits()
    }
}

impl Eq for Font {}

impl Hash for Font {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.typeface.id().hash(state);
        self.metrics.point_size.to_bits().hash(state);
        self.metrics.scale.to_bits().hash(state);
    }
}

/// A single glyph: index within its font plus design-space bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub index: u32,
    /// Bounding box in design space, before `FontMetrics::scale` applies.
    pub bounds: Rect,
}

impl Glyph {
    pub const fn new(index: u32, bounds: Rect) -> Self {
        Self { index, bounds }
    }
}

/// A glyph at a layout position within a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPosition {
    pub glyph: Glyph,
    pub position: Point,
}

/// An ordered sequence of positioned glyphs sharing one font.
#[derive(Debug, Clone)]
pub struct TextRun {
    font: Font,
    glyphs: Vec<GlyphPosition>,
}

impl TextRun {
    pub fn new(font: Font, glyphs: Vec<GlyphPosition>) -> Self {
        Self { font, glyphs }
    }

    pub fn font(&self) -> &Font {
        &self.font
    }

    pub fn glyph_positions(&self) -> &[GlyphPosition] {
        &self.glyphs
    }
}

/// Everything one frame wants drawn.
#[derive(Debug, Clone, Default)]
pub struct TextFrame {
    runs: Vec<TextRun>,
}

impl TextFrame {
    pub fn new(runs: Vec<TextRun>) -> Self {
        Self { runs }
    }

    pub fn runs(&self) -> &[TextRun] {
        &self.runs
    }
}

/// The unit of atlas bookkeeping: one glyph of one font instance.
#[derive(Debug, Clone)]
pub struct FontGlyphPair {
    pub font: Font,
    pub glyph: Glyph,
}

impl FontGlyphPair {
    /// Pixel dimensions of this glyph once scaled for the atlas.
    pub fn scaled_size(&self) -> ISize {
        ISize::ceil_from(self.glyph.bounds.scaled(self.font.metrics().scale).size())
    }
}

impl PartialEq for FontGlyphPair {
    fn eq(&self, other: &Self) -> bool {
        self.font == other.font && self.glyph.index == other.glyph.index
    }
}

impl Eq for FontGlyphPair {}

impl Hash for FontGlyphPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.font.hash(state);
        self.glyph.index.hash(state);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn pairs_dedupe_by_identity_triple() {
        let a = font(1, 24.0, 1.0);
        let mut set = HashSet::new();
        set.insert(pair(&a, 65, 10.0, 12.0));
        set.insert(pair(&a, 65, 10.0, 12.0));
        set.insert(pair(&a, 66, 10.0, 12.0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn different_sizes_are_different_pairs() {
        let small = font(1, 12.0, 1.0);
        let large = font(1, 24.0, 1.0);
        let mut set = HashSet::new();
        set.insert(pair(&small, 65, 10.0, 12.0));
        set.insert(pair(&large, 65, 10.0, 12.0));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn different_typefaces_are_different_pairs() {
        let a = font(1, 24.0, 1.0);
        let b = font(2, 24.0, 1.0);
        assert_ne!(pair(&a, 65, 10.0, 12.0), pair(&b, 65, 10.0, 12.0));
    }

    #[test]
    fn scaled_size_rounds_up() {
        let f = font(1, 24.0, 1.5);
        let p = pair(&f, 65, 10.0, 12.1);
        assert_eq!(p.scaled_size(), ISize::new(15, 19));
    }
}
