//! The glyph atlas and the context that carries it across frames

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use tessera_core::bitmap::HostBitmap;
use tessera_core::geometry::{IRect, ISize};
use tessera_core::gpu::{DeviceBuffer, Texture};
use tessera_core::pixel::{ColorType, PixelFormat};

use crate::font::FontGlyphPair;
use crate::packer::RectPacker;

/// What kind of pixels an atlas holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtlasKind {
    /// 8-bit coverage.
    AlphaBitmap,
    /// Full-color glyphs (emoji and other COLR content).
    ColorBitmap,
    /// 8-bit signed-distance field derived from coverage.
    SignedDistanceField,
}

impl AtlasKind {
    pub fn pixel_format(&self) -> PixelFormat {
        match self {
            AtlasKind::AlphaBitmap | AtlasKind::SignedDistanceField => PixelFormat::A8Unorm,
            AtlasKind::ColorBitmap => PixelFormat::R8G8B8A8Unorm,
        }
    }

    pub fn color_type(&self) -> ColorType {
        match self {
            AtlasKind::AlphaBitmap | AtlasKind::SignedDistanceField => ColorType::Alpha8,
            AtlasKind::ColorBitmap => ColorType::Rgba8888,
        }
    }

    pub fn has_color(&self) -> bool {
        matches!(self, AtlasKind::ColorBitmap)
    }
}

/// A packed texture of glyph bitmaps plus where each glyph landed.
///
/// Positions are recorded without the packing padding; rectangles of
/// distinct pairs never overlap even with the padding margin applied.
/// Interior locking lets the builder append to an atlas that earlier
/// frames already handed out; access stays single-threaded per the
/// context contract.
pub struct GlyphAtlas {
    kind: AtlasKind,
    positions: RwLock<HashMap<FontGlyphPair, IRect>>,
    texture: RwLock<Option<Arc<dyn Texture>>>,
}

impl GlyphAtlas {
    pub fn new(kind: AtlasKind) -> Self {
        Self {
            kind,
            positions: RwLock::new(HashMap::new()),
            texture: RwLock::new(None),
        }
    }

    pub fn kind(&self) -> AtlasKind {
        self.kind
    }

    /// Record where a pair landed. Duplicate keys overwrite; the builder
    /// guarantees uniqueness upstream.
    pub fn add_position(&self, pair: FontGlyphPair, rect: IRect) {
        self.positions.write().insert(pair, rect);
    }

    pub fn find(&self, pair: &FontGlyphPair) -> Option<IRect> {
        self.positions.read().get(pair).copied()
    }

    pub fn glyph_count(&self) -> usize {
        self.positions.read().len()
    }

    /// Visit every `(pair, rect)` entry. Return `false` from the
    /// callback to stop early.
    pub fn iterate(&self, mut callback: impl FnMut(&FontGlyphPair, IRect) -> bool) {
        for (pair, rect) in self.positions.read().iter() {
            if !callback(pair, *rect) {
                break;
            }
        }
    }

    pub fn set_texture(&self, texture: Arc<dyn Texture>) {
        *self.texture.write() = Some(texture);
    }

    pub fn texture(&self) -> Option<Arc<dyn Texture>> {
        self.texture.read().clone()
    }
}

impl fmt::Debug for GlyphAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphAtlas")
            .field("kind", &self.kind)
            .field("glyph_count", &self.glyph_count())
            .field("has_texture", &self.texture.read().is_some())
            .finish()
    }
}

/// The atlas bitmap and the device buffer aliasing its pixels.
#[derive(Clone)]
pub struct AtlasBitmap {
    pub bitmap: HostBitmap,
    pub buffer: Arc<dyn DeviceBuffer>,
}

impl AtlasBitmap {
    pub fn new(bitmap: HostBitmap, buffer: Arc<dyn DeviceBuffer>) -> Self {
        Self { bitmap, buffer }
    }
}

impl fmt::Debug for AtlasBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlasBitmap")
            .field("bitmap", &self.bitmap)
            .finish_non_exhaustive()
    }
}

/// Carries the last-built atlas, its packer and its bitmap across frames.
///
/// Either all three are absent or all three describe the same atlas
/// state. Not thread-safe: create at renderer init and use from the
/// rendering thread only.
#[derive(Default)]
pub struct AtlasContext {
    atlas: Option<Arc<GlyphAtlas>>,
    atlas_size: ISize,
    packer: Option<RectPacker>,
    bitmap: Option<AtlasBitmap>,
}

impl AtlasContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn atlas(&self) -> Option<Arc<GlyphAtlas>> {
        self.atlas.clone()
    }

    pub fn atlas_size(&self) -> ISize {
        self.atlas_size
    }

    pub fn rect_packer_mut(&mut self) -> Option<&mut RectPacker> {
        self.packer.as_mut()
    }

    pub fn bitmap(&self) -> Option<AtlasBitmap> {
        self.bitmap.clone()
    }

    pub fn update_atlas(&mut self, atlas: Arc<GlyphAtlas>, size: ISize) {
        self.atlas = Some(atlas);
        self.atlas_size = size;
    }

    pub fn update_rect_packer(&mut self, packer: RectPacker) {
        self.packer = Some(packer);
    }

    pub fn update_bitmap(&mut self, bitmap: HostBitmap, buffer: Arc<dyn DeviceBuffer>) {
        self.bitmap = Some(AtlasBitmap::new(bitmap, buffer));
    }

    /// Drop all cached state, restoring the all-absent invariant.
    pub fn clear(&mut self) {
        self.atlas = None;
        self.atlas_size = ISize::default();
        self.packer = None;
        self.bitmap = None;
    }
}

impl fmt::Debug for AtlasContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlasContext")
            .field("atlas", &self.atlas)
            .field("atlas_size", &self.atlas_size)
            .field("has_packer", &self.packer.is_some())
            .field("has_bitmap", &self.bitmap.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::test_support::{font, pair};

    #[test]
    fn kind_maps_to_pixel_format() {
        assert_eq!(AtlasKind::AlphaBitmap.pixel_format(), PixelFormat::A8Unorm);
        assert_eq!(
            AtlasKind::SignedDistanceField.pixel_format(),
            PixelFormat::A8Unorm
        );
        assert_eq!(
            AtlasKind::ColorBitmap.pixel_format(),
            PixelFormat::R8G8B8A8Unorm
        );
    }

    #[test]
    fn positions_round_trip() {
        let atlas = GlyphAtlas::new(AtlasKind::AlphaBitmap);
        let f = font(1, 24.0, 1.0);
        let a = pair(&f, 65, 10.0, 12.0);
        let b = pair(&f, 66, 8.0, 8.0);
        atlas.add_position(a.clone(), IRect::new(0, 0, 10, 12));
        atlas.add_position(b.clone(), IRect::new(12, 0, 8, 8));

        assert_eq!(atlas.find(&a), Some(IRect::new(0, 0, 10, 12)));
        assert_eq!(atlas.find(&b), Some(IRect::new(12, 0, 8, 8)));
        assert_eq!(atlas.find(&pair(&f, 67, 1.0, 1.0)), None);

        // Iteration yields the same (pair, rect) multiset as lookups.
        let mut seen = Vec::new();
        atlas.iterate(|p, r| {
            seen.push((p.clone(), r));
            true
        });
        assert_eq!(seen.len(), 2);
        for (p, r) in seen {
            assert_eq!(atlas.find(&p), Some(r));
        }
    }

    #[test]
    fn iterate_can_stop_early() {
        let atlas = GlyphAtlas::new(AtlasKind::AlphaBitmap);
        let f = font(1, 24.0, 1.0);
        for index in 0..10 {
            atlas.add_position(pair(&f, index, 4.0, 4.0), IRect::new(index, 0, 4, 4));
        }
        let mut visits = 0;
        atlas.iterate(|_, _| {
            visits += 1;
            visits < 3
        });
        assert_eq!(visits, 3);
    }

    #[test]
    fn context_clear_restores_invariant() {
        let mut context = AtlasContext::new();
        context.update_atlas(
            Arc::new(GlyphAtlas::new(AtlasKind::AlphaBitmap)),
            ISize::new(256, 256),
        );
        context.update_rect_packer(RectPacker::new(256, 256));
        context.clear();
        assert!(context.atlas().is_none());
        assert!(context.rect_packer_mut().is_none());
        assert!(context.bitmap().is_none());
        assert!(context.atlas_size().is_empty());
    }
}
