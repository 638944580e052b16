//! Atlas construction: reuse, append, or rebuild
//!
//! One entry point, [`AtlasBuilder::build_atlas`], decides per frame
//! whether the previous atlas can be returned untouched, extended in
//! place with only the missing glyphs, or must be rebuilt from scratch
//! at a freshly chosen size. Rebuilding is the expensive path — it
//! re-rasterizes every glyph — so the earlier outs matter.

use std::collections::HashSet;
use std::sync::Arc;

use tessera_core::bitmap::HostBitmap;
use tessera_core::geometry::{IRect, ISize};
use tessera_core::gpu::{Capabilities, GpuContext, Texture};
use tessera_core::pixel::{AlphaType, ImageInfo};
use tessera_core::upload;

use crate::atlas::{AtlasContext, AtlasKind, GlyphAtlas};
use crate::error::AtlasError;
use crate::font::{FontGlyphPair, TextFrame};
use crate::packer::RectPacker;
use crate::raster::{draw_glyph, GlyphColor, GlyphPainter};
use crate::sdf;

/// Padding in pixels added to each packed rectangle so neighboring
/// glyphs cannot bleed into one another when sampled.
pub const ATLAS_PADDING: u32 = 2;

/// Smallest atlas side. Chosen to satisfy linear-texture row alignment
/// on the platforms that need it.
const MIN_ATLAS_SIZE: u32 = 256;

/// Largest atlas side; beyond this packing is reported impossible.
const MAX_ATLAS_SIZE: u32 = 4096;

enum AppendOutcome {
    /// All new glyphs landed in the existing atlas.
    Appended(Arc<GlyphAtlas>),
    /// The packer is out of room; rebuild instead.
    OutOfRoom,
}

/// Builds and maintains glyph atlases against a GPU context and a font
/// backend.
pub struct AtlasBuilder {
    gpu: Arc<dyn GpuContext>,
    painter: Arc<dyn GlyphPainter>,
}

impl AtlasBuilder {
    pub fn new(gpu: Arc<dyn GpuContext>, painter: Arc<dyn GlyphPainter>) -> Self {
        Self { gpu, painter }
    }

    /// Produce an atlas covering every glyph the frames reference.
    ///
    /// Returns the prior atlas unchanged when the frames are empty or
    /// already fully covered, the prior atlas extended when an
    /// incremental append fits, a fresh atlas otherwise, and `None` when
    /// allocation, packing or upload makes the build impossible.
    pub fn build_atlas<'a>(
        &self,
        kind: AtlasKind,
        context: &mut AtlasContext,
        capabilities: &dyn Capabilities,
        frames: impl Iterator<Item = &'a TextFrame>,
    ) -> Option<Arc<GlyphAtlas>> {
        // Step 1: collect the unique pairs in this frame set.
        let pairs = collect_unique_pairs(frames);
        if pairs.is_empty() {
            return context.atlas();
        }

        let prior = context.atlas();

        // Step 2: classify against the prior atlas.
        let new_glyphs: Vec<FontGlyphPair> = match &prior {
            Some(prior) => pairs
                .iter()
                .filter(|pair| prior.find(pair).is_none())
                .cloned()
                .collect(),
            None => pairs.clone(),
        };
        if let Some(prior) = &prior {
            if prior.kind() == kind && new_glyphs.is_empty() {
                return Some(prior.clone());
            }

            // Step 3: try appending only the missing glyphs.
            if prior.kind() == kind {
                match self.try_append(prior, context, capabilities, &new_glyphs) {
                    Ok(AppendOutcome::Appended(atlas)) => return Some(atlas),
                    Ok(AppendOutcome::OutOfRoom) => {}
                    Err(err) => {
                        log::error!("incremental atlas append failed: {err}");
                        context.clear();
                        return None;
                    }
                }
            }
        }

        // Steps 4-7: full rebuild.
        match self.rebuild(kind, context, capabilities, &pairs) {
            Ok(atlas) => Some(atlas),
            Err(err) => {
                log::error!("glyph atlas rebuild failed: {err}");
                context.clear();
                None
            }
        }
    }

    fn try_append(
        &self,
        prior: &Arc<GlyphAtlas>,
        context: &mut AtlasContext,
        capabilities: &dyn Capabilities,
        new_glyphs: &[FontGlyphPair],
    ) -> Result<AppendOutcome, AtlasError> {
        if context.atlas_size().is_empty() {
            return Ok(AppendOutcome::OutOfRoom);
        }
        let Some(packer) = context.rect_packer_mut() else {
            return Ok(AppendOutcome::OutOfRoom);
        };

        // Existing glyphs fit by construction; only place the new ones.
        let mut placements = Vec::with_capacity(new_glyphs.len());
        for pair in new_glyphs {
            let glyph_size = pair.scaled_size();
            match packer.add(
                glyph_size.width + ATLAS_PADDING,
                glyph_size.height + ATLAS_PADDING,
            ) {
                Some(origin) => placements.push(IRect::from_origin_size(origin, glyph_size)),
                None => return Ok(AppendOutcome::OutOfRoom),
            }
        }

        // Record the new positions; nothing already present moves.
        for (pair, rect) in new_glyphs.iter().zip(&placements) {
            prior.add_position(pair.clone(), *rect);
        }

        // Draw only the new glyphs into the existing bitmap.
        let atlas_bitmap = context.bitmap().ok_or(AtlasError::MissingBitmap)?;
        rasterize_pairs(&atlas_bitmap.bitmap, prior, self.painter.as_ref(), new_glyphs)?;

        // With shared buffer/texture memory the texture already sees the
        // new pixels; otherwise push them explicitly.
        if !capabilities.supports_shared_device_buffer_texture_memory() {
            let texture = prior.texture().ok_or(AtlasError::MissingTexture)?;
            if !texture.set_contents(atlas_bitmap.bitmap.mapping()) {
                return Err(AtlasError::Upload(
                    tessera_core::error::UploadError::SetContents,
                ));
            }
        }

        Ok(AppendOutcome::Appended(prior.clone()))
    }

    fn rebuild(
        &self,
        kind: AtlasKind,
        context: &mut AtlasContext,
        capabilities: &dyn Capabilities,
        pairs: &[FontGlyphPair],
    ) -> Result<Arc<GlyphAtlas>, AtlasError> {
        let format = kind.pixel_format();
        let allocator = self.gpu.resource_allocator();

        // Row alignment only constrains the size when the texture will
        // alias the buffer memory directly.
        let min_alignment = if capabilities.supports_shared_device_buffer_texture_memory() {
            Some(allocator.min_bytes_per_row(format))
        } else {
            None
        };

        // Step 4: find the optimum size; placements come along for free.
        let (atlas_size, packer, placements) =
            optimum_atlas_size(pairs, min_alignment).ok_or(AtlasError::PackingImpossible {
                count: pairs.len(),
                max: MAX_ATLAS_SIZE,
            })?;
        if placements.len() != pairs.len() {
            return Err(AtlasError::PlacementMismatch);
        }

        // Step 5 (positions): record where every pair landed.
        let atlas = GlyphAtlas::new(kind);
        for (pair, rect) in pairs.iter().zip(&placements) {
            atlas.add_position(pair.clone(), *rect);
        }

        // Step 5 (pixels): fresh host bitmap, rasterize everything.
        let info = ImageInfo::new(atlas_size, kind.color_type(), AlphaType::Premultiplied);
        let bitmap = HostBitmap::allocate(allocator.as_ref(), info)?;
        rasterize_all(&bitmap, &atlas, self.painter.as_ref())?;

        if kind == AtlasKind::SignedDistanceField {
            bitmap
                .write(|pixels| {
                    sdf::convert_to_signed_distance_field(
                        pixels,
                        atlas_size.width,
                        atlas_size.height,
                    )
                })
                .map_err(AtlasError::from)?;
        }

        // Step 6: upload. One decision site: zero-copy view when the
        // platform shares buffer/texture memory, explicit copy otherwise.
        let buffer = bitmap.device_buffer();
        let texture: Arc<dyn Texture> =
            if capabilities.supports_shared_device_buffer_texture_memory() {
                upload::wrap_buffer_as_texture(&buffer, &bitmap, format, "GlyphAtlas")?
            } else {
                upload::upload_to_shared(self.gpu.as_ref(), &bitmap, false, "GlyphAtlas")?
            };
        atlas.set_texture(texture);

        // Step 7: publish the whole triple at once so the context never
        // holds a half-updated state.
        let atlas = Arc::new(atlas);
        context.update_atlas(atlas.clone(), atlas_size);
        context.update_rect_packer(packer);
        context.update_bitmap(bitmap, buffer);
        Ok(atlas)
    }
}

/// Deduplicate every `(font, glyph)` pair the frames mention.
///
/// Hash-set iteration order varies between processes, so the result is
/// sorted by (typeface, size, glyph) — identical pair sets must produce
/// identical packing.
fn collect_unique_pairs<'a>(
    frames: impl Iterator<Item = &'a TextFrame>,
) -> Vec<FontGlyphPair> {
    let mut set = HashSet::new();
    for frame in frames {
        for run in frame.runs() {
            let font = run.font();
            for glyph_position in run.glyph_positions() {
                set.insert(FontGlyphPair {
                    font: font.clone(),
                    glyph: glyph_position.glyph,
                });
            }
        }
    }
    let mut pairs: Vec<FontGlyphPair> = set.into_iter().collect();
    pairs.sort_by_key(|pair| {
        (
            pair.font.typeface().id(),
            pair.font.metrics().point_size.to_bits(),
            pair.glyph.index,
        )
    });
    pairs
}

/// Attempt to pack every pair, recording placements. Returns how many
/// pairs did not fit.
fn pairs_fit(
    pairs: &[FontGlyphPair],
    packer: &mut RectPacker,
    placements: &mut Vec<IRect>,
) -> usize {
    placements.clear();
    for (index, pair) in pairs.iter().enumerate() {
        let glyph_size = pair.scaled_size();
        match packer.add(
            glyph_size.width + ATLAS_PADDING,
            glyph_size.height + ATLAS_PADDING,
        ) {
            Some(origin) => placements.push(IRect::from_origin_size(origin, glyph_size)),
            None => return pairs.len() - index,
        }
    }
    0
}

/// Search for the smallest workable atlas size.
///
/// Starts square at the minimum side and grows by powers of two: only
/// the shorter side when fewer than half the pairs are left over,
/// both sides otherwise. Gives up past the maximum side.
fn optimum_atlas_size(
    pairs: &[FontGlyphPair],
    min_alignment: Option<usize>,
) -> Option<(ISize, RectPacker, Vec<IRect>)> {
    let minimum = match min_alignment {
        Some(alignment) if alignment > MIN_ATLAS_SIZE as usize => alignment as u32,
        _ => MIN_ATLAS_SIZE,
    };

    let mut current = ISize::new(minimum, minimum);
    let half_of_total = (pairs.len() + 1) / 2;
    let mut placements = Vec::with_capacity(pairs.len());
    loop {
        let mut packer = RectPacker::new(current.width, current.height);
        let remaining = pairs_fit(pairs, &mut packer, &mut placements);
        if remaining == 0 {
            return Some((current, packer, placements));
        }
        log::debug!(
            "atlas size {}x{} left {remaining} of {} glyphs unplaced",
            current.width,
            current.height,
            pairs.len()
        );
        current = if remaining < half_of_total {
            ISize::new(
                current.max_dimension(),
                next_power_of_two_above(current.min_dimension()),
            )
        } else {
            ISize::new(
                next_power_of_two_above(current.width),
                next_power_of_two_above(current.height),
            )
        };
        if current.width > MAX_ATLAS_SIZE || current.height > MAX_ATLAS_SIZE {
            return None;
        }
    }
}

fn next_power_of_two_above(value: u32) -> u32 {
    (value + 1).next_power_of_two()
}

/// Rasterize every glyph the atlas knows about into a fresh bitmap.
fn rasterize_all(
    bitmap: &HostBitmap,
    atlas: &GlyphAtlas,
    painter: &dyn GlyphPainter,
) -> Result<(), AtlasError> {
    let size = bitmap.size();
    let row_bytes = bitmap.row_bytes();
    let format = atlas.kind().pixel_format();
    let color = glyph_color(atlas.kind());
    let ok = bitmap.write(|pixels| {
        let mut ok = true;
        atlas.iterate(|pair, rect| {
            ok = draw_glyph(pixels, row_bytes, format, size, painter, pair, rect, color);
            ok
        });
        ok
    })?;
    if ok {
        Ok(())
    } else {
        Err(AtlasError::Rasterization)
    }
}

/// Rasterize just `pairs` into an existing bitmap at their recorded
/// positions. Pairs without a position are skipped.
fn rasterize_pairs(
    bitmap: &HostBitmap,
    atlas: &GlyphAtlas,
    painter: &dyn GlyphPainter,
    pairs: &[FontGlyphPair],
) -> Result<(), AtlasError> {
    let size = bitmap.size();
    let row_bytes = bitmap.row_bytes();
    let format = atlas.kind().pixel_format();
    let color = glyph_color(atlas.kind());
    let ok = bitmap.write(|pixels| {
        let mut ok = true;
        for pair in pairs {
            let Some(rect) = atlas.find(pair) else {
                continue;
            };
            ok = draw_glyph(pixels, row_bytes, format, size, painter, pair, rect, color);
            if !ok {
                break;
            }
        }
        ok
    })?;
    if ok {
        Ok(())
    } else {
        Err(AtlasError::Rasterization)
    }
}

fn glyph_color(kind: AtlasKind) -> GlyphColor {
    if kind.has_color() {
        GlyphColor::White
    } else {
        GlyphColor::Black
    }
}
