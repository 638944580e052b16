//! Decompressing image descriptors into GPU-ready host bitmaps
//!
//! The decoder turns a descriptor into pixels a texture can ingest:
//! clamp the requested size to what the device can sample, let the codec
//! decode at its preferred covering size, pick a color type the GPU
//! understands, then resample if the decoded grid still is not the
//! requested one. Every bitmap allocated here aliases a fresh
//! host-visible device buffer so the upload stage can stay zero-copy on
//! platforms that allow it.

use std::sync::Arc;

use tessera_core::bitmap::HostBitmap;
use tessera_core::geometry::ISize;
use tessera_core::gpu::{Allocator, DeviceBuffer};
use tessera_core::pixel::{AlphaType, ColorSpace, ColorType, ImageInfo};

use crate::descriptor::{ImageDescriptor, Pixmap};
use crate::error::DecodeError;

/// The product of a successful decode: the final bitmap, the device
/// buffer aliasing it, and the info describing both.
#[derive(Clone)]
pub struct DecompressResult {
    pub device_buffer: Arc<dyn DeviceBuffer>,
    pub bitmap: HostBitmap,
    pub image_info: ImageInfo,
}

impl std::fmt::Debug for DecompressResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecompressResult")
            .field("image_info", &self.image_info)
            .finish_non_exhaustive()
    }
}

/// Decode `descriptor` into a host bitmap no larger than
/// `max_texture_size`, resampling to `target_size` when necessary.
///
/// A `target_size` of zero means "unspecified" and resolves to the
/// source dimensions. Returns `None` on any failure; the cause is
/// logged, never load-bearing.
pub fn decompress(
    descriptor: &dyn ImageDescriptor,
    target_size: ISize,
    max_texture_size: ISize,
    supports_wide_gamut: bool,
    allocator: &dyn Allocator,
) -> Option<DecompressResult> {
    match decompress_impl(
        descriptor,
        target_size,
        max_texture_size,
        supports_wide_gamut,
        allocator,
    ) {
        Ok(result) => Some(result),
        Err(err) => {
            log::error!("image decode failed: {err}");
            None
        }
    }
}

fn decompress_impl(
    descriptor: &dyn ImageDescriptor,
    target_size: ISize,
    max_texture_size: ISize,
    supports_wide_gamut: bool,
    allocator: &dyn Allocator,
) -> Result<DecompressResult, DecodeError> {
    let base_info = descriptor.image_info();
    if !base_info.is_valid() {
        return Err(DecodeError::InvalidDescriptor);
    }

    let requested = if target_size.is_empty() {
        base_info.size
    } else {
        target_size
    };
    let target = requested.min(max_texture_size);

    let source_size = base_info.size;
    let decode_size = if descriptor.is_compressed() {
        // The covering scale factor lets the codec pick the smallest
        // size it can decode that still spans the target.
        let scale = f32::max(
            target.width as f32 / source_size.width as f32,
            target.height as f32 / source_size.height as f32,
        );
        descriptor.get_scaled_dimensions(scale)
    } else {
        source_size
    };

    let image_info = choose_decode_info(&base_info, decode_size, supports_wide_gamut);
    if image_info.color_type.to_pixel_format().is_none() {
        return Err(DecodeError::UnsupportedPixelFormat(image_info.color_type));
    }

    let bitmap = HostBitmap::allocate(allocator, image_info)?;
    let row_bytes = bitmap.row_bytes();

    if descriptor.is_compressed() {
        // Decode straight into the buffer-backed bitmap.
        let decoded = bitmap.write(|pixels| {
            let mut pixmap = Pixmap {
                info: image_info,
                row_bytes,
                pixels,
            };
            descriptor.get_pixels(&mut pixmap)
        })?;
        if !decoded {
            return Err(DecodeError::DecompressFailed);
        }
    } else {
        // Raw bytes come straight off the descriptor; the shared borrow
        // keeps the source immutable while we copy-convert.
        let source = RawPixels {
            info: base_info,
            row_bytes: descriptor.row_bytes(),
            data: descriptor.data(),
        };
        bitmap.write(|pixels| convert_pixels(&source, &image_info, row_bytes, pixels))??;
        bitmap.make_immutable();
    }

    if bitmap.size() == target {
        return Ok(DecompressResult {
            device_buffer: bitmap.device_buffer(),
            image_info: *bitmap.info(),
            bitmap,
        });
    }

    // The decoded grid is not the requested one; resample with linear
    // filtering, no mips. Only 8-bit RGBA has a software resample path;
    // other formats fall back to the unscaled pixels with a warning.
    if image_info.color_type == ColorType::Rgba8888 {
        let scaled = HostBitmap::allocate(allocator, image_info.with_size(target))?;
        let scaled_row_bytes = scaled.row_bytes();
        scaled.write(|dst| {
            bitmap.read(|src| {
                resample_bilinear_rgba8(
                    src,
                    bitmap.size(),
                    row_bytes,
                    dst,
                    target,
                    scaled_row_bytes,
                )
            })
        })?;
        scaled.make_immutable();
        return Ok(DecompressResult {
            device_buffer: scaled.device_buffer(),
            image_info: *scaled.info(),
            bitmap: scaled,
        });
    }

    log::warn!(
        "could not scale decoded bitmap data from {}x{} to {}x{}",
        bitmap.size().width,
        bitmap.size().height,
        target.width,
        target.height,
    );
    bitmap.make_immutable();
    Ok(DecompressResult {
        device_buffer: bitmap.device_buffer(),
        image_info: *bitmap.info(),
        bitmap,
    })
}

/// Pick the decode-target info: wide-gamut formats when the platform and
/// the source gamut justify them, a conservative 8-bit rendition
/// otherwise. Alpha is preserved either way.
fn choose_decode_info(
    base_info: &ImageInfo,
    decode_size: ISize,
    supports_wide_gamut: bool,
) -> ImageInfo {
    let alpha_type = base_info.alpha_type;
    let is_wide = supports_wide_gamut
        && base_info
            .color_space
            .is_some_and(|space| space.is_wide_gamut());
    if is_wide {
        let color_type = if alpha_type == AlphaType::Opaque {
            ColorType::Bgr101010Xr
        } else {
            ColorType::RgbaF16
        };
        base_info
            .with_size(decode_size)
            .with_color_type(color_type)
            .with_alpha_type(alpha_type)
            .with_color_space(Some(ColorSpace::srgb()))
    } else {
        base_info
            .with_size(decode_size)
            .with_color_type(choose_compatible_color_type(base_info.color_type))
            .with_alpha_type(alpha_type)
    }
}

/// Degrade source color types the GPU cannot sample. F32 becomes F16;
/// everything else becomes plain 8-bit RGBA.
fn choose_compatible_color_type(color_type: ColorType) -> ColorType {
    match color_type {
        ColorType::RgbaF32 => ColorType::RgbaF16,
        _ => ColorType::Rgba8888,
    }
}

/// A borrowed, immutable pixel grid (the uncompressed source).
struct RawPixels<'a> {
    info: ImageInfo,
    row_bytes: usize,
    data: &'a [u8],
}

/// Copy-convert `source` into the target pixel grid.
///
/// Same-type rows are copied stride-aware; F32 narrows to F16. Anything
/// else is reported unsupported so the caller can surface it.
fn convert_pixels(
    source: &RawPixels<'_>,
    target_info: &ImageInfo,
    target_row_bytes: usize,
    target: &mut [u8],
) -> Result<(), DecodeError> {
    let width = target_info.size.width as usize;
    let height = target_info.size.height as usize;
    let from = source.info.color_type;
    let to = target_info.color_type;

    if from == to {
        let bpp = from.bytes_per_pixel();
        for y in 0..height {
            let src_start = y * source.row_bytes;
            let dst_start = y * target_row_bytes;
            let src = source
                .data
                .get(src_start..src_start + width * bpp)
                .ok_or(DecodeError::InvalidDescriptor)?;
            let dst = target
                .get_mut(dst_start..dst_start + width * bpp)
                .ok_or(DecodeError::InvalidDescriptor)?;
            dst.copy_from_slice(src);
        }
        return Ok(());
    }

    if from == ColorType::RgbaF32 && to == ColorType::RgbaF16 {
        for y in 0..height {
            for x in 0..width {
                let src_start = y * source.row_bytes + x * 16;
                let dst_start = y * target_row_bytes + x * 8;
                let src = source
                    .data
                    .get(src_start..src_start + 16)
                    .ok_or(DecodeError::InvalidDescriptor)?;
                let dst = target
                    .get_mut(dst_start..dst_start + 8)
                    .ok_or(DecodeError::InvalidDescriptor)?;
                for channel in 0..4 {
                    let value = f32::from_ne_bytes([
                        src[channel * 4],
                        src[channel * 4 + 1],
                        src[channel * 4 + 2],
                        src[channel * 4 + 3],
                    ]);
                    let half = f32_to_f16_bits(value).to_ne_bytes();
                    dst[channel * 2] = half[0];
                    dst[channel * 2 + 1] = half[1];
                }
            }
        }
        return Ok(());
    }

    Err(DecodeError::ConversionUnsupported { from, to })
}

/// Narrow an f32 to IEEE 754 half-precision bits, truncating the
/// mantissa.
fn f32_to_f16_bits(value: f32) -> u16 {
    let bits = value.to_bits();
    let sign = ((bits >> 16) & 0x8000) as u16;
    let exponent = ((bits >> 23) & 0xff) as i32 - 127 + 15;
    let mantissa = bits & 0x007f_ffff;

    if (bits >> 23) & 0xff == 0xff {
        // Infinity and NaN.
        return sign | 0x7c00 | if mantissa != 0 { 0x0200 } else { 0 };
    }
    if exponent >= 0x1f {
        return sign | 0x7c00;
    }
    if exponent <= 0 {
        if exponent < -10 {
            return sign;
        }
        let mant = (mantissa | 0x0080_0000) >> (14 - exponent);
        return sign | mant as u16;
    }
    sign | ((exponent as u16) << 10) | (mantissa >> 13) as u16
}

/// Bilinear resample of a tightly strided RGBA8 grid.
fn resample_bilinear_rgba8(
    src: &[u8],
    src_size: ISize,
    src_row_bytes: usize,
    dst: &mut [u8],
    dst_size: ISize,
    dst_row_bytes: usize,
) {
    if src_size.is_empty() || dst_size.is_empty() {
        return;
    }
    let src_w = src_size.width as usize;
    let src_h = src_size.height as usize;

    let sample = |src: &[u8], x: usize, y: usize, channel: usize| -> f32 {
        src[y * src_row_bytes + x * 4 + channel] as f32
    };

    for y in 0..dst_size.height as usize {
        let fy = (y as f32 + 0.5) * src_h as f32 / dst_size.height as f32 - 0.5;
        let y0 = fy.floor().max(0.0) as usize;
        let y1 = (y0 + 1).min(src_h - 1);
        let ty = (fy - y0 as f32).clamp(0.0, 1.0);

        for x in 0..dst_size.width as usize {
            let fx = (x as f32 + 0.5) * src_w as f32 / dst_size.width as f32 - 0.5;
            let x0 = fx.floor().max(0.0) as usize;
            let x1 = (x0 + 1).min(src_w - 1);
            let tx = (fx - x0 as f32).clamp(0.0, 1.0);

            for channel in 0..4 {
                let top = sample(src, x0, y0, channel) * (1.0 - tx)
                    + sample(src, x1, y0, channel) * tx;
                let bottom = sample(src, x0, y1, channel) * (1.0 - tx)
                    + sample(src, x1, y1, channel) * tx;
                let value = top * (1.0 - ty) + bottom * ty;
                dst[y * dst_row_bytes + x * 4 + channel] = value.round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}
