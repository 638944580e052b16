//! Decoder behavior with mock descriptors and the software allocator

use tessera_core::geometry::ISize;
use tessera_core::pixel::{AlphaType, ColorSpace, ColorType, ImageInfo, PixelFormat};
use tessera_gpu_none::SoftAllocator;
use tessera_image::decoder::decompress;
use tessera_image::descriptor::{ImageDescriptor, Pixmap};

/// An uncompressed descriptor over raw bytes.
struct RawDescriptor {
    info: ImageInfo,
    row_bytes: usize,
    data: Vec<u8>,
}

impl RawDescriptor {
    fn rgba8(size: ISize, value: u8) -> Self {
        let info = ImageInfo::new(size, ColorType::Rgba8888, AlphaType::Premultiplied);
        let row_bytes = info.min_row_bytes();
        Self {
            info,
            row_bytes,
            data: vec![value; row_bytes * size.height as usize],
        }
    }
}

impl ImageDescriptor for RawDescriptor {
    fn image_info(&self) -> ImageInfo {
        self.info
    }

    fn is_compressed(&self) -> bool {
        false
    }

    fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    fn data(&self) -> &[u8] {
        &self.data
    }

    fn get_pixels(&self, _pixmap: &mut Pixmap<'_>) -> bool {
        false
    }

    fn get_scaled_dimensions(&self, _scale: f32) -> ISize {
        self.info.size
    }
}

/// A compressed descriptor whose codec can only halve dimensions once
/// and fills every decoded pixel with one value.
struct HalvingCodecDescriptor {
    info: ImageInfo,
    fill: u8,
}

impl ImageDescriptor for HalvingCodecDescriptor {
    fn image_info(&self) -> ImageInfo {
        self.info
    }

    fn is_compressed(&self) -> bool {
        true
    }

    fn row_bytes(&self) -> usize {
        0
    }

    fn data(&self) -> &[u8] {
        &[]
    }

    fn get_pixels(&self, pixmap: &mut Pixmap<'_>) -> bool {
        pixmap.pixels.fill(self.fill);
        true
    }

    fn get_scaled_dimensions(&self, scale: f32) -> ISize {
        if scale <= 0.5 {
            ISize::new(self.info.size.width / 2, self.info.size.height / 2)
        } else {
            self.info.size
        }
    }
}

#[test]
fn compressed_decode_resamples_down_to_target() {
    // 2000x2000 source, 500x500 requested: the codec decodes at its
    // preferred 1000x1000, the decoder resamples the rest of the way.
    let allocator = SoftAllocator::new();
    let descriptor = HalvingCodecDescriptor {
        info: ImageInfo::new(
            ISize::new(2000, 2000),
            ColorType::Rgba8888,
            AlphaType::Premultiplied,
        ),
        fill: 180,
    };

    let result = decompress(
        &descriptor,
        ISize::new(500, 500),
        ISize::new(4096, 4096),
        false,
        &allocator,
    )
    .expect("decode succeeds");

    assert_eq!(result.image_info.size, ISize::new(500, 500));
    assert_eq!(result.bitmap.size(), ISize::new(500, 500));
    assert!(result.bitmap.is_immutable());
    // Linear filtering of a uniform image keeps it uniform.
    result
        .bitmap
        .read(|pixels| assert!(pixels.iter().all(|&b| b == 180)));
}

#[test]
fn codec_preferred_size_matching_target_skips_resample() {
    let allocator = SoftAllocator::new();
    let descriptor = HalvingCodecDescriptor {
        info: ImageInfo::new(
            ISize::new(1000, 1000),
            ColorType::Rgba8888,
            AlphaType::Premultiplied,
        ),
        fill: 99,
    };

    let result = decompress(
        &descriptor,
        ISize::new(500, 500),
        ISize::new(4096, 4096),
        false,
        &allocator,
    )
    .expect("decode succeeds");

    assert_eq!(result.bitmap.size(), ISize::new(500, 500));
    result
        .bitmap
        .read(|pixels| assert!(pixels.iter().all(|&b| b == 99)));
}

#[test]
fn f32_source_degrades_to_f16() {
    let size = ISize::new(8, 8);
    let info = ImageInfo::new(size, ColorType::RgbaF32, AlphaType::Unpremultiplied);
    let row_bytes = info.min_row_bytes();
    let mut data = vec![0u8; row_bytes * 8];
    for chunk in data.chunks_exact_mut(4) {
        chunk.copy_from_slice(&1.0f32.to_ne_bytes());
    }
    let descriptor = RawDescriptor {
        info,
        row_bytes,
        data,
    };

    let allocator = SoftAllocator::new();
    let result = decompress(
        &descriptor,
        ISize::new(0, 0),
        ISize::new(4096, 4096),
        false,
        &allocator,
    )
    .expect("decode succeeds");

    assert_eq!(result.image_info.color_type, ColorType::RgbaF16);
    assert_eq!(
        result.image_info.color_type.to_pixel_format(),
        Some(PixelFormat::R16G16B16A16Float)
    );
    assert_eq!(result.bitmap.size(), size);
    assert!(result.bitmap.is_immutable());
    // 1.0f32 narrows to the half-precision bit pattern 0x3c00.
    result.bitmap.read(|pixels| {
        let half = u16::from_ne_bytes([pixels[0], pixels[1]]);
        assert_eq!(half, 0x3c00);
    });
}

#[test]
fn zero_target_clamps_to_max_texture_size() {
    let allocator = SoftAllocator::new();
    let descriptor = RawDescriptor::rgba8(ISize::new(8, 8), 50);

    let result = decompress(
        &descriptor,
        ISize::new(0, 0),
        ISize::new(4, 4),
        false,
        &allocator,
    )
    .expect("decode succeeds");

    assert_eq!(result.bitmap.size(), ISize::new(4, 4));
}

#[test]
fn uncompressed_copy_preserves_pixels_and_freezes_them() {
    let allocator = SoftAllocator::new();
    let descriptor = RawDescriptor::rgba8(ISize::new(16, 16), 123);

    let result = decompress(
        &descriptor,
        ISize::new(16, 16),
        ISize::new(4096, 4096),
        false,
        &allocator,
    )
    .expect("decode succeeds");

    assert!(result.bitmap.is_immutable());
    assert!(result.bitmap.write(|_| ()).is_err());
    result
        .bitmap
        .read(|pixels| assert!(pixels.iter().all(|&b| b == 123)));
}

#[test]
fn wide_gamut_opaque_source_selects_extended_range_format() {
    let allocator = SoftAllocator::new();
    let descriptor = HalvingCodecDescriptor {
        info: ImageInfo::new(ISize::new(32, 32), ColorType::Rgba8888, AlphaType::Opaque)
            .with_color_space(Some(ColorSpace::display_p3())),
        fill: 10,
    };

    let result = decompress(
        &descriptor,
        ISize::new(32, 32),
        ISize::new(4096, 4096),
        true,
        &allocator,
    )
    .expect("decode succeeds");
    assert_eq!(result.image_info.color_type, ColorType::Bgr101010Xr);
    assert_eq!(result.image_info.color_space, Some(ColorSpace::srgb()));

    // The same source without platform support stays 8-bit.
    let result = decompress(
        &descriptor,
        ISize::new(32, 32),
        ISize::new(4096, 4096),
        false,
        &allocator,
    )
    .expect("decode succeeds");
    assert_eq!(result.image_info.color_type, ColorType::Rgba8888);
}

#[test]
fn invalid_descriptor_dimensions_decode_to_none() {
    let allocator = SoftAllocator::new();
    let descriptor = RawDescriptor::rgba8(ISize::new(0, 0), 0);
    assert!(decompress(
        &descriptor,
        ISize::new(16, 16),
        ISize::new(4096, 4096),
        false,
        &allocator,
    )
    .is_none());
}

#[test]
fn unconvertible_source_decodes_to_none() {
    // Alpha8 raw bytes would need an A8 -> RGBA8 expansion the decoder
    // does not implement; it must fail cleanly rather than misread.
    let allocator = SoftAllocator::new();
    let info = ImageInfo::new(ISize::new(4, 4), ColorType::Alpha8, AlphaType::Premultiplied);
    let descriptor = RawDescriptor {
        info,
        row_bytes: 4,
        data: vec![255; 16],
    };
    assert!(decompress(
        &descriptor,
        ISize::new(4, 4),
        ISize::new(4096, 4096),
        false,
        &allocator,
    )
    .is_none());
}
