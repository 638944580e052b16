//! Pixel formats, color types and color-space gamut classification
//!
//! Two vocabularies meet here. [`ColorType`] describes what a decoded
//! bitmap holds; [`PixelFormat`] is what the GPU abstraction can sample.
//! Not every color type has a GPU equivalent — the decoder rejects those
//! up front rather than discovering it at upload time.

use crate::geometry::ISize;

/// Texture formats recognized by the GPU abstraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Single 8-bit alpha/coverage channel.
    A8Unorm,
    /// 8-bit RGBA, non-linear encoded.
    R8G8B8A8Unorm,
    /// Half-float RGBA for wide-gamut content with alpha.
    R16G16B16A16Float,
    /// 10-10-10 extended-range BGR, opaque wide-gamut content.
    B10G10R10Xr,
}

impl PixelFormat {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            PixelFormat::A8Unorm => 1,
            PixelFormat::R8G8B8A8Unorm => 4,
            PixelFormat::R16G16B16A16Float => 8,
            PixelFormat::B10G10R10Xr => 4,
        }
    }
}

/// Storage layout of decoded bitmap pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorType {
    Alpha8,
    Rgba8888,
    RgbaF16,
    RgbaF32,
    Bgr101010Xr,
}

impl ColorType {
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            ColorType::Alpha8 => 1,
            ColorType::Rgba8888 => 4,
            ColorType::RgbaF16 => 8,
            ColorType::RgbaF32 => 16,
            ColorType::Bgr101010Xr => 4,
        }
    }

    /// The GPU pixel format this color type maps onto, if any.
    ///
    /// F32 has no sampled equivalent; the decoder degrades it to F16
    /// before allocation, so seeing `None` here means a caller skipped
    /// the compatibility step.
    pub fn to_pixel_format(&self) -> Option<PixelFormat> {
        match self {
            ColorType::Alpha8 => Some(PixelFormat::A8Unorm),
            ColorType::Rgba8888 => Some(PixelFormat::R8G8B8A8Unorm),
            ColorType::RgbaF16 => Some(PixelFormat::R16G16B16A16Float),
            ColorType::RgbaF32 => None,
            ColorType::Bgr101010Xr => Some(PixelFormat::B10G10R10Xr),
        }
    }
}

/// How alpha is encoded, preserved through decode unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlphaType {
    Opaque,
    Premultiplied,
    Unpremultiplied,
}

/// A color space described by its RGB → XYZ D50 transform.
///
/// Rows are the X, Y and Z component weights; this is the layout the
/// gamut-area test below expects. The area of the triangle spanned by the
/// row chromaticities is a cheap proxy for "wider than sRGB".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSpace {
    to_xyz_d50: [[f32; 3]; 3],
}

/// Gamut-triangle area of sRGB under the row-chromaticity construction.
const SRGB_GAMUT_AREA: f32 = 0.0982;

impl ColorSpace {
    pub const fn from_xyz_d50(to_xyz_d50: [[f32; 3]; 3]) -> Self {
        Self { to_xyz_d50 }
    }

    pub fn srgb() -> Self {
        Self::from_xyz_d50([
            [0.436_065_7, 0.385_151_5, 0.143_078_4],
            [0.222_493_2, 0.716_887, 0.060_619_8],
            [0.013_923_2, 0.097_081_6, 0.714_235_2],
        ])
    }

    pub fn display_p3() -> Self {
        Self::from_xyz_d50([
            [0.515_102, 0.291_965, 0.157_153],
            [0.241_182, 0.692_236, 0.066_583],
            [-0.001_046, 0.041_881, 0.784_378],
        ])
    }

    /// Area of the chromaticity triangle formed by the transform rows.
    pub fn gamut_area(&self) -> f32 {
        let mut xy = [[0.0f32; 2]; 3];
        for (row, out) in self.to_xyz_d50.iter().zip(xy.iter_mut()) {
            let sum = row[0] + row[1] + row[2];
            out[0] = row[0] / sum;
            out[1] = row[1] / sum;
        }
        let (a, b, c) = (xy[0], xy[1], xy[2]);
        0.5 * (a[0] * b[1] + b[0] * c[1] - a[0] * c[1] - c[0] * b[1] - b[0] * a[1]).abs()
    }

    /// Whether this space covers meaningfully more than the sRGB gamut.
    pub fn is_wide_gamut(&self) -> bool {
        self.gamut_area() > SRGB_GAMUT_AREA
    }
}

/// Dimensions plus pixel interpretation for one bitmap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageInfo {
    pub size: ISize,
    pub color_type: ColorType,
    pub alpha_type: AlphaType,
    pub color_space: Option<ColorSpace>,
}

impl ImageInfo {
    pub fn new(size: ISize, color_type: ColorType, alpha_type: AlphaType) -> Self {
        Self {
            size,
            color_type,
            alpha_type,
            color_space: None,
        }
    }

    pub fn with_size(mut self, size: ISize) -> Self {
        self.size = size;
        self
    }

    pub fn with_color_type(mut self, color_type: ColorType) -> Self {
        self.color_type = color_type;
        self
    }

    pub fn with_alpha_type(mut self, alpha_type: AlphaType) -> Self {
        self.alpha_type = alpha_type;
        self
    }

    pub fn with_color_space(mut self, color_space: Option<ColorSpace>) -> Self {
        self.color_space = color_space;
        self
    }

    pub fn bytes_per_pixel(&self) -> usize {
        self.color_type.bytes_per_pixel()
    }

    /// Tightly packed stride for one row.
    pub fn min_row_bytes(&self) -> usize {
        self.size.width as usize * self.bytes_per_pixel()
    }

    pub fn is_valid(&self) -> bool {
        !self.size.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_area_matches_reference_constant() {
        let area = ColorSpace::srgb().gamut_area();
        assert!((area - SRGB_GAMUT_AREA).abs() < 0.001, "area = {area}");
        assert!(!ColorSpace::srgb().is_wide_gamut());
    }

    #[test]
    fn display_p3_is_wide_gamut() {
        let area = ColorSpace::display_p3().gamut_area();
        assert!(area > SRGB_GAMUT_AREA, "area = {area}");
        assert!(ColorSpace::display_p3().is_wide_gamut());
    }

    #[test]
    fn f32_has_no_gpu_format() {
        assert_eq!(ColorType::RgbaF32.to_pixel_format(), None);
        assert_eq!(
            ColorType::RgbaF16.to_pixel_format(),
            Some(PixelFormat::R16G16B16A16Float)
        );
    }

    #[test]
    fn row_bytes_are_tight() {
        let info = ImageInfo::new(ISize::new(10, 4), ColorType::Rgba8888, AlphaType::Opaque);
        assert_eq!(info.min_row_bytes(), 40);
        assert_eq!(
            info.with_color_type(ColorType::Alpha8).min_row_bytes(),
            10
        );
    }
}
