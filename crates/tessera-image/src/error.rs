//! Error types for the decode pipeline

use thiserror::Error;

use tessera_core::error::{AllocationError, UploadError};
use tessera_core::pixel::ColorType;

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Why a decode request produced no image.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("descriptor is missing or has invalid dimensions")]
    InvalidDescriptor,

    #[error("color type {0:?} has no GPU pixel format")]
    UnsupportedPixelFormat(ColorType),

    #[error("codec could not decompress the image")]
    DecompressFailed,

    #[error("pixel conversion from {from:?} to {to:?} is not supported")]
    ConversionUnsupported { from: ColorType, to: ColorType },

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}
