//! Error types shared by the pipeline crates

use crate::pixel::ColorType;
use thiserror::Error;

/// Errors raised while obtaining host or device memory.
#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("device buffer allocation of {size} bytes failed")]
    DeviceBuffer { size: usize },

    #[error("device buffer has no host-visible backing")]
    NotHostVisible,

    #[error("texture allocation of {width}x{height} failed")]
    Texture { width: u32, height: u32 },

    #[error("bitmap dimensions are invalid")]
    InvalidDimensions,

    #[error("bitmap is immutable")]
    Immutable,
}

/// Errors raised while moving pixels into a GPU texture.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("color type {0:?} has no GPU pixel format")]
    UnsupportedPixelFormat(ColorType),

    #[error("could not create command buffer")]
    CommandBuffer,

    #[error("could not create blit pass")]
    BlitPass,

    #[error("blit pass encoding failed")]
    Encode,

    #[error("command buffer submission failed")]
    Submit,

    #[error("buffer row layout cannot back a linear texture")]
    NonLinearLayout,

    #[error("could not copy contents into texture")]
    SetContents,

    #[error(transparent)]
    Allocation(#[from] AllocationError),
}
