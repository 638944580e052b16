//! Error types for atlas construction

use thiserror::Error;

use tessera_core::error::{AllocationError, UploadError};

pub type Result<T> = std::result::Result<T, AtlasError>;

/// Why an atlas build could not complete.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("no atlas up to {max}x{max} can fit {count} glyphs")]
    PackingImpossible { count: usize, max: u32 },

    #[error("glyph rasterization failed")]
    Rasterization,

    #[error("atlas context is missing its bitmap")]
    MissingBitmap,

    #[error("atlas is missing its texture")]
    MissingTexture,

    #[error("placement count diverged from pair count")]
    PlacementMismatch,

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    #[error(transparent)]
    Upload(#[from] UploadError),
}
