//! Top-level error type for scoring operations.

use thiserror::Error;

use crate::adapt::AdaptError;
use crate::codegen::ExportError;
use crate::frame::FrameKey;
use crate::model::ModelCategory;

/// Result type for scoring operations.
pub type Result<T> = std::result::Result<T, ScoreError>;

/// Errors that can occur while scoring, checksumming, or exporting a model.
#[derive(Error, Debug)]
pub enum ScoreError {
    /// The dataset cannot be reconciled with the trained schema. Always
    /// fatal to the call; never retried automatically.
    #[error(transparent)]
    Schema(#[from] AdaptError),

    /// Code export or generated-code execution failed.
    #[error(transparent)]
    Export(#[from] ExportError),

    /// A referenced dataset is not present in the store.
    #[error("Frame not found: {0}")]
    FrameNotFound(FrameKey),

    /// No metrics accumulator exists for the model's category.
    #[error("Cannot build a metrics accumulator for model category {0}")]
    UnsupportedCategory(ModelCategory),

    /// The model's parts are inconsistent with each other.
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Export validation was invoked with mismatched inputs.
    #[error("Validation failed: {0}")]
    Validation(String),
}
