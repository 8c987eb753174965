//! Code export error types.

use thiserror::Error;

/// Errors raised while exporting or executing generated scoring code.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The model type supplies no prediction-formula emission.
    #[error("This model type does not support code export: {0}")]
    Unsupported(String),

    /// The generated source failed to compile.
    #[error("Generated code failed to compile: {0}")]
    Compile(String),

    /// The generated routine failed while executing.
    #[error("Generated code failed at runtime: {0}")]
    Runtime(String),

    /// The generated routine returned something other than a prediction
    /// vector of the expected shape.
    #[error("Generated code returned a malformed prediction: {0}")]
    Malformed(String),
}
