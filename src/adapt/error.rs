//! Adaptation error types.

use thiserror::Error;

/// Fatal schema incompatibilities between a trained schema and a dataset.
///
/// None of these are retried automatically; the dataset is left untouched
/// when any of them is raised.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdaptError {
    /// The dataset shares no columns with the trained schema.
    #[error("Dataset has no columns in common with the training schema")]
    NoColumnsInCommon,

    /// A categorical column shares no levels with the trained domain.
    #[error("Column {0} has no levels in common with the trained domain")]
    NoSharedLevels(String),

    /// A column is categorical on one side and numeric on the other.
    #[error("Column {column} is {found} but was {expected} in the training data")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        found: &'static str,
    },
}
