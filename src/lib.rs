//! # ml-score: Model Scoring Core
//!
//! The scoring side of a model-training platform: turns a trained model's
//! learned parameters into predictions over new datasets and guarantees
//! those predictions are reproducible, schema-safe, and exportable as
//! standalone code.
//!
//! ## Components
//!
//! 1. **Domain adaptation** - reconciles a to-be-scored dataset's columns
//!    and categorical encodings against a model's trained schema.
//! 2. **Checksum engine** - deterministic identity over a model's
//!    configuration fields and trained schema, for config-drift detection.
//! 3. **Distributed scorer** - partition-parallel map/reduce that scores
//!    rows and folds aggregate quality metrics in one pass.
//! 4. **Code export + equivalence oracle** - emits a self-contained scoring
//!    script and replays it row-by-row against the in-engine predictions to
//!    prove behavioral identity.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ml_score::{Column, Frame, FrameKey, Model, Output, Parameters, RhaiRuntime};
//!
//! let train = Frame::new(
//!     vec!["age".into(), "income".into()],
//!     vec![
//!         Arc::new(Column::numeric(vec![30.0, 40.0])),
//!         Arc::new(Column::numeric(vec![50.0, 60.0])),
//!     ],
//! );
//! let output = Output::from_training_frame(&train, true)?;
//! let model = Model::new("my-model", Parameters::new(FrameKey::new("train")),
//!                        output, Arc::new(my_scorer))?;
//!
//! let predictions = model.score(&test_frame)?;
//! let source = model.export_code()?;
//! assert!(model.validate_export(&test_frame, &predictions, &RhaiRuntime::new())?);
//! ```

pub mod adapt;
pub mod codegen;
pub mod error;
pub mod frame;
pub mod model;
pub mod scoring;

pub use adapt::{adapt_test_for_train, AdaptError};
pub use codegen::{CompiledScorer, ExportError, RhaiRuntime, ScoringRuntime, SourceBuilder};
pub use error::{Result, ScoreError};
pub use frame::{Column, Frame, FrameKey, FrameStore, JobId};
pub use model::{
    FieldValue, Model, ModelCategory, Output, Parameters, ScoringModel, TrainingState,
};
pub use scoring::{
    MetricArtifact, MetricKey, MetricPayload, MetricsRegistry, ScoreTask, PREDICT_COLUMN,
};
