//! Deployable model artifacts and their scoring surface
//!
//! A [`Model`] bundles an immutable [`Parameters`] record, the write-once
//! [`Output`] captured from the training dataset's schema, and a
//! model-type-specific [`ScoringModel`] capability object. Scoring a dataset
//! adapts it to the trained schema, runs the partition-parallel scorer, and
//! registers the resulting metric artifact; code export and its equivalence
//! oracle hang off the same object.

pub mod checksum;

pub use checksum::FieldValue;

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::adapt::{adapt_test_for_train, AdaptError};
use crate::codegen::{self, ExportError, ScoringRuntime, SourceBuilder};
use crate::error::ScoreError;
use crate::frame::{Column, Frame, FrameKey, FrameStore, JobId};
use crate::scoring::{MetricArtifact, MetricPayload, MetricsRegistry, ScoreTask};

/// Prediction category of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelCategory {
    Unknown = 0,
    Binomial = 1,
    Multinomial = 2,
    Regression = 3,
    Clustering = 4,
}

impl std::fmt::Display for ModelCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Binomial => "binomial",
            Self::Multinomial => "multinomial",
            Self::Regression => "regression",
            Self::Clustering => "clustering",
        };
        f.write_str(s)
    }
}

/// Training-completion state of a model's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingState {
    Running,
    Done,
    Cancelled,
    Failed,
}

/// Capability interface each concrete model type implements.
///
/// One object per model supplies the row-scoring function, the prediction
/// category, and (optionally) the prediction-formula emission used by code
/// export.
pub trait ScoringModel: Send + Sync {
    /// Short model kind name, used in export provenance and error messages.
    fn kind(&self) -> &str;

    /// Prediction category; drives the metrics accumulator factory and the
    /// output schema.
    fn category(&self) -> ModelCategory;

    /// Score one row. `data` holds the features in trained column order
    /// (missing cells are NaN); the routine fills `preds[0]` with the
    /// predicted class index (or value) and, for classifiers, `preds[1..]`
    /// with the class distribution. Must be total over any row compatible
    /// with the trained schema - a recoverable per-row failure would corrupt
    /// the associative reduction.
    fn score_row(&self, data: &[f64], preds: &mut [f64]);

    /// Emit the body of the standalone `predict` routine, bit-for-bit
    /// equivalent to [`Self::score_row`].
    fn emit_predict_body(&self, _sb: &mut SourceBuilder) -> Result<(), ExportError> {
        Err(ExportError::Unsupported(self.kind().to_string()))
    }
}

/// Immutable model-building configuration.
///
/// Captured before training and never mutated afterwards, which is why the
/// checksum can be computed lazily without caching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    /// Key of the dataset the model is trained on.
    pub train: FrameKey,
    /// Key of the validation dataset, if any.
    pub valid: Option<FrameKey>,
    /// Column names ignored for training.
    pub ignored_columns: Option<Vec<String>>,
    /// Score partially built models on every iteration instead of the
    /// throttled default.
    pub score_each_iteration: bool,
    /// Confusion matrices with more classes than this are suppressed from
    /// reporting.
    pub max_confusion_matrix_size: usize,
    /// Fill value substituted for columns missing during adaptation; NaN
    /// unless the model prefers to preserve sparseness with zero.
    pub missing_columns_type: f64,
    /// Model-specific hyperparameters, checksummed with the fields above.
    pub hyperparams: Vec<(String, FieldValue)>,
}

impl Parameters {
    pub fn new(train: FrameKey) -> Self {
        Self {
            train,
            valid: None,
            ignored_columns: None,
            score_each_iteration: false,
            max_confusion_matrix_size: 20,
            missing_columns_type: f64::NAN,
            hyperparams: Vec::new(),
        }
    }

    pub fn with_valid(mut self, valid: FrameKey) -> Self {
        self.valid = Some(valid);
        self
    }

    pub fn with_hyperparam(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.hyperparams.push((name.into(), value));
        self
    }

    /// Explicit declared list of checksum-relevant fields. Sorted by name
    /// at checksum time, so neither declaration nor insertion order matters.
    pub fn checksum_fields(&self) -> Vec<(String, FieldValue)> {
        let mut fields = vec![
            (
                "train".to_string(),
                FieldValue::Str(self.train.as_str().to_string()),
            ),
            (
                "valid".to_string(),
                FieldValue::OptStr(self.valid.as_ref().map(|k| k.as_str().to_string())),
            ),
            (
                "ignored_columns".to_string(),
                FieldValue::Strings(self.ignored_columns.clone()),
            ),
            (
                "score_each_iteration".to_string(),
                FieldValue::Bool(self.score_each_iteration),
            ),
            (
                "max_confusion_matrix_size".to_string(),
                FieldValue::Int(self.max_confusion_matrix_size as i64),
            ),
            (
                "missing_columns_type".to_string(),
                FieldValue::Real(self.missing_columns_type),
            ),
        ];
        fields.extend(self.hyperparams.iter().cloned());
        fields
    }

    /// Checksum over the declared fields and the referenced datasets.
    pub fn checksum(&self, store: &FrameStore) -> Result<u64, ScoreError> {
        let train = store
            .get(&self.train)
            .ok_or_else(|| ScoreError::FrameNotFound(self.train.clone()))?;
        let factor = match &self.valid {
            Some(key) if *key != self.train => {
                let valid = store
                    .get(key)
                    .ok_or_else(|| ScoreError::FrameNotFound(key.clone()))?;
                train.checksum().wrapping_mul(valid.checksum())
            }
            _ => train
                .checksum()
                .wrapping_mul(checksum::NO_VALID_MULTIPLIER),
        };
        Ok(checksum::checksum_fields(&self.checksum_fields(), factor))
    }

    /// Read-lock the training and validation datasets for a job.
    pub fn read_lock_frames(&self, job: &JobId, store: &FrameStore) -> Result<(), ScoreError> {
        if !store.read_lock(&self.train, job) {
            return Err(ScoreError::FrameNotFound(self.train.clone()));
        }
        if let Some(valid) = &self.valid {
            if *valid != self.train && !store.read_lock(valid, job) {
                store.unlock(&self.train, job);
                return Err(ScoreError::FrameNotFound(valid.clone()));
            }
        }
        Ok(())
    }

    /// Release the locks taken by [`Self::read_lock_frames`].
    pub fn read_unlock_frames(&self, job: &JobId, store: &FrameStore) {
        store.unlock(&self.train, job);
        if let Some(valid) = &self.valid {
            if *valid != self.train {
                store.unlock(valid, job);
            }
        }
    }
}

/// Write-once training output: the data shape the model is valid on.
///
/// Column names and domains are captured once from the training dataset and
/// never mutated afterwards; appending warnings and registering metric
/// artifacts are the only post-construction mutations, both serialized
/// internally.
#[derive(Debug)]
pub struct Output {
    names: Vec<String>,
    domains: Vec<Option<Vec<String>>>,
    supervised: bool,
    state: TrainingState,
    warnings: Mutex<Vec<String>>,
    metrics: MetricsRegistry,
}

impl Output {
    /// Capture the schema of a validated training dataset.
    pub fn from_training_frame(train: &Frame, supervised: bool) -> Result<Self, ScoreError> {
        if train.num_cols() == 0 {
            return Err(ScoreError::InvalidModel(
                "training dataset has no columns".to_string(),
            ));
        }
        if supervised && train.num_cols() < 2 {
            return Err(ScoreError::InvalidModel(
                "supervised training needs features and a response column".to_string(),
            ));
        }
        Ok(Self {
            names: train.names().to_vec(),
            domains: train.domains(),
            supervised,
            state: TrainingState::Done,
            warnings: Mutex::new(Vec::new()),
            metrics: MetricsRegistry::new(),
        })
    }

    /// Column names in trained order; the last one is the response column
    /// for supervised models.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Per-column categorical domains, `None` for numeric columns.
    pub fn domains(&self) -> Vec<Option<Vec<String>>> {
        self.domains.clone()
    }

    pub fn is_supervised(&self) -> bool {
        self.supervised
    }

    /// Number of input features (excludes the response for supervised
    /// models).
    pub fn nfeatures(&self) -> usize {
        self.names.len() - usize::from(self.supervised)
    }

    /// The response column name, or `None` for unsupervised models.
    pub fn response_name(&self) -> Option<&str> {
        self.supervised
            .then(|| self.names.last().unwrap().as_str())
    }

    /// The levels of a categorical response column.
    pub fn class_names(&self) -> Option<&[String]> {
        if !self.supervised {
            return None;
        }
        self.domains.last().and_then(|d| d.as_deref())
    }

    pub fn is_classifier(&self) -> bool {
        self.class_names().is_some()
    }

    pub fn nclasses(&self) -> usize {
        self.class_names().map_or(1, |c| c.len())
    }

    pub fn state(&self) -> TrainingState {
        self.state
    }

    pub fn set_state(&mut self, state: TrainingState) {
        self.state = state;
    }

    /// Append a warning accumulated during output construction or scoring.
    pub fn add_warning(&self, msg: impl Into<String>) {
        self.warnings.lock().unwrap().push(msg.into());
    }

    pub fn warnings(&self) -> Vec<String> {
        self.warnings.lock().unwrap().clone()
    }

    /// The per-model metric artifact registry.
    pub fn metrics(&self) -> &MetricsRegistry {
        &self.metrics
    }

    /// Checksum over the captured schema and prediction category.
    pub fn checksum_impl(&self, category: ModelCategory) -> u64 {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        for name in &self.names {
            hasher.update((name.len() as u64).to_le_bytes());
            hasher.update(name.as_bytes());
        }
        for dom in &self.domains {
            match dom {
                None => hasher.update([0u8]),
                Some(levels) => {
                    hasher.update([1u8]);
                    for level in levels {
                        hasher.update((level.len() as u64).to_le_bytes());
                        hasher.update(level.as_bytes());
                    }
                }
            }
        }
        let digest = hasher.finalize();
        let schema = u64::from_le_bytes(digest[..8].try_into().unwrap());
        schema.wrapping_mul(category as u64 | 1)
    }
}

/// A deployable, versioned model artifact.
///
/// Read-only during scoring: `Parameters` and the captured schema are
/// immutable for the duration of any call; only the warning list and the
/// metric registry mutate, each behind its own lock.
pub struct Model {
    key: String,
    parms: Parameters,
    output: Output,
    scorer: Arc<dyn ScoringModel>,
}

impl Model {
    /// Assemble a model, checking that the scorer's category is consistent
    /// with the captured output schema.
    pub fn new(
        key: impl Into<String>,
        parms: Parameters,
        output: Output,
        scorer: Arc<dyn ScoringModel>,
    ) -> Result<Self, ScoreError> {
        let category = scorer.category();
        let ok = match category {
            ModelCategory::Binomial => output.is_classifier() && output.nclasses() == 2,
            ModelCategory::Multinomial => output.is_classifier() && output.nclasses() > 2,
            ModelCategory::Regression => output.is_supervised() && !output.is_classifier(),
            ModelCategory::Clustering => !output.is_supervised(),
            ModelCategory::Unknown => false,
        };
        if !ok {
            return Err(ScoreError::InvalidModel(format!(
                "category {category} does not match the trained schema"
            )));
        }
        Ok(Self {
            key: key.into(),
            parms,
            output,
            scorer,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn parms(&self) -> &Parameters {
        &self.parms
    }

    pub fn output(&self) -> &Output {
        &self.output
    }

    pub fn scorer(&self) -> &Arc<dyn ScoringModel> {
        &self.scorer
    }

    pub fn category(&self) -> ModelCategory {
        self.scorer.category()
    }

    pub fn is_supervised(&self) -> bool {
        self.output.is_supervised()
    }

    pub fn is_classifier(&self) -> bool {
        self.output.is_classifier()
    }

    pub fn nclasses(&self) -> usize {
        self.output.nclasses()
    }

    /// Adapt a dataset in place to this model's trained schema.
    pub fn adapt_test_for_train(
        &self,
        test: &mut Frame,
        expensive: bool,
    ) -> Result<Vec<String>, AdaptError> {
        adapt_test_for_train(
            self.output.names(),
            &self.output.domains(),
            test,
            self.parms.missing_columns_type,
            expensive,
        )
    }

    /// Bulk score a dataset: pure prediction, no response column required.
    ///
    /// Column 0 of the result is "predict"; classifiers add one distribution
    /// column per training class.
    pub fn score(&self, fr: &Frame) -> Result<Frame, ScoreError> {
        Ok(self.score_with_metrics(fr)?.0)
    }

    /// Bulk score a dataset and return the aggregate metric artifact along
    /// with the predictions.
    ///
    /// The adapted copy's lifetime is scoped to this call: columns
    /// synthesized or remapped during adaptation are released on return,
    /// while columns shared with `fr` stay owned by the caller. A schema
    /// failure aborts before any partition work; the artifact is registered
    /// only after a successful finalize.
    pub fn score_with_metrics(
        &self,
        fr: &Frame,
    ) -> Result<(Frame, Arc<MetricArtifact>), ScoreError> {
        let mut adapted = fr.clone();
        let warns = self.adapt_test_for_train(&mut adapted, true)?;
        for w in &warns {
            tracing::warn!(model = self.key.as_str(), "{w}");
        }

        let nparts = adapted
            .num_rows()
            .max(1)
            .min(rayon::current_num_threads().max(1));
        let task = ScoreTask::new(self, &adapted)?;
        let (mut preds, artifact) = task.score_all(&adapted, fr.checksum(), nparts)?;
        let artifact = self.output.metrics.register(artifact);
        self.log_confusion_matrix(&artifact);

        // Presentation only: map prediction labels back into the scored
        // dataset's response domain. The counts inside the artifact are
        // final at this point and stay untouched.
        self.remap_prediction_labels(fr, &mut preds);
        Ok((preds, artifact))
    }

    /// Deterministic identity over configuration and trained schema.
    pub fn checksum(&self, store: &FrameStore) -> Result<u64, ScoreError> {
        let parms = self.parms.checksum(store)?;
        Ok(parms.wrapping_mul(self.output.checksum_impl(self.category())))
    }

    /// Emit a standalone source representation of this model.
    pub fn export_code(&self) -> Result<String, ExportError> {
        codegen::emit(self)
    }

    /// Prove the exported code scores identically to the engine by
    /// replaying it against previously stored predictions.
    pub fn validate_export(
        &self,
        data: &Frame,
        predictions: &Frame,
        runtime: &dyn ScoringRuntime,
    ) -> Result<bool, ScoreError> {
        codegen::validate_export(self, data, predictions, runtime)
    }

    /// Add a free-text warning to the model output.
    pub fn add_warning(&self, msg: impl Into<String>) {
        self.output.add_warning(msg);
    }

    /// Release every metric artifact referenced by this model.
    pub fn teardown(&self) -> usize {
        self.output.metrics.teardown()
    }

    fn log_confusion_matrix(&self, artifact: &MetricArtifact) {
        if let MetricPayload::Classification(cm) = &artifact.payload {
            if cm.domain.len() <= self.parms.max_confusion_matrix_size {
                tracing::info!(
                    model = self.key.as_str(),
                    domain = ?cm.domain,
                    matrix = ?cm.confusion_matrix,
                    error_rate = cm.error_rate,
                    "confusion matrix"
                );
            }
        }
    }

    fn remap_prediction_labels(&self, original: &Frame, preds: &mut Frame) {
        if !self.is_classifier() {
            return;
        }
        let Some(response) = self.output.response_name() else {
            return;
        };
        // Predict-only datasets carry no actual response; nothing to map.
        let Some(actual) = original.col(response) else {
            return;
        };
        let Some(sdomain) = actual.domain() else {
            return;
        };
        let Some(mdomain) = preds.col_at(0).domain().map(|d| d.to_vec()) else {
            return;
        };
        if sdomain == mdomain.as_slice() {
            return;
        }

        let mut target: Vec<String> = sdomain.to_vec();
        let map: Vec<usize> = mdomain
            .iter()
            .map(|lvl| match target.iter().position(|t| t == lvl) {
                Some(i) => i,
                None => {
                    target.push(lvl.clone());
                    target.len() - 1
                }
            })
            .collect();
        let data: Vec<f64> = preds
            .col_at(0)
            .data()
            .iter()
            .map(|&v| if v.is_nan() { f64::NAN } else { map[v as usize] as f64 })
            .collect();
        preds.replace(0, Arc::new(Column::categorical(data, target)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_captures_schema_once() {
        let train = Frame::new(
            vec!["age".into(), "sex".into()],
            vec![
                Arc::new(Column::numeric(vec![30.0, 40.0])),
                Arc::new(Column::categorical(
                    vec![0.0, 1.0],
                    vec!["F".into(), "M".into()],
                )),
            ],
        );
        let output = Output::from_training_frame(&train, true).unwrap();
        assert_eq!(output.nfeatures(), 1);
        assert_eq!(output.response_name(), Some("sex"));
        assert!(output.is_classifier());
        assert_eq!(output.nclasses(), 2);
    }

    #[test]
    fn test_output_rejects_empty_training_frame() {
        let empty = Frame::default();
        assert!(Output::from_training_frame(&empty, false).is_err());
    }

    #[test]
    fn test_warnings_are_append_only() {
        let train = Frame::new(
            vec!["x".into()],
            vec![Arc::new(Column::numeric(vec![1.0]))],
        );
        let output = Output::from_training_frame(&train, false).unwrap();
        output.add_warning("first");
        output.add_warning("second");
        assert_eq!(output.warnings(), vec!["first", "second"]);
    }
}
