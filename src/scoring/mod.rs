//! Distributed batch scoring and metrics aggregation
//!
//! The scoring pass streams dataset partitions through a model's row scorer
//! and folds per-row results into aggregate metric artifacts in the same
//! pass; the registry tracks artifact ownership per model for lifecycle
//! cleanup.

pub mod metrics;
pub mod registry;
pub mod task;

pub use metrics::{
    ClassificationMetrics, ClusteringMetrics, MetricAccumulator, MetricArtifact, MetricKey,
    MetricPayload, RegressionMetrics,
};
pub use registry::MetricsRegistry;
pub use task::{ScoreTask, PREDICT_COLUMN};
