//! Aggregate quality metrics folded during scoring.
//!
//! One accumulator is allocated per partition task; per-row results are
//! folded in with [`MetricAccumulator::fold_row`], partitions are merged
//! with the associative, commutative [`MetricAccumulator::combine`], and a
//! single-threaded [`MetricAccumulator::finish`] computes the derived rates
//! and materializes the final [`MetricArtifact`].

use serde::{Deserialize, Serialize};

use crate::model::ModelCategory;

/// Identity of a metric artifact: one per (model, scored dataset) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricKey(pub String);

impl MetricKey {
    /// Derive the artifact identity from a model key and the content
    /// checksum of the scored dataset.
    pub fn derive(model_key: &str, frame_checksum: u64) -> Self {
        Self(format!("{model_key}@{frame_checksum:016x}"))
    }
}

impl std::fmt::Display for MetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification quality summary.
///
/// The confusion matrix is indexed `[actual][predicted]` over the prediction
/// domain (union of train and test classes, train levels first).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub domain: Vec<String>,
    pub confusion_matrix: Vec<Vec<u64>>,
    pub rows_scored: u64,
    pub errors: u64,
    pub error_rate: f64,
}

/// Regression quality summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub rows_scored: u64,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
}

/// Clustering summary: assignment counts per cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusteringMetrics {
    pub rows_scored: u64,
    pub cluster_sizes: Vec<u64>,
}

/// Category-specific metric payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPayload {
    Classification(ClassificationMetrics),
    Regression(RegressionMetrics),
    Clustering(ClusteringMetrics),
}

/// An aggregate quality summary for one scored dataset and one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricArtifact {
    pub key: MetricKey,
    pub model_key: String,
    pub frame_checksum: u64,
    pub category: ModelCategory,
    pub payload: MetricPayload,
}

impl MetricArtifact {
    /// JSON rendering for reporting.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).expect("metric artifact is always serializable")
    }
}

/// Running accumulator for one partition of a scoring pass.
///
/// `combine` must satisfy `combine(combine(a, b), c) == combine(a,
/// combine(b, c))` and be order-insensitive, since partition processing
/// order is not guaranteed. Every variant here only adds counts and sums, so
/// both properties hold.
#[derive(Debug, Clone)]
pub enum MetricAccumulator {
    Classification {
        domain: Vec<String>,
        confusion: Vec<Vec<u64>>,
        rows: u64,
        errors: u64,
    },
    Regression {
        rows: u64,
        sse: f64,
        sae: f64,
    },
    Clustering {
        rows: u64,
        sizes: Vec<u64>,
    },
}

impl MetricAccumulator {
    /// Factory keyed by the model's prediction category.
    ///
    /// Classification needs the prediction domain (union of train and test
    /// classes) so extra test-only classes still get confusion-matrix
    /// accounting. Returns `None` for categories with no accumulator.
    pub fn for_category(category: ModelCategory, domain: Option<&[String]>) -> Option<Self> {
        match category {
            ModelCategory::Binomial | ModelCategory::Multinomial => {
                let domain = domain?.to_vec();
                let n = domain.len();
                Some(Self::Classification {
                    domain,
                    confusion: vec![vec![0; n]; n],
                    rows: 0,
                    errors: 0,
                })
            }
            ModelCategory::Regression => Some(Self::Regression {
                rows: 0,
                sse: 0.0,
                sae: 0.0,
            }),
            ModelCategory::Clustering => Some(Self::Clustering {
                rows: 0,
                sizes: Vec::new(),
            }),
            ModelCategory::Unknown => None,
        }
    }

    /// Fold one row's `(prediction, actual)` pair into the accumulator.
    ///
    /// `preds[0]` is the predicted class index (or value); `actual` is empty
    /// for unsupervised scoring and rows with a missing response are skipped
    /// rather than counted.
    pub fn fold_row(&mut self, preds: &[f64], actual: &[f64]) {
        match self {
            Self::Classification {
                confusion,
                rows,
                errors,
                ..
            } => {
                let Some(&act) = actual.first() else { return };
                if act.is_nan() || preds[0].is_nan() {
                    return;
                }
                let a = act as usize;
                let p = preds[0] as usize;
                confusion[a][p] += 1;
                *rows += 1;
                if a != p {
                    *errors += 1;
                }
            }
            Self::Regression { rows, sse, sae } => {
                let Some(&act) = actual.first() else { return };
                if act.is_nan() || preds[0].is_nan() {
                    return;
                }
                let err = preds[0] - act;
                *sse += err * err;
                *sae += err.abs();
                *rows += 1;
            }
            Self::Clustering { rows, sizes } => {
                if preds[0].is_nan() {
                    return;
                }
                let cluster = preds[0] as usize;
                if sizes.len() <= cluster {
                    sizes.resize(cluster + 1, 0);
                }
                sizes[cluster] += 1;
                *rows += 1;
            }
        }
    }

    /// Merge another partition's accumulator into this one.
    pub fn combine(&mut self, other: Self) {
        match (self, other) {
            (
                Self::Classification {
                    confusion,
                    rows,
                    errors,
                    ..
                },
                Self::Classification {
                    confusion: oc,
                    rows: or,
                    errors: oe,
                    ..
                },
            ) => {
                for (row, orow) in confusion.iter_mut().zip(oc) {
                    for (cell, ocell) in row.iter_mut().zip(orow) {
                        *cell += ocell;
                    }
                }
                *rows += or;
                *errors += oe;
            }
            (
                Self::Regression { rows, sse, sae },
                Self::Regression {
                    rows: or,
                    sse: os,
                    sae: oa,
                },
            ) => {
                *rows += or;
                *sse += os;
                *sae += oa;
            }
            (
                Self::Clustering { rows, sizes },
                Self::Clustering {
                    rows: or,
                    sizes: os,
                },
            ) => {
                if sizes.len() < os.len() {
                    sizes.resize(os.len(), 0);
                }
                for (i, c) in os.into_iter().enumerate() {
                    sizes[i] += c;
                }
                *rows += or;
            }
            _ => unreachable!("accumulators from one scoring pass share a variant"),
        }
    }

    /// Post-aggregation step: compute derived rates and materialize the
    /// artifact. Runs single-threaded after all partitions are merged.
    pub fn finish(
        self,
        model_key: &str,
        frame_checksum: u64,
        category: ModelCategory,
    ) -> MetricArtifact {
        let payload = match self {
            Self::Classification {
                domain,
                confusion,
                rows,
                errors,
            } => MetricPayload::Classification(ClassificationMetrics {
                domain,
                confusion_matrix: confusion,
                rows_scored: rows,
                errors,
                error_rate: if rows == 0 {
                    0.0
                } else {
                    errors as f64 / rows as f64
                },
            }),
            Self::Regression { rows, sse, sae } => {
                let mse = if rows == 0 { 0.0 } else { sse / rows as f64 };
                MetricPayload::Regression(RegressionMetrics {
                    rows_scored: rows,
                    mse,
                    rmse: mse.sqrt(),
                    mae: if rows == 0 { 0.0 } else { sae / rows as f64 },
                })
            }
            Self::Clustering { rows, sizes } => MetricPayload::Clustering(ClusteringMetrics {
                rows_scored: rows,
                cluster_sizes: sizes,
            }),
        };
        MetricArtifact {
            key: MetricKey::derive(model_key, frame_checksum),
            model_key: model_key.to_string(),
            frame_checksum,
            category,
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classification_acc() -> MetricAccumulator {
        MetricAccumulator::for_category(
            ModelCategory::Binomial,
            Some(&["no".to_string(), "yes".to_string()]),
        )
        .unwrap()
    }

    #[test]
    fn test_combine_is_order_insensitive() {
        let rows = [
            ([1.0, 0.2, 0.8], 1.0),
            ([0.0, 0.9, 0.1], 0.0),
            ([1.0, 0.4, 0.6], 0.0),
        ];
        let mut left = classification_acc();
        let mut right = classification_acc();
        left.fold_row(&rows[0].0, &[rows[0].1]);
        right.fold_row(&rows[1].0, &[rows[1].1]);
        right.fold_row(&rows[2].0, &[rows[2].1]);

        let mut ab = left.clone();
        ab.combine(right.clone());
        let mut ba = right;
        ba.combine(left);

        let a = ab.finish("m", 1, ModelCategory::Binomial);
        let b = ba.finish("m", 1, ModelCategory::Binomial);
        match (a.payload, b.payload) {
            (MetricPayload::Classification(x), MetricPayload::Classification(y)) => {
                assert_eq!(x.confusion_matrix, y.confusion_matrix);
                assert_eq!(x.errors, y.errors);
                assert_eq!(x.rows_scored, y.rows_scored);
            }
            _ => panic!("expected classification payloads"),
        }
    }

    #[test]
    fn test_missing_actuals_are_skipped() {
        let mut acc = classification_acc();
        acc.fold_row(&[1.0, 0.2, 0.8], &[f64::NAN]);
        acc.fold_row(&[1.0, 0.2, 0.8], &[]);
        let artifact = acc.finish("m", 1, ModelCategory::Binomial);
        match artifact.payload {
            MetricPayload::Classification(cm) => assert_eq!(cm.rows_scored, 0),
            _ => panic!("expected classification payload"),
        }
    }

    #[test]
    fn test_unknown_category_has_no_accumulator() {
        assert!(MetricAccumulator::for_category(ModelCategory::Unknown, None).is_none());
    }
}
