//! Partition-parallel batch scoring.
//!
//! A scoring pass is a map/reduce over horizontal partitions of an adapted
//! dataset: the map runs per partition (in parallel, one accumulator and one
//! reusable feature buffer per partition task), the reduce merges partition
//! accumulators with the associative combine, and a single-threaded finalize
//! materializes the metric artifact. Map tasks never block on each other;
//! the only synchronization points are the reduce merge and finalize.

use std::ops::Range;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::ScoreError;
use crate::frame::{Column, Frame};
use crate::model::Model;

use super::metrics::{MetricAccumulator, MetricArtifact};

/// Name of the first output column.
pub const PREDICT_COLUMN: &str = "predict";

/// One batch-scoring pass for a model over an adapted dataset.
pub struct ScoreTask<'m> {
    model: &'m Model,
    /// Prediction domain: union of train and test classes, train levels
    /// first. `None` for non-classifiers.
    domain: Option<Vec<String>>,
    /// Output width: 1 for regression/clustering, nclasses + 1 for
    /// classifiers. Sized for the train classes only; extra test classes are
    /// excluded from the emitted distribution but kept in the accumulator.
    npredcols: usize,
}

impl<'m> ScoreTask<'m> {
    /// Set up a pass over a dataset already adapted to the model's schema.
    ///
    /// Fails before any partition work when the model's category has no
    /// metrics accumulator.
    pub fn new(model: &'m Model, adapted: &Frame) -> Result<Self, ScoreError> {
        debug_assert_eq!(model.output().names(), adapted.names());
        let domain = if model.is_classifier() {
            // The adapted response carries the union domain.
            adapted
                .last_col()
                .and_then(|c| c.domain())
                .map(|d| d.to_vec())
        } else {
            None
        };
        let npredcols = if model.is_classifier() {
            model.nclasses() + 1
        } else {
            1
        };
        // Probe the factory up front so an unsupported category aborts
        // before any distributed resources are allocated.
        MetricAccumulator::for_category(model.category(), domain.as_deref())
            .ok_or(ScoreError::UnsupportedCategory(model.category()))?;
        Ok(Self {
            model,
            domain,
            npredcols,
        })
    }

    /// Run the pass: map over `nparts` partitions, reduce, finalize.
    ///
    /// `frame_checksum` is the content checksum of the original (pre-adapt)
    /// dataset and keys the resulting artifact. Returns the predictions
    /// frame and the unregistered artifact; registration is the caller's
    /// last step so an aborted pass leaves no orphaned registration.
    pub fn score_all(
        &self,
        adapted: &Frame,
        frame_checksum: u64,
        nparts: usize,
    ) -> Result<(Frame, MetricArtifact), ScoreError> {
        let ranges = adapted.partition_ranges(nparts);
        tracing::debug!(
            model = self.model.key(),
            rows = adapted.num_rows(),
            partitions = ranges.len(),
            "scoring pass"
        );

        let parts: Vec<(Vec<Vec<f64>>, MetricAccumulator)> = ranges
            .into_par_iter()
            .map(|range| self.map_partition(adapted, range))
            .collect();

        // Reduce: stitch prediction columns in partition order, merge
        // accumulators in any order.
        let mut out: Vec<Vec<f64>> = vec![Vec::with_capacity(adapted.num_rows()); self.npredcols];
        let mut acc = self.make_accumulator();
        for (cols, part_acc) in parts {
            for (dst, src) in out.iter_mut().zip(cols) {
                dst.extend(src);
            }
            acc.combine(part_acc);
        }

        // Finalize: single-threaded post-aggregation.
        let artifact = acc.finish(self.model.key(), frame_checksum, self.model.category());
        Ok((self.output_frame(out), artifact))
    }

    fn make_accumulator(&self) -> MetricAccumulator {
        MetricAccumulator::for_category(self.model.category(), self.domain.as_deref())
            .expect("category checked at task construction")
    }

    /// Map step for one partition: score every row, fold metrics, collect
    /// the first `npredcols` prediction columns.
    fn map_partition(
        &self,
        adapted: &Frame,
        range: Range<usize>,
    ) -> (Vec<Vec<f64>>, MetricAccumulator) {
        let output = self.model.output();
        let nfeatures = output.nfeatures();
        let supervised = output.is_supervised();
        let response_at = adapted.num_cols() - 1;
        // The work buffer is sized for the union of train and test classes;
        // the emitted columns take only the first npredcols entries.
        let work_len = match &self.domain {
            Some(domain) => domain.len() + 1,
            None => 1,
        };

        let mut acc = self.make_accumulator();
        let mut tmp = vec![0.0; nfeatures];
        let mut preds = vec![0.0; work_len];
        let mut cols: Vec<Vec<f64>> = vec![Vec::with_capacity(range.len()); self.npredcols];

        for row in range {
            for (i, slot) in tmp.iter_mut().enumerate() {
                *slot = adapted.col_at(i).at(row);
            }
            preds.fill(0.0);
            self.model.scorer().score_row(&tmp, &mut preds);

            if supervised {
                let actual = adapted.col_at(response_at).at(row);
                acc.fold_row(&preds, std::slice::from_ref(&actual));
            } else {
                acc.fold_row(&preds, &[]);
            }
            for (c, col) in cols.iter_mut().enumerate() {
                col.push(preds[c]);
            }
        }
        (cols, acc)
    }

    /// Build the predictions frame: column 0 is "predict" (carrying the
    /// prediction domain for classifiers), columns 1..=nclasses are named by
    /// the training class levels.
    fn output_frame(&self, mut cols: Vec<Vec<f64>>) -> Frame {
        let mut names = Vec::with_capacity(self.npredcols);
        let mut columns = Vec::with_capacity(self.npredcols);

        names.push(PREDICT_COLUMN.to_string());
        let predict_data = std::mem::take(&mut cols[0]);
        columns.push(Arc::new(match &self.domain {
            Some(domain) => Column::categorical(predict_data, domain.clone()),
            None => Column::numeric(predict_data),
        }));

        if self.npredcols > 1 {
            let class_names = self.model.output().class_names().unwrap_or_default();
            for (i, data) in cols.into_iter().enumerate().skip(1) {
                names.push(class_names[i - 1].clone());
                columns.push(Arc::new(Column::numeric(data)));
            }
        }
        Frame::new(names, columns)
    }
}
