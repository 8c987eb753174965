//! Shared fixtures for integration tests: frame builders and small
//! deterministic scoring models whose exported code mirrors the in-engine
//! arithmetic operation for operation.

#![allow(dead_code)]

use std::sync::Arc;

use ml_score::codegen::float_literal;
use ml_score::{
    Column, ExportError, Frame, FrameKey, Model, ModelCategory, Output, Parameters, ScoringModel,
    SourceBuilder,
};

pub fn numeric(vals: &[f64]) -> Arc<Column> {
    Arc::new(Column::numeric(vals.to_vec()))
}

pub fn categorical(vals: &[f64], levels: &[&str]) -> Arc<Column> {
    Arc::new(Column::categorical(
        vals.to_vec(),
        levels.iter().map(|s| s.to_string()).collect(),
    ))
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Linear regression: intercept plus weighted features, NaN features read
/// as zero.
pub struct LinearScorer {
    pub intercept: f64,
    pub weights: Vec<f64>,
}

impl ScoringModel for LinearScorer {
    fn kind(&self) -> &str {
        "linear"
    }

    fn category(&self) -> ModelCategory {
        ModelCategory::Regression
    }

    fn score_row(&self, data: &[f64], preds: &mut [f64]) {
        let mut acc = self.intercept;
        for (v, w) in data.iter().zip(&self.weights) {
            let x = if v.is_nan() { 0.0 } else { *v };
            acc += w * x;
        }
        preds[0] = acc;
    }

    fn emit_predict_body(&self, sb: &mut SourceBuilder) -> Result<(), ExportError> {
        sb.line(format!("let acc = {};", float_literal(self.intercept)));
        for (i, w) in self.weights.iter().enumerate() {
            sb.line(format!("let x = data[{i}];"));
            sb.line("if x.is_nan() { x = 0.0; }");
            sb.line(format!("acc += {} * x;", float_literal(*w)));
        }
        sb.line("preds[0] = acc;");
        Ok(())
    }
}

/// Two-class classifier on the sign of a linear margin: positive margin
/// predicts the second class with probability 0.75.
pub struct MarginClassifier {
    pub bias: f64,
    pub weights: Vec<f64>,
}

impl ScoringModel for MarginClassifier {
    fn kind(&self) -> &str {
        "margin"
    }

    fn category(&self) -> ModelCategory {
        ModelCategory::Binomial
    }

    fn score_row(&self, data: &[f64], preds: &mut [f64]) {
        let mut margin = self.bias;
        for (v, w) in data.iter().zip(&self.weights) {
            let x = if v.is_nan() { 0.0 } else { *v };
            margin += w * x;
        }
        let p1 = if margin > 0.0 { 0.75 } else { 0.25 };
        preds[1] = 1.0 - p1;
        preds[2] = p1;
        preds[0] = if p1 > 0.5 { 1.0 } else { 0.0 };
    }

    fn emit_predict_body(&self, sb: &mut SourceBuilder) -> Result<(), ExportError> {
        sb.line(format!("let margin = {};", float_literal(self.bias)));
        for (i, w) in self.weights.iter().enumerate() {
            sb.line(format!("let x = data[{i}];"));
            sb.line("if x.is_nan() { x = 0.0; }");
            sb.line(format!("margin += {} * x;", float_literal(*w)));
        }
        sb.line("let p1 = if margin > 0.0 { 0.75 } else { 0.25 };");
        sb.line("preds[1] = 1.0 - p1;");
        sb.line("preds[2] = p1;");
        sb.line("preds[0] = if p1 > 0.5 { 1.0 } else { 0.0 };");
        Ok(())
    }
}

/// Unsupervised assignment to the nearest center by squared distance.
/// Carries no code-export specialization.
pub struct NearestCenter {
    pub centers: Vec<Vec<f64>>,
}

impl ScoringModel for NearestCenter {
    fn kind(&self) -> &str {
        "nearest-center"
    }

    fn category(&self) -> ModelCategory {
        ModelCategory::Clustering
    }

    fn score_row(&self, data: &[f64], preds: &mut [f64]) {
        let mut best = 0usize;
        let mut best_dist = f64::INFINITY;
        for (c, center) in self.centers.iter().enumerate() {
            let mut dist = 0.0;
            for (v, m) in data.iter().zip(center) {
                let x = if v.is_nan() { 0.0 } else { *v };
                let d = x - m;
                dist += d * d;
            }
            if dist < best_dist {
                best = c;
                best_dist = dist;
            }
        }
        preds[0] = best as f64;
    }
}

pub fn linear_model(train: &Frame, intercept: f64, weights: Vec<f64>) -> Model {
    let output = Output::from_training_frame(train, true).unwrap();
    Model::new(
        "linear-test",
        Parameters::new(FrameKey::new("train")),
        output,
        Arc::new(LinearScorer { intercept, weights }),
    )
    .unwrap()
}

pub fn margin_model(train: &Frame, bias: f64, weights: Vec<f64>) -> Model {
    let output = Output::from_training_frame(train, true).unwrap();
    Model::new(
        "margin-test",
        Parameters::new(FrameKey::new("train")),
        output,
        Arc::new(MarginClassifier { bias, weights }),
    )
    .unwrap()
}

pub fn clustering_model(train: &Frame, centers: Vec<Vec<f64>>) -> Model {
    let output = Output::from_training_frame(train, false).unwrap();
    Model::new(
        "cluster-test",
        Parameters::new(FrameKey::new("train")),
        output,
        Arc::new(NearestCenter { centers }),
    )
    .unwrap()
}

/// Classifier training frame: two numeric features and a two-level response.
pub fn classifier_train_frame() -> Frame {
    Frame::new(
        strings(&["f1", "f2", "outcome"]),
        vec![
            numeric(&[0.0, 2.0, 0.0, 2.0]),
            numeric(&[0.0, 0.0, 2.0, 2.0]),
            categorical(&[0.0, 1.0, 1.0, 1.0], &["no", "yes"]),
        ],
    )
}
