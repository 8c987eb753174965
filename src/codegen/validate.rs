//! Equivalence oracle for exported scoring code.
//!
//! Replays the generated routine row-by-row against predictions previously
//! produced by the in-engine scorer and reports whether the two agree on
//! every output column. Failures to generate, compile, or load the code are
//! loud errors; only row-level prediction mismatches report `false`.

use crate::adapt::adapt_test_for_train;
use crate::error::ScoreError;
use crate::frame::Frame;
use crate::model::Model;

use super::runtime::ScoringRuntime;

/// Divergence evidence threshold: stop replaying after this many
/// mismatching cells rather than scanning a failing run to completion.
const MAX_MISMATCHES: usize = 10;

/// Validate the exported code for `model` against stored engine predictions.
///
/// `data` is the original (pre-adapt) dataset that produced `predictions`.
/// A defensive copy is adapted exactly like the scoring path, so transient
/// columns created here live only for the duration of the call and are
/// released on every exit path, including the mismatch short-circuit.
pub fn validate_export(
    model: &Model,
    data: &Frame,
    predictions: &Frame,
    runtime: &dyn ScoringRuntime,
) -> Result<bool, ScoreError> {
    if data.num_rows() != predictions.num_rows() {
        return Err(ScoreError::Validation(format!(
            "predictions have {} rows, dataset has {}",
            predictions.num_rows(),
            data.num_rows()
        )));
    }

    let output = model.output();
    let mut fr = data.clone();
    let warns = adapt_test_for_train(
        output.names(),
        &output.domains(),
        &mut fr,
        model.parms().missing_columns_type,
        true,
    )?;
    for w in &warns {
        tracing::warn!(model = model.key(), "{w}");
    }

    // The stored predictions may have been remapped into the scored
    // dataset's label space; build the same index remap so both sides
    // compare in that space.
    let omap = if output.is_classifier() {
        let mdomain = fr
            .last_col()
            .and_then(|c| c.domain())
            .map(|d| d.to_vec())
            .unwrap_or_default();
        let pdomain = predictions.col_at(0).domain().unwrap_or_default();
        if pdomain != mdomain.as_slice() {
            Some(label_remap(&mdomain, pdomain))
        } else {
            None
        }
    } else {
        None
    };

    let source = super::emit(model)?;
    let mut compiled = runtime.compile(&source)?;

    let nfeatures = output.nfeatures();
    let preds_len = predictions.num_cols();
    let mut features = vec![0.0; nfeatures];
    let mut miss = 0usize;

    // Single-threaded replay, every output column of every row.
    for row in 0..fr.num_rows() {
        for (i, slot) in features.iter_mut().enumerate() {
            *slot = fr.col_at(i).at(row);
        }
        let got = compiled.score_row(&features, preds_len)?;
        for col in 0..preds_len {
            let stored = predictions.col_at(col).at(row);
            let mut generated = got[col];
            if col == 0 {
                if let Some(map) = &omap {
                    generated = map
                        .get(generated as usize)
                        .copied()
                        .map_or(f64::NAN, |i| i as f64);
                }
            }
            if generated != stored {
                tracing::warn!(
                    row,
                    column = predictions.names()[col].as_str(),
                    engine = stored,
                    generated,
                    "prediction mismatch"
                );
                miss += 1;
                if miss > MAX_MISMATCHES {
                    return Ok(false);
                }
            }
        }
    }
    Ok(miss == 0)
}

/// Index remap from one label space to another: `remap[i]` is the position
/// of `from[i]` inside `to`, or `usize::MAX` when the label is absent
/// (compares as a mismatch, never a false agreement).
fn label_remap(from: &[String], to: &[String]) -> Vec<usize> {
    from.iter()
        .map(|lvl| {
            to.iter()
                .position(|t| t == lvl)
                .unwrap_or(usize::MAX)
        })
        .collect()
}
