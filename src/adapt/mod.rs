//! Domain adaptation between a trained schema and a to-be-scored dataset
//!
//! Reshapes a dataset in place so downstream scoring can assume the trained
//! column count, column order, and categorical encodings: extra columns are
//! ignored, missing columns are synthesized (warned), and categorical levels
//! are renumbered onto the trained domain with unseen levels appended past
//! the trained prefix (warned).
//!
//! The dataset is only mutated when every trained column resolves; any
//! warning or error in probe mode (`expensive = false`) leaves it untouched
//! so the caller can inspect the messages and retry with `expensive = true`.

mod error;

pub use error::AdaptError;

use std::sync::Arc;

use crate::frame::{Column, Frame};

/// Adapt `test` in place to be compatible with a trained schema.
///
/// `names` and `domains` are the training column names and categorical
/// domains in trained order (the last name is the response column for
/// supervised models). `missing` is the fill value for synthesized columns,
/// usually NaN. With `expensive = false` this is a probe: warnings are
/// collected but no column is synthesized or remapped and `test` is never
/// mutated.
///
/// Returns the warning list; empty means `test` was already compatible or
/// was made compatible without degradation. Numeric columns are accepted
/// without a subtype check (e.g. no distinction between textual and
/// structured numerics) - a known limitation carried over deliberately.
///
/// Columns synthesized here are owned by `test` alone; columns that existed
/// before the call keep their original owners and are never released by this
/// routine.
pub fn adapt_test_for_train(
    names: &[String],
    domains: &[Option<Vec<String>>],
    test: &mut Frame,
    missing: f64,
    expensive: bool,
) -> Result<Vec<String>, AdaptError> {
    // Fast path cutout: already compatible.
    if names == test.names() && domains == test.domains().as_slice() {
        return Ok(Vec::new());
    }

    let mut msgs = Vec::new();
    let mut resolved: Vec<Option<Arc<Column>>> = vec![None; names.len()];
    let mut good = 0usize; // Any matching column names, at all?
    let rows = test.num_rows();

    for (i, name) in names.iter().enumerate() {
        let found = test.col(name).cloned();

        // Trained column missing from the dataset: complain, and in
        // expensive mode fill in with the missing value. The response column
        // of supervised models is synthesized like any other.
        let col = match found {
            Some(col) => Some(col),
            None => {
                msgs.push(format!("Dataset is missing training column {name}"));
                if expensive {
                    let mut con = Column::constant(rows, missing);
                    con.set_domain(domains[i].clone());
                    Some(Arc::new(con))
                } else {
                    None
                }
            }
        };

        if let Some(col) = col {
            match (&domains[i], col.domain()) {
                // Trained categorical: renumber the dataset levels onto the
                // trained domain, unless already identical.
                (Some(train_dom), Some(col_dom)) => {
                    if train_dom.as_slice() == col_dom {
                        resolved[i] = Some(col);
                        good += 1;
                    } else {
                        let (remapped, extra) = remap_levels(name, train_dom, &col)?;
                        if !extra.is_empty() {
                            msgs.push(format!(
                                "Column {name} has levels not trained on: {extra:?}"
                            ));
                        }
                        if expensive {
                            resolved[i] = Some(Arc::new(remapped));
                            good += 1;
                        }
                        // Probe mode: drop the remap, nothing leaks.
                    }
                }
                (Some(_), None) => {
                    return Err(AdaptError::TypeMismatch {
                        column: name.clone(),
                        expected: "categorical",
                        found: "numeric",
                    });
                }
                (None, Some(_)) => {
                    return Err(AdaptError::TypeMismatch {
                        column: name.clone(),
                        expected: "numeric",
                        found: "categorical",
                    });
                }
                // Numeric on both sides: assumed compatible, no subtype check.
                (None, None) => {
                    resolved[i] = Some(col);
                    good += 1;
                }
            }
        }
    }

    if good == 0 {
        return Err(AdaptError::NoColumnsInCommon);
    }
    // Only restructure when every trained column resolved; a partial match
    // leaves the dataset untouched for the caller to inspect the warnings.
    if good == names.len() {
        let columns = resolved.into_iter().map(|c| c.unwrap()).collect();
        test.restructure(names.to_vec(), columns);
    }
    Ok(msgs)
}

/// Renumber a categorical column's level indices onto a trained domain.
///
/// Trained levels keep their trained indices; levels seen only in the
/// dataset are appended past the trained prefix, so the mapping is
/// unambiguous and range checks against the trained class count still catch
/// unseen levels. Returns the remapped column and the list of extra levels.
fn remap_levels(
    name: &str,
    train_dom: &[String],
    col: &Column,
) -> Result<(Column, Vec<String>), AdaptError> {
    let col_dom = col.domain().unwrap();
    let mut extended: Vec<String> = train_dom.to_vec();
    let mut mapping = Vec::with_capacity(col_dom.len());
    let mut extra = Vec::new();
    let mut shared = 0usize;

    for level in col_dom {
        match train_dom.iter().position(|t| t == level) {
            Some(idx) => {
                mapping.push(idx);
                shared += 1;
            }
            None => {
                extended.push(level.clone());
                mapping.push(extended.len() - 1);
                extra.push(level.clone());
            }
        }
    }
    if shared == 0 {
        return Err(AdaptError::NoSharedLevels(name.to_string()));
    }

    let data = col
        .data()
        .iter()
        .map(|&v| {
            if v.is_nan() {
                f64::NAN
            } else {
                mapping[v as usize] as f64
            }
        })
        .collect();
    Ok((Column::categorical(data, extended), extra))
}
