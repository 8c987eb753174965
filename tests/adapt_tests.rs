//! Schema reconciliation between a trained model and a scored dataset.

mod common;

use common::{categorical, numeric, strings};
use ml_score::{adapt_test_for_train, AdaptError, Frame};
use pretty_assertions::assert_eq;

#[test]
fn test_fast_path_leaves_compatible_dataset_untouched() {
    let mut test = Frame::new(
        strings(&["age", "sex"]),
        vec![numeric(&[30.0, 40.0]), categorical(&[0.0, 1.0], &["F", "M"])],
    );
    let names = test.names().to_vec();
    let domains = test.domains();
    let before = test.checksum();

    let warns = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true).unwrap();
    assert!(warns.is_empty());
    assert_eq!(test.checksum(), before);
}

#[test]
fn test_probe_mode_reports_missing_column_without_mutation() {
    let names = strings(&["a", "b"]);
    let domains = vec![None, Some(strings(&["u", "v"]))];
    let mut test = Frame::new(strings(&["a"]), vec![numeric(&[1.0, 2.0])]);
    let before = test.checksum();

    let warns = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, false).unwrap();
    assert_eq!(warns.len(), 1);
    assert!(warns[0].contains('b'));
    assert_eq!(test.names(), &strings(&["a"]));
    assert_eq!(test.checksum(), before);
}

#[test]
fn test_expensive_mode_synthesizes_missing_column() {
    let names = strings(&["a", "b"]);
    let domains = vec![None, Some(strings(&["u", "v"]))];
    let mut test = Frame::new(strings(&["a"]), vec![numeric(&[1.0, 2.0])]);

    let warns = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true).unwrap();
    assert_eq!(warns.len(), 1);
    assert_eq!(test.names(), &names);

    let filled = test.col("b").unwrap();
    assert!(filled.data().iter().all(|v| v.is_nan()));
    assert_eq!(filled.domain(), Some(strings(&["u", "v"]).as_slice()));
}

#[test]
fn test_extra_level_is_renumbered_past_trained_prefix() {
    let names = strings(&["c"]);
    let domains = vec![Some(strings(&["x", "y"]))];
    let mut test = Frame::new(
        names.clone(),
        vec![categorical(&[0.0, 1.0, 2.0], &["z", "x", "y"])],
    );

    let warns = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true).unwrap();
    assert_eq!(warns.len(), 1);
    assert!(warns[0].contains('z'));

    let col = test.col("c").unwrap();
    assert_eq!(col.data(), &[2.0, 0.0, 1.0]);
    assert_eq!(col.domain(), Some(strings(&["x", "y", "z"]).as_slice()));
}

#[test]
fn test_reorders_drops_and_remaps_in_one_pass() {
    let names = strings(&["age", "sex"]);
    let domains = vec![None, Some(strings(&["F", "M"]))];
    // Shuffled column order, a column the model never saw, and the same
    // levels encoded in a different order.
    let mut test = Frame::new(
        strings(&["sex", "age", "extra"]),
        vec![
            categorical(&[0.0, 1.0], &["M", "F"]),
            numeric(&[30.0, 40.0]),
            numeric(&[1.0, 2.0]),
        ],
    );

    let warns = adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true).unwrap();
    assert!(warns.is_empty());
    assert_eq!(test.names(), &names);
    assert_eq!(test.col("age").unwrap().data(), &[30.0, 40.0]);

    let sex = test.col("sex").unwrap();
    assert_eq!(sex.data(), &[1.0, 0.0]);
    assert_eq!(sex.domain(), Some(strings(&["F", "M"]).as_slice()));
    assert!(test.find("extra").is_none());
}

#[test]
fn test_no_columns_in_common_fails() {
    let names = strings(&["a"]);
    let domains = vec![None];
    let mut test = Frame::new(strings(&["b"]), vec![numeric(&[1.0])]);
    assert_eq!(
        adapt_test_for_train(&names, &domains, &mut test, f64::NAN, false),
        Err(AdaptError::NoColumnsInCommon)
    );
}

#[test]
fn test_categorical_where_numeric_trained_fails() {
    let names = strings(&["c"]);
    let domains = vec![None];
    let mut test = Frame::new(names.clone(), vec![categorical(&[0.0], &["x"])]);
    assert_eq!(
        adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true),
        Err(AdaptError::TypeMismatch {
            column: "c".to_string(),
            expected: "numeric",
            found: "categorical",
        })
    );
}

#[test]
fn test_numeric_where_categorical_trained_fails() {
    let names = strings(&["c"]);
    let domains = vec![Some(strings(&["x"]))];
    let mut test = Frame::new(names.clone(), vec![numeric(&[0.5])]);
    assert_eq!(
        adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true),
        Err(AdaptError::TypeMismatch {
            column: "c".to_string(),
            expected: "categorical",
            found: "numeric",
        })
    );
}

#[test]
fn test_disjoint_domains_fail() {
    let names = strings(&["c"]);
    let domains = vec![Some(strings(&["x", "y"]))];
    let mut test = Frame::new(names.clone(), vec![categorical(&[0.0], &["q"])]);
    assert_eq!(
        adapt_test_for_train(&names, &domains, &mut test, f64::NAN, true),
        Err(AdaptError::NoSharedLevels("c".to_string()))
    );
}
