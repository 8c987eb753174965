//! Conversion helpers between f64 slices and Rhai Dynamic values.
//!
//! Prediction vectors cross the interpreter boundary as Rhai arrays; these
//! helpers convert both ways. Script arithmetic may legitimately produce
//! integers (e.g. a class index), so numbers convert from either dynamic
//! representation.

use rhai::{Array, Dynamic};

use super::error::ExportError;

/// Convert a row of values into a Rhai array.
pub fn floats_to_array(values: &[f64]) -> Array {
    values.iter().map(|&v| Dynamic::from_float(v)).collect()
}

/// Convert one Rhai value back to f64, accepting ints and floats.
pub fn dynamic_to_f64(value: Dynamic) -> Result<f64, ExportError> {
    // `as_float`/`as_int` consume the value.
    let type_name = value.type_name();
    if value.is_float() {
        return value
            .as_float()
            .map_err(|t| ExportError::Malformed(format!("expected a number, got {t}")));
    }
    if let Ok(i) = value.as_int() {
        return Ok(i as f64);
    }
    Err(ExportError::Malformed(format!(
        "expected a number, got {type_name}"
    )))
}

/// Convert a Rhai array back into an f64 vector.
pub fn array_to_floats(values: Array) -> Result<Vec<f64>, ExportError> {
    values.into_iter().map(dynamic_to_f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let values = [1.5, f64::NAN, -3.0];
        let back = array_to_floats(floats_to_array(&values)).unwrap();
        assert_eq!(back[0], 1.5);
        assert!(back[1].is_nan());
        assert_eq!(back[2], -3.0);
    }

    #[test]
    fn test_ints_convert() {
        let arr: Array = vec![Dynamic::from_int(2)];
        assert_eq!(array_to_floats(arr).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_non_numbers_are_rejected() {
        let arr: Array = vec![Dynamic::from("oops")];
        assert!(array_to_floats(arr).is_err());
    }
}
