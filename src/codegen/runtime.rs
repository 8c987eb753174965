//! Embedded runtime for generated scoring code.
//!
//! "Generate source, compile it, run it" is isolated behind the
//! [`ScoringRuntime`] trait so the validator does not care what the target
//! language is; the default implementation compiles the emitted Rhai script
//! and calls its `predict` function row by row.
//!
//! Rhai's `Engine` is `!Send + !Sync`, so a compiled scorer is bound to the
//! thread that compiled it. The equivalence replay is single-threaded by
//! design, so one engine per validation run is all that is needed.

use rhai::{Engine, Scope, AST};

use super::conversion::{array_to_floats, floats_to_array};
use super::error::ExportError;

/// Compiles generated source into something that can score rows.
pub trait ScoringRuntime {
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledScorer>, ExportError>;
}

/// A loaded, executable scoring routine.
pub trait CompiledScorer {
    /// Run the routine over one feature row, returning the prediction
    /// vector. `preds_len` is the expected output width; the routine may
    /// return more columns but never fewer.
    fn score_row(&mut self, data: &[f64], preds_len: usize) -> Result<Vec<f64>, ExportError>;
}

/// Rhai-backed [`ScoringRuntime`].
#[derive(Debug, Default)]
pub struct RhaiRuntime;

impl RhaiRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl ScoringRuntime for RhaiRuntime {
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledScorer>, ExportError> {
        let engine = Engine::new();
        let ast = engine
            .compile(source)
            .map_err(|e| ExportError::Compile(e.to_string()))?;
        Ok(Box::new(RhaiScorer { engine, ast }))
    }
}

struct RhaiScorer {
    engine: Engine,
    ast: AST,
}

impl CompiledScorer for RhaiScorer {
    fn score_row(&mut self, data: &[f64], preds_len: usize) -> Result<Vec<f64>, ExportError> {
        // Fresh scope per call: the script's top-level constants are
        // re-evaluated and must not pile up.
        let mut scope = Scope::new();
        let args = (floats_to_array(data), floats_to_array(&vec![0.0; preds_len]));
        let out: rhai::Array = self
            .engine
            .call_fn(&mut scope, &self.ast, "predict", args)
            .map_err(|e| ExportError::Runtime(e.to_string()))?;
        if out.len() < preds_len {
            return Err(ExportError::Malformed(format!(
                "predict returned {} columns, expected {preds_len}",
                out.len()
            )));
        }
        array_to_floats(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_and_score() {
        let source = r#"
fn predict(data, preds) {
    preds[0] = 2.0 * data[0] + data[1];
    preds
}
"#;
        let mut compiled = RhaiRuntime::new().compile(source).unwrap();
        let preds = compiled.score_row(&[3.0, 1.0], 1).unwrap();
        assert_eq!(preds[0], 7.0);
    }

    #[test]
    fn test_compile_error_is_loud() {
        assert!(matches!(
            RhaiRuntime::new().compile("fn predict(").err(),
            Some(ExportError::Compile(_))
        ));
    }

    #[test]
    fn test_missing_predict_fn_is_a_runtime_error() {
        let mut compiled = RhaiRuntime::new().compile("let x = 1;").unwrap();
        assert!(matches!(
            compiled.score_row(&[1.0], 1).err(),
            Some(ExportError::Runtime(_))
        ));
    }
}
