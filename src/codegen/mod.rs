//! Standalone source export for trained models
//!
//! Emits a self-contained Rhai script carrying the model's schema tables and
//! a `predict(data, preds)` routine semantically equivalent to the in-engine
//! row scorer: same column order, same missing-feature handling, same
//! prediction layout (`preds[0]` = class index or value, `preds[1..]` =
//! class distribution for classifiers). The prediction formula itself comes
//! from the model type; the generic path fails explicitly when no
//! specialization exists.

pub mod conversion;
mod error;
pub mod runtime;
pub mod validate;

pub use error::ExportError;
pub use runtime::{CompiledScorer, RhaiRuntime, ScoringRuntime};
pub use validate::validate_export;

use chrono::Utc;

use crate::model::Model;

/// Indented source-text builder for code emission.
#[derive(Debug, Default)]
pub struct SourceBuilder {
    buf: String,
    indent: usize,
}

impl SourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line at the current indent.
    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        for _ in 0..self.indent {
            self.buf.push_str("    ");
        }
        self.buf.push_str(text.as_ref());
        self.buf.push('\n');
        self
    }

    /// Append an empty line.
    pub fn blank(&mut self) -> &mut Self {
        self.buf.push('\n');
        self
    }

    pub fn indent(&mut self) -> &mut Self {
        self.indent += 1;
        self
    }

    pub fn dedent(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

/// Render an f64 so the interpreter parses it back bit-for-bit as a float.
///
/// `{:?}` keeps a decimal point on integral values (a bare `1` would parse
/// as an int) and prints the shortest digits that round-trip.
pub fn float_literal(value: f64) -> String {
    if value.is_nan() {
        // No NaN literal in the target language.
        "(0.0 / 0.0)".to_string()
    } else if value == f64::INFINITY {
        "(1.0 / 0.0)".to_string()
    } else if value == f64::NEG_INFINITY {
        "(-1.0 / 0.0)".to_string()
    } else {
        format!("{value:?}")
    }
}

fn string_literal(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn string_table(items: &[String]) -> String {
    let quoted: Vec<String> = items.iter().map(|s| string_literal(s)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Emit the standalone scoring source for a model.
///
/// Layout, in fixed order: provenance header (informational only), `NAMES`
/// (feature columns), `NCLASSES` for classifiers, one `DOMAIN_<i>` constant
/// per categorical column referenced by the `DOMAINS` table in trained
/// column order, then the `predict` routine.
pub fn emit(model: &Model) -> Result<String, ExportError> {
    let output = model.output();
    let names = output.names();
    let domains = output.domains();
    let mut sb = SourceBuilder::new();

    sb.line(format!(
        "// Standalone scoring routine for {} model \"{}\"",
        model.scorer().kind(),
        model.key()
    ));
    sb.line(format!(
        "// Generated {} by {} {}",
        Utc::now().to_rfc3339(),
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    sb.line("//");
    sb.line("// predict(data, preds): data holds one row in training column order;");
    sb.line("// preds[0] is the predicted class index (or value for regression),");
    sb.line("// preds[1..] the class distribution for classifiers.");
    sb.blank();

    let feature_names = &names[..output.nfeatures()];
    sb.line(format!(
        "const NAMES = {};",
        string_table(feature_names)
    ));
    if output.is_classifier() {
        sb.line(format!("const NCLASSES = {};", output.nclasses()));
    }
    sb.blank();

    // One auxiliary constant per categorical column, referenced by the main
    // table below. The last entry is the response domain for classifiers.
    for (i, dom) in domains.iter().enumerate() {
        if let Some(levels) = dom {
            sb.line(format!("// Levels for column {}", names[i]));
            sb.line(format!("const DOMAIN_{i} = {};", string_table(levels)));
        }
    }
    let refs: Vec<String> = domains
        .iter()
        .enumerate()
        .map(|(i, dom)| match dom {
            Some(_) => format!("DOMAIN_{i}"),
            None => "()".to_string(),
        })
        .collect();
    sb.line(format!("const DOMAINS = [{}];", refs.join(", ")));
    sb.blank();

    sb.line("fn predict(data, preds) {");
    sb.indent();
    model.scorer().emit_predict_body(&mut sb)?;
    sb.line("preds");
    sb.dedent();
    sb.line("}");

    let source = sb.into_string();
    tracing::debug!(
        model = model.key(),
        bytes = source.len(),
        "emitted scoring source"
    );
    Ok(source)
}
