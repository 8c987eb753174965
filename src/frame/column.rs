//! Column storage: f64 values plus an optional categorical domain.

use sha2::{Digest, Sha256};

/// A single dataset column.
///
/// Values are stored as `f64`. Categorical columns carry a domain: an
/// ordered list of unique string levels where a cell value is the level
/// index. Missing cells are NaN for both numeric and categorical columns.
///
/// Level order is significant: reordering the domain changes the encoding,
/// not just the display.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    data: Vec<f64>,
    domain: Option<Vec<String>>,
}

impl Column {
    /// Create a numeric column.
    pub fn numeric(data: Vec<f64>) -> Self {
        Self { data, domain: None }
    }

    /// Create a categorical column from level indices and a domain.
    pub fn categorical(data: Vec<f64>, domain: Vec<String>) -> Self {
        Self {
            data,
            domain: Some(domain),
        }
    }

    /// Create a constant-filled column of the given length.
    ///
    /// Used during adaptation to synthesize columns missing from a scored
    /// dataset; the fill is usually NaN.
    pub fn constant(len: usize, fill: f64) -> Self {
        Self {
            data: vec![fill; len],
            domain: None,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Cell value at `row`.
    pub fn at(&self, row: usize) -> f64 {
        self.data[row]
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// The categorical domain, or `None` for numeric columns.
    pub fn domain(&self) -> Option<&[String]> {
        self.domain.as_deref()
    }

    /// Replace the categorical domain.
    pub fn set_domain(&mut self, domain: Option<Vec<String>>) {
        self.domain = domain;
    }

    pub fn is_categorical(&self) -> bool {
        self.domain.is_some()
    }

    /// Content-based checksum over cell bits and domain levels.
    ///
    /// Two columns with equal values (including NaN placement) and equal
    /// domains produce the same checksum regardless of how they were built.
    pub fn checksum(&self) -> u64 {
        let mut hasher = Sha256::new();
        for v in &self.data {
            hasher.update(v.to_bits().to_le_bytes());
        }
        match &self.domain {
            None => hasher.update([0u8]),
            Some(levels) => {
                hasher.update([1u8]);
                for level in levels {
                    hasher.update((level.len() as u64).to_le_bytes());
                    hasher.update(level.as_bytes());
                }
            }
        }
        let digest = hasher.finalize();
        u64::from_le_bytes(digest[..8].try_into().unwrap())
    }
}
