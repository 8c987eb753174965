//! Deterministic checksums over model configuration.
//!
//! A checksum identifies a model configuration without storing the full
//! field values: fields are enumerated through an explicit declared list
//! (never reflection or struct declaration order), sorted by name, and
//! folded with per-position primes so that content-equal configurations
//! always collide and any differing field value almost surely does not.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Seed for the field fold.
const SEED: u64 = 0x600D;
/// Sentinel tag for scalar field contributions.
const SCALAR_TAG: u64 = 0x1337;
/// Sentinel tag for array field contributions.
const ARRAY_TAG: u64 = 0xDECAF;
/// Multiplier substituted when no distinct validation dataset exists.
pub(crate) const NO_VALID_MULTIPLIER: u64 = 17;

/// Per-position multipliers, cycled by sorted field index.
const PRIMES: [u64; 32] = [
    3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89, 97,
    101, 103, 107, 109, 113, 127, 131, 137,
];

/// A checksum-relevant configuration field value.
///
/// Arrays are hashed by element sequence (content, not allocation); absent
/// values contribute a sentinel distinct from every real value. NaN is a
/// real value (hashed via its bit pattern).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Real(f64),
    Str(String),
    OptStr(Option<String>),
    Strings(Option<Vec<String>>),
    Ints(Option<Vec<i64>>),
    Reals(Option<Vec<f64>>),
    Absent,
}

impl FieldValue {
    fn is_array(&self) -> bool {
        matches!(
            self,
            FieldValue::Strings(_) | FieldValue::Ints(_) | FieldValue::Reals(_)
        )
    }

    fn is_absent(&self) -> bool {
        matches!(
            self,
            FieldValue::Absent
                | FieldValue::OptStr(None)
                | FieldValue::Strings(None)
                | FieldValue::Ints(None)
                | FieldValue::Reals(None)
        )
    }

    /// Content hash of a present value, tagged by variant so e.g.
    /// `Int(1)` and `Bool(true)` cannot collide trivially.
    fn hash64(&self) -> u64 {
        let mut hasher = Sha256::new();
        match self {
            FieldValue::Bool(b) => {
                hasher.update([0u8, u8::from(*b)]);
            }
            FieldValue::Int(i) => {
                hasher.update([1u8]);
                hasher.update(i.to_le_bytes());
            }
            FieldValue::Real(r) => {
                hasher.update([2u8]);
                hasher.update(r.to_bits().to_le_bytes());
            }
            FieldValue::Str(s) | FieldValue::OptStr(Some(s)) => {
                hasher.update([3u8]);
                hasher.update(s.as_bytes());
            }
            FieldValue::Strings(Some(items)) => {
                hasher.update([4u8]);
                for s in items {
                    hasher.update((s.len() as u64).to_le_bytes());
                    hasher.update(s.as_bytes());
                }
            }
            FieldValue::Ints(Some(items)) => {
                hasher.update([5u8]);
                for i in items {
                    hasher.update(i.to_le_bytes());
                }
            }
            FieldValue::Reals(Some(items)) => {
                hasher.update([6u8]);
                for r in items {
                    hasher.update(r.to_bits().to_le_bytes());
                }
            }
            FieldValue::Absent
            | FieldValue::OptStr(None)
            | FieldValue::Strings(None)
            | FieldValue::Ints(None)
            | FieldValue::Reals(None) => unreachable!("absent values are not hashed"),
        }
        let digest = hasher.finalize();
        u64::from_le_bytes(digest[..8].try_into().unwrap())
    }
}

/// Fold an explicit `(name, value)` field list into a checksum.
///
/// The list is sorted by field name first, so the result is independent of
/// declaration or insertion order. `frame_factor` is the product of the
/// referenced dataset checksums (training times validation, with
/// [`NO_VALID_MULTIPLIER`] standing in when no distinct validation dataset
/// exists).
pub fn checksum_fields(fields: &[(String, FieldValue)], frame_factor: u64) -> u64 {
    let mut sorted: Vec<&(String, FieldValue)> = fields.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(&b.0));

    let mut xs = SEED;
    for (count, (_, value)) in sorted.iter().enumerate() {
        let p = PRIMES[count % PRIMES.len()];
        let tag = if value.is_array() { ARRAY_TAG } else { SCALAR_TAG };
        let contribution = if value.is_absent() {
            tag.wrapping_add(p)
        } else {
            tag.wrapping_add(p.wrapping_mul(value.hash64()))
        };
        xs ^= contribution;
    }
    xs ^ frame_factor
}
