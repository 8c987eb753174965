//! Registry of metric artifacts owned by one model.
//!
//! Tracks every aggregate-metrics artifact produced by scoring against a
//! model so whole-model teardown can release them. Registration is
//! serialized and idempotent on artifact identity: two scoring calls racing
//! on the same (model, dataset) pair end up with exactly one entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::metrics::{MetricArtifact, MetricKey};

/// Per-model artifact registry.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    entries: Mutex<HashMap<MetricKey, Arc<MetricArtifact>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an artifact, returning the registered reference.
    ///
    /// If an artifact with the same identity is already present the existing
    /// reference is returned and the new one is dropped; appending is the
    /// only mutation.
    pub fn register(&self, artifact: MetricArtifact) -> Arc<MetricArtifact> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(artifact.key.clone())
            .or_insert_with(|| Arc::new(artifact))
            .clone()
    }

    /// Look up an artifact by identity.
    pub fn get(&self, key: &MetricKey) -> Option<Arc<MetricArtifact>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    /// Identities of every registered artifact.
    pub fn keys(&self) -> Vec<MetricKey> {
        self.entries.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Release every referenced artifact. Returns how many were dropped.
    pub fn teardown(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        let n = entries.len();
        entries.clear();
        n
    }
}
