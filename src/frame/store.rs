//! Keyed frame store with per-job read locks.
//!
//! Stands in for the distributed key-value collaborator: frames are
//! registered under stable keys, and scoring jobs take read locks scoped to
//! a job identity so a frame cannot be dropped out from under an in-flight
//! scoring call.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use super::frame::Frame;

/// Stable identity of a stored frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameKey(pub String);

impl FrameKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of the caller holding a read lock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

struct Entry {
    frame: Arc<Frame>,
    readers: HashSet<JobId>,
}

/// In-process frame store.
#[derive(Default)]
pub struct FrameStore {
    entries: Mutex<HashMap<FrameKey, Entry>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a frame under a key, replacing any previous frame.
    pub fn put(&self, key: FrameKey, frame: Arc<Frame>) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            key,
            Entry {
                frame,
                readers: HashSet::new(),
            },
        );
    }

    /// Look up a frame by key.
    pub fn get(&self, key: &FrameKey) -> Option<Arc<Frame>> {
        let entries = self.entries.lock().unwrap();
        entries.get(key).map(|e| e.frame.clone())
    }

    pub fn contains(&self, key: &FrameKey) -> bool {
        let entries = self.entries.lock().unwrap();
        entries.contains_key(key)
    }

    /// Take a read lock on a frame for the given job. Idempotent per job.
    pub fn read_lock(&self, key: &FrameKey, job: &JobId) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.readers.insert(job.clone());
                true
            }
            None => false,
        }
    }

    /// Release a job's read lock on a frame.
    pub fn unlock(&self, key: &FrameKey, job: &JobId) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(key) {
            entry.readers.remove(job);
        }
    }

    /// Remove a frame. Fails (returns false) while any job holds a read lock.
    pub fn remove(&self, key: &FrameKey) -> bool {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if !entry.readers.is_empty() => false,
            Some(_) => {
                entries.remove(key);
                true
            }
            None => true,
        }
    }
}
