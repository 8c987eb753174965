//! Minimal in-process column store
//!
//! The scoring core treats dataset storage as an external collaborator; this
//! module provides the in-process surface it consumes: columns with optional
//! categorical domains, named frames that can be restructured in place,
//! horizontal partition ranges for parallel scoring, content checksums, and
//! a keyed frame store with per-job read locks.

mod column;
mod frame;
mod store;

pub use column::Column;
pub use frame::Frame;
pub use store::{FrameKey, FrameStore, JobId};
