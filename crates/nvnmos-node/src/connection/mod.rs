//! IS-05 connection management (spec.md §4.5).

pub mod auto;
pub mod engine;
pub mod transportfile;

pub use engine::{ActivationCallback, ConnectionEngine, StagedPatch};
