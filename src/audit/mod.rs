//! Security event audit pipeline.
//!
//! A run moves records through these stages, one source at a time:
//!
//! - [`source`] - the live log and strictly named archive segments
//! - [`probe`] - first/last record day window of each archive
//! - [`predicate`] - date range, event kinds and accounts compiled once per run
//! - [`scheduler`] - which archives are read, and in what order
//! - [`normalizer`] - raw records to fixed-shape rows
//! - [`pipeline`] - per-source processing and the run driver
//! - [`export`] - CSV artifacts
//! - [`aggregate`] - per-account summary
//!
//! Shared data structures live in [`types`], domain errors in [`error`].

pub mod aggregate;
pub mod error;
pub mod export;
pub mod normalizer;
pub mod pipeline;
pub mod predicate;
pub mod probe;
pub mod scheduler;
pub mod source;
pub mod types;
