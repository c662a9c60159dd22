//! Orchestrator / scheduler.
//!
//! Composes the state store, the per-source pipeline, and the registered
//! upstream/publisher adapters into one schedulable unit: the production
//! wiring that a CLI or daemon calls once per pass.

mod orchestrator;

pub use orchestrator::{Orchestrator, RunReport, SourceHandle, SourceRunResult};
