//! Fan-out/fan-in task execution engine.
//!
//! For one request, the engine runs every assigned task concurrently against
//! the executor gateway, signs each task's verification message, and collects
//! a complete per-task result set. Individual failures never block sibling
//! tasks: they are converted into 255-code sentinel reports so the final set
//! always has exactly one entry per assigned external id.

mod engine;

pub use engine::{ExecutionEngine, ExecutionOutcome};
