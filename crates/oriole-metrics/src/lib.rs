//! Observability seams.
//!
//! The execution engine reports how many tasks are currently running through
//! an injected [`TaskGauge`]. [`AtomicGauge`] is the standard implementation;
//! [`NoopGauge`] discards updates for callers that do not scrape metrics.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// An increment/decrement gauge for tasks currently executing.
pub trait TaskGauge: Send + Sync {
  fn increment(&self);
  fn decrement(&self);
}

/// Gauge backed by an atomic counter, readable for health endpoints.
#[derive(Debug, Default)]
pub struct AtomicGauge {
  value: AtomicI64,
}

impl AtomicGauge {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current number of in-flight tasks.
  pub fn value(&self) -> i64 {
    self.value.load(Ordering::Relaxed)
  }
}

impl TaskGauge for AtomicGauge {
  fn increment(&self) {
    self.value.fetch_add(1, Ordering::Relaxed);
  }

  fn decrement(&self) {
    self.value.fetch_sub(1, Ordering::Relaxed);
  }
}

/// Gauge that discards all updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopGauge;

impl TaskGauge for NoopGauge {
  fn increment(&self) {}
  fn decrement(&self) {}
}

impl<G: TaskGauge + ?Sized> TaskGauge for Arc<G> {
  fn increment(&self) {
    (**self).increment();
  }

  fn decrement(&self) {
    (**self).decrement();
  }
}
