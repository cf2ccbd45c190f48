//! Signing key ring.
//!
//! A node reports through several on-chain accounts so concurrent requests do
//! not serialize on a single account's sequence number. The ring hands out
//! key indices round-robin, advanced once per request dispatch; all tasks of
//! one request share that request's key.

use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyRingError {
  #[error("key ring requires at least one key")]
  Empty,
}

/// A fixed set of signing key names with a thread-safe rotation cursor.
///
/// Keys are immutable once loaded; only the cursor mutates. Under concurrent
/// callers every index is handed out in round-robin order with no skips and
/// no repeats within one full cycle.
#[derive(Debug)]
pub struct KeyRing {
  keys: Vec<String>,
  cursor: AtomicUsize,
}

impl KeyRing {
  pub fn new(keys: Vec<String>) -> Result<Self, KeyRingError> {
    if keys.is_empty() {
      return Err(KeyRingError::Empty);
    }
    Ok(Self {
      keys,
      cursor: AtomicUsize::new(0),
    })
  }

  /// Claim the next key index.
  pub fn next_index(&self) -> usize {
    self.cursor.fetch_add(1, Ordering::Relaxed) % self.keys.len()
  }

  /// The key name at `index`, if the ring has one.
  pub fn key(&self, index: usize) -> Option<&str> {
    self.keys.get(index).map(String::as_str)
  }

  pub fn len(&self) -> usize {
    self.keys.len()
  }

  pub fn is_empty(&self) -> bool {
    self.keys.is_empty()
  }
}
