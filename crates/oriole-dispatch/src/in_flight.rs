//! The in-flight request set.

use std::collections::HashSet;
use std::sync::Mutex;

use oriole_chain::RequestId;

/// Request ids currently being processed by this node.
///
/// Used purely for deduplication between the live event path and the
/// reconciliation path: a request enters when dispatch begins and leaves once
/// its envelope is enqueued or processing is abandoned. Insert/check is a
/// single locked operation, so when both paths race on the same id exactly
/// one of them proceeds.
#[derive(Debug, Default)]
pub struct InFlightSet {
  inner: Mutex<HashSet<RequestId>>,
}

impl InFlightSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Claim a request id. Returns false if it is already in flight.
  pub fn insert(&self, id: RequestId) -> bool {
    self.inner.lock().expect("in-flight lock poisoned").insert(id)
  }

  /// Release a request id once its dispatch finished or was abandoned.
  pub fn remove(&self, id: RequestId) -> bool {
    self.inner.lock().expect("in-flight lock poisoned").remove(&id)
  }

  pub fn len(&self) -> usize {
    self.inner.lock().expect("in-flight lock poisoned").len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_insert_of_same_id_is_rejected() {
    let set = InFlightSet::new();
    assert!(set.insert(RequestId(1)));
    assert!(!set.insert(RequestId(1)));
    assert!(set.insert(RequestId(2)));
    assert_eq!(set.len(), 2);

    assert!(set.remove(RequestId(1)));
    assert!(set.insert(RequestId(1)));
  }
}
