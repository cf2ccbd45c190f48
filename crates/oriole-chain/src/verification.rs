//! Request-verification message.

use serde::{Deserialize, Serialize};

use crate::id::{DataSourceId, ExternalId, RequestId};

/// The message a validator signs to prove it is the one fetching a task.
///
/// Binds the chain, the validator identity, and the exact task coordinates so
/// a data source can verify who is asking and for what.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestVerification {
  pub chain_id: String,
  pub validator: String,
  pub request_id: RequestId,
  pub external_id: ExternalId,
  pub data_source_id: DataSourceId,
}

impl RequestVerification {
  pub fn new(
    chain_id: impl Into<String>,
    validator: impl Into<String>,
    request_id: RequestId,
    external_id: ExternalId,
    data_source_id: DataSourceId,
  ) -> Self {
    Self {
      chain_id: chain_id.into(),
      validator: validator.into(),
      request_id,
      external_id,
      data_source_id,
    }
  }

  /// Canonical bytes to sign: JSON with the field order fixed by this struct.
  pub fn sign_bytes(&self) -> Vec<u8> {
    serde_json::to_vec(self).expect("verification message serializes")
  }
}
