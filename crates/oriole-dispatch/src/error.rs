//! Dispatch errors.

use thiserror::Error;

use oriole_chain::EventError;
use oriole_gateway::GatewayError;
use oriole_report::AssembleError;

/// Why a request's dispatch was abandoned.
///
/// None of these are retried here: the chain still holds the request, so
/// reconciliation is the retry path.
#[derive(Debug, Error)]
pub enum DispatchError {
  #[error("failed to decode request event: {0}")]
  Event(#[from] EventError),

  #[error("request source lookup failed: {0}")]
  Source(#[from] GatewayError),

  /// Invariant violation caught at assembly. Indicates a bug, not a runtime
  /// condition.
  #[error(transparent)]
  Assemble(#[from] AssembleError),

  /// The outbound queue's receiver is gone; the node is shutting down.
  #[error("outbound report queue is closed")]
  QueueClosed,
}
