//! Gateway errors.

use thiserror::Error;

/// Errors raised by an external collaborator call.
///
/// At the task level every one of these is converted into a sentinel report
/// by the execution engine; none of them aborts a request.
#[derive(Debug, Error)]
pub enum GatewayError {
  /// The HTTP transport failed (connect, timeout, body read).
  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  /// The service answered with a non-success status.
  #[error("{service} returned status {status}")]
  Status { service: &'static str, status: u16 },

  /// The service answered but the payload did not decode.
  #[error("invalid response from {service}: {message}")]
  InvalidResponse {
    service: &'static str,
    message: String,
  },

  /// The collaborator reported a failure of its own.
  #[error("{message}")]
  Failed { message: String },
}

impl GatewayError {
  pub fn failed(message: impl Into<String>) -> Self {
    Self::Failed {
      message: message.into(),
    }
  }
}
