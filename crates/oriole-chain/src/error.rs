//! Event decoding errors.

use thiserror::Error;

/// Errors raised while decoding a data-request event log.
///
/// Any of these abandons the whole event: the chain keeps the request itself,
/// so a malformed notification is recovered through reconciliation rather
/// than retried here.
#[derive(Debug, Error)]
pub enum EventError {
  /// A required attribute was absent (or present more than once where a
  /// single value is expected).
  #[error("missing attribute {event_type}.{key}")]
  MissingAttribute {
    event_type: &'static str,
    key: &'static str,
  },

  /// An attribute value failed to parse.
  #[error("invalid attribute {key}: {message}")]
  InvalidAttribute { key: &'static str, message: String },

  /// The zipped per-task attribute arrays disagree on length.
  #[error("raw request attributes misaligned: {data_source_ids} data source ids, {external_ids} external ids, {calldatas} calldatas, {hashes} hashes")]
  MisalignedRawRequests {
    data_source_ids: usize,
    external_ids: usize,
    calldatas: usize,
    hashes: usize,
  },
}
