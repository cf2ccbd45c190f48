//! Tasks, per-task reports, and the assembled report envelope.

use serde::{Deserialize, Serialize};

use crate::hex_bytes;
use crate::id::{DataSourceId, ExternalId, RequestId};

/// Exit code reserved for infrastructure failures (executable resolution,
/// signing, sandbox invocation), distinct from any script's own exit codes.
pub const INFRA_FAILURE_EXIT_CODE: u32 = 255;

/// Sentinel output for a task whose executable could not be resolved.
pub const FAIL_TO_LOAD_DATA_SOURCE: &[u8] = b"FAIL_TO_LOAD_DATA_SOURCE";

/// One data-source fetch unit within a request.
///
/// Created when a request is dispatched (from a live event or from
/// reconciliation) and consumed exactly once by the execution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTask {
  pub request_id: RequestId,
  pub data_source_id: DataSourceId,
  /// Content hash of the data source, used to resolve its executable.
  pub data_source_hash: String,
  pub external_id: ExternalId,
  pub calldata: String,
}

/// The per-task outcome submitted back to the chain.
///
/// Produced exactly once per [`RawTask`], success or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReport {
  pub external_id: ExternalId,
  pub exit_code: u32,
  #[serde(with = "hex_bytes")]
  pub output: Vec<u8>,
}

impl RawReport {
  pub fn new(external_id: ExternalId, exit_code: u32, output: Vec<u8>) -> Self {
    Self {
      external_id,
      exit_code,
      output,
    }
  }

  /// A 255-code report for a task that failed before or inside the sandbox.
  pub fn infra_failure(external_id: ExternalId, output: Vec<u8>) -> Self {
    Self::new(external_id, INFRA_FAILURE_EXIT_CODE, output)
  }
}

/// Inputs for downstream fee computation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimationData {
  pub ask_count: u64,
  pub min_count: u64,
  #[serde(with = "hex_bytes")]
  pub calldata: Vec<u8>,
  pub raw_tasks: Vec<RawTask>,
  pub client_id: String,
}

/// The on-chain report message: one entry per assigned external id, ordered
/// ascending, plus the reporting validator's identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMessage {
  pub request_id: RequestId,
  pub reports: Vec<RawReport>,
  pub validator: String,
}

/// A fully assembled report ready for on-chain submission.
///
/// Built once per request; ownership moves into the outbound queue on
/// enqueue and the engine never touches it again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEnvelope {
  pub message: ReportMessage,
  /// Deduplicated executor version tags from the request's successful tasks.
  pub execution_versions: Vec<String>,
  /// Which managed signing key produced this request's task signatures.
  pub key_index: usize,
  pub fee_estimation: FeeEstimationData,
}
