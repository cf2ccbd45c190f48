//! Envelope construction.

use std::collections::BTreeSet;

use thiserror::Error;

use oriole_chain::{
  ExternalId, FeeEstimationData, RawReport, ReportEnvelope, ReportMessage, RequestId,
};

/// Invariant violations caught while assembling a report.
#[derive(Debug, Error)]
pub enum AssembleError {
  /// The collected report set does not cover exactly the assigned external
  /// ids. The chain rejects partial answer sets, so producing this envelope
  /// would be worse than producing none.
  #[error("report set mismatch for request {request_id}: expected external ids {expected:?}, collected {collected:?}")]
  ReportSetMismatch {
    request_id: RequestId,
    expected: Vec<ExternalId>,
    collected: Vec<ExternalId>,
  },
}

/// Builds report envelopes for one validator identity. No I/O.
pub struct ReportAssembler {
  validator: String,
}

impl ReportAssembler {
  pub fn new(validator: impl Into<String>) -> Self {
    Self {
      validator: validator.into(),
    }
  }

  /// Combine collected per-task reports into a single envelope.
  ///
  /// `fee_estimation.raw_tasks` doubles as the expected task set: every
  /// assigned external id must appear exactly once among `reports`.
  pub fn assemble(
    &self,
    request_id: RequestId,
    mut reports: Vec<RawReport>,
    execution_versions: Vec<String>,
    key_index: usize,
    fee_estimation: FeeEstimationData,
  ) -> Result<ReportEnvelope, AssembleError> {
    let expected: BTreeSet<ExternalId> = fee_estimation
      .raw_tasks
      .iter()
      .map(|task| task.external_id)
      .collect();
    let collected: BTreeSet<ExternalId> =
      reports.iter().map(|report| report.external_id).collect();

    if expected != collected || reports.len() != collected.len() {
      return Err(AssembleError::ReportSetMismatch {
        request_id,
        expected: expected.into_iter().collect(),
        collected: reports.iter().map(|r| r.external_id).collect(),
      });
    }

    reports.sort_by_key(|report| report.external_id);

    Ok(ReportEnvelope {
      message: ReportMessage {
        request_id,
        reports,
        validator: self.validator.clone(),
      },
      execution_versions,
      key_index,
      fee_estimation,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use oriole_chain::{DataSourceId, RawTask};

  fn fee(external_ids: &[u64]) -> FeeEstimationData {
    FeeEstimationData {
      ask_count: 2,
      min_count: 1,
      calldata: vec![0x01],
      raw_tasks: external_ids
        .iter()
        .map(|&eid| RawTask {
          request_id: RequestId(10),
          data_source_id: DataSourceId(eid),
          data_source_hash: format!("hash-{}", eid),
          external_id: ExternalId(eid),
          calldata: String::new(),
        })
        .collect(),
      client_id: "client".to_string(),
    }
  }

  #[test]
  fn assembles_sorted_reports_into_an_envelope() {
    let assembler = ReportAssembler::new("valoper1aaa");
    let reports = vec![
      RawReport::new(ExternalId(2), 0, b"b".to_vec()),
      RawReport::new(ExternalId(1), 255, Vec::new()),
    ];

    let envelope = assembler
      .assemble(RequestId(10), reports, vec!["v1".to_string()], 3, fee(&[1, 2]))
      .unwrap();

    assert_eq!(envelope.message.request_id, RequestId(10));
    assert_eq!(envelope.message.validator, "valoper1aaa");
    assert_eq!(envelope.message.reports[0].external_id, ExternalId(1));
    assert_eq!(envelope.message.reports[1].external_id, ExternalId(2));
    assert_eq!(envelope.key_index, 3);
    assert_eq!(envelope.execution_versions, vec!["v1"]);
  }

  #[test]
  fn missing_report_is_a_mismatch() {
    let assembler = ReportAssembler::new("valoper1aaa");
    let reports = vec![RawReport::new(ExternalId(1), 0, Vec::new())];

    let err = assembler
      .assemble(RequestId(10), reports, vec![], 0, fee(&[1, 2]))
      .unwrap_err();

    assert!(matches!(err, AssembleError::ReportSetMismatch { .. }));
  }

  #[test]
  fn duplicate_report_is_a_mismatch() {
    let assembler = ReportAssembler::new("valoper1aaa");
    let reports = vec![
      RawReport::new(ExternalId(1), 0, Vec::new()),
      RawReport::new(ExternalId(1), 0, Vec::new()),
    ];

    let err = assembler
      .assemble(RequestId(10), reports, vec![], 0, fee(&[1]))
      .unwrap_err();

    assert!(matches!(err, AssembleError::ReportSetMismatch { .. }));
  }

  #[test]
  fn unexpected_report_is_a_mismatch() {
    let assembler = ReportAssembler::new("valoper1aaa");
    let reports = vec![
      RawReport::new(ExternalId(1), 0, Vec::new()),
      RawReport::new(ExternalId(9), 0, Vec::new()),
    ];

    let err = assembler
      .assemble(RequestId(10), reports, vec![], 0, fee(&[1, 2]))
      .unwrap_err();

    assert!(matches!(err, AssembleError::ReportSetMismatch { .. }));
  }
}
