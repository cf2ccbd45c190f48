//! The task dispatcher.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument};

use oriole_chain::{
  EventLog, FeeEstimationData, RawTask, ReportEnvelope, RequestEvent, RequestId, TxResult,
};
use oriole_engine::ExecutionEngine;
use oriole_gateway::RequestSource;
use oriole_keys::KeyRing;
use oriole_report::ReportAssembler;

use crate::error::DispatchError;
use crate::in_flight::InFlightSet;

/// Converts chain notifications into executed, enqueued reports.
///
/// Requests are processed concurrently and independently; within one request
/// the execution engine fans its tasks out. The dispatcher owns the in-flight
/// set that makes the live and reconciliation paths mutually exclusive per
/// request id.
pub struct Dispatcher {
  engine: ExecutionEngine,
  assembler: ReportAssembler,
  source: Arc<dyn RequestSource>,
  keys: Arc<KeyRing>,
  in_flight: InFlightSet,
  queue: mpsc::Sender<ReportEnvelope>,
  validator: String,
}

impl Dispatcher {
  pub fn new(
    engine: ExecutionEngine,
    source: Arc<dyn RequestSource>,
    keys: Arc<KeyRing>,
    queue: mpsc::Sender<ReportEnvelope>,
    validator: impl Into<String>,
  ) -> Self {
    let validator = validator.into();
    Self {
      engine,
      assembler: ReportAssembler::new(validator.clone()),
      source,
      keys,
      in_flight: InFlightSet::new(),
      queue,
      validator,
    }
  }

  /// How many requests this node is currently processing.
  pub fn in_flight_count(&self) -> usize {
    self.in_flight.len()
  }

  /// Handle one decoded transaction from the live chain stream.
  ///
  /// Each event log is handled concurrently; this returns once all of them
  /// have finished. Malformed or irrelevant logs are dropped with a log line
  /// and nothing else — the chain keeps the request, so reconciliation is
  /// the retry path.
  #[instrument(name = "on_transaction", skip_all, fields(tx_hash = %tx.hash))]
  pub async fn on_transaction(self: Arc<Self>, tx: TxResult) {
    if tx.code != 0 {
      debug!(code = tx.code, "skipping failed transaction");
      return;
    }

    let mut handles = Vec::with_capacity(tx.logs.len());
    for log in tx.logs {
      let this = self.clone();
      handles.push(tokio::spawn(async move { this.handle_log(log).await }));
    }
    for handle in handles {
      // A panicking handler only loses its own request.
      let _ = handle.await;
    }
  }

  /// Handle one event log from a transaction.
  async fn handle_log(&self, log: EventLog) {
    let request_id = match RequestEvent::request_id(&log) {
      Ok(Some(id)) => id,
      Ok(None) => return,
      Err(e) => {
        error!(error = %e, "dropping undecodable request event");
        return;
      }
    };

    let validators = RequestEvent::requested_validators(&log);
    if !validators.iter().any(|v| v == &self.validator) {
      debug!(rid = %request_id, "request not assigned to this validator");
      return;
    }

    let event = match RequestEvent::from_log(&log) {
      Ok(Some(event)) => event,
      Ok(None) => return,
      Err(e) => {
        error!(rid = %request_id, error = %e, "dropping malformed request event");
        return;
      }
    };

    if !self.in_flight.insert(request_id) {
      debug!(rid = %request_id, "request already in flight");
      return;
    }

    info!(rid = %request_id, tasks = event.tasks.len(), "processing request event");

    let fee_estimation = FeeEstimationData {
      ask_count: event.ask_count,
      min_count: event.min_count,
      calldata: event.calldata,
      raw_tasks: event.tasks.clone(),
      client_id: event.client_id,
    };

    if let Err(e) = self.process(request_id, event.tasks, fee_estimation).await {
      error!(rid = %request_id, error = %e, "abandoned request from live event");
    }
    self.in_flight.remove(request_id);
  }

  /// Handle a request the chain still considers open and assigned to this
  /// node, re-deriving the task set from persisted state.
  ///
  /// Produces the identical task shape as the live path, so everything
  /// downstream is path-independent. Invoked periodically by the node's
  /// reconciliation poll.
  #[instrument(name = "on_pending_request", skip(self), fields(rid = %request_id))]
  pub async fn on_pending_request(&self, request_id: RequestId) {
    if !self.in_flight.insert(request_id) {
      debug!("request already in flight");
      return;
    }

    if let Err(e) = self.reconcile(request_id).await {
      error!(error = %e, "abandoned pending request");
    }
    self.in_flight.remove(request_id);
  }

  async fn reconcile(&self, request_id: RequestId) -> Result<(), DispatchError> {
    let record = self.source.request(request_id).await?;

    info!(tasks = record.raw_requests.len(), "processing pending request");

    let mut tasks = Vec::with_capacity(record.raw_requests.len());
    for raw in &record.raw_requests {
      let hash = self.source.data_source_hash(raw.data_source_id).await?;
      tasks.push(RawTask {
        request_id,
        data_source_id: raw.data_source_id,
        data_source_hash: hash,
        external_id: raw.external_id,
        calldata: raw.calldata.clone(),
      });
    }

    let fee_estimation = FeeEstimationData {
      ask_count: record.requested_validators.len() as u64,
      min_count: record.min_count,
      calldata: record.calldata,
      raw_tasks: tasks.clone(),
      client_id: record.client_id,
    };

    self.process(request_id, tasks, fee_estimation).await
  }

  /// The shared downstream path: rotate a key, execute, assemble, enqueue.
  async fn process(
    &self,
    request_id: RequestId,
    tasks: Vec<RawTask>,
    fee_estimation: FeeEstimationData,
  ) -> Result<(), DispatchError> {
    // One key per request; all of its tasks sign with the same one.
    let key_index = self.keys.next_index();

    let outcome = self.engine.execute(request_id, tasks, key_index).await;

    let envelope = self.assembler.assemble(
      request_id,
      outcome.reports,
      outcome.execution_versions,
      key_index,
      fee_estimation,
    )?;

    // Backpressure from a full queue stalls this request, never drops it.
    self
      .queue
      .send(envelope)
      .await
      .map_err(|_| DispatchError::QueueClosed)?;

    info!(rid = %request_id, "report enqueued");
    Ok(())
  }
}
