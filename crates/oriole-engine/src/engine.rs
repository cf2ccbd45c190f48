//! Concurrent task execution for one request.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, instrument};

use oriole_chain::{
  FAIL_TO_LOAD_DATA_SOURCE, RawReport, RawTask, RequestId, RequestVerification,
};
use oriole_gateway::{Executor, GatewayError, Signer};
use oriole_metrics::TaskGauge;

/// Environment values handed to every sandboxed execution.
const ENV_CHAIN_ID: &str = "ORACLE_CHAIN_ID";
const ENV_DATA_SOURCE_ID: &str = "ORACLE_DATA_SOURCE_ID";
const ENV_VALIDATOR: &str = "ORACLE_VALIDATOR";
const ENV_REQUEST_ID: &str = "ORACLE_REQUEST_ID";
const ENV_EXTERNAL_ID: &str = "ORACLE_EXTERNAL_ID";
const ENV_REPORTER: &str = "ORACLE_REPORTER";
const ENV_SIGNATURE: &str = "ORACLE_SIGNATURE";

/// Everything `execute` produces for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionOutcome {
  /// Exactly one report per assigned task, ascending by external id.
  pub reports: Vec<RawReport>,
  /// Deduplicated executor version tags from the successful tasks.
  pub execution_versions: Vec<String>,
}

/// What one task unit hands back through the result channel.
struct TaskOutcome {
  report: RawReport,
  version: Option<String>,
}

/// Shared, immutable context for all task units of one engine.
struct TaskContext {
  executor: Arc<dyn Executor>,
  signer: Arc<dyn Signer>,
  gauge: Arc<dyn TaskGauge>,
  chain_id: String,
  validator: String,
  task_timeout: Option<Duration>,
}

/// Runs all tasks of a request concurrently and collects their reports.
pub struct ExecutionEngine {
  ctx: Arc<TaskContext>,
}

impl ExecutionEngine {
  pub fn new(
    executor: Arc<dyn Executor>,
    signer: Arc<dyn Signer>,
    gauge: Arc<dyn TaskGauge>,
    chain_id: impl Into<String>,
    validator: impl Into<String>,
  ) -> Self {
    Self {
      ctx: Arc::new(TaskContext {
        executor,
        signer,
        gauge,
        chain_id: chain_id.into(),
        validator: validator.into(),
        task_timeout: None,
      }),
    }
  }

  /// Convert a hung gateway call past `timeout` into the sentinel failure
  /// path instead of stalling its task forever.
  pub fn with_task_timeout(mut self, timeout: Duration) -> Self {
    let ctx = Arc::get_mut(&mut self.ctx).expect("engine not yet shared");
    ctx.task_timeout = Some(timeout);
    self
  }

  /// Execute all tasks of one request and wait for every result.
  ///
  /// There is no early exit: the fan-in is a counted wait for exactly one
  /// outcome per task, and local failures come back as sentinel reports.
  /// The returned reports are ordered by external id regardless of task
  /// completion order.
  #[instrument(
    name = "execute_request",
    skip(self, tasks),
    fields(rid = %request_id, tasks = tasks.len(), key_index)
  )]
  pub async fn execute(
    &self,
    request_id: RequestId,
    tasks: Vec<RawTask>,
    key_index: usize,
  ) -> ExecutionOutcome {
    if tasks.is_empty() {
      return ExecutionOutcome {
        reports: Vec::new(),
        execution_versions: Vec::new(),
      };
    }

    let task_count = tasks.len();
    let (result_tx, mut result_rx) = mpsc::channel::<TaskOutcome>(task_count);

    for task in tasks {
      let ctx = self.ctx.clone();
      let result_tx = result_tx.clone();
      tokio::spawn(async move {
        let outcome = run_task(&ctx, task, key_index).await;
        // Channel capacity equals the task count, so this never blocks.
        let _ = result_tx.send(outcome).await;
      });
    }
    drop(result_tx);

    let mut reports = Vec::with_capacity(task_count);
    let mut versions = BTreeSet::new();
    for _ in 0..task_count {
      let outcome = result_rx
        .recv()
        .await
        .expect("every task unit reports exactly once");
      reports.push(outcome.report);
      if let Some(version) = outcome.version {
        versions.insert(version);
      }
    }

    reports.sort_by_key(|report| report.external_id);

    ExecutionOutcome {
      reports,
      execution_versions: versions.into_iter().collect(),
    }
  }
}

/// Run one task to completion. Always produces exactly one outcome.
#[instrument(
  name = "task",
  skip_all,
  fields(rid = %task.request_id, did = %task.data_source_id, eid = %task.external_id)
)]
async fn run_task(ctx: &TaskContext, task: RawTask, key_index: usize) -> TaskOutcome {
  ctx.gauge.increment();
  let _guard = GaugeGuard(ctx.gauge.as_ref());

  let executable = match with_deadline(ctx.task_timeout, ctx.executor.load(&task.data_source_hash)).await {
    Ok(executable) => executable,
    Err(e) => {
      error!(error = %e, "failed to load data source");
      return TaskOutcome {
        report: RawReport::infra_failure(task.external_id, FAIL_TO_LOAD_DATA_SOURCE.to_vec()),
        version: None,
      };
    }
  };

  let verification = RequestVerification::new(
    ctx.chain_id.clone(),
    ctx.validator.clone(),
    task.request_id,
    task.external_id,
    task.data_source_id,
  );

  let signature = match with_deadline(
    ctx.task_timeout,
    ctx.signer.sign(key_index, &verification.sign_bytes()),
  )
  .await
  {
    Ok(signature) => signature,
    Err(e) => {
      error!(error = %e, "failed to sign verification message");
      return TaskOutcome {
        report: RawReport::infra_failure(task.external_id, Vec::new()),
        version: None,
      };
    }
  };

  let env = HashMap::from([
    (ENV_CHAIN_ID.to_string(), ctx.chain_id.clone()),
    (ENV_DATA_SOURCE_ID.to_string(), task.data_source_id.to_string()),
    (ENV_VALIDATOR.to_string(), ctx.validator.clone()),
    (ENV_REQUEST_ID.to_string(), task.request_id.to_string()),
    (ENV_EXTERNAL_ID.to_string(), task.external_id.to_string()),
    (ENV_REPORTER.to_string(), hex::encode(&signature.public_key)),
    (ENV_SIGNATURE.to_string(), hex::encode(&signature.signature)),
  ]);

  match with_deadline(
    ctx.task_timeout,
    ctx.executor.exec(&executable, &task.calldata, &env),
  )
  .await
  {
    Ok(result) => {
      debug!(
        calldata = %task.calldata,
        exit_code = result.exit_code,
        version = %result.version,
        "task executed"
      );
      TaskOutcome {
        report: RawReport::new(task.external_id, result.exit_code, result.output),
        version: Some(result.version),
      }
    }
    Err(e) => {
      error!(error = %e, "failed to execute data source");
      TaskOutcome {
        report: RawReport::infra_failure(task.external_id, Vec::new()),
        version: None,
      }
    }
  }
}

/// Apply the optional per-task deadline to one gateway call.
async fn with_deadline<T>(
  timeout: Option<Duration>,
  call: impl Future<Output = Result<T, GatewayError>>,
) -> Result<T, GatewayError> {
  match timeout {
    Some(timeout) => match tokio::time::timeout(timeout, call).await {
      Ok(result) => result,
      Err(_) => Err(GatewayError::failed(format!(
        "gateway call exceeded task deadline of {:?}",
        timeout
      ))),
    },
    None => call.await,
  }
}

/// Decrements the in-flight gauge when a task unit exits, whatever the path.
struct GaugeGuard<'a>(&'a dyn TaskGauge);

impl Drop for GaugeGuard<'_> {
  fn drop(&mut self) {
    self.0.decrement();
  }
}
