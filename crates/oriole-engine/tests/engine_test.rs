//! Engine tests with mock gateways: full result sets under partial failure,
//! sentinel shapes, version dedup, and deterministic report ordering.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use oriole_chain::{DataSourceId, ExternalId, RawTask, RequestId};
use oriole_engine::ExecutionEngine;
use oriole_gateway::{ExecResult, Executor, GatewayError, Signature, Signer};
use oriole_metrics::{AtomicGauge, NoopGauge};

/// Per-data-source behavior, keyed by the task's data source hash.
#[derive(Clone)]
enum Behavior {
  Succeed {
    exit_code: u32,
    output: &'static str,
    version: &'static str,
    delay: Duration,
  },
  FailLoad,
  FailExec,
  Hang,
}

struct MockExecutor {
  behaviors: HashMap<String, Behavior>,
}

impl MockExecutor {
  fn new(behaviors: impl IntoIterator<Item = (&'static str, Behavior)>) -> Arc<Self> {
    Arc::new(Self {
      behaviors: behaviors
        .into_iter()
        .map(|(hash, b)| (hash.to_string(), b))
        .collect(),
    })
  }

  fn behavior(&self, key: &str) -> Behavior {
    self.behaviors.get(key).cloned().unwrap_or(Behavior::FailLoad)
  }
}

#[async_trait]
impl Executor for MockExecutor {
  async fn load(&self, data_source_hash: &str) -> Result<Vec<u8>, GatewayError> {
    match self.behavior(data_source_hash) {
      Behavior::FailLoad => Err(GatewayError::failed("unknown data source")),
      _ => Ok(data_source_hash.as_bytes().to_vec()),
    }
  }

  async fn exec(
    &self,
    executable: &[u8],
    _calldata: &str,
    env: &HashMap<String, String>,
  ) -> Result<ExecResult, GatewayError> {
    // The engine must pass the signature material through to the sandbox.
    assert!(env.contains_key("ORACLE_SIGNATURE"));
    assert!(env.contains_key("ORACLE_REPORTER"));

    let key = String::from_utf8(executable.to_vec()).unwrap();
    match self.behavior(&key) {
      Behavior::Succeed {
        exit_code,
        output,
        version,
        delay,
      } => {
        tokio::time::sleep(delay).await;
        Ok(ExecResult {
          exit_code,
          output: output.as_bytes().to_vec(),
          version: version.to_string(),
        })
      }
      Behavior::FailExec => Err(GatewayError::failed("sandbox crashed")),
      Behavior::Hang => {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        unreachable!("hung call should have been cut off by the deadline")
      }
      Behavior::FailLoad => unreachable!("load already failed"),
    }
  }
}

struct MockSigner {
  fail: bool,
}

#[async_trait]
impl Signer for MockSigner {
  async fn sign(&self, _key_index: usize, message: &[u8]) -> Result<Signature, GatewayError> {
    if self.fail {
      return Err(GatewayError::failed("keystore locked"));
    }
    assert!(!message.is_empty());
    Ok(Signature {
      signature: vec![0x51; 4],
      public_key: vec![0xab; 4],
    })
  }
}

fn task(rid: u64, eid: u64, hash: &str) -> RawTask {
  RawTask {
    request_id: RequestId(rid),
    data_source_id: DataSourceId(eid + 100),
    data_source_hash: hash.to_string(),
    external_id: ExternalId(eid),
    calldata: format!("calldata-{}", eid),
  }
}

fn engine(executor: Arc<MockExecutor>, signer_fails: bool) -> ExecutionEngine {
  ExecutionEngine::new(
    executor,
    Arc::new(MockSigner { fail: signer_fails }),
    Arc::new(NoopGauge),
    "oriole-1",
    "valoper1aaa",
  )
}

fn ok(version: &'static str, delay_ms: u64) -> Behavior {
  Behavior::Succeed {
    exit_code: 0,
    output: "42.5",
    version,
    delay: Duration::from_millis(delay_ms),
  }
}

#[tokio::test]
async fn every_task_reports_and_order_is_by_external_id() {
  // The first task finishes last; order must come from external ids anyway.
  let executor = MockExecutor::new([("h1", ok("v1", 80)), ("h2", ok("v1", 10)), ("h3", ok("v2", 0))]);
  let engine = engine(executor, false);

  let tasks = vec![task(7, 1, "h1"), task(7, 3, "h3"), task(7, 2, "h2")];
  let outcome = engine.execute(RequestId(7), tasks, 0).await;

  let ids: Vec<u64> = outcome.reports.iter().map(|r| r.external_id.0).collect();
  assert_eq!(ids, vec![1, 2, 3]);
  assert!(outcome.reports.iter().all(|r| r.exit_code == 0));
  assert_eq!(outcome.execution_versions, vec!["v1", "v2"]);
}

#[tokio::test]
async fn unresolvable_data_source_yields_sentinel_and_no_version() {
  let executor = MockExecutor::new([
    ("h1", ok("v1", 0)),
    ("h2", Behavior::FailLoad),
    ("h3", ok("v1", 0)),
  ]);
  let engine = engine(executor, false);

  let tasks = vec![task(42, 1, "h1"), task(42, 2, "h2"), task(42, 3, "h3")];
  let outcome = engine.execute(RequestId(42), tasks, 0).await;

  assert_eq!(outcome.reports.len(), 3);
  let failed = &outcome.reports[1];
  assert_eq!(failed.external_id, ExternalId(2));
  assert_eq!(failed.exit_code, 255);
  assert_eq!(failed.output, b"FAIL_TO_LOAD_DATA_SOURCE");
  assert_eq!(outcome.reports[0].exit_code, 0);
  assert_eq!(outcome.reports[2].exit_code, 0);
  // Only the successful tasks contribute versions.
  assert_eq!(outcome.execution_versions, vec!["v1"]);
}

#[tokio::test]
async fn signing_failure_yields_empty_sentinel() {
  let executor = MockExecutor::new([("h1", ok("v1", 0))]);
  let engine = engine(executor, true);

  let outcome = engine.execute(RequestId(1), vec![task(1, 1, "h1")], 0).await;

  assert_eq!(outcome.reports.len(), 1);
  assert_eq!(outcome.reports[0].exit_code, 255);
  assert!(outcome.reports[0].output.is_empty());
  assert!(outcome.execution_versions.is_empty());
}

#[tokio::test]
async fn sandbox_failure_yields_empty_sentinel() {
  let executor = MockExecutor::new([("h1", Behavior::FailExec), ("h2", ok("v1", 0))]);
  let engine = engine(executor, false);

  let tasks = vec![task(9, 1, "h1"), task(9, 2, "h2")];
  let outcome = engine.execute(RequestId(9), tasks, 0).await;

  assert_eq!(outcome.reports[0].exit_code, 255);
  assert!(outcome.reports[0].output.is_empty());
  assert_eq!(outcome.reports[1].exit_code, 0);
  assert_eq!(outcome.execution_versions, vec!["v1"]);
}

#[tokio::test]
async fn versions_are_deduplicated() {
  let executor = MockExecutor::new([("h1", ok("v1", 0)), ("h2", ok("v1", 0)), ("h3", ok("v1", 0))]);
  let engine = engine(executor, false);

  let tasks = vec![task(5, 1, "h1"), task(5, 2, "h2"), task(5, 3, "h3")];
  let outcome = engine.execute(RequestId(5), tasks, 0).await;

  assert_eq!(outcome.execution_versions, vec!["v1"]);
}

#[tokio::test]
async fn nonzero_script_exit_codes_pass_through() {
  let executor = MockExecutor::new([(
    "h1",
    Behavior::Succeed {
      exit_code: 3,
      output: "no such symbol",
      version: "v1",
      delay: Duration::ZERO,
    },
  )]);
  let engine = engine(executor, false);

  let outcome = engine.execute(RequestId(2), vec![task(2, 1, "h1")], 0).await;

  // A script's own failure is a real result, not an infrastructure sentinel.
  assert_eq!(outcome.reports[0].exit_code, 3);
  assert_eq!(outcome.reports[0].output, b"no such symbol");
  assert_eq!(outcome.execution_versions, vec!["v1"]);
}

#[tokio::test]
async fn gauge_returns_to_zero_after_execution() {
  let gauge = Arc::new(AtomicGauge::new());
  let executor = MockExecutor::new([("h1", ok("v1", 10)), ("h2", Behavior::FailLoad)]);
  let engine = ExecutionEngine::new(
    executor,
    Arc::new(MockSigner { fail: false }),
    gauge.clone(),
    "oriole-1",
    "valoper1aaa",
  );

  let tasks = vec![task(3, 1, "h1"), task(3, 2, "h2")];
  engine.execute(RequestId(3), tasks, 0).await;

  assert_eq!(gauge.value(), 0);
}

#[tokio::test]
async fn hung_gateway_call_is_cut_to_sentinel_by_the_deadline() {
  let executor = MockExecutor::new([("h1", Behavior::Hang), ("h2", ok("v1", 0))]);
  let engine = engine(executor, false).with_task_timeout(Duration::from_millis(100));

  let tasks = vec![task(8, 1, "h1"), task(8, 2, "h2")];
  let outcome = engine.execute(RequestId(8), tasks, 0).await;

  assert_eq!(outcome.reports[0].exit_code, 255);
  assert!(outcome.reports[0].output.is_empty());
  assert_eq!(outcome.reports[1].exit_code, 0);
}

#[tokio::test]
async fn empty_task_set_produces_empty_outcome() {
  let executor = MockExecutor::new([]);
  let engine = engine(executor, false);

  let outcome = engine.execute(RequestId(1), vec![], 0).await;

  assert!(outcome.reports.is_empty());
  assert!(outcome.execution_versions.is_empty());
}
