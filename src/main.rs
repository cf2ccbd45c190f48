use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use oriole_chain::{ReportEnvelope, TxResult};
use oriole_config::NodeConfig;
use oriole_dispatch::Dispatcher;
use oriole_engine::ExecutionEngine;
use oriole_gateway::{HttpRequestSource, HttpSigner, RequestSource, RestExecutor};
use oriole_keys::KeyRing;
use oriole_metrics::AtomicGauge;

/// Oriole - an off-chain oracle reporting node
#[derive(Parser)]
#[command(name = "oriole")]
#[command(version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run the reporting node.
  ///
  /// Decoded transaction results arrive as one JSON object per line on
  /// stdin; assembled report envelopes leave as one JSON object per line on
  /// stdout for the transaction broadcaster to pick up.
  Run {
    /// Path to the node configuration file (JSON)
    #[arg(long)]
    config: PathBuf,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  match cli.command {
    Some(Commands::Run { config }) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run(config))
    }
    None => {
      println!("oriole - use --help to see available commands");
      Ok(())
    }
  }
}

async fn run(config_path: PathBuf) -> Result<()> {
  let config = NodeConfig::load(&config_path)
    .with_context(|| format!("failed to load config from {}", config_path.display()))?;

  info!(
    chain_id = %config.chain_id,
    validator = %config.validator,
    keys = config.keys.len(),
    "starting reporting node"
  );

  let executor = Arc::new(RestExecutor::new(
    config.executor.url.clone(),
    config.executor.timeout_ms,
  ));
  let keys = Arc::new(KeyRing::new(config.keys.clone()).context("invalid key ring")?);
  let signer = Arc::new(HttpSigner::new(config.signer.url.clone(), keys.clone()));
  let source: Arc<dyn RequestSource> =
    Arc::new(HttpRequestSource::new(config.request_source.url.clone()));
  let gauge = Arc::new(AtomicGauge::new());

  let mut engine = ExecutionEngine::new(
    executor,
    signer,
    gauge.clone(),
    config.chain_id.clone(),
    config.validator.clone(),
  );
  if let Some(timeout_ms) = config.task_timeout_ms {
    engine = engine.with_task_timeout(Duration::from_millis(timeout_ms));
  }

  let (queue_tx, queue_rx) = mpsc::channel::<ReportEnvelope>(config.report_queue_size);
  let dispatcher = Arc::new(Dispatcher::new(
    engine,
    source.clone(),
    keys,
    queue_tx,
    config.validator.clone(),
  ));

  let cancel = CancellationToken::new();
  tokio::spawn({
    let cancel = cancel.clone();
    async move {
      if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested");
        cancel.cancel();
      }
    }
  });

  let drain = tokio::spawn(drain_reports(queue_rx));

  let reconcile = tokio::spawn(reconcile_loop(
    dispatcher.clone(),
    source,
    gauge,
    config.validator.clone(),
    Duration::from_millis(config.poll_interval_ms),
    cancel.clone(),
  ));

  stream_transactions(dispatcher.clone(), cancel.clone()).await;

  cancel.cancel();
  let _ = reconcile.await;

  // Dropping the last dispatcher handle closes the queue so the drain task
  // can flush remaining envelopes and exit.
  drop(dispatcher);
  let _ = drain.await;

  info!("reporting node stopped");
  Ok(())
}

/// Feed decoded transactions from stdin into the dispatcher, one per line.
async fn stream_transactions(dispatcher: Arc<Dispatcher>, cancel: CancellationToken) {
  let mut lines = BufReader::new(tokio::io::stdin()).lines();

  loop {
    let line = tokio::select! {
      line = lines.next_line() => line,
      _ = cancel.cancelled() => break,
    };

    let line = match line {
      Ok(Some(line)) => line,
      Ok(None) => break,
      Err(e) => {
        error!(error = %e, "failed to read transaction stream");
        break;
      }
    };

    if line.trim().is_empty() {
      continue;
    }

    let tx: TxResult = match serde_json::from_str(&line) {
      Ok(tx) => tx,
      Err(e) => {
        warn!(error = %e, "skipping undecodable transaction line");
        continue;
      }
    };

    let dispatcher = dispatcher.clone();
    tokio::spawn(async move {
      dispatcher.on_transaction(tx).await;
    });
  }
}

/// Periodically re-derive missed requests from persisted chain state.
async fn reconcile_loop(
  dispatcher: Arc<Dispatcher>,
  source: Arc<dyn RequestSource>,
  gauge: Arc<AtomicGauge>,
  validator: String,
  interval: Duration,
  cancel: CancellationToken,
) {
  let mut ticker = tokio::time::interval(interval);
  ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

  loop {
    tokio::select! {
      _ = ticker.tick() => {}
      _ = cancel.cancelled() => return,
    }

    debug_status(&dispatcher, &gauge);

    let ids = match source.pending_request_ids(&validator).await {
      Ok(ids) => ids,
      Err(e) => {
        warn!(error = %e, "failed to poll pending requests");
        continue;
      }
    };

    for id in ids {
      let dispatcher = dispatcher.clone();
      tokio::spawn(async move {
        dispatcher.on_pending_request(id).await;
      });
    }
  }
}

fn debug_status(dispatcher: &Dispatcher, gauge: &AtomicGauge) {
  tracing::debug!(
    in_flight_requests = dispatcher.in_flight_count(),
    executing_tasks = gauge.value(),
    "node status"
  );
}

/// Drain assembled envelopes to stdout for the transaction broadcaster.
async fn drain_reports(mut queue_rx: mpsc::Receiver<ReportEnvelope>) {
  while let Some(envelope) = queue_rx.recv().await {
    info!(
      rid = %envelope.message.request_id,
      reports = envelope.message.reports.len(),
      key_index = envelope.key_index,
      "report ready for broadcast"
    );
    match serde_json::to_string(&envelope) {
      Ok(json) => println!("{}", json),
      Err(e) => error!(error = %e, "failed to serialize report envelope"),
    }
  }
}
