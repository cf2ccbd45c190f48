//! Node configuration for oriole.
//!
//! Configuration is a single JSON document loaded at startup. It names the
//! chain, this node's validator identity, the managed signing keys, and the
//! endpoints of the external collaborators (executor, signer, request
//! source).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config file: {0}")]
  Io(#[from] std::io::Error),

  #[error("failed to parse config file: {0}")]
  Parse(#[from] serde_json::Error),

  /// The config parsed but cannot run a node.
  #[error("invalid config: {message}")]
  Invalid { message: String },
}

/// Top-level node configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
  /// Chain identifier bound into every request-verification signature.
  pub chain_id: String,
  /// This node's validator operator identity on the chain.
  pub validator: String,
  /// Names of the managed signing keys, rotated round-robin per request.
  pub keys: Vec<String>,
  pub executor: ExecutorConfig,
  pub signer: SignerConfig,
  pub request_source: RequestSourceConfig,
  /// Capacity of the outbound report queue; a full queue blocks completion.
  #[serde(default = "default_report_queue_size")]
  pub report_queue_size: usize,
  /// How often the reconciliation path polls for missed open requests.
  #[serde(default = "default_poll_interval_ms")]
  pub poll_interval_ms: u64,
  /// Optional per-task deadline; a hung gateway call past this is converted
  /// into the 255 sentinel failure. Absent means wait forever.
  #[serde(default)]
  pub task_timeout_ms: Option<u64>,
}

/// Sandboxed executor endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
  pub url: String,
  /// Timeout forwarded to the executor service, in milliseconds.
  #[serde(default = "default_executor_timeout_ms")]
  pub timeout_ms: u64,
}

/// Signing service endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
  pub url: String,
}

/// Chain request-state lookup endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestSourceConfig {
  pub url: String,
}

impl NodeConfig {
  /// Load and validate configuration from a JSON file.
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Self = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<(), ConfigError> {
    if self.keys.is_empty() {
      return Err(ConfigError::Invalid {
        message: "at least one signing key is required".to_string(),
      });
    }
    if self.validator.is_empty() {
      return Err(ConfigError::Invalid {
        message: "validator identity must not be empty".to_string(),
      });
    }
    if self.report_queue_size == 0 {
      return Err(ConfigError::Invalid {
        message: "report_queue_size must be at least 1".to_string(),
      });
    }
    Ok(())
  }
}

fn default_report_queue_size() -> usize {
  100
}

fn default_poll_interval_ms() -> u64 {
  5_000
}

fn default_executor_timeout_ms() -> u64 {
  10_000
}

#[cfg(test)]
mod tests {
  use super::*;

  fn minimal_json() -> serde_json::Value {
    serde_json::json!({
      "chain_id": "oriole-1",
      "validator": "valoper1aaa",
      "keys": ["reporter-0", "reporter-1"],
      "executor": { "url": "http://localhost:9000/exec" },
      "signer": { "url": "http://localhost:9001/sign" },
      "request_source": { "url": "http://localhost:9002" }
    })
  }

  #[test]
  fn defaults_are_applied() {
    let config: NodeConfig = serde_json::from_value(minimal_json()).unwrap();
    assert_eq!(config.report_queue_size, 100);
    assert_eq!(config.poll_interval_ms, 5_000);
    assert_eq!(config.executor.timeout_ms, 10_000);
    assert!(config.task_timeout_ms.is_none());
    assert!(config.validate().is_ok());
  }

  #[test]
  fn empty_key_set_is_rejected() {
    let mut json = minimal_json();
    json["keys"] = serde_json::json!([]);
    let config: NodeConfig = serde_json::from_value(json).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::Invalid { .. })));
  }
}
