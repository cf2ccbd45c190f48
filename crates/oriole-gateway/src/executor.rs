//! Sandboxed executor gateway.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Outcome of one sandboxed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecResult {
  /// The script's own exit code.
  pub exit_code: u32,
  pub output: Vec<u8>,
  /// Tag describing which executor implementation/version produced this.
  pub version: String,
}

/// Capability to resolve and run data-source executables in isolation.
#[async_trait]
pub trait Executor: Send + Sync {
  /// Resolve a data source's executable bytes from its content hash.
  async fn load(&self, data_source_hash: &str) -> Result<Vec<u8>, GatewayError>;

  /// Run an executable against `calldata` with the given environment values.
  async fn exec(
    &self,
    executable: &[u8],
    calldata: &str,
    env: &HashMap<String, String>,
  ) -> Result<ExecResult, GatewayError>;
}

/// HTTP adapter for a remote executor service.
///
/// `GET {base}/executables/{hash}` resolves an executable;
/// `POST {base}/exec` runs one.
pub struct RestExecutor {
  client: reqwest::Client,
  base_url: String,
  timeout_ms: u64,
}

#[derive(Serialize)]
struct ExecRequestBody<'a> {
  #[serde(with = "oriole_chain::hex_bytes")]
  executable: Vec<u8>,
  calldata: &'a str,
  env: &'a HashMap<String, String>,
  timeout_ms: u64,
}

#[derive(Deserialize)]
struct ExecResponseBody {
  returncode: u32,
  #[serde(default)]
  stdout: String,
  #[serde(default)]
  stderr: String,
  version: String,
  #[serde(default)]
  err: String,
}

#[derive(Deserialize)]
struct ExecutableResponseBody {
  #[serde(with = "oriole_chain::hex_bytes")]
  executable: Vec<u8>,
}

impl RestExecutor {
  pub fn new(base_url: impl Into<String>, timeout_ms: u64) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: trim_trailing_slash(base_url.into()),
      timeout_ms,
    }
  }
}

#[async_trait]
impl Executor for RestExecutor {
  async fn load(&self, data_source_hash: &str) -> Result<Vec<u8>, GatewayError> {
    let url = format!("{}/executables/{}", self.base_url, data_source_hash);
    let response = self.client.get(&url).send().await?;

    if !response.status().is_success() {
      return Err(GatewayError::Status {
        service: "executor",
        status: response.status().as_u16(),
      });
    }

    let body: ExecutableResponseBody =
      response
        .json()
        .await
        .map_err(|e| GatewayError::InvalidResponse {
          service: "executor",
          message: e.to_string(),
        })?;

    Ok(body.executable)
  }

  async fn exec(
    &self,
    executable: &[u8],
    calldata: &str,
    env: &HashMap<String, String>,
  ) -> Result<ExecResult, GatewayError> {
    let url = format!("{}/exec", self.base_url);
    let body = ExecRequestBody {
      executable: executable.to_vec(),
      calldata,
      env,
      timeout_ms: self.timeout_ms,
    };

    let response = self.client.post(&url).json(&body).send().await?;

    if !response.status().is_success() {
      return Err(GatewayError::Status {
        service: "executor",
        status: response.status().as_u16(),
      });
    }

    let body: ExecResponseBody =
      response
        .json()
        .await
        .map_err(|e| GatewayError::InvalidResponse {
          service: "executor",
          message: e.to_string(),
        })?;

    if !body.err.is_empty() {
      return Err(GatewayError::failed(body.err));
    }

    let output = if body.stdout.is_empty() && !body.stderr.is_empty() {
      body.stderr.into_bytes()
    } else {
      body.stdout.into_bytes()
    };

    Ok(ExecResult {
      exit_code: body.returncode,
      output,
      version: body.version,
    })
  }
}

fn trim_trailing_slash(mut url: String) -> String {
  while url.ends_with('/') {
    url.pop();
  }
  url
}
