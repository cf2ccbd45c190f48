//! Signing gateway.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use oriole_keys::KeyRing;

use crate::error::GatewayError;

/// A signature and the public key that verifies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
  pub signature: Vec<u8>,
  pub public_key: Vec<u8>,
}

/// Capability to sign a verification message with one of the managed keys,
/// identified by index into the configured key ring.
#[async_trait]
pub trait Signer: Send + Sync {
  async fn sign(&self, key_index: usize, message: &[u8]) -> Result<Signature, GatewayError>;
}

/// HTTP adapter for a remote signing service: `POST {base}/sign`.
pub struct HttpSigner {
  client: reqwest::Client,
  url: String,
  /// Resolves a ring index to the key name the service knows.
  keys: Arc<KeyRing>,
}

#[derive(Serialize)]
struct SignRequestBody<'a> {
  key: &'a str,
  #[serde(with = "oriole_chain::hex_bytes")]
  message: Vec<u8>,
}

#[derive(Deserialize)]
struct SignResponseBody {
  #[serde(with = "oriole_chain::hex_bytes")]
  signature: Vec<u8>,
  #[serde(with = "oriole_chain::hex_bytes")]
  public_key: Vec<u8>,
}

impl HttpSigner {
  pub fn new(url: impl Into<String>, keys: Arc<KeyRing>) -> Self {
    Self {
      client: reqwest::Client::new(),
      url: url.into(),
      keys,
    }
  }
}

#[async_trait]
impl Signer for HttpSigner {
  async fn sign(&self, key_index: usize, message: &[u8]) -> Result<Signature, GatewayError> {
    let key = self
      .keys
      .key(key_index)
      .ok_or_else(|| GatewayError::failed(format!("no key at index {}", key_index)))?;

    let body = SignRequestBody {
      key,
      message: message.to_vec(),
    };

    let response = self.client.post(&self.url).json(&body).send().await?;

    if !response.status().is_success() {
      return Err(GatewayError::Status {
        service: "signer",
        status: response.status().as_u16(),
      });
    }

    let body: SignResponseBody =
      response
        .json()
        .await
        .map_err(|e| GatewayError::InvalidResponse {
          service: "signer",
          message: e.to_string(),
        })?;

    Ok(Signature {
      signature: body.signature,
      public_key: body.public_key,
    })
  }
}
