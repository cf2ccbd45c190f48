//! Chain request-state lookup.

use async_trait::async_trait;
use serde::Deserialize;

use oriole_chain::{DataSourceId, ExternalId, RequestId};

use crate::error::GatewayError;

/// One assigned task as the chain persists it, before the data-source hash
/// has been resolved.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawRequest {
  pub data_source_id: DataSourceId,
  pub external_id: ExternalId,
  pub calldata: String,
}

/// A request's full persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestRecord {
  pub raw_requests: Vec<RawRequest>,
  pub requested_validators: Vec<String>,
  pub min_count: u64,
  #[serde(with = "oriole_chain::hex_bytes")]
  pub calldata: Vec<u8>,
  #[serde(default)]
  pub client_id: String,
}

/// Capability to read request state back from the chain.
///
/// This is the reconciliation path's view of the world: everything a live
/// event would have carried can be re-derived through these lookups.
#[async_trait]
pub trait RequestSource: Send + Sync {
  /// Fetch a request's full persisted state.
  async fn request(&self, id: RequestId) -> Result<RequestRecord, GatewayError>;

  /// Resolve a data source to its content hash.
  async fn data_source_hash(&self, id: DataSourceId) -> Result<String, GatewayError>;

  /// Requests the chain still considers open and assigned to `validator`.
  async fn pending_request_ids(&self, validator: &str) -> Result<Vec<RequestId>, GatewayError>;
}

/// HTTP adapter over a chain REST API.
pub struct HttpRequestSource {
  client: reqwest::Client,
  base_url: String,
}

#[derive(Deserialize)]
struct DataSourceResponseBody {
  hash: String,
}

#[derive(Deserialize)]
struct PendingRequestsResponseBody {
  #[serde(default)]
  request_ids: Vec<RequestId>,
}

impl HttpRequestSource {
  pub fn new(base_url: impl Into<String>) -> Self {
    let mut base_url = base_url.into();
    while base_url.ends_with('/') {
      base_url.pop();
    }
    Self {
      client: reqwest::Client::new(),
      base_url,
    }
  }

  async fn get_json<T: serde::de::DeserializeOwned>(&self, path: String) -> Result<T, GatewayError> {
    let url = format!("{}/{}", self.base_url, path);
    let response = self.client.get(&url).send().await?;

    if !response.status().is_success() {
      return Err(GatewayError::Status {
        service: "request source",
        status: response.status().as_u16(),
      });
    }

    response
      .json()
      .await
      .map_err(|e| GatewayError::InvalidResponse {
        service: "request source",
        message: e.to_string(),
      })
  }
}

#[async_trait]
impl RequestSource for HttpRequestSource {
  async fn request(&self, id: RequestId) -> Result<RequestRecord, GatewayError> {
    self.get_json(format!("oracle/requests/{}", id)).await
  }

  async fn data_source_hash(&self, id: DataSourceId) -> Result<String, GatewayError> {
    let body: DataSourceResponseBody = self.get_json(format!("oracle/data_sources/{}", id)).await?;
    Ok(body.hash)
  }

  async fn pending_request_ids(&self, validator: &str) -> Result<Vec<RequestId>, GatewayError> {
    let body: PendingRequestsResponseBody = self
      .get_json(format!("oracle/pending_requests/{}", validator))
      .await?;
    Ok(body.request_ids)
  }
}
