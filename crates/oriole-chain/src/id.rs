//! Chain-assigned identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies one on-chain data request. Assigned by the chain, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub u64);

/// Identifies one data-source task within a request. Unique within that
/// request only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalId(pub u64);

/// Identifies a registered data source on the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataSourceId(pub u64);

macro_rules! id_impls {
  ($name:ident) => {
    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<u64> for $name {
      fn from(value: u64) -> Self {
        Self(value)
      }
    }
  };
}

id_impls!(RequestId);
id_impls!(ExternalId);
id_impls!(DataSourceId);
