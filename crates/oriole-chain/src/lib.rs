//! Chain-facing data model for oriole.
//!
//! This crate contains the types that cross the chain boundary: request and
//! task identifiers, raw tasks and their per-task reports, the assembled
//! report envelope, the request-verification message, and the decoded
//! transaction/event-log model together with data-request event parsing.

mod error;
mod event;
pub mod hex_bytes;
mod id;
mod report;
mod tx;
mod verification;

pub use error::EventError;
pub use event::{
  ATTR_ASK_COUNT, ATTR_CALLDATA, ATTR_CLIENT_ID, ATTR_DATA_SOURCE_HASH, ATTR_DATA_SOURCE_ID,
  ATTR_EXTERNAL_ID, ATTR_ID, ATTR_MIN_COUNT, ATTR_VALIDATOR, EVENT_RAW_REQUEST, EVENT_REQUEST,
  RequestEvent,
};
pub use id::{DataSourceId, ExternalId, RequestId};
pub use report::{
  FAIL_TO_LOAD_DATA_SOURCE, FeeEstimationData, INFRA_FAILURE_EXIT_CODE, RawReport, RawTask,
  ReportEnvelope, ReportMessage,
};
pub use tx::{Attribute, Event, EventLog, TxResult};
pub use verification::RequestVerification;
