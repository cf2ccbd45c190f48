//! Task dispatch.
//!
//! The dispatcher turns chain notifications into execution work. It has two
//! entrances that converge on the same downstream path: `on_transaction` for
//! live event logs and `on_pending_request` for requests re-derived from
//! persisted chain state when the live event was missed. A shared in-flight
//! set keeps the two paths from ever dispatching the same request twice.

mod dispatcher;
mod error;
mod in_flight;

pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use in_flight::InFlightSet;
