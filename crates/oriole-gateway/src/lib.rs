//! External collaborator seams for oriole.
//!
//! The reporting engine talks to three collaborators it does not implement:
//! the sandboxed executor, the signing keystore, and the chain request-state
//! lookup. Each is a trait here, with an HTTP adapter for the service form
//! each takes in a deployment.

mod error;
mod executor;
mod signer;
mod source;

pub use error::GatewayError;
pub use executor::{ExecResult, Executor, RestExecutor};
pub use signer::{HttpSigner, Signature, Signer};
pub use source::{HttpRequestSource, RawRequest, RequestRecord, RequestSource};
