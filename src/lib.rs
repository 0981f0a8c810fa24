//! `http-request-action` sends a single configurable HTTP request and reports
//! the outcome as a structured result, retrying rejected attempts.
//!
//! The pieces compose linearly:
//! - [`RequestBuilder`] assembles an immutable [`OutboundRequest`]
//! - [`RetryableTransport`] sends it until [`AcceptancePolicy`] accepts a
//!   response or [`RetryConfig`] runs out of retries
//! - [`ResultReporter`] writes the [`ResultEnvelope`] to the step output file

pub mod cli;
pub mod logging;

mod error;
mod options;
mod policy;
mod report;
mod request;
mod retry;
mod transport;

pub use error::RequestError;
pub use options::{Backoff, ProxyConfig, RetryConfig, TransportOptions};
pub use policy::AcceptancePolicy;
pub use report::{write_line, ResultEnvelope, ResultReporter};
pub use request::{Authorization, OutboundRequest, RequestBuilder};
pub use retry::{RetryResult, RetryableTransport};
pub use transport::{
    AttemptOutcome, HttpResponse, ReqwestTransport, Transport, TransportError, TransportErrorKind,
};

pub type Result<T> = std::result::Result<T, RequestError>;
