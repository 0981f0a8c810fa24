use std::path::PathBuf;

use crate::TransportError;

/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    /// Malformed method, URL, header, query parameter or proxy setting.
    ///
    /// Raised before any network activity takes place.
    #[error("invalid request: {0}")]
    Build(String),
    /// Invalid runtime configuration such as an unusable accept list.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// No response was received on the final attempt.
    #[error("transport error after {attempts} attempt(s): {source}")]
    Transport {
        /// Total attempts performed, including the first.
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        source: TransportError,
    },
    /// A response was received but its status code is not accepted.
    #[error("request failed with status code {status}")]
    Status {
        /// Status code of the final response.
        status: u16,
        /// Total attempts performed, including the first.
        attempts: u32,
    },
    /// The result could not be written to the output sink.
    #[error("unable to write result to {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
