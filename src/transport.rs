use std::{fmt, future::Future};

use bytes::Bytes;
use reqwest::header::HeaderMap;

use crate::{OutboundRequest, RequestError, Result, TransportOptions};

/// Sends a single attempt of a request. Implementations never retry.
pub trait Transport {
    fn send(&self, request: &OutboundRequest) -> impl Future<Output = AttemptOutcome> + Send;
}

/// Result of one attempt: either a received response or a failure to get one.
#[derive(Clone, Debug)]
pub enum AttemptOutcome {
    Response(HttpResponse),
    Failed(TransportError),
}

impl AttemptOutcome {
    /// Status code of the received response, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Response(response) => Some(response.status),
            Self::Failed(_) => None,
        }
    }
}

/// Fully received HTTP response.
#[derive(Clone, Debug, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

/// Broad class of a transport-level failure.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, TLS handshake failure.
    Connect,
    /// The attempt exceeded the configured timeout.
    Timeout,
    /// The response body could not be read completely.
    Body,
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connect => "connection failed",
            Self::Timeout => "timed out",
            Self::Body => "failed to read response body",
            Self::Other => "request failed",
        };
        f.write_str(label)
    }
}

/// An attempt that produced no usable response.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, error_chain(&err))
    }
}

// reqwest's top-level message rarely names the actual cause.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Network transport backed by `reqwest`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds the client with a per-attempt timeout and optional proxy.
    ///
    /// A zero timeout means attempts never time out. Without a proxy,
    /// environment proxy variables are ignored.
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if !options.timeout.is_zero() {
            builder = builder.timeout(options.timeout);
        }

        builder = match &options.proxy {
            Some(config) => {
                let mut proxy = reqwest::Proxy::all(&config.url).map_err(|err| {
                    RequestError::Build(format!("invalid proxy url '{}': {err}", config.url))
                })?;
                if let Some((username, password)) = config.credentials() {
                    proxy = proxy.basic_auth(username, password);
                }
                builder.proxy(proxy)
            }
            None => builder.no_proxy(),
        };

        let http = builder
            .build()
            .map_err(|err| RequestError::Build(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { http })
    }
}

impl Transport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> AttemptOutcome {
        let mut builder = self
            .http
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if !request.body().is_empty() {
            // Cheap reference-counted copy of the buffered body.
            builder = builder.body(request.body().clone());
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => return AttemptOutcome::Failed(err.into()),
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        // Reading to the end releases the connection back to the pool.
        match response.bytes().await {
            Ok(body) => AttemptOutcome::Response(HttpResponse {
                status,
                headers,
                body,
            }),
            Err(err) => AttemptOutcome::Failed(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        AttemptOutcome, HttpResponse, ReqwestTransport, TransportError, TransportErrorKind,
    };
    use crate::{ProxyConfig, RequestError, TransportOptions};

    #[test]
    fn transport_error_display_includes_kind() {
        let err = TransportError::new(TransportErrorKind::Timeout, "operation timed out");
        assert_eq!(err.to_string(), "timed out: operation timed out");
    }

    #[test]
    fn outcome_status_only_for_responses() {
        assert_eq!(AttemptOutcome::Response(HttpResponse::new(204)).status(), Some(204));
        let failed =
            AttemptOutcome::Failed(TransportError::new(TransportErrorKind::Connect, "refused"));
        assert_eq!(failed.status(), None);
    }

    #[test]
    fn builds_with_authenticated_proxy() {
        let options = TransportOptions {
            proxy: Some(
                ProxyConfig::new("http://proxy.internal:3128").with_credentials("kit", "pw"),
            ),
            ..TransportOptions::default()
        };
        assert!(ReqwestTransport::new(&options).is_ok());
    }

    #[test]
    fn rejects_unparseable_proxy_url() {
        let options = TransportOptions {
            proxy: Some(ProxyConfig::new("not a url")),
            ..TransportOptions::default()
        };
        match ReqwestTransport::new(&options) {
            Err(RequestError::Build(message)) => assert!(message.contains("proxy")),
            other => panic!("expected build error, got {other:?}"),
        }
    }
}
