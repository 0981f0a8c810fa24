use std::{fmt, io::Read};

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Method, Url,
};
use serde_json::{Map, Value as JsonValue};

use crate::{RequestError, Result};

/// Credential placed in the `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub enum Authorization {
    /// Pre-encoded basic credential, sent as `Basic <token>`.
    Basic(String),
    /// Sent as `Bearer <token>`.
    Bearer(String),
}

impl Authorization {
    fn header_value(&self) -> String {
        match self {
            Self::Basic(token) => format!("Basic {token}"),
            Self::Bearer(token) => format!("Bearer {token}"),
        }
    }
}

impl fmt::Debug for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic(_) => f.write_str("Basic(<redacted>)"),
            Self::Bearer(_) => f.write_str("Bearer(<redacted>)"),
        }
    }
}

/// Fully assembled request, immutable once built.
///
/// The body is held as a single buffered copy so every attempt can
/// re-send exactly the same bytes.
#[derive(Clone)]
pub struct OutboundRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Bytes,
    authorization: Option<Authorization>,
}

impl OutboundRequest {
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Target URL with query parameters already merged.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Final header set, including the authorization header if any.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Credential the authorization header was built from, if any.
    ///
    /// A user header named `Authorization` still overrides it on the wire.
    pub fn authorization(&self) -> Option<&Authorization> {
        self.authorization.as_ref()
    }
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut headers = self.headers.clone();
        if headers.contains_key(AUTHORIZATION) {
            headers.insert(AUTHORIZATION, HeaderValue::from_static("<redacted>"));
        }
        f.debug_struct("OutboundRequest")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("headers", &headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

/// Assembles an [`OutboundRequest`] from raw configuration.
///
/// Headers are applied in this order, later entries replacing earlier ones:
/// the default `Content-Type: application/json`, the authorization header,
/// then user headers.
#[derive(Clone, Debug, Default)]
pub struct RequestBuilder {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    params: Vec<(String, String)>,
    body: Bytes,
    authorization: Option<Authorization>,
}

impl RequestBuilder {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Merges headers from a JSON object string such as `{"X-Trace": "abc"}`.
    pub fn headers_json(mut self, json: &str) -> Result<Self> {
        for (name, value) in parse_json_object("headers", json)? {
            self.headers.push((name, stringify(&value)));
        }
        Ok(self)
    }

    /// Appends a query parameter to any already present in the URL.
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Appends query parameters from a JSON object string.
    pub fn params_json(mut self, json: &str) -> Result<Self> {
        for (name, value) in parse_json_object("params", json)? {
            self.params.push((name, stringify(&value)));
        }
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Buffers the whole reader once; retries re-send the buffered copy.
    pub fn body_from_reader(mut self, mut reader: impl Read) -> Result<Self> {
        let mut buffer = Vec::new();
        reader
            .read_to_end(&mut buffer)
            .map_err(|err| RequestError::Build(format!("failed to read request body: {err}")))?;
        self.body = Bytes::from(buffer);
        Ok(self)
    }

    /// Sets a basic credential, replacing any bearer token. Empty tokens are ignored.
    pub fn basic_auth(self, token: impl Into<String>) -> Self {
        self.auth(Authorization::Basic(token.into()))
    }

    /// Sets a bearer token, replacing any basic credential. Empty tokens are ignored.
    pub fn bearer_auth(self, token: impl Into<String>) -> Self {
        self.auth(Authorization::Bearer(token.into()))
    }

    /// Replaces the credential. Empty tokens are ignored.
    pub fn auth(mut self, authorization: Authorization) -> Self {
        let (Authorization::Basic(token) | Authorization::Bearer(token)) = &authorization;
        if !token.is_empty() {
            self.authorization = Some(authorization);
        }
        self
    }

    pub fn build(self) -> Result<OutboundRequest> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| RequestError::Build(format!("invalid method '{}'", self.method)))?;

        let mut url = Url::parse(&self.url)
            .map_err(|err| RequestError::Build(format!("invalid url '{}': {err}", self.url)))?;
        if !self.params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(authorization) = &self.authorization {
            let value = HeaderValue::from_str(&authorization.header_value())
                .map_err(|_| RequestError::Build("invalid authorization token".to_owned()))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in &self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RequestError::Build(format!("invalid header name '{name}'")))?;
            let header_value = HeaderValue::from_str(value).map_err(|_| {
                RequestError::Build(format!("invalid value for header '{name}'"))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(OutboundRequest {
            method,
            url,
            headers,
            body: self.body,
            authorization: self.authorization,
        })
    }
}

fn parse_json_object(what: &str, json: &str) -> Result<Map<String, JsonValue>> {
    match serde_json::from_str::<JsonValue>(json) {
        Ok(JsonValue::Object(map)) => Ok(map),
        Ok(_) => Err(RequestError::Build(format!("{what} must be a JSON object"))),
        Err(err) => Err(RequestError::Build(format!("invalid {what} JSON: {err}"))),
    }
}

fn stringify(value: &JsonValue) -> String {
    match value {
        JsonValue::String(text) => text.clone(),
        other => other.to_string(),
    }
}
