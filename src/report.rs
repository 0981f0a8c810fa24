use std::{
    collections::BTreeMap,
    fs::OpenOptions,
    io::Write,
    path::{Path, PathBuf},
};

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::{HttpResponse, RequestError, Result};

/// Final structured result of an invocation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultEnvelope {
    /// Response body when it decodes as a JSON object, `null` otherwise.
    pub data: Option<Map<String, JsonValue>>,
    pub status_code: u16,
    /// Response headers; repeated headers keep every value.
    pub headers: BTreeMap<String, Vec<String>>,
}

impl ResultEnvelope {
    pub fn from_response(response: &HttpResponse) -> Self {
        let data = match serde_json::from_slice::<JsonValue>(&response.body) {
            Ok(JsonValue::Object(map)) => Some(map),
            Ok(_) => None,
            Err(err) => {
                if !response.body.is_empty() {
                    tracing::debug!("response body is not JSON: {err}");
                }
                None
            }
        };

        let mut headers: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in &response.headers {
            headers
                .entry(canonical_header_key(name.as_str()))
                .or_default()
                .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
        }

        Self {
            data,
            status_code: response.status,
            headers,
        }
    }

    pub fn to_json(&self) -> String {
        // Only string keys and JSON values: serialisation cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| "null".to_owned())
    }
}

/// Canonical MIME form of a header name: `x-request-id` becomes `X-Request-Id`.
fn canonical_header_key(name: &str) -> String {
    let mut upper = true;
    name.chars()
        .map(|c| {
            let mapped = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            mapped
        })
        .collect()
}

/// Writes `response=<json>` to a sink in the CI step-output format.
pub fn write_line(mut sink: impl Write, envelope: &ResultEnvelope) -> std::io::Result<()> {
    write!(sink, "response={}\r\n", envelope.to_json())?;
    sink.flush()
}

/// Appends the envelope to the step output file and optionally echoes it.
#[derive(Clone, Debug)]
pub struct ResultReporter {
    output_path: PathBuf,
    log_response: bool,
}

impl ResultReporter {
    pub fn new(output_path: impl Into<PathBuf>, log_response: bool) -> Self {
        Self {
            output_path: output_path.into(),
            log_response,
        }
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn report(&self, envelope: &ResultEnvelope) -> Result<()> {
        let output_error = |source: std::io::Error| RequestError::Output {
            path: self.output_path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .map_err(output_error)?;
        write_line(file, envelope).map_err(output_error)?;
        tracing::debug!(path = %self.output_path.display(), "result written");

        if self.log_response {
            println!("Response: {}", envelope.to_json());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderValue, CONTENT_TYPE, SET_COOKIE};
    use serde_json::json;

    use super::{canonical_header_key, write_line, ResultEnvelope, ResultReporter};
    use crate::{HttpResponse, RequestError};

    fn json_response() -> HttpResponse {
        let mut response = HttpResponse::new(201).with_body(r#"{"id":7,"tags":["a"]}"#);
        response
            .headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
            .headers
            .append(SET_COOKIE, HeaderValue::from_static("a=1"));
        response
            .headers
            .append(SET_COOKIE, HeaderValue::from_static("b=2"));
        response
    }

    #[test]
    fn envelope_carries_object_body_and_all_header_values() {
        let envelope = ResultEnvelope::from_response(&json_response());
        let value = serde_json::to_value(&envelope).expect("envelope must serialise");

        assert_eq!(
            value,
            json!({
                "data": {"id": 7, "tags": ["a"]},
                "status_code": 201,
                "headers": {
                    "Content-Type": ["application/json"],
                    "Set-Cookie": ["a=1", "b=2"]
                }
            })
        );
    }

    #[test]
    fn header_keys_use_canonical_mime_form() {
        assert_eq!(canonical_header_key("content-type"), "Content-Type");
        assert_eq!(canonical_header_key("x-custom-thing"), "X-Custom-Thing");
        assert_eq!(canonical_header_key("www-authenticate"), "Www-Authenticate");
        assert_eq!(canonical_header_key("ETAG"), "Etag");
        assert_eq!(canonical_header_key("x--double"), "X--Double");
    }

    #[test]
    fn non_object_bodies_become_null_data() {
        for body in ["not json", "[1,2,3]", "\"text\"", ""] {
            let envelope = ResultEnvelope::from_response(&HttpResponse::new(200).with_body(body));
            assert_eq!(envelope.data, None);
            assert!(envelope.to_json().starts_with(r#"{"data":null,"status_code":200"#));
        }
    }

    #[test]
    fn write_line_uses_step_output_format() {
        let envelope = ResultEnvelope::from_response(&HttpResponse::new(204));
        let mut sink = Vec::new();
        write_line(&mut sink, &envelope).expect("write must succeed");

        assert_eq!(
            String::from_utf8(sink).expect("output must be utf-8"),
            "response={\"data\":null,\"status_code\":204,\"headers\":{}}\r\n"
        );
    }

    #[test]
    fn reporter_appends_to_existing_file() {
        let dir = tempfile::tempdir().expect("must create temp dir");
        let path = dir.path().join("github_output");
        std::fs::write(&path, "previous=1\n").expect("must seed output file");

        let reporter = ResultReporter::new(&path, false);
        reporter
            .report(&ResultEnvelope::from_response(&json_response()))
            .expect("report must succeed");

        let contents = std::fs::read_to_string(&path).expect("must read output file");
        assert!(contents.starts_with("previous=1\nresponse={\"data\":{\"id\":7"));
        assert!(contents.ends_with("\r\n"));
    }

    #[test]
    fn unwritable_output_is_an_output_error() {
        let dir = tempfile::tempdir().expect("must create temp dir");
        let reporter = ResultReporter::new(dir.path().join("missing").join("out"), false);

        let err = reporter
            .report(&ResultEnvelope::from_response(&HttpResponse::new(200)))
            .expect_err("missing parent directory must fail");
        assert!(matches!(err, RequestError::Output { .. }));
    }
}
