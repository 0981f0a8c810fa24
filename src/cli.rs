//! Command-line surface of the `http-request-action` binary.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};

use crate::{
    AcceptancePolicy, OutboundRequest, ProxyConfig, ReqwestTransport, RequestBuilder,
    RequestError, ResultEnvelope, ResultReporter, RetryConfig, RetryableTransport,
    TransportOptions,
};

/// Send one HTTP request, retrying until an accepted status code is returned,
/// and write the response to the step output file.
#[derive(Debug, Parser)]
#[command(name = "http-request-action", version, about, long_about = None)]
pub struct Cli {
    /// Request URL
    #[arg(long)]
    pub url: String,

    /// Request method
    #[arg(long, default_value = "GET")]
    pub method: String,

    /// Accepted response status codes, separated by commas
    #[arg(long, default_value = "200,201,204")]
    pub accept: String,

    /// Request headers as a JSON object
    #[arg(long, default_value = "{}")]
    pub headers: String,

    /// Query parameters as a JSON object
    #[arg(long, default_value = "{}")]
    pub params: String,

    /// Raw request body
    #[arg(long, default_value = "{}")]
    pub body: String,

    /// Pre-encoded basic auth credential
    #[arg(long)]
    pub basic_auth_token: Option<String>,

    /// Bearer token, takes precedence over basic auth
    #[arg(long)]
    pub bearer_token: Option<String>,

    /// Echo the result to stdout
    #[arg(
        long,
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true",
        action = ArgAction::Set
    )]
    pub log_response: bool,

    /// Number of retries after the first attempt
    #[arg(long, default_value_t = 1)]
    pub retries: u32,

    /// Per-attempt timeout in milliseconds, 0 for none
    #[arg(long, default_value_t = 1_000)]
    pub timeout: u64,

    /// Proxy URL
    #[arg(long)]
    pub proxy_url: Option<String>,

    /// Proxy auth username
    #[arg(long)]
    pub proxy_auth_username: Option<String>,

    /// Proxy auth password
    #[arg(long)]
    pub proxy_auth_password: Option<String>,

    /// File the result is appended to
    #[arg(long, env = "GITHUB_OUTPUT")]
    pub output: Option<PathBuf>,
}

impl Cli {
    /// Builds the outbound request. Fails before any network activity.
    pub fn request(&self) -> crate::Result<OutboundRequest> {
        let mut builder = RequestBuilder::new(&self.method, &self.url)
            .body(self.body.clone())
            .params_json(&self.params)?
            .headers_json(&self.headers)?;
        if let Some(token) = &self.basic_auth_token {
            builder = builder.basic_auth(token);
        }
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        builder.build()
    }

    pub fn policy(&self) -> crate::Result<AcceptancePolicy> {
        self.accept.parse()
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.retries)
    }

    pub fn transport_options(&self) -> TransportOptions {
        let proxy = self
            .proxy_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| ProxyConfig {
                url: url.to_owned(),
                username: self.proxy_auth_username.clone(),
                password: self.proxy_auth_password.clone(),
            });
        TransportOptions {
            timeout: Duration::from_millis(self.timeout),
            proxy,
        }
    }

    pub fn output_path(&self) -> crate::Result<PathBuf> {
        self.output
            .clone()
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or_else(|| {
                RequestError::Config(
                    "no output file: set GITHUB_OUTPUT or pass --output".to_owned(),
                )
            })
    }

    /// Runs the whole invocation: build, send with retries, report.
    pub async fn run(self) -> Result<()> {
        let request = self.request()?;
        let policy = self.policy()?;
        let retry = self.retry_config();
        let output = self.output_path()?;

        let inner = ReqwestTransport::new(&self.transport_options())
            .context("failed to set up transport")?;
        let transport = RetryableTransport::new(inner);
        tracing::debug!(?request, ?policy, ?retry, "request prepared");

        let response = transport
            .send(&request, &policy, &retry)
            .await
            .into_accepted(&policy)?;

        let envelope = ResultEnvelope::from_response(&response);
        ResultReporter::new(output, self.log_response).report(&envelope)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use clap::Parser;
    use reqwest::header::AUTHORIZATION;

    use super::Cli;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["http-request-action"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments must parse")
    }

    #[test]
    fn defaults_match_action_inputs() {
        let cli = parse(&["--url", "https://api.example.com"]);
        assert_eq!(cli.method, "GET");
        assert_eq!(cli.accept, "200,201,204");
        assert_eq!(cli.body, "{}");
        assert_eq!(cli.retries, 1);
        assert_eq!(cli.timeout, 1_000);
        assert!(!cli.log_response);
        assert_eq!(cli.transport_options().timeout, Duration::from_secs(1));
        assert_eq!(cli.transport_options().proxy, None);
    }

    #[test]
    fn url_is_required() {
        assert!(Cli::try_parse_from(["http-request-action"]).is_err());
    }

    #[test]
    fn log_response_accepts_flag_and_explicit_value() {
        assert!(parse(&["--url", "http://x", "--log-response"]).log_response);
        assert!(parse(&["--url", "http://x", "--log-response=true"]).log_response);
        assert!(!parse(&["--url", "http://x", "--log-response=false"]).log_response);
    }

    #[test]
    fn builds_request_with_bearer_precedence() {
        let cli = parse(&[
            "--url",
            "https://api.example.com/v1",
            "--method",
            "POST",
            "--params",
            r#"{"dry_run": true}"#,
            "--basic-auth-token",
            "dXNlcjpwYXNz",
            "--bearer-token",
            "tok",
            "--body",
            r#"{"a":1}"#,
        ]);
        let request = cli.request().expect("request must build");
        assert_eq!(request.method().as_str(), "POST");
        assert_eq!(request.url().query(), Some("dry_run=true"));
        assert_eq!(request.headers()[AUTHORIZATION], "Bearer tok");
        assert_eq!(&request.body()[..], br#"{"a":1}"#);
    }

    #[test]
    fn proxy_options_follow_flags() {
        let cli = parse(&[
            "--url",
            "http://x",
            "--proxy-url",
            "http://proxy:3128",
            "--proxy-auth-username",
            "kit",
            "--proxy-auth-password",
            "pw",
            "--timeout",
            "250",
        ]);
        let options = cli.transport_options();
        let proxy = options.proxy.expect("proxy must be configured");
        assert_eq!(proxy.url, "http://proxy:3128");
        assert_eq!(proxy.username.as_deref(), Some("kit"));
        assert_eq!(options.timeout, Duration::from_millis(250));

        let empty = parse(&["--url", "http://x", "--proxy-url", ""]);
        assert_eq!(empty.transport_options().proxy, None);
    }

    #[test]
    fn missing_output_path_is_a_config_error() {
        let mut cli = parse(&["--url", "http://x"]);
        cli.output = None;
        assert!(cli.output_path().is_err());
    }

    #[test]
    fn invalid_accept_list_is_rejected() {
        let cli = parse(&["--url", "http://x", "--accept", "200,abc"]);
        assert!(cli.policy().is_err());
    }

    #[test]
    fn zero_timeout_is_passed_through_as_disabled() {
        let cli = parse(&["--url", "http://x", "--timeout", "0"]);
        let options = cli.transport_options();
        assert!(options.timeout.is_zero());
        assert!(crate::ReqwestTransport::new(&options).is_ok());
    }
}
