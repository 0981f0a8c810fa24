use std::time::Duration;

/// Wait schedule between a rejected attempt and the next retry.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Backoff {
    base: Duration,
}

impl Backoff {
    /// Exponential schedule without jitter: `base * 2^n`.
    pub fn exponential(base: Duration) -> Self {
        Self { base }
    }

    /// Retries immediately.
    pub fn none() -> Self {
        Self::exponential(Duration::ZERO)
    }

    /// Wait before the next retry, where `retries_done` counts the retries
    /// already performed (0 for the wait before the first retry).
    pub fn delay(&self, retries_done: u32) -> Duration {
        let exp = retries_done.min(31);
        self.base.saturating_mul(1u32 << exp)
    }
}

impl Default for Backoff {
    /// One second, doubling: 1s, 2s, 4s, ...
    fn default() -> Self {
        Self::exponential(Duration::from_secs(1))
    }
}

/// Configures how many times a rejected attempt is retried.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Wait schedule between attempts.
    pub backoff: Backoff,
}

impl RetryConfig {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            backoff: Backoff::default(),
        }
    }
}

/// Proxy that every connection is routed through.
#[derive(Clone, Eq, PartialEq)]
pub struct ProxyConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: None,
            password: None,
        }
    }

    /// Adds basic credentials. Ignored by the transport when `username` is empty.
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Returns `(username, password)` when a non-empty username is configured.
    pub(crate) fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|name| !name.is_empty())?;
        Some((username, self.password.as_deref().unwrap_or_default()))
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Static settings for the underlying network transport.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportOptions {
    /// Timeout applied to each attempt independently. Zero disables it.
    pub timeout: Duration,
    pub proxy: Option<ProxyConfig>,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(1_000),
            proxy: None,
        }
    }
}
