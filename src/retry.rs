//! Retry loop around a single-attempt [`Transport`].

use tokio::time::sleep;

use crate::{
    AcceptancePolicy, AttemptOutcome, HttpResponse, OutboundRequest, RequestError, Result,
    RetryConfig, Transport,
};

/// Terminal outcome of the retry loop.
#[derive(Clone, Debug)]
pub struct RetryResult {
    /// The accepted outcome, or the last rejected one once retries ran out.
    pub outcome: AttemptOutcome,
    /// Attempts performed, including the first.
    pub attempts: u32,
}

impl RetryResult {
    /// Turns the terminal outcome into the accepted response, or the error
    /// describing why the request failed.
    pub fn into_accepted(self, policy: &AcceptancePolicy) -> Result<HttpResponse> {
        match self.outcome {
            AttemptOutcome::Response(response) if policy.accepts(response.status) => Ok(response),
            AttemptOutcome::Response(response) => Err(RequestError::Status {
                status: response.status,
                attempts: self.attempts,
            }),
            AttemptOutcome::Failed(source) => Err(RequestError::Transport {
                attempts: self.attempts,
                source,
            }),
        }
    }
}

/// Decorates a transport with acceptance-based retries.
///
/// Policy and retry settings are passed to every [`send`](Self::send) call,
/// so one instance can serve requests with different policies concurrently.
#[derive(Clone, Debug)]
pub struct RetryableTransport<T> {
    inner: T,
}

impl<T: Transport> RetryableTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    /// Sends `request` until an attempt is accepted by `policy` or
    /// `retry.max_retries` retries have been spent.
    ///
    /// Never fails: transport errors and rejected statuses are both just
    /// unacceptable outcomes. The body is re-sent from the request's single
    /// buffered copy on every attempt.
    pub async fn send(
        &self,
        request: &OutboundRequest,
        policy: &AcceptancePolicy,
        retry: &RetryConfig,
    ) -> RetryResult {
        let mut retries = 0u32;
        loop {
            tracing::debug!(
                attempt = retries + 1,
                method = %request.method(),
                url = %request.url(),
                "sending request"
            );
            let outcome = self.inner.send(request).await;

            if policy.is_acceptable(&outcome) {
                tracing::info!(
                    status = outcome.status(),
                    attempts = retries + 1,
                    "request accepted"
                );
                return RetryResult {
                    outcome,
                    attempts: retries + 1,
                };
            }

            if retries >= retry.max_retries {
                tracing::warn!(attempts = retries + 1, "retries exhausted");
                return RetryResult {
                    outcome,
                    attempts: retries + 1,
                };
            }

            let delay = retry.backoff.delay(retries);
            match &outcome {
                AttemptOutcome::Response(response) => tracing::warn!(
                    status = response.status,
                    attempt = retries + 1,
                    "status not accepted, retrying in {:?}",
                    delay
                ),
                AttemptOutcome::Failed(err) => tracing::warn!(
                    error = %err,
                    attempt = retries + 1,
                    "attempt failed, retrying in {:?}",
                    delay
                ),
            }
            // The rejected response is already fully read; release it before waiting.
            drop(outcome);

            sleep(delay).await;
            retries += 1;
        }
    }
}
