/// Retry, backoff and timeout helpers for network and storage calls
use std::fmt::Display;
use std::future::Future;
use std::pin::pin;

use futures::future::{Either, select};
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::FetchError;
use crate::platform::{HttpClient, HttpResponse, Runtime};

pub const BASE_DELAY_MS: u32 = 1_000;
pub const MAX_DELAY_MS: u32 = 10_000;

/// Exponential backoff: `min(base * 2^(attempt-1), cap)`.
///
/// Attempts are 1-based; attempt 0 is treated like attempt 1.
pub fn backoff_delay(attempt: u32, base_ms: u32, cap_ms: u32) -> u32 {
    let exponent = attempt.saturating_sub(1).min(31);
    base_ms.saturating_mul(1u32 << exponent).min(cap_ms)
}

/// How many times to try an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u32,
    pub max_delay_ms: u32,
    /// Per-attempt timeout, if the caller applies one
    pub timeout_ms: Option<u32>,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, timeout_ms: Option<u32>) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay_ms: BASE_DELAY_MS,
            max_delay_ms: MAX_DELAY_MS,
            timeout_ms,
        }
    }

    /// API requests: 3 attempts, 15s each
    pub const fn network() -> RetryPolicy {
        RetryPolicy::new(3, Some(15_000))
    }

    /// Storage reads and writes: 3 attempts, no timeout
    pub const fn storage() -> RetryPolicy {
        RetryPolicy::new(3, None)
    }

    pub fn delay_for(&self, attempt: u32) -> u32 {
        backoff_delay(attempt, self.base_delay_ms, self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::network()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedOut(pub u32);

/// Race `fut` against a runtime sleep of `ms`. The loser is dropped.
pub async fn with_timeout<F: Future>(
    runtime: &dyn Runtime,
    ms: u32,
    fut: F,
) -> Result<F::Output, TimedOut> {
    let fut = pin!(fut);
    match select(fut, runtime.sleep(ms)).await {
        Either::Left((output, _)) => Ok(output),
        Either::Right(_) => Err(TimedOut(ms)),
    }
}

/// Run `op(attempt)` until it succeeds or `policy.max_attempts` is spent,
/// sleeping the backoff delay between failures. Returns the last error.
pub async fn retry_with_backoff<T, E, F, Fut>(
    runtime: &dyn Runtime,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= max_attempts => return Err(e),
            Err(e) => {
                let delay = policy.delay_for(attempt);
                debug!("attempt {attempt}/{max_attempts} failed: {e}; retrying in {delay}ms");
                runtime.sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Check an HTTP response and decode its JSON object body
pub fn parse_json_response<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, FetchError> {
    if !response.is_success() {
        return Err(FetchError::Status {
            status: response.status,
            status_text: response.status_text.clone(),
        });
    }

    let value: Value =
        serde_json::from_str(&response.body).map_err(|_| FetchError::InvalidResponse)?;
    if !value.is_object() {
        return Err(FetchError::InvalidResponse);
    }

    serde_json::from_value(value).map_err(|e| FetchError::Decode(e.to_string()))
}

/// GET a JSON object with per-attempt timeout and exponential backoff.
///
/// Unlike the wallpaper fetcher built on top of it, this surfaces the last
/// error to the caller.
pub async fn fetch_json_with_retry<T: DeserializeOwned>(
    http: &dyn HttpClient,
    runtime: &dyn Runtime,
    url: &str,
    policy: &RetryPolicy,
) -> Result<T, FetchError> {
    retry_with_backoff(runtime, policy, |attempt| async move {
        debug!("GET {url} (attempt {attempt})");
        let response = match policy.timeout_ms {
            Some(ms) => with_timeout(runtime, ms, http.get(url))
                .await
                .map_err(|TimedOut(ms)| FetchError::Timeout(ms))?,
            None => http.get(url).await,
        }
        .map_err(FetchError::Network)?;

        parse_json_response(&response)
    })
    .await
}
