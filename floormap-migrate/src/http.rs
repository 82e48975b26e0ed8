//! Request helpers shared by both API clients
//!
//! - Retry with exponential backoff on rate limiting / transient 5xx
//! - Job submissions only resent when they cannot have been processed
//! - `Retry-After` support
//! - Status → `MigrateError` mapping

use reqwest::{RequestBuilder, Response, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{MigrateError, Result};

/// Statuses Catalyst Center answers while it is busy or rate limiting
pub const TRANSIENT_STATUSES: &[StatusCode] = &[
    StatusCode::TOO_MANY_REQUESTS,
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

/// Meraki only asks for retries through 429
pub const RATE_LIMIT_STATUSES: &[StatusCode] = &[StatusCode::TOO_MANY_REQUESTS];

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub max_backoff: Duration,
    pub retry_on: &'static [StatusCode],
}

impl RetryPolicy {
    /// 1s, 2s, 4s... capped at `max_backoff`
    fn backoff(&self, attempt: u32) -> Duration {
        let secs = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_secs(secs).min(self.max_backoff)
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Send `request`, retrying transient failures according to `policy`.
///
/// The final response is returned whatever its status; use [`check_status`]
/// to turn error statuses into `MigrateError`.
pub async fn send_with_retry(request: RequestBuilder, policy: &RetryPolicy) -> Result<Response> {
    send(request, policy, policy.retry_on, true).await
}

/// Send a request that starts work server side (export job, floor plan
/// creation). Only resent when the server cannot have acted on it: 429
/// answers and connection failures. 5xx and timeouts are returned as is.
pub async fn send_submission(request: RequestBuilder, policy: &RetryPolicy) -> Result<Response> {
    send(request, policy, RATE_LIMIT_STATUSES, false).await
}

async fn send(
    request: RequestBuilder,
    policy: &RetryPolicy,
    retry_on: &[StatusCode],
    retry_timeouts: bool,
) -> Result<Response> {
    let mut attempt = 0;
    loop {
        // bodies used here are always buffered, so cloning only fails for streams
        let Some(current) = request.try_clone() else {
            return Ok(request.send().await?);
        };

        match current.send().await {
            Ok(response) => {
                let status = response.status();
                if !retry_on.contains(&status) || attempt >= policy.max_retries {
                    return Ok(response);
                }
                let delay = retry_after(&response)
                    .map(|d| d.min(policy.max_backoff))
                    .unwrap_or_else(|| policy.backoff(attempt));
                warn!(
                    "{} replied {} ... will retry in {:?} ({}/{})",
                    response.url(),
                    status,
                    delay,
                    attempt + 1,
                    policy.max_retries
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) if (e.is_connect() || (retry_timeouts && e.is_timeout())) && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!("request failed with: {} ... will retry in {:?}", e, delay);
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e.into()),
        }
        attempt += 1;
    }
}

/// Map authorization failures to `Auth` and any other error status to `Api`
pub async fn check_status(response: Response, service: &'static str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("{} error body: {}", service, body);
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(MigrateError::Auth {
            service,
            reason: format!("server replied {status}"),
        }),
        _ => Err(MigrateError::Api {
            service,
            status: status.as_u16(),
            body,
        }),
    }
}
