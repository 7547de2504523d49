//! Outbound HTTP plumbing shared by the geocoding, poem and store clients.
//!
//! Every third-party call goes through [`send_with_retry`]: one request, and on a
//! transport failure, 429 or 5xx a single retry after a short backoff. When the retry
//! is spent the caller gets [`ServiceError::Unavailable`] instead of a raw transport
//! error.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::warn;

/// First attempt plus one retry.
pub const MAX_ATTEMPTS: u32 = 2;
const BACKOFF_MS: u64 = 500;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{service} is unavailable after {attempts} attempts: {reason}")]
    Unavailable {
        service: &'static str,
        attempts: u32,
        reason: String,
    },

    #[error("{service} request failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned an unreadable response: {reason}")]
    Parse {
        service: &'static str,
        reason: String,
    },
}

/// Builds the HTTP client used for all outbound calls.
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("mycontacts/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Sends the request produced by `make_request`, retrying once on transient failures.
///
/// Any other status (including 4xx) is handed back to the caller untouched so each
/// client can apply its own error semantics.
pub async fn send_with_retry<F>(
    service: &'static str,
    make_request: F,
) -> Result<Response, ServiceError>
where
    F: Fn() -> RequestBuilder,
{
    let mut last_reason = String::new();

    for attempt in 0..MAX_ATTEMPTS {
        if attempt > 0 {
            let delay = Duration::from_millis(BACKOFF_MS * (1 << (attempt - 1)));
            warn!(
                "{service} call attempt {} failed, retrying after {}ms...",
                attempt,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let response = match make_request().send().await {
            Ok(r) => r,
            Err(e) => {
                last_reason = e.to_string();
                continue;
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            warn!("{service} returned {status}: {body}");
            last_reason = format!("status {}: {body}", status.as_u16());
            continue;
        }

        return Ok(response);
    }

    Err(ServiceError::Unavailable {
        service,
        attempts: MAX_ATTEMPTS,
        reason: last_reason,
    })
}

/// Reads a response body as text, mapping read failures to [`ServiceError::Transport`].
pub async fn read_body(service: &'static str, response: Response) -> Result<String, ServiceError> {
    response
        .text()
        .await
        .map_err(|source| ServiceError::Transport { service, source })
}
