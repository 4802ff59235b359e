use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use super::GatewayError;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay for rate limiting, doubled on every retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(1000);

/// Build the shared HTTP client. Every request is bounded by `timeout`.
pub(crate) fn build_client(timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GatewayError::Unavailable(format!("Failed to build HTTP client: {}", e)))
}

/// Send a request, retrying on 429 with exponential backoff.
///
/// Returns the response for any 2xx status; every other status is turned
/// into a classified [`GatewayError`] using the response body.
pub(crate) async fn send(
    request: RequestBuilder,
    op: &'static str,
) -> Result<Response, GatewayError> {
    send_with_backoff(request, op, INITIAL_BACKOFF).await
}

async fn send_with_backoff(
    request: RequestBuilder,
    op: &'static str,
    initial_backoff: Duration,
) -> Result<Response, GatewayError> {
    let mut retries = 0;
    let mut backoff = initial_backoff;

    loop {
        let attempt = request.try_clone().ok_or_else(|| {
            GatewayError::InvalidResponse(format!("{}: request cannot be replayed", op))
        })?;

        let response = attempt.send().await?;
        let status = response.status();
        debug!(op, %status, "Remote store responded");

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(GatewayError::Unavailable(format!(
                    "{}: rate limited after {} retries",
                    op, MAX_RATE_LIMIT_RETRIES
                )));
            }
            warn!(
                op,
                retry = retries,
                backoff_ms = backoff.as_millis() as u64,
                "Rate limited, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
            continue;
        }

        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::from_status(status, &body));
    }
}
