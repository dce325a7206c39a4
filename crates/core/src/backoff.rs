use crate::error::ProviderError;
use std::future::Future;
use std::time::Duration;

pub(crate) const MAX_ATTEMPTS: u32 = 3;
pub(crate) const BASE_DELAY: Duration = Duration::from_millis(250);

/// Run a provider call with bounded retry and exponential backoff. Only
/// transient failures (timeouts, 429, 5xx) are retried; everything else
/// surfaces immediately.
pub(crate) async fn retry_transient<T, Fut>(
    provider: &'static str,
    mut operation: impl FnMut() -> Fut,
) -> Result<T, ProviderError>
where
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut delay = BASE_DELAY;
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < MAX_ATTEMPTS && error.is_transient() => {
                tracing::warn!(
                    provider,
                    attempt,
                    error = %error,
                    "transient provider failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = delay.saturating_mul(2);
                attempt += 1;
            }
            Err(error) => return Err(error),
        }
    }
}
