//! Bounded exponential backoff for close-path database writes (spec §4.1:
//! "retried with bounded exponential backoff (>=3 attempts)").

use std::time::Duration;

use mv_domain::error::{Error, Result};

/// Retry `f` up to `attempts` times with exponential backoff starting at
/// `base_delay`, doubling each attempt. Only retries errors for which
/// `Error::is_transient` returns true — anything else is returned
/// immediately.
pub async fn with_backoff<F, Fut, T>(attempts: u32, base_delay: Duration, mut f: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let mut delay = base_delay;
    let mut last_err = Error::Other("retry loop never ran".into());
    for attempt in 0..attempts.max(1) {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_transient() {
                    return Err(e);
                }
                last_err = e;
                if attempt + 1 < attempts {
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }
    Err(last_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<u32> = with_backoff(5, Duration::from_millis(1), move || {
            let calls = calls2.clone();
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::Transient("db hiccup".into()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_attempts_exhausted() {
        let result: Result<u32> =
            with_backoff(3, Duration::from_millis(1), || async {
                Err(Error::Transient("still down".into()))
            })
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn non_transient_errors_short_circuit() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: Result<u32> = with_backoff(5, Duration::from_millis(1), move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Validation("bad input".into()))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
