use std::future::Future;
use std::time::Duration;

use axon_core::{AxonError, Result};

/// Run a fallible future under an optional deadline.
///
/// `None` means no timeout — the runtime's inherited default. An expired
/// deadline surfaces as [`AxonError::DeadlineExceeded`], which callers
/// contain exactly like any other boundary failure.
pub(crate) async fn with_deadline<T, F>(ms: Option<u64>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match ms {
        None => fut.await,
        Some(ms) => match tokio::time::timeout(Duration::from_millis(ms), fut).await {
            Ok(result) => result,
            Err(_) => Err(AxonError::DeadlineExceeded(ms)),
        },
    }
}
