//! Bridge from async handlers to the synchronous store.

use crate::error::{CoreError, Result};

/// Run store-bound work on the blocking thread pool.
///
/// The store and the orchestrator are synchronous; this is the one place
/// async code waits on them.
pub async fn run_blocking<T, E, F>(work: F) -> Result<T>
where
    F: FnOnce() -> std::result::Result<T, E> + Send + 'static,
    T: Send + 'static,
    E: Into<CoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| CoreError::TaskFailed(e.to_string()))?
        .map_err(Into::into)
}
