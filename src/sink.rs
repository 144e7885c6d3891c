use crate::record::LogRecord;
use async_trait::async_trait;
use std::error::Error;

/// Asynchronous destination for batches of [`LogRecord`]s produced by the
/// logging layer.
///
/// Implementations are responsible for transporting records to a concrete
/// backend (Slack, stdout, etc). The layer calls `export` from a
/// background task and never awaits it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Deliver a whole batch to the underlying backend.
    ///
    /// **Parameters**
    /// - `batch`: records in the order they were logged.
    ///
    /// **Returns**
    /// - `Ok(())` if the batch was accepted by the backend.
    /// - `Err(..)` if the backend failed (network error, serialization
    ///   error, HTTP status, etc.). The layer reports the failure and
    ///   drops the batch; it does not retry.
    ///
    /// The batch is borrowed for the duration of the call only.
    async fn export(&self, batch: &[LogRecord]) -> Result<(), Box<dyn Error + Send + Sync>>;
}
