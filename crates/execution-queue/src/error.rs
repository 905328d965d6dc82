use core_types::CoreError;

/// Errors surfaced by the execution queue itself, as distinct from errors
/// an executed job returns.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionQueueError {
    /// The queue was at capacity when an enqueue was attempted (§4.5
    /// "Capacity"). The item was dropped, not queued.
    #[error("queue at capacity ({capacity}), item dropped")]
    QueueFull { capacity: usize },

    /// `Stop()` was called; no further items are accepted.
    #[error("queue is stopped")]
    Stopped,
}

impl From<ExecutionQueueError> for CoreError {
    fn from(err: ExecutionQueueError) -> Self {
        Self::Fatal(err.to_string())
    }
}
