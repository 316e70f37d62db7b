//! Run output and run control types

use chunkwise_domain::AggregateReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Result of one extraction run
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRun {
    /// Per-chunk outcomes, in chunk order
    pub report: AggregateReport,

    /// Metadata about the run
    pub metadata: RunMetadata,
}

/// Metadata about an extraction run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Name of the model that served the run
    pub model_name: String,

    /// Number of chunks the input was split into
    pub chunk_count: usize,

    /// Chunking strategy used
    pub chunk_strategy: String,

    /// Unix timestamp (seconds) when the run started
    pub timestamp: u64,

    /// Processing time in milliseconds
    pub processing_time_ms: u64,

    /// Whether the run was cancelled before every chunk was dispatched
    pub cancelled: bool,
}

/// Stops a run from dispatching further chunks
///
/// Clones share the same state. Calls already in flight are allowed to
/// finish; chunks not yet dispatched are recorded as cancelled.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Create a handle in the not-cancelled state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once cancellation is requested
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_cancelled());
        clone.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves_after_cancel() {
        let handle = CancelHandle::new();
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("waiter should wake up")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_resolves_immediately_when_already_cancelled() {
        let handle = CancelHandle::new();
        handle.cancel();
        tokio::time::timeout(Duration::from_millis(100), handle.cancelled())
            .await
            .unwrap();
    }
}
