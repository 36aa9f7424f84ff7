use std::time::Duration;

use crate::retry::RetryPolicy;

/// Configuration for transfer coordination.
///
/// Threaded into [`crate::UploadSessionManager`] and [`crate::RangeStreamer`]
/// at construction; there is no process-wide state.
#[derive(Debug, Clone)]
pub struct TransferConfig {
    /// Part size for upload plans (bytes)
    pub chunk_size: u64,

    /// Upper bound on parts per session, protects memory/state
    pub max_parts: u32,

    /// Worker bound for concurrent part uploads within one session
    pub part_concurrency: usize,

    /// Window applied to open-ended range requests (`bytes=N-`), bounds the
    /// bytes served per request
    pub range_window: u64,

    /// Content type reported to the backend at session start
    pub content_type: String,

    /// Deadline for each individual backend call; a miss counts as a
    /// transient failure under the retry policy
    pub call_timeout: Duration,

    /// Retry policy shared by the upload and download paths
    pub retry: RetryPolicy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10 * 1024 * 1024, // 10MB
            max_parts: 10_000,
            part_concurrency: 4,
            range_window: 4 * 1024 * 1024, // 4MB
            content_type: "application/octet-stream".to_string(),
            call_timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

impl TransferConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the part size for upload plans
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set the maximum number of parts per session
    pub fn with_max_parts(mut self, max: u32) -> Self {
        self.max_parts = max;
        self
    }

    /// Set the worker bound for concurrent part uploads
    pub fn with_part_concurrency(mut self, workers: usize) -> Self {
        self.part_concurrency = workers.max(1);
        self
    }

    /// Set the window served for open-ended range requests
    pub fn with_range_window(mut self, bytes: u64) -> Self {
        self.range_window = bytes.max(1);
        self
    }

    /// Set the content type reported at session start
    pub fn with_content_type<S: Into<String>>(mut self, content_type: S) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Set the per-call backend deadline
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
