use thiserror::Error;

/// Result type for transfer operations
pub type TransferResult<T> = Result<T, TransferError>;

/// Errors that can occur while coordinating uploads and range reads
#[derive(Error, Debug)]
pub enum TransferError {
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    #[error("invalid part number {part_number} (expected 1-{part_count})")]
    InvalidPartNumber { part_number: u32, part_count: u32 },

    #[error("upload session not found: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("invalid session state: {message}")]
    InvalidState { message: String },

    #[error("object not found: {name}")]
    NotFound { name: String },

    #[error("storage backend unavailable: {message}")]
    BackendUnavailable { message: String },

    #[error("upload of part {part_number} failed: {reason}")]
    PartUploadFailed { part_number: u32, reason: String },

    #[error("incomplete part set: missing part numbers {missing:?}")]
    IncompletePartSet { missing: Vec<u32> },

    #[error("finalize rejected by backend: {reason}")]
    FinalizeRejected { reason: String },

    #[error("a Range header is required for object reads")]
    MissingRangeHeader,

    #[error("malformed Range header: {header}")]
    MalformedRangeHeader { header: String },

    #[error("range {requested} not satisfiable for object of {object_length} bytes")]
    RangeNotSatisfiable {
        requested: String,
        object_length: u64,
    },

    #[error("stream interrupted: {message}")]
    StreamInterrupted { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("storage backend error: {source}")]
    Backend {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TransferError {
    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Create a session not found error
    pub fn session_not_found<S: Into<String>>(session_id: S) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Create an object not found error
    pub fn not_found<S: Into<String>>(name: S) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Create a backend unavailable (transient) error
    pub fn backend_unavailable<S: Into<String>>(message: S) -> Self {
        Self::BackendUnavailable {
            message: message.into(),
        }
    }

    /// Create a finalize rejected error
    pub fn finalize_rejected<S: Into<String>>(reason: S) -> Self {
        Self::FinalizeRejected {
            reason: reason.into(),
        }
    }

    /// Create a stream interrupted error
    pub fn stream_interrupted<S: Into<String>>(message: S) -> Self {
        Self::StreamInterrupted {
            message: message.into(),
        }
    }

    /// Create a backend error from any error type
    pub fn backend<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend {
            source: Box::new(error),
        }
    }

    /// Whether the retry policy may re-attempt the failed operation.
    ///
    /// Only transport-level failures qualify; logical and caller errors are
    /// never retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::BackendUnavailable { .. } | Self::StreamInterrupted { .. }
        )
    }

    /// Stable machine-readable kind, used at the HTTP boundary
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::InvalidPartNumber { .. } => "invalid_part_number",
            Self::SessionNotFound { .. } => "session_not_found",
            Self::InvalidState { .. } => "invalid_state",
            Self::NotFound { .. } => "not_found",
            Self::BackendUnavailable { .. } => "backend_unavailable",
            Self::PartUploadFailed { .. } => "part_upload_failed",
            Self::IncompletePartSet { .. } => "incomplete_part_set",
            Self::FinalizeRejected { .. } => "finalize_rejected",
            Self::MissingRangeHeader => "missing_range_header",
            Self::MalformedRangeHeader { .. } => "malformed_range_header",
            Self::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Self::StreamInterrupted { .. } => "stream_interrupted",
            Self::Io { .. } => "io",
            Self::Backend { .. } => "backend",
        }
    }
}
