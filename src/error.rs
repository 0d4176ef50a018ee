use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Absent, or outside the caller's tenant. The two are indistinguishable
    /// to the caller.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Authorization violation: {0}")]
    AuthorizationViolation(String),

    #[error("Store unavailable: {0}")]
    TransientStoreFailure(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of a [`PipelineError`], for callers deciding how to
/// surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    ConsistencyViolation,
    AuthorizationViolation,
    TransientStoreFailure,
    Validation,
    Internal,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConsistencyViolation(_) => ErrorKind::ConsistencyViolation,
            Self::AuthorizationViolation(_) => ErrorKind::AuthorizationViolation,
            Self::TransientStoreFailure(_) | Self::Io(_) => ErrorKind::TransientStoreFailure,
            Self::Validation(_) => ErrorKind::Validation,
            Self::Serialization(_) | Self::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether the whole operation can be safely re-run
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransientStoreFailure
    }

    /// Whether the client's view is stale and should be refetched before the
    /// user retries
    pub fn requires_refresh(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::ConsistencyViolation | ErrorKind::AuthorizationViolation
        )
    }
}
