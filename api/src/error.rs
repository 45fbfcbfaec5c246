//! Error types shared by the execution engine

use thiserror::Error;

/// Failure reading from or writing to the data store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0}")]
    Other(String),
}

/// Required content could not be assembled for this cycle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionFailure {
    #[error("interval must be positive, got {0} minutes")]
    InvalidInterval(i32),
    #[error("text post resolved to empty text")]
    EmptyText,
    #[error("image post has no resolvable image")]
    MissingImage,
    #[error("carousel resolved {resolved} images, at least 2 are required")]
    CarouselTooSmall { resolved: usize },
    #[error("carousel configured with {configured} images, at most 10 are allowed")]
    CarouselTooLarge { configured: usize },
}

/// Category of a failed publish attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishErrorKind {
    /// Transport failure talking to the platform
    Http,
    /// Platform answered with a non-success status
    Api { status: u16 },
    /// Platform answered 2xx with a body we could not read
    Decode,
    /// No credential for the account
    MissingAccount,
    /// Credential lookup itself failed
    Store,
    /// Content rejected before any request was sent
    InvalidRequest,
}

/// A failed publish attempt. Transient and permanent failures are not distinguished.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PublishError {
    pub kind: PublishErrorKind,
    pub message: String,
}

impl PublishError {
    pub fn new(kind: PublishErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(PublishErrorKind::InvalidRequest, message)
    }
}

impl From<reqwest::Error> for PublishError {
    fn from(e: reqwest::Error) -> Self {
        let kind = if e.is_decode() {
            PublishErrorKind::Decode
        } else {
            PublishErrorKind::Http
        };
        PublishError::new(kind, format!("HTTP error: {e}"))
    }
}

/// Failure while processing a single automation
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("content resolution failed: {0}")]
    Resolution(#[from] ResolutionFailure),
}

/// Failure of a manual "post now" request
#[derive(Debug, Error)]
pub enum PostNowError {
    #[error("automation not found")]
    NotFound,
    #[error(transparent)]
    Cycle(#[from] CycleError),
    #[error("publish failed: {0}")]
    Publish(#[from] PublishError),
}

/// Invalid environment configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Failure starting or running the cron worker
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("apalis storage setup failed: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("worker monitor failed: {0}")]
    Monitor(#[from] std::io::Error),
}
