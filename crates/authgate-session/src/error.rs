//! Error types for the session layer.
//!
//! [`AuthError`] is what every coordinator operation returns. Its variants
//! are the outcomes a caller can act on (re-login, back off, fix input);
//! lower-layer failures are folded into [`AuthError::Internal`] together
//! with the name of the step that failed. [`ErrorKind`] is the closed
//! classification the service boundary matches on.

use authgate_cache::CacheError;
use authgate_types::CodecError;

use crate::credentials::CredentialError;
use crate::hasher::HashError;

/// Classification of an [`AuthError`].
///
/// Matched exhaustively at the service boundary to decide the response code
/// and whether the message may be shown to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The user is blocked or no longer exists. Terminal.
    UserInvalid,
    /// Wrong login name or password. Terminal, user facing.
    UserNotRight,
    /// The login name is already registered. Terminal, user facing.
    UserNameOccupied,
    /// The token is absent, expired, or stale. Terminal: log in again.
    InvalidToken,
    /// Another refresh of the same token is in flight. Retry after backoff.
    TooManyRequests,
    /// Malformed input. Terminal.
    Params,
    /// A cache or store call failed or ran past its deadline. Retryable.
    Unavailable,
    /// A bug or corrupt data. Not retryable, never shown verbatim.
    Internal,
}

impl ErrorKind {
    /// Returns `true` if retrying the same call later may succeed.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::TooManyRequests | Self::Unavailable)
    }
}

/// A failure below the session layer.
#[derive(Debug, thiserror::Error)]
pub enum Fault {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Hash(#[from] HashError),

    /// The call did not finish before the caller's deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

impl Fault {
    /// Transport-level faults that a retry may clear.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Cache(_) | Self::DeadlineExceeded => true,
            Self::Credentials(e) => e.is_transient(),
            Self::Codec(_) | Self::Hash(_) => false,
        }
    }
}

/// Errors returned by the session layer.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The user is missing or blocked.
    #[error("user is invalid or blocked")]
    UserInvalid,

    /// Login name or password did not match. Deliberately does not say which.
    #[error("login name or password is incorrect")]
    UserNotRight,

    /// Registration picked a login name that is already taken.
    #[error("login name is already taken")]
    UserNameOccupied,

    /// The presented token is unknown, expired, or was rotated away.
    #[error("token is invalid or expired")]
    InvalidToken,

    /// A refresh for the same token already holds the lock.
    #[error("too many concurrent requests")]
    TooManyRequests,

    /// The request failed validation.
    #[error("invalid parameters: {0}")]
    Params(String),

    /// A lower layer failed while running `step`.
    #[error("{step} failed: {source}")]
    Internal {
        step: &'static str,
        #[source]
        source: Fault,
    },
}

impl AuthError {
    /// Wraps a lower-layer failure with the step that produced it.
    pub fn internal(step: &'static str, source: impl Into<Fault>) -> Self {
        Self::Internal {
            step,
            source: source.into(),
        }
    }

    /// Returns the closed classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UserInvalid => ErrorKind::UserInvalid,
            Self::UserNotRight => ErrorKind::UserNotRight,
            Self::UserNameOccupied => ErrorKind::UserNameOccupied,
            Self::InvalidToken => ErrorKind::InvalidToken,
            Self::TooManyRequests => ErrorKind::TooManyRequests,
            Self::Params(_) => ErrorKind::Params,
            Self::Internal { source, .. } if source.is_transient() => {
                ErrorKind::Unavailable
            }
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }
}
