//! The client-facing error type.
//!
//! Every [`AuthError`] crosses the service boundary through
//! `From<AuthError> for ApiError`, which matches [`ErrorKind`] exhaustively.
//! Outcomes the caller can act on keep their message; transport failures
//! and bugs are replaced with a fixed message and logged in full here, so
//! nothing internal leaks into a response.

use authgate_session::{AuthError, ErrorKind};

/// An error as it should be shown to a client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Stable numeric error code for response bodies.
    pub fn code(&self) -> u32 {
        match self.kind {
            ErrorKind::Params => 10_001,
            ErrorKind::UserNotRight => 10_002,
            ErrorKind::UserNameOccupied => 10_003,
            ErrorKind::UserInvalid => 10_004,
            ErrorKind::InvalidToken => 10_005,
            ErrorKind::TooManyRequests => 10_006,
            ErrorKind::Internal => 10_100,
            ErrorKind::Unavailable => 10_101,
        }
    }

    /// HTTP-style status for the error.
    pub fn status(&self) -> u16 {
        match self.kind {
            ErrorKind::Params => 400,
            ErrorKind::UserNotRight | ErrorKind::InvalidToken => 401,
            ErrorKind::UserInvalid => 403,
            ErrorKind::UserNameOccupied => 409,
            ErrorKind::TooManyRequests => 429,
            ErrorKind::Internal => 500,
            ErrorKind::Unavailable => 503,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::UserInvalid
            | ErrorKind::UserNotRight
            | ErrorKind::UserNameOccupied
            | ErrorKind::InvalidToken
            | ErrorKind::TooManyRequests
            | ErrorKind::Params => err.to_string(),
            ErrorKind::Unavailable => {
                tracing::error!(error = %err, source = ?std::error::Error::source(&err), "request failed: backend unavailable");
                "service temporarily unavailable".to_string()
            }
            ErrorKind::Internal => {
                tracing::error!(error = %err, source = ?std::error::Error::source(&err), "request failed: internal error");
                "internal server error".to_string()
            }
        };
        Self { kind, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_cache::CacheError;
    use authgate_session::Fault;
    use authgate_types::CodecError;

    #[test]
    fn test_from_user_facing_error_keeps_message() {
        let api: ApiError = AuthError::InvalidToken.into();

        assert_eq!(api.kind(), ErrorKind::InvalidToken);
        assert_eq!(api.message(), AuthError::InvalidToken.to_string());
        assert_eq!(api.status(), 401);
        assert_eq!(api.code(), 10_005);
    }

    #[test]
    fn test_from_params_keeps_detail() {
        let api: ApiError = AuthError::Params("invalid reset token or code".into()).into();
        assert!(api.message().contains("invalid reset token or code"));
        assert_eq!(api.status(), 400);
    }

    #[test]
    fn test_from_cache_failure_is_opaque_and_retryable() {
        let err = AuthError::internal("store tokens", CacheError::Unavailable("10.0.0.7:6379 refused".into()));

        let api: ApiError = err.into();

        assert_eq!(api.kind(), ErrorKind::Unavailable);
        assert_eq!(api.message(), "service temporarily unavailable");
        assert!(!api.message().contains("10.0.0.7"));
        assert!(api.is_retryable());
        assert_eq!(api.status(), 503);
    }

    #[test]
    fn test_from_codec_failure_is_opaque_internal() {
        let err = AuthError::internal("read access token", CodecError::InvalidRecord("truncated".into()));

        let api: ApiError = err.into();

        assert_eq!(api.kind(), ErrorKind::Internal);
        assert_eq!(api.message(), "internal server error");
        assert!(!api.is_retryable());
    }

    #[test]
    fn test_from_deadline_is_unavailable() {
        let api: ApiError = AuthError::internal("load user", Fault::DeadlineExceeded).into();
        assert_eq!(api.kind(), ErrorKind::Unavailable);
    }

    #[test]
    fn test_too_many_requests_maps_to_429() {
        let api: ApiError = AuthError::TooManyRequests.into();
        assert_eq!(api.status(), 429);
        assert!(api.is_retryable());
    }
}
