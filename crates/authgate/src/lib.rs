//! # Authgate
//!
//! Token issuance, rotation, and revocation for multi-platform user
//! sessions, backed by a key-value cache that doubles as the refresh lock.
//!
//! Authgate provides the session protocol; you provide the user table by
//! implementing [`CredentialStore`](authgate_session::CredentialStore) and
//! the service handles the rest: login, single-flight refresh with
//! stale-token detection, verification, logout, and password reset.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use authgate::prelude::*;
//!
//! # async fn run() -> Result<(), ApiError> {
//! authgate::telemetry::init("info");
//!
//! let service = AuthService::builder().open(Arc::new(MemoryCredentialStore::new()));
//! let ctx = RequestContext::generated();
//!
//! let tokens = service.refresh(&ctx, "40-hex-char refresh token").await?;
//! let verdict = service.verify(&ctx, &tokens.access_token).await?;
//! assert!(verdict.approved);
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod service;
pub mod telemetry;

pub use config::{AuthConfig, ConfigError};
pub use error::ApiError;
pub use service::{AuthService, AuthServiceBuilder};

pub mod prelude {
    pub use crate::{ApiError, AuthConfig, AuthService, AuthServiceBuilder};
    pub use authgate_session::{
        CredentialStore, ErrorKind, MemoryCredentialStore, NewUser, PasswordResetGrant,
        ProfileUpdate, RequestContext, SessionConfig,
    };
    pub use authgate_types::{Platform, TokenInfo, TokenVerify, UserBaseInfo, UserId};
}
