//! Token and session lifecycle for Authgate.
//!
//! This crate handles everything between "a user proved who they are" and
//! "that proof is no longer valid":
//!
//! 1. **Issuance**: minting access/refresh pairs per (user, platform)
//!    ([`TokenCoordinator::issue`], [`TokenCoordinator::login`])
//! 2. **Rotation**: single-flight refresh guarded by a cache lock, with
//!    stale-token detection ([`TokenCoordinator::refresh`])
//! 3. **Revocation**: logout, and logout-everywhere after a password reset
//!    ([`TokenCoordinator::logout`], [`TokenCoordinator::reset_password`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Service Layer (above)  ← maps AuthError to client-facing codes
//!     ↕
//! Session Layer (this crate)  ← token rotation, locking, revocation
//!     ↕                    ↘
//! Cache Layer (below)      CredentialStore / PasswordHasher (your impls)
//! ```

mod config;
mod context;
mod coordinator;
mod credentials;
mod error;
mod hasher;
mod lock;
mod reset;
mod store;
pub mod token;

pub use config::SessionConfig;
pub use context::RequestContext;
pub use coordinator::{TokenCoordinator, mask_login_name};
pub use credentials::{
    CredentialError, CredentialStore, MemoryCredentialStore, NewUser, ProfileUpdate, UserRecord,
};
pub use error::{AuthError, ErrorKind, Fault};
pub use hasher::{BcryptHasher, HashError, PasswordHasher, meets_complexity};
pub use lock::RefreshLock;
pub use reset::PasswordResetGrant;
pub use store::SessionCache;
