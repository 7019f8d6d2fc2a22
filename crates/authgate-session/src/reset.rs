//! Password reset: a short-lived token plus a numeric code.
//!
//! `apply_password_reset` stores `{user, code}` under a random token;
//! `reset_password` trades token + code + new password for a password change
//! that also logs the user out everywhere. The ticket is single use: it is
//! claimed by deleting it before the password is written, so of two
//! concurrent resets with the same ticket only the one whose delete removed
//! the entry goes on.

use authgate_cache::CacheBackend;
use authgate_types::ResetTicket;
use tracing::Instrument;

use crate::credentials::CredentialStore;
use crate::hasher::{PasswordHasher, meets_complexity};
use crate::{AuthError, RequestContext, TokenCoordinator, token};

/// What `apply_password_reset` hands back.
///
/// `code` is meant for out-of-band delivery (mail, SMS); only `token`
/// should go back over the channel that asked for the reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordResetGrant {
    pub token: String,
    pub code: String,
}

impl<C, S, H> TokenCoordinator<C, S, H>
where
    C: CacheBackend,
    S: CredentialStore,
    H: PasswordHasher,
{
    /// Opens a reset ticket for `login_name`.
    ///
    /// # Errors
    /// [`AuthError::UserNotRight`] if no such user exists; nothing is
    /// written to the cache in that case.
    pub async fn apply_password_reset(
        &self,
        ctx: &RequestContext,
        login_name: &str,
    ) -> Result<PasswordResetGrant, AuthError> {
        async {
            let user = self
                .call(ctx, "find user", self.credentials.find_by_login_name(login_name))
                .await?
                .ok_or(AuthError::UserNotRight)?;

            let grant = PasswordResetGrant {
                token: token::random_token(),
                code: token::reset_code(self.config.reset_code_len),
            };
            let ticket = ResetTicket {
                user_id: user.id,
                code: grant.code.clone(),
            };
            self.call(ctx, "store reset ticket", self.sessions.put_reset_ticket(&grant.token, &ticket))
                .await?;

            tracing::info!(user_id = %user.id, token = token::prefix(&grant.token), "password reset requested");
            Ok(grant)
        }
        .instrument(ctx.span("apply_password_reset"))
        .await
    }

    /// Sets a new password using a reset ticket, then revokes every session
    /// of the user.
    ///
    /// The ticket is consumed once the code matches, even if a later step
    /// fails. Session cleanup after the password write never fails the
    /// call: a leftover entry is logged and will expire by TTL.
    ///
    /// # Errors
    /// - [`AuthError::Params`] if the new password fails the complexity
    ///   policy or the code is wrong; the ticket stays usable in both cases
    /// - [`AuthError::InvalidToken`] if the ticket is unknown, expired, or
    ///   was claimed by another reset
    /// - [`AuthError::UserInvalid`] if the user is gone or blocked
    pub async fn reset_password(
        &self,
        ctx: &RequestContext,
        reset_token: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        async {
            if !meets_complexity(new_password) {
                return Err(AuthError::Params("password does not meet complexity policy".into()));
            }

            let ticket = self
                .call(ctx, "read reset ticket", self.sessions.reset_ticket(reset_token))
                .await?
                .ok_or(AuthError::InvalidToken)?;
            if !constant_time_eq(ticket.code.as_bytes(), code.as_bytes()) {
                tracing::info!(user_id = %ticket.user_id, "reset refused: code mismatch");
                return Err(AuthError::Params("invalid reset token or code".into()));
            }
            let claimed = self
                .call(ctx, "claim reset ticket", self.sessions.delete_reset_ticket(reset_token))
                .await?;
            if !claimed {
                tracing::info!(user_id = %ticket.user_id, "reset refused: ticket already claimed");
                return Err(AuthError::InvalidToken);
            }

            let user_id = ticket.user_id;
            let user = self
                .call(ctx, "load user", self.credentials.find_by_id(user_id))
                .await?;
            if !user.is_some_and(|u| !u.is_blocked()) {
                return Err(AuthError::UserInvalid);
            }

            let hash = self.hash_password(new_password).await?;
            self.call(ctx, "update password", self.credentials.update_password(user_id, hash))
                .await?;
            tracing::info!(%user_id, "password changed");

            if let Err(e) = self.revoke_all_sessions(ctx, user_id).await {
                tracing::error!(%user_id, error = %e, "password changed but session cleanup failed");
            }
            Ok(())
        }
        .instrument(ctx.span("reset_password"))
        .await
    }
}

/// Compares two byte strings without an early exit on the first mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::{BcryptHasher, MemoryCredentialStore, NewUser, SessionConfig};
    use authgate_cache::MemoryCache;
    use authgate_types::UserId;

    async fn setup() -> (TokenCoordinator<MemoryCache, MemoryCredentialStore, BcryptHasher>, UserId) {
        let store = Arc::new(MemoryCredentialStore::new());
        let user = store
            .create(
                NewUser {
                    login_name: "carol".into(),
                    ..NewUser::default()
                },
                BcryptHasher::new(4).hash("0ld!Passw").unwrap(),
            )
            .await
            .unwrap();
        let coordinator = TokenCoordinator::new(
            Arc::new(MemoryCache::open()),
            store,
            BcryptHasher::new(4),
            SessionConfig::default(),
        );
        (coordinator, user.id)
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"123456", b"123456"));
        assert!(!constant_time_eq(b"123456", b"123457"));
        assert!(!constant_time_eq(b"123456", b"12345"));
    }

    #[tokio::test]
    async fn test_apply_password_reset_grant_shape() {
        let (c, _) = setup().await;
        let ctx = RequestContext::generated();

        let grant = c.apply_password_reset(&ctx, "carol").await.unwrap();

        assert!(token::is_well_formed(&grant.token));
        assert_eq!(grant.code.len(), 6);
        assert!(grant.code.chars().all(|ch| ch.is_ascii_digit()));
    }

    #[tokio::test]
    async fn test_reset_password_weak_password_keeps_ticket() {
        let (c, _) = setup().await;
        let ctx = RequestContext::generated();
        let grant = c.apply_password_reset(&ctx, "carol").await.unwrap();

        let err = c
            .reset_password(&ctx, &grant.token, &grant.code, "weak")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Params(_)));

        c.reset_password(&ctx, &grant.token, &grant.code, "N3w!Passw")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_password_wrong_code_keeps_ticket() {
        let (c, _) = setup().await;
        let ctx = RequestContext::generated();
        let grant = c.apply_password_reset(&ctx, "carol").await.unwrap();
        let wrong = if grant.code == "000000" { "111111" } else { "000000" };

        c.reset_password(&ctx, &grant.token, wrong, "N3w!Passw")
            .await
            .unwrap_err();

        c.reset_password(&ctx, &grant.token, &grant.code, "N3w!Passw")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_reset_password_updates_stored_hash() {
        let (c, uid) = setup().await;
        let ctx = RequestContext::generated();
        let grant = c.apply_password_reset(&ctx, "carol").await.unwrap();

        c.reset_password(&ctx, &grant.token, &grant.code, "N3w!Passw")
            .await
            .unwrap();

        let record = c.credentials().find_by_id(uid).await.unwrap().unwrap();
        assert!(BcryptHasher::new(4).verify(&record.password_hash, "N3w!Passw"));
    }
}
