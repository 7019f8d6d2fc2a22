//! The token coordinator: issues, rotates, verifies, and revokes sessions.
//!
//! This is the central piece of the session layer. Per (user, platform)
//! pair a session moves through:
//!
//! ```text
//! NoSession ──issue──→ Active ──refresh──→ Active' ──logout──→ Revoked
//!                        │   (under lock)     │
//!                        └────── login again ─┘  (last write wins)
//! ```
//!
//! # Concurrency note
//!
//! The coordinator holds no mutable state of its own. Everything lives in
//! the cache, and the only ordering it relies on is the [`RefreshLock`]: for
//! one refresh-token value at most one rotation runs at a time. A loser
//! either sees the lock busy (`TooManyRequests`) or, if it arrives after the
//! rotation finished, a stale token (`InvalidToken`). A rotation still
//! running when the marker's TTL runs out is abandoned with a retryable
//! error, since past that point another refresh may take the lock.
//!
//! Fresh logins don't take the lock. Two logins racing on the same platform
//! both succeed and the later index write wins.

use std::future::Future;
use std::sync::Arc;

use authgate_cache::CacheBackend;
use authgate_types::{Platform, SessionId, SessionInfo, TokenInfo, TokenVerify, UserBaseInfo, UserId};
use tokio::time::Instant;
use tracing::Instrument;

use crate::credentials::{CredentialError, CredentialStore, NewUser, ProfileUpdate};
use crate::error::Fault;
use crate::hasher::{HashError, PasswordHasher, meets_complexity};
use crate::lock::RefreshLock;
use crate::store::SessionCache;
use crate::token;
use crate::{AuthError, RequestContext, SessionConfig};

/// Issues and rotates tokens over a shared cache.
///
/// Generic over the cache backend, the credential store, and the password
/// hasher so each can be swapped (or faked in tests) independently.
pub struct TokenCoordinator<C, S, H> {
    pub(crate) sessions: SessionCache<C>,
    lock: RefreshLock<C>,
    pub(crate) credentials: Arc<S>,
    hasher: Arc<H>,
    pub(crate) config: SessionConfig,
}

impl<C, S, H> TokenCoordinator<C, S, H>
where
    C: CacheBackend,
    S: CredentialStore,
    H: PasswordHasher,
{
    /// Builds a coordinator over an already-open cache handle.
    ///
    /// `config` is run through [`SessionConfig::validated`] first.
    pub fn new(cache: Arc<C>, credentials: Arc<S>, hasher: H, config: SessionConfig) -> Self {
        let config = config.validated();
        Self {
            sessions: SessionCache::new(Arc::clone(&cache), &config),
            lock: RefreshLock::new(cache, config.refresh_lock_ttl()),
            credentials,
            hasher: Arc::new(hasher),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn credentials(&self) -> &Arc<S> {
        &self.credentials
    }

    /// Issues a token pair for `user_id` on `platform`.
    ///
    /// With `session_id = None` a new session id is minted (login); with
    /// `Some` it is carried over (refresh). Any previous pair for the same
    /// platform is revoked after the new one is written: the old access
    /// token is deleted and the old refresh token is demoted to a
    /// short-lived superseded entry.
    ///
    /// # Errors
    /// - [`AuthError::Params`] for an empty platform
    /// - [`AuthError::UserInvalid`] if the user is missing or blocked
    /// - [`AuthError::Internal`] if any cache write fails; the sequence
    ///   stops there
    pub async fn issue(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        platform: &Platform,
        session_id: Option<SessionId>,
    ) -> Result<TokenInfo, AuthError> {
        self.issue_inner(ctx, user_id, platform, session_id)
            .instrument(ctx.span("issue"))
            .await
    }

    /// Rotates a refresh token into a fresh pair, keeping the session id.
    ///
    /// # Errors
    /// - [`AuthError::TooManyRequests`] if a refresh of the same token is
    ///   already in flight
    /// - [`AuthError::InvalidToken`] if the token is unknown, expired, or
    ///   was already rotated away
    /// - [`AuthError::Internal`] with [`Fault::DeadlineExceeded`] if the
    ///   rotation could not finish within the lock TTL; nothing was handed
    ///   out and the presented token is still the current one
    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<TokenInfo, AuthError> {
        async {
            if !token::is_well_formed(refresh_token) {
                return Err(AuthError::InvalidToken);
            }

            // Taken before the marker is written, so it never outlasts it.
            let held_until = Instant::now() + self.lock.ttl();
            let acquired = self
                .call(ctx, "acquire refresh lock", self.lock.acquire(refresh_token))
                .await?;
            if !acquired {
                tracing::info!(token = token::prefix(refresh_token), "refresh already in flight");
                return Err(AuthError::TooManyRequests);
            }

            let Ok(outcome) =
                tokio::time::timeout_at(held_until, self.refresh_locked(ctx, refresh_token)).await
            else {
                tracing::warn!(
                    token = token::prefix(refresh_token),
                    lock_ttl_ms = self.lock.ttl().as_millis() as u64,
                    "refresh outlived its lock, abandoned"
                );
                return Err(AuthError::internal("refresh under lock", Fault::DeadlineExceeded));
            };
            self.release_lock(refresh_token, held_until).await;
            outcome
        }
        .instrument(ctx.span("refresh"))
        .await
    }

    /// Checks an access token. Never mutates state.
    ///
    /// A token that is missing, expired, or not shaped like a generated
    /// token is denied; only a cache failure is an error.
    pub async fn verify(
        &self,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<TokenVerify, AuthError> {
        async {
            if !token::is_well_formed(access_token) {
                return Ok(TokenVerify::denied());
            }
            let session = self
                .call(ctx, "read access token", self.sessions.access_session(access_token))
                .await?;
            Ok(match session {
                Some(session) => TokenVerify::approved(&session),
                None => TokenVerify::denied(),
            })
        }
        .instrument(ctx.span("verify"))
        .await
    }

    /// Revokes the session of `user_id` on `platform`.
    ///
    /// Deletes the access token, the refresh token, then the index entry.
    /// Idempotent: with no session on record this is a no-op. Only a failure
    /// to delete the access token is returned; once that is gone the session
    /// is unusable, so later failures are logged and left to expire.
    pub async fn logout(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        platform: &Platform,
    ) -> Result<(), AuthError> {
        async {
            if platform.is_empty() {
                return Err(AuthError::Params("platform must not be empty".into()));
            }
            let Some(session) = self
                .call(ctx, "read session index", self.sessions.platform_session(user_id, platform))
                .await?
            else {
                tracing::debug!(%user_id, %platform, "logout with no session on record");
                return Ok(());
            };

            self.call(ctx, "delete access token", self.sessions.delete_access(&session.access_token))
                .await?;

            if let Err(e) = self
                .call(ctx, "delete refresh token", self.sessions.delete_refresh(&session.refresh_token))
                .await
            {
                tracing::warn!(%user_id, %platform, error = %e, "logout left refresh token behind");
            }
            if let Err(e) = self
                .call(ctx, "delete session index", self.sessions.delete_platform_session(user_id, platform))
                .await
            {
                tracing::warn!(%user_id, %platform, error = %e, "logout left session index behind");
            }

            tracing::info!(%user_id, %platform, session_id = %session.session_id, "logged out");
            Ok(())
        }
        .instrument(ctx.span("logout"))
        .await
    }

    /// Authenticates by login name and password, then issues a new session.
    ///
    /// # Errors
    /// - [`AuthError::UserNotRight`] for an unknown login name or a wrong
    ///   password (the two are not distinguished)
    /// - [`AuthError::UserInvalid`] if the account is blocked
    pub async fn login(
        &self,
        ctx: &RequestContext,
        login_name: &str,
        password: &str,
        platform: &Platform,
    ) -> Result<(UserBaseInfo, TokenInfo), AuthError> {
        async {
            let user = self
                .call(ctx, "find user", self.credentials.find_by_login_name(login_name))
                .await?;
            let user = match user {
                Some(user) if self.verify_password(&user.password_hash, password).await? => user,
                _ => {
                    tracing::info!("login refused: bad login name or password");
                    return Err(AuthError::UserNotRight);
                }
            };
            if user.is_blocked() {
                tracing::info!(user_id = %user.id, "login refused: user blocked");
                return Err(AuthError::UserInvalid);
            }

            let tokens = self.issue_inner(ctx, user.id, platform, None).await?;
            Ok((user.base_info(), tokens))
        }
        .instrument(ctx.span("login"))
        .await
    }

    /// Creates a user account. Does not log the user in.
    ///
    /// # Errors
    /// - [`AuthError::Params`] for an empty login name or a password that
    ///   fails [`meets_complexity`]
    /// - [`AuthError::UserNameOccupied`] if the login name is taken
    pub async fn register(
        &self,
        ctx: &RequestContext,
        user: NewUser,
        password: &str,
    ) -> Result<UserBaseInfo, AuthError> {
        async {
            if user.login_name.trim().is_empty() {
                return Err(AuthError::Params("login name must not be empty".into()));
            }
            if !meets_complexity(password) {
                return Err(AuthError::Params("password does not meet complexity policy".into()));
            }

            let existing = self
                .call(ctx, "find user", self.credentials.find_by_login_name(&user.login_name))
                .await?;
            if existing.is_some() {
                return Err(AuthError::UserNameOccupied);
            }

            let hash = self.hash_password(password).await?;

            // The store's unique key is the last word if two registrations race.
            let record = match self.call(ctx, "create user", self.credentials.create(user, hash)).await {
                Err(AuthError::Internal {
                    source: Fault::Credentials(CredentialError::Duplicate(_)),
                    ..
                }) => return Err(AuthError::UserNameOccupied),
                other => other?,
            };

            tracing::info!(user_id = %record.id, "user registered");
            Ok(record.base_info())
        }
        .instrument(ctx.span("register"))
        .await
    }

    /// Profile of `user_id` with the login name masked for display.
    pub async fn user_info(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<UserBaseInfo, AuthError> {
        async {
            let user = self
                .call(ctx, "load user", self.credentials.find_by_id(user_id))
                .await?
                .ok_or(AuthError::UserInvalid)?;
            let mut info = user.base_info();
            info.login_name = mask_login_name(&info.login_name);
            Ok(info)
        }
        .instrument(ctx.span("user_info"))
        .await
    }

    /// Replaces the nickname, avatar, and slogan of `user_id`.
    ///
    /// Returns the updated profile with the login name masked, the same
    /// shape [`user_info`](Self::user_info) returns. Sessions are untouched.
    ///
    /// # Errors
    /// [`AuthError::UserInvalid`] if the user does not exist.
    pub async fn update_user_info(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        profile: ProfileUpdate,
    ) -> Result<UserBaseInfo, AuthError> {
        async {
            let record = match self
                .call(ctx, "update profile", self.credentials.update_profile(user_id, profile))
                .await
            {
                Err(AuthError::Internal {
                    source: Fault::Credentials(CredentialError::NotFound(_)),
                    ..
                }) => return Err(AuthError::UserInvalid),
                other => other?,
            };

            tracing::info!(%user_id, "profile updated");
            let mut info = record.base_info();
            info.login_name = mask_login_name(&info.login_name);
            Ok(info)
        }
        .instrument(ctx.span("update_user_info"))
        .await
    }

    /// The live session record for `user_id` on `platform`, if any.
    pub async fn session(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        platform: &Platform,
    ) -> Result<Option<SessionInfo>, AuthError> {
        self.call(ctx, "read session index", self.sessions.platform_session(user_id, platform))
            .instrument(ctx.span("session"))
            .await
    }

    /// Revokes every platform session of `user_id`.
    ///
    /// Every deletion is attempted even if an earlier one fails; the first
    /// failure is returned. On success returns the number of sessions that
    /// were on record.
    pub async fn revoke_all_sessions(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<usize, AuthError> {
        let sessions = self
            .call(ctx, "list user sessions", self.sessions.user_sessions(user_id))
            .await?;

        let mut first_error = None;
        for session in &sessions {
            let results = [
                self.call(ctx, "delete access token", self.sessions.delete_access(&session.access_token))
                    .await
                    .map(drop),
                self.call(ctx, "delete refresh token", self.sessions.delete_refresh(&session.refresh_token))
                    .await
                    .map(drop),
                self.call(
                    ctx,
                    "delete session index",
                    self.sessions.delete_platform_session(user_id, &session.platform),
                )
                .await
                .map(drop),
            ];
            for result in results {
                if let Err(e) = result {
                    tracing::warn!(%user_id, platform = %session.platform, error = %e, "session revocation step failed");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                tracing::info!(%user_id, revoked = sessions.len(), "all sessions revoked");
                Ok(sessions.len())
            }
        }
    }

    // -- internals ---------------------------------------------------------

    /// Runs one external call under the request deadline.
    pub(crate) async fn call<T, E, F>(
        &self,
        ctx: &RequestContext,
        step: &'static str,
        fut: F,
    ) -> Result<T, AuthError>
    where
        F: Future<Output = Result<T, E>>,
        E: Into<Fault>,
    {
        ctx.call(step, self.config.call_timeout(), fut).await
    }

    /// Hashes `plain` on the blocking pool.
    pub(crate) async fn hash_password(&self, plain: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(HashError::from)
            .and_then(|hashed| hashed)
            .map_err(|e| AuthError::internal("hash password", e))
    }

    /// Checks `plain` against a stored hash on the blocking pool.
    async fn verify_password(&self, hash: &str, plain: &str) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let (hash, plain) = (hash.to_owned(), plain.to_owned());
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &plain))
            .await
            .map_err(|e| AuthError::internal("verify password", HashError::from(e)))
    }

    async fn issue_inner(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        platform: &Platform,
        session_id: Option<SessionId>,
    ) -> Result<TokenInfo, AuthError> {
        if platform.is_empty() {
            return Err(AuthError::Params("platform must not be empty".into()));
        }

        let user = self
            .call(ctx, "load user", self.credentials.find_by_id(user_id))
            .await?;
        if !user.is_some_and(|u| !u.is_blocked()) {
            tracing::info!(%user_id, "issue refused: user missing or blocked");
            return Err(AuthError::UserInvalid);
        }

        let session_id = session_id.unwrap_or_else(|| token::session_id(user_id));
        let pair = token::token_pair();
        let session = SessionInfo::new(
            user_id,
            platform.clone(),
            session_id,
            pair.access_token,
            pair.refresh_token,
        );

        let previous = self
            .call(ctx, "read session index", self.sessions.platform_session(user_id, platform))
            .await?;

        // New entries first, so there is no moment with zero valid tokens.
        self.call(ctx, "store tokens", self.sessions.put_tokens(&session))
            .await?;

        if let Some(previous) = previous {
            self.call(ctx, "delete previous access token", self.sessions.delete_access(&previous.access_token))
                .await?;
            self.call(ctx, "demote previous refresh token", self.sessions.demote_refresh(&previous))
                .await?;
        }

        self.call(ctx, "store session index", self.sessions.put_platform_session(&session))
            .await?;

        tracing::info!(
            %user_id,
            %platform,
            session_id = %session.session_id,
            "session issued"
        );

        Ok(TokenInfo {
            access_token: session.access_token,
            refresh_token: session.refresh_token,
            duration: self.config.access_ttl_secs,
            server_create_time: token::unix_millis(),
        })
    }

    /// The part of a refresh that runs while holding the lock.
    async fn refresh_locked(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<TokenInfo, AuthError> {
        let presented = self
            .call(ctx, "read refresh token", self.sessions.refresh_session(refresh_token))
            .await?
            .ok_or(AuthError::InvalidToken)?;

        let current = self
            .call(
                ctx,
                "read session index",
                self.sessions.platform_session(presented.user_id, &presented.platform),
            )
            .await?;

        let is_current = !presented.superseded
            && current
                .as_ref()
                .is_some_and(|c| c.refresh_token == refresh_token);
        if !is_current {
            tracing::warn!(
                user_id = %presented.user_id,
                platform = %presented.platform,
                token = token::prefix(refresh_token),
                superseded = presented.superseded,
                "stale refresh token presented"
            );
            return Err(AuthError::InvalidToken);
        }

        self.issue_inner(
            ctx,
            presented.user_id,
            &presented.platform,
            Some(presented.session_id),
        )
        .await
    }

    /// Releases the refresh lock, but only while it is still ours.
    ///
    /// Runs on the lock's clock rather than the request deadline, so a
    /// request whose deadline already passed still lets go. Past
    /// `held_until` the marker has expired and may belong to another
    /// refresh, so it is left alone.
    async fn release_lock(&self, refresh_token: &str, held_until: Instant) {
        if Instant::now() >= held_until {
            tracing::debug!(token = token::prefix(refresh_token), "refresh lock already expired");
            return;
        }
        match tokio::time::timeout_at(held_until, self.lock.release(refresh_token)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(token = token::prefix(refresh_token), error = %e, "refresh lock release failed");
            }
            Err(_) => {
                tracing::warn!(token = token::prefix(refresh_token), "refresh lock release timed out");
            }
        }
    }
}

/// Masks a login name for display, keeping the first and last character of
/// the local part: `alice@example.com` → `a***e@example.com`.
pub fn mask_login_name(login_name: &str) -> String {
    let (local, domain) = match login_name.split_once('@') {
        Some((local, domain)) => (local, Some(domain)),
        None => (login_name, None),
    };
    let chars: Vec<char> = local.chars().collect();
    let masked = match chars.as_slice() {
        [] => String::new(),
        [only] => format!("{only}*"),
        [first, .., last] => format!("{first}***{last}"),
    };
    match domain {
        Some(domain) => format!("{masked}@{domain}"),
        None => masked,
    }
}
