//! `AuthService` builder and lifecycle.
//!
//! This is the entry point for running Authgate. It ties the layers
//! together (cache → session coordinator → client-facing errors) and owns
//! the cache handle's lifecycle: opened once at startup, shared by every
//! request, closed at shutdown.

use std::sync::Arc;
use std::time::Duration;

use authgate_cache::{CacheBackend, MemoryCache};
use authgate_session::{
    AuthError, BcryptHasher, CredentialStore, NewUser, PasswordResetGrant, ProfileUpdate,
    RequestContext, SessionConfig, TokenCoordinator,
};
use authgate_types::{Platform, TokenInfo, TokenVerify, UserBaseInfo, UserId};
use tokio::task::JoinHandle;

use crate::{ApiError, AuthConfig};

/// Builder for configuring and opening an [`AuthService`].
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use authgate::prelude::*;
///
/// # async fn run() -> Result<(), ApiError> {
/// let service = AuthService::builder()
///     .config(AuthConfig::default())
///     .open(Arc::new(MemoryCredentialStore::new()));
///
/// let ctx = RequestContext::generated();
/// let (_user, tokens) = service
///     .login(&ctx, "alice", "Passw0rd!", &Platform::new("web"))
///     .await?;
/// # let _ = tokens;
/// service.close().await
/// # }
/// ```
pub struct AuthServiceBuilder {
    config: AuthConfig,
}

impl AuthServiceBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: AuthConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the session configuration.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    /// Sets the bcrypt cost for new password hashes.
    pub fn bcrypt_cost(mut self, cost: u32) -> Self {
        self.config.bcrypt_cost = cost;
        self
    }

    /// Opens the service over a fresh in-process cache.
    ///
    /// Spawns the cache sweeper unless `sweep_interval_secs` is 0, so this
    /// must run inside a Tokio runtime.
    pub fn open<S: CredentialStore>(self, store: Arc<S>) -> AuthService<MemoryCache, S> {
        let cache = Arc::new(MemoryCache::open());
        let sweeper = (self.config.sweep_interval_secs > 0).then(|| {
            cache.spawn_sweeper(Duration::from_secs(self.config.sweep_interval_secs))
        });
        let mut service = self.open_with(cache, store);
        service.sweeper = sweeper;
        service
    }

    /// Opens the service over a cache handle you already hold.
    ///
    /// No sweeper is started; the backend is expected to expire entries
    /// itself.
    pub fn open_with<C: CacheBackend, S: CredentialStore>(
        self,
        cache: Arc<C>,
        store: Arc<S>,
    ) -> AuthService<C, S> {
        let hasher = BcryptHasher::new(self.config.bcrypt_cost);
        let coordinator =
            TokenCoordinator::new(Arc::clone(&cache), store, hasher, self.config.session);
        tracing::info!(
            access_ttl_secs = coordinator.config().access_ttl_secs,
            refresh_ttl_secs = coordinator.config().refresh_ttl_secs,
            "auth service opened"
        );
        AuthService {
            coordinator,
            cache,
            sweeper: None,
        }
    }
}

impl Default for AuthServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running auth service.
///
/// Every operation takes the caller's [`RequestContext`] and returns
/// [`ApiError`], which is safe to show to a client.
pub struct AuthService<C: CacheBackend, S: CredentialStore> {
    coordinator: TokenCoordinator<C, S, BcryptHasher>,
    cache: Arc<C>,
    sweeper: Option<JoinHandle<()>>,
}

impl AuthService<MemoryCache, authgate_session::MemoryCredentialStore> {
    /// Creates a new builder.
    pub fn builder() -> AuthServiceBuilder {
        AuthServiceBuilder::new()
    }
}

impl<C, S> AuthService<C, S>
where
    C: CacheBackend,
    S: CredentialStore,
{
    /// The coordinator underneath, for callers that want [`AuthError`]s.
    pub fn coordinator(&self) -> &TokenCoordinator<C, S, BcryptHasher> {
        &self.coordinator
    }

    pub async fn register(
        &self,
        ctx: &RequestContext,
        user: NewUser,
        password: &str,
    ) -> Result<UserBaseInfo, ApiError> {
        Ok(self.coordinator.register(ctx, user, password).await?)
    }

    pub async fn login(
        &self,
        ctx: &RequestContext,
        login_name: &str,
        password: &str,
        platform: &Platform,
    ) -> Result<(UserBaseInfo, TokenInfo), ApiError> {
        Ok(self.coordinator.login(ctx, login_name, password, platform).await?)
    }

    /// Issues a session for an already-authenticated user.
    pub async fn issue(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        platform: &Platform,
    ) -> Result<TokenInfo, ApiError> {
        Ok(self.coordinator.issue(ctx, user_id, platform, None).await?)
    }

    pub async fn refresh(
        &self,
        ctx: &RequestContext,
        refresh_token: &str,
    ) -> Result<TokenInfo, ApiError> {
        Ok(self.coordinator.refresh(ctx, refresh_token).await?)
    }

    pub async fn verify(
        &self,
        ctx: &RequestContext,
        access_token: &str,
    ) -> Result<TokenVerify, ApiError> {
        Ok(self.coordinator.verify(ctx, access_token).await?)
    }

    pub async fn logout(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        platform: &Platform,
    ) -> Result<(), ApiError> {
        Ok(self.coordinator.logout(ctx, user_id, platform).await?)
    }

    pub async fn user_info(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
    ) -> Result<UserBaseInfo, ApiError> {
        Ok(self.coordinator.user_info(ctx, user_id).await?)
    }

    pub async fn update_user_info(
        &self,
        ctx: &RequestContext,
        user_id: UserId,
        profile: ProfileUpdate,
    ) -> Result<UserBaseInfo, ApiError> {
        Ok(self.coordinator.update_user_info(ctx, user_id, profile).await?)
    }

    pub async fn apply_password_reset(
        &self,
        ctx: &RequestContext,
        login_name: &str,
    ) -> Result<PasswordResetGrant, ApiError> {
        Ok(self.coordinator.apply_password_reset(ctx, login_name).await?)
    }

    pub async fn reset_password(
        &self,
        ctx: &RequestContext,
        reset_token: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        Ok(self
            .coordinator
            .reset_password(ctx, reset_token, code, new_password)
            .await?)
    }

    /// Stops the sweeper and closes the cache handle.
    pub async fn close(mut self) -> Result<(), ApiError> {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
        self.cache
            .close()
            .await
            .map_err(|e| AuthError::internal("close cache", e))?;
        tracing::info!("auth service closed");
        Ok(())
    }
}

impl<C: CacheBackend, S: CredentialStore> Drop for AuthService<C, S> {
    fn drop(&mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.abort();
        }
    }
}
