//! Typed session cache over a [`CacheBackend`].
//!
//! Owns the key space and the TTL of every record the coordinator keeps:
//!
//! ```text
//! access_token:{token}          → SessionInfo   (access TTL)
//! refresh_token:{token}         → SessionInfo   (refresh TTL, or grace once superseded)
//! user_session:{user}:{platform} → SessionInfo  (refresh TTL)
//! pwd_reset:{token}             → ResetTicket   (reset TTL)
//! ```
//!
//! Every method returns `Ok(None)` / `Ok(false)` for a missing key; only
//! transport and codec failures are errors. A record that decodes but has
//! an empty token, platform, or reset code is a
//! [`CodecError::InvalidRecord`], never a usable session.

use std::sync::Arc;
use std::time::Duration;

use authgate_cache::CacheBackend;
use authgate_types::{Codec, CodecError, JsonCodec, Platform, ResetTicket, SessionInfo, UserId};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::SessionConfig;
use crate::error::Fault;

/// Cache key builders. The lock key lives here too so the whole key space
/// is in one place.
pub(crate) mod keys {
    use authgate_types::{Platform, UserId};

    pub(crate) fn access_token(token: &str) -> String {
        format!("access_token:{token}")
    }

    pub(crate) fn refresh_token(token: &str) -> String {
        format!("refresh_token:{token}")
    }

    pub(crate) fn user_session(user_id: UserId, platform: &Platform) -> String {
        format!("user_session:{}:{}", user_id.0, platform.as_str())
    }

    /// Trailing colon keeps user 7 from matching user 70.
    pub(crate) fn user_sessions_prefix(user_id: UserId) -> String {
        format!("user_session:{}:", user_id.0)
    }

    pub(crate) fn refresh_lock(token: &str) -> String {
        format!("refresh_lock:{token}")
    }

    pub(crate) fn password_reset(token: &str) -> String {
        format!("pwd_reset:{token}")
    }
}

/// Session records in the cache.
pub struct SessionCache<C> {
    backend: Arc<C>,
    codec: JsonCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
    superseded_grace: Duration,
    reset_ttl: Duration,
}

impl<C: CacheBackend> SessionCache<C> {
    pub fn new(backend: Arc<C>, config: &SessionConfig) -> Self {
        Self {
            backend,
            codec: JsonCodec,
            access_ttl: config.access_ttl(),
            refresh_ttl: config.refresh_ttl(),
            superseded_grace: config.superseded_grace(),
            reset_ttl: config.reset_ttl(),
        }
    }

    // -- tokens ----------------------------------------------------------

    /// Writes the access-token and refresh-token entries for `session`.
    pub async fn put_tokens(&self, session: &SessionInfo) -> Result<(), Fault> {
        self.put(&keys::access_token(&session.access_token), session, self.access_ttl)
            .await?;
        self.put(&keys::refresh_token(&session.refresh_token), session, self.refresh_ttl)
            .await
    }

    pub async fn access_session(&self, token: &str) -> Result<Option<SessionInfo>, Fault> {
        self.fetch_session(&keys::access_token(token)).await
    }

    pub async fn refresh_session(&self, token: &str) -> Result<Option<SessionInfo>, Fault> {
        self.fetch_session(&keys::refresh_token(token)).await
    }

    pub async fn delete_access(&self, token: &str) -> Result<bool, Fault> {
        Ok(self.backend.delete(&keys::access_token(token)).await?)
    }

    pub async fn delete_refresh(&self, token: &str) -> Result<bool, Fault> {
        Ok(self.backend.delete(&keys::refresh_token(token)).await?)
    }

    /// Rewrites the refresh-token entry of a rotated-away session as
    /// superseded, living only for the grace period. With no grace period
    /// the entry is deleted outright.
    pub async fn demote_refresh(&self, previous: &SessionInfo) -> Result<(), Fault> {
        if self.superseded_grace.is_zero() {
            self.delete_refresh(&previous.refresh_token).await?;
            return Ok(());
        }
        self.put(
            &keys::refresh_token(&previous.refresh_token),
            &previous.demoted(),
            self.superseded_grace,
        )
        .await
    }

    // -- platform index --------------------------------------------------

    pub async fn platform_session(
        &self,
        user_id: UserId,
        platform: &Platform,
    ) -> Result<Option<SessionInfo>, Fault> {
        self.fetch_session(&keys::user_session(user_id, platform)).await
    }

    pub async fn put_platform_session(&self, session: &SessionInfo) -> Result<(), Fault> {
        let key = keys::user_session(session.user_id, &session.platform);
        self.put(&key, session, self.refresh_ttl).await
    }

    pub async fn delete_platform_session(
        &self,
        user_id: UserId,
        platform: &Platform,
    ) -> Result<bool, Fault> {
        Ok(self.backend.delete(&keys::user_session(user_id, platform)).await?)
    }

    /// Every live platform session of a user.
    pub async fn user_sessions(&self, user_id: UserId) -> Result<Vec<SessionInfo>, Fault> {
        let keys = self
            .backend
            .scan_prefix(&keys::user_sessions_prefix(user_id))
            .await?;
        let mut sessions = Vec::with_capacity(keys.len());
        for key in keys {
            // Expired between the scan and the read: just skip it.
            if let Some(session) = self.fetch_session(&key).await? {
                sessions.push(session);
            }
        }
        Ok(sessions)
    }

    // -- password reset --------------------------------------------------

    pub async fn put_reset_ticket(&self, token: &str, ticket: &ResetTicket) -> Result<(), Fault> {
        self.put(&keys::password_reset(token), ticket, self.reset_ttl).await
    }

    pub async fn reset_ticket(&self, token: &str) -> Result<Option<ResetTicket>, Fault> {
        let Some(ticket) = self.fetch::<ResetTicket>(&keys::password_reset(token)).await? else {
            return Ok(None);
        };
        if ticket.code.is_empty() {
            return Err(CodecError::InvalidRecord("reset ticket has an empty code".into()).into());
        }
        Ok(Some(ticket))
    }

    pub async fn delete_reset_ticket(&self, token: &str) -> Result<bool, Fault> {
        Ok(self.backend.delete(&keys::password_reset(token)).await?)
    }

    // -- plumbing --------------------------------------------------------

    async fn put<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), Fault> {
        let bytes = self.codec.encode(value)?;
        self.backend.set(key, bytes, ttl).await?;
        Ok(())
    }

    async fn fetch_session(&self, key: &str) -> Result<Option<SessionInfo>, Fault> {
        let Some(session) = self.fetch::<SessionInfo>(key).await? else {
            return Ok(None);
        };
        if session.access_token.is_empty() || session.refresh_token.is_empty() {
            return Err(CodecError::InvalidRecord("session has an empty token".into()).into());
        }
        if session.platform.is_empty() {
            return Err(CodecError::InvalidRecord("session has an empty platform".into()).into());
        }
        Ok(Some(session))
    }

    async fn fetch<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Fault> {
        match self.backend.get(key).await? {
            Some(bytes) => Ok(Some(self.codec.decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authgate_cache::MemoryCache;
    use authgate_types::SessionId;

    fn config() -> SessionConfig {
        SessionConfig {
            access_ttl_secs: 60,
            refresh_ttl_secs: 600,
            superseded_grace_secs: 5,
            ..SessionConfig::default()
        }
    }

    fn session(user: i64, platform: &str, access: &str, refresh: &str) -> SessionInfo {
        SessionInfo::new(
            UserId(user),
            Platform::new(platform),
            SessionId::new(format!("{user}-s")),
            access.into(),
            refresh.into(),
        )
    }

    fn cache_with(config: &SessionConfig) -> (Arc<MemoryCache>, SessionCache<MemoryCache>) {
        let backend = Arc::new(MemoryCache::open());
        let cache = SessionCache::new(Arc::clone(&backend), config);
        (backend, cache)
    }

    #[test]
    fn test_keys_match_documented_layout() {
        assert_eq!(keys::access_token("abc"), "access_token:abc");
        assert_eq!(keys::refresh_token("abc"), "refresh_token:abc");
        assert_eq!(keys::user_session(UserId(42), &Platform::new("web")), "user_session:42:web");
        assert_eq!(keys::user_sessions_prefix(UserId(42)), "user_session:42:");
        assert_eq!(keys::refresh_lock("abc"), "refresh_lock:abc");
        assert_eq!(keys::password_reset("abc"), "pwd_reset:abc");
    }

    #[tokio::test]
    async fn test_put_tokens_resolves_both_tokens() {
        let (_, cache) = cache_with(&config());
        let s = session(1, "web", "acc", "ref");

        cache.put_tokens(&s).await.unwrap();

        assert_eq!(cache.access_session("acc").await.unwrap(), Some(s.clone()));
        assert_eq!(cache.refresh_session("ref").await.unwrap(), Some(s));
    }

    #[tokio::test(start_paused = true)]
    async fn test_access_token_expires_before_refresh_token() {
        let (_, cache) = cache_with(&config());
        cache.put_tokens(&session(1, "web", "acc", "ref")).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;

        assert!(cache.access_session("acc").await.unwrap().is_none());
        assert!(cache.refresh_session("ref").await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_demote_refresh_flags_and_expires_after_grace() {
        let (_, cache) = cache_with(&config());
        let s = session(1, "web", "acc", "ref");
        cache.put_tokens(&s).await.unwrap();

        cache.demote_refresh(&s).await.unwrap();

        let demoted = cache.refresh_session("ref").await.unwrap().unwrap();
        assert!(demoted.superseded);

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(cache.refresh_session("ref").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_demote_refresh_without_grace_deletes() {
        let cfg = SessionConfig {
            superseded_grace_secs: 0,
            ..config()
        };
        let (_, cache) = cache_with(&cfg);
        let s = session(1, "web", "acc", "ref");
        cache.put_tokens(&s).await.unwrap();

        cache.demote_refresh(&s).await.unwrap();

        assert!(cache.refresh_session("ref").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_user_sessions_lists_every_platform_of_one_user() {
        let (_, cache) = cache_with(&config());
        cache.put_platform_session(&session(7, "web", "a1", "r1")).await.unwrap();
        cache.put_platform_session(&session(7, "ios", "a2", "r2")).await.unwrap();
        cache.put_platform_session(&session(70, "web", "a3", "r3")).await.unwrap();

        let sessions = cache.user_sessions(UserId(7)).await.unwrap();

        let platforms: Vec<&str> = sessions.iter().map(|s| s.platform.as_str()).collect();
        assert_eq!(platforms, vec!["ios", "web"]);
    }

    #[tokio::test]
    async fn test_fetch_corrupt_value_is_codec_fault() {
        let (backend, cache) = cache_with(&config());
        backend
            .set("access_token:bad", b"{not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.access_session("bad").await;

        assert!(matches!(result, Err(Fault::Codec(_))));
    }

    #[tokio::test]
    async fn test_fetch_session_with_empty_token_is_invalid_record() {
        let (backend, cache) = cache_with(&config());
        let record = br#"{"user_id":1,"platform":"web","session_id":"1-s","access_token":"","refresh_token":"ref","superseded":false}"#;
        backend
            .set("refresh_token:ref", record.to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.refresh_session("ref").await;

        assert!(matches!(result, Err(Fault::Codec(CodecError::InvalidRecord(_)))));
    }

    #[tokio::test]
    async fn test_user_sessions_with_blank_platform_is_invalid_record() {
        let (backend, cache) = cache_with(&config());
        let record = br#"{"user_id":7,"platform":" ","session_id":"7-s","access_token":"acc","refresh_token":"ref","superseded":false}"#;
        backend
            .set("user_session:7: ", record.to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let result = cache.user_sessions(UserId(7)).await;

        assert!(matches!(result, Err(Fault::Codec(CodecError::InvalidRecord(_)))));
    }

    #[tokio::test]
    async fn test_reset_ticket_with_empty_code_is_invalid_record() {
        let (_, cache) = cache_with(&config());
        let ticket = ResetTicket {
            user_id: UserId(3),
            code: String::new(),
        };
        cache.put_reset_ticket("tok", &ticket).await.unwrap();

        let result = cache.reset_ticket("tok").await;

        assert!(matches!(result, Err(Fault::Codec(CodecError::InvalidRecord(_)))));
    }

    #[tokio::test]
    async fn test_reset_ticket_round_trip_and_delete() {
        let (_, cache) = cache_with(&config());
        let ticket = ResetTicket {
            user_id: UserId(3),
            code: "004211".into(),
        };

        cache.put_reset_ticket("tok", &ticket).await.unwrap();
        assert_eq!(cache.reset_ticket("tok").await.unwrap(), Some(ticket));

        assert!(cache.delete_reset_ticket("tok").await.unwrap());
        assert!(cache.reset_ticket("tok").await.unwrap().is_none());
    }
}
