//! Core records for Authgate's session model.
//!
//! Every type here either lives in the cache (serialized through a
//! [`Codec`](crate::Codec)) or is handed back to a caller of the session
//! layer. None of them carry behavior beyond small constructors and
//! predicates; the lifecycle rules live in `authgate-session`.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Numeric identifier of a user row in the credential store.
///
/// `#[serde(transparent)]` keeps it a bare number in cached JSON, so a
/// `UserId(42)` is stored as `42`, not `{ "0": 42 }`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "U-{}", self.0)
    }
}

/// The client platform a session was opened from (`"web"`, `"ios"`, `"h5"`).
///
/// A user holds at most one live session per platform, so the platform is
/// half of the session index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Platform(String);

impl Platform {
    /// Creates a platform tag from any string-like value.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the platform tag as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for an empty tag, which the coordinator rejects.
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Platform {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Logical identity of a login on one platform.
///
/// Minted on login and carried over unchanged through every refresh, so a
/// session id outlives the token strings it was issued with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Wraps an already-generated session id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the session id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// Whether a user may authenticate at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockState {
    #[default]
    Normal,
    Blocked,
}

/// Identity row of a user, without the password hash.
///
/// Owned by the credential store; the coordinator only reads it to decide
/// whether a user may hold a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserBaseInfo {
    pub id: UserId,
    pub login_name: String,
    pub nickname: String,
    pub avatar: String,
    pub slogan: String,
    pub block_state: BlockState,
}

impl UserBaseInfo {
    /// Returns `true` if the user is blocked from authenticating.
    pub fn is_blocked(&self) -> bool {
        matches!(self.block_state, BlockState::Blocked)
    }
}

// ---------------------------------------------------------------------------
// SessionInfo
// ---------------------------------------------------------------------------

/// The record stored behind `access_token:*`, `refresh_token:*`, and
/// `user_session:*` cache keys.
///
/// One live `SessionInfo` exists per `(user_id, platform)`. When a refresh
/// rotates the pair, the previous refresh-token entry is rewritten with
/// `superseded = true` for a short grace period before it expires, so a late
/// duplicate request can still be recognised as a stale replay instead of an
/// unknown token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub user_id: UserId,
    pub platform: Platform,
    pub session_id: SessionId,
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub superseded: bool,
}

impl SessionInfo {
    /// Builds a live (not superseded) session record.
    pub fn new(
        user_id: UserId,
        platform: Platform,
        session_id: SessionId,
        access_token: String,
        refresh_token: String,
    ) -> Self {
        Self {
            user_id,
            platform,
            session_id,
            access_token,
            refresh_token,
            superseded: false,
        }
    }

    /// Returns a copy flagged as superseded by a newer rotation.
    pub fn demoted(&self) -> Self {
        Self {
            superseded: true,
            ..self.clone()
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// What a caller receives after a successful login or refresh.
///
/// Never stored; derived from the freshly written [`SessionInfo`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    pub access_token: String,
    pub refresh_token: String,
    /// Access-token lifetime in seconds.
    pub duration: u64,
    /// Unix time (milliseconds) at which the server issued the pair.
    pub server_create_time: u64,
}

/// Outcome of an access-token check.
///
/// `approved` is `false` whenever the token is missing, expired, or
/// malformed; in that case the identity fields are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenVerify {
    pub user_id: Option<UserId>,
    pub session_id: Option<SessionId>,
    pub platform: Option<Platform>,
    pub approved: bool,
}

impl TokenVerify {
    /// A rejected check.
    pub fn denied() -> Self {
        Self {
            user_id: None,
            session_id: None,
            platform: None,
            approved: false,
        }
    }

    /// An approved check for the given session.
    pub fn approved(session: &SessionInfo) -> Self {
        Self {
            user_id: Some(session.user_id),
            session_id: Some(session.session_id.clone()),
            platform: Some(session.platform.clone()),
            approved: true,
        }
    }
}

/// The record stored behind a `pwd_reset:*` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetTicket {
    pub user_id: UserId,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> SessionInfo {
        SessionInfo::new(
            UserId(42),
            Platform::new("web"),
            SessionId::new("42-18c2f-9a01"),
            "a".repeat(40),
            "r".repeat(40),
        )
    }

    #[test]
    fn test_user_id_display_has_prefix() {
        assert_eq!(UserId(42).to_string(), "U-42");
    }

    #[test]
    fn test_user_id_serializes_as_bare_number() {
        let json = serde_json::to_string(&UserId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_platform_blank_is_empty() {
        assert!(Platform::new("  ").is_empty());
        assert!(!Platform::from("web").is_empty());
    }

    #[test]
    fn test_session_info_live_omits_superseded_flag() {
        let json = serde_json::to_string(&sample_session()).unwrap();
        assert!(!json.contains("superseded"), "got {json}");
    }

    #[test]
    fn test_session_info_demoted_round_trips_flag() {
        let demoted = sample_session().demoted();
        let json = serde_json::to_string(&demoted).unwrap();

        let back: SessionInfo = serde_json::from_str(&json).unwrap();

        assert!(back.superseded);
        assert_eq!(back.refresh_token, demoted.refresh_token);
    }

    #[test]
    fn test_token_verify_denied_has_no_identity() {
        let verify = TokenVerify::denied();
        assert!(!verify.approved);
        assert!(verify.user_id.is_none());
        assert!(verify.platform.is_none());
    }

    #[test]
    fn test_token_verify_approved_copies_session_identity() {
        let session = sample_session();
        let verify = TokenVerify::approved(&session);

        assert!(verify.approved);
        assert_eq!(verify.user_id, Some(UserId(42)));
        assert_eq!(verify.session_id, Some(session.session_id));
        assert_eq!(verify.platform, Some(Platform::new("web")));
    }

    #[test]
    fn test_block_state_serializes_lowercase() {
        let json = serde_json::to_string(&BlockState::Blocked).unwrap();
        assert_eq!(json, "\"blocked\"");
    }
}
