//! Token, session-id, and reset-code generation.
//!
//! Everything here draws from the thread-local CSPRNG (`rand::rng()`), which
//! is seeded from the OS and reseeds itself. There is no shared state; an
//! entropy-source failure panics, which is the only sane reaction.

use std::time::{SystemTime, UNIX_EPOCH};

use authgate_types::{SessionId, UserId};
use rand::Rng;

/// Length of every access, refresh, and reset token (hex characters).
pub const TOKEN_LEN: usize = 40;

/// A freshly minted access/refresh pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Generates a new access/refresh pair.
pub fn token_pair() -> TokenPair {
    TokenPair {
        access_token: random_token(),
        refresh_token: random_token(),
    }
}

/// Generates a 40-character hex string (160 bits of entropy).
pub fn random_token() -> String {
    let bytes: [u8; TOKEN_LEN / 2] = rand::rng().random();
    hex(&bytes)
}

/// Mints a session id for a fresh login.
///
/// Format: `{user}-{unix millis, hex}-{64 random bits, hex}`. The user id
/// prefix keeps ids readable in logs; the random tail keeps two logins in
/// the same millisecond apart.
pub fn session_id(user_id: UserId) -> SessionId {
    let salt: [u8; 8] = rand::rng().random();
    SessionId::new(format!("{}-{:x}-{}", user_id.0, unix_millis(), hex(&salt)))
}

/// Generates a numeric reset code of `len` digits (leading zeros kept).
pub fn reset_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// Generates a 16-character hex trace id.
pub fn trace_id() -> String {
    let bytes: [u8; 8] = rand::rng().random();
    hex(&bytes)
}

/// Returns `true` if `token` has the shape of a generated token.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}

/// The first 8 characters of a token, for log lines.
pub(crate) fn prefix(token: &str) -> &str {
    token.get(..8).unwrap_or(token)
}

pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_token_is_40_hex_chars() {
        let token = random_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(is_well_formed(&token));
    }

    #[test]
    fn test_token_pair_access_and_refresh_differ() {
        let pair = token_pair();
        assert_ne!(pair.access_token, pair.refresh_token);
    }

    #[test]
    fn test_random_token_does_not_repeat() {
        let tokens: std::collections::HashSet<String> =
            (0..256).map(|_| random_token()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn test_session_id_starts_with_user_id() {
        let id = session_id(UserId(42));
        assert!(id.as_str().starts_with("42-"), "got {id}");
        assert_ne!(id, session_id(UserId(42)));
    }

    #[test]
    fn test_reset_code_is_digits_of_requested_length() {
        let code = reset_code(6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_is_well_formed_rejects_wrong_shapes() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed(&"a".repeat(39)));
        assert!(!is_well_formed(&"z".repeat(40)));
    }

    #[test]
    fn test_prefix_short_token_is_returned_whole() {
        assert_eq!(prefix("abc"), "abc");
        assert_eq!(prefix(&"f".repeat(40)), "ffffffff");
    }
}
