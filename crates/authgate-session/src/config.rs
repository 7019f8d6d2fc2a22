//! Session configuration: token lifetimes, lock hold time, grace periods.
//!
//! All durations are stored as whole seconds (or milliseconds for the call
//! timeout) so the struct deserializes straight from a flat config file.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for token and session behavior.
///
/// Create one with `SessionConfig::default()` and override the fields you
/// care about; the coordinator runs [`validated`](Self::validated) on it
/// before use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Lifetime of an access token. Default: 30 minutes.
    pub access_ttl_secs: u64,

    /// Lifetime of a refresh token and of the per-platform session index.
    /// Default: 7 days.
    pub refresh_ttl_secs: u64,

    /// How long a refresh lock marker survives if its holder never releases
    /// it. Bounds how long a crashed refresh can block the same token.
    /// Default: 5 seconds.
    pub refresh_lock_ttl_secs: u64,

    /// How long a rotated-away refresh token keeps resolving (flagged as
    /// superseded) before it disappears. A replay inside this window is
    /// logged as a stale-token anomaly; either way it is rejected.
    /// Default: 5 seconds. 0 deletes the old token immediately.
    pub superseded_grace_secs: u64,

    /// Lifetime of a password-reset token and its code. Default: 15 minutes.
    pub reset_ttl_secs: u64,

    /// Number of digits in a password-reset code. Default: 6.
    pub reset_code_len: usize,

    /// Deadline applied to each cache or credential-store call when the
    /// caller's context carries none. Default: 2000 ms.
    pub call_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            access_ttl_secs: 30 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
            refresh_lock_ttl_secs: 5,
            superseded_grace_secs: 5,
            reset_ttl_secs: 15 * 60,
            reset_code_len: 6,
            call_timeout_ms: 2_000,
        }
    }
}

impl SessionConfig {
    /// Shortest and longest reset code accepted.
    pub const RESET_CODE_LEN_RANGE: (usize, usize) = (4, 10);

    /// Clamp and fix any out-of-range values so the config is safe to use.
    ///
    /// Rules:
    /// - Every TTL is at least 1 second (a zero TTL would mean "never
    ///   expires" to the cache).
    /// - `access_ttl_secs` ≤ `refresh_ttl_secs`.
    /// - `superseded_grace_secs` < `refresh_ttl_secs`.
    /// - `reset_code_len` within [`Self::RESET_CODE_LEN_RANGE`].
    /// - `call_timeout_ms` at least 1.
    pub fn validated(mut self) -> Self {
        for (name, value) in [
            ("access_ttl_secs", &mut self.access_ttl_secs),
            ("refresh_ttl_secs", &mut self.refresh_ttl_secs),
            ("refresh_lock_ttl_secs", &mut self.refresh_lock_ttl_secs),
            ("reset_ttl_secs", &mut self.reset_ttl_secs),
        ] {
            if *value == 0 {
                tracing::warn!(field = name, "zero TTL would never expire, using 1s");
                *value = 1;
            }
        }
        if self.access_ttl_secs > self.refresh_ttl_secs {
            tracing::warn!(
                access = self.access_ttl_secs,
                refresh = self.refresh_ttl_secs,
                "access TTL exceeds refresh TTL, clamping"
            );
            self.access_ttl_secs = self.refresh_ttl_secs;
        }
        if self.superseded_grace_secs >= self.refresh_ttl_secs {
            tracing::warn!(
                grace = self.superseded_grace_secs,
                "superseded grace must be shorter than refresh TTL, disabling"
            );
            self.superseded_grace_secs = 0;
        }
        let (min, max) = Self::RESET_CODE_LEN_RANGE;
        self.reset_code_len = self.reset_code_len.clamp(min, max);
        self.call_timeout_ms = self.call_timeout_ms.max(1);
        self
    }

    pub fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    pub fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    pub fn refresh_lock_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_lock_ttl_secs)
    }

    pub fn superseded_grace(&self) -> Duration {
        Duration::from_secs(self.superseded_grace_secs)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_ttl_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
