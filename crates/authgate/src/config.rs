//! Service configuration: session settings plus the knobs the facade owns.
//!
//! Load it from a JSON document with [`AuthConfig::from_json`] or from
//! `AUTHGATE_*` environment variables with [`AuthConfig::from_env`]. Unset
//! fields keep their defaults.

use std::str::FromStr;

use authgate_session::{BcryptHasher, SessionConfig};
use serde::{Deserialize, Serialize};

/// Errors from loading an [`AuthConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable is set but its value is unusable.
    #[error("{var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    /// A JSON config document failed to parse.
    #[error("invalid config document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Everything needed to open an [`AuthService`](crate::AuthService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Token lifetimes, lock and grace periods, call timeout.
    pub session: SessionConfig,

    /// bcrypt cost for new password hashes. Default: 11.
    pub bcrypt_cost: u32,

    /// How often the in-process cache purges expired entries. 0 disables
    /// the sweeper (entries are then only dropped when read). Default: 60.
    pub sweep_interval_secs: u64,

    /// `tracing` filter used when `RUST_LOG` is unset. Default: `"info"`.
    pub log_filter: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            bcrypt_cost: BcryptHasher::DEFAULT_COST,
            sweep_interval_secs: 60,
            log_filter: "info".to_string(),
        }
    }
}

impl AuthConfig {
    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(doc)?;
        config.checked()
    }

    /// Builds a config from environment variables.
    ///
    /// # Env vars (all optional)
    /// - `AUTHGATE_ACCESS_TTL_SECS`, `AUTHGATE_REFRESH_TTL_SECS`
    /// - `AUTHGATE_REFRESH_LOCK_TTL_SECS`, `AUTHGATE_SUPERSEDED_GRACE_SECS`
    /// - `AUTHGATE_RESET_TTL_SECS`, `AUTHGATE_RESET_CODE_LEN`
    /// - `AUTHGATE_CALL_TIMEOUT_MS`
    /// - `AUTHGATE_BCRYPT_COST` (4–31)
    /// - `AUTHGATE_SWEEP_INTERVAL_SECS`
    /// - `AUTHGATE_LOG`: default log filter
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidVar`] if a variable is set to something
    /// that does not parse or is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let s = &mut config.session;

        set_parsed(&lookup, "AUTHGATE_ACCESS_TTL_SECS", &mut s.access_ttl_secs)?;
        set_parsed(&lookup, "AUTHGATE_REFRESH_TTL_SECS", &mut s.refresh_ttl_secs)?;
        set_parsed(&lookup, "AUTHGATE_REFRESH_LOCK_TTL_SECS", &mut s.refresh_lock_ttl_secs)?;
        set_parsed(&lookup, "AUTHGATE_SUPERSEDED_GRACE_SECS", &mut s.superseded_grace_secs)?;
        set_parsed(&lookup, "AUTHGATE_RESET_TTL_SECS", &mut s.reset_ttl_secs)?;
        set_parsed(&lookup, "AUTHGATE_RESET_CODE_LEN", &mut s.reset_code_len)?;
        set_parsed(&lookup, "AUTHGATE_CALL_TIMEOUT_MS", &mut s.call_timeout_ms)?;
        set_parsed(&lookup, "AUTHGATE_BCRYPT_COST", &mut config.bcrypt_cost)?;
        set_parsed(&lookup, "AUTHGATE_SWEEP_INTERVAL_SECS", &mut config.sweep_interval_secs)?;
        if let Some(filter) = lookup("AUTHGATE_LOG") {
            config.log_filter = filter;
        }

        config.checked()
    }

    /// Rejects values that clamping would silently change too much.
    fn checked(self) -> Result<Self, ConfigError> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidVar {
                var: "AUTHGATE_BCRYPT_COST",
                reason: format!("{} is outside 4..=31", self.bcrypt_cost),
            });
        }
        Ok(self)
    }
}

fn set_parsed<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    slot: &mut T,
) -> Result<(), ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(var) {
        *slot = raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidVar {
            var,
            reason: format!("{raw:?}: {e}"),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_from_lookup_empty_env_is_default() {
        let config = AuthConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AuthConfig::default());
    }

    #[test]
    fn test_from_lookup_overrides_fields() {
        let config = AuthConfig::from_lookup(lookup(&[
            ("AUTHGATE_ACCESS_TTL_SECS", "60"),
            ("AUTHGATE_SUPERSEDED_GRACE_SECS", " 2 "),
            ("AUTHGATE_BCRYPT_COST", "4"),
            ("AUTHGATE_LOG", "authgate=debug"),
        ]))
        .unwrap();

        assert_eq!(config.session.access_ttl_secs, 60);
        assert_eq!(config.session.superseded_grace_secs, 2);
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.log_filter, "authgate=debug");
    }

    #[test]
    fn test_from_lookup_unparsable_value_names_the_var() {
        let err = AuthConfig::from_lookup(lookup(&[("AUTHGATE_REFRESH_TTL_SECS", "a week")]))
            .unwrap_err();

        assert!(matches!(
            err,
            ConfigError::InvalidVar { var: "AUTHGATE_REFRESH_TTL_SECS", .. }
        ));
    }

    #[test]
    fn test_from_lookup_bcrypt_cost_out_of_range_is_rejected() {
        let err = AuthConfig::from_lookup(lookup(&[("AUTHGATE_BCRYPT_COST", "40")])).unwrap_err();
        assert!(err.to_string().contains("4..=31"));
    }

    #[test]
    fn test_from_json_partial_document_keeps_defaults() {
        let config = AuthConfig::from_json(
            r#"{ "session": { "access_ttl_secs": 120 }, "sweep_interval_secs": 0 }"#,
        )
        .unwrap();

        assert_eq!(config.session.access_ttl_secs, 120);
        assert_eq!(config.session.refresh_ttl_secs, 604_800);
        assert_eq!(config.sweep_interval_secs, 0);
        assert_eq!(config.bcrypt_cost, 11);
    }

    #[test]
    fn test_from_json_malformed_is_parse_error() {
        let err = AuthConfig::from_json("{ nope").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
