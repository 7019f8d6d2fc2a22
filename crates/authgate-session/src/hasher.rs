//! Password hashing seam and the bcrypt implementation.
//!
//! The coordinator treats hashing as opaque: `hash` produces something to
//! store, `verify` compares a stored hash to a candidate. Both are plain
//! blocking calls; the coordinator runs them on Tokio's blocking pool.

/// Errors from a [`PasswordHasher`].
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("password hashing failed: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    /// The blocking task running the hasher panicked or was cancelled.
    #[error("password hashing task failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync + 'static {
    /// Hashes a plaintext password for storage.
    fn hash(&self, plain: &str) -> Result<String, HashError>;

    /// Returns `true` if `plain` matches `hash`. A malformed stored hash is
    /// a mismatch, not an error.
    fn verify(&self, hash: &str, plain: &str) -> bool;
}

/// bcrypt with a configurable cost.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    /// Cost used in production.
    pub const DEFAULT_COST: u32 = 11;
    const MIN_COST: u32 = 4;
    const MAX_COST: u32 = 31;

    /// Creates a hasher; `cost` is clamped to bcrypt's valid range (4–31).
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(Self::MIN_COST, Self::MAX_COST),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        Ok(bcrypt::hash(plain, self.cost)?)
    }

    fn verify(&self, hash: &str, plain: &str) -> bool {
        bcrypt::verify(plain, hash).unwrap_or(false)
    }
}

/// Password complexity policy for new passwords.
///
/// At least 8 characters with an uppercase letter, a lowercase letter, a
/// digit, and a punctuation or symbol character.
pub fn meets_complexity(password: &str) -> bool {
    let (mut upper, mut lower, mut digit, mut special) = (false, false, false, false);
    for c in password.chars() {
        if c.is_uppercase() {
            upper = true;
        } else if c.is_lowercase() {
            lower = true;
        } else if c.is_numeric() {
            digit = true;
        } else if c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace()) {
            special = true;
        }
    }
    password.chars().count() >= 8 && upper && lower && digit && special
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify_matches() {
        let hasher = BcryptHasher::new(4);
        let hash = hasher.hash("Secr3t!pw").unwrap();

        assert!(hasher.verify(&hash, "Secr3t!pw"));
        assert!(!hasher.verify(&hash, "Secr3t!pW"));
    }

    #[test]
    fn test_verify_malformed_hash_is_mismatch() {
        let hasher = BcryptHasher::new(4);
        assert!(!hasher.verify("not-a-bcrypt-hash", "anything"));
    }

    #[test]
    fn test_new_clamps_cost() {
        assert_eq!(BcryptHasher::new(1).cost(), 4);
        assert_eq!(BcryptHasher::new(99).cost(), 31);
        assert_eq!(BcryptHasher::default().cost(), 11);
    }

    #[test]
    fn test_meets_complexity_accepts_strong_password() {
        assert!(meets_complexity("Abcdef1!"));
        assert!(meets_complexity("Zz9€longer"));
    }

    #[test]
    fn test_meets_complexity_rejects_each_missing_class() {
        assert!(!meets_complexity("Abc1!"), "too short");
        assert!(!meets_complexity("abcdefg1!"), "no upper");
        assert!(!meets_complexity("ABCDEFG1!"), "no lower");
        assert!(!meets_complexity("Abcdefgh!"), "no digit");
        assert!(!meets_complexity("Abcdefgh1"), "no symbol");
    }
}
