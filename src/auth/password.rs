//! Password hashing with bcrypt.
//!
//! The encoded hash embeds the algorithm version, cost, and salt, so a stored
//! value is all `verify` needs. Verification fails closed: a malformed hash is
//! reported as a mismatch, never as an error that a caller could mistake for
//! success.

use anyhow::{anyhow, Result};
use secrecy::{ExposeSecret, SecretString};
use tracing::warn;

pub const DEFAULT_COST: u32 = 10;
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Build a hasher with the given bcrypt cost.
    ///
    /// # Errors
    /// Returns an error if the cost is outside `MIN_COST..=MAX_COST`.
    pub fn new(cost: u32) -> Result<Self> {
        if !(MIN_COST..=MAX_COST).contains(&cost) {
            return Err(anyhow!(
                "bcrypt cost must be between {MIN_COST} and {MAX_COST}, got {cost}"
            ));
        }
        Ok(Self { cost })
    }

    #[must_use]
    pub const fn cost(&self) -> u32 {
        self.cost
    }

    /// Salt and hash a plaintext password. Every call draws a fresh salt.
    ///
    /// # Errors
    /// Returns an error if bcrypt fails to produce a hash.
    pub fn hash(&self, plaintext: &SecretString) -> Result<String> {
        bcrypt::hash(plaintext.expose_secret(), self.cost)
            .map_err(|err| anyhow!("failed to hash password: {err}"))
    }

    /// Check a plaintext attempt against a stored hash.
    #[must_use]
    pub fn verify(&self, plaintext: &SecretString, hashed: &str) -> bool {
        match bcrypt::verify(plaintext.expose_secret(), hashed) {
            Ok(matches) => matches,
            Err(err) => {
                warn!("stored password hash could not be parsed: {err}");
                false
            }
        }
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> PasswordHasher {
        PasswordHasher { cost: MIN_COST }
    }

    #[test]
    fn hash_then_verify() -> Result<()> {
        let password = SecretString::from("pw1");
        let hashed = hasher().hash(&password)?;
        assert!(hasher().verify(&password, &hashed));
        assert!(!hasher().verify(&SecretString::from("wrong"), &hashed));
        Ok(())
    }

    #[test]
    fn hash_is_salted() -> Result<()> {
        let password = SecretString::from("same input");
        let first = hasher().hash(&password)?;
        let second = hasher().hash(&password)?;
        assert_ne!(first, second);
        assert!(!first.contains("same input"));
        Ok(())
    }

    #[test]
    fn malformed_hash_fails_closed() {
        let password = SecretString::from("pw1");
        assert!(!hasher().verify(&password, ""));
        assert!(!hasher().verify(&password, "not-a-bcrypt-hash"));
        assert!(!hasher().verify(&password, "$2b$04$truncated"));
    }

    #[test]
    fn cost_bounds_are_enforced() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
        assert_eq!(PasswordHasher::new(12).map(|h| h.cost()).ok(), Some(12));
        assert_eq!(PasswordHasher::default().cost(), DEFAULT_COST);
    }
}
