//! Credential Service
//!
//! Password hashing and verification with bcrypt.

use thiserror::Error;

use crate::utils::error::{codes, CodedError};
use crate::utils::security::DEFAULT_BCRYPT_COST;

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("Password hashing failed: {0}")]
    Hashing(bcrypt::BcryptError),

    /// The stored hash could not be parsed
    #[error("Stored password hash is malformed: {0}")]
    MalformedHash(bcrypt::BcryptError),
}

impl CodedError for CredentialError {
    fn code(&self) -> &'static str {
        codes::INTERNAL
    }
}

/// Result of comparing a password with a stored hash
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordCheck {
    Match,
    Mismatch,
}

/// Stateless bcrypt hasher
#[derive(Debug, Clone)]
pub struct CredentialService {
    cost: u32,
}

impl Default for CredentialService {
    fn default() -> Self {
        Self::new(DEFAULT_BCRYPT_COST)
    }
}

impl CredentialService {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh random salt
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        bcrypt::hash(password, self.cost).map_err(CredentialError::Hashing)
    }

    /// Compare a password against a stored hash.
    ///
    /// A hash that cannot be parsed is an error, never a mismatch.
    pub fn verify(&self, hash: &str, password: &str) -> Result<PasswordCheck, CredentialError> {
        match bcrypt::verify(password, hash) {
            Ok(true) => Ok(PasswordCheck::Match),
            Ok(false) => Ok(PasswordCheck::Mismatch),
            Err(err) => Err(CredentialError::MalformedHash(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> CredentialService {
        CredentialService::new(4)
    }

    #[test]
    fn test_hashes_are_salted() {
        let service = service();
        let first = service.hash("correct-horse").unwrap();
        let second = service.hash("correct-horse").unwrap();

        assert_ne!(first, second);
        assert_eq!(
            service.verify(&first, "correct-horse").unwrap(),
            PasswordCheck::Match
        );
        assert_eq!(
            service.verify(&second, "correct-horse").unwrap(),
            PasswordCheck::Match
        );
    }

    #[test]
    fn test_wrong_password_is_mismatch() {
        let service = service();
        let hash = service.hash("correct-horse").unwrap();

        assert_eq!(
            service.verify(&hash, "battery-staple").unwrap(),
            PasswordCheck::Mismatch
        );
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let result = service().verify("not-a-bcrypt-hash", "correct-horse");
        assert!(matches!(result, Err(CredentialError::MalformedHash(_))));
    }

    #[test]
    fn test_default_cost() {
        assert_eq!(CredentialService::default().cost(), DEFAULT_BCRYPT_COST);
    }
}
