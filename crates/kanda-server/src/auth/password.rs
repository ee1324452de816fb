//! Admin credential rules and Argon2id hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use thiserror::Error;

use kanda_core::config::Config;

pub const MIN_PASSWORD_CHARS: usize = 12;

const TIME_COST: u32 = 3;
const LANES: u32 = 1;
const OUTPUT_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("invalid email: {0}")]
    InvalidEmail(String),
    #[error("password cannot be empty or whitespace-only")]
    BlankPassword,
    #[error("password must be at least {MIN_PASSWORD_CHARS} characters")]
    ShortPassword,
    #[error("argon2: {0}")]
    Hashing(String),
}

/// Trimmed, lowercased admin email. Needs a non-empty part on both sides
/// of a single `@`.
pub fn normalize_email(raw: &str) -> Result<String, CredentialError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain))
            if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
        {
            Ok(email)
        }
        _ => Err(CredentialError::InvalidEmail(email)),
    }
}

pub fn check_password_strength(password: &str) -> Result<(), CredentialError> {
    if password.trim().is_empty() {
        return Err(CredentialError::BlankPassword);
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(CredentialError::ShortPassword);
    }
    Ok(())
}

/// Argon2id hasher for admin passwords, sized by `KANDA_ARGON2_MEMORY_KB`.
pub struct AdminHasher {
    argon2: Argon2<'static>,
}

impl AdminHasher {
    pub fn new(memory_kb: u32) -> Result<Self, CredentialError> {
        let params = Params::new(memory_kb, TIME_COST, LANES, Some(OUTPUT_LEN))
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, CredentialError> {
        Self::new(cfg.argon2_memory_kb)
    }

    /// PHC string for `password`, which must pass [`check_password_strength`].
    pub fn hash(&self, password: &str) -> Result<String, CredentialError> {
        check_password_strength(password)?;
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| CredentialError::Hashing(e.to_string()))
    }
}

/// Cost parameters come from the stored hash, so accounts hashed under an
/// older memory setting still verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Owner@Kanda.Studio ").as_deref(),
            Ok("owner@kanda.studio")
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for raw in ["", "owner", "@kanda.studio", "owner@", "a@b@c"] {
            assert!(
                matches!(normalize_email(raw), Err(CredentialError::InvalidEmail(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn weak_passwords_are_rejected_before_hashing() {
        let hasher = AdminHasher::new(1024).expect("hasher");
        assert_eq!(hasher.hash("            "), Err(CredentialError::BlankPassword));
        assert_eq!(hasher.hash("short"), Err(CredentialError::ShortPassword));
        // Twelve characters counted as chars, not bytes.
        assert_eq!(check_password_strength("ééééééééééé"), Err(CredentialError::ShortPassword));
        assert_eq!(check_password_strength("éééééééééééé"), Ok(()));
    }

    #[test]
    fn hash_records_the_configured_cost() {
        let hash = AdminHasher::new(1024)
            .expect("hasher")
            .hash("correct horse battery")
            .expect("hash");
        assert!(hash.starts_with("$argon2id$v=19$m=1024,t=3,p=1$"));
        assert!(verify_password("correct horse battery", &hash));
        assert!(!verify_password("wrong horse battery", &hash));
        assert!(!verify_password("anything", "not-a-phc-string"));
    }

    #[test]
    fn zero_memory_is_a_hashing_error() {
        assert!(matches!(AdminHasher::new(0), Err(CredentialError::Hashing(_))));
    }
}
