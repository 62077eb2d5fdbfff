use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::warn;

pub const MIN_PASSWORD_LEN: usize = 8;

/// Length is the only rule; counted in characters, not bytes.
pub fn meets_policy(plain: &str) -> bool {
    plain.chars().count() >= MIN_PASSWORD_LEN
}

/// Argon2id PHC string with a fresh salt.
pub fn hash_password(plain: &str) -> password_hash::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(plain.as_bytes(), &salt)?
        .to_string())
}

/// A stored hash that does not parse never matches.
pub fn password_matches(plain: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "stored password hash unreadable");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixture::FIXTURE_PASSWORD_HASH;

    #[test]
    fn new_hashes_are_salted_argon2id() {
        let a = hash_password("open-house-2024").unwrap();
        let b = hash_password("open-house-2024").unwrap();
        assert!(a.starts_with("$argon2id$"));
        assert_ne!(a, b);
        assert!(password_matches("open-house-2024", &a));
        assert!(password_matches("open-house-2024", &b));
        assert!(!password_matches("open-house-2025", &a));
    }

    #[test]
    fn fixture_hash_accepts_only_the_demo_password() {
        assert!(password_matches("password", FIXTURE_PASSWORD_HASH));
        assert!(!password_matches("Password", FIXTURE_PASSWORD_HASH));
    }

    #[test]
    fn garbage_hash_is_a_mismatch() {
        assert!(!password_matches("anything", "plaintext-in-the-column"));
        assert!(!password_matches("", ""));
    }

    #[test]
    fn policy_counts_characters() {
        assert!(!meets_policy("short"));
        assert!(meets_policy("12345678"));
        assert!(!meets_policy("ééééééé"));
        assert!(meets_policy("éééééééé"));
    }
}
