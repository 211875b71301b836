/// One-time password reset tokens
///
/// The plaintext token (32 random bytes, hex encoded) is mailed to the user
/// and never stored. Only its SHA-256 digest is persisted, together with an
/// expiry [`RESET_TOKEN_TTL_MINUTES`] in the future.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

/// Lifetime of a reset token
pub const RESET_TOKEN_TTL_MINUTES: i64 = 10;

/// A freshly issued reset token
#[derive(Debug, Clone)]
pub struct IssuedResetToken {
    /// Value sent to the user (64 hex chars)
    pub plaintext: String,

    /// SHA-256 hex digest stored on the user row
    pub hash: String,

    pub expires_at: DateTime<Utc>,
}

impl IssuedResetToken {
    /// Generates a new random token expiring in ten minutes
    pub fn issue() -> Self {
        let bytes: [u8; 32] = rand::random();
        let plaintext = hex::encode(bytes);
        let hash = hash_token(&plaintext);

        Self {
            plaintext,
            hash,
            expires_at: Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES),
        }
    }
}

/// Digest used to look a presented token up
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_produces_hex_token_and_matching_hash() {
        let token = IssuedResetToken::issue();

        assert_eq!(token.plaintext.len(), 64);
        assert!(token.plaintext.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(token.hash, hash_token(&token.plaintext));
        assert_ne!(token.hash, token.plaintext);
    }

    #[test]
    fn test_expiry_is_ten_minutes_out() {
        let token = IssuedResetToken::issue();
        let remaining = token.expires_at - Utc::now();

        assert!(remaining <= Duration::minutes(10));
        assert!(remaining > Duration::minutes(9));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(IssuedResetToken::issue().plaintext, IssuedResetToken::issue().plaintext);
    }

    #[test]
    fn test_hash_is_stable() {
        // sha256("abc")
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
