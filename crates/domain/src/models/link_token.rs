//! Pairing-token domain model and code generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared::validation::{LINK_CODE_ALPHABET, LINK_CODE_LEN};

/// Fixed lifetime of a pairing code.
pub const LINK_CODE_TTL_MINUTES: i64 = 15;

/// A short-lived pairing code issued by a parent.
///
/// At most one token is active per parent; issuing a new one replaces the
/// previous token in the same store write. A token is consumed by the first
/// redemption attempt regardless of outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LinkToken {
    pub parent_id: Uuid,
    pub code: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl LinkToken {
    /// Creates a token for `parent_id` with a freshly sampled code and the
    /// fixed TTL starting at `now`.
    pub fn issue(parent_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            parent_id,
            code: generate_link_code(),
            issued_at: now,
            expires_at: now + chrono::Duration::minutes(LINK_CODE_TTL_MINUTES),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Response after generating a pairing code.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerateCodeResponse {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

/// Generate a random 6-character pairing code from the restricted alphabet.
pub fn generate_link_code() -> String {
    use rand::Rng;
    let mut rng = rand::thread_rng();

    (0..LINK_CODE_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..LINK_CODE_ALPHABET.len());
            LINK_CODE_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_link_code_format() {
        let code = generate_link_code();
        assert_eq!(code.len(), 6);
        for c in code.chars() {
            assert!(
                c.is_ascii_uppercase() || c.is_ascii_digit(),
                "Invalid char: {}",
                c
            );
            assert!(c != 'O' && c != 'I' && c != '0' && c != '1');
        }
        assert!(shared::validation::validate_link_code(&code).is_ok());
    }

    #[test]
    fn test_generate_link_code_uniqueness() {
        let codes: Vec<String> = (0..100).map(|_| generate_link_code()).collect();
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        // 32^6 combinations; collisions in 100 draws should be extremely rare
        assert!(unique.len() >= 99);
    }

    #[test]
    fn test_issue_sets_ttl() {
        let now = Utc::now();
        let token = LinkToken::issue(Uuid::new_v4(), now);
        assert_eq!(token.issued_at, now);
        assert_eq!(token.expires_at, now + chrono::Duration::minutes(15));
        assert!(!token.is_expired(now));
        assert!(!token.is_expired(now + chrono::Duration::minutes(15)));
        assert!(token.is_expired(now + chrono::Duration::minutes(16)));
    }
}
