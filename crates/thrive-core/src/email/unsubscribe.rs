//! Signed one-click unsubscribe links.
//!
//! The token is an HMAC-SHA256 of the user id, so a link cannot be forged
//! for another user without the secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC of `user_id` under `secret`.
pub fn unsubscribe_token(user_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take keys of any size");
    mac.update(user_id.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// `{app_url}/unsubscribe?uid=…&token=…`
pub fn unsubscribe_url(app_url: &str, user_id: &str, secret: &str) -> String {
    format!(
        "{}/unsubscribe?uid={}&token={}",
        app_url.trim_end_matches('/'),
        urlencoding::encode(user_id),
        unsubscribe_token(user_id, secret)
    )
}

/// Check a token from an unsubscribe link in constant time.
pub fn verify_unsubscribe_token(user_id: &str, token: &str, secret: &str) -> bool {
    let expected = unsubscribe_token(user_id, secret);
    if expected.len() != token.len() {
        return false;
    }

    let mut diff = 0u8;
    for (a, b) in expected.bytes().zip(token.bytes()) {
        diff |= a ^ b;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_stable_hex() {
        let a = unsubscribe_token("user-1", "s3cret");
        assert_eq!(a, unsubscribe_token("user-1", "s3cret"));
        assert_eq!(a.len(), 64);
        assert_ne!(a, unsubscribe_token("user-2", "s3cret"));
        assert_ne!(a, unsubscribe_token("user-1", "other"));
    }

    #[test]
    fn url_encodes_user_id_and_trims_slash() {
        let url = unsubscribe_url("https://app.example.com/", "a b&c", "k");
        assert!(url.starts_with("https://app.example.com/unsubscribe?uid=a%20b%26c&token="));
    }

    #[test]
    fn verify_accepts_only_matching_tokens() {
        let token = unsubscribe_token("user-1", "k");
        assert!(verify_unsubscribe_token("user-1", &token, "k"));
        assert!(!verify_unsubscribe_token("user-2", &token, "k"));
        assert!(!verify_unsubscribe_token("user-1", "short", "k"));
    }
}
