//! Unverified access-token claims
//!
//! Diagnostic only. Nothing in the relay or the client skips a call because a
//! token looks expired here; the backend decides.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Deserialize)]
struct ExpiryClaim {
    exp: Option<i64>,
}

/// Expiry encoded in a JWT access token, if it is a JWT carrying `exp`
pub fn access_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claim: ExpiryClaim = serde_json::from_slice(&decoded).ok()?;
    DateTime::from_timestamp(claim.exp?, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.sig",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_reads_exp_claim() {
        let token = token_with_payload(r#"{"user_id":7,"exp":1700000000}"#);
        let expiry = access_expiry(&token).unwrap();
        assert_eq!(expiry.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_missing_exp_claim() {
        let token = token_with_payload(r#"{"user_id":7}"#);
        assert!(access_expiry(&token).is_none());
    }

    #[test]
    fn test_opaque_tokens_have_no_expiry() {
        assert!(access_expiry("opaque-token").is_none());
        assert!(access_expiry("a.b").is_none());
        assert!(access_expiry("a.!!!.c").is_none());
        assert!(access_expiry("a.b.c.d").is_none());
    }
}
