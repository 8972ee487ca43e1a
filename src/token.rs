//! Bearer tokens and their expiry.
//!
//! TDX returns a JWT as the raw login response body. Only the `exp` claim is
//! read; the signature is not verified since the token is opaque to us and is
//! checked by the API on every call.

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};

use crate::clock::to_delta;
use crate::error::TdxError;

/// How long before `exp` a token is treated as stale.
pub const REFRESH_BUFFER: Duration = Duration::from_secs(5 * 60);

/// A bearer token together with the expiry decoded from it.
///
/// Token and expiry only exist as a pair; a refresh replaces the whole value.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl BearerToken {
    /// Parses a raw login response into a token.
    ///
    /// # Errors
    ///
    /// Returns `TdxError::Token` if the body is empty, is not a JWT, or has
    /// no usable `exp` claim.
    pub fn parse(raw: &str) -> Result<Self, TdxError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(TdxError::token("empty response received"));
        }

        let expires_at = decode_expiry(value)?;

        Ok(Self {
            value: value.to_string(),
            expires_at,
        })
    }

    /// The opaque token string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// When the token expires according to its `exp` claim.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Instant from which the token should be replaced.
    pub fn refresh_at(&self) -> DateTime<Utc> {
        self.expires_at - to_delta(REFRESH_BUFFER)
    }

    /// True while `now < expires_at - REFRESH_BUFFER`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.refresh_at()
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.value)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Reads the `exp` claim from a JWT without verifying its signature.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>, TdxError> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next()) {
        (Some(_header), Some(payload)) if !payload.is_empty() => payload,
        _ => return Err(TdxError::token("failed to decode token: not a JWT")),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| TdxError::token(format!("failed to decode token: {}", e)))?;

    let claims: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| TdxError::token(format!("failed to decode token: {}", e)))?;

    let exp = match claims.get("exp") {
        Some(serde_json::Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        _ => None,
    };

    match exp {
        Some(secs) if secs > 0 => DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| TdxError::token("token expiration claim out of range")),
        _ => Err(TdxError::token("token missing expiration claim")),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Builds unsigned JWTs for tests.

    use super::*;

    pub(crate) fn jwt_with_claims(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.c2lnbmF0dXJl", header, payload)
    }

    pub(crate) fn jwt_expiring_at(exp: DateTime<Utc>) -> String {
        jwt_with_claims(serde_json::json!({ "exp": exp.timestamp(), "sub": "tester" }))
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    #[test]
    fn test_decode_expiry_reads_exp_claim() {
        let exp = Utc.with_ymd_and_hms(2024, 5, 20, 21, 10, 22).unwrap();
        let token = jwt_expiring_at(exp);
        assert_eq!(decode_expiry(&token).unwrap(), exp);
    }

    #[test]
    fn test_decode_expiry_accepts_float_exp() {
        let token = jwt_with_claims(serde_json::json!({ "exp": 1716239022.75 }));
        assert_eq!(decode_expiry(&token).unwrap().timestamp(), 1716239022);
    }

    #[test]
    fn test_decode_expiry_known_fixture() {
        // {"typ":"JWT","alg":"HS256"}.{"exp":1716239022}
        let token = "eyJ0eXAiOiJKV1QiLCJhbGciOiJIUzI1NiJ9.eyJleHAiOjE3MTYyMzkwMjJ9.fake";
        assert_eq!(decode_expiry(token).unwrap().timestamp(), 1716239022);
    }

    #[test]
    fn test_missing_exp_is_token_error() {
        let token = jwt_with_claims(serde_json::json!({ "sub": "tester" }));
        let err = decode_expiry(&token).unwrap_err();
        assert!(matches!(err, TdxError::Token(_)));
        assert!(err.to_string().contains("missing expiration claim"));
    }

    #[test]
    fn test_garbage_token_is_token_error() {
        for raw in ["not-a-jwt", "a.!!!.c", "a..c"] {
            assert!(matches!(decode_expiry(raw), Err(TdxError::Token(_))), "{raw}");
        }
    }

    #[test]
    fn test_parse_rejects_empty_body() {
        let err = BearerToken::parse("  \n").unwrap_err();
        assert!(err.to_string().contains("empty response"));
    }

    #[test]
    fn test_parse_trims_body() {
        let exp = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let raw = format!("  {}\n", jwt_expiring_at(exp));
        let token = BearerToken::parse(&raw).unwrap();
        assert_eq!(token.value(), raw.trim());
        assert_eq!(token.expires_at(), exp);
        assert!(token.authorization().starts_with("Bearer ey"));
    }

    #[test]
    fn test_freshness_boundary() {
        let exp = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        let token = BearerToken::parse(&jwt_expiring_at(exp)).unwrap();
        let boundary = exp - TimeDelta::minutes(5);

        assert!(token.is_fresh(boundary - TimeDelta::seconds(1)));
        assert!(!token.is_fresh(boundary));
        assert!(!token.is_fresh(exp));
    }

    #[test]
    fn test_debug_redacts_value() {
        let token = BearerToken::parse(&jwt_expiring_at(Utc::now())).unwrap();
        assert!(!format!("{:?}", token).contains(token.value()));
    }
}
