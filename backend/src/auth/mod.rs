//! Bearer-token identity extraction.
//!
//! Decoding runs three tiers: an HS256-verified decode when a secret is
//! configured, then an unverified decode, then a fixed fallback identity.
//! Requests are never rejected here unless strict mode is on, in which case
//! only the verified tier is used.

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{de::DeserializeOwned, Deserialize};

use crate::error::AppError;

pub const FALLBACK_USER_ID: &str = "test-user-123";
pub const FALLBACK_EMAIL: &str = "test@example.com";
pub const DEFAULT_EMAIL: &str = "user@example.com";

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub sub: Option<String>,
    pub email: Option<String>,
}

/// The caller, as derived from the bearer token.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn fallback() -> Self {
        Self {
            user_id: FALLBACK_USER_ID.to_string(),
            email: FALLBACK_EMAIL.to_string(),
        }
    }

    fn from_claims(claims: Claims) -> Option<Self> {
        let user_id = claims.sub.filter(|s| !s.is_empty())?;
        Some(Self {
            user_id,
            email: claims.email.unwrap_or_else(|| DEFAULT_EMAIL.to_string()),
        })
    }
}

#[derive(Clone, Debug, Default)]
pub struct TokenDecoder {
    secret: Option<String>,
    strict: bool,
}

impl TokenDecoder {
    pub fn new(secret: Option<String>, strict: bool) -> Self {
        Self { secret, strict }
    }

    /// Resolves the caller for an optional bearer token.
    pub fn identify(&self, token: Option<&str>) -> Result<Identity, AppError> {
        if let Some(token) = token {
            if let Some(identity) = self.decode_verified(token) {
                return Ok(identity);
            }
            if !self.strict {
                if let Some(identity) = decode_unverified(token) {
                    return Ok(identity);
                }
            }
        }

        if self.strict {
            return Err(AppError::Unauthorized);
        }

        tracing::debug!("No usable bearer token, using fallback identity");
        Ok(Identity::fallback())
    }

    fn decode_verified(&self, token: &str) -> Option<Identity> {
        let secret = self.secret.as_ref()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(secret.as_bytes());
        match decode::<Claims>(token, &key, &validation) {
            Ok(data) => Identity::from_claims(data.claims),
            Err(e) => {
                tracing::warn!("JWT decode failed: {}", e);
                None
            }
        }
    }
}

/// Reads the claims without checking the signature, expiry, or `alg`, so
/// unsigned (`alg: none`) tokens decode as well.
fn decode_unverified(token: &str) -> Option<Identity> {
    let mut segments = token.split('.');
    let (header, payload) = match (segments.next(), segments.next(), segments.next()) {
        (Some(header), Some(payload), Some(_)) => (header, payload),
        _ => {
            tracing::debug!("Unverified JWT decode failed: expected three segments");
            return None;
        }
    };

    let claims = segment_json::<serde_json::Map<String, serde_json::Value>>(header)
        .and_then(|_| segment_json::<Claims>(payload));
    match claims {
        Ok(claims) => Identity::from_claims(claims),
        Err(e) => {
            tracing::debug!("Unverified JWT decode failed: {}", e);
            None
        }
    }
}

fn segment_json<T: DeserializeOwned>(segment: &str) -> anyhow::Result<T> {
    let bytes = URL_SAFE_NO_PAD.decode(segment.trim_end_matches('='))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl<S> FromRequestParts<S> for Identity
where
    TokenDecoder: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let decoder = TokenDecoder::from_ref(state);
        let token = extract_bearer_token(&parts.headers);
        decoder.identify(token.as_deref())
    }
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth = headers.get("Authorization")?.to_str().ok()?;
    let (scheme, token) = auth.trim().split_once(char::is_whitespace)?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim_start().to_string())
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn sign(claims: serde_json::Value, secret: &str) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verified_token_yields_subject_and_email() {
        let decoder = TokenDecoder::new(Some(SECRET.into()), false);
        let token = sign(
            json!({"sub": "U1", "email": "u1@acme.test", "aud": "authenticated"}),
            SECRET,
        );
        assert_eq!(
            decoder.identify(Some(token.as_str())).unwrap(),
            Identity {
                user_id: "U1".into(),
                email: "u1@acme.test".into()
            }
        );
    }

    #[test]
    fn missing_email_defaults() {
        let decoder = TokenDecoder::default();
        let token = sign(json!({"sub": "U1"}), "whatever");
        let identity = decoder.identify(Some(token.as_str())).unwrap();
        assert_eq!(identity.email, DEFAULT_EMAIL);
    }

    #[test]
    fn wrong_secret_falls_back_to_unverified_decode() {
        let decoder = TokenDecoder::new(Some(SECRET.into()), false);
        let token = sign(json!({"sub": "U2"}), "another-secret");
        assert_eq!(decoder.identify(Some(token.as_str())).unwrap().user_id, "U2");
    }

    #[test]
    fn expired_token_still_decodes_unverified() {
        let decoder = TokenDecoder::new(Some(SECRET.into()), false);
        let token = sign(json!({"sub": "U3", "exp": 1_000}), SECRET);
        assert_eq!(decoder.identify(Some(token.as_str())).unwrap().user_id, "U3");
    }

    #[test]
    fn garbage_missing_or_subjectless_tokens_use_fallback() {
        let decoder = TokenDecoder::new(Some(SECRET.into()), false);
        let no_sub = sign(json!({"email": "x@y.z"}), SECRET);
        let empty_sub = sign(json!({"sub": ""}), SECRET);
        for token in [Some("not-a-jwt"), Some(no_sub.as_str()), Some(empty_sub.as_str()), None] {
            assert_eq!(decoder.identify(token).unwrap(), Identity::fallback());
        }
    }

    #[test]
    fn strict_mode_only_accepts_verified_tokens() {
        let decoder = TokenDecoder::new(Some(SECRET.into()), true);
        let good = sign(json!({"sub": "U1"}), SECRET);
        let forged = sign(json!({"sub": "U1"}), "forged");
        assert_eq!(decoder.identify(Some(good.as_str())).unwrap().user_id, "U1");
        assert!(matches!(
            decoder.identify(Some(forged.as_str())),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(decoder.identify(None), Err(AppError::Unauthorized)));
    }

    #[test]
    fn bearer_prefix_is_required() {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", "Token abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
        headers.insert("Authorization", "Bearer abc".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc"));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        for value in ["bearer abc", "BEARER abc", "Bearer  abc"] {
            headers.insert("Authorization", value.parse().unwrap());
            assert_eq!(extract_bearer_token(&headers).as_deref(), Some("abc"), "{}", value);
        }
        headers.insert("Authorization", "Bearer".parse().unwrap());
        assert_eq!(extract_bearer_token(&headers), None);
    }

    #[test]
    fn unsigned_token_decodes_unverified() {
        // {"alg":"none","typ":"JWT"} . {"sub":"U1","email":"u1@x.io"} . (no signature)
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJzdWIiOiJVMSIsImVtYWlsIjoidTFAeC5pbyJ9.";
        for decoder in [
            TokenDecoder::default(),
            TokenDecoder::new(Some(SECRET.into()), false),
        ] {
            assert_eq!(
                decoder.identify(Some(token)).unwrap(),
                Identity {
                    user_id: "U1".into(),
                    email: "u1@x.io".into()
                }
            );
        }
    }

    #[test]
    fn unsigned_token_is_rejected_in_strict_mode() {
        let decoder = TokenDecoder::new(Some(SECRET.into()), true);
        let token = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0.eyJzdWIiOiJVMSIsImVtYWlsIjoidTFAeC5pbyJ9.";
        assert!(matches!(
            decoder.identify(Some(token)),
            Err(AppError::Unauthorized)
        ));
    }
}
