pub mod policy;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

pub use policy::{decide, Decision, DenyReason, Policy, Principal};

/// Token payload. `isAdmin` keeps the wire name clients already send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    pub username: String,
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(username: impl Into<String>, is_admin: bool) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            username: username.into(),
            is_admin,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidToken(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidToken(msg) => write!(f, "Invalid JWT token: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

/// Signs a token for `username` with the configured secret and expiry.
pub fn create_token(username: &str, is_admin: bool) -> Result<String, JwtError> {
    encode_claims(&Claims::new(username, is_admin), &config::config().security.jwt_secret)
}

/// Checks signature and expiry against the configured secret.
pub fn verify_token(token: &str) -> Result<Claims, JwtError> {
    decode_claims(token, &config::config().security.jwt_secret)
}

pub fn encode_claims(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn decode_claims(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_claims() {
        let claims = Claims::new("test", false);
        let token = encode_claims(&claims, "s3cret").unwrap();
        assert_eq!(decode_claims(&token, "s3cret").unwrap(), claims);
    }

    #[test]
    fn rejects_wrong_secret() {
        let token = encode_claims(&Claims::new("test", true), "right").unwrap();
        assert!(matches!(decode_claims(&token, "wrong"), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn rejects_expired_token() {
        let mut claims = Claims::new("test", false);
        claims.iat -= 7200;
        claims.exp = Utc::now().timestamp() - 3600;
        let token = encode_claims(&claims, "s3cret").unwrap();
        assert!(decode_claims(&token, "s3cret").is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            encode_claims(&Claims::new("test", false), ""),
            Err(JwtError::InvalidSecret)
        ));
        assert!(matches!(decode_claims("abc", ""), Err(JwtError::InvalidSecret)));
    }

    #[test]
    fn payload_uses_is_admin_wire_name() {
        let value = serde_json::to_value(Claims::new("u1", true)).unwrap();
        assert_eq!(value["isAdmin"], serde_json::json!(true));
        assert_eq!(value["username"], serde_json::json!("u1"));
    }
}
