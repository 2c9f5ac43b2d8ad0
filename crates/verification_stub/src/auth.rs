use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::domain::UserId;

const ISSUER: &str = "kyc-verification-stub";

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_seconds: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    exp: i64,
    iat: i64,
}

pub fn mint_session_token(
    cfg: &SessionConfig,
    user_id: UserId,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let exp = now + Duration::seconds(cfg.ttl_seconds);
    let claims = Claims {
        iss: ISSUER.to_string(),
        sub: format!("user:{}", user_id.0),
        iat: now.timestamp(),
        exp: exp.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(cfg.secret.as_bytes()),
    )
}

/// Returns the user a token was minted for, or `None` when the token is
/// expired, forged or malformed.
pub fn verify_session_token(cfg: &SessionConfig, token: &str) -> Option<UserId> {
    decode_user(cfg, token, true)
}

/// Like [`verify_session_token`] but tolerates expiry, so a lapsed session can
/// still be exchanged for a fresh one.
pub fn verify_refreshable_token(cfg: &SessionConfig, token: &str) -> Option<UserId> {
    decode_user(cfg, token, false)
}

fn decode_user(cfg: &SessionConfig, token: &str, check_expiry: bool) -> Option<UserId> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = check_expiry;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(cfg.secret.as_bytes()),
        &validation,
    )
    .ok()?;
    data.claims
        .sub
        .strip_prefix("user:")?
        .parse::<i64>()
        .ok()
        .map(UserId)
}

#[cfg(test)]
#[path = "tests/auth_tests.rs"]
mod tests;
