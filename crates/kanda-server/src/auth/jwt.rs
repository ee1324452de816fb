use anyhow::{anyhow, Result};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Admin email.
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

/// Encode an HS256 session token for `email`.
///
/// Returns (token_string, expires_at).
pub fn encode_jwt(
    secret: &str,
    email: &str,
    role: &str,
    session_hours: u32,
) -> Result<(String, DateTime<Utc>)> {
    let now = Utc::now();
    let exp = now + Duration::hours(i64::from(session_hours));

    let claims = Claims {
        sub: email.to_string(),
        role: role.to_string(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| anyhow!("encode_jwt: {}", e))?;

    Ok((token, exp))
}

/// Decode and validate a session token (signature and expiry).
pub fn decode_jwt(token: &str, secret: &str) -> Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| anyhow!("decode_jwt: {}", e))?;

    Ok(data.claims)
}
