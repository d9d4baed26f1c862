//! Signed bearer tokens.
//!
//! Tokens are HS256 JWTs carrying `user_id`, `user_role`, `iat` and `exp`.
//! The secret is always passed in explicitly so that callers own rotation
//! and per-environment keys.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::db::User;
use crate::error::AuthError;

/// The only signing algorithm accepted.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub user_id: i64,
    #[serde(rename = "user_role", default)]
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Sign a token for `user_id`/`role`, valid from now for `ttl`.
pub fn issue_token(user_id: i64, role: &str, secret: &str, ttl: Duration) -> Result<String, AuthError> {
    issue_token_at(user_id, role, secret, ttl, Utc::now())
}

pub fn issue_token_at(
    user_id: i64,
    role: &str,
    secret: &str,
    ttl: Duration,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::EmptySecret);
    }
    if user_id < 1 {
        return Err(AuthError::InvalidUser);
    }

    let expires_at = now.checked_add_signed(ttl).ok_or(AuthError::InvalidTtl)?;

    let claims = Claims {
        user_id,
        role: role.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };

    encode(
        &Header::new(TOKEN_ALGORITHM),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AuthError::Signing(e.to_string()))
}

/// Verify a token and return its claims.
pub fn parse_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    parse_token_at(token, secret, Utc::now())
}

/// Checks run in a fixed order and stop at the first failure: structure,
/// algorithm, signature, `user_id` presence, then the validity window.
pub fn parse_token_at(token: &str, secret: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
    if secret.is_empty() {
        return Err(AuthError::EmptySecret);
    }

    let header = decode_header(token).map_err(|e| {
        debug!(error = %e, "token header rejected");
        AuthError::InvalidToken
    })?;

    if header.alg != TOKEN_ALGORITHM {
        debug!(alg = ?header.alg, "token declares unexpected algorithm");
        return Err(AuthError::InvalidToken);
    }

    // Time checks are done below so they can be reported precisely.
    let mut validation = Validation::new(TOKEN_ALGORITHM);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let claims = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| {
            debug!(error = %e, "token signature or payload rejected");
            AuthError::InvalidToken
        })?
        .claims;

    if claims.user_id < 1 {
        return Err(AuthError::MissingClaim);
    }

    let now = now.timestamp();
    if claims.exp < now {
        return Err(AuthError::Expired);
    }
    if claims.iat > now {
        return Err(AuthError::NotYetValid);
    }

    Ok(claims)
}

/// Holds the signing secret and token lifetime for the running service.
///
/// Built once at startup; an empty secret is refused here so that no
/// request ever reaches the codec with one.
#[derive(Clone)]
pub struct TokenCodec {
    secret: String,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: impl Into<String>, ttl: Duration) -> Result<Self, AuthError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(AuthError::EmptySecret);
        }
        Ok(Self { secret, ttl })
    }

    pub fn issue(&self, user: &User) -> Result<String, AuthError> {
        debug!(user_id = user.id, ttl_secs = self.ttl.num_seconds(), "issuing token");
        issue_token(user.id, &user.role, &self.secret, self.ttl)
    }

    pub fn parse(&self, token: &str) -> Result<Claims, AuthError> {
        parse_token(token, &self.secret)
    }
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}
