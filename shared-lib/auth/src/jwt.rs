//! JWT encoding and decoding utilities.

use std::fmt;

use chrono::{DateTime, Utc};
use error::{AppError, AuthError};
use hmac::{Hmac, Mac};
use jwt::{Header, SignWithKey, Token, VerifyWithKey};
use sha2::Sha256;

use crate::claims::Claims;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime: 30 minutes.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 30 * 60;

/// JWT configuration.
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret key for signing tokens
    pub secret: String,
    /// Token issuer
    pub issuer: String,
    /// Token validity duration in seconds
    pub expires_in_secs: i64,
}

impl JwtConfig {
    /// Create a new JWT configuration.
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            expires_in_secs,
        }
    }
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("issuer", &self.issuer)
            .field("expires_in_secs", &self.expires_in_secs)
            .finish()
    }
}

/// Process-wide HMAC-SHA256 key, built once at startup and shared read-only.
#[derive(Clone)]
pub struct SigningKey(HmacSha256);

impl SigningKey {
    pub fn from_secret(secret: &str) -> Result<Self, AppError> {
        if secret.is_empty() {
            return Err(AppError::Config("signing secret must not be empty".to_string()));
        }
        let key = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            tracing::error!("Failed to create HMAC key: {}", e);
            AppError::Config(format!("invalid signing secret: {e}"))
        })?;
        Ok(Self(key))
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Encode claims into a signed JWT.
pub fn encode_token(claims: &Claims, key: &SigningKey) -> Result<String, AppError> {
    claims.sign_with_key(&key.0).map_err(|e| {
        tracing::error!("Failed to encode JWT: {}", e);
        AppError::Internal("token creation failed".to_string())
    })
}

/// Decode and validate a JWT at `now`.
///
/// Expiry is checked before the signature: a token whose `exp` has passed is
/// `Expired` whether or not it was signed with our key. Anything that cannot
/// be parsed, fails signature verification or names another issuer is
/// `InvalidSignature`.
pub fn decode_token(
    token: &str,
    key: &SigningKey,
    issuer: &str,
    now: DateTime<Utc>,
) -> Result<Claims, AuthError> {
    let unverified = Token::<Header, Claims, _>::parse_unverified(token).map_err(|e| {
        tracing::warn!("Failed to parse JWT: {}", e);
        AuthError::InvalidSignature
    })?;

    if unverified.claims().is_expired_at(now) {
        tracing::debug!(sub = %unverified.claims().sub, "Token expired");
        return Err(AuthError::Expired);
    }

    let claims: Claims = token.verify_with_key(&key.0).map_err(|e| {
        tracing::warn!("Failed to verify JWT: {}", e);
        AuthError::InvalidSignature
    })?;

    if claims.iss != issuer {
        tracing::warn!("Invalid issuer: expected {}, got {}", issuer, claims.iss);
        return Err(AuthError::InvalidSignature);
    }

    Ok(claims)
}
