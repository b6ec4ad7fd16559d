//! Token issuance.

use std::fmt;

use chrono::{DateTime, Utc};
use error::AppError;
use serde::{Deserialize, Serialize};

use crate::claims::{Claims, PrincipalId, RoleFlags};
use crate::jwt::{encode_token, JwtConfig, SigningKey};

/// A signed, time-bound bearer credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

/// Mints credentials for authenticated principals.
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    key: SigningKey,
    issuer: String,
    expires_in_secs: i64,
}

impl TokenIssuer {
    pub fn new(key: SigningKey, config: &JwtConfig) -> Self {
        Self {
            key,
            issuer: config.issuer.clone(),
            expires_in_secs: config.expires_in_secs,
        }
    }

    /// Token lifetime in seconds.
    pub fn expires_in_secs(&self) -> i64 {
        self.expires_in_secs
    }

    /// Issue a credential for `principal_id` at `now`.
    ///
    /// `roles` is embedded as a snapshot; the verifier re-reads current roles
    /// from the store, so the snapshot is informational.
    pub fn issue(
        &self,
        principal_id: &PrincipalId,
        roles: RoleFlags,
        now: DateTime<Utc>,
    ) -> Result<Credential, AppError> {
        let claims = Claims::new(
            principal_id.clone(),
            roles,
            self.issuer.as_str(),
            now,
            self.expires_in_secs,
        );
        let token = encode_token(&claims, &self.key)?;
        tracing::debug!(sub = %principal_id, %roles, exp = claims.exp, "Issued token");
        Ok(Credential(token))
    }
}
