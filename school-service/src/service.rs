//! Authentication service
//!
//! Ties the token issuer, the verifier and the access gate to a user store.
//! Every method takes the current time explicitly.

use std::sync::Arc;
use std::time::Duration;

use auth::password::verify_password;
use auth::{
    authorize, lookup_with_timeout, AccessPolicy, JwtConfig, Principal, SigningKey, TokenIssuer,
    TokenVerifier, UserStore,
};
use chrono::{DateTime, Utc};
use error::{AccessDenied, AppError, AuthError};
use serde::{Deserialize, Serialize};

use crate::config::ServiceConfig;
use crate::policies::Operation;

/// Login response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Login, per-request principal resolution and access checks.
pub struct AuthService {
    issuer: TokenIssuer,
    verifier: TokenVerifier,
    store: Arc<dyn UserStore>,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(
        jwt: &JwtConfig,
        store: Arc<dyn UserStore>,
        store_timeout: Duration,
    ) -> Result<Self, AppError> {
        let key = SigningKey::from_secret(&jwt.secret)?;
        Ok(Self {
            issuer: TokenIssuer::new(key.clone(), jwt),
            verifier: TokenVerifier::new(key, jwt, store.clone()).with_store_timeout(store_timeout),
            store,
            store_timeout,
        })
    }

    pub fn from_config(config: &ServiceConfig, store: Arc<dyn UserStore>) -> Result<Self, AppError> {
        Self::new(&config.jwt, store, config.store_timeout())
    }

    /// Check a username/password pair and issue a credential.
    ///
    /// An unknown username and a wrong password fail the same way.
    pub async fn login(
        &self,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AppError> {
        let creds = lookup_with_timeout(self.store_timeout, self.store.find_by_username(username))
            .await
            .map_err(|e| {
                tracing::error!("Login lookup failed: {}", e);
                AuthError::StoreUnavailable
            })?;

        let creds = match creds {
            Some(creds) if verify_password(password, &creds.hashed_password) => creds,
            _ => {
                tracing::warn!(username, "Login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        let record = creds.record;
        let credential = self.issuer.issue(&record.id, record.roles(), now)?;
        tracing::info!(sub = %record.id, "Login succeeded");

        Ok(AccessToken {
            access_token: credential.into_string(),
            token_type: "bearer".to_string(),
            expires_in: self.issuer.expires_in_secs(),
        })
    }

    /// Resolve the caller. A missing bearer is `Unauthenticated`.
    pub async fn current_user(
        &self,
        bearer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Principal, AppError> {
        self.resolve(bearer, now)
            .await?
            .ok_or(AppError::Denied(AccessDenied::Unauthenticated))
    }

    /// Resolve the caller and check it against `policy`.
    pub async fn guard(
        &self,
        bearer: Option<&str>,
        policy: &AccessPolicy,
        now: DateTime<Utc>,
    ) -> Result<Principal, AppError> {
        let principal = self.resolve(bearer, now).await?;

        authorize(principal.as_ref(), policy)
            .into_result()
            .map_err(|reason| {
                tracing::warn!(
                    sub = principal.as_ref().map(|p| p.id.as_str()),
                    required = %policy.required(),
                    %reason,
                    "Access denied"
                );
                reason
            })?;

        principal.ok_or(AppError::Denied(AccessDenied::Unauthenticated))
    }

    /// [`AuthService::guard`] with the policy of a named operation.
    pub async fn authorize_operation(
        &self,
        bearer: Option<&str>,
        operation: Operation,
        now: DateTime<Utc>,
    ) -> Result<Principal, AppError> {
        let principal = self.guard(bearer, &operation.policy(), now).await?;
        tracing::debug!(sub = %principal.id, %operation, "Access allowed");
        Ok(principal)
    }

    /// Whether the user store currently answers, bounded by the store timeout.
    pub async fn store_health(&self) -> Result<(), AuthError> {
        lookup_with_timeout(self.store_timeout, self.store.ping())
            .await
            .map_err(|e| {
                tracing::warn!("User store health check failed: {}", e);
                AuthError::StoreUnavailable
            })
    }

    async fn resolve(
        &self,
        bearer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, AuthError> {
        let Some(token) = bearer else {
            return Ok(None);
        };
        self.verifier.verify(token, now).await.map(Some).map_err(|e| {
            tracing::warn!(reason = %e, "Credential rejected");
            e
        })
    }
}
