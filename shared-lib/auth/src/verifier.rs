//! Token verification and principal resolution.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use error::{AuthError, DatabaseError};

use crate::jwt::{decode_token, JwtConfig, SigningKey};
use crate::principal::{Principal, UserStore};

/// Default upper bound for a single store lookup.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a store call, turning an elapsed deadline into [`DatabaseError::Timeout`].
pub async fn lookup_with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, DatabaseError>>,
{
    tokio::time::timeout(timeout, call)
        .await
        .map_err(|_| DatabaseError::Timeout(timeout))?
}

/// Validates credentials and resolves them to live principals.
#[derive(Clone)]
pub struct TokenVerifier {
    key: SigningKey,
    issuer: String,
    store: Arc<dyn UserStore>,
    store_timeout: Duration,
}

impl TokenVerifier {
    pub fn new(key: SigningKey, config: &JwtConfig, store: Arc<dyn UserStore>) -> Self {
        Self {
            key,
            issuer: config.issuer.clone(),
            store,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    /// Set the store lookup timeout.
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Verify `token` at `now` and resolve its subject.
    ///
    /// Roles come from the store record, not from the token snapshot. Exactly
    /// one store read is made per call.
    pub async fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, AuthError> {
        let claims = decode_token(token, &self.key, &self.issuer, now)?;

        let record = lookup_with_timeout(self.store_timeout, self.store.find_by_id(&claims.sub))
            .await
            .map_err(|e| {
                tracing::error!(sub = %claims.sub, "User lookup failed: {}", e);
                AuthError::StoreUnavailable
            })?
            .ok_or_else(|| {
                tracing::warn!(sub = %claims.sub, "Token subject not found");
                AuthError::UnknownSubject
            })?;

        if record.id != claims.sub {
            tracing::warn!(sub = %claims.sub, got = %record.id, "Store returned a different subject");
            return Err(AuthError::UnknownSubject);
        }

        let principal = Principal::from(record);
        if principal.roles != claims.roles {
            tracing::debug!(
                sub = %principal.id,
                token_roles = %claims.roles,
                current_roles = %principal.roles,
                "Roles changed since issuance"
            );
        }
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use async_trait::async_trait;

    use super::*;
    use crate::claims::{PrincipalId, Role, RoleFlags};
    use crate::issuer::TokenIssuer;
    use crate::principal::{Status, UserCredentials, UserRecord};

    #[derive(Default)]
    struct MapStore {
        users: RwLock<HashMap<PrincipalId, UserRecord>>,
    }

    impl MapStore {
        fn put(&self, id: &str, roles: RoleFlags, status: Status) {
            let record = UserRecord {
                id: PrincipalId::new(id),
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                username: id.to_string(),
                status,
                is_teacher: Some(roles.contains(Role::Teacher)),
                is_student: Some(roles.contains(Role::Student)),
                is_admin: Some(roles.contains(Role::Admin)),
                is_parent: Some(roles.contains(Role::Parent)),
            };
            self.users.write().unwrap().insert(record.id.clone(), record);
        }
    }

    #[async_trait]
    impl UserStore for MapStore {
        async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<UserRecord>, DatabaseError> {
            Ok(self.users.read().unwrap().get(id).cloned())
        }

        async fn find_by_username(
            &self,
            _username: &str,
        ) -> Result<Option<UserCredentials>, DatabaseError> {
            Ok(None)
        }
    }

    struct FailingStore;

    #[async_trait]
    impl UserStore for FailingStore {
        async fn find_by_id(&self, _id: &PrincipalId) -> Result<Option<UserRecord>, DatabaseError> {
            Err(DatabaseError::ConnectionFailed("connection refused".to_string()))
        }

        async fn find_by_username(
            &self,
            _username: &str,
        ) -> Result<Option<UserCredentials>, DatabaseError> {
            Err(DatabaseError::ConnectionFailed("connection refused".to_string()))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl UserStore for SlowStore {
        async fn find_by_id(&self, _id: &PrincipalId) -> Result<Option<UserRecord>, DatabaseError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(None)
        }

        async fn find_by_username(
            &self,
            _username: &str,
        ) -> Result<Option<UserCredentials>, DatabaseError> {
            Ok(None)
        }
    }

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn setup(store: Arc<dyn UserStore>) -> (TokenIssuer, TokenVerifier) {
        let config = JwtConfig::new("verifier-secret", "school", 1800);
        let key = SigningKey::from_secret(&config.secret).unwrap();
        let issuer = TokenIssuer::new(key.clone(), &config);
        let verifier = TokenVerifier::new(key, &config, store);
        (issuer, verifier)
    }

    #[tokio::test]
    async fn test_expiry_boundary() {
        let store = Arc::new(MapStore::default());
        store.put("u1", RoleFlags::of(&[Role::Teacher]), Status::Active);
        let (issuer, verifier) = setup(store);

        let token = issuer
            .issue(&PrincipalId::new("u1"), RoleFlags::of(&[Role::Teacher]), at(0))
            .unwrap();

        assert_eq!(
            verifier.verify(token.as_str(), at(1800)).await,
            Err(AuthError::Expired)
        );
        let principal = verifier.verify(token.as_str(), at(1799)).await.unwrap();
        assert_eq!(principal.id.as_str(), "u1");
        assert!(principal.has_role(Role::Teacher));
    }

    #[tokio::test]
    async fn test_roles_are_resolved_from_store() {
        let store = Arc::new(MapStore::default());
        store.put("u1", RoleFlags::of(&[Role::Teacher]), Status::Active);
        let (issuer, verifier) = setup(store.clone());

        let token = issuer
            .issue(&PrincipalId::new("u1"), RoleFlags::of(&[Role::Teacher]), at(0))
            .unwrap();
        store.put("u1", RoleFlags::of(&[Role::Student, Role::Parent]), Status::Active);

        let principal = verifier.verify(token.as_str(), at(60)).await.unwrap();
        assert_eq!(principal.roles, RoleFlags::of(&[Role::Student, Role::Parent]));
    }

    #[tokio::test]
    async fn test_unknown_subject() {
        let (issuer, verifier) = setup(Arc::new(MapStore::default()));
        let token = issuer
            .issue(&PrincipalId::new("ghost"), RoleFlags::empty(), at(0))
            .unwrap();

        assert_eq!(
            verifier.verify(token.as_str(), at(1)).await,
            Err(AuthError::UnknownSubject)
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_not_unknown_subject() {
        let (issuer, verifier) = setup(Arc::new(FailingStore));
        let token = issuer
            .issue(&PrincipalId::new("u1"), RoleFlags::empty(), at(0))
            .unwrap();

        assert_eq!(
            verifier.verify(token.as_str(), at(1)).await,
            Err(AuthError::StoreUnavailable)
        );
    }

    #[tokio::test]
    async fn test_store_timeout_is_unavailable() {
        let (issuer, verifier) = setup(Arc::new(SlowStore));
        let verifier = verifier.with_store_timeout(Duration::from_millis(20));
        let token = issuer
            .issue(&PrincipalId::new("u1"), RoleFlags::empty(), at(0))
            .unwrap();

        assert_eq!(
            verifier.verify(token.as_str(), at(1)).await,
            Err(AuthError::StoreUnavailable)
        );
    }

    #[tokio::test]
    async fn test_tampered_signature_with_future_expiry() {
        let store = Arc::new(MapStore::default());
        store.put("u1", RoleFlags::of(&[Role::Student]), Status::Active);
        let (issuer, verifier) = setup(store);

        let token = issuer
            .issue(&PrincipalId::new("u1"), RoleFlags::of(&[Role::Student]), at(0))
            .unwrap();
        let forged_config = JwtConfig::new("attacker-secret", "school", 1800);
        let forged = TokenIssuer::new(
            SigningKey::from_secret(&forged_config.secret).unwrap(),
            &forged_config,
        )
        .issue(&PrincipalId::new("u1"), RoleFlags::of(&[Role::Admin]), at(0))
        .unwrap();

        // Genuine header and payload, forged signature.
        let (body, _) = token.as_str().rsplit_once('.').unwrap();
        let (_, forged_sig) = forged.as_str().rsplit_once('.').unwrap();
        let tampered = format!("{body}.{forged_sig}");
        assert_eq!(
            verifier.verify(&tampered, at(1)).await,
            Err(AuthError::InvalidSignature)
        );

        // Forged payload, genuine signature.
        let (forged_body, _) = forged.as_str().rsplit_once('.').unwrap();
        let (_, genuine_sig) = token.as_str().rsplit_once('.').unwrap();
        let tampered = format!("{forged_body}.{genuine_sig}");
        assert_eq!(
            verifier.verify(&tampered, at(1)).await,
            Err(AuthError::InvalidSignature)
        );
    }

    #[tokio::test]
    async fn test_inactive_user_still_resolves() {
        // Status is informational; an inactive record is not rejected here.
        let store = Arc::new(MapStore::default());
        store.put("u1", RoleFlags::of(&[Role::Teacher]), Status::Inactive);
        let (issuer, verifier) = setup(store);

        let token = issuer
            .issue(&PrincipalId::new("u1"), RoleFlags::of(&[Role::Teacher]), at(0))
            .unwrap();
        let principal = verifier.verify(token.as_str(), at(1)).await.unwrap();
        assert!(!principal.is_active());
    }
}
