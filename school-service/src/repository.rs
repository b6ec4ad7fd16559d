//! User repository
//!
//! In-memory [`UserStore`] for tests and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use auth::{PrincipalId, Role, RoleFlags, Status, UserCredentials, UserRecord, UserStore};
use error::{AppError, DatabaseError};

/// Fields for a user being created.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub hashed_password: String,
    pub roles: RoleFlags,
}

/// In-memory user store
pub struct InMemoryUserStore {
    users: RwLock<HashMap<PrincipalId, UserCredentials>>,
    next_id: AtomicI64,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<PrincipalId, UserCredentials>>, DatabaseError> {
        self.users
            .read()
            .map_err(|_| DatabaseError::QueryFailed("user table lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, HashMap<PrincipalId, UserCredentials>>, DatabaseError> {
        self.users
            .write()
            .map_err(|_| DatabaseError::QueryFailed("user table lock poisoned".to_string()))
    }

    /// Create an active user. Usernames are unique.
    pub fn create_user(&self, user: NewUser) -> Result<UserRecord, AppError> {
        let mut users = self.write()?;
        if users.values().any(|c| c.record.username == user.username) {
            return Err(AppError::Validation(format!(
                "Username '{}' already exists",
                user.username
            )));
        }

        let id = PrincipalId::new(self.next_id.fetch_add(1, Ordering::SeqCst).to_string());
        let record = UserRecord {
            id: id.clone(),
            first_name: user.first_name,
            last_name: user.last_name,
            username: user.username,
            status: Status::Active,
            is_teacher: Some(user.roles.contains(Role::Teacher)),
            is_student: Some(user.roles.contains(Role::Student)),
            is_admin: Some(user.roles.contains(Role::Admin)),
            is_parent: Some(user.roles.contains(Role::Parent)),
        };
        users.insert(
            id,
            UserCredentials {
                record: record.clone(),
                hashed_password: user.hashed_password,
            },
        );
        Ok(record)
    }

    /// Replace a user's role flags.
    pub fn set_roles(&self, id: &PrincipalId, roles: RoleFlags) -> Result<(), AppError> {
        self.update(id, |record| {
            record.is_teacher = Some(roles.contains(Role::Teacher));
            record.is_student = Some(roles.contains(Role::Student));
            record.is_admin = Some(roles.contains(Role::Admin));
            record.is_parent = Some(roles.contains(Role::Parent));
        })
    }

    pub fn set_status(&self, id: &PrincipalId, status: Status) -> Result<(), AppError> {
        self.update(id, |record| record.status = status)
    }

    /// Delete a user
    pub fn delete(&self, id: &PrincipalId) -> Result<(), AppError> {
        self.write()?
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("User {id}")))
    }

    fn update(&self, id: &PrincipalId, apply: impl FnOnce(&mut UserRecord)) -> Result<(), AppError> {
        let mut users = self.write()?;
        let creds = users
            .get_mut(id)
            .ok_or_else(|| AppError::NotFound(format!("User {id}")))?;
        apply(&mut creds.record);
        Ok(())
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.read()?.get(id).map(|c| c.record.clone()))
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, DatabaseError> {
        Ok(self
            .read()?
            .values()
            .find(|c| c.record.username == username)
            .cloned())
    }
}
