//! MySQL-backed user store.
//!
//! Expects a `users` table with columns `id`, `first_name`, `last_name`,
//! `username`, `status`, `hashed_password` and nullable boolean role columns
//! `is_teacher`, `is_student`, `is_admin`, `is_parent`.

use async_trait::async_trait;
use auth::{PrincipalId, UserCredentials, UserRecord, UserStore, DEFAULT_STORE_TIMEOUT};
use error::DatabaseError;

use crate::pool::{health_check, DbPool};

const SELECT_USER: &str = "SELECT id, first_name, last_name, username, status, hashed_password, \
     is_teacher, is_student, is_admin, is_parent FROM users";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    first_name: String,
    last_name: String,
    username: String,
    status: String,
    hashed_password: String,
    is_teacher: Option<bool>,
    is_student: Option<bool>,
    is_admin: Option<bool>,
    is_parent: Option<bool>,
}

impl UserRow {
    fn into_credentials(self) -> Result<UserCredentials, DatabaseError> {
        let record = UserRecord {
            id: PrincipalId::new(self.id),
            first_name: self.first_name,
            last_name: self.last_name,
            username: self.username,
            status: self.status.parse()?,
            is_teacher: self.is_teacher,
            is_student: self.is_student,
            is_admin: self.is_admin,
            is_parent: self.is_parent,
        };
        Ok(UserCredentials {
            record,
            hashed_password: self.hashed_password,
        })
    }
}

/// User store reading from MySQL.
#[derive(Debug, Clone)]
pub struct MySqlUserStore {
    pool: DbPool,
}

impl MySqlUserStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_by(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<UserCredentials>, DatabaseError> {
        let sql = format!("{SELECT_USER} WHERE {column} = ? LIMIT 1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("User query by {} failed: {}", column, e);
                DatabaseError::QueryFailed(e.to_string())
            })?
            .map(UserRow::into_credentials)
            .transpose()
    }
}

#[async_trait]
impl UserStore for MySqlUserStore {
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.fetch_one_by("id", id.as_str()).await?.map(|c| c.record))
    }

    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, DatabaseError> {
        self.fetch_one_by("username", username).await
    }

    async fn ping(&self) -> Result<(), DatabaseError> {
        health_check(&self.pool, DEFAULT_STORE_TIMEOUT).await
    }
}
