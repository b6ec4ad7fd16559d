//! Resolved principals and the user store contract.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use error::DatabaseError;
use serde::{Deserialize, Serialize};

use crate::claims::{PrincipalId, Role, RoleFlags};

/// Account status of a user.
///
/// Informational only: access decisions do not look at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Active,
    Inactive,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Inactive => "inactive",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = DatabaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "inactive" => Ok(Status::Inactive),
            other => Err(DatabaseError::QueryFailed(format!("unknown user status '{other}'"))),
        }
    }
}

/// A user row as the store returns it. Role columns are nullable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: PrincipalId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub status: Status,
    pub is_teacher: Option<bool>,
    pub is_student: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_parent: Option<bool>,
}

impl UserRecord {
    pub fn roles(&self) -> RoleFlags {
        RoleFlags::from_flags(self.is_teacher, self.is_student, self.is_admin, self.is_parent)
    }
}

/// A user row together with its password hash, used only by login.
#[derive(Clone)]
pub struct UserCredentials {
    pub record: UserRecord,
    pub hashed_password: String,
}

impl fmt::Debug for UserCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserCredentials")
            .field("record", &self.record)
            .field("hashed_password", &"<redacted>")
            .finish()
    }
}

/// Durable user storage, owned and synchronized by the implementation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up the live record for a user id.
    async fn find_by_id(&self, id: &PrincipalId) -> Result<Option<UserRecord>, DatabaseError>;

    /// Look up a user and its password hash by username.
    async fn find_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, DatabaseError>;

    /// Check that the backing storage answers. Stores without a remote
    /// backend are always reachable.
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

/// The resolved identity of the current caller. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub first_name: String,
    pub last_name: String,
    pub status: Status,
    pub roles: RoleFlags,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(Role::Admin)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(role)
    }

    pub fn is_active(&self) -> bool {
        self.status == Status::Active
    }
}

impl From<UserRecord> for Principal {
    fn from(record: UserRecord) -> Self {
        let roles = record.roles();
        Self {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            status: record.status,
            roles,
        }
    }
}
