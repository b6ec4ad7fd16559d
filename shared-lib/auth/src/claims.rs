//! Token claims, role flags and principal identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single role a user may hold.
///
/// Roles are independent capability markers, a user can be a teacher and a
/// parent at the same time. Collections of roles are held in [`RoleFlags`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Teacher,
    Student,
    Admin,
    Parent,
}

impl Role {
    /// Every role, in declaration order.
    pub const ALL: [Role; 4] = [Role::Teacher, Role::Student, Role::Admin, Role::Parent];

    const fn bit(self) -> u8 {
        match self {
            Role::Teacher => 1 << 0,
            Role::Student => 1 << 1,
            Role::Admin => 1 << 2,
            Role::Parent => 1 << 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Teacher => "teacher",
            Role::Student => "student",
            Role::Admin => "admin",
            Role::Parent => "parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of role flags, stored as a bitmask.
///
/// Serialized as a list of role names, e.g. `["teacher", "parent"]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<Role>", into = "Vec<Role>")]
pub struct RoleFlags(u8);

impl RoleFlags {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set from a slice of roles. Usable in `const` context.
    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        Self(bits)
    }

    /// Build a set from nullable boolean columns; `None` counts as not granted.
    pub fn from_flags(
        is_teacher: Option<bool>,
        is_student: Option<bool>,
        is_admin: Option<bool>,
        is_parent: Option<bool>,
    ) -> Self {
        [
            (Role::Teacher, is_teacher),
            (Role::Student, is_student),
            (Role::Admin, is_admin),
            (Role::Parent, is_parent),
        ]
        .into_iter()
        .filter(|(_, flag)| flag.unwrap_or(false))
        .map(|(role, _)| role)
        .collect()
    }

    pub fn contains(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    pub fn remove(&mut self, role: Role) {
        self.0 &= !role.bit();
    }

    /// Whether the two sets share at least one role.
    pub fn intersects(&self, other: RoleFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Role> {
        let flags = *self;
        Role::ALL.into_iter().filter(move |role| flags.contains(*role))
    }
}

impl FromIterator<Role> for RoleFlags {
    fn from_iter<I: IntoIterator<Item = Role>>(iter: I) -> Self {
        let mut flags = Self::empty();
        for role in iter {
            flags.insert(role);
        }
        flags
    }
}

impl From<Vec<Role>> for RoleFlags {
    fn from(roles: Vec<Role>) -> Self {
        roles.into_iter().collect()
    }
}

impl From<RoleFlags> for Vec<Role> {
    fn from(flags: RoleFlags) -> Self {
        flags.iter().collect()
    }
}

impl fmt::Display for RoleFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|r| r.as_str()).collect();
        write!(f, "{{{}}}", names.join(", "))
    }
}

/// Opaque, immutable identifier of a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(String);

impl PrincipalId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PrincipalId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for PrincipalId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// JWT claims structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: PrincipalId,
    /// Role flags at the time of issuance
    pub roles: RoleFlags,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// Create new claims for a user, issued at `issued_at`.
    pub fn new(
        sub: PrincipalId,
        roles: RoleFlags,
        issuer: impl Into<String>,
        issued_at: DateTime<Utc>,
        expires_in_secs: i64,
    ) -> Self {
        let iat = issued_at.timestamp();
        Self {
            sub,
            roles,
            exp: iat.saturating_add(expires_in_secs),
            iat,
            iss: issuer.into(),
        }
    }

    /// Whether the claims are expired at `now`. Expiry is exclusive: a token is
    /// already expired at the exact second of `exp`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }

    /// Expiry as a timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_role_flags_set_operations() {
        let mut flags = RoleFlags::of(&[Role::Teacher, Role::Parent]);
        assert!(flags.contains(Role::Teacher));
        assert!(flags.contains(Role::Parent));
        assert!(!flags.contains(Role::Admin));

        flags.remove(Role::Teacher);
        assert!(!flags.contains(Role::Teacher));
        assert!(flags.intersects(RoleFlags::of(&[Role::Parent, Role::Student])));
        assert!(!flags.intersects(RoleFlags::of(&[Role::Student])));
        assert!(!flags.intersects(RoleFlags::empty()));
    }

    #[test]
    fn test_role_flags_from_nullable_columns() {
        let flags = RoleFlags::from_flags(Some(true), None, Some(false), Some(true));
        assert_eq!(flags, RoleFlags::of(&[Role::Teacher, Role::Parent]));
        assert!(RoleFlags::from_flags(None, None, None, None).is_empty());
    }

    #[test]
    fn test_role_flags_serialize_as_names() {
        let flags = RoleFlags::of(&[Role::Parent, Role::Teacher]);
        let json = serde_json::to_string(&flags).unwrap();
        assert_eq!(json, r#"["teacher","parent"]"#);

        let back: RoleFlags = serde_json::from_str(r#"["parent","teacher","parent"]"#).unwrap();
        assert_eq!(back, flags);
        assert_eq!(flags.to_string(), "{teacher, parent}");
    }

    #[test]
    fn test_claims_expiry_is_exclusive() {
        let claims = Claims::new(
            PrincipalId::new("u1"),
            RoleFlags::of(&[Role::Teacher]),
            "test-issuer",
            at(0),
            1800,
        );
        assert_eq!(claims.iat, 0);
        assert_eq!(claims.exp, 1800);
        assert!(!claims.is_expired_at(at(1799)));
        assert!(claims.is_expired_at(at(1800)));
        assert_eq!(claims.expires_at(), Some(at(1800)));
    }

    #[test]
    fn test_huge_lifetime_saturates_instead_of_overflowing() {
        let claims = Claims::new(
            PrincipalId::new("u1"),
            RoleFlags::empty(),
            "test-issuer",
            at(1_000),
            i64::MAX,
        );
        assert_eq!(claims.exp, i64::MAX);
        assert!(!claims.is_expired_at(at(1_000)));
    }
}
