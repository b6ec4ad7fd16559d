//! Access decisions.
//!
//! Pure policy checks: no IO, no shared state, safe to call from any number of
//! requests concurrently.

use error::AccessDenied;

use crate::claims::{Role, RoleFlags};
use crate::principal::Principal;

/// Roles that may perform an operation. Any one of them grants access and
/// admins are always allowed. The empty policy admits admins only, unless it
/// was built with [`AccessPolicy::authenticated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccessPolicy {
    required: RoleFlags,
    any_principal: bool,
}

impl AccessPolicy {
    /// Policy satisfied by any of `roles`.
    pub const fn any_of(roles: &[Role]) -> Self {
        Self {
            required: RoleFlags::of(roles),
            any_principal: false,
        }
    }

    /// Policy satisfied by admins only.
    pub const fn admin_only() -> Self {
        Self {
            required: RoleFlags::empty(),
            any_principal: false,
        }
    }

    /// Policy satisfied by every resolved principal, whatever its roles.
    pub const fn authenticated() -> Self {
        Self {
            required: RoleFlags::empty(),
            any_principal: true,
        }
    }

    pub fn required(&self) -> RoleFlags {
        self.required
    }

    pub fn admits_any_principal(&self) -> bool {
        self.any_principal
    }
}

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(AccessDenied),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> Result<(), AccessDenied> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(reason),
        }
    }
}

/// Decide whether `principal` may act under `policy`.
pub fn authorize(principal: Option<&Principal>, policy: &AccessPolicy) -> Decision {
    let Some(principal) = principal else {
        return Decision::Deny(AccessDenied::Unauthenticated);
    };

    if policy.any_principal
        || principal.is_admin()
        || principal.roles.intersects(policy.required)
    {
        Decision::Allow
    } else {
        Decision::Deny(AccessDenied::Forbidden)
    }
}
