use std::fmt;

use lms_core::model::UserId;

use crate::error::CatalogError;

/// Capability level of an authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    /// Case-insensitive: `"admin"` in any casing is `Admin`, anything else is `User`.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::User
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An identity that has already been validated at the trust boundary.
///
/// Services accept a `Principal` instead of raw user id / role strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    user_id: UserId,
    role: Role,
}

impl Principal {
    #[must_use]
    pub fn new(user_id: UserId, role: Role) -> Self {
        Self { user_id, role }
    }

    /// Builds a principal from claims handed over by an identity provider.
    ///
    /// Returns `None` when the user id is blank.
    #[must_use]
    pub fn from_claims(user_id: &str, role: Option<&str>) -> Option<Self> {
        let user_id: UserId = user_id.parse().ok()?;
        Some(Self::new(user_id, role.map(Role::normalize).unwrap_or_default()))
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Source of the current caller's identity.
pub trait IdentityProvider: Send + Sync {
    fn current(&self) -> Option<Principal>;
}

/// Identity fixed at construction time (CLI operator, tests).
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity {
    principal: Option<Principal>,
}

impl StaticIdentity {
    #[must_use]
    pub fn new(principal: Option<Principal>) -> Self {
        Self { principal }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl IdentityProvider for StaticIdentity {
    fn current(&self) -> Option<Principal> {
        self.principal.clone()
    }
}

/// Admin capability check for catalog writes.
///
/// # Errors
///
/// Returns `CatalogError::Unauthorized` without a principal and
/// `CatalogError::Forbidden` for non-admin principals.
pub fn require_admin(principal: Option<&Principal>) -> Result<&Principal, CatalogError> {
    match principal {
        None => Err(CatalogError::Unauthorized),
        Some(p) if !p.is_admin() => Err(CatalogError::Forbidden),
        Some(p) => Ok(p),
    }
}
