/**
 * Identity and Roles
 *
 * A resolved identity is what the identity verifier hands back for a valid
 * bearer credential. It is attached to a connection exactly once and never
 * changes afterwards.
 */
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of an authenticated user
///
/// The three staff roles drive group membership, topic entitlements and the
/// metrics projection. Any other role string coming from the auth provider is
/// preserved verbatim in `Other` and gets the least-privileged treatment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    /// Full access, sees the complete snapshot
    Admin,
    /// Shop owner
    Owner,
    /// Repair technician / counter staff
    Worker,
    /// Any other role name issued by the auth provider
    Other(String),
}

impl Role {
    /// Role name as it appears in group keys and on the wire
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Owner => "owner",
            Self::Worker => "worker",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Admins and owners receive presence and active-user telemetry
    pub fn is_privileged(&self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }

    /// Roles that work the shop floor
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Admin | Self::Owner | Self::Worker)
    }
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Self::Admin,
            "owner" => Self::Owner,
            "worker" => Self::Worker,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(name) => name,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity resolved from a bearer credential
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable user id issued by the auth provider
    pub user_id: String,
    /// Display name
    pub username: String,
    /// Role used for grouping and projections
    pub role: Role,
    /// Tenant ("shop") the user belongs to, when multi-shop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl Identity {
    /// Create an identity without a tenant
    pub fn new(user_id: impl Into<String>, username: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            role,
            tenant_id: None,
        }
    }

    /// Attach a tenant id
    pub fn with_tenant(mut self, tenant_id: impl Into<String>) -> Self {
        self.tenant_id = Some(tenant_id.into());
        self
    }
}
