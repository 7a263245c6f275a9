use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;

// --- Identity & Role ---

/// Identity
///
/// Opaque reference to the principal behind the current session. In production this is
/// the Supabase `auth.users.id` (the JWT `sub` claim); the gate never interprets it beyond
/// handing it to the authorization store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Identity {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Role
///
/// The closed set of roles stored in `public.profiles.role`. Only `Admin` opens the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Standard,
    Admin,
}

impl Role {
    /// Parses the stored role string. Matching is exact: anything outside the closed set
    /// (including case variants such as "Admin") is unrecognized.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "standard" => Some(Role::Standard),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// AuthorizationRecord
///
/// The single backend row the gate reads. `role` is optional because the backend has no
/// enforced schema for it; a missing or unrecognized value is treated as non-admin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AuthorizationRecord {
    #[serde(default)]
    pub role: Option<String>,
}

impl AuthorizationRecord {
    pub fn with_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
        }
    }

    pub fn role(&self) -> Option<Role> {
        self.role.as_deref().and_then(Role::parse)
    }

    pub fn grants_admin(&self) -> bool {
        self.role() == Some(Role::Admin)
    }
}

// --- Gate State ---

/// GateState
///
/// Tri-state outcome of an admin access check. There is deliberately no error variant:
/// every failure folds into `Denied`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum GateState {
    #[default]
    Pending,
    Denied,
    Granted,
}

impl GateState {
    pub fn is_granted(self) -> bool {
        matches!(self, GateState::Granted)
    }
}

// --- Response Schemas (Output) ---

/// AdminAccessResponse
///
/// Output schema for GET /access/admin. The front-end renders the "Admin Access" control
/// only when `admin_route` is present, which happens exclusively on `Granted`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminAccessResponse {
    pub state: GateState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_route: Option<String>,
    #[ts(type = "string")]
    pub checked_at: DateTime<Utc>,
}

/// AdminHome
///
/// Output schema for the privileged route, only reachable after the gate grants access.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminHome {
    pub identity: Identity,
    pub role: Role,
}
