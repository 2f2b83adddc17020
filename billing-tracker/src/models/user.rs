use super::{Access, Permissions, Role};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// An account. The password hash never leaves the store layer; responses
/// use `UserResponse`.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: String,
    /// Trimmed and lower-cased; unique across users.
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub role: Role,
    pub permissions: Permissions,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New account with no grants.
    pub fn new(email: &str, full_name: String, password_hash: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            full_name,
            password_hash,
            role,
            permissions: Permissions::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply an administrator's grant change and bump `updated_at`.
    pub fn apply(&mut self, update: AccessUpdate) {
        if let Some(role) = update.role {
            self.role = role;
        }
        if let Some(services) = update.services {
            self.permissions.services = services
                .into_iter()
                .map(|(service, access)| (service.trim().to_lowercase(), access))
                .collect();
        }
        if let Some(kanban) = update.kanban {
            self.permissions.kanban = kanban;
        }
        self.updated_at = Utc::now();
    }
}

/// Partial change to a user's role and grants. Service grants are replaced
/// wholesale when present.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessUpdate {
    pub role: Option<Role>,
    pub services: Option<BTreeMap<String, Access>>,
    pub kanban: Option<Access>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
