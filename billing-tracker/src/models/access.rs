//! Roles, capability grants and access token claims.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Manager,
    Admin,
}

/// Read/write grant for one resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Access {
    #[serde(default)]
    pub can_read: bool,
    #[serde(default)]
    pub can_write: bool,
}

impl Access {
    pub const FULL: Access = Access {
        can_read: true,
        can_write: true,
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    /// Keyed by lower-cased service name.
    #[serde(default)]
    pub services: BTreeMap<String, Access>,
    #[serde(default)]
    pub kanban: Access,
}

/// Something a request can read or write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    Service(String),
    Kanban,
    Checklist,
    Administration,
}

impl Resource {
    pub fn service(name: &str) -> Self {
        Resource::Service(name.trim().to_lowercase())
    }
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Service(name) => write!(f, "service '{}'", name),
            Resource::Kanban => f.write_str("kanban board"),
            Resource::Checklist => f.write_str("checklist"),
            Resource::Administration => f.write_str("administration"),
        }
    }
}

/// Claims for HS256 access tokens. Role and grants are looked up from the
/// user record on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Permissions {
    /// Grant held for `resource` by a holder of `role`. Admins hold everything;
    /// checklist is open to every authenticated user; administration is admin-only.
    pub fn access(&self, role: Role, resource: &Resource) -> Access {
        if role == Role::Admin {
            return Access::FULL;
        }
        match resource {
            Resource::Service(name) => self.services.get(name).copied().unwrap_or_default(),
            Resource::Kanban => self.kanban,
            Resource::Checklist => Access::FULL,
            Resource::Administration => Access::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aws_reader() -> Permissions {
        let mut permissions = Permissions::default();
        permissions.services.insert(
            "aws".to_string(),
            Access {
                can_read: true,
                can_write: false,
            },
        );
        permissions
    }

    #[test]
    fn admin_holds_every_grant() {
        let permissions = Permissions::default();
        assert_eq!(
            permissions.access(Role::Admin, &Resource::service("gcp")),
            Access::FULL
        );
        assert_eq!(
            permissions.access(Role::Admin, &Resource::Administration),
            Access::FULL
        );
    }

    #[test]
    fn users_get_per_service_grants() {
        let permissions = aws_reader();
        let aws = permissions.access(Role::User, &Resource::service("AWS"));
        assert!(aws.can_read);
        assert!(!aws.can_write);
        assert_eq!(
            permissions.access(Role::User, &Resource::service("gcp")),
            Access::default()
        );
        assert_eq!(permissions.access(Role::User, &Resource::Kanban), Access::default());
        assert_eq!(permissions.access(Role::User, &Resource::Checklist), Access::FULL);
        assert_eq!(
            permissions.access(Role::User, &Resource::Administration),
            Access::default()
        );
    }

    #[test]
    fn managers_are_not_administrators() {
        assert!(!aws_reader()
            .access(Role::Manager, &Resource::Administration)
            .can_read);
    }

    #[test]
    fn permissions_use_camel_case_grants() {
        let parsed: Permissions = serde_json::from_str(
            r#"{"services":{"aws":{"canRead":true}},"kanban":{"canRead":true,"canWrite":true}}"#,
        )
        .unwrap();
        assert!(parsed.services["aws"].can_read);
        assert!(!parsed.services["aws"].can_write);
        assert_eq!(parsed.kanban, Access::FULL);
    }
}
