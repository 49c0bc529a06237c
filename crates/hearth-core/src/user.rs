//! User types and the coarse legacy role.

use crate::{FamilyId, RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user in the system.
///
/// Only the authorization-relevant fields are modeled here; profile data
/// (avatars, biography, genealogy links) lives with the content subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: UserId,

    /// The single family this user belongs to, if any.
    pub family_id: Option<FamilyId>,

    /// Username (unique within the platform).
    pub username: String,

    /// Email address.
    pub email: String,

    /// Display name.
    pub display_name: Option<String>,

    /// User status.
    pub status: UserStatus,

    /// Coarse legacy role, always present.
    pub role: LegacyRole,

    /// Fine-grained security role, if one has been assigned.
    pub security_role_id: Option<RoleId>,

    /// Per-user permission overrides, applied on top of the resolved role.
    pub custom_permissions: Vec<CustomPermission>,

    /// Last login time.
    pub last_login: Option<DateTime<Utc>>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Creates a new user builder.
    #[must_use]
    pub fn builder() -> UserBuilder {
        UserBuilder::default()
    }

    /// Returns true if the user is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, UserStatus::Active)
    }

    /// Returns true if the user holds the coarse system-administrator role.
    #[must_use]
    pub const fn is_system_admin(&self) -> bool {
        matches!(self.role, LegacyRole::SystemAdmin)
    }

    /// Returns the display name or username.
    #[must_use]
    pub fn display_name_or_username(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Builder for users.
#[derive(Debug, Default)]
pub struct UserBuilder {
    family_id: Option<FamilyId>,
    username: Option<String>,
    email: Option<String>,
    display_name: Option<String>,
    role: Option<LegacyRole>,
    security_role_id: Option<RoleId>,
    custom_permissions: Vec<CustomPermission>,
}

impl UserBuilder {
    /// Sets the family.
    #[must_use]
    pub fn family_id(mut self, family_id: FamilyId) -> Self {
        self.family_id = Some(family_id);
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Sets the email.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Sets the coarse legacy role.
    #[must_use]
    pub fn role(mut self, role: LegacyRole) -> Self {
        self.role = Some(role);
        self
    }

    /// Assigns a fine-grained security role.
    #[must_use]
    pub fn security_role(mut self, role_id: RoleId) -> Self {
        self.security_role_id = Some(role_id);
        self
    }

    /// Adds a custom permission override.
    #[must_use]
    pub fn custom_permission(mut self, permission: CustomPermission) -> Self {
        self.custom_permissions.push(permission);
        self
    }

    /// Builds the user.
    ///
    /// # Panics
    /// Panics if `username` or `email` has not been set.
    #[must_use]
    pub fn build(self) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            family_id: self.family_id,
            username: self.username.expect("username is required"),
            email: self.email.expect("email is required"),
            display_name: self.display_name,
            status: UserStatus::Active,
            role: self.role.unwrap_or_default(),
            security_role_id: self.security_role_id,
            custom_permissions: self.custom_permissions,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// User status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// User is active.
    Active,
    /// User is inactive/disabled.
    Inactive,
    /// User is pending activation.
    Pending,
    /// User is locked out.
    Locked,
}

impl Default for UserStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// The original coarse four-valued role, retained for backward compatibility.
///
/// Users without an assigned security role are authorized from this role
/// alone via the legacy permission table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LegacyRole {
    /// Unauthenticated or unaffiliated visitor.
    Guest,
    /// Regular member of a family.
    FamilyMember,
    /// Administrator of a single family.
    FamilyAdmin,
    /// Platform-wide administrator.
    SystemAdmin,
}

impl LegacyRole {
    /// All legacy roles.
    pub const ALL: [Self; 4] = [
        Self::Guest,
        Self::FamilyMember,
        Self::FamilyAdmin,
        Self::SystemAdmin,
    ];

    /// Returns the role name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Guest => "guest",
            Self::FamilyMember => "family_member",
            Self::FamilyAdmin => "family_admin",
            Self::SystemAdmin => "system_admin",
        }
    }
}

impl Default for LegacyRole {
    fn default() -> Self {
        Self::Guest
    }
}

impl std::fmt::Display for LegacyRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A per-user permission override.
///
/// Keys name either a special capability (`special:<capability>`) or a single
/// privilege-grid cell (`entity:<entity_kind>:<privilege>`). Overrides are
/// applied after role resolution and are final.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomPermission {
    /// The permission key.
    pub permission: String,
    /// Whether the permission is granted or revoked.
    pub granted: bool,
}

impl CustomPermission {
    /// Creates a grant override.
    #[must_use]
    pub fn grant(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            granted: true,
        }
    }

    /// Creates a revoke override.
    #[must_use]
    pub fn deny(permission: impl Into<String>) -> Self {
        Self {
            permission: permission.into(),
            granted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_builder() {
        let family_id = FamilyId::new();
        let user = User::builder()
            .family_id(family_id)
            .username("mwright")
            .email("m.wright@example.com")
            .role(LegacyRole::FamilyMember)
            .build();

        assert_eq!(user.username, "mwright");
        assert_eq!(user.family_id, Some(family_id));
        assert!(user.is_active());
        assert!(!user.is_system_admin());
        assert!(user.security_role_id.is_none());
    }

    #[test]
    fn test_legacy_role_round_trip() {
        for role in LegacyRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            let back: LegacyRole = serde_json::from_str(&json).unwrap();
            assert_eq!(role, back);
        }
        assert_eq!(
            serde_json::to_string(&LegacyRole::FamilyAdmin).unwrap(),
            "\"family_admin\""
        );
    }

    #[test]
    fn test_custom_permission_constructors() {
        let grant = CustomPermission::grant("special:manage_users");
        assert!(grant.granted);
        let deny = CustomPermission::deny("entity:news:write");
        assert!(!deny.granted);
    }
}
