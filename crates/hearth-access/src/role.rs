//! Security role definitions and the platform seed roles.

use crate::{AccessLevel, EntityKind, PrivilegeKind, RoleGrid, SpecialGrants, SpecialPermission};
use chrono::{DateTime, Utc};
use hearth_core::{FamilyId, RoleId};
use serde::{Deserialize, Serialize};

/// Where a role is usable.
///
/// System and family scope are mutually exclusive by construction; a role
/// carrying both is not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleScope {
    /// Usable by any family; seeded at platform initialization.
    System,
    /// Bound to exactly one family.
    Family(FamilyId),
}

impl RoleScope {
    /// Returns true for system scope.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        matches!(self, Self::System)
    }

    /// Returns the owning family for family-scoped roles.
    #[must_use]
    pub const fn family_id(&self) -> Option<FamilyId> {
        match self {
            Self::System => None,
            Self::Family(id) => Some(*id),
        }
    }
}

/// A named bundle of privilege declarations and special permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityRole {
    /// Unique role identifier.
    pub id: RoleId,

    /// Role name (unique within its scope).
    pub name: String,

    /// Description.
    pub description: Option<String>,

    /// Scope: system-wide or bound to one family.
    pub scope: RoleScope,

    /// Whether this role is auto-assigned to new members of its family.
    /// At most one default role exists per family.
    pub is_default: bool,

    /// The declared privilege grid.
    pub grid: RoleGrid,

    /// The declared special permissions.
    pub specials: SpecialGrants,

    /// Parent role for inheritance, if any.
    pub parent_id: Option<RoleId>,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SecurityRole {
    /// Creates a new role builder.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> RoleBuilder {
        RoleBuilder::new(name)
    }

    /// Returns true for system roles.
    #[must_use]
    pub const fn is_system(&self) -> bool {
        self.scope.is_system()
    }

    /// Returns the owning family for family-scoped roles.
    #[must_use]
    pub const fn family_id(&self) -> Option<FamilyId> {
        self.scope.family_id()
    }

    /// Returns true if a member of `family` may hold this role.
    ///
    /// System roles are usable by anyone; family roles only by members of
    /// their own family.
    #[must_use]
    pub fn usable_by_family(&self, family: Option<FamilyId>) -> bool {
        match self.scope {
            RoleScope::System => true,
            RoleScope::Family(id) => family == Some(id),
        }
    }
}

/// Builder for security roles.
#[derive(Debug)]
pub struct RoleBuilder {
    name: String,
    description: Option<String>,
    scope: RoleScope,
    is_default: bool,
    grid: RoleGrid,
    specials: SpecialGrants,
    parent_id: Option<RoleId>,
}

impl RoleBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            scope: RoleScope::System,
            is_default: false,
            grid: RoleGrid::new(),
            specials: SpecialGrants::new(),
            parent_id: None,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Scopes the role to one family.
    #[must_use]
    pub fn family(mut self, family_id: FamilyId) -> Self {
        self.scope = RoleScope::Family(family_id);
        self
    }

    /// Marks the role as its family's default.
    #[must_use]
    pub fn default_role(mut self) -> Self {
        self.is_default = true;
        self
    }

    /// Replaces the whole grid.
    #[must_use]
    pub fn grid(mut self, grid: RoleGrid) -> Self {
        self.grid = grid;
        self
    }

    /// Declares a single grid cell.
    #[must_use]
    pub fn grant(mut self, entity: EntityKind, privilege: PrivilegeKind, level: AccessLevel) -> Self {
        self.grid.set(entity, privilege, level);
        self
    }

    /// Replaces the special-permission declarations.
    #[must_use]
    pub fn specials(mut self, specials: SpecialGrants) -> Self {
        self.specials = specials;
        self
    }

    /// Declares a single special permission.
    #[must_use]
    pub fn special(mut self, permission: SpecialPermission, granted: bool) -> Self {
        self.specials.set(permission, granted);
        self
    }

    /// Sets the parent role.
    #[must_use]
    pub fn parent(mut self, parent_id: RoleId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Builds the role.
    #[must_use]
    pub fn build(self) -> SecurityRole {
        let now = Utc::now();
        SecurityRole {
            id: RoleId::new(),
            name: self.name,
            description: self.description,
            scope: self.scope,
            is_default: self.is_default,
            grid: self.grid,
            specials: self.specials,
            parent_id: self.parent_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// The four roles seeded at platform initialization.
///
/// Each maps 1:1 to a coarse legacy role; the legacy permission table is
/// generated from these, so the two cannot drift.
pub mod seeds {
    use super::{AccessLevel, EntityKind, PrivilegeKind, RoleGrid, SecurityRole, SpecialGrants, SpecialPermission};
    use hearth_core::LegacyRole;

    /// Name of the seeded system administrator role.
    pub const SYSTEM_ADMINISTRATOR: &str = "System Administrator";
    /// Name of the seeded family administrator role.
    pub const FAMILY_ADMINISTRATOR: &str = "Family Administrator";
    /// Name of the seeded family member role.
    pub const FAMILY_MEMBER: &str = "Family Member";
    /// Name of the seeded guest role.
    pub const GUEST: &str = "Guest";

    /// Entities whose records are family content: created by members,
    /// readable family-wide, editable by their owner.
    const CONTENT_ENTITIES: [EntityKind; 11] = [
        EntityKind::Event,
        EntityKind::News,
        EntityKind::Recipe,
        EntityKind::Tradition,
        EntityKind::Photo,
        EntityKind::Poll,
        EntityKind::Memorial,
        EntityKind::Submission,
        EntityKind::Document,
        EntityKind::Location,
        EntityKind::Activity,
    ];

    /// Full platform access.
    #[must_use]
    pub fn system_administrator() -> SecurityRole {
        SecurityRole::builder(SYSTEM_ADMINISTRATOR)
            .description("Full platform access")
            .grid(RoleGrid::uniform(AccessLevel::Global))
            .specials(SpecialGrants::all())
            .build()
    }

    /// Family-wide administration.
    #[must_use]
    pub fn family_administrator() -> SecurityRole {
        let mut grid = RoleGrid::uniform(AccessLevel::Family);
        // Audit logs are read-only even for family admins, and families are
        // dissolved through support rather than deleted by their admins.
        grid.set_row(EntityKind::AuditLog, AccessLevel::None);
        grid.set(EntityKind::AuditLog, PrivilegeKind::Read, AccessLevel::Family);
        grid.set(EntityKind::Family, PrivilegeKind::Delete, AccessLevel::None);

        let specials = SpecialGrants::new()
            .with(SpecialPermission::ManageUsers, true)
            .with(SpecialPermission::ManageFamily, true)
            .with(SpecialPermission::AccessAdminPanel, true)
            .with(SpecialPermission::ApproveContent, true)
            .with(SpecialPermission::ManageSettings, true)
            .with(SpecialPermission::ViewAuditLogs, true)
            .with(SpecialPermission::ExportAllData, false)
            .with(SpecialPermission::ImportData, true)
            .with(SpecialPermission::ManageRoles, true)
            .with(SpecialPermission::SendNotifications, true)
            .with(SpecialPermission::ManageBilling, false);

        SecurityRole::builder(FAMILY_ADMINISTRATOR)
            .description("Administration of a single family")
            .grid(grid)
            .specials(specials)
            .build()
    }

    /// Regular family membership: read the family, own your records.
    #[must_use]
    pub fn family_member() -> SecurityRole {
        let mut grid = RoleGrid::new();
        for entity in CONTENT_ENTITIES {
            grid.set(entity, PrivilegeKind::Create, AccessLevel::Family);
            grid.set(entity, PrivilegeKind::Read, AccessLevel::Family);
            grid.set(entity, PrivilegeKind::Write, AccessLevel::Own);
            grid.set(entity, PrivilegeKind::Delete, AccessLevel::Own);
            grid.set(entity, PrivilegeKind::Share, AccessLevel::Own);
            grid.set(entity, PrivilegeKind::Export, AccessLevel::Own);
        }
        grid.set(EntityKind::User, PrivilegeKind::Read, AccessLevel::Family);
        grid.set(EntityKind::User, PrivilegeKind::Write, AccessLevel::Own);
        grid.set(EntityKind::FamilyMember, PrivilegeKind::Read, AccessLevel::Family);
        grid.set(EntityKind::FamilyMember, PrivilegeKind::Write, AccessLevel::Own);
        grid.set(EntityKind::Family, PrivilegeKind::Read, AccessLevel::Family);
        grid.set(EntityKind::Service, PrivilegeKind::Read, AccessLevel::Family);
        grid.set(EntityKind::Approval, PrivilegeKind::Read, AccessLevel::Own);
        grid.set(EntityKind::Settings, PrivilegeKind::Read, AccessLevel::Own);
        grid.set(EntityKind::Settings, PrivilegeKind::Write, AccessLevel::Own);
        grid.normalize_root();

        SecurityRole::builder(FAMILY_MEMBER)
            .description("Regular member of a family")
            .grid(grid)
            .build()
    }

    /// No grants; public content is reachable through the read bypass only.
    #[must_use]
    pub fn guest() -> SecurityRole {
        SecurityRole::builder(GUEST)
            .description("Unaffiliated visitor")
            .grid(RoleGrid::uniform(AccessLevel::None))
            .build()
    }

    /// All four seed roles.
    #[must_use]
    pub fn all() -> [SecurityRole; 4] {
        [
            system_administrator(),
            family_administrator(),
            family_member(),
            guest(),
        ]
    }

    /// The seed role equivalent to a coarse legacy role.
    #[must_use]
    pub fn for_legacy_role(role: LegacyRole) -> SecurityRole {
        match role {
            LegacyRole::SystemAdmin => system_administrator(),
            LegacyRole::FamilyAdmin => family_administrator(),
            LegacyRole::FamilyMember => family_member(),
            LegacyRole::Guest => guest(),
        }
    }
}
