//! Privilege grids and special-permission sets.
//!
//! Grids come in two forms. A [`RoleGrid`] is what a role *declares*: each
//! cell is either an explicit [`AccessLevel`] (including explicit
//! `AccessLevel::None`, which lets a child role revoke an inherited grant) or
//! undeclared, deferring to the inheritance chain. A [`PrivilegeGrid`] is the
//! *resolved* view consumed by the decision engine: every cell holds a level,
//! so a missing cell is not representable.

use crate::{AccessLevel, EntityKind, PrivilegeKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

type DeclaredCells = [[Option<AccessLevel>; PrivilegeKind::COUNT]; EntityKind::COUNT];
type ResolvedCells = [[AccessLevel; PrivilegeKind::COUNT]; EntityKind::COUNT];

/// The privilege grid a role declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DeclaredGridRepr", into = "DeclaredGridRepr")]
pub struct RoleGrid(DeclaredCells);

impl RoleGrid {
    /// Creates a grid with every cell undeclared.
    #[must_use]
    pub fn new() -> Self {
        Self([[None; PrivilegeKind::COUNT]; EntityKind::COUNT])
    }

    /// Creates a grid declaring `level` in every cell.
    #[must_use]
    pub fn uniform(level: AccessLevel) -> Self {
        Self([[Some(level); PrivilegeKind::COUNT]; EntityKind::COUNT])
    }

    /// Returns the declared level for a cell, or `None` if undeclared.
    #[must_use]
    pub fn get(&self, entity: EntityKind, privilege: PrivilegeKind) -> Option<AccessLevel> {
        self.0[entity.index()][privilege.index()]
    }

    /// Declares a single cell.
    pub fn set(&mut self, entity: EntityKind, privilege: PrivilegeKind, level: AccessLevel) {
        self.0[entity.index()][privilege.index()] = Some(level);
    }

    /// Declares every privilege for one entity at the same level.
    pub fn set_row(&mut self, entity: EntityKind, level: AccessLevel) {
        self.0[entity.index()] = [Some(level); PrivilegeKind::COUNT];
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, entity: EntityKind, privilege: PrivilegeKind, level: AccessLevel) -> Self {
        self.set(entity, privilege, level);
        self
    }

    /// Builder-style [`set_row`](Self::set_row).
    #[must_use]
    pub fn with_row(mut self, entity: EntityKind, level: AccessLevel) -> Self {
        self.set_row(entity, level);
        self
    }

    /// Iterates over the declared cells.
    pub fn declared(&self) -> impl Iterator<Item = (EntityKind, PrivilegeKind, AccessLevel)> + '_ {
        EntityKind::ALL.into_iter().flat_map(move |entity| {
            PrivilegeKind::ALL.into_iter().filter_map(move |privilege| {
                self.get(entity, privilege)
                    .map(|level| (entity, privilege, level))
            })
        })
    }

    /// Returns true if every cell is declared.
    #[must_use]
    pub fn is_fully_declared(&self) -> bool {
        self.0.iter().all(|row| row.iter().all(Option::is_some))
    }

    /// Turns every undeclared cell into explicit `AccessLevel::None`.
    ///
    /// Applied to parentless roles at creation so every inheritance-chain
    /// root is fully explicit.
    pub fn normalize_root(&mut self) {
        for row in &mut self.0 {
            for cell in row {
                cell.get_or_insert(AccessLevel::None);
            }
        }
    }
}

impl Default for RoleGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Document shape for declared grids: only declared cells are present.
type DeclaredGridRepr = BTreeMap<EntityKind, BTreeMap<PrivilegeKind, AccessLevel>>;

impl From<DeclaredGridRepr> for RoleGrid {
    fn from(repr: DeclaredGridRepr) -> Self {
        let mut grid = Self::new();
        for (entity, row) in repr {
            for (privilege, level) in row {
                grid.set(entity, privilege, level);
            }
        }
        grid
    }
}

impl From<RoleGrid> for DeclaredGridRepr {
    fn from(grid: RoleGrid) -> Self {
        let mut repr = Self::new();
        for (entity, privilege, level) in grid.declared() {
            repr.entry(entity).or_default().insert(privilege, level);
        }
        repr
    }
}

/// The fully-resolved privilege grid for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ResolvedGridRepr", into = "ResolvedGridRepr")]
pub struct PrivilegeGrid(ResolvedCells);

impl PrivilegeGrid {
    /// Creates a grid granting nothing.
    #[must_use]
    pub fn none() -> Self {
        Self::uniform(AccessLevel::None)
    }

    /// Creates a grid granting `level` everywhere.
    #[must_use]
    pub fn uniform(level: AccessLevel) -> Self {
        Self([[level; PrivilegeKind::COUNT]; EntityKind::COUNT])
    }

    /// Returns the granted level for a cell.
    #[must_use]
    pub fn granted(&self, entity: EntityKind, privilege: PrivilegeKind) -> AccessLevel {
        self.0[entity.index()][privilege.index()]
    }

    /// Sets the granted level for a cell.
    pub fn set(&mut self, entity: EntityKind, privilege: PrivilegeKind, level: AccessLevel) {
        self.0[entity.index()][privilege.index()] = level;
    }
}

impl Default for PrivilegeGrid {
    fn default() -> Self {
        Self::none()
    }
}

/// Document shape for resolved grids: every cell present.
type ResolvedGridRepr = BTreeMap<EntityKind, BTreeMap<PrivilegeKind, AccessLevel>>;

impl From<ResolvedGridRepr> for PrivilegeGrid {
    fn from(repr: ResolvedGridRepr) -> Self {
        let mut grid = Self::none();
        for (entity, row) in repr {
            for (privilege, level) in row {
                grid.set(entity, privilege, level);
            }
        }
        grid
    }
}

impl From<PrivilegeGrid> for ResolvedGridRepr {
    fn from(grid: PrivilegeGrid) -> Self {
        let mut repr = Self::new();
        for entity in EntityKind::ALL {
            let row = repr.entry(entity).or_default();
            for privilege in PrivilegeKind::ALL {
                row.insert(privilege, grid.granted(entity, privilege));
            }
        }
        repr
    }
}

/// A named boolean capability not tied to an entity/privilege pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum SpecialPermission {
    /// Create, update, and disable user accounts.
    ManageUsers,
    /// Manage family settings and membership.
    ManageFamily,
    /// Access the administrative surface.
    AccessAdminPanel,
    /// Approve moderated content submissions.
    ApproveContent,
    /// Manage platform settings.
    ManageSettings,
    /// View audit logs.
    ViewAuditLogs,
    /// Export all data.
    ExportAllData,
    /// Import data.
    ImportData,
    /// Create, update, and delete security roles.
    ManageRoles,
    /// Send notifications to members.
    SendNotifications,
    /// Manage billing.
    ManageBilling,
}

impl SpecialPermission {
    /// Number of special permissions.
    pub const COUNT: usize = 11;

    /// All special permissions.
    pub const ALL: [Self; Self::COUNT] = [
        Self::ManageUsers,
        Self::ManageFamily,
        Self::AccessAdminPanel,
        Self::ApproveContent,
        Self::ManageSettings,
        Self::ViewAuditLogs,
        Self::ExportAllData,
        Self::ImportData,
        Self::ManageRoles,
        Self::SendNotifications,
        Self::ManageBilling,
    ];

    /// Returns this permission's index for set addressing.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the capability name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageFamily => "manage_family",
            Self::AccessAdminPanel => "access_admin_panel",
            Self::ApproveContent => "approve_content",
            Self::ManageSettings => "manage_settings",
            Self::ViewAuditLogs => "view_audit_logs",
            Self::ExportAllData => "export_all_data",
            Self::ImportData => "import_data",
            Self::ManageRoles => "manage_roles",
            Self::SendNotifications => "send_notifications",
            Self::ManageBilling => "manage_billing",
        }
    }

    /// Parses a capability name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|perm| perm.as_str() == name)
    }
}

impl fmt::Display for SpecialPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The special permissions a role declares.
///
/// Partial: a capability absent here defers to the inheritance chain. A
/// declared entry overrides ancestors wholesale, `false` included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SpecialGrantsRepr", into = "SpecialGrantsRepr")]
pub struct SpecialGrants([Option<bool>; SpecialPermission::COUNT]);

impl SpecialGrants {
    /// Creates a declaration with every capability deferred.
    #[must_use]
    pub fn new() -> Self {
        Self([None; SpecialPermission::COUNT])
    }

    /// Creates a declaration granting every capability.
    #[must_use]
    pub fn all() -> Self {
        Self([Some(true); SpecialPermission::COUNT])
    }

    /// Returns the declared value, or `None` if undeclared.
    #[must_use]
    pub fn get(&self, permission: SpecialPermission) -> Option<bool> {
        self.0[permission.index()]
    }

    /// Declares a capability.
    pub fn set(&mut self, permission: SpecialPermission, granted: bool) {
        self.0[permission.index()] = Some(granted);
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, permission: SpecialPermission, granted: bool) -> Self {
        self.set(permission, granted);
        self
    }

    /// Iterates over the declared capabilities.
    pub fn declared(&self) -> impl Iterator<Item = (SpecialPermission, bool)> + '_ {
        SpecialPermission::ALL
            .into_iter()
            .filter_map(move |perm| self.get(perm).map(|granted| (perm, granted)))
    }
}

impl Default for SpecialGrants {
    fn default() -> Self {
        Self::new()
    }
}

type SpecialGrantsRepr = BTreeMap<SpecialPermission, bool>;

impl From<SpecialGrantsRepr> for SpecialGrants {
    fn from(repr: SpecialGrantsRepr) -> Self {
        let mut grants = Self::new();
        for (perm, granted) in repr {
            grants.set(perm, granted);
        }
        grants
    }
}

impl From<SpecialGrants> for SpecialGrantsRepr {
    fn from(grants: SpecialGrants) -> Self {
        grants.declared().collect()
    }
}

/// The fully-resolved special-permission set for one caller.
///
/// Total: every capability has a value, defaulting to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SpecialSetRepr", into = "SpecialSetRepr")]
pub struct SpecialPermissionSet([bool; SpecialPermission::COUNT]);

impl SpecialPermissionSet {
    /// Creates a set granting nothing.
    #[must_use]
    pub fn none() -> Self {
        Self([false; SpecialPermission::COUNT])
    }

    /// Creates a set granting everything.
    #[must_use]
    pub fn all() -> Self {
        Self([true; SpecialPermission::COUNT])
    }

    /// Returns whether a capability is held.
    #[must_use]
    pub fn has(&self, permission: SpecialPermission) -> bool {
        self.0[permission.index()]
    }

    /// Sets a capability.
    pub fn set(&mut self, permission: SpecialPermission, granted: bool) {
        self.0[permission.index()] = granted;
    }
}

impl Default for SpecialPermissionSet {
    fn default() -> Self {
        Self::none()
    }
}

type SpecialSetRepr = BTreeMap<SpecialPermission, bool>;

impl From<SpecialSetRepr> for SpecialPermissionSet {
    fn from(repr: SpecialSetRepr) -> Self {
        let mut set = Self::none();
        for (perm, granted) in repr {
            set.set(perm, granted);
        }
        set
    }
}

impl From<SpecialPermissionSet> for SpecialSetRepr {
    fn from(set: SpecialPermissionSet) -> Self {
        SpecialPermission::ALL
            .into_iter()
            .map(|perm| (perm, set.has(perm)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_grid_distinguishes_declared_none() {
        let mut grid = RoleGrid::new();
        assert_eq!(grid.get(EntityKind::News, PrivilegeKind::Read), None);

        grid.set(EntityKind::News, PrivilegeKind::Read, AccessLevel::None);
        assert_eq!(
            grid.get(EntityKind::News, PrivilegeKind::Read),
            Some(AccessLevel::None)
        );
    }

    #[test]
    fn test_normalize_root_keeps_declared_cells() {
        let mut grid = RoleGrid::new().with(EntityKind::Photo, PrivilegeKind::Read, AccessLevel::Family);
        grid.normalize_root();

        assert!(grid.is_fully_declared());
        assert_eq!(
            grid.get(EntityKind::Photo, PrivilegeKind::Read),
            Some(AccessLevel::Family)
        );
        assert_eq!(
            grid.get(EntityKind::Photo, PrivilegeKind::Write),
            Some(AccessLevel::None)
        );
    }

    #[test]
    fn test_role_grid_serde_round_trip() {
        let grid = RoleGrid::new()
            .with(EntityKind::News, PrivilegeKind::Read, AccessLevel::Family)
            .with(EntityKind::News, PrivilegeKind::Write, AccessLevel::Own)
            .with(EntityKind::AuditLog, PrivilegeKind::Read, AccessLevel::None);

        let json = serde_json::to_string(&grid).unwrap();
        let back: RoleGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(grid, back);

        // Undeclared cells stay out of the document.
        assert!(!json.contains("photo"));
    }

    #[test]
    fn test_privilege_grid_defaults_to_none() {
        let grid = PrivilegeGrid::none();
        for entity in EntityKind::ALL {
            for privilege in PrivilegeKind::ALL {
                assert_eq!(grid.granted(entity, privilege), AccessLevel::None);
            }
        }
    }

    #[test]
    fn test_special_grants_partiality() {
        let grants = SpecialGrants::new()
            .with(SpecialPermission::ManageUsers, true)
            .with(SpecialPermission::ManageBilling, false);

        assert_eq!(grants.get(SpecialPermission::ManageUsers), Some(true));
        assert_eq!(grants.get(SpecialPermission::ManageBilling), Some(false));
        assert_eq!(grants.get(SpecialPermission::ApproveContent), None);
        assert_eq!(grants.declared().count(), 2);
    }

    #[test]
    fn test_special_set_serde_round_trip() {
        let mut set = SpecialPermissionSet::none();
        set.set(SpecialPermission::ApproveContent, true);

        let json = serde_json::to_string(&set).unwrap();
        let back: SpecialPermissionSet = serde_json::from_str(&json).unwrap();
        assert_eq!(set, back);
        assert!(back.has(SpecialPermission::ApproveContent));
        assert!(!back.has(SpecialPermission::ManageUsers));
    }
}
