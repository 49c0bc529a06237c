//! The coarse legacy permission table.
//!
//! The table is a generated view of the four seed roles, never a second
//! hand-maintained copy, so the legacy and granular models cannot drift.
//! Capability names arrive in the legacy `canManageUsers` spelling (plus a
//! couple of legacy-only aliases) or the granular snake_case spelling.

use crate::role::seeds;
use crate::{AccessLevel, EffectivePrivileges, EntityKind, PrivilegeKind, SecurityRole, SpecialPermission};
use hearth_core::LegacyRole;
use std::sync::OnceLock;

/// Resolves the effective privileges implied by a coarse legacy role.
///
/// This is the fallback used for users without an assigned security role.
pub fn legacy_effective(role: LegacyRole) -> &'static EffectivePrivileges {
    static TABLE: OnceLock<[EffectivePrivileges; 4]> = OnceLock::new();
    let table = TABLE.get_or_init(|| {
        [
            resolve_seed(&seeds::guest()),
            resolve_seed(&seeds::family_member()),
            resolve_seed(&seeds::family_administrator()),
            resolve_seed(&seeds::system_administrator()),
        ]
    });
    &table[match role {
        LegacyRole::Guest => 0,
        LegacyRole::FamilyMember => 1,
        LegacyRole::FamilyAdmin => 2,
        LegacyRole::SystemAdmin => 3,
    }]
}

/// Looks up a legacy capability for a coarse role.
///
/// Unknown capability names are simply `false`; this never fails.
#[must_use]
pub fn has_legacy_permission(role: LegacyRole, capability: &str) -> bool {
    let Some(permission) = parse_capability(capability) else {
        return false;
    };
    legacy_effective(role).has_special(permission)
}

/// Resolves a seed role in isolation (seeds are chain roots with fully
/// declared grids).
fn resolve_seed(role: &SecurityRole) -> EffectivePrivileges {
    let mut effective = EffectivePrivileges::none();
    for entity in EntityKind::ALL {
        for privilege in PrivilegeKind::ALL {
            let level = role.grid.get(entity, privilege).unwrap_or(AccessLevel::None);
            effective.grid.set(entity, privilege, level);
        }
    }
    for permission in SpecialPermission::ALL {
        effective
            .specials
            .set(permission, role.specials.get(permission).unwrap_or(false));
    }
    effective
}

/// Maps a legacy capability name onto the granular vocabulary.
///
/// `canAccessDashboard` and `canViewReports` are the only legacy-only names;
/// everything else is the `can`-prefixed spelling of a granular capability.
fn parse_capability(name: &str) -> Option<SpecialPermission> {
    match name {
        "canManageUsers" => Some(SpecialPermission::ManageUsers),
        "canManageFamily" => Some(SpecialPermission::ManageFamily),
        "canAccessAdminPanel" | "canAccessDashboard" => Some(SpecialPermission::AccessAdminPanel),
        "canApproveContent" => Some(SpecialPermission::ApproveContent),
        "canManageSettings" => Some(SpecialPermission::ManageSettings),
        "canViewAuditLogs" | "canViewReports" => Some(SpecialPermission::ViewAuditLogs),
        "canExportAllData" => Some(SpecialPermission::ExportAllData),
        "canImportData" => Some(SpecialPermission::ImportData),
        "canManageRoles" => Some(SpecialPermission::ManageRoles),
        "canSendNotifications" => Some(SpecialPermission::SendNotifications),
        "canManageBilling" => Some(SpecialPermission::ManageBilling),
        other => SpecialPermission::from_name(other),
    }
}
