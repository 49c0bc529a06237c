//! Role resolution: inheritance, custom overrides, and the legacy fallback.
//!
//! Resolution is pure: all ancestor roles must be pre-loaded into a
//! [`RoleDirectory`] before calling [`resolve_effective`]. Each role in the
//! chain is a complete point-in-time document, so a caller never observes a
//! partially-merged chain.

use crate::{
    legacy, AccessError, AccessLevel, AccessResult, EntityKind, PrivilegeGrid, PrivilegeKind,
    SecurityRole, SpecialPermission, SpecialPermissionSet,
};
use hearth_core::{CustomPermission, RoleId, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Pre-loaded roles, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct RoleDirectory(HashMap<RoleId, SecurityRole>);

impl RoleDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a role, replacing any previous role with the same id.
    pub fn insert(&mut self, role: SecurityRole) {
        self.0.insert(role.id, role);
    }

    /// Looks up a role.
    #[must_use]
    pub fn get(&self, id: RoleId) -> Option<&SecurityRole> {
        self.0.get(&id)
    }

    /// Returns true if the directory holds `id`.
    #[must_use]
    pub fn contains(&self, id: RoleId) -> bool {
        self.0.contains_key(&id)
    }

    /// Number of roles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the directory is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the roles.
    pub fn iter(&self) -> impl Iterator<Item = &SecurityRole> {
        self.0.values()
    }
}

impl FromIterator<SecurityRole> for RoleDirectory {
    fn from_iter<I: IntoIterator<Item = SecurityRole>>(iter: I) -> Self {
        let mut directory = Self::new();
        for role in iter {
            directory.insert(role);
        }
        directory
    }
}

/// The fully-resolved authorization state for one caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivePrivileges {
    /// The resolved privilege grid; every cell defined.
    pub grid: PrivilegeGrid,
    /// The resolved special permissions; every capability defined.
    pub specials: SpecialPermissionSet,
}

impl EffectivePrivileges {
    /// Zero privileges; the fail-closed state.
    #[must_use]
    pub fn none() -> Self {
        Self {
            grid: PrivilegeGrid::none(),
            specials: SpecialPermissionSet::none(),
        }
    }

    /// Returns the granted level for a grid cell.
    #[must_use]
    pub fn granted(&self, entity: EntityKind, privilege: PrivilegeKind) -> AccessLevel {
        self.grid.granted(entity, privilege)
    }

    /// Returns whether a special capability is held.
    #[must_use]
    pub fn has_special(&self, permission: SpecialPermission) -> bool {
        self.specials.has(permission)
    }
}

/// What a custom-permission key targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideTarget {
    /// A special capability (`special:<capability>`).
    Special(SpecialPermission),
    /// A single grid cell (`entity:<entity_kind>:<privilege>`).
    Cell(EntityKind, PrivilegeKind),
}

/// Parses a custom-permission key.
#[must_use]
pub fn parse_override_key(key: &str) -> Option<OverrideTarget> {
    if let Some(name) = key.strip_prefix("special:") {
        return SpecialPermission::from_name(name).map(OverrideTarget::Special);
    }
    if let Some(rest) = key.strip_prefix("entity:") {
        let (entity, privilege) = rest.split_once(':')?;
        return Some(OverrideTarget::Cell(
            EntityKind::from_name(entity)?,
            PrivilegeKind::from_name(privilege)?,
        ));
    }
    None
}

/// Resolves a user's effective privileges.
///
/// Users without a security role (or with a dangling reference, recovered
/// leniently) are resolved from the legacy table alone; granular users get
/// the full inheritance merge plus custom overrides.
///
/// # Errors
/// Returns [`AccessError::Configuration`] when the inheritance chain
/// contains a cycle. Callers on the decision path must treat that as zero
/// privileges.
pub fn resolve_effective(user: &User, directory: &RoleDirectory) -> AccessResult<EffectivePrivileges> {
    let Some(role_id) = user.security_role_id else {
        return Ok(legacy::legacy_effective(user.role).clone());
    };

    let Some(role) = directory.get(role_id) else {
        tracing::warn!(
            user_id = %user.id,
            role_id = %role_id,
            "assigned security role not found; falling back to legacy role"
        );
        return Ok(legacy::legacy_effective(user.role).clone());
    };

    let chain = inheritance_chain(role, directory)?;
    let mut effective = merge_chain(&chain);
    apply_overrides(&mut effective, &user.custom_permissions, user.id);
    Ok(effective)
}

/// Collects a role's inheritance chain, leaf first.
///
/// A dangling `parent_id` truncates the chain with a warning; only a cycle
/// is an error.
///
/// # Errors
/// Returns [`AccessError::Configuration`] when a role id repeats in the
/// chain.
pub fn inheritance_chain<'a>(
    leaf: &'a SecurityRole,
    directory: &'a RoleDirectory,
) -> AccessResult<Vec<&'a SecurityRole>> {
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = leaf;

    loop {
        if !visited.insert(current.id) {
            tracing::error!(
                role_id = %current.id,
                role_name = %current.name,
                "inheritance cycle detected; role data needs administrator attention"
            );
            return Err(AccessError::Configuration(format!(
                "inheritance cycle involving role {}",
                current.id
            )));
        }
        chain.push(current);

        match current.parent_id {
            Some(parent_id) => match directory.get(parent_id) {
                Some(parent) => current = parent,
                None => {
                    tracing::warn!(
                        role_id = %current.id,
                        parent_id = %parent_id,
                        "parent role not found; treating role as chain root"
                    );
                    break;
                }
            },
            None => break,
        }
    }

    Ok(chain)
}

/// Merges a leaf-first chain into a total grid and special set.
///
/// For every cell and capability, the declaration nearest the leaf wins;
/// anything undeclared through the whole chain resolves to no access.
fn merge_chain(chain: &[&SecurityRole]) -> EffectivePrivileges {
    let mut effective = EffectivePrivileges::none();

    for entity in EntityKind::ALL {
        for privilege in PrivilegeKind::ALL {
            let level = chain
                .iter()
                .find_map(|role| role.grid.get(entity, privilege))
                .unwrap_or(AccessLevel::None);
            effective.grid.set(entity, privilege, level);
        }
    }

    for permission in SpecialPermission::ALL {
        let granted = chain
            .iter()
            .find_map(|role| role.specials.get(permission))
            .unwrap_or(false);
        effective.specials.set(permission, granted);
    }

    effective
}

/// Applies custom overrides in list order; later entries win and the result
/// is final.
fn apply_overrides(
    effective: &mut EffectivePrivileges,
    overrides: &[CustomPermission],
    user_id: UserId,
) {
    for entry in overrides {
        match parse_override_key(&entry.permission) {
            Some(OverrideTarget::Special(permission)) => {
                effective.specials.set(permission, entry.granted);
            }
            Some(OverrideTarget::Cell(entity, privilege)) => {
                let level = if entry.granted {
                    AccessLevel::Global
                } else {
                    AccessLevel::None
                };
                effective.grid.set(entity, privilege, level);
            }
            None => {
                tracing::warn!(
                    user_id = %user_id,
                    key = %entry.permission,
                    "unparseable custom permission key; skipping"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::role::seeds;
    use hearth_core::LegacyRole;

    fn granular_user(role_id: RoleId) -> User {
        User::builder()
            .username("rwright")
            .email("r.wright@example.com")
            .role(LegacyRole::FamilyMember)
            .security_role(role_id)
            .build()
    }

    #[test]
    fn test_legacy_only_user_gets_legacy_grid() {
        let user = User::builder()
            .username("guest")
            .email("guest@example.com")
            .role(LegacyRole::FamilyAdmin)
            .build();

        let effective = resolve_effective(&user, &RoleDirectory::new()).unwrap();
        assert_eq!(
            effective.granted(EntityKind::News, PrivilegeKind::Write),
            AccessLevel::Family
        );
        assert!(effective.has_special(SpecialPermission::ManageFamily));
    }

    #[test]
    fn test_legacy_only_user_ignores_custom_overrides() {
        let user = User::builder()
            .username("guest")
            .email("guest@example.com")
            .role(LegacyRole::Guest)
            .custom_permission(CustomPermission::grant("entity:news:write"))
            .build();

        let effective = resolve_effective(&user, &RoleDirectory::new()).unwrap();
        assert_eq!(
            effective.granted(EntityKind::News, PrivilegeKind::Write),
            AccessLevel::None
        );
    }

    #[test]
    fn test_dangling_role_falls_back_to_legacy() {
        let user = granular_user(RoleId::new());
        let effective = resolve_effective(&user, &RoleDirectory::new()).unwrap();

        // Falls back to the family-member legacy grid.
        assert_eq!(
            effective.granted(EntityKind::News, PrivilegeKind::Read),
            AccessLevel::Family
        );
    }

    #[test]
    fn test_child_declaration_wins_over_parent() {
        let parent = seeds::family_member();
        let child = SecurityRole::builder("Restricted Member")
            .parent(parent.id)
            .grant(EntityKind::News, PrivilegeKind::Read, AccessLevel::None)
            .build();
        let user = granular_user(child.id);

        let directory: RoleDirectory = [parent, child].into_iter().collect();
        let effective = resolve_effective(&user, &directory).unwrap();

        // Explicit `none` in the child revokes the inherited family grant.
        assert_eq!(
            effective.granted(EntityKind::News, PrivilegeKind::Read),
            AccessLevel::None
        );
        // Undeclared cells still inherit.
        assert_eq!(
            effective.granted(EntityKind::Photo, PrivilegeKind::Read),
            AccessLevel::Family
        );
    }

    #[test]
    fn test_specials_inherit_per_key() {
        let parent = SecurityRole::builder("Moderator Base")
            .special(SpecialPermission::ApproveContent, true)
            .special(SpecialPermission::SendNotifications, true)
            .build();
        let child = SecurityRole::builder("Quiet Moderator")
            .parent(parent.id)
            .special(SpecialPermission::SendNotifications, false)
            .build();
        let user = granular_user(child.id);

        let directory: RoleDirectory = [parent, child].into_iter().collect();
        let effective = resolve_effective(&user, &directory).unwrap();

        assert!(effective.has_special(SpecialPermission::ApproveContent));
        assert!(!effective.has_special(SpecialPermission::SendNotifications));
        assert!(!effective.has_special(SpecialPermission::ManageBilling));
    }

    #[test]
    fn test_cycle_fails_with_configuration_error() {
        let mut role_a = SecurityRole::builder("A").build();
        let mut role_b = SecurityRole::builder("B").build();
        role_a.parent_id = Some(role_b.id);
        role_b.parent_id = Some(role_a.id);
        let user = granular_user(role_a.id);

        let directory: RoleDirectory = [role_a, role_b].into_iter().collect();
        let err = resolve_effective(&user, &directory).unwrap_err();
        assert!(matches!(err, AccessError::Configuration(_)));
    }

    #[test]
    fn test_dangling_parent_truncates_chain() {
        let child = SecurityRole::builder("Orphan")
            .parent(RoleId::new())
            .grant(EntityKind::News, PrivilegeKind::Read, AccessLevel::Own)
            .build();
        let user = granular_user(child.id);

        let directory: RoleDirectory = [child].into_iter().collect();
        let effective = resolve_effective(&user, &directory).unwrap();
        assert_eq!(
            effective.granted(EntityKind::News, PrivilegeKind::Read),
            AccessLevel::Own
        );
        assert_eq!(
            effective.granted(EntityKind::News, PrivilegeKind::Write),
            AccessLevel::None
        );
    }

    #[test]
    fn test_custom_overrides_are_final_and_last_write_wins() {
        let role = seeds::guest();
        let role_id = role.id;
        let user = User::builder()
            .username("special")
            .email("special@example.com")
            .role(LegacyRole::Guest)
            .security_role(role_id)
            .custom_permission(CustomPermission::grant("entity:poll:write"))
            .custom_permission(CustomPermission::deny("entity:poll:write"))
            .custom_permission(CustomPermission::grant("special:approve_content"))
            .custom_permission(CustomPermission::grant("not-a-key"))
            .build();

        let directory: RoleDirectory = [role].into_iter().collect();
        let effective = resolve_effective(&user, &directory).unwrap();

        // Later entry wins.
        assert_eq!(
            effective.granted(EntityKind::Poll, PrivilegeKind::Write),
            AccessLevel::None
        );
        assert!(effective.has_special(SpecialPermission::ApproveContent));
    }

    #[test]
    fn test_parse_override_key() {
        assert_eq!(
            parse_override_key("special:manage_users"),
            Some(OverrideTarget::Special(SpecialPermission::ManageUsers))
        );
        assert_eq!(
            parse_override_key("entity:photo:share"),
            Some(OverrideTarget::Cell(EntityKind::Photo, PrivilegeKind::Share))
        );
        assert_eq!(parse_override_key("entity:photo"), None);
        assert_eq!(parse_override_key("entity:starship:read"), None);
        assert_eq!(parse_override_key("special:teleport"), None);
    }
}
