//! Role lifecycle management.
//!
//! The manager owns the live role table and the multi-record invariants the
//! pure engine cannot see: name uniqueness within a scope, the
//! one-default-per-family rule (swapped inside a single write-lock critical
//! section so readers never observe zero or two defaults), write-time cycle
//! rejection, and assignment bookkeeping for delete conflicts.

use crate::resolver::parse_override_key;
use crate::role::seeds;
use crate::{
    resolve_effective, AccessAudit, AccessError, AccessResult, RoleDirectory, RoleGrid, RoleScope,
    SecurityRole, SpecialGrants, SpecialPermission,
};
use chrono::Utc;
use hearth_core::{CustomPermission, FamilyId, FieldError, LegacyRole, RoleId, User, UserId};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Looks up whether a family exists; persistence stays behind this seam.
pub trait FamilyProvider: Send + Sync {
    /// Returns true if the family exists and is not deleted.
    fn family_exists(&self, id: FamilyId) -> bool;
}

/// A registered set of families (for tests and single-node deployments).
#[derive(Default)]
pub struct StaticFamilies {
    families: RwLock<HashSet<FamilyId>>,
}

impl StaticFamilies {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a family.
    pub fn register(&self, id: FamilyId) {
        self.families.write().insert(id);
    }
}

impl FamilyProvider for StaticFamilies {
    fn family_exists(&self, id: FamilyId) -> bool {
        self.families.read().contains(&id)
    }
}

/// Specification for a new role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name, unique within its scope.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Scope: system-wide or bound to one family.
    pub scope: RoleScope,
    /// Whether this role becomes its family's default.
    #[serde(default)]
    pub is_default: bool,
    /// Declared privilege grid.
    #[serde(default)]
    pub grid: RoleGrid,
    /// Declared special permissions.
    #[serde(default)]
    pub specials: SpecialGrants,
    /// Parent role for inheritance.
    #[serde(default)]
    pub parent_id: Option<RoleId>,
}

impl RoleSpec {
    /// Validates the spec in isolation, returning every offending field.
    #[must_use]
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(FieldError::new("name", "must not be blank"));
        }
        if self.is_default && self.scope.is_system() {
            errors.push(FieldError::new(
                "is_default",
                "system roles cannot be a family default",
            ));
        }
        errors
    }

    fn into_role(self) -> SecurityRole {
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

/// Partial update for an existing role.
///
/// `parent_id` is doubly optional: `None` leaves the parent untouched,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolePatch {
    /// New name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// Replacement privilege grid.
    #[serde(default)]
    pub grid: Option<RoleGrid>,
    /// Replacement special permissions.
    #[serde(default)]
    pub specials: Option<SpecialGrants>,
    /// New default flag.
    #[serde(default)]
    pub is_default: Option<bool>,
    /// New parent role.
    #[serde(default)]
    pub parent_id: Option<Option<RoleId>>,
}

struct SeedIds {
    system_admin: RoleId,
    family_admin: RoleId,
    family_member: RoleId,
    guest: RoleId,
}

/// Live role table with lifecycle operations.
pub struct RoleManager {
    roles: RwLock<HashMap<RoleId, SecurityRole>>,
    assignments: RwLock<HashMap<UserId, RoleId>>,
    families: Arc<dyn FamilyProvider>,
    audit: Arc<AccessAudit>,
    seed_ids: SeedIds,
    member_fallback: SecurityRole,
}

impl RoleManager {
    /// Creates a manager seeded with the four system roles.
    #[must_use]
    pub fn new(families: Arc<dyn FamilyProvider>, audit: Arc<AccessAudit>) -> Self {
        let system_admin = seeds::system_administrator();
        let family_admin = seeds::family_administrator();
        let family_member = seeds::family_member();
        let guest = seeds::guest();

        let seed_ids = SeedIds {
            system_admin: system_admin.id,
            family_admin: family_admin.id,
            family_member: family_member.id,
            guest: guest.id,
        };
        let member_fallback = family_member.clone();

        let mut roles = HashMap::new();
        for role in [system_admin, family_admin, family_member, guest] {
            roles.insert(role.id, role);
        }

        Self {
            roles: RwLock::new(roles),
            assignments: RwLock::new(HashMap::new()),
            families,
            audit,
            seed_ids,
            member_fallback,
        }
    }

    /// Creates a manager with no registered families and no audit sinks.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(StaticFamilies::new()), Arc::new(AccessAudit::new()))
    }

    /// Returns the seed role id equivalent to a coarse legacy role.
    #[must_use]
    pub fn seed_role_id(&self, role: LegacyRole) -> RoleId {
        match role {
            LegacyRole::SystemAdmin => self.seed_ids.system_admin,
            LegacyRole::FamilyAdmin => self.seed_ids.family_admin,
            LegacyRole::FamilyMember => self.seed_ids.family_member,
            LegacyRole::Guest => self.seed_ids.guest,
        }
    }

    /// Installs a role restored from storage, replacing any role with the
    /// same id. Name uniqueness is the caller's responsibility here.
    pub fn add_role(&self, role: SecurityRole) {
        self.roles.write().insert(role.id, role);
    }

    /// Gets a role by id.
    #[must_use]
    pub fn get_role(&self, id: RoleId) -> Option<SecurityRole> {
        self.roles.read().get(&id).cloned()
    }

    /// Lists all roles.
    #[must_use]
    pub fn list_roles(&self) -> Vec<SecurityRole> {
        self.roles.read().values().cloned().collect()
    }

    /// Lists the roles usable by one family: system roles plus its own.
    #[must_use]
    pub fn roles_for_family(&self, family_id: FamilyId) -> Vec<SecurityRole> {
        self.roles
            .read()
            .values()
            .filter(|role| role.usable_by_family(Some(family_id)))
            .cloned()
            .collect()
    }

    /// Returns a point-in-time snapshot for the resolver.
    #[must_use]
    pub fn directory(&self) -> RoleDirectory {
        self.roles.read().values().cloned().collect()
    }

    /// Returns a family's default role.
    ///
    /// A family momentarily (or wrongly) without a default falls back to the
    /// seeded Family Member role rather than erroring.
    #[must_use]
    pub fn default_role_for(&self, family_id: FamilyId) -> SecurityRole {
        self.roles
            .read()
            .values()
            .find(|role| role.family_id() == Some(family_id) && role.is_default)
            .cloned()
            .unwrap_or_else(|| self.member_fallback.clone())
    }

    /// Creates a role.
    ///
    /// # Errors
    /// `Forbidden` when the actor may not manage roles in the spec's scope;
    /// `Validation` listing every offending field otherwise.
    pub fn create_role(&self, actor: &User, spec: RoleSpec) -> AccessResult<SecurityRole> {
        self.authorize_role_admin(actor, spec.scope)?;

        let mut errors = spec.validate();

        if let RoleScope::Family(family_id) = spec.scope {
            if !self.families.family_exists(family_id) {
                errors.push(FieldError::new("family_id", "unknown family"));
            }
        }

        {
            let roles = self.roles.read();
            if roles
                .values()
                .any(|role| role.scope == spec.scope && role.name == spec.name)
            {
                errors.push(FieldError::new("name", "already used within this scope"));
            }
            if let Some(parent_id) = spec.parent_id {
                match roles.get(&parent_id) {
                    None => errors.push(FieldError::new("parent_id", "unknown parent role")),
                    Some(parent) => {
                        if !parent.usable_by_family(spec.scope.family_id()) {
                            errors.push(FieldError::new(
                                "parent_id",
                                "parent role is scoped to another family",
                            ));
                        }
                    }
                }
            }
        }

        if !errors.is_empty() {
            return Err(AccessError::Validation { errors });
        }

        let mut role = spec.into_role();
        if role.parent_id.is_none() {
            role.grid.normalize_root();
        }

        {
            let mut roles = self.roles.write();
            if role.is_default {
                clear_family_default(&mut roles, role.family_id(), role.id);
            }
            roles.insert(role.id, role.clone());
        }

        self.audit.record_role_created(actor.id, &role);
        Ok(role)
    }

    /// Updates a role.
    ///
    /// Setting `is_default` swaps the family's previous default inside the
    /// same critical section; a patch that would introduce an inheritance
    /// cycle is rejected outright.
    ///
    /// # Errors
    /// `RoleNotFound`, `Forbidden` (system roles are only editable by system
    /// administrators), or `Validation`.
    pub fn update_role(&self, actor: &User, id: RoleId, patch: RolePatch) -> AccessResult<SecurityRole> {
        let scope = self
            .get_role(id)
            .ok_or(AccessError::RoleNotFound(id))?
            .scope;
        if scope.is_system() {
            if !actor.is_system_admin() {
                return Err(AccessError::Forbidden(
                    "system roles are managed by system administrators".into(),
                ));
            }
        } else {
            self.authorize_role_admin(actor, scope)?;
        }

        let mut roles = self.roles.write();
        let before = roles.get(&id).ok_or(AccessError::RoleNotFound(id))?.clone();
        let mut updated = before.clone();

        let mut errors = Vec::new();

        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                errors.push(FieldError::new("name", "must not be blank"));
            } else if roles
                .values()
                .any(|role| role.id != id && role.scope == updated.scope && role.name == name)
            {
                errors.push(FieldError::new("name", "already used within this scope"));
            }
            updated.name = name;
        }
        if let Some(description) = patch.description {
            updated.description = Some(description);
        }
        if let Some(grid) = patch.grid {
            updated.grid = grid;
        }
        if let Some(specials) = patch.specials {
            updated.specials = specials;
        }
        if let Some(is_default) = patch.is_default {
            if is_default && updated.scope.is_system() {
                errors.push(FieldError::new(
                    "is_default",
                    "system roles cannot be a family default",
                ));
            }
            updated.is_default = is_default;
        }
        if let Some(parent_id) = patch.parent_id {
            match parent_id {
                Some(parent_id) => match roles.get(&parent_id) {
                    None => errors.push(FieldError::new("parent_id", "unknown parent role")),
                    Some(parent) => {
                        if !parent.usable_by_family(updated.scope.family_id()) {
                            errors.push(FieldError::new(
                                "parent_id",
                                "parent role is scoped to another family",
                            ));
                        } else if introduces_cycle(&roles, id, parent_id) {
                            errors.push(FieldError::new(
                                "parent_id",
                                "would introduce an inheritance cycle",
                            ));
                        }
                    }
                },
                None => {}
            }
            updated.parent_id = parent_id;
        }

        if !errors.is_empty() {
            return Err(AccessError::Validation { errors });
        }

        if updated.parent_id.is_none() {
            updated.grid.normalize_root();
        }
        updated.updated_at = Utc::now();

        if updated.is_default && !before.is_default {
            clear_family_default(&mut roles, updated.family_id(), id);
        }
        roles.insert(id, updated.clone());
        drop(roles);

        self.audit.record_role_updated(actor.id, &before, &updated);
        Ok(updated)
    }

    /// Deletes a role.
    ///
    /// # Errors
    /// `Conflict` for system roles, a family's current default, or a role
    /// still assigned to users.
    pub fn delete_role(&self, actor: &User, id: RoleId) -> AccessResult<()> {
        let scope = self
            .get_role(id)
            .ok_or(AccessError::RoleNotFound(id))?
            .scope;
        if scope.is_system() {
            return Err(AccessError::Conflict("system roles are not deletable".into()));
        }
        self.authorize_role_admin(actor, scope)?;

        let mut roles = self.roles.write();
        let role = roles.get(&id).ok_or(AccessError::RoleNotFound(id))?.clone();
        if role.is_default {
            return Err(AccessError::Conflict(
                "role is its family's default and cannot be deleted".into(),
            ));
        }
        if self.assignments.read().values().any(|assigned| *assigned == id) {
            return Err(AccessError::Conflict(
                "role is assigned to users and cannot be deleted".into(),
            ));
        }
        roles.remove(&id);
        drop(roles);

        self.audit.record_role_deleted(actor.id, &role);
        Ok(())
    }

    /// Assigns a role to a user.
    ///
    /// # Errors
    /// `RoleNotFound`; `Validation` for cross-family assignment; `Forbidden`
    /// when the actor may not manage the target (self-assignment included).
    pub fn assign_role(&self, actor: &User, target: &mut User, role_id: RoleId) -> AccessResult<()> {
        let role = self
            .get_role(role_id)
            .ok_or(AccessError::RoleNotFound(role_id))?;
        if !role.usable_by_family(target.family_id) {
            return Err(AccessError::invalid_field(
                "security_role_id",
                "role is scoped to another family",
            ));
        }
        self.authorize_user_admin(actor, target)?;

        self.assignments.write().insert(target.id, role_id);
        target.security_role_id = Some(role_id);
        target.updated_at = Utc::now();

        self.audit
            .record_role_assignment(actor.id, target.id, role_id, true);
        Ok(())
    }

    /// Removes a user's security role, returning them to legacy resolution.
    ///
    /// # Errors
    /// `Forbidden` when the actor may not manage the target.
    pub fn revoke_role(&self, actor: &User, target: &mut User) -> AccessResult<()> {
        self.authorize_user_admin(actor, target)?;

        let removed = self.assignments.write().remove(&target.id);
        let role_id = target.security_role_id.take().or(removed);
        target.updated_at = Utc::now();

        if let Some(role_id) = role_id {
            self.audit
                .record_role_assignment(actor.id, target.id, role_id, false);
        }
        Ok(())
    }

    /// Sets one custom permission override on a user, replacing any earlier
    /// entry with the same key.
    ///
    /// # Errors
    /// `Validation` for unrecognized keys; `Forbidden` when the actor may
    /// not manage the target.
    pub fn set_custom_permission(
        &self,
        actor: &User,
        target: &mut User,
        permission: &str,
        granted: bool,
    ) -> AccessResult<()> {
        if parse_override_key(permission).is_none() {
            return Err(AccessError::invalid_field(
                "permission",
                "unrecognized permission key",
            ));
        }
        self.authorize_user_admin(actor, target)?;

        target.custom_permissions.retain(|p| p.permission != permission);
        target
            .custom_permissions
            .push(CustomPermission {
                permission: permission.to_string(),
                granted,
            });
        target.updated_at = Utc::now();

        self.audit
            .record_permission_change(actor.id, target.id, permission, granted);
        Ok(())
    }

    /// May `actor` manage roles in `scope`?
    fn authorize_role_admin(&self, actor: &User, scope: RoleScope) -> AccessResult<()> {
        if actor.is_system_admin() {
            return Ok(());
        }

        let effective = resolve_effective(actor, &self.directory())?;
        if !effective.has_special(SpecialPermission::ManageRoles) {
            return Err(AccessError::Forbidden("cannot manage roles".into()));
        }

        match scope {
            RoleScope::System => Err(AccessError::Forbidden(
                "system roles are managed by system administrators".into(),
            )),
            RoleScope::Family(family_id) => {
                if actor.family_id == Some(family_id) {
                    Ok(())
                } else {
                    Err(AccessError::Forbidden(
                        "cannot manage roles of another family".into(),
                    ))
                }
            }
        }
    }

    /// May `actor` change `target`'s role or permissions?
    ///
    /// Nobody grants themselves privileges; only system administrators cross
    /// family lines.
    fn authorize_user_admin(&self, actor: &User, target: &User) -> AccessResult<()> {
        if actor.is_system_admin() {
            return Ok(());
        }
        if actor.id == target.id {
            return Err(AccessError::Forbidden(
                "cannot change your own role or permissions".into(),
            ));
        }

        let effective = resolve_effective(actor, &self.directory())?;
        if !effective.has_special(SpecialPermission::ManageUsers) {
            return Err(AccessError::Forbidden("cannot manage users".into()));
        }
        if actor.family_id.is_none() || actor.family_id != target.family_id {
            return Err(AccessError::Forbidden(
                "cannot manage users of another family".into(),
            ));
        }
        Ok(())
    }
}

/// Clears the current default role of `family_id`, keeping `keep` as-is.
fn clear_family_default(
    roles: &mut HashMap<RoleId, SecurityRole>,
    family_id: Option<FamilyId>,
    keep: RoleId,
) {
    let Some(family_id) = family_id else { return };
    for role in roles.values_mut() {
        if role.id != keep && role.family_id() == Some(family_id) && role.is_default {
            role.is_default = false;
            role.updated_at = Utc::now();
        }
    }
}

/// Would re-parenting `role_id` under `parent_id` create a cycle?
fn introduces_cycle(
    roles: &HashMap<RoleId, SecurityRole>,
    role_id: RoleId,
    parent_id: RoleId,
) -> bool {
    let mut visited = HashSet::new();
    let mut current = Some(parent_id);
    while let Some(id) = current {
        if id == role_id {
            return true;
        }
        if !visited.insert(id) {
            // Pre-existing cycle above the new parent; re-parenting onto it
            // is refused as well.
            return true;
        }
        current = roles.get(&id).and_then(|role| role.parent_id);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AccessLevel, EntityKind, InMemoryAuditSink, PrivilegeKind};

    struct Fixture {
        manager: RoleManager,
        sink: Arc<InMemoryAuditSink>,
        family_id: FamilyId,
        admin: User,
        sysadmin: User,
    }

    fn fixture() -> Fixture {
        let families = Arc::new(StaticFamilies::new());
        let family_id = FamilyId::new();
        families.register(family_id);

        let sink = Arc::new(InMemoryAuditSink::new(100));
        let mut audit = AccessAudit::new();
        audit.add_sink(sink.clone());

        let manager = RoleManager::new(families, Arc::new(audit));
        let admin = User::builder()
            .family_id(family_id)
            .username("fadmin")
            .email("fadmin@example.com")
            .role(LegacyRole::FamilyAdmin)
            .build();
        let sysadmin = User::builder()
            .username("root")
            .email("root@example.com")
            .role(LegacyRole::SystemAdmin)
            .build();

        Fixture {
            manager,
            sink,
            family_id,
            admin,
            sysadmin,
        }
    }

    fn family_spec(fixture: &Fixture, name: &str) -> RoleSpec {
        RoleSpec {
            name: name.to_string(),
            description: None,
            scope: RoleScope::Family(fixture.family_id),
            is_default: false,
            grid: RoleGrid::new(),
            specials: SpecialGrants::new(),
            parent_id: None,
        }
    }

    #[test]
    fn test_seeded_roles_present() {
        let f = fixture();
        assert_eq!(f.manager.list_roles().len(), 4);
        let member = f
            .manager
            .get_role(f.manager.seed_role_id(LegacyRole::FamilyMember))
            .unwrap();
        assert_eq!(member.name, seeds::FAMILY_MEMBER);
    }

    #[test]
    fn test_family_admin_creates_family_role() {
        let f = fixture();
        let role = f.manager.create_role(&f.admin, family_spec(&f, "Archivist")).unwrap();

        assert_eq!(role.family_id(), Some(f.family_id));
        // Parentless roles are normalized so the whole chain root is explicit.
        assert!(role.grid.is_fully_declared());
        assert_eq!(f.sink.events_of_kind(crate::AuditEventKind::RoleCreated).len(), 1);
    }

    #[test]
    fn test_family_admin_cannot_create_system_role() {
        let f = fixture();
        let mut spec = family_spec(&f, "Sneaky");
        spec.scope = RoleScope::System;
        let err = f.manager.create_role(&f.admin, spec).unwrap_err();
        assert!(matches!(err, AccessError::Forbidden(_)));
    }

    #[test]
    fn test_create_reports_every_offending_field() {
        let f = fixture();
        let unknown_family = FamilyId::new();
        let spec = RoleSpec {
            name: "  ".to_string(),
            description: None,
            scope: RoleScope::Family(unknown_family),
            is_default: false,
            grid: RoleGrid::new(),
            specials: SpecialGrants::new(),
            parent_id: Some(RoleId::new()),
        };
        let err = f.manager.create_role(&f.sysadmin, spec).unwrap_err();
        let AccessError::Validation { errors } = err else {
            panic!("expected validation error");
        };
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"family_id"));
        assert!(fields.contains(&"parent_id"));
    }

    #[test]
    fn test_duplicate_name_within_scope_rejected() {
        let f = fixture();
        f.manager.create_role(&f.admin, family_spec(&f, "Archivist")).unwrap();
        let err = f
            .manager
            .create_role(&f.admin, family_spec(&f, "Archivist"))
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation { .. }));
    }

    #[test]
    fn test_default_swap_leaves_exactly_one_default() {
        let f = fixture();
        let mut spec1 = family_spec(&f, "First");
        spec1.is_default = true;
        let first = f.manager.create_role(&f.admin, spec1).unwrap();

        let second = f.manager.create_role(&f.admin, family_spec(&f, "Second")).unwrap();
        f.manager
            .update_role(
                &f.admin,
                second.id,
                RolePatch {
                    is_default: Some(true),
                    ..RolePatch::default()
                },
            )
            .unwrap();

        let defaults: Vec<SecurityRole> = f
            .manager
            .list_roles()
            .into_iter()
            .filter(|role| role.family_id() == Some(f.family_id) && role.is_default)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].id, second.id);
        assert!(!f.manager.get_role(first.id).unwrap().is_default);
        assert_eq!(f.manager.default_role_for(f.family_id).id, second.id);
    }

    #[test]
    fn test_default_role_falls_back_to_member_seed() {
        let f = fixture();
        let fallback = f.manager.default_role_for(f.family_id);
        assert_eq!(fallback.name, seeds::FAMILY_MEMBER);
    }

    #[test]
    fn test_system_roles_immutable_to_family_admin() {
        let f = fixture();
        let member_id = f.manager.seed_role_id(LegacyRole::FamilyMember);
        let err = f
            .manager
            .update_role(
                &f.admin,
                member_id,
                RolePatch {
                    description: Some("hijacked".into()),
                    ..RolePatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, AccessError::Forbidden(_)));

        // A system administrator may edit them.
        f.manager
            .update_role(
                &f.sysadmin,
                member_id,
                RolePatch {
                    description: Some("tuned".into()),
                    ..RolePatch::default()
                },
            )
            .unwrap();
    }

    #[test]
    fn test_system_roles_not_deletable() {
        let f = fixture();
        let guest_id = f.manager.seed_role_id(LegacyRole::Guest);
        let err = f.manager.delete_role(&f.sysadmin, guest_id).unwrap_err();
        assert!(matches!(err, AccessError::Conflict(_)));
    }

    #[test]
    fn test_delete_conflicts() {
        let f = fixture();
        let mut spec = family_spec(&f, "Default");
        spec.is_default = true;
        let default_role = f.manager.create_role(&f.admin, spec).unwrap();
        let err = f.manager.delete_role(&f.admin, default_role.id).unwrap_err();
        assert!(matches!(err, AccessError::Conflict(_)));

        let assigned = f.manager.create_role(&f.admin, family_spec(&f, "Assigned")).unwrap();
        let mut member = User::builder()
            .family_id(f.family_id)
            .username("member")
            .email("member@example.com")
            .role(LegacyRole::FamilyMember)
            .build();
        f.manager.assign_role(&f.admin, &mut member, assigned.id).unwrap();
        let err = f.manager.delete_role(&f.admin, assigned.id).unwrap_err();
        assert!(matches!(err, AccessError::Conflict(_)));

        f.manager.revoke_role(&f.admin, &mut member).unwrap();
        f.manager.delete_role(&f.admin, assigned.id).unwrap();
    }

    #[test]
    fn test_cross_family_assignment_rejected() {
        let f = fixture();
        let role = f.manager.create_role(&f.admin, family_spec(&f, "Archivist")).unwrap();

        let mut outsider = User::builder()
            .family_id(FamilyId::new())
            .username("outsider")
            .email("outsider@example.com")
            .role(LegacyRole::FamilyMember)
            .build();
        let err = f
            .manager
            .assign_role(&f.sysadmin, &mut outsider, role.id)
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation { .. }));
        assert!(outsider.security_role_id.is_none());
    }

    #[test]
    fn test_self_escalation_rejected() {
        let f = fixture();
        let role = f.manager.create_role(&f.admin, family_spec(&f, "Archivist")).unwrap();

        let actor = f.admin.clone();
        let mut themselves = f.admin.clone();
        let err = f.manager.assign_role(&actor, &mut themselves, role.id).unwrap_err();
        assert!(matches!(err, AccessError::Forbidden(_)));

        let mut target = f.admin.clone();
        let err = f
            .manager
            .set_custom_permission(&f.admin, &mut target, "special:manage_billing", true)
            .unwrap_err();
        assert!(matches!(err, AccessError::Forbidden(_)));
    }

    #[test]
    fn test_custom_permission_replaces_same_key() {
        let f = fixture();
        let mut member = User::builder()
            .family_id(f.family_id)
            .username("member")
            .email("member@example.com")
            .role(LegacyRole::FamilyMember)
            .build();

        f.manager
            .set_custom_permission(&f.admin, &mut member, "entity:poll:write", true)
            .unwrap();
        f.manager
            .set_custom_permission(&f.admin, &mut member, "entity:poll:write", false)
            .unwrap();

        assert_eq!(member.custom_permissions.len(), 1);
        assert!(!member.custom_permissions[0].granted);
        assert_eq!(
            f.sink
                .events_of_kind(crate::AuditEventKind::PermissionChanged)
                .len(),
            2
        );

        let err = f
            .manager
            .set_custom_permission(&f.admin, &mut member, "entity:poll", true)
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation { .. }));
    }

    #[test]
    fn test_reparent_cycle_rejected() {
        let f = fixture();
        let base = f.manager.create_role(&f.admin, family_spec(&f, "Base")).unwrap();
        let mut child_spec = family_spec(&f, "Child");
        child_spec.parent_id = Some(base.id);
        let child = f.manager.create_role(&f.admin, child_spec).unwrap();

        let err = f
            .manager
            .update_role(
                &f.admin,
                base.id,
                RolePatch {
                    parent_id: Some(Some(child.id)),
                    ..RolePatch::default()
                },
            )
            .unwrap_err();
        assert!(matches!(err, AccessError::Validation { .. }));
    }

    #[test]
    fn test_child_grid_stays_sparse() {
        let f = fixture();
        let mut child_spec = family_spec(&f, "Child");
        child_spec.parent_id = Some(f.manager.seed_role_id(LegacyRole::FamilyMember));
        child_spec.grid = RoleGrid::new().with(
            EntityKind::Poll,
            PrivilegeKind::Write,
            AccessLevel::Family,
        );
        let child = f.manager.create_role(&f.admin, child_spec).unwrap();

        // Cells the child does not declare keep deferring to the parent.
        assert!(!child.grid.is_fully_declared());
        assert_eq!(
            child.grid.get(EntityKind::Poll, PrivilegeKind::Write),
            Some(AccessLevel::Family)
        );
    }
}
