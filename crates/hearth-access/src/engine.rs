//! The authorization decision engine.
//!
//! A decision is a pure computation over the caller, their resolved
//! privileges, and caller-supplied facts about the target resource. The
//! engine never queries storage and never explains a denial to the caller.

use crate::{
    resolve_effective, AccessLevel, AccessResult, EffectivePrivileges, EntityKind, PrivilegeKind,
    RoleManager, ScopeFilter,
};
use hearth_core::{FamilyId, User, UserId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What the calling endpoint knows about the target resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceFacts {
    /// Who created/owns the resource.
    pub owner_id: Option<UserId>,
    /// The resource's owning family.
    pub family_id: Option<FamilyId>,
    /// Whether the resource is publicly visible (only meaningful for reads).
    pub publicly_visible: bool,
}

impl ResourceFacts {
    /// Facts for a resource with no owner or family.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the owner.
    #[must_use]
    pub fn owned_by(mut self, owner_id: UserId) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Sets the owning family.
    #[must_use]
    pub fn in_family(mut self, family_id: FamilyId) -> Self {
        self.family_id = Some(family_id);
        self
    }

    /// Marks the resource publicly visible.
    #[must_use]
    pub fn public(mut self) -> Self {
        self.publicly_visible = true;
        self
    }
}

/// The narrowest relationship between caller and resource, expressed as the
/// access level a grant must reach.
#[must_use]
pub fn target_scope(caller: &User, facts: &ResourceFacts) -> AccessLevel {
    if facts.owner_id == Some(caller.id) {
        return AccessLevel::Own;
    }
    match (caller.family_id, facts.family_id) {
        (Some(caller_family), Some(resource_family)) if caller_family == resource_family => {
            AccessLevel::Family
        }
        _ => AccessLevel::Global,
    }
}

/// The core authorization predicate.
///
/// Checks, in order: the system-administrator bypass, the read-only
/// public-content bypass, then whether the granted level for the cell
/// reaches the target's scope. Raising a grant can only widen the set of
/// allowed targets.
#[must_use]
pub fn can_perform(
    caller: &User,
    effective: &EffectivePrivileges,
    privilege: PrivilegeKind,
    entity: EntityKind,
    facts: &ResourceFacts,
) -> bool {
    if caller.is_system_admin() {
        return true;
    }

    // Public family content is always readable, and only readable.
    if privilege == PrivilegeKind::Read && facts.publicly_visible {
        return true;
    }

    let granted = effective.granted(entity, privilege);
    if granted == AccessLevel::None {
        return false;
    }

    granted.satisfies(target_scope(caller, facts))
}

/// Front door combining resolution and decisions over the live role set.
///
/// Endpoints that already hold an [`EffectivePrivileges`] can call the free
/// functions directly; this wrapper snapshots the role directory per call so
/// a decision never observes a half-edited inheritance chain.
pub struct AccessEngine {
    roles: Arc<RoleManager>,
}

impl AccessEngine {
    /// Creates an engine over a role manager.
    #[must_use]
    pub fn new(roles: Arc<RoleManager>) -> Self {
        Self { roles }
    }

    /// Resolves the caller and decides a single-resource action.
    ///
    /// Corrupt role configuration fails closed: the caller is treated as
    /// having zero privileges.
    #[must_use]
    pub fn can_perform(
        &self,
        caller: &User,
        privilege: PrivilegeKind,
        entity: EntityKind,
        facts: &ResourceFacts,
    ) -> bool {
        if caller.is_system_admin() {
            return true;
        }

        let effective = self.resolve_or_fail_closed(caller);
        can_perform(caller, &effective, privilege, entity, facts)
    }

    /// Resolves the caller and builds the list-query constraint for an
    /// entity/privilege pair.
    #[must_use]
    pub fn scope_filter(
        &self,
        caller: &User,
        privilege: PrivilegeKind,
        entity: EntityKind,
    ) -> ScopeFilter {
        if caller.is_system_admin() {
            return ScopeFilter::Unrestricted;
        }

        let effective = self.resolve_or_fail_closed(caller);
        crate::build_scope_filter(caller, &effective, privilege, entity)
    }

    /// Resolves the caller's effective privileges from a point-in-time role
    /// snapshot.
    ///
    /// # Errors
    /// Returns [`AccessError::Configuration`](crate::AccessError::Configuration)
    /// when the caller's inheritance chain contains a cycle.
    pub fn effective_privileges(&self, caller: &User) -> AccessResult<EffectivePrivileges> {
        resolve_effective(caller, &self.roles.directory())
    }

    fn resolve_or_fail_closed(&self, caller: &User) -> EffectivePrivileges {
        self.effective_privileges(caller).unwrap_or_else(|err| {
            tracing::error!(
                user_id = %caller.id,
                error = %err,
                "role resolution failed; treating caller as having zero privileges"
            );
            EffectivePrivileges::none()
        })
    }
}
