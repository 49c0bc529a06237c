//! Scope-to-filter translation for list queries.
//!
//! List endpoints and single-record endpoints must derive authorization from
//! the same grid cell; this module maps the resolved level for a cell onto a
//! query constraint so an endpoint never re-derives scope logic by hand.

use crate::{AccessLevel, EffectivePrivileges, EntityKind, PrivilegeKind};
use hearth_core::{FamilyId, User, UserId};
use serde::{Deserialize, Serialize};

/// The constraint a list query must apply for one caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ScopeFilter {
    /// No constraint.
    Unrestricted,
    /// Only records owned by the caller.
    OwnedBy {
        /// The caller's id.
        owner_id: UserId,
    },
    /// Only records belonging to the caller's family.
    WithinFamily {
        /// The caller's family.
        family_id: FamilyId,
    },
    /// No access; the endpoint returns an empty set or rejects outright.
    Forbidden,
}

impl ScopeFilter {
    /// Returns true if the caller has no access at all.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden)
    }

    /// Returns true if the caller sees everything.
    #[must_use]
    pub const fn is_unrestricted(&self) -> bool {
        matches!(self, Self::Unrestricted)
    }
}

/// Builds the list-query constraint for an entity/privilege pair.
///
/// Reads the same grid cell as the decision engine and maps the level
/// directly. A `Family` grant without a family to scope to demotes to the
/// caller's own records, since family-wide access is meaningless without a
/// family.
#[must_use]
pub fn build_scope_filter(
    caller: &User,
    effective: &EffectivePrivileges,
    privilege: PrivilegeKind,
    entity: EntityKind,
) -> ScopeFilter {
    if caller.is_system_admin() {
        return ScopeFilter::Unrestricted;
    }

    match effective.granted(entity, privilege) {
        AccessLevel::None => ScopeFilter::Forbidden,
        AccessLevel::Own => ScopeFilter::OwnedBy { owner_id: caller.id },
        AccessLevel::Family => match caller.family_id {
            Some(family_id) => ScopeFilter::WithinFamily { family_id },
            None => ScopeFilter::OwnedBy { owner_id: caller.id },
        },
        AccessLevel::Global => ScopeFilter::Unrestricted,
    }
}
