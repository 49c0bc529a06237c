//! Access control (RBAC) for the Hearth family platform.
//!
//! This crate provides the platform's single source of authorization truth:
//! - Security roles with single-parent inheritance and per-family scoping
//! - A role resolver producing a total effective privilege grid per caller
//! - The authorization decision engine (`can_perform`)
//! - The scope-to-filter translator for list queries
//! - The legacy coarse-role permission table, generated from the seed roles
//! - Role lifecycle management and access audit plumbing
//!
//! The decision path is pure: resolution and checks operate on pre-loaded
//! role documents and caller-supplied resource facts, never on storage.

pub mod audit;
pub mod engine;
pub mod error;
pub mod filter;
pub mod grid;
pub mod legacy;
pub mod manager;
pub mod resolver;
pub mod role;

pub use audit::{AccessAudit, AuditEvent, AuditEventKind, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use engine::{can_perform, target_scope, AccessEngine, ResourceFacts};
pub use error::{AccessError, AccessResult};
pub use filter::{build_scope_filter, ScopeFilter};
pub use grid::{PrivilegeGrid, RoleGrid, SpecialGrants, SpecialPermission, SpecialPermissionSet};
pub use legacy::has_legacy_permission;
pub use manager::{FamilyProvider, RoleManager, RolePatch, RoleSpec, StaticFamilies};
pub use resolver::{resolve_effective, EffectivePrivileges, RoleDirectory};
pub use role::{RoleBuilder, RoleScope, SecurityRole};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Magnitude of an access grant, totally ordered.
///
/// A grant at level L satisfies any requirement at level L or below, so the
/// derived `Ord` is load-bearing for every authorization decision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum AccessLevel {
    /// No access.
    None = 0,
    /// Access to the caller's own records only.
    #[serde(alias = "user")]
    Own = 1,
    /// Access within the caller's family.
    Family = 2,
    /// Access across the whole platform.
    Global = 3,
}

impl AccessLevel {
    /// All levels, in ascending order.
    pub const ALL: [Self; 4] = [Self::None, Self::Own, Self::Family, Self::Global];

    /// Returns the level's position in the total order.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        self as u8
    }

    /// Returns true if a grant at this level satisfies `required`.
    #[must_use]
    pub fn satisfies(self, required: Self) -> bool {
        self >= required
    }

    /// Returns the level name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Own => "own",
            Self::Family => "family",
            Self::Global => "global",
        }
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind of privilege a grid cell grants.
///
/// The kinds are independent axes; there is no ordering between them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeKind {
    /// Create new records.
    Create,
    /// Read records.
    Read,
    /// Modify records.
    Write,
    /// Delete records.
    Delete,
    /// Assign records or roles to other users.
    Assign,
    /// Share records outside their default audience.
    Share,
    /// Approve moderated submissions.
    Approve,
    /// Export records.
    Export,
    /// Import records.
    Import,
}

impl PrivilegeKind {
    /// Number of privilege kinds.
    pub const COUNT: usize = 9;

    /// All privilege kinds.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Create,
        Self::Read,
        Self::Write,
        Self::Delete,
        Self::Assign,
        Self::Share,
        Self::Approve,
        Self::Export,
        Self::Import,
    ];

    /// Returns this kind's index for grid addressing.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the privilege name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
            Self::Assign => "assign",
            Self::Share => "share",
            Self::Approve => "approve",
            Self::Export => "export",
            Self::Import => "import",
        }
    }

    /// Parses a privilege name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for PrivilegeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The closed set of resource categories the platform manages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// User accounts.
    User,
    /// Families themselves.
    Family,
    /// Family membership records (genealogy tree nodes).
    FamilyMember,
    /// Calendar events.
    Event,
    /// Family news posts.
    News,
    /// Recipes.
    Recipe,
    /// Family traditions.
    Tradition,
    /// Photos and galleries.
    Photo,
    /// Polls.
    Poll,
    /// Memorial pages.
    Memorial,
    /// Moderated submissions awaiting review.
    Submission,
    /// Approval records for submissions.
    Approval,
    /// Service offerings.
    Service,
    /// Uploaded documents.
    Document,
    /// Places attached to the family history.
    Location,
    /// Activity feed entries.
    Activity,
    /// Family and platform settings.
    Settings,
    /// Audit log entries.
    AuditLog,
}

impl EntityKind {
    /// Number of entity kinds.
    pub const COUNT: usize = 18;

    /// All entity kinds.
    pub const ALL: [Self; Self::COUNT] = [
        Self::User,
        Self::Family,
        Self::FamilyMember,
        Self::Event,
        Self::News,
        Self::Recipe,
        Self::Tradition,
        Self::Photo,
        Self::Poll,
        Self::Memorial,
        Self::Submission,
        Self::Approval,
        Self::Service,
        Self::Document,
        Self::Location,
        Self::Activity,
        Self::Settings,
        Self::AuditLog,
    ];

    /// Returns this kind's index for grid addressing.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the entity name as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Family => "family",
            Self::FamilyMember => "family_member",
            Self::Event => "event",
            Self::News => "news",
            Self::Recipe => "recipe",
            Self::Tradition => "tradition",
            Self::Photo => "photo",
            Self::Poll => "poll",
            Self::Memorial => "memorial",
            Self::Submission => "submission",
            Self::Approval => "approval",
            Self::Service => "service",
            Self::Document => "document",
            Self::Location => "location",
            Self::Activity => "activity",
            Self::Settings => "settings",
            Self::AuditLog => "audit_log",
        }
    }

    /// Parses an entity name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
