//! Family types for multi-tenancy support.

use crate::FamilyId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A family is an isolated tenant: members, content, and family-scoped
/// security roles all hang off one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    /// Unique family identifier.
    pub id: FamilyId,

    /// Family name.
    pub name: String,

    /// URL-friendly identifier.
    pub slug: String,

    /// Description.
    pub description: Option<String>,

    /// Family status.
    pub status: FamilyStatus,

    /// Creation timestamp.
    pub created_at: DateTime<Utc>,

    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Family {
    /// Creates a new family builder.
    #[must_use]
    pub fn builder() -> FamilyBuilder {
        FamilyBuilder::default()
    }

    /// Returns true if the family is active.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.status, FamilyStatus::Active)
    }
}

/// Builder for families.
#[derive(Debug, Default)]
pub struct FamilyBuilder {
    name: Option<String>,
    slug: Option<String>,
    description: Option<String>,
}

impl FamilyBuilder {
    /// Sets the name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the slug.
    #[must_use]
    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Builds the family.
    ///
    /// # Panics
    /// Panics if `name` has not been set.
    #[must_use]
    pub fn build(self) -> Family {
        let now = Utc::now();
        let name = self.name.expect("name is required");
        let slug = self
            .slug
            .unwrap_or_else(|| name.to_lowercase().replace(' ', "-"));
        Family {
            id: FamilyId::new(),
            name,
            slug,
            description: self.description,
            status: FamilyStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Family status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FamilyStatus {
    /// Family is active.
    Active,
    /// Family is suspended.
    Suspended,
    /// Family has been deleted.
    Deleted,
}

impl Default for FamilyStatus {
    fn default() -> Self {
        Self::Active
    }
}
