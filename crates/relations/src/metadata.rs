//! Relationship Metadata - Schema information for collection associations

use serde::{Deserialize, Serialize};

/// Kinds of associations that are materialized as collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    /// One-to-many relationship (hasMany)
    HasMany,
    /// Many-to-many relationship
    ManyToMany,
    /// Polymorphic one-to-many relationship
    MorphMany,
}

impl RelationshipType {
    /// Returns true if this relationship type is polymorphic
    pub fn is_polymorphic(self) -> bool {
        matches!(self, Self::MorphMany)
    }
}

/// Metadata describing one association on the owner's type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipMeta {
    /// The type of relationship
    pub relationship_type: RelationshipType,

    /// Name of the association (field name on the owner)
    pub name: String,

    /// Declared type key of the members
    pub related_type: String,

    /// Whether members may be of heterogeneous concrete types
    pub polymorphic: bool,

    /// Name of the inverse association on the members
    pub inverse: Option<String>,
}

impl RelationshipMeta {
    /// Create metadata for a plain has-many association
    pub fn has_many(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        Self::new(RelationshipType::HasMany, name, related_type)
    }

    /// Create metadata for a many-to-many association
    pub fn many_to_many(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        Self::new(RelationshipType::ManyToMany, name, related_type)
    }

    /// Create metadata for a polymorphic has-many association
    pub fn morph_many(name: impl Into<String>, related_type: impl Into<String>) -> Self {
        Self::new(RelationshipType::MorphMany, name, related_type)
    }

    pub fn new(
        relationship_type: RelationshipType,
        name: impl Into<String>,
        related_type: impl Into<String>,
    ) -> Self {
        Self {
            relationship_type,
            name: name.into(),
            related_type: related_type.into(),
            polymorphic: relationship_type.is_polymorphic(),
            inverse: None,
        }
    }

    /// Set the inverse association name
    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }

    /// Mark the association as polymorphic regardless of its type
    pub fn polymorphic(mut self, polymorphic: bool) -> Self {
        self.polymorphic = polymorphic;
        self
    }
}
