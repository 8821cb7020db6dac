//! Catalog type definitions
//!
//! Entity types, relations between them, and the column prototypes that
//! queries reference by label.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of one entity row
pub type EntityId = i64;

/// A named entity kind (`Campaign`, `TestCase`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityType(String);

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Query alias for this entity: the simple name with a lower-cased first letter.
    ///
    /// `TestCase` → `testCase`
    pub fn alias(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for EntityType {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Declared data kind of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    /// Primary or foreign key
    Id,
    /// Free text
    Text,
    /// Integer or decimal number
    Numeric,
    Boolean,
    /// Calendar date or timestamp (ISO-8601 text)
    Date,
    /// Closed set of symbolic values (status, importance, ...)
    Enumerated,
}

impl DataKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::Id => "id",
            DataKind::Text => "text",
            DataKind::Numeric => "numeric",
            DataKind::Boolean => "boolean",
            DataKind::Date => "date",
            DataKind::Enumerated => "enumerated",
        }
    }

    /// Kinds that have a meaningful total order
    pub fn is_ordered(&self) -> bool {
        !matches!(self, DataKind::Boolean)
    }
}

/// Role a column may serve in a query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Projection,
    Aggregation,
    Filter,
    Ordering,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnRole::Projection => "projection",
            ColumnRole::Aggregation => "aggregation",
            ColumnRole::Filter => "filter",
            ColumnRole::Ordering => "ordering",
        }
    }

    /// All roles, for columns usable everywhere
    pub fn all() -> BTreeSet<ColumnRole> {
        [
            ColumnRole::Projection,
            ColumnRole::Aggregation,
            ColumnRole::Filter,
            ColumnRole::Ordering,
        ]
        .into_iter()
        .collect()
    }
}

impl fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queryable attribute of one entity type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnPrototype {
    /// Stable label used by query models
    pub label: String,
    /// Owning entity type
    pub entity: EntityType,
    /// Field name on the entity row
    pub attribute: String,
    /// Declared data kind
    pub kind: DataKind,
    /// Roles this column may be used in (all roles when omitted)
    #[serde(default = "ColumnRole::all")]
    pub roles: BTreeSet<ColumnRole>,
}

impl ColumnPrototype {
    pub fn new(
        label: impl Into<String>,
        entity: impl Into<EntityType>,
        attribute: impl Into<String>,
        kind: DataKind,
        roles: impl IntoIterator<Item = ColumnRole>,
    ) -> Self {
        Self {
            label: label.into(),
            entity: entity.into(),
            attribute: attribute.into(),
            kind,
            roles: roles.into_iter().collect(),
        }
    }

    /// Returns true if the column may be used in `role`
    pub fn supports(&self, role: ColumnRole) -> bool {
        self.roles.contains(&role)
    }
}

// Prototypes are identified by label alone.
impl PartialEq for ColumnPrototype {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Eq for ColumnPrototype {}

impl PartialOrd for ColumnPrototype {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ColumnPrototype {
    fn cmp(&self, other: &Self) -> Ordering {
        self.label.cmp(&other.label)
    }
}

/// Entity definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDef {
    pub name: EntityType,
    /// Primary key field on rows of this entity
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl EntityDef {
    pub fn new(name: impl Into<EntityType>) -> Self {
        Self {
            name: name.into(),
            primary_key: default_primary_key(),
        }
    }
}

/// Cardinality of a relation, read from `from` to `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One `from` row relates to many `to` rows
    OneToMany,
    /// Many `from` rows relate to one `to` row
    ManyToOne,
    OneToOne,
}

impl Cardinality {
    /// Whether walking the relation from `from` to `to` can multiply rows
    pub fn fans_out_forward(&self) -> bool {
        matches!(self, Cardinality::OneToMany)
    }

    /// Whether walking the relation from `to` back to `from` can multiply rows
    pub fn fans_out_backward(&self) -> bool {
        matches!(self, Cardinality::ManyToOne)
    }
}

/// Relation between two entity types: `from.from_field = to.to_field`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub from: EntityType,
    pub from_field: String,
    pub to: EntityType,
    pub to_field: String,
    pub cardinality: Cardinality,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_alias() {
        assert_eq!(EntityType::new("TestCase").alias(), "testCase");
        assert_eq!(EntityType::new("Campaign").alias(), "campaign");
        assert_eq!(EntityType::new("").alias(), "");
    }

    #[test]
    fn test_prototype_identity_is_label() {
        let a = ColumnPrototype::new("X", "A", "x", DataKind::Text, [ColumnRole::Filter]);
        let b = ColumnPrototype::new("X", "B", "y", DataKind::Numeric, ColumnRole::all());
        assert_eq!(a, b);
    }

    #[test]
    fn test_cardinality_direction() {
        assert!(Cardinality::OneToMany.fans_out_forward());
        assert!(!Cardinality::OneToMany.fans_out_backward());
        assert!(Cardinality::ManyToOne.fans_out_backward());
        assert!(!Cardinality::OneToOne.fans_out_forward());
        assert!(!Cardinality::OneToOne.fans_out_backward());
    }

    #[test]
    fn test_relation_json() {
        let json = r#"{"from":"Campaign","from_field":"id","to":"Iteration","to_field":"campaign_id","cardinality":"one_to_many"}"#;
        let rel: Relation = serde_json::from_str(json).unwrap();
        assert_eq!(rel.from.as_str(), "Campaign");
        assert_eq!(rel.cardinality, Cardinality::OneToMany);
    }

    #[test]
    fn test_entity_def_default_key() {
        let def: EntityDef = serde_json::from_str(r#"{"name":"Issue"}"#).unwrap();
        assert_eq!(def.primary_key, "id");
    }
}
