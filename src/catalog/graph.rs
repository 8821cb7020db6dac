//! Entity graph
//!
//! Entity types are nodes, relations are undirected edges carrying a
//! cardinality. The graph must be a forest, so the path between two
//! entity types is unique and join paths are deterministic.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{CatalogError, CatalogResult};
use super::types::{EntityDef, EntityType, Relation};

/// One oriented hop along a relation: `from.from_field = to.to_field`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JoinStep {
    pub from: EntityType,
    pub from_field: String,
    pub to: EntityType,
    pub to_field: String,
    /// True if one `from` row may match many `to` rows
    pub fans_out: bool,
}

impl JoinStep {
    fn forward(relation: &Relation) -> Self {
        Self {
            from: relation.from.clone(),
            from_field: relation.from_field.clone(),
            to: relation.to.clone(),
            to_field: relation.to_field.clone(),
            fans_out: relation.cardinality.fans_out_forward(),
        }
    }

    fn backward(relation: &Relation) -> Self {
        Self {
            from: relation.to.clone(),
            from_field: relation.to_field.clone(),
            to: relation.from.clone(),
            to_field: relation.from_field.clone(),
            fans_out: relation.cardinality.fans_out_backward(),
        }
    }
}

/// Ordered list of one-to-many hops between a query root and a target entity.
///
/// Its length is the fan-out depth. Two targets with equal keys multiply
/// root rows identically and can share one grouped sub-expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FanOutKey(Vec<(EntityType, EntityType)>);

impl FanOutKey {
    /// Number of one-to-many hops
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// True for targets reachable from the root without fan-out
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hops(&self) -> &[(EntityType, EntityType)] {
        &self.0
    }
}

impl Ord for FanOutKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.depth()
            .cmp(&other.depth())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for FanOutKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FanOutKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "root");
        }
        let hops: Vec<String> = self
            .0
            .iter()
            .map(|(from, to)| format!("{}>{}", from, to))
            .collect();
        write!(f, "{}", hops.join(","))
    }
}

/// Unique join path between two entity types
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinPath {
    pub steps: Vec<JoinStep>,
}

impl JoinPath {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Fan-out key of the path's target relative to its start
    pub fn fan_out_key(&self) -> FanOutKey {
        FanOutKey(
            self.steps
                .iter()
                .filter(|s| s.fans_out)
                .map(|s| (s.from.clone(), s.to.clone()))
                .collect(),
        )
    }

    /// Entities reached by the path, in traversal order (start excluded)
    pub fn entities(&self) -> impl Iterator<Item = &EntityType> {
        self.steps.iter().map(|s| &s.to)
    }
}

/// Entity types and the relations between them
#[derive(Debug, Clone)]
pub struct EntityGraph {
    entities: BTreeMap<EntityType, EntityDef>,
    relations: Vec<Relation>,
    adjacency: HashMap<EntityType, Vec<usize>>,
}

impl EntityGraph {
    /// Builds the graph, rejecting duplicates, dangling relations and cycles.
    pub fn build(entities: Vec<EntityDef>, relations: Vec<Relation>) -> CatalogResult<Self> {
        let mut by_name = BTreeMap::new();
        for def in entities {
            if by_name.contains_key(&def.name) {
                return Err(CatalogError::duplicate_entity(def.name.as_str()));
            }
            by_name.insert(def.name.clone(), def);
        }

        // Union-find over entity names; a relation joining two nodes already
        // in the same component closes a cycle.
        let names: Vec<&EntityType> = by_name.keys().collect();
        let index: HashMap<&EntityType, usize> =
            names.iter().enumerate().map(|(i, n)| (*n, i)).collect();
        let mut parent: Vec<usize> = (0..names.len()).collect();

        fn find(parent: &mut [usize], mut i: usize) -> usize {
            while parent[i] != i {
                parent[i] = parent[parent[i]];
                i = parent[i];
            }
            i
        }

        let mut adjacency: HashMap<EntityType, Vec<usize>> = HashMap::new();
        for (rel_idx, relation) in relations.iter().enumerate() {
            let referenced_by = format!("relation {} -> {}", relation.from, relation.to);
            let from = *index
                .get(&relation.from)
                .ok_or_else(|| CatalogError::unknown_entity(relation.from.as_str(), &referenced_by))?;
            let to = *index
                .get(&relation.to)
                .ok_or_else(|| CatalogError::unknown_entity(relation.to.as_str(), &referenced_by))?;

            let root_from = find(&mut parent, from);
            let root_to = find(&mut parent, to);
            if root_from == root_to {
                return Err(CatalogError::relation_cycle(
                    relation.from.as_str(),
                    relation.to.as_str(),
                ));
            }
            parent[root_from] = root_to;

            adjacency
                .entry(relation.from.clone())
                .or_default()
                .push(rel_idx);
            adjacency
                .entry(relation.to.clone())
                .or_default()
                .push(rel_idx);
        }

        Ok(Self {
            entities: by_name,
            relations,
            adjacency,
        })
    }

    /// Returns the entity definition
    pub fn entity(&self, entity: &str) -> Option<&EntityDef> {
        self.entities.get(entity)
    }

    /// Returns true if the entity type is defined
    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    /// All entity definitions, ordered by name
    pub fn entities(&self) -> impl Iterator<Item = &EntityDef> {
        self.entities.values()
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }

    /// Primary key field of an entity (`id` if the entity is unknown)
    pub fn primary_key(&self, entity: &str) -> &str {
        self.entities
            .get(entity)
            .map(|d| d.primary_key.as_str())
            .unwrap_or("id")
    }

    /// Finds the unique join path from `from` to `to`.
    ///
    /// Returns an empty path when both are the same entity and `None` when
    /// they live in disconnected components.
    pub fn path(&self, from: &EntityType, to: &EntityType) -> Option<JoinPath> {
        if !self.contains(from.as_str()) || !self.contains(to.as_str()) {
            return None;
        }
        if from == to {
            return Some(JoinPath::default());
        }

        let mut came_from: HashMap<EntityType, JoinStep> = HashMap::new();
        let mut queue = VecDeque::new();
        queue.push_back(from.clone());

        while let Some(current) = queue.pop_front() {
            if &current == to {
                break;
            }
            let Some(edges) = self.adjacency.get(&current) else {
                continue;
            };
            for &rel_idx in edges {
                let relation = &self.relations[rel_idx];
                let step = if relation.from == current {
                    JoinStep::forward(relation)
                } else {
                    JoinStep::backward(relation)
                };
                if &step.to == from || came_from.contains_key(&step.to) {
                    continue;
                }
                queue.push_back(step.to.clone());
                came_from.insert(step.to.clone(), step);
            }
        }

        let mut steps = Vec::new();
        let mut cursor = to.clone();
        while &cursor != from {
            let step = came_from.get(&cursor)?.clone();
            cursor = step.from.clone();
            steps.push(step);
        }
        steps.reverse();
        Some(JoinPath { steps })
    }

    /// Fan-out key of `target` relative to `root`
    pub fn fan_out_key(&self, root: &EntityType, target: &EntityType) -> Option<FanOutKey> {
        self.path(root, target).map(|p| p.fan_out_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::Cardinality;

    fn rel(from: &str, to: &str, fk: &str, cardinality: Cardinality) -> Relation {
        Relation {
            from: from.into(),
            from_field: "id".into(),
            to: to.into(),
            to_field: fk.into(),
            cardinality,
        }
    }

    fn sample_graph() -> EntityGraph {
        EntityGraph::build(
            vec![
                EntityDef::new("Campaign"),
                EntityDef::new("Iteration"),
                EntityDef::new("Item"),
                EntityDef::new("TestCase"),
            ],
            vec![
                rel("Campaign", "Iteration", "campaign_id", Cardinality::OneToMany),
                rel("Iteration", "Item", "iteration_id", Cardinality::OneToMany),
                rel("TestCase", "Item", "test_case_id", Cardinality::OneToMany),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_path_forward_fans_out() {
        let graph = sample_graph();
        let path = graph.path(&"Campaign".into(), &"Item".into()).unwrap();
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.fan_out_key().depth(), 2);
    }

    #[test]
    fn test_path_backward_does_not_fan_out() {
        let graph = sample_graph();
        let path = graph.path(&"Item".into(), &"Campaign".into()).unwrap();
        assert_eq!(path.steps.len(), 2);
        assert!(path.fan_out_key().is_root());
        assert_eq!(path.steps[0].from_field, "iteration_id");
        assert_eq!(path.steps[0].to_field, "id");
    }

    #[test]
    fn test_path_mixed_direction() {
        let graph = sample_graph();
        let path = graph.path(&"TestCase".into(), &"Campaign".into()).unwrap();
        let entities: Vec<&str> = path.entities().map(|e| e.as_str()).collect();
        assert_eq!(entities, vec!["Item", "Iteration", "Campaign"]);
        assert_eq!(path.fan_out_key().depth(), 1);
    }

    #[test]
    fn test_same_entity_path_is_empty() {
        let graph = sample_graph();
        let path = graph.path(&"Campaign".into(), &"Campaign".into()).unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn test_unknown_entity_has_no_path() {
        let graph = sample_graph();
        assert!(graph.path(&"Campaign".into(), &"Nope".into()).is_none());
    }

    #[test]
    fn test_cycle_rejected() {
        let result = EntityGraph::build(
            vec![EntityDef::new("A"), EntityDef::new("B"), EntityDef::new("C")],
            vec![
                rel("A", "B", "a_id", Cardinality::OneToMany),
                rel("B", "C", "b_id", Cardinality::OneToMany),
                rel("C", "A", "c_id", Cardinality::OneToMany),
            ],
        );
        let err = result.unwrap_err();
        assert_eq!(err.code().code(), "CHART_CATALOG_RELATION_CYCLE");
    }

    #[test]
    fn test_dangling_relation_rejected() {
        let result = EntityGraph::build(
            vec![EntityDef::new("A")],
            vec![rel("A", "Ghost", "a_id", Cardinality::OneToMany)],
        );
        assert_eq!(
            result.unwrap_err().code().code(),
            "CHART_CATALOG_UNKNOWN_ENTITY"
        );
    }

    #[test]
    fn test_fan_out_key_ordering_by_depth_first() {
        let graph = sample_graph();
        let shallow = graph.fan_out_key(&"Campaign".into(), &"Iteration".into()).unwrap();
        let deep = graph.fan_out_key(&"Campaign".into(), &"Item".into()).unwrap();
        assert!(FanOutKey::default() < shallow);
        assert!(shallow < deep);
        assert_eq!(deep.to_string(), "Campaign>Iteration,Iteration>Item");
    }
}
