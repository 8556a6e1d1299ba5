//! Hierarchy reachability
//!
//! [`HierarchyGraph`] is the generic transitive closure over one hierarchy
//! predicate (subClassOf or subPropertyOf), built on the interval-labelled
//! [`Reachability`] of the graph-algorithms crate. A [`LabelManager`] is an
//! optional oracle a store can carry so ancestor queries skip the rebuild;
//! [`IntervalLabels`] is the in-crate one.

use super::store::TripleStore;
use super::types::{NodeId, StoreId, TripleKey};
use samyama_graph_algorithms::{GraphView, Reachability};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Transitive hierarchy predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hierarchy {
    /// rdfs:subClassOf
    Class,
    /// rdfs:subPropertyOf
    Property,
}

impl fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Hierarchy::Class => f.write_str("subClassOf"),
            Hierarchy::Property => f.write_str("subPropertyOf"),
        }
    }
}

/// Closure over `child -> parent` edges of one hierarchy
#[derive(Debug, Clone)]
pub struct HierarchyGraph {
    view: GraphView,
    reach: Reachability,
}

impl HierarchyGraph {
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let edges: Vec<(u64, u64)> = edges
            .into_iter()
            .map(|(child, parent)| (child.as_u64(), parent.as_u64()))
            .collect();
        let nodes: Vec<u64> = edges
            .iter()
            .flat_map(|&(a, b)| [a, b])
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let view = GraphView::from_edges(nodes, edges);
        let reach = Reachability::new(&view);
        Self { view, reach }
    }

    pub fn node_count(&self) -> usize {
        self.view.node_count
    }

    /// `from` equals `to` or reaches it through one or more edges
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        if from == to {
            return true;
        }
        match (self.index(from), self.index(to)) {
            (Some(a), Some(b)) => self.reach.reaches(a, b),
            _ => false,
        }
    }

    /// `from` reaches `to` through at least one edge
    pub fn reaches_strictly(&self, from: NodeId, to: NodeId) -> bool {
        match (self.index(from), self.index(to)) {
            (Some(a), Some(b)) => self.reach.reaches_strictly(a, b),
            _ => false,
        }
    }

    pub fn same_component(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        match (self.index(a), self.index(b)) {
            (Some(x), Some(y)) => self.reach.same_component(x, y),
            _ => false,
        }
    }

    /// Every node `node` reaches through at least one edge
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let Some(index) = self.index(node) else {
            return Vec::new();
        };
        self.reach
            .descendants(index)
            .into_iter()
            .map(|i| NodeId::from_u64(self.view.node_of(i)))
            .collect()
    }

    fn index(&self, node: NodeId) -> Option<usize> {
        self.view.index_of(node.as_u64())
    }
}

/// Ancestor oracle attached to one store
pub trait LabelManager: Send + Sync {
    /// Store the labels were computed for, once computed
    fn target_store(&self) -> Option<StoreId>;

    /// Labels reflect the current hierarchy triples
    fn labels_available(&self) -> bool;

    /// `descendant` reaches `ancestor` in `hierarchy` (reflexive)
    fn is_ancestor(&self, hierarchy: Hierarchy, ancestor: NodeId, descendant: NodeId) -> bool;

    /// Recompute from the store's hierarchy triples
    fn update_labels(&mut self, store: &TripleStore);

    fn triple_added(&mut self, hierarchy: Hierarchy, key: &TripleKey);

    fn triple_deleted(&mut self, hierarchy: Hierarchy, key: &TripleKey);
}

/// Interval labels over both hierarchies
#[derive(Debug, Clone, Default)]
pub struct IntervalLabels {
    store: Option<StoreId>,
    classes: Option<HierarchyGraph>,
    properties: Option<HierarchyGraph>,
    stale: bool,
}

impl IntervalLabels {
    pub fn new() -> Self {
        Self::default()
    }

    fn graph(&self, hierarchy: Hierarchy) -> Option<&HierarchyGraph> {
        match hierarchy {
            Hierarchy::Class => self.classes.as_ref(),
            Hierarchy::Property => self.properties.as_ref(),
        }
    }
}

impl LabelManager for IntervalLabels {
    fn target_store(&self) -> Option<StoreId> {
        self.store
    }

    fn labels_available(&self) -> bool {
        !self.stale && self.classes.is_some() && self.properties.is_some()
    }

    fn is_ancestor(&self, hierarchy: Hierarchy, ancestor: NodeId, descendant: NodeId) -> bool {
        self.graph(hierarchy)
            .is_some_and(|graph| graph.reaches(descendant, ancestor))
    }

    fn update_labels(&mut self, store: &TripleStore) {
        let classes = HierarchyGraph::from_edges(store.hierarchy_edges(Hierarchy::Class));
        let properties = HierarchyGraph::from_edges(store.hierarchy_edges(Hierarchy::Property));
        debug!(
            store = %store.id(),
            classes = classes.node_count(),
            properties = properties.node_count(),
            "interval labels rebuilt"
        );
        self.store = Some(store.id());
        self.classes = Some(classes);
        self.properties = Some(properties);
        self.stale = false;
    }

    fn triple_added(&mut self, hierarchy: Hierarchy, key: &TripleKey) {
        // an edge the closure already implies changes nothing
        if !self.is_ancestor(hierarchy, key.object, key.subject) {
            self.stale = true;
        }
    }

    fn triple_deleted(&mut self, _hierarchy: Hierarchy, _key: &TripleKey) {
        self.stale = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(i: u32) -> NodeId {
        NodeId::new(StoreId(1), i)
    }

    #[test]
    fn test_chain_reachability() {
        let graph = HierarchyGraph::from_edges([(n(0), n(1)), (n(1), n(2))]);
        assert!(graph.reaches(n(0), n(2)));
        assert!(!graph.reaches(n(2), n(0)));
        assert!(graph.reaches(n(5), n(5)));
        assert!(!graph.reaches_strictly(n(0), n(0)));
        assert_eq!(graph.ancestors(n(0)), vec![n(1), n(2)]);
        assert!(graph.ancestors(n(2)).is_empty());
    }

    #[test]
    fn test_cycle_members_share_component() {
        let graph = HierarchyGraph::from_edges([(n(0), n(1)), (n(1), n(0)), (n(1), n(2))]);
        assert!(graph.same_component(n(0), n(1)));
        assert!(!graph.same_component(n(1), n(2)));
        assert!(graph.reaches_strictly(n(0), n(0)));
        assert_eq!(graph.ancestors(n(0)), vec![n(0), n(1), n(2)]);
    }
}
