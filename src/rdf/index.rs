//! Physical triple index
//!
//! The store decides *what* is present; an [`Indexer`] answers *where*. It
//! is told about every node activation and retype and every per-graph
//! membership change, and it answers the fixed-slot pattern queries.
//!
//! [`MemoryIndexer`] keeps one hash index per slot (subject, predicate,
//! object, graph) and resolves a pattern by scanning the smallest bucket
//! among the constrained slots.

use super::query::Pattern;
use super::types::{NodeId, RdfTerm, RdfType, TripleId, TripleKey};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;

/// What the indexer is told about a node
#[derive(Debug, Clone, Copy)]
pub struct NodeDescriptor<'a> {
    pub id: NodeId,
    pub term: &'a RdfTerm,
    pub ty: RdfType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChange {
    Activated,
    Retyped { from: RdfType },
    Retired,
}

/// Outcome reported for each triple touched by [`Indexer::delete_triples`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Dropped from this graph; other memberships may remain
    FromGraph(NodeId),
    /// Last membership gone, the triple is no longer indexed
    Fully,
}

pub trait Indexer: Send + Sync {
    /// Node activation, public retype, or retirement
    fn index_node(&mut self, node: NodeDescriptor<'_>, change: NodeChange);

    fn contains_triple(&self, triple: TripleId) -> bool;

    /// First membership of a triple that was not indexed
    fn add(&mut self, triple: TripleId, key: TripleKey, graph: NodeId);

    /// Further membership of an indexed triple
    fn add_in_named_graph(&mut self, triple: TripleId, graph: NodeId);

    /// Drop one membership; the triple stays indexed while others remain
    fn delete_from_named_graph(&mut self, triple: TripleId, graph: NodeId);

    /// Drop the triple and all its memberships
    fn delete(&mut self, triple: TripleId);

    /// Matching triples, each reported once regardless of graph count
    fn find_triples(&self, pattern: &Pattern) -> Vec<TripleId>;

    /// Active nodes of a public type
    fn find(&self, ty: RdfType) -> Vec<NodeId>;

    fn find_in_namespace(&self, ty: RdfType, namespace: &str) -> Vec<NodeId>;

    /// Namespace parts of every active schema-typed resource
    fn namespaces(&self) -> Vec<String>;

    fn triple_count(&self) -> usize;

    /// Remove every membership matching `pattern`. With the graph slot pinned
    /// only that membership goes. `on_removed` sees one `FromGraph` per
    /// dropped membership and a final `Fully` when nothing is left.
    fn delete_triples(&mut self, pattern: &Pattern, on_removed: &mut dyn FnMut(TripleId, Removal));
}

#[derive(Debug, Clone)]
struct IndexedNode {
    ty: RdfType,
    namespace: Option<String>,
}

#[derive(Debug, Clone)]
struct IndexedTriple {
    key: TripleKey,
    graphs: Vec<NodeId>,
}

/// In-memory hash indexer
#[derive(Debug, Clone, Default)]
pub struct MemoryIndexer {
    triples: FxHashMap<TripleId, IndexedTriple>,

    by_subject: FxHashMap<NodeId, FxHashSet<TripleId>>,
    by_predicate: FxHashMap<NodeId, FxHashSet<TripleId>>,
    by_object: FxHashMap<NodeId, FxHashSet<TripleId>>,
    by_graph: FxHashMap<NodeId, FxHashSet<TripleId>>,

    nodes: FxHashMap<NodeId, IndexedNode>,
    by_type: FxHashMap<RdfType, FxHashSet<NodeId>>,
}

impl MemoryIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert_into(index: &mut FxHashMap<NodeId, FxHashSet<TripleId>>, node: NodeId, triple: TripleId) {
        index.entry(node).or_default().insert(triple);
    }

    fn remove_from(index: &mut FxHashMap<NodeId, FxHashSet<TripleId>>, node: NodeId, triple: TripleId) {
        if let Some(bucket) = index.get_mut(&node) {
            bucket.remove(&triple);
            if bucket.is_empty() {
                index.remove(&node);
            }
        }
    }

    /// Smallest candidate bucket among the constrained slots
    fn candidates(&self, pattern: &Pattern) -> Option<Vec<TripleId>> {
        let constrained = [
            pattern.subject.map(|n| self.by_subject.get(&n)),
            pattern.predicate.map(|n| self.by_predicate.get(&n)),
            pattern.object.map(|n| self.by_object.get(&n)),
            pattern.graph.map(|n| self.by_graph.get(&n)),
        ];

        let mut best: Option<&FxHashSet<TripleId>> = None;
        for slot in constrained.into_iter().flatten() {
            // a constrained slot with no bucket matches nothing
            let bucket = slot?;
            if best.map_or(true, |b| bucket.len() < b.len()) {
                best = Some(bucket);
            }
        }
        Some(match best {
            Some(bucket) => bucket.iter().copied().collect(),
            None => self.triples.keys().copied().collect(),
        })
    }

    fn matching(&self, pattern: &Pattern) -> Vec<TripleId> {
        let Some(candidates) = self.candidates(pattern) else {
            return Vec::new();
        };
        let mut found: Vec<TripleId> = candidates
            .into_iter()
            .filter(|id| {
                self.triples
                    .get(id)
                    .is_some_and(|t| pattern.matches(&t.key, &t.graphs))
            })
            .collect();
        found.sort_unstable();
        found
    }

    fn untype(&mut self, node: NodeId, ty: RdfType) {
        if let Some(bucket) = self.by_type.get_mut(&ty) {
            bucket.remove(&node);
            if bucket.is_empty() {
                self.by_type.remove(&ty);
            }
        }
    }
}

impl Indexer for MemoryIndexer {
    fn index_node(&mut self, node: NodeDescriptor<'_>, change: NodeChange) {
        match change {
            NodeChange::Activated => {
                let namespace = node
                    .term
                    .as_named_node()
                    .map(|n| n.namespace().to_string());
                self.nodes.insert(
                    node.id,
                    IndexedNode {
                        ty: node.ty,
                        namespace,
                    },
                );
                self.by_type.entry(node.ty).or_default().insert(node.id);
            }
            NodeChange::Retyped { from } => {
                let Some(entry) = self.nodes.get_mut(&node.id) else {
                    return;
                };
                entry.ty = node.ty;
                self.untype(node.id, from);
                self.by_type.entry(node.ty).or_default().insert(node.id);
            }
            NodeChange::Retired => {
                if let Some(entry) = self.nodes.remove(&node.id) {
                    self.untype(node.id, entry.ty);
                }
            }
        }
    }

    fn contains_triple(&self, triple: TripleId) -> bool {
        self.triples.contains_key(&triple)
    }

    fn add(&mut self, triple: TripleId, key: TripleKey, graph: NodeId) {
        Self::insert_into(&mut self.by_subject, key.subject, triple);
        Self::insert_into(&mut self.by_predicate, key.predicate, triple);
        Self::insert_into(&mut self.by_object, key.object, triple);
        Self::insert_into(&mut self.by_graph, graph, triple);
        self.triples.insert(
            triple,
            IndexedTriple {
                key,
                graphs: vec![graph],
            },
        );
    }

    fn add_in_named_graph(&mut self, triple: TripleId, graph: NodeId) {
        let Some(entry) = self.triples.get_mut(&triple) else {
            return;
        };
        if !entry.graphs.contains(&graph) {
            entry.graphs.push(graph);
            Self::insert_into(&mut self.by_graph, graph, triple);
        }
    }

    fn delete_from_named_graph(&mut self, triple: TripleId, graph: NodeId) {
        let Some(entry) = self.triples.get_mut(&triple) else {
            return;
        };
        entry.graphs.retain(|&g| g != graph);
        Self::remove_from(&mut self.by_graph, graph, triple);
        if entry.graphs.is_empty() {
            self.delete(triple);
        }
    }

    fn delete(&mut self, triple: TripleId) {
        let Some(entry) = self.triples.remove(&triple) else {
            return;
        };
        Self::remove_from(&mut self.by_subject, entry.key.subject, triple);
        Self::remove_from(&mut self.by_predicate, entry.key.predicate, triple);
        Self::remove_from(&mut self.by_object, entry.key.object, triple);
        for graph in entry.graphs {
            Self::remove_from(&mut self.by_graph, graph, triple);
        }
    }

    fn find_triples(&self, pattern: &Pattern) -> Vec<TripleId> {
        self.matching(pattern)
    }

    fn find(&self, ty: RdfType) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .by_type
            .get(&ty)
            .map(|bucket| bucket.iter().copied().collect())
            .unwrap_or_default();
        nodes.sort_unstable();
        nodes
    }

    fn find_in_namespace(&self, ty: RdfType, namespace: &str) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .by_type
            .get(&ty)
            .into_iter()
            .flatten()
            .copied()
            .filter(|id| {
                self.nodes
                    .get(id)
                    .and_then(|n| n.namespace.as_deref())
                    .is_some_and(|ns| ns == namespace)
            })
            .collect();
        nodes.sort_unstable();
        nodes
    }

    fn namespaces(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.ty.is_schema())
            .filter_map(|n| n.namespace.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    fn triple_count(&self) -> usize {
        self.triples.len()
    }

    fn delete_triples(&mut self, pattern: &Pattern, on_removed: &mut dyn FnMut(TripleId, Removal)) {
        for triple in self.matching(pattern) {
            let graphs = match pattern.graph {
                Some(graph) => vec![graph],
                None => self
                    .triples
                    .get(&triple)
                    .map(|t| t.graphs.clone())
                    .unwrap_or_default(),
            };
            for graph in graphs {
                self.delete_from_named_graph(triple, graph);
                on_removed(triple, Removal::FromGraph(graph));
            }
            if !self.triples.contains_key(&triple) {
                on_removed(triple, Removal::Fully);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::types::{NamedNode, StoreId};

    fn n(i: u32) -> NodeId {
        NodeId::new(StoreId(0), i)
    }

    fn t(i: u32) -> TripleId {
        TripleId::new(StoreId(0), i)
    }

    #[test]
    fn test_pattern_lookup() {
        let mut index = MemoryIndexer::new();
        index.add(t(0), TripleKey::new(n(1), n(2), n(3)), n(10));
        index.add(t(1), TripleKey::new(n(1), n(2), n(4)), n(10));
        index.add(t(2), TripleKey::new(n(5), n(2), n(3)), n(11));
        index.add_in_named_graph(t(0), n(11));

        let by_subject = Pattern {
            subject: Some(n(1)),
            ..Pattern::any()
        };
        assert_eq!(index.find_triples(&by_subject), vec![t(0), t(1)]);

        let by_object_and_graph = Pattern {
            object: Some(n(3)),
            graph: Some(n(11)),
            ..Pattern::any()
        };
        assert_eq!(index.find_triples(&by_object_and_graph), vec![t(0), t(2)]);

        // t(0) lives in two graphs but is reported once
        assert_eq!(index.find_triples(&Pattern::any()).len(), 3);
        assert_eq!(index.triple_count(), 3);

        let nothing = Pattern {
            subject: Some(n(99)),
            ..Pattern::any()
        };
        assert!(index.find_triples(&nothing).is_empty());
    }

    #[test]
    fn test_delete_triples_reports_each_membership() {
        let mut index = MemoryIndexer::new();
        index.add(t(0), TripleKey::new(n(1), n(2), n(3)), n(10));
        index.add_in_named_graph(t(0), n(11));
        index.add(t(1), TripleKey::new(n(1), n(2), n(4)), n(10));

        let mut removed = Vec::new();
        let in_g10 = Pattern {
            graph: Some(n(10)),
            ..Pattern::any()
        };
        index.delete_triples(&in_g10, &mut |id: TripleId, removal: Removal| {
            removed.push((id, removal))
        });

        assert_eq!(
            removed,
            vec![
                (t(0), Removal::FromGraph(n(10))),
                (t(1), Removal::FromGraph(n(10))),
                (t(1), Removal::Fully),
            ]
        );
        assert!(index.contains_triple(t(0)));
        assert!(!index.contains_triple(t(1)));
    }

    #[test]
    fn test_node_type_index() {
        let mut index = MemoryIndexer::new();
        let person: RdfTerm = NamedNode::new("http://example.org/vocab#Person").unwrap().into();
        let alice: RdfTerm = NamedNode::new("http://example.org/people/alice").unwrap().into();

        index.index_node(
            NodeDescriptor { id: n(1), term: &person, ty: RdfType::Unknown },
            NodeChange::Activated,
        );
        index.index_node(
            NodeDescriptor { id: n(2), term: &alice, ty: RdfType::Individual },
            NodeChange::Activated,
        );
        assert!(index.namespaces().is_empty());

        index.index_node(
            NodeDescriptor { id: n(1), term: &person, ty: RdfType::Class },
            NodeChange::Retyped { from: RdfType::Unknown },
        );
        assert_eq!(index.find(RdfType::Class), vec![n(1)]);
        assert!(index.find(RdfType::Unknown).is_empty());
        assert_eq!(index.namespaces(), vec!["http://example.org/vocab#".to_string()]);
        assert_eq!(
            index.find_in_namespace(RdfType::Class, "http://example.org/vocab#"),
            vec![n(1)]
        );

        index.index_node(
            NodeDescriptor { id: n(1), term: &person, ty: RdfType::Class },
            NodeChange::Retired,
        );
        assert!(index.find(RdfType::Class).is_empty());
        assert!(index.namespaces().is_empty());
    }
}
