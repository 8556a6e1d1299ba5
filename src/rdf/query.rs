//! Fixed-slot triple patterns and the fluent builders over them
//!
//! A [`Pattern`] constrains any of the four slots (graph, subject, predicate,
//! object) to one node. Builders check each constraint when it is made: a
//! slot may only be pinned once, and only to a node the store owns.

use super::store::{StoreResult, TripleStore};
use super::types::{NodeId, StoreId, TripleId, TripleKey};
use std::fmt;
use thiserror::Error;

/// Pattern slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Graph,
    Subject,
    Predicate,
    Object,
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Slot::Graph => "graph",
            Slot::Subject => "subject",
            Slot::Predicate => "predicate",
            Slot::Object => "object",
        };
        f.write_str(name)
    }
}

/// Builder misuse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("{0} is already constrained")]
    DuplicateSlot(Slot),

    #[error("{node} in the {slot} slot belongs to another store")]
    ForeignNode { slot: Slot, node: NodeId },

    #[error("no {0} given")]
    MissingSlot(Slot),
}

pub type QueryResult<T> = Result<T, QueryError>;

/// At most one node per slot; an empty slot matches anything
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Pattern {
    pub graph: Option<NodeId>,
    pub subject: Option<NodeId>,
    pub predicate: Option<NodeId>,
    pub object: Option<NodeId>,
}

impl Pattern {
    /// Pattern matching every triple
    pub fn any() -> Self {
        Self::default()
    }

    pub fn matches_key(&self, key: &TripleKey) -> bool {
        self.subject.map_or(true, |s| s == key.subject)
            && self.predicate.map_or(true, |p| p == key.predicate)
            && self.object.map_or(true, |o| o == key.object)
    }

    pub fn matches(&self, key: &TripleKey, graphs: &[NodeId]) -> bool {
        self.matches_key(key) && self.graph.map_or(true, |g| graphs.contains(&g))
    }

    fn slot(&mut self, slot: Slot) -> &mut Option<NodeId> {
        match slot {
            Slot::Graph => &mut self.graph,
            Slot::Subject => &mut self.subject,
            Slot::Predicate => &mut self.predicate,
            Slot::Object => &mut self.object,
        }
    }

    /// Pin `slot` to `node`, refusing a second constraint on the same slot
    fn pin(&mut self, owner: StoreId, slot: Slot, node: NodeId) -> QueryResult<()> {
        if node.store != owner {
            return Err(QueryError::ForeignNode { slot, node });
        }
        let entry = self.slot(slot);
        if entry.is_some() {
            return Err(QueryError::DuplicateSlot(slot));
        }
        *entry = Some(node);
        Ok(())
    }
}

/// Fluent pattern construction against one store
///
/// ```rust
/// use samyama_rdfs::rdf::TripleStore;
///
/// let mut store = TripleStore::new();
/// let alice = store.uri("http://example.org/alice").unwrap();
/// let knows = store.uri("http://example.org/knows").unwrap();
/// let bob = store.uri("http://example.org/bob").unwrap();
/// store.add(None, alice, knows, bob).unwrap();
///
/// let found = store.pattern().subject(alice).unwrap().find();
/// assert_eq!(found.len(), 1);
/// ```
#[derive(Debug)]
pub struct PatternBuilder<'s> {
    store: &'s TripleStore,
    pattern: Pattern,
}

impl<'s> PatternBuilder<'s> {
    pub(crate) fn new(store: &'s TripleStore) -> Self {
        Self {
            store,
            pattern: Pattern::any(),
        }
    }

    pub fn graph(self, graph: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Graph, graph)
    }

    pub fn subject(self, subject: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Subject, subject)
    }

    pub fn predicate(self, predicate: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Predicate, predicate)
    }

    pub fn object(self, object: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Object, object)
    }

    pub fn build(self) -> Pattern {
        self.pattern
    }

    /// Matching triples, each reported once
    pub fn find(self) -> Vec<TripleId> {
        self.store.find(&self.pattern)
    }

    pub fn exists(self) -> bool {
        !self.store.find(&self.pattern).is_empty()
    }

    fn constrain(mut self, slot: Slot, node: NodeId) -> QueryResult<Self> {
        if !self.store.owns(node) {
            return Err(QueryError::ForeignNode { slot, node });
        }
        self.pattern.pin(self.store.id(), slot, node)?;
        Ok(self)
    }
}

/// Fluent triple insertion
///
/// ```rust
/// use samyama_rdfs::rdf::TripleStore;
///
/// let mut store = TripleStore::new();
/// let s = store.uri("http://example.org/s").unwrap();
/// let p = store.uri("http://example.org/p").unwrap();
/// let o = store.uri("http://example.org/o").unwrap();
/// let g = store.uri("http://example.org/g").unwrap();
///
/// let id = store.adder()
///     .graph(g).unwrap()
///     .subject(s).unwrap()
///     .predicate(p).unwrap()
///     .object(o).unwrap()
///     .add()
///     .unwrap();
/// assert!(store.graphs_of(id).contains(&g));
/// ```
#[derive(Debug)]
pub struct TripleAdder<'s> {
    store: &'s mut TripleStore,
    pattern: Pattern,
}

impl<'s> TripleAdder<'s> {
    pub(crate) fn new(store: &'s mut TripleStore) -> Self {
        Self {
            store,
            pattern: Pattern::any(),
        }
    }

    pub fn graph(self, graph: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Graph, graph)
    }

    pub fn subject(self, subject: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Subject, subject)
    }

    pub fn predicate(self, predicate: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Predicate, predicate)
    }

    pub fn object(self, object: NodeId) -> QueryResult<Self> {
        self.constrain(Slot::Object, object)
    }

    /// Add the triple to the pinned graph, or to the default graph
    pub fn add(self) -> StoreResult<TripleId> {
        let Pattern {
            graph,
            subject,
            predicate,
            object,
        } = self.pattern;
        let subject = subject.ok_or(QueryError::MissingSlot(Slot::Subject))?;
        let predicate = predicate.ok_or(QueryError::MissingSlot(Slot::Predicate))?;
        let object = object.ok_or(QueryError::MissingSlot(Slot::Object))?;
        self.store.add(graph, subject, predicate, object)
    }

    fn constrain(mut self, slot: Slot, node: NodeId) -> QueryResult<Self> {
        if !self.store.owns(node) {
            return Err(QueryError::ForeignNode { slot, node });
        }
        let owner = self.store.id();
        self.pattern.pin(owner, slot, node)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_matching() {
        let store = StoreId(3);
        let n = |i| NodeId::new(store, i);
        let key = TripleKey::new(n(0), n(1), n(2));

        let mut pattern = Pattern::any();
        assert!(pattern.matches(&key, &[n(9)]));

        pattern.pin(store, Slot::Predicate, n(1)).unwrap();
        assert!(pattern.matches(&key, &[n(9)]));

        pattern.pin(store, Slot::Graph, n(8)).unwrap();
        assert!(!pattern.matches(&key, &[n(9)]));
        assert!(pattern.matches(&key, &[n(8), n(9)]));
    }

    #[test]
    fn test_pin_rejects_misuse() {
        let mut pattern = Pattern::any();
        let node = NodeId::new(StoreId(1), 0);
        pattern.pin(StoreId(1), Slot::Subject, node).unwrap();
        assert_eq!(
            pattern.pin(StoreId(1), Slot::Subject, node),
            Err(QueryError::DuplicateSlot(Slot::Subject))
        );
        assert_eq!(
            pattern.pin(StoreId(2), Slot::Object, node),
            Err(QueryError::ForeignNode {
                slot: Slot::Object,
                node
            })
        );
    }
}
