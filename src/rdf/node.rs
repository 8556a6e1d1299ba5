//! Canonical value → node mapping
//!
//! A store mints exactly one node per distinct URI, blank-node id or literal.
//! Nodes are never evicted: a retired node (no triple references it any more)
//! keeps its handle and its type slot so an externally held [`NodeId`] stays
//! usable, at the cost of retaining every value ever mapped.

use super::typing::InternalType;
use super::types::{NodeId, NodeKind, RdfTerm, StoreId};
use indexmap::IndexSet;

/// How a reference-count update changed a node's visibility
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// 0 → 1
    Activated,
    /// 1 → 0
    Retired,
    Unchanged,
}

#[derive(Debug, Clone)]
struct NodeState {
    ty: InternalType,
    refs: u32,
}

/// Arena of nodes for one store
#[derive(Debug, Clone)]
pub struct NodeStore {
    owner: StoreId,
    /// Term ↔ arena index bijection
    terms: IndexSet<RdfTerm>,
    states: Vec<NodeState>,
    active: usize,
}

impl NodeStore {
    pub fn new(owner: StoreId) -> Self {
        Self {
            owner,
            terms: IndexSet::new(),
            states: Vec::new(),
            active: 0,
        }
    }

    /// Node for `term`, minting it on first use
    pub fn map(&mut self, term: RdfTerm) -> NodeId {
        if let Some(index) = self.terms.get_index_of(&term) {
            return self.handle(index);
        }
        let ty = InternalType::default_for(&term);
        let (index, _) = self.terms.insert_full(term);
        self.states.push(NodeState { ty, refs: 0 });
        self.handle(index)
    }

    /// Node for `term` if it was ever mapped
    pub fn lookup(&self, term: &RdfTerm) -> Option<NodeId> {
        self.terms.get_index_of(term).map(|index| self.handle(index))
    }

    /// Whether `node` was minted by this store
    pub fn owns(&self, node: NodeId) -> bool {
        node.store == self.owner && (node.index as usize) < self.states.len()
    }

    pub fn term(&self, node: NodeId) -> &RdfTerm {
        &self.terms[node.index as usize]
    }

    pub fn kind(&self, node: NodeId) -> NodeKind {
        self.term(node).kind()
    }

    pub fn internal_type(&self, node: NodeId) -> InternalType {
        self.states[node.index as usize].ty
    }

    pub fn set_internal_type(&mut self, node: NodeId, ty: InternalType) {
        self.states[node.index as usize].ty = ty;
    }

    /// Put a node back to the type it was minted with
    pub fn reset_type(&mut self, node: NodeId) -> InternalType {
        let ty = InternalType::default_for(&self.terms[node.index as usize]);
        self.states[node.index as usize].ty = ty;
        ty
    }

    pub fn refs(&self, node: NodeId) -> u32 {
        self.states[node.index as usize].refs
    }

    pub fn is_active(&self, node: NodeId) -> bool {
        self.refs(node) > 0
    }

    pub fn acquire(&mut self, node: NodeId) -> Activation {
        let state = &mut self.states[node.index as usize];
        state.refs += 1;
        if state.refs == 1 {
            self.active += 1;
            Activation::Activated
        } else {
            Activation::Unchanged
        }
    }

    pub fn release(&mut self, node: NodeId) -> Activation {
        let state = &mut self.states[node.index as usize];
        debug_assert!(state.refs > 0, "release of unreferenced node");
        state.refs = state.refs.saturating_sub(1);
        if state.refs == 0 {
            self.active -= 1;
            Activation::Retired
        } else {
            Activation::Unchanged
        }
    }

    /// Nodes referenced by at least one triple
    pub fn active(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, state)| state.refs > 0)
            .map(|(index, _)| self.handle(index))
    }

    pub fn active_count(&self) -> usize {
        self.active
    }

    /// Every node ever minted, active or not
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    fn handle(&self, index: usize) -> NodeId {
        NodeId::new(self.owner, index as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::types::{BlankNode, Literal, NamedNode};

    fn uri(iri: &str) -> RdfTerm {
        NamedNode::new(iri).unwrap().into()
    }

    #[test]
    fn test_mapping_is_idempotent() {
        let mut nodes = NodeStore::new(StoreId(1));
        let a = nodes.map(uri("http://example.org/a"));
        let a2 = nodes.map(uri("http://example.org/a"));
        assert_eq!(a, a2);

        let lit = nodes.map(Literal::new_language_tagged_literal("chat", "fr").unwrap().into());
        let lit2 = nodes.map(Literal::new_language_tagged_literal("chat", "fr").unwrap().into());
        let other = nodes.map(Literal::new_language_tagged_literal("chat", "en").unwrap().into());
        assert_eq!(lit, lit2);
        assert_ne!(lit, other);

        let b = nodes.map(BlankNode::from_id("b0").unwrap().into());
        assert_eq!(Some(b), nodes.lookup(&BlankNode::from_id("b0").unwrap().into()));
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn test_reference_counting() {
        let mut nodes = NodeStore::new(StoreId(1));
        let a = nodes.map(uri("http://example.org/a"));
        assert!(!nodes.is_active(a));

        assert_eq!(nodes.acquire(a), Activation::Activated);
        assert_eq!(nodes.acquire(a), Activation::Unchanged);
        assert_eq!(nodes.active().collect::<Vec<_>>(), vec![a]);

        assert_eq!(nodes.release(a), Activation::Unchanged);
        assert_eq!(nodes.release(a), Activation::Retired);
        assert_eq!(nodes.active_count(), 0);
        assert_eq!(nodes.active().count(), 0);

        // handle survives retirement
        assert_eq!(nodes.map(uri("http://example.org/a")), a);
    }

    #[test]
    fn test_ownership() {
        let mut mine = NodeStore::new(StoreId(1));
        let mut theirs = NodeStore::new(StoreId(2));
        let a = mine.map(uri("http://example.org/a"));
        let b = theirs.map(uri("http://example.org/a"));
        assert!(mine.owns(a));
        assert!(!mine.owns(b));
    }
}
