//! Interned named-graph sets
//!
//! Every present triple belongs to a non-empty set of named graphs. Triples
//! with the same membership share one [`GraphSetId`], so memory grows with
//! the number of distinct graph combinations rather than with the number of
//! triples.

use super::types::NodeId;
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// Handle to an interned, sorted, non-empty set of graph nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphSetId(u32);

#[derive(Debug, Clone)]
struct Entry {
    members: Arc<[NodeId]>,
    refs: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GraphSetInterner {
    entries: Vec<Option<Entry>>,
    lookup: FxHashMap<Arc<[NodeId]>, GraphSetId>,
    free: Vec<u32>,
}

impl GraphSetInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take a reference on the set `{graph}`
    pub fn singleton(&mut self, graph: NodeId) -> GraphSetId {
        self.intern(vec![graph])
    }

    /// Release `set` and take a reference on `set ∪ {graph}`
    pub fn with(&mut self, set: GraphSetId, graph: NodeId) -> GraphSetId {
        let mut members = self.members(set).to_vec();
        if let Err(pos) = members.binary_search(&graph) {
            members.insert(pos, graph);
        }
        let next = self.intern(members);
        self.release(set);
        next
    }

    /// Release `set` and take a reference on `set \ {graph}`; `None` when
    /// nothing is left
    pub fn without(&mut self, set: GraphSetId, graph: NodeId) -> Option<GraphSetId> {
        let members: Vec<NodeId> = self
            .members(set)
            .iter()
            .copied()
            .filter(|&g| g != graph)
            .collect();
        let next = (!members.is_empty()).then(|| self.intern(members));
        self.release(set);
        next
    }

    pub fn members(&self, set: GraphSetId) -> &[NodeId] {
        match &self.entries[set.0 as usize] {
            Some(entry) => &entry.members,
            None => &[],
        }
    }

    /// Shared handle on the member slice
    pub fn shared(&self, set: GraphSetId) -> Option<Arc<[NodeId]>> {
        self.entries[set.0 as usize]
            .as_ref()
            .map(|entry| Arc::clone(&entry.members))
    }

    pub fn contains(&self, set: GraphSetId, graph: NodeId) -> bool {
        self.members(set).binary_search(&graph).is_ok()
    }

    /// Number of distinct live sets
    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    fn intern(&mut self, mut members: Vec<NodeId>) -> GraphSetId {
        members.sort_unstable();
        members.dedup();
        if let Some(&id) = self.lookup.get(members.as_slice()) {
            if let Some(entry) = self.entries[id.0 as usize].as_mut() {
                entry.refs += 1;
            }
            return id;
        }

        let members: Arc<[NodeId]> = members.into();
        let entry = Entry {
            members: Arc::clone(&members),
            refs: 1,
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.entries[slot as usize] = Some(entry);
                GraphSetId(slot)
            }
            None => {
                self.entries.push(Some(entry));
                GraphSetId((self.entries.len() - 1) as u32)
            }
        };
        self.lookup.insert(members, id);
        id
    }

    fn release(&mut self, set: GraphSetId) {
        let slot = &mut self.entries[set.0 as usize];
        let Some(entry) = slot.as_mut() else {
            return;
        };
        entry.refs -= 1;
        if entry.refs == 0 {
            let members = Arc::clone(&entry.members);
            *slot = None;
            self.lookup.remove(&members);
            self.free.push(set.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rdf::types::StoreId;

    fn graph(index: u32) -> NodeId {
        NodeId::new(StoreId(0), index)
    }

    #[test]
    fn test_equal_sets_are_shared() {
        let mut sets = GraphSetInterner::new();
        let a = sets.singleton(graph(1));
        let b = sets.singleton(graph(2));
        let a = sets.with(a, graph(2));
        let b = sets.with(b, graph(1));

        assert_eq!(a, b);
        assert_eq!(sets.members(a), &[graph(1), graph(2)]);
        assert_eq!(sets.len(), 1);
        assert!(Arc::ptr_eq(&sets.shared(a).unwrap(), &sets.shared(b).unwrap()));
    }

    #[test]
    fn test_adding_existing_member_is_stable() {
        let mut sets = GraphSetInterner::new();
        let a = sets.singleton(graph(1));
        let again = sets.with(a, graph(1));
        assert_eq!(a, again);
        assert_eq!(sets.len(), 1);
    }

    #[test]
    fn test_release_to_empty() {
        let mut sets = GraphSetInterner::new();
        let a = sets.singleton(graph(1));
        let ab = sets.with(a, graph(2));
        let b = sets.without(ab, graph(1)).unwrap();
        assert_eq!(sets.members(b), &[graph(2)]);
        assert_eq!(sets.without(b, graph(2)), None);
        assert!(sets.is_empty());

        // slot is reused
        let c = sets.singleton(graph(3));
        assert_eq!(sets.members(c), &[graph(3)]);
        assert_eq!(sets.len(), 1);
    }
}
