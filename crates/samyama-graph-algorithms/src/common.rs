//! Dense adjacency for hierarchy graphs
//!
//! Callers hand over opaque `u64` node ids and `(child, parent)` edges; the
//! view renumbers them densely and stores successors in CSR form.

use std::collections::HashMap;

/// Caller-side node identifier
pub type NodeId = u64;

/// Compressed-sparse-row view of a directed graph
#[derive(Debug, Clone)]
pub struct GraphView {
    pub node_count: usize,
    /// Dense index -> caller id
    pub index_to_node: Vec<NodeId>,
    /// Caller id -> dense index
    pub node_to_index: HashMap<NodeId, usize>,
    /// Offsets into `targets`, `node_count + 1` entries
    pub offsets: Vec<usize>,
    pub targets: Vec<usize>,
}

impl GraphView {
    /// Build a view over `nodes`.
    ///
    /// Edges touching a node outside `nodes` are dropped and parallel edges
    /// collapse into one.
    pub fn from_edges<I>(nodes: Vec<NodeId>, edges: I) -> Self
    where
        I: IntoIterator<Item = (NodeId, NodeId)>,
    {
        let node_to_index: HashMap<NodeId, usize> =
            nodes.iter().enumerate().map(|(idx, &node)| (node, idx)).collect();

        let mut pairs: Vec<(usize, usize)> = edges
            .into_iter()
            .filter_map(|(from, to)| Some((*node_to_index.get(&from)?, *node_to_index.get(&to)?)))
            .collect();
        pairs.sort_unstable();
        pairs.dedup();

        let mut offsets = vec![0; nodes.len() + 1];
        for &(from, _) in &pairs {
            offsets[from + 1] += 1;
        }
        for i in 1..offsets.len() {
            offsets[i] += offsets[i - 1];
        }

        GraphView {
            node_count: nodes.len(),
            index_to_node: nodes,
            node_to_index,
            offsets,
            targets: pairs.into_iter().map(|(_, to)| to).collect(),
        }
    }

    pub fn successors(&self, idx: usize) -> &[usize] {
        &self.targets[self.offsets[idx]..self.offsets[idx + 1]]
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.node_to_index.get(&node).copied()
    }

    pub fn node_of(&self, idx: usize) -> NodeId {
        self.index_to_node[idx]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_edges_dedups_and_skips_unknown() {
        let view = GraphView::from_edges(vec![10, 20, 30], vec![(10, 20), (10, 20), (20, 30), (30, 99)]);

        assert_eq!(view.node_count, 3);
        assert_eq!(view.successors(0), &[1]);
        assert_eq!(view.successors(1), &[2]);
        assert!(view.successors(2).is_empty());
        assert_eq!(view.index_of(30), Some(2));
        assert_eq!(view.node_of(2), 30);
        assert_eq!(view.index_of(99), None);
    }
}
