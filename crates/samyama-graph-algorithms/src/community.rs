//! Component detection algorithms
//!
//! Strongly connected components are what the reachability labelling
//! condenses before it assigns intervals.

use super::common::GraphView;

/// Result of the SCC algorithm
#[derive(Debug, Clone)]
pub struct SccResult {
    /// Dense node index -> component id
    pub component: Vec<usize>,
    /// Component id -> member node indices.
    /// Components are emitted in reverse topological order (sinks first).
    pub components: Vec<Vec<usize>>,
}

impl SccResult {
    /// Number of components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

const UNVISITED: usize = usize::MAX;

/// Strongly Connected Components (Tarjan)
///
/// Iterative so deep hierarchies cannot overflow the call stack.
pub fn strongly_connected_components(view: &GraphView) -> SccResult {
    let n = view.node_count;
    let mut index = vec![UNVISITED; n];
    let mut lowlink = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack: Vec<usize> = Vec::new();
    let mut component = vec![UNVISITED; n];
    let mut components: Vec<Vec<usize>> = Vec::new();
    let mut next_index = 0usize;

    // (node, position in its successor slice)
    let mut work: Vec<(usize, usize)> = Vec::new();

    for root in 0..n {
        if index[root] != UNVISITED {
            continue;
        }
        work.push((root, 0));

        while let Some(frame) = work.last_mut() {
            let u = frame.0;
            if frame.1 == 0 && index[u] == UNVISITED {
                index[u] = next_index;
                lowlink[u] = next_index;
                next_index += 1;
                stack.push(u);
                on_stack[u] = true;
            }

            let successors = view.successors(u);
            if frame.1 < successors.len() {
                let v = successors[frame.1];
                frame.1 += 1;
                if index[v] == UNVISITED {
                    work.push((v, 0));
                } else if on_stack[v] {
                    lowlink[u] = lowlink[u].min(index[v]);
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                lowlink[parent] = lowlink[parent].min(lowlink[u]);
            }

            if lowlink[u] == index[u] {
                let id = components.len();
                let mut members = Vec::new();
                while let Some(w) = stack.pop() {
                    on_stack[w] = false;
                    component[w] = id;
                    members.push(w);
                    if w == u {
                        break;
                    }
                }
                components.push(members);
            }
        }
    }

    SccResult {
        component,
        components,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scc_cycle_and_tail() {
        // 1 -> 2 -> 3 -> 1, 3 -> 4
        let view = GraphView::from_edges(vec![1, 2, 3, 4], vec![(1, 2), (2, 3), (3, 1), (3, 4)]);
        let result = strongly_connected_components(&view);

        assert_eq!(result.len(), 2);
        assert_eq!(result.component[0], result.component[1]);
        assert_eq!(result.component[1], result.component[2]);
        assert_ne!(result.component[2], result.component[3]);
        // Sink component comes first
        assert_eq!(result.component[3], 0);
    }

    #[test]
    fn test_scc_dag_is_all_singletons() {
        let view = GraphView::from_edges(vec![1, 2, 3], vec![(1, 2), (1, 3), (2, 3)]);
        let result = strongly_connected_components(&view);
        assert_eq!(result.len(), 3);
        assert!(result.components.iter().all(|c| c.len() == 1));
    }
}
