//! Interval-labelled transitive closure
//!
//! Reachability queries over a directed graph answered from a compressed
//! closure: the graph is condensed into its strongly connected components,
//! a spanning forest of the condensation is numbered in post-order, and every
//! component keeps the merged post-order intervals of everything it reaches.
//! A query is then a binary search over one component's interval list.

use super::common::GraphView;
use super::community::{strongly_connected_components, SccResult};

/// Closed range of post-order numbers
type Interval = (u32, u32);

/// Precomputed reachability over a [`GraphView`]
#[derive(Debug, Clone)]
pub struct Reachability {
    scc: SccResult,
    /// Component -> post-order number in the spanning forest
    post: Vec<u32>,
    /// Post-order number -> component
    by_post: Vec<usize>,
    /// Component -> sorted, merged intervals of reachable post-order numbers
    labels: Vec<Vec<Interval>>,
    /// Component contains a cycle (more than one member, or a self loop)
    cyclic: Vec<bool>,
}

impl Reachability {
    /// Label every node of `view`
    pub fn new(view: &GraphView) -> Self {
        let scc = strongly_connected_components(view);
        let k = scc.len();

        let mut condensed: Vec<Vec<usize>> = vec![Vec::new(); k];
        let mut cyclic: Vec<bool> = scc.components.iter().map(|members| members.len() > 1).collect();
        for u in 0..view.node_count {
            let cu = scc.component[u];
            for &v in view.successors(u) {
                let cv = scc.component[v];
                if cu != cv {
                    condensed[cu].push(cv);
                } else if u == v {
                    cyclic[cu] = true;
                }
            }
        }
        for list in &mut condensed {
            list.sort_unstable();
            list.dedup();
        }

        // Tarjan emits sinks first, so walking ids downwards starts from sources.
        let mut post = vec![0u32; k];
        let mut low = vec![0u32; k];
        let mut visited = vec![false; k];
        let mut counter = 0u32;
        for root in (0..k).rev() {
            if visited[root] {
                continue;
            }
            visited[root] = true;
            let mut work: Vec<(usize, usize, u32)> = vec![(root, 0, counter)];
            while let Some(frame) = work.last_mut() {
                let c = frame.0;
                if frame.1 < condensed[c].len() {
                    let d = condensed[c][frame.1];
                    frame.1 += 1;
                    if !visited[d] {
                        visited[d] = true;
                        work.push((d, 0, counter));
                    }
                    continue;
                }
                let Some((c, _, first)) = work.pop() else {
                    break;
                };
                post[c] = counter;
                low[c] = first;
                counter += 1;
            }
        }

        let mut by_post = vec![0usize; k];
        for (c, &p) in post.iter().enumerate() {
            by_post[p as usize] = c;
        }

        // Component ids are a reverse topological order: successors first.
        let mut labels: Vec<Vec<Interval>> = vec![Vec::new(); k];
        for c in 0..k {
            let mut intervals = vec![(low[c], post[c])];
            for &d in &condensed[c] {
                intervals.extend_from_slice(&labels[d]);
            }
            labels[c] = merge_intervals(intervals);
        }

        Self {
            scc,
            post,
            by_post,
            labels,
            cyclic,
        }
    }

    /// Whether two node indices sit in the same strongly connected component
    pub fn same_component(&self, a: usize, b: usize) -> bool {
        self.scc.component[a] == self.scc.component[b]
    }

    /// Path of length zero or more from `from` to `to`
    pub fn reaches(&self, from: usize, to: usize) -> bool {
        let cf = self.scc.component[from];
        let ct = self.scc.component[to];
        if cf == ct {
            return true;
        }
        contains(&self.labels[cf], self.post[ct])
    }

    /// Path of length one or more from `from` to `to`
    pub fn reaches_strictly(&self, from: usize, to: usize) -> bool {
        if from == to {
            return self.cyclic[self.scc.component[from]];
        }
        self.reaches(from, to)
    }

    /// Every node reachable from `from` through at least one edge
    pub fn descendants(&self, from: usize) -> Vec<usize> {
        let cf = self.scc.component[from];
        let mut result = Vec::new();
        for &(start, end) in &self.labels[cf] {
            for p in start..=end {
                let c = self.by_post[p as usize];
                if c == cf && !self.cyclic[c] {
                    continue;
                }
                result.extend_from_slice(&self.scc.components[c]);
            }
        }
        result.sort_unstable();
        result
    }
}

fn contains(intervals: &[Interval], value: u32) -> bool {
    let idx = intervals.partition_point(|&(start, _)| start <= value);
    idx > 0 && intervals[idx - 1].1 >= value
}

fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort_unstable();
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for (start, end) in intervals {
        match merged.last_mut() {
            Some(last) if start <= last.1.saturating_add(1) => {
                last.1 = last.1.max(end);
            }
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_and_diamond() {
        // 0 -> 1 -> 3, 0 -> 2 -> 3, 4 isolated
        let view = GraphView::from_edges(vec![0, 1, 2, 3, 4], vec![(0, 1), (1, 3), (0, 2), (2, 3)]);
        let reach = Reachability::new(&view);

        assert!(reach.reaches(0, 3));
        assert!(reach.reaches(1, 3));
        assert!(!reach.reaches(3, 0));
        assert!(!reach.reaches(1, 2));
        assert!(!reach.reaches(0, 4));
        assert!(reach.reaches(4, 4));
        assert!(!reach.reaches_strictly(4, 4));
        assert_eq!(reach.descendants(0), vec![1, 2, 3]);
        assert!(reach.descendants(3).is_empty());
    }

    #[test]
    fn test_cycle_reaches_itself() {
        // 0 -> 1 -> 0, 1 -> 2
        let view = GraphView::from_edges(vec![0, 1, 2], vec![(0, 1), (1, 0), (1, 2)]);
        let reach = Reachability::new(&view);

        assert!(reach.same_component(0, 1));
        assert!(reach.reaches_strictly(0, 0));
        assert!(reach.reaches(0, 2));
        assert!(!reach.reaches(2, 1));
        assert_eq!(reach.descendants(0), vec![0, 1, 2]);
    }

    #[test]
    fn test_self_loop_is_cyclic() {
        let view = GraphView::from_edges(vec![7], vec![(7, 7)]);
        let reach = Reachability::new(&view);
        assert!(reach.reaches_strictly(0, 0));
        assert_eq!(reach.descendants(0), vec![0]);
    }

    #[test]
    fn test_merge_intervals() {
        assert_eq!(merge_intervals(vec![(4, 5), (0, 1), (2, 2), (7, 9)]), vec![(0, 5), (7, 9)]);
    }
}
