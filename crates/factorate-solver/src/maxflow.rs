use std::collections::VecDeque;

use crate::network::{EdgeId, FlowNetwork, NodeId};

/// Residual capacities at or below this are treated as exhausted.
pub const FLOW_EPS: f64 = 1e-9;

impl FlowNetwork {
    /// Edmonds-Karp maximum flow from `source` to `sink`.
    ///
    /// Augments along BFS-shortest residual paths until none remain. Flow
    /// already on the network is kept, so a second call after adding edges
    /// continues from the current state. Returns the value pushed by this
    /// call, or infinity if an augmenting path has unbounded capacity.
    pub fn max_flow(&mut self, source: NodeId, sink: NodeId) -> f64 {
        let mut total = 0.0;
        loop {
            let Some(path) = self.shortest_augmenting_path(source, sink) else {
                return total;
            };

            let mut bottleneck = f64::INFINITY;
            for &arc in &path {
                bottleneck = bottleneck.min(self.residual(arc));
            }
            if !bottleneck.is_finite() {
                return f64::INFINITY;
            }
            for &arc in &path {
                self.push(arc, bottleneck);
            }
            total += bottleneck;
        }
    }

    /// BFS for the arc sequence of a shortest residual path, scanning
    /// adjacency lists in insertion order.
    fn shortest_augmenting_path(&self, source: NodeId, sink: NodeId) -> Option<Vec<EdgeId>> {
        let mut parent_arc: Vec<Option<usize>> = vec![None; self.node_count()];
        let mut visited = vec![false; self.node_count()];
        visited[source] = true;

        let mut queue = VecDeque::new();
        queue.push_back(source);
        'search: while let Some(node) = queue.pop_front() {
            for &arc in self.arcs_from(node) {
                let next = self.arc_head(arc);
                if !visited[next] && self.residual(arc) > FLOW_EPS {
                    visited[next] = true;
                    parent_arc[next] = Some(arc);
                    if next == sink {
                        break 'search;
                    }
                    queue.push_back(next);
                }
            }
        }

        if !visited[sink] {
            return None;
        }

        let mut path = Vec::new();
        let mut node = sink;
        while node != source {
            let arc = parent_arc[node].expect("path nodes have parents");
            path.push(arc);
            node = self.arc_head(arc ^ 1);
        }
        path.reverse();
        Some(path)
    }

    /// Nodes reachable from `start` through positive-residual arcs. After a
    /// max-flow run from `start`, this is the source side of a minimum cut.
    pub fn residual_reachable(&self, start: NodeId) -> Vec<bool> {
        let mut seen = vec![false; self.node_count()];
        seen[start] = true;
        let mut queue = VecDeque::new();
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            for &arc in self.arcs_from(node) {
                let next = self.arc_head(arc);
                if !seen[next] && self.residual(arc) > FLOW_EPS {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_edge() {
        let mut net = FlowNetwork::new();
        let s = net.add_node();
        let t = net.add_node();
        let e = net.add_edge(s, t, 5.0);

        assert!((net.max_flow(s, t) - 5.0).abs() < 1e-9);
        assert!((net.flow(e) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn diamond_with_cross_edge() {
        // s -> {a, b} -> t plus a -> b; all five edges carry flow at optimum.
        let mut net = FlowNetwork::new();
        let s = net.add_node();
        let a = net.add_node();
        let b = net.add_node();
        let t = net.add_node();
        net.add_edge(s, a, 3.0);
        net.add_edge(s, b, 2.0);
        net.add_edge(a, t, 2.0);
        net.add_edge(b, t, 3.0);
        net.add_edge(a, b, 1.0);

        assert!((net.max_flow(s, t) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn min_cut_reachability() {
        // The 1-capacity middle edge is the cut; only s and a stay reachable.
        let mut net = FlowNetwork::new();
        let s = net.add_node();
        let a = net.add_node();
        let t = net.add_node();
        net.add_edge(s, a, 10.0);
        net.add_edge(a, t, 1.0);

        assert!((net.max_flow(s, t) - 1.0).abs() < 1e-9);
        let reachable = net.residual_reachable(s);
        assert!(reachable[s] && reachable[a] && !reachable[t]);
    }

    #[test]
    fn frozen_edge_blocks_augmentation() {
        let mut net = FlowNetwork::new();
        let s = net.add_node();
        let t = net.add_node();
        let e = net.add_edge(s, t, 5.0);
        net.freeze_edge(e);

        assert!(net.max_flow(s, t).abs() < 1e-9);
    }

    #[test]
    fn second_pass_continues_from_current_state() {
        // The first pass saturates a->t; a second call after adding the
        // a->b->t detour finds one more unit without restarting.
        let mut net = FlowNetwork::new();
        let s = net.add_node();
        let a = net.add_node();
        let b = net.add_node();
        let t = net.add_node();
        net.add_edge(s, a, 2.0);
        net.add_edge(a, t, 1.0);
        assert!((net.max_flow(s, t) - 1.0).abs() < 1e-9);

        net.add_edge(a, b, 1.0);
        net.add_edge(b, t, 1.0);
        assert!((net.max_flow(s, t) - 1.0).abs() < 1e-9);
    }
}
