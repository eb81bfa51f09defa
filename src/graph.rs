use std::collections::{HashMap, VecDeque};

use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences, IntoNodeReferences};
use petgraph::Directed;
use serde::{Deserialize, Serialize};

use crate::elements::{Address, CallEdge, FunctionNode};

type CallStableGraph = StableGraph<FunctionNode, CallEdge, Directed>;

/// A call graph: function nodes, call edges, and an address→index map that is
/// always consistent with them.
///
/// Edges are inserted by address pairs; an edge whose endpoint is not present
/// is dropped, not errored, and duplicates between the same ordered pair are
/// suppressed. The whole structure is a value type: full, base and active
/// views are independent clones, never aliases.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CallGraph {
    g: CallStableGraph,
    addr_index: HashMap<Address, NodeIndex>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn g(&self) -> &CallStableGraph {
        &self.g
    }

    pub fn g_mut(&mut self) -> &mut CallStableGraph {
        &mut self.g
    }

    /// Adds a node, or returns the existing index if the address is already
    /// present.
    pub fn add_function(&mut self, node: FunctionNode) -> NodeIndex {
        if let Some(&idx) = self.addr_index.get(&node.address()) {
            return idx;
        }
        let address = node.address();
        let idx = self.g.add_node(node);
        self.addr_index.insert(address, idx);
        idx
    }

    /// Adds a call edge between two present addresses. Self-calls, dangling
    /// endpoints and duplicate (from, to) pairs are silently dropped.
    pub fn add_call(&mut self, from: Address, to: Address) -> Option<EdgeIndex> {
        if from == to {
            return None;
        }
        let a = *self.addr_index.get(&from)?;
        let b = *self.addr_index.get(&to)?;
        if self.g.edges_connecting(a, b).next().is_some() {
            return None;
        }
        Some(self.g.add_edge(a, b, CallEdge::new(from, to)))
    }

    pub fn index_of(&self, address: Address) -> Option<NodeIndex> {
        self.addr_index.get(&address).copied()
    }

    pub fn contains(&self, address: Address) -> bool {
        self.addr_index.contains_key(&address)
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&FunctionNode> {
        self.g.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut FunctionNode> {
        self.g.node_weight_mut(idx)
    }

    pub fn node_by_address(&self, address: Address) -> Option<&FunctionNode> {
        self.index_of(address).and_then(|idx| self.node(idx))
    }

    pub fn nodes_iter(&self) -> impl Iterator<Item = (NodeIndex, &FunctionNode)> {
        self.g.node_references()
    }

    pub fn edges_iter(&self) -> impl Iterator<Item = (EdgeIndex, &CallEdge)> {
        self.g.edge_references().map(|e| (e.id(), e.weight()))
    }

    pub fn edge_endpoints(&self, idx: EdgeIndex) -> Option<(NodeIndex, NodeIndex)> {
        self.g.edge_endpoints(idx)
    }

    pub fn node_count(&self) -> usize {
        self.g.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.g.edge_count()
    }

    pub fn node_indices(&self) -> Vec<NodeIndex> {
        self.g.node_indices().collect()
    }

    /// Unweighted BFS from one node over the undirected edge relation.
    pub fn bfs_distances(&self, start: NodeIndex) -> HashMap<NodeIndex, usize> {
        self.bfs_distances_bounded(&[start], None)
    }

    /// Multi-source BFS: distance to the nearest of several seeds.
    pub fn bfs_distances_multi(&self, seeds: &[NodeIndex]) -> HashMap<NodeIndex, usize> {
        self.bfs_distances_bounded(seeds, None)
    }

    /// BFS with an optional hop bound. Nodes farther than `max_depth` are
    /// absent from the result.
    pub fn bfs_distances_bounded(
        &self,
        seeds: &[NodeIndex],
        max_depth: Option<usize>,
    ) -> HashMap<NodeIndex, usize> {
        let mut dist = HashMap::new();
        let mut queue = VecDeque::new();
        for &seed in seeds {
            if self.g.node_weight(seed).is_some() && !dist.contains_key(&seed) {
                dist.insert(seed, 0);
                queue.push_back(seed);
            }
        }
        while let Some(current) = queue.pop_front() {
            let d = dist[&current];
            if max_depth.is_some_and(|cap| d >= cap) {
                continue;
            }
            for nbr in self.g.neighbors_undirected(current) {
                if !dist.contains_key(&nbr) {
                    dist.insert(nbr, d + 1);
                    queue.push_back(nbr);
                }
            }
        }
        dist
    }

    /// True when every edge's address endpoints resolve in the map to the
    /// edge's actual graph endpoints. Rebuilds must preserve this.
    pub fn is_consistent(&self) -> bool {
        self.g.edge_references().all(|e| {
            let w = e.weight();
            self.addr_index.get(&w.from()) == Some(&e.source())
                && self.addr_index.get(&w.to()) == Some(&e.target())
        }) && self
            .addr_index
            .iter()
            .all(|(addr, &idx)| self.g.node_weight(idx).is_some_and(|n| n.address() == *addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(addr: Address) -> FunctionNode {
        FunctionNode::new(addr, format!("sub_{addr:X}"), 16)
    }

    #[test]
    fn duplicate_edges_are_suppressed() {
        let mut g = CallGraph::new();
        g.add_function(node(1));
        g.add_function(node(2));
        assert!(g.add_call(1, 2).is_some());
        assert!(g.add_call(1, 2).is_none());
        // Opposite direction is a distinct call relation.
        assert!(g.add_call(2, 1).is_some());
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn dangling_edges_are_dropped() {
        let mut g = CallGraph::new();
        g.add_function(node(1));
        assert!(g.add_call(1, 99).is_none());
        assert!(g.add_call(99, 1).is_none());
        assert_eq!(g.edge_count(), 0);
        assert!(g.is_consistent());
    }

    #[test]
    fn self_calls_are_dropped() {
        let mut g = CallGraph::new();
        g.add_function(node(1));
        assert!(g.add_call(1, 1).is_none());
    }

    #[test]
    fn readding_an_address_returns_existing_index() {
        let mut g = CallGraph::new();
        let a = g.add_function(node(1));
        let b = g.add_function(node(1));
        assert_eq!(a, b);
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn bfs_distances_follow_edges_undirected() {
        // 1 -> 2 -> 3, 4 isolated
        let mut g = CallGraph::new();
        for a in 1..=4 {
            g.add_function(node(a));
        }
        g.add_call(1, 2);
        g.add_call(2, 3);

        let start = g.index_of(3).unwrap();
        let dist = g.bfs_distances(start);
        assert_eq!(dist[&g.index_of(3).unwrap()], 0);
        assert_eq!(dist[&g.index_of(2).unwrap()], 1);
        assert_eq!(dist[&g.index_of(1).unwrap()], 2);
        assert!(!dist.contains_key(&g.index_of(4).unwrap()));
    }

    #[test]
    fn bounded_bfs_cuts_off_at_depth() {
        let mut g = CallGraph::new();
        for a in 1..=4 {
            g.add_function(node(a));
        }
        g.add_call(1, 2);
        g.add_call(2, 3);
        g.add_call(3, 4);

        let start = g.index_of(1).unwrap();
        let dist = g.bfs_distances_bounded(&[start], Some(2));
        assert_eq!(dist.len(), 3);
        assert!(!dist.contains_key(&g.index_of(4).unwrap()));
    }

    #[test]
    fn multi_source_bfs_takes_nearest_seed() {
        // 1 - 2 - 3 - 4 - 5, seeds at 1 and 5
        let mut g = CallGraph::new();
        for a in 1..=5 {
            g.add_function(node(a));
        }
        for a in 1..=4u64 {
            g.add_call(a, a + 1);
        }
        let seeds = [g.index_of(1).unwrap(), g.index_of(5).unwrap()];
        let dist = g.bfs_distances_multi(&seeds);
        assert_eq!(dist[&g.index_of(3).unwrap()], 2);
        assert_eq!(dist[&g.index_of(2).unwrap()], 1);
        assert_eq!(dist[&g.index_of(4).unwrap()], 1);
    }
}
