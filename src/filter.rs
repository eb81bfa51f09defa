use crate::elements::Address;
use crate::graph::CallGraph;

/// Derives the induced subgraph of nodes within `max_depth` hops of
/// `selected`, BFS-ing over the already-materialized edge list.
///
/// Distances and importance are recomputed wholesale on the copies; the full
/// graph is left untouched. When `selected` is absent from the graph the
/// result is an identity copy, matching the unfiltered view.
pub fn filter_by_depth(full: &CallGraph, selected: Address, max_depth: usize) -> CallGraph {
    let Some(start) = full.index_of(selected) else {
        return identity_copy(full);
    };

    let distances = full.bfs_distances_bounded(&[start], Some(max_depth));

    let mut filtered = CallGraph::new();
    for (idx, node) in full.nodes_iter() {
        let Some(&d) = distances.get(&idx) else {
            continue;
        };
        let mut copy = node.clone();
        copy.set_graph_distance(d as i32);
        copy.set_importance(1. - d as f32 / (max_depth as f32 + 1.));
        copy.set_opacity(1.);
        filtered.add_function(copy);
    }
    for (_, edge) in full.edges_iter() {
        // add_call drops edges whose endpoints did not survive the cut.
        filtered.add_call(edge.from(), edge.to());
    }
    filtered
}

/// The unfiltered view: a value copy of the full graph with distance fields
/// cleared.
pub fn identity_copy(full: &CallGraph) -> CallGraph {
    let mut copy = full.clone();
    for idx in copy.node_indices() {
        if let Some(n) = copy.node_mut(idx) {
            n.set_graph_distance(-1);
            n.set_follow_distance(-1);
            n.set_importance(0.);
            n.set_opacity(1.);
        }
    }
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::FunctionNode;

    /// A→B, B→C, A→C, C→D, D→E.
    fn five_node_graph() -> CallGraph {
        let mut g = CallGraph::new();
        for (addr, name) in [(1, "A"), (2, "B"), (3, "C"), (4, "D"), (5, "E")] {
            g.add_function(FunctionNode::new(addr, name, 16));
        }
        g.add_call(1, 2);
        g.add_call(2, 3);
        g.add_call(1, 3);
        g.add_call(3, 4);
        g.add_call(4, 5);
        g
    }

    #[test]
    fn depth_one_from_a_yields_abc() {
        let full = five_node_graph();
        let filtered = filter_by_depth(&full, 1, 1);

        let mut names: Vec<&str> = filtered.nodes_iter().map(|(_, n)| n.name()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["A", "B", "C"]);

        // D and E sit at distance >= 2 from A.
        assert!(!filtered.contains(4));
        assert!(!filtered.contains(5));
        assert!(filtered.is_consistent());
    }

    #[test]
    fn filter_is_idempotent() {
        let full = five_node_graph();
        let once = filter_by_depth(&full, 1, 2);
        let twice = filter_by_depth(&full, 1, 2);

        assert_eq!(once.node_count(), twice.node_count());
        assert_eq!(once.edge_count(), twice.edge_count());
        for (_, n) in once.nodes_iter() {
            let m = twice.node_by_address(n.address()).expect("same node set");
            assert_eq!(n.graph_distance(), m.graph_distance());
        }
    }

    #[test]
    fn missing_selection_gives_identity_copy() {
        let full = five_node_graph();
        let filtered = filter_by_depth(&full, 99, 1);
        assert_eq!(filtered.node_count(), full.node_count());
        assert_eq!(filtered.edge_count(), full.edge_count());
    }

    #[test]
    fn distances_are_set_on_the_filtered_copy() {
        let full = five_node_graph();
        let filtered = filter_by_depth(&full, 1, 2);
        assert_eq!(filtered.node_by_address(1).unwrap().graph_distance(), 0);
        assert_eq!(filtered.node_by_address(2).unwrap().graph_distance(), 1);
        assert_eq!(filtered.node_by_address(4).unwrap().graph_distance(), 2);
        // The full graph keeps its unset distances.
        assert_eq!(full.node_by_address(1).unwrap().graph_distance(), -1);
    }
}
