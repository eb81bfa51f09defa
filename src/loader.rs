use std::collections::{HashMap, HashSet};

use log::debug;
use petgraph::stable_graph::NodeIndex;

use crate::elements::{Address, FunctionNode};
use crate::graph::CallGraph;
use crate::source::CallSource;

/// Hard cap on materialized nodes. Loaders stop adding once at the cap; there
/// is no eviction.
pub const MAX_NODES: usize = 10_000;

/// A node whose caller+callee count meets this threshold is treated as a hub:
/// it is kept in the graph but not traversed during neighbor expansion, so
/// allocator-style utility functions do not explode the BFS frontier.
pub const HUB_XREF_THRESHOLD: usize = 20;

/// Result of a targeted neighborhood load.
pub struct NeighborLoad {
    pub graph: CallGraph,
    pub center: Option<NodeIndex>,
}

/// Deduplicates call-site-level addresses to function-level, keeping first
/// occurrence order.
fn dedup_addresses(addrs: Vec<Address>) -> Vec<Address> {
    let mut seen = HashSet::new();
    addrs.into_iter().filter(|a| seen.insert(*a)).collect()
}

/// BFS from `center` over the live caller/callee relation, up to `max_depth`
/// hops and at most `max_nodes` nodes. Hub status is re-evaluated on every
/// load rather than cached.
pub fn load_neighbors<S: CallSource>(
    source: &S,
    center: Address,
    max_depth: usize,
    skip_hubs: bool,
    max_nodes: usize,
) -> NeighborLoad {
    let mut graph = CallGraph::new();

    let Some(center_info) = source.function_info(center) else {
        return NeighborLoad {
            graph,
            center: None,
        };
    };
    let center = center_info.address;

    // Discovery-ordered visited set with per-node hop distance.
    let mut order: Vec<Address> = vec![center];
    let mut distances: HashMap<Address, usize> = HashMap::from([(center, 0)]);

    let mut head = 0;
    while head < order.len() && order.len() < max_nodes {
        let current = order[head];
        head += 1;
        let dist = distances[&current];
        if dist >= max_depth {
            continue;
        }
        if skip_hubs && current != center && source.xref_count(current) >= HUB_XREF_THRESHOLD {
            continue;
        }

        let mut neighbors = dedup_addresses(source.callers_of(current));
        neighbors.extend(dedup_addresses(source.callees_of(current)));
        for nbr in neighbors {
            if order.len() >= max_nodes {
                break;
            }
            if distances.contains_key(&nbr) || source.function_info(nbr).is_none() {
                continue;
            }
            distances.insert(nbr, dist + 1);
            order.push(nbr);
        }
    }

    for &addr in &order {
        let Some(info) = source.function_info(addr) else {
            continue;
        };
        let callers = dedup_addresses(source.callers_of(addr));
        let callees = dedup_addresses(source.callees_of(addr));

        let mut node = FunctionNode::new(info.address, info.name, info.size)
            .with_xrefs(callers.len() as u32, callees.len() as u32);
        let dist = distances[&addr];
        node.set_graph_distance(dist as i32);
        node.set_importance(1. - dist as f32 / (max_depth as f32 + 1.));
        node.set_hub(source.xref_count(addr) >= HUB_XREF_THRESHOLD);
        graph.add_function(node);
    }

    // Edges only between nodes that survived the visited set.
    for &addr in &order {
        for callee in dedup_addresses(source.callees_of(addr)) {
            if graph.contains(callee) {
                graph.add_call(addr, callee);
            }
        }
    }

    if order.len() >= max_nodes {
        debug!("neighbor load truncated at {max_nodes} nodes (center {center:#x})");
    }
    debug!(
        "loaded {} nodes / {} edges around {center:#x} (depth {max_depth})",
        graph.node_count(),
        graph.edge_count()
    );

    let center_idx = graph.index_of(center);
    NeighborLoad {
        graph,
        center: center_idx,
    }
}

/// Materializes the whole program graph up to `max_nodes` functions, with the
/// same function-level edge deduplication as the neighbor loader.
pub fn build_full_graph<S: CallSource>(source: &S, max_nodes: usize) -> CallGraph {
    let mut graph = CallGraph::new();

    let count = source.function_count().min(max_nodes);
    for i in 0..count {
        let Some(info) = source.function_at(i) else {
            continue;
        };
        let callers = dedup_addresses(source.callers_of(info.address));
        let callees = dedup_addresses(source.callees_of(info.address));
        let node = FunctionNode::new(info.address, info.name, info.size)
            .with_xrefs(callers.len() as u32, callees.len() as u32);
        graph.add_function(node);
    }

    let addresses: Vec<Address> = graph.nodes_iter().map(|(_, n)| n.address()).collect();
    for addr in addresses {
        for callee in dedup_addresses(source.callees_of(addr)) {
            graph.add_call(addr, callee);
        }
    }

    if source.function_count() > max_nodes {
        debug!(
            "full graph truncated: {} of {} functions",
            count,
            source.function_count()
        );
    }
    debug!(
        "built full graph: {} nodes / {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    graph
}
