use egui_callgraph::{CallEdge, CallGraph, FunctionNode};
use glam::Vec3;

#[test]
fn test_serialize_deserialize_node() {
    let mut node = FunctionNode::new(0x401000, "dispatch_message", 128).with_xrefs(4, 9);
    node.set_pos(Vec3::new(1.5, -2.0, 0.25));
    node.set_graph_distance(2);
    node.set_follow_distance(1);
    node.set_opacity(0.4);
    node.set_hub(true);
    node.set_followed(true);

    let json = serde_json::to_string(&node).expect("serialize node");
    let node2: FunctionNode = serde_json::from_str(&json).expect("deserialize node");

    assert_eq!(node2.address(), node.address());
    assert_eq!(node2.name(), node.name());
    assert_eq!(node2.size(), node.size());
    assert_eq!(node2.caller_count(), node.caller_count());
    assert_eq!(node2.callee_count(), node.callee_count());
    assert_eq!(node2.pos(), node.pos());
    assert_eq!(node2.graph_distance(), node.graph_distance());
    assert_eq!(node2.follow_distance(), node.follow_distance());
    assert_eq!(node2.opacity(), node.opacity());
    assert_eq!(node2.scale(), node.scale());
    assert_eq!(node2.is_hub(), node.is_hub());
    assert_eq!(node2.followed(), node.followed());
}

#[test]
fn test_serialize_deserialize_edge() {
    let edge = CallEdge::new(0x401000, 0x402000);
    let json = serde_json::to_string(&edge).expect("serialize edge");
    let edge2: CallEdge = serde_json::from_str(&json).expect("deserialize edge");
    assert_eq!(edge2, edge);
    assert_eq!(edge2.from(), 0x401000);
    assert_eq!(edge2.to(), 0x402000);
}

#[test]
fn test_serialize_deserialize_graph() {
    let mut graph = CallGraph::new();
    graph.add_function(FunctionNode::new(0x100, "main", 64).with_xrefs(0, 2));
    graph.add_function(FunctionNode::new(0x200, "helper", 32).with_xrefs(1, 0));
    graph.add_function(FunctionNode::new(0x300, "leaf", 16).with_xrefs(1, 0));
    graph.add_call(0x100, 0x200);
    graph.add_call(0x100, 0x300);

    let json = serde_json::to_string(&graph).expect("serialize graph");
    let graph2: CallGraph = serde_json::from_str(&json).expect("deserialize graph");

    assert_eq!(graph2.node_count(), graph.node_count());
    assert_eq!(graph2.edge_count(), graph.edge_count());
    // The address index survives the round trip intact.
    assert!(graph2.is_consistent());

    for (_, node) in graph.nodes_iter() {
        let node2 = graph2
            .node_by_address(node.address())
            .expect("node exists after round trip");
        assert_eq!(node2.name(), node.name());
        assert_eq!(node2.scale(), node.scale());
    }
    for (idx, edge) in graph2.edges_iter() {
        let (a, b) = graph2.edge_endpoints(idx).expect("endpoints");
        assert_eq!(graph2.node(a).unwrap().address(), edge.from());
        assert_eq!(graph2.node(b).unwrap().address(), edge.to());
    }
}
