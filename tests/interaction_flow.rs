use egui_callgraph::{
    filter_by_depth, CallGraph, FunctionNode, GraphController, LayoutKind, StaticSource,
};

fn chain_graph(n: u64) -> CallGraph {
    let mut g = CallGraph::new();
    for i in 0..n {
        g.add_function(FunctionNode::new(0x1000 + i, format!("f{i}"), 16));
    }
    for i in 0..n - 1 {
        g.add_call(0x1000 + i, 0x1001 + i);
    }
    g
}

#[test]
fn depth_filter_keeps_the_selected_neighborhood() {
    // f0 -> f1 -> f2 -> f3 -> f4, selected f2, depth 1.
    let full = chain_graph(5);
    let filtered = filter_by_depth(&full, 0x1002, 1);

    let mut addrs: Vec<u64> = filtered.nodes_iter().map(|(_, n)| n.address()).collect();
    addrs.sort_unstable();
    assert_eq!(addrs, vec![0x1001, 0x1002, 0x1003]);
    // Both surviving edges, and only those.
    assert_eq!(filtered.edge_count(), 2);
    assert!(filtered.is_consistent());
    // The source graph is untouched.
    assert_eq!(full.node_count(), 5);
}

#[test]
fn depth_filter_is_idempotent() {
    let full = chain_graph(7);
    let once = filter_by_depth(&full, 0x1003, 2);
    let twice = filter_by_depth(&once, 0x1003, 2);
    assert_eq!(once.node_count(), twice.node_count());
    assert_eq!(once.edge_count(), twice.edge_count());
}

/// Center calls one hub (many callees) and one regular function.
fn hub_source() -> StaticSource {
    let mut src = StaticSource::new();
    src.add_function(0x100, "center", 32);
    src.add_function(0x200, "alloc_hub", 32);
    src.add_function(0x300, "regular", 32);
    src.add_call(0x100, 0x200);
    src.add_call(0x100, 0x300);
    for i in 0..30u64 {
        let addr = 0x5000 + i;
        src.add_function(addr, format!("hub_user_{i}"), 8);
        src.add_call(0x200, addr);
    }
    src.add_function(0x400, "reg_callee", 8);
    src.add_call(0x300, 0x400);
    src
}

#[test]
fn hub_suppression_is_reevaluated_per_load() {
    let mut ctrl = GraphController::new(hub_source());
    ctrl.refresh();
    ctrl.select(0x100);
    ctrl.set_focused(true);

    // Hub is present but its fan-out was not traversed.
    assert!(ctrl.active().contains(0x200));
    assert!(ctrl.active().node_by_address(0x200).unwrap().is_hub());
    assert!(!ctrl.active().contains(0x5000));
    assert!(ctrl.active().contains(0x400));

    // Disabling suppression and reloading pulls the fan-out in.
    ctrl.set_skip_hubs(false);
    ctrl.refresh();
    assert!(ctrl.active().contains(0x5000));
    assert!(ctrl.active().is_consistent());
}

#[test]
fn lock_follow_unfollow_round_trip() {
    let mut ctrl = GraphController::new(hub_source());
    ctrl.refresh();
    ctrl.select(0x300);
    ctrl.set_focused(true);
    ctrl.set_max_depth(1);

    let base: Vec<u64> = {
        let mut v: Vec<u64> = ctrl.active().nodes_iter().map(|(_, n)| n.address()).collect();
        v.sort_unstable();
        v
    };

    ctrl.lock();
    ctrl.toggle_follow(0x100);
    assert!(ctrl.is_followed(0x100));
    assert!(ctrl.active().node_by_address(0x100).unwrap().followed());
    // The follow merged center's other callee.
    assert!(ctrl.active().contains(0x200));
    assert!(ctrl.active().is_consistent());

    ctrl.toggle_follow(0x100);
    let after: Vec<u64> = {
        let mut v: Vec<u64> = ctrl.active().nodes_iter().map(|(_, n)| n.address()).collect();
        v.sort_unstable();
        v
    };
    assert_eq!(after, base);
    assert!(ctrl.followed().is_empty());
    assert!(ctrl.is_locked());

    ctrl.unlock();
    assert!(!ctrl.is_locked());
}

#[test]
fn selection_in_locked_view_does_not_reload() {
    let mut ctrl = GraphController::new(hub_source());
    ctrl.refresh();
    ctrl.select(0x300);
    ctrl.set_focused(true);
    ctrl.set_max_depth(1);
    ctrl.lock();

    let nodes_before = ctrl.active().node_count();
    ctrl.select(0x100);
    assert_eq!(ctrl.selected_address(), Some(0x100));
    assert_eq!(ctrl.active().node_count(), nodes_before);
    assert!(ctrl.is_locked());
}

#[test]
fn jump_centers_the_cameras_on_the_selection() {
    let mut ctrl = GraphController::new(hub_source());
    ctrl.refresh();
    for _ in 0..10 {
        ctrl.step_layout();
    }
    ctrl.select(0x300);

    let pos = ctrl.active().node_by_address(0x300).unwrap().pos();
    assert_eq!(ctrl.camera.target, pos);
    assert_eq!(ctrl.ortho.pan, glam::Vec2::new(pos.x, pos.y));
}

#[test]
fn single_function_program_is_stable() {
    let mut src = StaticSource::new();
    src.add_function(0x100, "entry", 16);

    let mut ctrl = GraphController::new(src);
    ctrl.refresh();
    assert_eq!(ctrl.active().node_count(), 1);

    ctrl.select(0x100);
    for _ in 0..50 {
        ctrl.step_layout();
    }
    let node = ctrl.active().node_by_address(0x100).unwrap();
    assert!(node.pos().is_finite());

    ctrl.set_layout_kind(LayoutKind::Hierarchical2D);
    ctrl.step_layout();
    let node = ctrl.active().node_by_address(0x100).unwrap();
    assert!(node.pos().is_finite());
}
