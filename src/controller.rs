use std::collections::BTreeSet;

use glam::Vec3;
use log::debug;
use petgraph::stable_graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::camera::{Camera, OrthoCamera};
use crate::elements::{Address, FunctionNode};
use crate::filter::{filter_by_depth, identity_copy};
use crate::graph::CallGraph;
use crate::layouts::force_directed::{ForceDirected, State as ForceState};
use crate::layouts::hierarchical::{Hierarchical, State as HierState};
use crate::layouts::Layout;
use crate::loader::{build_full_graph, load_neighbors, HUB_XREF_THRESHOLD, MAX_NODES};
use crate::source::CallSource;

/// Follow-fade floor at the farthest observed distance.
const FOLLOW_OPACITY_FLOOR: f32 = 0.15;
/// Opacity of nodes not reachable from any followed node.
const DISCONNECTED_OPACITY: f32 = 0.08;
/// New neighbors appear within this radius of the node that pulled them in.
const FOLLOW_JITTER_RADIUS: f32 = 0.75;
const JITTER_SEED: u64 = 7;

/// Which layout algorithm positions the active graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    /// 3D random-sphere seeding plus per-frame force relaxation.
    ForceDirected3D,
    /// 2D Kamada-Kawai placement with similarity-weighted refinement,
    /// computed once.
    Hierarchical2D,
}

/// Per-frame timing reported by the view for diagnostics panels.
#[derive(Clone, Copy, Debug, Default)]
pub struct FrameMetrics {
    pub last_step_time_ms: f32,
    pub last_draw_time_ms: f32,
}

/// Owns all mutable visualization state: the source, the full/base/active
/// graphs, cameras, layout states, selection and the followed set.
///
/// One instance per view, constructed explicitly and passed to the render
/// entry point. All methods are synchronous and expected to be called from a
/// single thread, once per frame at most.
///
/// Graph views are value-semantic: the active graph is replaced wholesale on
/// every rebuild, filter or base restore, never patched through shared
/// references. Known limitation: source queries during neighbor loading and
/// follow expansion block the frame; they are bounded by the node cap and
/// depth, not by time.
pub struct GraphController<S> {
    source: S,

    /// Materialized whole-program graph (full mode).
    full: CallGraph,
    /// Lock-mode snapshot, the restore point for unfollowing.
    base: Option<CallGraph>,
    /// What is simulated and rendered.
    active: CallGraph,

    followed: BTreeSet<Address>,
    selected: Option<Address>,
    hovered: Option<NodeIndex>,

    /// Focused mode: only the neighborhood of the selection is loaded.
    focused: bool,
    skip_hubs: bool,
    /// Host cursor moves drive selection when set.
    track_cursor: bool,
    max_depth: usize,

    layout_kind: LayoutKind,
    force_state: ForceState,
    hier_state: HierState,

    pub camera: Camera,
    pub ortho: OrthoCamera,

    /// Free-flight movement speed; adjusted live by scrolling.
    pub move_speed: f32,

    unselected_opacity: f32,
    jitter_rng: StdRng,
    pub metrics: FrameMetrics,
}

impl<S: CallSource> GraphController<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            full: CallGraph::new(),
            base: None,
            active: CallGraph::new(),
            followed: BTreeSet::new(),
            selected: None,
            hovered: None,
            focused: false,
            skip_hubs: true,
            track_cursor: true,
            max_depth: 3,
            layout_kind: LayoutKind::ForceDirected3D,
            force_state: ForceState::default(),
            hier_state: HierState::default(),
            camera: Camera::default(),
            ortho: OrthoCamera::default(),
            move_speed: 0.5,
            unselected_opacity: 0.15,
            jitter_rng: StdRng::seed_from_u64(JITTER_SEED),
            metrics: FrameMetrics::default(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn active(&self) -> &CallGraph {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut CallGraph {
        &mut self.active
    }

    pub fn selected_address(&self) -> Option<Address> {
        self.selected
    }

    pub fn selected_index(&self) -> Option<NodeIndex> {
        self.selected.and_then(|addr| self.active.index_of(addr))
    }

    pub fn hovered(&self) -> Option<NodeIndex> {
        self.hovered
    }

    pub fn set_hovered(&mut self, idx: Option<NodeIndex>) {
        self.hovered = idx;
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn is_locked(&self) -> bool {
        self.base.is_some()
    }

    pub fn followed(&self) -> &BTreeSet<Address> {
        &self.followed
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn skip_hubs(&self) -> bool {
        self.skip_hubs
    }

    pub fn set_skip_hubs(&mut self, v: bool) {
        self.skip_hubs = v;
    }

    pub fn track_cursor(&self) -> bool {
        self.track_cursor
    }

    pub fn set_track_cursor(&mut self, v: bool) {
        self.track_cursor = v;
    }

    pub fn layout_kind(&self) -> LayoutKind {
        self.layout_kind
    }

    pub fn set_unselected_opacity(&mut self, v: f32) {
        self.unselected_opacity = v;
        self.recompute_shading();
    }

    /// Rebuilds everything from the data source. Discards any lock snapshot
    /// and followed set: a refresh is a wholesale rebuild.
    pub fn refresh(&mut self) {
        self.drop_lock_state();
        if self.focused {
            if let Some(addr) = self.selected {
                self.load_focused(addr);
                return;
            }
        }
        self.full = build_full_graph(&self.source, MAX_NODES);
        self.selected = None;
        self.hovered = None;
        self.apply_filter();
        self.restart_layout();
    }

    /// Toggles between whole-program and neighbors-of-selection loading.
    pub fn set_focused(&mut self, enabled: bool) {
        if self.focused == enabled {
            return;
        }
        self.focused = enabled;
        self.drop_lock_state();
        if enabled {
            if let Some(addr) = self.selected {
                self.load_focused(addr);
            }
        } else {
            if self.full.node_count() == 0 {
                self.full = build_full_graph(&self.source, MAX_NODES);
            }
            self.apply_filter();
            self.restart_layout();
        }
    }

    /// Changes the BFS depth bound. In focused mode this reloads the
    /// neighborhood; otherwise distances are recomputed on the graph in
    /// memory.
    pub fn set_max_depth(&mut self, depth: usize) {
        if depth == self.max_depth {
            return;
        }
        self.max_depth = depth.max(1);
        if self.focused {
            if let Some(addr) = self.selected {
                self.load_focused(addr);
                return;
            }
        }
        self.recompute_shading();
    }

    pub fn set_layout_kind(&mut self, kind: LayoutKind) {
        if self.layout_kind == kind {
            return;
        }
        self.layout_kind = kind;
        self.restart_layout();
    }

    /// Selects the function at `addr`. In focused mode this is a fresh
    /// neighborhood load; otherwise a distance recompute on the active graph.
    /// A locked view never reloads, selection stays within the snapshot.
    /// Unknown addresses are ignored.
    pub fn select(&mut self, addr: Address) {
        if self.selected == Some(addr) {
            return;
        }
        if self.focused && self.base.is_none() {
            self.load_focused(addr);
            return;
        }
        if !self.active.contains(addr) {
            return;
        }
        self.selected = Some(addr);
        self.recompute_shading();
        self.jump_to_selected();
    }

    /// Clears the selection. In focused mode the graph is the selection, so
    /// deselection is suppressed.
    pub fn deselect(&mut self) {
        if self.focused || self.selected.is_none() {
            return;
        }
        self.selected = None;
        self.recompute_shading();
    }

    /// Snapshots the active graph as the lock base. No-op when locked.
    pub fn lock(&mut self) {
        if self.base.is_none() {
            self.base = Some(self.active.clone());
            debug!("locked view with {} nodes", self.active.node_count());
        }
    }

    /// Restores the base snapshot and discards the followed set.
    pub fn unlock(&mut self) {
        if let Some(base) = self.base.take() {
            self.followed.clear();
            self.active = base;
            self.recompute_shading();
            self.restart_layout();
        }
    }

    /// Follows or unfollows a node while locked. Following merges the node's
    /// immediate neighborhood in place; unfollowing rebuilds the active graph
    /// from the base snapshot plus all remaining follows, because removing a
    /// shared neighbor's contribution incrementally is not well defined.
    pub fn toggle_follow(&mut self, addr: Address) {
        if self.base.is_none() || !self.active.contains(addr) {
            return;
        }
        if self.followed.insert(addr) {
            self.mark_followed(addr, true);
            self.expand_follow(addr);
        } else {
            self.followed.remove(&addr);
            self.rebuild_from_base();
        }
        self.recompute_shading();
    }

    pub fn is_followed(&self, addr: Address) -> bool {
        self.followed.contains(&addr)
    }

    /// Reacts to a host cursor move: while tracking, selects the function
    /// containing `addr`. Addresses outside any function are ignored.
    pub fn set_cursor(&mut self, addr: Address) {
        if !self.track_cursor {
            return;
        }
        let Some(info) = self.source.function_info(addr) else {
            return;
        };
        if self.selected != Some(info.address) {
            self.select(info.address);
        }
    }

    /// Selects a search hit and centers the cameras on it, like a node click.
    pub fn select_search_result(&mut self, addr: Address) {
        self.select(addr);
        self.jump_to_selected();
    }

    /// Case-insensitive substring search over the active graph's names.
    pub fn search(&self, query: &str) -> Vec<Address> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.active
            .nodes_iter()
            .filter(|(_, n)| n.name().to_lowercase().contains(&query))
            .map(|(_, n)| n.address())
            .collect()
    }

    /// Centers the camera on the selected node, if any.
    pub fn jump_to_selected(&mut self) {
        if let Some(idx) = self.selected_index() {
            if let Some(node) = self.active.node(idx) {
                let pos = node.pos();
                self.camera.look_at(pos);
                self.ortho.pan = glam::Vec2::new(pos.x, pos.y);
            }
        }
    }

    /// Restarts position seeding and the simulation.
    pub fn restart_layout(&mut self) {
        self.force_state.restart();
        self.hier_state.restart();
    }

    /// Advances the active layout by one frame. In 2D mode the layout runs to
    /// completion on its first step and is inert afterwards.
    pub fn step_layout(&mut self) {
        match self.layout_kind {
            LayoutKind::ForceDirected3D => {
                let mut layout = ForceDirected::from_state(self.force_state.clone());
                layout.next(&mut self.active);
                self.force_state = layout.state();
            }
            LayoutKind::Hierarchical2D => {
                let mut layout = Hierarchical::from_state(self.hier_state.clone());
                layout.next(&mut self.active);
                self.hier_state = layout.state();
            }
        }
    }

    pub fn simulation_running(&self) -> bool {
        match self.layout_kind {
            LayoutKind::ForceDirected3D => self.force_state.running,
            LayoutKind::Hierarchical2D => false,
        }
    }

    pub fn force_state_mut(&mut self) -> &mut ForceState {
        &mut self.force_state
    }

    fn drop_lock_state(&mut self) {
        self.base = None;
        self.followed.clear();
    }

    fn load_focused(&mut self, addr: Address) {
        let load = load_neighbors(&self.source, addr, self.max_depth, self.skip_hubs, MAX_NODES);
        if load.center.is_none() {
            return;
        }
        self.selected = Some(addr);
        self.hovered = None;
        self.active = load.graph;
        self.recompute_shading();
        self.restart_layout();
    }

    /// Derives the active graph from the full graph: identity copy unless a
    /// focused filter applies. Re-run fully after any relevant change.
    fn apply_filter(&mut self) {
        self.active = match self.selected {
            Some(addr) if self.focused => filter_by_depth(&self.full, addr, self.max_depth),
            _ => identity_copy(&self.full),
        };
        self.hovered = None;
        self.recompute_shading();
    }

    /// Merges the immediate caller/callee neighborhood of `addr` into the
    /// active graph, querying the source directly. New nodes appear jittered
    /// around the trigger node so the simulation can untangle them.
    fn expand_follow(&mut self, addr: Address) {
        let anchor = self
            .active
            .node_by_address(addr)
            .map_or(Vec3::ZERO, FunctionNode::pos);

        let mut neighbors = self.source.callers_of(addr);
        neighbors.extend(self.source.callees_of(addr));
        neighbors.sort_unstable();
        neighbors.dedup();

        let mut added = Vec::new();
        for nbr in neighbors {
            if self.active.contains(nbr) {
                continue;
            }
            if self.active.node_count() >= MAX_NODES {
                debug!("follow expansion stopped at node cap");
                break;
            }
            let Some(info) = self.source.function_info(nbr) else {
                continue;
            };
            let callers = self.source.callers_of(nbr).len();
            let callees = self.source.callees_of(nbr).len();
            let mut node = FunctionNode::new(info.address, info.name, info.size)
                .with_xrefs(callers as u32, callees as u32);
            node.set_hub(self.source.xref_count(nbr) >= HUB_XREF_THRESHOLD);
            node.set_pos(anchor + self.jitter());
            self.active.add_function(node);
            added.push(nbr);
        }

        // Wire up every present edge touching the expansion frontier.
        added.push(addr);
        for a in added {
            for callee in self.source.callees_of(a) {
                self.active.add_call(a, callee);
            }
            for caller in self.source.callers_of(a) {
                self.active.add_call(caller, a);
            }
        }

        // Let the simulation absorb the newcomers.
        self.force_state.running = true;
        self.force_state.step_count = 0;
        self.hier_state.restart();
    }

    /// Rebuilds the active graph as base plus re-expansion of every remaining
    /// followed node.
    fn rebuild_from_base(&mut self) {
        let Some(base) = &self.base else {
            return;
        };
        self.active = base.clone();
        self.hovered = None;
        let followed: Vec<Address> = self.followed.iter().copied().collect();
        for addr in followed {
            // A followed node may have entered through another follow's
            // expansion and be absent from the base; re-materialize it.
            if !self.active.contains(addr) {
                let Some(info) = self.source.function_info(addr) else {
                    continue;
                };
                let callers = self.source.callers_of(addr).len();
                let callees = self.source.callees_of(addr).len();
                let mut node = FunctionNode::new(info.address, info.name, info.size)
                    .with_xrefs(callers as u32, callees as u32);
                node.set_hub(self.source.xref_count(addr) >= HUB_XREF_THRESHOLD);
                node.set_pos(self.jitter());
                self.active.add_function(node);
            }
            self.mark_followed(addr, true);
            self.expand_follow(addr);
        }
    }

    fn mark_followed(&mut self, addr: Address, followed: bool) {
        if let Some(idx) = self.active.index_of(addr) {
            if let Some(node) = self.active.node_mut(idx) {
                node.set_followed(followed);
            }
        }
    }

    fn jitter(&mut self) -> Vec3 {
        loop {
            let p = Vec3::new(
                self.jitter_rng.random_range(-1.0..=1.0),
                self.jitter_rng.random_range(-1.0..=1.0),
                self.jitter_rng.random_range(-1.0..=1.0),
            );
            if p.length_squared() <= 1.0 {
                return p * FOLLOW_JITTER_RADIUS;
            }
        }
    }

    /// Recomputes both shading channels wholesale: graph distance from the
    /// selection (color ramp and, with no follows, opacity) and follow
    /// distance from the followed set (opacity). Never patched incrementally.
    fn recompute_shading(&mut self) {
        self.compute_distances_from_selection();
        if !self.followed.is_empty() {
            self.apply_follow_fade();
        }
    }

    fn compute_distances_from_selection(&mut self) {
        let selected = self.selected_index();
        let unselected_opacity = if selected.is_some() {
            self.unselected_opacity
        } else {
            1.0
        };
        for idx in self.active.node_indices() {
            if let Some(node) = self.active.node_mut(idx) {
                node.set_graph_distance(-1);
                node.set_importance(0.);
                node.set_opacity(unselected_opacity);
            }
        }
        let Some(start) = selected else {
            return;
        };

        let distances = self.active.bfs_distances_bounded(&[start], Some(self.max_depth));
        let depth_scale = self.max_depth as f32 + 1.;
        for (idx, d) in distances {
            if let Some(node) = self.active.node_mut(idx) {
                node.set_graph_distance(d as i32);
                node.set_importance(1. - d as f32 / depth_scale);
                node.set_opacity(1.);
            }
        }
    }

    /// Multi-source BFS from all followed nodes; opacity falls linearly from
    /// 1.0 at distance 0 to the floor at the observed maximum. Normalizing by
    /// the observed maximum means fade steepness shifts as the followed set
    /// changes.
    fn apply_follow_fade(&mut self) {
        let seeds: Vec<NodeIndex> = self
            .followed
            .iter()
            .filter_map(|&addr| self.active.index_of(addr))
            .collect();
        if seeds.is_empty() {
            return;
        }

        let distances = self.active.bfs_distances_multi(&seeds);
        let max_dist = distances.values().copied().max().unwrap_or(0) as f32;

        for idx in self.active.node_indices() {
            let Some(node) = self.active.node_mut(idx) else {
                continue;
            };
            match distances.get(&idx) {
                Some(&d) => {
                    node.set_follow_distance(d as i32);
                    let opacity = if max_dist > 0. {
                        1. - (1. - FOLLOW_OPACITY_FLOOR) * (d as f32 / max_dist)
                    } else {
                        1.
                    };
                    node.set_opacity(opacity);
                }
                None => {
                    node.set_follow_distance(-1);
                    node.set_opacity(DISCONNECTED_OPACITY);
                }
            }
        }
    }
}
