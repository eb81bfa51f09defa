use glam::Vec3;
use petgraph::stable_graph::NodeIndex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::graph::CallGraph;
use crate::layouts::{AnimatedState, Layout, LayoutState};

const DEFAULT_REPULSION: f32 = 50.0;
const DEFAULT_ATTRACTION: f32 = 0.05;
const DEFAULT_REST_LENGTH: f32 = 0.5;
const DEFAULT_GRAVITY: f32 = -0.01;
const DEFAULT_DAMPING: f32 = 0.85;
const DEFAULT_DT: f32 = 0.1;
/// Simulation halts once every node moves slower than this.
const DEFAULT_MIN_VELOCITY: f32 = 0.01;
const DEFAULT_MAX_STEPS: u32 = 500;
const DEFAULT_SEED: u64 = 42;

/// State of the 3D force simulation. Tunables default to values that settle
/// call graphs of a few thousand nodes in well under the step cap.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct State {
    pub initialized: bool,
    pub running: bool,
    pub step_count: u32,

    pub repulsion: f32,
    pub attraction: f32,
    pub rest_length: f32,
    pub gravity: f32,
    pub damping: f32,
    pub dt: f32,
    pub min_velocity: f32,
    pub max_steps: u32,
    pub seed: u64,
}

impl Default for State {
    fn default() -> Self {
        Self {
            initialized: false,
            running: false,
            step_count: 0,

            repulsion: DEFAULT_REPULSION,
            attraction: DEFAULT_ATTRACTION,
            rest_length: DEFAULT_REST_LENGTH,
            gravity: DEFAULT_GRAVITY,
            damping: DEFAULT_DAMPING,
            dt: DEFAULT_DT,
            min_velocity: DEFAULT_MIN_VELOCITY,
            max_steps: DEFAULT_MAX_STEPS,
            seed: DEFAULT_SEED,
        }
    }
}

impl LayoutState for State {}

impl AnimatedState for State {
    fn is_running(&self) -> bool {
        self.running
    }

    fn set_running(&mut self, v: bool) {
        self.running = v;
    }

    fn step_count(&self) -> u32 {
        self.step_count
    }

    fn set_step_count(&mut self, v: u32) {
        self.step_count = v;
    }
}

impl State {
    /// Marks the simulation for re-seeding and restart on the next step.
    pub fn restart(&mut self) {
        self.initialized = false;
    }
}

/// 3D force simulation: pairwise repulsion, spring attraction along call
/// edges, and a weak pull towards the origin that keeps disconnected
/// components from drifting apart.
#[derive(Debug, Default)]
pub struct ForceDirected {
    state: State,
}

impl Layout<State> for ForceDirected {
    fn from_state(state: State) -> Self {
        Self { state }
    }

    fn next(&mut self, g: &mut CallGraph) {
        if g.node_count() == 0 {
            return;
        }

        if !self.state.initialized {
            self.seed_positions(g);
            self.state.initialized = true;
            self.state.running = true;
            self.state.step_count = 0;
        }

        if !self.state.running {
            return;
        }

        let max_velocity = self.step(g);
        self.state.step_count += 1;

        if max_velocity < self.state.min_velocity || self.state.step_count >= self.state.max_steps
        {
            self.state.running = false;
            log::debug!(
                "force simulation settled after {} steps (max velocity {:.4})",
                self.state.step_count,
                max_velocity
            );
        }
    }

    fn state(&self) -> State {
        self.state.clone()
    }
}

impl ForceDirected {
    /// Scatters nodes uniformly inside a sphere whose radius grows with the
    /// square root of the node count. A lone node sits at the origin.
    fn seed_positions(&self, g: &mut CallGraph) {
        let n = g.node_count();
        if n == 1 {
            let idx = g.node_indices()[0];
            if let Some(node) = g.node_mut(idx) {
                node.set_pos(Vec3::ZERO);
                node.set_vel(Vec3::ZERO);
            }
            return;
        }

        let mut rng = StdRng::seed_from_u64(self.state.seed);
        #[allow(clippy::cast_precision_loss)]
        let radius = ((n as f32).sqrt() * 0.5).max(1.0);
        for idx in g.node_indices() {
            let p = sample_in_unit_ball(&mut rng) * radius;
            if let Some(node) = g.node_mut(idx) {
                node.set_pos(p);
                node.set_vel(Vec3::ZERO);
            }
        }
    }

    /// Advances the simulation by one tick and returns the largest node
    /// velocity observed after integration.
    fn step(&self, g: &mut CallGraph) -> f32 {
        let indices: Vec<NodeIndex> = g.node_indices();
        let slot: HashMap<NodeIndex, usize> =
            indices.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();

        let mut pos = Vec::with_capacity(indices.len());
        let mut vel = Vec::with_capacity(indices.len());
        for &idx in &indices {
            let (p, v) = g.node(idx).map_or((Vec3::ZERO, Vec3::ZERO), |n| (n.pos(), n.vel()));
            pos.push(p);
            vel.push(v);
        }

        // Pairwise repulsion, inverse-square with a floor on the distance.
        for i in 0..pos.len() {
            for j in (i + 1)..pos.len() {
                let delta = pos[i] - pos[j];
                let dist_sq = delta.length_squared().max(0.01);
                let force = self.state.repulsion / dist_sq;
                let dir = delta.normalize_or_zero();
                vel[i] += dir * force * self.state.dt;
                vel[j] -= dir * force * self.state.dt;
            }
        }

        // Spring attraction along edges past the rest length.
        let springs: Vec<(usize, usize)> = g
            .edges_iter()
            .filter_map(|(idx, _)| g.edge_endpoints(idx))
            .map(|(a, b)| (slot[&a], slot[&b]))
            .collect();
        for (i, j) in springs {
            let delta = pos[j] - pos[i];
            let dist = delta.length();
            if dist <= self.state.rest_length {
                continue;
            }
            let force = (dist - self.state.rest_length) * self.state.attraction;
            let dir = delta / dist;
            vel[i] += dir * force * self.state.dt;
            vel[j] -= dir * force * self.state.dt;
        }

        // Weak pull towards the origin.
        for (i, p) in pos.iter().enumerate() {
            vel[i] += *p * self.state.gravity * self.state.dt;
        }

        let mut max_velocity = 0.0_f32;
        for (i, &idx) in indices.iter().enumerate() {
            let v = vel[i] * self.state.damping;
            let p = pos[i] + v * self.state.dt;
            max_velocity = max_velocity.max(v.length());
            if let Some(node) = g.node_mut(idx) {
                node.set_vel(v);
                node.set_pos(p);
            }
        }
        max_velocity
    }
}

fn sample_in_unit_ball(rng: &mut StdRng) -> Vec3 {
    loop {
        let p = Vec3::new(
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
            rng.random_range(-1.0..=1.0),
        );
        if p.length_squared() <= 1.0 {
            return p;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::FunctionNode;

    fn graph_of(n: usize, edges: &[(usize, usize)]) -> CallGraph {
        let mut g = CallGraph::default();
        let addrs: Vec<u64> = (0..n).map(|i| 0x1000 + i as u64).collect();
        for (i, &addr) in addrs.iter().enumerate() {
            g.add_function(FunctionNode::new(addr, format!("f{i}"), 16));
        }
        for &(a, b) in edges {
            g.add_call(addrs[a], addrs[b]);
        }
        g
    }

    fn run_until_settled(g: &mut CallGraph) -> State {
        let mut state = State::default();
        for _ in 0..=DEFAULT_MAX_STEPS {
            let mut layout = ForceDirected::from_state(state);
            layout.next(g);
            state = layout.state();
            if state.initialized && !state.running {
                break;
            }
        }
        state
    }

    #[test]
    fn single_node_lands_at_origin() {
        let mut g = graph_of(1, &[]);
        let state = run_until_settled(&mut g);
        assert!(!state.running);
        let idx = g.node_indices()[0];
        assert_eq!(g.node(idx).unwrap().pos(), Vec3::ZERO);
    }

    #[test]
    fn repulsion_separates_coincident_nodes() {
        let mut g = graph_of(2, &[]);
        let mut layout = ForceDirected::default();
        layout.next(&mut g);
        for _ in 0..10 {
            let mut layout = ForceDirected::from_state(layout.state());
            layout.next(&mut g);
        }
        let idxs = g.node_indices();
        let d = (g.node(idxs[0]).unwrap().pos() - g.node(idxs[1]).unwrap().pos()).length();
        assert!(d > 0.1, "nodes should push apart, got distance {d}");
    }

    #[test]
    fn simulation_settles_within_step_cap() {
        let mut g = graph_of(5, &[(0, 1), (1, 2), (2, 3), (3, 4)]);
        let state = run_until_settled(&mut g);
        assert!(state.initialized);
        assert!(!state.running);
        assert!(state.step_count <= DEFAULT_MAX_STEPS);
        for idx in g.node_indices() {
            assert!(g.node(idx).unwrap().pos().is_finite());
        }
    }

    #[test]
    fn stopped_simulation_leaves_positions_untouched() {
        let mut g = graph_of(3, &[(0, 1), (1, 2)]);
        let state = run_until_settled(&mut g);
        let before: Vec<Vec3> = g.node_indices().iter().map(|&i| g.node(i).unwrap().pos()).collect();

        let mut layout = ForceDirected::from_state(state);
        layout.next(&mut g);

        let after: Vec<Vec3> = g.node_indices().iter().map(|&i| g.node(i).unwrap().pos()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn restart_reseeds_positions() {
        let mut g = graph_of(4, &[(0, 1), (2, 3)]);
        let mut state = run_until_settled(&mut g);
        state.restart();
        let mut layout = ForceDirected::from_state(state);
        layout.next(&mut g);
        let state = layout.state();
        assert!(state.running);
        assert_eq!(state.step_count, 1);
    }

    #[test]
    fn empty_graph_is_a_no_op() {
        let mut g = CallGraph::default();
        let mut layout = ForceDirected::default();
        layout.next(&mut g);
        assert!(!layout.state().initialized);
    }
}
