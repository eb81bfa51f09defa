use glam::{Vec2, Vec3};
use petgraph::stable_graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::graph::CallGraph;
use crate::layouts::{AnimatedState, Layout, LayoutState};

/// Ideal length of a single graph hop in layout units.
const IDEAL_EDGE_LENGTH: f32 = 1.5;
const SPRING_CONSTANT: f32 = 1.0;
/// Relaxation stops once the largest node gradient drops below this.
const KK_TOLERANCE: f32 = 0.01;
const SIMILARITY_FLOOR: f32 = 0.01;
const COOLING: f32 = 0.95;
const MIN_DISTANCE: f32 = 1e-6;

/// State of the 2D layout. The layout runs to completion the first time it is
/// stepped and is inert afterwards until restarted.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct State {
    pub triggered: bool,
}

impl LayoutState for State {}

impl AnimatedState for State {
    fn is_running(&self) -> bool {
        !self.triggered
    }

    fn set_running(&mut self, v: bool) {
        self.triggered = !v;
    }
}

impl State {
    pub fn restart(&mut self) {
        self.triggered = false;
    }
}

/// Two-phase 2D layout: Kamada-Kawai stress relaxation over graph-theoretic
/// distances establishes the global shape, then a similarity-weighted
/// Fruchterman-Reingold pass spreads structurally unrelated nodes apart while
/// keeping nodes with shared neighborhoods together. All output sits on the
/// z = 0 plane.
#[derive(Debug, Default)]
pub struct Hierarchical {
    state: State,
}

impl Layout<State> for Hierarchical {
    fn from_state(state: State) -> Self {
        Self { state }
    }

    fn next(&mut self, g: &mut CallGraph) {
        if self.state.triggered {
            return;
        }
        self.state.triggered = true;

        let n = g.node_count();
        if n == 0 {
            return;
        }

        let indices = g.node_indices();
        if n == 1 {
            if let Some(node) = g.node_mut(indices[0]) {
                node.set_pos(Vec3::ZERO);
                node.set_vel(Vec3::ZERO);
            }
            return;
        }

        let dist = hop_distances(g, &indices);
        let mut pos = circle_positions(n);
        kamada_kawai(&mut pos, &dist);

        let sim = neighborhood_similarity(g, &indices);
        let springs = edge_slots(g, &indices);
        refine(&mut pos, &sim, &springs);

        center_on_centroid(&mut pos);

        for (i, &idx) in indices.iter().enumerate() {
            if let Some(node) = g.node_mut(idx) {
                node.set_pos(Vec3::new(pos[i].x, pos[i].y, 0.0));
                node.set_vel(Vec3::ZERO);
            }
        }
        log::debug!("hierarchical layout placed {n} nodes");
    }

    fn state(&self) -> State {
        self.state.clone()
    }
}

/// Evenly spaced positions on a circle sized so adjacent slots sit roughly an
/// ideal edge length apart.
fn circle_positions(n: usize) -> Vec<Vec2> {
    #[allow(clippy::cast_precision_loss)]
    let radius = (IDEAL_EDGE_LENGTH * n as f32 / std::f32::consts::TAU).max(1.0);
    (0..n)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let angle = std::f32::consts::TAU * i as f32 / n as f32;
            Vec2::new(angle.cos(), angle.sin()) * radius
        })
        .collect()
}

/// All-pairs hop counts over the undirected edge relation. Unreachable pairs
/// are assigned the graph diameter plus one so separate components still
/// repel each other.
fn hop_distances(g: &CallGraph, indices: &[NodeIndex]) -> Vec<Vec<f32>> {
    let n = indices.len();
    let slot: HashMap<NodeIndex, usize> =
        indices.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();

    let mut hops = vec![vec![usize::MAX; n]; n];
    let mut diameter = 1;
    for (i, &idx) in indices.iter().enumerate() {
        for (other, d) in g.bfs_distances(idx) {
            hops[i][slot[&other]] = d;
            diameter = diameter.max(d);
        }
    }

    let fallback = diameter + 1;
    hops.into_iter()
        .map(|row| {
            row.into_iter()
                .map(|d| {
                    #[allow(clippy::cast_precision_loss)]
                    let d = if d == usize::MAX { fallback } else { d };
                    d as f32
                })
                .collect()
        })
        .collect()
}

/// Kamada-Kawai relaxation: repeatedly moves the node with the largest
/// stress gradient by a Newton step until the gradient falls under tolerance
/// or the iteration budget runs out.
fn kamada_kawai(pos: &mut [Vec2], hops: &[Vec<f32>]) {
    let n = pos.len();
    let budget = (10 * n).min(300);

    for _ in 0..budget {
        let (worst, delta) = (0..n)
            .map(|i| (i, gradient(pos, hops, i).length()))
            .fold((0, 0.0_f32), |acc, cur| if cur.1 > acc.1 { cur } else { acc });
        if delta < KK_TOLERANCE {
            break;
        }
        newton_step(pos, hops, worst);
    }
}

/// Ideal distance and spring stiffness for one node pair.
fn pair_params(hop: f32) -> (f32, f32) {
    let ideal = IDEAL_EDGE_LENGTH * hop;
    let stiffness = SPRING_CONSTANT / (hop * hop + 0.1);
    (ideal, stiffness)
}

fn gradient(pos: &[Vec2], hops: &[Vec<f32>], m: usize) -> Vec2 {
    let mut grad = Vec2::ZERO;
    for i in 0..pos.len() {
        if i == m {
            continue;
        }
        let (ideal, k) = pair_params(hops[m][i]);
        let delta = pos[m] - pos[i];
        let d = delta.length().max(MIN_DISTANCE);
        grad += k * delta * (1.0 - ideal / d);
    }
    grad
}

/// One Newton-Raphson update of node `m` against the stress Hessian. A
/// near-singular Hessian falls back to a plain gradient descent step.
fn newton_step(pos: &mut [Vec2], hops: &[Vec<f32>], m: usize) {
    let mut grad = Vec2::ZERO;
    let (mut dxx, mut dxy, mut dyy) = (0.0_f32, 0.0_f32, 0.0_f32);

    for i in 0..pos.len() {
        if i == m {
            continue;
        }
        let (ideal, k) = pair_params(hops[m][i]);
        let delta = pos[m] - pos[i];
        let d = delta.length().max(MIN_DISTANCE);
        let d3 = d * d * d;

        grad += k * delta * (1.0 - ideal / d);
        dxx += k * (1.0 - ideal * delta.y * delta.y / d3);
        dyy += k * (1.0 - ideal * delta.x * delta.x / d3);
        dxy += k * ideal * delta.x * delta.y / d3;
    }

    let det = dxx * dyy - dxy * dxy;
    if det.abs() < MIN_DISTANCE {
        pos[m] -= grad * 0.1;
        return;
    }
    pos[m] -= Vec2::new(
        (dyy * grad.x - dxy * grad.y) / det,
        (dxx * grad.y - dxy * grad.x) / det,
    );
}

/// Jaccard similarity of undirected neighbor sets, with a direct edge counted
/// into the intersection so adjacent leaf pairs do not score zero. Floored so
/// repulsion never divides by zero.
fn neighborhood_similarity(g: &CallGraph, indices: &[NodeIndex]) -> Vec<Vec<f32>> {
    let n = indices.len();
    let slot: HashMap<NodeIndex, usize> =
        indices.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();

    let mut neighbors: Vec<HashSet<usize>> = vec![HashSet::new(); n];
    for (idx, _) in g.edges_iter() {
        if let Some((a, b)) = g.edge_endpoints(idx) {
            let (i, j) = (slot[&a], slot[&b]);
            neighbors[i].insert(j);
            neighbors[j].insert(i);
        }
    }

    let mut sim = vec![vec![SIMILARITY_FLOOR; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let shared = neighbors[i].intersection(&neighbors[j]).count();
            let direct = usize::from(neighbors[i].contains(&j));
            let union = neighbors[i].len() + neighbors[j].len() - shared;
            #[allow(clippy::cast_precision_loss)]
            let s = if union == 0 {
                SIMILARITY_FLOOR
            } else {
                ((shared + direct) as f32 / union as f32).max(SIMILARITY_FLOOR)
            };
            sim[i][j] = s;
            sim[j][i] = s;
        }
    }
    sim
}

fn edge_slots(g: &CallGraph, indices: &[NodeIndex]) -> Vec<(usize, usize)> {
    let slot: HashMap<NodeIndex, usize> =
        indices.iter().enumerate().map(|(i, &idx)| (idx, i)).collect();
    g.edges_iter()
        .filter_map(|(idx, _)| g.edge_endpoints(idx))
        .map(|(a, b)| (slot[&a], slot[&b]))
        .collect()
}

/// Similarity-weighted Fruchterman-Reingold pass. Dissimilar pairs repel
/// harder, similar connected pairs pull closer, displacement is capped by a
/// cooling temperature.
fn refine(pos: &mut [Vec2], sim: &[Vec<f32>], springs: &[(usize, usize)]) {
    let n = pos.len();
    #[allow(clippy::cast_precision_loss)]
    let area = n as f32 * (2.0 * IDEAL_EDGE_LENGTH) * (2.0 * IDEAL_EDGE_LENGTH);
    #[allow(clippy::cast_precision_loss)]
    let f = (area / n as f32).sqrt();
    let mut temp = area.sqrt() * 0.5;
    let budget = (5 * n).min(200);

    for _ in 0..budget {
        let mut disp = vec![Vec2::ZERO; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let delta = pos[i] - pos[j];
                let d = delta.length().max(MIN_DISTANCE);
                let force = f * f / (d * sim[i][j]);
                let dir = delta / d;
                disp[i] += dir * force;
                disp[j] -= dir * force;
            }
        }

        for &(i, j) in springs {
            let delta = pos[i] - pos[j];
            let d = delta.length().max(MIN_DISTANCE);
            let force = d * sim[i][j] / (f * f);
            let dir = delta / d;
            disp[i] -= dir * force;
            disp[j] += dir * force;
        }

        for i in 0..n {
            let step = disp[i].clamp_length_max(temp);
            if step.is_finite() {
                pos[i] += step;
            }
        }
        temp *= COOLING;
    }
}

fn center_on_centroid(pos: &mut [Vec2]) {
    if pos.is_empty() {
        return;
    }
    #[allow(clippy::cast_precision_loss)]
    let centroid = pos.iter().copied().sum::<Vec2>() / pos.len() as f32;
    for p in pos.iter_mut() {
        *p -= centroid;
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

    #[test]
    fn single_node_lands_at_origin() {
        let mut g = graph_of(1, &[]);
        let mut layout = Hierarchical::default();
        layout.next(&mut g);
        let idx = g.node_indices()[0];
        assert_eq!(g.node(idx).unwrap().pos(), Vec3::ZERO);
    }

    #[test]
    fn runs_once_then_goes_inert() {
        let mut g = graph_of(3, &[(0, 1), (1, 2)]);
        let mut layout = Hierarchical::default();
        layout.next(&mut g);
        assert!(layout.state().triggered);

        let before: Vec<Vec3> =
            g.node_indices().iter().map(|&i| g.node(i).unwrap().pos()).collect();
        let mut layout = Hierarchical::from_state(layout.state());
        layout.next(&mut g);
        let after: Vec<Vec3> =
            g.node_indices().iter().map(|&i| g.node(i).unwrap().pos()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn output_is_planar_finite_and_centered() {
        let mut g = graph_of(6, &[(0, 1), (1, 2), (2, 3), (3, 4), (0, 5)]);
        let mut layout = Hierarchical::default();
        layout.next(&mut g);

        let mut centroid = Vec3::ZERO;
        for idx in g.node_indices() {
            let p = g.node(idx).unwrap().pos();
            assert!(p.is_finite());
            assert_eq!(p.z, 0.0);
            centroid += p;
        }
        centroid /= 6.0;
        assert!(centroid.length() < 1e-3, "centroid {centroid} not at origin");
    }

    #[test]
    fn kamada_kawai_settles_pairs_near_ideal_length() {
        let hops = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let mut pos = vec![Vec2::new(0.0, 0.0), Vec2::new(5.0, 0.0)];
        kamada_kawai(&mut pos, &hops);
        let d = (pos[0] - pos[1]).length();
        assert!(
            (d - IDEAL_EDGE_LENGTH).abs() < 0.1,
            "expected ~{IDEAL_EDGE_LENGTH}, got {d}"
        );
    }

    #[test]
    fn similarity_counts_direct_edges_and_shared_neighbors() {
        // 0 and 1 both call 2; 0 also calls 1 directly.
        let g = graph_of(3, &[(0, 2), (1, 2), (0, 1)]);
        let indices = g.node_indices();
        let sim = neighborhood_similarity(&g, &indices);

        // Neighborhoods: N0 = {1, 2}, N1 = {0, 2}, shared = {2}, union size 3,
        // plus the direct edge: (1 + 1) / 3.
        assert!((sim[0][1] - 2.0 / 3.0).abs() < 1e-6);
        assert_eq!(sim[0][1], sim[1][0]);
    }

    #[test]
    fn disconnected_pairs_keep_the_similarity_floor() {
        let g = graph_of(4, &[(0, 1), (2, 3)]);
        let indices = g.node_indices();
        let sim = neighborhood_similarity(&g, &indices);
        assert_eq!(sim[0][2], SIMILARITY_FLOOR);
    }

    #[test]
    fn empty_graph_is_a_no_op() {
        let mut g = CallGraph::default();
        let mut layout = Hierarchical::default();
        layout.next(&mut g);
        assert!(layout.state().triggered);
    }
}
