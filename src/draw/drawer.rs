use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Stroke};
use petgraph::stable_graph::NodeIndex;

use crate::camera::Projector;
use crate::elements::FunctionNode;
use crate::graph::CallGraph;
use crate::settings::SettingsStyle;

/// Nodes projected this far outside the canvas are not drawn.
const CULL_MARGIN: f32 = 50.0;
const MIN_NODE_SIZE: f32 = 2.0;
const MAX_NODE_SIZE: f32 = 30.0;
/// Projected points past this are the off-screen sentinel.
const SENTINEL_CUTOFF: f32 = -5000.0;

const BACKGROUND: Color32 = Color32::from_rgb(15, 15, 20);

/// Everything a draw pass needs besides the graph itself.
pub struct DrawContext<'a> {
    pub painter: &'a Painter,
    pub canvas: Rect,
    pub projector: Projector<'a>,
    pub style: &'a SettingsStyle,
    pub selected: Option<NodeIndex>,
    pub hovered: Option<NodeIndex>,
}

/// Immediate-mode renderer: background, then edges, then nodes sorted
/// far-to-near so close nodes paint over distant ones.
pub struct Drawer<'a> {
    g: &'a CallGraph,
    ctx: &'a DrawContext<'a>,
}

impl<'a> Drawer<'a> {
    pub fn new(g: &'a CallGraph, ctx: &'a DrawContext<'a>) -> Self {
        Self { g, ctx }
    }

    pub fn draw(self) {
        self.ctx.painter.rect_filled(self.ctx.canvas, 0.0, BACKGROUND);

        if self.g.node_count() == 0 {
            self.ctx.painter.text(
                self.ctx.canvas.center(),
                Align2::CENTER_CENTER,
                "No data",
                FontId::proportional(14.0),
                Color32::from_gray(128),
            );
            return;
        }

        if self.ctx.style.show_edges {
            self.draw_edges();
        }
        self.draw_nodes();
    }

    fn draw_edges(&self) {
        let has_selection = self.ctx.selected.is_some();
        for (idx, _) in self.g.edges_iter() {
            let Some((a, b)) = self.g.edge_endpoints(idx) else {
                continue;
            };
            let (Some(from), Some(to)) = (self.g.node(a), self.g.node(b)) else {
                continue;
            };

            let opacity = from.opacity().min(to.opacity());
            if opacity < 0.05 {
                continue;
            }

            let from_screen = self.ctx.projector.project(from.pos());
            let to_screen = self.ctx.projector.project(to.pos());
            if from_screen.x < SENTINEL_CUTOFF || to_screen.x < SENTINEL_CUTOFF {
                continue;
            }

            let color = edge_color(has_selection, from, to, opacity);
            self.ctx
                .painter
                .line_segment([from_screen, to_screen], Stroke::new(1.0, color));
        }
    }

    fn draw_nodes(&self) {
        // Painter's algorithm: sort far-to-near by view depth.
        let mut order: Vec<(NodeIndex, f32)> = self
            .g
            .nodes_iter()
            .map(|(idx, n)| (idx, self.ctx.projector.depth(n.pos())))
            .collect();
        order.sort_by(|a, b| b.1.total_cmp(&a.1));

        for (idx, depth) in order {
            let Some(node) = self.g.node(idx) else {
                continue;
            };
            if node.opacity() < 0.05 {
                continue;
            }

            let screen = self.ctx.projector.project(node.pos());
            if !self.on_canvas(screen) {
                continue;
            }

            let selected = self.ctx.selected == Some(idx);
            let hovered = self.ctx.hovered == Some(idx);
            let has_selection = self.ctx.selected.is_some();

            let mut size = node_size(self.ctx.style.base_node_size, node.scale(), depth);
            if selected {
                size *= 1.4;
            } else if hovered {
                size *= 1.3;
            }

            let color = node_color(node, selected, hovered, has_selection);
            self.ctx.painter.circle_filled(screen, size, color);

            let alpha = (node.opacity() * 255.0) as u8;
            if selected || hovered {
                self.ctx.painter.circle_stroke(
                    screen,
                    size + 2.0,
                    Stroke::new(2.0, Color32::from_rgba_unmultiplied(255, 255, 255, alpha)),
                );
            } else if node.followed() {
                self.ctx.painter.circle_stroke(
                    screen,
                    size + 2.0,
                    Stroke::new(1.5, Color32::from_rgba_unmultiplied(255, 180, 80, alpha)),
                );
            }

            if self.wants_label(node, selected || hovered, depth) {
                let mut text_alpha = (node.opacity() * 200.0) as u8;
                let direct_neighbor = has_selection && node.graph_distance() == 1;
                if direct_neighbor && !self.within_label_distance(node, depth) {
                    text_alpha = 220;
                }
                self.ctx.painter.text(
                    Pos2::new(screen.x + size + 3.0, screen.y - 6.0),
                    Align2::LEFT_TOP,
                    node.name(),
                    FontId::proportional(12.0),
                    Color32::from_rgba_unmultiplied(200, 200, 200, text_alpha),
                );
            }
        }
    }

    fn on_canvas(&self, p: Pos2) -> bool {
        self.ctx.canvas.expand(CULL_MARGIN).contains(p)
    }

    fn within_label_distance(&self, node: &FunctionNode, depth: f32) -> bool {
        self.ctx.style.show_labels && node.opacity() > 0.5 && depth < self.ctx.style.label_distance
    }

    fn wants_label(&self, node: &FunctionNode, highlighted: bool, depth: f32) -> bool {
        let direct_neighbor = self.ctx.selected.is_some() && node.graph_distance() == 1;
        self.within_label_distance(node, depth) || highlighted || direct_neighbor
    }
}

/// Node radius from base size, connectivity scale and view depth, clamped so
/// distant nodes remain visible and close ones never flood the canvas.
pub(crate) fn node_size(base: f32, scale: f32, depth: f32) -> f32 {
    let depth_scale = 1.0 / (1.0 + depth.max(0.0) * 0.05);
    (base * scale * depth_scale).clamp(MIN_NODE_SIZE, MAX_NODE_SIZE)
}

fn edge_color(
    has_selection: bool,
    from: &FunctionNode,
    to: &FunctionNode,
    opacity: f32,
) -> Color32 {
    if has_selection {
        let alpha = (opacity * 100.0) as u8;
        if from.importance() > 0.5 || to.importance() > 0.5 {
            Color32::from_rgba_unmultiplied(100, 150, 255, alpha)
        } else {
            Color32::from_rgba_unmultiplied(60, 60, 80, alpha)
        }
    } else {
        Color32::from_rgba_unmultiplied(60, 70, 90, 60)
    }
}

/// Color encoding: selection green, hover yellow, a blue-to-green ramp by
/// distance from the selection, gray for unreachable nodes, and a
/// connectivity-tinted blue when nothing is selected.
pub(crate) fn node_color(
    node: &FunctionNode,
    selected: bool,
    hovered: bool,
    has_selection: bool,
) -> Color32 {
    let alpha = (node.opacity() * 255.0) as u8;
    if selected {
        return Color32::from_rgba_unmultiplied(100, 255, 150, alpha);
    }
    if hovered {
        return Color32::from_rgba_unmultiplied(255, 255, 100, alpha);
    }
    if has_selection && node.graph_distance() >= 0 {
        let t = node.importance();
        let r = ((1.0 - t) * 80.0 + t * 100.0) as u8;
        let g = ((1.0 - t) * 120.0 + t * 230.0) as u8;
        let b = ((1.0 - t) * 220.0 + t * 180.0) as u8;
        return Color32::from_rgba_unmultiplied(r, g, b, alpha);
    }
    if has_selection {
        return Color32::from_rgba_unmultiplied(80, 80, 90, alpha);
    }
    let conn = ((node.caller_count() + node.callee_count()) as f32 / 10.0).min(1.0);
    let r = (80.0 + conn * 100.0) as u8;
    let g = (120.0 + conn * 80.0) as u8;
    let b = (200.0 - conn * 50.0) as u8;
    Color32::from_rgba_unmultiplied(r, g, b, alpha)
}
