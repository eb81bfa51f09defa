use egui::{Key, PointerButton, Pos2, Rect, Response, Sense, Ui, Widget};
use glam::Vec3;
use instant::Instant;
use petgraph::stable_graph::NodeIndex;

use crate::camera::{Projector, OFFSCREEN};
use crate::controller::{GraphController, LayoutKind};
use crate::draw::{DrawContext, Drawer};
use crate::events::{
    Event, EventSink, PayloadFollowToggle, PayloadLockChange, PayloadNavigateTo,
    PayloadNodeDeselect, PayloadNodeHoverEnter, PayloadNodeHoverLeave, PayloadNodeSelect,
};
use crate::elements::Address;
use crate::settings::{SettingsInteraction, SettingsNavigation, SettingsStyle};
use crate::source::CallSource;

/// Release within this squared pixel distance of the press is a click.
const CLICK_THRESHOLD_SQ: f32 = 25.0;
/// Squared pixel radius for nearest-node hover hits.
const HOVER_RADIUS_SQ: f32 = 400.0;
/// Nodes faded below this are not hoverable or clickable.
const HOVER_MIN_OPACITY: f32 = 0.1;

const ORBIT_PITCH_LIMIT: f32 = 1.5;
const FLIGHT_PITCH_LIMIT: f32 = 1.55;
const MIN_MOVE_SPEED: f32 = 0.05;
const MAX_MOVE_SPEED: f32 = 5.0;
/// Pixels of scroll per wheel notch, for normalizing `raw_scroll_delta`.
const SCROLL_UNIT: f32 = 50.0;

/// Immediate-mode call graph widget.
///
/// Constructed fresh every frame around a persistent [`GraphController`]; all
/// durable state lives there. Each frame runs one layout step, handles
/// pointer and keyboard input, then draws.
///
/// ```no_run
/// # use egui_callgraph::{CallGraphView, GraphController, StaticSource};
/// # fn ui(ui: &mut egui::Ui, ctrl: &mut GraphController<StaticSource>) {
/// ui.add(&mut CallGraphView::new(ctrl));
/// # }
/// ```
pub struct CallGraphView<'a, S> {
    ctrl: &'a mut GraphController<S>,
    settings_interaction: SettingsInteraction,
    settings_navigation: SettingsNavigation,
    settings_style: SettingsStyle,
    events: Option<&'a dyn EventSink>,
}

impl<'a, S: CallSource> CallGraphView<'a, S> {
    pub fn new(ctrl: &'a mut GraphController<S>) -> Self {
        Self {
            ctrl,
            settings_interaction: SettingsInteraction::default(),
            settings_navigation: SettingsNavigation::default(),
            settings_style: SettingsStyle::default(),
            events: None,
        }
    }

    pub fn with_interactions(mut self, settings: SettingsInteraction) -> Self {
        self.settings_interaction = settings;
        self
    }

    pub fn with_navigations(mut self, settings: SettingsNavigation) -> Self {
        self.settings_navigation = settings;
        self
    }

    pub fn with_styles(mut self, settings: SettingsStyle) -> Self {
        self.settings_style = settings;
        self
    }

    /// Publishes interaction events to `sink`.
    pub fn with_events(mut self, sink: &'a dyn EventSink) -> Self {
        self.events = Some(sink);
        self
    }

    /// Selects a search hit like a node click: recenters the cameras and
    /// publishes the selection and navigation events.
    pub fn select_search_result(&mut self, addr: Address) {
        self.ctrl.select_search_result(addr);
        if self.ctrl.selected_address() == Some(addr) {
            self.publish(Event::NodeSelect(PayloadNodeSelect { address: addr }));
            self.publish(Event::NavigateTo(PayloadNavigateTo { address: addr }));
        }
    }

    fn publish(&self, event: Event) {
        if let Some(sink) = self.events {
            sink.send(event);
        }
    }

    fn projector(&self, canvas: Rect) -> Projector<'_> {
        match self.ctrl.layout_kind() {
            LayoutKind::ForceDirected3D => Projector::Perspective(&self.ctrl.camera, canvas),
            LayoutKind::Hierarchical2D => Projector::Orthographic(&self.ctrl.ortho, canvas),
        }
    }

    fn handle_navigation(&mut self, ui: &Ui, resp: &Response, canvas: Rect) {
        let nav = self.settings_navigation.clone();
        let wheel = if resp.hovered() {
            ui.input(|i| i.raw_scroll_delta.y) / SCROLL_UNIT
        } else {
            0.0
        };

        match self.ctrl.layout_kind() {
            LayoutKind::Hierarchical2D => {
                if resp.dragged_by(PointerButton::Primary) {
                    self.ctrl.ortho.pan_by(resp.drag_delta());
                }
                if wheel != 0.0 {
                    let factor = 1.0 + wheel * nav.zoom_speed;
                    self.ctrl.ortho.zoom_towards(factor, resp.hover_pos(), canvas);
                }
            }
            LayoutKind::ForceDirected3D if self.ctrl.camera.free_flight => {
                if resp.dragged_by(PointerButton::Primary)
                    || resp.dragged_by(PointerButton::Secondary)
                {
                    let d = resp.drag_delta();
                    self.ctrl.camera.orbit(
                        -d.x * nav.look_speed,
                        d.y * nav.look_speed,
                        FLIGHT_PITCH_LIMIT,
                    );
                }
                if resp.hovered() {
                    self.flight_movement(ui);
                }
                if wheel != 0.0 {
                    // Scroll tunes flight speed rather than zooming.
                    self.ctrl.move_speed = (self.ctrl.move_speed * (1.0 + wheel * nav.zoom_speed))
                        .clamp(MIN_MOVE_SPEED, MAX_MOVE_SPEED);
                }
            }
            LayoutKind::ForceDirected3D => {
                if resp.dragged_by(PointerButton::Primary) {
                    let d = resp.drag_delta();
                    if ui.input(|i| i.modifiers.shift) {
                        let s = nav.pan_speed * self.ctrl.camera.distance;
                        let right = self.ctrl.camera.right();
                        let up = self.ctrl.camera.up();
                        self.ctrl.camera.target -= right * (d.x * s);
                        self.ctrl.camera.target += up * (d.y * s);
                    } else {
                        self.ctrl.camera.orbit(
                            -d.x * nav.rotate_speed,
                            d.y * nav.rotate_speed,
                            ORBIT_PITCH_LIMIT,
                        );
                    }
                }
                if wheel != 0.0 {
                    self.ctrl.camera.zoom_by(1.0 - wheel * nav.zoom_speed);
                }
            }
        }
    }

    fn flight_movement(&mut self, ui: &Ui) {
        let dt = ui.input(|i| i.stable_dt).min(0.1);
        let speed = self.ctrl.move_speed * dt * 20.0;
        let forward = self.ctrl.camera.forward();
        let right = self.ctrl.camera.right();

        let mut delta = Vec3::ZERO;
        ui.input(|i| {
            if i.key_down(Key::W) || i.key_down(Key::ArrowUp) {
                delta += forward;
            }
            if i.key_down(Key::S) || i.key_down(Key::ArrowDown) {
                delta -= forward;
            }
            if i.key_down(Key::A) || i.key_down(Key::ArrowLeft) {
                delta -= right;
            }
            if i.key_down(Key::D) || i.key_down(Key::ArrowRight) {
                delta += right;
            }
            if i.key_down(Key::E) {
                delta += Vec3::Y;
            }
            if i.key_down(Key::Q) {
                delta -= Vec3::Y;
            }
        });
        if delta != Vec3::ZERO {
            self.ctrl.camera.position += delta * speed;
        }
    }

    fn handle_hover(&mut self, resp: &Response, canvas: Rect) {
        if !self.settings_interaction.hover_enabled {
            return;
        }
        let hit = resp.hover_pos().and_then(|pointer| {
            let projector = self.projector(canvas);
            nearest_node(self.ctrl.active(), &projector, pointer)
        });
        let previous = self.ctrl.hovered();
        if hit == previous {
            return;
        }
        if let Some(addr) = previous.and_then(|idx| self.address_of(idx)) {
            self.publish(Event::NodeHoverLeave(PayloadNodeHoverLeave { address: addr }));
        }
        if let Some(addr) = hit.and_then(|idx| self.address_of(idx)) {
            self.publish(Event::NodeHoverEnter(PayloadNodeHoverEnter { address: addr }));
        }
        self.ctrl.set_hovered(hit);
    }

    fn handle_clicks(&mut self, ui: &Ui, resp: &Response, canvas: Rect) {
        // egui reports drag events only past its own drag threshold; a
        // stationary press/release surfaces as `clicked` with no drag at all.
        // Short drag releases are still classified by press/release distance
        // below.
        if resp.clicked() {
            if let Some(pos) = resp.interact_pointer_pos() {
                self.dispatch_click(ui, pos, canvas);
            }
            return;
        }
        let press_id = resp.id.with("press_pos");
        if resp.drag_started_by(PointerButton::Primary) {
            if let Some(pos) = ui.input(|i| i.pointer.press_origin()) {
                ui.data_mut(|d| d.insert_temp(press_id, pos));
            }
        }
        if !resp.drag_stopped_by(PointerButton::Primary) {
            return;
        }
        let press: Option<Pos2> = ui.data_mut(|d| d.remove_temp(press_id));
        let release = resp.interact_pointer_pos();
        if let (Some(press), Some(release)) = (press, release) {
            if is_click(press, release) {
                self.dispatch_click(ui, release, canvas);
            }
        }
    }

    fn dispatch_click(&mut self, ui: &Ui, pos: Pos2, canvas: Rect) {
        let hit = {
            let projector = self.projector(canvas);
            nearest_node(self.ctrl.active(), &projector, pos)
        };
        let Some(addr) = hit.and_then(|idx| self.address_of(idx)) else {
            // Empty canvas: clear the selection, except in focused mode where
            // the graph is the selection.
            if self.settings_interaction.selection_enabled && !self.ctrl.is_focused() {
                if let Some(old) = self.ctrl.selected_address() {
                    self.ctrl.deselect();
                    self.publish(Event::NodeDeselect(PayloadNodeDeselect { address: old }));
                }
            }
            return;
        };

        let alt = ui.input(|i| i.modifiers.alt);
        if alt && self.ctrl.is_locked() && self.settings_interaction.follow_enabled {
            self.ctrl.toggle_follow(addr);
            self.publish(Event::FollowToggle(PayloadFollowToggle {
                address: addr,
                followed: self.ctrl.is_followed(addr),
            }));
            self.publish(Event::NavigateTo(PayloadNavigateTo { address: addr }));
            return;
        }

        if self.settings_interaction.selection_enabled {
            let locked = self.ctrl.is_locked();
            self.ctrl.select(addr);
            if self.ctrl.selected_address() == Some(addr) {
                self.publish(Event::NodeSelect(PayloadNodeSelect { address: addr }));
                if locked {
                    self.publish(Event::NavigateTo(PayloadNavigateTo { address: addr }));
                }
            }
        }
    }

    fn handle_keys(&mut self, ui: &Ui, resp: &Response) {
        if !resp.hovered() {
            return;
        }
        if ui.input(|i| i.key_pressed(Key::L)) {
            if self.ctrl.is_locked() {
                self.ctrl.unlock();
            } else {
                self.ctrl.lock();
            }
            self.publish(Event::LockChange(PayloadLockChange {
                locked: self.ctrl.is_locked(),
            }));
        }
        if ui.input(|i| i.key_pressed(Key::F)) {
            if self.ctrl.camera.free_flight {
                self.ctrl.camera.exit_free_flight();
            } else {
                self.ctrl.camera.enter_free_flight();
            }
        }
    }

    fn address_of(&self, idx: NodeIndex) -> Option<u64> {
        self.ctrl.active().node(idx).map(|n| n.address())
    }
}

impl<S: CallSource> Widget for &mut CallGraphView<'_, S> {
    fn ui(self, ui: &mut Ui) -> Response {
        let step_start = Instant::now();
        self.ctrl.step_layout();
        let step_ms = step_start.elapsed().as_secs_f32() * 1000.0;

        let (resp, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let canvas = resp.rect;

        self.handle_navigation(ui, &resp, canvas);
        self.handle_keys(ui, &resp);
        self.handle_hover(&resp, canvas);
        self.handle_clicks(ui, &resp, canvas);

        let draw_start = Instant::now();
        {
            let ctx = DrawContext {
                painter: &painter,
                canvas,
                projector: self.projector(canvas),
                style: &self.settings_style,
                selected: self.ctrl.selected_index(),
                hovered: self.ctrl.hovered(),
            };
            Drawer::new(self.ctrl.active(), &ctx).draw();
        }

        self.ctrl.metrics.last_step_time_ms = step_ms;
        self.ctrl.metrics.last_draw_time_ms = draw_start.elapsed().as_secs_f32() * 1000.0;

        // Keep the simulation and hover feedback animating.
        ui.ctx().request_repaint();
        resp
    }
}

/// Press/release pairs closer than the click threshold count as clicks,
/// anything farther is a camera drag.
pub(crate) fn is_click(press: Pos2, release: Pos2) -> bool {
    (release - press).length_sq() < CLICK_THRESHOLD_SQ
}

/// Nearest node to `pointer` within the hover radius, skipping nodes faded
/// out by selection or follow shading.
pub(crate) fn nearest_node(
    g: &crate::graph::CallGraph,
    projector: &Projector<'_>,
    pointer: Pos2,
) -> Option<NodeIndex> {
    let mut best: Option<(NodeIndex, f32)> = None;
    for (idx, node) in g.nodes_iter() {
        if node.opacity() < HOVER_MIN_OPACITY {
            continue;
        }
        let screen = projector.project(node.pos());
        if screen == OFFSCREEN {
            continue;
        }
        let dist_sq = (screen - pointer).length_sq();
        if dist_sq < HOVER_RADIUS_SQ && best.map_or(true, |(_, d)| dist_sq < d) {
            best = Some((idx, dist_sq));
        }
    }
    best.map(|(idx, _)| idx)
}
