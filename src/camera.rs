use egui::{Pos2, Rect};
use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

/// Sentinel screen position for points behind the near plane. Renderers skip
/// these with a cheap comparison instead of handling NaNs.
pub const OFFSCREEN: Pos2 = Pos2::new(-10_000.0, -10_000.0);

/// Points closer than this along the view axis are not projected.
const NEAR_PLANE: f32 = 0.1;

const MIN_ORBIT_DISTANCE: f32 = 0.1;
const MIN_LENGTH: f32 = 1e-4;

/// Perspective camera with two control schemes.
///
/// In orbit mode the eye position is derived spherically from
/// `(target, distance, yaw, pitch)`. In free-flight mode an explicit position
/// is tracked and the view direction comes from yaw/pitch alone. Switching
/// between the two preserves the apparent pose: entering free flight captures
/// the orbit-derived position, leaving it recomputes the orbit target from the
/// current position and forward direction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Camera {
    pub target: Vec3,
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,

    pub free_flight: bool,
    /// Eye position, authoritative only in free-flight mode.
    pub position: Vec3,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            distance: 8.0,
            yaw: 0.4,
            pitch: 0.3,
            fov: 60.0,
            free_flight: false,
            position: Vec3::new(0.0, 0.0, 8.0),
        }
    }
}

impl Camera {
    pub fn position(&self) -> Vec3 {
        if self.free_flight {
            return self.position;
        }
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        self.target
            + Vec3::new(
                self.distance * cos_pitch * sin_yaw,
                self.distance * sin_pitch,
                self.distance * cos_pitch * cos_yaw,
            )
    }

    pub fn forward(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        normalized_or(
            Vec3::new(-sin_yaw * cos_pitch, -sin_pitch, -cos_yaw * cos_pitch),
            Vec3::NEG_Z,
        )
    }

    pub fn right(&self) -> Vec3 {
        normalized_or(self.forward().cross(Vec3::Y), Vec3::X)
    }

    pub fn up(&self) -> Vec3 {
        normalized_or(self.right().cross(self.forward()), Vec3::Y)
    }

    pub fn enter_free_flight(&mut self) {
        if !self.free_flight {
            self.position = self.position();
            self.free_flight = true;
        }
    }

    pub fn exit_free_flight(&mut self) {
        if self.free_flight {
            self.target = self.position + self.forward() * self.distance;
            self.free_flight = false;
        }
    }

    pub fn orbit(&mut self, yaw_delta: f32, pitch_delta: f32, pitch_limit: f32) {
        self.yaw += yaw_delta;
        self.pitch = (self.pitch + pitch_delta).clamp(-pitch_limit, pitch_limit);
    }

    /// Scales the orbit distance, floored so the eye never reaches the target.
    pub fn zoom_by(&mut self, factor: f32) {
        self.distance = (self.distance * factor).max(MIN_ORBIT_DISTANCE);
    }

    /// Places the camera so `point` sits at the view center.
    pub fn look_at(&mut self, point: Vec3) {
        if self.free_flight {
            self.position = point - self.forward() * self.distance;
        } else {
            self.target = point;
        }
    }

    /// View direction used for projection. Orbit mode looks at the target
    /// regardless of yaw/pitch, free flight uses the explicit orientation.
    fn view_forward(&self) -> Vec3 {
        if self.free_flight {
            self.forward()
        } else {
            normalized_or(self.target - self.position(), Vec3::NEG_Z)
        }
    }

    /// Pinhole projection of a world point onto the canvas. Points behind the
    /// near plane map to [`OFFSCREEN`].
    pub fn project(&self, point: Vec3, canvas: Rect) -> Pos2 {
        let eye = self.position();
        let forward = self.view_forward();
        let right = normalized_or(forward.cross(Vec3::Y), Vec3::X);
        let up = normalized_or(right.cross(forward), Vec3::Y);

        let p = point - eye;
        let x = p.dot(right);
        let y = p.dot(up);
        let z = p.dot(forward);

        if z <= NEAR_PLANE {
            return OFFSCREEN;
        }

        let scale = 1.0 / (self.fov.to_radians() * 0.5).tan();
        let size = canvas.size();
        let aspect = size.x / size.y.max(1.0);

        let px = (x * scale / z / aspect + 1.0) * 0.5 * size.x;
        let py = (-y * scale / z + 1.0) * 0.5 * size.y;
        Pos2::new(canvas.min.x + px, canvas.min.y + py)
    }

    /// Distance along the view axis, for painter's-algorithm sorting. Not a
    /// culling test: negative values are returned as-is.
    pub fn depth(&self, point: Vec3) -> f32 {
        (point - self.position()).dot(self.view_forward())
    }
}

/// Pan-zoom orthographic camera for the 2D layout.
///
/// Screen position is `canvas_center + (world - pan) * zoom`; there is no
/// perspective and no near-plane culling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OrthoCamera {
    /// World-space point shown at the canvas center.
    pub pan: Vec2,
    /// Pixels per world unit.
    pub zoom: f32,
}

impl Default for OrthoCamera {
    fn default() -> Self {
        Self {
            pan: Vec2::ZERO,
            zoom: 40.0,
        }
    }
}

impl OrthoCamera {
    pub fn project(&self, point: Vec3, canvas: Rect) -> Pos2 {
        let center = canvas.center();
        Pos2::new(
            center.x + (point.x - self.pan.x) * self.zoom,
            center.y + (point.y - self.pan.y) * self.zoom,
        )
    }

    /// Back-to-front proxy: 2D layouts read roughly top-down, so larger
    /// (lower) y draws later.
    pub fn depth(&self, point: Vec3) -> f32 {
        -point.y
    }

    pub fn screen_to_world(&self, pos: Pos2, canvas: Rect) -> Vec2 {
        let center = canvas.center();
        Vec2::new(
            (pos.x - center.x) / self.zoom + self.pan.x,
            (pos.y - center.y) / self.zoom + self.pan.y,
        )
    }

    /// Pans by a screen-space delta.
    pub fn pan_by(&mut self, delta: egui::Vec2) {
        self.pan -= Vec2::new(delta.x, delta.y) / self.zoom;
    }

    /// Scales the zoom, keeping the world point under `cursor` fixed on
    /// screen by solving for the pan adjustment.
    pub fn zoom_towards(&mut self, factor: f32, cursor: Option<Pos2>, canvas: Rect) {
        let new_zoom = (self.zoom * factor).max(MIN_LENGTH);
        if let Some(cursor) = cursor {
            let anchor = self.screen_to_world(cursor, canvas);
            let center = canvas.center();
            let offset = Vec2::new(cursor.x - center.x, cursor.y - center.y);
            self.pan = anchor - offset / new_zoom;
        }
        self.zoom = new_zoom;
    }
}

/// Per-frame projection handle: one camera borrowed together with the canvas
/// it projects onto.
#[derive(Clone, Copy)]
pub enum Projector<'a> {
    Perspective(&'a Camera, Rect),
    Orthographic(&'a OrthoCamera, Rect),
}

impl Projector<'_> {
    pub fn project(&self, point: Vec3) -> Pos2 {
        match self {
            Self::Perspective(cam, canvas) => cam.project(point, *canvas),
            Self::Orthographic(cam, canvas) => cam.project(point, *canvas),
        }
    }

    pub fn depth(&self, point: Vec3) -> f32 {
        match self {
            Self::Perspective(cam, _) => cam.depth(point),
            Self::Orthographic(cam, _) => cam.depth(point),
        }
    }
}

fn normalized_or(v: Vec3, fallback: Vec3) -> Vec3 {
    let len = v.length();
    if len < MIN_LENGTH {
        fallback
    } else {
        v / len
    }
}
