use serde::{Deserialize, Serialize};

use crate::model::{Agent, AgentId, Vec2};

const VELOCITY_REST_THRESHOLD: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn size(self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraMode {
    /// Whole world scaled into the viewport; ignores pan and zoom input.
    FixedFit,
    #[default]
    Free,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CameraConfig {
    pub mode: CameraMode,
    pub initial_zoom: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    /// Zoom change per wheel unit. Applied negated so scrolling forward zooms in.
    pub wheel_zoom_scale: f32,
    /// Fraction of the last drag delta kept as release velocity.
    pub drag_velocity_gain: f32,
    /// Per-frame velocity multiplier once the drag is released.
    pub friction: f32,
    /// Per-frame blend toward the followed agent.
    pub follow_factor: f32,
    /// How far past the world edge the view may pan. `None` disables the clamp.
    pub clamp_margin: Option<f32>,
    /// World-space radius for agent picking.
    pub pick_radius: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            mode: CameraMode::Free,
            initial_zoom: 0.8,
            min_zoom: 0.4,
            max_zoom: 3.0,
            wheel_zoom_scale: 0.001,
            drag_velocity_gain: 0.2,
            friction: 0.92,
            follow_factor: 0.1,
            clamp_margin: Some(500.0),
            pick_radius: 30.0,
        }
    }
}

/// Uniform scale followed by a screen-space translation:
/// `screen = world * scale + translate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub scale: f32,
    pub translate: Vec2,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            translate: Vec2::ZERO,
        }
    }
}

impl ViewTransform {
    pub fn world_to_screen(&self, world: Vec2) -> Vec2 {
        Vec2::new(
            world.x * self.scale + self.translate.x,
            world.y * self.scale + self.translate.y,
        )
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        let scale = if self.scale.abs() > f32::EPSILON {
            self.scale
        } else {
            1.0
        };
        Vec2::new(
            (screen.x - self.translate.x) / scale,
            (screen.y - self.translate.y) / scale,
        )
    }
}

/// Whole-world composition: the scale that fits the limiting axis plus
/// centering offsets. Only the viewport size feeds it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedFitCamera {
    world_size: Vec2,
    transform: ViewTransform,
}

impl FixedFitCamera {
    pub fn fit(viewport: Viewport, world_size: Vec2) -> Self {
        let mut camera = Self {
            world_size,
            transform: ViewTransform::default(),
        };
        camera.resize(viewport);
        camera
    }

    pub fn resize(&mut self, viewport: Viewport) {
        let world = self.world_size;
        if viewport.is_empty() || world.x <= 0.0 || world.y <= 0.0 {
            self.transform = ViewTransform::default();
            return;
        }
        let view = viewport.size();
        let scale = (view.x / world.x).min(view.y / world.y);
        self.transform = ViewTransform {
            scale,
            translate: Vec2::new(
                (view.x - world.x * scale) * 0.5,
                (view.y - world.y * scale) * 0.5,
            ),
        };
    }

    pub fn transform(&self) -> ViewTransform {
        self.transform
    }
}

/// Pan/zoom camera with drag inertia and agent follow.
///
/// `position` is the world point shown at the viewport's top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct FreeCamera {
    config: CameraConfig,
    pub position: Vec2,
    pub zoom: f32,
    pub velocity: Vec2,
    is_dragging: bool,
    drag_anchor: Option<Vec2>,
}

impl FreeCamera {
    pub fn new(config: CameraConfig, position: Vec2) -> Self {
        let mut camera = Self {
            config,
            position,
            zoom: 1.0,
            velocity: Vec2::ZERO,
            is_dragging: false,
            drag_anchor: None,
        };
        camera.zoom = camera.clamp_zoom(config.initial_zoom);
        camera
    }

    /// Camera centered on the world at the configured initial zoom.
    pub fn centered(config: CameraConfig, viewport: Viewport, world_size: Vec2) -> Self {
        let mut camera = Self::new(config, Vec2::ZERO);
        camera.position = camera.centering_position(world_size * 0.5, viewport);
        camera
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn begin_drag(&mut self, screen: Vec2) {
        self.is_dragging = true;
        self.velocity = Vec2::ZERO;
        self.drag_anchor = Some(screen);
    }

    pub fn drag(&mut self, screen: Vec2) {
        if !self.is_dragging {
            return;
        }
        let Some(anchor) = self.drag_anchor else {
            self.drag_anchor = Some(screen);
            return;
        };
        let world_delta = (screen - anchor) * self.zoom.recip();
        self.position = self.position - world_delta;
        self.velocity = world_delta * -self.config.drag_velocity_gain;
        self.drag_anchor = Some(screen);
    }

    pub fn end_drag(&mut self) {
        self.is_dragging = false;
        self.drag_anchor = None;
    }

    /// Per-frame step: follow `focus` and coast on the release velocity.
    /// Does nothing to the position while a drag is in progress.
    pub fn integrate(&mut self, focus: Option<Vec2>, viewport: Viewport, world_size: Vec2) {
        if !self.is_dragging {
            if let Some(focus) = focus {
                let target = self.centering_position(focus, viewport);
                self.position = self.position + (target - self.position) * self.config.follow_factor;
            }
            self.position = self.position + self.velocity;
            self.velocity = self.velocity * self.config.friction;
            if self.velocity.length() < VELOCITY_REST_THRESHOLD {
                self.velocity = Vec2::ZERO;
            }
        }
        self.clamp_to_world(viewport, world_size);
    }

    /// Applies a wheel delta. With a cursor, the world point under it stays put.
    pub fn zoom_by(&mut self, wheel_delta: f32, cursor: Option<Vec2>) {
        let next_zoom = self.clamp_zoom(self.zoom - wheel_delta * self.config.wheel_zoom_scale);
        match cursor {
            Some(cursor) => {
                let anchored_world = self.screen_to_world(cursor);
                self.zoom = next_zoom;
                self.position = anchored_world - cursor * self.zoom.recip();
            }
            None => self.zoom = next_zoom,
        }
    }

    pub fn clamp_to_world(&mut self, viewport: Viewport, world_size: Vec2) {
        let Some(margin) = self.config.clamp_margin else {
            return;
        };
        let visible = viewport.size() * self.zoom.recip();
        let max_x = world_size.x - visible.x + margin;
        let max_y = world_size.y - visible.y + margin;
        self.position.x = self.position.x.min(max_x).max(-margin);
        self.position.y = self.position.y.min(max_y).max(-margin);
    }

    /// Camera position that puts `world` in the middle of the viewport.
    pub fn centering_position(&self, world: Vec2, viewport: Viewport) -> Vec2 {
        world - viewport.size() * (0.5 / self.zoom)
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        screen * self.zoom.recip() + self.position
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform {
            scale: self.zoom,
            translate: self.position * -self.zoom,
        }
    }

    fn clamp_zoom(&self, zoom: f32) -> f32 {
        if !zoom.is_finite() {
            return self.config.initial_zoom.clamp(self.config.min_zoom, self.config.max_zoom);
        }
        zoom.clamp(self.config.min_zoom, self.config.max_zoom)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum CameraState {
    FixedFit(FixedFitCamera),
    Free(FreeCamera),
}

/// Owns the view transform for one viewport in either operating mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraController {
    config: CameraConfig,
    state: CameraState,
    viewport: Viewport,
    world_size: Vec2,
}

impl CameraController {
    pub fn new(config: CameraConfig, viewport: Viewport, world_size: Vec2) -> Self {
        let state = match config.mode {
            CameraMode::FixedFit => {
                CameraState::FixedFit(FixedFitCamera::fit(viewport, world_size))
            }
            CameraMode::Free => {
                CameraState::Free(FreeCamera::centered(config, viewport, world_size))
            }
        };
        Self {
            config,
            state,
            viewport,
            world_size,
        }
    }

    pub fn mode(&self) -> CameraMode {
        self.config.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    pub fn free_camera(&self) -> Option<&FreeCamera> {
        match &self.state {
            CameraState::Free(camera) => Some(camera),
            CameraState::FixedFit(_) => None,
        }
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        if let CameraState::FixedFit(camera) = &mut self.state {
            camera.resize(viewport);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.free_camera().is_some_and(FreeCamera::is_dragging)
    }

    pub fn begin_drag(&mut self, screen: Vec2) {
        if let CameraState::Free(camera) = &mut self.state {
            camera.begin_drag(screen);
        }
    }

    pub fn drag(&mut self, screen: Vec2) {
        if let CameraState::Free(camera) = &mut self.state {
            camera.drag(screen);
        }
    }

    pub fn end_drag(&mut self) {
        if let CameraState::Free(camera) = &mut self.state {
            camera.end_drag();
        }
    }

    pub fn zoom_by(&mut self, wheel_delta: f32, cursor: Option<Vec2>) {
        if let CameraState::Free(camera) = &mut self.state {
            camera.zoom_by(wheel_delta, cursor);
        }
    }

    pub fn integrate(&mut self, focus: Option<Vec2>) {
        if let CameraState::Free(camera) = &mut self.state {
            camera.integrate(focus, self.viewport, self.world_size);
        }
    }

    pub fn transform(&self) -> ViewTransform {
        match &self.state {
            CameraState::FixedFit(camera) => camera.transform(),
            CameraState::Free(camera) => camera.transform(),
        }
    }

    pub fn screen_to_world(&self, screen: Vec2) -> Vec2 {
        match &self.state {
            CameraState::FixedFit(camera) => camera.transform().screen_to_world(screen),
            CameraState::Free(camera) => camera.screen_to_world(screen),
        }
    }

    pub fn pick_agent_at_screen(&self, agents: &[Agent], screen: Vec2) -> Option<AgentId> {
        pick_agent(agents, self.screen_to_world(screen), self.config.pick_radius)
    }
}

/// Nearest agent within `radius` of `world`.
pub fn pick_agent(agents: &[Agent], world: Vec2, radius: f32) -> Option<AgentId> {
    agents
        .iter()
        .map(|agent| (agent.position.distance_to(world), agent.id))
        .filter(|(distance, _)| *distance < radius)
        .min_by(|left, right| left.0.total_cmp(&right.0))
        .map(|(_, id)| id)
}
