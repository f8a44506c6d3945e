use std::sync::Arc;

use pixels::{Error, Pixels, SurfaceTexture};
use serde::{Deserialize, Serialize};
use winit::window::Window;

use crate::camera::{ViewTransform, Viewport};
use crate::model::{Agent, AgentId, Building, Prop, Vec2, WorldLayout, WorldState};

use super::agents::{draw_agent, AgentHighlight};
use super::buildings::draw_building;
use super::canvas::{Canvas, Rgba};
use super::draw_list::{build_draw_list, DrawItem};
use super::overlay::{draw_hud, draw_thought_bubble, draw_weather};
use super::props::draw_prop;
use super::terrain::{draw_terrain, TerrainStyle};

const CLEAR_COLOR: Rgba = [14, 18, 14, 255];
const VIEW_CULL_PADDING_PX: f32 = 16.0;
const AGENT_CULL_RADIUS_WORLD: f32 = 60.0;
const PROP_CULL_RADIUS_WORLD: f32 = 90.0;
const BUILDING_CULL_MARGIN_WORLD: f32 = 40.0;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Added to an agent's sort key so it paints over buildings on its row.
    pub agent_front_bias: f32,
    pub agent_scale: f32,
    /// `[on, off]` lengths of the river filaments.
    pub water_dash: [f32; 2],
    pub water_flow_speed: f32,
    pub prop_sway_amplitude: f32,
    pub window_light_period: u64,
    pub show_building_labels: bool,
    pub show_agent_labels: bool,
    pub show_prop_labels: bool,
    pub show_weather: bool,
    pub show_hud: bool,
    /// Glyph pixel size for world labels, in world units.
    pub label_cell: f32,
    /// Glyph pixel size for screen overlays, in pixels.
    pub hud_cell: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            agent_front_bias: 10.0,
            agent_scale: 0.65,
            water_dash: [30.0, 120.0],
            water_flow_speed: 2.0,
            prop_sway_amplitude: 4.0,
            window_light_period: 300,
            show_building_labels: true,
            show_agent_labels: true,
            show_prop_labels: false,
            show_weather: true,
            show_hud: true,
            label_cell: 1.5,
            hud_cell: 2.0,
        }
    }
}

/// Everything one frame reads. Borrowed for the duration of the paint.
#[derive(Debug, Clone, Copy)]
pub struct SceneView<'a> {
    pub agents: &'a [Agent],
    pub buildings: &'a [Building],
    pub props: &'a [Prop],
    pub layout: &'a WorldLayout,
    pub world: &'a WorldState,
    pub frame_index: u64,
    pub focused: Option<AgentId>,
    pub hovered: Option<AgentId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct WorldBounds {
    min_x: f32,
    max_x: f32,
    min_y: f32,
    max_y: f32,
}

pub struct Renderer {
    window: Arc<Window>,
    pixels: Pixels<'static>,
    viewport: Viewport,
}

impl Renderer {
    pub fn new(window: Arc<Window>) -> Result<Self, Error> {
        let size = window.inner_size();
        let pixels = Self::build_pixels(Arc::clone(&window), size.width, size.height)?;
        Ok(Self {
            window,
            pixels,
            viewport: Viewport {
                width: size.width,
                height: size.height,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), Error> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.pixels = Self::build_pixels(Arc::clone(&self.window), width, height)?;
        self.viewport = Viewport { width, height };
        Ok(())
    }

    fn build_pixels(
        window: Arc<Window>,
        width: u32,
        height: u32,
    ) -> Result<Pixels<'static>, Error> {
        let surface = SurfaceTexture::new(width, height, window);
        Pixels::new(width, height, surface)
    }

    pub fn render(
        &mut self,
        view: &SceneView<'_>,
        transform: ViewTransform,
        config: &RenderConfig,
    ) -> Result<(), Error> {
        if self.viewport.is_empty() {
            return Ok(());
        }
        let (width, height) = (self.viewport.width, self.viewport.height);
        let mut canvas = Canvas::new(self.pixels.frame_mut(), width, height);
        paint_scene(&mut canvas, view, transform, config);
        self.pixels.render()
    }
}

/// Paints one complete frame: terrain, depth-sorted entities, then the
/// screen-space overlays. Overwrites every pixel.
pub fn paint_scene(
    canvas: &mut Canvas<'_>,
    view: &SceneView<'_>,
    transform: ViewTransform,
    config: &RenderConfig,
) {
    canvas.reset_transform();
    canvas.clear(CLEAR_COLOR);
    if canvas.width() == 0 || canvas.height() == 0 {
        return;
    }

    canvas.set_transform(transform);
    let building_label = config.show_building_labels.then_some(config.label_cell);
    draw_terrain(
        canvas,
        view.layout,
        view.buildings,
        view.frame_index,
        TerrainStyle {
            water_dash: config.water_dash,
            water_flow_speed: config.water_flow_speed,
            label_cell: building_label,
        },
    );

    let bounds = view_bounds_world(
        transform,
        (canvas.width(), canvas.height()),
        VIEW_CULL_PADDING_PX,
    );
    let draw_list = build_draw_list(
        view.agents,
        view.buildings,
        view.props,
        config.agent_front_bias,
    );
    for entry in &draw_list {
        match entry.item {
            DrawItem::Building(building) => {
                if !bounds_intersects_rect(
                    &bounds,
                    building.position,
                    Vec2::new(building.size.w, building.size.h),
                    BUILDING_CULL_MARGIN_WORLD,
                ) {
                    continue;
                }
                draw_building(
                    canvas,
                    building,
                    view.frame_index,
                    config.window_light_period,
                    building_label,
                );
            }
            DrawItem::Prop(prop) => {
                if !bounds_intersects_point_radius(&bounds, prop.position, PROP_CULL_RADIUS_WORLD) {
                    continue;
                }
                draw_prop(
                    canvas,
                    prop,
                    view.frame_index,
                    config.prop_sway_amplitude,
                    config.show_prop_labels.then_some(config.label_cell),
                );
            }
            DrawItem::Agent(agent) => {
                if !bounds_intersects_point_radius(&bounds, agent.position, AGENT_CULL_RADIUS_WORLD)
                {
                    continue;
                }
                draw_agent(
                    canvas,
                    agent,
                    view.frame_index,
                    config.agent_scale,
                    highlight_for(agent.id, view.focused, view.hovered),
                    config.show_agent_labels.then_some(config.label_cell),
                );
            }
        }
    }

    canvas.reset_transform();
    if config.show_weather {
        draw_weather(canvas, view.world.weather, view.frame_index);
    }
    if let Some(agent) = view
        .hovered
        .and_then(|id| view.agents.iter().find(|agent| agent.id == id))
    {
        draw_thought_bubble(canvas, agent, transform, config.hud_cell);
    }
    if config.show_hud {
        draw_hud(canvas, view.world, config.hud_cell);
    }
}

fn highlight_for(id: AgentId, focused: Option<AgentId>, hovered: Option<AgentId>) -> AgentHighlight {
    if focused == Some(id) {
        AgentHighlight::Focused
    } else if hovered == Some(id) {
        AgentHighlight::Hovered
    } else {
        AgentHighlight::None
    }
}

fn view_bounds_world(
    transform: ViewTransform,
    window_size: (u32, u32),
    padding_px: f32,
) -> WorldBounds {
    let padding = padding_px.max(0.0);
    let top_left = transform.screen_to_world(Vec2::new(-padding, -padding));
    let bottom_right = transform.screen_to_world(Vec2::new(
        window_size.0 as f32 + padding,
        window_size.1 as f32 + padding,
    ));
    WorldBounds {
        min_x: top_left.x.min(bottom_right.x),
        max_x: top_left.x.max(bottom_right.x),
        min_y: top_left.y.min(bottom_right.y),
        max_y: top_left.y.max(bottom_right.y),
    }
}

fn bounds_intersects_point_radius(bounds: &WorldBounds, center: Vec2, radius_world: f32) -> bool {
    let radius = radius_world.max(0.0);
    let min_x = center.x - radius;
    let max_x = center.x + radius;
    let min_y = center.y - radius;
    let max_y = center.y + radius;

    !(max_x < bounds.min_x || min_x > bounds.max_x || max_y < bounds.min_y || min_y > bounds.max_y)
}

fn bounds_intersects_rect(bounds: &WorldBounds, origin: Vec2, size: Vec2, margin: f32) -> bool {
    !(origin.x + size.x + margin < bounds.min_x
        || origin.x - margin > bounds.max_x
        || origin.y + size.y + margin < bounds.min_y
        || origin.y - margin > bounds.max_y)
}
