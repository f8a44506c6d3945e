mod agents;
mod buildings;
mod canvas;
mod draw_list;
mod font;
mod overlay;
mod props;
mod renderer;
mod terrain;

pub use canvas::{flatten_cubic, flatten_quadratic, with_alpha, Canvas, Dash, Rgba};
pub use draw_list::{build_draw_list, DrawEntry, DrawItem};
pub use renderer::{paint_scene, RenderConfig, Renderer, SceneView};
