mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;

pub use input::{ClickOutcome, PointerInput};
pub use loop_runner::{run_app, run_app_with_metrics, AppError, LoopConfig, VillageApp};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{
    build_draw_list, paint_scene, Canvas, DrawEntry, DrawItem, RenderConfig, Renderer, Rgba,
    SceneView,
};
pub use scene::SceneHost;
