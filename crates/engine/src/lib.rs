pub mod app;
pub mod camera;
pub mod driver;
pub mod model;
pub mod motion;

pub use app::{
    run_app, run_app_with_metrics, AppError, LoopConfig, LoopMetricsSnapshot, MetricsHandle,
    RenderConfig, Renderer, SceneHost, SceneView, VillageApp,
};
pub use camera::{CameraConfig, CameraController, CameraMode, ViewTransform, Viewport};
pub use driver::{
    DriverConfig, FrameOutcome, IntervalPlan, IntervalTimer, LoopDriver, ManualTicks,
    TickSource, WallClockTicks,
};
pub use motion::{advance_agents, MotionConfig};
