use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::camera::{CameraConfig, CameraController, Viewport};
use crate::driver::{normalize_non_zero_duration, DriverConfig, LoopDriver, WallClockTicks};
use crate::model::{Vec2, VillageWorld};
use crate::motion::{walking_count, MotionConfig};

use super::input::{wheel_delta_from_scroll, KeyCommand, KeyEdges, PointerInput};
use super::metrics::MetricsAccumulator;
use super::rendering::{RenderConfig, Renderer, SceneView};
use super::{MetricsHandle, SceneHost};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    /// Wall-clock length of one animation frame.
    pub frame_ms: u64,
    /// Upper bound on the `dt` handed to the host after a stall.
    pub max_frame_delta_ms: u64,
    pub metrics_log_interval_ms: u64,
    pub max_render_fps: Option<u32>,
    pub driver: DriverConfig,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Village".to_string(),
            window_width: 1280,
            window_height: 800,
            frame_ms: 20,
            max_frame_delta_ms: 250,
            metrics_log_interval_ms: 5_000,
            max_render_fps: None,
            driver: DriverConfig::default(),
        }
    }
}

/// Everything `run_app` needs to open the window and start the loop.
pub struct VillageApp {
    pub loop_config: LoopConfig,
    pub motion: MotionConfig,
    pub camera: CameraConfig,
    pub render: RenderConfig,
    pub world: VillageWorld,
    pub host: Box<dyn SceneHost>,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(app: VillageApp) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(app, metrics_handle)
}

pub fn run_app_with_metrics(app: VillageApp, metrics_handle: MetricsHandle) -> Result<(), AppError> {
    let VillageApp {
        loop_config: config,
        motion,
        camera: camera_config,
        render: mut render_config,
        mut world,
        mut host,
    } = app;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let max_frame_delta = normalize_non_zero_duration(
        Duration::from_millis(config.max_frame_delta_ms),
        Duration::from_millis(250),
    );
    let metrics_log_interval = normalize_non_zero_duration(
        Duration::from_millis(config.metrics_log_interval_ms),
        Duration::from_secs(5),
    );
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);

    host.load(&mut world);
    let mut camera = CameraController::new(camera_config, renderer.viewport(), world.layout.size());
    info!(
        agent_count = world.agents.len(),
        building_count = world.buildings.len(),
        prop_count = world.props.len(),
        camera_mode = ?camera.mode(),
        "scene_loaded"
    );
    let mut driver = LoopDriver::new(
        WallClockTicks::new(config.frame_ms),
        motion,
        config.driver,
        world,
    );

    info!(
        frame_ms = config.frame_ms,
        max_catch_up_frames = config.driver.max_catch_up_frames,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut pointer = PointerInput::default();
    let mut keys = KeyEdges::default();
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    let (width, height) = (new_size.width, new_size.height);
                    if let Err(error) =
                        resize_view(&mut camera, width, height, |w, h| renderer.resize(w, h))
                    {
                        warn!(error = %error, width, height, "renderer_resize_failed");
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    let (width, height) = (size.width, size.height);
                    if let Err(error) =
                        resize_view(&mut camera, width, height, |w, h| renderer.resize(w, h))
                    {
                        warn!(error = %error, width, height, "renderer_resize_failed");
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    pointer.cursor_moved(
                        Vec2::new(position.x as f32, position.y as f32),
                        &mut camera,
                    );
                }
                WindowEvent::CursorLeft { .. } => {
                    pointer.cursor_left(&mut camera);
                }
                WindowEvent::MouseInput {
                    state,
                    button: MouseButton::Left,
                    ..
                } => match state {
                    ElementState::Pressed => pointer.button_pressed(&mut camera),
                    ElementState::Released => {
                        let outcome = pointer.button_released(&mut camera, &driver.world().agents);
                        if let Some(outcome) = outcome {
                            info!(?outcome, "selection_changed");
                            host.focus_changed(pointer.focused(), driver.world());
                        }
                    }
                },
                WindowEvent::MouseWheel { delta, .. } => {
                    pointer.wheel(wheel_delta_from_scroll(delta), &mut camera);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    keys.handle_key(event.physical_key, event.state);
                    if keys.take_pressed(KeyCommand::Quit) {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if keys.take_pressed(KeyCommand::TogglePause) {
                        let paused = driver.toggle_pause();
                        info!(paused, "pause_toggled");
                    }
                    if keys.take_pressed(KeyCommand::Step) {
                        driver.request_step();
                    }
                    if keys.take_pressed(KeyCommand::ToggleHud) {
                        render_config.show_hud = !render_config.show_hud;
                        info!(hud_visible = render_config.show_hud, "hud_toggled");
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    if !driver.is_paused() {
                        host.update(
                            clamp_frame_delta(raw_frame_dt, max_frame_delta),
                            driver.world_mut(),
                        );
                    }
                    pointer.retain_known(&driver.world().agents);
                    let outcome = driver.tick(&mut camera, pointer.focused());
                    pointer.refresh_hover(&camera, &driver.world().agents);

                    if outcome.dropped_frames > 0 {
                        warn!(
                            dropped_frames = outcome.dropped_frames,
                            max_catch_up_frames = config.driver.max_catch_up_frames,
                            "frame_backlog_dropped"
                        );
                    }

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let world = driver.world();
                    let view = SceneView {
                        agents: &world.agents,
                        buildings: &world.buildings,
                        props: &world.props,
                        layout: &world.layout,
                        world: &world.state,
                        frame_index: outcome.frame_index,
                        focused: pointer.focused(),
                        hovered: pointer.hovered(),
                    };
                    if let Err(error) = renderer.render(&view, camera.transform(), &render_config) {
                        warn!(error = %error, "renderer_draw_failed");
                    }
                    last_present_instant = Instant::now();

                    let next_title = host.title(world);
                    if next_title != last_applied_title {
                        if let Some(title) = &next_title {
                            window.set_title(title);
                        } else {
                            window.set_title(&config.window_title);
                        }
                        last_applied_title = next_title;
                    }

                    metrics_accumulator.record_frame(raw_frame_dt);
                    metrics_accumulator.record_driver_outcome(&outcome, walking_count(&world.agents));
                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            ups = snapshot.ups,
                            publishes_per_sec = snapshot.publishes_per_sec,
                            frame_time_ms = snapshot.frame_time_ms,
                            walking_agents = snapshot.walking_agents,
                            dropped_frames = snapshot.dropped_frames,
                            paused = outcome.paused,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                host.shutdown(driver.world());
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Rebuilds the surface, then moves the camera onto the new viewport. A
/// failed rebuild keeps the previous surface and viewport; the next resize
/// event retries.
fn resize_view<E>(
    camera: &mut CameraController,
    width: u32,
    height: u32,
    rebuild_surface: impl FnOnce(u32, u32) -> Result<(), E>,
) -> Result<(), E> {
    rebuild_surface(width, height)?;
    apply_viewport(camera, width, height);
    Ok(())
}

/// Minimised windows report a zero size; keep the last usable viewport.
fn apply_viewport(camera: &mut CameraController, width: u32, height: u32) {
    let viewport = Viewport { width, height };
    if !viewport.is_empty() {
        camera.set_viewport(viewport);
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::CameraMode;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        let raw_frame_dt = Duration::from_millis(600);

        assert_eq!(
            clamp_frame_delta(raw_frame_dt, max_frame_delta),
            max_frame_delta
        );
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(16), max_frame_delta),
            Duration::from_millis(16)
        );
    }

    #[test]
    fn target_frame_duration_none_when_cap_off() {
        assert_eq!(target_frame_duration(None), None);
    }

    #[test]
    fn target_frame_duration_for_60hz_is_expected() {
        let duration = target_frame_duration(Some(60)).expect("duration");
        assert!((duration.as_secs_f64() - (1.0 / 60.0)).abs() < 0.000_001);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(Some(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(Some(60)));
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
        assert_eq!(format_render_cap(None), "off");
        assert_eq!(format_render_cap(Some(30)), "30");
    }

    #[test]
    fn loop_config_fills_missing_fields_from_defaults() {
        let config: LoopConfig =
            serde_json::from_str(r#"{"frame_ms": 16, "driver": {"max_catch_up_frames": 2}}"#)
                .expect("valid loop config");
        assert_eq!(config.frame_ms, 16);
        assert_eq!(config.driver.max_catch_up_frames, 2);
        assert_eq!(config.window_width, LoopConfig::default().window_width);
        assert_eq!(config.max_render_fps, None);
    }

    #[test]
    fn zero_sized_resize_keeps_fixed_fit_transform() {
        let mut camera = CameraController::new(
            CameraConfig {
                mode: CameraMode::FixedFit,
                ..CameraConfig::default()
            },
            Viewport {
                width: 800,
                height: 500,
            },
            Vec2::new(1600.0, 1000.0),
        );
        let before = camera.transform();
        apply_viewport(&mut camera, 0, 0);
        assert_eq!(camera.transform(), before);

        apply_viewport(&mut camera, 1600, 1000);
        assert!((camera.transform().scale - 1.0).abs() < 0.0001);
        assert_eq!(
            camera.viewport(),
            Viewport {
                width: 1600,
                height: 1000
            }
        );
    }

    #[test]
    fn failed_surface_rebuild_keeps_camera_viewport() {
        let mut camera = CameraController::new(
            CameraConfig::default(),
            Viewport {
                width: 800,
                height: 500,
            },
            Vec2::new(1600.0, 1000.0),
        );
        let before = camera.transform();

        let result = resize_view(&mut camera, 1024, 768, |_, _| Err("surface lost"));
        assert_eq!(result, Err("surface lost"));
        assert_eq!(
            camera.viewport(),
            Viewport {
                width: 800,
                height: 500
            }
        );
        assert_eq!(camera.transform(), before);

        let mut rebuilt = None;
        resize_view::<()>(&mut camera, 1024, 768, |w, h| {
            rebuilt = Some((w, h));
            Ok(())
        })
        .expect("resize");
        assert_eq!(rebuilt, Some((1024, 768)));
        assert_eq!(
            camera.viewport(),
            Viewport {
                width: 1024,
                height: 768
            }
        );
    }
}
