use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::camera::CameraController;
use crate::model::{AgentId, VillageWorld};
use crate::motion::{advance_agents, MotionConfig};

/// Source of the animation frame index. The updater and renderer both read
/// it; implementations decide how frames relate to time.
pub trait TickSource {
    fn frame_index(&mut self) -> u64;
}

/// Frame index derived from elapsed wall-clock time, so animation speed does
/// not depend on how often the host redraws.
#[derive(Debug, Clone)]
pub struct WallClockTicks {
    started: Instant,
    frame: Duration,
}

impl WallClockTicks {
    pub fn new(frame_ms: u64) -> Self {
        Self::starting_at(Instant::now(), frame_ms)
    }

    pub fn starting_at(started: Instant, frame_ms: u64) -> Self {
        Self {
            started,
            frame: Duration::from_millis(frame_ms.max(1)),
        }
    }

    pub fn frame_at(&self, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(self.started);
        (elapsed.as_nanos() / self.frame.as_nanos()) as u64
    }
}

impl TickSource for WallClockTicks {
    fn frame_index(&mut self) -> u64 {
        self.frame_at(Instant::now())
    }
}

/// Explicitly driven frame counter for tests and single-stepping tools.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ManualTicks {
    frame: u64,
}

impl ManualTicks {
    pub fn new(frame: u64) -> Self {
        Self { frame }
    }

    pub fn set(&mut self, frame: u64) {
        self.frame = frame;
    }

    pub fn advance(&mut self, frames: u64) {
        self.frame = self.frame.saturating_add(frames);
    }
}

impl TickSource for ManualTicks {
    fn frame_index(&mut self) -> u64 {
        self.frame
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Updater steps allowed per `tick` before the backlog is dropped.
    pub max_catch_up_frames: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            max_catch_up_frames: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Frame index the published snapshot was advanced to.
    pub frame_index: u64,
    pub updater_steps: u32,
    /// A new agent snapshot was published this tick.
    pub published: bool,
    pub dropped_frames: u64,
    pub paused: bool,
}

/// Owns the published world and runs the motion updater against a
/// [`TickSource`]. Supports pause and single-step.
pub struct LoopDriver<T: TickSource> {
    ticks: T,
    motion: MotionConfig,
    config: DriverConfig,
    world: VillageWorld,
    frame_index: u64,
    last_source_frame: Option<u64>,
    paused: bool,
    step_requested: bool,
}

impl<T: TickSource> LoopDriver<T> {
    pub fn new(ticks: T, motion: MotionConfig, config: DriverConfig, world: VillageWorld) -> Self {
        Self {
            ticks,
            motion,
            config,
            world,
            frame_index: 0,
            last_source_frame: None,
            paused: false,
            step_requested: false,
        }
    }

    pub fn world(&self) -> &VillageWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut VillageWorld {
        &mut self.world
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn ticks_mut(&mut self) -> &mut T {
        &mut self.ticks
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
        if !paused {
            self.step_requested = false;
        }
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.set_paused(!self.paused);
        self.paused
    }

    /// Runs exactly one updater step on the next `tick` while paused.
    pub fn request_step(&mut self) {
        if self.paused {
            self.step_requested = true;
        }
    }

    /// Reads the tick source, advances agents once per elapsed frame and
    /// integrates the camera toward `focus`. Frames beyond the catch-up cap
    /// are dropped rather than replayed.
    pub fn tick(&mut self, camera: &mut CameraController, focus: Option<AgentId>) -> FrameOutcome {
        let source_frame = self.ticks.frame_index();
        let elapsed = match self.last_source_frame {
            Some(last) => source_frame.saturating_sub(last),
            None => 0,
        };
        self.last_source_frame = Some(source_frame);

        let wanted = if self.paused {
            u64::from(std::mem::take(&mut self.step_requested))
        } else {
            elapsed
        };
        let plan = plan_frame_steps(wanted, self.config.max_catch_up_frames);

        let before = Arc::clone(&self.world.agents);
        for _ in 0..plan.steps_to_run {
            self.frame_index = self.frame_index.saturating_add(1);
            self.world.agents = advance_agents(&self.world.agents, self.frame_index, &self.motion);
        }
        self.frame_index = self.frame_index.saturating_add(plan.dropped);

        let camera_steps = plan_frame_steps(elapsed, self.config.max_catch_up_frames).steps_to_run;
        for _ in 0..camera_steps {
            let focus_point = focus
                .and_then(|id| self.world.agent(id))
                .map(|agent| agent.position);
            camera.integrate(focus_point);
        }

        FrameOutcome {
            frame_index: self.frame_index,
            updater_steps: plan.steps_to_run,
            published: !Arc::ptr_eq(&before, &self.world.agents),
            dropped_frames: plan.dropped,
            paused: self.paused,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FrameStepPlan {
    steps_to_run: u32,
    dropped: u64,
}

fn plan_frame_steps(elapsed_frames: u64, max_steps: u32) -> FrameStepPlan {
    let max_steps = max_steps.max(1);
    if elapsed_frames <= u64::from(max_steps) {
        FrameStepPlan {
            steps_to_run: elapsed_frames as u32,
            dropped: 0,
        }
    } else {
        FrameStepPlan {
            steps_to_run: max_steps,
            dropped: elapsed_frames - u64::from(max_steps),
        }
    }
}

/// Fixed-interval schedule fed by variable frame times. Reports how many
/// intervals elapsed; backlog past `max_fires` is dropped.
#[derive(Debug, Clone)]
pub struct IntervalTimer {
    interval: Duration,
    accumulator: Duration,
    max_fires: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPlan {
    pub fires: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

impl IntervalTimer {
    pub fn new(interval: Duration, max_fires: u32) -> Self {
        Self {
            interval: normalize_non_zero_duration(interval, Duration::from_secs(1)),
            accumulator: Duration::ZERO,
            max_fires: max_fires.max(1),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn advance(&mut self, dt: Duration) -> IntervalPlan {
        let plan = plan_intervals(
            self.accumulator.saturating_add(dt),
            self.interval,
            self.max_fires,
        );
        self.accumulator = plan.remaining_accumulator;
        plan
    }
}

fn plan_intervals(mut accumulator: Duration, interval: Duration, max_fires: u32) -> IntervalPlan {
    let mut fires = 0u32;

    while accumulator >= interval && fires < max_fires {
        accumulator = accumulator.saturating_sub(interval);
        fires = fires.saturating_add(1);
    }

    if accumulator >= interval {
        IntervalPlan {
            fires,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        IntervalPlan {
            fires,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

pub(crate) fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::camera::{CameraConfig, CameraMode, Viewport};
    use crate::model::{
        Agent, AgentTraits, AnimationState, BuildingId, Emotion, Vec2, WorldLayout, WorldState,
    };

    fn agent(id: u64, position: Vec2, target: Option<Vec2>) -> Agent {
        Agent {
            id: AgentId(id),
            name: format!("agent {id}"),
            backstory: String::new(),
            personality: String::new(),
            color: [200, 80, 80, 255],
            traits: AgentTraits::default(),
            house_id: BuildingId(0),
            emotional_state: Emotion::Neutral,
            current_thought: String::new(),
            reasoning: String::new(),
            destination_name: String::new(),
            skills: BTreeMap::new(),
            memories: Vec::new(),
            position,
            target,
            animation_state: AnimationState::Idle,
        }
    }

    fn world(agents: Vec<Agent>) -> VillageWorld {
        VillageWorld {
            agents: Arc::new(agents),
            buildings: Vec::new(),
            props: Vec::new(),
            layout: WorldLayout {
                width: 1000.0,
                height: 1000.0,
                paths: Vec::new(),
                river: None,
                bridges: Vec::new(),
            },
            state: WorldState::default(),
        }
    }

    fn walker_driver() -> LoopDriver<ManualTicks> {
        let walker = agent(0, Vec2::new(0.0, 0.0), Some(Vec2::new(100.0, 0.0)));
        LoopDriver::new(
            ManualTicks::new(0),
            MotionConfig::default(),
            DriverConfig::default(),
            world(vec![walker]),
        )
    }

    fn camera() -> CameraController {
        CameraController::new(
            CameraConfig {
                clamp_margin: None,
                ..CameraConfig::default()
            },
            Viewport {
                width: 200,
                height: 100,
            },
            Vec2::new(1000.0, 1000.0),
        )
    }

    fn x_of_first(driver: &LoopDriver<ManualTicks>) -> f32 {
        driver.world().agents[0].position.x
    }

    #[test]
    fn wall_clock_frames_follow_elapsed_time() {
        let start = Instant::now();
        let ticks = WallClockTicks::starting_at(start, 20);
        assert_eq!(ticks.frame_at(start), 0);
        assert_eq!(ticks.frame_at(start + Duration::from_millis(19)), 0);
        assert_eq!(ticks.frame_at(start + Duration::from_millis(20)), 1);
        assert_eq!(ticks.frame_at(start + Duration::from_millis(1_000)), 50);
    }

    #[test]
    fn wall_clock_zero_frame_length_is_safe() {
        let start = Instant::now();
        let ticks = WallClockTicks::starting_at(start, 0);
        assert_eq!(ticks.frame_at(start + Duration::from_millis(3)), 3);
    }

    #[test]
    fn first_tick_only_latches_the_source() {
        let mut driver = walker_driver();
        driver.ticks_mut().set(40);
        let outcome = driver.tick(&mut camera(), None);
        assert_eq!(outcome.updater_steps, 0);
        assert!(!outcome.published);
        assert_eq!(x_of_first(&driver), 0.0);
    }

    #[test]
    fn updater_runs_once_per_elapsed_frame() {
        let mut driver = walker_driver();
        let mut camera = camera();
        driver.tick(&mut camera, None);

        driver.ticks_mut().advance(3);
        let outcome = driver.tick(&mut camera, None);
        assert_eq!(outcome.updater_steps, 3);
        assert_eq!(outcome.frame_index, 3);
        assert!(outcome.published);
        assert!((x_of_first(&driver) - 6.0).abs() < 0.0001);

        let idle_tick = driver.tick(&mut camera, None);
        assert_eq!(idle_tick.updater_steps, 0);
        assert!(!idle_tick.published);
    }

    #[test]
    fn long_stalls_drop_backlog_past_catch_up_cap() {
        let mut driver = walker_driver();
        let mut camera = camera();
        driver.tick(&mut camera, None);

        driver.ticks_mut().advance(12);
        let outcome = driver.tick(&mut camera, None);
        assert_eq!(outcome.updater_steps, 5);
        assert_eq!(outcome.dropped_frames, 7);
        assert_eq!(outcome.frame_index, 12);
        assert!((x_of_first(&driver) - 10.0).abs() < 0.0001);
    }

    #[test]
    fn paused_driver_holds_snapshot_until_stepped() {
        let mut driver = walker_driver();
        let mut camera = camera();
        driver.tick(&mut camera, None);
        driver.set_paused(true);

        driver.ticks_mut().advance(10);
        let paused = driver.tick(&mut camera, None);
        assert!(paused.paused);
        assert_eq!(paused.updater_steps, 0);
        assert_eq!(x_of_first(&driver), 0.0);

        driver.request_step();
        driver.ticks_mut().advance(10);
        let stepped = driver.tick(&mut camera, None);
        assert_eq!(stepped.updater_steps, 1);
        assert!((x_of_first(&driver) - 2.0).abs() < 0.0001);

        let after = driver.tick(&mut camera, None);
        assert_eq!(after.updater_steps, 0);
    }

    #[test]
    fn resume_does_not_replay_paused_time() {
        let mut driver = walker_driver();
        let mut camera = camera();
        driver.tick(&mut camera, None);
        assert!(driver.toggle_pause());
        driver.ticks_mut().advance(100);
        driver.tick(&mut camera, None);
        assert!(!driver.toggle_pause());

        driver.ticks_mut().advance(1);
        let outcome = driver.tick(&mut camera, None);
        assert_eq!(outcome.updater_steps, 1);
        assert!((x_of_first(&driver) - 2.0).abs() < 0.0001);
    }

    #[test]
    fn step_request_is_ignored_while_running() {
        let mut driver = walker_driver();
        driver.request_step();
        driver.tick(&mut camera(), None);
        let outcome = driver.tick(&mut camera(), None);
        assert_eq!(outcome.updater_steps, 0);
    }

    #[test]
    fn camera_follows_focus_even_while_paused() {
        let mut driver = LoopDriver::new(
            ManualTicks::new(0),
            MotionConfig::default(),
            DriverConfig {
                max_catch_up_frames: 500,
            },
            world(vec![agent(7, Vec2::new(600.0, 400.0), None)]),
        );
        let mut camera = camera();
        driver.tick(&mut camera, Some(AgentId(7)));
        driver.set_paused(true);
        driver.ticks_mut().advance(400);
        driver.tick(&mut camera, Some(AgentId(7)));

        let free = camera.free_camera().expect("free camera");
        let expected = free.centering_position(Vec2::new(600.0, 400.0), camera.viewport());
        assert!((free.position.x - expected.x).abs() < 0.01);
        assert!((free.position.y - expected.y).abs() < 0.01);
    }

    #[test]
    fn fixed_fit_camera_ignores_integration() {
        let mut driver = walker_driver();
        let mut camera = CameraController::new(
            CameraConfig {
                mode: CameraMode::FixedFit,
                ..CameraConfig::default()
            },
            Viewport {
                width: 200,
                height: 100,
            },
            Vec2::new(1000.0, 1000.0),
        );
        let before = camera.transform();
        driver.tick(&mut camera, Some(AgentId(0)));
        driver.ticks_mut().advance(2);
        driver.tick(&mut camera, Some(AgentId(0)));
        assert_eq!(camera.transform(), before);
    }

    #[test]
    fn plan_frame_steps_runs_everything_under_the_cap() {
        assert_eq!(
            plan_frame_steps(3, 5),
            FrameStepPlan {
                steps_to_run: 3,
                dropped: 0
            }
        );
        assert_eq!(
            plan_frame_steps(0, 0),
            FrameStepPlan {
                steps_to_run: 0,
                dropped: 0
            }
        );
    }

    #[test]
    fn plan_intervals_runs_expected_fires_without_drop() {
        let interval = Duration::from_millis(16);
        let result = plan_intervals(Duration::from_millis(48), interval, 5);

        assert_eq!(result.fires, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_intervals_drops_backlog_when_cap_hit() {
        let interval = Duration::from_millis(16);
        let result = plan_intervals(Duration::from_millis(120), interval, 3);

        assert_eq!(result.fires, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn interval_timer_carries_remainder_between_frames() {
        let mut timer = IntervalTimer::new(Duration::from_secs(1), 4);
        assert_eq!(timer.advance(Duration::from_millis(600)).fires, 0);
        assert_eq!(timer.advance(Duration::from_millis(600)).fires, 1);
        let plan = timer.advance(Duration::from_millis(300));
        assert_eq!(plan.fires, 0);
        assert_eq!(plan.remaining_accumulator, Duration::from_millis(500));
    }

    #[test]
    fn zero_interval_falls_back_to_one_second() {
        let timer = IntervalTimer::new(Duration::ZERO, 1);
        assert_eq!(timer.interval(), Duration::from_secs(1));
    }
}
