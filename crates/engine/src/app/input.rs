use winit::event::{ElementState, MouseScrollDelta};
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::camera::CameraController;
use crate::model::{Agent, AgentId, Vec2};

/// Wheel units per scrolled line, matching the browser-style pixel deltas
/// the camera's wheel scale is tuned for.
const LINE_DELTA_PIXELS: f32 = 100.0;
const DEFAULT_CLICK_SLOP_PX: f32 = 4.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Selected(AgentId),
    Cleared,
}

#[derive(Debug, Clone, Copy)]
struct PressState {
    origin: Vec2,
    max_travel: f32,
}

/// Pointer handling for the village view: drag pans the camera, wheel zooms
/// around the cursor, and a press released without moving selects the agent
/// under it.
#[derive(Debug, Clone)]
pub struct PointerInput {
    cursor: Option<Vec2>,
    press: Option<PressState>,
    hovered: Option<AgentId>,
    focused: Option<AgentId>,
    click_slop_px: f32,
}

impl Default for PointerInput {
    fn default() -> Self {
        Self::new(DEFAULT_CLICK_SLOP_PX)
    }
}

impl PointerInput {
    pub fn new(click_slop_px: f32) -> Self {
        Self {
            cursor: None,
            press: None,
            hovered: None,
            focused: None,
            click_slop_px: click_slop_px.max(0.0),
        }
    }

    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }

    pub fn hovered(&self) -> Option<AgentId> {
        self.hovered
    }

    pub fn focused(&self) -> Option<AgentId> {
        self.focused
    }

    pub fn set_focus(&mut self, focused: Option<AgentId>) {
        self.focused = focused;
    }

    pub fn cursor_moved(&mut self, screen: Vec2, camera: &mut CameraController) {
        self.cursor = Some(screen);
        if let Some(press) = &mut self.press {
            press.max_travel = press.max_travel.max(press.origin.distance_to(screen));
            camera.drag(screen);
        }
    }

    pub fn cursor_left(&mut self, camera: &mut CameraController) {
        self.cursor = None;
        self.hovered = None;
        if self.press.take().is_some() {
            camera.end_drag();
        }
    }

    pub fn button_pressed(&mut self, camera: &mut CameraController) {
        let Some(cursor) = self.cursor else {
            return;
        };
        if self.press.is_some() {
            return;
        }
        self.press = Some(PressState {
            origin: cursor,
            max_travel: 0.0,
        });
        camera.begin_drag(cursor);
    }

    /// Ends a drag. Returns the selection change when the press was a click.
    pub fn button_released(
        &mut self,
        camera: &mut CameraController,
        agents: &[Agent],
    ) -> Option<ClickOutcome> {
        let press = self.press.take()?;
        camera.end_drag();
        if press.max_travel > self.click_slop_px {
            return None;
        }
        let cursor = self.cursor.unwrap_or(press.origin);
        self.focused = camera.pick_agent_at_screen(agents, cursor);
        Some(match self.focused {
            Some(id) => ClickOutcome::Selected(id),
            None => ClickOutcome::Cleared,
        })
    }

    pub fn wheel(&mut self, wheel_delta: f32, camera: &mut CameraController) {
        camera.zoom_by(wheel_delta, self.cursor);
    }

    /// Re-runs the hover hit test; agents move under a still cursor.
    pub fn refresh_hover(&mut self, camera: &CameraController, agents: &[Agent]) {
        self.hovered = match self.cursor {
            Some(cursor) if self.press.is_none() => camera.pick_agent_at_screen(agents, cursor),
            _ => None,
        };
    }

    /// Drops ids that no longer resolve to an agent.
    pub fn retain_known(&mut self, agents: &[Agent]) {
        let known = |id: Option<AgentId>| id.filter(|id| agents.iter().any(|a| a.id == *id));
        self.focused = known(self.focused);
        self.hovered = known(self.hovered);
    }
}

/// Browser-convention wheel delta: positive scrolls back (zoom out).
pub(crate) fn wheel_delta_from_scroll(delta: MouseScrollDelta) -> f32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => -y * LINE_DELTA_PIXELS,
        MouseScrollDelta::PixelDelta(position) => -position.y as f32,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum KeyCommand {
    Quit,
    TogglePause,
    Step,
    ToggleHud,
}

const KEY_COMMAND_COUNT: usize = 4;

impl KeyCommand {
    const fn index(self) -> usize {
        match self {
            KeyCommand::Quit => 0,
            KeyCommand::TogglePause => 1,
            KeyCommand::Step => 2,
            KeyCommand::ToggleHud => 3,
        }
    }

    fn from_physical_key(key: PhysicalKey) -> Option<Self> {
        match key {
            PhysicalKey::Code(KeyCode::Escape) => Some(KeyCommand::Quit),
            PhysicalKey::Code(KeyCode::Space) => Some(KeyCommand::TogglePause),
            PhysicalKey::Code(KeyCode::Period) => Some(KeyCommand::Step),
            PhysicalKey::Code(KeyCode::F3) => Some(KeyCommand::ToggleHud),
            _ => None,
        }
    }
}

/// Edge-triggered debug keys: holding a key fires once until released.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct KeyEdges {
    down: [bool; KEY_COMMAND_COUNT],
    pressed_edge: [bool; KEY_COMMAND_COUNT],
}

impl KeyEdges {
    pub(crate) fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        if let Some(command) = KeyCommand::from_physical_key(key) {
            self.handle_command_state(command, state);
        }
    }

    fn handle_command_state(&mut self, command: KeyCommand, state: ElementState) {
        let index = command.index();
        match state {
            ElementState::Pressed => {
                if !self.down[index] {
                    self.pressed_edge[index] = true;
                }
                self.down[index] = true;
            }
            ElementState::Released => self.down[index] = false,
        }
    }

    pub(crate) fn take_pressed(&mut self, command: KeyCommand) -> bool {
        std::mem::take(&mut self.pressed_edge[command.index()])
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::camera::{CameraConfig, CameraMode, Viewport};
    use crate::model::{AgentTraits, AnimationState, BuildingId, Emotion};

    fn agent(id: u64, position: Vec2) -> Agent {
        Agent {
            id: AgentId(id),
            name: format!("agent {id}"),
            backstory: String::new(),
            personality: String::new(),
            color: [0, 0, 0, 255],
            traits: AgentTraits::default(),
            house_id: BuildingId(0),
            emotional_state: Emotion::Neutral,
            current_thought: String::new(),
            reasoning: String::new(),
            destination_name: String::new(),
            skills: BTreeMap::new(),
            memories: Vec::new(),
            position,
            target: None,
            animation_state: AnimationState::Idle,
        }
    }

    fn identity_camera(mode: CameraMode) -> CameraController {
        let mut camera = CameraController::new(
            CameraConfig {
                mode,
                initial_zoom: 1.0,
                clamp_margin: None,
                ..CameraConfig::default()
            },
            Viewport {
                width: 400,
                height: 400,
            },
            Vec2::new(400.0, 400.0),
        );
        camera.integrate(None);
        camera
    }

    fn free_position(camera: &CameraController) -> Vec2 {
        camera.free_camera().expect("free camera").position
    }

    #[test]
    fn press_without_cursor_is_ignored() {
        let mut camera = identity_camera(CameraMode::Free);
        let mut input = PointerInput::default();
        input.button_pressed(&mut camera);
        assert!(!camera.is_dragging());
        assert_eq!(input.button_released(&mut camera, &[]), None);
    }

    #[test]
    fn drag_pans_camera_and_is_not_a_click() {
        let mut camera = identity_camera(CameraMode::Free);
        let start = free_position(&camera);
        let mut input = PointerInput::default();

        input.cursor_moved(Vec2::new(100.0, 100.0), &mut camera);
        input.button_pressed(&mut camera);
        assert!(camera.is_dragging());
        input.cursor_moved(Vec2::new(150.0, 100.0), &mut camera);
        let outcome = input.button_released(&mut camera, &[agent(1, Vec2::new(150.0, 100.0))]);

        assert_eq!(outcome, None);
        assert!(!camera.is_dragging());
        assert!(free_position(&camera).x < start.x);
    }

    #[test]
    fn still_click_selects_agent_under_cursor() {
        let mut camera = identity_camera(CameraMode::Free);
        let agents = vec![agent(3, camera.screen_to_world(Vec2::new(200.0, 200.0)))];
        let mut input = PointerInput::default();

        input.cursor_moved(Vec2::new(200.0, 200.0), &mut camera);
        input.button_pressed(&mut camera);
        input.cursor_moved(Vec2::new(201.0, 201.0), &mut camera);
        let outcome = input.button_released(&mut camera, &agents);

        assert_eq!(outcome, Some(ClickOutcome::Selected(AgentId(3))));
        assert_eq!(input.focused(), Some(AgentId(3)));
    }

    #[test]
    fn click_on_empty_ground_clears_focus() {
        let mut camera = identity_camera(CameraMode::Free);
        let mut input = PointerInput::default();
        input.set_focus(Some(AgentId(9)));

        input.cursor_moved(Vec2::new(10.0, 10.0), &mut camera);
        input.button_pressed(&mut camera);
        let outcome = input.button_released(&mut camera, &[]);

        assert_eq!(outcome, Some(ClickOutcome::Cleared));
        assert_eq!(input.focused(), None);
    }

    #[test]
    fn clicks_still_select_in_fixed_fit_mode() {
        let mut camera = identity_camera(CameraMode::FixedFit);
        let before = camera.transform();
        let agents = vec![agent(5, camera.screen_to_world(Vec2::new(120.0, 80.0)))];
        let mut input = PointerInput::default();

        input.cursor_moved(Vec2::new(120.0, 80.0), &mut camera);
        input.button_pressed(&mut camera);
        input.wheel(-500.0, &mut camera);
        let outcome = input.button_released(&mut camera, &agents);

        assert_eq!(outcome, Some(ClickOutcome::Selected(AgentId(5))));
        assert_eq!(camera.transform(), before);
    }

    #[test]
    fn leaving_the_window_ends_the_drag_and_hover() {
        let mut camera = identity_camera(CameraMode::Free);
        let agents = vec![agent(1, camera.screen_to_world(Vec2::new(50.0, 50.0)))];
        let mut input = PointerInput::default();

        input.cursor_moved(Vec2::new(50.0, 50.0), &mut camera);
        input.refresh_hover(&camera, &agents);
        assert_eq!(input.hovered(), Some(AgentId(1)));

        input.button_pressed(&mut camera);
        input.cursor_left(&mut camera);
        assert!(!camera.is_dragging());
        assert_eq!(input.hovered(), None);
        assert_eq!(input.cursor(), None);
    }

    #[test]
    fn hover_is_suppressed_while_dragging() {
        let mut camera = identity_camera(CameraMode::Free);
        let agents = vec![agent(1, camera.screen_to_world(Vec2::new(50.0, 50.0)))];
        let mut input = PointerInput::default();
        input.cursor_moved(Vec2::new(50.0, 50.0), &mut camera);
        input.button_pressed(&mut camera);
        input.refresh_hover(&camera, &agents);
        assert_eq!(input.hovered(), None);
    }

    #[test]
    fn wheel_forward_zooms_in() {
        let mut camera = identity_camera(CameraMode::Free);
        let mut input = PointerInput::default();
        input.cursor_moved(Vec2::new(200.0, 200.0), &mut camera);
        let before = camera.transform().scale;
        input.wheel(wheel_delta_from_scroll(MouseScrollDelta::LineDelta(0.0, 1.0)), &mut camera);
        assert!(camera.transform().scale > before);
    }

    #[test]
    fn retain_known_drops_stale_ids() {
        let mut input = PointerInput::default();
        input.set_focus(Some(AgentId(2)));
        input.retain_known(&[agent(1, Vec2::ZERO)]);
        assert_eq!(input.focused(), None);
    }

    #[test]
    fn scroll_deltas_use_browser_sign_convention() {
        assert_eq!(wheel_delta_from_scroll(MouseScrollDelta::LineDelta(0.0, 1.0)), -100.0);
        assert_eq!(wheel_delta_from_scroll(MouseScrollDelta::LineDelta(0.0, -2.0)), 200.0);
        let pixel = MouseScrollDelta::PixelDelta(winit::dpi::PhysicalPosition::new(0.0, 30.0));
        assert_eq!(wheel_delta_from_scroll(pixel), -30.0);
    }

    #[test]
    fn held_key_fires_once_until_released() {
        let mut keys = KeyEdges::default();
        let space = PhysicalKey::Code(KeyCode::Space);

        keys.handle_key(space, ElementState::Pressed);
        assert!(keys.take_pressed(KeyCommand::TogglePause));
        keys.handle_key(space, ElementState::Pressed);
        assert!(!keys.take_pressed(KeyCommand::TogglePause));

        keys.handle_key(space, ElementState::Released);
        keys.handle_key(space, ElementState::Pressed);
        assert!(keys.take_pressed(KeyCommand::TogglePause));
        assert!(!keys.take_pressed(KeyCommand::Step));
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut keys = KeyEdges::default();
        keys.handle_key(PhysicalKey::Code(KeyCode::KeyQ), ElementState::Pressed);
        for command in [
            KeyCommand::Quit,
            KeyCommand::TogglePause,
            KeyCommand::Step,
            KeyCommand::ToggleHud,
        ] {
            assert!(!keys.take_pressed(command));
        }
    }
}
