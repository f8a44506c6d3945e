use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{Agent, AgentId, Building, BuildingId, Prop, Vec2};

const CLOCK_DAY_END: u32 = 2400;
const CLOCK_MINUTES_PER_HOUR: u32 = 60;
const CLOCK_HOUR_STRIDE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    #[default]
    Sunny,
    Rainy,
    Stormy,
    Snowy,
}

impl Weather {
    pub fn as_str(self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::Rainy => "rainy",
            Weather::Stormy => "stormy",
            Weather::Snowy => "snowy",
        }
    }
}

/// Simulation clock and shared village conditions.
///
/// `time` is encoded as `HHMM` (0..2400); `events` is most-recent-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorldState {
    pub time: u32,
    pub day: u32,
    pub weather: Weather,
    pub events: VecDeque<String>,
}

impl Default for WorldState {
    fn default() -> Self {
        Self {
            time: 800,
            day: 1,
            weather: Weather::Sunny,
            events: VecDeque::new(),
        }
    }
}

impl WorldState {
    /// Advances the clock by one simulated minute, rolling minutes into hours
    /// and hours into days.
    pub fn advance_clock(&mut self) {
        self.time += 1;
        if self.time % CLOCK_HOUR_STRIDE >= CLOCK_MINUTES_PER_HOUR {
            self.time += CLOCK_HOUR_STRIDE - CLOCK_MINUTES_PER_HOUR;
        }
        if self.time >= CLOCK_DAY_END {
            self.time = 0;
            self.day += 1;
        }
    }

    pub fn push_event(&mut self, text: impl Into<String>, capacity: usize) {
        self.events.push_front(text.into());
        self.events.truncate(capacity);
    }

    pub fn latest_event(&self) -> Option<&str> {
        self.events.front().map(String::as_str)
    }

    pub fn clock_label(&self) -> String {
        format!(
            "{:02}:{:02}",
            self.time / CLOCK_HOUR_STRIDE,
            self.time % CLOCK_HOUR_STRIDE
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicSegment {
    pub control_a: Vec2,
    pub control_b: Vec2,
    pub end: Vec2,
}

/// River drawn as a thick spline: `start` followed by cubic segments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverPath {
    pub start: Vec2,
    pub segments: Vec<CubicSegment>,
    pub width: f32,
}

/// Static ground layer of the village.
#[derive(Debug, Clone, PartialEq)]
pub struct WorldLayout {
    pub width: f32,
    pub height: f32,
    pub paths: Vec<Rect>,
    pub river: Option<RiverPath>,
    pub bridges: Vec<Rect>,
}

impl WorldLayout {
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }
}

/// Everything the loop publishes to the renderer each frame.
///
/// `agents` is shared copy-on-write: the renderer holds the last published
/// snapshot while hosts mutate through [`VillageWorld::agents_mut`].
#[derive(Debug, Clone)]
pub struct VillageWorld {
    pub agents: Arc<Vec<Agent>>,
    pub buildings: Vec<Building>,
    pub props: Vec<Prop>,
    pub layout: WorldLayout,
    pub state: WorldState,
}

impl VillageWorld {
    pub fn agents_mut(&mut self) -> &mut Vec<Agent> {
        Arc::make_mut(&mut self.agents)
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == id)
    }

    pub fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.agents_mut().iter_mut().find(|agent| agent.id == id)
    }

    pub fn agent_by_name(&self, name: &str) -> Option<&Agent> {
        self.agents
            .iter()
            .find(|agent| agent.name.eq_ignore_ascii_case(name))
    }

    pub fn building(&self, id: BuildingId) -> Option<&Building> {
        self.buildings.iter().find(|building| building.id == id)
    }

    pub fn building_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        self.buildings.iter_mut().find(|building| building.id == id)
    }

    /// Case-insensitive lookup used when resolving a destination name.
    pub fn building_by_name(&self, name: &str) -> Option<&Building> {
        let name = name.trim();
        self.buildings
            .iter()
            .find(|building| building.name.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BuildingKind, BuildingState, Size};

    #[test]
    fn clock_rolls_minutes_into_hours() {
        let mut world = WorldState {
            time: 859,
            ..WorldState::default()
        };
        world.advance_clock();
        assert_eq!(world.time, 900);
        assert_eq!(world.day, 1);
        world.advance_clock();
        assert_eq!(world.time, 901);
    }

    #[test]
    fn clock_wraps_day_at_midnight() {
        let mut world = WorldState {
            time: 2359,
            day: 4,
            ..WorldState::default()
        };
        world.advance_clock();
        assert_eq!(world.time, 0);
        assert_eq!(world.day, 5);
        assert_eq!(world.clock_label(), "00:00");
    }

    #[test]
    fn clock_never_reports_minutes_past_59() {
        let mut world = WorldState::default();
        for _ in 0..(60 * 24 * 2) {
            world.advance_clock();
            assert!(world.time % 100 < 60, "time={}", world.time);
            assert!(world.time < 2400);
        }
        assert_eq!(world.time, 800);
        assert_eq!(world.day, 3);
    }

    #[test]
    fn event_log_is_bounded_and_most_recent_first() {
        let mut world = WorldState::default();
        for index in 0..12 {
            world.push_event(format!("event {index}"), 5);
            assert!(world.events.len() <= 5);
            assert_eq!(world.latest_event(), Some(format!("event {index}").as_str()));
        }
        assert_eq!(world.events.len(), 5);
        assert_eq!(world.events.back().map(String::as_str), Some("event 7"));
    }

    #[test]
    fn building_lookup_by_name_ignores_case_and_padding() {
        let world = VillageWorld {
            agents: Arc::new(Vec::new()),
            buildings: vec![Building {
                id: BuildingId(2),
                name: "Town Hall".to_string(),
                kind: BuildingKind::Office,
                position: Vec2::new(10.0, 10.0),
                size: Size { w: 50.0, h: 40.0 },
                state: BuildingState::Normal,
                owner_name: None,
            }],
            props: Vec::new(),
            layout: WorldLayout {
                width: 100.0,
                height: 100.0,
                paths: Vec::new(),
                river: None,
                bridges: Vec::new(),
            },
            state: WorldState::default(),
        };
        assert_eq!(
            world.building_by_name(" town hall ").map(|b| b.id),
            Some(BuildingId(2))
        );
        assert!(world.building_by_name("Bakery").is_none());
        assert_eq!(world.building(BuildingId(2)).map(|b| b.name.as_str()), Some("Town Hall"));
    }

    #[test]
    fn clock_label_pads_hours_and_minutes() {
        let world = WorldState {
            time: 905,
            ..WorldState::default()
        };
        assert_eq!(world.clock_label(), "09:05");
    }
}
