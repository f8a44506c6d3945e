use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{Agent, AgentId, AnimationState, Vec2};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MotionConfig {
    /// World units advanced per frame while walking.
    pub walk_speed: f32,
    /// Distance below which a walking agent snaps onto its target.
    pub arrival_epsilon: f32,
    /// Frames spent in each idle animation before cycling to the next.
    pub idle_cycle_frames: u64,
    /// Frame offset applied per agent id so villagers do not idle in lockstep.
    pub idle_phase_stride: u64,
    pub idle_states: Vec<AnimationState>,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            walk_speed: 2.0,
            arrival_epsilon: 5.0,
            idle_cycle_frames: 150,
            idle_phase_stride: 100,
            idle_states: vec![
                AnimationState::Breathing,
                AnimationState::Scanning,
                AnimationState::CheckingWatch,
                AnimationState::Idle,
            ],
        }
    }
}

/// Advances every agent by one frame.
///
/// Returns a clone of `agents` (same allocation) when nothing changed, so
/// callers can skip downstream work with `Arc::ptr_eq`.
pub fn advance_agents(
    agents: &Arc<Vec<Agent>>,
    frame_index: u64,
    config: &MotionConfig,
) -> Arc<Vec<Agent>> {
    let mut next: Option<Vec<Agent>> = None;
    for (index, agent) in agents.iter().enumerate() {
        if let Some(updated) = advance_agent(agent, frame_index, config) {
            let next = next.get_or_insert_with(|| agents.as_ref().clone());
            next[index] = updated;
        }
    }

    match next {
        Some(next) => Arc::new(next),
        None => Arc::clone(agents),
    }
}

/// Next state of a single agent, or `None` when it is unchanged.
pub fn advance_agent(agent: &Agent, frame_index: u64, config: &MotionConfig) -> Option<Agent> {
    let Some(target) = agent.target else {
        let idle_state = idle_state_for(agent.id, frame_index, config);
        if idle_state == agent.animation_state {
            return None;
        }
        return Some(Agent {
            animation_state: idle_state,
            ..agent.clone()
        });
    };

    let mut next = agent.clone();
    match step_toward(agent.position, target, config.walk_speed, config.arrival_epsilon) {
        Step::Arrived => {
            next.position = target;
            next.target = None;
            next.animation_state = AnimationState::Idle;
        }
        Step::Moved(position) => {
            next.position = position;
            next.animation_state = AnimationState::Walking;
        }
    }
    Some(next)
}

pub fn idle_state_for(agent_id: AgentId, frame_index: u64, config: &MotionConfig) -> AnimationState {
    if config.idle_states.is_empty() {
        return AnimationState::Idle;
    }
    let phase_offset = agent_id.0.wrapping_mul(config.idle_phase_stride);
    let cycle = frame_index.wrapping_add(phase_offset) / config.idle_cycle_frames.max(1);
    let index = (cycle % config.idle_states.len() as u64) as usize;
    config.idle_states[index]
}

pub fn walking_count(agents: &[Agent]) -> usize {
    agents.iter().filter(|agent| agent.is_walking()).count()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    Arrived,
    Moved(Vec2),
}

fn step_toward(current: Vec2, target: Vec2, speed: f32, arrival_epsilon: f32) -> Step {
    let delta = target - current;
    let distance = delta.length();
    if distance < arrival_epsilon {
        return Step::Arrived;
    }

    // Never step past the target; the next frame snaps it.
    let step = speed.min(distance);
    let inv_distance = distance.recip();
    Step::Moved(Vec2::new(
        current.x + delta.x * inv_distance * step,
        current.y + delta.y * inv_distance * step,
    ))
}
