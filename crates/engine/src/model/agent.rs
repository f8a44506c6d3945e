use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BuildingId, Vec2};

const AGENT_ID_PREFIX: &str = "agent-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AgentId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("agent id must look like `agent-<n>`, got `{raw}`")]
pub struct AgentIdParseError {
    raw: String,
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{AGENT_ID_PREFIX}{}", self.0)
    }
}

impl FromStr for AgentId {
    type Err = AgentIdParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.strip_prefix(AGENT_ID_PREFIX)
            .and_then(|suffix| suffix.parse::<u64>().ok())
            .map(AgentId)
            .ok_or_else(|| AgentIdParseError {
                raw: raw.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationState {
    #[default]
    Idle,
    Walking,
    Breathing,
    Scanning,
    CheckingWatch,
    Gesturing,
    Working,
}

impl AnimationState {
    pub fn as_str(self) -> &'static str {
        match self {
            AnimationState::Idle => "idle",
            AnimationState::Walking => "walking",
            AnimationState::Breathing => "breathing",
            AnimationState::Scanning => "scanning",
            AnimationState::CheckingWatch => "checking_watch",
            AnimationState::Gesturing => "gesturing",
            AnimationState::Working => "working",
        }
    }
}

/// Mood reported by the reaction service. The service answers with an emoji;
/// plain names are accepted too.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Panic,
    #[default]
    Neutral,
    Thinking,
    Surprised,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown emotional state `{raw}`")]
pub struct EmotionParseError {
    raw: String,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Panic,
        Emotion::Neutral,
        Emotion::Thinking,
        Emotion::Surprised,
    ];

    pub fn glyph(self) -> &'static str {
        match self {
            Emotion::Happy => "\u{1f603}",
            Emotion::Sad => "\u{1f622}",
            Emotion::Angry => "\u{1f621}",
            Emotion::Panic => "\u{1f631}",
            Emotion::Neutral => "\u{1f610}",
            Emotion::Thinking => "\u{1f914}",
            Emotion::Surprised => "\u{1f632}",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Panic => "panic",
            Emotion::Neutral => "neutral",
            Emotion::Thinking => "thinking",
            Emotion::Surprised => "surprised",
        }
    }

    /// Color of the mood dot drawn beside the name tag.
    pub fn color(self) -> [u8; 4] {
        match self {
            Emotion::Happy => [255, 214, 64, 255],
            Emotion::Sad => [96, 148, 232, 255],
            Emotion::Angry => [232, 64, 48, 255],
            Emotion::Panic => [255, 120, 200, 255],
            Emotion::Neutral => [190, 190, 190, 255],
            Emotion::Thinking => [160, 120, 240, 255],
            Emotion::Surprised => [80, 230, 210, 255],
        }
    }
}

impl FromStr for Emotion {
    type Err = EmotionParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        Emotion::ALL
            .into_iter()
            .find(|emotion| {
                emotion.glyph() == trimmed
                    || trimmed.starts_with(emotion.glyph())
                    || emotion.name().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| EmotionParseError {
                raw: raw.to_string(),
            })
    }
}

impl TryFrom<String> for Emotion {
    type Error = EmotionParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EyeType {
    Slit,
    #[default]
    Dot,
    Lightning,
    Laser,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouthType {
    #[default]
    Smile,
    Mask,
    Cigar,
    Tentacles,
    Teeth,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accessory {
    #[default]
    None,
    Shades,
    Chain,
    Halo,
    Hat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShirtStyle {
    #[default]
    Plain,
    Striped,
    Logo,
    Jersey,
    Suit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentTraits {
    pub eye: EyeType,
    pub mouth: MouthType,
    pub accessory: Accessory,
    pub shirt: ShirtStyle,
    pub shirt_text: Option<String>,
}

/// A villager.
///
/// `target.is_some()` exactly while the agent walks; the motion updater owns
/// `position`, `target` and `animation_state`. Everything under "behavior" is
/// written by reactions from outside the frame loop.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub backstory: String,
    pub personality: String,
    pub color: [u8; 4],
    pub traits: AgentTraits,
    pub house_id: BuildingId,
    // behavior
    pub emotional_state: Emotion,
    pub current_thought: String,
    pub reasoning: String,
    pub destination_name: String,
    pub skills: BTreeMap<String, u8>,
    pub memories: Vec<String>,
    // motion
    pub position: Vec2,
    pub target: Option<Vec2>,
    pub animation_state: AnimationState,
}

impl Agent {
    pub fn is_walking(&self) -> bool {
        self.target.is_some()
    }

    /// Appends a memory, dropping the oldest ones past `capacity`.
    pub fn remember(&mut self, memory: impl Into<String>, capacity: usize) {
        self.memories.push(memory.into());
        if self.memories.len() > capacity {
            let overflow = self.memories.len() - capacity;
            self.memories.drain(..overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_id_round_trips_through_display() {
        let id = AgentId(12);
        assert_eq!(id.to_string(), "agent-12");
        assert_eq!("agent-12".parse::<AgentId>(), Ok(id));
        assert!("agent-".parse::<AgentId>().is_err());
        assert!("villager-3".parse::<AgentId>().is_err());
    }

    #[test]
    fn emotion_parses_glyphs_and_names() {
        assert_eq!("\u{1f631}".parse::<Emotion>(), Ok(Emotion::Panic));
        assert_eq!("Happy".parse::<Emotion>(), Ok(Emotion::Happy));
        assert_eq!(" thinking ".parse::<Emotion>(), Ok(Emotion::Thinking));
        assert!("meh".parse::<Emotion>().is_err());
    }

    #[test]
    fn emotion_deserializes_from_json_string() {
        let emotion: Emotion = serde_json::from_str("\"\u{1f632}\"").expect("emotion");
        assert_eq!(emotion, Emotion::Surprised);
        assert!(serde_json::from_str::<Emotion>("\"bored\"").is_err());
    }

    #[test]
    fn animation_state_uses_snake_case_names() {
        let state: AnimationState = serde_json::from_str("\"checking_watch\"").expect("state");
        assert_eq!(state, AnimationState::CheckingWatch);
        assert_eq!(state.as_str(), "checking_watch");
    }

    #[test]
    fn remember_keeps_most_recent_within_capacity() {
        let mut agent = Agent {
            id: AgentId(0),
            name: "Milo".to_string(),
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
            position: Vec2::ZERO,
            target: None,
            animation_state: AnimationState::Idle,
        };
        for index in 0..5 {
            agent.remember(format!("m{index}"), 3);
        }
        assert_eq!(agent.memories, vec!["m2", "m3", "m4"]);
    }
}
