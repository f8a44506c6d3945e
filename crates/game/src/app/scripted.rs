use std::thread;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::json;
use village_engine::model::{BuildingId, BuildingKind, BuildingState, Emotion, Weather};

use super::gateway::{
    AgentReactionRequest, EnvironmentRequest, GatewayError, Prompt, PromptSubject,
    PromptTransport,
};

const ROUTINE_PREFIX: &str = "routine task: go to ";

/// Offline stand-in for the generative service. Replies are keyword driven
/// and depend only on the seed and the request, never on the prompt text.
#[derive(Debug, Clone)]
pub(crate) struct ScriptedTransport {
    seed: u64,
    latency: Duration,
}

impl ScriptedTransport {
    pub(crate) fn new(seed: u64, latency: Duration) -> Self {
        Self { seed, latency }
    }

    fn rng_for(&self, salt: u64, text: &str) -> SmallRng {
        SmallRng::seed_from_u64(self.seed ^ salt.rotate_left(17) ^ fnv1a(text))
    }

    fn agent_reply(&self, request: &AgentReactionRequest) -> serde_json::Value {
        let mut rng = self.rng_for(request.agent_id.0, &request.situation);
        let situation = request.situation.to_ascii_lowercase();
        let mood = mood_for(&situation, request.weather);

        let routine_target = situation.strip_prefix(ROUTINE_PREFIX).and_then(|rest| {
            request
                .locations
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(rest.trim()))
        });
        let named_target = request
            .locations
            .iter()
            .find(|(name, _)| situation.contains(&name.to_ascii_lowercase()));
        let shelter = request
            .locations
            .iter()
            .filter(|(_, kind)| matches!(kind, BuildingKind::Shop | BuildingKind::Office))
            .collect::<Vec<_>>();

        let destination = match (routine_target, mood) {
            (Some((name, _)), _) => name.clone(),
            (None, Emotion::Panic | Emotion::Sad) => shelter
                .choose(&mut rng)
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
            (None, _) => named_target
                .or_else(|| request.locations.choose(&mut rng))
                .map(|(name, _)| name.clone())
                .unwrap_or_default(),
        };

        let thought = thoughts_for(mood)
            .choose(&mut rng)
            .copied()
            .unwrap_or("Hmm.");
        let memory = routine_target
            .is_none()
            .then(|| format!("Heard: {}", request.situation));

        json!({
            "emotionalState": mood.glyph(),
            "currentThought": thought,
            "reasoning": format!("{} reacted to \"{}\".", request.name, request.situation),
            "destination": destination,
            "memoryUpdate": memory,
        })
    }

    fn environment_reply(&self, request: &EnvironmentRequest) -> serde_json::Value {
        let mut rng = self.rng_for(0, &request.situation);
        let situation = request.situation.to_ascii_lowercase();

        let weather = weather_for(&situation).unwrap_or(request.weather);
        let updates = match building_state_for(&situation) {
            Some(state) => {
                let named = request
                    .buildings
                    .iter()
                    .filter(|(_, name)| situation.contains(&name.to_ascii_lowercase()))
                    .map(|(id, _)| *id)
                    .collect::<Vec<BuildingId>>();
                let targets = if named.is_empty() {
                    request
                        .buildings
                        .choose(&mut rng)
                        .map(|(id, _)| vec![*id])
                        .unwrap_or_default()
                } else {
                    named
                };
                targets
                    .into_iter()
                    .map(|id| json!({ "buildingId": id.0, "state": state_name(state) }))
                    .collect::<Vec<_>>()
            }
            None => Vec::new(),
        };

        json!({
            "weather": weather.as_str(),
            "buildingUpdates": updates,
            "eventLog": event_log_line(&request.situation, weather),
        })
    }
}

impl PromptTransport for ScriptedTransport {
    fn complete(&self, prompt: &Prompt<'_>) -> Result<String, GatewayError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let reply = match prompt.subject {
            PromptSubject::Agent(request) => self.agent_reply(request),
            PromptSubject::Environment(request) => self.environment_reply(request),
        };
        serde_json::to_string(&reply).map_err(|error| GatewayError::Transport(error.to_string()))
    }
}

fn mood_for(situation: &str, weather: Weather) -> Emotion {
    let has = |words: &[&str]| words.iter().any(|word| situation.contains(word));
    if has(&["fire", "burn", "flood", "quake", "monster"]) {
        Emotion::Panic
    } else if has(&["storm", "thunder", "damage", "broken", "lost"]) {
        Emotion::Sad
    } else if has(&["festival", "party", "celebrat", "sun", "music"]) {
        Emotion::Happy
    } else if has(&["thief", "stole", "rude", "insult"]) {
        Emotion::Angry
    } else if has(&["surprise", "suddenly", "appears", "wow"]) {
        Emotion::Surprised
    } else if situation.contains('?') {
        Emotion::Thinking
    } else if situation.starts_with(ROUTINE_PREFIX) && weather == Weather::Sunny {
        Emotion::Happy
    } else {
        Emotion::Neutral
    }
}

fn thoughts_for(mood: Emotion) -> &'static [&'static str] {
    match mood {
        Emotion::Happy => &["What a lovely day.", "Off I go!", "Everything feels right."],
        Emotion::Sad => &["I should find shelter.", "Not my day.", "Everything is soaked."],
        Emotion::Angry => &["Who would do that?", "Unbelievable.", "I need answers."],
        Emotion::Panic => &["Run, run, run!", "Somebody help!", "Get indoors now!"],
        Emotion::Neutral => &["Just another errand.", "Keeping busy.", "On my way."],
        Emotion::Thinking => &["Let me think about that.", "Interesting question.", "Hmm."],
        Emotion::Surprised => &["Did that just happen?", "Whoa!", "Never seen that before."],
    }
}

fn weather_for(situation: &str) -> Option<Weather> {
    let has = |words: &[&str]| words.iter().any(|word| situation.contains(word));
    if has(&["storm", "thunder", "lightning"]) {
        Some(Weather::Stormy)
    } else if has(&["snow", "blizzard", "frost"]) {
        Some(Weather::Snowy)
    } else if has(&["rain", "drizzle", "shower"]) {
        Some(Weather::Rainy)
    } else if has(&["sun", "clear", "heatwave"]) {
        Some(Weather::Sunny)
    } else {
        None
    }
}

fn building_state_for(situation: &str) -> Option<BuildingState> {
    let has = |words: &[&str]| words.iter().any(|word| situation.contains(word));
    if has(&["fire", "burn", "blaze"]) {
        Some(BuildingState::Burning)
    } else if has(&["festival", "party", "celebrat", "parade"]) {
        Some(BuildingState::Festive)
    } else if has(&["quake", "collapse", "damage", "flood", "lightning"]) {
        Some(BuildingState::Damaged)
    } else if has(&["repair", "rebuild", "extinguish", "restore"]) {
        Some(BuildingState::Normal)
    } else {
        None
    }
}

fn state_name(state: BuildingState) -> &'static str {
    match state {
        BuildingState::Normal => "normal",
        BuildingState::Burning => "burning",
        BuildingState::Festive => "festive",
        BuildingState::Damaged => "damaged",
    }
}

fn event_log_line(situation: &str, weather: Weather) -> String {
    let trimmed = situation.trim().trim_end_matches(&['.', '!'][..]);
    let mut chars = trimmed.chars();
    let sentence = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => "The day goes on".to_string(),
    };
    format!("{sentence}. Skies are {}.", weather.as_str())
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::gateway::{PromptGateway, ReactionGateway};
    use village_engine::model::AgentId;

    fn gateway(seed: u64) -> PromptGateway<ScriptedTransport> {
        PromptGateway::new(ScriptedTransport::new(seed, Duration::ZERO))
    }

    fn locations() -> Vec<(String, BuildingKind)> {
        vec![
            ("Plaza Central".to_string(), BuildingKind::Square),
            ("Market Hall".to_string(), BuildingKind::Shop),
            ("River Library".to_string(), BuildingKind::Office),
            ("Arthur's Home".to_string(), BuildingKind::House),
        ]
    }

    fn agent_request(situation: &str) -> AgentReactionRequest {
        AgentReactionRequest {
            agent_id: AgentId(2),
            name: "Caleb".to_string(),
            backstory: String::new(),
            personality: String::new(),
            current_thought: String::new(),
            clock: "08:00".to_string(),
            weather: Weather::Sunny,
            locations: locations(),
            situation: situation.to_string(),
        }
    }

    #[test]
    fn routine_task_walks_to_the_named_building() {
        let reaction = gateway(1)
            .request_agent_reaction(&agent_request("Routine task: Go to Market Hall"))
            .expect("reaction");
        assert_eq!(reaction.destination, "Market Hall");
        assert_eq!(reaction.emotional_state, Emotion::Happy);
        assert_eq!(reaction.memory_update, None);
    }

    #[test]
    fn fire_makes_agents_panic_toward_shelter() {
        let reaction = gateway(1)
            .request_agent_reaction(&agent_request("Fire at the plaza!"))
            .expect("reaction");
        assert_eq!(reaction.emotional_state, Emotion::Panic);
        assert!(["Market Hall", "River Library"].contains(&reaction.destination.as_str()));
        assert!(reaction.memory_update.is_some());
    }

    #[test]
    fn replies_are_deterministic_per_seed() {
        let request = agent_request("A juggler wanders through town");
        let first = gateway(7).request_agent_reaction(&request).expect("first");
        let second = gateway(7).request_agent_reaction(&request).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn environment_change_follows_keywords() {
        let request = EnvironmentRequest {
            clock: "10:00".to_string(),
            weather: Weather::Sunny,
            buildings: vec![
                (BuildingId(102), "Market Hall".to_string()),
                (BuildingId(104), "River Library".to_string()),
            ],
            situation: "a storm sets the market hall on fire".to_string(),
        };
        let change = gateway(3)
            .request_environment_change(&request)
            .expect("change");
        assert_eq!(change.weather, Weather::Stormy);
        assert_eq!(change.building_updates.len(), 1);
        assert_eq!(change.building_updates[0].building_id, BuildingId(102));
        assert_eq!(change.building_updates[0].state, BuildingState::Burning);
        assert_eq!(
            change.event_log,
            "A storm sets the market hall on fire. Skies are stormy."
        );
    }

    #[test]
    fn calm_input_keeps_weather_and_buildings() {
        let request = EnvironmentRequest {
            clock: "10:00".to_string(),
            weather: Weather::Snowy,
            buildings: vec![(BuildingId(1), "Beatrix's Home".to_string())],
            situation: "A quiet afternoon".to_string(),
        };
        let change = gateway(3)
            .request_environment_change(&request)
            .expect("change");
        assert_eq!(change.weather, Weather::Snowy);
        assert!(change.building_updates.is_empty());
    }
}
