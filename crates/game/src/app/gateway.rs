use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;
use village_engine::model::{
    Agent, AgentId, Building, BuildingId, BuildingKind, BuildingState, Emotion, Weather,
    WorldState,
};

/// Everything a reaction request needs, owned so it can cross to a worker
/// thread while the loop keeps mutating the world.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AgentReactionRequest {
    pub(crate) agent_id: AgentId,
    pub(crate) name: String,
    pub(crate) backstory: String,
    pub(crate) personality: String,
    pub(crate) current_thought: String,
    pub(crate) clock: String,
    pub(crate) weather: Weather,
    pub(crate) locations: Vec<(String, BuildingKind)>,
    pub(crate) situation: String,
}

impl AgentReactionRequest {
    pub(crate) fn new(
        agent: &Agent,
        world: &WorldState,
        buildings: &[Building],
        situation: impl Into<String>,
    ) -> Self {
        Self {
            agent_id: agent.id,
            name: agent.name.clone(),
            backstory: agent.backstory.clone(),
            personality: agent.personality.clone(),
            current_thought: agent.current_thought.clone(),
            clock: world.clock_label(),
            weather: world.weather,
            locations: buildings
                .iter()
                .map(|building| (building.name.clone(), building.kind))
                .collect(),
            situation: situation.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EnvironmentRequest {
    pub(crate) clock: String,
    pub(crate) weather: Weather,
    pub(crate) buildings: Vec<(BuildingId, String)>,
    pub(crate) situation: String,
}

impl EnvironmentRequest {
    pub(crate) fn new(
        world: &WorldState,
        buildings: &[Building],
        situation: impl Into<String>,
    ) -> Self {
        Self {
            clock: world.clock_label(),
            weather: world.weather,
            buildings: buildings
                .iter()
                .map(|building| (building.id, building.name.clone()))
                .collect(),
            situation: situation.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AgentReaction {
    pub(crate) emotional_state: Emotion,
    pub(crate) current_thought: String,
    pub(crate) reasoning: String,
    /// Building name; resolved against the world by the orchestrator.
    pub(crate) destination: String,
    #[serde(default)]
    pub(crate) memory_update: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BuildingUpdate {
    pub(crate) building_id: BuildingId,
    pub(crate) state: BuildingState,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EnvironmentChange {
    pub(crate) weather: Weather,
    #[serde(default)]
    pub(crate) building_updates: Vec<BuildingUpdate>,
    pub(crate) event_log: String,
}

#[derive(Debug, Error)]
pub(crate) enum GatewayError {
    #[error("reaction transport failed: {0}")]
    Transport(String),
    /// Covers bad JSON as well as unknown emotion, weather or state values.
    #[error("malformed reaction reply at {path}: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("reaction reply field `{field}` is empty")]
    EmptyField { field: &'static str },
}

/// The generative service deciding what villagers do. Calls block; the
/// orchestrator runs them on worker threads.
pub(crate) trait ReactionGateway: Send + Sync {
    fn request_agent_reaction(
        &self,
        request: &AgentReactionRequest,
    ) -> Result<AgentReaction, GatewayError>;

    fn request_environment_change(
        &self,
        request: &EnvironmentRequest,
    ) -> Result<EnvironmentChange, GatewayError>;
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PromptSubject<'a> {
    Agent(&'a AgentReactionRequest),
    Environment(&'a EnvironmentRequest),
}

#[derive(Debug, Clone)]
pub(crate) struct Prompt<'a> {
    pub(crate) text: String,
    pub(crate) subject: PromptSubject<'a>,
}

/// Turns a rendered prompt into the raw JSON reply.
pub(crate) trait PromptTransport: Send + Sync {
    fn complete(&self, prompt: &Prompt<'_>) -> Result<String, GatewayError>;
}

pub(crate) struct PromptGateway<T> {
    transport: T,
}

impl<T: PromptTransport> PromptGateway<T> {
    pub(crate) fn new(transport: T) -> Self {
        Self { transport }
    }
}

impl<T: PromptTransport> ReactionGateway for PromptGateway<T> {
    fn request_agent_reaction(
        &self,
        request: &AgentReactionRequest,
    ) -> Result<AgentReaction, GatewayError> {
        let prompt = Prompt {
            text: render_agent_prompt(request),
            subject: PromptSubject::Agent(request),
        };
        let result = self
            .transport
            .complete(&prompt)
            .and_then(|reply| parse_reply::<AgentReaction>(&reply))
            .and_then(|reaction| {
                if reaction.destination.trim().is_empty() {
                    Err(GatewayError::EmptyField {
                        field: "destination",
                    })
                } else {
                    Ok(reaction)
                }
            });
        if let Err(error) = &result {
            warn!(agent = %request.agent_id, error = %error, "agent_reaction_failed");
        }
        result
    }

    fn request_environment_change(
        &self,
        request: &EnvironmentRequest,
    ) -> Result<EnvironmentChange, GatewayError> {
        let prompt = Prompt {
            text: render_environment_prompt(request),
            subject: PromptSubject::Environment(request),
        };
        let result = self
            .transport
            .complete(&prompt)
            .and_then(|reply| parse_reply::<EnvironmentChange>(&reply))
            .and_then(|change| {
                if change.event_log.trim().is_empty() {
                    Err(GatewayError::EmptyField { field: "eventLog" })
                } else {
                    Ok(change)
                }
            });
        if let Err(error) = &result {
            warn!(error = %error, "environment_change_failed");
        }
        result
    }
}

fn parse_reply<R: DeserializeOwned>(raw: &str) -> Result<R, GatewayError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, R>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        GatewayError::Malformed {
            path,
            source: error.into_inner(),
        }
    })
}

pub(crate) fn render_agent_prompt(request: &AgentReactionRequest) -> String {
    let locations = request
        .locations
        .iter()
        .map(|(name, kind)| format!("{name} ({})", kind.as_str()))
        .collect::<Vec<_>>()
        .join(", ");
    let moods = Emotion::ALL
        .iter()
        .map(|emotion| emotion.glyph())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You are a villager in a small simulated town.\n\
Character: {name} ({backstory}). Personality: {personality}.\n\
Current thought: {thought}\n\
World: time {clock}, weather {weather}.\n\
Available locations: {locations}.\n\
New event: \"{situation}\"\n\
Reply with a JSON object:\n\
- emotionalState: one of {moods}\n\
- currentThought: short string, at most 10 words\n\
- reasoning: brief explanation\n\
- destination: exact name of a location to walk to\n\
- memoryUpdate: optional new memory",
        name = request.name,
        backstory = request.backstory,
        personality = request.personality,
        thought = request.current_thought,
        clock = request.clock,
        weather = request.weather.as_str(),
        situation = request.situation,
    )
}

pub(crate) fn render_environment_prompt(request: &EnvironmentRequest) -> String {
    let buildings = request
        .buildings
        .iter()
        .map(|(id, name)| format!("{} = {name}", id.0))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "You control the environment of a small simulated town.\n\
World: time {clock}, weather {weather}.\n\
Buildings by id: {buildings}.\n\
Operator input: \"{situation}\"\n\
Reply with a JSON object:\n\
- weather: sunny, rainy, stormy or snowy\n\
- buildingUpdates: array of {{ buildingId: number, state: normal | burning | festive | damaged }}\n\
- eventLog: one sentence describing what happened",
        clock = request.clock,
        weather = request.weather.as_str(),
        situation = request.situation,
    )
}
