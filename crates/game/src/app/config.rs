use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;
use village_engine::model::{AnimationState, Vec2};
use village_engine::{CameraConfig, CameraMode, LoopConfig, MotionConfig, RenderConfig};

pub(crate) const PROFILE_ENV_VAR: &str = "VILLAGE_PROFILE";
pub(crate) const CONFIG_ENV_VAR: &str = "VILLAGE_CONFIG";
pub(crate) const SEED_ENV_VAR: &str = "VILLAGE_SEED";

const DEFAULT_SEED: u64 = 0x5eed_1600;
const BASE_WORLD_SIZE: Vec2 = Vec2::new(1600.0, 1000.0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum WorldProfile {
    #[default]
    Compact,
    Mega,
    Diorama,
}

impl WorldProfile {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            WorldProfile::Compact => "compact",
            WorldProfile::Mega => "mega",
            WorldProfile::Diorama => "diorama",
        }
    }

    /// Multiplier applied to every coordinate of the base village layout.
    pub(crate) fn world_scale(self) -> f32 {
        match self {
            WorldProfile::Compact | WorldProfile::Diorama => 1.0,
            WorldProfile::Mega => 2.0,
        }
    }

    pub(crate) fn world_size(self) -> Vec2 {
        BASE_WORLD_SIZE * self.world_scale()
    }
}

impl fmt::Display for WorldProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorldProfile {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(WorldProfile::Compact),
            "mega" => Ok(WorldProfile::Mega),
            "diorama" => Ok(WorldProfile::Diorama),
            _ => Err(ConfigError::UnknownProfile(raw.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct OrchestratorConfig {
    /// Real time per simulated minute.
    pub(crate) clock_interval_ms: u64,
    pub(crate) scheduler_interval_ms: u64,
    /// Routine tasks are only handed out while fewer agents than this walk.
    pub(crate) max_busy_agents: usize,
    pub(crate) event_log_capacity: usize,
    pub(crate) memory_capacity: usize,
    /// Forward every environment change to each agent as a reaction request.
    pub(crate) broadcast_environment: bool,
    pub(crate) max_clock_catch_up: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            clock_interval_ms: 1_000,
            scheduler_interval_ms: 4_000,
            max_busy_agents: 8,
            event_log_capacity: 5,
            memory_capacity: 10,
            broadcast_environment: false,
            max_clock_catch_up: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct GatewayConfig {
    pub(crate) transport: GatewayTransport,
    /// Artificial reply delay of the offline transport.
    pub(crate) latency_ms: u64,
    /// Base URL of the generative service; the model path is appended.
    pub(crate) endpoint: String,
    pub(crate) model: String,
    /// Name of the env var holding the API key. The key itself never lives
    /// in config files.
    pub(crate) api_key_env: String,
    pub(crate) timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            transport: GatewayTransport::Scripted,
            latency_ms: 400,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key_env: "VILLAGE_API_KEY".to_string(),
            timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum GatewayTransport {
    /// Keyword-driven offline replies.
    #[default]
    Scripted,
    /// JSON-mode `generateContent` calls over HTTPS.
    Http,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub(crate) struct VillageConfig {
    pub(crate) profile: WorldProfile,
    pub(crate) seed: u64,
    #[serde(rename = "loop")]
    pub(crate) loop_config: LoopConfig,
    pub(crate) motion: MotionConfig,
    pub(crate) camera: CameraConfig,
    pub(crate) render: RenderConfig,
    pub(crate) orchestrator: OrchestratorConfig,
    pub(crate) gateway: GatewayConfig,
}

impl Default for VillageConfig {
    fn default() -> Self {
        Self::for_profile(WorldProfile::Compact)
    }
}

impl VillageConfig {
    pub(crate) fn for_profile(profile: WorldProfile) -> Self {
        let mut config = Self {
            profile,
            seed: DEFAULT_SEED,
            loop_config: LoopConfig {
                window_title: format!("Village ({profile})"),
                ..LoopConfig::default()
            },
            motion: MotionConfig::default(),
            camera: CameraConfig::default(),
            render: RenderConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            gateway: GatewayConfig::default(),
        };

        match profile {
            WorldProfile::Compact => {}
            WorldProfile::Mega => {
                config.motion.walk_speed = 3.0;
                config.motion.idle_cycle_frames = 150;
                config.motion.idle_states = vec![
                    AnimationState::Breathing,
                    AnimationState::Scanning,
                    AnimationState::CheckingWatch,
                    AnimationState::Gesturing,
                    AnimationState::Idle,
                ];
                config.camera.initial_zoom = 0.5;
                config.camera.min_zoom = 0.25;
                config.camera.clamp_margin = Some(800.0);
                config.render.water_flow_speed = 3.0;
                config.orchestrator.broadcast_environment = true;
            }
            WorldProfile::Diorama => {
                config.camera.mode = CameraMode::FixedFit;
                config.render.show_prop_labels = true;
            }
        }

        config
    }
}

#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("config file {path} must contain a JSON object")]
    NotAnObject { path: PathBuf },
    #[error("unknown world profile `{0}` (expected compact, mega or diorama)")]
    UnknownProfile(String),
}

/// Resolves the startup config from `VILLAGE_PROFILE`, `VILLAGE_CONFIG` and
/// `VILLAGE_SEED`.
pub(crate) fn load_config() -> Result<VillageConfig, ConfigError> {
    let profile = read_env_var(PROFILE_ENV_VAR);
    let file = read_env_var(CONFIG_ENV_VAR).map(PathBuf::from);
    let seed = read_env_var(SEED_ENV_VAR);
    resolve_config(profile.as_deref(), file.as_deref(), seed.as_deref())
}

/// A `profile` key inside the file picks the base profile; otherwise the
/// environment does. The file's remaining fields override that base.
pub(crate) fn resolve_config(
    profile_env: Option<&str>,
    config_file: Option<&Path>,
    seed_env: Option<&str>,
) -> Result<VillageConfig, ConfigError> {
    let overrides = match config_file {
        Some(path) => Some((path, read_overrides(path)?)),
        None => None,
    };

    let file_profile = overrides
        .as_ref()
        .and_then(|(_, value)| value.get("profile"))
        .and_then(Value::as_str)
        .map(WorldProfile::from_str)
        .transpose()?;
    let profile = match file_profile {
        Some(profile) => profile,
        None => profile_from_env(profile_env),
    };

    let mut config = match overrides {
        Some((path, overrides)) => apply_overrides(profile, path, overrides)?,
        None => VillageConfig::for_profile(profile),
    };

    if let Some(raw) = seed_env {
        match raw.trim().parse::<u64>() {
            Ok(seed) => config.seed = seed,
            Err(_) => warn!(
                env_var = SEED_ENV_VAR,
                value = raw,
                "invalid seed env var value; falling back to config"
            ),
        }
    }

    Ok(config)
}

fn profile_from_env(raw: Option<&str>) -> WorldProfile {
    match raw.map(WorldProfile::from_str) {
        Some(Ok(profile)) => profile,
        Some(Err(error)) => {
            warn!(
                env_var = PROFILE_ENV_VAR,
                error = %error,
                "invalid profile env var value; falling back to compact"
            );
            WorldProfile::Compact
        }
        None => WorldProfile::Compact,
    }
}

fn read_overrides(path: &Path) -> Result<Value, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        field: ".".to_string(),
        source,
    })?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        });
    }
    Ok(value)
}

fn apply_overrides(
    profile: WorldProfile,
    path: &Path,
    overrides: Value,
) -> Result<VillageConfig, ConfigError> {
    let base = VillageConfig::for_profile(profile);
    let mut merged = serde_json::to_value(&base).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        field: ".".to_string(),
        source,
    })?;
    merge_json(&mut merged, overrides);
    merged["profile"] = Value::from(profile.as_str());

    serde_path_to_error::deserialize::<_, VillageConfig>(merged).map_err(|error| {
        let field = error.path().to_string();
        ConfigError::Parse {
            path: path.to_path_buf(),
            field,
            source: error.into_inner(),
        }
    })
}

/// Objects merge key by key; every other value replaces the base outright.
fn merge_json(base: &mut Value, overrides: Value) {
    match (base, overrides) {
        (Value::Object(base_map), Value::Object(override_map)) => {
            for (key, value) in override_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_json(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overrides) => *base = overrides,
    }
}

pub(crate) fn read_env_var(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) if value.trim().is_empty() => None,
        Ok(value) => Some(value),
        Err(env::VarError::NotPresent) => None,
        Err(error) => {
            warn!(env_var = name, error = %error, "unable to read env var; ignoring");
            None
        }
    }
}
