use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use village_engine::VillageApp;

use super::config::{self, ConfigError, GatewayTransport, VillageConfig};
use super::console::StdinCommands;
use super::gateway::{PromptGateway, ReactionGateway};
use super::http_transport::HttpTransport;
use super::orchestrator::Orchestrator;
use super::scripted::ScriptedTransport;
use super::village_scene::VillageScene;
use super::world_data;

pub(crate) fn build_app() -> Result<VillageApp, ConfigError> {
    init_tracing();
    info!("=== Village Startup ===");

    let config = config::load_config()?;
    info!(
        profile = %config.profile,
        seed = config.seed,
        camera_mode = ?config.camera.mode,
        broadcast_environment = config.orchestrator.broadcast_environment,
        "config_resolved"
    );

    let world = world_data::build_world(config.profile, config.seed);
    let orchestrator = Orchestrator::new(
        config.orchestrator.clone(),
        build_gateway(&config),
        config.seed,
    );
    let host = VillageScene::new(
        config.profile,
        orchestrator,
        Box::new(StdinCommands::spawn()),
    );

    Ok(VillageApp {
        loop_config: config.loop_config,
        motion: config.motion,
        camera: config.camera,
        render: config.render,
        world,
        host: Box::new(host),
    })
}

fn build_gateway(config: &VillageConfig) -> Arc<dyn ReactionGateway> {
    let gateway = &config.gateway;
    let scripted = || -> Arc<dyn ReactionGateway> {
        let latency = Duration::from_millis(gateway.latency_ms);
        Arc::new(PromptGateway::new(ScriptedTransport::new(config.seed, latency)))
    };

    match gateway.transport {
        GatewayTransport::Scripted => {
            info!(latency_ms = gateway.latency_ms, "gateway_scripted");
            scripted()
        }
        GatewayTransport::Http => {
            let Some(api_key) = config::read_env_var(&gateway.api_key_env) else {
                warn!(
                    env_var = gateway.api_key_env.as_str(),
                    "gateway api key not set; falling back to scripted replies"
                );
                return scripted();
            };
            let timeout = Duration::from_millis(gateway.timeout_ms);
            match HttpTransport::new(&gateway.endpoint, &gateway.model, api_key, timeout) {
                Ok(transport) => {
                    info!(
                        endpoint = gateway.endpoint.as_str(),
                        model = gateway.model.as_str(),
                        timeout_ms = gateway.timeout_ms,
                        "gateway_http"
                    );
                    Arc::new(PromptGateway::new(transport))
                }
                Err(error) => {
                    warn!(error = %error, "http gateway unavailable; falling back to scripted replies");
                    scripted()
                }
            }
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
