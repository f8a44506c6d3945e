use std::time::Duration;

use tracing::{debug, info, warn};
use village_engine::model::{AgentId, VillageWorld};
use village_engine::SceneHost;

use super::config::WorldProfile;
use super::console::{parse_command, CommandSource, HostCommand, HELP_LINES};
use super::orchestrator::Orchestrator;

pub(crate) struct VillageScene {
    profile: WorldProfile,
    orchestrator: Orchestrator,
    commands: Box<dyn CommandSource>,
    pending_lines: Vec<String>,
    focused: Option<AgentId>,
}

impl VillageScene {
    pub(crate) fn new(
        profile: WorldProfile,
        orchestrator: Orchestrator,
        commands: Box<dyn CommandSource>,
    ) -> Self {
        Self {
            profile,
            orchestrator,
            commands,
            pending_lines: Vec::new(),
            focused: None,
        }
    }

    fn process_commands(&mut self, world: &mut VillageWorld) {
        self.commands.drain_pending_lines(&mut self.pending_lines);
        for line in std::mem::take(&mut self.pending_lines) {
            match parse_command(&line) {
                Ok(Some(command)) => self.apply_command(command, world),
                Ok(None) => {}
                Err(error) => {
                    warn!(reason = %error.reason, usage = error.usage, "command_rejected");
                }
            }
        }
    }

    fn apply_command(&mut self, command: HostCommand, world: &mut VillageWorld) {
        match command {
            HostCommand::Help => {
                for line in HELP_LINES {
                    info!("{line}");
                }
            }
            HostCommand::Status => self.log_status(world),
            HostCommand::GlobalEvent(description) => {
                if let Err(error) = self.orchestrator.trigger_global_event(world, &description) {
                    warn!(error = %error, "global_event_rejected");
                }
            }
            HostCommand::Chat { agent_name, text } => {
                match self.orchestrator.chat(world, &agent_name, &text) {
                    Ok(agent_id) => info!(agent = %agent_id, name = %agent_name, "chat_sent"),
                    Err(error) => warn!(error = %error, "chat_rejected"),
                }
            }
        }
    }

    fn log_status(&self, world: &VillageWorld) {
        let walking = world.agents.iter().filter(|agent| agent.is_walking()).count();
        info!(
            day = world.state.day,
            time = %world.state.clock_label(),
            weather = world.state.weather.as_str(),
            walking,
            in_flight = self.orchestrator.in_flight(),
            global_busy = self.orchestrator.is_global_busy(),
            latest_event = world.state.latest_event().unwrap_or(""),
            "village_status"
        );
    }
}

impl SceneHost for VillageScene {
    fn load(&mut self, world: &mut VillageWorld) {
        info!(
            profile = %self.profile,
            agent_count = world.agents.len(),
            building_count = world.buildings.len(),
            "village_loaded"
        );
        info!("type `help` on stdin for operator commands");
    }

    fn update(&mut self, dt: Duration, world: &mut VillageWorld) {
        self.process_commands(world);
        self.orchestrator.advance(dt, world);
        let summary = self.orchestrator.poll(world);
        if summary.applied + summary.failed > 0 {
            debug!(
                applied = summary.applied,
                failed = summary.failed,
                "reactions_applied"
            );
        }
    }

    fn shutdown(&mut self, world: &VillageWorld) {
        info!(
            day = world.state.day,
            time = %world.state.clock_label(),
            abandoned_requests = self.orchestrator.in_flight(),
            "village_shutdown"
        );
    }

    fn focus_changed(&mut self, focused: Option<AgentId>, world: &VillageWorld) {
        self.focused = focused;
        match focused.and_then(|id| world.agent(id)) {
            Some(agent) => info!(
                agent = %agent.id,
                name = %agent.name,
                emotion = agent.emotional_state.name(),
                thought = %agent.current_thought,
                reasoning = %agent.reasoning,
                destination = %agent.destination_name,
                memories = agent.memories.len(),
                "agent_focused"
            ),
            None => info!("focus_released"),
        }
    }

    fn title(&self, world: &VillageWorld) -> Option<String> {
        let focus = self
            .focused
            .and_then(|id| world.agent(id))
            .map(|agent| format!(" | {} -> {}", agent.name, agent.destination_name))
            .unwrap_or_default();
        let busy = if self.orchestrator.is_global_busy() {
            " | reshaping the world..."
        } else {
            ""
        };
        Some(format!(
            "Village ({}) | Day {} {} | {}{focus}{busy}",
            self.profile,
            world.state.day,
            world.state.clock_label(),
            world.state.weather.as_str(),
        ))
    }
}
