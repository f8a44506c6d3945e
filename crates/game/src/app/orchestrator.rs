use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;
use tracing::{debug, info, warn};
use village_engine::model::{AgentId, Building, BuildingId, VillageWorld};
use village_engine::IntervalTimer;

use super::config::OrchestratorConfig;
use super::gateway::{
    AgentReaction, AgentReactionRequest, EnvironmentChange, EnvironmentRequest, GatewayError,
    ReactionGateway,
};

const WORKER_THREAD_NAME: &str = "reaction-worker";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReactionOrigin {
    Routine,
    Chat,
    Broadcast,
}

#[derive(Debug)]
enum ReactionResult {
    Agent {
        agent_id: AgentId,
        origin: ReactionOrigin,
        fallback: Option<BuildingId>,
        outcome: Result<AgentReaction, GatewayError>,
    },
    Environment {
        outcome: Result<EnvironmentChange, GatewayError>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PollSummary {
    pub(crate) applied: usize,
    pub(crate) failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum RequestRejected {
    #[error("a global event is already being processed")]
    GlobalBusy,
    #[error("no villager named `{0}`")]
    UnknownAgent(String),
    #[error("failed to start reaction worker: {0}")]
    Spawn(String),
}

/// Decides when villagers ask the gateway what to do and folds the answers
/// back into the world.
///
/// Requests run on short-lived worker threads; results are applied only from
/// [`Orchestrator::poll`], on the loop thread. Replies for the same agent are
/// applied in arrival order, so the last one to resolve wins.
pub(crate) struct Orchestrator {
    config: OrchestratorConfig,
    gateway: Arc<dyn ReactionGateway>,
    rng: SmallRng,
    clock: IntervalTimer,
    scheduler: IntervalTimer,
    results_tx: Sender<ReactionResult>,
    results_rx: Receiver<ReactionResult>,
    in_flight: usize,
    global_busy: bool,
    pending_broadcast: usize,
}

impl Orchestrator {
    pub(crate) fn new(
        config: OrchestratorConfig,
        gateway: Arc<dyn ReactionGateway>,
        seed: u64,
    ) -> Self {
        let (results_tx, results_rx) = mpsc::channel();
        Self {
            clock: IntervalTimer::new(
                Duration::from_millis(config.clock_interval_ms),
                config.max_clock_catch_up,
            ),
            scheduler: IntervalTimer::new(Duration::from_millis(config.scheduler_interval_ms), 1),
            config,
            gateway,
            rng: SmallRng::seed_from_u64(seed),
            results_tx,
            results_rx,
            in_flight: 0,
            global_busy: false,
            pending_broadcast: 0,
        }
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub(crate) fn is_global_busy(&self) -> bool {
        self.global_busy
    }

    /// Runs the simulation clock and the routine-task scheduler for `dt` of
    /// real time.
    pub(crate) fn advance(&mut self, dt: Duration, world: &mut VillageWorld) {
        let clock = self.clock.advance(dt);
        for _ in 0..clock.fires {
            world.state.advance_clock();
        }
        if !clock.dropped_backlog.is_zero() {
            debug!(
                dropped_ms = clock.dropped_backlog.as_millis() as u64,
                "clock_backlog_dropped"
            );
        }

        if self.scheduler.advance(dt).fires > 0 {
            self.schedule_routine(world);
        }
    }

    /// Hands a routine errand to one idle villager, unless a global event is
    /// being processed or enough villagers are already walking.
    pub(crate) fn schedule_routine(&mut self, world: &VillageWorld) -> Option<AgentId> {
        if self.global_busy {
            return None;
        }
        let walking = world.agents.iter().filter(|agent| agent.is_walking()).count();
        if walking >= self.config.max_busy_agents {
            return None;
        }

        let idle = world
            .agents
            .iter()
            .filter(|agent| !agent.is_walking())
            .map(|agent| agent.id)
            .collect::<Vec<_>>();
        let agent_id = *idle.choose(&mut self.rng)?;
        let destination = world.buildings.choose(&mut self.rng)?;
        let situation = format!("Routine task: Go to {}", destination.name);
        let fallback = Some(destination.id);

        match self.dispatch_agent(world, agent_id, situation, ReactionOrigin::Routine, fallback) {
            Ok(()) => Some(agent_id),
            Err(error) => {
                warn!(agent = %agent_id, error = %error, "routine_task_not_scheduled");
                None
            }
        }
    }

    /// Direct message to one villager, addressed by name.
    pub(crate) fn chat(
        &mut self,
        world: &VillageWorld,
        name: &str,
        text: &str,
    ) -> Result<AgentId, RequestRejected> {
        let agent_id = world
            .agent_by_name(name.trim())
            .map(|agent| agent.id)
            .ok_or_else(|| RequestRejected::UnknownAgent(name.trim().to_string()))?;
        let fallback = self.random_building(world);
        let situation = format!("Someone tells you: \"{}\"", text.trim());
        self.dispatch_agent(world, agent_id, situation, ReactionOrigin::Chat, fallback)?;
        Ok(agent_id)
    }

    /// Asks the gateway to change the environment. Only one global event is
    /// processed at a time; routine scheduling pauses until it resolves.
    pub(crate) fn trigger_global_event(
        &mut self,
        world: &VillageWorld,
        description: &str,
    ) -> Result<(), RequestRejected> {
        if self.global_busy {
            return Err(RequestRejected::GlobalBusy);
        }

        let request = EnvironmentRequest::new(&world.state, &world.buildings, description.trim());
        let gateway = Arc::clone(&self.gateway);
        let results_tx = self.results_tx.clone();
        spawn_worker(move || {
            let outcome = gateway.request_environment_change(&request);
            send_result(&results_tx, ReactionResult::Environment { outcome });
        })?;

        self.in_flight += 1;
        self.global_busy = true;
        info!(description = description.trim(), "global_event_requested");
        Ok(())
    }

    /// Applies every reply that has arrived since the last poll.
    pub(crate) fn poll(&mut self, world: &mut VillageWorld) -> PollSummary {
        let mut summary = PollSummary::default();
        loop {
            let result = match self.results_rx.try_recv() {
                Ok(result) => result,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            self.in_flight = self.in_flight.saturating_sub(1);

            let applied = match result {
                ReactionResult::Agent {
                    agent_id,
                    origin,
                    fallback,
                    outcome,
                } => self.apply_agent_outcome(world, agent_id, origin, fallback, outcome),
                ReactionResult::Environment { outcome } => {
                    self.apply_environment_outcome(world, outcome)
                }
            };
            if applied {
                summary.applied += 1;
            } else {
                summary.failed += 1;
            }
        }
        summary
    }

    fn apply_agent_outcome(
        &mut self,
        world: &mut VillageWorld,
        agent_id: AgentId,
        origin: ReactionOrigin,
        fallback: Option<BuildingId>,
        outcome: Result<AgentReaction, GatewayError>,
    ) -> bool {
        if origin == ReactionOrigin::Broadcast {
            self.finish_broadcast_reply();
        }
        match outcome {
            Ok(reaction) => {
                apply_reaction(world, agent_id, fallback, reaction, self.config.memory_capacity)
            }
            // Already logged at the gateway; the agent keeps its state.
            Err(_) => false,
        }
    }

    fn apply_environment_outcome(
        &mut self,
        world: &mut VillageWorld,
        outcome: Result<EnvironmentChange, GatewayError>,
    ) -> bool {
        let change = match outcome {
            Ok(change) => change,
            Err(_) => {
                self.global_busy = false;
                return false;
            }
        };

        world.state.weather = change.weather;
        for update in &change.building_updates {
            match world.building_mut(update.building_id) {
                Some(building) => building.state = update.state,
                None => debug!(building = update.building_id.0, "building_update_unknown"),
            }
        }
        world
            .state
            .push_event(change.event_log.clone(), self.config.event_log_capacity);
        info!(
            weather = change.weather.as_str(),
            building_updates = change.building_updates.len(),
            event = %change.event_log,
            "environment_changed"
        );

        if self.config.broadcast_environment {
            self.broadcast(world, &change.event_log);
        }
        if self.pending_broadcast == 0 {
            self.global_busy = false;
        }
        true
    }

    fn broadcast(&mut self, world: &VillageWorld, event_log: &str) {
        let agent_ids = world.agents.iter().map(|agent| agent.id).collect::<Vec<_>>();
        for agent_id in agent_ids {
            let fallback = self.random_building(world);
            match self.dispatch_agent(
                world,
                agent_id,
                event_log.to_string(),
                ReactionOrigin::Broadcast,
                fallback,
            ) {
                Ok(()) => self.pending_broadcast += 1,
                Err(error) => warn!(agent = %agent_id, error = %error, "broadcast_not_sent"),
            }
        }
        debug!(recipients = self.pending_broadcast, "broadcast_started");
    }

    fn finish_broadcast_reply(&mut self) {
        self.pending_broadcast = self.pending_broadcast.saturating_sub(1);
        if self.pending_broadcast == 0 && self.global_busy {
            self.global_busy = false;
            info!("broadcast_complete");
        }
    }

    fn random_building(&mut self, world: &VillageWorld) -> Option<BuildingId> {
        world
            .buildings
            .choose(&mut self.rng)
            .map(|building| building.id)
    }

    fn dispatch_agent(
        &mut self,
        world: &VillageWorld,
        agent_id: AgentId,
        situation: String,
        origin: ReactionOrigin,
        fallback: Option<BuildingId>,
    ) -> Result<(), RequestRejected> {
        let agent = world
            .agent(agent_id)
            .ok_or_else(|| RequestRejected::UnknownAgent(agent_id.to_string()))?;
        let request = AgentReactionRequest::new(agent, &world.state, &world.buildings, situation);
        let gateway = Arc::clone(&self.gateway);
        let results_tx = self.results_tx.clone();
        spawn_worker(move || {
            let outcome = gateway.request_agent_reaction(&request);
            send_result(
                &results_tx,
                ReactionResult::Agent {
                    agent_id: request.agent_id,
                    origin,
                    fallback,
                    outcome,
                },
            );
        })?;

        self.in_flight += 1;
        debug!(agent = %agent_id, ?origin, "agent_reaction_requested");
        Ok(())
    }
}

/// Folds one reaction into the agent. The destination name is resolved to a
/// building center; an unknown name falls back to `fallback`. Returns false
/// when the agent no longer exists.
pub(crate) fn apply_reaction(
    world: &mut VillageWorld,
    agent_id: AgentId,
    fallback: Option<BuildingId>,
    reaction: AgentReaction,
    memory_capacity: usize,
) -> bool {
    let resolved = match world.building_by_name(&reaction.destination) {
        Some(building) => Some(building),
        None => {
            let fallback_building = fallback.and_then(|id| world.building(id));
            debug!(
                agent = %agent_id,
                destination = %reaction.destination,
                fallback = fallback_building.map(|building| building.name.as_str()),
                "destination_fallback"
            );
            fallback_building
        }
    };
    let target = resolved.map(Building::center);
    let destination_name = resolved
        .map(|building| building.name.clone())
        .unwrap_or(reaction.destination);

    let Some(agent) = world.agent_mut(agent_id) else {
        debug!(agent = %agent_id, "reaction_for_unknown_agent");
        return false;
    };
    agent.emotional_state = reaction.emotional_state;
    agent.current_thought = reaction.current_thought;
    agent.reasoning = reaction.reasoning;
    agent.destination_name = destination_name;
    if target.is_some() {
        agent.target = target;
    }
    if let Some(memory) = reaction
        .memory_update
        .filter(|memory| !memory.trim().is_empty())
    {
        agent.remember(memory, memory_capacity);
    }
    true
}

fn spawn_worker<F>(work: F) -> Result<(), RequestRejected>
where
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name(WORKER_THREAD_NAME.to_string())
        .spawn(work)
        .map(|_| ())
        .map_err(|error| RequestRejected::Spawn(error.to_string()))
}

fn send_result(results_tx: &Sender<ReactionResult>, result: ReactionResult) {
    if results_tx.send(result).is_err() {
        debug!("reaction_result_dropped");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::app::config::WorldProfile;
    use crate::app::gateway::BuildingUpdate;
    use crate::app::world_data::build_world;
    use village_engine::model::{BuildingState, Emotion, Vec2, Weather};

    const ROUTINE_PREFIX: &str = "Routine task: Go to ";

    struct FakeGateway;

    impl ReactionGateway for FakeGateway {
        fn request_agent_reaction(
            &self,
            request: &AgentReactionRequest,
        ) -> Result<AgentReaction, GatewayError> {
            if request.situation.contains("fail") {
                return Err(GatewayError::Transport("offline".to_string()));
            }
            let destination = request
                .situation
                .strip_prefix(ROUTINE_PREFIX)
                .unwrap_or("Market Hall")
                .to_string();
            Ok(AgentReaction {
                emotional_state: Emotion::Happy,
                current_thought: format!("re: {}", request.situation),
                reasoning: "test".to_string(),
                destination,
                memory_update: Some(request.situation.clone()),
            })
        }

        fn request_environment_change(
            &self,
            request: &EnvironmentRequest,
        ) -> Result<EnvironmentChange, GatewayError> {
            if request.situation.contains("fail") {
                return Err(GatewayError::Transport("offline".to_string()));
            }
            Ok(EnvironmentChange {
                weather: Weather::Rainy,
                building_updates: vec![
                    BuildingUpdate {
                        building_id: BuildingId(102),
                        state: BuildingState::Festive,
                    },
                    BuildingUpdate {
                        building_id: BuildingId(9_999),
                        state: BuildingState::Burning,
                    },
                ],
                event_log: request.situation.clone(),
            })
        }
    }

    fn orchestrator(config: OrchestratorConfig) -> Orchestrator {
        Orchestrator::new(config, Arc::new(FakeGateway), 11)
    }

    fn world() -> VillageWorld {
        build_world(WorldProfile::Compact, 4)
    }

    fn drain(orchestrator: &mut Orchestrator, world: &mut VillageWorld) -> PollSummary {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut total = PollSummary::default();
        while orchestrator.in_flight() > 0 && Instant::now() < deadline {
            let summary = orchestrator.poll(world);
            total.applied += summary.applied;
            total.failed += summary.failed;
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(orchestrator.in_flight(), 0, "replies did not arrive in time");
        total
    }

    fn reaction(destination: &str, thought: &str) -> AgentReaction {
        AgentReaction {
            emotional_state: Emotion::Thinking,
            current_thought: thought.to_string(),
            reasoning: "because".to_string(),
            destination: destination.to_string(),
            memory_update: None,
        }
    }

    #[test]
    fn clock_advances_one_minute_per_interval() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let mut world = world();
        orchestrator.advance(Duration::from_millis(2_500), &mut world);
        assert_eq!(world.state.time, 802);
        orchestrator.advance(Duration::from_millis(500), &mut world);
        assert_eq!(world.state.time, 803);
    }

    #[test]
    fn clock_drops_backlog_after_long_stall() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let mut world = world();
        orchestrator.advance(Duration::from_secs(60), &mut world);
        assert_eq!(world.state.time, 805);
    }

    #[test]
    fn scheduler_fires_on_interval_and_sends_agent_to_named_building() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let mut world = world();
        orchestrator.advance(Duration::from_millis(3_999), &mut world);
        assert_eq!(orchestrator.in_flight(), 0);

        orchestrator.advance(Duration::from_millis(1), &mut world);
        assert_eq!(orchestrator.in_flight(), 1);
        let summary = drain(&mut orchestrator, &mut world);
        assert_eq!(summary, PollSummary { applied: 1, failed: 0 });

        let walker = world
            .agents
            .iter()
            .find(|agent| agent.is_walking())
            .expect("one agent got an errand");
        let building = world
            .building_by_name(&walker.destination_name)
            .expect("destination exists");
        assert_eq!(walker.target, Some(building.center()));
        assert_eq!(walker.emotional_state, Emotion::Happy);
        assert_eq!(walker.memories.len(), 1);
    }

    #[test]
    fn scheduler_waits_while_enough_agents_walk() {
        let mut orchestrator = orchestrator(OrchestratorConfig {
            max_busy_agents: 2,
            ..OrchestratorConfig::default()
        });
        let mut world = world();
        for agent in world.agents_mut().iter_mut().take(2) {
            agent.target = Some(Vec2::new(10.0, 10.0));
        }
        assert_eq!(orchestrator.schedule_routine(&world), None);

        world.agents_mut()[0].target = None;
        let chosen = orchestrator.schedule_routine(&world).expect("scheduled");
        assert!(!world.agent(chosen).expect("agent").is_walking());
        drain(&mut orchestrator, &mut world);
    }

    #[test]
    fn unknown_destination_falls_back_to_chosen_building() {
        let mut world = world();
        let applied = apply_reaction(
            &mut world,
            AgentId(3),
            Some(BuildingId(104)),
            reaction("The Moon", "Far away"),
            10,
        );
        assert!(applied);

        let library = world.building(BuildingId(104)).expect("library").clone();
        let agent = world.agent(AgentId(3)).expect("agent");
        assert_eq!(agent.target, Some(library.center()));
        assert_eq!(agent.destination_name, library.name);
        assert_eq!(agent.current_thought, "Far away");
    }

    #[test]
    fn destination_lookup_ignores_case() {
        let mut world = world();
        apply_reaction(&mut world, AgentId(0), None, reaction("market hall", "Shop"), 10);
        let hall = world.building(BuildingId(102)).expect("hall").center();
        assert_eq!(world.agent(AgentId(0)).expect("agent").target, Some(hall));
    }

    #[test]
    fn later_reply_overwrites_earlier_one() {
        let mut world = world();
        apply_reaction(&mut world, AgentId(5), None, reaction("Market Hall", "first"), 10);
        apply_reaction(&mut world, AgentId(5), None, reaction("Lily Gym", "second"), 10);

        let gym = world.building_by_name("Lily Gym").expect("gym").center();
        let agent = world.agent(AgentId(5)).expect("agent");
        assert_eq!(agent.current_thought, "second");
        assert_eq!(agent.target, Some(gym));
    }

    #[test]
    fn memories_stay_bounded() {
        let mut world = world();
        for index in 0..6 {
            let mut update = reaction("Market Hall", "busy");
            update.memory_update = Some(format!("memory {index}"));
            apply_reaction(&mut world, AgentId(1), None, update, 3);
        }
        let agent = world.agent(AgentId(1)).expect("agent");
        assert_eq!(agent.memories, vec!["memory 3", "memory 4", "memory 5"]);
    }

    #[test]
    fn reaction_for_missing_agent_is_ignored() {
        let mut world = world();
        assert!(!apply_reaction(
            &mut world,
            AgentId(404),
            None,
            reaction("Market Hall", "ghost"),
            10
        ));
    }

    #[test]
    fn failed_reaction_leaves_agent_unchanged() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let mut world = world();
        let before = world.agent_by_name("Nora").cloned().expect("nora");

        orchestrator
            .chat(&world, "nora", "please fail")
            .expect("chat sent");
        let summary = drain(&mut orchestrator, &mut world);

        assert_eq!(summary, PollSummary { applied: 0, failed: 1 });
        assert_eq!(world.agent_by_name("Nora"), Some(&before));
    }

    #[test]
    fn chat_to_unknown_villager_is_rejected() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let world = world();
        assert_eq!(
            orchestrator.chat(&world, "Zed", "hello"),
            Err(RequestRejected::UnknownAgent("Zed".to_string()))
        );
        assert_eq!(orchestrator.in_flight(), 0);
    }

    #[test]
    fn global_event_updates_world_and_blocks_until_resolved() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let mut world = world();

        orchestrator
            .trigger_global_event(&world, "A parade starts")
            .expect("event sent");
        assert!(orchestrator.is_global_busy());
        assert_eq!(
            orchestrator.trigger_global_event(&world, "second"),
            Err(RequestRejected::GlobalBusy)
        );
        assert_eq!(orchestrator.schedule_routine(&world), None);

        drain(&mut orchestrator, &mut world);
        assert!(!orchestrator.is_global_busy());
        assert_eq!(world.state.weather, Weather::Rainy);
        assert_eq!(
            world.building(BuildingId(102)).map(|building| building.state),
            Some(BuildingState::Festive)
        );
        assert_eq!(world.state.latest_event(), Some("A parade starts"));
    }

    #[test]
    fn event_log_keeps_five_most_recent() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let mut world = world();
        for index in 0..7 {
            orchestrator
                .trigger_global_event(&world, &format!("event {index}"))
                .expect("event sent");
            drain(&mut orchestrator, &mut world);
            assert!(world.state.events.len() <= 5);
            assert_eq!(
                world.state.latest_event(),
                Some(format!("event {index}").as_str())
            );
        }
        assert_eq!(world.state.events.len(), 5);
    }

    #[test]
    fn failed_global_event_clears_busy_flag() {
        let mut orchestrator = orchestrator(OrchestratorConfig::default());
        let mut world = world();
        let weather = world.state.weather;
        orchestrator
            .trigger_global_event(&world, "fail loudly")
            .expect("event sent");
        drain(&mut orchestrator, &mut world);
        assert!(!orchestrator.is_global_busy());
        assert_eq!(world.state.weather, weather);
    }

    #[test]
    fn broadcast_reaches_every_agent_before_clearing_busy() {
        let mut orchestrator = orchestrator(OrchestratorConfig {
            broadcast_environment: true,
            ..OrchestratorConfig::default()
        });
        let mut world = world();
        orchestrator
            .trigger_global_event(&world, "Fireworks tonight")
            .expect("event sent");

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut environment_applied = false;
        while !environment_applied && Instant::now() < deadline {
            orchestrator.poll(&mut world);
            environment_applied = world.state.latest_event() == Some("Fireworks tonight");
            thread::sleep(Duration::from_millis(2));
        }
        assert!(environment_applied);

        drain(&mut orchestrator, &mut world);
        assert!(!orchestrator.is_global_busy());
        assert!(world
            .agents
            .iter()
            .all(|agent| agent.memories.iter().any(|memory| memory == "Fireworks tonight")));
    }
}
