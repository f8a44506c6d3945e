use std::time::Duration;

use crate::model::{AgentId, VillageWorld};

/// Host-side hooks the loop calls around each frame. The orchestrator that
/// talks to the reaction gateway lives behind this seam.
pub trait SceneHost {
    fn load(&mut self, world: &mut VillageWorld);

    /// Called once per redraw with the wall-clock time since the previous
    /// call. Mutations to `world` are published with this frame.
    fn update(&mut self, dt: Duration, world: &mut VillageWorld);

    fn shutdown(&mut self, world: &VillageWorld);

    /// Selection changed through a click.
    fn focus_changed(&mut self, _focused: Option<AgentId>, _world: &VillageWorld) {}

    fn title(&self, _world: &VillageWorld) -> Option<String> {
        None
    }
}
