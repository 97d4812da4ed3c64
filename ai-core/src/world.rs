use crate::AgentId;

/// What the world says about an agent when the behavior manager asks whether to tick it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentState {
    /// The entity no longer exists.
    Missing,
    Disabled,
    Paused,
    #[default]
    Active,
}

impl AgentState {
    pub fn is_updatable(self) -> bool {
        matches!(self, AgentState::Active)
    }
}

/// Read-only world access.
///
/// The core crate does not prescribe which queries a world must expose; subsystems
/// (nav, perception, ...) define extension traits.
pub trait WorldView {
    type Agent: AgentId;

    fn agent_state(&self, _agent: Self::Agent) -> AgentState {
        AgentState::Active
    }
}

/// World with no opinions: every agent is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenWorld;

impl WorldView for OpenWorld {
    type Agent = crate::EntityId;
}
