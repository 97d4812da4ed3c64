//! Broker between gameplay code that wants to take over an agent's tree and the `Graft` node
//! that hosts the substituted behavior.

use std::collections::BTreeMap;

use ai_core::EntityId;

use crate::error::TreeError;
use crate::node::{CreatorId, NodeId};

/// Sent to an agent's tree when graft mode is requested for it.
pub const GRAFT_REQUESTED_EVENT: &str = "OnGraftRequested";
/// Sent to an agent's tree when graft mode is cancelled or completed.
pub const GRAFT_MODE_COMPLETE_EVENT: &str = "OnGraftModeComplete";

/// Notified about the lifetime of a graft-mode request.
pub trait GraftModeListener {
    /// A `Graft` node became active; [`crate::BehaviorTreeManager::run_graft_behavior`] can
    /// now be called.
    fn on_graft_node_ready(&mut self, agent: EntityId);

    /// The `Graft` node stopped before the request was completed or cancelled.
    fn on_graft_mode_interrupted(&mut self, agent: EntityId);
}

/// Notified about the outcome of one grafted behavior.
pub trait GraftBehaviorListener {
    fn on_graft_behavior_complete(&mut self, agent: EntityId);

    fn on_graft_behavior_failed(&mut self, _agent: EntityId) {}
}

/// Locates the runtime data of an active `Graft` node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraftNodeHandle {
    pub creator: CreatorId,
    pub node: NodeId,
}

/// Per-agent graft bookkeeping: at most one mode request, one behavior request and one
/// active graft node each.
#[derive(Default)]
pub struct GraftManager {
    mode_requests: BTreeMap<EntityId, Box<dyn GraftModeListener>>,
    behavior_requests: BTreeMap<EntityId, Box<dyn GraftBehaviorListener>>,
    active_nodes: BTreeMap<EntityId, GraftNodeHandle>,
}

impl std::fmt::Debug for GraftManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraftManager")
            .field("mode_requests", &self.mode_requests.keys().collect::<Vec<_>>())
            .field(
                "behavior_requests",
                &self.behavior_requests.keys().collect::<Vec<_>>(),
            )
            .field("active_nodes", &self.active_nodes)
            .finish()
    }
}

impl GraftManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_graft_mode(
        &mut self,
        agent: EntityId,
        listener: Box<dyn GraftModeListener>,
    ) -> Result<(), TreeError> {
        if self.mode_requests.contains_key(&agent) {
            tracing::error!(agent = %agent, "Graft mode already requested");
            return Err(TreeError::GraftModeAlreadyRequested(agent));
        }
        self.mode_requests.insert(agent, listener);
        Ok(())
    }

    /// Drops the agent's mode request. Returns whether one existed.
    pub fn end_graft_mode(&mut self, agent: EntityId) -> bool {
        self.behavior_requests.remove(&agent);
        self.mode_requests.remove(&agent).is_some()
    }

    pub fn has_graft_mode_request(&self, agent: EntityId) -> bool {
        self.mode_requests.contains_key(&agent)
    }

    pub fn active_node(&self, agent: EntityId) -> Option<GraftNodeHandle> {
        self.active_nodes.get(&agent).copied()
    }

    /// Stores the listener for the behavior about to run. Requires an active graft node.
    pub fn register_behavior(
        &mut self,
        agent: EntityId,
        listener: Box<dyn GraftBehaviorListener>,
    ) -> Result<GraftNodeHandle, TreeError> {
        let Some(handle) = self.active_node(agent) else {
            tracing::error!(agent = %agent, "Graft behavior requested without an active graft node");
            return Err(TreeError::NoActiveGraftNode(agent));
        };
        self.behavior_requests.insert(agent, listener);
        Ok(handle)
    }

    pub fn graft_node_ready(&mut self, agent: EntityId, handle: GraftNodeHandle) {
        self.active_nodes.insert(agent, handle);
        if let Some(listener) = self.mode_requests.get_mut(&agent) {
            listener.on_graft_node_ready(agent);
        }
    }

    /// The graft node stopped: the requester is told and every record for the agent goes.
    pub fn graft_node_terminated(&mut self, agent: EntityId) {
        if let Some(mut listener) = self.mode_requests.remove(&agent) {
            listener.on_graft_mode_interrupted(agent);
        }
        self.behavior_requests.remove(&agent);
        self.active_nodes.remove(&agent);
    }

    pub fn graft_behavior_complete(&mut self, agent: EntityId) {
        if let Some(mut listener) = self.behavior_requests.remove(&agent) {
            listener.on_graft_behavior_complete(agent);
        }
    }

    pub fn graft_behavior_failed(&mut self, agent: EntityId) {
        if let Some(mut listener) = self.behavior_requests.remove(&agent) {
            listener.on_graft_behavior_failed(agent);
        }
    }

    pub fn clear(&mut self) {
        self.mode_requests.clear();
        self.behavior_requests.clear();
        self.active_nodes.clear();
    }
}
