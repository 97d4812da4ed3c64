use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ai_core::{Blackboard, EntityId, TickContext, WorldView};
use ai_tools::{emit as trace_emit, BehaviorLog, DebugTree, TraceEvent, TraceLog, TRACE_LOG};

use crate::config::ManagerConfig;
use crate::context::EventContext;
use crate::error::{FactoryError, TreeError};
use crate::event::Event;
use crate::factory::NodeFactory;
use crate::graft::{
    GraftBehaviorListener, GraftManager, GraftModeListener, GRAFT_MODE_COMPLETE_EVENT,
    GRAFT_REQUESTED_EVENT,
};
use crate::node::{RuntimeDataId, Status};
use crate::nodes::graft::GraftData;
use crate::nodes::register_core_nodes;
use crate::source::{DirectorySource, TreeSource};
use crate::template::{BehaviorTreeInstance, BehaviorTreeTemplate};
use crate::timestamps::TimestampCollection;
use crate::variables::{VariableCollection, VariableDeclarations, VariableId};
use crate::xml::XmlNode;

/// What one [`BehaviorTreeManager::update`] call did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateStats {
    pub ticked: usize,
    /// Instances whose entity was missing, disabled or paused.
    pub skipped: usize,
    /// Agents whose root finished this update. Their trees were stopped.
    pub terminated: Vec<(EntityId, Status)>,
}

/// Owns the template cache and every agent's running tree.
pub struct BehaviorTreeManager {
    config: ManagerConfig,
    sources: Vec<Box<dyn TreeSource>>,
    factory: NodeFactory,
    graft: GraftManager,
    /// Keyed by lowercased tree name.
    templates: BTreeMap<String, Rc<BehaviorTreeTemplate>>,
    instances: BTreeMap<EntityId, BehaviorTreeInstance>,
    debug_trees: BTreeMap<EntityId, DebugTree>,
    errored: BTreeSet<EntityId>,
    clock: f64,
    last_tick: TickContext,
}

impl std::fmt::Debug for BehaviorTreeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTreeManager")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("instances", &self.instances.keys().collect::<Vec<_>>())
            .field("errored", &self.errored)
            .field("clock", &self.clock)
            .finish()
    }
}

impl BehaviorTreeManager {
    /// Manager reading trees from the configured search paths, with the core nodes registered.
    pub fn new(config: ManagerConfig) -> Self {
        let sources = config
            .search_paths
            .iter()
            .map(|path| {
                Box::new(DirectorySource::new(path.clone(), config.file_extension.clone()))
                    as Box<dyn TreeSource>
            })
            .collect();
        Self::with_sources(config, sources)
    }

    /// Manager reading trees from `sources`, tried in order.
    pub fn with_sources(config: ManagerConfig, sources: Vec<Box<dyn TreeSource>>) -> Self {
        let mut factory = NodeFactory::new();
        if let Err(err) = register_core_nodes(&mut factory) {
            tracing::error!(error = %err, "Failed to register core behavior tree nodes");
        }
        Self {
            config,
            sources,
            factory,
            graft: GraftManager::new(),
            templates: BTreeMap::new(),
            instances: BTreeMap::new(),
            debug_trees: BTreeMap::new(),
            errored: BTreeSet::new(),
            clock: 0.0,
            last_tick: TickContext::new(0, 0.0, 0),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn add_source(&mut self, source: Box<dyn TreeSource>) {
        self.sources.push(source);
    }

    pub fn factory(&self) -> &NodeFactory {
        &self.factory
    }

    /// For registering additional node kinds.
    pub fn factory_mut(&mut self) -> &mut NodeFactory {
        &mut self.factory
    }

    pub fn graft_manager(&self) -> &GraftManager {
        &self.graft
    }

    /// Seconds accumulated over every `update`.
    pub fn now(&self) -> f64 {
        self.clock
    }

    /// Loads `name` into the cache unless it is already there.
    pub fn load_tree_to_cache(&mut self, name: &str) -> Result<Rc<BehaviorTreeTemplate>, TreeError> {
        let key = name.to_ascii_lowercase();
        if let Some(template) = self.templates.get(&key) {
            return Ok(Rc::clone(template));
        }

        let xml = self.find_description(name)?;
        let template = Rc::new(self.create_template(name, &xml)?);
        tracing::debug!(tree = %name, "Cached behavior tree");
        self.templates.insert(key, Rc::clone(&template));
        Ok(template)
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.templates.contains_key(&name.to_ascii_lowercase())
    }

    pub fn cached_template_count(&self) -> usize {
        self.templates.len()
    }

    fn find_description(&self, name: &str) -> Result<XmlNode, TreeError> {
        for source in &self.sources {
            match source.load(name) {
                Ok(Some(xml)) => return Ok(xml),
                Ok(None) => {}
                Err(source) => {
                    tracing::error!(tree = %name, error = %source, "Failed to read behavior tree");
                    return Err(TreeError::Source {
                        tree: name.to_string(),
                        source,
                    });
                }
            }
        }
        tracing::error!(tree = %name, "Behavior tree not found");
        Err(TreeError::NotFound(name.to_string()))
    }

    fn create_template(&mut self, name: &str, xml: &XmlNode) -> Result<BehaviorTreeTemplate, TreeError> {
        let mut xml = xml.clone();
        xml.number_lines();
        BehaviorTreeTemplate::from_xml(name, &xml, &mut self.factory).map_err(|source| {
            tracing::error!(
                tree = %name,
                line = source.line(),
                error = %source,
                "Failed to load behavior tree"
            );
            TreeError::Load {
                tree: name.to_string(),
                source,
            }
        })
    }

    fn new_instance(&self, template: Rc<BehaviorTreeTemplate>) -> BehaviorTreeInstance {
        let mut instance = BehaviorTreeInstance::new(template, self.config.behavior_log_capacity);
        if self.config.record_trace {
            instance.blackboard.set(TRACE_LOG, TraceLog::default());
        }
        instance
    }

    fn trace(&self, agent: EntityId, tag: &'static str) -> TraceEvent {
        TraceEvent::new(self.last_tick.tick, tag).with_agent(agent.0)
    }

    /// Replaces whatever `agent` runs with a fresh instance of `tree_name`.
    pub fn start_modular_behavior_tree(&mut self, agent: EntityId, tree_name: &str) -> Result<(), TreeError> {
        self.stop_modular_behavior_tree(agent);

        let template = self.load_tree_to_cache(tree_name)?;
        let mut instance = self.new_instance(template);
        trace_emit(
            &mut instance.blackboard,
            self.trace(agent, "bt.tree.start").with_label(tree_name),
        );
        self.instances.insert(agent, instance);
        tracing::debug!(agent = %agent, tree = %tree_name, "Started behavior tree");
        Ok(())
    }

    /// Terminates the agent's root and drops its instance. Returns whether a tree was running.
    pub fn stop_modular_behavior_tree(&mut self, agent: EntityId) -> bool {
        let Some(mut instance) = self.instances.remove(&agent) else {
            return false;
        };

        let template = Rc::clone(&instance.template);
        {
            let mut ctx = instance.update_context(
                agent,
                self.last_tick,
                self.clock,
                &mut self.factory,
                &mut self.graft,
                None,
            );
            template.root().terminate(&mut ctx);
        }
        trace_emit(
            &mut instance.blackboard,
            self.trace(agent, "bt.tree.stop").with_label(template.name()),
        );
        self.debug_trees.remove(&agent);
        tracing::debug!(agent = %agent, tree = %template.name(), "Stopped behavior tree");
        true
    }

    /// Ticks every live instance once, in agent order.
    pub fn update<W>(&mut self, tick: &TickContext, world: &W) -> UpdateStats
    where
        W: WorldView<Agent = EntityId>,
    {
        self.clock += f64::from(tick.dt_seconds);
        self.last_tick = *tick;

        let mut stats = UpdateStats::default();
        let agents: Vec<EntityId> = self.instances.keys().copied().collect();
        for agent in agents {
            if !world.agent_state(agent).is_updatable() {
                stats.skipped += 1;
                continue;
            }
            let Some(status) = self.tick_instance(agent) else {
                continue;
            };
            stats.ticked += 1;
            if status.is_terminal() {
                self.on_root_terminated(agent, status);
                stats.terminated.push((agent, status));
            }
        }
        stats
    }

    fn tick_instance(&mut self, agent: EntityId) -> Option<Status> {
        let instance = self.instances.get_mut(&agent)?;
        let template = Rc::clone(&instance.template);
        let debug = if self.config.debug_execution_stack {
            let tree = self.debug_trees.entry(agent).or_default();
            tree.clear();
            Some(tree)
        } else {
            None
        };

        let mut ctx = instance.update_context(
            agent,
            self.last_tick,
            self.clock,
            &mut self.factory,
            &mut self.graft,
            debug,
        );
        Some(template.root().tick(&mut ctx))
    }

    fn on_root_terminated(&mut self, agent: EntityId, status: Status) {
        let trail = self
            .debug_trees
            .get(&agent)
            .map(DebugTree::render_trail)
            .unwrap_or_default();
        let event = self
            .trace(agent, "bt.root.terminated")
            .with_value(u64::from(status == Status::Success));
        if let Some(instance) = self.instances.get_mut(&agent) {
            tracing::error!(
                agent = %agent,
                tree = %instance.template.name(),
                status = ?status,
                trail = %trail,
                "Behavior tree root node finished; stopping the tree"
            );
            trace_emit(&mut instance.blackboard, event);
        }
        self.errored.insert(agent);
        self.stop_modular_behavior_tree(agent);
    }

    /// Feeds `event` to the agent's signal bindings and timestamps, then to its active nodes.
    ///
    /// Dropped if the agent runs no tree.
    pub fn handle_event(&mut self, agent: EntityId, event: &Event) {
        let Some(instance) = self.instances.get_mut(&agent) else {
            if self.config.log_dropped_events {
                tracing::debug!(
                    agent = %agent,
                    event = %event.name(),
                    "Dropped event for agent without behavior tree"
                );
            }
            return;
        };

        instance.process_event(event, self.clock);
        trace_emit(
            &mut instance.blackboard,
            TraceEvent::new(self.last_tick.tick, "bt.event")
                .with_agent(agent.0)
                .with_value(u64::from(event.hash().value()))
                .with_label(event.name()),
        );

        let template = Rc::clone(&instance.template);
        let mut ctx = EventContext {
            agent,
            now: self.clock,
            factory: &mut self.factory,
        };
        template.root().send_event(&mut ctx, event);
    }

    pub fn is_running(&self, agent: EntityId) -> bool {
        self.instances.contains_key(&agent)
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub fn running_tree_name(&self, agent: EntityId) -> Option<&str> {
        self.instances.get(&agent).map(|i| i.template.name())
    }

    /// Agents whose root node finished since their flag was last cleared.
    pub fn errored_agents(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.errored.iter().copied()
    }

    pub fn clear_error(&mut self, agent: EntityId) -> bool {
        self.errored.remove(&agent)
    }

    pub fn blackboard(&self, agent: EntityId) -> Option<&Blackboard> {
        self.instances.get(&agent).map(|i| &i.blackboard)
    }

    pub fn blackboard_mut(&mut self, agent: EntityId) -> Option<&mut Blackboard> {
        self.instances.get_mut(&agent).map(|i| &mut i.blackboard)
    }

    pub fn behavior_log(&self, agent: EntityId) -> Option<&BehaviorLog> {
        self.instances.get(&agent).map(|i| &i.behavior_log)
    }

    pub fn timestamps(&self, agent: EntityId) -> Option<&TimestampCollection> {
        self.instances.get(&agent).map(|i| &i.timestamps)
    }

    /// Execution trail of the agent's last tick, when `debug_execution_stack` is on.
    pub fn debug_tree(&self, agent: EntityId) -> Option<&DebugTree> {
        self.debug_trees.get(&agent)
    }

    /// Direct access to a running instance's variables, bypassing events.
    #[deprecated(note = "drive variables through events and signal bindings")]
    pub fn behavior_variable_collection_deprecated(
        &mut self,
        agent: EntityId,
    ) -> Option<&mut VariableCollection> {
        self.instances.get_mut(&agent).map(|i| &mut i.variables)
    }

    #[deprecated(note = "drive variables through events and signal bindings")]
    pub fn behavior_variable_declarations_deprecated(
        &self,
        agent: EntityId,
    ) -> Option<&VariableDeclarations> {
        self.instances.get(&agent).map(|i| i.template.declarations())
    }

    pub fn variable_name_hashes(&self, agent: EntityId) -> Vec<VariableId> {
        self.instances
            .get(&agent)
            .map(|i| i.variables.ids().collect())
            .unwrap_or_default()
    }

    pub fn variable_value(&self, agent: EntityId, variable: VariableId) -> Option<bool> {
        self.instances.get(&agent)?.variables.get(variable)
    }

    /// Returns `false` if the agent runs no tree or the variable is undeclared.
    pub fn set_variable_value(&mut self, agent: EntityId, variable: VariableId, value: bool) -> bool {
        self.instances
            .get_mut(&agent)
            .is_some_and(|i| i.variables.set(variable, value))
    }

    /// Registers a graft-mode request and tells the agent's tree about it.
    pub fn request_graft_mode(
        &mut self,
        agent: EntityId,
        listener: Box<dyn GraftModeListener>,
    ) -> Result<(), TreeError> {
        self.graft.request_graft_mode(agent, listener)?;
        if let Some(instance) = self.instances.get_mut(&agent) {
            trace_emit(
                &mut instance.blackboard,
                TraceEvent::new(self.last_tick.tick, "bt.graft.requested").with_agent(agent.0),
            );
        }
        self.handle_event(agent, &Event::new(GRAFT_REQUESTED_EVENT));
        Ok(())
    }

    pub fn cancel_graft_mode(&mut self, agent: EntityId) {
        if self.graft.end_graft_mode(agent) {
            tracing::debug!(agent = %agent, "Graft mode cancelled");
        }
        self.handle_event(agent, &Event::new(GRAFT_MODE_COMPLETE_EVENT));
    }

    pub fn graft_mode_complete(&mut self, agent: EntityId) {
        if self.graft.end_graft_mode(agent) {
            tracing::debug!(agent = %agent, "Graft mode complete");
        }
        self.handle_event(agent, &Event::new(GRAFT_MODE_COMPLETE_EVENT));
    }

    /// Builds `xml` into a behavior and hands it to the agent's active `Graft` node.
    ///
    /// A behavior already running there is terminated first.
    pub fn run_graft_behavior(
        &mut self,
        agent: EntityId,
        name: &str,
        xml: &XmlNode,
        listener: Box<dyn GraftBehaviorListener>,
    ) -> Result<(), TreeError> {
        let Some(handle) = self.graft.active_node(agent) else {
            tracing::error!(agent = %agent, behavior = %name, "No active graft node to run behavior");
            return Err(TreeError::NoActiveGraftNode(agent));
        };
        let template = Rc::new(self.create_template(name, xml)?);

        let data_id = RuntimeDataId::new(agent, handle.node);
        let Some(mut data) = self.factory.checkout::<GraftData>(handle.creator, data_id) else {
            tracing::error!(agent = %agent, behavior = %name, "Graft node is no longer active");
            return Err(TreeError::NoActiveGraftNode(agent));
        };

        if let Some(mut previous) = data.instance.take() {
            let previous_template = Rc::clone(&previous.template);
            let mut ctx = previous.update_context(
                agent,
                self.last_tick,
                self.clock,
                &mut self.factory,
                &mut self.graft,
                None,
            );
            previous_template.root().terminate(&mut ctx);
        }
        data.instance = Some(self.new_instance(template));
        self.factory.checkin(handle.creator, data_id, data);
        self.graft.register_behavior(agent, listener)?;

        if let Some(instance) = self.instances.get_mut(&agent) {
            trace_emit(
                &mut instance.blackboard,
                TraceEvent::new(self.last_tick.tick, "bt.graft.run")
                    .with_agent(agent.0)
                    .with_label(name),
            );
        }
        tracing::debug!(agent = %agent, behavior = %name, "Running graft behavior");
        Ok(())
    }

    /// Stops every tree, empties the cache and releases all pooled runtime data.
    pub fn reset(&mut self) -> Result<(), FactoryError> {
        let agents: Vec<EntityId> = self.instances.keys().copied().collect();
        for agent in agents {
            self.stop_modular_behavior_tree(agent);
        }
        self.templates.clear();
        self.graft.clear();
        self.errored.clear();
        self.debug_trees.clear();
        self.factory.trim()
    }
}
