use ai_core::{Blackboard, EntityId, SplitMix64, TickContext};
use ai_tools::{emit as trace_emit, BehaviorLog, DebugTree, TraceEvent};

use crate::error::LoadError;
use crate::event::Event;
use crate::factory::NodeFactory;
use crate::graft::GraftManager;
use crate::node::{Node, NodeHeader};
use crate::timestamps::TimestampCollection;
use crate::variables::{SignalHandler, VariableCollection, VariableDeclarations};
use crate::xml::XmlNode;

/// Variables of the instance being ticked.
pub struct BehaviorVariablesContext<'a> {
    pub collection: &'a mut VariableCollection,
    pub declarations: &'a VariableDeclarations,
    /// Whether any variable changed since the previous tick of this instance.
    pub changed: bool,
}

/// Everything a node may touch while it is ticked or terminated.
pub struct UpdateContext<'a> {
    pub agent: EntityId,
    pub tree_name: &'a str,
    pub tick: TickContext,
    /// Manager clock in seconds.
    pub now: f64,
    pub variables: BehaviorVariablesContext<'a>,
    pub timestamps: &'a mut TimestampCollection,
    pub blackboard: &'a mut Blackboard,
    pub behavior_log: &'a mut BehaviorLog,
    pub factory: &'a mut NodeFactory,
    pub graft: &'a mut GraftManager,
    /// Signal bindings and root of the instance, for events sent by its own nodes.
    pub signals: &'a SignalHandler,
    pub root: &'a dyn Node,
    pub debug: Option<&'a mut DebugTree>,
}

impl UpdateContext<'_> {
    /// Deterministic random stream owned by `node` for the current frame.
    pub fn rng_for(&self, node: &NodeHeader) -> SplitMix64 {
        self.tick
            .rng_for_agent(self.agent, 0xB7_0000_0000 | u64::from(node.id.0))
    }

    /// Dispatches `event` to this instance right away: signal bindings, then timestamps, then
    /// the nodes active at this moment.
    pub fn send_event(&mut self, event: Event) {
        self.signals
            .process_signal(event.hash(), &mut *self.variables.collection);
        self.timestamps.handle_event(event.hash(), self.now);
        trace_emit(
            &mut *self.blackboard,
            TraceEvent::new(self.tick.tick, "bt.event")
                .with_agent(self.agent.0)
                .with_value(u64::from(event.hash().value()))
                .with_label(event.name()),
        );
        let root = self.root;
        root.send_event(&mut self.event_context(), &event);
    }

    pub fn event_context(&mut self) -> EventContext<'_> {
        EventContext {
            agent: self.agent,
            now: self.now,
            factory: &mut *self.factory,
        }
    }
}

/// Context for event delivery into active nodes.
pub struct EventContext<'a> {
    pub agent: EntityId,
    pub now: f64,
    pub factory: &'a mut NodeFactory,
}

/// Context for building nodes out of a description.
pub struct LoadContext<'a> {
    pub tree_name: &'a str,
    pub factory: &'a mut NodeFactory,
    pub variables: &'a VariableDeclarations,
    pub timestamps: &'a TimestampCollection,
}

impl<'a> LoadContext<'a> {
    pub fn new(
        tree_name: &'a str,
        factory: &'a mut NodeFactory,
        variables: &'a VariableDeclarations,
        timestamps: &'a TimestampCollection,
    ) -> Self {
        Self {
            tree_name,
            factory,
            variables,
            timestamps,
        }
    }

    /// Creates the node named by `xml.tag` and loads it. Either failure aborts the tree.
    pub fn create_node(&mut self, xml: &XmlNode) -> Result<Box<dyn Node>, LoadError> {
        let mut node = self
            .factory
            .create_node_of_type(&xml.tag, xml.line)
            .ok_or_else(|| LoadError::UnknownNodeType {
                line: xml.line,
                tag: xml.tag.clone(),
            })?;
        node.load_from_xml(xml, self)?;
        Ok(node)
    }
}
