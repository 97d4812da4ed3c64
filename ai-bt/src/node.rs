use ai_core::EntityId;
use ai_tools::DebugStatus;

use crate::context::{EventContext, LoadContext, UpdateContext};
use crate::error::LoadError;
use crate::event::Event;
use crate::xml::XmlNode;

pub type LoadResult = Result<(), LoadError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Running,
    Success,
    Failure,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        self != Status::Running
    }
}

impl From<Status> for DebugStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Running => DebugStatus::Running,
            Status::Success => DebugStatus::Success,
            Status::Failure => DebugStatus::Failure,
        }
    }
}

/// Dense per-node id handed out by the factory in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct NodeId(pub u32);

/// Index of the creator a node was made by. Selects the runtime-data pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CreatorId(pub(crate) usize);

/// Key of one runtime-data block: at most one exists per (agent, node) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RuntimeDataId {
    pub agent: EntityId,
    pub node: NodeId,
}

impl RuntimeDataId {
    pub fn new(agent: EntityId, node: NodeId) -> Self {
        Self { agent, node }
    }
}

/// Identity every node carries, filled in by the factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NodeHeader {
    pub id: NodeId,
    pub creator: CreatorId,
    pub line: u32,
}

/// Implements [`Behavior::node_header`] / [`Behavior::node_header_mut`] for a struct with a
/// `header: NodeHeader` field.
#[macro_export]
macro_rules! node_header {
    () => {
        fn node_header(&self) -> &$crate::NodeHeader {
            &self.header
        }

        fn node_header_mut(&mut self) -> &mut $crate::NodeHeader {
            &mut self.header
        }
    };
}

/// One concrete node kind.
///
/// Nodes are immutable once loaded and shared by every agent running the tree; everything that
/// changes while a node runs lives in `RuntimeData`, one block per (agent, node), which exists
/// exactly while the node is active for that agent.
pub trait Behavior: 'static {
    type RuntimeData: Default + 'static;

    fn node_header(&self) -> &NodeHeader;
    fn node_header_mut(&mut self) -> &mut NodeHeader;

    fn load_from_xml(&mut self, _xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        Ok(())
    }

    fn on_initialize(&self, _rt: &mut Self::RuntimeData, _ctx: &mut UpdateContext<'_>) {}

    fn update(&self, _rt: &mut Self::RuntimeData, _ctx: &mut UpdateContext<'_>) -> Status {
        Status::Running
    }

    fn on_terminate(&self, _rt: &mut Self::RuntimeData, _ctx: &mut UpdateContext<'_>) {}

    /// Routes an event to whatever this node is currently running.
    fn handle_event(&self, rt: &mut Self::RuntimeData, ctx: &mut EventContext<'_>, event: &Event);

    /// Visits every child node. Events reaching this node while it executes are routed to
    /// its active children through here.
    fn for_each_child(&self, _f: &mut dyn FnMut(&dyn Node)) {}

    /// Reacts to an event that arrived while this node was executing. Runs right after
    /// `update` returns; the children already received the event.
    fn handle_deferred_event(
        &self,
        _rt: &mut Self::RuntimeData,
        _ctx: &mut EventContext<'_>,
        _event: &Event,
    ) {
    }
}

/// Object-safe face of a node, driven by parents and the manager.
pub trait Node: 'static {
    fn header(&self) -> &NodeHeader;
    fn header_mut(&mut self) -> &mut NodeHeader;

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult;

    /// Activates the node if idle, then runs one update. Terminal results release the
    /// runtime data before returning.
    fn tick(&self, ctx: &mut UpdateContext<'_>) -> Status;

    /// Stops an active node. No-op when idle.
    fn terminate(&self, ctx: &mut UpdateContext<'_>);

    /// Delivers `event` if the node is active. Never activates or terminates anything.
    ///
    /// An active node that is mid-tick passes the event on to its children at once and
    /// handles it itself once its update returns.
    fn send_event(&self, ctx: &mut EventContext<'_>, event: &Event);

    fn id(&self) -> NodeId {
        self.header().id
    }
}

impl<B: Behavior> Node for B {
    fn header(&self) -> &NodeHeader {
        self.node_header()
    }

    fn header_mut(&mut self) -> &mut NodeHeader {
        self.node_header_mut()
    }

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        Behavior::load_from_xml(self, xml, ctx)
    }

    fn tick(&self, ctx: &mut UpdateContext<'_>) -> Status {
        let header = *self.node_header();
        let id = RuntimeDataId::new(ctx.agent, header.id);

        if let Some(debug) = ctx.debug.as_deref_mut() {
            debug.push(header.id.0, header.line);
        }

        let mut rt = match ctx.factory.checkout::<B::RuntimeData>(header.creator, id) {
            Some(rt) => rt,
            None => {
                let mut rt = ctx.factory.allocate::<B::RuntimeData>(header.creator, id);
                self.on_initialize(&mut rt, ctx);
                rt
            }
        };

        let status = self.update(&mut rt, ctx);
        for event in ctx.factory.take_deferred_events(header.creator, id) {
            self.handle_deferred_event(&mut rt, &mut ctx.event_context(), &event);
        }
        if status == Status::Running {
            ctx.factory.checkin(header.creator, id, rt);
        } else {
            self.on_terminate(&mut rt, ctx);
            ctx.factory.free(header.creator, id);
        }

        if let Some(debug) = ctx.debug.as_deref_mut() {
            debug.pop(status.into());
        }
        status
    }

    fn terminate(&self, ctx: &mut UpdateContext<'_>) {
        let header = *self.node_header();
        let id = RuntimeDataId::new(ctx.agent, header.id);
        if let Some(mut rt) = ctx.factory.checkout::<B::RuntimeData>(header.creator, id) {
            self.on_terminate(&mut rt, ctx);
            ctx.factory.free(header.creator, id);
        }
    }

    fn send_event(&self, ctx: &mut EventContext<'_>, event: &Event) {
        let header = *self.node_header();
        let id = RuntimeDataId::new(ctx.agent, header.id);
        if let Some(mut rt) = ctx.factory.checkout::<B::RuntimeData>(header.creator, id) {
            self.handle_event(&mut rt, ctx, event);
            ctx.factory.checkin(header.creator, id, rt);
        } else if ctx.factory.defer_event(header.creator, id, event) {
            self.for_each_child(&mut |child: &dyn Node| child.send_event(ctx, event));
        }
    }
}
