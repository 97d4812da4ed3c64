//! The core node library.

use crate::context::{EventContext, LoadContext, UpdateContext};
use crate::error::{FactoryError, LoadError};
use crate::event::Event;
use crate::factory::NodeFactory;
use crate::node::{Node, Status};
use crate::xml::XmlNode;

pub mod composite;
pub mod conditions;
pub mod flow;
pub mod graft;
pub mod time;

pub use composite::{Parallel, ParallelMode, Priority, Selector, Sequence, StateMachine};
pub use conditions::{AssertCondition, IfCondition, MonitorCondition};
pub use flow::{
    Fail, Halt, Log, Loop, LoopUntilSuccess, RandomGate, SendEvent, SendTransitionEvent,
    SuppressFailure,
};
pub use graft::Graft;
pub use time::{AssertTime, IfTime, Timeout, Wait, WaitForEvent, WaitUntilTime};

/// Largest child count addressable by an 8-bit child index.
pub const MAX_INDEXED_CHILDREN: usize = u8::MAX as usize;

/// Largest child count a `Parallel` can track in its running-children mask.
pub const MAX_PARALLEL_CHILDREN: usize = u32::BITS as usize;

/// Registers every node kind of the core library under its element name.
pub fn register_core_nodes(factory: &mut NodeFactory) -> Result<(), FactoryError> {
    factory.register::<Sequence>("Sequence")?;
    factory.register::<Selector>("Selector")?;
    factory.register::<Parallel>("Parallel")?;
    factory.register::<Priority>("Priority")?;
    factory.register::<StateMachine>("StateMachine")?;
    factory.register::<Loop>("Loop")?;
    factory.register::<LoopUntilSuccess>("LoopUntilSuccess")?;
    factory.register::<SendEvent>("SendEvent")?;
    factory.register::<SendTransitionEvent>("SendTransitionEvent")?;
    factory.register::<IfCondition>("IfCondition")?;
    factory.register::<AssertCondition>("AssertCondition")?;
    factory.register::<MonitorCondition>("MonitorCondition")?;
    factory.register::<RandomGate>("RandomGate")?;
    factory.register::<Timeout>("Timeout")?;
    factory.register::<Wait>("Wait")?;
    factory.register::<WaitForEvent>("WaitForEvent")?;
    factory.register::<IfTime>("IfTime")?;
    factory.register::<WaitUntilTime>("WaitUntilTime")?;
    factory.register::<AssertTime>("AssertTime")?;
    factory.register::<Fail>("Fail")?;
    factory.register::<SuppressFailure>("SuppressFailure")?;
    factory.register::<Halt>("Halt")?;
    factory.register::<Log>("Log")?;
    factory.register::<Graft>("Graft")?;
    Ok(())
}

/// Loads every child element of a composite, in document order.
pub fn load_children(
    xml: &XmlNode,
    ctx: &mut LoadContext<'_>,
    max: usize,
) -> Result<Vec<Box<dyn Node>>, LoadError> {
    if xml.children.is_empty() {
        return Err(LoadError::child_count(xml, "at least one"));
    }
    if xml.children.len() > max {
        return Err(LoadError::too_many_children(xml, max));
    }
    xml.children.iter().map(|c| ctx.create_node(c)).collect()
}

/// The single child of a decorator.
#[derive(Default)]
pub struct DecoratedChild(Option<Box<dyn Node>>);

impl DecoratedChild {
    pub fn load(xml: &XmlNode, ctx: &mut LoadContext<'_>) -> Result<Self, LoadError> {
        xml.expect_children(1, "exactly one")?;
        Ok(Self(Some(ctx.create_node(&xml.children[0])?)))
    }

    pub fn node(&self) -> Option<&dyn Node> {
        self.0.as_deref()
    }

    /// An unloaded decorator has nothing to run and fails.
    pub fn tick(&self, ctx: &mut UpdateContext<'_>) -> Status {
        match &self.0 {
            Some(child) => child.tick(ctx),
            None => Status::Failure,
        }
    }

    pub fn terminate(&self, ctx: &mut UpdateContext<'_>) {
        if let Some(child) = &self.0 {
            child.terminate(ctx);
        }
    }

    pub fn send_event(&self, ctx: &mut EventContext<'_>, event: &Event) {
        if let Some(child) = &self.0 {
            child.send_event(ctx, event);
        }
    }

    pub fn visit(&self, f: &mut dyn FnMut(&dyn Node)) {
        if let Some(child) = &self.0 {
            f(child.as_ref());
        }
    }
}
