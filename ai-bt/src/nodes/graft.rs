use std::rc::Rc;

use crate::context::{EventContext, UpdateContext};
use crate::event::Event;
use crate::graft::GraftNodeHandle;
use crate::node::{Behavior, NodeHeader, Status};
use crate::template::BehaviorTreeInstance;

#[derive(Debug, Default)]
pub struct GraftData {
    /// The grafted behavior, if one was supplied.
    pub instance: Option<BehaviorTreeInstance>,
}

/// Placeholder that runs behaviors supplied at runtime through the graft manager.
///
/// It never finishes on its own: with no grafted behavior it keeps running, and a grafted
/// behavior that finishes is reported to the graft manager and dropped. A parent that needs to
/// move past a `Graft` never will, so trees place it last or alone in a state.
#[derive(Default)]
pub struct Graft {
    header: NodeHeader,
}

impl Graft {
    pub fn handle(&self) -> GraftNodeHandle {
        GraftNodeHandle {
            creator: self.header.creator,
            node: self.header.id,
        }
    }
}

impl Behavior for Graft {
    type RuntimeData = GraftData;

    crate::node_header!();

    fn on_initialize(&self, _rt: &mut GraftData, ctx: &mut UpdateContext<'_>) {
        ctx.graft.graft_node_ready(ctx.agent, self.handle());
    }

    fn update(&self, rt: &mut GraftData, ctx: &mut UpdateContext<'_>) -> Status {
        let Some(instance) = rt.instance.as_mut() else {
            return Status::Running;
        };

        let template = Rc::clone(&instance.template);
        let status = {
            let mut sub = instance.update_context(
                ctx.agent,
                ctx.tick,
                ctx.now,
                &mut *ctx.factory,
                &mut *ctx.graft,
                ctx.debug.as_deref_mut(),
            );
            template.root().tick(&mut sub)
        };

        match status {
            Status::Running => {}
            Status::Success => {
                ctx.graft.graft_behavior_complete(ctx.agent);
                rt.instance = None;
            }
            Status::Failure => {
                tracing::error!(
                    agent = %ctx.agent,
                    tree = %ctx.tree_name,
                    graft = %template.name(),
                    line = self.header.line,
                    "Graft behavior failed to execute"
                );
                ctx.graft.graft_behavior_failed(ctx.agent);
                rt.instance = None;
            }
        }
        Status::Running
    }

    fn on_terminate(&self, rt: &mut GraftData, ctx: &mut UpdateContext<'_>) {
        if let Some(mut instance) = rt.instance.take() {
            let template = Rc::clone(&instance.template);
            let mut sub = instance.update_context(
                ctx.agent,
                ctx.tick,
                ctx.now,
                &mut *ctx.factory,
                &mut *ctx.graft,
                ctx.debug.as_deref_mut(),
            );
            template.root().terminate(&mut sub);
        }
        ctx.graft.graft_node_terminated(ctx.agent);
    }

    fn handle_event(&self, rt: &mut GraftData, ctx: &mut EventContext<'_>, event: &Event) {
        if let Some(instance) = rt.instance.as_mut() {
            instance.process_event(event, ctx.now);
            let template = Rc::clone(&instance.template);
            template.root().send_event(ctx, event);
        }
    }
}
