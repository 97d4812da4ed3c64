use ai_core::DeterministicRng;

use crate::context::{EventContext, LoadContext, UpdateContext};
use crate::error::LoadError;
use crate::event::Event;
use crate::node::{Behavior, LoadResult, Node, NodeHeader, Status};
use crate::nodes::DecoratedChild;
use crate::xml::XmlNode;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopData {
    pub completed: u32,
    pub child_was_running: bool,
}

/// Repeats its child until it fails, or until it succeeded `count` times (0 = forever).
#[derive(Default)]
pub struct Loop {
    header: NodeHeader,
    child: DecoratedChild,
    count: u32,
}

impl Behavior for Loop {
    type RuntimeData = LoopData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.count = xml.attr_u32("count")?.unwrap_or(0);
        self.child = DecoratedChild::load(xml, ctx)?;
        Ok(())
    }

    fn update(&self, rt: &mut LoopData, ctx: &mut UpdateContext<'_>) -> Status {
        let mut status = self.child.tick(ctx);

        if status == Status::Success {
            if self.count > 0 {
                if rt.completed + 1 >= self.count {
                    return Status::Success;
                }
                rt.completed += 1;
            }
            // Restart right away so no event slips between finishing and restarting.
            if rt.child_was_running {
                status = self.child.tick(ctx);
            }
        }

        rt.child_was_running = status == Status::Running;

        if status == Status::Failure {
            Status::Failure
        } else {
            Status::Running
        }
    }

    fn on_terminate(&self, _rt: &mut LoopData, ctx: &mut UpdateContext<'_>) {
        self.child.terminate(ctx);
    }

    fn handle_event(&self, _rt: &mut LoopData, ctx: &mut EventContext<'_>, event: &Event) {
        self.child.send_event(ctx, event);
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        self.child.visit(f);
    }
}

/// Repeats its child until it succeeds, or until it failed `attemptCount` times (0 = forever).
#[derive(Default)]
pub struct LoopUntilSuccess {
    header: NodeHeader,
    child: DecoratedChild,
    attempts: u32,
}

impl Behavior for LoopUntilSuccess {
    type RuntimeData = LoopData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.attempts = xml.attr_u32("attemptCount")?.unwrap_or(0);
        self.child = DecoratedChild::load(xml, ctx)?;
        Ok(())
    }

    fn update(&self, rt: &mut LoopData, ctx: &mut UpdateContext<'_>) -> Status {
        let mut status = self.child.tick(ctx);

        if status == Status::Failure {
            if self.attempts > 0 {
                if rt.completed + 1 >= self.attempts {
                    return Status::Failure;
                }
                rt.completed += 1;
            }
            if rt.child_was_running {
                status = self.child.tick(ctx);
            }
        }

        rt.child_was_running = status == Status::Running;

        if status == Status::Success {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn on_terminate(&self, _rt: &mut LoopData, ctx: &mut UpdateContext<'_>) {
        self.child.terminate(ctx);
    }

    fn handle_event(&self, _rt: &mut LoopData, ctx: &mut EventContext<'_>, event: &Event) {
        self.child.send_event(ctx, event);
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        self.child.visit(f);
    }
}

/// Sends `name` to its own agent when it starts, then succeeds.
#[derive(Default)]
pub struct SendEvent {
    header: NodeHeader,
    event: String,
}

impl Behavior for SendEvent {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        self.event = xml.required_attr("name")?.to_string();
        Ok(())
    }

    fn on_initialize(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) {
        ctx.send_event(Event::new(self.event.clone()));
    }

    fn update(&self, _rt: &mut (), _ctx: &mut UpdateContext<'_>) -> Status {
        Status::Success
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}

/// Sends `name` when it starts and then runs forever. Meant to drive state transitions.
#[derive(Default)]
pub struct SendTransitionEvent {
    header: NodeHeader,
    event: String,
}

impl Behavior for SendTransitionEvent {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        self.event = xml.required_attr("name")?.to_string();
        Ok(())
    }

    fn on_initialize(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) {
        ctx.send_event(Event::new(self.event.clone()));
    }

    fn update(&self, _rt: &mut (), _ctx: &mut UpdateContext<'_>) -> Status {
        Status::Running
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}

/// A roll equal to the chance still opens.
fn gate_opens(roll: f64, chance: f32) -> bool {
    roll <= f64::from(chance)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateData {
    pub open: bool,
}

/// Runs its child with probability `opensWithChance`, rolled once per activation.
#[derive(Default)]
pub struct RandomGate {
    header: NodeHeader,
    child: DecoratedChild,
    chance: f32,
}

impl Behavior for RandomGate {
    type RuntimeData = GateData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        let chance = xml
            .attr_f32("opensWithChance")?
            .ok_or_else(|| LoadError::missing_attribute(xml, "opensWithChance"))?;
        self.chance = chance.clamp(0.0, 1.0);
        self.child = DecoratedChild::load(xml, ctx)?;
        Ok(())
    }

    fn on_initialize(&self, rt: &mut GateData, ctx: &mut UpdateContext<'_>) {
        let mut rng = ctx.rng_for(&self.header);
        rt.open = gate_opens(rng.next_f64_unit(), self.chance);
    }

    fn update(&self, rt: &mut GateData, ctx: &mut UpdateContext<'_>) -> Status {
        if rt.open {
            self.child.tick(ctx)
        } else {
            Status::Failure
        }
    }

    fn on_terminate(&self, _rt: &mut GateData, ctx: &mut UpdateContext<'_>) {
        self.child.terminate(ctx);
    }

    fn handle_event(&self, _rt: &mut GateData, ctx: &mut EventContext<'_>, event: &Event) {
        self.child.send_event(ctx, event);
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        self.child.visit(f);
    }
}

/// Fails immediately.
#[derive(Default)]
pub struct Fail {
    header: NodeHeader,
}

impl Behavior for Fail {
    type RuntimeData = ();

    crate::node_header!();

    fn update(&self, _rt: &mut (), _ctx: &mut UpdateContext<'_>) -> Status {
        Status::Failure
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}

/// Turns a finished child into success.
#[derive(Default)]
pub struct SuppressFailure {
    header: NodeHeader,
    child: DecoratedChild,
}

impl Behavior for SuppressFailure {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.child = DecoratedChild::load(xml, ctx)?;
        Ok(())
    }

    fn update(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) -> Status {
        match self.child.tick(ctx) {
            Status::Running => Status::Running,
            Status::Success | Status::Failure => Status::Success,
        }
    }

    fn on_terminate(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) {
        self.child.terminate(ctx);
    }

    fn handle_event(&self, _rt: &mut (), ctx: &mut EventContext<'_>, event: &Event) {
        self.child.send_event(ctx, event);
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        self.child.visit(f);
    }
}

/// Runs forever.
#[derive(Default)]
pub struct Halt {
    header: NodeHeader,
}

impl Behavior for Halt {
    type RuntimeData = ();

    crate::node_header!();

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}

/// Writes `message` to the log and the instance's behavior log, then succeeds.
#[derive(Default)]
pub struct Log {
    header: NodeHeader,
    message: String,
}

impl Behavior for Log {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        self.message = xml.required_attr("message")?.to_string();
        Ok(())
    }

    fn update(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) -> Status {
        tracing::info!(
            agent = %ctx.agent,
            tree = %ctx.tree_name,
            line = self.header.line,
            message = %self.message,
            "Behavior log"
        );
        ctx.behavior_log.add_message(self.message.as_str());
        Status::Success
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}

#[cfg(test)]
mod tests {
    use super::gate_opens;

    #[test]
    fn gate_opens_up_to_and_including_the_chance() {
        assert!(gate_opens(0.25, 0.25));
        assert!(gate_opens(0.0, 0.0));
        assert!(!gate_opens(0.5, 0.25));
        assert!(gate_opens(0.999, 1.0));
    }
}
