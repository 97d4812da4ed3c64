use ai_core::{DeterministicRng, NameHash};

use crate::context::{EventContext, LoadContext, UpdateContext};
use crate::error::LoadError;
use crate::event::Event;
use crate::node::{Behavior, LoadResult, Node, NodeHeader, Status};
use crate::nodes::flow::GateData;
use crate::nodes::DecoratedChild;
use crate::timestamps::{TimestampCollection, TimestampId, Timer};
use crate::xml::XmlNode;

/// Negative durations are allowed and elapse on the first update.
fn required_seconds(xml: &XmlNode, attribute: &str) -> Result<f64, LoadError> {
    let value = xml
        .attr_f32(attribute)?
        .ok_or_else(|| LoadError::missing_attribute(xml, attribute))?;
    Ok(f64::from(value))
}

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TimerData {
    pub timer: Timer,
}

/// Fails once `duration` seconds have passed.
#[derive(Default)]
pub struct Timeout {
    header: NodeHeader,
    duration: f64,
}

impl Behavior for Timeout {
    type RuntimeData = TimerData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        self.duration = required_seconds(xml, "duration")?;
        Ok(())
    }

    fn on_initialize(&self, rt: &mut TimerData, ctx: &mut UpdateContext<'_>) {
        rt.timer = Timer::start(ctx.now, self.duration);
    }

    fn update(&self, rt: &mut TimerData, ctx: &mut UpdateContext<'_>) -> Status {
        if rt.timer.is_elapsed(ctx.now) {
            Status::Failure
        } else {
            Status::Running
        }
    }

    fn handle_event(&self, _rt: &mut TimerData, _ctx: &mut EventContext<'_>, _event: &Event) {}
}

/// Succeeds after `duration` seconds, give or take up to `variation`.
#[derive(Default)]
pub struct Wait {
    header: NodeHeader,
    duration: f64,
    variation: f64,
}

impl Behavior for Wait {
    type RuntimeData = TimerData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        self.duration = required_seconds(xml, "duration")?;
        self.variation = match xml.attr("variation") {
            Some(_) => required_seconds(xml, "variation")?,
            None => 0.0,
        };
        Ok(())
    }

    fn on_initialize(&self, rt: &mut TimerData, ctx: &mut UpdateContext<'_>) {
        let mut duration = self.duration;
        if self.variation > 0.0 {
            let mut rng = ctx.rng_for(&self.header);
            duration += rng.next_f64_range(-self.variation, self.variation);
        }
        rt.timer = Timer::start(ctx.now, duration.max(0.0));
    }

    fn update(&self, rt: &mut TimerData, ctx: &mut UpdateContext<'_>) -> Status {
        if rt.timer.is_elapsed(ctx.now) {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn handle_event(&self, _rt: &mut TimerData, _ctx: &mut EventContext<'_>, _event: &Event) {}
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WaitForEventData {
    pub received: bool,
}

/// Runs until the event `name` arrives, then returns `result` (`Success` by default).
pub struct WaitForEvent {
    header: NodeHeader,
    event: NameHash,
    result: Status,
}

impl Default for WaitForEvent {
    fn default() -> Self {
        Self {
            header: NodeHeader::default(),
            event: NameHash::default(),
            result: Status::Success,
        }
    }
}

impl Behavior for WaitForEvent {
    type RuntimeData = WaitForEventData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        self.event = NameHash::of(xml.required_attr("name")?);
        self.result = match xml.attr("result") {
            None => Status::Success,
            Some(raw) if raw.eq_ignore_ascii_case("success") => Status::Success,
            Some(raw) if raw.eq_ignore_ascii_case("failure") => Status::Failure,
            Some(raw) => return Err(LoadError::invalid_attribute(xml, "result", raw)),
        };
        Ok(())
    }

    fn update(&self, rt: &mut WaitForEventData, _ctx: &mut UpdateContext<'_>) -> Status {
        if rt.received {
            self.result
        } else {
            Status::Running
        }
    }

    fn handle_event(&self, rt: &mut WaitForEventData, _ctx: &mut EventContext<'_>, event: &Event) {
        if event.hash() == self.event {
            rt.received = true;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    MoreThan(f64),
    LessThan(f64),
}

/// "Time since timestamp `since` is more/less than N seconds".
#[derive(Debug, Clone, Copy, PartialEq)]
struct TimeCondition {
    timestamp: TimestampId,
    comparison: Comparison,
    passes_if_never_set: bool,
}

impl Default for TimeCondition {
    fn default() -> Self {
        Self {
            timestamp: NameHash::default(),
            comparison: Comparison::MoreThan(0.0),
            passes_if_never_set: false,
        }
    }
}

impl TimeCondition {
    fn load(xml: &XmlNode, ctx: &LoadContext<'_>, never_set_attribute: &str) -> Result<Self, LoadError> {
        let since = xml.required_attr("since")?;
        let timestamp = NameHash::of(since);
        if !ctx.timestamps.contains(timestamp) {
            return Err(LoadError::UnknownTimestamp {
                line: xml.line,
                name: since.to_string(),
            });
        }

        let comparison = match (xml.attr_f32("isMoreThan")?, xml.attr_f32("isLessThan")?) {
            (Some(t), None) => Comparison::MoreThan(f64::from(t)),
            (None, Some(t)) => Comparison::LessThan(f64::from(t)),
            (None, None) => return Err(LoadError::missing_attribute(xml, "isMoreThan")),
            (Some(_), Some(_)) => {
                return Err(LoadError::invalid_attribute(
                    xml,
                    "isLessThan",
                    "cannot be combined with isMoreThan",
                ))
            }
        };

        Ok(Self {
            timestamp,
            comparison,
            passes_if_never_set: xml.attr_bool(never_set_attribute)?.unwrap_or(false),
        })
    }

    fn is_satisfied(&self, timestamps: &TimestampCollection, now: f64) -> bool {
        match timestamps.elapsed_since(self.timestamp, now) {
            None => self.passes_if_never_set,
            Some(elapsed) => match self.comparison {
                Comparison::MoreThan(t) => elapsed > t,
                Comparison::LessThan(t) => elapsed < t,
            },
        }
    }
}

/// Runs its child if the time condition held when the node started; fails otherwise.
#[derive(Default)]
pub struct IfTime {
    header: NodeHeader,
    child: DecoratedChild,
    condition: TimeCondition,
}

impl Behavior for IfTime {
    type RuntimeData = GateData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.condition = TimeCondition::load(xml, ctx, "orNeverBeenSet")?;
        self.child = DecoratedChild::load(xml, ctx)?;
        Ok(())
    }

    fn on_initialize(&self, rt: &mut GateData, ctx: &mut UpdateContext<'_>) {
        rt.open = self.condition.is_satisfied(ctx.timestamps, ctx.now);
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

/// Runs until the time condition holds.
#[derive(Default)]
pub struct WaitUntilTime {
    header: NodeHeader,
    condition: TimeCondition,
}

impl Behavior for WaitUntilTime {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.condition = TimeCondition::load(xml, ctx, "succeedIfNeverBeenSet")?;
        Ok(())
    }

    fn update(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) -> Status {
        if self.condition.is_satisfied(ctx.timestamps, ctx.now) {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}

/// Succeeds or fails right away depending on the time condition.
#[derive(Default)]
pub struct AssertTime {
    header: NodeHeader,
    condition: TimeCondition,
}

impl Behavior for AssertTime {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.condition = TimeCondition::load(xml, ctx, "orNeverBeenSet")?;
        Ok(())
    }

    fn update(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) -> Status {
        if self.condition.is_satisfied(ctx.timestamps, ctx.now) {
            Status::Success
        } else {
            Status::Failure
        }
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}
