use crate::context::{EventContext, LoadContext, UpdateContext};
use crate::event::Event;
use crate::node::{Behavior, LoadResult, Node, NodeHeader, Status};
use crate::nodes::flow::GateData;
use crate::nodes::DecoratedChild;
use crate::variables::Expression;
use crate::xml::XmlNode;

fn load_condition(xml: &XmlNode, ctx: &LoadContext<'_>) -> Result<Expression, crate::LoadError> {
    let text = xml.required_attr("condition")?;
    Expression::load(text, ctx.variables, xml)
}

/// Runs its child if `condition` held when the node started; fails otherwise.
///
/// The condition is not re-evaluated while the node runs.
pub struct IfCondition {
    header: NodeHeader,
    child: DecoratedChild,
    condition: Expression,
    expected: bool,
}

impl Default for IfCondition {
    fn default() -> Self {
        Self {
            header: NodeHeader::default(),
            child: DecoratedChild::default(),
            condition: Expression::constant(false),
            expected: true,
        }
    }
}

impl Behavior for IfCondition {
    type RuntimeData = GateData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.condition = load_condition(xml, ctx)?;
        if let Some(expected) = xml.attr_bool("equalTo")? {
            tracing::warn!(
                tree = %ctx.tree_name,
                line = xml.line,
                "IfCondition 'equalTo' is deprecated, negate the condition instead"
            );
            self.expected = expected;
        }
        self.child = DecoratedChild::load(xml, ctx)?;
        Ok(())
    }

    fn on_initialize(&self, rt: &mut GateData, ctx: &mut UpdateContext<'_>) {
        rt.open = self.condition.evaluate(ctx.variables.collection) == self.expected;
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

/// Succeeds or fails right away depending on `condition`.
pub struct AssertCondition {
    header: NodeHeader,
    condition: Expression,
}

impl Default for AssertCondition {
    fn default() -> Self {
        Self {
            header: NodeHeader::default(),
            condition: Expression::constant(false),
        }
    }
}

impl Behavior for AssertCondition {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.condition = load_condition(xml, ctx)?;
        Ok(())
    }

    fn update(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) -> Status {
        if self.condition.evaluate(ctx.variables.collection) {
            Status::Success
        } else {
            Status::Failure
        }
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}

/// Runs until `condition` becomes true.
pub struct MonitorCondition {
    header: NodeHeader,
    condition: Expression,
}

impl Default for MonitorCondition {
    fn default() -> Self {
        Self {
            header: NodeHeader::default(),
            condition: Expression::constant(false),
        }
    }
}

impl Behavior for MonitorCondition {
    type RuntimeData = ();

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.condition = load_condition(xml, ctx)?;
        Ok(())
    }

    fn update(&self, _rt: &mut (), ctx: &mut UpdateContext<'_>) -> Status {
        if self.condition.evaluate(ctx.variables.collection) {
            Status::Success
        } else {
            Status::Running
        }
    }

    fn handle_event(&self, _rt: &mut (), _ctx: &mut EventContext<'_>, _event: &Event) {}
}
