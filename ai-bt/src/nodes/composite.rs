use ai_core::NameHash;

use crate::context::{EventContext, LoadContext, UpdateContext};
use crate::error::LoadError;
use crate::event::Event;
use crate::node::{Behavior, LoadResult, Node, NodeHeader, Status};
use crate::nodes::{load_children, MAX_INDEXED_CHILDREN, MAX_PARALLEL_CHILDREN};
use crate::variables::Expression;
use crate::xml::XmlNode;

/// Remembered child position of a scanning composite.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanData {
    pub index: usize,
}

/// Runs children in order until one does not succeed.
#[derive(Default)]
pub struct Sequence {
    header: NodeHeader,
    children: Vec<Box<dyn Node>>,
}

impl Behavior for Sequence {
    type RuntimeData = ScanData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.children = load_children(xml, ctx, MAX_INDEXED_CHILDREN)?;
        Ok(())
    }

    fn update(&self, rt: &mut ScanData, ctx: &mut UpdateContext<'_>) -> Status {
        while let Some(child) = self.children.get(rt.index) {
            match child.tick(ctx) {
                Status::Success => rt.index += 1,
                other => return other,
            }
        }
        Status::Success
    }

    fn on_terminate(&self, rt: &mut ScanData, ctx: &mut UpdateContext<'_>) {
        if let Some(child) = self.children.get(rt.index) {
            child.terminate(ctx);
        }
    }

    fn handle_event(&self, rt: &mut ScanData, ctx: &mut EventContext<'_>, event: &Event) {
        if let Some(child) = self.children.get(rt.index) {
            child.send_event(ctx, event);
        }
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        for child in &self.children {
            f(child.as_ref());
        }
    }
}

/// Runs children in order until one does not fail.
#[derive(Default)]
pub struct Selector {
    header: NodeHeader,
    children: Vec<Box<dyn Node>>,
}

impl Behavior for Selector {
    type RuntimeData = ScanData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.children = load_children(xml, ctx, MAX_INDEXED_CHILDREN)?;
        Ok(())
    }

    fn update(&self, rt: &mut ScanData, ctx: &mut UpdateContext<'_>) -> Status {
        while let Some(child) = self.children.get(rt.index) {
            match child.tick(ctx) {
                Status::Failure => rt.index += 1,
                other => return other,
            }
        }
        Status::Failure
    }

    fn on_terminate(&self, rt: &mut ScanData, ctx: &mut UpdateContext<'_>) {
        if let Some(child) = self.children.get(rt.index) {
            child.terminate(ctx);
        }
    }

    fn handle_event(&self, rt: &mut ScanData, ctx: &mut EventContext<'_>, event: &Event) {
        if let Some(child) = self.children.get(rt.index) {
            child.send_event(ctx, event);
        }
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        for child in &self.children {
            f(child.as_ref());
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ParallelMode {
    Any,
    #[default]
    All,
}

impl ParallelMode {
    fn load(xml: &XmlNode, attribute: &str, default: ParallelMode) -> Result<Self, LoadError> {
        match xml.attr(attribute) {
            None => Ok(default),
            Some(raw) if raw.eq_ignore_ascii_case("any") => Ok(ParallelMode::Any),
            Some(raw) if raw.eq_ignore_ascii_case("all") => Ok(ParallelMode::All),
            Some(raw) => Err(LoadError::invalid_attribute(xml, attribute, raw)),
        }
    }

    fn is_met(self, count: u32, total: u32) -> bool {
        match self {
            ParallelMode::Any => count > 0,
            ParallelMode::All => count == total,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ParallelData {
    /// Bit `i` is set while child `i` has not finished.
    pub running: u32,
    pub success_count: u32,
    pub failure_count: u32,
}

/// Ticks every unfinished child each tick.
///
/// `successMode` defaults to `all`, `failureMode` to `any`. Success is checked first.
pub struct Parallel {
    header: NodeHeader,
    children: Vec<Box<dyn Node>>,
    success_mode: ParallelMode,
    failure_mode: ParallelMode,
}

impl Default for Parallel {
    fn default() -> Self {
        Self {
            header: NodeHeader::default(),
            children: Vec::new(),
            success_mode: ParallelMode::All,
            failure_mode: ParallelMode::Any,
        }
    }
}

impl Parallel {
    fn running_children<'a>(&'a self, rt: &ParallelData) -> impl Iterator<Item = &'a dyn Node> + 'a {
        let running = rt.running;
        self.children
            .iter()
            .enumerate()
            .filter(move |(i, _)| running & (1 << i) != 0)
            .map(|(_, child)| child.as_ref())
    }
}

impl Behavior for Parallel {
    type RuntimeData = ParallelData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        self.success_mode = ParallelMode::load(xml, "successMode", ParallelMode::All)?;
        self.failure_mode = ParallelMode::load(xml, "failureMode", ParallelMode::Any)?;
        self.children = load_children(xml, ctx, MAX_PARALLEL_CHILDREN)?;
        Ok(())
    }

    fn on_initialize(&self, rt: &mut ParallelData, _ctx: &mut UpdateContext<'_>) {
        let n = self.children.len() as u32;
        rt.running = if n >= u32::BITS { u32::MAX } else { (1u32 << n) - 1 };
        rt.success_count = 0;
        rt.failure_count = 0;
    }

    fn update(&self, rt: &mut ParallelData, ctx: &mut UpdateContext<'_>) -> Status {
        for (i, child) in self.children.iter().enumerate() {
            let bit = 1u32 << i;
            if rt.running & bit == 0 {
                continue;
            }
            match child.tick(ctx) {
                Status::Running => {}
                Status::Success => {
                    rt.success_count += 1;
                    rt.running &= !bit;
                }
                Status::Failure => {
                    rt.failure_count += 1;
                    rt.running &= !bit;
                }
            }
        }

        let total = self.children.len() as u32;
        if self.success_mode.is_met(rt.success_count, total) {
            Status::Success
        } else if self.failure_mode.is_met(rt.failure_count, total) {
            Status::Failure
        } else {
            Status::Running
        }
    }

    fn on_terminate(&self, rt: &mut ParallelData, ctx: &mut UpdateContext<'_>) {
        for child in self.running_children(rt) {
            child.terminate(ctx);
        }
        rt.running = 0;
    }

    fn handle_event(&self, rt: &mut ParallelData, ctx: &mut EventContext<'_>, event: &Event) {
        for child in self.running_children(rt) {
            child.send_event(ctx, event);
        }
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        for child in &self.children {
            f(child.as_ref());
        }
    }
}

struct Case {
    condition: Expression,
    node: Box<dyn Node>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PriorityData {
    pub current: Option<usize>,
}

/// Runs the first `Case` whose condition holds.
///
/// Cases are re-evaluated only when variables changed since the last tick or when no case is
/// selected.
#[derive(Default)]
pub struct Priority {
    header: NodeHeader,
    cases: Vec<Case>,
}

impl Behavior for Priority {
    type RuntimeData = PriorityData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        if xml.children.is_empty() {
            return Err(LoadError::child_count(xml, "at least one"));
        }
        // One index value is reserved for "no case selected".
        if xml.children.len() >= MAX_INDEXED_CHILDREN {
            return Err(LoadError::too_many_children(xml, MAX_INDEXED_CHILDREN - 1));
        }

        for case in &xml.children {
            if !case.is_tag("Case") {
                return Err(LoadError::unexpected(xml, case));
            }
            let condition = match case.attr("condition").map(str::trim) {
                None | Some("") => Expression::constant(true),
                Some(text) => Expression::load(text, ctx.variables, case)?,
            };
            case.expect_children(1, "exactly one")?;
            let node = ctx.create_node(&case.children[0])?;
            self.cases.push(Case { condition, node });
        }
        Ok(())
    }

    fn on_initialize(&self, rt: &mut PriorityData, _ctx: &mut UpdateContext<'_>) {
        rt.current = None;
    }

    fn update(&self, rt: &mut PriorityData, ctx: &mut UpdateContext<'_>) -> Status {
        if ctx.variables.changed || rt.current.is_none() {
            let variables = &*ctx.variables.collection;
            let chosen = self
                .cases
                .iter()
                .position(|case| case.condition.evaluate(variables));
            if chosen != rt.current {
                if let Some(previous) = rt.current {
                    self.cases[previous].node.terminate(ctx);
                }
                rt.current = chosen;
            }
        }

        match rt.current {
            Some(i) => self.cases[i].node.tick(ctx),
            None => Status::Failure,
        }
    }

    fn on_terminate(&self, rt: &mut PriorityData, ctx: &mut UpdateContext<'_>) {
        if let Some(i) = rt.current.take() {
            self.cases[i].node.terminate(ctx);
        }
    }

    fn handle_event(&self, rt: &mut PriorityData, ctx: &mut EventContext<'_>, event: &Event) {
        if let Some(i) = rt.current {
            self.cases[i].node.send_event(ctx, event);
        }
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        for case in &self.cases {
            f(case.node.as_ref());
        }
    }
}

struct Transition {
    event: NameHash,
    destination: usize,
}

struct State {
    name: String,
    transitions: Vec<Transition>,
    node: Box<dyn Node>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StateMachineData {
    pub current: usize,
    pub pending: Option<usize>,
}

/// Named states with event-driven transitions.
///
/// A matching event only records the destination; the switch happens at the start of the next
/// update.
#[derive(Default)]
pub struct StateMachine {
    header: NodeHeader,
    states: Vec<State>,
}

impl StateMachine {
    pub fn state_names(&self) -> impl Iterator<Item = &str> {
        self.states.iter().map(|s| s.name.as_str())
    }

    fn record_transition(&self, rt: &mut StateMachineData, event: &Event) {
        let from = rt.pending.unwrap_or(rt.current);
        if let Some(transition) = self
            .states
            .get(from)
            .and_then(|s| s.transitions.iter().find(|t| t.event == event.hash()))
        {
            rt.pending = Some(transition.destination);
        }
    }
}

impl Behavior for StateMachine {
    type RuntimeData = StateMachineData;

    crate::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, ctx: &mut LoadContext<'_>) -> LoadResult {
        if xml.children.is_empty() {
            return Err(LoadError::child_count(xml, "at least one"));
        }
        // One index value is reserved for "no state".
        if xml.children.len() >= MAX_INDEXED_CHILDREN {
            return Err(LoadError::too_many_children(xml, MAX_INDEXED_CHILDREN - 1));
        }

        let mut hashes: Vec<NameHash> = Vec::new();
        // (state index, destination name, event name, line)
        let mut unresolved: Vec<(usize, String, String, u32)> = Vec::new();

        for state_xml in &xml.children {
            if !state_xml.is_tag("State") {
                return Err(LoadError::unexpected(xml, state_xml));
            }
            let name = state_xml.required_attr("name")?;
            let hash = NameHash::of(name);
            if hashes.contains(&hash) {
                return Err(LoadError::Duplicate {
                    line: state_xml.line,
                    what: "state",
                    name: name.to_string(),
                });
            }

            let mut tree_xml = None;
            for section in &state_xml.children {
                match section.tag.as_str() {
                    "Transitions" => {
                        for transition in &section.children {
                            if !transition.is_tag("Transition") {
                                return Err(LoadError::unexpected(section, transition));
                            }
                            unresolved.push((
                                self.states.len(),
                                transition.required_attr("to")?.to_string(),
                                transition.required_attr("onEvent")?.to_string(),
                                transition.line,
                            ));
                        }
                    }
                    "BehaviorTree" => tree_xml = Some(section),
                    _ => return Err(LoadError::unexpected(state_xml, section)),
                }
            }
            let tree_xml = tree_xml.ok_or_else(|| LoadError::MissingSection {
                line: state_xml.line,
                tag: state_xml.tag.clone(),
                section: "BehaviorTree",
            })?;
            tree_xml.expect_children(1, "exactly one")?;
            let node = ctx.create_node(&tree_xml.children[0])?;

            hashes.push(hash);
            self.states.push(State {
                name: name.to_string(),
                transitions: Vec::new(),
                node,
            });
        }

        for (state, to, on_event, line) in unresolved {
            let destination = hashes
                .iter()
                .position(|h| *h == NameHash::of(&to))
                .ok_or(LoadError::UnknownState { line, name: to })?;
            self.states[state].transitions.push(Transition {
                event: NameHash::of(&on_event),
                destination,
            });
        }
        Ok(())
    }

    fn on_initialize(&self, rt: &mut StateMachineData, _ctx: &mut UpdateContext<'_>) {
        *rt = StateMachineData::default();
    }

    fn update(&self, rt: &mut StateMachineData, ctx: &mut UpdateContext<'_>) -> Status {
        if let Some(next) = rt.pending.take() {
            self.states[rt.current].node.terminate(ctx);
            rt.current = next;
        }
        self.states[rt.current].node.tick(ctx)
    }

    fn on_terminate(&self, rt: &mut StateMachineData, ctx: &mut UpdateContext<'_>) {
        if let Some(state) = self.states.get(rt.current) {
            state.node.terminate(ctx);
        }
    }

    fn handle_event(&self, rt: &mut StateMachineData, ctx: &mut EventContext<'_>, event: &Event) {
        self.record_transition(rt, event);
        if let Some(state) = self.states.get(rt.current) {
            state.node.send_event(ctx, event);
        }
    }

    fn for_each_child(&self, f: &mut dyn FnMut(&dyn Node)) {
        for state in &self.states {
            f(state.node.as_ref());
        }
    }

    fn handle_deferred_event(
        &self,
        rt: &mut StateMachineData,
        _ctx: &mut EventContext<'_>,
        event: &Event,
    ) {
        self.record_transition(rt, event);
    }
}
