#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use ai_bt::{
    Behavior, BehaviorTreeManager, Event, EventContext, LoadContext, LoadError, LoadResult,
    ManagerConfig, MemorySource, NodeHeader, Status, UpdateContext, UpdateStats, XmlNode,
};
use ai_core::{EntityId, OpenWorld, TickContext};
use tracing_subscriber::{fmt, EnvFilter};

pub const AGENT: EntityId = EntityId(1);

pub type Journal = Rc<RefCell<Vec<String>>>;

#[derive(Debug, Default)]
pub struct RecorderData {
    pub updates: u32,
}

/// Leaf that writes every lifecycle call into a shared journal.
///
/// Returns `result` once it has been updated more than `after` times, `Running` before that.
pub struct Recorder {
    header: NodeHeader,
    journal: Journal,
    name: String,
    result: Status,
    after: u32,
}

impl Recorder {
    pub fn new(journal: Journal) -> Self {
        Self {
            header: NodeHeader::default(),
            journal,
            name: String::new(),
            result: Status::Running,
            after: 0,
        }
    }

    fn record(&self, what: &str) {
        self.journal
            .borrow_mut()
            .push(format!("{what}:{}", self.name));
    }
}

impl Behavior for Recorder {
    type RuntimeData = RecorderData;

    ai_bt::node_header!();

    fn load_from_xml(&mut self, xml: &XmlNode, _ctx: &mut LoadContext<'_>) -> LoadResult {
        self.name = xml.required_attr("name")?.to_string();
        self.result = match xml.attr("result").unwrap_or("Running") {
            "Running" => Status::Running,
            "Success" => Status::Success,
            "Failure" => Status::Failure,
            other => return Err(LoadError::invalid_attribute(xml, "result", other)),
        };
        self.after = xml.attr_u32("after")?.unwrap_or(0);
        Ok(())
    }

    fn on_initialize(&self, _rt: &mut RecorderData, _ctx: &mut UpdateContext<'_>) {
        self.record("init");
    }

    fn update(&self, rt: &mut RecorderData, _ctx: &mut UpdateContext<'_>) -> Status {
        rt.updates += 1;
        self.record(&format!("update#{}", rt.updates));
        if rt.updates > self.after {
            self.result
        } else {
            Status::Running
        }
    }

    fn on_terminate(&self, _rt: &mut RecorderData, _ctx: &mut UpdateContext<'_>) {
        self.record("terminate");
    }

    fn handle_event(&self, _rt: &mut RecorderData, _ctx: &mut EventContext<'_>, event: &Event) {
        self.record(&format!("event {}", event.name()));
    }
}

pub fn recorder(name: &str, result: &str) -> XmlNode {
    XmlNode::new("Recorder")
        .with_attr("name", name)
        .with_attr("result", result)
}

pub fn node(tag: &str, children: impl IntoIterator<Item = XmlNode>) -> XmlNode {
    XmlNode::new(tag).with_children(children)
}

/// `BehaviorTree` document with `root` as its only node and the given declaration sections.
pub fn tree_with(sections: impl IntoIterator<Item = XmlNode>, root: XmlNode) -> XmlNode {
    XmlNode::new("BehaviorTree")
        .with_children(sections)
        .with_child(XmlNode::new("Root").with_child(root))
}

pub fn tree(root: XmlNode) -> XmlNode {
    tree_with([], root)
}

/// Routes engine logs through the test writer. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_test_writer()
        .try_init();
}

pub fn quiet_config() -> ManagerConfig {
    ManagerConfig {
        search_paths: Vec::new(),
        ..ManagerConfig::default()
    }
}

/// Manager over an in-memory source with the `Recorder` node registered, plus a frame counter.
pub struct Harness {
    pub manager: BehaviorTreeManager,
    pub journal: Journal,
    pub frame: u64,
}

impl Harness {
    pub fn new(trees: &[(&str, XmlNode)]) -> Self {
        Self::with_config(trees, quiet_config())
    }

    pub fn with_config(trees: &[(&str, XmlNode)], config: ManagerConfig) -> Self {
        init_tracing();
        let mut source = MemorySource::new();
        for (name, xml) in trees {
            source.insert(name, xml.clone());
        }

        let journal: Journal = Rc::default();
        let mut manager = BehaviorTreeManager::with_sources(config, vec![Box::new(source)]);
        let recorder_journal = Rc::clone(&journal);
        manager
            .factory_mut()
            .register_with("Recorder", move || Recorder::new(Rc::clone(&recorder_journal)))
            .expect("register recorder");

        Self {
            manager,
            journal,
            frame: 0,
        }
    }

    pub fn start(&mut self, name: &str) {
        self.manager
            .start_modular_behavior_tree(AGENT, name)
            .expect("start tree");
    }

    pub fn step(&mut self, dt: f32) -> UpdateStats {
        let tick = TickContext::new(self.frame, dt, 7);
        self.frame += 1;
        self.manager.update(&tick, &OpenWorld)
    }

    pub fn send(&mut self, event: &'static str) {
        self.manager.handle_event(AGENT, &Event::new(event));
    }

    pub fn take_journal(&self) -> Vec<String> {
        std::mem::take(&mut *self.journal.borrow_mut())
    }
}
