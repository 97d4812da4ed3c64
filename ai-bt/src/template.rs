use std::rc::Rc;

use ai_core::{Blackboard, EntityId, TickContext};
use ai_tools::{BehaviorLog, DebugTree};

use crate::context::{BehaviorVariablesContext, UpdateContext};
use crate::error::LoadError;
use crate::event::Event;
use crate::factory::NodeFactory;
use crate::graft::GraftManager;
use crate::node::Node;
use crate::timestamps::TimestampCollection;
use crate::variables::{SignalHandler, VariableCollection, VariableDeclarations};
use crate::xml::XmlNode;

/// Immutable parsed tree shared by every agent running it.
pub struct BehaviorTreeTemplate {
    name: String,
    root: Box<dyn Node>,
    declarations: VariableDeclarations,
    signal_handler: SignalHandler,
    default_timestamps: TimestampCollection,
}

impl std::fmt::Debug for BehaviorTreeTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BehaviorTreeTemplate")
            .field("name", &self.name)
            .field("root", &self.root.id())
            .field("variables", &self.declarations.len())
            .field("signals", &self.signal_handler.len())
            .finish()
    }
}

impl BehaviorTreeTemplate {
    /// Builds a template from a `BehaviorTree` document.
    ///
    /// Declaration sections are read before the node tree so nodes can resolve variables and
    /// timestamps while loading.
    pub fn from_xml(name: &str, xml: &XmlNode, factory: &mut NodeFactory) -> Result<Self, LoadError> {
        if !xml.is_tag("BehaviorTree") {
            return Err(LoadError::UnexpectedElement {
                line: xml.line,
                parent: "document".to_string(),
                tag: xml.tag.clone(),
            });
        }

        let mut declarations = VariableDeclarations::new();
        let mut signal_handler = SignalHandler::default();
        let mut default_timestamps = TimestampCollection::new();
        let mut root_xml = None;

        for section in &xml.children {
            match section.tag.as_str() {
                "Variables" => declarations.load_from_xml(section)?,
                "Timestamps" => default_timestamps.load_from_xml(section)?,
                "SignalVariables" => {}
                "Root" => {
                    if root_xml.replace(section).is_some() {
                        return Err(LoadError::Duplicate {
                            line: section.line,
                            what: "section",
                            name: "Root".to_string(),
                        });
                    }
                }
                _ => return Err(LoadError::unexpected(xml, section)),
            }
        }
        // Signals refer to variables, which may be declared after them.
        for section in xml.children.iter().filter(|s| s.is_tag("SignalVariables")) {
            signal_handler.load_from_xml(section, &declarations)?;
        }

        let root_xml = root_xml.ok_or_else(|| LoadError::MissingSection {
            line: xml.line,
            tag: xml.tag.clone(),
            section: "Root",
        })?;
        root_xml.expect_children(1, "exactly one")?;
        let root = factory.create_node_from_xml(
            &root_xml.children[0],
            name,
            &declarations,
            &default_timestamps,
        )?;

        Ok(Self {
            name: name.to_string(),
            root,
            declarations,
            signal_handler,
            default_timestamps,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &dyn Node {
        self.root.as_ref()
    }

    pub fn declarations(&self) -> &VariableDeclarations {
        &self.declarations
    }

    pub fn signal_handler(&self) -> &SignalHandler {
        &self.signal_handler
    }

    pub fn default_timestamps(&self) -> &TimestampCollection {
        &self.default_timestamps
    }
}

/// One agent's mutable state for a template.
#[derive(Debug)]
pub struct BehaviorTreeInstance {
    pub template: Rc<BehaviorTreeTemplate>,
    pub variables: VariableCollection,
    pub timestamps: TimestampCollection,
    pub blackboard: Blackboard,
    pub behavior_log: BehaviorLog,
}

impl BehaviorTreeInstance {
    pub fn new(template: Rc<BehaviorTreeTemplate>, log_capacity: usize) -> Self {
        Self {
            variables: template.declarations.default_collection(),
            timestamps: template.default_timestamps.clone(),
            blackboard: Blackboard::new(),
            behavior_log: BehaviorLog::with_capacity(log_capacity),
            template,
        }
    }

    /// Feeds an event through the signal bindings and timestamps. Does not reach any node.
    pub fn process_event(&mut self, event: &Event, now: f64) {
        self.template
            .signal_handler
            .process_signal(event.hash(), &mut self.variables);
        self.timestamps.handle_event(event.hash(), now);
    }

    /// Borrows this instance as the context for ticking or terminating its nodes.
    ///
    /// Consumes the variables' changed flag.
    pub fn update_context<'a>(
        &'a mut self,
        agent: EntityId,
        tick: TickContext,
        now: f64,
        factory: &'a mut NodeFactory,
        graft: &'a mut GraftManager,
        debug: Option<&'a mut DebugTree>,
    ) -> UpdateContext<'a> {
        let template: &'a BehaviorTreeTemplate = &self.template;
        let changed = self.variables.take_changed();
        UpdateContext {
            agent,
            tree_name: &template.name,
            tick,
            now,
            variables: BehaviorVariablesContext {
                collection: &mut self.variables,
                declarations: &template.declarations,
                changed,
            },
            timestamps: &mut self.timestamps,
            blackboard: &mut self.blackboard,
            behavior_log: &mut self.behavior_log,
            factory,
            graft,
            signals: &template.signal_handler,
            root: template.root(),
            debug,
        }
    }
}
