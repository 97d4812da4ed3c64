use std::any::{type_name, Any, TypeId};
use std::collections::{BTreeMap, HashMap};

use crate::context::LoadContext;
use crate::error::{FactoryError, LoadError};
use crate::event::Event;
use crate::node::{Behavior, CreatorId, Node, NodeHeader, NodeId, RuntimeDataId};
use crate::timestamps::TimestampCollection;
use crate::variables::VariableDeclarations;
use crate::xml::XmlNode;

type MakeNode = Box<dyn Fn() -> Box<dyn Node>>;

enum Slot {
    Idle(Box<dyn Any>),
    /// Checked out by the node currently executing. Events reaching it wait here until its
    /// update returns.
    Executing(Vec<Event>),
}

type Pool = HashMap<RuntimeDataId, Slot>;

struct Creator {
    name: String,
    make: MakeNode,
    data_type: TypeId,
    data_type_name: &'static str,
    pool: Pool,
}

/// Registry of node kinds and owner of every runtime-data block.
///
/// Node type names are matched exactly (case-sensitive). Ids keep counting across every tree the
/// factory builds until [`NodeFactory::trim`] restarts them.
pub struct NodeFactory {
    creators: Vec<Creator>,
    by_name: BTreeMap<String, CreatorId>,
    next_node_id: u32,
}

impl Default for NodeFactory {
    fn default() -> Self {
        Self {
            creators: Vec::new(),
            by_name: BTreeMap::new(),
            next_node_id: 1,
        }
    }
}

impl std::fmt::Debug for NodeFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFactory")
            .field("node_types", &self.by_name.keys().collect::<Vec<_>>())
            .field("next_node_id", &self.next_node_id)
            .field("outstanding", &self.outstanding_runtime_data())
            .finish()
    }
}

impl NodeFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<B: Behavior + Default>(&mut self, name: &str) -> Result<(), FactoryError> {
        self.register_with(name, B::default)
    }

    /// Registers a kind whose instances are produced by `make`.
    pub fn register_with<B, F>(&mut self, name: &str, make: F) -> Result<(), FactoryError>
    where
        B: Behavior,
        F: Fn() -> B + 'static,
    {
        if self.by_name.contains_key(name) {
            tracing::error!(node_type = %name, "Duplicate node type registration");
            return Err(FactoryError::DuplicateNodeType(name.to_string()));
        }
        let id = CreatorId(self.creators.len());
        self.creators.push(Creator {
            name: name.to_string(),
            make: Box::new(move || Box::new(make()) as Box<dyn Node>),
            data_type: TypeId::of::<B::RuntimeData>(),
            data_type_name: type_name::<B::RuntimeData>(),
            pool: Pool::new(),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(())
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(String::as_str)
    }

    pub fn creator_name(&self, creator: CreatorId) -> Option<&str> {
        self.creators.get(creator.0).map(|c| c.name.as_str())
    }

    /// Builds an unloaded node of kind `name` with a fresh id.
    pub fn create_node_of_type(&mut self, name: &str, line: u32) -> Option<Box<dyn Node>> {
        let creator = *self.by_name.get(name)?;
        let mut node = (self.creators[creator.0].make)();
        *node.header_mut() = NodeHeader {
            id: NodeId(self.next_node_id),
            creator,
            line,
        };
        self.next_node_id += 1;
        Some(node)
    }

    /// Looks up `xml.tag` and loads the new node from `xml`.
    pub fn create_node_from_xml(
        &mut self,
        xml: &XmlNode,
        tree_name: &str,
        variables: &VariableDeclarations,
        timestamps: &TimestampCollection,
    ) -> Result<Box<dyn Node>, LoadError> {
        let mut ctx = LoadContext::new(tree_name, self, variables, timestamps);
        ctx.create_node(xml)
    }

    pub fn next_node_id(&self) -> NodeId {
        NodeId(self.next_node_id)
    }

    fn creator_for<T: 'static>(&mut self, creator: CreatorId) -> &mut Creator {
        let entry = &mut self.creators[creator.0];
        if entry.data_type != TypeId::of::<T>() {
            panic!(
                "runtime data type mismatch for node type '{}': registered {}, requested {}",
                entry.name,
                entry.data_type_name,
                type_name::<T>()
            );
        }
        entry
    }

    /// Creates a fresh block for `id` and hands it out checked out.
    ///
    /// Panics if a block already exists for `id`: a node is never initialized twice without
    /// terminating in between.
    pub(crate) fn allocate<T: Default + 'static>(
        &mut self,
        creator: CreatorId,
        id: RuntimeDataId,
    ) -> Box<T> {
        let entry = self.creator_for::<T>(creator);
        if entry.pool.insert(id, Slot::Executing(Vec::new())).is_some() {
            panic!(
                "runtime data for {:?} of node type '{}' allocated twice",
                id, entry.name
            );
        }
        Box::<T>::default()
    }

    /// Takes the block for `id` if the node is active and not already executing.
    pub(crate) fn checkout<T: 'static>(
        &mut self,
        creator: CreatorId,
        id: RuntimeDataId,
    ) -> Option<Box<T>> {
        let entry = self.creator_for::<T>(creator);
        let slot = entry.pool.get_mut(&id)?;
        match std::mem::replace(slot, Slot::Executing(Vec::new())) {
            Slot::Idle(block) => block.downcast::<T>().ok(),
            executing @ Slot::Executing(_) => {
                *slot = executing;
                None
            }
        }
    }

    pub(crate) fn checkin<T: 'static>(&mut self, creator: CreatorId, id: RuntimeDataId, data: Box<T>) {
        let entry = self.creator_for::<T>(creator);
        entry.pool.insert(id, Slot::Idle(data as Box<dyn Any>));
    }

    /// Parks `event` on a block that is checked out. Returns `false` if the node is not executing.
    pub(crate) fn defer_event(&mut self, creator: CreatorId, id: RuntimeDataId, event: &Event) -> bool {
        match self.slot_mut(creator, id) {
            Some(Slot::Executing(events)) => {
                events.push(event.clone());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn take_deferred_events(&mut self, creator: CreatorId, id: RuntimeDataId) -> Vec<Event> {
        match self.slot_mut(creator, id) {
            Some(Slot::Executing(events)) => std::mem::take(events),
            _ => Vec::new(),
        }
    }

    fn slot_mut(&mut self, creator: CreatorId, id: RuntimeDataId) -> Option<&mut Slot> {
        self.creators.get_mut(creator.0)?.pool.get_mut(&id)
    }

    pub(crate) fn free(&mut self, creator: CreatorId, id: RuntimeDataId) {
        if let Some(entry) = self.creators.get_mut(creator.0) {
            entry.pool.remove(&id);
        }
    }

    pub fn is_active(&self, creator: CreatorId, id: RuntimeDataId) -> bool {
        self.creators
            .get(creator.0)
            .is_some_and(|c| c.pool.contains_key(&id))
    }

    /// Reads a block that is active and not currently executing.
    pub fn runtime_data<T: 'static>(&self, creator: CreatorId, id: RuntimeDataId) -> Option<&T> {
        match self.creators.get(creator.0)?.pool.get(&id)? {
            Slot::Idle(block) => block.downcast_ref::<T>(),
            Slot::Executing(_) => None,
        }
    }

    pub fn runtime_data_mut<T: 'static>(
        &mut self,
        creator: CreatorId,
        id: RuntimeDataId,
    ) -> Option<&mut T> {
        match self.slot_mut(creator, id)? {
            Slot::Idle(block) => block.downcast_mut::<T>(),
            Slot::Executing(_) => None,
        }
    }

    pub fn outstanding_runtime_data(&self) -> usize {
        self.creators.iter().map(|c| c.pool.len()).sum()
    }

    /// Drops every pooled block and restarts node numbering.
    ///
    /// Outstanding blocks are reported as an error; they are released anyway.
    pub fn trim(&mut self) -> Result<(), FactoryError> {
        let outstanding = self.outstanding_runtime_data();
        for creator in &mut self.creators {
            if !creator.pool.is_empty() {
                tracing::error!(
                    node_type = %creator.name,
                    blocks = creator.pool.len(),
                    "Trimming node creator with outstanding runtime data"
                );
            }
            creator.pool = Pool::new();
        }
        self.next_node_id = 1;
        if outstanding == 0 {
            Ok(())
        } else {
            Err(FactoryError::OutstandingRuntimeData(outstanding))
        }
    }
}
