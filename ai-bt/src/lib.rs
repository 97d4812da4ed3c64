//! Modular behavior trees built on `ai-core`.
//!
//! Trees are described as element documents (see [`XmlNode`]), parsed once into a shared
//! [`BehaviorTreeTemplate`] and run per agent by the [`BehaviorTreeManager`]. Nodes keep no
//! per-agent state themselves; their runtime data lives in the [`NodeFactory`] pools.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod factory;
pub mod graft;
pub mod manager;
pub mod node;
pub mod nodes;
pub mod source;
pub mod template;
pub mod timestamps;
pub mod variables;
pub mod xml;

pub use config::ManagerConfig;
pub use context::{BehaviorVariablesContext, EventContext, LoadContext, UpdateContext};
pub use error::{FactoryError, LoadError, SourceError, TreeError};
pub use event::Event;
pub use factory::NodeFactory;
pub use graft::{
    GraftBehaviorListener, GraftManager, GraftModeListener, GraftNodeHandle,
    GRAFT_MODE_COMPLETE_EVENT, GRAFT_REQUESTED_EVENT,
};
pub use manager::{BehaviorTreeManager, UpdateStats};
pub use node::{Behavior, CreatorId, LoadResult, Node, NodeHeader, NodeId, RuntimeDataId, Status};
pub use nodes::register_core_nodes;
pub use source::{DirectorySource, MemorySource, TreeSource};
pub use template::{BehaviorTreeInstance, BehaviorTreeTemplate};
pub use timestamps::{Timer, Timestamp, TimestampCollection, TimestampId};
pub use variables::{
    Expression, ExpressionError, SignalHandler, VariableCollection, VariableDeclaration,
    VariableDeclarations, VariableId,
};
pub use xml::XmlNode;
