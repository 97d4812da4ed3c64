//! Deterministic, engine-agnostic AI kernel primitives.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod blackboard;
pub mod hash;
pub mod rng;
pub mod tick;
pub mod world;

pub use agent::{AgentId, EntityId};
pub use blackboard::{BbKey, Blackboard, BlackboardError};
pub use hash::NameHash;
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::TickContext;
pub use world::{AgentState, OpenWorld, WorldView};
