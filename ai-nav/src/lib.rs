//! Navigation primitives: a stepped, strategy-driven A* solver and a grid backend built on it.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod astar;
pub mod grid;
pub mod math;
pub mod navigator;

pub use astar::{
    AStarSolver, BinaryHeapOpenList, BitIndex, BitsetClosedList, ClosedList, CostTraits,
    DenseNodeContainer, GraphTraits, HeuristicTraits, MapNodeContainer, NodeContainer, OpenList,
    OrderedClosedList, SearchIndex, SearchNode, SearchState, SortedOpenList,
};
pub use grid::{GridSolver, NavGrid};
pub use math::Vec2;
pub use navigator::{NavPath, Navigator};
