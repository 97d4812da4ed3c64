//! Tooling primitives for deterministic game AI.
//!
//! Everything here is engine-agnostic data that runtimes record while they tick and tooling
//! renders afterwards. Nothing in this crate influences tick results.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod debug_tree;
pub mod log;
pub mod trace;

pub use debug_tree::{DebugStatus, DebugTree, DebugTreeEntry};
pub use log::BehaviorLog;
pub use trace::{emit, TraceEvent, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK};
