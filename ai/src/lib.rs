//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! - [`bt`]: modular behavior trees loaded from descriptions, with grafting.
//! - [`nav`]: stepped A* and a grid navigator.
//! - [`core`] and [`tools`]: the agent, blackboard and debugging primitives both build on.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use ai_tools as tools;

#[cfg(feature = "nav")]
#[cfg_attr(docsrs, doc(cfg(feature = "nav")))]
pub use ai_nav as nav;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub use ai_bt as bt;
