//! Lifecycle trace events recorded through an agent's blackboard.
//!
//! Runtimes call [`emit`] unconditionally; the event only goes somewhere when the blackboard
//! carries a [`TRACE_LOG`] or a [`TRACE_SINK`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use ai_core::{BbKey, Blackboard};

/// One recorded runtime occurrence.
///
/// `tag` is a dotted category (`bt.tree.start`, `bt.graft.run`, ...). `value` is a numeric
/// payload whose meaning depends on the tag, e.g. the event hash for `bt.event`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    pub tick: u64,
    pub tag: Cow<'static, str>,
    pub agent: u64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub value: u64,
    /// Tree, event or behavior name.
    #[cfg_attr(feature = "serde", serde(default))]
    pub label: Option<String>,
}

impl TraceEvent {
    pub fn new(tick: u64, tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tick,
            tag: tag.into(),
            agent: 0,
            value: 0,
            label: None,
        }
    }

    pub fn with_agent(mut self, agent: u64) -> Self {
        self.agent = agent;
        self
    }

    pub fn with_value(mut self, value: u64) -> Self {
        self.value = value;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Streaming consumer, e.g. a debugger connection.
pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

/// In-memory record of every emitted event, in order.
#[derive(Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn with_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a TraceEvent> + 'a {
        self.events.iter().filter(move |e| e.tag == tag)
    }

    /// Labels of the events tagged `tag`, skipping unlabeled ones.
    pub fn labels<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.with_tag(tag).filter_map(|e| e.label.as_deref())
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

pub const TRACE_LOG: BbKey<TraceLog> = BbKey::new(0xA11D_7ACE_0000_0001);
pub const TRACE_SINK: BbKey<Box<dyn TraceSink>> = BbKey::new(0xA11D_7ACE_0000_0002);

/// Records `event` into whichever of [`TRACE_LOG`] / [`TRACE_SINK`] the blackboard carries.
pub fn emit(blackboard: &mut Blackboard, event: TraceEvent) {
    if let Some(sink) = blackboard.get_mut(TRACE_SINK) {
        sink.emit(event.clone());
    }
    if let Some(log) = blackboard.get_mut(TRACE_LOG) {
        log.push(event);
    }
}
