use std::cell::RefCell;
use std::rc::Rc;

use ai_core::Blackboard;
use ai_tools::{emit, TraceEvent, TraceLog, TraceSink, TRACE_LOG, TRACE_SINK};

#[derive(Clone, Default)]
struct RcSink(Rc<RefCell<Vec<TraceEvent>>>);

impl TraceSink for RcSink {
    fn emit(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

#[test]
fn emit_records_into_trace_log() {
    let mut bb = Blackboard::new();
    bb.set(TRACE_LOG, TraceLog::default());

    emit(
        &mut bb,
        TraceEvent::new(1, "bt.root.terminated")
            .with_agent(4)
            .with_value(1)
            .with_label("Patrol"),
    );

    let log = bb.get(TRACE_LOG).expect("log installed");
    assert_eq!(log.events.len(), 1);
    let event = &log.events[0];
    assert_eq!(event.tick, 1);
    assert_eq!(event.tag, "bt.root.terminated");
    assert_eq!(event.agent, 4);
    assert_eq!(event.value, 1);
    assert_eq!(event.label.as_deref(), Some("Patrol"));
}

#[test]
fn emit_streams_into_sink_and_log_together() {
    let mut bb = Blackboard::new();
    bb.set(TRACE_LOG, TraceLog::default());
    let sink = RcSink::default();
    let streamed = Rc::clone(&sink.0);
    bb.set(TRACE_SINK, Box::new(sink) as Box<dyn TraceSink>);

    emit(&mut bb, TraceEvent::new(2, "bt.event").with_label("OnHit"));
    emit(&mut bb, TraceEvent::new(3, "bt.tree.stop"));

    let streamed = streamed.borrow();
    assert_eq!(streamed.len(), 2);
    assert_eq!(streamed[0].label.as_deref(), Some("OnHit"));

    let log = bb.get(TRACE_LOG).expect("log installed");
    assert_eq!(log.events, *streamed);
}

#[test]
fn emit_without_log_or_sink_is_a_no_op() {
    let mut bb = Blackboard::new();
    emit(&mut bb, TraceEvent::new(4, "bt.event"));
    assert!(bb.is_empty());
}

#[test]
fn trace_log_filters_labels_by_tag() {
    let mut log = TraceLog::default();
    log.push(TraceEvent::new(1, "bt.event").with_label("A"));
    log.push(TraceEvent::new(1, "bt.tree.stop").with_label("Patrol"));
    log.push(TraceEvent::new(2, "bt.event"));
    log.push(TraceEvent::new(2, "bt.event").with_label("B"));

    assert_eq!(log.labels("bt.event").collect::<Vec<_>>(), vec!["A", "B"]);
    assert_eq!(log.with_tag("bt.event").count(), 3);

    log.clear();
    assert!(log.events.is_empty());
}
