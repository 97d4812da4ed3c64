#![cfg(feature = "serde")]

use ai_tools::{TraceEvent, TraceLog};

#[test]
fn trace_log_json_roundtrip() {
    let log = TraceLog {
        events: vec![
            TraceEvent::new(1, "bt.tree.start").with_agent(7).with_label("Patrol"),
            TraceEvent::new(2, "bt.event").with_agent(7).with_value(0xDEAD),
            TraceEvent::new(3, "bt.tree.stop").with_agent(7),
        ],
    };

    let json = serde_json::to_string(&log).expect("serialize");
    let roundtrip: TraceLog = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, log);
}
