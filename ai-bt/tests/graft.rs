mod common;

use std::cell::RefCell;
use std::rc::Rc;

use ai_bt::{GraftBehaviorListener, GraftModeListener, TreeError, XmlNode};
use ai_core::EntityId;
use common::{node, recorder, tree, Harness, AGENT};

type Calls = Rc<RefCell<Vec<&'static str>>>;

struct Recorder(Calls);

impl GraftModeListener for Recorder {
    fn on_graft_node_ready(&mut self, _agent: EntityId) {
        self.0.borrow_mut().push("ready");
    }

    fn on_graft_mode_interrupted(&mut self, _agent: EntityId) {
        self.0.borrow_mut().push("interrupted");
    }
}

impl GraftBehaviorListener for Recorder {
    fn on_graft_behavior_complete(&mut self, _agent: EntityId) {
        self.0.borrow_mut().push("complete");
    }

    fn on_graft_behavior_failed(&mut self, _agent: EntityId) {
        self.0.borrow_mut().push("failed");
    }
}

fn state(name: &str, to: &str, on_event: &str, body: XmlNode) -> XmlNode {
    XmlNode::new("State")
        .with_attr("name", name)
        .with_child(node(
            "Transitions",
            [XmlNode::new("Transition")
                .with_attr("to", to)
                .with_attr("onEvent", on_event)],
        ))
        .with_child(node("BehaviorTree", [body]))
}

fn graftable() -> Harness {
    let root = node(
        "StateMachine",
        [
            state("Idle", "Grafted", "OnGraftRequested", recorder("idle", "Running")),
            state("Grafted", "Idle", "OnGraftModeComplete", XmlNode::new("Graft")),
        ],
    );
    let mut h = Harness::new(&[("Host", tree(root))]);
    h.start("Host");
    h.step(0.1);
    h
}

#[test]
fn graft_mode_runs_a_supplied_behavior() {
    let mut h = graftable();
    let calls: Calls = Rc::default();

    h.manager
        .request_graft_mode(AGENT, Box::new(Recorder(Rc::clone(&calls))))
        .expect("request");
    assert!(calls.borrow().is_empty());

    h.step(0.1);
    assert_eq!(*calls.borrow(), vec!["ready"]);
    assert!(h.manager.graft_manager().active_node(AGENT).is_some());
    h.take_journal();

    let behavior = tree(recorder("sub", "Success").with_attr("after", 1));
    h.manager
        .run_graft_behavior(AGENT, "Sub", &behavior, Box::new(Recorder(Rc::clone(&calls))))
        .expect("run");

    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        vec!["init:sub".to_string(), "update#1:sub".to_string()]
    );
    h.step(0.1);
    assert_eq!(*calls.borrow(), vec!["ready", "complete"]);

    // The graft node keeps running with nothing grafted.
    let stats = h.step(0.1);
    assert!(stats.terminated.is_empty());

    h.manager.graft_mode_complete(AGENT);
    h.step(0.1);
    assert_eq!(*calls.borrow(), vec!["ready", "complete"]);
    assert!(h.manager.graft_manager().active_node(AGENT).is_none());
    assert!(h.take_journal().contains(&"init:idle".to_string()));
}

#[test]
fn failed_graft_behavior_is_reported_and_dropped() {
    let mut h = graftable();
    let calls: Calls = Rc::default();
    h.manager
        .request_graft_mode(AGENT, Box::new(Recorder(Rc::clone(&calls))))
        .expect("request");
    h.step(0.1);

    let behavior = tree(recorder("sub", "Failure"));
    h.manager
        .run_graft_behavior(AGENT, "Sub", &behavior, Box::new(Recorder(Rc::clone(&calls))))
        .expect("run");

    let stats = h.step(0.1);
    assert!(stats.terminated.is_empty());
    assert_eq!(*calls.borrow(), vec!["ready", "failed"]);
    assert!(h.manager.is_running(AGENT));
}

#[test]
fn stopping_the_host_tree_interrupts_graft_mode() {
    let mut h = graftable();
    let calls: Calls = Rc::default();
    h.manager
        .request_graft_mode(AGENT, Box::new(Recorder(Rc::clone(&calls))))
        .expect("request");
    h.step(0.1);

    let behavior = tree(recorder("sub", "Running"));
    h.manager
        .run_graft_behavior(AGENT, "Sub", &behavior, Box::new(Recorder(Rc::clone(&calls))))
        .expect("run");
    h.step(0.1);
    h.take_journal();

    assert!(h.manager.stop_modular_behavior_tree(AGENT));
    assert_eq!(*calls.borrow(), vec!["ready", "interrupted"]);
    assert_eq!(h.take_journal(), vec!["terminate:sub".to_string()]);
    assert_eq!(h.manager.factory().outstanding_runtime_data(), 0);
}

#[test]
fn replacing_a_grafted_behavior_terminates_the_old_one() {
    let mut h = graftable();
    let calls: Calls = Rc::default();
    h.manager
        .request_graft_mode(AGENT, Box::new(Recorder(Rc::clone(&calls))))
        .expect("request");
    h.step(0.1);

    h.manager
        .run_graft_behavior(
            AGENT,
            "First",
            &tree(recorder("first", "Running")),
            Box::new(Recorder(Rc::clone(&calls))),
        )
        .expect("run");
    h.step(0.1);
    h.take_journal();

    h.manager
        .run_graft_behavior(
            AGENT,
            "Second",
            &tree(recorder("second", "Running")),
            Box::new(Recorder(Rc::clone(&calls))),
        )
        .expect("run");
    assert_eq!(h.take_journal(), vec!["terminate:first".to_string()]);

    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        vec!["init:second".to_string(), "update#1:second".to_string()]
    );
}

#[test]
fn graft_requests_need_an_active_graft_node() {
    let mut h = graftable();
    let calls: Calls = Rc::default();

    let err = h
        .manager
        .run_graft_behavior(
            AGENT,
            "Sub",
            &tree(recorder("sub", "Running")),
            Box::new(Recorder(Rc::clone(&calls))),
        )
        .unwrap_err();
    assert!(matches!(err, TreeError::NoActiveGraftNode(agent) if agent == AGENT));

    h.manager
        .request_graft_mode(AGENT, Box::new(Recorder(Rc::clone(&calls))))
        .expect("request");
    let again = h
        .manager
        .request_graft_mode(AGENT, Box::new(Recorder(Rc::clone(&calls))))
        .unwrap_err();
    assert!(matches!(again, TreeError::GraftModeAlreadyRequested(_)));
}

#[test]
fn cancelling_graft_mode_returns_to_the_previous_state() {
    let mut h = graftable();
    let calls: Calls = Rc::default();
    h.manager
        .request_graft_mode(AGENT, Box::new(Recorder(Rc::clone(&calls))))
        .expect("request");
    h.step(0.1);
    h.take_journal();

    h.manager.cancel_graft_mode(AGENT);
    assert!(!h.manager.graft_manager().has_graft_mode_request(AGENT));
    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        vec!["init:idle".to_string(), "update#1:idle".to_string()]
    );
    assert_eq!(*calls.borrow(), vec!["ready"]);
}
