mod common;

use ai_bt::{LoadError, Status, TreeError, XmlNode};
use common::{node, recorder, tree, tree_with, Harness, AGENT};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn sequence_stops_at_first_failure() {
    let root = node(
        "Sequence",
        [
            recorder("a", "Success"),
            recorder("b", "Success"),
            recorder("c", "Failure"),
        ],
    );
    let mut h = Harness::new(&[("Seq", tree(root))]);
    h.start("Seq");

    let stats = h.step(0.1);
    assert_eq!(stats.terminated, vec![(AGENT, Status::Failure)]);
    assert_eq!(
        h.take_journal(),
        strings(&[
            "init:a",
            "update#1:a",
            "terminate:a",
            "init:b",
            "update#1:b",
            "terminate:b",
            "init:c",
            "update#1:c",
            "terminate:c",
        ])
    );
    assert!(!h.manager.is_running(AGENT));
}

#[test]
fn selector_stops_at_first_success() {
    let root = node(
        "Selector",
        [
            recorder("a", "Failure"),
            recorder("b", "Failure"),
            recorder("c", "Success"),
            recorder("d", "Success"),
        ],
    );
    let mut h = Harness::new(&[("Sel", tree(root))]);
    h.start("Sel");

    let stats = h.step(0.1);
    assert_eq!(stats.terminated, vec![(AGENT, Status::Success)]);
    let journal = h.take_journal();
    assert!(journal.contains(&"update#1:c".to_string()));
    assert!(!journal.iter().any(|line| line.ends_with(":d")));
}

#[test]
fn sequence_resumes_running_child_without_rerunning_earlier_ones() {
    let root = node(
        "Sequence",
        [
            recorder("a", "Success"),
            recorder("b", "Success").with_attr("after", 1),
        ],
    );
    let mut h = Harness::new(&[("Seq", tree(root))]);
    h.start("Seq");

    assert!(h.step(0.1).terminated.is_empty());
    h.take_journal();

    let stats = h.step(0.1);
    assert_eq!(stats.terminated, vec![(AGENT, Status::Success)]);
    assert_eq!(h.take_journal(), strings(&["update#2:b", "terminate:b"]));
}

#[test]
fn parallel_any_success_terminates_the_rest() {
    let root = node("Parallel", [recorder("a", "Running"), recorder("b", "Success")])
        .with_attr("successMode", "any");
    let mut h = Harness::new(&[("Par", tree(root))]);
    h.start("Par");

    let stats = h.step(0.1);
    assert_eq!(stats.terminated, vec![(AGENT, Status::Success)]);
    assert_eq!(
        h.take_journal(),
        strings(&[
            "init:a",
            "update#1:a",
            "init:b",
            "update#1:b",
            "terminate:b",
            "terminate:a",
        ])
    );
}

#[test]
fn parallel_all_waits_for_every_child_and_skips_finished_ones() {
    let root = node(
        "Parallel",
        [
            recorder("a", "Success").with_attr("after", 1),
            recorder("b", "Success"),
        ],
    );
    let mut h = Harness::new(&[("Par", tree(root))]);
    h.start("Par");

    assert!(h.step(0.1).terminated.is_empty());
    h.take_journal();

    let stats = h.step(0.1);
    assert_eq!(stats.terminated, vec![(AGENT, Status::Success)]);
    assert_eq!(h.take_journal(), strings(&["update#2:a", "terminate:a"]));
}

#[test]
fn parallel_default_failure_mode_is_any() {
    let root = node("Parallel", [recorder("a", "Running"), recorder("b", "Failure")]);
    let mut h = Harness::new(&[("Par", tree(root))]);
    h.start("Par");

    assert_eq!(h.step(0.1).terminated, vec![(AGENT, Status::Failure)]);
}

#[test]
fn runtime_data_is_fresh_on_every_activation() {
    let root = node("Loop", [recorder("a", "Success").with_attr("after", 1)]).with_attr("count", 3);
    let mut h = Harness::new(&[("Loop", tree(root))]);
    h.start("Loop");

    h.step(0.1);
    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        strings(&[
            "init:a",
            "update#1:a",
            "update#2:a",
            "terminate:a",
            "init:a",
            "update#1:a",
        ])
    );
    assert_eq!(h.manager.factory().outstanding_runtime_data(), 2);
}

#[test]
fn stopping_a_tree_releases_every_runtime_block() {
    let root = node(
        "Parallel",
        [
            node("Sequence", [recorder("a", "Running")]),
            recorder("b", "Running"),
        ],
    );
    let mut h = Harness::new(&[("Par", tree(root))]);
    h.start("Par");
    h.step(0.1);
    assert_eq!(h.manager.factory().outstanding_runtime_data(), 4);

    assert!(h.manager.stop_modular_behavior_tree(AGENT));
    assert_eq!(h.manager.factory().outstanding_runtime_data(), 0);
    let journal = h.take_journal();
    assert!(journal.contains(&"terminate:a".to_string()));
    assert!(journal.contains(&"terminate:b".to_string()));
}

fn flag_sections() -> Vec<XmlNode> {
    vec![
        node(
            "Variables",
            [XmlNode::new("Variable")
                .with_attr("name", "Alert")
                .with_attr("default", false)],
        ),
        node(
            "SignalVariables",
            [
                XmlNode::new("Signal")
                    .with_attr("name", "OnEnemySeen")
                    .with_attr("variable", "Alert")
                    .with_attr("value", true),
                XmlNode::new("Signal")
                    .with_attr("name", "OnEnemyLost")
                    .with_attr("variable", "Alert")
                    .with_attr("value", false),
            ],
        ),
    ]
}

#[test]
fn priority_switches_case_only_when_variables_change() {
    let root = node(
        "Priority",
        [
            node("Case", [recorder("fight", "Running")]).with_attr("condition", "Alert"),
            node("Case", [recorder("idle", "Running")]),
        ],
    );
    let mut h = Harness::new(&[("Guard", tree_with(flag_sections(), root))]);
    h.start("Guard");

    h.step(0.1);
    assert_eq!(h.take_journal(), strings(&["init:idle", "update#1:idle"]));

    h.send("OnEnemySeen");
    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        strings(&[
            "event OnEnemySeen:idle",
            "terminate:idle",
            "init:fight",
            "update#1:fight",
        ])
    );

    h.step(0.1);
    assert_eq!(h.take_journal(), strings(&["update#2:fight"]));

    h.send("OnEnemyLost");
    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        strings(&[
            "event OnEnemyLost:fight",
            "terminate:fight",
            "init:idle",
            "update#1:idle",
        ])
    );
}

#[test]
fn priority_with_no_matching_case_fails() {
    let root = node(
        "Priority",
        [node("Case", [recorder("fight", "Running")]).with_attr("condition", "Alert")],
    );
    let mut h = Harness::new(&[("Guard", tree_with(flag_sections(), root))]);
    h.start("Guard");

    assert_eq!(h.step(0.1).terminated, vec![(AGENT, Status::Failure)]);
}

fn state(name: &str, transitions: &[(&str, &str)], body: XmlNode) -> XmlNode {
    let mut state = XmlNode::new("State").with_attr("name", name);
    if !transitions.is_empty() {
        state = state.with_child(node(
            "Transitions",
            transitions.iter().map(|(to, on)| {
                XmlNode::new("Transition")
                    .with_attr("to", *to)
                    .with_attr("onEvent", *on)
            }),
        ));
    }
    state.with_child(node("BehaviorTree", [body]))
}

#[test]
fn state_machine_defers_transitions_to_the_next_tick() {
    let root = node(
        "StateMachine",
        [
            state("Patrol", &[("Chase", "OnEnemySeen")], recorder("patrol", "Running")),
            state("Chase", &[("Patrol", "OnEnemyLost")], recorder("chase", "Running")),
        ],
    );
    let mut h = Harness::new(&[("Fsm", tree(root))]);
    h.start("Fsm");

    h.step(0.1);
    h.take_journal();

    h.send("OnEnemySeen");
    // Still delivered to the old state; nothing switches until the next update.
    assert_eq!(h.take_journal(), strings(&["event OnEnemySeen:patrol"]));

    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        strings(&["terminate:patrol", "init:chase", "update#1:chase"])
    );
}

#[test]
fn state_machine_matches_transitions_against_the_pending_state() {
    let root = node(
        "StateMachine",
        [
            state("A", &[("B", "Next")], recorder("a", "Running")),
            state("B", &[("C", "Next")], recorder("b", "Running")),
            state("C", &[], recorder("c", "Running")),
        ],
    );
    let mut h = Harness::new(&[("Fsm", tree(root))]);
    h.start("Fsm");
    h.step(0.1);

    h.send("Next");
    h.send("Next");
    h.take_journal();

    h.step(0.1);
    assert_eq!(
        h.take_journal(),
        strings(&["terminate:a", "init:c", "update#1:c"])
    );
}

#[test]
fn state_machine_reserves_the_last_index() {
    let states = |n: usize| {
        node(
            "StateMachine",
            (0..n).map(|i| state(&format!("S{i}"), &[], XmlNode::new("Halt"))),
        )
    };
    let mut h = Harness::new(&[("Fits", tree(states(254))), ("Wide", tree(states(255)))]);
    assert!(h.manager.load_tree_to_cache("Fits").is_ok());
    match h.manager.load_tree_to_cache("Wide") {
        Err(TreeError::Load { source, .. }) => assert!(matches!(
            source,
            LoadError::TooManyChildren {
                max: 254,
                found: 255,
                ..
            }
        )),
        other => panic!("expected load error, got {other:?}"),
    }
}
