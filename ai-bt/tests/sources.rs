mod common;

use std::fs;

use ai_bt::{
    BehaviorTreeManager, DirectorySource, ManagerConfig, MemorySource, SourceError, TreeError,
    TreeSource,
};
use common::AGENT;
use tempfile::TempDir;

const PATROL: &str = r#"
tag: BehaviorTree
children:
  - tag: Variables
    children:
      - tag: Variable
        attributes: { name: Alert, default: false }
  - tag: Root
    children:
      - tag: Sequence
        children:
          - tag: AssertCondition
            attributes: { condition: "!Alert" }
          - tag: Wait
            attributes: { duration: 0.5, variation: 0.1 }
"#;

#[test]
fn directory_source_reads_yaml_descriptions() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("patrol.yaml"), PATROL).expect("write");

    let source = DirectorySource::new(dir.path(), "yaml");
    let xml = source.load("Patrol").expect("read").expect("found");
    assert_eq!(xml.tag, "BehaviorTree");
    assert_eq!(xml.line, 1);

    let wait = &xml.children[1].children[0].children[1];
    assert_eq!(wait.tag, "Wait");
    assert_eq!(wait.attr("duration"), Some("0.5"));
    assert_eq!(wait.line, 7);

    assert!(source.load("Missing").expect("read").is_none());
}

#[test]
fn directory_source_reports_parse_errors() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("broken.yaml"), "tag: [unterminated").expect("write");

    let source = DirectorySource::new(dir.path(), "yaml");
    assert!(matches!(
        source.load("broken"),
        Err(SourceError::Parse { .. })
    ));
}

#[test]
fn manager_searches_configured_paths_in_order() {
    let root = TempDir::new().expect("tempdir");
    let primary = root.path().join("Scripts/AI/BehaviorTrees");
    let shared = root.path().join("Libs/AI/BehaviorTrees/Shared");
    fs::create_dir_all(&primary).expect("mkdir");
    fs::create_dir_all(&shared).expect("mkdir");
    fs::write(shared.join("patrol.yaml"), PATROL).expect("write");

    let mut config = ManagerConfig::default();
    config.resolve_paths(root.path());
    let mut manager = BehaviorTreeManager::new(config);

    manager
        .start_modular_behavior_tree(AGENT, "Patrol")
        .expect("found in shared path");
    assert!(manager.is_running(AGENT));

    let broken = primary.join("broken.yaml");
    fs::write(&broken, "children: 3").expect("write");
    assert!(matches!(
        manager.load_tree_to_cache("broken"),
        Err(TreeError::Source { .. })
    ));
}

#[test]
fn memory_source_accepts_yaml() {
    let mut source = MemorySource::new();
    source.insert_yaml("Patrol", PATROL).expect("parse");

    let mut manager = BehaviorTreeManager::with_sources(
        ManagerConfig::default(),
        vec![Box::new(source)],
    );
    let template = manager.load_tree_to_cache("PATROL").expect("load");
    assert_eq!(template.declarations().len(), 1);
}

#[test]
fn config_loads_with_defaults_for_missing_fields() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("bt.yaml");
    fs::write(
        &path,
        "log_dropped_events: true\nsearch_paths:\n  - Trees\nbehavior_log_capacity: 8\n",
    )
    .expect("write");

    let config = ManagerConfig::load(&path).expect("load config");
    assert!(config.log_dropped_events);
    assert!(!config.debug_execution_stack);
    assert_eq!(config.search_paths, vec![std::path::PathBuf::from("Trees")]);
    assert_eq!(config.file_extension, "yaml");
    assert_eq!(config.behavior_log_capacity, 8);
}

#[test]
fn config_load_reports_the_path() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("missing.yaml");
    let err = ManagerConfig::load(&path).unwrap_err();
    assert!(err.to_string().contains("missing.yaml"));
}
