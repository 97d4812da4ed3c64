//! Behavior tree manager configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Manager settings, usually loaded from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Directories searched for tree descriptions, highest priority first
    #[serde(default = "default_search_paths")]
    pub search_paths: Vec<PathBuf>,

    /// Extension of tree description files, without the dot
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Log events sent to agents that run no tree
    pub log_dropped_events: bool,

    /// Record the execution trail of every tick and log it when a root finishes
    pub debug_execution_stack: bool,

    /// Install a trace log in every new instance's blackboard
    pub record_trace: bool,

    /// Messages kept per instance by `Log` nodes
    #[serde(default = "default_behavior_log_capacity")]
    pub behavior_log_capacity: usize,
}

fn default_search_paths() -> Vec<PathBuf> {
    vec![
        PathBuf::from("Scripts/AI/BehaviorTrees"),
        PathBuf::from("Libs/AI/BehaviorTrees"),
        PathBuf::from("Libs/AI/BehaviorTrees/Shared"),
    ]
}
fn default_file_extension() -> String {
    "yaml".to_string()
}
fn default_behavior_log_capacity() -> usize {
    64
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            search_paths: default_search_paths(),
            file_extension: default_file_extension(),
            log_dropped_events: false,
            debug_execution_stack: false,
            record_trace: false,
            behavior_log_capacity: default_behavior_log_capacity(),
        }
    }
}

impl ManagerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Resolve search paths relative to a content root
    pub fn resolve_paths(&mut self, root: &Path) {
        for path in &mut self.search_paths {
            *path = root.join(&*path);
        }
    }
}
