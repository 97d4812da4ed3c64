//! Per-tick execution trail.
//!
//! A runtime pushes an entry when it starts ticking a node and pops it with the node's result.
//! The result is a flat, depth-annotated record of what ran this frame.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DebugStatus {
    Running,
    Success,
    Failure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DebugTreeEntry {
    pub node_id: u32,
    pub line: u32,
    pub depth: u32,
    /// `None` while the node is still on the stack.
    pub status: Option<DebugStatus>,
}

#[derive(Debug, Default, Clone)]
pub struct DebugTree {
    entries: Vec<DebugTreeEntry>,
    stack: Vec<usize>,
}

impl DebugTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node_id: u32, line: u32) {
        let depth = self.stack.len() as u32;
        self.stack.push(self.entries.len());
        self.entries.push(DebugTreeEntry {
            node_id,
            line,
            depth,
            status: None,
        });
    }

    /// Closes the innermost open entry. Unbalanced pops are ignored.
    pub fn pop(&mut self, status: DebugStatus) {
        if let Some(index) = self.stack.pop() {
            self.entries[index].status = Some(status);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.stack.clear();
    }

    pub fn entries(&self) -> &[DebugTreeEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that finished this frame, in the order they were entered.
    pub fn succeeded_and_failed_nodes(&self) -> impl Iterator<Item = &DebugTreeEntry> {
        self.entries.iter().filter(|e| {
            matches!(
                e.status,
                Some(DebugStatus::Success) | Some(DebugStatus::Failure)
            )
        })
    }

    /// One line per finished entry, indented by depth.
    pub fn render_trail(&self) -> String {
        let mut out = String::new();
        for entry in self.succeeded_and_failed_nodes() {
            for _ in 0..entry.depth {
                out.push_str("  ");
            }
            out.push_str(&format!(
                "node#{} (line {}): {:?}\n",
                entry.node_id,
                entry.line,
                entry.status.unwrap_or(DebugStatus::Running)
            ));
        }
        out
    }
}
