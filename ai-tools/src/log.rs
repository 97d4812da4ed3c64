use std::collections::VecDeque;

/// Bounded history of human-readable messages written by behavior nodes.
///
/// Oldest messages are dropped once `capacity` is reached. A capacity of 0 keeps nothing.
#[derive(Debug, Clone)]
pub struct BehaviorLog {
    messages: VecDeque<String>,
    capacity: usize,
}

impl Default for BehaviorLog {
    fn default() -> Self {
        Self::with_capacity(64)
    }
}

impl BehaviorLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn add_message(&mut self, message: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.messages.len() >= self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(message.into());
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}
