use ai_core::NameHash;

use crate::error::LoadError;
use crate::node::LoadResult;
use crate::xml::XmlNode;

pub type TimestampId = NameHash;

#[derive(Debug, Clone, PartialEq)]
pub struct Timestamp {
    pub id: TimestampId,
    pub name: String,
    pub set_on_event: NameHash,
    /// Setting this timestamp clears the one named here.
    pub exclusive_to: Option<TimestampId>,
    /// Manager clock value of the last time the timestamp was set.
    pub value: Option<f64>,
}

/// Named "last happened at" marks driven by events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimestampCollection {
    timestamps: Vec<Timestamp>,
}

impl TimestampCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a `Timestamps` section: `Timestamp(name, setOnEvent, exclusiveTo?)` children.
    pub fn load_from_xml(&mut self, xml: &XmlNode) -> LoadResult {
        let mut exclusions = Vec::new();
        for child in &xml.children {
            if !child.is_tag("Timestamp") {
                return Err(LoadError::unexpected(xml, child));
            }
            let name = child.required_attr("name")?;
            let event = child.required_attr("setOnEvent")?;
            let id = NameHash::of(name);
            if self.contains(id) {
                return Err(LoadError::Duplicate {
                    line: child.line,
                    what: "timestamp",
                    name: name.to_string(),
                });
            }
            if let Some(other) = child.attr("exclusiveTo") {
                exclusions.push((id, other.to_string(), child.line));
            }
            self.timestamps.push(Timestamp {
                id,
                name: name.to_string(),
                set_on_event: NameHash::of(event),
                exclusive_to: None,
                value: None,
            });
        }

        for (id, other, line) in exclusions {
            let other_id = NameHash::of(&other);
            if !self.contains(other_id) {
                return Err(LoadError::UnknownTimestamp { line, name: other });
            }
            if let Some(ts) = self.timestamps.iter_mut().find(|t| t.id == id) {
                ts.exclusive_to = Some(other_id);
            }
        }
        Ok(())
    }

    pub fn contains(&self, id: TimestampId) -> bool {
        self.timestamps.iter().any(|t| t.id == id)
    }

    pub fn get(&self, id: TimestampId) -> Option<&Timestamp> {
        self.timestamps.iter().find(|t| t.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timestamp> {
        self.timestamps.iter()
    }

    pub fn has_been_set(&self, id: TimestampId) -> bool {
        self.get(id).is_some_and(|t| t.value.is_some())
    }

    /// Seconds since `id` was last set; `None` if never set or unknown.
    pub fn elapsed_since(&self, id: TimestampId, now: f64) -> Option<f64> {
        self.get(id)?.value.map(|at| now - at)
    }

    pub fn set(&mut self, id: TimestampId, now: f64) {
        let mut cleared = None;
        if let Some(ts) = self.timestamps.iter_mut().find(|t| t.id == id) {
            ts.value = Some(now);
            cleared = ts.exclusive_to;
        }
        if let Some(other) = cleared {
            self.clear(other);
        }
    }

    pub fn clear(&mut self, id: TimestampId) {
        if let Some(ts) = self.timestamps.iter_mut().find(|t| t.id == id) {
            ts.value = None;
        }
    }

    /// Sets every timestamp bound to `event`.
    pub fn handle_event(&mut self, event: NameHash, now: f64) {
        let ids: Vec<TimestampId> = self
            .timestamps
            .iter()
            .filter(|t| t.set_on_event == event)
            .map(|t| t.id)
            .collect();
        for id in ids {
            self.set(id, now);
        }
    }
}

/// Countdown against the manager clock.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Timer {
    started_at: f64,
    duration: f64,
}

impl Timer {
    pub fn start(now: f64, duration: f64) -> Self {
        Self {
            started_at: now,
            duration: duration.max(0.0),
        }
    }

    pub fn is_elapsed(&self, now: f64) -> bool {
        now - self.started_at >= self.duration
    }

    pub fn remaining(&self, now: f64) -> f64 {
        (self.duration - (now - self.started_at)).max(0.0)
    }
}
