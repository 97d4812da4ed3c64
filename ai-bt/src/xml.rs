//! In-memory tree description.
//!
//! Descriptions are trees of `(tag, attributes, ordered children)` elements. On disk they are YAML
//! documents mirroring [`XmlNode`] field by field:
//!
//! ```yaml
//! tag: BehaviorTree
//! children:
//!   - tag: Root
//!     children:
//!       - tag: Wait
//!         attributes: { duration: 0.5 }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::LoadError;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct XmlNode {
    pub tag: String,
    #[serde(
        default,
        deserialize_with = "scalar_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<XmlNode>,
    /// 1-based position of the element in document order, used in diagnostics.
    #[serde(default, skip_serializing)]
    pub line: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

fn scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Scalar>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let v = match v {
                Scalar::Bool(b) => b.to_string(),
                Scalar::Int(i) => i.to_string(),
                Scalar::Float(f) => f.to_string(),
                Scalar::Str(s) => s,
            };
            (k, v)
        })
        .collect())
}

impl XmlNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.attributes.insert(name.into(), value.to_string());
        self
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = XmlNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Parses a YAML description and numbers its elements.
    pub fn from_yaml_str(text: &str) -> Result<Self, serde_yaml::Error> {
        let mut root: XmlNode = serde_yaml::from_str(text)?;
        root.number_lines();
        Ok(root)
    }

    /// Assigns document-order positions to every element that has none yet.
    pub fn number_lines(&mut self) {
        fn walk(node: &mut XmlNode, next: &mut u32) {
            if node.line == 0 {
                node.line = *next;
            }
            *next += 1;
            for child in &mut node.children {
                walk(child, next);
            }
        }
        let mut next = 1;
        walk(self, &mut next);
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag == tag
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn find_child(&self, tag: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.is_tag(tag))
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn required_attr(&self, name: &str) -> Result<&str, LoadError> {
        self.attr(name)
            .ok_or_else(|| LoadError::missing_attribute(self, name))
    }

    pub fn attr_bool(&self, name: &str) -> Result<Option<bool>, LoadError> {
        let Some(raw) = self.attr(name) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            _ => Err(LoadError::invalid_attribute(self, name, raw)),
        }
    }

    pub fn attr_f32(&self, name: &str) -> Result<Option<f32>, LoadError> {
        self.parse_attr(name)
    }

    pub fn attr_u32(&self, name: &str) -> Result<Option<u32>, LoadError> {
        self.parse_attr(name)
    }

    pub fn attr_i32(&self, name: &str) -> Result<Option<i32>, LoadError> {
        self.parse_attr(name)
    }

    fn parse_attr<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>, LoadError> {
        match self.attr(name) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| LoadError::invalid_attribute(self, name, raw)),
        }
    }

    /// Fails unless the element has exactly `n` children.
    pub fn expect_children(&self, n: usize, expected: &'static str) -> Result<(), LoadError> {
        if self.children.len() == n {
            Ok(())
        } else {
            Err(LoadError::child_count(self, expected))
        }
    }
}
