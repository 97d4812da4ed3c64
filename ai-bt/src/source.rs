use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::SourceError;
use crate::xml::XmlNode;

/// Resolves a tree name to its description.
///
/// `Ok(None)` means "not here, try the next source".
pub trait TreeSource {
    fn load(&self, name: &str) -> Result<Option<XmlNode>, SourceError>;
}

/// Reads `<root>/<name>.<extension>`, trying the name as given and then lowercased.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    extension: String,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
        }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let exact = self.root.join(format!("{name}.{}", self.extension));
        let lower = self
            .root
            .join(format!("{}.{}", name.to_ascii_lowercase(), self.extension));
        if exact == lower {
            vec![exact]
        } else {
            vec![exact, lower]
        }
    }
}

impl TreeSource for DirectorySource {
    fn load(&self, name: &str) -> Result<Option<XmlNode>, SourceError> {
        for path in self.candidates(name) {
            if !path.is_file() {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;
            let xml = XmlNode::from_yaml_str(&text)
                .map_err(|source| SourceError::Parse { path, source })?;
            return Ok(Some(xml));
        }
        Ok(None)
    }
}

/// In-memory descriptions keyed by lowercased name.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    trees: BTreeMap<String, XmlNode>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, mut xml: XmlNode) {
        xml.number_lines();
        self.trees.insert(name.to_ascii_lowercase(), xml);
    }

    pub fn with_tree(mut self, name: &str, xml: XmlNode) -> Self {
        self.insert(name, xml);
        self
    }

    /// Parses and stores a YAML description.
    pub fn insert_yaml(&mut self, name: &str, text: &str) -> Result<(), SourceError> {
        let xml = XmlNode::from_yaml_str(text).map_err(|source| SourceError::Parse {
            path: PathBuf::from(name),
            source,
        })?;
        self.insert(name, xml);
        Ok(())
    }
}

impl TreeSource for MemorySource {
    fn load(&self, name: &str) -> Result<Option<XmlNode>, SourceError> {
        Ok(self.trees.get(&name.to_ascii_lowercase()).cloned())
    }
}
