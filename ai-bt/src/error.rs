use std::path::PathBuf;

use ai_core::EntityId;

use crate::xml::XmlNode;

/// Structural problem found while building a tree from its description.
///
/// Any of these aborts construction of the enclosing template. `line` is the element's position
/// in the description (see [`XmlNode::line`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("line {line}: unknown node type '{tag}'")]
    UnknownNodeType { line: u32, tag: String },

    #[error("line {line}: '{tag}' expects {expected} child(ren), found {found}")]
    ChildCount {
        line: u32,
        tag: String,
        expected: &'static str,
        found: usize,
    },

    #[error("line {line}: '{tag}' supports at most {max} children, found {found}")]
    TooManyChildren {
        line: u32,
        tag: String,
        max: usize,
        found: usize,
    },

    #[error("line {line}: '{tag}' is missing attribute '{attribute}'")]
    MissingAttribute {
        line: u32,
        tag: String,
        attribute: String,
    },

    #[error("line {line}: '{tag}' has invalid {attribute}=\"{value}\"")]
    InvalidAttribute {
        line: u32,
        tag: String,
        attribute: String,
        value: String,
    },

    #[error("line {line}: could not parse condition \"{expression}\": {reason}")]
    Condition {
        line: u32,
        expression: String,
        reason: String,
    },

    #[error("line {line}: unknown variable '{name}'")]
    UnknownVariable { line: u32, name: String },

    #[error("line {line}: unknown state '{name}'")]
    UnknownState { line: u32, name: String },

    #[error("line {line}: unknown timestamp '{name}'")]
    UnknownTimestamp { line: u32, name: String },

    #[error("line {line}: duplicate {what} '{name}'")]
    Duplicate {
        line: u32,
        what: &'static str,
        name: String,
    },

    #[error("line {line}: '{tag}' is missing its '{section}' section")]
    MissingSection {
        line: u32,
        tag: String,
        section: &'static str,
    },

    #[error("line {line}: unexpected '{tag}' inside '{parent}'")]
    UnexpectedElement {
        line: u32,
        parent: String,
        tag: String,
    },
}

impl LoadError {
    pub fn child_count(xml: &XmlNode, expected: &'static str) -> Self {
        Self::ChildCount {
            line: xml.line,
            tag: xml.tag.clone(),
            expected,
            found: xml.children.len(),
        }
    }

    pub fn too_many_children(xml: &XmlNode, max: usize) -> Self {
        Self::TooManyChildren {
            line: xml.line,
            tag: xml.tag.clone(),
            max,
            found: xml.children.len(),
        }
    }

    pub fn missing_attribute(xml: &XmlNode, attribute: &str) -> Self {
        Self::MissingAttribute {
            line: xml.line,
            tag: xml.tag.clone(),
            attribute: attribute.to_string(),
        }
    }

    pub fn invalid_attribute(xml: &XmlNode, attribute: &str, value: &str) -> Self {
        Self::InvalidAttribute {
            line: xml.line,
            tag: xml.tag.clone(),
            attribute: attribute.to_string(),
            value: value.to_string(),
        }
    }

    pub fn unexpected(parent: &XmlNode, child: &XmlNode) -> Self {
        Self::UnexpectedElement {
            line: child.line,
            parent: parent.tag.clone(),
            tag: child.tag.clone(),
        }
    }

    pub fn line(&self) -> u32 {
        match self {
            Self::UnknownNodeType { line, .. }
            | Self::ChildCount { line, .. }
            | Self::TooManyChildren { line, .. }
            | Self::MissingAttribute { line, .. }
            | Self::InvalidAttribute { line, .. }
            | Self::Condition { line, .. }
            | Self::UnknownVariable { line, .. }
            | Self::UnknownState { line, .. }
            | Self::UnknownTimestamp { line, .. }
            | Self::Duplicate { line, .. }
            | Self::MissingSection { line, .. }
            | Self::UnexpectedElement { line, .. } => *line,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    #[error("node type '{0}' is already registered")]
    DuplicateNodeType(String),

    #[error("{0} runtime data block(s) still outstanding")]
    OutstandingRuntimeData(usize),
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Failure of a manager entry point.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    #[error("behavior tree '{0}' was not found in any source")]
    NotFound(String),

    #[error("behavior tree '{tree}' could not be read")]
    Source {
        tree: String,
        #[source]
        source: SourceError,
    },

    #[error("behavior tree '{tree}' failed to load: {source}")]
    Load {
        tree: String,
        #[source]
        source: LoadError,
    },

    #[error("{0} has no active graft node")]
    NoActiveGraftNode(EntityId),

    #[error("{0} already has a pending graft mode request")]
    GraftModeAlreadyRequested(EntityId),
}
