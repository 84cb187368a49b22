//! # Error Types
//!
//! Two classes of failure, handled differently:
//!
//! - [`SchemaError`] / [`AttributeError`]: the input could not be decoded
//!   into a [`Schema`](crate::Schema). Fatal: decoding stops at the first
//!   malformed node and no partial schema is returned.
//! - [`Violation`] collected into an [`ErrorList`]: the schema decoded
//!   fine but is inconsistent. Never fatal on its own; every violation is
//!   gathered before the report is handed back.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Error while reading, decoding or encoding a models document.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The document is not a well-formed models schema.
    #[error("decoding models: {0}")]
    Decode(#[source] serde_yaml::Error),

    /// The schema could not be written back out as YAML.
    #[error("encoding models: {0}")]
    Encode(#[source] serde_yaml::Error),

    /// IO error reading the document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error decoding a single attribute node.
///
/// These surface to callers wrapped inside [`SchemaError::Decode`], where
/// the YAML layer adds the document path and source line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttributeError {
    /// The node is neither a bare type name nor an object.
    #[error("field object without type: expected a type name or an object, found {found}")]
    NotAnObject {
        /// Kind of YAML node that was found instead.
        found: &'static str,
    },

    /// The node is an object but has no string `type` key.
    #[error("field object without type")]
    MissingType,

    /// The object is tagged with a known kind but its body is malformed.
    #[error("invalid object of type {type_tag}: {source}")]
    InvalidObject {
        /// The `type` tag of the offending object.
        type_tag: String,
        /// What was wrong with it.
        #[source]
        source: Box<AttributeError>,
    },

    /// A `to: collection/field` shorthand without exactly one `/`.
    #[error("invalid value of `to`, expected one `/`: {0}")]
    ToShorthand(String),

    /// A required key is absent.
    #[error("missing key `{0}`")]
    MissingKey(&'static str),

    /// A key holds a node of the wrong kind.
    #[error("`{key}` must be {expected}, found {found}")]
    WrongShape {
        /// Key whose value is malformed.
        key: &'static str,
        /// Human-readable description of the accepted shapes.
        expected: &'static str,
        /// Kind of YAML node that was found instead.
        found: &'static str,
    },

    /// The nested attribute of a template failed to decode.
    #[error("in `fields`: {0}")]
    Fields(Box<AttributeError>),
}

/// A single validation finding.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The attribute's type tag is in neither vocabulary.
    #[error("Unknown type `{type_tag}` in {model}/{attribute}")]
    UnknownType {
        model: String,
        attribute: String,
        type_tag: String,
    },

    /// A relation points at a model that is not in the schema.
    #[error("{model}/{attribute} directs to nonexisting model `{collection}`")]
    MissingModel {
        model: String,
        attribute: String,
        collection: String,
    },

    /// A relation points at a model that lacks the target field.
    #[error("{model}/{attribute} directs to nonexisting modelfield `{collection}/{field}`")]
    MissingField {
        model: String,
        attribute: String,
        collection: String,
        field: String,
    },
}

/// One child of an [`ErrorList`]: a finding, or a nested report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Violation(Violation),
    List(ErrorList),
}

impl From<Violation> for Entry {
    fn from(v: Violation) -> Self {
        Entry::Violation(v)
    }
}

impl From<ErrorList> for Entry {
    fn from(list: ErrorList) -> Self {
        Entry::List(list)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Violation(v) => write!(f, "{v}"),
            Entry::List(list) => write!(f, "{list}"),
        }
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Violation(v) => {
                let mut s = serializer.serialize_struct("Violation", 2)?;
                s.serialize_field("message", &v.to_string())?;
                s.serialize_field("detail", v)?;
                s.end()
            }
            Entry::List(list) => list.serialize(serializer),
        }
    }
}

/// A named, nestable list of validation errors.
///
/// Rendering: an optional `"<name>:\n"` header followed by one line per
/// child, each prefixed by `indent` spaces and `"* "`. Nested lists are
/// embedded verbatim after the marker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorList {
    name: String,
    #[serde(skip)]
    indent: usize,
    errors: Vec<Entry>,
}

impl ErrorList {
    /// Create an empty list. Use an empty `name` for an anonymous report.
    pub fn new(name: impl Into<String>, indent: usize) -> Self {
        Self {
            name: name.into(),
            indent,
            errors: Vec::new(),
        }
    }

    /// Add a finding or a nested report.
    pub fn append(&mut self, err: impl Into<Entry>) {
        self.errors.push(err.into());
    }

    /// Add the error of `result`, if there is one.
    pub fn append_result(&mut self, result: Result<(), ErrorList>) {
        if let Err(list) = result {
            self.append(list);
        }
    }

    /// Returns true if nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of direct children.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Direct children, in insertion order.
    pub fn entries(&self) -> &[Entry] {
        &self.errors
    }

    /// All findings in this list and every nested list, depth first.
    pub fn violations(&self) -> Vec<&Violation> {
        let mut out = Vec::new();
        self.collect_violations(&mut out);
        out
    }

    fn collect_violations<'a>(&'a self, out: &mut Vec<&'a Violation>) {
        for entry in &self.errors {
            match entry {
                Entry::Violation(v) => out.push(v),
                Entry::List(list) => list.collect_violations(out),
            }
        }
    }

    /// `Ok(())` when empty, otherwise the list itself as the error.
    pub fn into_result(self) -> Result<(), ErrorList> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.name.is_empty() {
            writeln!(f, "{}:", self.name)?;
        }
        let pad = " ".repeat(self.indent);
        for (i, entry) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{pad}* {entry}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ErrorList {}
