//! Error types for loading, registry checks and transforms.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Category of a data validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The value's JSON kind does not match a primitive, array or object shape.
    TypeMismatch,
    /// A string outside an enum's case set.
    EnumMismatch,
    /// No union alternative accepted the value.
    UnionExhausted,
    /// A declared field that does not tolerate absence is missing.
    MissingRequiredField,
    /// A closed object received a key it does not declare.
    UnexpectedField,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::EnumMismatch => "enum mismatch",
            ErrorKind::UnionExhausted => "no union alternative matched",
            ErrorKind::MissingRequiredField => "missing required field",
            ErrorKind::UnexpectedField => "unexpected field",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single validation failure with location context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    /// JSON Pointer (RFC 6901) to the offending value, relative to the document root.
    pub path: String,
    /// Field or map key holding the value, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    /// Name of the enclosing type, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Summary of the shape that was expected.
    pub expected: String,
    /// The value that was found; `None` for a missing field.
    pub actual: Option<Value>,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ErrorKind::MissingRequiredField => f.write_str("missing required field")?,
            ErrorKind::UnexpectedField => f.write_str("unexpected field")?,
            _ => f.write_str("invalid value")?,
        }
        if !self.path.is_empty() {
            write!(f, " at {}", self.path)?;
        }
        if let Some(key) = &self.key {
            write!(f, " for key \"{key}\"")?;
        }
        if let Some(parent) = &self.parent {
            write!(f, " on {parent}")?;
        }
        write!(f, ": expected {}, got ", self.expected)?;
        match &self.actual {
            Some(value) => write!(f, "{value}"),
            None => f.write_str("nothing"),
        }
    }
}

/// Errors from a transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The document does not match the schema.
    #[error("{0}")]
    Invalid(Box<Diagnostic>),

    /// The schema graph references a type that was never registered.
    #[error("unknown type \"{name}\": no descriptor registered under this name")]
    UnknownType { name: String },
}

impl TransformError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            TransformError::Invalid(d) => Some(d),
            TransformError::UnknownType { .. } => None,
        }
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.diagnostic().map(|d| d.kind)
    }

    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            TransformError::Invalid(_) => 1,
            TransformError::UnknownType { .. } => 2,
        }
    }
}

impl From<Diagnostic> for TransformError {
    fn from(diagnostic: Diagnostic) -> Self {
        TransformError::Invalid(Box::new(diagnostic))
    }
}

/// Errors reading documents or registry files.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}

/// A defect in a schema registry found by [`SchemaRegistry::check`](crate::SchemaRegistry::check).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum RegistryIssue {
    #[error("{type_name}{path}: reference to unknown type \"{target}\"")]
    DanglingRef {
        type_name: String,
        /// Location of the reference inside the referring descriptor.
        path: String,
        target: String,
    },

    #[error("{type_name}: {side} field name \"{field}\" is declared more than once")]
    DuplicateField {
        type_name: String,
        side: &'static str,
        field: String,
    },

    /// `chain` starts at `type_name` and ends with the name that repeats.
    #[error("{type_name}: type reaches itself without reading input ({})", chain.join(" -> "))]
    AliasCycle {
        type_name: String,
        chain: Vec<String>,
    },
}

/// Errors building or checking a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("schema registry has {} problem(s)", issues.len())]
    Invalid { issues: Vec<RegistryIssue> },
}

impl RegistryError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RegistryError::Load(e) => e.exit_code(),
            RegistryError::Invalid { .. } => 2,
        }
    }
}

/// Errors from the text-level convert helpers.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error("cannot serialize output: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl ConvertError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConvertError::Load(e) => e.exit_code(),
            ConvertError::Transform(e) => e.exit_code(),
            ConvertError::Serialize(_) => 2,
        }
    }
}

/// Errors during JSON Schema validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error("invalid schema: {message}")]
    Schema { message: String },

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: Vec<SchemaError> },
}

/// Single JSON Schema validation error with path context.
#[derive(Debug, Clone, Serialize)]
pub struct SchemaError {
    /// JSON Pointer (RFC 6901) to the invalid field.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Schema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}
