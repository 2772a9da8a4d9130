//! Unified error types for yang-delta.
//!
//! Construction of a [`ConfigTree`](crate::tree::ConfigTree), computation of a
//! [`Delta`](crate::diff::Delta) and applying it are all-or-nothing: every
//! failure is returned to the caller, nothing is retried or partially applied.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for yang-delta operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum DeltaError {
    /// A config element does not resolve to any schema node
    #[error("Schema mismatch at {path}: {reason}")]
    SchemaMismatch { path: String, reason: String },

    /// A list entry lacks one or more of its declared key leaves
    #[error("Key violation at {path}: missing key leaf {}", missing.join(", "))]
    KeyViolation { path: String, missing: Vec<String> },

    /// Two siblings share the same identity (name, key tuple or leaf-list value)
    #[error("Duplicate entry at {path}: not a unique peer")]
    DuplicateEntry { path: String },

    /// Children of more than one case of the same choice are present
    #[error("Choice conflict at {path}: choice '{choice}' has cases {} active", cases.join(", "))]
    ChoiceConflict {
        path: String,
        choice: String,
        cases: Vec<String>,
    },

    /// A delta targets a node that is absent from (or already present in) the tree
    #[error("Delta mismatch at {path}: {reason}")]
    DeltaMismatch { path: String, reason: String },

    /// A leaf value does not parse as its schema type
    #[error("Invalid value '{value}' at {path}: expected {expected}")]
    InvalidValue {
        path: String,
        value: String,
        expected: String,
    },

    /// Errors while compiling a schema document
    #[error("Schema compilation failed: {context}")]
    Schema {
        context: String,
        #[source]
        source: SchemaErrorKind,
    },

    /// Errors while decoding an input document
    #[error("Failed to parse input: {context}")]
    Parse {
        context: String,
        #[source]
        source: ParseErrorKind,
    },

    /// Malformed path expression
    #[error("Invalid query '{expression}': {message}")]
    Query { expression: String, message: String },

    /// Errors while rendering a delta for a transport
    #[error("Encoding failed: {context}")]
    Encode {
        context: String,
        #[source]
        source: EncodeErrorKind,
    },

    /// IO errors with context
    #[error("IO error at {path:?}: {message}")]
    Io {
        path: Option<PathBuf>,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Specific schema compilation error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SchemaErrorKind {
    #[error("Duplicate module namespace: {0}")]
    DuplicateNamespace(String),

    #[error("Duplicate module prefix: {0}")]
    DuplicatePrefix(String),

    #[error("Duplicate schema node: {0}")]
    DuplicateNode(String),

    #[error("List {0} declares no key leaves")]
    MissingKeys(String),

    #[error("Key leaf '{key}' is not a leaf child of list {list}")]
    UnknownKey { list: String, key: String },

    #[error("Node {node} of kind {kind} cannot have children")]
    UnexpectedChildren { node: String, kind: String },

    #[error("Case {0} must be a child of a choice")]
    MisplacedCase(String),

    #[error("Namespace {0} does not belong to any module")]
    UnknownNamespace(String),

    #[error("Invalid default '{value}' for {node}")]
    InvalidDefault { node: String, value: String },
}

/// Specific parse error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ParseErrorKind {
    #[error("Invalid XML structure: {0}")]
    InvalidXml(String),

    #[error("Invalid JSON structure: {0}")]
    InvalidJson(String),

    #[error("Invalid YAML structure: {0}")]
    InvalidYaml(String),

    #[error("No configuration payload found in document")]
    MissingPayload,
}

/// Specific encoding error kinds
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum EncodeErrorKind {
    #[error("XML writer error: {0}")]
    Xml(String),

    #[error("Operation not expressible on this transport: {0}")]
    UnsupportedOperation(String),

    #[error("Namespace {0} is not declared by any module")]
    UnknownNamespace(String),
}

// ============================================================================
// Result type alias
// ============================================================================

/// Convenient Result type for yang-delta operations
pub type Result<T> = std::result::Result<T, DeltaError>;

// ============================================================================
// Error construction helpers
// ============================================================================

impl DeltaError {
    /// Create a schema mismatch error for a config path
    pub fn schema_mismatch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SchemaMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a delta mismatch error for a config path
    pub fn delta_mismatch(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DeltaMismatch {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a schema compilation error with context
    pub fn schema(context: impl Into<String>, source: SchemaErrorKind) -> Self {
        Self::Schema {
            context: context.into(),
            source,
        }
    }

    /// Create a parse error with context
    pub fn parse(context: impl Into<String>, source: ParseErrorKind) -> Self {
        Self::Parse {
            context: context.into(),
            source,
        }
    }

    /// Create an encoding error with context
    pub fn encode(context: impl Into<String>, source: EncodeErrorKind) -> Self {
        Self::Encode {
            context: context.into(),
            source,
        }
    }

    /// Create a query error
    pub fn query(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Query {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Create an IO error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        let message = format!("{source}");
        Self::Io {
            path: Some(path),
            message,
            source,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether this error signals a baseline mismatch between a tree and a delta.
    #[must_use]
    pub const fn is_delta_mismatch(&self) -> bool {
        matches!(self, Self::DeltaMismatch { .. })
    }
}

// ============================================================================
// Conversions from existing error types
// ============================================================================

impl From<std::io::Error> for DeltaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: None,
            message: format!("{err}"),
            source: err,
        }
    }
}

impl From<serde_json::Error> for DeltaError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse(
            "JSON deserialization",
            ParseErrorKind::InvalidJson(err.to_string()),
        )
    }
}

impl From<serde_yaml_ng::Error> for DeltaError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        Self::parse(
            "YAML deserialization",
            ParseErrorKind::InvalidYaml(err.to_string()),
        )
    }
}

impl From<quick_xml::Error> for DeltaError {
    fn from(err: quick_xml::Error) -> Self {
        Self::parse("XML decoding", ParseErrorKind::InvalidXml(err.to_string()))
    }
}

// ============================================================================
// Error context extension trait
// ============================================================================

/// Extension trait for adding context to errors.
///
/// Context strings are prepended to the error's existing context, so a
/// failure deep inside a tree walk reads like
/// `"building config tree: decoding reply: ..."`.
pub trait ErrorContext<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context from a closure, evaluated only on error.
    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>;
}

impl<T, E: Into<DeltaError>> ErrorContext<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        let ctx: String = context.into();
        self.map_err(|e| add_context_to_error(e.into(), &ctx))
    }

    fn with_context<F, C>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: Into<String>,
    {
        self.map_err(|e| {
            let ctx: String = f().into();
            add_context_to_error(e.into(), &ctx)
        })
    }
}

/// Add context to an error, chaining with any existing context.
///
/// Variants that identify a config path keep their path untouched; the
/// context is folded into their reason instead.
fn add_context_to_error(err: DeltaError, new_ctx: &str) -> DeltaError {
    match err {
        DeltaError::Schema { context, source } => DeltaError::Schema {
            context: chain_context(new_ctx, &context),
            source,
        },
        DeltaError::Parse { context, source } => DeltaError::Parse {
            context: chain_context(new_ctx, &context),
            source,
        },
        DeltaError::Encode { context, source } => DeltaError::Encode {
            context: chain_context(new_ctx, &context),
            source,
        },
        DeltaError::SchemaMismatch { path, reason } => DeltaError::SchemaMismatch {
            path,
            reason: chain_context(new_ctx, &reason),
        },
        DeltaError::DeltaMismatch { path, reason } => DeltaError::DeltaMismatch {
            path,
            reason: chain_context(new_ctx, &reason),
        },
        DeltaError::Io {
            path,
            message,
            source,
        } => DeltaError::Io {
            path,
            message: chain_context(new_ctx, &message),
            source,
        },
        DeltaError::Config(msg) => DeltaError::Config(chain_context(new_ctx, &msg)),
        other => other,
    }
}

/// Chain two context strings together.
///
/// If the existing context is empty, returns just the new context.
/// Otherwise, returns "`new_context`: `existing_context`".
fn chain_context(new: &str, existing: &str) -> String {
    if existing.is_empty() {
        new.to_string()
    } else {
        format!("{new}: {existing}")
    }
}

/// Extension trait for Option types to convert to errors with context.
pub trait OptionContext<T> {
    /// Convert None to a delta mismatch at the given path.
    fn or_mismatch(self, path: &str, reason: &str) -> Result<T>;
}

impl<T> OptionContext<T> for Option<T> {
    fn or_mismatch(self, path: &str, reason: &str) -> Result<T> {
        self.ok_or_else(|| DeltaError::delta_mismatch(path, reason))
    }
}
