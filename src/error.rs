//! Error types for keyconf.
//!
//! Uses thiserror for derive macros. Engine-level failures are modelled as
//! [`ConfigError`] kinds that bubble up through resolution and conversion;
//! every public build entry point wraps them in a [`BuildError`] that names the
//! configuration type and the field path being built.

use crate::exit_codes;
use std::fmt;
use thiserror::Error;

/// A dependency chain that re-entered one of its own nodes.
///
/// `chain` holds the nodes in visitation order; the display form repeats the
/// re-entered node at the end (`A -> B -> A`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircularDependency {
    pub chain: Vec<String>,
    pub reentered: String,
}

impl fmt::Display for CircularDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.chain {
            write!(f, "{} -> ", node)?;
        }
        write!(f, "{}", self.reentered)
    }
}

/// A raw string could not become the requested type.
#[derive(Error, Debug)]
#[error("cannot convert '{value}' to {type_name}: {reason}")]
pub struct ConversionError {
    pub value: String,
    pub type_name: String,
    pub reason: String,
    /// Underlying failure from a user-supplied converter or factory.
    pub cause: Option<anyhow::Error>,
}

impl ConversionError {
    pub fn new(value: &str, type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            type_name: type_name.into(),
            reason: reason.into(),
            cause: None,
        }
    }

    /// Conversion failed inside a user-supplied function.
    pub fn caused_by(value: &str, type_name: impl Into<String>, cause: anyhow::Error) -> Self {
        Self {
            value: value.to_string(),
            type_name: type_name.into(),
            reason: format!("{:#}", cause),
            cause: Some(cause),
        }
    }

    pub fn unsupported(value: &str, type_name: &str) -> Self {
        Self::new(
            value,
            type_name,
            format!(
                "unsupported type '{}'; register a custom converter for it",
                type_name
            ),
        )
    }
}

/// Why a constraint rejected a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationDetail {
    pub constraint: String,
    pub message: String,
}

impl ViolationDetail {
    pub fn new(constraint: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            constraint: constraint.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ViolationDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.constraint, self.message)
    }
}

/// Failure kinds raised while resolving, converting or constructing.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The schema itself is malformed.
    #[error("declaration error: {0}")]
    Declaration(String),

    #[error("circular dependency: {0}")]
    CircularDependency(CircularDependency),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("constraint violated on '{field}': {detail}")]
    ConstraintViolation {
        field: String,
        detail: ViolationDetail,
    },

    /// No source value and no default for a non-primitive field.
    #[error("no value for key '{key}' and no default declared")]
    MissingValue { key: String },

    #[error("construction failed: {0:#}")]
    Construction(anyhow::Error),
}

impl ConfigError {
    pub fn declaration(message: impl Into<String>) -> Self {
        ConfigError::Declaration(message.into())
    }
}

/// The error every public build entry point surfaces.
#[derive(Error, Debug)]
#[error("failed to build {config_type}{}: {cause}", path_suffix(.path))]
pub struct BuildError {
    pub config_type: String,
    /// Dotted logical path of the field or group that failed; empty for the
    /// configuration object as a whole.
    pub path: String,
    #[source]
    pub cause: ConfigError,
}

fn path_suffix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" at '{}'", path)
    }
}

impl BuildError {
    pub fn new(config_type: impl Into<String>, path: impl Into<String>, cause: ConfigError) -> Self {
        Self {
            config_type: config_type.into(),
            path: path.into(),
            cause,
        }
    }
}

/// Raw source loading failures.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse YAML source: {0}")]
    Yaml(String),
}

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Error type for the keyconf command line.
#[derive(Error, Debug)]
pub enum KeyconfError {
    /// User provided invalid arguments or unreadable inputs.
    #[error("{0}")]
    UserError(String),

    /// A schema or options file is malformed.
    #[error("Invalid schema: {0}")]
    SchemaError(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Build(#[from] BuildError),
}

impl KeyconfError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            KeyconfError::UserError(_) | KeyconfError::Source(_) => exit_codes::USER_ERROR,
            KeyconfError::SchemaError(_) => exit_codes::DECLARATION_FAILURE,
            KeyconfError::Build(err) => match err.cause {
                ConfigError::Declaration(_) | ConfigError::CircularDependency(_) => {
                    exit_codes::DECLARATION_FAILURE
                }
                _ => exit_codes::BUILD_FAILURE,
            },
        }
    }
}
