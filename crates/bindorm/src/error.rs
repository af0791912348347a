//! Error types for bindorm

use serde::Serialize;
use thiserror::Error;

/// Result type alias for bindorm operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Error types for statement building, compilation, resolution and execution
#[derive(Debug, Clone, Error)]
pub enum OrmError {
    /// Caller misuse of the builder API (bad column, operator, empty data, ...)
    #[error("Invalid argument: {0}")]
    Argument(String),

    /// Internally inconsistent statement state
    #[error("Invalid statement state: {0}")]
    State(String),

    /// Model class lookup failure
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// Database connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Query execution error reported by the connection
    #[error("Query error: {0}")]
    Query(String),

    /// Row not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl OrmError {
    /// Create an argument error
    pub fn argument(message: impl Into<String>) -> Self {
        Self::Argument(message.into())
    }

    /// Create a state error
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Check if this is an argument error
    pub fn is_argument(&self) -> bool {
        matches!(self, Self::Argument(_))
    }

    /// Check if this is a state error
    pub fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// The resolution diagnostic, if this is a resolution error.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Resolution(err) => Some(err.diagnostic()),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for OrmError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for OrmError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return Self::Connection(err.to_string());
        }
        Self::Query(err.to_string())
    }
}

/// Phase of model class resolution at which a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPhase {
    /// Mapping the input (table, alias or class name) to a class name.
    Lookup,
    /// Running the host class loader.
    Load,
    /// Checking the loaded class is an entity class.
    Validate,
}

/// Machine-readable context attached to every resolution failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// The value handed to the resolver.
    pub input: String,
    pub phase: ResolutionPhase,
    /// Class name the input resolved to, if it got that far.
    pub resolved: Option<String>,
    /// Base type the resolved class was expected to derive from.
    pub expected: Option<String>,
}

impl Diagnostic {
    pub fn new(input: impl Into<String>, phase: ResolutionPhase) -> Self {
        Self {
            input: input.into(),
            phase,
            resolved: None,
            expected: None,
        }
    }

    pub fn resolved(mut self, name: impl Into<String>) -> Self {
        self.resolved = Some(name.into());
        self
    }

    pub fn expected(mut self, base: impl Into<String>) -> Self {
        self.expected = Some(base.into());
        self
    }
}

/// Model class resolution failures.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// No strategy produced a loadable class.
    #[error("Model class not found for '{}'", .0.input)]
    NotFound(Diagnostic),

    /// Resolution of a name was triggered while that same name was already being resolved.
    #[error("Re-entrant class resolution detected for '{}'", .0.input)]
    Reentrant(Diagnostic),

    /// The resolved class is not an entity class.
    #[error("Resolved class for '{}' is not a model class", .0.input)]
    TypeMismatch(Diagnostic),
}

impl ResolutionError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            Self::NotFound(d) | Self::Reentrant(d) | Self::TypeMismatch(d) => d,
        }
    }

    pub fn is_reentrant(&self) -> bool {
        matches!(self, Self::Reentrant(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Self::TypeMismatch(_))
    }
}
