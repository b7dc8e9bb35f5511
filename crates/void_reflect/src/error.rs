//! Error types for the reflection runtime

use crate::datum::DatumType;
use crate::scope::ScopeId;
use thiserror::Error;
use void_core::RttiId;

/// Result type for reflection operations
pub type Result<T> = std::result::Result<T, ReflectError>;

/// Errors raised by Datum, Scope, TypeManager and friends
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReflectError {
    /// Element access with a type that disagrees with the datum's type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: DatumType,
        found: DatumType,
    },

    /// Index past the end of a datum or table
    #[error("Index {index} out of range (size {size})")]
    OutOfRange {
        index: usize,
        size: usize,
    },

    /// Operation not allowed in the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Malformed argument, such as an empty attribute key
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Lookup of a missing attribute
    #[error("Attribute '{0}' not found")]
    KeyNotFound(String),

    /// Type id registered twice
    #[error("Type {name} ({id}) is already registered")]
    DuplicateType {
        id: RttiId,
        name: String,
    },

    /// Type id not present in the registry
    #[error("Type {0} is not registered")]
    UnknownType(RttiId),

    /// A scope was asked to adopt itself
    #[error("A scope cannot adopt itself")]
    SelfAdoption,

    /// Adoption would make a scope its own ancestor
    #[error("Adopting {child:?} into {parent:?} would create a cycle")]
    Cycle {
        parent: ScopeId,
        child: ScopeId,
    },

    /// Handle does not name a live scope
    #[error("Scope {0:?} does not exist")]
    UnknownScope(ScopeId),

    /// Factory has no constructor for the class name
    #[error("Class '{0}' has no registered factory")]
    UnknownClass(String),

    /// Factory already has a constructor for the class name
    #[error("Class '{0}' already has a registered factory")]
    DuplicateClass(String),

    /// Text could not be converted into the datum's element type
    #[error("Cannot parse '{text}' as {datum_type}")]
    Parse {
        datum_type: DatumType,
        text: String,
    },

    /// Malformed JSON document
    #[error("JSON error: {0}")]
    Json(String),
}

impl ReflectError {
    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }

    /// True for state failures, adoption self-reference and cycles included
    pub fn is_invalid_operation(&self) -> bool {
        matches!(
            self,
            Self::InvalidOperation(_) | Self::SelfAdoption | Self::Cycle { .. }
        )
    }
}

impl From<serde_json::Error> for ReflectError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e.to_string())
    }
}
