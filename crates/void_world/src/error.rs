//! Error types for the scene graph

use thiserror::Error;
use void_reflect::{DatumType, ReflectError, ScopeId};

/// Result type for world operations
pub type Result<T> = std::result::Result<T, WorldError>;

/// Scene graph errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WorldError {
    /// Failure in the underlying scope tree
    #[error(transparent)]
    Reflect(#[from] ReflectError),

    /// A scope that was expected to be of a given kind is not
    #[error("{scope:?} is not a {expected}")]
    WrongKind {
        scope: ScopeId,
        expected: &'static str,
    },

    /// An action that needs a parent has none
    #[error("Action {0:?} is not attached to a parent")]
    Detached(ScopeId),

    /// No behavior is registered for the scope's type or any of its bases
    #[error("No behavior for action type {0}")]
    NoBehavior(String),

    /// A named attribute could not be found from the action
    #[error("Action {action:?} could not resolve '{target}'")]
    UnresolvedTarget {
        action: ScopeId,
        target: String,
    },

    /// Arithmetic on an attribute that is not a number
    #[error("Attribute '{target}' is {found}, expected integer or float")]
    NotNumeric {
        target: String,
        found: DatumType,
    },

    /// A step with a fractional part applied to an integer attribute
    #[error("Attribute '{target}' is an integer but the step {step} is fractional")]
    FractionalStep {
        target: String,
        step: f32,
    },
}
