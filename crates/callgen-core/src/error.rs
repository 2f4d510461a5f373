//! Error types for registration and call lowering.
//!
//! ```text
//! RegistrationError  - building the type registry
//! CompilationError   - lowering call expressions
//! ```
//!
//! Strategy selection never produces an error: a tier that does not apply
//! simply lets the next one try. A `CompilationError` means the input is
//! malformed or a constructor table cannot be dispatched safely.

use thiserror::Error;

use crate::Span;

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while populating a type registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A type with this name already exists.
    #[error("duplicate type: {0}")]
    DuplicateType(String),

    /// A type refers to a supertype or interface that is not registered.
    #[error("type '{type_name}' refers to unregistered type {missing}")]
    MissingSupertype { type_name: String, missing: String },
}

// ============================================================================
// Compilation Errors
// ============================================================================

/// Errors raised while lowering call expressions.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompilationError {
    /// A referenced type could not be found.
    #[error("at {span}: unknown type '{name}'")]
    UnknownType {
        /// The type name (or hash) that wasn't found.
        name: String,
        span: Span,
    },

    /// A resolved method target refers to a method the registry doesn't know.
    #[error("at {span}: unknown method '{name}'")]
    UnknownMethod { name: String, span: Span },

    /// A class with no declared constructors was used for constructor dispatch.
    #[error("at {span}: class '{class_name}' declares no constructors")]
    NoConstructors { class_name: String, span: Span },

    /// Two constructors of one class share a dispatch fingerprint.
    #[error(
        "at {span}: constructors {first} and {second} of '{class_name}' share a dispatch fingerprint"
    )]
    FingerprintCollision {
        class_name: String,
        /// Descriptor of the constructor that claimed the key first.
        first: String,
        /// Descriptor of the colliding constructor.
        second: String,
        span: Span,
    },

    /// An operand exceeds what the instruction encoding can carry.
    #[error("at {span}: too many arguments ({count}, at most {max})")]
    TooManyArguments { count: usize, max: usize, span: Span },

    /// Internal compiler error (bug).
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CompilationError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            CompilationError::UnknownType { span, .. } => *span,
            CompilationError::UnknownMethod { span, .. } => *span,
            CompilationError::NoConstructors { span, .. } => *span,
            CompilationError::FingerprintCollision { span, .. } => *span,
            CompilationError::TooManyArguments { span, .. } => *span,
            CompilationError::Internal { .. } => Span::default(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CompilationError::Internal {
            message: message.into(),
        }
    }
}
