//! Core types shared by the callgen crates.
//!
//! - [`TypeHash`]: deterministic identity for types, methods and constructors
//! - [`DataType`]: a type reference with array dimensions
//! - [`entries`]: type, method, constructor and field declarations
//! - [`CompilationError`] and [`Diagnostics`]: error reporting

mod data_type;
mod diagnostics;
pub mod entries;
mod error;
mod span;
mod type_hash;

pub use data_type::DataType;
pub use diagnostics::{DiagnosticSink, Diagnostics};
pub use entries::{
    ConstructorEntry, FieldEntry, MethodEntry, Modifiers, Param, PrimitiveKind, TypeEntry,
    TypeKind,
};
pub use error::{CompilationError, RegistrationError};
pub use span::Span;
pub use type_hash::{TypeHash, hash_constants, primitives};
