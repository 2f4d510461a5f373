//! Declarations the call-lowering core resolves against.
//!
//! - [`TypeEntry`] - a class, interface, enum or primitive type
//! - [`MethodEntry`] - a method with its declaring type and signature
//! - [`ConstructorEntry`] - a constructor with its parameter list
//! - [`FieldEntry`] - a declared field
//!
//! Entries are produced by upstream declaration processing; lowering only
//! reads them.

mod members;
mod type_entry;

pub use members::{ConstructorEntry, FieldEntry, MethodEntry, Param};
pub use type_entry::{Modifiers, PrimitiveKind, TypeEntry, TypeKind};
