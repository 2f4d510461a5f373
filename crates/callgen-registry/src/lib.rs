//! Type registry for call lowering.
//!
//! [`TypeRegistry`] stores the declarations that upstream passes resolved
//! and answers the questions lowering asks about them: hierarchy and
//! assignability queries, descriptors, and member lookup by hash.

mod builtins;
mod registry;

pub use builtins::names;
pub use registry::TypeRegistry;
