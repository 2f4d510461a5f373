//! Call lowering for a stack-machine compiler backend.
//!
//! This crate ties the callgen crates together:
//!
//! - [`callgen_core`]: type hashes, data types, declarations and errors
//! - [`callgen_registry`]: the type registry lowering queries
//! - [`callgen_compiler`]: the lowering core and its bytecode emitter
//!
//! [`ClassUnit`] is the entry point for lowering the method bodies of one
//! class; the lower-level [`CallLowering`] is re-exported for callers that
//! manage emitters and operand stacks themselves.

pub mod unit;

pub use unit::{ClassUnit, CompiledClass, LoweredBody};

pub use callgen_compiler::{
    Adapter, AnnotatedTypeResolver, BytecodeEmitter, CallFlags, CallLowering, CallRequest,
    CallSiteRegistry, CallTier, ClassLowering, ClosureConstructorHook, ConstructorDispatch,
    ConstructorTable, Frame, InlineCacheRegistry, JumpLabel, LoweringOptions, NoClosureHook,
    OperandStack, TypeResolver, Value,
};
pub use callgen_compiler::{ast, bytecode, calls};
pub use callgen_core::{
    CompilationError, DataType, DiagnosticSink, Diagnostics, Modifiers, Param, RegistrationError,
    Span, TypeEntry, TypeHash, primitives,
};
pub use callgen_registry::TypeRegistry;
