//! Call lowering for a stack-machine compiler backend.
//!
//! Translates method calls, constructor calls and `this(...)`/`super(...)`
//! chaining into instruction sequences, picking for every call site the
//! cheapest correct invocation form.
//!
//! ## Modules
//!
//! - [`bytecode`]: Bytecode types (OpCode, BytecodeChunk, ConstantPool)
//! - [`emit`]: Typed bytecode emitter with forward jumps and lookup switches
//! - [`stack`]: Static types of the values on the operand stack
//! - [`ast`]: Call expressions and their receiver/argument expressions
//! - [`calls`]: The lowering core (tier selector, binder, constructor dispatch)
//! - [`class_state`]: Per-class state (constructor tables, super-method names)
//! - [`collaborators`]: Type resolver, call-site registry and closure hook
//! - [`adapter`]: Runtime adapters and call flags
//! - [`context`]: Per-method frame and lowering options

pub mod adapter;
pub mod ast;
pub mod bytecode;
pub mod calls;
pub mod class_state;
pub mod collaborators;
pub mod context;
pub mod emit;
pub mod stack;

#[cfg(test)]
mod test_support;

pub use adapter::{Adapter, CallFlags};
pub use calls::{
    CallLowering, CallRequest, CallTier, ConstructorDispatch, ConstructorTable, Value,
};
pub use class_state::ClassLowering;
pub use collaborators::{
    AnnotatedTypeResolver, CallSiteRegistry, ClosureConstructorHook, InlineCacheRegistry,
    NoClosureHook, TypeResolver,
};
pub use context::{Frame, LoweringOptions};
pub use emit::{BytecodeEmitter, JumpLabel};
pub use stack::OperandStack;

// Re-export CompilationError from core for convenience
pub use callgen_core::CompilationError;
