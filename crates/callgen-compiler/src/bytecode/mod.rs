//! Bytecode types for the call-lowering core.
//!
//! - [`OpCode`] - the stack-machine instruction set
//! - [`BytecodeChunk`] - emitted instructions for one method body
//! - [`Constant`] and [`ConstantPool`] - class-level constant storage

mod chunk;
mod constant;
mod opcode;

pub use chunk::BytecodeChunk;
pub use constant::{Constant, ConstantPool};
pub use opcode::OpCode;
