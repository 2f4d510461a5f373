//! Bytecode emitter for call lowering.
//!
//! The [`BytecodeEmitter`] provides a typed API over [`BytecodeChunk`]:
//! constants go to the shared pool, type and member operands become pool
//! indices, and forward branches are patched through labels.
//!
//! # Example
//!
//! ```
//! use callgen_compiler::bytecode::{ConstantPool, OpCode};
//! use callgen_compiler::emit::BytecodeEmitter;
//!
//! let mut constants = ConstantPool::new();
//! let mut emitter = BytecodeEmitter::new(&mut constants);
//!
//! emitter.set_line(1);
//! emitter.emit_get_this();
//! emitter.emit_int(42);
//! emitter.emit(OpCode::Pop);
//!
//! let chunk = emitter.finish();
//! chunk.assert_opcodes(&[OpCode::GetThis, OpCode::Constant, OpCode::Pop]);
//! ```

mod labels;

use callgen_core::TypeHash;

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};

pub use labels::{JumpLabel, SwitchLabels};

/// Emits bytecode instructions for one method body.
pub struct BytecodeEmitter<'pool> {
    chunk: BytecodeChunk,

    /// Shared class-level constant pool (deduplicated)
    constants: &'pool mut ConstantPool,

    /// Current source line for debug info
    current_line: u32,
}

impl<'pool> BytecodeEmitter<'pool> {
    pub fn new(constants: &'pool mut ConstantPool) -> Self {
        Self {
            chunk: BytecodeChunk::new(),
            constants,
            current_line: 1,
        }
    }

    /// Set current source line for debug info.
    pub fn set_line(&mut self, line: u32) {
        self.current_line = line;
    }

    pub fn current_line(&self) -> u32 {
        self.current_line
    }

    /// Read-only view of the shared constant pool.
    pub fn constants(&self) -> &ConstantPool {
        self.constants
    }

    // ==========================================================================
    // Basic Emission
    // ==========================================================================

    /// Emit a single opcode with no operands.
    pub fn emit(&mut self, op: OpCode) {
        self.chunk.write_op(op, self.current_line);
    }

    /// Emit opcode with 8-bit operand.
    pub fn emit_byte(&mut self, op: OpCode, byte: u8) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_byte(byte, self.current_line);
    }

    /// Emit opcode with 16-bit operand.
    pub fn emit_u16(&mut self, op: OpCode, value: u16) {
        self.chunk.write_op(op, self.current_line);
        self.chunk.write_u16(value, self.current_line);
    }

    fn emit_type_operand(&mut self, op: OpCode, type_hash: TypeHash) {
        let index = self.constants.add_type_hash(type_hash);
        self.emit_u16(op, index as u16);
    }

    /// Emit a constant load instruction.
    ///
    /// Uses narrow (8-bit) or wide (16-bit) index based on pool size.
    pub fn emit_constant(&mut self, constant: Constant) {
        let index = self.constants.add(constant);
        if index < 256 {
            self.emit_byte(OpCode::Constant, index as u8);
        } else {
            self.emit_u16(OpCode::ConstantWide, index as u16);
        }
    }

    // ==========================================================================
    // Constants
    // ==========================================================================

    /// Emit an integer constant.
    ///
    /// 0 uses `PushZero`, 1 uses `PushOne`.
    pub fn emit_int(&mut self, value: i64) {
        match value {
            0 => self.emit(OpCode::PushZero),
            1 => self.emit(OpCode::PushOne),
            _ => self.emit_constant(Constant::Int(value)),
        }
    }

    pub fn emit_string(&mut self, value: &str) {
        self.emit_constant(Constant::StringData(value.as_bytes().to_vec()));
    }

    pub fn emit_null(&mut self) {
        self.emit(OpCode::PushNull);
    }

    pub fn emit_bool(&mut self, value: bool) {
        self.emit(if value {
            OpCode::PushTrue
        } else {
            OpCode::PushFalse
        });
    }

    // ==========================================================================
    // Locals and Receivers
    // ==========================================================================

    /// Emit get local variable.
    ///
    /// Uses narrow (8-bit) or wide (16-bit) slot index based on slot number.
    pub fn emit_get_local(&mut self, slot: u16) {
        if slot < 256 {
            self.emit_byte(OpCode::GetLocal, slot as u8);
        } else {
            self.emit_u16(OpCode::GetLocalWide, slot);
        }
    }

    /// Push the reference cell backing a captured local.
    pub fn emit_get_ref(&mut self, slot: u16) {
        self.emit_u16(OpCode::GetRef, slot);
    }

    pub fn emit_get_this(&mut self) {
        self.emit(OpCode::GetThis);
    }

    pub fn emit_get_outer_this(&mut self, outer: TypeHash) {
        self.emit_type_operand(OpCode::GetOuterThis, outer);
    }

    pub fn emit_get_field(&mut self, name: &str) {
        let index = self.constants.add_string(name);
        self.emit_u16(OpCode::GetField, index as u16);
    }

    pub fn emit_get_static_field(&mut self, owner: TypeHash, name: &str) {
        let owner_index = self.constants.add_type_hash(owner);
        let name_index = self.constants.add_string(name);
        self.emit_u16(OpCode::GetStaticField, owner_index as u16);
        self.chunk.write_u16(name_index as u16, self.current_line);
    }

    // ==========================================================================
    // Objects and Arrays
    // ==========================================================================

    /// Emit allocation of an uninitialized instance.
    pub fn emit_new(&mut self, type_hash: TypeHash) {
        self.emit_type_operand(OpCode::New, type_hash);
    }

    /// Emit array construction from the top `count` stack values.
    pub fn emit_array_init(&mut self, element: TypeHash, count: u16) {
        self.emit_type_operand(OpCode::ArrayInit, element);
        self.chunk.write_u16(count, self.current_line);
    }

    pub fn emit_array_load(&mut self) {
        self.emit(OpCode::ArrayLoad);
    }

    /// Emit construction of an argument vector from the top `count` values,
    /// expanding those whose bit is set in `spread_mask`.
    pub fn emit_despread(&mut self, count: u8, spread_mask: u32) {
        self.emit_byte(OpCode::Despread, count);
        self.chunk.write_u32(spread_mask, self.current_line);
    }

    // ==========================================================================
    // Invocation
    // ==========================================================================

    /// Emit a statically bound invocation of `member` through `owner`.
    ///
    /// `op` must be one of the four `Invoke*` opcodes.
    pub fn emit_invoke(&mut self, op: OpCode, owner: TypeHash, member: TypeHash, arg_count: u8) {
        debug_assert!(matches!(
            op,
            OpCode::InvokeStatic
                | OpCode::InvokeVirtual
                | OpCode::InvokeInterface
                | OpCode::InvokeSpecial
        ));
        let index = self.constants.add_member_ref(owner, member);
        self.emit_u16(op, index as u16);
        self.chunk.write_byte(arg_count, self.current_line);
    }

    /// Emit a call through an inline-cached call site.
    pub fn emit_call_site(&mut self, slot: u16, arg_count: u8, flags: u8) {
        self.emit_u16(OpCode::CallSite, slot);
        self.chunk.write_byte(arg_count, self.current_line);
        self.chunk.write_byte(flags, self.current_line);
    }

    /// Emit a runtime adapter call. `arg_count` is -1 for a vector call.
    pub fn emit_call_adapter(&mut self, adapter: u8, arg_count: i8, flags: u8) {
        self.emit_byte(OpCode::CallAdapter, adapter);
        self.chunk.write_byte(arg_count as u8, self.current_line);
        self.chunk.write_byte(flags, self.current_line);
    }

    // ==========================================================================
    // Type Operations
    // ==========================================================================

    /// Emit a checked downcast.
    pub fn emit_check_cast(&mut self, target_type: TypeHash) {
        self.emit_type_operand(OpCode::CheckCast, target_type);
    }

    /// Emit boxing of a primitive of type `primitive`.
    pub fn emit_box(&mut self, primitive: TypeHash) {
        self.emit_type_operand(OpCode::Box, primitive);
    }

    /// Emit unboxing to the primitive `primitive`.
    pub fn emit_unbox(&mut self, primitive: TypeHash) {
        self.emit_type_operand(OpCode::Unbox, primitive);
    }

    pub fn emit_load_class(&mut self, type_hash: TypeHash) {
        self.emit_type_operand(OpCode::LoadClass, type_hash);
    }

    // ==========================================================================
    // Stack Operations
    // ==========================================================================

    pub fn emit_pop(&mut self) {
        self.emit(OpCode::Pop);
    }

    pub fn emit_dup(&mut self) {
        self.emit(OpCode::Dup);
    }

    pub fn emit_swap(&mut self) {
        self.emit(OpCode::Swap);
    }

    // ==========================================================================
    // Control Flow
    // ==========================================================================

    /// Emit a forward jump instruction.
    ///
    /// Returns a label that must be patched with `patch_jump`.
    pub fn emit_jump(&mut self, op: OpCode) -> JumpLabel {
        JumpLabel(self.chunk.emit_jump(op, self.current_line))
    }

    /// Patch a forward jump to the current position.
    pub fn patch_jump(&mut self, label: JumpLabel) {
        self.chunk.patch_jump(label.0);
    }

    /// Emit a `LookupSwitch` over `keys`.
    ///
    /// Keys must be distinct. The returned case labels are in the order of
    /// `keys`; every label (default included) must be patched.
    pub fn emit_lookup_switch(&mut self, keys: &[i32]) -> SwitchLabels {
        let line = self.current_line;
        self.chunk.write_op(OpCode::LookupSwitch, line);
        self.chunk.write_u16(keys.len() as u16, line);

        let default = JumpLabel(self.chunk.current_offset());
        self.chunk.write_u16(0xFFFF, line);

        let mut cases = Vec::with_capacity(keys.len());
        for &key in keys {
            self.chunk.write_u32(key as u32, line);
            cases.push(JumpLabel(self.chunk.current_offset()));
            self.chunk.write_u16(0xFFFF, line);
        }

        SwitchLabels { default, cases }
    }

    /// Emit an unconditional fatal error carrying `message`.
    pub fn emit_raise_fatal(&mut self, message: &str) {
        let index = self.constants.add_string(message);
        self.emit_u16(OpCode::RaiseFatal, index as u16);
    }

    /// Get current bytecode offset.
    pub fn current_offset(&self) -> usize {
        self.chunk.current_offset()
    }

    // ==========================================================================
    // Finalization
    // ==========================================================================

    /// Bytecode emitted so far.
    pub fn chunk(&self) -> &BytecodeChunk {
        &self.chunk
    }

    /// Finish and return the bytecode chunk.
    pub fn finish(self) -> BytecodeChunk {
        self.chunk
    }

    /// Get current chunk size (for debugging).
    pub fn code_size(&self) -> usize {
        self.chunk.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_constant() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.emit_int(42);
        let chunk = emitter.finish();

        assert_eq!(chunk.read_op(0), Some(OpCode::Constant));
        assert_eq!(chunk.read_byte(1), Some(0));
        assert_eq!(constants.get(0), Some(&Constant::Int(42)));
    }

    #[test]
    fn emit_special_ints() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.emit_int(0);
        emitter.emit_int(1);
        let chunk = emitter.finish();

        chunk.assert_opcodes(&[OpCode::PushZero, OpCode::PushOne]);
        assert!(constants.is_empty());
    }

    #[test]
    fn invoke_operands() {
        let mut constants = ConstantPool::new();
        let owner = TypeHash::from_name("Widget");
        let member = TypeHash::from_method(owner, "size", &[]);
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.emit_invoke(OpCode::InvokeVirtual, owner, member, 0);
        let chunk = emitter.finish();

        assert_eq!(chunk.read_u16(1), Some(0));
        assert_eq!(chunk.read_byte(3), Some(0));
        assert_eq!(
            constants.get(0),
            Some(&Constant::MemberRef { owner, member })
        );
    }

    #[test]
    fn adapter_vector_count_is_minus_one() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.emit_call_adapter(3, -1, 0b10);
        let chunk = emitter.finish();

        assert_eq!(chunk.read_byte(1), Some(3));
        assert_eq!(chunk.read_byte(2), Some(0xFF));
        assert_eq!(chunk.read_byte(3), Some(0b10));
    }

    #[test]
    fn jump_and_patch() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);

        let label = emitter.emit_jump(OpCode::Jump);
        emitter.emit(OpCode::PushTrue);
        emitter.patch_jump(label);
        emitter.emit(OpCode::PushFalse);

        let chunk = emitter.finish();
        assert_eq!(chunk.read_u16(1), Some(1));
        assert_eq!(chunk.read_op(4), Some(OpCode::PushFalse));
    }

    #[test]
    fn lookup_switch_patching() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);

        let labels = emitter.emit_lookup_switch(&[-5, 12]);
        let first = emitter.current_offset();
        emitter.patch_jump(labels.cases[0]);
        emitter.emit(OpCode::Pop);
        let second = emitter.current_offset();
        emitter.patch_jump(labels.cases[1]);
        emitter.emit(OpCode::Dup);
        let default = emitter.current_offset();
        emitter.patch_jump(labels.default);
        emitter.emit_raise_fatal("boom");

        let chunk = emitter.finish();
        let (default_target, cases) = chunk.switch_targets(0).unwrap();
        assert_eq!(default_target, default);
        assert_eq!(cases, vec![(-5, first), (12, second)]);
        chunk.assert_opcodes(&[
            OpCode::LookupSwitch,
            OpCode::Pop,
            OpCode::Dup,
            OpCode::RaiseFatal,
        ]);
        assert_eq!(constants.get_str(0), Some("boom"));
    }

    #[test]
    fn line_tracking() {
        let mut constants = ConstantPool::new();
        let mut emitter = BytecodeEmitter::new(&mut constants);
        emitter.set_line(7);
        emitter.emit_get_this();
        emitter.set_line(9);
        emitter.emit_new(TypeHash::from_name("Widget"));
        let chunk = emitter.finish();

        assert_eq!(chunk.line_at(0), Some(7));
        assert_eq!(chunk.line_at(1), Some(9));
        assert_eq!(chunk.line_at(3), Some(9));
    }
}
