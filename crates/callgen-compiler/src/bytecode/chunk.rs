//! Bytecode chunk for one lowered method body.
//!
//! A `BytecodeChunk` holds the emitted bytes along with a parallel table of
//! source line numbers.

use super::OpCode;

/// Emitted bytecode for a single method body.
///
/// Constants live in a class-level [`ConstantPool`](super::ConstantPool) so
/// they can be shared across methods.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BytecodeChunk {
    code: Vec<u8>,
    /// Line numbers, one per byte in `code`.
    lines: Vec<u32>,
}

impl BytecodeChunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            code: Vec::with_capacity(capacity),
            lines: Vec::with_capacity(capacity),
        }
    }

    /// Write an opcode.
    pub fn write_op(&mut self, op: OpCode, line: u32) {
        self.code.push(op as u8);
        self.lines.push(line);
    }

    /// Write a byte operand.
    pub fn write_byte(&mut self, byte: u8, line: u32) {
        self.code.push(byte);
        self.lines.push(line);
    }

    /// Write a 16-bit operand (big-endian).
    pub fn write_u16(&mut self, value: u16, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Write a 32-bit operand (big-endian).
    pub fn write_u32(&mut self, value: u32, line: u32) {
        for byte in value.to_be_bytes() {
            self.write_byte(byte, line);
        }
    }

    /// Get current code offset (for jump patching).
    pub fn current_offset(&self) -> usize {
        self.code.len()
    }

    /// Emit a jump instruction and return the offset to patch later.
    ///
    /// The jump offset is initialized to 0xFFFF as a placeholder.
    pub fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.write_op(op, line);
        let offset = self.code.len();
        self.write_u16(0xFFFF, line);
        offset
    }

    /// Patch the u16 placeholder at `offset` to reach the current position.
    ///
    /// # Panics
    ///
    /// Panics if the jump distance exceeds u16::MAX.
    pub fn patch_jump(&mut self, offset: usize) {
        let jump_distance = self.code.len() - offset - 2;
        assert!(
            jump_distance <= u16::MAX as usize,
            "jump distance {} exceeds u16::MAX",
            jump_distance
        );
        self.code[offset] = (jump_distance >> 8) as u8;
        self.code[offset + 1] = jump_distance as u8;
    }

    pub fn code(&self) -> &[u8] {
        &self.code
    }

    pub fn lines(&self) -> &[u32] {
        &self.lines
    }

    pub fn line_at(&self, offset: usize) -> Option<u32> {
        self.lines.get(offset).copied()
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    pub fn read_byte(&self, offset: usize) -> Option<u8> {
        self.code.get(offset).copied()
    }

    /// Read a u16 at the given offset (big-endian).
    pub fn read_u16(&self, offset: usize) -> Option<u16> {
        let bytes = self.code.get(offset..offset + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    /// Read a u32 at the given offset (big-endian).
    pub fn read_u32(&self, offset: usize) -> Option<u32> {
        let bytes = self.code.get(offset..offset + 4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_op(&self, offset: usize) -> Option<OpCode> {
        self.code.get(offset).and_then(|&b| OpCode::from_u8(b))
    }

    /// Total length of the instruction starting at `offset`, opcode included.
    pub fn instruction_len(&self, offset: usize) -> Option<usize> {
        let op = self.read_op(offset)?;
        if op == OpCode::LookupSwitch {
            let count = self.read_u16(offset + 1)? as usize;
            return Some(1 + 4 + count * 6);
        }
        Some(1 + op.operand_size())
    }

    /// Decode the keys and absolute targets of the `LookupSwitch` at `offset`.
    ///
    /// Returns `(default_target, [(key, target)])`.
    pub fn switch_targets(&self, offset: usize) -> Option<(usize, Vec<(i32, usize)>)> {
        if self.read_op(offset)? != OpCode::LookupSwitch {
            return None;
        }
        let count = self.read_u16(offset + 1)? as usize;
        let default_at = offset + 3;
        let default = default_at + 2 + self.read_u16(default_at)? as usize;
        let mut cases = Vec::with_capacity(count);
        for i in 0..count {
            let entry = offset + 5 + i * 6;
            let key = self.read_u32(entry)? as i32;
            let target = entry + 6 + self.read_u16(entry + 4)? as usize;
            cases.push((key, target));
        }
        Some((default, cases))
    }

    /// Extract all opcodes from the chunk, skipping operands.
    ///
    /// Useful for testing instruction sequences without worrying about
    /// operand values or offsets.
    pub fn opcodes(&self) -> Vec<OpCode> {
        let mut ops = Vec::new();
        let mut offset = 0;

        while offset < self.code.len() {
            match (self.read_op(offset), self.instruction_len(offset)) {
                (Some(op), Some(len)) => {
                    ops.push(op);
                    offset += len;
                }
                // Invalid opcode or truncated operand, skip one byte
                _ => offset += 1,
            }
        }

        ops
    }

    /// Check if this chunk contains exactly the given opcode sequence.
    ///
    /// This ignores operand values, only checking the opcodes themselves.
    /// Panics with a descriptive message if the sequences don't match.
    #[track_caller]
    pub fn assert_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        assert_eq!(
            actual,
            expected,
            "Bytecode mismatch.\nExpected: {:?}\nActual:   {:?}",
            expected.iter().map(|op| op.name()).collect::<Vec<_>>(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }

    /// Check if this chunk contains the given opcodes (in order, but not necessarily contiguous).
    #[track_caller]
    pub fn assert_contains_opcodes(&self, expected: &[OpCode]) {
        let actual = self.opcodes();
        let mut expected_iter = expected.iter().peekable();

        for op in &actual {
            if expected_iter.peek() == Some(&op) {
                expected_iter.next();
            }
        }

        if expected_iter.peek().is_some() {
            let remaining: Vec<_> = expected_iter.map(|op| op.name()).collect();
            panic!(
                "Missing opcodes in sequence.\nExpected to find: {:?}\nActual bytecode:  {:?}",
                remaining,
                actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
            );
        }
    }

    /// Check that `op` does not occur anywhere in the chunk.
    #[track_caller]
    pub fn assert_lacks_opcode(&self, op: OpCode) {
        let actual = self.opcodes();
        assert!(
            !actual.contains(&op),
            "Unexpected {} in bytecode: {:?}",
            op.name(),
            actual.iter().map(|op| op.name()).collect::<Vec<_>>(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_chunk_is_empty() {
        let chunk = BytecodeChunk::new();
        assert!(chunk.is_empty());
        assert_eq!(chunk.len(), 0);
    }

    #[test]
    fn write_op() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(42, 1);

        assert_eq!(chunk.len(), 2);
        assert_eq!(chunk.read_op(0), Some(OpCode::Constant));
        assert_eq!(chunk.read_byte(1), Some(42));
        assert_eq!(chunk.line_at(1), Some(1));
    }

    #[test]
    fn write_wide_operands() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_u16(0x1234, 5);
        chunk.write_u32(0xdead_beef, 6);

        assert_eq!(chunk.read_u16(0), Some(0x1234));
        assert_eq!(chunk.read_u32(2), Some(0xdead_beef));
        assert_eq!(chunk.line_at(5), Some(6));
        assert_eq!(chunk.read_u32(3), None);
    }

    #[test]
    fn emit_and_patch_jump() {
        let mut chunk = BytecodeChunk::new();
        let jump_offset = chunk.emit_jump(OpCode::Jump, 2);
        chunk.write_op(OpCode::PushOne, 3);
        chunk.write_op(OpCode::PushZero, 3);
        chunk.patch_jump(jump_offset);

        assert_eq!(chunk.read_u16(jump_offset), Some(2));
    }

    #[test]
    fn opcodes_with_wide_operands() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::InvokeVirtual, 1);
        chunk.write_u16(0x0001, 1);
        chunk.write_byte(2, 1);
        chunk.write_op(OpCode::Despread, 1);
        chunk.write_byte(3, 1);
        chunk.write_u32(0b010, 1);
        chunk.write_op(OpCode::Pop, 1);

        assert_eq!(
            chunk.opcodes(),
            vec![OpCode::InvokeVirtual, OpCode::Despread, OpCode::Pop]
        );
    }

    #[test]
    fn lookup_switch_length_depends_on_count() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::LookupSwitch, 1);
        chunk.write_u16(2, 1);
        chunk.write_u16(0, 1);
        for key in [7u32, 9] {
            chunk.write_u32(key, 1);
            chunk.write_u16(0, 1);
        }
        chunk.write_op(OpCode::Pop, 1);

        assert_eq!(chunk.instruction_len(0), Some(17));
        chunk.assert_opcodes(&[OpCode::LookupSwitch, OpCode::Pop]);

        let (default, cases) = chunk.switch_targets(0).unwrap();
        assert_eq!(default, 5);
        assert_eq!(cases, vec![(7, 11), (9, 17)]);
    }

    #[test]
    #[should_panic(expected = "Bytecode mismatch")]
    fn assert_opcodes_failure() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Constant, 1);
        chunk.write_byte(0, 1);
        chunk.assert_opcodes(&[OpCode::GetLocal]);
    }

    #[test]
    fn assert_contains_opcodes_success() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::GetThis, 1);
        chunk.write_op(OpCode::Dup, 1);
        chunk.write_op(OpCode::Swap, 1);
        chunk.write_op(OpCode::Pop, 1);

        chunk.assert_contains_opcodes(&[OpCode::GetThis, OpCode::Swap]);
        chunk.assert_lacks_opcode(OpCode::New);
    }

    #[test]
    #[should_panic(expected = "Missing opcodes")]
    fn assert_contains_opcodes_failure() {
        let mut chunk = BytecodeChunk::new();
        chunk.write_op(OpCode::Pop, 1);
        chunk.assert_contains_opcodes(&[OpCode::Pop, OpCode::Swap]);
    }
}
