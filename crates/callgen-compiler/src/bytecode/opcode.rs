//! Bytecode operation codes.
//!
//! Each opcode is a single byte with operands following inline, big-endian.

use num_enum::TryFromPrimitive;

/// Stack-machine operation codes.
///
/// Invocations pop their receiver (if any) and arguments and push one
/// result, or nothing for `void` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum OpCode {
    // =========================================================================
    // Constants
    // =========================================================================
    /// Push constant from pool (8-bit index).
    /// Operand: u8 constant index
    Constant = 0,
    /// Push constant from pool (16-bit index).
    /// Operand: u16 constant index
    ConstantWide,
    PushNull,
    PushTrue,
    PushFalse,
    /// Push integer 0.
    PushZero,
    /// Push integer 1.
    PushOne,

    // =========================================================================
    // Stack Operations
    // =========================================================================
    Pop,
    /// `a -> a a`
    Dup,
    /// `b a -> a b a`
    DupX1,
    /// `c b a -> b a c b a`
    Dup2X1,
    /// `b a -> a b`
    Swap,

    // =========================================================================
    // Locals and Receivers
    // =========================================================================
    /// Operand: u8 slot
    GetLocal,
    /// Operand: u16 slot
    GetLocalWide,
    /// Push the shared reference cell of a captured local (not its value).
    /// Operand: u16 slot
    GetRef,
    GetThis,
    /// Push the instance of an enclosing class.
    /// Operand: u16 constant index (TypeHash of the outer class)
    GetOuterThis,
    /// Pop an instance, push one of its fields.
    /// Operand: u16 constant index (field name)
    GetField,
    /// Operands: u16 owner TypeHash constant, u16 field name constant
    GetStaticField,

    // =========================================================================
    // Objects and Arrays
    // =========================================================================
    /// Allocate an uninitialized instance.
    /// Operand: u16 constant index (TypeHash)
    New,
    /// Pop `count` values, push an array of them.
    /// Operands: u16 element TypeHash constant, u16 count
    ArrayInit,
    /// `array index -> element`
    ArrayLoad,
    /// Pop `count` values, push an argument vector, expanding values whose
    /// mask bit is set.
    /// Operands: u8 count, u32 spread mask
    Despread,

    // =========================================================================
    // Invocation
    // =========================================================================
    /// Operands: u16 member-ref constant, u8 argument count
    InvokeStatic,
    /// Operands: u16 member-ref constant, u8 argument count
    InvokeVirtual,
    /// Operands: u16 member-ref constant, u8 argument count
    InvokeInterface,
    /// Non-virtual call (constructors, super methods).
    /// Operands: u16 member-ref constant, u8 argument count
    InvokeSpecial,
    /// Call through an inline-cached call site.
    /// Operands: u16 site slot, u8 argument count, u8 flags
    CallSite,
    /// Call a runtime support adapter.
    /// Operands: u8 adapter id, u8 argument count (i8, -1 for a vector), u8 flags
    CallAdapter,

    // =========================================================================
    // Types
    // =========================================================================
    /// Operand: u16 constant index (TypeHash)
    CheckCast,
    /// Operand: u16 constant index (TypeHash of the primitive)
    Box,
    /// Operand: u16 constant index (TypeHash of the primitive)
    Unbox,
    /// Push a class literal.
    /// Operand: u16 constant index (TypeHash)
    LoadClass,

    // =========================================================================
    // Control Flow
    // =========================================================================
    /// Operand: u16 forward offset
    Jump,
    /// Pop an int key and branch on it.
    /// Operands: u16 count, u16 default offset, then `count` pairs of
    /// (i32 key, u16 offset). Each offset is relative to the end of its own
    /// operand.
    LookupSwitch,
    /// Abort with a fatal error.
    /// Operand: u16 constant index (message string)
    RaiseFatal,
}

impl OpCode {
    /// Convert a byte to an opcode.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Size of fixed operands in bytes, not including the opcode byte.
    ///
    /// For `LookupSwitch` this is the header only; use
    /// [`BytecodeChunk::instruction_len`](super::BytecodeChunk::instruction_len)
    /// for the full length.
    pub fn operand_size(&self) -> usize {
        match self {
            OpCode::PushNull
            | OpCode::PushTrue
            | OpCode::PushFalse
            | OpCode::PushZero
            | OpCode::PushOne
            | OpCode::Pop
            | OpCode::Dup
            | OpCode::DupX1
            | OpCode::Dup2X1
            | OpCode::Swap
            | OpCode::GetThis
            | OpCode::ArrayLoad => 0,

            OpCode::Constant | OpCode::GetLocal => 1,

            OpCode::ConstantWide
            | OpCode::GetLocalWide
            | OpCode::GetRef
            | OpCode::GetOuterThis
            | OpCode::GetField
            | OpCode::New
            | OpCode::CheckCast
            | OpCode::Box
            | OpCode::Unbox
            | OpCode::LoadClass
            | OpCode::Jump
            | OpCode::RaiseFatal => 2,

            OpCode::InvokeStatic
            | OpCode::InvokeVirtual
            | OpCode::InvokeInterface
            | OpCode::InvokeSpecial
            | OpCode::CallAdapter => 3,

            OpCode::GetStaticField | OpCode::ArrayInit | OpCode::CallSite | OpCode::LookupSwitch => 4,

            OpCode::Despread => 5,
        }
    }

    /// Mnemonic used in disassembly and test failures.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::Constant => "CONSTANT",
            OpCode::ConstantWide => "CONSTANT_WIDE",
            OpCode::PushNull => "PUSH_NULL",
            OpCode::PushTrue => "PUSH_TRUE",
            OpCode::PushFalse => "PUSH_FALSE",
            OpCode::PushZero => "PUSH_ZERO",
            OpCode::PushOne => "PUSH_ONE",
            OpCode::Pop => "POP",
            OpCode::Dup => "DUP",
            OpCode::DupX1 => "DUP_X1",
            OpCode::Dup2X1 => "DUP2_X1",
            OpCode::Swap => "SWAP",
            OpCode::GetLocal => "GET_LOCAL",
            OpCode::GetLocalWide => "GET_LOCAL_WIDE",
            OpCode::GetRef => "GET_REF",
            OpCode::GetThis => "GET_THIS",
            OpCode::GetOuterThis => "GET_OUTER_THIS",
            OpCode::GetField => "GET_FIELD",
            OpCode::GetStaticField => "GET_STATIC_FIELD",
            OpCode::New => "NEW",
            OpCode::ArrayInit => "ARRAY_INIT",
            OpCode::ArrayLoad => "ARRAY_LOAD",
            OpCode::Despread => "DESPREAD",
            OpCode::InvokeStatic => "INVOKE_STATIC",
            OpCode::InvokeVirtual => "INVOKE_VIRTUAL",
            OpCode::InvokeInterface => "INVOKE_INTERFACE",
            OpCode::InvokeSpecial => "INVOKE_SPECIAL",
            OpCode::CallSite => "CALL_SITE",
            OpCode::CallAdapter => "CALL_ADAPTER",
            OpCode::CheckCast => "CHECK_CAST",
            OpCode::Box => "BOX",
            OpCode::Unbox => "UNBOX",
            OpCode::LoadClass => "LOAD_CLASS",
            OpCode::Jump => "JUMP",
            OpCode::LookupSwitch => "LOOKUP_SWITCH",
            OpCode::RaiseFatal => "RAISE_FATAL",
        }
    }
}
