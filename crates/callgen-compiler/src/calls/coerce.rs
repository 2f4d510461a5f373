//! Post-call value coercions.
//!
//! These adapt the result of a dynamic call to the type its context needs.
//! Each one operates on the top of the operand stack.

use callgen_core::{DataType, primitives};

use super::{CallLowering, Result};
use crate::adapter::Adapter;

impl<'a, 'pool> CallLowering<'a, 'pool> {
    /// Convert the top of stack to the reference type `target` through the
    /// runtime cast adapters.
    pub fn coerce_to_declared_type(&mut self, target: DataType) -> Result<()> {
        let boxed = self.box_top()?;
        if self.registry.is_assignable(boxed, target) {
            return Ok(());
        }

        if self.registry.is_class_type(target) {
            self.emitter.emit_call_adapter(Adapter::CastToClass.id(), 1, 0);
        } else if self.registry.is_string(target) {
            self.emitter
                .emit_call_adapter(Adapter::CastToString.id(), 1, 0);
        } else if self.registry.is_enum(target) {
            self.emitter.emit_load_class(target.signature_hash());
            self.emitter.emit_call_adapter(Adapter::CastToEnum.id(), 2, 0);
            self.emitter.emit_check_cast(target.signature_hash());
        } else {
            self.emitter.emit_load_class(target.signature_hash());
            self.emitter.emit_call_adapter(Adapter::CastToType.id(), 2, 0);
            self.emitter.emit_check_cast(target.signature_hash());
        }
        self.stack.replace(target, 1)
    }

    /// Unbox a boxed boolean on top of the stack.
    pub fn coerce_to_boolean(&mut self) -> Result<()> {
        self.emitter.emit_unbox(primitives::BOOLEAN);
        self.stack.replace(DataType::simple(primitives::BOOLEAN), 1)
    }

    /// Apply the implicit `as`-conversion of the top of stack to `target`.
    pub fn implicit_coerce(&mut self, target: DataType) -> Result<()> {
        let top = self.top()?;
        if self.registry.is_assignable(top, target) {
            return Ok(());
        }
        self.box_top()?;
        self.emitter.emit_load_class(target.signature_hash());
        self.emitter.emit_call_adapter(Adapter::AsType.id(), 2, 0);
        self.emitter.emit_check_cast(target.signature_hash());
        self.stack.replace(target, 1)
    }
}
