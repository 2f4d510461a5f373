//! Statically bound method invocation.

use tracing::trace;

use callgen_core::{DataType, MethodEntry, Span};

use super::{CallLowering, Result, Value, arg_count_u8};
use crate::ast::Expr;
use crate::bytecode::OpCode;

impl<'a, 'pool> CallLowering<'a, 'pool> {
    /// Emit a call to a resolved `target`.
    ///
    /// With no `receiver` an instance target is called on `this`. Leaves the
    /// return value on the stack, or nothing for a void target.
    pub fn write_direct_call(
        &mut self,
        target: &MethodEntry,
        implicit_this: bool,
        receiver: Option<Expr<'_>>,
        args: &[Expr<'_>],
        span: Span,
    ) -> Result<Value> {
        let registry = self.registry;
        let declaring = DataType::simple(target.owner);
        let enclosing = self.frame.class;
        let receiver_type = match &receiver {
            Some(expr) => self.resolve_type(expr),
            None => DataType::simple(enclosing),
        };
        let start = self.stack.depth();

        if !target.is_static() {
            match &receiver {
                Some(expr) => {
                    let outer_call = implicit_this
                        && registry
                            .get(enclosing)
                            .is_some_and(|e| e.outer_class.is_some())
                        && !registry.is_derived_from(DataType::simple(enclosing), declaring)
                        && !registry.implements_interface(enclosing, target.owner);
                    if outer_call && !self.frame.in_generated_function && expr.is_this() {
                        self.emitter.emit_get_outer_this(target.owner);
                        self.stack.push(declaring);
                    } else {
                        self.lower_expr(expr)?;
                    }
                    self.coerce_to(declaring)?;
                }
                None => {
                    self.emitter.emit_get_this();
                    self.stack.push(DataType::simple(enclosing));
                }
            }
        }

        let declaring_is_interface = registry.is_interface(declaring);
        let mut op = if target.is_static() {
            OpCode::InvokeStatic
        } else if receiver.as_ref().is_some_and(Expr::is_super) {
            OpCode::InvokeSpecial
        } else if declaring_is_interface {
            OpCode::InvokeInterface
        } else {
            OpCode::InvokeVirtual
        };

        let mut owner = target.owner;
        let receiver_is_subtype = if declaring_is_interface {
            registry.implements_interface(receiver_type.type_hash, target.owner)
        } else {
            registry.is_derived_from(receiver_type, declaring)
        };
        if op == OpCode::InvokeSpecial {
            if !declaring_is_interface
                || registry.implements_interface(receiver_type.type_hash, target.owner)
            {
                owner = receiver_type.type_hash;
            }
        } else if op == OpCode::InvokeVirtual && registry.is_object(declaring) {
            // Object-declared methods keep their declaring owner.
        } else if op == OpCode::InvokeVirtual
            && !receiver_type.is_array()
            && !registry.is_interface(receiver_type)
            && !registry.is_primitive(receiver_type)
            && receiver_type != declaring
            && registry.is_derived_from(receiver_type, declaring)
        {
            owner = receiver_type.type_hash;
            if self.stack.top() != Some(receiver_type) {
                self.emitter.emit_check_cast(receiver_type.signature_hash());
                self.stack.replace(receiver_type, 1)?;
            }
        } else if !registry.is_public(target.owner)
            && !registry.is_final(target.owner)
            && receiver_type != declaring
            && receiver_is_subtype
        {
            if declaring_is_interface && !registry.is_interface(receiver_type) {
                op = OpCode::InvokeVirtual;
            }
            owner = receiver_type.type_hash;
        }
        trace!(method = %target.name, ?op, narrowed = owner != target.owner, "direct call");

        self.load_arguments(args, &target.params)?;

        let argc = arg_count_u8(target.params.len(), span)?;
        self.emitter.emit_invoke(op, owner, target.method_hash, argc);
        let pushed = self.pushed_since(start)?;
        self.stack.remove(pushed)?;
        if target.return_type.is_void() {
            return Ok(Value::Void);
        }
        self.stack.push(target.return_type);
        Ok(Value::Slot(target.return_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LocalExpr, MethodCallExpr};
    use crate::calls::CallTier;
    use crate::context::Frame;
    use crate::test_support::Harness;
    use callgen_core::{TypeHash, primitives};

    fn local<'ast>(ty: TypeHash) -> Expr<'ast> {
        Expr::Local(LocalExpr {
            name: "v",
            slot: 1,
            data_type: DataType::simple(ty),
            by_ref: false,
        })
    }

    #[test]
    fn final_public_owner_is_not_narrowed() {
        let mut h = Harness::new();
        let counter = h.fixtures.counter;
        let foo = h.fixtures.counter_foo;
        let args = [Expr::Int(1)];
        let call = MethodCallExpr::new(local(counter), "foo", &args).with_target(foo);

        let (_, chunk, stack) = h.run(|l| l.lower_method_call(&call));

        chunk.assert_lacks_opcode(OpCode::CheckCast);
        assert_eq!(h.last_invoke_owner(&chunk), counter);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn subtype_receiver_narrows_owner() {
        let mut h = Harness::new();
        let circle = h.fixtures.circle;
        let area = h.fixtures.shape_area;
        let call = MethodCallExpr::new(local(circle), "area", &[]).with_target(area);

        let (_, chunk, _) = h.run(|l| l.lower_method_call(&call));

        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::InvokeVirtual]);
        assert_eq!(h.last_invoke_owner(&chunk), circle);
    }

    #[test]
    fn object_methods_keep_declaring_owner() {
        let mut h = Harness::new();
        let circle = h.fixtures.circle;
        let to_string = h.fixtures.object_to_string;
        let call = MethodCallExpr::new(local(circle), "toString", &[]).with_target(to_string);

        let (_, chunk, _) = h.run(|l| l.lower_method_call(&call));
        assert_eq!(h.last_invoke_owner(&chunk), primitives::OBJECT);
    }

    #[test]
    fn super_receiver_is_special() {
        let mut h = Harness::new();
        let shape = h.fixtures.shape;
        let area = h.fixtures.shape_area;
        let call = MethodCallExpr::new(Expr::Super, "area", &[]).with_target(area);

        let (tier, chunk, stack) = h.run(|l| l.lower_method_call(&call));

        assert_eq!(tier, CallTier::Direct);
        chunk.assert_opcodes(&[OpCode::GetThis, OpCode::InvokeSpecial]);
        assert_eq!(h.last_invoke_owner(&chunk), shape);
        assert_eq!(stack.slots(), &[DataType::simple(primitives::DOUBLE)]);
    }

    #[test]
    fn inaccessible_interface_is_called_through_implementor() {
        let mut h = Harness::new();
        let visible = h.fixtures.visible;
        let ping = h.fixtures.hidden_ping;
        let call = MethodCallExpr::new(local(visible), "ping", &[]).with_target(ping);

        let (_, chunk, _) = h.run(|l| l.lower_method_call(&call));

        chunk.assert_opcodes(&[OpCode::GetLocal, OpCode::InvokeVirtual, OpCode::PushNull]);
        assert_eq!(h.last_invoke_owner(&chunk), visible);
    }

    #[test]
    fn dynamic_receiver_is_cast_to_declaring_type() {
        let mut h = Harness::new();
        let counter = h.fixtures.counter;
        let foo = h.fixtures.counter_foo;
        let args = [Expr::Int(1)];
        let call = MethodCallExpr::new(local(primitives::OBJECT), "foo", &args).with_target(foo);

        let (_, chunk, _) = h.run(|l| l.lower_method_call(&call));

        chunk.assert_opcodes(&[
            OpCode::GetLocal,
            OpCode::CheckCast,
            OpCode::PushOne,
            OpCode::InvokeVirtual,
        ]);
        assert_eq!(h.last_invoke_owner(&chunk), counter);
    }

    #[test]
    fn static_target_skips_receiver() {
        let mut h = Harness::new();
        let create = h.fixtures.shape_create;
        let call = MethodCallExpr::new(local(h.fixtures.shape), "create", &[]).with_target(create);

        let (_, chunk, stack) = h.run(|l| l.lower_method_call(&call));

        chunk.assert_opcodes(&[OpCode::InvokeStatic]);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn implicit_call_to_outer_class_goes_through_outer_this() {
        let mut h = Harness::new();
        let inner = h.fixtures.inner;
        let outer = h.fixtures.outer;
        let greet = h.fixtures.outer_greet;
        h.frame = Frame::method(inner);
        let call = MethodCallExpr::implicit("greet", &[]).with_target(greet);

        let (_, chunk, _) = h.run(|l| l.lower_method_call(&call));

        chunk.assert_opcodes(&[OpCode::GetOuterThis, OpCode::InvokeVirtual, OpCode::PushNull]);
        assert_eq!(h.last_invoke_owner(&chunk), outer);

        h.frame = Frame::method(inner).generated();
        let (_, chunk, _) = h.run(|l| l.lower_method_call(&call));
        chunk.assert_opcodes(&[
            OpCode::GetThis,
            OpCode::CheckCast,
            OpCode::InvokeVirtual,
            OpCode::PushNull,
        ]);
    }
}
