//! Cached tier: calls through inline-cache call sites.

use callgen_core::{DataType, Span};

use super::{CallLowering, CallRequest, Result, arg_count_u8};
use crate::adapter::{Adapter, CallFlags};
use crate::ast::Expr;

/// Message of the call site that allocates and initializes an instance.
pub const CONSTRUCTOR_SITE: &str = "<init>";

impl<'a, 'pool> CallLowering<'a, 'pool> {
    pub(super) fn make_cached_call(
        &mut self,
        request: &CallRequest<'_>,
        spread: bool,
    ) -> Result<bool> {
        if !request.adapter.is_cacheable() || request.spread_safe {
            return Ok(false);
        }
        let Some(name) = request.message.name() else {
            return Ok(false);
        };

        let mut flags = CallFlags::empty();
        flags.set(CallFlags::SAFE, request.safe);
        flags.set(CallFlags::IMPLICIT_THIS, request.implicit_this);
        flags.set(
            CallFlags::CURRENT,
            request.adapter == Adapter::InvokeMethodOnCurrent,
        );
        flags.set(
            CallFlags::STATIC,
            request.adapter == Adapter::InvokeStaticMethod,
        );
        self.write_call_site(&request.receiver, name, request.args, flags, spread, request.span)?;
        Ok(true)
    }

    /// Emit `receiver args CallSite`; the slot is allocated once the
    /// operands are on the stack.
    pub(super) fn write_call_site(
        &mut self,
        receiver: &Expr<'_>,
        name: &str,
        args: &[Expr<'_>],
        mut flags: CallFlags,
        spread: bool,
        span: Span,
    ) -> Result<()> {
        let start = self.stack.depth();
        self.lower_expr(receiver)?;
        self.box_top()?;

        let argc = if spread {
            flags |= CallFlags::SPREAD;
            self.load_argument_vector(args, span)?;
            1
        } else {
            for arg in args {
                self.lower_expr(arg)?;
                self.box_top()?;
            }
            arg_count_u8(args.len(), span)?
        };

        let slot = self.class.call_sites_mut().make_call_site(name, flags)?;
        self.emitter.emit_call_site(slot, argc, flags.bits());
        let pushed = self.pushed_since(start)?;
        self.stack.replace(DataType::object(), pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{CallExpr, MethodCallExpr};
    use crate::bytecode::OpCode;
    use crate::calls::CallTier;
    use crate::test_support::Harness;
    use bumpalo::Bump;

    #[test]
    fn implicit_call_flags() {
        let mut h = Harness::new();
        let args = [Expr::Int(1), Expr::Null];
        let call = MethodCallExpr::implicit("run", &args);

        let (tier, chunk, stack) = h.run(|l| l.lower_method_call(&call));

        assert_eq!(tier, CallTier::Cached);
        chunk.assert_opcodes(&[
            OpCode::GetThis,
            OpCode::PushOne,
            OpCode::Box,
            OpCode::PushNull,
            OpCode::CallSite,
        ]);
        let flags = h.class.call_sites().site_flags(0).unwrap();
        assert_eq!(flags, CallFlags::IMPLICIT_THIS | CallFlags::CURRENT);
        assert_eq!(chunk.read_byte(chunk.len() - 2), Some(2));
        assert_eq!(stack.slots(), &[DataType::object()]);
    }

    #[test]
    fn slots_follow_evaluation_order() {
        let mut h = Harness::new();
        let arena = Bump::new();
        let call_of = |name: &'static str| {
            Expr::Call(&*arena.alloc(CallExpr::Method(MethodCallExpr::implicit(name, &[]))))
        };
        let receiver = call_of("a");
        let args = arena.alloc_slice_copy(&[call_of("b"), call_of("c")]);
        let call = MethodCallExpr::new(receiver, "m", args);

        h.run(|l| l.lower_method_call(&call));

        let sites = h.class.call_sites();
        let names: Vec<_> = (0..sites.site_count() as u16)
            .filter_map(|slot| sites.site_name(slot))
            .collect();
        assert_eq!(names, ["a", "b", "c", "m"]);
    }

    #[test]
    fn spread_arguments_pass_one_vector() {
        let mut h = Harness::new();
        let arena = Bump::new();
        let inner = arena.alloc(Expr::Null);
        let args = arena.alloc_slice_copy(&[Expr::Spread(inner)]);
        let call = MethodCallExpr::new(Expr::Str("s"), "m", args);

        let (_, chunk, stack) = h.run(|l| l.lower_method_call(&call));

        chunk.assert_opcodes(&[
            OpCode::Constant,
            OpCode::PushNull,
            OpCode::Despread,
            OpCode::CallSite,
        ]);
        assert_eq!(chunk.read_byte(chunk.len() - 2), Some(1));
        assert!(h.class.call_sites().site_flags(0).unwrap().contains(CallFlags::SPREAD));
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn spread_safe_is_not_cached() {
        let mut h = Harness::new();
        let call = MethodCallExpr::new(Expr::Str("s"), "m", &[]).spread_safe();

        let (tier, _, _) = h.run(|l| l.lower_method_call(&call));
        assert_eq!(tier, CallTier::Uncached);
        assert_eq!(h.class.call_sites().site_count(), 0);
    }
}
