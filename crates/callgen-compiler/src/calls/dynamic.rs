//! Uncached tier: fully dynamic dispatch through a runtime adapter.
//!
//! ```text
//! sender receiver message args...  CallAdapter(adapter, argc, flags)  -> Object
//! ```

use callgen_core::{DataType, TypeHash, primitives};

use super::{CallLowering, CallRequest, Result};
use crate::adapter::{Adapter, CallFlags};
use crate::ast::{Expr, Message};

impl<'a, 'pool> CallLowering<'a, 'pool> {
    pub(super) fn make_uncached_call(
        &mut self,
        request: &CallRequest<'_>,
        sender: TypeHash,
        spread: bool,
    ) -> Result<()> {
        let start = self.stack.depth();

        if request.adapter == Adapter::SetProperty {
            self.emitter.emit_null();
            self.stack.push(DataType::object());
        } else {
            self.emitter.emit_load_class(sender);
            self.stack.push(DataType::simple(primitives::CLASS));
        }

        let name = request.message.name();
        if let (Adapter::InvokeMethodOnSuper, Some(name)) = (request.adapter, name) {
            self.class.record_super_method(name);
        }

        self.lower_expr(&request.receiver)?;
        self.box_top()?;

        match request.message {
            Message::Name(name) => {
                self.emitter.emit_string(name);
                self.stack.push(DataType::simple(primitives::STRING));
            }
            Message::Computed(expr) => {
                self.lower_expr(expr)?;
                self.box_top()?;
            }
        }

        let mut flags = CallFlags::empty();
        flags.set(CallFlags::SAFE, request.safe);
        flags.set(CallFlags::SPREAD_SAFE, request.spread_safe);

        let args = request.args;
        // `-1` when the count does not fit the operand; the vector carries it.
        let argc = if spread {
            -1
        } else {
            i8::try_from(args.len()).unwrap_or(-1)
        };
        if argc < 0 || args.len() > self.frame.options.max_fixed_args {
            flags |= CallFlags::SPREAD;
            self.load_argument_vector(args, request.span)?;
        } else {
            for arg in args {
                self.lower_expr(arg)?;
                self.box_top()?;
                if let Expr::Cast(cast) = arg {
                    self.wrap_cast_argument(cast.target)?;
                }
            }
        }

        self.emitter
            .emit_call_adapter(request.adapter.id(), argc, flags.bits());
        let pushed = self.pushed_since(start)?;
        self.stack.replace(DataType::object(), pushed)
    }

    /// Keep an explicit cast visible to dynamic dispatch.
    fn wrap_cast_argument(&mut self, target: DataType) -> Result<()> {
        self.emitter.emit_load_class(target.signature_hash());
        self.emitter.emit_call_adapter(Adapter::Wrap.id(), 2, 0);
        self.stack.replace(DataType::object(), 1)
    }
}
