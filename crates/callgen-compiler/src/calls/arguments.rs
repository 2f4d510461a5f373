//! Argument binding.
//!
//! Binds call arguments to formal parameters. A trailing array parameter is
//! variadic: surplus arguments, or a missing one, are packed into a fresh
//! array of its element type.

use callgen_core::{CompilationError, DataType, Param, Span, primitives};

use super::{CallLowering, Result, arg_count_u8};
use crate::ast::{Expr, contains_spread};

/// Widest argument list a `Despread` mask can describe.
const MAX_SPREAD_ARGS: usize = 32;

impl<'a, 'pool> CallLowering<'a, 'pool> {
    /// Push `args` coerced to `params`, packing trailing variadic arguments.
    ///
    /// The stack grows by exactly `params.len()` entries.
    pub fn load_arguments(&mut self, args: &[Expr<'_>], params: &[Param]) -> Result<()> {
        let Some(last) = params.last() else {
            if args.is_empty() {
                return Ok(());
            }
            return Err(arity_mismatch(args.len(), 0));
        };

        let param_count = params.len();
        let arg_count = args.len();
        if arg_count + 1 < param_count {
            return Err(arity_mismatch(arg_count, param_count));
        }

        let variadic = last.data_type;
        let packs = variadic.is_array()
            && (arg_count > param_count
                || arg_count + 1 == param_count
                || !self.resolve_type(&args[param_count - 1]).is_array());

        if !packs {
            if arg_count != param_count {
                return Err(arity_mismatch(arg_count, param_count));
            }
            for (arg, param) in args.iter().zip(params) {
                self.lower_expr(arg)?;
                self.coerce_to(param.data_type)?;
            }
            return Ok(());
        }

        let fixed = param_count - 1;
        for (arg, param) in args[..fixed].iter().zip(params) {
            self.lower_expr(arg)?;
            self.coerce_to(param.data_type)?;
        }

        let element = variadic
            .component()
            .ok_or_else(|| CompilationError::internal("variadic parameter is not an array"))?;
        let rest = &args[fixed..];
        for arg in rest {
            self.lower_expr(arg)?;
            self.coerce_to(element)?;
        }
        let count = u16::try_from(rest.len()).map_err(|_| CompilationError::TooManyArguments {
            count: rest.len(),
            max: u16::MAX as usize,
            span: Span::synthetic(),
        })?;
        self.emitter.emit_array_init(element.signature_hash(), count);
        self.stack.replace(variadic, rest.len())
    }

    /// Push all `args` boxed into one `Object[]`, expanding spread arguments.
    pub fn load_argument_vector(&mut self, args: &[Expr<'_>], span: Span) -> Result<()> {
        let spread = contains_spread(args);
        if spread && args.len() > MAX_SPREAD_ARGS {
            return Err(CompilationError::TooManyArguments {
                count: args.len(),
                max: MAX_SPREAD_ARGS,
                span,
            });
        }

        let mut spread_mask = 0u32;
        for (i, arg) in args.iter().enumerate() {
            self.lower_expr(arg)?;
            self.box_top()?;
            if arg.is_spread() {
                spread_mask |= 1 << i;
            }
        }

        if spread {
            let count = arg_count_u8(args.len(), span)?;
            self.emitter.emit_despread(count, spread_mask);
        } else {
            let count =
                u16::try_from(args.len()).map_err(|_| CompilationError::TooManyArguments {
                    count: args.len(),
                    max: u16::MAX as usize,
                    span,
                })?;
            self.emitter.emit_array_init(primitives::OBJECT, count);
        }
        self.stack.replace(DataType::object_array(), args.len())
    }
}

fn arity_mismatch(args: usize, params: usize) -> CompilationError {
    CompilationError::internal(format!(
        "{args} arguments cannot bind to {params} parameters"
    ))
}
