//! Constructor calls.
//!
//! `new T(args)` binds directly when the optimizer resolved the constructor
//! and the fast path is on, instantiates anonymous subclasses with their
//! captured references, and otherwise goes through the `<init>` call site.
//!
//! `this(args)` and `super(args)` bind directly only inside a constructor,
//! without spread arguments, when exactly one candidate has the call's
//! arity. Everything else selects the constructor at runtime, keyed by the
//! fingerprint of its descriptor:
//!
//! ```text
//! args[]                                  [V]
//! Dup  argc  LoadClass(C)  candidates     [V V int Class int]
//! CallAdapter(SelectConstructor, 4)       [V key]
//! GetThis | New(C)  Swap                  [V this key]
//! LookupSwitch                            [V this]
//!   case key(ctor): unpack V  InvokeSpecial(C, ctor)  Jump end
//!   default:        RaiseFatal
//! end:
//! ```
//!
//! `argc` is `-1` when the arguments were spread into the vector.

use tracing::{debug, trace};

use callgen_core::{CompilationError, ConstructorEntry, DataType, Span, TypeHash, primitives};

use super::call_site::CONSTRUCTOR_SITE;
use super::{Candidate, CallLowering, ConstructorDispatch, ConstructorTable, Result, arg_count_u8};
use crate::adapter::{Adapter, CallFlags};
use crate::ast::{
    ConstructorCallExpr, Expr, SpecialConstructorCallExpr, SpecialKind, contains_spread,
};
use crate::bytecode::OpCode;

/// Message raised when the selected key matches no compiled constructor.
pub const BINARY_INCOMPATIBLE_MESSAGE: &str = "This class has been compiled with a super class \
     which is binary incompatible with the current super class found on classpath. You should \
     recompile this class with the new version.";

impl<'a, 'pool> CallLowering<'a, 'pool> {
    /// Lower `new Class(args)`, leaving the instance on the stack.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lower_constructor_call(
        &mut self,
        call: &ConstructorCallExpr<'_>,
    ) -> Result<ConstructorDispatch> {
        self.mark_line(call.span);
        let spread = contains_spread(call.args);

        let dispatch = if call.anonymous {
            self.write_anonymous_constructor_call(call)?;
            ConstructorDispatch::AnonymousSubclass
        } else if let Some(ctor) = self.fast_path_constructor(call, spread)? {
            self.write_direct_constructor_call(call.class, ctor, call.args, call.span)?;
            ConstructorDispatch::Direct
        } else {
            self.write_call_site(
                &Expr::ClassRef(call.class),
                CONSTRUCTOR_SITE,
                call.args,
                CallFlags::empty(),
                spread,
                call.span,
            )?;
            ConstructorDispatch::CallSite
        };

        debug!(class = %self.registry.type_name(call.class), ?dispatch, "lowered constructor call");
        Ok(dispatch)
    }

    /// Lower `this(args)` or `super(args)`.
    ///
    /// Inside a constructor the call leaves nothing on the stack. Elsewhere
    /// the new instance is left, typed as the called class.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lower_special_constructor_call(
        &mut self,
        call: &SpecialConstructorCallExpr<'_>,
    ) -> Result<ConstructorDispatch> {
        self.mark_line(call.span);

        let hook = self.closure_hook;
        if hook.lower_special_constructor(call, self)? {
            debug!(kind = ?call.kind, "special constructor call lowered by closure hook");
            return Ok(ConstructorDispatch::GeneratedClosure);
        }

        let registry = self.registry;
        let enclosing = self.frame.class;
        let call_class = match call.kind {
            SpecialKind::This => enclosing,
            SpecialKind::Super => registry
                .get(enclosing)
                .and_then(|entry| entry.super_class)
                .ok_or_else(|| CompilationError::UnknownType {
                    name: format!("superclass of {}", registry.type_name(enclosing)),
                    span: call.span,
                })?,
        };
        let table = self
            .class
            .constructor_table(registry, call_class, call.span)?;

        let direct = if self.frame.is_constructor && !contains_spread(call.args) {
            table.unique_arity_match(call.args.len())
        } else {
            None
        };
        let dispatch = match direct {
            Some(candidate) => {
                self.write_direct_special_call(call_class, &candidate.ctor, call.args, call.span)?;
                ConstructorDispatch::Direct
            }
            None => {
                self.write_constructor_switch(call_class, &table, call.args, call.span)?;
                ConstructorDispatch::MopFallback
            }
        };

        debug!(
            kind = ?call.kind,
            class = %registry.type_name(call_class),
            ?dispatch,
            "lowered special constructor call"
        );
        Ok(dispatch)
    }

    // ==========================================================================
    // New Instances
    // ==========================================================================

    fn fast_path_constructor(
        &self,
        call: &ConstructorCallExpr<'_>,
        spread: bool,
    ) -> Result<Option<&'a ConstructorEntry>> {
        let Some(hash) = call.optimized_target else {
            return Ok(None);
        };
        if !self.frame.options.fast_path || spread {
            return Ok(None);
        }
        let registry = self.registry;
        registry
            .constructor(hash)
            .map(Some)
            .ok_or_else(|| CompilationError::UnknownMethod {
                name: hash.to_string(),
                span: call.span,
            })
    }

    fn write_direct_constructor_call(
        &mut self,
        class: TypeHash,
        ctor: &ConstructorEntry,
        args: &[Expr<'_>],
        span: Span,
    ) -> Result<()> {
        let instance = DataType::simple(class);
        self.emitter.emit_new(class);
        self.emitter.emit_dup();
        self.stack.push(instance);
        self.stack.push(instance);

        self.load_arguments(args, &ctor.params)?;

        let argc = arg_count_u8(ctor.params.len(), span)?;
        self.emitter
            .emit_invoke(OpCode::InvokeSpecial, class, ctor.ctor_hash, argc);
        self.stack.remove(ctor.params.len() + 1)
    }

    /// Captured mutable locals are passed as their reference cells.
    fn write_anonymous_constructor_call(&mut self, call: &ConstructorCallExpr<'_>) -> Result<()> {
        let registry = self.registry;
        let entry = registry
            .get(call.class)
            .ok_or_else(|| CompilationError::UnknownType {
                name: call.class.to_string(),
                span: call.span,
            })?;
        let ctor = entry
            .constructors
            .first()
            .ok_or_else(|| CompilationError::NoConstructors {
                class_name: entry.name.clone(),
                span: call.span,
            })?;
        if ctor.params.len() != call.args.len() {
            return Err(CompilationError::internal(format!(
                "anonymous {} constructor takes {} arguments, got {}",
                entry.name,
                ctor.params.len(),
                call.args.len()
            )));
        }

        let instance = DataType::simple(call.class);
        self.emitter.emit_new(call.class);
        self.emitter.emit_dup();
        self.stack.push(instance);
        self.stack.push(instance);

        for (arg, param) in call.args.iter().zip(&ctor.params) {
            match arg {
                Expr::Local(local) if local.by_ref => {
                    self.emitter.emit_get_ref(local.slot);
                    self.stack.push(DataType::simple(primitives::REFERENCE));
                }
                _ => self.lower_expr(arg)?,
            }
            self.coerce_to(param.data_type)?;
        }

        let argc = arg_count_u8(ctor.params.len(), call.span)?;
        self.emitter
            .emit_invoke(OpCode::InvokeSpecial, call.class, ctor.ctor_hash, argc);
        self.stack.remove(ctor.params.len() + 1)
    }

    // ==========================================================================
    // Special Constructors
    // ==========================================================================

    fn write_direct_special_call(
        &mut self,
        call_class: TypeHash,
        ctor: &ConstructorEntry,
        args: &[Expr<'_>],
        span: Span,
    ) -> Result<()> {
        let start = self.stack.depth();
        self.emitter.emit_get_this();
        self.stack.push(DataType::simple(self.frame.class));

        for (arg, param) in args.iter().zip(&ctor.params) {
            self.lower_expr(arg)?;
            if !arg.is_null() {
                self.coerce_to(param.data_type)?;
            }
        }

        let argc = arg_count_u8(ctor.params.len(), span)?;
        self.emitter
            .emit_invoke(OpCode::InvokeSpecial, call_class, ctor.ctor_hash, argc);
        let pushed = self.pushed_since(start)?;
        self.stack.remove(pushed)
    }

    fn write_constructor_switch(
        &mut self,
        call_class: TypeHash,
        table: &ConstructorTable,
        args: &[Expr<'_>],
        span: Span,
    ) -> Result<()> {
        let registry = self.registry;
        self.class
            .report_collisions(registry, table, span, &mut *self.diagnostics);

        let in_constructor = self.frame.is_constructor;
        let start = self.stack.depth();
        let argc = if contains_spread(args) {
            -1
        } else {
            args.len() as i64
        };

        self.load_argument_vector(args, span)?;
        self.emitter.emit_dup();
        self.stack.dup()?;
        self.emitter.emit_int(argc);
        self.stack.push(DataType::simple(primitives::INT));
        self.emitter.emit_load_class(call_class);
        self.stack.push(DataType::simple(primitives::CLASS));
        self.emitter.emit_int(table.candidates().len() as i64);
        self.stack.push(DataType::simple(primitives::INT));
        self.emitter
            .emit_call_adapter(Adapter::SelectConstructor.id(), 4, 0);
        self.stack.replace(DataType::simple(primitives::INT), 4)?;

        if in_constructor {
            self.emitter.emit_get_this();
            self.stack.push(DataType::simple(self.frame.class));
        } else {
            self.emitter.emit_new(call_class);
            self.stack.push(DataType::simple(call_class));
        }
        self.emitter.emit_swap();
        self.stack.swap()?;

        let arms = table.switch_arms();
        let keys: Vec<i32> = arms.iter().map(|c| c.fingerprint).collect();
        let labels = self.emitter.emit_lookup_switch(&keys);
        self.stack.pop()?;
        let entry = self.stack.snapshot();

        let mut exits = Vec::with_capacity(arms.len());
        let mut exit_state = None;
        for (candidate, label) in arms.iter().zip(labels.cases) {
            self.stack.restore(entry.clone());
            self.emitter.patch_jump(label);
            trace!(
                descriptor = %candidate.descriptor,
                key = candidate.fingerprint,
                "constructor switch arm"
            );
            self.write_switch_arm(call_class, candidate, in_constructor, span)?;
            exits.push(self.emitter.emit_jump(OpCode::Jump));
            exit_state = Some(self.stack.snapshot());
        }

        self.stack.restore(entry);
        self.emitter.patch_jump(labels.default);
        self.emitter.emit_raise_fatal(BINARY_INCOMPATIBLE_MESSAGE);

        for exit in exits {
            self.emitter.patch_jump(exit);
        }
        let exit_state = exit_state
            .ok_or_else(|| CompilationError::internal("constructor switch has no arms"))?;
        self.stack.restore(exit_state);

        if in_constructor {
            self.emitter.emit_pop();
            self.stack.pop()?;
        } else {
            self.emitter.emit_swap();
            self.stack.swap()?;
            self.emitter.emit_pop();
            self.stack.pop()?;
        }

        let expected = start + usize::from(!in_constructor);
        if self.stack.depth() != expected {
            return Err(CompilationError::internal(format!(
                "constructor switch left {} stack entries, expected {expected}",
                self.stack.depth()
            )));
        }
        Ok(())
    }

    /// Unpack the argument vector into `candidate`'s parameters and invoke it.
    ///
    /// Entered with `[V this]`; leaves `[V]` in a constructor, `[V this]`
    /// otherwise.
    fn write_switch_arm(
        &mut self,
        call_class: TypeHash,
        candidate: &Candidate,
        in_constructor: bool,
        span: Span,
    ) -> Result<()> {
        if in_constructor {
            self.emitter.emit_swap();
            self.stack.swap()?;
            self.emitter.emit(OpCode::DupX1);
            self.stack.dup_x1()?;
        } else {
            self.emitter.emit(OpCode::DupX1);
            self.stack.dup_x1()?;
            self.emitter.emit(OpCode::Dup2X1);
            self.stack.dup2_x1()?;
            self.emitter.emit_pop();
            self.stack.pop()?;
        }

        let params = &candidate.ctor.params;
        let (fixed, variadic) = match params.split_last() {
            Some((last, rest)) if last.data_type.is_array() => (rest, Some(last)),
            _ => (params.as_slice(), None),
        };

        // [.. this V]: each parameter is loaded beneath the vector
        for (index, param) in fixed.iter().enumerate() {
            self.emitter.emit_dup();
            self.stack.dup()?;
            self.emitter.emit_int(index as i64);
            self.stack.push(DataType::simple(primitives::INT));
            self.emitter.emit_array_load();
            self.stack.replace(DataType::object(), 2)?;
            self.coerce_to(param.data_type)?;
            self.emitter.emit_swap();
            self.stack.swap()?;
        }

        match variadic {
            Some(param) => {
                let array = param.data_type.signature_hash();
                self.emitter.emit_int(fixed.len() as i64);
                self.stack.push(DataType::simple(primitives::INT));
                self.emitter.emit_load_class(array);
                self.stack.push(DataType::simple(primitives::CLASS));
                self.emitter
                    .emit_call_adapter(Adapter::CastToVargsArray.id(), 3, 0);
                self.emitter.emit_check_cast(array);
                self.stack.replace(param.data_type, 3)?;
            }
            None => {
                self.emitter.emit_pop();
                self.stack.pop()?;
            }
        }

        let argc = arg_count_u8(params.len(), span)?;
        self.emitter
            .emit_invoke(OpCode::InvokeSpecial, call_class, candidate.ctor.ctor_hash, argc);
        self.stack.remove(params.len() + 1)
    }
}
