//! Call lowering.
//!
//! [`CallLowering`] is the emission context for one method body. It borrows
//! the registry, the per-class state, the emitter and the operand stack, and
//! exposes one entry point per call kind:
//!
//! - [`lower_method_call`](CallLowering::lower_method_call) - `recv.m(args)`
//! - [`lower_static_method_call`](CallLowering::lower_static_method_call) - `Owner.m(args)`
//! - [`lower_constructor_call`](CallLowering::lower_constructor_call) - `new T(args)`
//! - [`lower_special_constructor_call`](CallLowering::lower_special_constructor_call) - `this(args)` / `super(args)`
//!
//! Method calls try three tiers in order and commit to the first that
//! applies:
//!
//! ```text
//! direct    statically bound Invoke* against a resolved target
//! cached    CallSite through an inline-cache slot
//! uncached  CallAdapter with sender, receiver, message and arguments
//! ```
//!
//! Every method call leaves exactly one value on the operand stack. Void
//! targets are normalized to `null` at the single point where the result is
//! materialized.

mod arguments;
mod call_site;
mod coerce;
mod constructor;
mod ctor_table;
mod direct;
mod dynamic;
mod selector;

pub use call_site::CONSTRUCTOR_SITE;
pub use constructor::BINARY_INCOMPATIBLE_MESSAGE;
pub use ctor_table::{Candidate, Collision, ConstructorTable, FingerprintFn, fingerprint};

use callgen_core::{CompilationError, DataType, DiagnosticSink, Span, TypeHash, primitives};
use callgen_registry::TypeRegistry;

use crate::adapter::Adapter;
use crate::ast::{CallExpr, Expr, Message};
use crate::class_state::ClassLowering;
use crate::collaborators::{
    AnnotatedTypeResolver, ClosureConstructorHook, NoClosureHook, TypeResolver,
};
use crate::context::Frame;
use crate::emit::BytecodeEmitter;
use crate::stack::OperandStack;

type Result<T> = std::result::Result<T, CompilationError>;

/// The result of a lowering step, before it is made into a stack value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value {
    /// Nothing was left on the stack (a `void` target).
    Void,
    /// One value of this type is on top of the stack.
    Slot(DataType),
}

/// The tier that lowered a method call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTier {
    Direct,
    Cached,
    Uncached,
    /// A call through a closure stored in a field.
    Closure,
}

/// The strategy that lowered a constructor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorDispatch {
    /// Statically bound `InvokeSpecial` of a known constructor.
    Direct,
    /// Instantiation of a synthetic anonymous subclass.
    AnonymousSubclass,
    /// `new T(args)` through the `<init>` call site.
    CallSite,
    /// Runtime selection through the fingerprint switch.
    MopFallback,
    /// Taken over by the closure constructor hook.
    GeneratedClosure,
}

/// One method call as seen by the tier selector.
#[derive(Debug, Clone, Copy)]
pub struct CallRequest<'ast> {
    pub receiver: Expr<'ast>,
    pub message: Message<'ast>,
    pub args: &'ast [Expr<'ast>],
    pub adapter: Adapter,
    /// Sender class for dynamic dispatch; defaults to the enclosing class.
    pub sender: Option<TypeHash>,
    pub safe: bool,
    pub spread_safe: bool,
    pub implicit_this: bool,
    pub method_target: Option<TypeHash>,
    pub optimized_target: Option<TypeHash>,
    pub span: Span,
}

impl<'ast> CallRequest<'ast> {
    /// A plain request for `receiver.name(args)` through `adapter`.
    pub fn new(
        receiver: Expr<'ast>,
        message: Message<'ast>,
        args: &'ast [Expr<'ast>],
        adapter: Adapter,
    ) -> Self {
        Self {
            receiver,
            message,
            args,
            adapter,
            sender: None,
            safe: false,
            spread_safe: false,
            implicit_this: false,
            method_target: None,
            optimized_target: None,
            span: Span::synthetic(),
        }
    }
}

/// Emission context for lowering calls in one method body.
pub struct CallLowering<'a, 'pool> {
    registry: &'a TypeRegistry,
    frame: &'a Frame,
    class: &'a mut ClassLowering,
    emitter: &'a mut BytecodeEmitter<'pool>,
    stack: &'a mut OperandStack,
    diagnostics: &'a mut dyn DiagnosticSink,
    resolver: &'a dyn TypeResolver,
    closure_hook: &'a dyn ClosureConstructorHook,
}

impl<'a, 'pool> CallLowering<'a, 'pool> {
    pub fn new(
        registry: &'a TypeRegistry,
        frame: &'a Frame,
        class: &'a mut ClassLowering,
        emitter: &'a mut BytecodeEmitter<'pool>,
        stack: &'a mut OperandStack,
        diagnostics: &'a mut dyn DiagnosticSink,
    ) -> Self {
        Self {
            registry,
            frame,
            class,
            emitter,
            stack,
            diagnostics,
            resolver: &AnnotatedTypeResolver,
            closure_hook: &NoClosureHook,
        }
    }

    pub fn with_resolver(mut self, resolver: &'a dyn TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_closure_hook(mut self, hook: &'a dyn ClosureConstructorHook) -> Self {
        self.closure_hook = hook;
        self
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    pub fn frame(&self) -> &'a Frame {
        self.frame
    }

    pub fn emitter(&mut self) -> &mut BytecodeEmitter<'pool> {
        self.emitter
    }

    pub fn stack(&mut self) -> &mut OperandStack {
        self.stack
    }

    /// Lower any call expression, leaving its value on the stack.
    pub fn lower_call(&mut self, call: &CallExpr<'_>) -> Result<()> {
        match call {
            CallExpr::Method(c) => self.lower_method_call(c).map(drop),
            CallExpr::Static(c) => self.lower_static_method_call(c).map(drop),
            CallExpr::Constructor(c) => self.lower_constructor_call(c).map(drop),
            CallExpr::SpecialConstructor(_) => Err(CompilationError::internal(
                "special constructor call used as a value",
            )),
        }
    }

    // ==========================================================================
    // Expressions
    // ==========================================================================

    /// Static type of `expr` as seen by the type resolver.
    pub fn resolve_type(&self, expr: &Expr<'_>) -> DataType {
        self.resolver.resolve_type(expr, self.frame, self.registry)
    }

    /// Evaluate a receiver or argument expression, pushing exactly one value.
    pub fn lower_expr(&mut self, expr: &Expr<'_>) -> Result<()> {
        match expr {
            Expr::Null => {
                self.emitter.emit_null();
                self.stack.push(DataType::object());
            }
            Expr::Bool(value) => {
                self.emitter.emit_bool(*value);
                self.stack.push(DataType::simple(primitives::BOOLEAN));
            }
            Expr::Int(value) => {
                self.emitter.emit_int(*value);
                self.stack.push(DataType::simple(primitives::INT));
            }
            Expr::Str(value) => {
                self.emitter.emit_string(value);
                self.stack.push(DataType::simple(primitives::STRING));
            }
            Expr::Local(local) => {
                self.emitter.emit_get_local(local.slot);
                self.stack.push(local.data_type);
            }
            Expr::This if self.frame.is_static() => {
                self.emitter.emit_load_class(self.frame.class);
                self.stack.push(DataType::simple(primitives::CLASS));
            }
            Expr::This | Expr::Super => {
                let ty = self.resolve_type(expr);
                self.emitter.emit_get_this();
                self.stack.push(ty);
            }
            Expr::ClassRef(class) => {
                self.emitter.emit_load_class(*class);
                self.stack.push(DataType::simple(primitives::CLASS));
            }
            Expr::Cast(cast) => {
                self.lower_expr(&cast.expr)?;
                self.coerce_to(cast.target)?;
            }
            Expr::Spread(inner) => self.lower_expr(inner)?,
            Expr::Call(call) => self.lower_call(call)?,
        }
        Ok(())
    }

    /// Box the top of stack if it is a primitive.
    pub fn box_top(&mut self) -> Result<DataType> {
        let top = self.top()?;
        if !self.registry.is_primitive(top) {
            return Ok(top);
        }
        let boxed = self.registry.boxed(top);
        self.emitter.emit_box(top.type_hash);
        self.stack.replace(boxed, 1)?;
        Ok(boxed)
    }

    /// Convert the top of stack to `target` for use as a typed operand.
    ///
    /// Primitives are boxed or unboxed as needed. A reference value is
    /// checked-cast only when its tracked type is not already assignable; in
    /// that case the tracked type is left as is.
    pub fn coerce_to(&mut self, target: DataType) -> Result<()> {
        let mut top = self.top()?;
        if top == target {
            return Ok(());
        }

        if self.registry.is_primitive(target) {
            if self.registry.is_primitive(top) {
                self.emitter.emit_box(top.type_hash);
            }
            self.emitter.emit_unbox(target.type_hash);
            return self.stack.replace(target, 1);
        }

        if self.registry.is_primitive(top) {
            top = self.box_top()?;
        }
        if !self.registry.is_assignable(top, target) {
            self.emitter.emit_check_cast(target.signature_hash());
            self.stack.replace(target, 1)?;
        }
        Ok(())
    }

    /// Turn a lowering result into exactly one stack value.
    pub(crate) fn materialize(&mut self, value: Value) -> DataType {
        match value {
            Value::Slot(ty) => ty,
            Value::Void => {
                self.emitter.emit_null();
                self.stack.push(DataType::object());
                DataType::object()
            }
        }
    }

    fn top(&self) -> Result<DataType> {
        self.stack
            .top()
            .ok_or_else(|| CompilationError::internal("operand stack underflow"))
    }

    fn mark_line(&mut self, span: Span) {
        if !span.is_synthetic() {
            self.emitter.set_line(span.line);
        }
    }

    /// Number of entries pushed since the stack was `start` deep.
    fn pushed_since(&self, start: usize) -> Result<usize> {
        self.stack
            .depth()
            .checked_sub(start)
            .ok_or_else(|| CompilationError::internal("operand stack shrank below call start"))
    }
}

/// Argument count as a `u8` operand.
pub(crate) fn arg_count_u8(count: usize, span: Span) -> Result<u8> {
    u8::try_from(count).map_err(|_| CompilationError::TooManyArguments {
        count,
        max: u8::MAX as usize,
        span,
    })
}
