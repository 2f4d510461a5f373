//! Per-class lowering unit.
//!
//! A [`ClassUnit`] owns everything that is shared by the method bodies of one
//! class: the constant pool, the constructor dispatch tables, the call-site
//! slots and the collected diagnostics. Bodies are lowered one at a time and
//! the unit is finished into a [`CompiledClass`].
//!
//! # Example
//!
//! ```ignore
//! use callgen::{ClassUnit, Frame, TypeRegistry};
//! use callgen::ast::{Expr, MethodCallExpr};
//!
//! let registry = TypeRegistry::with_builtins();
//! let mut unit = ClassUnit::new(&registry, class);
//!
//! unit.lower_body("run", Frame::method(class), |lowering| {
//!     let call = MethodCallExpr::new(Expr::This, "draw", &[]);
//!     lowering.lower_method_call(&call).map(drop)
//! })?;
//!
//! let compiled = unit.finish();
//! ```

use tracing::{debug, warn};

use callgen_compiler::bytecode::{BytecodeChunk, ConstantPool};
use callgen_compiler::{
    AnnotatedTypeResolver, BytecodeEmitter, CallLowering, ClassLowering, ClosureConstructorHook,
    Frame, NoClosureHook, OperandStack, TypeResolver,
};
use callgen_core::{CompilationError, Diagnostics, TypeHash};
use callgen_registry::TypeRegistry;

type Result<T> = std::result::Result<T, CompilationError>;

/// One lowered method body.
#[derive(Debug, Clone)]
pub struct LoweredBody {
    pub name: String,
    pub chunk: BytecodeChunk,
    /// Operand stack depth left by the body.
    pub stack_depth: usize,
}

/// Output of a finished [`ClassUnit`].
#[derive(Debug)]
pub struct CompiledClass {
    pub class: TypeHash,
    pub constants: ConstantPool,
    pub bodies: Vec<LoweredBody>,
    /// Call-site names in slot order.
    pub call_sites: Vec<String>,
    /// Methods invoked on `super` through dynamic dispatch, sorted.
    pub super_methods: Vec<String>,
    /// Errors that did not abort lowering, such as fingerprint collisions.
    pub errors: Vec<CompilationError>,
}

impl CompiledClass {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn body(&self, name: &str) -> Option<&LoweredBody> {
        self.bodies.iter().find(|body| body.name == name)
    }
}

/// Lowers the method bodies of one class.
pub struct ClassUnit<'reg> {
    registry: &'reg TypeRegistry,
    lowering: ClassLowering,
    constants: ConstantPool,
    diagnostics: Diagnostics,
    bodies: Vec<LoweredBody>,
    resolver: &'reg dyn TypeResolver,
    closure_hook: &'reg dyn ClosureConstructorHook,
}

impl<'reg> ClassUnit<'reg> {
    pub fn new(registry: &'reg TypeRegistry, class: TypeHash) -> Self {
        Self::with_lowering(registry, ClassLowering::new(class))
    }

    /// Start from preconfigured class state (custom call-site registry or
    /// fingerprint function).
    pub fn with_lowering(registry: &'reg TypeRegistry, lowering: ClassLowering) -> Self {
        Self {
            registry,
            lowering,
            constants: ConstantPool::new(),
            diagnostics: Diagnostics::new(),
            bodies: Vec::new(),
            resolver: &AnnotatedTypeResolver,
            closure_hook: &NoClosureHook,
        }
    }

    pub fn with_resolver(mut self, resolver: &'reg dyn TypeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_closure_hook(mut self, hook: &'reg dyn ClosureConstructorHook) -> Self {
        self.closure_hook = hook;
        self
    }

    pub fn class(&self) -> TypeHash {
        self.lowering.class()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn bodies(&self) -> &[LoweredBody] {
        &self.bodies
    }

    /// Lower one method body of this class.
    ///
    /// `frame` must describe a method of the unit's class. On error nothing
    /// is recorded for the body.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lower_body(
        &mut self,
        name: &str,
        frame: Frame,
        body: impl FnOnce(&mut CallLowering<'_, '_>) -> Result<()>,
    ) -> Result<&LoweredBody> {
        if frame.class != self.lowering.class() {
            return Err(CompilationError::internal(format!(
                "body {name} belongs to {}, not {}",
                self.registry.type_name(frame.class),
                self.registry.type_name(self.lowering.class())
            )));
        }

        let mut emitter = BytecodeEmitter::new(&mut self.constants);
        let mut stack = OperandStack::new();
        {
            let mut lowering = CallLowering::new(
                self.registry,
                &frame,
                &mut self.lowering,
                &mut emitter,
                &mut stack,
                &mut self.diagnostics,
            )
            .with_resolver(self.resolver)
            .with_closure_hook(self.closure_hook);
            body(&mut lowering)?;
        }
        let chunk = emitter.finish();

        debug!(
            body = name,
            bytes = chunk.len(),
            stack_depth = stack.depth(),
            "lowered method body"
        );

        let index = self.bodies.len();
        self.bodies.push(LoweredBody {
            name: name.to_string(),
            chunk,
            stack_depth: stack.depth(),
        });
        Ok(&self.bodies[index])
    }

    pub fn finish(mut self) -> CompiledClass {
        let sites = self.lowering.call_sites();
        let call_sites = (0..sites.site_count())
            .filter_map(|slot| u16::try_from(slot).ok())
            .filter_map(|slot| sites.site_name(slot))
            .map(str::to_string)
            .collect();
        let super_methods = self
            .lowering
            .super_method_names()
            .map(str::to_string)
            .collect();

        let errors = self.diagnostics.take();
        if !errors.is_empty() {
            warn!(
                class = %self.registry.type_name(self.lowering.class()),
                count = errors.len(),
                "class lowered with errors"
            );
        }

        CompiledClass {
            class: self.lowering.class(),
            constants: self.constants,
            bodies: self.bodies,
            call_sites,
            super_methods,
            errors,
        }
    }
}

impl std::fmt::Debug for ClassUnit<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassUnit")
            .field("class", &self.lowering.class())
            .field("bodies", &self.bodies.len())
            .field("constants", &self.constants.len())
            .finish_non_exhaustive()
    }
}
