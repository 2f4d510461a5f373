//! Shared fixtures for unit tests.

use callgen_core::{
    CompilationError, DataType, Diagnostics, FieldEntry, Modifiers, Param, TypeEntry, TypeHash,
    primitives,
};
use callgen_registry::TypeRegistry;

use crate::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
use crate::calls::CallLowering;
use crate::class_state::ClassLowering;
use crate::collaborators::ClosureConstructorHook;
use crate::context::Frame;
use crate::emit::BytecodeEmitter;
use crate::stack::OperandStack;

type Result<T> = std::result::Result<T, CompilationError>;

/// Hashes of the fixture types and members.
#[derive(Debug, Clone, Copy)]
pub struct Fixtures {
    /// Public final class with `foo(int) -> int`.
    pub counter: TypeHash,
    pub counter_foo: TypeHash,
    /// Public class with `area()`, `draw()` and static `create()`.
    pub shape: TypeHash,
    pub shape_area: TypeHash,
    pub shape_draw: TypeHash,
    pub shape_create: TypeHash,
    /// Subclass of `shape`.
    pub circle: TypeHash,
    pub object_to_string: TypeHash,
    /// Public class implementing the package-private interface `hidden`.
    pub visible: TypeHash,
    pub hidden: TypeHash,
    pub hidden_ping: TypeHash,
    /// Functional interface with `run(int) -> int`.
    pub action: TypeHash,
    /// Class with a `callback` field and a zero-argument `callback()` method.
    pub holder: TypeHash,
    /// `Widget(int, String[])`
    pub widget: TypeHash,
    pub widget_ctor: TypeHash,
    /// `Pair(int)`, `Pair(String)`, `Pair(int, int)`
    pub pair: TypeHash,
    /// `PairChild(int)` extending `pair`.
    pub pair_child: TypeHash,
    pub outer: TypeHash,
    /// Nested in `outer`, unrelated to it by inheritance.
    pub inner: TypeHash,
    pub outer_greet: TypeHash,
    pub color: TypeHash,
    /// Anonymous subclass of `shape` taking `(Reference, int)`.
    pub anon: TypeHash,
}

fn method_hash(registry: &TypeRegistry, owner: TypeHash, name: &str) -> TypeHash {
    registry
        .get(owner)
        .and_then(|entry| entry.find_methods(name).next())
        .map(|m| m.method_hash)
        .unwrap_or_else(|| panic!("fixture method {name} missing"))
}

fn first_ctor(registry: &TypeRegistry, owner: TypeHash) -> TypeHash {
    registry
        .get(owner)
        .and_then(|entry| entry.constructors.first())
        .map(|c| c.ctor_hash)
        .expect("fixture constructor missing")
}

fn fixture_registry() -> (TypeRegistry, Fixtures) {
    let mut registry = TypeRegistry::with_builtins();
    let int = || DataType::simple(primitives::INT);
    let abstract_method = Modifiers::PUBLIC | Modifiers::ABSTRACT;

    let counter = registry
        .register(
            TypeEntry::class("demo.Counter")
                .with_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
                .with_method("foo", vec![Param::new("n", primitives::INT)], int()),
        )
        .unwrap();

    let shape_name = "demo.Shape";
    let shape = registry
        .register(
            TypeEntry::class(shape_name)
                .with_constructor(vec![])
                .with_method("area", vec![], DataType::simple(primitives::DOUBLE))
                .with_method("draw", vec![], DataType::void())
                .with_method_modifiers(
                    "create",
                    vec![],
                    DataType::simple(TypeHash::from_name(shape_name)),
                    Modifiers::PUBLIC | Modifiers::STATIC,
                ),
        )
        .unwrap();
    let circle = registry
        .register(TypeEntry::class("demo.Circle").with_super(shape))
        .unwrap();

    let hidden = registry
        .register(
            TypeEntry::interface("demo.Hidden")
                .with_modifiers(Modifiers::ABSTRACT)
                .with_method_modifiers("ping", vec![], DataType::void(), abstract_method),
        )
        .unwrap();
    let visible = registry
        .register(TypeEntry::class("demo.Visible").with_interface(hidden))
        .unwrap();

    let action = registry
        .register(TypeEntry::interface("demo.Action").with_method_modifiers(
            "run",
            vec![Param::new("n", primitives::INT)],
            int(),
            abstract_method,
        ))
        .unwrap();
    let holder = registry
        .register(
            TypeEntry::class("demo.Holder")
                .with_field(FieldEntry::new("callback", action, Modifiers::PRIVATE))
                .with_method("callback", vec![], DataType::object()),
        )
        .unwrap();

    let widget = registry
        .register(TypeEntry::class("demo.Widget").with_constructor(vec![
            Param::new("n", primitives::INT),
            Param::new("names", DataType::array_of(primitives::STRING)),
        ]))
        .unwrap();

    let pair = registry
        .register(
            TypeEntry::class("demo.Pair")
                .with_constructor(vec![Param::new("n", primitives::INT)])
                .with_constructor(vec![Param::new("s", primitives::STRING)])
                .with_constructor(vec![
                    Param::new("a", primitives::INT),
                    Param::new("b", primitives::INT),
                ]),
        )
        .unwrap();
    let pair_child = registry
        .register(
            TypeEntry::class("demo.PairChild")
                .with_super(pair)
                .with_constructor(vec![Param::new("n", primitives::INT)]),
        )
        .unwrap();

    let outer = registry
        .register(TypeEntry::class("demo.Outer").with_method("greet", vec![], DataType::void()))
        .unwrap();
    let inner = registry
        .register(TypeEntry::class("demo.Outer.Inner").with_outer(outer))
        .unwrap();

    let color = registry
        .register(TypeEntry::enumeration("demo.Color"))
        .unwrap();

    let anon = registry
        .register(
            TypeEntry::class("demo.Shape$1")
                .with_super(shape)
                .with_modifiers(Modifiers::SYNTHETIC | Modifiers::FINAL)
                .with_constructor(vec![
                    Param::new("count", primitives::REFERENCE),
                    Param::new("n", primitives::INT),
                ]),
        )
        .unwrap();

    let fixtures = Fixtures {
        counter,
        counter_foo: method_hash(&registry, counter, "foo"),
        shape,
        shape_area: method_hash(&registry, shape, "area"),
        shape_draw: method_hash(&registry, shape, "draw"),
        shape_create: method_hash(&registry, shape, "create"),
        circle,
        object_to_string: method_hash(&registry, primitives::OBJECT, "toString"),
        visible,
        hidden,
        hidden_ping: method_hash(&registry, hidden, "ping"),
        action,
        holder,
        widget,
        widget_ctor: first_ctor(&registry, widget),
        pair,
        pair_child,
        outer,
        inner,
        outer_greet: method_hash(&registry, outer, "greet"),
        color,
        anon,
    };
    (registry, fixtures)
}

/// Everything one lowering needs, with an instance method of `circle` as the
/// default frame.
pub struct Harness {
    pub registry: TypeRegistry,
    pub frame: Frame,
    pub class: ClassLowering,
    pub constants: ConstantPool,
    pub diagnostics: Diagnostics,
    pub fixtures: Fixtures,
}

impl Harness {
    pub fn new() -> Self {
        let (registry, fixtures) = fixture_registry();
        Self {
            registry,
            frame: Frame::method(fixtures.circle),
            class: ClassLowering::new(fixtures.circle),
            constants: ConstantPool::new(),
            diagnostics: Diagnostics::new(),
            fixtures,
        }
    }

    /// Lower with a fresh emitter and stack, panicking on error.
    #[track_caller]
    pub fn run<R>(
        &mut self,
        f: impl FnOnce(&mut CallLowering<'_, '_>) -> Result<R>,
    ) -> (R, BytecodeChunk, OperandStack) {
        match self.lower(None, f) {
            Ok(out) => out,
            Err(err) => panic!("lowering failed: {err}"),
        }
    }

    #[track_caller]
    pub fn run_with_hook<R>(
        &mut self,
        hook: &dyn ClosureConstructorHook,
        f: impl FnOnce(&mut CallLowering<'_, '_>) -> Result<R>,
    ) -> (R, BytecodeChunk, OperandStack) {
        match self.lower(Some(hook), f) {
            Ok(out) => out,
            Err(err) => panic!("lowering failed: {err}"),
        }
    }

    /// Lower and return only the result.
    pub fn try_run<R>(&mut self, f: impl FnOnce(&mut CallLowering<'_, '_>) -> Result<R>) -> Result<R> {
        self.lower(None, f).map(|(value, _, _)| value)
    }

    fn lower<R>(
        &mut self,
        hook: Option<&dyn ClosureConstructorHook>,
        f: impl FnOnce(&mut CallLowering<'_, '_>) -> Result<R>,
    ) -> Result<(R, BytecodeChunk, OperandStack)> {
        let mut emitter = BytecodeEmitter::new(&mut self.constants);
        let mut stack = OperandStack::new();
        let value = {
            let mut lowering = CallLowering::new(
                &self.registry,
                &self.frame,
                &mut self.class,
                &mut emitter,
                &mut stack,
                &mut self.diagnostics,
            );
            if let Some(hook) = hook {
                lowering = lowering.with_closure_hook(hook);
            }
            f(&mut lowering)?
        };
        Ok((value, emitter.finish(), stack))
    }

    /// Owner of the member reference of the last `Invoke*` in `chunk`.
    #[track_caller]
    pub fn last_invoke_owner(&self, chunk: &BytecodeChunk) -> TypeHash {
        let at = instruction_offsets(chunk)
            .filter(|&offset| {
                matches!(
                    chunk.read_op(offset),
                    Some(
                        OpCode::InvokeStatic
                            | OpCode::InvokeVirtual
                            | OpCode::InvokeInterface
                            | OpCode::InvokeSpecial
                    )
                )
            })
            .last()
            .expect("no invoke instruction");
        let index = chunk.read_u16(at + 1).expect("truncated invoke") as u32;
        match self.constants.get(index) {
            Some(Constant::MemberRef { owner, .. }) => *owner,
            other => panic!("invoke operand is not a member reference: {other:?}"),
        }
    }
}

/// Start offsets of every instruction in `chunk`.
pub fn instruction_offsets(chunk: &BytecodeChunk) -> impl Iterator<Item = usize> + '_ {
    let mut offset = 0;
    std::iter::from_fn(move || {
        if offset >= chunk.len() {
            return None;
        }
        let at = offset;
        offset += chunk.instruction_len(at).unwrap_or(1);
        Some(at)
    })
}

/// Offset of the first `op` in `chunk`.
pub fn find_op(chunk: &BytecodeChunk, op: OpCode) -> Option<usize> {
    instruction_offsets(chunk).find(|&offset| chunk.read_op(offset) == Some(op))
}
