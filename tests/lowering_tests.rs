//! End-to-end lowering tests through [`ClassUnit`].
//!
//! Each test registers its own declarations, lowers one or more method bodies
//! and inspects the finished class.

use bumpalo::Bump;
use callgen::ast::{
    ConstructorCallExpr, Expr, LocalExpr, MethodCallExpr, SpecialConstructorCallExpr, SpecialKind,
};
use callgen::bytecode::{BytecodeChunk, OpCode};
use callgen::{
    CallFlags, CallTier, ClassLowering, ClassUnit, CompilationError, CompiledClass,
    ConstructorDispatch, DataType, Frame, LoweringOptions, Modifiers, Param, Span, TypeEntry,
    TypeHash, TypeRegistry, primitives,
};

// =============================================================================
// Helpers
// =============================================================================

fn local<'ast>(name: &'ast str, slot: u16, data_type: DataType) -> Expr<'ast> {
    Expr::Local(LocalExpr {
        name,
        slot,
        data_type,
        by_ref: false,
    })
}

fn offset_of(chunk: &BytecodeChunk, op: OpCode) -> Option<usize> {
    let mut offset = 0;
    while offset < chunk.len() {
        if chunk.read_op(offset) == Some(op) {
            return Some(offset);
        }
        offset += chunk.instruction_len(offset)?;
    }
    None
}

/// Lower `this(args)` as the body of a constructor of `class`.
fn lower_this_call(
    registry: &TypeRegistry,
    lowering: ClassLowering,
    args: &[Expr<'_>],
) -> (ConstructorDispatch, CompiledClass) {
    let class = lowering.class();
    let mut unit = ClassUnit::with_lowering(registry, lowering);
    let call = SpecialConstructorCallExpr {
        kind: SpecialKind::This,
        args,
        span: Span::new(2, 9),
    };

    let mut dispatch = None;
    unit.lower_body("<init>", Frame::constructor(class), |l| {
        dispatch = Some(l.lower_special_constructor_call(&call)?);
        Ok(())
    })
    .expect("lowering failed");

    let compiled = unit.finish();
    (dispatch.expect("no dispatch recorded"), compiled)
}

fn switch_cases(compiled: &CompiledClass) -> Vec<i32> {
    let chunk = &compiled.bodies[0].chunk;
    let at = offset_of(chunk, OpCode::LookupSwitch).expect("no lookup switch");
    let (_, cases) = chunk.switch_targets(at).expect("malformed lookup switch");
    cases.into_iter().map(|(key, _)| key).collect()
}

// =============================================================================
// Method Calls
// =============================================================================

#[test]
fn resolved_call_on_public_final_class_is_direct() {
    let mut registry = TypeRegistry::with_builtins();
    let counter = registry
        .register(
            TypeEntry::class("demo.Counter")
                .with_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
                .with_method(
                    "foo",
                    vec![Param::new("n", primitives::INT)],
                    DataType::simple(primitives::INT),
                ),
        )
        .unwrap();
    let app = registry.register(TypeEntry::class("demo.App")).unwrap();
    let foo = registry
        .get(counter)
        .and_then(|entry| entry.find_methods("foo").next())
        .map(|m| m.method_hash)
        .unwrap();

    let mut unit = ClassUnit::new(&registry, app);
    let args = [Expr::Int(1)];
    let call = MethodCallExpr::new(local("obj", 1, DataType::simple(counter)), "foo", &args)
        .with_target(foo);

    let mut tier = None;
    let body = unit
        .lower_body("run", Frame::method(app), |l| {
            tier = Some(l.lower_method_call(&call)?);
            Ok(())
        })
        .unwrap();

    assert_eq!(tier, Some(CallTier::Direct));
    body.chunk
        .assert_opcodes(&[OpCode::GetLocal, OpCode::PushOne, OpCode::InvokeVirtual]);
    assert_eq!(body.stack_depth, 1);
}

#[test]
fn unresolved_safe_call_goes_through_call_site() {
    let registry = TypeRegistry::with_builtins();
    let mut unit = ClassUnit::new(&registry, primitives::OBJECT);
    let call = MethodCallExpr::new(local("a", 1, DataType::object()), "b", &[]).safe();

    let mut tier = None;
    let body = unit
        .lower_body("run", Frame::method(primitives::OBJECT), |l| {
            tier = Some(l.lower_method_call(&call)?);
            Ok(())
        })
        .unwrap();

    assert_eq!(tier, Some(CallTier::Cached));
    let chunk = &body.chunk;
    chunk.assert_lacks_opcode(OpCode::InvokeVirtual);
    let at = offset_of(chunk, OpCode::CallSite).expect("no call site");
    let flags = CallFlags::from_bits_truncate(chunk.read_byte(at + 4).unwrap());
    assert!(flags.contains(CallFlags::SAFE));

    assert_eq!(unit.finish().call_sites, vec!["b".to_string()]);
}

// =============================================================================
// Constructor Calls
// =============================================================================

#[test]
fn variadic_constructor_packs_trailing_arguments() {
    let mut registry = TypeRegistry::with_builtins();
    let widget = registry
        .register(TypeEntry::class("demo.Widget").with_constructor(vec![
            Param::new("n", primitives::INT),
            Param::new("names", DataType::array_of(primitives::STRING)),
        ]))
        .unwrap();
    let ctor = registry.get(widget).unwrap().constructors[0].ctor_hash;

    let mut unit = ClassUnit::new(&registry, widget);
    let args = [Expr::Int(1), Expr::Str("x"), Expr::Str("y")];
    let call = ConstructorCallExpr {
        class: widget,
        args: &args,
        optimized_target: Some(ctor),
        anonymous: false,
        span: Span::new(3, 5),
    };
    let frame = Frame::method(widget).with_options(LoweringOptions {
        fast_path: true,
        ..LoweringOptions::default()
    });

    let mut dispatch = None;
    let body = unit
        .lower_body("make", frame, |l| {
            dispatch = Some(l.lower_constructor_call(&call)?);
            Ok(())
        })
        .unwrap();

    assert_eq!(dispatch, Some(ConstructorDispatch::Direct));
    body.chunk.assert_opcodes(&[
        OpCode::New,
        OpCode::Dup,
        OpCode::PushOne,
        OpCode::Constant,
        OpCode::Constant,
        OpCode::ArrayInit,
        OpCode::InvokeSpecial,
    ]);
    let at = offset_of(&body.chunk, OpCode::ArrayInit).unwrap();
    assert_eq!(body.chunk.read_u16(at + 3), Some(2));
    assert_eq!(body.stack_depth, 1);
}

#[test]
fn ambiguous_this_call_switches_on_fingerprints() {
    let mut registry = TypeRegistry::with_builtins();
    let pair = registry
        .register(
            TypeEntry::class("demo.Pair")
                .with_constructor(vec![Param::new("n", primitives::INT)])
                .with_constructor(vec![Param::new("s", primitives::STRING)]),
        )
        .unwrap();

    let args = [Expr::Int(1)];
    let (dispatch, compiled) = lower_this_call(&registry, ClassLowering::new(pair), &args);

    assert_eq!(dispatch, ConstructorDispatch::MopFallback);
    let keys = switch_cases(&compiled);
    assert_eq!(keys.len(), 2);
    assert_ne!(keys[0], keys[1]);
    assert!(!compiled.has_errors());
    assert_eq!(compiled.bodies[0].stack_depth, 0);
}

#[test]
fn lowering_is_deterministic() {
    let mut registry = TypeRegistry::with_builtins();
    let pair = registry
        .register(
            TypeEntry::class("demo.Pair")
                .with_constructor(vec![Param::new("n", primitives::INT)])
                .with_constructor(vec![Param::new("s", primitives::STRING)])
                .with_constructor(vec![Param::new("b", primitives::BOOLEAN)]),
        )
        .unwrap();

    let args = [Expr::Null];
    let (_, first) = lower_this_call(&registry, ClassLowering::new(pair), &args);
    let (_, second) = lower_this_call(&registry, ClassLowering::new(pair), &args);

    assert_eq!(first.bodies[0].chunk, second.bodies[0].chunk);
    assert_eq!(first.constants.constants(), second.constants.constants());
}

#[test]
fn missing_constructors_are_reported() {
    let mut registry = TypeRegistry::with_builtins();
    let bare = registry.register(TypeEntry::class("demo.Bare")).unwrap();
    let mut unit = ClassUnit::new(&registry, bare);
    let call = SpecialConstructorCallExpr {
        kind: SpecialKind::This,
        args: &[],
        span: Span::new(1, 1),
    };

    let err = unit
        .lower_body("<init>", Frame::constructor(bare), |l| {
            l.lower_special_constructor_call(&call).map(drop)
        })
        .unwrap_err();
    assert!(matches!(err, CompilationError::NoConstructors { .. }));
}

// =============================================================================
// Fingerprint Fuzzing
// =============================================================================

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() % bound as u64) as usize
    }
}

const PARAM_TYPES: [DataType; 7] = [
    DataType::simple(primitives::INT),
    DataType::simple(primitives::LONG),
    DataType::simple(primitives::BOOLEAN),
    DataType::simple(primitives::DOUBLE),
    DataType::simple(primitives::STRING),
    DataType::object(),
    DataType::array_of(primitives::INT),
];

/// Register a class with up to `max` distinct random constructor signatures.
fn random_class(rng: &mut Lcg, max: usize) -> (TypeRegistry, TypeHash, usize) {
    let mut registry = TypeRegistry::with_builtins();
    let mut signatures: Vec<Vec<usize>> = Vec::new();
    for _ in 0..1 + rng.below(max) {
        let arity = rng.below(4);
        let signature: Vec<usize> = (0..arity).map(|_| rng.below(PARAM_TYPES.len())).collect();
        if !signatures.contains(&signature) {
            signatures.push(signature);
        }
    }

    let mut entry = TypeEntry::class("demo.Fuzz");
    for signature in &signatures {
        let params = signature
            .iter()
            .enumerate()
            .map(|(i, &ty)| Param::new(format!("p{i}"), PARAM_TYPES[ty]))
            .collect();
        entry = entry.with_constructor(params);
    }
    let class = registry.register(entry).unwrap();
    (registry, class, signatures.len())
}

fn spread_args<'ast>(arena: &'ast Bump) -> &'ast [Expr<'ast>] {
    let inner = arena.alloc(local("xs", 1, DataType::object_array()));
    arena.alloc_slice_copy(&[Expr::Spread(inner)])
}

#[test]
fn fuzz_default_fingerprints_are_distinct() {
    let mut rng = Lcg(0x5eed);
    let arena = Bump::new();
    let args = spread_args(&arena);

    for _ in 0..64 {
        let (registry, class, count) = random_class(&mut rng, 12);
        let (dispatch, compiled) = lower_this_call(&registry, ClassLowering::new(class), args);

        assert_eq!(dispatch, ConstructorDispatch::MopFallback);
        let keys = switch_cases(&compiled);
        assert_eq!(keys.len(), count);
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert!(!compiled.has_errors());
    }
}

#[test]
fn fuzz_weak_fingerprints_report_every_collision() {
    let mut rng = Lcg(0xc011);
    let arena = Bump::new();
    let args = spread_args(&arena);
    let weak: fn(&str) -> i32 = |descriptor| descriptor.len() as i32;

    for _ in 0..64 {
        let (registry, class, count) = random_class(&mut rng, 12);
        let mut lengths: Vec<i32> = registry
            .get(class)
            .unwrap()
            .constructors
            .iter()
            .map(|ctor| weak(&registry.constructor_descriptor(ctor).unwrap()))
            .collect();
        lengths.sort_unstable();
        lengths.dedup();

        let lowering = ClassLowering::new(class).with_fingerprint(weak);
        let (_, compiled) = lower_this_call(&registry, lowering, args);

        assert_eq!(switch_cases(&compiled), lengths);
        assert_eq!(compiled.errors.len(), count - lengths.len());
        assert!(
            compiled
                .errors
                .iter()
                .all(|e| matches!(e, CompilationError::FingerprintCollision { .. }))
        );
    }
}
