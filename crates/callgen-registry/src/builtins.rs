//! Built-in types every registry starts with.

use callgen_core::{
    DataType, Modifiers, Param, PrimitiveKind, TypeEntry, TypeHash, TypeKind, primitives,
};

/// Names the built-in types are registered under.
pub mod names {
    pub const OBJECT: &str = "Object";
    pub const STRING: &str = "String";
    pub const CLASS: &str = "Class";
    pub const ENUM: &str = "Enum";
    pub const REFERENCE: &str = "Reference";
    pub const BOOLEAN_BOX: &str = "Boolean";
    pub const INTEGER_BOX: &str = "Integer";
    pub const LONG_BOX: &str = "Long";
    pub const DOUBLE_BOX: &str = "Double";

    /// Static factory on `Class` that looks a class up by name.
    pub const FOR_NAME: &str = "forName";
}

fn primitive(name: &str, hash: TypeHash, kind: PrimitiveKind) -> TypeEntry {
    TypeEntry::new(name, hash, TypeKind::Primitive(kind))
        .with_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
}

fn final_class(name: &str, hash: TypeHash) -> TypeEntry {
    TypeEntry::new(name, hash, TypeKind::Class)
        .with_super(primitives::OBJECT)
        .with_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
}

/// Built-in entries in dependency order (supertypes first).
pub(crate) fn builtin_types() -> Vec<TypeEntry> {
    let object = TypeEntry::new(names::OBJECT, primitives::OBJECT, TypeKind::Class)
        .with_constructor(vec![])
        .with_method("toString", vec![], DataType::simple(primitives::STRING))
        .with_method("hashCode", vec![], DataType::simple(primitives::INT))
        .with_method(
            "equals",
            vec![Param::new("other", primitives::OBJECT)],
            DataType::simple(primitives::BOOLEAN),
        );

    let class = final_class(names::CLASS, primitives::CLASS).with_method_modifiers(
        names::FOR_NAME,
        vec![Param::new("name", primitives::STRING)],
        DataType::simple(primitives::CLASS),
        Modifiers::PUBLIC | Modifiers::STATIC,
    );

    let enum_base = TypeEntry::new(names::ENUM, primitives::ENUM, TypeKind::Class)
        .with_super(primitives::OBJECT)
        .with_modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
        .with_method("name", vec![], DataType::simple(primitives::STRING));

    let reference = TypeEntry::new(names::REFERENCE, primitives::REFERENCE, TypeKind::Class)
        .with_super(primitives::OBJECT)
        .with_constructor(vec![Param::new("value", primitives::OBJECT)])
        .with_method("get", vec![], DataType::object())
        .with_method("set", vec![Param::new("value", primitives::OBJECT)], DataType::void());

    vec![
        object,
        primitive("void", primitives::VOID, PrimitiveKind::Void),
        primitive("boolean", primitives::BOOLEAN, PrimitiveKind::Boolean),
        primitive("int", primitives::INT, PrimitiveKind::Int),
        primitive("long", primitives::LONG, PrimitiveKind::Long),
        primitive("double", primitives::DOUBLE, PrimitiveKind::Double),
        final_class(names::STRING, primitives::STRING),
        class,
        enum_base,
        reference,
        final_class(names::BOOLEAN_BOX, primitives::BOOLEAN_BOX),
        final_class(names::INTEGER_BOX, primitives::INTEGER_BOX),
        final_class(names::LONG_BOX, primitives::LONG_BOX),
        final_class(names::DOUBLE_BOX, primitives::DOUBLE_BOX),
    ]
}
