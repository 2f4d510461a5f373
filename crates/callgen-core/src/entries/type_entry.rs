//! Type entries: classes, interfaces, enums and primitives.

use bitflags::bitflags;

use crate::{DataType, TypeHash, primitives};

use super::{ConstructorEntry, FieldEntry, MethodEntry, Param};

bitflags! {
    /// Access and shape modifiers of a type or member.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u16 {
        const PUBLIC = 1 << 0;
        const PRIVATE = 1 << 1;
        const PROTECTED = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        const SYNTHETIC = 1 << 6;
    }
}

/// The primitive value kinds of the target machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Void,
    Boolean,
    Int,
    Long,
    Double,
}

impl PrimitiveKind {
    /// Single-character descriptor code.
    pub fn descriptor(self) -> char {
        match self {
            PrimitiveKind::Void => 'V',
            PrimitiveKind::Boolean => 'Z',
            PrimitiveKind::Int => 'I',
            PrimitiveKind::Long => 'J',
            PrimitiveKind::Double => 'D',
        }
    }

    /// Hash of the boxed representation, `None` for `void`.
    pub fn wrapper(self) -> Option<TypeHash> {
        match self {
            PrimitiveKind::Void => None,
            PrimitiveKind::Boolean => Some(primitives::BOOLEAN_BOX),
            PrimitiveKind::Int => Some(primitives::INTEGER_BOX),
            PrimitiveKind::Long => Some(primitives::LONG_BOX),
            PrimitiveKind::Double => Some(primitives::DOUBLE_BOX),
        }
    }
}

/// What kind of type an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    Class,
    Interface,
    Enum,
}

/// Registry entry for a type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    /// Fully qualified name, dot separated.
    pub name: String,
    pub type_hash: TypeHash,
    pub kind: TypeKind,
    pub modifiers: Modifiers,

    /// Superclass; `None` only for the root type, interfaces and primitives.
    pub super_class: Option<TypeHash>,
    /// Implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<TypeHash>,
    /// Lexically enclosing type for nested types.
    pub outer_class: Option<TypeHash>,

    pub constructors: Vec<ConstructorEntry>,
    pub methods: Vec<MethodEntry>,
    pub fields: Vec<FieldEntry>,
}

impl TypeEntry {
    /// Create an entry with an explicit hash.
    pub fn new(name: impl Into<String>, type_hash: TypeHash, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            type_hash,
            kind,
            modifiers: Modifiers::PUBLIC,
            super_class: None,
            interfaces: Vec::new(),
            outer_class: None,
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// A public class extending the root type.
    pub fn class(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = TypeHash::from_name(&name);
        Self::new(name, hash, TypeKind::Class).with_super(primitives::OBJECT)
    }

    /// A public interface.
    pub fn interface(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = TypeHash::from_name(&name);
        Self::new(name, hash, TypeKind::Interface)
            .with_modifiers(Modifiers::PUBLIC | Modifiers::ABSTRACT)
    }

    /// A public enum type.
    pub fn enumeration(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = TypeHash::from_name(&name);
        Self::new(name, hash, TypeKind::Enum)
            .with_super(primitives::ENUM)
            .with_modifiers(Modifiers::PUBLIC | Modifiers::FINAL)
    }

    // === Builder Methods ===

    pub fn with_super(mut self, super_class: TypeHash) -> Self {
        self.super_class = Some(super_class);
        self
    }

    pub fn with_interface(mut self, interface: TypeHash) -> Self {
        self.interfaces.push(interface);
        self
    }

    pub fn with_outer(mut self, outer: TypeHash) -> Self {
        self.outer_class = Some(outer);
        self
    }

    /// Replace the modifiers.
    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    /// Declare a constructor with the given parameters.
    pub fn with_constructor(mut self, params: Vec<Param>) -> Self {
        let ctor = ConstructorEntry::new(self.type_hash, params, Modifiers::PUBLIC);
        self.constructors.push(ctor);
        self
    }

    /// Declare a public instance method.
    pub fn with_method(
        self,
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: DataType,
    ) -> Self {
        self.with_method_modifiers(name, params, return_type, Modifiers::PUBLIC)
    }

    /// Declare a method with explicit modifiers.
    pub fn with_method_modifiers(
        mut self,
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: DataType,
        modifiers: Modifiers,
    ) -> Self {
        let method = MethodEntry::new(self.type_hash, name, params, return_type, modifiers);
        self.methods.push(method);
        self
    }

    pub fn with_field(mut self, field: FieldEntry) -> Self {
        self.fields.push(field);
        self
    }

    // === Queries ===

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind {
            TypeKind::Primitive(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_public(&self) -> bool {
        self.modifiers.contains(Modifiers::PUBLIC)
    }

    pub fn is_final(&self) -> bool {
        self.modifiers.contains(Modifiers::FINAL)
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldEntry> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Methods declared directly on this type with the given name.
    pub fn find_methods<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a MethodEntry> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    /// The single abstract method of a functional interface.
    ///
    /// Returns `None` unless this is an interface declaring exactly one
    /// abstract method.
    pub fn single_abstract_method(&self) -> Option<&MethodEntry> {
        if !self.is_interface() {
            return None;
        }
        let mut abstract_methods = self
            .methods
            .iter()
            .filter(|m| m.modifiers.contains(Modifiers::ABSTRACT));
        let first = abstract_methods.next()?;
        abstract_methods.next().is_none().then_some(first)
    }
}
