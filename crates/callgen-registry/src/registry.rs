//! TypeRegistry - declarations indexed by hash.
//!
//! Types are stored by [`TypeHash`]; methods and constructors are indexed by
//! their own hashes so that a resolved call target can be looked up without
//! knowing its declaring type.
//!
//! # Example
//!
//! ```
//! use callgen_registry::TypeRegistry;
//! use callgen_core::{DataType, TypeEntry, primitives};
//!
//! let mut registry = TypeRegistry::with_builtins();
//! let widget = registry.register(TypeEntry::class("demo.Widget")).unwrap();
//!
//! assert!(registry.is_derived_from(DataType::simple(widget), DataType::object()));
//! assert_eq!(registry.descriptor(DataType::simple(widget)).unwrap(), "Ldemo/Widget;");
//! assert_eq!(registry.descriptor(DataType::array_of(primitives::INT)).unwrap(), "[I");
//! ```

use rustc_hash::FxHashMap;

use callgen_core::{
    ConstructorEntry, DataType, FieldEntry, MethodEntry, RegistrationError, TypeEntry, TypeHash,
    TypeKind, primitives,
};

use crate::builtins::{self, names};

/// Type, method and constructor storage for one compilation.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: FxHashMap<TypeHash, TypeEntry>,
    by_name: FxHashMap<String, TypeHash>,
    /// method hash -> (owner, index into `methods`)
    methods: FxHashMap<TypeHash, (TypeHash, usize)>,
    /// constructor hash -> (owner, index into `constructors`)
    constructors: FxHashMap<TypeHash, (TypeHash, usize)>,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the root type, strings, boxes and primitives.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for entry in builtins::builtin_types() {
            registry.insert(entry);
        }
        registry
    }

    // ==========================================================================
    // Registration
    // ==========================================================================

    /// Register a type and index its members.
    ///
    /// The supertype and interfaces must already be registered.
    pub fn register(&mut self, entry: TypeEntry) -> Result<TypeHash, RegistrationError> {
        if self.types.contains_key(&entry.type_hash) || self.by_name.contains_key(&entry.name) {
            return Err(RegistrationError::DuplicateType(entry.name));
        }
        for referenced in entry.super_class.iter().chain(entry.interfaces.iter()) {
            if !self.types.contains_key(referenced) {
                return Err(RegistrationError::MissingSupertype {
                    type_name: entry.name,
                    missing: referenced.to_string(),
                });
            }
        }

        Ok(self.insert(entry))
    }

    fn insert(&mut self, entry: TypeEntry) -> TypeHash {
        let hash = entry.type_hash;
        for (index, method) in entry.methods.iter().enumerate() {
            self.methods.insert(method.method_hash, (hash, index));
        }
        for (index, ctor) in entry.constructors.iter().enumerate() {
            self.constructors.insert(ctor.ctor_hash, (hash, index));
        }
        self.by_name.insert(entry.name.clone(), hash);
        self.types.insert(hash, entry);
        hash
    }

    // ==========================================================================
    // Lookup
    // ==========================================================================

    pub fn get(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&TypeEntry> {
        self.by_name.get(name).and_then(|hash| self.types.get(hash))
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Display name of a type, falling back to its hash.
    pub fn type_name(&self, hash: TypeHash) -> String {
        match self.types.get(&hash) {
            Some(entry) => entry.name.clone(),
            None => hash.to_string(),
        }
    }

    /// Look up a method by its hash.
    pub fn method(&self, hash: TypeHash) -> Option<&MethodEntry> {
        let (owner, index) = self.methods.get(&hash)?;
        self.types.get(owner)?.methods.get(*index)
    }

    /// Look up a constructor by its hash.
    pub fn constructor(&self, hash: TypeHash) -> Option<&ConstructorEntry> {
        let (owner, index) = self.constructors.get(&hash)?;
        self.types.get(owner)?.constructors.get(*index)
    }

    /// The built-in `Class.forName(String)` method.
    pub fn class_for_name(&self) -> Option<&MethodEntry> {
        self.get(primitives::CLASS)?
            .find_methods(names::FOR_NAME)
            .find(|m| m.is_static() && m.params.len() == 1)
    }

    /// Find a field declared on `class` or one of its superclasses.
    pub fn find_field(&self, class: TypeHash, name: &str) -> Option<&FieldEntry> {
        self.superclass_chain(class)
            .find_map(|entry| entry.find_field(name))
    }

    /// Whether `class` or a superclass declares a method that could accept
    /// `arg_count` arguments.
    pub fn has_possible_method(&self, class: TypeHash, name: &str, arg_count: usize) -> bool {
        self.superclass_chain(class).any(|entry| {
            entry.find_methods(name).any(|m| {
                m.params.len() == arg_count
                    || (m.is_variadic() && arg_count + 1 >= m.params.len())
            })
        })
    }

    /// The single abstract method of a functional interface, searching
    /// extended interfaces when the interface itself declares none.
    pub fn single_abstract_method(&self, iface: TypeHash) -> Option<&MethodEntry> {
        let entry = self.get(iface)?;
        if !entry.is_interface() {
            return None;
        }
        if let Some(sam) = entry.single_abstract_method() {
            return Some(sam);
        }
        match entry.interfaces.as_slice() {
            [parent] => self.single_abstract_method(*parent),
            _ => None,
        }
    }

    fn superclass_chain(&self, start: TypeHash) -> impl Iterator<Item = &TypeEntry> {
        let mut next = self.get(start);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.super_class.and_then(|s| self.get(s));
            Some(current)
        })
    }

    // ==========================================================================
    // Classification
    // ==========================================================================

    pub fn is_primitive(&self, ty: DataType) -> bool {
        ty.dims == 0
            && self
                .get(ty.type_hash)
                .is_some_and(|e| matches!(e.kind, TypeKind::Primitive(_)))
    }

    pub fn is_interface(&self, ty: DataType) -> bool {
        ty.dims == 0 && self.get(ty.type_hash).is_some_and(|e| e.is_interface())
    }

    pub fn is_object(&self, ty: DataType) -> bool {
        ty == DataType::object()
    }

    pub fn is_string(&self, ty: DataType) -> bool {
        ty == DataType::simple(primitives::STRING)
    }

    /// Whether `ty` is the metaclass type of class literals.
    pub fn is_class_type(&self, ty: DataType) -> bool {
        ty == DataType::simple(primitives::CLASS)
    }

    pub fn is_enum(&self, ty: DataType) -> bool {
        ty.dims == 0
            && (self.get(ty.type_hash).is_some_and(|e| e.kind == TypeKind::Enum)
                || (ty.type_hash != primitives::ENUM
                    && self.is_derived_from(ty, DataType::simple(primitives::ENUM))))
    }

    pub fn is_public(&self, ty: TypeHash) -> bool {
        self.get(ty).is_some_and(|e| e.is_public())
    }

    pub fn is_final(&self, ty: TypeHash) -> bool {
        self.get(ty).is_some_and(|e| e.is_final())
    }

    /// The boxed representation of a primitive, or `ty` itself.
    pub fn boxed(&self, ty: DataType) -> DataType {
        if ty.dims > 0 {
            return ty;
        }
        match self
            .get(ty.type_hash)
            .and_then(|e| e.primitive_kind())
            .and_then(|k| k.wrapper())
        {
            Some(wrapper) => DataType::simple(wrapper),
            None => ty,
        }
    }

    // ==========================================================================
    // Hierarchy
    // ==========================================================================

    /// Whether `sub` is `sup` or inherits from it through superclasses.
    ///
    /// Every reference type derives from the root type. Arrays of equal
    /// dimension derive when their element types do.
    pub fn is_derived_from(&self, sub: DataType, sup: DataType) -> bool {
        if sub == sup {
            return true;
        }
        if self.is_primitive(sub) || self.is_primitive(sup) {
            return false;
        }
        if self.is_object(sup) {
            return true;
        }
        if sub.dims != sup.dims {
            return false;
        }
        if sub.dims > 0 {
            return self.is_derived_from(
                DataType::simple(sub.type_hash),
                DataType::simple(sup.type_hash),
            );
        }
        self.superclass_chain(sub.type_hash)
            .any(|entry| entry.type_hash == sup.type_hash)
    }

    /// Whether `ty`, one of its superclasses, or an interface they extend
    /// declares `iface`. A type does not implement itself.
    pub fn implements_interface(&self, ty: TypeHash, iface: TypeHash) -> bool {
        self.superclass_chain(ty)
            .any(|entry| self.declares_interface(entry, iface))
    }

    fn declares_interface(&self, entry: &TypeEntry, iface: TypeHash) -> bool {
        entry.interfaces.iter().any(|&declared| {
            declared == iface
                || self
                    .get(declared)
                    .is_some_and(|parent| self.declares_interface(parent, iface))
        })
    }

    /// Whether a value of type `from` can be used where `to` is expected
    /// without conversion.
    pub fn is_assignable(&self, from: DataType, to: DataType) -> bool {
        if self.is_derived_from(from, to) {
            return true;
        }
        from.dims == 0
            && self.is_interface(to)
            && self.implements_interface(from.type_hash, to.type_hash)
    }

    // ==========================================================================
    // Descriptors
    // ==========================================================================

    /// Type descriptor: `V Z I J D` for primitives, `Lpkg/Name;` for
    /// reference types, one `[` per array dimension.
    pub fn descriptor(&self, ty: DataType) -> Option<String> {
        let entry = self.get(ty.type_hash)?;
        let mut out = "[".repeat(ty.dims as usize);
        match entry.primitive_kind() {
            Some(kind) => out.push(kind.descriptor()),
            None => {
                out.push('L');
                out.push_str(&entry.name.replace('.', "/"));
                out.push(';');
            }
        }
        Some(out)
    }

    /// Constructor descriptor: parameter descriptors followed by `V`.
    pub fn constructor_descriptor(&self, ctor: &ConstructorEntry) -> Option<String> {
        let mut out = String::from("(");
        for param in &ctor.params {
            out.push_str(&self.descriptor(param.data_type)?);
        }
        out.push_str(")V");
        Some(out)
    }
}
