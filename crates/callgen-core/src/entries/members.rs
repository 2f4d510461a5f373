//! Method, constructor and field declarations.

use crate::{DataType, TypeHash};

use super::Modifiers;

/// A formal parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub data_type: DataType,
}

impl Param {
    pub fn new(name: impl Into<String>, data_type: impl Into<DataType>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

fn signature(params: &[Param]) -> Vec<TypeHash> {
    params.iter().map(|p| p.data_type.signature_hash()).collect()
}

/// A declared method.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    /// Identity derived from owner, name and parameter types.
    pub method_hash: TypeHash,
    pub name: String,
    /// The declaring type.
    pub owner: TypeHash,
    pub params: Vec<Param>,
    pub return_type: DataType,
    pub modifiers: Modifiers,
}

impl MethodEntry {
    pub fn new(
        owner: TypeHash,
        name: impl Into<String>,
        params: Vec<Param>,
        return_type: DataType,
        modifiers: Modifiers,
    ) -> Self {
        let name = name.into();
        let method_hash = TypeHash::from_method(owner, &name, &signature(&params));
        Self {
            method_hash,
            name,
            owner,
            params,
            return_type,
            modifiers,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }

    /// Whether the last parameter is a trailing array (variadic) parameter.
    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.data_type.is_array())
    }
}

/// A declared constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorEntry {
    /// Identity derived from owner and parameter types.
    pub ctor_hash: TypeHash,
    pub owner: TypeHash,
    pub params: Vec<Param>,
    pub modifiers: Modifiers,
}

impl ConstructorEntry {
    pub fn new(owner: TypeHash, params: Vec<Param>, modifiers: Modifiers) -> Self {
        let ctor_hash = TypeHash::from_constructor(owner, &signature(&params));
        Self {
            ctor_hash,
            owner,
            params,
            modifiers,
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.data_type.is_array())
    }
}

/// A declared field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub name: String,
    pub data_type: DataType,
    pub modifiers: Modifiers,
}

impl FieldEntry {
    pub fn new(name: impl Into<String>, data_type: impl Into<DataType>, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            modifiers,
        }
    }

    pub fn is_static(&self) -> bool {
        self.modifiers.contains(Modifiers::STATIC)
    }
}
