//! Constant pool for lowered classes.
//!
//! Stores values referenced by instruction operands: integer literals,
//! string data, type hashes and member references.

use callgen_core::TypeHash;
use rustc_hash::FxHashMap;

/// Values stored in the constant pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Constant {
    Int(i64),
    /// Raw string bytes (literals, names, messages).
    StringData(Vec<u8>),
    /// A type, for casts, allocation and class literals.
    TypeHash(TypeHash),
    /// A method or constructor as seen through a particular owner type.
    ///
    /// The owner may be narrower than the declaring type.
    MemberRef { owner: TypeHash, member: TypeHash },
}

/// Constant pool with deduplication.
///
/// One pool is shared by every method of a class.
#[derive(Debug, Clone, Default)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    /// Deduplication index: maps constant to its index.
    index: FxHashMap<Constant, u32>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constants: Vec::with_capacity(capacity),
            index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Add or get existing constant, returns index.
    pub fn add(&mut self, constant: Constant) -> u32 {
        if let Some(&idx) = self.index.get(&constant) {
            return idx;
        }

        let idx = self.constants.len() as u32;
        self.index.insert(constant.clone(), idx);
        self.constants.push(constant);
        idx
    }

    pub fn add_int(&mut self, value: i64) -> u32 {
        self.add(Constant::Int(value))
    }

    pub fn add_string(&mut self, value: &str) -> u32 {
        self.add(Constant::StringData(value.as_bytes().to_vec()))
    }

    pub fn add_type_hash(&mut self, hash: TypeHash) -> u32 {
        self.add(Constant::TypeHash(hash))
    }

    pub fn add_member_ref(&mut self, owner: TypeHash, member: TypeHash) -> u32 {
        self.add(Constant::MemberRef { owner, member })
    }

    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// String constant at `index`, if it is valid UTF-8 string data.
    pub fn get_str(&self, index: u32) -> Option<&str> {
        match self.get(index)? {
            Constant::StringData(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }
}
