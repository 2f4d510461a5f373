//! Deterministic hash-based identity for types, methods and constructors.
//!
//! A [`TypeHash`] is computed from names and signatures, so the same
//! declaration always produces the same identity regardless of registration
//! order. Constructor hashes double as the stable key used when a constructor
//! is referenced from emitted bytecode.
//!
//! # Examples
//!
//! ```
//! use callgen_core::TypeHash;
//!
//! let widget = TypeHash::from_name("demo.Widget");
//! assert_eq!(widget, TypeHash::from_name("demo.Widget"));
//!
//! let int_param = TypeHash::from_name("int");
//! let a = TypeHash::from_method(widget, "resize", &[int_param]);
//! let b = TypeHash::from_method(widget, "resize", &[]);
//! assert_ne!(a, b);
//! ```

use std::fmt;
use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Types, methods, constructors and array types use distinct domain markers so
/// that a method named like a type never collides with it.
pub mod hash_constants {
    /// Separator constant for path components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for array types.
    pub const ARRAY: u64 = 0x5ea77ffbcdf5f302;

    /// Parameter position mixing constants, so that parameter order matters.
    pub const PARAM_MARKERS: [u64; 8] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
    ];
}

/// A deterministic 64-bit hash identifying a type, method or constructor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a qualified type name.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create a method hash from its declaring type, name and parameter types.
    #[inline]
    pub fn from_method(owner: TypeHash, name: &str, param_hashes: &[TypeHash]) -> Self {
        let seed = hash_constants::METHOD ^ owner.0 ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(seed, param_hashes))
    }

    /// Create a constructor hash from its declaring type and parameter types.
    ///
    /// Constructors have no name, so they're identified by owner + params.
    #[inline]
    pub fn from_constructor(owner: TypeHash, param_hashes: &[TypeHash]) -> Self {
        TypeHash(mix_params(hash_constants::CONSTRUCTOR ^ owner.0, param_hashes))
    }

    /// Hash of an array type with `dims` dimensions over `element`.
    #[inline]
    pub fn array_of(element: TypeHash, dims: u8) -> Self {
        if dims == 0 {
            return element;
        }
        TypeHash(
            element
                .0
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(hash_constants::ARRAY ^ dims as u64),
        )
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

fn mix_params(seed: u64, param_hashes: &[TypeHash]) -> u64 {
    let mut hash = seed;
    for (i, param) in param_hashes.iter().enumerate() {
        let marker = hash_constants::PARAM_MARKERS
            .get(i)
            .copied()
            .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
        // wrapping_mul keeps the mix order-sensitive, unlike a plain XOR
        hash = hash
            .wrapping_mul(hash_constants::SEP)
            .wrapping_add(marker ^ param.0);
    }
    hash
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// Reserved hashes for the primitive types.
///
/// Built-in types are registered under these fixed values rather than
/// `TypeHash::from_name`, so they can be used in `const` contexts.
pub mod primitives {
    use super::TypeHash;

    /// `void`
    pub const VOID: TypeHash = TypeHash(0xe4b3797ddcf989ea);
    /// `boolean`
    pub const BOOLEAN: TypeHash = TypeHash(0x1e0c8fa4cced99c1);
    /// `int` (32-bit signed)
    pub const INT: TypeHash = TypeHash(0x4f5e5320cd1c92bf);
    /// `long` (64-bit signed)
    pub const LONG: TypeHash = TypeHash(0x7d6c550df59a1924);
    /// `double`
    pub const DOUBLE: TypeHash = TypeHash(0x95aebfc985e9b115);

    /// Root of the class hierarchy.
    pub const OBJECT: TypeHash = TypeHash(0x2b44191092e74388);
    /// String type.
    pub const STRING: TypeHash = TypeHash(0x0e8b2d31cdfa9716);
    /// The metaclass type of class literals.
    pub const CLASS: TypeHash = TypeHash(0x269d68dfde65ae7f);
    /// Base class of all enums.
    pub const ENUM: TypeHash = TypeHash(0x543fb8f520aa3e26);
    /// Shared reference cell for closed-over mutable locals.
    pub const REFERENCE: TypeHash = TypeHash(0x3e9f5d2a8c7b1403);

    /// Boxed `boolean`.
    pub const BOOLEAN_BOX: TypeHash = TypeHash(0x1a095090689d4647);
    /// Boxed `int`.
    pub const INTEGER_BOX: TypeHash = TypeHash(0x6c8e4b2f9a1d3705);
    /// Boxed `long`.
    pub const LONG_BOX: TypeHash = TypeHash(0xb27d0e9c4f6a8153);
    /// Boxed `double`.
    pub const DOUBLE_BOX: TypeHash = TypeHash(0x83f1a6d5c2e97b40);
}
