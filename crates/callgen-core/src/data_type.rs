//! DataType - a base type plus array dimensions.
//!
//! Call lowering only needs to distinguish a base type from arrays of it:
//! trailing variadic parameters are arrays, and argument vectors handed to
//! runtime adapters are `Object[]`.
//!
//! ```
//! use callgen_core::{DataType, primitives};
//!
//! let strings = DataType::array_of(primitives::STRING);
//! assert!(strings.is_array());
//! assert_eq!(strings.component(), Some(DataType::simple(primitives::STRING)));
//! ```

use crate::TypeHash;
use crate::type_hash::primitives;

/// A type reference: base type hash and number of array dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataType {
    /// The element type for arrays, or the type itself.
    pub type_hash: TypeHash,
    /// Number of array dimensions (0 for non-array types).
    pub dims: u8,
}

impl DataType {
    /// A non-array type.
    #[inline]
    pub const fn simple(type_hash: TypeHash) -> Self {
        Self { type_hash, dims: 0 }
    }

    /// A one-dimensional array of `element`.
    #[inline]
    pub const fn array_of(element: TypeHash) -> Self {
        Self {
            type_hash: element,
            dims: 1,
        }
    }

    #[inline]
    pub const fn void() -> Self {
        Self::simple(primitives::VOID)
    }

    #[inline]
    pub const fn object() -> Self {
        Self::simple(primitives::OBJECT)
    }

    /// `Object[]`, the shape of every argument vector.
    #[inline]
    pub const fn object_array() -> Self {
        Self::array_of(primitives::OBJECT)
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.dims == 0 && self.type_hash == primitives::VOID
    }

    #[inline]
    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    /// Element type of an array, `None` for non-arrays.
    pub fn component(&self) -> Option<DataType> {
        (self.dims > 0).then(|| DataType {
            type_hash: self.type_hash,
            dims: self.dims - 1,
        })
    }

    /// An array whose elements are `self`.
    pub fn array(&self) -> DataType {
        DataType {
            type_hash: self.type_hash,
            dims: self.dims + 1,
        }
    }

    /// Hash used when this type appears in a method or constructor signature.
    pub fn signature_hash(&self) -> TypeHash {
        TypeHash::array_of(self.type_hash, self.dims)
    }
}

impl From<TypeHash> for DataType {
    fn from(type_hash: TypeHash) -> Self {
        DataType::simple(type_hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_of_nested_array() {
        let grid = DataType::array_of(primitives::INT).array();
        assert_eq!(grid.dims, 2);
        assert_eq!(grid.component(), Some(DataType::array_of(primitives::INT)));
        assert_eq!(DataType::simple(primitives::INT).component(), None);
    }

    #[test]
    fn void_is_not_array() {
        assert!(DataType::void().is_void());
        assert!(!DataType::void().array().is_void());
    }

    #[test]
    fn signature_hash_distinguishes_arrays() {
        let int = DataType::simple(primitives::INT);
        assert_ne!(int.signature_hash(), int.array().signature_hash());
        assert_eq!(int.signature_hash(), primitives::INT);
    }
}
