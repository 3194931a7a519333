//! Deterministic hash-based identity for types and members.
//!
//! [`TypeHash`] is a 64-bit hash computed from names and signatures. The
//! catalog, the compiler, and the runtime all agree on the same identity
//! without sharing registration order:
//!
//! - Same name = same hash
//! - Forward references are hashes computed before registration
//! - Members are keyed by owner + name + parameter hashes
//!
//! # Examples
//!
//! ```
//! use sable_core::TypeHash;
//!
//! let list = TypeHash::from_name("List");
//! assert_eq!(list, TypeHash::from_name("List"));
//!
//! let get = TypeHash::from_method(list, "get", &[TypeHash::from_name("int")]);
//! let get_long = TypeHash::from_method(list, "get", &[TypeHash::from_name("long")]);
//! assert_ne!(get, get_long);
//! ```

use std::fmt;
use xxhash_rust::const_xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// Different entity kinds sharing a name still produce distinct hashes.
pub mod hash_constants {
    /// Domain marker for type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for script-defined function hashes.
    pub const FUNCTION: u64 = 0x5ea77ffbcdf5f302;

    /// Domain marker for method hashes.
    pub const METHOD: u64 = 0x7d3c8b4a92e15f6d;

    /// Domain marker for constructor hashes.
    pub const CONSTRUCTOR: u64 = 0x9a7f3d5e2b8c4601;

    /// Domain marker for field hashes.
    pub const FIELD: u64 = 0x3e9f5d2a8c7b1403;

    /// Domain marker for array dimensions.
    pub const ARRAY: u64 = 0x1a095090689d4647;

    /// Parameter position mixing constants.
    ///
    /// Each position gets its own constant so parameter order matters.
    /// Positions past the table wrap around with an extra rotation.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x0f1e2d3c4b5a6978,
    ];
}

/// A deterministic 64-bit hash identifying a type or member.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Create a type hash from a canonical type name.
    #[inline]
    pub const fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of a script-defined function, by name and parameter types.
    pub fn from_function(name: &str, params: &[TypeHash]) -> Self {
        let base = hash_constants::FUNCTION ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(base, params))
    }

    /// Hash of a method on `owner`, by name and parameter types.
    pub fn from_method(owner: TypeHash, name: &str, params: &[TypeHash]) -> Self {
        let base = hash_constants::METHOD ^ owner.0.rotate_left(17) ^ xxh64(name.as_bytes(), 0);
        TypeHash(mix_params(base, params))
    }

    /// Hash of a constructor of `owner`, by parameter types.
    pub fn from_constructor(owner: TypeHash, params: &[TypeHash]) -> Self {
        let base = hash_constants::CONSTRUCTOR ^ owner.0.rotate_left(29);
        TypeHash(mix_params(base, params))
    }

    /// Hash of a field on `owner`.
    pub fn from_field(owner: TypeHash, name: &str) -> Self {
        TypeHash(hash_constants::FIELD ^ owner.0.rotate_left(7) ^ xxh64(name.as_bytes(), 0))
    }

    /// Hash of an array type, used when array types appear as parameters.
    pub fn from_array(element: TypeHash, dims: u8) -> Self {
        if dims == 0 {
            return element;
        }
        TypeHash(element.0 ^ hash_constants::ARRAY.wrapping_mul(dims as u64 + 1))
    }

    /// Whether this is the empty hash.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

fn mix_params(mut hash: u64, params: &[TypeHash]) -> u64 {
    let markers = &hash_constants::PARAM_MARKERS;
    for (i, param) in params.iter().enumerate() {
        let marker = markers[i % markers.len()].rotate_left((i / markers.len()) as u32);
        hash = (hash ^ param.0.wrapping_mul(marker)).rotate_left(23);
    }
    hash ^ (params.len() as u64).wrapping_mul(markers[0])
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash(0x{:016x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:016x}", self.0)
    }
}

/// Hashes of the built-in types every catalog must know.
pub mod primitives {
    use super::TypeHash;

    pub const VOID: TypeHash = TypeHash::from_name("void");
    pub const BOOLEAN: TypeHash = TypeHash::from_name("boolean");
    pub const BYTE: TypeHash = TypeHash::from_name("byte");
    pub const SHORT: TypeHash = TypeHash::from_name("short");
    pub const CHAR: TypeHash = TypeHash::from_name("char");
    pub const INT: TypeHash = TypeHash::from_name("int");
    pub const LONG: TypeHash = TypeHash::from_name("long");
    pub const FLOAT: TypeHash = TypeHash::from_name("float");
    pub const DOUBLE: TypeHash = TypeHash::from_name("double");
    /// The dynamic type.
    pub const DEF: TypeHash = TypeHash::from_name("def");
    /// Static type of the `null` literal before it meets a context.
    pub const NULL: TypeHash = TypeHash(0x6e756c6c5f747970);
}

/// Hashes of library types the compiler itself lowers onto.
pub mod known {
    use super::TypeHash;

    pub const OBJECT: TypeHash = TypeHash::from_name("Object");
    pub const STRING: TypeHash = TypeHash::from_name("String");
    pub const CHAR_SEQUENCE: TypeHash = TypeHash::from_name("CharSequence");
    pub const NUMBER: TypeHash = TypeHash::from_name("Number");
    pub const BOOLEAN_BOX: TypeHash = TypeHash::from_name("Boolean");
    pub const BYTE_BOX: TypeHash = TypeHash::from_name("Byte");
    pub const SHORT_BOX: TypeHash = TypeHash::from_name("Short");
    pub const CHARACTER: TypeHash = TypeHash::from_name("Character");
    pub const INTEGER: TypeHash = TypeHash::from_name("Integer");
    pub const LONG_BOX: TypeHash = TypeHash::from_name("Long");
    pub const FLOAT_BOX: TypeHash = TypeHash::from_name("Float");
    pub const DOUBLE_BOX: TypeHash = TypeHash::from_name("Double");
    pub const ITERABLE: TypeHash = TypeHash::from_name("Iterable");
    pub const ITERATOR: TypeHash = TypeHash::from_name("Iterator");
    pub const LIST: TypeHash = TypeHash::from_name("List");
    pub const ARRAY_LIST: TypeHash = TypeHash::from_name("ArrayList");
    pub const MAP: TypeHash = TypeHash::from_name("Map");
    pub const HASH_MAP: TypeHash = TypeHash::from_name("HashMap");
    pub const PATTERN: TypeHash = TypeHash::from_name("Pattern");
    pub const MATCHER: TypeHash = TypeHash::from_name("Matcher");
    pub const THROWABLE: TypeHash = TypeHash::from_name("Throwable");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_deterministic() {
        assert_eq!(TypeHash::from_name("int"), primitives::INT);
        assert_ne!(primitives::INT, primitives::LONG);
        assert_ne!(primitives::NULL, TypeHash::from_name("null"));
    }

    #[test]
    fn parameter_order_matters() {
        let owner = known::MAP;
        let a = TypeHash::from_method(owner, "put", &[primitives::INT, known::STRING]);
        let b = TypeHash::from_method(owner, "put", &[known::STRING, primitives::INT]);
        assert_ne!(a, b);
    }

    #[test]
    fn domains_do_not_collide() {
        let owner = known::LIST;
        assert_ne!(
            TypeHash::from_method(owner, "size", &[]),
            TypeHash::from_field(owner, "size")
        );
        assert_ne!(
            TypeHash::from_constructor(owner, &[]),
            TypeHash::from_function("List", &[])
        );
    }

    #[test]
    fn array_hashes_depend_on_dims() {
        let one = TypeHash::from_array(primitives::INT, 1);
        let two = TypeHash::from_array(primitives::INT, 2);
        assert_ne!(one, two);
        assert_eq!(TypeHash::from_array(primitives::INT, 0), primitives::INT);
    }

    #[test]
    fn many_parameters_still_hash() {
        let params = vec![primitives::INT; 40];
        let a = TypeHash::from_function("f", &params);
        let b = TypeHash::from_function("f", &params[..39]);
        assert_ne!(a, b);
    }
}
