//! DataType - a base type plus array dimensions.
//!
//! [`DataType`] is the static type of every value in the compiler. It is
//! distinct from [`TypeHash`], which only identifies the base type.
//!
//! # Example
//!
//! ```
//! use sable_core::{DataType, PrimitiveKind, primitives};
//!
//! let int_type = DataType::simple(primitives::INT);
//! assert_eq!(int_type.primitive(), Some(PrimitiveKind::Int));
//!
//! let matrix = DataType::array(primitives::DOUBLE, 2);
//! assert!(matrix.is_array());
//! assert_eq!(matrix.element().dims, 1);
//! ```

use crate::TypeHash;
use crate::type_hash::{known, primitives};

/// The primitive value types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Boolean,
    Byte,
    Short,
    Char,
    Int,
    Long,
    Float,
    Double,
}

/// Representation of a primitive on the operand stack.
///
/// Sub-int integral types and booleans occupy an `I32` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StackKind {
    I32,
    I64,
    F32,
    F64,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Boolean,
        PrimitiveKind::Byte,
        PrimitiveKind::Short,
        PrimitiveKind::Char,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Byte => "byte",
            PrimitiveKind::Short => "short",
            PrimitiveKind::Char => "char",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
        }
    }

    pub const fn hash(self) -> TypeHash {
        match self {
            PrimitiveKind::Boolean => primitives::BOOLEAN,
            PrimitiveKind::Byte => primitives::BYTE,
            PrimitiveKind::Short => primitives::SHORT,
            PrimitiveKind::Char => primitives::CHAR,
            PrimitiveKind::Int => primitives::INT,
            PrimitiveKind::Long => primitives::LONG,
            PrimitiveKind::Float => primitives::FLOAT,
            PrimitiveKind::Double => primitives::DOUBLE,
        }
    }

    /// Hash of the reference type that boxes this primitive.
    pub const fn boxed(self) -> TypeHash {
        match self {
            PrimitiveKind::Boolean => known::BOOLEAN_BOX,
            PrimitiveKind::Byte => known::BYTE_BOX,
            PrimitiveKind::Short => known::SHORT_BOX,
            PrimitiveKind::Char => known::CHARACTER,
            PrimitiveKind::Int => known::INTEGER,
            PrimitiveKind::Long => known::LONG_BOX,
            PrimitiveKind::Float => known::FLOAT_BOX,
            PrimitiveKind::Double => known::DOUBLE_BOX,
        }
    }

    pub fn from_hash(hash: TypeHash) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.hash() == hash)
    }

    /// The primitive boxed by the reference type `hash`, if any.
    pub fn from_boxed(hash: TypeHash) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.boxed() == hash)
    }

    pub fn is_numeric(self) -> bool {
        self != PrimitiveKind::Boolean
    }

    pub fn is_integral(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Byte
                | PrimitiveKind::Short
                | PrimitiveKind::Char
                | PrimitiveKind::Int
                | PrimitiveKind::Long
        )
    }

    pub fn is_floating(self) -> bool {
        matches!(self, PrimitiveKind::Float | PrimitiveKind::Double)
    }

    pub fn stack_kind(self) -> StackKind {
        match self {
            PrimitiveKind::Long => StackKind::I64,
            PrimitiveKind::Float => StackKind::F32,
            PrimitiveKind::Double => StackKind::F64,
            _ => StackKind::I32,
        }
    }

    /// Number of implicit widening steps from `self` to `target`, or `None`
    /// when the conversion is not an implicit widening.
    ///
    /// byte -> short -> int -> long -> float -> double, and char -> int.
    pub fn widening_distance(self, target: PrimitiveKind) -> Option<u32> {
        fn rank(kind: PrimitiveKind) -> Option<u32> {
            match kind {
                PrimitiveKind::Byte => Some(0),
                PrimitiveKind::Short => Some(1),
                PrimitiveKind::Int => Some(2),
                PrimitiveKind::Long => Some(3),
                PrimitiveKind::Float => Some(4),
                PrimitiveKind::Double => Some(5),
                PrimitiveKind::Char | PrimitiveKind::Boolean => None,
            }
        }

        if self == target {
            return Some(0);
        }
        match (self, target) {
            (PrimitiveKind::Char, _) => {
                let to = rank(target)?;
                (to >= 2).then(|| to - 1)
            }
            (_, PrimitiveKind::Char) => None,
            _ => {
                let from = rank(self)?;
                let to = rank(target)?;
                (to > from).then_some(to - from)
            }
        }
    }
}

/// A complete static type: base type hash plus array dimensions.
///
/// `Copy`, so it is passed by value everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataType {
    /// The base (element) type.
    pub type_hash: TypeHash,
    /// Array dimensions; zero for non-arrays.
    pub dims: u8,
}

impl DataType {
    pub const VOID: DataType = DataType::simple(primitives::VOID);
    pub const BOOLEAN: DataType = DataType::simple(primitives::BOOLEAN);
    pub const BYTE: DataType = DataType::simple(primitives::BYTE);
    pub const SHORT: DataType = DataType::simple(primitives::SHORT);
    pub const CHAR: DataType = DataType::simple(primitives::CHAR);
    pub const INT: DataType = DataType::simple(primitives::INT);
    pub const LONG: DataType = DataType::simple(primitives::LONG);
    pub const FLOAT: DataType = DataType::simple(primitives::FLOAT);
    pub const DOUBLE: DataType = DataType::simple(primitives::DOUBLE);
    pub const DEF: DataType = DataType::simple(primitives::DEF);
    pub const NULL: DataType = DataType::simple(primitives::NULL);
    pub const OBJECT: DataType = DataType::simple(known::OBJECT);
    pub const STRING: DataType = DataType::simple(known::STRING);

    /// A non-array type.
    #[inline]
    pub const fn simple(type_hash: TypeHash) -> Self {
        Self { type_hash, dims: 0 }
    }

    /// An array of `dims` dimensions over `element`.
    #[inline]
    pub const fn array(element: TypeHash, dims: u8) -> Self {
        Self {
            type_hash: element,
            dims,
        }
    }

    pub fn primitive_type(kind: PrimitiveKind) -> Self {
        Self::simple(kind.hash())
    }

    /// This type with one more array dimension.
    pub fn array_of(self) -> Self {
        Self {
            type_hash: self.type_hash,
            dims: self.dims + 1,
        }
    }

    /// The element type of an array; identity for non-arrays.
    pub fn element(self) -> Self {
        Self {
            type_hash: self.type_hash,
            dims: self.dims.saturating_sub(1),
        }
    }

    #[inline]
    pub fn is_array(self) -> bool {
        self.dims > 0
    }

    #[inline]
    pub fn is_def(self) -> bool {
        self.dims == 0 && self.type_hash == primitives::DEF
    }

    #[inline]
    pub fn is_void(self) -> bool {
        self.dims == 0 && self.type_hash == primitives::VOID
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.dims == 0 && self.type_hash == primitives::NULL
    }

    #[inline]
    pub fn is_string(self) -> bool {
        self.dims == 0 && self.type_hash == known::STRING
    }

    /// The primitive kind, for non-array primitive types.
    pub fn primitive(self) -> Option<PrimitiveKind> {
        if self.dims == 0 {
            PrimitiveKind::from_hash(self.type_hash)
        } else {
            None
        }
    }

    /// The primitive this type boxes, for the boxed reference types.
    pub fn boxed_primitive(self) -> Option<PrimitiveKind> {
        if self.dims == 0 {
            PrimitiveKind::from_boxed(self.type_hash)
        } else {
            None
        }
    }

    pub fn is_primitive(self) -> bool {
        self.primitive().is_some()
    }

    /// Whether values of this type are references (arrays, objects, def, null).
    pub fn is_reference(self) -> bool {
        !self.is_primitive() && !self.is_void()
    }

    /// Name for built-in types; catalog types need a catalog to name them.
    pub fn builtin_name(self) -> Option<&'static str> {
        if self.dims != 0 {
            return None;
        }
        if let Some(kind) = self.primitive() {
            return Some(kind.name());
        }
        match self.type_hash {
            primitives::VOID => Some("void"),
            primitives::DEF => Some("def"),
            primitives::NULL => Some("null"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_round_trip_through_hash() {
        for kind in PrimitiveKind::ALL {
            assert_eq!(PrimitiveKind::from_hash(kind.hash()), Some(kind));
            assert_eq!(PrimitiveKind::from_boxed(kind.boxed()), Some(kind));
        }
    }

    #[test]
    fn widening_follows_the_lattice() {
        use PrimitiveKind::*;
        assert_eq!(Byte.widening_distance(Int), Some(2));
        assert_eq!(Char.widening_distance(Int), Some(1));
        assert_eq!(Int.widening_distance(Double), Some(3));
        assert_eq!(Long.widening_distance(Int), None);
        assert_eq!(Short.widening_distance(Char), None);
        assert_eq!(Char.widening_distance(Short), None);
        assert_eq!(Boolean.widening_distance(Int), None);
    }

    #[test]
    fn arrays_are_references() {
        let ints = DataType::array(primitives::INT, 1);
        assert!(ints.is_reference());
        assert!(ints.primitive().is_none());
        assert_eq!(ints.element(), DataType::INT);
        assert_eq!(DataType::INT.array_of(), ints);
    }

    #[test]
    fn def_and_null_are_references() {
        assert!(DataType::DEF.is_def());
        assert!(DataType::DEF.is_reference());
        assert!(DataType::NULL.is_reference());
        assert!(!DataType::VOID.is_reference());
        assert!(!DataType::DEF.array_of().is_def());
    }

    #[test]
    fn builtin_names() {
        assert_eq!(DataType::LONG.builtin_name(), Some("long"));
        assert_eq!(DataType::DEF.builtin_name(), Some("def"));
        assert_eq!(DataType::STRING.builtin_name(), None);
    }
}
