//! Catalog entries: the reflective descriptions the compiler binds against.

use sable_core::{DataType, PrimitiveKind, TypeHash};

/// What kind of type an entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    /// The dynamic type.
    Def,
    Primitive(PrimitiveKind),
    Class,
    Interface,
}

/// A registered type.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeEntry {
    /// Canonical name, as written in scripts.
    pub name: String,
    pub hash: TypeHash,
    pub kind: TypeKind,
    /// Direct supertypes: the superclass first, then interfaces.
    pub supertypes: Vec<TypeHash>,
    /// This type and every supertype, nearest first.
    pub ancestors: Vec<TypeHash>,
    pub methods: Vec<MethodEntry>,
    pub fields: Vec<FieldEntry>,
    pub constructors: Vec<ConstructorEntry>,
    /// Index into `methods` of the single abstract method, for functional interfaces.
    pub functional_method: Option<usize>,
    /// Whether values of this type may be thrown and caught.
    pub throwable: bool,
}

impl TypeEntry {
    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, TypeKind::Class | TypeKind::Interface | TypeKind::Def)
    }

    /// The functional method, when this type is a functional interface.
    pub fn functional(&self) -> Option<&MethodEntry> {
        self.functional_method.and_then(|i| self.methods.get(i))
    }

    pub fn data_type(&self) -> DataType {
        DataType::simple(self.hash)
    }
}

/// A method, static or instance.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub hash: TypeHash,
    /// Declaring type.
    pub owner: TypeHash,
    pub name: String,
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub is_static: bool,
    /// Whether the declaring type is an interface; selects interface dispatch.
    pub on_interface: bool,
}

impl MethodEntry {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// A field, static or instance.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub name: String,
    pub data_type: DataType,
    pub is_static: bool,
    pub is_final: bool,
}

/// A constructor.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorEntry {
    pub hash: TypeHash,
    pub owner: TypeHash,
    pub params: Vec<DataType>,
}

impl ConstructorEntry {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}
