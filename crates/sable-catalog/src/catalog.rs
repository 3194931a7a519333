//! The query interface and its in-memory implementation.
//!
//! # Thread Safety
//!
//! A [`Catalog`] is immutable once [`CatalogBuilder::build`] returns it. It is
//! `Send + Sync` and is meant to be shared behind an `Arc` by every
//! compilation running in a process; queries never mutate it.
//!
//! [`CatalogBuilder::build`]: crate::CatalogBuilder::build

use rustc_hash::FxHashMap;
use sable_core::{DataType, TypeHash};

use crate::entries::{ConstructorEntry, FieldEntry, MethodEntry, TypeEntry};

/// Narrow query interface the compiler binds against.
pub trait TypeCatalog: Send + Sync {
    /// Look up a type by canonical name (no array suffix).
    fn resolve_type(&self, name: &str) -> Option<&TypeEntry>;

    /// Look up a type by hash.
    fn get_type(&self, hash: TypeHash) -> Option<&TypeEntry>;

    /// Methods named `name` with `arity` parameters visible on `owner`,
    /// nearest declaration first. Overridden signatures appear once.
    fn lookup_methods(&self, owner: TypeHash, name: &str, arity: usize) -> Vec<&MethodEntry>;

    /// Field named `name` visible on `owner`.
    fn resolve_field(&self, owner: TypeHash, name: &str) -> Option<&FieldEntry>;

    /// Constructors of `owner` with `arity` parameters.
    fn lookup_constructors(&self, owner: TypeHash, arity: usize) -> Vec<&ConstructorEntry>;

    /// Static methods imported under a bare name.
    fn lookup_imports(&self, name: &str, arity: usize) -> Vec<&MethodEntry>;

    /// Whether `sub` is `sup` or one of its subtypes.
    fn is_subtype(&self, sub: TypeHash, sup: TypeHash) -> bool;

    /// Whether `text` names a type, including array suffixes like `int[][]`.
    ///
    /// Side-effect free and deterministic; the lexer calls it to tell type
    /// names from identifiers.
    fn is_valid_type_name(&self, text: &str) -> bool {
        self.parse_type(text).is_some()
    }

    /// Parse `Name[]...` into a data type.
    fn parse_type(&self, text: &str) -> Option<DataType> {
        let mut base = text.trim();
        let mut dims = 0u8;
        while let Some(stripped) = base.strip_suffix("[]") {
            base = stripped.trim_end();
            dims = dims.checked_add(1)?;
        }
        let entry = self.resolve_type(base)?;
        if dims > 0 && entry.kind == crate::TypeKind::Void {
            return None;
        }
        Some(DataType::array(entry.hash, dims))
    }

    /// The method with exactly these parameter types.
    fn resolve_method(
        &self,
        owner: TypeHash,
        name: &str,
        arg_types: &[DataType],
    ) -> Option<&MethodEntry> {
        self.lookup_methods(owner, name, arg_types.len())
            .into_iter()
            .find(|m| m.params == arg_types)
    }

    /// The constructor with exactly these parameter types.
    fn resolve_constructor(
        &self,
        owner: TypeHash,
        arg_types: &[DataType],
    ) -> Option<&ConstructorEntry> {
        self.lookup_constructors(owner, arg_types.len())
            .into_iter()
            .find(|c| c.params == arg_types)
    }

    /// Script-facing name of a type, for diagnostics.
    fn type_name(&self, ty: DataType) -> String {
        let base = match ty.builtin_name() {
            Some(name) if ty.dims == 0 => name.to_string(),
            _ => match self.get_type(ty.type_hash) {
                Some(entry) => entry.name.clone(),
                None => match ty.element().builtin_name() {
                    Some(name) => name.to_string(),
                    None => format!("<unknown {}>", ty.type_hash),
                },
            },
        };
        let mut name = base;
        for _ in 0..ty.dims {
            name.push_str("[]");
        }
        name
    }
}

/// Immutable in-memory catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    pub(crate) types: FxHashMap<TypeHash, TypeEntry>,
    pub(crate) by_name: FxHashMap<String, TypeHash>,
    pub(crate) imports: FxHashMap<String, Vec<MethodEntry>>,
}

impl Catalog {
    /// Number of registered types, built-ins included.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Iterate over all registered types.
    pub fn types(&self) -> impl Iterator<Item = &TypeEntry> {
        self.types.values()
    }
}

impl TypeCatalog for Catalog {
    fn resolve_type(&self, name: &str) -> Option<&TypeEntry> {
        self.by_name.get(name).and_then(|hash| self.types.get(hash))
    }

    fn get_type(&self, hash: TypeHash) -> Option<&TypeEntry> {
        self.types.get(&hash)
    }

    fn lookup_methods(&self, owner: TypeHash, name: &str, arity: usize) -> Vec<&MethodEntry> {
        let Some(entry) = self.types.get(&owner) else {
            return Vec::new();
        };
        let mut found: Vec<&MethodEntry> = Vec::new();
        for ancestor in &entry.ancestors {
            let Some(ty) = self.types.get(ancestor) else {
                continue;
            };
            for method in &ty.methods {
                if method.name == name
                    && method.arity() == arity
                    && !found.iter().any(|m| m.params == method.params)
                {
                    found.push(method);
                }
            }
        }
        found
    }

    fn resolve_field(&self, owner: TypeHash, name: &str) -> Option<&FieldEntry> {
        let entry = self.types.get(&owner)?;
        entry.ancestors.iter().find_map(|ancestor| {
            self.types
                .get(ancestor)
                .and_then(|ty| ty.fields.iter().find(|f| f.name == name))
        })
    }

    fn lookup_constructors(&self, owner: TypeHash, arity: usize) -> Vec<&ConstructorEntry> {
        self.types
            .get(&owner)
            .map(|ty| ty.constructors.iter().filter(|c| c.arity() == arity).collect())
            .unwrap_or_default()
    }

    fn lookup_imports(&self, name: &str, arity: usize) -> Vec<&MethodEntry> {
        self.imports
            .get(name)
            .map(|methods| methods.iter().filter(|m| m.arity() == arity).collect())
            .unwrap_or_default()
    }

    fn is_subtype(&self, sub: TypeHash, sup: TypeHash) -> bool {
        sub == sup
            || self
                .types
                .get(&sub)
                .is_some_and(|entry| entry.ancestors.contains(&sup))
    }
}
