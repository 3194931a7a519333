//! Declarative catalog construction.
//!
//! Types are described with [`TypeDef`] using type *names*, so definitions may
//! refer to each other in any order. [`CatalogBuilder::build`] resolves the
//! names, validates the inheritance graph, and freezes the result.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Bfs;
use rustc_hash::FxHashMap;
use sable_core::{DataType, PrimitiveKind, RegistrationError, TypeHash, known, primitives};
use tracing::debug;

use crate::catalog::Catalog;
use crate::entries::{ConstructorEntry, FieldEntry, MethodEntry, TypeEntry, TypeKind};

#[derive(Debug, Clone)]
struct MethodDef {
    name: String,
    params: Vec<String>,
    return_type: String,
    is_static: bool,
}

#[derive(Debug, Clone)]
struct FieldDef {
    name: String,
    data_type: String,
    is_static: bool,
    is_final: bool,
}

/// Description of one class or interface.
#[derive(Debug, Clone)]
pub struct TypeDef {
    name: String,
    interface: bool,
    extends: Option<String>,
    implements: Vec<String>,
    constructors: Vec<Vec<String>>,
    methods: Vec<MethodDef>,
    fields: Vec<FieldDef>,
    functional: Option<String>,
    throwable: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl TypeDef {
    fn new(name: &str, interface: bool) -> Self {
        Self {
            name: name.to_string(),
            interface,
            extends: None,
            implements: Vec::new(),
            constructors: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            functional: None,
            throwable: false,
        }
    }

    pub fn class(name: &str) -> Self {
        Self::new(name, false)
    }

    pub fn interface(name: &str) -> Self {
        Self::new(name, true)
    }

    pub fn extends(mut self, name: &str) -> Self {
        self.extends = Some(name.to_string());
        self
    }

    pub fn implements(mut self, name: &str) -> Self {
        self.implements.push(name.to_string());
        self
    }

    pub fn constructor(mut self, params: &[&str]) -> Self {
        self.constructors.push(strings(params));
        self
    }

    pub fn method(mut self, name: &str, params: &[&str], return_type: &str) -> Self {
        self.methods.push(MethodDef {
            name: name.to_string(),
            params: strings(params),
            return_type: return_type.to_string(),
            is_static: false,
        });
        self
    }

    pub fn static_method(mut self, name: &str, params: &[&str], return_type: &str) -> Self {
        self.methods.push(MethodDef {
            name: name.to_string(),
            params: strings(params),
            return_type: return_type.to_string(),
            is_static: true,
        });
        self
    }

    pub fn field(mut self, name: &str, data_type: &str) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_static: false,
            is_final: false,
        });
        self
    }

    /// A `static final` constant field.
    pub fn constant(mut self, name: &str, data_type: &str) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            data_type: data_type.to_string(),
            is_static: true,
            is_final: true,
        });
        self
    }

    /// Mark this interface as functional, implemented by `method`.
    pub fn functional(mut self, method: &str) -> Self {
        self.functional = Some(method.to_string());
        self
    }

    /// Mark this type and all its subtypes as throwable.
    pub fn throwable(mut self) -> Self {
        self.throwable = true;
        self
    }
}

#[derive(Debug, Clone)]
struct ImportDef {
    alias: String,
    owner: String,
    method: String,
}

/// Collects type definitions and builds an immutable [`Catalog`].
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    defs: Vec<TypeDef>,
    imports: Vec<ImportDef>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, def: TypeDef) -> &mut Self {
        self.defs.push(def);
        self
    }

    /// Make every static `owner.method` overload callable as `alias(...)`.
    pub fn import(&mut self, alias: &str, owner: &str, method: &str) -> &mut Self {
        self.imports.push(ImportDef {
            alias: alias.to_string(),
            owner: owner.to_string(),
            method: method.to_string(),
        });
        self
    }

    pub fn build(&self) -> Result<Catalog, RegistrationError> {
        let mut catalog = Catalog::default();
        register_builtins(&mut catalog);

        // Pass 1: names.
        for def in &self.defs {
            if catalog.by_name.contains_key(&def.name) {
                return Err(RegistrationError::DuplicateType(def.name.clone()));
            }
            let hash = TypeHash::from_name(&def.name);
            catalog.by_name.insert(def.name.clone(), hash);
            catalog.types.insert(
                hash,
                TypeEntry {
                    name: def.name.clone(),
                    hash,
                    kind: if def.interface {
                        TypeKind::Interface
                    } else {
                        TypeKind::Class
                    },
                    supertypes: Vec::new(),
                    ancestors: Vec::new(),
                    methods: Vec::new(),
                    fields: Vec::new(),
                    constructors: Vec::new(),
                    functional_method: None,
                    throwable: false,
                },
            );
        }

        // Pass 2: supertypes and members.
        let has_object = catalog.types.contains_key(&known::OBJECT);
        for def in &self.defs {
            let hash = TypeHash::from_name(&def.name);
            let mut supertypes = Vec::new();
            if let Some(parent) = &def.extends {
                supertypes.push(lookup(&catalog, parent)?);
            }
            for iface in &def.implements {
                supertypes.push(lookup(&catalog, iface)?);
            }
            if supertypes.is_empty() && has_object && hash != known::OBJECT {
                supertypes.push(known::OBJECT);
            }

            let mut methods = Vec::with_capacity(def.methods.len());
            for method in &def.methods {
                let params = parse_all(&catalog, &method.params)?;
                let return_type = parse(&catalog, &method.return_type)?;
                let param_hashes: Vec<TypeHash> = params.iter().map(|p| param_hash(*p)).collect();
                let entry = MethodEntry {
                    hash: TypeHash::from_method(hash, &method.name, &param_hashes),
                    owner: hash,
                    name: method.name.clone(),
                    params,
                    return_type,
                    is_static: method.is_static,
                    on_interface: def.interface,
                };
                if methods.iter().any(|m: &MethodEntry| m.hash == entry.hash) {
                    return Err(RegistrationError::DuplicateMember {
                        type_name: def.name.clone(),
                        member: method.name.clone(),
                    });
                }
                methods.push(entry);
            }

            let mut fields = Vec::with_capacity(def.fields.len());
            for field in &def.fields {
                if fields.iter().any(|f: &FieldEntry| f.name == field.name) {
                    return Err(RegistrationError::DuplicateMember {
                        type_name: def.name.clone(),
                        member: field.name.clone(),
                    });
                }
                fields.push(FieldEntry {
                    hash: TypeHash::from_field(hash, &field.name),
                    owner: hash,
                    name: field.name.clone(),
                    data_type: parse(&catalog, &field.data_type)?,
                    is_static: field.is_static,
                    is_final: field.is_final,
                });
            }

            let mut constructors = Vec::with_capacity(def.constructors.len());
            for ctor in &def.constructors {
                let params = parse_all(&catalog, ctor)?;
                let param_hashes: Vec<TypeHash> = params.iter().map(|p| param_hash(*p)).collect();
                constructors.push(ConstructorEntry {
                    hash: TypeHash::from_constructor(hash, &param_hashes),
                    owner: hash,
                    params,
                });
            }

            let functional_method = match &def.functional {
                None => None,
                Some(name) => Some(functional_index(def, &methods, name)?),
            };

            if let Some(entry) = catalog.types.get_mut(&hash) {
                entry.supertypes = supertypes;
                entry.methods = methods;
                entry.fields = fields;
                entry.constructors = constructors;
                entry.functional_method = functional_method;
            }
        }

        compute_ancestors(&mut catalog, &self.defs)?;

        for import in &self.imports {
            let owner = lookup(&catalog, &import.owner)?;
            let methods: Vec<MethodEntry> = catalog
                .types
                .get(&owner)
                .map(|ty| {
                    ty.methods
                        .iter()
                        .filter(|m| m.is_static && m.name == import.method)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            if methods.is_empty() {
                return Err(RegistrationError::TypeNotFound(format!(
                    "{}.{}",
                    import.owner, import.method
                )));
            }
            catalog
                .imports
                .entry(import.alias.clone())
                .or_default()
                .extend(methods);
        }

        debug!(
            types = catalog.types.len(),
            imports = catalog.imports.len(),
            "catalog built"
        );
        Ok(catalog)
    }
}

fn register_builtins(catalog: &mut Catalog) {
    let mut register = |name: &str, hash: TypeHash, kind: TypeKind| {
        catalog.by_name.insert(name.to_string(), hash);
        catalog.types.insert(
            hash,
            TypeEntry {
                name: name.to_string(),
                hash,
                kind,
                supertypes: Vec::new(),
                ancestors: vec![hash],
                methods: Vec::new(),
                fields: Vec::new(),
                constructors: Vec::new(),
                functional_method: None,
                throwable: false,
            },
        );
    };
    register("void", primitives::VOID, TypeKind::Void);
    register("def", primitives::DEF, TypeKind::Def);
    for kind in PrimitiveKind::ALL {
        register(kind.name(), kind.hash(), TypeKind::Primitive(kind));
    }
}

fn lookup(catalog: &Catalog, name: &str) -> Result<TypeHash, RegistrationError> {
    catalog
        .by_name
        .get(name)
        .copied()
        .ok_or_else(|| RegistrationError::TypeNotFound(name.to_string()))
}

fn parse(catalog: &Catalog, text: &str) -> Result<DataType, RegistrationError> {
    let mut base = text.trim();
    let mut dims = 0u8;
    while let Some(stripped) = base.strip_suffix("[]") {
        base = stripped.trim_end();
        dims += 1;
    }
    let hash = lookup(catalog, base)?;
    if dims > 0 && hash == primitives::VOID {
        return Err(RegistrationError::InvalidType(text.to_string()));
    }
    Ok(DataType::array(hash, dims))
}

fn parse_all(catalog: &Catalog, names: &[String]) -> Result<Vec<DataType>, RegistrationError> {
    names.iter().map(|name| parse(catalog, name)).collect()
}

/// Hash of a parameter type as it appears in member signatures.
fn param_hash(ty: DataType) -> TypeHash {
    TypeHash::from_array(ty.type_hash, ty.dims)
}

fn functional_index(
    def: &TypeDef,
    methods: &[MethodEntry],
    name: &str,
) -> Result<usize, RegistrationError> {
    let invalid = |reason: &str| RegistrationError::InvalidFunctionalInterface {
        type_name: def.name.clone(),
        reason: reason.to_string(),
    };
    if !def.interface {
        return Err(invalid("only interfaces can be functional"));
    }
    let mut matching = methods
        .iter()
        .enumerate()
        .filter(|(_, m)| m.name == name && !m.is_static);
    match (matching.next(), matching.next()) {
        (Some((index, _)), None) => Ok(index),
        (None, _) => Err(invalid("functional method is not declared")),
        (Some(_), Some(_)) => Err(invalid("functional method is overloaded")),
    }
}

fn compute_ancestors(catalog: &mut Catalog, defs: &[TypeDef]) -> Result<(), RegistrationError> {
    let mut graph: DiGraph<TypeHash, ()> = DiGraph::new();
    let mut nodes: FxHashMap<TypeHash, NodeIndex> = FxHashMap::default();
    for hash in catalog.types.keys() {
        nodes.insert(*hash, graph.add_node(*hash));
    }
    for entry in catalog.types.values() {
        for sup in &entry.supertypes {
            graph.add_edge(nodes[&entry.hash], nodes[sup], ());
        }
    }

    if is_cyclic_directed(&graph) {
        let name = defs
            .iter()
            .find(|def| def.extends.is_some() || !def.implements.is_empty())
            .map(|def| def.name.clone())
            .unwrap_or_default();
        return Err(RegistrationError::InheritanceCycle(name));
    }

    let throwable_roots: Vec<TypeHash> = defs
        .iter()
        .filter(|def| def.throwable)
        .map(|def| TypeHash::from_name(&def.name))
        .collect();

    let hashes: Vec<TypeHash> = catalog.types.keys().copied().collect();
    for hash in hashes {
        let mut ancestors = Vec::new();
        let mut bfs = Bfs::new(&graph, nodes[&hash]);
        while let Some(node) = bfs.next(&graph) {
            ancestors.push(graph[node]);
        }
        if let Some(entry) = catalog.types.get_mut(&hash) {
            entry.throwable = ancestors.iter().any(|a| throwable_roots.contains(a));
            entry.ancestors = ancestors;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeCatalog;

    #[test]
    fn unknown_supertype_is_reported() {
        let mut builder = CatalogBuilder::new();
        builder.add(TypeDef::class("A").extends("Missing"));
        assert_eq!(
            builder.build().unwrap_err(),
            RegistrationError::TypeNotFound("Missing".into())
        );
    }

    #[test]
    fn duplicate_types_are_rejected() {
        let mut builder = CatalogBuilder::new();
        builder.add(TypeDef::class("A")).add(TypeDef::class("A"));
        assert!(matches!(
            builder.build(),
            Err(RegistrationError::DuplicateType(_))
        ));
    }

    #[test]
    fn duplicate_signatures_are_rejected() {
        let mut builder = CatalogBuilder::new();
        builder.add(
            TypeDef::class("A")
                .method("f", &["int"], "void")
                .method("f", &["int"], "int"),
        );
        assert!(matches!(
            builder.build(),
            Err(RegistrationError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn inheritance_cycles_are_rejected() {
        let mut builder = CatalogBuilder::new();
        builder
            .add(TypeDef::interface("A").implements("B"))
            .add(TypeDef::interface("B").implements("A"));
        assert!(matches!(
            builder.build(),
            Err(RegistrationError::InheritanceCycle(_))
        ));
    }

    #[test]
    fn functional_interfaces_need_one_method() {
        let mut builder = CatalogBuilder::new();
        builder.add(TypeDef::interface("F").functional("apply"));
        assert!(matches!(
            builder.build(),
            Err(RegistrationError::InvalidFunctionalInterface { .. })
        ));

        let mut builder = CatalogBuilder::new();
        builder.add(
            TypeDef::interface("F")
                .method("apply", &["def"], "def")
                .functional("apply"),
        );
        let catalog = builder.build().unwrap();
        let entry = catalog.resolve_type("F").unwrap();
        assert_eq!(entry.functional().map(|m| m.name.as_str()), Some("apply"));
    }

    #[test]
    fn throwable_propagates_to_subtypes() {
        let mut builder = CatalogBuilder::new();
        builder
            .add(TypeDef::class("Throwable").throwable())
            .add(TypeDef::class("Exception").extends("Throwable"))
            .add(TypeDef::class("Other"));
        let catalog = builder.build().unwrap();
        assert!(catalog.resolve_type("Exception").unwrap().throwable);
        assert!(!catalog.resolve_type("Other").unwrap().throwable);
    }

    #[test]
    fn imports_alias_static_methods() {
        let mut builder = CatalogBuilder::new();
        builder
            .add(
                TypeDef::class("Math")
                    .static_method("max", &["int", "int"], "int")
                    .static_method("max", &["double", "double"], "double"),
            )
            .import("max", "Math", "max");
        let catalog = builder.build().unwrap();
        assert_eq!(catalog.lookup_imports("max", 2).len(), 2);
        assert!(catalog.lookup_imports("max", 1).is_empty());
    }
}
