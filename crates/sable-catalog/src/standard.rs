//! A small standard library: the types scripts see by default.
//!
//! Generic containers are erased: element types are `def`.

use sable_core::RegistrationError;

use crate::builder::{CatalogBuilder, TypeDef};
use crate::catalog::Catalog;

impl CatalogBuilder {
    /// A builder pre-filled with the standard library; hosts add their own
    /// types before building.
    pub fn standard() -> Self {
        let mut builder = CatalogBuilder::new();
        lang(&mut builder);
        boxes(&mut builder);
        collections(&mut builder);
        functions(&mut builder);
        exceptions(&mut builder);
        regex(&mut builder);
        builder
    }
}

impl Catalog {
    /// The standard library alone.
    pub fn standard() -> Result<Self, RegistrationError> {
        CatalogBuilder::standard().build()
    }
}

fn lang(b: &mut CatalogBuilder) {
    b.add(
        TypeDef::class("Object")
            .constructor(&[])
            .method("equals", &["Object"], "boolean")
            .method("hashCode", &[], "int")
            .method("toString", &[], "String"),
    )
    .add(
        TypeDef::interface("CharSequence")
            .method("length", &[], "int")
            .method("charAt", &["int"], "char"),
    )
    .add(TypeDef::interface("Comparable").method("compareTo", &["def"], "int"))
    .add(
        TypeDef::class("String")
            .implements("CharSequence")
            .implements("Comparable")
            .constructor(&[])
            .method("length", &[], "int")
            .method("charAt", &["int"], "char")
            .method("isEmpty", &[], "boolean")
            .method("substring", &["int"], "String")
            .method("substring", &["int", "int"], "String")
            .method("indexOf", &["String"], "int")
            .method("indexOf", &["String", "int"], "int")
            .method("contains", &["CharSequence"], "boolean")
            .method("startsWith", &["String"], "boolean")
            .method("endsWith", &["String"], "boolean")
            .method("toUpperCase", &[], "String")
            .method("toLowerCase", &[], "String")
            .method("trim", &[], "String")
            .method("replace", &["CharSequence", "CharSequence"], "String")
            .method("split", &["String"], "String[]")
            .method("compareTo", &["String"], "int")
            .static_method("valueOf", &["def"], "String")
            .static_method("join", &["CharSequence", "Iterable"], "String"),
    )
    .add(
        TypeDef::class("StringBuilder")
            .implements("CharSequence")
            .constructor(&[])
            .constructor(&["String"])
            .method("append", &["def"], "StringBuilder")
            .method("length", &[], "int")
            .method("charAt", &["int"], "char")
            .method("reverse", &[], "StringBuilder"),
    )
    .add(
        TypeDef::class("Math")
            .constant("PI", "double")
            .constant("E", "double")
            .static_method("abs", &["int"], "int")
            .static_method("abs", &["long"], "long")
            .static_method("abs", &["double"], "double")
            .static_method("max", &["int", "int"], "int")
            .static_method("max", &["long", "long"], "long")
            .static_method("max", &["double", "double"], "double")
            .static_method("min", &["int", "int"], "int")
            .static_method("min", &["long", "long"], "long")
            .static_method("min", &["double", "double"], "double")
            .static_method("sqrt", &["double"], "double")
            .static_method("pow", &["double", "double"], "double")
            .static_method("floor", &["double"], "double")
            .static_method("ceil", &["double"], "double")
            .static_method("round", &["double"], "long"),
    )
    .import("max", "Math", "max")
    .import("min", "Math", "min");
}

fn boxes(b: &mut CatalogBuilder) {
    b.add(
        TypeDef::class("Number")
            .method("intValue", &[], "int")
            .method("longValue", &[], "long")
            .method("doubleValue", &[], "double"),
    )
    .add(
        TypeDef::class("Boolean")
            .implements("Comparable")
            .method("booleanValue", &[], "boolean")
            .static_method("valueOf", &["boolean"], "Boolean")
            .static_method("parseBoolean", &["String"], "boolean"),
    )
    .add(
        TypeDef::class("Character")
            .implements("Comparable")
            .method("charValue", &[], "char")
            .static_method("isDigit", &["char"], "boolean")
            .static_method("isLetter", &["char"], "boolean")
            .static_method("valueOf", &["char"], "Character"),
    )
    .add(
        TypeDef::class("Byte")
            .extends("Number")
            .implements("Comparable")
            .constant("MAX_VALUE", "byte")
            .constant("MIN_VALUE", "byte"),
    )
    .add(
        TypeDef::class("Short")
            .extends("Number")
            .implements("Comparable")
            .constant("MAX_VALUE", "short")
            .constant("MIN_VALUE", "short"),
    )
    .add(
        TypeDef::class("Integer")
            .extends("Number")
            .implements("Comparable")
            .constant("MAX_VALUE", "int")
            .constant("MIN_VALUE", "int")
            .static_method("parseInt", &["String"], "int")
            .static_method("valueOf", &["int"], "Integer")
            .static_method("toString", &["int"], "String")
            .static_method("compare", &["int", "int"], "int"),
    )
    .add(
        TypeDef::class("Long")
            .extends("Number")
            .implements("Comparable")
            .constant("MAX_VALUE", "long")
            .constant("MIN_VALUE", "long")
            .static_method("parseLong", &["String"], "long")
            .static_method("valueOf", &["long"], "Long"),
    )
    .add(
        TypeDef::class("Float")
            .extends("Number")
            .implements("Comparable")
            .static_method("parseFloat", &["String"], "float"),
    )
    .add(
        TypeDef::class("Double")
            .extends("Number")
            .implements("Comparable")
            .constant("MAX_VALUE", "double")
            .static_method("parseDouble", &["String"], "double")
            .static_method("valueOf", &["double"], "Double")
            .static_method("isNaN", &["double"], "boolean"),
    );
}

fn collections(b: &mut CatalogBuilder) {
    b.add(
        TypeDef::interface("Iterator")
            .method("hasNext", &[], "boolean")
            .method("next", &[], "def")
            .method("remove", &[], "void"),
    )
    .add(
        TypeDef::interface("Iterable")
            .method("iterator", &[], "Iterator")
            .method("forEach", &["Consumer"], "void"),
    )
    .add(
        TypeDef::interface("Collection")
            .implements("Iterable")
            .method("size", &[], "int")
            .method("isEmpty", &[], "boolean")
            .method("add", &["def"], "boolean")
            .method("addAll", &["Collection"], "boolean")
            .method("contains", &["def"], "boolean")
            .method("remove", &["def"], "boolean")
            .method("clear", &[], "void")
            .method("removeIf", &["Predicate"], "boolean"),
    )
    .add(
        TypeDef::interface("List")
            .implements("Collection")
            .method("get", &["int"], "def")
            .method("set", &["int", "def"], "def")
            .method("add", &["int", "def"], "void")
            .method("remove", &["int"], "def")
            .method("indexOf", &["def"], "int")
            .method("sort", &["Comparator"], "void")
            .method("subList", &["int", "int"], "List"),
    )
    .add(
        TypeDef::class("ArrayList")
            .implements("List")
            .constructor(&[])
            .constructor(&["int"])
            .constructor(&["Collection"]),
    )
    .add(TypeDef::interface("Set").implements("Collection"))
    .add(
        TypeDef::class("HashSet")
            .implements("Set")
            .constructor(&[])
            .constructor(&["Collection"]),
    )
    .add(
        TypeDef::interface("Map")
            .method("get", &["def"], "def")
            .method("put", &["def", "def"], "def")
            .method("getOrDefault", &["def", "def"], "def")
            .method("containsKey", &["def"], "boolean")
            .method("remove", &["def"], "def")
            .method("size", &[], "int")
            .method("isEmpty", &[], "boolean")
            .method("keySet", &[], "Set")
            .method("values", &[], "Collection")
            .method("forEach", &["BiConsumer"], "void"),
    )
    .add(
        TypeDef::class("HashMap")
            .implements("Map")
            .constructor(&[])
            .constructor(&["Map"]),
    );
}

fn functions(b: &mut CatalogBuilder) {
    b.add(
        TypeDef::interface("Function")
            .method("apply", &["def"], "def")
            .functional("apply"),
    )
    .add(
        TypeDef::interface("BiFunction")
            .method("apply", &["def", "def"], "def")
            .functional("apply"),
    )
    .add(
        TypeDef::interface("Predicate")
            .method("test", &["def"], "boolean")
            .functional("test"),
    )
    .add(
        TypeDef::interface("Supplier")
            .method("get", &[], "def")
            .functional("get"),
    )
    .add(
        TypeDef::interface("Consumer")
            .method("accept", &["def"], "void")
            .functional("accept"),
    )
    .add(
        TypeDef::interface("BiConsumer")
            .method("accept", &["def", "def"], "void")
            .functional("accept"),
    )
    .add(
        TypeDef::interface("Comparator")
            .method("compare", &["def", "def"], "int")
            .functional("compare"),
    )
    .add(
        TypeDef::interface("IntBinaryOperator")
            .method("applyAsInt", &["int", "int"], "int")
            .functional("applyAsInt"),
    );
}

fn exceptions(b: &mut CatalogBuilder) {
    b.add(
        TypeDef::class("Throwable")
            .throwable()
            .constructor(&[])
            .constructor(&["String"])
            .method("getMessage", &[], "String"),
    )
    .add(
        TypeDef::class("Exception")
            .extends("Throwable")
            .constructor(&[])
            .constructor(&["String"]),
    );
    for (name, parent) in [
        ("RuntimeException", "Exception"),
        ("IllegalArgumentException", "RuntimeException"),
        ("IllegalStateException", "RuntimeException"),
        ("ArithmeticException", "RuntimeException"),
        ("NullPointerException", "RuntimeException"),
        ("IndexOutOfBoundsException", "RuntimeException"),
        ("ClassCastException", "RuntimeException"),
        ("UnsupportedOperationException", "RuntimeException"),
    ] {
        b.add(
            TypeDef::class(name)
                .extends(parent)
                .constructor(&[])
                .constructor(&["String"]),
        );
    }
}

fn regex(b: &mut CatalogBuilder) {
    b.add(
        TypeDef::class("Pattern")
            .static_method("compile", &["String", "int"], "Pattern")
            .method("matcher", &["CharSequence"], "Matcher")
            .method("pattern", &[], "String"),
    )
    .add(
        TypeDef::class("Matcher")
            .method("find", &[], "boolean")
            .method("matches", &[], "boolean")
            .method("group", &[], "String")
            .method("group", &["int"], "String"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeCatalog;
    use sable_core::{DataType, known};

    #[test]
    fn standard_library_builds() {
        let catalog = Catalog::standard().unwrap();
        for name in ["String", "ArrayList", "HashMap", "Predicate", "Pattern", "Exception"] {
            assert!(catalog.is_valid_type_name(name), "{name}");
        }
    }

    #[test]
    fn collection_shortcuts_are_available() {
        let catalog = Catalog::standard().unwrap();
        assert!(
            catalog
                .resolve_method(known::ARRAY_LIST, "get", &[DataType::INT])
                .is_some()
        );
        assert!(
            catalog
                .resolve_method(known::HASH_MAP, "put", &[DataType::DEF, DataType::DEF])
                .is_some()
        );
        assert!(catalog.is_subtype(known::ARRAY_LIST, known::ITERABLE));
    }

    #[test]
    fn exceptions_are_throwable() {
        let catalog = Catalog::standard().unwrap();
        assert!(catalog.resolve_type("IllegalArgumentException").unwrap().throwable);
        assert!(!catalog.resolve_type("String").unwrap().throwable);
    }

    #[test]
    fn boxes_unbox_to_primitives() {
        let catalog = Catalog::standard().unwrap();
        let integer = catalog.resolve_type("Integer").unwrap();
        assert_eq!(integer.hash, known::INTEGER);
        assert!(catalog.is_subtype(known::INTEGER, known::NUMBER));
    }
}
