//! The type catalog: reflective descriptions of the types scripts may use.
//!
//! The compiler only sees the [`TypeCatalog`] trait. [`Catalog`] is the
//! in-memory implementation, built once with [`CatalogBuilder`] and then
//! shared read-only by concurrent compilations.
//!
//! ```
//! use sable_catalog::{Catalog, TypeCatalog};
//!
//! let catalog = Catalog::standard().unwrap();
//! assert!(catalog.is_valid_type_name("ArrayList"));
//! assert!(!catalog.is_valid_type_name("arraylist"));
//! ```

mod builder;
mod catalog;
mod entries;
mod standard;

pub use builder::{CatalogBuilder, TypeDef};
pub use catalog::{Catalog, TypeCatalog};
pub use entries::{ConstructorEntry, FieldEntry, MethodEntry, TypeEntry, TypeKind};
