//! Sable: a sandboxed, gradually typed scripting language.
//!
//! This crate wires the reference front end ([`sable_syntax`]) to the
//! compiler ([`sable_compiler`]) over a shared type catalog
//! ([`sable_catalog`]). Hosts that bring their own parser can drive
//! [`sable_compiler::Compiler`] directly.
//!
//! ```
//! use sable::prelude::*;
//!
//! let compiler = ScriptCompiler::with_standard_library().unwrap();
//! let unit = compiler.compile("hello", "'hello ' + 'world'", &ScriptInterface::generic()).unwrap();
//! assert_eq!(unit.interface, "Script");
//! ```

mod compiler;
mod error;

pub use compiler::ScriptCompiler;
pub use error::ScriptError;

pub use sable_catalog::{Catalog, CatalogBuilder, TypeCatalog, TypeDef};
pub use sable_compiler::{CompiledFunction, CompiledUnit, FunctionFlags, InterfaceValue, ScriptInterface};
pub use sable_core::{CompilerSettings, DataType, Error, ErrorKind, Fault, Span};

// Re-export main types
pub mod prelude {
    pub use crate::{CompiledUnit, CompilerSettings, DataType, ScriptCompiler, ScriptError, ScriptInterface};
    pub use sable_compiler::bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
}
