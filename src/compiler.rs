//! Source-to-bytecode compilation against a shared catalog.
//!
//! # Example
//!
//! ```
//! use sable::{ScriptCompiler, ScriptInterface};
//!
//! let compiler = ScriptCompiler::with_standard_library().unwrap();
//! let unit = compiler
//!     .compile("double.sable", "int twice(int x) { return x * 2; } twice(21)", &ScriptInterface::generic())
//!     .unwrap();
//! assert_eq!(unit.functions.len(), 2);
//! ```

use std::sync::Arc;

use bumpalo::Bump;
use sable_catalog::{Catalog, TypeCatalog};
use sable_compiler::{CompiledUnit, Compiler, ScriptInterface};
use sable_core::CompilerSettings;
use sable_syntax::ParseOptions;

use crate::error::ScriptError;

/// Compiles scripts against one catalog.
///
/// The catalog is immutable and shared; a `ScriptCompiler` can be cloned
/// onto other threads and used concurrently. Each call to
/// [`compile`](Self::compile) owns its syntax arena and every tree built
/// from it.
#[derive(Clone)]
pub struct ScriptCompiler {
    catalog: Arc<Catalog>,
    settings: CompilerSettings,
}

impl ScriptCompiler {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            settings: CompilerSettings::default(),
        }
    }

    /// A compiler over the standard library subset.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::Catalog`] if the standard catalog fails to
    /// build.
    pub fn with_standard_library() -> Result<Self, ScriptError> {
        Ok(Self::new(Arc::new(Catalog::standard()?)))
    }

    pub fn with_settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Parse and compile `source` as the script `name`.
    #[tracing::instrument(level = "debug", skip(self, source, interface), fields(len = source.len()))]
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile(
        &self,
        name: &str,
        source: &str,
        interface: &ScriptInterface,
    ) -> Result<CompiledUnit, ScriptError> {
        let arena = Bump::new();
        let catalog: &dyn TypeCatalog = self.catalog.as_ref();
        let is_type = |text: &str| catalog.is_valid_type_name(text);
        let options = ParseOptions {
            picky: self.settings.picky,
        };

        let tree = sable_syntax::parse(source, &arena, &is_type, options)
            .map_err(|err| ScriptError::compile(name, err))?;
        tracing::trace!(nodes = tree.node_count(), "parsed");

        Compiler::new(catalog)
            .with_settings(self.settings.clone())
            .compile(name, tree, interface)
            .map_err(|err| ScriptError::compile(name, err))
    }
}
