//! Sable Compiler
//!
//! Compiles one syntax tree into a [`CompiledUnit`] of stack-machine
//! bytecode, bound against a [`TypeCatalog`].
//!
//! ## Pipeline
//!
//! 1. [`builder`]: syntax tree to semantic tree ([`ast`])
//! 2. [`resolve`]: static types, bound members, explicit casts ([`typed`])
//! 3. [`lower`]: storage operations and loop instrumentation made explicit ([`ir`])
//! 4. [`codegen`]: bytecode, written through the [`emit`] assembler
//!
//! ## Modules
//!
//! - [`bytecode`]: instruction set, chunks and the constant pool
//! - [`dispatch`]: the call-site contract with the dynamic runtime
//! - [`interface`]: the host contract a script's main function implements

pub mod ast;
pub mod builder;
pub mod bytecode;
pub mod codegen;
pub mod dispatch;
pub mod emit;
pub mod interface;
pub mod ir;
pub mod lower;
pub mod resolve;
pub mod typed;

pub use builder::AstBuilder;
pub use bytecode::{BytecodeChunk, Constant, ConstantPool, OpCode};
pub use dispatch::{CallSite, DispatchKind, Recipe};
pub use interface::{InterfaceValue, ScriptInterface};
pub use resolve::CLINIT;
pub use typed::ConstantField;

// Re-export the error types from core for convenience
pub use sable_core::{CompilationError, CompilerSettings, Error, InternalError};

use bitflags::bitflags;
use sable_catalog::TypeCatalog;
use sable_core::DataType;
use sable_syntax::SyntaxNode;

bitflags! {
    /// Traits of a compiled function.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FunctionFlags: u8 {
        /// No receiver in slot 0. Everything but the main function.
        const STATIC = 1 << 0;
        /// Generated by the compiler: lifted lambdas and `<clinit>`.
        const SYNTHETIC = 1 << 1;
        /// The last parameter collects trailing arguments.
        const VARIADIC = 1 << 2;
    }
}

/// A compiled function.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub name: String,
    /// Position in [`CompiledUnit::functions`], the `CallLocal` operand.
    pub index: u16,
    /// Parameter types, captures first for lifted lambdas.
    pub params: Vec<DataType>,
    pub return_type: DataType,
    pub flags: FunctionFlags,
    pub chunk: BytecodeChunk,
    /// Local slots the function needs, receiver and loop counter included.
    pub max_slots: u16,
    /// Iteration budget; zero when no loop is counted.
    pub max_loop_counter: u32,
    pub loop_counter_slot: Option<u16>,
}

impl CompiledFunction {
    pub fn is_static(&self) -> bool {
        self.flags.contains(FunctionFlags::STATIC)
    }
}

/// A compiled script.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledUnit {
    pub name: String,
    /// Name of the implemented [`ScriptInterface`].
    pub interface: String,
    /// Main first, then user functions, lifted lambdas, and `<clinit>`
    /// last when the script has constant fields.
    pub functions: Vec<CompiledFunction>,
    /// Unit-level constant pool shared by every function.
    pub constants: ConstantPool,
    /// Fields set once by `<clinit>`, read with `GetUnitStatic`.
    pub constant_fields: Vec<ConstantField>,
    /// Sorted source offsets at which statements start.
    pub statement_offsets: Vec<u32>,
}

impl CompiledUnit {
    /// The entry point.
    pub fn main(&self) -> Option<&CompiledFunction> {
        self.functions.first()
    }

    pub fn function(&self, name: &str) -> Option<&CompiledFunction> {
        self.functions.iter().find(|function| function.name == name)
    }

    pub fn static_initializer(&self) -> Option<&CompiledFunction> {
        self.function(CLINIT)
    }
}

/// The main compiler entry point.
///
/// Holds the catalog and settings; each [`compile`](Self::compile) call owns
/// all of its intermediate trees.
pub struct Compiler<'c> {
    catalog: &'c dyn TypeCatalog,
    settings: CompilerSettings,
}

impl<'c> Compiler<'c> {
    pub fn new(catalog: &'c dyn TypeCatalog) -> Self {
        Self {
            catalog,
            settings: CompilerSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: CompilerSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &CompilerSettings {
        &self.settings
    }

    /// Compile a script's syntax tree against `interface`.
    ///
    /// Stops at the first error.
    #[tracing::instrument(level = "debug", skip_all, fields(unit = name))]
    pub fn compile(
        &self,
        name: &str,
        tree: &SyntaxNode<'_>,
        interface: &ScriptInterface,
    ) -> Result<CompiledUnit, Error> {
        let source = AstBuilder::new().build(tree)?;
        let unit = resolve::resolve(&source, self.catalog, &self.settings, interface)?;
        let functions = lower::lower(&unit, &self.settings)?;

        let mut constants = ConstantPool::new();
        let (functions, statement_offsets) = codegen::generate(&functions, &mut constants)?;

        tracing::debug!(
            functions = functions.len(),
            constants = constants.len(),
            "compiled unit"
        );

        Ok(CompiledUnit {
            name: name.to_string(),
            interface: interface.name.clone(),
            functions,
            constants,
            constant_fields: unit.constants,
            statement_offsets,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bumpalo::Bump;
    use sable_catalog::Catalog;
    use sable_core::ErrorKind;
    use sable_syntax::ParseOptions;

    fn compile_with(source: &str, interface: &ScriptInterface, settings: CompilerSettings) -> Result<CompiledUnit, Error> {
        let catalog = Catalog::standard().unwrap();
        let arena = Bump::new();
        let is_type = |text: &str| catalog.is_valid_type_name(text);
        let tree = sable_syntax::parse(source, &arena, &is_type, ParseOptions::default())?;
        Compiler::new(&catalog)
            .with_settings(settings)
            .compile("test", tree, interface)
    }

    fn compile(source: &str) -> CompiledUnit {
        compile_with(source, &ScriptInterface::generic(), CompilerSettings::default()).unwrap()
    }

    #[test]
    fn main_comes_first() {
        let unit = compile("int f(int x) { return x + 1; } f(2)");
        assert_eq!(unit.interface, "Script");
        let names: Vec<_> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["execute", "f"]);
        assert!(!unit.main().unwrap().is_static());
        assert!(unit.function("f").unwrap().is_static());
        assert_eq!(unit.function("f").unwrap().params, [DataType::INT]);
    }

    #[test]
    fn regexes_compile_in_the_static_initializer() {
        let unit = compile("'abc' ==~ /a.c/");
        let clinit = unit.static_initializer().expect("a static initializer");
        assert!(clinit.flags.contains(FunctionFlags::SYNTHETIC));
        clinit
            .chunk
            .assert_contains_sequence(&[OpCode::CallStatic, OpCode::SetUnitStatic]);
        assert_eq!(unit.constant_fields.len(), 1);
        unit.main()
            .unwrap()
            .chunk
            .assert_contains_opcodes(&[OpCode::GetUnitStatic]);
    }

    #[test]
    fn scripts_without_regexes_have_no_initializer() {
        assert!(compile("1 + 2").static_initializer().is_none());
    }

    #[test]
    fn lambdas_are_lifted() {
        let unit = compile("Function f = x -> x; 1");
        let lambda = unit.function("lambda$0").expect("a lifted lambda");
        assert!(lambda.flags.contains(FunctionFlags::STATIC | FunctionFlags::SYNTHETIC));
        unit.main().unwrap().chunk.assert_contains_opcodes(&[OpCode::MakeRef]);
    }

    #[test]
    fn user_errors_are_user_facing() {
        let err = compile_with("boolean b = 1;", &ScriptInterface::generic(), CompilerSettings::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Compile);
        assert!(err.is_user_facing());
        assert!(err.span().is_some());
    }

    #[test]
    fn interface_parameters_lead_the_slots() {
        let interface = ScriptInterface::new("Scorer", DataType::DOUBLE).param("score", DataType::DOUBLE);
        let unit = compile_with("score * 2", &interface, CompilerSettings::default()).unwrap();
        let main = unit.main().unwrap();
        assert_eq!(main.params, [DataType::DOUBLE]);
        let code = main.chunk.instructions();
        assert_eq!((code[0].op, code[0].operand), (OpCode::GetLocal, Some(1)));
    }

    #[test]
    fn statement_offsets_follow_the_source() {
        let unit = compile("int a = 1;\nint b = a + 1;\nb");
        assert!(unit.statement_offsets.len() >= 3);
        assert!(unit.statement_offsets.windows(2).all(|w| w[0] < w[1]));
    }
}
