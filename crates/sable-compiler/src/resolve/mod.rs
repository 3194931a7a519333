//! Type resolution: semantic tree to typed tree.
//!
//! Resolution runs in two passes, like a class compiler. The first collects
//! the signatures of user functions so bodies may call functions defined
//! later. The second resolves the main body, every user function, and the
//! lambdas found along the way, which are lifted into synthetic functions.
//!
//! # Function layout
//!
//! | Index | Function |
//! |---|---|
//! | `0` | main: the top-level statements |
//! | `1..=n` | user functions in source order |
//! | `n+1..` | lifted lambdas `lambda$0`, `lambda$1`, ... |
//! | last | `<clinit>`, when the unit has constant fields |

pub mod cast;
pub mod promote;
pub mod scope;

mod access;
mod assign;
mod expr;
mod lambda;
mod overload;
mod stmt;

use rustc_hash::FxHashMap;
use sable_catalog::{MethodEntry, TypeCatalog};
use sable_core::{
    CompilationError, CompilerSettings, DataType, Error, InternalError, PrimitiveKind, Span, known,
};

use crate::FunctionFlags;
use crate::ast::{self, TypeName};
use crate::interface::ScriptInterface;
use crate::typed::{
    ConstantField, Expr, ExprKind, Invocation, Literal, Local, MethodTarget, Place, Stmt,
    TypedFunction, TypedUnit,
};

use scope::ScopeStack;

type Resolved<T> = Result<T, Error>;

/// Name of the synthetic static initializer.
pub const CLINIT: &str = "<clinit>";

/// Resolve a whole script against `interface`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve(
    source: &ast::Source,
    catalog: &dyn TypeCatalog,
    settings: &CompilerSettings,
    interface: &ScriptInterface,
) -> Resolved<TypedUnit> {
    let mut resolver = Resolver::new(catalog, settings, interface);
    resolver.collect_signatures(&source.functions)?;
    resolver.resolve_unit(source)
}

/// A user function signature, collected before any body is resolved.
#[derive(Debug, Clone)]
struct Signature {
    name: String,
    index: u16,
    params: Vec<(String, DataType)>,
    return_type: DataType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Main,
    User,
    Lambda,
}

/// The function whose body is being resolved.
#[derive(Debug, Clone)]
struct FunctionContext {
    name: String,
    return_type: DataType,
    kind: FunctionKind,
}

/// A regex literal awaiting compilation in the static initializer.
#[derive(Debug, Clone)]
struct PatternConstant {
    pattern: String,
    flags: i32,
    span: Span,
}

/// Resolution state for one unit. Owned by one compilation.
pub struct Resolver<'r> {
    catalog: &'r dyn TypeCatalog,
    settings: &'r CompilerSettings,
    interface: &'r ScriptInterface,
    signatures: Vec<Signature>,
    by_arity: FxHashMap<(String, usize), usize>,
    lambdas: Vec<TypedFunction>,
    lambda_count: u16,
    patterns: Vec<PatternConstant>,
    constants: Vec<ConstantField>,
    scopes: ScopeStack,
    context: FunctionContext,
}

impl<'r> Resolver<'r> {
    pub fn new(
        catalog: &'r dyn TypeCatalog,
        settings: &'r CompilerSettings,
        interface: &'r ScriptInterface,
    ) -> Self {
        Self {
            catalog,
            settings,
            interface,
            signatures: Vec::new(),
            by_arity: FxHashMap::default(),
            lambdas: Vec::new(),
            lambda_count: 0,
            patterns: Vec::new(),
            constants: Vec::new(),
            scopes: ScopeStack::new(),
            context: FunctionContext {
                name: interface.method.clone(),
                return_type: interface.return_type,
                kind: FunctionKind::Main,
            },
        }
    }

    // ==========================================================================
    // Pass 1: Signatures
    // ==========================================================================

    fn collect_signatures(&mut self, functions: &[ast::Function]) -> Resolved<()> {
        for function in functions {
            let key = (function.name.clone(), function.params.len());
            if self.by_arity.contains_key(&key) {
                return Err(CompilationError::DuplicateFunction {
                    name: function.name.clone(),
                    arity: function.params.len(),
                    span: function.span,
                }
                .into());
            }
            let params = function
                .params
                .iter()
                .map(|param| Ok((param.name.clone(), self.value_type(&param.ty)?)))
                .collect::<Resolved<Vec<_>>>()?;
            let index = self.index(1 + self.signatures.len(), function.span)?;
            self.by_arity.insert(key, self.signatures.len());
            self.signatures.push(Signature {
                name: function.name.clone(),
                index,
                params,
                return_type: self.data_type(&function.return_type)?,
            });
        }
        tracing::trace!(functions = self.signatures.len(), "collected signatures");
        Ok(())
    }

    // ==========================================================================
    // Pass 2: Bodies
    // ==========================================================================

    fn resolve_unit(mut self, source: &ast::Source) -> Resolved<TypedUnit> {
        let mut functions = vec![self.main(source)?];
        for (function, index) in source.functions.iter().zip(0..) {
            functions.push(self.user_function(function, index)?);
        }

        let mut lambdas = std::mem::take(&mut self.lambdas);
        lambdas.sort_by_key(|lambda| lambda.index);
        functions.extend(lambdas);

        if !self.patterns.is_empty() {
            let index = self.index(functions.len(), source.span)?;
            functions.push(self.static_initializer(index, source.span)?);
        }

        tracing::debug!(
            functions = functions.len(),
            constants = self.constants.len(),
            "resolved unit"
        );
        Ok(TypedUnit {
            functions,
            constants: self.constants,
        })
    }

    fn main(&mut self, source: &ast::Source) -> Resolved<TypedFunction> {
        let return_type = self.interface.return_type;
        self.context = FunctionContext {
            name: self.interface.method.clone(),
            return_type,
            kind: FunctionKind::Main,
        };
        self.scopes.enter_function();
        let mut params = Vec::with_capacity(self.interface.params.len());
        for param in &self.interface.params {
            let var = self.scopes.declare(&param.name, param.ty, false, source.span)?;
            params.push(Local {
                var: var.id,
                name: var.name,
                ty: var.ty,
            });
        }
        let body = self.main_body(&source.statements, source.span)?;
        let (_, next_var) = self.scopes.exit_frame();

        let mut flags = FunctionFlags::empty();
        if self.interface.variadic {
            flags |= FunctionFlags::VARIADIC;
        }
        Ok(TypedFunction {
            name: self.interface.method.clone(),
            index: 0,
            params,
            return_type,
            flags,
            body,
            next_var,
            span: source.span,
        })
    }

    fn user_function(&mut self, function: &ast::Function, position: usize) -> Resolved<TypedFunction> {
        let signature = self
            .signatures
            .get(position)
            .cloned()
            .ok_or_else(|| InternalError::new("function without signature").at(function.span))?;
        self.context = FunctionContext {
            name: signature.name.clone(),
            return_type: signature.return_type,
            kind: FunctionKind::User,
        };
        self.scopes.enter_function();
        let mut params = Vec::with_capacity(signature.params.len());
        for ((name, ty), param) in signature.params.iter().zip(&function.params) {
            let var = self.scopes.declare(name, *ty, false, param.span)?;
            params.push(Local {
                var: var.id,
                name: var.name,
                ty: var.ty,
            });
        }
        let body = self.function_body(&function.body, signature.return_type, &signature.name)?;
        let (_, next_var) = self.scopes.exit_frame();
        tracing::trace!(function = %signature.name, "resolved function");
        Ok(TypedFunction {
            name: signature.name,
            index: signature.index,
            params,
            return_type: signature.return_type,
            flags: FunctionFlags::STATIC,
            body,
            next_var,
            span: function.span,
        })
    }

    /// `<clinit>`: compiles every regex literal once into its constant field.
    fn static_initializer(&mut self, index: u16, span: Span) -> Resolved<TypedFunction> {
        let compile = self.method(known::PATTERN, "compile", 1 + 1, span)?;
        let mut body = Vec::with_capacity(self.patterns.len() + 1);
        for (slot, pattern) in self.patterns.iter().enumerate() {
            let span = pattern.span;
            let call = Expr::new(
                ExprKind::Call {
                    receiver: None,
                    target: compile.clone(),
                    args: vec![
                        Expr::constant(Literal::String(pattern.pattern.clone()), DataType::STRING, span),
                        Expr::constant(Literal::Int(pattern.flags), DataType::INT, span),
                    ],
                },
                DataType::simple(known::PATTERN),
                span,
            );
            let place = Place::UnitStatic {
                index: self.index(slot, span)?,
            };
            body.push(Stmt::Expr(Expr::new(
                ExprKind::Assign {
                    place: Box::new(place),
                    value: Box::new(call),
                },
                DataType::simple(known::PATTERN),
                span,
            )));
        }
        body.push(Stmt::Return(None));
        Ok(TypedFunction {
            name: CLINIT.to_string(),
            index,
            params: Vec::new(),
            return_type: DataType::VOID,
            flags: FunctionFlags::STATIC | FunctionFlags::SYNTHETIC,
            body,
            next_var: 0,
            span,
        })
    }

    // ==========================================================================
    // Shared Helpers
    // ==========================================================================

    fn index(&self, value: usize, span: Span) -> Resolved<u16> {
        u16::try_from(value).map_err(|_| {
            CompilationError::InvalidOperation {
                message: "too many functions or constants in one script".to_string(),
                span,
            }
            .into()
        })
    }

    /// A type as written.
    fn data_type(&self, name: &TypeName) -> Resolved<DataType> {
        self.catalog.parse_type(&name.display()).ok_or_else(|| {
            CompilationError::UnknownType {
                name: name.display(),
                span: name.span,
            }
            .into()
        })
    }

    /// A type for a variable or parameter: anything but `void`.
    fn value_type(&self, name: &TypeName) -> Resolved<DataType> {
        let ty = self.data_type(name)?;
        if ty.is_void() {
            return Err(invalid("variables cannot be declared 'void'", name.span));
        }
        Ok(ty)
    }

    fn type_name(&self, ty: DataType) -> String {
        self.catalog.type_name(ty)
    }

    /// The first method of `owner` with this name and arity.
    fn method(&self, owner: sable_core::TypeHash, name: &str, arity: usize, span: Span) -> Resolved<MethodTarget> {
        self.catalog
            .lookup_methods(owner, name, arity)
            .first()
            .map(|entry| target(entry))
            .ok_or_else(|| {
                CompilationError::UnknownMethod {
                    method: name.to_string(),
                    type_name: self.type_name(DataType::simple(owner)),
                    arity,
                    span,
                }
                .into()
            })
    }

    fn in_main(&self) -> bool {
        self.context.kind == FunctionKind::Main && !self.scopes.in_lambda()
    }

    /// Box a primitive receiver so members can be looked up on it.
    fn boxed_receiver(&self, receiver: Expr) -> Resolved<Expr> {
        match receiver.ty.primitive() {
            Some(kind) => Ok(cast::coerce(self.catalog, receiver, DataType::simple(kind.boxed()))?),
            None if receiver.ty.is_void() => Err(invalid("'void' has no members", receiver.span)),
            None => Ok(receiver),
        }
    }
}

/// A bound call target for a catalog method.
fn target(entry: &MethodEntry) -> MethodTarget {
    let invocation = if entry.is_static {
        Invocation::Static
    } else if entry.on_interface {
        Invocation::Interface
    } else {
        Invocation::Virtual
    };
    MethodTarget {
        hash: entry.hash,
        owner: entry.owner,
        name: entry.name.clone(),
        params: entry.params.clone(),
        return_type: entry.return_type,
        invocation,
    }
}

/// The value a variable or result of type `ty` holds when never set.
pub fn default_value(ty: DataType, span: Span) -> Expr {
    let literal = match ty.primitive() {
        Some(PrimitiveKind::Boolean) => Literal::Bool(false),
        Some(PrimitiveKind::Long) => Literal::Long(0),
        Some(PrimitiveKind::Float) => Literal::Float(0.0),
        Some(PrimitiveKind::Double) => Literal::Double(0.0),
        Some(_) => Literal::Int(0),
        None => Literal::Null,
    };
    Expr::constant(literal, ty, span)
}

fn invalid(message: impl Into<String>, span: Span) -> Error {
    CompilationError::InvalidOperation {
        message: message.into(),
        span,
    }
    .into()
}

fn mismatch(message: impl Into<String>, span: Span) -> Error {
    CompilationError::TypeMismatch {
        message: message.into(),
        span,
    }
    .into()
}

fn internal(message: &str, span: Span) -> Error {
    InternalError::new(message).at(span).into()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use bumpalo::Bump;
    use sable_catalog::Catalog;
    use sable_syntax::ParseOptions;

    use crate::builder::AstBuilder;

    pub(crate) fn resolve_with(
        source: &str,
        interface: &ScriptInterface,
        settings: &CompilerSettings,
    ) -> Resolved<TypedUnit> {
        let catalog = Catalog::standard().unwrap();
        let arena = Bump::new();
        let is_type = |text: &str| catalog.is_valid_type_name(text);
        let tree = sable_syntax::parse(source, &arena, &is_type, ParseOptions::default())?;
        let ast = AstBuilder::new().build(tree)?;
        resolve(&ast, &catalog, settings, interface)
    }

    pub(crate) fn resolve_source(source: &str) -> Resolved<TypedUnit> {
        resolve_with(source, &ScriptInterface::generic(), &CompilerSettings::default())
    }

    pub(crate) fn compile_error(source: &str) -> CompilationError {
        match resolve_source(source) {
            Err(Error::Compilation(err)) => err,
            other => panic!("expected a compilation error, got {other:?}"),
        }
    }

    #[test]
    fn functions_are_laid_out_in_order() {
        let unit = resolve_source(
            "int f(int a) { return a; } int g() { return 1; } \
             Function h = x -> x; boolean m = 'abc' ==~ /a.c/; f(1)",
        )
        .unwrap();
        let names: Vec<_> = unit.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["execute", "f", "g", "lambda$0", CLINIT]);
        for (position, function) in unit.functions.iter().enumerate() {
            assert_eq!(usize::from(function.index), position);
        }
        assert!(unit.functions[1].flags.contains(FunctionFlags::STATIC));
        assert!(unit.functions[3].flags.contains(FunctionFlags::SYNTHETIC));
        assert_eq!(unit.constants.len(), 1);
    }

    #[test]
    fn duplicate_functions_are_rejected() {
        let err = compile_error("int f(int a) { return a; } int f(int b) { return b; } f(1)");
        assert!(matches!(err, CompilationError::DuplicateFunction { ref name, arity: 1, .. } if name == "f"));
    }

    #[test]
    fn overloading_by_arity_is_allowed() {
        assert!(resolve_source("int f() { return 0; } int f(int a) { return a; } f(f())").is_ok());
    }

    #[test]
    fn unknown_types_are_reported() {
        let err = compile_error("int f(Unknown x) { return 1; } f(null)");
        assert!(matches!(err, CompilationError::UnknownType { ref name, .. } if name == "Unknown"));
    }

    #[test]
    fn interface_params_and_members() {
        let interface = ScriptInterface::new("Scorer", DataType::DOUBLE)
            .param("score", DataType::DOUBLE)
            .member("weight", DataType::DOUBLE);
        let unit = resolve_with("score * weight", &interface, &CompilerSettings::default()).unwrap();
        let main = &unit.functions[0];
        assert_eq!(main.params.len(), 1);
        assert_eq!(main.return_type, DataType::DOUBLE);
        assert!(main.flags.is_empty());

        let err = resolve_with("weight = 2.0; score", &interface, &CompilerSettings::default()).unwrap_err();
        assert!(matches!(err, Error::Compilation(CompilationError::ReadOnly { ref name, .. }) if name == "weight"));
    }

    #[test]
    fn members_are_invisible_to_user_functions() {
        let interface = ScriptInterface::generic().member("weight", DataType::DOUBLE);
        let err = resolve_with(
            "double f() { return weight; } f()",
            &interface,
            &CompilerSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Compilation(CompilationError::UnknownVariable { .. })));
    }

    #[test]
    fn default_values_by_type() {
        let span = Span::new(1, 1, 1);
        assert_eq!(default_value(DataType::BOOLEAN, span).kind, ExprKind::Constant(Literal::Bool(false)));
        assert_eq!(default_value(DataType::LONG, span).kind, ExprKind::Constant(Literal::Long(0)));
        assert_eq!(default_value(DataType::CHAR, span).kind, ExprKind::Constant(Literal::Int(0)));
        assert!(default_value(DataType::STRING, span).is_null());
    }
}
