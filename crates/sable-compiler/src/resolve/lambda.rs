//! Lambdas and function references.
//!
//! A lambda body is lifted into a synthetic static function `lambda$N`
//! whose leading parameters are the captured variables. The value left at
//! the lambda's position is a reference to that function, bound either
//! statically to the target interface or, when the interface is only known
//! at run time, through a call site.

use sable_catalog::MethodEntry;
use sable_core::{CompilationError, DataType, Span};

use super::overload::{self, Choice};
use super::scope::CapturedVar;
use super::{FunctionContext, FunctionKind, Resolved, Resolver, internal, invalid};
use crate::FunctionFlags;
use crate::ast::{self, LambdaBody, LambdaParam, RefOwner};
use crate::dispatch::{CallSite, CallSiteFlags, Capture, DefRef, DispatchKind, FunctionRef, Recipe, RefTarget};
use crate::typed::{Expr, ExprKind, Local, Place, Stmt, TypedFunction};

/// A lambda after lifting.
struct Lifted {
    index: u16,
    name: String,
    captures: Vec<CapturedVar>,
}

impl Resolver<'_> {
    /// A lambda or function reference implementing the functional
    /// interface `target`.
    pub(super) fn function_value(&mut self, node: &ast::Expr, target: DataType) -> Resolved<Expr> {
        let span = node.span;
        let catalog = self.catalog;
        let method = overload::functional_method(catalog, target);
        match &node.kind {
            ast::ExprKind::Lambda { params, body } => {
                let Some(method) = method else {
                    return Err(lambda_error(
                        format!("'{}' is not a functional interface", self.type_name(target)),
                        span,
                    ));
                };
                if params.len() != method.arity() {
                    return Err(lambda_error(
                        format!(
                            "'{}' takes {} parameters, the lambda declares {}",
                            self.type_name(target),
                            method.arity(),
                            params.len()
                        ),
                        span,
                    ));
                }
                let lifted = self.lift(params, body, Some(method), span)?;
                self.bind_lambda(lifted, target, method, span)
            }
            ast::ExprKind::FuncRef { owner, name } => {
                let Some(method) = method else {
                    return Err(reference_error(
                        format!("'{}' is not a functional interface", self.type_name(target)),
                        span,
                    ));
                };
                self.function_ref(owner, name, target, method, span)
            }
            _ => Err(internal("not a function value", span)),
        }
    }

    /// A reference passed to a call site: the runtime picks the interface.
    /// Returns the reference and the types of its captured values.
    pub(super) fn def_reference(&mut self, node: &ast::Expr) -> Resolved<(Expr, Vec<DataType>)> {
        let span = node.span;
        let (reference, captures) = match &node.kind {
            ast::ExprKind::Lambda { params, body } => {
                let lifted = self.lift(params, body, None, span)?;
                let captures = lifted
                    .captures
                    .iter()
                    .map(|capture| captured_value(capture, span))
                    .collect::<Vec<_>>();
                let reference = DefRef {
                    owner: "this".to_string(),
                    name: lifted.name,
                    captures: lifted
                        .captures
                        .iter()
                        .map(|capture| Capture {
                            name: capture.inner.name.clone(),
                            ty: capture.inner.ty,
                        })
                        .collect(),
                };
                (reference, captures)
            }
            ast::ExprKind::FuncRef { owner, name } => {
                let owner = match owner {
                    RefOwner::This => {
                        if !self.signatures.iter().any(|s| &s.name == name) {
                            return Err(reference_error(format!("unknown function 'this::{name}'"), span));
                        }
                        "this".to_string()
                    }
                    RefOwner::Type(type_name) => {
                        let ty = self.data_type(type_name)?;
                        if !self.has_member(ty, name) {
                            return Err(reference_error(
                                format!("unknown reference '{}::{name}'", type_name.display()),
                                span,
                            ));
                        }
                        type_name.display()
                    }
                };
                let reference = DefRef {
                    owner,
                    name: name.clone(),
                    captures: Vec::new(),
                };
                (reference, Vec::new())
            }
            _ => return Err(internal("not a function value", span)),
        };
        let types = captures.iter().map(|capture| capture.ty).collect();
        Ok((
            Expr::new(ExprKind::DefRef { reference, captures }, DataType::DEF, span),
            types,
        ))
    }

    /// Whether `Type::name` could name something at run time.
    fn has_member(&self, ty: DataType, name: &str) -> bool {
        if ty.is_array() {
            return name == "new";
        }
        let Some(entry) = self.catalog.get_type(ty.type_hash) else {
            return false;
        };
        if name == "new" {
            return !entry.constructors.is_empty();
        }
        entry
            .ancestors
            .iter()
            .filter_map(|&hash| self.catalog.get_type(hash))
            .any(|owner| owner.methods.iter().any(|m| m.name == name))
    }

    // ==========================================================================
    // Lifting
    // ==========================================================================

    /// Resolve a lambda body as its own function. With no `method`
    /// (a dynamic target), parameters and result are `def`.
    fn lift(
        &mut self,
        params: &[LambdaParam],
        body: &LambdaBody,
        method: Option<&MethodEntry>,
        span: Span,
    ) -> Resolved<Lifted> {
        let number = self.lambda_count;
        self.lambda_count = number
            .checked_add(1)
            .ok_or_else(|| invalid("too many lambdas in one script", span))?;
        let index = self.index(1 + self.signatures.len() + usize::from(number), span)?;
        let name = format!("lambda${number}");
        let return_type = method.map_or(DataType::DEF, |m| m.return_type);

        let mut types = Vec::with_capacity(params.len());
        for (position, param) in params.iter().enumerate() {
            let ty = match &param.ty {
                Some(type_name) => self.value_type(type_name)?,
                None => method
                    .and_then(|m| m.params.get(position).copied())
                    .unwrap_or(DataType::DEF),
            };
            types.push(ty);
        }

        let outer = std::mem::replace(
            &mut self.context,
            FunctionContext {
                name: name.clone(),
                return_type,
                kind: FunctionKind::Lambda,
            },
        );
        self.scopes.enter_lambda();
        let resolved = self.lambda_body(params, &types, body, return_type, &name);
        let (captures, next_var) = self.scopes.exit_frame();
        self.context = outer;
        let (declared, body) = resolved?;

        let mut locals: Vec<Local> = captures
            .iter()
            .map(|capture| Local {
                var: capture.inner.id,
                name: capture.inner.name.clone(),
                ty: capture.inner.ty,
            })
            .collect();
        locals.extend(declared);
        tracing::trace!(lambda = %name, captures = captures.len(), "lifted lambda");
        self.lambdas.push(TypedFunction {
            name: name.clone(),
            index,
            params: locals,
            return_type,
            flags: FunctionFlags::STATIC | FunctionFlags::SYNTHETIC,
            body,
            next_var,
            span,
        });
        Ok(Lifted {
            index,
            name,
            captures,
        })
    }

    fn lambda_body(
        &mut self,
        params: &[LambdaParam],
        types: &[DataType],
        body: &LambdaBody,
        return_type: DataType,
        name: &str,
    ) -> Resolved<(Vec<Local>, Vec<Stmt>)> {
        let mut locals = Vec::with_capacity(params.len());
        for (param, &ty) in params.iter().zip(types) {
            let var = self.scopes.declare(&param.name, ty, false, param.span)?;
            locals.push(Local {
                var: var.id,
                name: var.name,
                ty,
            });
        }
        let body = match body {
            LambdaBody::Expr(expr) if return_type.is_void() => {
                let value = self.expr(expr)?;
                vec![Stmt::Expr(value), Stmt::Return(None)]
            }
            LambdaBody::Expr(expr) => vec![Stmt::Return(Some(self.expr_to(expr, return_type)?))],
            LambdaBody::Block(block) => self.function_body(block, return_type, name)?,
        };
        Ok((locals, body))
    }

    /// The value of a lifted lambda at its definition site.
    fn bind_lambda(&mut self, lifted: Lifted, target: DataType, method: &MethodEntry, span: Span) -> Resolved<Expr> {
        let captures: Vec<Expr> = lifted
            .captures
            .iter()
            .map(|capture| captured_value(capture, span))
            .collect();
        let count = u8::try_from(captures.len()).map_err(|_| invalid("too many captured variables", span))?;

        if captures.iter().any(|capture| capture.ty.is_def()) {
            let reference = DefRef {
                owner: "this".to_string(),
                name: lifted.name,
                captures: Vec::new(),
            };
            let site = CallSite {
                kind: DispatchKind::Reference,
                name: reference.describe(),
                arity: count,
                recipe: Recipe::values(captures.len()),
                flags: CallSiteFlags::empty(),
                arg_types: captures.iter().map(|capture| capture.ty).collect(),
                return_type: target,
            };
            return Ok(Expr::new(ExprKind::Dynamic { site, args: captures }, target, span));
        }

        let reference = FunctionRef {
            interface: target.type_hash,
            interface_method: method.hash,
            target: RefTarget::Local {
                index: lifted.index,
                name: lifted.name,
            },
            captures: count,
        };
        Ok(Expr::new(
            ExprKind::FunctionRef { reference, captures },
            target,
            span,
        ))
    }

    // ==========================================================================
    // References
    // ==========================================================================

    /// `this::f`, `Type::method`, `Type::new` and `Type[]::new` against a
    /// known interface.
    fn function_ref(
        &mut self,
        owner: &RefOwner,
        name: &str,
        target: DataType,
        method: &MethodEntry,
        span: Span,
    ) -> Resolved<Expr> {
        let arity = method.arity();
        let reference = match owner {
            RefOwner::This => {
                let Some(&position) = self.by_arity.get(&(name.to_string(), arity)) else {
                    return Err(reference_error(
                        format!("no function 'this::{name}' takes {arity} parameters"),
                        span,
                    ));
                };
                let signature = &self.signatures[position];
                RefTarget::Local {
                    index: signature.index,
                    name: signature.name.clone(),
                }
            }
            RefOwner::Type(type_name) => {
                let ty = self.data_type(type_name)?;
                let display = type_name.display();
                if name == "new" {
                    self.constructor_ref(ty, &display, method, span)?
                } else {
                    self.method_ref(ty, &display, name, method, span)?
                }
            }
        };
        let reference = FunctionRef {
            interface: target.type_hash,
            interface_method: method.hash,
            target: reference,
            captures: 0,
        };
        Ok(Expr::new(
            ExprKind::FunctionRef {
                reference,
                captures: Vec::new(),
            },
            target,
            span,
        ))
    }

    fn constructor_ref(&self, ty: DataType, display: &str, method: &MethodEntry, span: Span) -> Resolved<RefTarget> {
        if ty.is_array() {
            if method.arity() != 1 {
                return Err(reference_error(
                    format!("'{display}::new' takes one parameter"),
                    span,
                ));
            }
            return Ok(RefTarget::ArrayConstructor { ty });
        }
        let ctors = self.catalog.lookup_constructors(ty.type_hash, method.arity());
        let candidates: Vec<&[DataType]> = ctors.iter().map(|c| c.params.as_slice()).collect();
        let chosen = self.choose_reference(&candidates, &method.params, display, span)?;
        Ok(RefTarget::Constructor {
            hash: ctors[chosen].hash,
        })
    }

    /// Static methods take every interface parameter; instance methods take
    /// the first as their receiver.
    fn method_ref(
        &self,
        ty: DataType,
        display: &str,
        name: &str,
        method: &MethodEntry,
        span: Span,
    ) -> Resolved<RefTarget> {
        let catalog = self.catalog;
        let statics: Vec<&MethodEntry> = catalog
            .lookup_methods(ty.type_hash, name, method.arity())
            .into_iter()
            .filter(|m| m.is_static)
            .collect();
        if !statics.is_empty() {
            let candidates: Vec<&[DataType]> = statics.iter().map(|m| m.params.as_slice()).collect();
            let chosen = self.choose_reference(&candidates, &method.params, name, span)?;
            return Ok(RefTarget::Method {
                hash: statics[chosen].hash,
                is_static: true,
            });
        }

        let unknown = || {
            reference_error(
                format!("no method '{display}::{name}' fits '{}'", method.name),
                span,
            )
        };
        let receiver_arity = method.arity().checked_sub(1).ok_or_else(unknown)?;
        let instance: Vec<&MethodEntry> = catalog
            .lookup_methods(ty.type_hash, name, receiver_arity)
            .into_iter()
            .filter(|m| !m.is_static)
            .collect();
        if instance.is_empty() {
            return Err(unknown());
        }
        let candidates: Vec<&[DataType]> = instance.iter().map(|m| m.params.as_slice()).collect();
        let chosen = self.choose_reference(&candidates, &method.params[1..], name, span)?;
        Ok(RefTarget::Method {
            hash: instance[chosen].hash,
            is_static: false,
        })
    }

    fn choose_reference(
        &self,
        candidates: &[&[DataType]],
        types: &[DataType],
        name: &str,
        span: Span,
    ) -> Resolved<usize> {
        match overload::choose_types(self.catalog, candidates, types) {
            Choice::Best(index) => Ok(index),
            Choice::Ambiguous(candidates) => Err(CompilationError::AmbiguousOverload {
                name: name.to_string(),
                candidates,
                span,
            }
            .into()),
            Choice::NoMatch => Err(reference_error(
                format!("no overload of '{name}' fits the interface"),
                span,
            )),
        }
    }
}

/// The outer variable a lifted lambda captures, read at its definition.
fn captured_value(capture: &CapturedVar, span: Span) -> Expr {
    Expr::load(
        Place::Local {
            var: capture.outer,
            name: capture.inner.name.clone(),
        },
        capture.inner.ty,
        span,
    )
}

fn lambda_error(message: String, span: Span) -> sable_core::Error {
    CompilationError::InvalidLambda { message, span }.into()
}

fn reference_error(message: String, span: Span) -> sable_core::Error {
    CompilationError::InvalidFunctionRef { message, span }.into()
}
