//! Statements and control flow.
//!
//! Besides typing statements, this pass tracks whether control can fall
//! out of each statement. That drives unreachable-code errors, the
//! missing-return check, and the implicit return of the main body.

use sable_core::{CompilationError, DataType, Span, known};

use super::{FunctionKind, Resolved, Resolver, cast, default_value, invalid, mismatch};
use crate::ast::{self, ForInit, StmtKind};
use crate::dispatch::{CallSite, CallSiteFlags, DispatchKind, Recipe};
use crate::typed::{EachSource, Expr, Local, Stmt, Trap};

/// How control leaves a statement.
#[derive(Debug, Clone, Copy, Default)]
struct Flow {
    /// Control never reaches the next statement.
    escapes: bool,
    /// A `break` targets the enclosing loop.
    breaks: bool,
}

impl Flow {
    const ESCAPES: Flow = Flow {
        escapes: true,
        breaks: false,
    };
}

impl Resolver<'_> {
    /// The top-level statements. A trailing expression statement is the
    /// result; falling off the end returns the default of the result type.
    pub(super) fn main_body(&mut self, statements: &[ast::Stmt], span: Span) -> Resolved<Vec<Stmt>> {
        let return_type = self.context.return_type;
        let (leading, last) = match statements.split_last() {
            Some((last, leading)) if !return_type.is_void() && matches!(last.kind, StmtKind::Expr(_)) => {
                (leading, Some(last))
            }
            _ => (statements, None),
        };

        let mut body = Vec::with_capacity(statements.len() + 1);
        let mut flow = self.sequence(leading, &mut body)?;
        if let Some(last) = last {
            if flow.escapes {
                return Err(CompilationError::UnreachableStatement { span: last.span }.into());
            }
            let StmtKind::Expr(expr) = &last.kind else {
                return Err(super::internal("trailing statement is not an expression", last.span));
            };
            let value = self.expr(expr)?;
            if value.ty.is_void() {
                check_statement(expr)?;
                body.push(Stmt::Expr(value));
            } else {
                body.push(Stmt::Return(Some(cast::coerce(self.catalog, value, return_type)?)));
                flow = Flow::ESCAPES;
            }
        }
        if !flow.escapes {
            let value = (!return_type.is_void()).then(|| default_value(return_type, span));
            body.push(Stmt::Return(value));
        }
        Ok(body)
    }

    /// The body of a user function or block lambda.
    pub(super) fn function_body(
        &mut self,
        block: &ast::Block,
        return_type: DataType,
        name: &str,
    ) -> Resolved<Vec<Stmt>> {
        let mut body = Vec::with_capacity(block.statements.len() + 1);
        let flow = self.sequence(&block.statements, &mut body)?;
        if !flow.escapes {
            if !return_type.is_void() {
                return Err(CompilationError::MissingReturn {
                    function: name.to_string(),
                    span: block.span,
                }
                .into());
            }
            body.push(Stmt::Return(None));
        }
        Ok(body)
    }

    fn sequence(&mut self, statements: &[ast::Stmt], out: &mut Vec<Stmt>) -> Resolved<Flow> {
        let mut flow = Flow::default();
        for stmt in statements {
            if matches!(stmt.kind, StmtKind::Empty) {
                continue;
            }
            if flow.escapes {
                return Err(CompilationError::UnreachableStatement { span: stmt.span }.into());
            }
            let next = self.statement(stmt, out)?;
            flow.escapes = next.escapes;
            flow.breaks |= next.breaks;
        }
        Ok(flow)
    }

    /// A nested block with its own scope.
    fn block(&mut self, block: &ast::Block) -> Resolved<(Vec<Stmt>, Flow)> {
        self.scopes.push_block();
        let mut body = Vec::with_capacity(block.statements.len());
        let flow = self.sequence(&block.statements, &mut body);
        self.scopes.pop_block();
        Ok((body, flow?))
    }

    /// A loop body: `break` and `continue` are legal inside.
    fn loop_body(&mut self, block: &ast::Block) -> Resolved<(Vec<Stmt>, Flow)> {
        self.scopes.enter_loop();
        let body = self.block(block);
        self.scopes.exit_loop();
        body
    }

    fn statement(&mut self, stmt: &ast::Stmt, out: &mut Vec<Stmt>) -> Resolved<Flow> {
        let span = stmt.span;
        match &stmt.kind {
            StmtKind::Empty => Ok(Flow::default()),
            StmtKind::Block(block) => {
                let (body, flow) = self.block(block)?;
                out.push(Stmt::Block(body));
                Ok(flow)
            }
            StmtKind::Expr(expr) => {
                check_statement(expr)?;
                let value = self.expr(expr)?;
                out.push(Stmt::Expr(value));
                Ok(Flow::default())
            }
            StmtKind::Declaration { ty, vars } => {
                self.declaration(ty, vars, out)?;
                Ok(Flow::default())
            }
            StmtKind::If {
                condition,
                then,
                otherwise,
            } => {
                let condition = self.condition(condition)?;
                if let Some(value) = condition.as_bool() {
                    return Err(extraneous("if", value, condition.span));
                }
                let (then, then_flow) = self.block(then)?;
                let (otherwise, else_flow) = self.block(otherwise)?;
                out.push(Stmt::If {
                    condition,
                    then,
                    otherwise,
                });
                Ok(Flow {
                    escapes: then_flow.escapes && else_flow.escapes,
                    breaks: then_flow.breaks || else_flow.breaks,
                })
            }
            StmtKind::While { condition, body } => {
                let condition = self.condition(condition)?;
                let continuous = loop_constant("while", &condition)?;
                let (body, inner) = self.loop_body(body)?;
                out.push(Stmt::While {
                    condition,
                    body,
                    continuous,
                });
                Ok(loop_flow(continuous, inner))
            }
            StmtKind::DoWhile { body, condition } => {
                let (body, inner) = self.loop_body(body)?;
                let condition = self.condition(condition)?;
                let continuous = loop_constant("do-while", &condition)?;
                out.push(Stmt::DoWhile {
                    body,
                    condition,
                    continuous,
                });
                Ok(loop_flow(continuous, inner))
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                self.scopes.push_block();
                let result = self.for_loop(init, condition, update, body, out);
                self.scopes.pop_block();
                result
            }
            StmtKind::ForEach {
                ty,
                name,
                iterable,
                body,
            } => {
                let iterable = self.expr(iterable)?;
                self.scopes.push_block();
                let result = self.for_each(ty, name, iterable, body, span);
                self.scopes.pop_block();
                out.push(result?);
                Ok(Flow::default())
            }
            StmtKind::Try { body, traps } => self.try_statement(body, traps, out),
            StmtKind::Throw(value) => {
                let value = self.expr(value)?;
                let value = if value.ty.is_def() {
                    cast::coerce(self.catalog, value, DataType::simple(known::THROWABLE))?
                } else if cast::is_throwable(self.catalog, value.ty) {
                    value
                } else {
                    return Err(CompilationError::NotThrowable {
                        type_name: self.type_name(value.ty),
                        span: value.span,
                    }
                    .into());
                };
                out.push(Stmt::Throw(value));
                Ok(Flow::ESCAPES)
            }
            StmtKind::Return(value) => {
                let statement = self.return_statement(value, span)?;
                out.push(statement);
                Ok(Flow::ESCAPES)
            }
            StmtKind::Break => {
                if !self.scopes.in_loop() {
                    return Err(CompilationError::BreakOutsideLoop { span }.into());
                }
                out.push(Stmt::Break);
                Ok(Flow {
                    escapes: true,
                    breaks: true,
                })
            }
            StmtKind::Continue => {
                if !self.scopes.in_loop() {
                    return Err(CompilationError::ContinueOutsideLoop { span }.into());
                }
                out.push(Stmt::Continue);
                Ok(Flow::ESCAPES)
            }
        }
    }

    fn declaration(&mut self, ty: &ast::TypeName, vars: &[ast::DeclVar], out: &mut Vec<Stmt>) -> Resolved<()> {
        let ty = self.value_type(ty)?;
        for var in vars {
            // The initializer cannot see the variable it initializes.
            let init = if var.init.is_empty() {
                None
            } else {
                Some(self.expr_to(&var.init, ty)?)
            };
            let declared = self.scopes.declare(&var.name, ty, false, var.span)?;
            out.push(Stmt::Declare {
                local: Local {
                    var: declared.id,
                    name: declared.name,
                    ty,
                },
                init,
            });
        }
        Ok(())
    }

    fn for_loop(
        &mut self,
        init: &ForInit,
        condition: &ast::Expr,
        update: &[ast::Expr],
        body: &ast::Block,
        out: &mut Vec<Stmt>,
    ) -> Resolved<Flow> {
        let mut initializers = Vec::new();
        match init {
            ForInit::Empty => {}
            ForInit::Declaration { ty, vars } => self.declaration(ty, vars, &mut initializers)?,
            ForInit::Expressions(exprs) => {
                for expr in exprs {
                    check_statement(expr)?;
                    initializers.push(Stmt::Expr(self.expr(expr)?));
                }
            }
        }

        let (condition, continuous) = if condition.is_empty() {
            (None, true)
        } else {
            let condition = self.condition(condition)?;
            let continuous = loop_constant("for", &condition)?;
            (Some(condition), continuous)
        };
        let updates = update
            .iter()
            .map(|expr| {
                check_statement(expr)?;
                self.expr(expr)
            })
            .collect::<Resolved<Vec<_>>>()?;
        let (body, inner) = self.loop_body(body)?;
        out.push(Stmt::For {
            init: initializers,
            condition,
            update: updates,
            body,
            continuous,
        });
        Ok(loop_flow(continuous, inner))
    }

    fn for_each(
        &mut self,
        ty: &ast::TypeName,
        name: &str,
        iterable: Expr,
        body: &ast::Block,
        span: Span,
    ) -> Resolved<Stmt> {
        let declared = self.value_type(ty)?;
        let (source, element) = self.each_source(&iterable, span)?;
        let conversion = if element == declared {
            None
        } else {
            Some(
                cast::implicit(self.catalog, element, declared)
                    .ok_or_else(|| cast::invalid_cast(self.catalog, element, declared, ty.span))?,
            )
        };
        let var = self.scopes.declare(name, declared, false, span)?;
        let (body, _) = self.loop_body(body)?;
        Ok(Stmt::ForEach {
            local: Local {
                var: var.id,
                name: var.name,
                ty: declared,
            },
            source,
            iterable,
            cast: conversion,
            body,
        })
    }

    /// How to walk `iterable`, and the static type of its elements.
    fn each_source(&self, iterable: &Expr, span: Span) -> Resolved<(EachSource, DataType)> {
        let ty = iterable.ty;
        if ty.is_array() {
            let element = ty.element();
            return Ok((EachSource::Array { element }, element));
        }
        if ty.is_def() {
            let iterator = CallSite {
                kind: DispatchKind::Iterator,
                name: "iterator".to_string(),
                arity: 0,
                recipe: Recipe::default(),
                flags: CallSiteFlags::empty(),
                arg_types: vec![DataType::DEF],
                return_type: DataType::simple(known::ITERATOR),
            };
            let source = EachSource::Dynamic {
                iterator,
                has_next: self.method(known::ITERATOR, "hasNext", 0, span)?,
                next: self.method(known::ITERATOR, "next", 0, span)?,
            };
            return Ok((source, DataType::DEF));
        }
        if ty.is_reference() && !ty.is_null() && self.catalog.is_subtype(ty.type_hash, known::ITERABLE) {
            let source = EachSource::Iterable {
                iterator: self.method(ty.type_hash, "iterator", 0, span)?,
                has_next: self.method(known::ITERATOR, "hasNext", 0, span)?,
                next: self.method(known::ITERATOR, "next", 0, span)?,
            };
            return Ok((source, DataType::DEF));
        }
        Err(invalid(
            format!("cannot iterate over '{}'", self.type_name(ty)),
            span,
        ))
    }

    fn try_statement(&mut self, body: &ast::Block, traps: &[ast::Trap], out: &mut Vec<Stmt>) -> Resolved<Flow> {
        let (body, body_flow) = self.block(body)?;
        let mut flow = body_flow;
        let mut resolved = Vec::with_capacity(traps.len());
        for trap in traps {
            let catch_type = self.value_type(&trap.ty)?;
            if !cast::is_throwable(self.catalog, catch_type) {
                return Err(CompilationError::NotThrowable {
                    type_name: trap.ty.display(),
                    span: trap.ty.span,
                }
                .into());
            }
            self.scopes.push_block();
            let caught = self
                .scopes
                .declare(&trap.name, catch_type, false, trap.span)
                .map_err(sable_core::Error::from)
                .and_then(|var| Ok((var, self.block(&trap.body)?)));
            self.scopes.pop_block();
            let (var, (trap_body, trap_flow)) = caught?;
            flow.escapes &= trap_flow.escapes;
            flow.breaks |= trap_flow.breaks;
            resolved.push(Trap {
                local: Local {
                    var: var.id,
                    name: var.name,
                    ty: catch_type,
                },
                catch_type,
                body: trap_body,
            });
        }
        out.push(Stmt::Try {
            body,
            traps: resolved,
        });
        Ok(flow)
    }

    fn return_statement(&mut self, value: &ast::Expr, span: Span) -> Resolved<Stmt> {
        let return_type = self.context.return_type;
        if value.is_empty() {
            if return_type.is_void() {
                return Ok(Stmt::Return(None));
            }
            if self.context.kind == FunctionKind::Main {
                return Ok(Stmt::Return(Some(default_value(return_type, span))));
            }
            return Err(mismatch(
                format!("'{}' must return a value", self.context.name),
                span,
            ));
        }
        if return_type.is_void() {
            return Err(mismatch(
                format!("'{}' returns void", self.context.name),
                value.span,
            ));
        }
        Ok(Stmt::Return(Some(self.expr_to(value, return_type)?)))
    }
}

/// Only expressions with an effect may stand alone.
fn check_statement(expr: &ast::Expr) -> Resolved<()> {
    match expr.kind {
        ast::ExprKind::Assign { .. }
        | ast::ExprKind::Pre { .. }
        | ast::ExprKind::Post { .. }
        | ast::ExprKind::Call { .. }
        | ast::ExprKind::CallLocal { .. }
        | ast::ExprKind::NewObject { .. } => Ok(()),
        _ => Err(CompilationError::NotAStatement { span: expr.span }.into()),
    }
}

fn extraneous(construct: &'static str, value: bool, span: Span) -> sable_core::Error {
    CompilationError::ExtraneousStatement {
        construct,
        value,
        span,
    }
    .into()
}

/// A constant `false` loop condition is an error; constant `true` makes
/// the loop continuous.
fn loop_constant(construct: &'static str, condition: &Expr) -> Resolved<bool> {
    match condition.as_bool() {
        Some(false) => Err(extraneous(construct, false, condition.span)),
        Some(true) => Ok(true),
        None => Ok(false),
    }
}

/// Control leaves a loop unless it is continuous and never breaks.
fn loop_flow(continuous: bool, inner: Flow) -> Flow {
    Flow {
        escapes: continuous && !inner.breaks,
        breaks: false,
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{compile_error, resolve_source, resolve_with};
    use super::*;
    use crate::interface::ScriptInterface;
    use sable_core::CompilerSettings;

    #[test]
    fn trailing_expressions_are_returned() {
        let unit = resolve_source("int x = 1; x + 1").unwrap();
        assert!(matches!(unit.functions[0].body.last(), Some(Stmt::Return(Some(_)))));

        let unit = resolve_source("int x = 1;").unwrap();
        let Some(Stmt::Return(Some(value))) = unit.functions[0].body.last() else {
            panic!("expected a default return");
        };
        assert!(value.is_null());
    }

    /// The returned value, looking through the conversion to `def`.
    fn returned_kind(source: &str) -> crate::typed::ExprKind {
        let unit = resolve_source(source).unwrap_or_else(|err| panic!("{source}: {err}"));
        let Some(Stmt::Return(Some(value))) = unit.functions[0].body.last() else {
            panic!("{source}: expected a return");
        };
        match &value.kind {
            crate::typed::ExprKind::Cast { expr, .. } => expr.kind.clone(),
            other => other.clone(),
        }
    }

    #[test]
    fn trailing_expression_after_unbraced_if() {
        let kind = returned_kind("int x = 1; if (x > 0) x = 2; x");
        assert!(matches!(kind, crate::typed::ExprKind::Load(_)), "{kind:?}");

        // The body of an unbraced `if` is not the trailing statement.
        assert!(matches!(
            compile_error("int x = 1; if (x > 0) x + 1; x"),
            CompilationError::NotAStatement { .. }
        ));
    }

    #[test]
    fn trailing_void_call_returns_the_default() {
        let unit = resolve_source("List l = new ArrayList(); l.clear()").unwrap();
        let body = &unit.functions[0].body;
        assert!(matches!(body[body.len() - 2], Stmt::Expr(_)));
        let Some(Stmt::Return(Some(value))) = body.last() else {
            panic!("expected a default return");
        };
        assert!(value.is_null());
    }

    #[test]
    fn trailing_assignment_is_the_result() {
        let kind = returned_kind("int x = 1; x = 2");
        assert!(matches!(kind, crate::typed::ExprKind::Assign { .. }), "{kind:?}");
    }

    #[test]
    fn trailing_expression_after_a_breaking_loop() {
        let kind = returned_kind("int x = 0; while (true) { x++; break; } x");
        assert!(matches!(kind, crate::typed::ExprKind::Load(_)), "{kind:?}");

        assert!(matches!(
            compile_error("int x = 0; while (true) { x++; } x"),
            CompilationError::UnreachableStatement { .. }
        ));
    }

    #[test]
    fn void_interfaces_return_nothing() {
        let interface = ScriptInterface::new("Action", DataType::VOID);
        let unit = resolve_with("List l = new ArrayList(); l.add(1)", &interface, &CompilerSettings::default()).unwrap();
        let body = &unit.functions[0].body;
        assert!(matches!(body[body.len() - 2], Stmt::Expr(_)));
        assert_eq!(body.last(), Some(&Stmt::Return(None)));
    }

    #[test]
    fn typed_interfaces_coerce_the_result() {
        let interface = ScriptInterface::new("Score", DataType::DOUBLE).param("x", DataType::INT);
        let unit = resolve_with("x * 2", &interface, &CompilerSettings::default()).unwrap();
        let Some(Stmt::Return(Some(value))) = unit.functions[0].body.last() else {
            panic!("expected a return");
        };
        assert_eq!(value.ty, DataType::DOUBLE);

        let unit = resolve_with("if (x > 0) { return 1; }", &interface, &CompilerSettings::default()).unwrap();
        let Some(Stmt::Return(Some(value))) = unit.functions[0].body.last() else {
            panic!("expected a default return");
        };
        assert_eq!(value.kind, crate::typed::ExprKind::Constant(crate::typed::Literal::Double(0.0)));
    }

    #[test]
    fn statements_need_an_effect() {
        assert!(matches!(
            compile_error("int x = 1; x; x = 2;"),
            CompilationError::NotAStatement { .. }
        ));
        assert!(matches!(
            compile_error("int x = 1; x == 2; x = 2;"),
            CompilationError::NotAStatement { .. }
        ));
    }

    #[test]
    fn code_after_return_is_unreachable() {
        assert!(matches!(
            compile_error("return 1; int x = 2;"),
            CompilationError::UnreachableStatement { .. }
        ));
        assert!(matches!(
            compile_error("int f() { while (true) { } return 1; } f()"),
            CompilationError::UnreachableStatement { .. }
        ));
        assert!(resolve_source("int f() { while (true) { break; } return 1; } f()").is_ok());
        assert!(resolve_source("int f() { while (true) { } } f()").is_ok());
    }

    #[test]
    fn constant_conditions_are_extraneous() {
        assert!(matches!(
            compile_error("if (true) { return 1; }"),
            CompilationError::ExtraneousStatement { construct: "if", value: true, .. }
        ));
        assert!(matches!(
            compile_error("while (false) { }"),
            CompilationError::ExtraneousStatement { construct: "while", value: false, .. }
        ));
        assert!(resolve_source("for (;;) { break; }").is_ok());
    }

    #[test]
    fn missing_returns() {
        assert!(matches!(
            compile_error("int f(int x) { if (x > 0) { return 1; } } f(1)"),
            CompilationError::MissingReturn { ref function, .. } if function == "f"
        ));
        assert!(resolve_source("int f(int x) { if (x > 0) { return 1; } else { return 2; } } f(1)").is_ok());
        assert!(resolve_source("int f(int x) { throw new Exception('no'); } f(1)").is_ok());
        assert!(matches!(
            compile_error("void f() { return 1; } f()"),
            CompilationError::TypeMismatch { .. }
        ));
        assert!(matches!(
            compile_error("int f() { return; } f()"),
            CompilationError::TypeMismatch { .. }
        ));
    }

    #[test]
    fn loop_control_outside_loops() {
        assert!(matches!(compile_error("break;"), CompilationError::BreakOutsideLoop { .. }));
        assert!(matches!(
            compile_error("continue;"),
            CompilationError::ContinueOutsideLoop { .. }
        ));
        assert!(matches!(
            compile_error("int n = 0; while (n < 2) { Supplier s = () -> { break; }; n++; }"),
            CompilationError::BreakOutsideLoop { .. }
        ));
    }

    #[test]
    fn scopes_end_with_their_block() {
        assert!(resolve_source("if (1 < 2) { int x = 1; } int x = 2; x").is_ok());
        assert!(matches!(
            compile_error("int x = 1; if (x < 2) { int x = 2; }"),
            CompilationError::VariableRedeclaration { .. }
        ));
        assert!(matches!(
            compile_error("int x = x;"),
            CompilationError::UnknownVariable { .. }
        ));
    }

    #[test]
    fn for_each_sources() {
        let unit = resolve_source("int[] a = new int[2]; long sum = 0; for (long v : a) { sum += v; } sum").unwrap();
        let each = unit.functions[0]
            .body
            .iter()
            .find_map(|stmt| match stmt {
                Stmt::ForEach { source, cast, .. } => Some((source, cast)),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            each.0,
            &EachSource::Array {
                element: DataType::INT
            }
        );
        assert!(each.1.is_some());

        assert!(resolve_source("List l = new ArrayList(); for (def v : l) { } 1").is_ok());
        assert!(resolve_source("def l = new ArrayList(); for (v in l) { } 1").is_ok());
        assert!(matches!(
            compile_error("int n = 3; for (int v : n) { }"),
            CompilationError::InvalidOperation { .. }
        ));
    }

    #[test]
    fn only_throwables_are_thrown_and_caught() {
        assert!(resolve_source("try { throw new Exception('x'); } catch (Exception e) { return e.getMessage(); }").is_ok());
        assert!(matches!(
            compile_error("throw 'oops';"),
            CompilationError::NotThrowable { .. }
        ));
        assert!(matches!(
            compile_error("try { int x = 1; } catch (String e) { }"),
            CompilationError::NotThrowable { .. }
        ));
    }
}
