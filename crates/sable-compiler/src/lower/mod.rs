//! IR lowering: typed tree to IR.
//!
//! Lowering keeps the structure of each function and makes the runtime
//! mechanics explicit:
//!
//! - storage reads and writes become [`Access`](crate::ir::Access) loads and
//!   [`StoreNode`](crate::ir::StoreNode)s, with negative-index normalization
//!   on array and list subscripts
//! - `for` loops become a block holding the initializer and a `while`
//! - `for`-each loops pick an indexed or iterator walk, with hidden
//!   variables allocated past the resolver's last id
//! - every loop is counted against the function's iteration budget when
//!   the settings enable one
//! - string `+` chains flatten into one concatenation

mod access;
mod expr;

use sable_core::{CompilerSettings, DataType, InternalError};

use crate::ir::{Access, Dispatch, IrExpr, IrExprKind, IrFunction, IrLocal, IrStmt, IrTrap, LoopFlags};
use crate::resolve::cast::Cast;
use crate::resolve::scope::VarId;
use crate::typed::{EachSource, Expr, Local, MethodTarget, Stmt, TypedFunction, TypedUnit};

type Lowered<T> = Result<T, InternalError>;

/// Lower every function of a resolved unit.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower(unit: &TypedUnit, settings: &CompilerSettings) -> Lowered<Vec<IrFunction>> {
    unit.functions
        .iter()
        .map(|function| Lowerer::new(settings, function).function(function))
        .collect()
}

/// Lowering state for one function.
struct Lowerer<'s> {
    settings: &'s CompilerSettings,
    next_var: u32,
    counted: bool,
}

impl<'s> Lowerer<'s> {
    fn new(settings: &'s CompilerSettings, function: &TypedFunction) -> Self {
        Self {
            settings,
            next_var: function.next_var,
            counted: false,
        }
    }

    fn function(mut self, function: &TypedFunction) -> Lowered<IrFunction> {
        let body = self.block(&function.body)?;
        let max_loop_counter = if self.counted {
            self.settings.max_loop_counter
        } else {
            0
        };
        tracing::trace!(
            function = %function.name,
            hidden = self.next_var - function.next_var,
            counted = self.counted,
            "lowered function"
        );
        Ok(IrFunction {
            name: function.name.clone(),
            index: function.index,
            params: function.params.iter().map(local).collect(),
            return_type: function.return_type,
            flags: function.flags,
            body,
            max_loop_counter,
            span: function.span,
        })
    }

    /// A variable no script can name.
    fn hidden(&mut self) -> VarId {
        let id = VarId(self.next_var);
        self.next_var += 1;
        id
    }

    fn loop_flags(&mut self, continuous: bool) -> LoopFlags {
        let counted = self.settings.counts_loops();
        self.counted |= counted;
        LoopFlags {
            counted,
            continuous,
        }
    }

    // ==========================================================================
    // Statements
    // ==========================================================================

    fn block(&mut self, statements: &[Stmt]) -> Lowered<Vec<IrStmt>> {
        statements.iter().map(|stmt| self.statement(stmt)).collect()
    }

    fn statement(&mut self, stmt: &Stmt) -> Lowered<IrStmt> {
        Ok(match stmt {
            Stmt::Expr(expr) => IrStmt::Expr(self.effect(expr)?),
            Stmt::Declare { local: declared, init } => IrStmt::Declare {
                local: local(declared),
                init: init.as_ref().map(|init| self.value(init)).transpose()?,
            },
            Stmt::Block(body) => IrStmt::Block(self.block(body)?),
            Stmt::If {
                condition,
                then,
                otherwise,
            } => IrStmt::If {
                condition: self.value(condition)?,
                then: self.block(then)?,
                otherwise: self.block(otherwise)?,
            },
            Stmt::While {
                condition,
                body,
                continuous,
            } => IrStmt::While {
                condition: self.loop_condition(Some(condition), *continuous)?,
                body: self.block(body)?,
                update: Vec::new(),
                flags: self.loop_flags(*continuous),
            },
            Stmt::DoWhile {
                body,
                condition,
                continuous,
            } => IrStmt::DoWhile {
                body: self.block(body)?,
                condition: self.loop_condition(Some(condition), *continuous)?,
                flags: self.loop_flags(*continuous),
            },
            Stmt::For {
                init,
                condition,
                update,
                body,
                continuous,
            } => {
                let continuous = *continuous || condition.is_none();
                let mut lowered = self.block(init)?;
                lowered.push(IrStmt::While {
                    condition: self.loop_condition(condition.as_ref(), continuous)?,
                    body: self.block(body)?,
                    update: update
                        .iter()
                        .map(|expr| Ok(IrStmt::Expr(self.effect(expr)?)))
                        .collect::<Lowered<_>>()?,
                    flags: self.loop_flags(continuous),
                });
                IrStmt::Block(lowered)
            }
            Stmt::ForEach {
                local: declared,
                source,
                iterable,
                cast,
                body,
            } => self.for_each(declared, source, iterable, *cast, body)?,
            Stmt::Try { body, traps } => IrStmt::Try {
                body: self.block(body)?,
                traps: traps
                    .iter()
                    .map(|trap| {
                        Ok(IrTrap {
                            local: local(&trap.local),
                            catch_type: trap.catch_type,
                            body: self.block(&trap.body)?,
                        })
                    })
                    .collect::<Lowered<_>>()?,
            },
            Stmt::Throw(expr) => IrStmt::Throw(self.value(expr)?),
            Stmt::Return(value) => IrStmt::Return(value.as_ref().map(|v| self.value(v)).transpose()?),
            Stmt::Break => IrStmt::Break,
            Stmt::Continue => IrStmt::Continue,
        })
    }

    fn loop_condition(&mut self, condition: Option<&Expr>, continuous: bool) -> Lowered<Option<IrExpr>> {
        match condition {
            Some(condition) if !continuous => Ok(Some(self.value(condition)?)),
            _ => Ok(None),
        }
    }

    fn for_each(
        &mut self,
        declared: &Local,
        source: &EachSource,
        iterable: &Expr,
        cast: Option<Cast>,
        body: &[Stmt],
    ) -> Lowered<IrStmt> {
        let span = iterable.span;
        let iterable_ir = self.value(iterable)?;
        let convert = |element: IrExpr| match cast {
            Some(cast) => IrExpr::new(
                IrExprKind::Cast {
                    cast,
                    expr: Box::new(element),
                },
                cast.to,
                span,
            ),
            None => element,
        };

        match source {
            EachSource::Array { element } => {
                let array_var = self.hidden();
                let index_var = self.hidden();
                let read = IrExpr::load(
                    Access::ArrayElement {
                        array: IrExpr::local(array_var, "$array", iterable.ty, span),
                        index: IrExpr::local(index_var, "$index", DataType::INT, span),
                        normalize: false,
                    },
                    *element,
                    span,
                );
                let body = self.block(body)?;
                Ok(IrStmt::ForEachArray {
                    array_var,
                    index_var,
                    array: iterable_ir,
                    local: local(declared),
                    element: convert(read),
                    body,
                    flags: self.loop_flags(false),
                })
            }
            EachSource::Iterable {
                iterator,
                has_next,
                next,
            } => {
                let iterator = IrExpr::new(
                    IrExprKind::Invoke {
                        dispatch: Dispatch::Static(iterator.clone()),
                        receiver: Some(Box::new(iterable_ir)),
                        args: Vec::new(),
                    },
                    iterator.return_type,
                    span,
                );
                self.iterator_loop(iterator, has_next, next, declared, body, convert)
            }
            EachSource::Dynamic {
                iterator,
                has_next,
                next,
            } => {
                let iterator = IrExpr::new(
                    IrExprKind::Invoke {
                        dispatch: Dispatch::Dynamic(iterator.clone()),
                        receiver: None,
                        args: vec![iterable_ir],
                    },
                    iterator.return_type,
                    span,
                );
                self.iterator_loop(iterator, has_next, next, declared, body, convert)
            }
        }
    }

    fn iterator_loop(
        &mut self,
        iterator: IrExpr,
        has_next: &MethodTarget,
        next: &MethodTarget,
        declared: &Local,
        body: &[Stmt],
        convert: impl Fn(IrExpr) -> IrExpr,
    ) -> Lowered<IrStmt> {
        let span = iterator.span;
        let iterator_var = self.hidden();
        let ty = iterator.ty;
        let call = |target: &MethodTarget| {
            IrExpr::new(
                IrExprKind::Invoke {
                    dispatch: Dispatch::Static(target.clone()),
                    receiver: Some(Box::new(IrExpr::local(iterator_var, "$iterator", ty, span))),
                    args: Vec::new(),
                },
                target.return_type,
                span,
            )
        };
        let has_next = call(has_next);
        let element = convert(call(next));
        let body = self.block(body)?;
        Ok(IrStmt::ForEachIterator {
            iterator_var,
            iterator,
            has_next,
            local: local(declared),
            element,
            body,
            flags: self.loop_flags(false),
        })
    }
}

fn local(local: &Local) -> IrLocal {
    IrLocal {
        var: local.var,
        name: local.name.clone(),
        ty: local.ty,
    }
}
