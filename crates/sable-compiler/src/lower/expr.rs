//! Expression lowering.

use sable_core::DataType;

use super::{Lowered, Lowerer};
use crate::ir::{Compound, CompoundOp, Dispatch, IrExpr, IrExprKind, ReadBack, StoreNode};
use crate::typed::{Expr, ExprKind, Operation, Place};

impl Lowerer<'_> {
    /// An expression whose value is used.
    pub(super) fn value(&mut self, expr: &Expr) -> Lowered<IrExpr> {
        self.expr(expr, true)
    }

    /// An expression evaluated only for its effect. Stores leave nothing on
    /// the stack and are typed `void`.
    pub(super) fn effect(&mut self, expr: &Expr) -> Lowered<IrExpr> {
        self.expr(expr, false)
    }

    fn values(&mut self, exprs: &[Expr]) -> Lowered<Vec<IrExpr>> {
        exprs.iter().map(|expr| self.value(expr)).collect()
    }

    fn boxed(&mut self, expr: &Expr) -> Lowered<Box<IrExpr>> {
        Ok(Box::new(self.value(expr)?))
    }

    fn expr(&mut self, expr: &Expr, used: bool) -> Lowered<IrExpr> {
        let span = expr.span;
        let kind = match &expr.kind {
            ExprKind::Constant(literal) => IrExprKind::Constant(literal.clone()),
            ExprKind::Load(Place::ArrayLength { array }) => IrExprKind::ArrayLength(self.boxed(array)?),
            ExprKind::Load(place) => IrExprKind::Load(Box::new(self.access(place, span)?)),
            ExprKind::Assign { place, value } => {
                let store = StoreNode {
                    access: self.access(place, span)?,
                    value: self.value(value)?,
                    compound: None,
                    read_back: if used { ReadBack::New } else { ReadBack::None },
                    stored: expr.ty,
                };
                return Ok(store_expr(store, span));
            }
            ExprKind::Compound {
                place,
                operation,
                value,
                widen,
                narrow,
                post,
            } => {
                let value = self.value(value)?;
                let operation = match operation {
                    Operation::Static { op, ty } => CompoundOp::Static { op: *op, ty: *ty },
                    Operation::Dynamic(site) => CompoundOp::Dynamic(site.clone()),
                    Operation::Concat => CompoundOp::Concat(vec![DataType::STRING, value.ty]),
                };
                let read_back = match (used, post) {
                    (false, _) => ReadBack::None,
                    (true, true) => ReadBack::Old,
                    (true, false) => ReadBack::New,
                };
                let store = StoreNode {
                    access: self.access(place, span)?,
                    value,
                    compound: Some(Compound {
                        operation,
                        widen: *widen,
                        narrow: *narrow,
                    }),
                    read_back,
                    stored: expr.ty,
                };
                return Ok(store_expr(store, span));
            }
            ExprKind::Call {
                receiver,
                target,
                args,
            } => IrExprKind::Invoke {
                dispatch: Dispatch::Static(target.clone()),
                receiver: receiver.as_deref().map(|r| self.boxed(r)).transpose()?,
                args: self.values(args)?,
            },
            ExprKind::CallLocal { index, args, .. } => IrExprKind::InvokeLocal {
                index: *index,
                args: self.values(args)?,
            },
            ExprKind::Dynamic { site, args } => IrExprKind::Invoke {
                dispatch: Dispatch::Dynamic(site.clone()),
                receiver: None,
                args: self.values(args)?,
            },
            ExprKind::New { ctor, args, .. } => IrExprKind::New {
                ctor: *ctor,
                args: self.values(args)?,
            },
            ExprKind::NewArray { dims } => IrExprKind::NewArray {
                dims: self.values(dims)?,
            },
            ExprKind::ArrayInit { values } => IrExprKind::ArrayInit {
                values: self.values(values)?,
            },
            ExprKind::ListInit { ctor, add, values } => IrExprKind::Collection {
                ctor: *ctor,
                insert: add.clone(),
                entries: values
                    .iter()
                    .map(|value| Ok(vec![self.value(value)?]))
                    .collect::<Lowered<_>>()?,
            },
            ExprKind::MapInit { ctor, put, entries } => IrExprKind::Collection {
                ctor: *ctor,
                insert: put.clone(),
                entries: entries
                    .iter()
                    .map(|(key, value)| Ok(vec![self.value(key)?, self.value(value)?]))
                    .collect::<Lowered<_>>()?,
            },
            ExprKind::Unary { op, operand } => IrExprKind::Unary {
                op: *op,
                operand: self.boxed(operand)?,
            },
            ExprKind::Binary { op, left, right } => IrExprKind::Binary {
                op: *op,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            ExprKind::Compare {
                op,
                kind,
                left,
                right,
            } => IrExprKind::Compare {
                op: *op,
                kind: *kind,
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            ExprKind::IsNull { operand, negated } => IrExprKind::IsNull {
                operand: self.boxed(operand)?,
                negated: *negated,
            },
            ExprKind::And(left, right) => IrExprKind::And(self.boxed(left)?, self.boxed(right)?),
            ExprKind::Or(left, right) => IrExprKind::Or(self.boxed(left)?, self.boxed(right)?),
            ExprKind::Not(operand) => IrExprKind::Not(self.boxed(operand)?),
            ExprKind::Conditional {
                condition,
                then,
                otherwise,
            } => IrExprKind::Conditional {
                condition: self.boxed(condition)?,
                then: self.boxed(then)?,
                otherwise: self.boxed(otherwise)?,
            },
            ExprKind::Elvis { left, right } => IrExprKind::Elvis {
                left: self.boxed(left)?,
                right: self.boxed(right)?,
            },
            ExprKind::Instanceof { operand, target } => IrExprKind::Instanceof {
                operand: self.boxed(operand)?,
                target: *target,
            },
            ExprKind::Cast { cast, expr: inner } => IrExprKind::Cast {
                cast: *cast,
                expr: self.boxed(inner)?,
            },
            ExprKind::Concat(..) => {
                let mut operands = Vec::new();
                self.concat_operands(expr, &mut operands)?;
                IrExprKind::Concat(operands)
            }
            ExprKind::FunctionRef {
                reference,
                captures,
            } => IrExprKind::FunctionRef {
                reference: reference.clone(),
                captures: self.values(captures)?,
            },
            ExprKind::DefRef {
                reference,
                captures,
            } => IrExprKind::DefRef {
                reference: reference.clone(),
                captures: self.values(captures)?,
            },
            ExprKind::NullSafe {
                temp,
                receiver,
                access,
            } => IrExprKind::NullSafe {
                temp: *temp,
                receiver: self.boxed(receiver)?,
                access: self.boxed(access)?,
            },
        };
        Ok(IrExpr::new(kind, expr.ty, span))
    }

    /// Operands of a `+` chain in evaluation order, nested chains inlined.
    fn concat_operands(&mut self, expr: &Expr, out: &mut Vec<IrExpr>) -> Lowered<()> {
        match &expr.kind {
            ExprKind::Concat(left, right) => {
                self.concat_operands(left, out)?;
                self.concat_operands(right, out)
            }
            _ => {
                out.push(self.value(expr)?);
                Ok(())
            }
        }
    }
}

fn store_expr(store: StoreNode, span: sable_core::Span) -> IrExpr {
    let ty = if store.read_back == ReadBack::None {
        DataType::VOID
    } else {
        store.stored
    };
    IrExpr::new(IrExprKind::Store(Box::new(store)), ty, span)
}

#[cfg(test)]
mod tests {
    use super::super::tests::lower_source;
    use super::*;
    use crate::ir::{IrFunction, IrStmt};
    use crate::typed::Literal;

    /// The value main returns.
    fn returned(functions: &[IrFunction]) -> &IrExpr {
        let Some(IrStmt::Return(Some(value))) = functions[0].body.last() else {
            panic!("expected main to return a value");
        };
        unwrap_casts(value)
    }

    fn unwrap_casts(mut expr: &IrExpr) -> &IrExpr {
        while let IrExprKind::Cast { expr: inner, .. } = &expr.kind {
            expr = inner;
        }
        expr
    }

    #[test]
    fn concatenation_chains_flatten() {
        let functions = lower_source("int n = 2; 'a' + n + 'b' + 1.5");
        let IrExprKind::Concat(operands) = &returned(&functions).kind else {
            panic!("expected a concatenation");
        };
        let types: Vec<_> = operands.iter().map(|o| o.ty).collect();
        assert_eq!(
            types,
            [DataType::STRING, DataType::INT, DataType::STRING, DataType::DOUBLE]
        );
    }

    #[test]
    fn arithmetic_before_a_string_stays_arithmetic() {
        let functions = lower_source("int n = 2; n + 1 + 'x'");
        let IrExprKind::Concat(operands) = &returned(&functions).kind else {
            panic!("expected a concatenation");
        };
        assert_eq!(operands.len(), 2);
        assert!(matches!(operands[0].kind, IrExprKind::Binary { .. }));
    }

    #[test]
    fn list_literals_insert_in_order() {
        let functions = lower_source("[1, 2, 3]");
        let IrExprKind::Collection { insert, entries, .. } = &returned(&functions).kind else {
            panic!("expected a collection");
        };
        assert_eq!(insert.name, "add");
        let firsts: Vec<_> = entries
            .iter()
            .map(|entry| unwrap_casts(&entry[0]).kind.clone())
            .collect();
        assert_eq!(
            firsts,
            [1, 2, 3].map(|v| IrExprKind::Constant(Literal::Int(v)))
        );
    }

    #[test]
    fn map_literals_put_pairs() {
        let functions = lower_source("['a': 1, 'b': 2]");
        let IrExprKind::Collection { insert, entries, .. } = &returned(&functions).kind else {
            panic!("expected a collection");
        };
        assert_eq!(insert.name, "put");
        assert!(entries.iter().all(|entry| entry.len() == 2));
    }

    #[test]
    fn used_increments_read_back() {
        let functions = lower_source("int i = 0; int j = i++; int k = ++i; j + k");
        let reads: Vec<_> = functions[0].body[1..3]
            .iter()
            .map(|stmt| match stmt {
                IrStmt::Declare {
                    init: Some(init), ..
                } => match &init.kind {
                    IrExprKind::Store(store) => store.read_back,
                    other => panic!("expected a store, got {other:?}"),
                },
                other => panic!("expected a declaration, got {other:?}"),
            })
            .collect();
        assert_eq!(reads, [ReadBack::Old, ReadBack::New]);
    }

    #[test]
    fn string_compound_records_its_operands() {
        let functions = lower_source("String s = 'a'; s += 1; s");
        let IrStmt::Expr(store) = &functions[0].body[1] else {
            panic!("expected an expression statement");
        };
        let IrExprKind::Store(store) = &store.kind else {
            panic!("expected a store");
        };
        let compound = store.compound.as_ref().expect("a compound store");
        assert_eq!(
            compound.operation,
            CompoundOp::Concat(vec![DataType::STRING, DataType::INT])
        );
    }
}
