//! Overload selection.
//!
//! Candidates come from the catalog already filtered by name and arity.
//! Every argument must convert implicitly to its parameter; the candidate
//! with the lowest total conversion cost wins. Lambdas and function
//! references are not typed yet when candidates are ranked: they only
//! require the parameter to be a functional interface of the right arity.

use sable_catalog::TypeCatalog;
use sable_core::DataType;

use crate::ast;
use crate::resolve::cast;
use crate::typed::Expr;

/// A call argument awaiting its parameter type.
#[derive(Debug)]
pub(super) enum Arg<'a> {
    Value(Expr),
    /// A lambda (`arity` is its parameter count) or a function reference.
    Function {
        node: &'a ast::Expr,
        arity: Option<usize>,
    },
}

impl Arg<'_> {
    pub(super) fn is_def(&self) -> bool {
        matches!(self, Arg::Value(expr) if expr.ty.is_def())
    }

    fn describe(&self, catalog: &dyn TypeCatalog) -> String {
        match self {
            Arg::Value(expr) => catalog.type_name(expr.ty),
            Arg::Function { arity: Some(_), .. } => "<lambda>".to_string(),
            Arg::Function { arity: None, .. } => "<reference>".to_string(),
        }
    }
}

/// Argument types as shown in diagnostics.
pub(super) fn describe(catalog: &dyn TypeCatalog, args: &[Arg<'_>]) -> String {
    args.iter()
        .map(|arg| arg.describe(catalog))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Choice {
    Best(usize),
    /// This many candidates share the lowest cost.
    Ambiguous(usize),
    NoMatch,
}

/// Rank parameter lists with a per-argument cost; `None` rejects.
pub(super) fn choose<F>(candidates: &[&[DataType]], cost: F) -> Choice
where
    F: Fn(usize, DataType) -> Option<u32>,
{
    let mut best: Option<(u32, usize)> = None;
    let mut ties = 0;
    for (index, params) in candidates.iter().enumerate() {
        let total = params
            .iter()
            .enumerate()
            .try_fold(0u32, |sum, (i, &param)| Some(sum + cost(i, param)?));
        let Some(total) = total else { continue };
        match best {
            Some((cost, _)) if total > cost => {}
            Some((cost, _)) if total == cost => ties += 1,
            _ => {
                best = Some((total, index));
                ties = 1;
            }
        }
    }
    match best {
        Some((_, index)) if ties == 1 => Choice::Best(index),
        Some(_) => Choice::Ambiguous(ties),
        None => Choice::NoMatch,
    }
}

/// Rank candidates against call arguments.
pub(super) fn choose_args(
    catalog: &dyn TypeCatalog,
    candidates: &[&[DataType]],
    args: &[Arg<'_>],
) -> Choice {
    choose(candidates, |i, param| match args.get(i)? {
        Arg::Value(expr) => cast::cost(catalog, expr.ty, param),
        Arg::Function { arity, .. } => {
            let method = functional_method(catalog, param)?;
            arity.is_none_or(|n| n == method.arity()).then_some(0)
        }
    })
}

/// Rank candidates against plain argument types.
pub(super) fn choose_types(
    catalog: &dyn TypeCatalog,
    candidates: &[&[DataType]],
    types: &[DataType],
) -> Choice {
    choose(candidates, |i, param| cast::cost(catalog, *types.get(i)?, param))
}

/// The single abstract method of a functional interface type.
pub(super) fn functional_method(
    catalog: &dyn TypeCatalog,
    ty: DataType,
) -> Option<&sable_catalog::MethodEntry> {
    if ty.is_array() {
        return None;
    }
    catalog.get_type(ty.type_hash)?.functional()
}
