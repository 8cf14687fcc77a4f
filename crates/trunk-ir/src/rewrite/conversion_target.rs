//! Legality rules for a conversion.

use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef};
use crate::symbol::Symbol;
use crate::walk::{self, WalkAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegalityCheck {
    Legal,
    Illegal,
}

type DynamicCheckFn = dyn Fn(&IrContext, OpRef) -> Option<LegalityCheck>;
type ResidueCheckFn = dyn Fn(&IrContext, OpRef) -> bool;

/// Which operations may remain after a conversion.
///
/// Illegal operations are either failures or tolerated residue: a residue
/// check that accepts an illegal op marks it (and everything nested in it) as
/// an expected leftover of a partial conversion.
#[derive(Default)]
pub struct ConversionTarget {
    legal_dialects: HashSet<Symbol>,
    illegal_dialects: HashSet<Symbol>,
    legal_ops: HashSet<(Symbol, Symbol)>,
    illegal_ops: HashSet<(Symbol, Symbol)>,
    dynamic_checks: Vec<Box<DynamicCheckFn>>,
    residue_checks: Vec<Box<ResidueCheckFn>>,
}

impl ConversionTarget {
    /// An empty target: everything is legal.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_legal_dialect(&mut self, dialect: &str) {
        self.legal_dialects.insert(Symbol::from_dynamic(dialect));
    }

    pub fn add_illegal_dialect(&mut self, dialect: &str) {
        self.illegal_dialects.insert(Symbol::from_dynamic(dialect));
    }

    pub fn add_legal_op(&mut self, dialect: &str, op_name: &str) {
        self.legal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op_name)));
    }

    pub fn add_illegal_op(&mut self, dialect: &str, op_name: &str) {
        self.illegal_ops
            .insert((Symbol::from_dynamic(dialect), Symbol::from_dynamic(op_name)));
    }

    /// Override legality per op. `None` defers to the static rules.
    pub fn add_dynamic_check(
        &mut self,
        f: impl Fn(&IrContext, OpRef) -> Option<LegalityCheck> + 'static,
    ) {
        self.dynamic_checks.push(Box::new(f));
    }

    /// Accept some illegal ops as residue.
    pub fn add_residue_check(&mut self, f: impl Fn(&IrContext, OpRef) -> bool + 'static) {
        self.residue_checks.push(Box::new(f));
    }

    /// Resolution order: dynamic checks, op rules, dialect rules, then legal.
    pub fn is_legal(&self, ctx: &IrContext, op: OpRef) -> LegalityCheck {
        for check in &self.dynamic_checks {
            if let Some(result) = check(ctx, op) {
                return result;
            }
        }

        let data = ctx.op(op);
        let key = (data.dialect, data.name);
        if self.legal_ops.contains(&key) {
            return LegalityCheck::Legal;
        }
        if self.illegal_ops.contains(&key) {
            return LegalityCheck::Illegal;
        }
        if self.legal_dialects.contains(&data.dialect) {
            return LegalityCheck::Legal;
        }
        if self.illegal_dialects.contains(&data.dialect) {
            return LegalityCheck::Illegal;
        }
        LegalityCheck::Legal
    }

    pub fn is_tolerated(&self, ctx: &IrContext, op: OpRef) -> bool {
        self.residue_checks.iter().any(|check| check(ctx, op))
    }

    /// Classify every illegal op nested in `region`.
    pub fn verify(&self, ctx: &IrContext, region: RegionRef) -> Verification {
        let mut result = Verification::default();
        let _ = walk::walk_region::<()>(ctx, region, &mut |op| {
            if self.is_legal(ctx, op) == LegalityCheck::Legal {
                return ControlFlow::Continue(WalkAction::Advance);
            }
            let illegal = IllegalOp::new(ctx, op);
            if self.is_tolerated(ctx, op) {
                result.tolerated.push(illegal);
                ControlFlow::Continue(WalkAction::Skip)
            } else {
                result.illegal.push(illegal);
                ControlFlow::Continue(WalkAction::Advance)
            }
        });
        result
    }
}

/// Outcome of [`ConversionTarget::verify`].
#[derive(Debug, Default)]
pub struct Verification {
    /// Illegal ops no residue check accepted.
    pub illegal: Vec<IllegalOp>,
    /// Illegal ops accepted as residue. Their nested ops are not visited.
    pub tolerated: Vec<IllegalOp>,
}

impl Verification {
    pub fn is_ok(&self) -> bool {
        self.illegal.is_empty()
    }
}

/// An illegal operation found during verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalOp {
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
}

impl IllegalOp {
    fn new(ctx: &IrContext, op: OpRef) -> Self {
        let data = ctx.op(op);
        Self {
            op,
            dialect: data.dialect,
            name: data.name,
        }
    }
}

impl fmt::Display for IllegalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ({})", self.dialect, self.name, self.op)
    }
}
