use trunk_ir::dialect::shape;
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{DialectOp, IrContext, OpRef};

use super::{decline, is_lowerable};

/// `shape.any(a, b, ...)` -> `a`
///
/// Inputs are assumed equal, so the first one stands for all of them.
pub struct AnyPattern;

impl RewritePattern for AnyPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(any) = shape::Any::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "any") {
            return false;
        }
        let Some(&first) = any.operands(ctx).first() else {
            return decline(ctx, op, "any", "no inputs");
        };
        rewriter.erase_op(vec![first]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "any"))
    }
}
