use trunk_ir::dialect::{arith, shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef};

use super::is_lowerable;

/// `shape.rank(s)` -> `tensor.dim(s, 0)`
pub struct RankPattern;

impl RewritePattern for RankPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(rank) = shape::Rank::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "rank") {
            return false;
        }
        let shape = rank.operands(ctx)[0];

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let zero = arith::const_index(&mut b, 0);
        let dim = tensor::dim(&mut b, shape, zero);
        rewriter.erase_op(vec![dim]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "rank"))
    }
}
