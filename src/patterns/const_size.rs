use trunk_ir::dialect::{arith, shape};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef};

use super::{decline, is_lowerable};

/// `shape.const_size {value = n}` -> `arith.constant n : index`
pub struct ConstSizePattern;

impl RewritePattern for ConstSizePattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(size) = shape::ConstSize::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "const_size") {
            return false;
        }
        let Some(value) = size.value(ctx) else {
            return decline(ctx, op, "const_size", "missing value attribute");
        };

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let c = arith::const_index(&mut b, value);
        rewriter.erase_op(vec![c]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "const_size"))
    }
}
