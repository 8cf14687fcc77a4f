use trunk_ir::dialect::{shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef};

use super::{decline, is_lowerable};

/// `shape.to_extent_tensor(t)` -> `tensor.cast(t)` for ranked `t`.
pub struct ToExtentTensorPattern;

impl RewritePattern for ToExtentTensorPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(convert) = shape::ToExtentTensor::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "to_extent_tensor") {
            return false;
        }
        let input = convert.operands(ctx)[0];
        if !tensor::is_ranked(ctx, ctx.value_ty(input)) {
            return decline(ctx, op, "to_extent_tensor", "input is not a ranked tensor");
        }
        let result_ty = ctx.op_result_types(op)[0];

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let cast = tensor::cast(&mut b, input, result_ty);
        rewriter.erase_op(vec![cast]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "to_extent_tensor"))
    }
}
