use smallvec::SmallVec;
use trunk_ir::dialect::{arith, core, shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef, ValueRef};

use super::{decline, is_lowerable};

/// `shape.const_shape [a, b, ...]` -> constants gathered by
/// `tensor.from_elements`, cast to the op's extent tensor type.
pub struct ConstShapePattern;

impl RewritePattern for ConstShapePattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(const_shape) = shape::ConstShape::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "const_shape") {
            return false;
        }
        let Some(extents) = const_shape.extents(ctx) else {
            return decline(ctx, op, "const_shape", "malformed shape attribute");
        };
        let result_ty = ctx.op_result_types(op)[0];

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let elements: SmallVec<[ValueRef; 4]> = extents
            .iter()
            .map(|&extent| arith::const_index(&mut b, extent))
            .collect();
        let index = core::index_type(b.ctx());
        let gathered = tensor::from_elements(&mut b, index, &elements);
        let cast = tensor::cast(&mut b, gathered, result_ty);
        rewriter.erase_op(vec![cast]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "const_shape"))
    }
}
