use smallvec::SmallVec;
use trunk_ir::dialect::tensor::TensorType;
use trunk_ir::dialect::{arith, core, shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef, ValueRef};

use super::{decline, is_lowerable};

/// `shape.shape_of(t)` -> the extents of `t` as an extent tensor.
///
/// For a ranked `t`, static extents become constants and dynamic ones
/// `tensor.dim`, gathered by `tensor.from_elements`. For an unranked `t`, a
/// `tensor.generate` of length `tensor.rank(t)` reads every extent.
pub struct ShapeOfPattern;

impl RewritePattern for ShapeOfPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(shape_of) = shape::ShapeOf::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "shape_of") {
            return false;
        }
        let arg = shape_of.operands(ctx)[0];
        let Some(arg_ty) = TensorType::from_type(ctx, ctx.value_ty(arg)) else {
            return decline(ctx, op, "shape_of", "argument is not a tensor");
        };
        let result_ty = ctx.op_result_types(op)[0];

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let extents = match arg_ty {
            TensorType::Ranked { dims, .. } => {
                let elements: SmallVec<[ValueRef; 4]> = dims
                    .iter()
                    .enumerate()
                    .map(|(axis, dim)| match *dim {
                        Some(extent) => arith::const_index(&mut b, extent),
                        None => {
                            let axis = arith::const_index(&mut b, axis as u64);
                            tensor::dim(&mut b, arg, axis)
                        }
                    })
                    .collect();
                let index = core::index_type(b.ctx());
                let gathered = tensor::from_elements(&mut b, index, &elements);
                tensor::cast(&mut b, gathered, result_ty)
            }
            TensorType::Unranked { .. } => {
                let rank = tensor::rank(&mut b, arg);
                let generate = tensor::generate(&mut b, result_ty, &[rank], |b, args| {
                    let extent = tensor::dim(b, arg, args[0]);
                    tensor::r#yield(b, extent);
                });
                generate.result(b.ctx_ref())
            }
        };
        rewriter.erase_op(vec![extents]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "shape_of"))
    }
}
