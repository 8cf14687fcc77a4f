use trunk_ir::dialect::{shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef, ValueRef};

use super::{decline, is_lowerable};

/// `shape.get_extent(s, i)` -> `tensor.extract(s, i)`
///
/// When `s` is the shape of a tensor `t`, either through a `shape.shape_of`
/// still in the IR or one lowered earlier in the same run, the extent is read
/// from `t` directly with `tensor.dim(t, i)`.
pub struct GetExtentPattern {
    pub forward_shape_of: bool,
}

impl GetExtentPattern {
    /// The tensor whose shape `extents` is, if known.
    fn shape_source(
        ctx: &IrContext,
        rewriter: &PatternRewriter<'_>,
        extents: ValueRef,
    ) -> Option<ValueRef> {
        let source = match ctx.defining_op(extents) {
            Some(def) if shape::ShapeOf::matches(ctx, def) => ctx.op_operands(def)[0],
            _ => {
                let origin = rewriter.record().origin(extents)?;
                if !origin.is("shape", "shape_of") {
                    return None;
                }
                *origin.operands.first()?
            }
        };
        tensor::is_tensor(ctx, ctx.value_ty(source)).then_some(source)
    }
}

impl RewritePattern for GetExtentPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(get_extent) = shape::GetExtent::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "get_extent") {
            return false;
        }
        let &[extents, dim] = get_extent.operands(ctx) else {
            return decline(ctx, op, "get_extent", "expected two operands");
        };
        let source = if self.forward_shape_of {
            Self::shape_source(ctx, rewriter, extents)
        } else {
            None
        };

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let extent = match source {
            Some(t) => tensor::dim(&mut b, t, dim),
            None => tensor::extract(&mut b, extents, &[dim]),
        };
        rewriter.erase_op(vec![extent]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "get_extent"))
    }
}
