use trunk_ir::dialect::arith::{self, CmpPredicate};
use trunk_ir::dialect::{scf, shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef};

use super::{decline, is_lowerable};

/// `shape.is_broadcastable(a, b)` -> an `scf.for` over the overlapping
/// trailing dimensions, AND-ing per-position compatibility.
///
/// Two extents are compatible when either is 1 or they are equal. Leading
/// dimensions of the longer shape are always compatible.
pub struct IsBroadcastablePattern;

impl RewritePattern for IsBroadcastablePattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(is_broadcastable) = shape::IsBroadcastable::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "is_broadcastable") {
            return false;
        }
        let &[lhs, rhs] = is_broadcastable.operands(ctx) else {
            return decline(ctx, op, "is_broadcastable", "expected two operands");
        };

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let zero = arith::const_index(&mut b, 0);
        let one = arith::const_index(&mut b, 1);
        let lhs_rank = tensor::dim(&mut b, lhs, zero);
        let rhs_rank = tensor::dim(&mut b, rhs, zero);
        let lhs_smaller = arith::cmpi(&mut b, CmpPredicate::Ule, lhs_rank, rhs_rank);
        let lesser_rank = arith::select(&mut b, lhs_smaller, lhs_rank, rhs_rank);
        let greater_rank = arith::select(&mut b, lhs_smaller, rhs_rank, lhs_rank);

        let erased = tensor::extent_tensor_type(b.ctx());
        let lhs = tensor::cast(&mut b, lhs, erased);
        let rhs = tensor::cast(&mut b, rhs, erased);
        let lesser = arith::select(&mut b, lhs_smaller, lhs, rhs);
        let greater = arith::select(&mut b, lhs_smaller, rhs, lhs);

        let rank_diff = arith::subi(&mut b, greater_rank, lesser_rank);
        let init = arith::const_bool(&mut b, true);
        let fold = scf::r#for(&mut b, rank_diff, greater_rank, one, &[init], |b, iv, iters| {
            let greater_extent = tensor::extract(b, greater, &[iv]);
            let greater_is_one = arith::cmpi(b, CmpPredicate::Eq, greater_extent, one);
            let lesser_iv = arith::subi(b, iv, rank_diff);
            let lesser_extent = tensor::extract(b, lesser, &[lesser_iv]);
            let lesser_is_one = arith::cmpi(b, CmpPredicate::Eq, lesser_extent, one);
            let same = arith::cmpi(b, CmpPredicate::Eq, greater_extent, lesser_extent);
            let either_one = arith::ori(b, greater_is_one, lesser_is_one);
            let compatible = arith::ori(b, either_one, same);
            let all = arith::andi(b, iters[0], compatible);
            scf::r#yield(b, &[all]);
        });
        let result = fold.result(b.ctx_ref());
        rewriter.erase_op(vec![result]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "is_broadcastable"))
    }
}
