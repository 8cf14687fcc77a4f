use smallvec::SmallVec;
use trunk_ir::dialect::arith::{self, CmpPredicate};
use trunk_ir::dialect::{shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef, ValueRef};

use super::{decline, is_lowerable};
use crate::extent::broadcast_dimension;

/// `shape.broadcast(s0, s1, ...)` -> a `tensor.generate` over the maximum
/// rank whose body computes each output extent.
pub struct BroadcastPattern;

impl RewritePattern for BroadcastPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(broadcast) = shape::Broadcast::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "broadcast") {
            return false;
        }
        let shapes: SmallVec<[ValueRef; 4]> = broadcast.operands(ctx).into();
        if shapes.is_empty() {
            return decline(ctx, op, "broadcast", "no operands");
        }
        let result_ty = ctx.op_result_types(op)[0];

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let zero = arith::const_index(&mut b, 0);
        let ranks: SmallVec<[ValueRef; 4]> = shapes
            .iter()
            .map(|&s| tensor::dim(&mut b, s, zero))
            .collect();

        let mut max_rank = ranks[0];
        for &rank in &ranks[1..] {
            let greater = arith::cmpi(&mut b, CmpPredicate::Ugt, rank, max_rank);
            max_rank = arith::select(&mut b, greater, rank, max_rank);
        }
        let rank_diffs: SmallVec<[ValueRef; 4]> = ranks
            .iter()
            .map(|&rank| arith::subi(&mut b, max_rank, rank))
            .collect();

        let extent_tensor = tensor::extent_tensor_type(b.ctx());
        let generate = tensor::generate(&mut b, extent_tensor, &[max_rank], |b, args| {
            let extent = broadcast_dimension(b, &shapes, &rank_diffs, args[0]);
            tensor::r#yield(b, extent);
        });
        let mut result = generate.result(b.ctx_ref());
        if result_ty != extent_tensor {
            result = tensor::cast(&mut b, result, result_ty);
        }
        rewriter.erase_op(vec![result]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "broadcast"))
    }
}
