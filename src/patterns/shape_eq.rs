use trunk_ir::dialect::arith::{self, CmpPredicate};
use trunk_ir::dialect::{core, scf, shape, tensor};
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef};

use super::{decline, is_lowerable};

/// `shape.shape_eq(a, b)` -> compare ranks, then every extent.
pub struct ShapeEqPattern;

impl RewritePattern for ShapeEqPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(shape_eq) = shape::ShapeEq::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "shape_eq") {
            return false;
        }
        let &[lhs, rhs] = shape_eq.operands(ctx) else {
            return decline(ctx, op, "shape_eq", "expected two operands");
        };

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let i1 = core::i1_type(b.ctx());
        let zero = arith::const_index(&mut b, 0);
        let lhs_rank = tensor::dim(&mut b, lhs, zero);
        let rhs_rank = tensor::dim(&mut b, rhs, zero);
        let same_rank = arith::cmpi(&mut b, CmpPredicate::Eq, lhs_rank, rhs_rank);
        let branch = scf::r#if(
            &mut b,
            same_rank,
            &[i1],
            |b| {
                let one = arith::const_index(b, 1);
                let init = arith::const_bool(b, true);
                let fold = scf::r#for(b, zero, lhs_rank, one, &[init], |b, iv, iters| {
                    let lhs_extent = tensor::extract(b, lhs, &[iv]);
                    let rhs_extent = tensor::extract(b, rhs, &[iv]);
                    let equal = arith::cmpi(b, CmpPredicate::Eq, lhs_extent, rhs_extent);
                    let all = arith::andi(b, iters[0], equal);
                    scf::r#yield(b, &[all]);
                });
                let all = fold.result(b.ctx_ref());
                scf::r#yield(b, &[all]);
            },
            |b| {
                let unequal = arith::const_bool(b, false);
                scf::r#yield(b, &[unequal]);
            },
        );
        let result = branch.result(b.ctx_ref());
        rewriter.erase_op(vec![result]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "shape_eq"))
    }
}
