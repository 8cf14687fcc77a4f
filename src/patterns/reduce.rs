use smallvec::SmallVec;
use trunk_ir::dialect::{arith, scf, shape, tensor};
use trunk_ir::rewrite::{IrMapping, PatternRewriter, RewritePattern, clone_op};
use trunk_ir::{Builder, DialectOp, IrContext, OpRef, ValueRef};

use super::{decline, is_lowerable};

/// `shape.reduce(s, init...)` -> `scf.for` over `[0, rank(s))`.
///
/// The loop body reads the extent at the induction variable and runs a
/// clone of the reduction body with its formals bound to
/// `(iv, extent, carried...)`. The original body is left untouched and goes
/// away with the op.
pub struct ReducePattern;

/// The pieces of a well-formed reduction body.
struct ReductionBody {
    formals: SmallVec<[ValueRef; 4]>,
    ops: Vec<OpRef>,
    yielded: SmallVec<[ValueRef; 4]>,
}

impl ReductionBody {
    fn extract(ctx: &IrContext, reduce: shape::Reduce) -> Result<Self, &'static str> {
        let block = reduce.single_block(ctx).ok_or("body is not a single block")?;
        let formals: SmallVec<[ValueRef; 4]> = ctx.block_args(block).into();
        let inits = reduce.inits(ctx).len();
        if formals.len() != 2 + inits {
            return Err("body formals do not match (index, extent, acc...)");
        }
        if reduce.results(ctx).len() != inits {
            return Err("result count does not match initial values");
        }

        let (&terminator, body) = ctx
            .block(block)
            .ops
            .split_last()
            .ok_or("body is empty")?;
        if !shape::Yield::matches(ctx, terminator) {
            return Err("body does not end in shape.yield");
        }
        let yielded: SmallVec<[ValueRef; 4]> = ctx.op_operands(terminator).into();
        if yielded.len() != inits {
            return Err("yield arity does not match initial values");
        }
        Ok(Self {
            formals,
            ops: body.to_vec(),
            yielded,
        })
    }
}

impl RewritePattern for ReducePattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let Ok(reduce) = shape::Reduce::from_op(ctx, op) else {
            return false;
        };
        if !is_lowerable(ctx, op, "reduce") {
            return false;
        }
        let body = match ReductionBody::extract(ctx, reduce) {
            Ok(body) => body,
            Err(reason) => return decline(ctx, op, "reduce", reason),
        };
        let extents = reduce.shape(ctx);
        let inits: SmallVec<[ValueRef; 4]> = reduce.inits(ctx).into();

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let zero = arith::const_index(&mut b, 0);
        let one = arith::const_index(&mut b, 1);
        let rank = tensor::dim(&mut b, extents, zero);
        let lowered = scf::r#for(&mut b, zero, rank, one, &inits, |b, iv, iters| {
            let extent = tensor::extract(b, extents, &[iv]);

            let mut mapping = IrMapping::new();
            let mut actuals: SmallVec<[ValueRef; 4]> = SmallVec::new();
            actuals.push(iv);
            actuals.push(extent);
            actuals.extend_from_slice(iters);
            mapping.map_all(&body.formals, &actuals);

            for &source in &body.ops {
                let cloned = clone_op(b.ctx(), source, &mut mapping);
                b.insert(cloned);
            }
            let yielded: SmallVec<[ValueRef; 4]> = body
                .yielded
                .iter()
                .map(|&v| mapping.lookup_or_self(v))
                .collect();
            scf::r#yield(b, &yielded);
        });
        let results = lowered.results(b.ctx_ref()).to_vec();
        rewriter.erase_op(results);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", "reduce"))
    }
}
