//! Emission of broadcasted extents.

use trunk_ir::dialect::arith::{self, CmpPredicate};
use trunk_ir::dialect::{core, scf, tensor};
use trunk_ir::{Builder, DialectOp, ValueRef};

/// Emit the extent of broadcast output dimension `output_dim`.
///
/// Operand `i` is right-aligned against the output, so it covers output
/// dimensions from `rank_diffs[i]` onward. Operands that do not cover
/// `output_dim` are skipped; an extent of 1 never replaces the running
/// value; otherwise later operands override earlier ones. Extents are not
/// checked for compatibility.
pub fn broadcast_dimension(
    b: &mut Builder<'_>,
    extent_tensors: &[ValueRef],
    rank_diffs: &[ValueRef],
    output_dim: ValueRef,
) -> ValueRef {
    debug_assert_eq!(extent_tensors.len(), rank_diffs.len());
    let index = core::index_type(b.ctx());
    let one = arith::const_index(b, 1);
    let mut acc = one;

    for (&extents, &rank_diff) in extent_tensors.iter().zip(rank_diffs) {
        let out_of_bounds = arith::cmpi(b, CmpPredicate::Ult, output_dim, rank_diff);
        let running = acc;
        let step = scf::r#if(
            b,
            out_of_bounds,
            &[index],
            |b| {
                scf::r#yield(b, &[running]);
            },
            |b| {
                let dim = arith::subi(b, output_dim, rank_diff);
                let extent = tensor::extract(b, extents, &[dim]);
                let is_one = arith::cmpi(b, CmpPredicate::Eq, extent, one);
                let next = arith::select(b, is_one, running, extent);
                scf::r#yield(b, &[next]);
            },
        );
        acc = b.ctx_ref().op_result(step.op_ref(), 0);
    }
    acc
}
