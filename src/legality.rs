//! Which operations may survive the lowering.
//!
//! After the stage runs only `arith`, `scf`, `tensor`, the function
//! skeleton and `shape.cstr_require` are legal. Every other `shape` op is
//! illegal, but an illegal op that touches an error-carrying type is accepted
//! as residue: no rule lowers such ops, so they are expected to remain.

use trunk_ir::dialect::shape;
use trunk_ir::rewrite::ConversionTarget;
use trunk_ir::{DialectOp, IrContext, OpRef};

/// Whether `op` reads, produces or binds a `shape.shape` / `shape.size` value.
///
/// Region arguments are only inspected for `shape.reduce`, whose body formals
/// are the values a lowering would have to rebind.
pub fn touches_error_types(ctx: &IrContext, op: OpRef) -> bool {
    let operands = ctx.op_operands(op).iter().map(|&v| ctx.value_ty(v));
    let results = ctx.op_result_types(op).iter().copied();
    if operands
        .chain(results)
        .any(|ty| shape::is_error_carrying(ctx, ty))
    {
        return true;
    }

    shape::Reduce::from_op(ctx, op)
        .ok()
        .and_then(|reduce| reduce.single_block(ctx))
        .is_some_and(|block| {
            ctx.block(block)
                .arg_types
                .iter()
                .any(|&ty| shape::is_error_carrying(ctx, ty))
        })
}

/// The legality policy of the shape lowering.
pub fn shape_to_standard_target() -> ConversionTarget {
    let mut target = ConversionTarget::new();
    target.add_legal_dialect("arith");
    target.add_legal_dialect("scf");
    target.add_legal_dialect("tensor");
    target.add_legal_op("shape", "cstr_require");
    target.add_legal_op("func", "func");
    target.add_legal_op("func", "return");
    target.add_legal_op("core", "module");
    target.add_illegal_dialect("shape");
    target.add_residue_check(touches_error_types);
    target
}
