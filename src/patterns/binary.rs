use trunk_ir::dialect::arith;
use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{Builder, IrContext, OpRef, ValueRef};

use super::{decline, is_lowerable};

type EmitBinary = fn(&mut Builder<'_>, ValueRef, ValueRef) -> ValueRef;

/// `shape.add` -> `arith.addi`, `shape.mul` -> `arith.muli` on index operands.
pub struct BinaryPattern {
    op_name: &'static str,
    emit: EmitBinary,
}

impl BinaryPattern {
    pub fn add() -> Self {
        Self {
            op_name: "add",
            emit: arith::addi,
        }
    }

    pub fn mul() -> Self {
        Self {
            op_name: "mul",
            emit: arith::muli,
        }
    }
}

impl RewritePattern for BinaryPattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool {
        let data = ctx.op(op);
        if data.dialect != "shape" || data.name != self.op_name {
            return false;
        }
        if !is_lowerable(ctx, op, self.op_name) {
            return false;
        }
        let &[lhs, rhs] = ctx.op_operands(op) else {
            return decline(ctx, op, self.op_name, "expected two operands");
        };

        let loc = ctx.op(op).location;
        let mut b = Builder::new(ctx, rewriter, loc);
        let result = (self.emit)(&mut b, lhs, rhs);
        rewriter.erase_op(vec![result]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", self.op_name))
    }

    fn name(&self) -> &'static str {
        match self.op_name {
            "add" => "BinaryPattern(add)",
            _ => "BinaryPattern(mul)",
        }
    }
}
