use trunk_ir::rewrite::{PatternRewriter, RewritePattern};
use trunk_ir::{IrContext, OpRef};

use super::{decline, is_lowerable};

/// Replace a conversion op by its operand.
///
/// Covers `shape.index_to_size` and `shape.size_to_index`. Once neither
/// side is `shape.size` both are identities on `index`.
pub struct ForwardPattern {
    op_name: &'static str,
}

impl ForwardPattern {
    pub fn index_to_size() -> Self {
        Self {
            op_name: "index_to_size",
        }
    }

    pub fn size_to_index() -> Self {
        Self {
            op_name: "size_to_index",
        }
    }
}

impl RewritePattern for ForwardPattern {
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
        let &[arg] = ctx.op_operands(op) else {
            return decline(ctx, op, self.op_name, "expected one operand");
        };
        rewriter.erase_op(vec![arg]);
        true
    }

    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        Some(("shape", self.op_name))
    }

    fn name(&self) -> &'static str {
        match self.op_name {
            "index_to_size" => "ForwardPattern(index_to_size)",
            _ => "ForwardPattern(size_to_index)",
        }
    }
}
