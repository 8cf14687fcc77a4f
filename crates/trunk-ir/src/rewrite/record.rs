//! Provenance of replacement values.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::context::IrContext;
use crate::refs::{OpRef, ValueRef};
use crate::symbol::Symbol;

/// The operation a replacement value stands for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Origin {
    /// The replaced operation. It no longer exists in the IR.
    pub op: OpRef,
    pub dialect: Symbol,
    pub name: Symbol,
    /// Operands of the replaced op, kept current under RAUW.
    pub operands: SmallVec<[ValueRef; 4]>,
}

impl Origin {
    pub fn is(&self, dialect: &str, name: &str) -> bool {
        self.dialect == dialect && self.name == name
    }
}

/// Map from replacement values to the original operation they replaced.
///
/// Lives for one applicator run. The first origin recorded for a value wins,
/// so a value forwarded through several rewrites keeps its earliest origin.
#[derive(Debug, Default)]
pub struct ConversionRecord {
    origins: HashMap<ValueRef, Origin>,
}

impl ConversionRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(&self, v: ValueRef) -> Option<&Origin> {
        self.origins.get(&v)
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Record that `replacements` stand for `op`. Call before `op` is removed.
    pub(crate) fn record(&mut self, ctx: &IrContext, op: OpRef, replacements: &[ValueRef]) {
        let data = ctx.op(op);
        let origin = Origin {
            op,
            dialect: data.dialect,
            name: data.name,
            operands: ctx.op_operands(op).into(),
        };
        for &v in replacements {
            self.origins.entry(v).or_insert_with(|| origin.clone());
        }
    }

    /// Mirror `replace_all_uses(old, new)`.
    pub(crate) fn remap(&mut self, old: ValueRef, new: ValueRef) {
        if old == new {
            return;
        }
        if let Some(origin) = self.origins.remove(&old) {
            self.origins.entry(new).or_insert(origin);
        }
        for origin in self.origins.values_mut() {
            for operand in origin.operands.iter_mut() {
                if *operand == old {
                    *operand = new;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationDataBuilder;
    use crate::dialect::core;

    #[test]
    fn remap_follows_operands_and_keys() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let index = core::index_type(&mut ctx);
        let mk = |ctx: &mut IrContext, name: &'static str, operands: &[ValueRef]| {
            let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new(name))
                .operands(operands.iter().copied())
                .result(index)
                .build(ctx);
            let op = ctx.create_op(data);
            (op, ctx.op_result(op, 0))
        };
        let (_, input) = mk(&mut ctx, "input", &[]);
        let (source, _) = mk(&mut ctx, "source", &[input]);
        let (_, replacement) = mk(&mut ctx, "replacement", &[]);
        let (_, better_input) = mk(&mut ctx, "better", &[]);

        let mut record = ConversionRecord::new();
        record.record(&ctx, source, &[replacement]);
        let origin = record.origin(replacement).expect("recorded");
        assert!(origin.is("test", "source"));
        assert_eq!(origin.operands.as_slice(), &[input]);

        record.remap(input, better_input);
        assert_eq!(
            record.origin(replacement).expect("recorded").operands.as_slice(),
            &[better_input]
        );

        let (_, moved) = mk(&mut ctx, "moved", &[]);
        record.remap(replacement, moved);
        assert!(record.origin(replacement).is_none());
        assert_eq!(record.origin(moved).expect("moved").op, source);
    }

    #[test]
    fn first_origin_wins() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let index = core::index_type(&mut ctx);
        let mut ops = Vec::new();
        for name in ["first", "second", "value"] {
            let data = OperationDataBuilder::new(loc, Symbol::new("test"), Symbol::new(name))
                .result(index)
                .build(&mut ctx);
            ops.push(ctx.create_op(data));
        }
        let v = ctx.op_result(ops[2], 0);
        let mut record = ConversionRecord::new();
        record.record(&ctx, ops[0], &[v]);
        record.record(&ctx, ops[1], &[v]);
        assert_eq!(record.origin(v).expect("recorded").op, ops[0]);
        assert_eq!(record.len(), 1);
    }
}
