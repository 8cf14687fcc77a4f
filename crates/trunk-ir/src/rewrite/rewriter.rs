//! Edit recording for patterns.

use smallvec::SmallVec;

use super::helpers;
use super::record::ConversionRecord;
use crate::builder::Emit;
use crate::context::IrContext;
use crate::refs::{OpRef, ValueRef};

/// Edits recorded by one successful pattern application.
pub(crate) struct Mutations {
    pub(crate) prefix_ops: Vec<OpRef>,
    pub(crate) replacement: Option<OpRef>,
    pub(crate) erase_values: Option<Vec<ValueRef>>,
}

/// Records the edits a pattern wants; the applicator performs them after the
/// pattern returns.
///
/// Operations built through a [`Builder`](crate::Builder) that targets the
/// rewriter land in the prefix list and are inserted, in order, before the
/// matched operation.
pub struct PatternRewriter<'a> {
    record: &'a ConversionRecord,
    prefix_ops: Vec<OpRef>,
    replacement: Option<OpRef>,
    erase_values: Option<Vec<ValueRef>>,
}

impl<'a> PatternRewriter<'a> {
    pub(crate) fn new(record: &'a ConversionRecord) -> Self {
        Self {
            record,
            prefix_ops: Vec::new(),
            replacement: None,
            erase_values: None,
        }
    }

    /// What earlier rewrites in this run replaced.
    pub fn record(&self) -> &ConversionRecord {
        self.record
    }

    /// Insert a detached op before the matched op.
    pub fn insert_op(&mut self, op: OpRef) {
        self.prefix_ops.push(op);
    }

    /// Replace the matched op with `new_op`, mapping results 1:1 by index.
    pub fn replace_op(&mut self, new_op: OpRef) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "replace_op called after replace_op or erase_op"
        );
        self.replacement = Some(new_op);
    }

    /// Erase the matched op, rebinding its results to `values`.
    pub fn erase_op(&mut self, values: Vec<ValueRef>) {
        debug_assert!(
            self.replacement.is_none() && self.erase_values.is_none(),
            "erase_op called after replace_op or erase_op"
        );
        self.erase_values = Some(values);
    }

    pub(crate) fn has_mutations(&self) -> bool {
        !self.prefix_ops.is_empty() || self.replacement.is_some() || self.erase_values.is_some()
    }

    pub(crate) fn take_mutations(self) -> Mutations {
        Mutations {
            prefix_ops: self.prefix_ops,
            replacement: self.replacement,
            erase_values: self.erase_values,
        }
    }
}

impl Emit for PatternRewriter<'_> {
    fn emit(&mut self, _ctx: &mut IrContext, op: OpRef) {
        self.insert_op(op);
    }
}

/// Splice recorded edits into the IR around `original`.
pub(crate) fn apply_mutations(
    ctx: &mut IrContext,
    record: &mut ConversionRecord,
    original: OpRef,
    mutations: Mutations,
) {
    let parent = ctx.op(original).parent_block;

    if let Some(block) = parent {
        for &op in &mutations.prefix_ops {
            ctx.insert_op_before(block, original, op);
        }
    }

    let new_values: Option<SmallVec<[ValueRef; 4]>> =
        match (mutations.replacement, mutations.erase_values) {
            (Some(new_op), _) => {
                if let Some(block) = parent {
                    ctx.insert_op_before(block, original, new_op);
                }
                Some(ctx.op_results(new_op).into())
            }
            (None, Some(values)) => Some(values.into()),
            (None, None) => None,
        };

    let Some(new_values) = new_values else {
        return;
    };

    let old_values: SmallVec<[ValueRef; 4]> = ctx.op_results(original).into();
    debug_assert_eq!(
        old_values.len(),
        new_values.len(),
        "replacement value count mismatch ({} vs {})",
        old_values.len(),
        new_values.len()
    );
    record.record(ctx, original, &new_values);
    for (&old, &new) in old_values.iter().zip(new_values.iter()) {
        ctx.replace_all_uses(old, new);
        record.remap(old, new);
    }
    helpers::erase_op(ctx, original);
}
