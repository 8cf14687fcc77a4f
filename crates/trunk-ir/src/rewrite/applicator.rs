//! Fixpoint driver for rewrite patterns.
//!
//! Each iteration walks the module, visiting nested regions before the op
//! that owns them, and offers every live op to the patterns registered for
//! it. Ops are snapshotted per block; an op whose `parent_block` changed
//! since the snapshot was erased by an earlier rewrite and is skipped.

use std::collections::HashMap;

use tracing::debug;

use super::conversion_target::{ConversionTarget, IllegalOp};
use super::pattern::RewritePattern;
use super::record::ConversionRecord;
use super::rewriter::{self, PatternRewriter};
use crate::context::IrContext;
use crate::dialect::core;
use crate::refs::{BlockRef, OpRef, RegionRef};
use crate::symbol::Symbol;

/// Result of applying rewrite patterns.
#[derive(Debug)]
pub struct ApplyResult {
    /// Number of fixpoint iterations performed.
    pub iterations: usize,
    /// Total number of rewrites applied.
    pub total_changes: usize,
    /// Whether the last iteration changed nothing.
    pub reached_fixpoint: bool,
    /// Provenance of every replacement value produced during the run.
    pub record: ConversionRecord,
}

impl ApplyResult {
    /// Verify that no illegal, untolerated operations remain.
    pub fn verify(
        &self,
        ctx: &IrContext,
        module: core::Module,
        target: &ConversionTarget,
    ) -> Result<(), Vec<IllegalOp>> {
        let verification = target.verify(ctx, module.body(ctx));
        if verification.is_ok() {
            Ok(())
        } else {
            Err(verification.illegal)
        }
    }
}

/// Applies rewrite patterns until nothing changes or the iteration cap hits.
///
/// Patterns are tried in registration order. At most one pattern fires per op
/// per iteration.
pub struct PatternApplicator {
    patterns: Vec<Box<dyn RewritePattern>>,
    by_root: HashMap<(Symbol, Symbol), Vec<usize>>,
    rootless: Vec<usize>,
    max_iterations: usize,
}

impl Default for PatternApplicator {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternApplicator {
    pub fn new() -> Self {
        Self {
            patterns: Vec::new(),
            by_root: HashMap::new(),
            rootless: Vec::new(),
            max_iterations: 10,
        }
    }

    /// Add a rewrite pattern.
    pub fn add_pattern(mut self, pattern: impl RewritePattern + 'static) -> Self {
        self.push_pattern(pattern);
        self
    }

    /// Add a rewrite pattern in place.
    pub fn push_pattern(&mut self, pattern: impl RewritePattern + 'static) {
        let index = self.patterns.len();
        match pattern.root_op() {
            Some((dialect, name)) => self
                .by_root
                .entry((Symbol::new(dialect), Symbol::new(name)))
                .or_default()
                .push(index),
            None => self.rootless.push(index),
        }
        self.patterns.push(Box::new(pattern));
    }

    /// Set maximum fixpoint iterations.
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Apply patterns and verify the result.
    pub fn apply(
        &self,
        ctx: &mut IrContext,
        module: core::Module,
        target: &ConversionTarget,
    ) -> Result<ApplyResult, Vec<IllegalOp>> {
        let result = self.apply_partial(ctx, module);
        result.verify(ctx, module, target)?;
        Ok(result)
    }

    /// Apply patterns without verification.
    pub fn apply_partial(&self, ctx: &mut IrContext, module: core::Module) -> ApplyResult {
        let mut record = ConversionRecord::new();
        let mut total_changes = 0;
        let mut iterations = 0;
        let mut reached_fixpoint = false;

        while iterations < self.max_iterations {
            iterations += 1;
            let changes = self.visit_region(ctx, module.body(ctx), &mut record);
            total_changes += changes;
            debug!(iteration = iterations, changes, "rewrite iteration done");
            if changes == 0 {
                reached_fixpoint = true;
                break;
            }
        }

        ApplyResult {
            iterations,
            total_changes,
            reached_fixpoint,
            record,
        }
    }

    fn visit_region(
        &self,
        ctx: &mut IrContext,
        region: RegionRef,
        record: &mut ConversionRecord,
    ) -> usize {
        let blocks: Vec<BlockRef> = ctx.region(region).blocks.to_vec();
        blocks
            .into_iter()
            .map(|block| self.visit_block(ctx, block, record))
            .sum()
    }

    fn visit_block(
        &self,
        ctx: &mut IrContext,
        block: BlockRef,
        record: &mut ConversionRecord,
    ) -> usize {
        let mut changes = 0;
        let ops: Vec<OpRef> = ctx.block(block).ops.to_vec();

        for op in ops {
            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            let regions: Vec<RegionRef> = ctx.op(op).regions.to_vec();
            for region in regions {
                changes += self.visit_region(ctx, region, record);
            }

            if ctx.op(op).parent_block != Some(block) {
                continue;
            }

            if self.try_patterns(ctx, op, record) {
                changes += 1;
            }
        }

        changes
    }

    fn try_patterns(&self, ctx: &mut IrContext, op: OpRef, record: &mut ConversionRecord) -> bool {
        let data = ctx.op(op);
        let rooted = self
            .by_root
            .get(&(data.dialect, data.name))
            .map(Vec::as_slice)
            .unwrap_or_default();

        for index in merge_sorted(rooted, &self.rootless) {
            let pattern = &self.patterns[index];
            let mut rw = PatternRewriter::new(record);
            let matched = pattern.match_and_rewrite(ctx, op, &mut rw);
            if matched && rw.has_mutations() {
                let mutations = rw.take_mutations();
                debug!(pattern = pattern.name(), op = %ctx.op_full_name(op), "rewrite");
                rewriter::apply_mutations(ctx, record, op, mutations);
                return true;
            }
        }
        false
    }
}

/// Merge two ascending index lists, preserving registration order.
fn merge_sorted(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            merged.push(a[i]);
            i += 1;
        } else {
            merged.push(b[j]);
            j += 1;
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;
    use crate::dialect::{arith, func, shape};
    use crate::ops::DialectOp;

    /// Rewrites `shape.const_size` into `arith.constant`.
    struct ConstSizeToIndex;

    impl RewritePattern for ConstSizeToIndex {
        fn match_and_rewrite(
            &self,
            ctx: &mut IrContext,
            op: OpRef,
            rewriter: &mut PatternRewriter<'_>,
        ) -> bool {
            let Ok(size) = shape::ConstSize::from_op(ctx, op) else {
                return false;
            };
            let Some(value) = size.value(ctx) else {
                return false;
            };
            let loc = ctx.op(op).location;
            let mut b = Builder::new(ctx, rewriter, loc);
            let c = arith::const_index(&mut b, value);
            rewriter.erase_op(vec![c]);
            true
        }

        fn root_op(&self) -> Option<(&'static str, &'static str)> {
            Some(("shape", "const_size"))
        }
    }

    fn module_returning_size(ctx: &mut IrContext) -> core::Module {
        let loc = ctx.location("test");
        let module = core::Module::create(ctx, loc, "m");
        let block = module.first_block(ctx).unwrap();
        let size = shape::size_type(ctx);
        func::func(ctx, loc, block, "f", &[], size, |b, _| {
            let size = shape::size_type(b.ctx());
            let c = shape::const_size(b, 7, size);
            func::r#return(b, &[c]);
        });
        module
    }

    #[test]
    fn rewrites_and_rebinds_uses() {
        let mut ctx = IrContext::new();
        let module = module_returning_size(&mut ctx);

        let applicator = PatternApplicator::new().add_pattern(ConstSizeToIndex);
        let mut target = ConversionTarget::new();
        target.add_illegal_op("shape", "const_size");
        let result = applicator.apply(&mut ctx, module, &target).unwrap();

        assert!(result.reached_fixpoint);
        assert_eq!(result.total_changes, 1);
        assert_eq!(result.iterations, 2);

        let f = func::Func::from_op(&ctx, module.ops(&ctx)[0]).unwrap();
        let entry = ctx.region(f.body(&ctx)).blocks[0];
        let ops = ctx.block(entry).ops.to_vec();
        assert_eq!(ops.len(), 2);
        assert!(arith::Constant::matches(&ctx, ops[0]));
        assert_eq!(ctx.op_operands(ops[1]), &[ctx.op_result(ops[0], 0)]);

        let origin = result.record.origin(ctx.op_result(ops[0], 0)).unwrap();
        assert!(origin.is("shape", "const_size"));
    }

    #[test]
    fn unverified_leftovers_are_reported() {
        let mut ctx = IrContext::new();
        let module = module_returning_size(&mut ctx);

        let mut target = ConversionTarget::new();
        target.add_illegal_dialect("shape");
        let err = PatternApplicator::new()
            .apply(&mut ctx, module, &target)
            .unwrap_err();
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].name, "const_size");
    }

    #[test]
    fn merge_keeps_registration_order() {
        assert_eq!(merge_sorted(&[0, 3, 4], &[1, 2, 5]), [0, 1, 2, 3, 4, 5]);
        assert_eq!(merge_sorted(&[], &[2]), [2]);
    }
}
