//! Recursive traversal over nested operations.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef};

/// Whether to descend into an operation's regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    Advance,
    Skip,
}

/// Pre-order walk over every operation in a region.
pub fn walk_region<B>(
    ctx: &IrContext,
    region: RegionRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &block in &ctx.region(region).blocks {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &op in &ctx.block(block).ops {
        walk_op(ctx, op, f)?;
    }
    ControlFlow::Continue(())
}

/// Visit `op`, then its nested regions unless the callback skips them.
pub fn walk_op<B>(
    ctx: &IrContext,
    op: OpRef,
    f: &mut dyn FnMut(OpRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(op)? {
        WalkAction::Skip => return ControlFlow::Continue(()),
        WalkAction::Advance => {}
    }
    for &region in &ctx.op(op).regions {
        walk_region(ctx, region, f)?;
    }
    ControlFlow::Continue(())
}

/// Collect every nested op of type `T` in a region, in pre-order.
pub fn collect_typed<T: DialectOp>(ctx: &IrContext, region: RegionRef) -> Vec<T> {
    let mut found = Vec::new();
    let _ = walk_region::<()>(ctx, region, &mut |op| {
        if let Ok(typed) = T::from_op(ctx, op) {
            found.push(typed);
        }
        ControlFlow::Continue(WalkAction::Advance)
    });
    found
}
