//! Compound IR edits built on the context primitives.

use std::collections::HashMap;

use smallvec::SmallVec;

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::refs::{BlockRef, OpRef, RegionRef, ValueRef};

/// Value substitution used while cloning.
#[derive(Clone, Debug, Default)]
pub struct IrMapping {
    values: HashMap<ValueRef, ValueRef>,
}

impl IrMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(&mut self, from: ValueRef, to: ValueRef) {
        self.values.insert(from, to);
    }

    /// Map `from[i]` to `to[i]` pairwise.
    pub fn map_all(&mut self, from: &[ValueRef], to: &[ValueRef]) {
        debug_assert_eq!(from.len(), to.len());
        for (&f, &t) in from.iter().zip(to) {
            self.map(f, t);
        }
    }

    pub fn lookup(&self, v: ValueRef) -> Option<ValueRef> {
        self.values.get(&v).copied()
    }

    /// The mapped value, or `v` itself when unmapped.
    pub fn lookup_or_self(&self, v: ValueRef) -> ValueRef {
        self.lookup(v).unwrap_or(v)
    }
}

/// Deep-clone `op` (including nested regions) into a new detached op.
///
/// Operands are remapped through `mapping`; the clone's results and the
/// arguments of cloned blocks are added to `mapping` so later clones see
/// them. The source op is left untouched.
pub fn clone_op(ctx: &mut IrContext, op: OpRef, mapping: &mut IrMapping) -> OpRef {
    let data = ctx.op(op);
    let (loc, dialect, name) = (data.location, data.dialect, data.name);
    let attributes = data.attributes.clone();
    let regions: SmallVec<[RegionRef; 2]> = data.regions.clone();
    let operands: SmallVec<[ValueRef; 8]> = ctx
        .op_operands(op)
        .iter()
        .map(|&v| mapping.lookup_or_self(v))
        .collect();
    let result_types: SmallVec<[_; 4]> = ctx.op_result_types(op).into();

    let mut builder = OperationDataBuilder::new(loc, dialect, name)
        .operands(operands)
        .results(result_types)
        .attrs(attributes);
    for region in regions {
        builder = builder.region(clone_region(ctx, region, mapping));
    }
    let data = builder.build(ctx);
    let new_op = ctx.create_op(data);

    let old_results: SmallVec<[ValueRef; 4]> = ctx.op_results(op).into();
    mapping.map_all(&old_results, ctx.op_results(new_op));
    new_op
}

fn clone_region(ctx: &mut IrContext, region: RegionRef, mapping: &mut IrMapping) -> RegionRef {
    let region_data = ctx.region(region);
    let loc = region_data.location;
    let blocks: SmallVec<[BlockRef; 2]> = region_data.blocks.clone();

    // Create every block first so block args are mapped before any op body.
    let mut new_blocks: SmallVec<[BlockRef; 2]> = SmallVec::new();
    for &block in &blocks {
        let block_loc = ctx.block(block).location;
        let arg_types = ctx.block(block).arg_types.clone();
        let new_block = ctx.create_block(BlockData::new(block_loc, arg_types));
        let old_args: SmallVec<[ValueRef; 4]> = ctx.block_args(block).into();
        mapping.map_all(&old_args, ctx.block_args(new_block));
        new_blocks.push(new_block);
    }

    for (&block, &new_block) in blocks.iter().zip(&new_blocks) {
        let ops: SmallVec<[OpRef; 8]> = ctx.block(block).ops.clone();
        for op in ops {
            let cloned = clone_op(ctx, op, mapping);
            ctx.push_op(new_block, cloned);
        }
    }

    ctx.create_region(RegionData {
        location: loc,
        blocks: new_blocks,
        parent_op: None,
    })
}

/// Detach and remove `op` together with everything nested in it.
///
/// Nested ops go first, last-to-first within each block, so no removed
/// result is still read by a removed op. Results of `op` itself must be
/// unused.
pub fn erase_op(ctx: &mut IrContext, op: OpRef) {
    let regions: SmallVec<[RegionRef; 2]> = ctx.op(op).regions.clone();
    for region in regions {
        let blocks: SmallVec<[BlockRef; 2]> = ctx.region(region).blocks.clone();
        for block in blocks {
            let ops: SmallVec<[OpRef; 8]> = ctx.block(block).ops.clone();
            for &nested in ops.iter().rev() {
                erase_op(ctx, nested);
            }
        }
    }
    ctx.detach_op(op);
    ctx.remove_op(op);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BlockSink, Builder};
    use crate::dialect::{arith, core, shape};
    use crate::ops::DialectOp;

    #[test]
    fn clone_remaps_operands_and_block_args() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let block = ctx.create_block(BlockData::new(loc, []));
        let extents = crate::dialect::tensor::extent_tensor_type(&mut ctx);
        let index = core::index_type(&mut ctx);
        let mut sink = BlockSink(block);
        let mut b = Builder::new(&mut ctx, &mut sink, loc);
        let s = shape::const_shape(&mut b, &[3], extents);
        let zero = arith::const_index(&mut b, 0);
        let one = arith::const_index(&mut b, 1);
        let red = shape::reduce(&mut b, s, &[zero], index, |b, args| {
            let sum = arith::addi(b, args[2], args[1]);
            shape::r#yield(b, &[sum]);
        });

        let mut mapping = IrMapping::new();
        mapping.map(zero, one);
        let copy = clone_op(&mut ctx, red.op_ref(), &mut mapping);

        assert_eq!(ctx.op_operands(copy), &[s, one]);
        let copy_red = shape::Reduce::from_op(&ctx, copy).expect("reduce clone");
        let body = copy_red.single_block(&ctx).expect("single block");
        let orig_body = red.single_block(&ctx).expect("single block");
        assert_ne!(body, orig_body);

        let add = ctx.block(body).ops[0];
        let args = ctx.block_args(body);
        assert_eq!(ctx.op_operands(add), &[args[2], args[1]]);
        assert_eq!(ctx.block(orig_body).ops.len(), 2);
        assert_eq!(
            mapping.lookup(ctx.op_result(red.op_ref(), 0)),
            Some(ctx.op_result(copy, 0))
        );
    }

    #[test]
    fn erase_drops_nested_uses() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let block = ctx.create_block(BlockData::new(loc, []));
        let extents = crate::dialect::tensor::extent_tensor_type(&mut ctx);
        let index = core::index_type(&mut ctx);
        let mut sink = BlockSink(block);
        let mut b = Builder::new(&mut ctx, &mut sink, loc);
        let s = shape::const_shape(&mut b, &[3], extents);
        let outer = arith::const_index(&mut b, 7);
        let red = shape::reduce(&mut b, s, &[outer], index, |b, args| {
            let sum = arith::addi(b, args[2], outer);
            shape::r#yield(b, &[sum]);
        });

        assert_eq!(ctx.uses(outer).len(), 2);
        erase_op(&mut ctx, red.op_ref());
        assert!(!ctx.has_uses(outer));
        assert_eq!(ctx.block(block).ops.len(), 2);
    }
}
