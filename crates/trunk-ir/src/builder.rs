//! Location-carrying operation builder.
//!
//! A [`Builder`] creates operations in an [`IrContext`] and hands each one to
//! an [`Emit`] sink as soon as it exists: either the end of a block, or the
//! prefix list of a [`PatternRewriter`](crate::rewrite::PatternRewriter).
//! Nested regions are built with [`Builder::region`], which gives the body
//! closure a fresh builder appending into the new region's only block.

use smallvec::SmallVec;

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::location::Location;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;

/// Destination for freshly created operations.
pub trait Emit {
    fn emit(&mut self, ctx: &mut IrContext, op: OpRef);
}

/// Appends to the end of a block.
#[derive(Clone, Copy, Debug)]
pub struct BlockSink(pub BlockRef);

impl Emit for BlockSink {
    fn emit(&mut self, ctx: &mut IrContext, op: OpRef) {
        ctx.push_op(self.0, op);
    }
}

pub struct Builder<'a> {
    ctx: &'a mut IrContext,
    sink: &'a mut dyn Emit,
    loc: Location,
}

impl<'a> Builder<'a> {
    pub fn new(ctx: &'a mut IrContext, sink: &'a mut dyn Emit, loc: Location) -> Self {
        Self { ctx, sink, loc }
    }

    pub fn ctx(&mut self) -> &mut IrContext {
        self.ctx
    }

    pub fn ctx_ref(&self) -> &IrContext {
        self.ctx
    }

    pub fn location(&self) -> Location {
        self.loc
    }

    /// Start an operation at the builder's location.
    pub fn op(&self, dialect: Symbol, name: Symbol) -> OperationDataBuilder {
        OperationDataBuilder::new(self.loc, dialect, name)
    }

    /// Create the operation and hand it to the sink.
    pub fn emit(&mut self, data: OperationDataBuilder) -> OpRef {
        let data = data.build(self.ctx);
        let op = self.ctx.create_op(data);
        self.sink.emit(self.ctx, op);
        op
    }

    /// Hand an existing detached operation to the sink.
    pub fn insert(&mut self, op: OpRef) {
        self.sink.emit(self.ctx, op);
    }

    /// Create and emit a single-result operation, returning its result.
    pub fn emit_value(&mut self, data: OperationDataBuilder) -> ValueRef {
        let op = self.emit(data);
        self.ctx.op_result(op, 0)
    }

    /// Build a detached block whose body is filled by `body`.
    pub fn block(
        &mut self,
        arg_types: &[TypeRef],
        body: impl FnOnce(&mut Builder<'_>, &[ValueRef]),
    ) -> BlockRef {
        let block = self
            .ctx
            .create_block(BlockData::new(self.loc, arg_types.iter().copied()));
        let args: SmallVec<[ValueRef; 4]> = self.ctx.block_args(block).into();
        let mut sink = BlockSink(block);
        let mut inner = Builder::new(self.ctx, &mut sink, self.loc);
        body(&mut inner, &args);
        block
    }

    /// Build a detached single-block region.
    pub fn region(
        &mut self,
        arg_types: &[TypeRef],
        body: impl FnOnce(&mut Builder<'_>, &[ValueRef]),
    ) -> RegionRef {
        let block = self.block(arg_types, body);
        self.ctx.create_region(RegionData {
            location: self.loc,
            blocks: smallvec::smallvec![block],
            parent_op: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Attribute, TypeDataBuilder};

    #[test]
    fn builder_appends_in_order() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let ty = ctx
            .types
            .intern(TypeDataBuilder::new(Symbol::new("core"), Symbol::new("index")).build());
        let block = ctx.create_block(BlockData::new(loc, []));
        let mut sink = BlockSink(block);
        let mut b = Builder::new(&mut ctx, &mut sink, loc);

        let c = b.emit_value(
            b.op(Symbol::new("test"), Symbol::new("c"))
                .attr("value", Attribute::IntBits(1))
                .result(ty),
        );
        let region = b.region(&[ty], |b, args| {
            let data = b
                .op(Symbol::new("test"), Symbol::new("use"))
                .operands([args[0], c]);
            b.emit(data);
        });
        b.emit(b.op(Symbol::new("test"), Symbol::new("holder")).region(region));

        assert_eq!(ctx.block(block).ops.len(), 2);
        let inner = ctx.region(region).blocks[0];
        assert_eq!(ctx.block(inner).ops.len(), 1);
        assert!(ctx.has_uses(ctx.block_arg(inner, 0)));
    }
}
