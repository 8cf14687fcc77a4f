//! `core` dialect: the module op and builtin scalar types.

use smallvec::smallvec;

use crate::context::{BlockData, IrContext, OperationDataBuilder, RegionData};
use crate::location::Location;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, OpRef, RegionRef, TypeRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeDataBuilder};

crate::symbols! {
    DIALECT_NAME => "core",
    MODULE => "module",
    ATTR_SYM_NAME => "sym_name",
}

crate::define_op! {
    "core" {
        /// Top-level container; one region with one block of functions.
        Module => "module",
    }
}

impl Module {
    /// Create an empty, detached module named `name`.
    pub fn create(ctx: &mut IrContext, loc: Location, name: &str) -> Self {
        let block = ctx.create_block(BlockData::new(loc, []));
        let region = ctx.create_region(RegionData {
            location: loc,
            blocks: smallvec![block],
            parent_op: None,
        });
        let data = OperationDataBuilder::new(loc, DIALECT_NAME(), MODULE())
            .attr(ATTR_SYM_NAME(), Attribute::Symbol(Symbol::from_dynamic(name)))
            .region(region)
            .build(ctx);
        Module(ctx.create_op(data))
    }

    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn first_block(self, ctx: &IrContext) -> Option<BlockRef> {
        ctx.region(self.body(ctx)).blocks.first().copied()
    }

    /// Top-level operations of the module's first block.
    pub fn ops(self, ctx: &IrContext) -> Vec<OpRef> {
        self.first_block(ctx)
            .map(|b| ctx.block(b).ops.to_vec())
            .unwrap_or_default()
    }

    pub fn name(self, ctx: &IrContext) -> Option<Symbol> {
        match self.attr(ctx, "sym_name") {
            Some(Attribute::Symbol(s)) => Some(*s),
            _ => None,
        }
    }
}

fn scalar(ctx: &mut IrContext, name: &'static str) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), Symbol::new(name)).build())
}

/// `core.index`: non-negative machine integer.
pub fn index_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "index")
}

/// `core.i1`: boolean.
pub fn i1_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "i1")
}

pub fn f32_type(ctx: &mut IrContext) -> TypeRef {
    scalar(ctx, "f32")
}

pub fn is_index(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), Symbol::new("index"))
}

pub fn is_i1(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), Symbol::new("i1"))
}
