//! `shape` dialect: symbolic shape algebra.
//!
//! Shapes are either the opaque `shape.shape` type or an extent tensor
//! (`tensor<?xcore.index>`); sizes are `shape.size` or `core.index`. The two
//! opaque types may carry an error value and are called error-carrying.

use smallvec::SmallVec;

use crate::builder::Builder;
use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::{BlockRef, RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeDataBuilder};

use super::core;

crate::symbols! {
    DIALECT_NAME => "shape",
    ATTR_SHAPE => "shape",
    ATTR_VALUE => "value",
    ATTR_MSG => "msg",
}

crate::define_op! {
    "shape" {
        /// Any of its inputs; all are assumed equal.
        Any => "any",
        Add => "add",
        Mul => "mul",
        Broadcast => "broadcast",
        /// `{shape = [n...]}`
        ConstShape => "const_shape",
        /// `{value = n}`
        ConstSize => "const_size",
        IsBroadcastable => "is_broadcastable",
        /// `get_extent(shape, dim)`
        GetExtent => "get_extent",
        Rank => "rank",
        /// `reduce(shape, init...) { ^(%index, %extent, %acc...) shape.yield }`
        Reduce => "reduce",
        ShapeEq => "shape_eq",
        ShapeOf => "shape_of",
        ToExtentTensor => "to_extent_tensor",
        IndexToSize => "index_to_size",
        SizeToIndex => "size_to_index",
        /// Runtime assertion producing a witness.
        CstrRequire => "cstr_require",
        Yield => "yield",
    }
}

fn opaque(ctx: &mut IrContext, name: &'static str) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), Symbol::new(name)).build())
}

pub fn shape_type(ctx: &mut IrContext) -> TypeRef {
    opaque(ctx, "shape")
}

pub fn size_type(ctx: &mut IrContext) -> TypeRef {
    opaque(ctx, "size")
}

pub fn witness_type(ctx: &mut IrContext) -> TypeRef {
    opaque(ctx, "witness")
}

pub fn is_shape(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), Symbol::new("shape"))
}

pub fn is_size(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), Symbol::new("size"))
}

/// `shape.shape` or `shape.size`.
pub fn is_error_carrying(ctx: &IrContext, ty: TypeRef) -> bool {
    is_shape(ctx, ty) || is_size(ctx, ty)
}

impl ConstShape {
    pub fn extents(self, ctx: &IrContext) -> Option<SmallVec<[u64; 4]>> {
        self.attr(ctx, "shape")?
            .as_list()?
            .iter()
            .map(Attribute::as_int)
            .collect()
    }
}

impl ConstSize {
    pub fn value(self, ctx: &IrContext) -> Option<u64> {
        self.attr(ctx, "value")?.as_int()
    }
}

impl Reduce {
    pub fn shape(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn inits(self, ctx: &IrContext) -> &[ValueRef] {
        &ctx.op_operands(self.0)[1..]
    }

    pub fn body(self, ctx: &IrContext) -> Option<RegionRef> {
        ctx.op(self.0).regions.first().copied()
    }

    /// The body's block when the body is exactly one block.
    pub fn single_block(self, ctx: &IrContext) -> Option<BlockRef> {
        match ctx.region(self.body(ctx)?).blocks.as_slice() {
            [block] => Some(*block),
            _ => None,
        }
    }
}

// Constructors for building shape programs.

fn single(
    b: &mut Builder<'_>,
    name: &'static str,
    operands: &[ValueRef],
    ty: TypeRef,
) -> ValueRef {
    let data = b
        .op(DIALECT_NAME(), Symbol::new(name))
        .operands(operands.iter().copied())
        .result(ty);
    b.emit_value(data)
}

pub fn any(b: &mut Builder<'_>, inputs: &[ValueRef], ty: TypeRef) -> ValueRef {
    single(b, "any", inputs, ty)
}

pub fn add(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef, ty: TypeRef) -> ValueRef {
    single(b, "add", &[lhs, rhs], ty)
}

pub fn mul(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef, ty: TypeRef) -> ValueRef {
    single(b, "mul", &[lhs, rhs], ty)
}

pub fn broadcast(b: &mut Builder<'_>, shapes: &[ValueRef], ty: TypeRef) -> ValueRef {
    single(b, "broadcast", shapes, ty)
}

pub fn const_shape(b: &mut Builder<'_>, extents: &[u64], ty: TypeRef) -> ValueRef {
    let list = extents.iter().map(|&e| Attribute::IntBits(e)).collect();
    let data = b
        .op(DIALECT_NAME(), Symbol::new("const_shape"))
        .attr(ATTR_SHAPE(), Attribute::List(list))
        .result(ty);
    b.emit_value(data)
}

pub fn const_size(b: &mut Builder<'_>, value: u64, ty: TypeRef) -> ValueRef {
    let data = b
        .op(DIALECT_NAME(), Symbol::new("const_size"))
        .attr(ATTR_VALUE(), Attribute::IntBits(value))
        .result(ty);
    b.emit_value(data)
}

pub fn is_broadcastable(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    let ty = core::i1_type(b.ctx());
    single(b, "is_broadcastable", &[lhs, rhs], ty)
}

pub fn get_extent(b: &mut Builder<'_>, shape: ValueRef, dim: ValueRef, ty: TypeRef) -> ValueRef {
    single(b, "get_extent", &[shape, dim], ty)
}

pub fn rank(b: &mut Builder<'_>, shape: ValueRef, ty: TypeRef) -> ValueRef {
    single(b, "rank", &[shape], ty)
}

pub fn shape_eq(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    let ty = core::i1_type(b.ctx());
    single(b, "shape_eq", &[lhs, rhs], ty)
}

pub fn shape_of(b: &mut Builder<'_>, arg: ValueRef, ty: TypeRef) -> ValueRef {
    single(b, "shape_of", &[arg], ty)
}

pub fn to_extent_tensor(b: &mut Builder<'_>, input: ValueRef, ty: TypeRef) -> ValueRef {
    single(b, "to_extent_tensor", &[input], ty)
}

pub fn index_to_size(b: &mut Builder<'_>, arg: ValueRef, ty: TypeRef) -> ValueRef {
    single(b, "index_to_size", &[arg], ty)
}

pub fn size_to_index(b: &mut Builder<'_>, arg: ValueRef) -> ValueRef {
    let ty = core::index_type(b.ctx());
    single(b, "size_to_index", &[arg], ty)
}

pub fn cstr_require(b: &mut Builder<'_>, pred: ValueRef, msg: &str) -> ValueRef {
    let ty = witness_type(b.ctx());
    let data = b
        .op(DIALECT_NAME(), Symbol::new("cstr_require"))
        .operand(pred)
        .attr(ATTR_MSG(), Attribute::String(msg.to_owned()))
        .result(ty);
    b.emit_value(data)
}

/// Build a `shape.reduce`.
///
/// `body` receives `(index, extent, acc...)` typed `(index, extent_ty,
/// typeof(init)...)` and must end with `shape.yield`.
pub fn reduce(
    b: &mut Builder<'_>,
    shape: ValueRef,
    inits: &[ValueRef],
    extent_ty: TypeRef,
    body: impl FnOnce(&mut Builder<'_>, &[ValueRef]),
) -> Reduce {
    let acc_types: SmallVec<[TypeRef; 4]> = inits
        .iter()
        .map(|&v| b.ctx_ref().value_ty(v))
        .collect();
    let mut arg_types: SmallVec<[TypeRef; 4]> = SmallVec::new();
    arg_types.push(core::index_type(b.ctx()));
    arg_types.push(extent_ty);
    arg_types.extend(acc_types.iter().copied());

    let region = b.region(&arg_types, body);
    let data = b
        .op(DIALECT_NAME(), Symbol::new("reduce"))
        .operand(shape)
        .operands(inits.iter().copied())
        .results(acc_types)
        .region(region);
    Reduce(b.emit(data))
}

pub fn r#yield(b: &mut Builder<'_>, values: &[ValueRef]) -> Yield {
    let data = b
        .op(DIALECT_NAME(), Symbol::new("yield"))
        .operands(values.iter().copied());
    Yield(b.emit(data))
}
