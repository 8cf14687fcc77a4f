//! `tensor` dialect: dense arrays and the extent tensors that carry shapes.
//!
//! Types:
//! - `tensor.ranked(elem) {dims = [...]}`: each dim is `IntBits(n)` when
//!   static or `Unit` when dynamic.
//! - `tensor.unranked(elem)`: rank unknown.
//!
//! The extent tensor used for lowered shapes is `tensor<?xcore.index>`.

use smallvec::SmallVec;

use crate::builder::Builder;
use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::{RegionRef, TypeRef, ValueRef};
use crate::types::{Attribute, TypeDataBuilder};

use super::core;

crate::symbols! {
    DIALECT_NAME => "tensor",
    DIM => "dim",
    RANK => "rank",
    EXTRACT => "extract",
    FROM_ELEMENTS => "from_elements",
    GENERATE => "generate",
    YIELD => "yield",
    CAST => "cast",
    RANKED => "ranked",
    UNRANKED => "unranked",
    ATTR_DIMS => "dims",
}

crate::define_op! {
    "tensor" {
        /// `dim(source, index) -> index`
        Dim => "dim",
        /// `rank(source) -> index`
        Rank => "rank",
        /// `extract(tensor, indices...) -> elem`
        Extract => "extract",
        FromElements => "from_elements",
        /// `generate(dynamic_extents...) { ^(%i...) tensor.yield }`
        Generate => "generate",
        Yield => "yield",
        Cast => "cast",
    }
}

impl Generate {
    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

/// Decoded tensor type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TensorType {
    Ranked {
        elem: TypeRef,
        /// `None` marks a dynamic extent.
        dims: SmallVec<[Option<u64>; 4]>,
    },
    Unranked {
        elem: TypeRef,
    },
}

impl TensorType {
    pub fn from_type(ctx: &IrContext, ty: TypeRef) -> Option<Self> {
        let data = ctx.types.get(ty);
        if data.dialect != DIALECT_NAME() {
            return None;
        }
        let elem = *data.params.first()?;
        if data.name == RANKED() {
            let dims = data
                .attrs
                .get(&ATTR_DIMS())?
                .as_list()?
                .iter()
                .map(|d| match d {
                    Attribute::IntBits(n) => Some(Some(*n)),
                    Attribute::Unit => Some(None),
                    _ => None,
                })
                .collect::<Option<SmallVec<_>>>()?;
            Some(TensorType::Ranked { elem, dims })
        } else if data.name == UNRANKED() {
            Some(TensorType::Unranked { elem })
        } else {
            None
        }
    }

    pub fn intern(&self, ctx: &mut IrContext) -> TypeRef {
        match self {
            TensorType::Ranked { elem, dims } => ranked_type(ctx, *elem, dims),
            TensorType::Unranked { elem } => unranked_type(ctx, *elem),
        }
    }

    pub fn elem(&self) -> TypeRef {
        match self {
            TensorType::Ranked { elem, .. } | TensorType::Unranked { elem } => *elem,
        }
    }

    pub fn rank(&self) -> Option<usize> {
        match self {
            TensorType::Ranked { dims, .. } => Some(dims.len()),
            TensorType::Unranked { .. } => None,
        }
    }
}

pub fn ranked_type(ctx: &mut IrContext, elem: TypeRef, dims: &[Option<u64>]) -> TypeRef {
    let dims = dims
        .iter()
        .map(|d| d.map_or(Attribute::Unit, Attribute::IntBits))
        .collect();
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), RANKED())
            .param(elem)
            .attr(ATTR_DIMS(), Attribute::List(dims))
            .build(),
    )
}

pub fn unranked_type(ctx: &mut IrContext, elem: TypeRef) -> TypeRef {
    ctx.types
        .intern(TypeDataBuilder::new(DIALECT_NAME(), UNRANKED()).param(elem).build())
}

/// `tensor<?xcore.index>`
pub fn extent_tensor_type(ctx: &mut IrContext) -> TypeRef {
    let index = core::index_type(ctx);
    ranked_type(ctx, index, &[None])
}

pub fn is_tensor(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.get(ty).dialect == DIALECT_NAME()
}

pub fn is_ranked(ctx: &IrContext, ty: TypeRef) -> bool {
    ctx.types.is_dialect(ty, DIALECT_NAME(), RANKED())
}

pub fn dim(b: &mut Builder<'_>, source: ValueRef, index: ValueRef) -> ValueRef {
    let ty = core::index_type(b.ctx());
    let data = b.op(DIALECT_NAME(), DIM()).operands([source, index]).result(ty);
    b.emit_value(data)
}

pub fn rank(b: &mut Builder<'_>, source: ValueRef) -> ValueRef {
    let ty = core::index_type(b.ctx());
    let data = b.op(DIALECT_NAME(), RANK()).operand(source).result(ty);
    b.emit_value(data)
}

/// Read one element; the result type is the tensor's element type.
pub fn extract(b: &mut Builder<'_>, tensor: ValueRef, indices: &[ValueRef]) -> ValueRef {
    let tensor_ty = b.ctx_ref().value_ty(tensor);
    let elem = match TensorType::from_type(b.ctx_ref(), tensor_ty) {
        Some(t) => t.elem(),
        None => core::index_type(b.ctx()),
    };
    let data = b
        .op(DIALECT_NAME(), EXTRACT())
        .operand(tensor)
        .operands(indices.iter().copied())
        .result(elem);
    b.emit_value(data)
}

/// 1-D tensor of static length `elements.len()`.
pub fn from_elements(b: &mut Builder<'_>, elem: TypeRef, elements: &[ValueRef]) -> ValueRef {
    let ty = ranked_type(b.ctx(), elem, &[Some(elements.len() as u64)]);
    let data = b
        .op(DIALECT_NAME(), FROM_ELEMENTS())
        .operands(elements.iter().copied())
        .result(ty);
    b.emit_value(data)
}

/// Build a `tensor.generate` of type `result_ty`.
///
/// The body gets one index argument per dimension of `result_ty` and must
/// finish with `tensor.yield`.
pub fn generate(
    b: &mut Builder<'_>,
    result_ty: TypeRef,
    dynamic_extents: &[ValueRef],
    body: impl FnOnce(&mut Builder<'_>, &[ValueRef]),
) -> Generate {
    let rank = TensorType::from_type(b.ctx_ref(), result_ty)
        .and_then(|t| t.rank())
        .unwrap_or(dynamic_extents.len());
    let index = core::index_type(b.ctx());
    let arg_types: SmallVec<[TypeRef; 4]> = std::iter::repeat_n(index, rank).collect();
    let region = b.region(&arg_types, body);
    let data = b
        .op(DIALECT_NAME(), GENERATE())
        .operands(dynamic_extents.iter().copied())
        .result(result_ty)
        .region(region);
    Generate(b.emit(data))
}

pub fn r#yield(b: &mut Builder<'_>, value: ValueRef) -> Yield {
    let data = b.op(DIALECT_NAME(), YIELD()).operand(value);
    Yield(b.emit(data))
}

pub fn cast(b: &mut Builder<'_>, source: ValueRef, result_ty: TypeRef) -> ValueRef {
    let data = b
        .op(DIALECT_NAME(), CAST())
        .operand(source)
        .result(result_ty);
    b.emit_value(data)
}

/// The static extent of `ty` along `axis`, if known.
pub fn static_extent(ctx: &IrContext, ty: TypeRef, axis: usize) -> Option<u64> {
    match TensorType::from_type(ctx, ty)? {
        TensorType::Ranked { dims, .. } => dims.get(axis).copied().flatten(),
        TensorType::Unranked { .. } => None,
    }
}
