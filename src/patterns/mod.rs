//! Rewrite patterns lowering `shape` ops to `arith`, `scf` and `tensor`.
//!
//! Every pattern starts from the same guard: an op that touches
//! `shape.shape` or `shape.size` is declined and left for the residue.

mod any;
mod binary;
mod broadcast;
mod const_shape;
mod const_size;
mod forward;
mod get_extent;
mod is_broadcastable;
mod rank;
mod reduce;
mod shape_eq;
mod shape_of;
mod to_extent_tensor;

use tracing::trace;
use trunk_ir::rewrite::PatternApplicator;
use trunk_ir::{IrContext, OpRef};

use crate::config::ShapeLoweringConfig;
use crate::legality::touches_error_types;

pub use any::AnyPattern;
pub use binary::BinaryPattern;
pub use broadcast::BroadcastPattern;
pub use const_shape::ConstShapePattern;
pub use const_size::ConstSizePattern;
pub use forward::ForwardPattern;
pub use get_extent::GetExtentPattern;
pub use is_broadcastable::IsBroadcastablePattern;
pub use rank::RankPattern;
pub use reduce::ReducePattern;
pub use shape_eq::ShapeEqPattern;
pub use shape_of::ShapeOfPattern;
pub use to_extent_tensor::ToExtentTensorPattern;

/// Register every shape lowering pattern on `applicator`.
pub fn populate_shape_to_standard_patterns(
    applicator: &mut PatternApplicator,
    config: &ShapeLoweringConfig,
) {
    applicator.push_pattern(AnyPattern);
    applicator.push_pattern(BinaryPattern::add());
    applicator.push_pattern(BinaryPattern::mul());
    applicator.push_pattern(BroadcastPattern);
    applicator.push_pattern(ConstShapePattern);
    applicator.push_pattern(ConstSizePattern);
    applicator.push_pattern(GetExtentPattern {
        forward_shape_of: config.forward_shape_of_extents,
    });
    applicator.push_pattern(IsBroadcastablePattern);
    applicator.push_pattern(RankPattern);
    applicator.push_pattern(ReducePattern);
    applicator.push_pattern(ShapeEqPattern);
    applicator.push_pattern(ShapeOfPattern);
    applicator.push_pattern(ToExtentTensorPattern);
    applicator.push_pattern(ForwardPattern::index_to_size());
    applicator.push_pattern(ForwardPattern::size_to_index());
}

/// Decline `op` if it touches an error-carrying type.
fn is_lowerable(ctx: &IrContext, op: OpRef, rule: &'static str) -> bool {
    if touches_error_types(ctx, op) {
        trace!(rule, op = %ctx.op_full_name(op), "declined: error-carrying type");
        return false;
    }
    true
}

/// Log a structural decline and report no match.
fn decline(ctx: &IrContext, op: OpRef, rule: &'static str, reason: &str) -> bool {
    trace!(rule, op = %ctx.op_full_name(op), reason, "declined");
    false
}
