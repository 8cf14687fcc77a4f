//! Lowering of the `shape` dialect to `arith`, `scf` and `tensor`.
//!
//! The stage is a partial conversion. Operations on the error-carrying
//! `shape.shape` and `shape.size` types are not lowered and remain as
//! residue; every other `shape` operation must be gone afterwards, or the
//! stage fails with [`LoweringError`].

pub mod config;
pub mod errors;
pub mod extent;
pub mod interp;
pub mod legality;
pub mod patterns;

use tracing::{debug, warn};
use trunk_ir::dialect::core;
use trunk_ir::rewrite::{IllegalOp, PatternApplicator};
use trunk_ir::{DialectOp, IrContext, OpRef};

pub use config::ShapeLoweringConfig;
pub use errors::{InterpError, LoweringError, LoweringErrorKind, LoweringResult};
pub use legality::{shape_to_standard_target, touches_error_types};
pub use patterns::populate_shape_to_standard_patterns;

/// Summary of a successful lowering.
#[derive(Debug)]
pub struct LoweringReport {
    /// Rewrite iterations performed.
    pub iterations: usize,
    /// Number of rewrites applied.
    pub rewrites: usize,
    /// Whether the last iteration changed nothing.
    pub reached_fixpoint: bool,
    /// `shape` ops left in place because they touch error-carrying types.
    pub residue: Vec<IllegalOp>,
}

/// Lower every lowerable `shape` op in `module`.
///
/// On error the IR is left as the rewrites reached it.
pub fn lower_shape_to_standard(
    ctx: &mut IrContext,
    module: core::Module,
    config: &ShapeLoweringConfig,
) -> LoweringResult<LoweringReport> {
    debug!(module = ?module.name(ctx), "lowering shape to standard");

    let mut applicator =
        PatternApplicator::new().with_max_iterations(config.effective_max_iterations());
    populate_shape_to_standard_patterns(&mut applicator, config);
    let target = shape_to_standard_target();

    let result = applicator.apply_partial(ctx, module);
    if !result.reached_fixpoint {
        warn!(
            iterations = result.iterations,
            "shape lowering stopped before reaching a fixpoint"
        );
    }

    let verification = target.verify(ctx, module.body(ctx));
    if !verification.is_ok() {
        return Err(LoweringErrorKind::IllegalOperations(verification.illegal).into());
    }

    debug!(
        rewrites = result.total_changes,
        residue = verification.tolerated.len(),
        "shape lowering done"
    );
    Ok(LoweringReport {
        iterations: result.iterations,
        rewrites: result.total_changes,
        reached_fixpoint: result.reached_fixpoint,
        residue: verification.tolerated,
    })
}

/// [`lower_shape_to_standard`] on an op that must be a `core.module`.
pub fn lower_module_op(
    ctx: &mut IrContext,
    op: OpRef,
    config: &ShapeLoweringConfig,
) -> LoweringResult<LoweringReport> {
    let module = core::Module::from_op(ctx, op).map_err(LoweringError::not_a_module)?;
    lower_shape_to_standard(ctx, module, config)
}
