//! Rewrite pattern trait.

use super::rewriter::PatternRewriter;
use crate::context::IrContext;
use crate::refs::OpRef;

/// A pattern that can match and transform an operation.
///
/// `match_and_rewrite` returns `true` only if it recorded edits on the
/// rewriter. Returning `false` must leave the IR observably unchanged: ops a
/// pattern creates before deciding to bail out stay detached and unused.
pub trait RewritePattern {
    fn match_and_rewrite(
        &self,
        ctx: &mut IrContext,
        op: OpRef,
        rewriter: &mut PatternRewriter<'_>,
    ) -> bool;

    /// The `(dialect, op)` this pattern is rooted at, if any.
    ///
    /// Rooted patterns are only offered operations with that name; root-less
    /// patterns are offered every operation.
    fn root_op(&self) -> Option<(&'static str, &'static str)> {
        None
    }

    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
