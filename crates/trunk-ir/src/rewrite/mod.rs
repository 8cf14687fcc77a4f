//! Pattern rewriting on the arena IR.
//!
//! Patterns record their edits on a [`PatternRewriter`]; the
//! [`PatternApplicator`] splices them in with RAUW, keeps a
//! [`ConversionRecord`] of what each replacement value stands for, and
//! iterates until nothing changes. A [`ConversionTarget`] then decides which
//! leftovers are acceptable.

pub mod applicator;
pub mod conversion_target;
pub mod helpers;
pub mod pattern;
pub mod record;
pub mod rewriter;

pub use applicator::{ApplyResult, PatternApplicator};
pub use conversion_target::{ConversionTarget, IllegalOp, LegalityCheck, Verification};
pub use helpers::{IrMapping, clone_op, erase_op};
pub use pattern::RewritePattern;
pub use record::{ConversionRecord, Origin};
pub use rewriter::PatternRewriter;
