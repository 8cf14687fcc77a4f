//! TrunkIR: an arena-based multi-level dialect IR.
//!
//! Entities live in an [`IrContext`] and are addressed by small `Copy`
//! handles. Dialects are sets of named operations with typed wrappers (see
//! [`define_op!`]); [`rewrite`] provides the pattern-driven conversion
//! machinery used to lower one dialect into others.

pub mod builder;
pub mod context;
pub mod dialect;
pub mod location;
pub mod ops;
pub mod printer;
pub mod refs;
pub mod rewrite;
pub mod symbol;
pub mod types;
pub mod walk;

pub use builder::{BlockSink, Builder, Emit};
pub use context::{BlockData, IrContext, OperationDataBuilder, RegionData};
pub use location::{Location, Span};
pub use ops::{ConversionError, DialectOp};
pub use refs::{BlockRef, OpRef, PathRef, RegionRef, TypeRef, ValueDef, ValueRef};
pub use symbol::Symbol;
pub use types::{Attribute, TypeData, TypeDataBuilder};
