//! Typed operation wrappers.
//!
//! A dialect op wrapper is a `Copy` newtype over `OpRef` that has been checked
//! to carry the right `dialect.name`. Wrappers are declared with
//! [`define_op!`](crate::define_op) and expose their operands, regions and
//! attributes through accessors taking `&IrContext`.

use derive_more::Display;

use crate::context::IrContext;
use crate::refs::{OpRef, RegionRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::Attribute;

/// Error when viewing an operation as a specific dialect op.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ConversionError {
    /// Operation name doesn't match the expected `dialect.name`.
    #[display("expected {expected}, found {actual}")]
    WrongOperation {
        expected: &'static str,
        actual: String,
    },
    #[display("missing attribute `{_0}`")]
    MissingAttribute(&'static str),
    #[display("attribute `{_0}` has the wrong kind")]
    WrongAttributeType(&'static str),
    #[display("missing region #{_0}")]
    MissingRegion(usize),
}

impl std::error::Error for ConversionError {}

/// Trait for typed dialect operation wrappers.
pub trait DialectOp: Sized + Copy {
    const DIALECT_NAME: &'static str;
    const OP_NAME: &'static str;

    /// Wrap without checking. Callers must have checked `matches`.
    fn wrap_unchecked(op: OpRef) -> Self;

    fn op_ref(&self) -> OpRef;

    fn matches(ctx: &IrContext, op: OpRef) -> bool {
        ctx.op(op)
            .is(Symbol::new(Self::DIALECT_NAME), Symbol::new(Self::OP_NAME))
    }

    fn from_op(ctx: &IrContext, op: OpRef) -> Result<Self, ConversionError> {
        if Self::matches(ctx, op) {
            Ok(Self::wrap_unchecked(op))
        } else {
            Err(ConversionError::WrongOperation {
                expected: Self::full_name(),
                actual: ctx.op_full_name(op),
            })
        }
    }

    /// `dialect.name` of this wrapper type.
    fn full_name() -> &'static str;

    fn operands<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_operands(self.op_ref())
    }

    fn results<'a>(&self, ctx: &'a IrContext) -> &'a [ValueRef] {
        ctx.op_results(self.op_ref())
    }

    /// The first result. Only meaningful for single-result ops.
    fn result(&self, ctx: &IrContext) -> ValueRef {
        ctx.op_result(self.op_ref(), 0)
    }

    fn attr<'a>(&self, ctx: &'a IrContext, key: &'static str) -> Option<&'a Attribute> {
        ctx.op(self.op_ref()).attributes.get(&Symbol::new(key))
    }

    fn region(&self, ctx: &IrContext, index: usize) -> Result<RegionRef, ConversionError> {
        ctx.op(self.op_ref())
            .regions
            .get(index)
            .copied()
            .ok_or(ConversionError::MissingRegion(index))
    }
}

/// Declare typed wrappers for a dialect's operations.
///
/// ```
/// trunk_ir::define_op! {
///     "demo" {
///         /// A demo op.
///         Frob => "frob",
///     }
/// }
///
/// assert_eq!(<Frob as trunk_ir::DialectOp>::full_name(), "demo.frob");
/// ```
#[macro_export]
macro_rules! define_op {
    ($dialect:literal { $($(#[$meta:meta])* $name:ident => $op:literal),* $(,)? }) => {
        $(
            $(#[$meta])*
            #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
            pub struct $name($crate::OpRef);

            impl $crate::DialectOp for $name {
                const DIALECT_NAME: &'static str = $dialect;
                const OP_NAME: &'static str = $op;

                fn wrap_unchecked(op: $crate::OpRef) -> Self {
                    $name(op)
                }

                fn op_ref(&self) -> $crate::OpRef {
                    self.0
                }

                fn full_name() -> &'static str {
                    concat!($dialect, ".", $op)
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::OperationDataBuilder;

    crate::define_op! {
        "demo" {
            Frob => "frob",
        }
    }

    #[test]
    fn from_op_checks_name() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let data = OperationDataBuilder::new(loc, Symbol::new("demo"), Symbol::new("frob"))
            .attr("level", Attribute::IntBits(3))
            .build(&mut ctx);
        let frob = ctx.create_op(data);
        let data = OperationDataBuilder::new(loc, Symbol::new("demo"), Symbol::new("other"))
            .build(&mut ctx);
        let other = ctx.create_op(data);

        let wrapped = Frob::from_op(&ctx, frob).expect("demo.frob");
        assert_eq!(wrapped.op_ref(), frob);
        assert_eq!(wrapped.attr(&ctx, "level"), Some(&Attribute::IntBits(3)));
        assert_eq!(wrapped.region(&ctx, 0), Err(ConversionError::MissingRegion(0)));

        let err = Frob::from_op(&ctx, other).unwrap_err();
        assert_eq!(err.to_string(), "expected demo.frob, found demo.other");
    }
}
