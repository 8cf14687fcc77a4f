//! `func` dialect: functions and returns.

use crate::builder::{BlockSink, Builder};
use crate::context::IrContext;
use crate::location::Location;
use crate::ops::DialectOp;
use crate::refs::{RegionRef, TypeRef, ValueRef};
use crate::symbol::Symbol;
use crate::types::{Attribute, TypeDataBuilder};

crate::symbols! {
    DIALECT_NAME => "func",
    FUNC => "func",
    RETURN => "return",
}

crate::define_op! {
    "func" {
        Func => "func",
        Return => "return",
    }
}

/// `func.fn` type: `params[0]` is the result, the rest are inputs.
pub fn fn_type(ctx: &mut IrContext, inputs: &[TypeRef], result: TypeRef) -> TypeRef {
    ctx.types.intern(
        TypeDataBuilder::new(DIALECT_NAME(), Symbol::new("fn"))
            .param(result)
            .params(inputs.iter().copied())
            .build(),
    )
}

impl Func {
    pub fn sym_name(self, ctx: &IrContext) -> Option<Symbol> {
        match self.attr(ctx, "sym_name") {
            Some(Attribute::Symbol(s)) => Some(*s),
            _ => None,
        }
    }

    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.op_ref()).regions[0]
    }
}

/// Build `func.func @name(inputs) -> result` and append it to `module_block`.
///
/// `body` must end the entry block with `func.return`.
pub fn func(
    ctx: &mut IrContext,
    loc: Location,
    module_block: crate::refs::BlockRef,
    name: &str,
    inputs: &[TypeRef],
    result: TypeRef,
    body: impl FnOnce(&mut Builder<'_>, &[ValueRef]),
) -> Func {
    let ty = fn_type(ctx, inputs, result);
    let mut sink = BlockSink(module_block);
    let mut b = Builder::new(ctx, &mut sink, loc);
    let region = b.region(inputs, body);
    let data = b
        .op(DIALECT_NAME(), FUNC())
        .attr("sym_name", Attribute::Symbol(Symbol::from_dynamic(name)))
        .attr("type", Attribute::Type(ty))
        .region(region);
    Func(b.emit(data))
}

pub fn r#return(b: &mut Builder<'_>, values: &[ValueRef]) -> Return {
    let data = b.op(DIALECT_NAME(), RETURN()).operands(values.iter().copied());
    Return(b.emit(data))
}
