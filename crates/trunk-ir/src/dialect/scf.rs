//! `scf` dialect: structured control flow.
//!
//! - `scf.if %cond -> (T...) { then } { else }`: both regions are one block
//!   without arguments, ending in `scf.yield`.
//! - `scf.for %lb, %ub, %step, %init... -> (T...) { ^(%iv, %iter...) }`:
//!   iterates `iv` over `[lb, ub)`; the body yields the next carried values
//!   and the op's results are the final carried values.

use smallvec::SmallVec;

use crate::builder::Builder;
use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::{RegionRef, TypeRef, ValueRef};

use super::core;

crate::symbols! {
    DIALECT_NAME => "scf",
    IF => "if",
    FOR => "for",
    YIELD => "yield",
}

crate::define_op! {
    "scf" {
        If => "if",
        For => "for",
        Yield => "yield",
    }
}

impl If {
    pub fn cond(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn then_region(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }

    pub fn else_region(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[1]
    }
}

impl For {
    pub fn lower_bound(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[0]
    }

    pub fn upper_bound(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[1]
    }

    pub fn step(self, ctx: &IrContext) -> ValueRef {
        ctx.op_operands(self.0)[2]
    }

    pub fn inits(self, ctx: &IrContext) -> &[ValueRef] {
        &ctx.op_operands(self.0)[3..]
    }

    pub fn body(self, ctx: &IrContext) -> RegionRef {
        ctx.op(self.0).regions[0]
    }
}

pub fn r#if(
    b: &mut Builder<'_>,
    cond: ValueRef,
    result_types: &[TypeRef],
    then_body: impl FnOnce(&mut Builder<'_>),
    else_body: impl FnOnce(&mut Builder<'_>),
) -> If {
    let then_region = b.region(&[], |b, _| then_body(b));
    let else_region = b.region(&[], |b, _| else_body(b));
    let data = b
        .op(DIALECT_NAME(), IF())
        .operand(cond)
        .results(result_types.iter().copied())
        .region(then_region)
        .region(else_region);
    If(b.emit(data))
}

/// Build an `scf.for`; `body` receives the induction variable and the
/// carried values.
pub fn r#for(
    b: &mut Builder<'_>,
    lower: ValueRef,
    upper: ValueRef,
    step: ValueRef,
    inits: &[ValueRef],
    body: impl FnOnce(&mut Builder<'_>, ValueRef, &[ValueRef]),
) -> For {
    let carried: SmallVec<[TypeRef; 4]> = inits
        .iter()
        .map(|&v| b.ctx_ref().value_ty(v))
        .collect();
    let mut arg_types: SmallVec<[TypeRef; 4]> = SmallVec::new();
    arg_types.push(core::index_type(b.ctx()));
    arg_types.extend(carried.iter().copied());

    let region = b.region(&arg_types, |b, args| body(b, args[0], &args[1..]));
    let data = b
        .op(DIALECT_NAME(), FOR())
        .operands([lower, upper, step])
        .operands(inits.iter().copied())
        .results(carried)
        .region(region);
    For(b.emit(data))
}

pub fn r#yield(b: &mut Builder<'_>, values: &[ValueRef]) -> Yield {
    let data = b.op(DIALECT_NAME(), YIELD()).operands(values.iter().copied());
    Yield(b.emit(data))
}
