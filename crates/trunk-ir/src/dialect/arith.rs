//! `arith` dialect: integer and boolean arithmetic on `core.index` / `core.i1`.

use crate::builder::Builder;
use crate::context::IrContext;
use crate::ops::DialectOp;
use crate::refs::ValueRef;
use crate::symbol::Symbol;
use crate::types::Attribute;

use super::core;

crate::symbols! {
    DIALECT_NAME => "arith",
    CONSTANT => "constant",
    ADDI => "addi",
    SUBI => "subi",
    MULI => "muli",
    ANDI => "andi",
    ORI => "ori",
    CMPI => "cmpi",
    SELECT => "select",
    ATTR_VALUE => "value",
    ATTR_PREDICATE => "predicate",
}

crate::define_op! {
    "arith" {
        /// `{value}` constant; `IntBits` for index, `Bool` for i1.
        Constant => "constant",
        AddI => "addi",
        SubI => "subi",
        MulI => "muli",
        AndI => "andi",
        OrI => "ori",
        CmpI => "cmpi",
        Select => "select",
    }
}

/// Comparison predicate of `arith.cmpi`, stored as a symbol attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CmpPredicate {
    Eq,
    Ne,
    Ult,
    Ule,
    Ugt,
    Uge,
}

impl CmpPredicate {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpPredicate::Eq => "eq",
            CmpPredicate::Ne => "ne",
            CmpPredicate::Ult => "ult",
            CmpPredicate::Ule => "ule",
            CmpPredicate::Ugt => "ugt",
            CmpPredicate::Uge => "uge",
        }
    }

    pub fn from_symbol(sym: Symbol) -> Option<Self> {
        sym.with_str(|s| match s {
            "eq" => Some(CmpPredicate::Eq),
            "ne" => Some(CmpPredicate::Ne),
            "ult" => Some(CmpPredicate::Ult),
            "ule" => Some(CmpPredicate::Ule),
            "ugt" => Some(CmpPredicate::Ugt),
            "uge" => Some(CmpPredicate::Uge),
            _ => None,
        })
    }

    pub fn eval(self, lhs: u64, rhs: u64) -> bool {
        match self {
            CmpPredicate::Eq => lhs == rhs,
            CmpPredicate::Ne => lhs != rhs,
            CmpPredicate::Ult => lhs < rhs,
            CmpPredicate::Ule => lhs <= rhs,
            CmpPredicate::Ugt => lhs > rhs,
            CmpPredicate::Uge => lhs >= rhs,
        }
    }
}

impl Constant {
    pub fn value(self, ctx: &IrContext) -> Option<&Attribute> {
        self.attr(ctx, "value")
    }
}

impl CmpI {
    pub fn predicate(self, ctx: &IrContext) -> Option<CmpPredicate> {
        match self.attr(ctx, "predicate") {
            Some(Attribute::Symbol(s)) => CmpPredicate::from_symbol(*s),
            _ => None,
        }
    }
}

pub fn const_index(b: &mut Builder<'_>, value: u64) -> ValueRef {
    let ty = core::index_type(b.ctx());
    let data = b
        .op(DIALECT_NAME(), CONSTANT())
        .attr(ATTR_VALUE(), Attribute::IntBits(value))
        .result(ty);
    b.emit_value(data)
}

pub fn const_bool(b: &mut Builder<'_>, value: bool) -> ValueRef {
    let ty = core::i1_type(b.ctx());
    let data = b
        .op(DIALECT_NAME(), CONSTANT())
        .attr(ATTR_VALUE(), Attribute::Bool(value))
        .result(ty);
    b.emit_value(data)
}

/// Binary op whose result type follows `lhs`.
fn binary(b: &mut Builder<'_>, name: Symbol, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    let ty = b.ctx_ref().value_ty(lhs);
    let data = b.op(DIALECT_NAME(), name).operands([lhs, rhs]).result(ty);
    b.emit_value(data)
}

pub fn addi(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    binary(b, ADDI(), lhs, rhs)
}

pub fn subi(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    binary(b, SUBI(), lhs, rhs)
}

pub fn muli(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    binary(b, MULI(), lhs, rhs)
}

pub fn andi(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    binary(b, ANDI(), lhs, rhs)
}

pub fn ori(b: &mut Builder<'_>, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    binary(b, ORI(), lhs, rhs)
}

pub fn cmpi(b: &mut Builder<'_>, pred: CmpPredicate, lhs: ValueRef, rhs: ValueRef) -> ValueRef {
    let ty = core::i1_type(b.ctx());
    let data = b
        .op(DIALECT_NAME(), CMPI())
        .operands([lhs, rhs])
        .attr(ATTR_PREDICATE(), Attribute::Symbol(Symbol::new(pred.as_str())))
        .result(ty);
    b.emit_value(data)
}

/// `cond ? on_true : on_false`; the result type follows `on_true`.
pub fn select(
    b: &mut Builder<'_>,
    cond: ValueRef,
    on_true: ValueRef,
    on_false: ValueRef,
) -> ValueRef {
    let ty = b.ctx_ref().value_ty(on_true);
    let data = b
        .op(DIALECT_NAME(), SELECT())
        .operands([cond, on_true, on_false])
        .result(ty);
    b.emit_value(data)
}
