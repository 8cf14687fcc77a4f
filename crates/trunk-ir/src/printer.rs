//! Text printer for debugging and snapshot tests.
//!
//! ```text
//! core.module @m {
//!   func.func @f(%0: tensor<?xcore.index>) -> core.index {
//!     %1 = arith.constant {value = 0} : core.index
//!     %2 = tensor.dim %0, %1 : core.index
//!     func.return %2
//!   }
//! }
//! ```
//!
//! Values are numbered per function in definition order.

use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::context::IrContext;
use crate::dialect::tensor::TensorType;
use crate::refs::*;
use crate::symbol::Symbol;
use crate::types::Attribute;

struct PrintState<'a> {
    ctx: &'a IrContext,
    names: HashMap<ValueRef, usize>,
    next: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            names: HashMap::new(),
            next: 0,
        }
    }

    fn define(&mut self, v: ValueRef) -> usize {
        let n = self.next;
        self.next += 1;
        self.names.insert(v, n);
        n
    }

    fn write_use(&self, f: &mut impl Write, v: ValueRef) -> fmt::Result {
        match self.names.get(&v) {
            Some(n) => write!(f, "%{n}"),
            None => f.write_str("%?"),
        }
    }

    fn reset(&mut self) {
        self.names.clear();
        self.next = 0;
    }
}

/// Print a single operation (with nested regions).
pub fn print_op(ctx: &IrContext, op: OpRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    print_operation(&mut state, &mut out, op, 0).expect("fmt::Write to String never fails");
    out
}

pub fn print_type(ctx: &IrContext, ty: TypeRef) -> String {
    let mut out = String::new();
    write_type(ctx, &mut out, ty).expect("fmt::Write to String never fails");
    out
}

// ============================================================================
// Types and attributes
// ============================================================================

fn write_type(ctx: &IrContext, f: &mut impl Write, ty: TypeRef) -> fmt::Result {
    if let Some(tensor) = TensorType::from_type(ctx, ty) {
        f.write_str("tensor<")?;
        match &tensor {
            TensorType::Ranked { dims, .. } => {
                for dim in dims {
                    match dim {
                        Some(n) => write!(f, "{n}x")?,
                        None => f.write_str("?x")?,
                    }
                }
            }
            TensorType::Unranked { .. } => f.write_str("*x")?,
        }
        write_type(ctx, f, tensor.elem())?;
        return f.write_char('>');
    }

    let data = ctx.types.get(ty);
    write!(f, "{}.{}", data.dialect, data.name)?;
    if !data.params.is_empty() {
        f.write_char('(')?;
        for (i, &param) in data.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, param)?;
        }
        f.write_char(')')?;
    }
    if !data.attrs.is_empty() {
        f.write_str(" {")?;
        for (i, (key, val)) in data.attrs.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = ")?;
            write_attribute(ctx, f, val)?;
        }
        f.write_char('}')?;
    }
    Ok(())
}

fn write_attribute(ctx: &IrContext, f: &mut impl Write, attr: &Attribute) -> fmt::Result {
    match attr {
        Attribute::Unit => f.write_str("unit"),
        Attribute::Bool(b) => write!(f, "{b}"),
        Attribute::IntBits(v) => write!(f, "{v}"),
        Attribute::String(s) => write!(f, "{s:?}"),
        Attribute::Symbol(sym) => write_symbol(f, *sym),
        Attribute::Type(ty) => write_type(ctx, f, *ty),
        Attribute::List(items) => {
            f.write_char('[')?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write_attribute(ctx, f, item)?;
            }
            f.write_char(']')
        }
    }
}

fn write_symbol(f: &mut impl Write, sym: Symbol) -> fmt::Result {
    sym.with_str(|s| {
        if !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_') {
            write!(f, "@{s}")
        } else {
            write!(f, "@{s:?}")
        }
    })
}

// ============================================================================
// Operations
// ============================================================================

fn print_operation(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let data = state.ctx.op(op);
    if data.is(Symbol::new("core"), Symbol::new("module")) {
        return print_module_op(state, f, op, indent);
    }
    if data.is(Symbol::new("func"), Symbol::new("func")) {
        return print_func_op(state, f, op, indent);
    }
    print_generic_op(state, f, op, indent)
}

fn print_generic_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    write!(f, "{:indent$}", "")?;

    let results = ctx.op_results(op);
    if !results.is_empty() {
        for (i, &v) in results.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let n = state.define(v);
            write!(f, "%{n}")?;
        }
        f.write_str(" = ")?;
    }

    let data = ctx.op(op);
    write!(f, "{}.{}", data.dialect, data.name)?;

    for (i, &v) in ctx.op_operands(op).iter().enumerate() {
        f.write_str(if i == 0 { " " } else { ", " })?;
        state.write_use(f, v)?;
    }

    if !data.attributes.is_empty() {
        f.write_str(" {")?;
        for (i, (key, val)) in data.attributes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{key} = ")?;
            write_attribute(ctx, f, val)?;
        }
        f.write_char('}')?;
    }

    let result_types = ctx.op_result_types(op);
    if !result_types.is_empty() {
        f.write_str(" : ")?;
        for (i, &ty) in result_types.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write_type(ctx, f, ty)?;
        }
    }

    for &region in &data.regions {
        f.write_str(" {\n")?;
        print_region(state, f, region, indent + 2)?;
        write!(f, "{:indent$}}}", "")?;
    }

    f.write_char('\n')
}

fn print_region(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    region: RegionRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    for (i, &block) in ctx.region(region).blocks.iter().enumerate() {
        let args = ctx.block_args(block);
        if !args.is_empty() || i > 0 {
            write!(f, "{:indent$}^bb{i}", "")?;
            if !args.is_empty() {
                f.write_char('(')?;
                for (j, &arg) in args.iter().enumerate() {
                    if j > 0 {
                        f.write_str(", ")?;
                    }
                    let n = state.define(arg);
                    write!(f, "%{n}: ")?;
                    write_type(ctx, f, ctx.value_ty(arg))?;
                }
                f.write_char(')')?;
            }
            f.write_str(":\n")?;
        }
        for &op in &ctx.block(block).ops {
            print_operation(state, f, op, indent + 2)?;
        }
    }
    Ok(())
}

fn print_module_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    write!(f, "{:indent$}core.module", "")?;
    if let Some(Attribute::Symbol(name)) = data.attributes.get(&Symbol::new("sym_name")) {
        f.write_char(' ')?;
        write_symbol(f, *name)?;
    }
    f.write_str(" {\n")?;
    if let Some(&region) = data.regions.first() {
        for &block in &ctx.region(region).blocks {
            for &child in &ctx.block(block).ops {
                state.reset();
                print_operation(state, f, child, indent + 2)?;
            }
        }
    }
    writeln!(f, "{:indent$}}}", "")
}

fn print_func_op(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    op: OpRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.op(op);
    write!(f, "{:indent$}func.func", "")?;
    if let Some(Attribute::Symbol(name)) = data.attributes.get(&Symbol::new("sym_name")) {
        f.write_char(' ')?;
        write_symbol(f, *name)?;
    }

    let Some(&region) = data.regions.first() else {
        return f.write_char('\n');
    };
    let blocks = &ctx.region(region).blocks;

    f.write_char('(')?;
    if let Some(&entry) = blocks.first() {
        for (i, &arg) in ctx.block_args(entry).iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            let n = state.define(arg);
            write!(f, "%{n}: ")?;
            write_type(ctx, f, ctx.value_ty(arg))?;
        }
    }
    f.write_char(')')?;

    if let Some(Attribute::Type(fn_ty)) = data.attributes.get(&Symbol::new("type"))
        && let Some(&result) = ctx.types.get(*fn_ty).params.first()
    {
        f.write_str(" -> ")?;
        write_type(ctx, f, result)?;
    }
    f.write_str(" {\n")?;

    for &block in blocks {
        for &child in &ctx.block(block).ops {
            print_operation(state, f, child, indent + 2)?;
        }
    }
    writeln!(f, "{:indent$}}}", "")
}
