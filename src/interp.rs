//! Reference interpreter for lowered IR.
//!
//! Executes `func.func` bodies built from `arith`, `scf` and `tensor` ops
//! (plus `shape.cstr_require`). Only used to check what lowered code
//! computes; it knows nothing about the unlowered `shape` ops.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use smallvec::SmallVec;
use tracing::trace;
use trunk_ir::dialect::arith::{self, CmpPredicate};
use trunk_ir::dialect::tensor::TensorType;
use trunk_ir::dialect::{core, func};
use trunk_ir::{Attribute, BlockRef, DialectOp, IrContext, OpRef, RegionRef, ValueRef};

use crate::errors::{InterpError, InterpResult};

/// A runtime value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Index(u64),
    Bool(bool),
    /// Row-major elements.
    Tensor { dims: Vec<u64>, elements: Vec<Value> },
    Witness,
}

impl Value {
    /// A 1-D index tensor, the runtime form of an extent tensor.
    pub fn extents(extents: &[u64]) -> Self {
        Value::Tensor {
            dims: vec![extents.len() as u64],
            elements: extents.iter().map(|&e| Value::Index(e)).collect(),
        }
    }

    /// A data tensor of the given dimensions, filled with zeros.
    pub fn zeros(dims: &[u64]) -> Self {
        let len = dims.iter().product::<u64>() as usize;
        Value::Tensor {
            dims: dims.to_vec(),
            elements: vec![Value::Index(0); len],
        }
    }

    pub fn as_index(&self) -> Option<u64> {
        match self {
            Value::Index(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The elements of a 1-D index tensor.
    pub fn as_extents(&self) -> Option<Vec<u64>> {
        match self {
            Value::Tensor { dims, elements } if dims.len() == 1 => {
                elements.iter().map(Value::as_index).collect()
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Index(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Tensor { dims, elements } => {
                let dims: Vec<String> = dims.iter().map(u64::to_string).collect();
                let elements: Vec<String> = elements.iter().map(Value::to_string).collect();
                write!(f, "tensor<{}>[{}]", dims.join("x"), elements.join(", "))
            }
            Value::Witness => f.write_str("witness"),
        }
    }
}

/// Executes functions of one module.
pub struct Interpreter<'a> {
    ctx: &'a IrContext,
    module: core::Module,
    env: HashMap<ValueRef, Value>,
    counts: BTreeMap<String, usize>,
}

/// How a block finished.
enum Exit {
    Return(Vec<Value>),
    Yield(Vec<Value>),
}

impl<'a> Interpreter<'a> {
    pub fn new(ctx: &'a IrContext, module: core::Module) -> Self {
        Self {
            ctx,
            module,
            env: HashMap::new(),
            counts: BTreeMap::new(),
        }
    }

    /// Number of times ops named `dialect.name` were executed so far.
    pub fn op_count(&self, full_name: &str) -> usize {
        self.counts.get(full_name).copied().unwrap_or(0)
    }

    /// Execution counts per `dialect.name`.
    pub fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Call the function `name` with `args`.
    pub fn call(&mut self, name: &str, args: &[Value]) -> InterpResult<Vec<Value>> {
        let f = self
            .module
            .ops(self.ctx)
            .into_iter()
            .filter_map(|op| func::Func::from_op(self.ctx, op).ok())
            .find(|f| f.sym_name(self.ctx).is_some_and(|s| s == name))
            .ok_or_else(|| InterpError::FunctionNotFound(name.to_owned()))?;

        match self.run_region(f.body(self.ctx), args.to_vec())? {
            Exit::Return(values) => Ok(values),
            Exit::Yield(_) => Err(InterpError::UnsupportedOperation(
                "yield at function level".to_owned(),
            )),
        }
    }

    fn run_region(&mut self, region: RegionRef, args: Vec<Value>) -> InterpResult<Exit> {
        let Some(&block) = self.ctx.region(region).blocks.first() else {
            return Ok(Exit::Yield(Vec::new()));
        };
        self.run_block(block, args)
    }

    /// Run a region and return the values its terminator yields.
    fn run_nested(&mut self, region: RegionRef, args: Vec<Value>) -> InterpResult<Vec<Value>> {
        match self.run_region(region, args)? {
            Exit::Yield(values) => Ok(values),
            Exit::Return(_) => Err(InterpError::UnsupportedOperation(
                "return inside a nested region".to_owned(),
            )),
        }
    }

    fn run_block(&mut self, block: BlockRef, args: Vec<Value>) -> InterpResult<Exit> {
        let ctx = self.ctx;
        let formals = ctx.block_args(block);
        if formals.len() != args.len() {
            return Err(InterpError::ArityMismatch {
                op: format!("{block}"),
                expected: formals.len(),
                actual: args.len(),
            });
        }
        for (&formal, arg) in formals.iter().zip(args) {
            self.env.insert(formal, arg);
        }

        for &op in &ctx.block(block).ops {
            if let Some(exit) = self.run_op(op)? {
                return Ok(exit);
            }
        }
        Ok(Exit::Yield(Vec::new()))
    }

    fn get(&self, v: ValueRef) -> InterpResult<&Value> {
        self.env
            .get(&v)
            .ok_or_else(|| InterpError::Undefined(v.to_string()))
    }

    fn operands(&self, op: OpRef) -> InterpResult<Vec<Value>> {
        self.ctx
            .op_operands(op)
            .iter()
            .map(|&v| self.get(v).cloned())
            .collect()
    }

    fn index(&self, op: &str, v: &Value) -> InterpResult<u64> {
        v.as_index().ok_or_else(|| mismatch(op, "index"))
    }

    fn boolean(&self, op: &str, v: &Value) -> InterpResult<bool> {
        v.as_bool().ok_or_else(|| mismatch(op, "i1"))
    }

    fn run_op(&mut self, op: OpRef) -> InterpResult<Option<Exit>> {
        let ctx = self.ctx;
        let name = ctx.op_full_name(op);
        *self.counts.entry(name.clone()).or_default() += 1;
        trace!(op = %name, "exec");

        let args = self.operands(op)?;
        let results: SmallVec<[Value; 2]> = match name.as_str() {
            "func.return" => return Ok(Some(Exit::Return(args))),
            "scf.yield" | "tensor.yield" => return Ok(Some(Exit::Yield(args))),

            "arith.constant" => {
                let constant = arith::Constant::from_op(self.ctx, op)
                    .map_err(|_| mismatch(&name, "arith.constant"))?;
                match constant.value(self.ctx) {
                    Some(Attribute::IntBits(n)) => smallvec::smallvec![Value::Index(*n)],
                    Some(Attribute::Bool(b)) => smallvec::smallvec![Value::Bool(*b)],
                    _ => return Err(mismatch(&name, "integer or boolean value")),
                }
            }
            "arith.addi" | "arith.subi" | "arith.muli" => {
                let [lhs, rhs] = self.pair(&name, &args)?;
                let (lhs, rhs) = (self.index(&name, lhs)?, self.index(&name, rhs)?);
                let value = match name.as_str() {
                    "arith.addi" => lhs.wrapping_add(rhs),
                    "arith.subi" => lhs.wrapping_sub(rhs),
                    _ => lhs.wrapping_mul(rhs),
                };
                smallvec::smallvec![Value::Index(value)]
            }
            "arith.andi" | "arith.ori" => {
                let [lhs, rhs] = self.pair(&name, &args)?;
                let value = match (lhs, rhs) {
                    (Value::Bool(l), Value::Bool(r)) => Value::Bool(if name == "arith.andi" {
                        *l && *r
                    } else {
                        *l || *r
                    }),
                    (Value::Index(l), Value::Index(r)) => Value::Index(if name == "arith.andi" {
                        l & r
                    } else {
                        l | r
                    }),
                    _ => return Err(mismatch(&name, "matching integer operands")),
                };
                smallvec::smallvec![value]
            }
            "arith.cmpi" => {
                let predicate = arith::CmpI::from_op(self.ctx, op)
                    .ok()
                    .and_then(|cmp| cmp.predicate(self.ctx))
                    .ok_or_else(|| mismatch(&name, "comparison predicate"))?;
                let [lhs, rhs] = self.pair(&name, &args)?;
                let value = match (lhs, rhs) {
                    (Value::Index(l), Value::Index(r)) => predicate.eval(*l, *r),
                    (Value::Bool(l), Value::Bool(r)) => predicate.eval(*l as u64, *r as u64),
                    _ => return Err(mismatch(&name, "matching integer operands")),
                };
                smallvec::smallvec![Value::Bool(value)]
            }
            "arith.select" => {
                let [cond, on_true, on_false] = self.triple(&name, args)?;
                let cond = self.boolean(&name, &cond)?;
                smallvec::smallvec![if cond { on_true } else { on_false }]
            }

            "scf.if" => {
                let cond = self.boolean(&name, args.first().ok_or_else(|| arity(&name, 1, 0))?)?;
                let regions = &ctx.op(op).regions;
                let region = if cond { regions[0] } else { regions[1] };
                self.run_nested(region, Vec::new())?.into()
            }
            "scf.for" => {
                if args.len() < 3 {
                    return Err(arity(&name, 3, args.len()));
                }
                let lower = self.index(&name, &args[0])?;
                let upper = self.index(&name, &args[1])?;
                let step = self.index(&name, &args[2])?;
                if step == 0 {
                    return Err(mismatch(&name, "non-zero step"));
                }
                let body = self.ctx.op(op).regions[0];
                let mut carried = args[3..].to_vec();
                let mut iv = lower;
                while iv < upper {
                    let mut frame = Vec::with_capacity(carried.len() + 1);
                    frame.push(Value::Index(iv));
                    frame.extend(carried);
                    carried = self.run_nested(body, frame)?;
                    iv += step;
                }
                carried.into()
            }

            "tensor.dim" => {
                let [source, axis] = self.pair(&name, &args)?;
                let axis = self.index(&name, axis)?;
                let dims = tensor_dims(&name, source)?;
                let extent = dims.get(axis as usize).copied().ok_or(InterpError::OutOfBounds {
                    index: axis,
                    extent: dims.len() as u64,
                })?;
                smallvec::smallvec![Value::Index(extent)]
            }
            "tensor.rank" => {
                let source = args.first().ok_or_else(|| arity(&name, 1, 0))?;
                smallvec::smallvec![Value::Index(tensor_dims(&name, source)?.len() as u64)]
            }
            "tensor.extract" => {
                let (source, indices) = args.split_first().ok_or_else(|| arity(&name, 1, 0))?;
                let Value::Tensor { dims, elements } = source else {
                    return Err(mismatch(&name, "tensor"));
                };
                if indices.len() != dims.len() {
                    return Err(arity(&name, dims.len() + 1, args.len()));
                }
                let mut offset = 0u64;
                for (value, &extent) in indices.iter().zip(dims) {
                    let index = self.index(&name, value)?;
                    if index >= extent {
                        return Err(InterpError::OutOfBounds { index, extent });
                    }
                    offset = offset * extent + index;
                }
                smallvec::smallvec![elements[offset as usize].clone()]
            }
            "tensor.from_elements" => {
                let dims = vec![args.len() as u64];
                smallvec::smallvec![Value::Tensor {
                    dims,
                    elements: args,
                }]
            }
            "tensor.generate" => smallvec::smallvec![self.generate(op, &name, &args)?],
            "tensor.cast" => {
                let source = args.into_iter().next().ok_or_else(|| arity(&name, 1, 0))?;
                tensor_dims(&name, &source)?;
                smallvec::smallvec![source]
            }

            "shape.cstr_require" => {
                let holds = self.boolean(&name, args.first().ok_or_else(|| arity(&name, 1, 0))?)?;
                if !holds {
                    let msg = match self.ctx.op(op).attributes.get(&trunk_ir::Symbol::new("msg")) {
                        Some(Attribute::String(msg)) => msg.clone(),
                        _ => String::new(),
                    };
                    return Err(InterpError::RequirementFailed(msg));
                }
                smallvec::smallvec![Value::Witness]
            }

            _ => return Err(InterpError::UnsupportedOperation(name)),
        };

        let defined = ctx.op_results(op);
        if defined.len() != results.len() {
            return Err(arity(&name, defined.len(), results.len()));
        }
        for (&v, value) in defined.iter().zip(results) {
            self.env.insert(v, value);
        }
        Ok(None)
    }

    fn generate(&mut self, op: OpRef, name: &str, args: &[Value]) -> InterpResult<Value> {
        let result_ty = self.ctx.op_result_types(op)[0];
        let Some(TensorType::Ranked { dims, .. }) = TensorType::from_type(self.ctx, result_ty)
        else {
            return Err(mismatch(name, "ranked result type"));
        };

        let mut dynamic = args.iter();
        let mut extents = Vec::with_capacity(dims.len());
        for dim in dims {
            let extent = match dim {
                Some(n) => n,
                None => {
                    let value = dynamic.next().ok_or_else(|| arity(name, args.len() + 1, args.len()))?;
                    self.index(name, value)?
                }
            };
            extents.push(extent);
        }

        let body = self.ctx.op(op).regions[0];
        let len = extents.iter().product::<u64>();
        let mut elements = Vec::with_capacity(len as usize);
        for linear in 0..len {
            let mut coords = vec![Value::Index(0); extents.len()];
            let mut rest = linear;
            for (slot, &extent) in coords.iter_mut().zip(&extents).rev() {
                *slot = Value::Index(rest % extent);
                rest /= extent;
            }
            let mut yielded = self.run_nested(body, coords)?;
            if yielded.len() != 1 {
                return Err(arity("tensor.yield", 1, yielded.len()));
            }
            elements.push(yielded.remove(0));
        }
        Ok(Value::Tensor {
            dims: extents,
            elements,
        })
    }

    fn pair<'v>(&self, op: &str, args: &'v [Value]) -> InterpResult<[&'v Value; 2]> {
        match args {
            [a, b] => Ok([a, b]),
            _ => Err(arity(op, 2, args.len())),
        }
    }

    fn triple(&self, op: &str, args: Vec<Value>) -> InterpResult<[Value; 3]> {
        let actual = args.len();
        <[Value; 3]>::try_from(args).map_err(|_| arity(op, 3, actual))
    }
}

fn tensor_dims<'v>(op: &str, v: &'v Value) -> InterpResult<&'v [u64]> {
    match v {
        Value::Tensor { dims, .. } => Ok(dims),
        _ => Err(mismatch(op, "tensor")),
    }
}

fn mismatch(op: &str, expected: &'static str) -> InterpError {
    InterpError::TypeMismatch {
        op: op.to_owned(),
        expected,
    }
}

fn arity(op: &str, expected: usize, actual: usize) -> InterpError {
    InterpError::ArityMismatch {
        op: op.to_owned(),
        expected,
        actual,
    }
}
