//! Common test utilities for lowering tests.

use trunk_ir::dialect::{core, func, shape, tensor};
use trunk_ir::{Builder, IrContext, TypeRef, ValueRef};
use trunk_shape::interp::{Interpreter, Value};
use trunk_shape::{LoweringReport, ShapeLoweringConfig, lower_shape_to_standard};

/// Commonly used types, interned once per context.
#[allow(dead_code)]
pub struct Types {
    pub index: TypeRef,
    pub i1: TypeRef,
    pub f32: TypeRef,
    pub extents: TypeRef,
    pub shape: TypeRef,
    pub size: TypeRef,
}

impl Types {
    pub fn new(ctx: &mut IrContext) -> Self {
        let f32 = core::f32_type(ctx);
        Self {
            index: core::index_type(ctx),
            i1: core::i1_type(ctx),
            f32,
            extents: tensor::extent_tensor_type(ctx),
            shape: shape::shape_type(ctx),
            size: shape::size_type(ctx),
        }
    }
}

/// A module holding functions under test.
pub struct Fixture {
    pub ctx: IrContext,
    pub module: core::Module,
    pub types: Types,
}

#[allow(dead_code)]
impl Fixture {
    pub fn new() -> Self {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test.mlir");
        let module = core::Module::create(&mut ctx, loc, "m");
        let types = Types::new(&mut ctx);
        Self { ctx, module, types }
    }

    /// Add `func.func @name(inputs) -> result`; `body` returns the value to
    /// return.
    pub fn func(
        &mut self,
        name: &str,
        inputs: &[TypeRef],
        result: TypeRef,
        body: impl FnOnce(&mut Builder<'_>, &Types, &[ValueRef]) -> ValueRef,
    ) -> func::Func {
        let loc = self.ctx.location("test.mlir");
        let block = self
            .module
            .first_block(&self.ctx)
            .expect("module has a body block");
        let types = &self.types;
        func::func(&mut self.ctx, loc, block, name, inputs, result, |b, args| {
            let value = body(b, types, args);
            func::r#return(b, &[value]);
        })
    }

    pub fn lower(&mut self) -> LoweringReport {
        self.lower_with(&ShapeLoweringConfig::default())
    }

    pub fn lower_with(&mut self, config: &ShapeLoweringConfig) -> LoweringReport {
        lower_shape_to_standard(&mut self.ctx, self.module, config).expect("lowering succeeds")
    }

    pub fn print(&self) -> String {
        trunk_ir::printer::print_op(&self.ctx, trunk_ir::DialectOp::op_ref(&self.module))
    }

    pub fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(&self.ctx, self.module)
    }

    /// Call `name` and return its single result.
    pub fn call(&self, name: &str, args: &[Value]) -> Value {
        let mut results = self
            .interpreter()
            .call(name, args)
            .expect("interpretation succeeds");
        assert_eq!(results.len(), 1, "expected a single result");
        results.remove(0)
    }
}

/// Install a test-friendly tracing subscriber, honoring `RUST_LOG`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
