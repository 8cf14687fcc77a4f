//! End-to-end tests: build shape programs, lower them, run the result.

mod common;

use std::ops::ControlFlow;

use common::{Fixture, init_tracing};
use trunk_ir::dialect::{arith, core, shape, tensor};
use trunk_ir::walk::{self, WalkAction};
use trunk_ir::{DialectOp, IrContext};
use trunk_shape::interp::Value;
use trunk_shape::{LoweringErrorKind, ShapeLoweringConfig, lower_module_op, lower_shape_to_standard};

/// Count ops named `dialect.name` anywhere in the module.
fn count_ops(ctx: &IrContext, module: core::Module, full_name: &str) -> usize {
    let mut count = 0;
    let _ = walk::walk_region::<()>(ctx, module.body(ctx), &mut |op| {
        if ctx.op_full_name(op) == full_name {
            count += 1;
        }
        ControlFlow::Continue(WalkAction::Advance)
    });
    count
}

fn count_dialect(ctx: &IrContext, module: core::Module, dialect: &str) -> usize {
    let mut count = 0;
    let _ = walk::walk_region::<()>(ctx, module.body(ctx), &mut |op| {
        if ctx.op(op).dialect == dialect {
            count += 1;
        }
        ControlFlow::Continue(WalkAction::Advance)
    });
    count
}

#[test]
fn shape_eq_compares_rank_and_extents() {
    let mut fx = Fixture::new();
    let extents = fx.types.extents;
    let i1 = fx.types.i1;
    fx.func("eq", &[extents, extents], i1, |b, _, args| {
        shape::shape_eq(b, args[0], args[1])
    });
    let report = fx.lower();
    assert!(report.reached_fixpoint);
    assert!(report.residue.is_empty());
    assert_eq!(count_dialect(&fx.ctx, fx.module, "shape"), 0);

    let eq = |a: &[u64], b: &[u64]| fx.call("eq", &[Value::extents(a), Value::extents(b)]);
    assert_eq!(eq(&[2, 3], &[2, 3]), Value::Bool(true));
    assert_eq!(eq(&[2, 3], &[2]), Value::Bool(false));
    assert_eq!(eq(&[2, 3], &[2, 4]), Value::Bool(false));
    assert_eq!(eq(&[], &[]), Value::Bool(true));
}

#[test]
fn shape_eq_lowering_shape() {
    let mut fx = Fixture::new();
    let extents = fx.types.extents;
    let i1 = fx.types.i1;
    fx.func("f", &[extents, extents], i1, |b, _, args| {
        shape::shape_eq(b, args[0], args[1])
    });
    fx.lower();

    insta::assert_snapshot!(fx.print(), @r"
    core.module @m {
      func.func @f(%0: tensor<?xcore.index>, %1: tensor<?xcore.index>) -> core.i1 {
        %2 = arith.constant {value = 0} : core.index
        %3 = tensor.dim %0, %2 : core.index
        %4 = tensor.dim %1, %2 : core.index
        %5 = arith.cmpi %3, %4 {predicate = @eq} : core.i1
        %6 = scf.if %5 : core.i1 {
            %7 = arith.constant {value = 1} : core.index
            %8 = arith.constant {value = true} : core.i1
            %9 = scf.for %2, %3, %7, %8 : core.i1 {
              ^bb0(%10: core.index, %11: core.i1):
                %12 = tensor.extract %0, %10 : core.index
                %13 = tensor.extract %1, %10 : core.index
                %14 = arith.cmpi %12, %13 {predicate = @eq} : core.i1
                %15 = arith.andi %11, %14 : core.i1
                scf.yield %15
            }
            scf.yield %9
        } {
            %16 = arith.constant {value = false} : core.i1
            scf.yield %16
        }
        func.return %6
      }
    }
    ");
}

#[test]
fn rank_reads_the_leading_extent() {
    let mut fx = Fixture::new();
    let (extents, index) = (fx.types.extents, fx.types.index);
    fx.func("rank", &[extents], index, |b, t, args| {
        shape::rank(b, args[0], t.index)
    });
    fx.lower();

    insta::assert_snapshot!(fx.print(), @r"
    core.module @m {
      func.func @rank(%0: tensor<?xcore.index>) -> core.index {
        %1 = arith.constant {value = 0} : core.index
        %2 = tensor.dim %0, %1 : core.index
        func.return %2
      }
    }
    ");
    assert_eq!(fx.call("rank", &[Value::extents(&[4, 5, 6])]), Value::Index(3));
    assert_eq!(fx.call("rank", &[Value::extents(&[])]), Value::Index(0));
}

#[test]
fn broadcast_computes_output_extents() {
    let mut fx = Fixture::new();
    let extents = fx.types.extents;
    fx.func("bcast2", &[extents, extents], extents, |b, t, args| {
        shape::broadcast(b, &[args[0], args[1]], t.extents)
    });
    fx.func("bcast3", &[extents, extents, extents], extents, |b, t, args| {
        shape::broadcast(b, args, t.extents)
    });
    fx.lower();

    let bcast2 = |a: &[u64], b: &[u64]| {
        fx.call("bcast2", &[Value::extents(a), Value::extents(b)])
            .as_extents()
            .expect("extent tensor")
    };
    assert_eq!(bcast2(&[5, 1], &[1, 3]), [5, 3]);
    assert_eq!(bcast2(&[7], &[2, 7]), [2, 7]);
    assert_eq!(bcast2(&[2, 7], &[7]), [2, 7]);
    assert_eq!(bcast2(&[], &[4]), [4]);
    // Incompatible extents are not diagnosed; the last non-1 extent wins.
    assert_eq!(bcast2(&[2], &[3]), [3]);
    assert_eq!(bcast2(&[3], &[2]), [2]);

    let out = fx
        .call(
            "bcast3",
            &[
                Value::extents(&[1, 4]),
                Value::extents(&[3, 1]),
                Value::extents(&[5]),
            ],
        )
        .as_extents()
        .expect("extent tensor");
    assert_eq!(out, [3, 5]);
}

#[test]
fn is_broadcastable_checks_trailing_dimensions() {
    let mut fx = Fixture::new();
    let (extents, i1) = (fx.types.extents, fx.types.i1);
    fx.func("ok", &[extents, extents], i1, |b, _, args| {
        shape::is_broadcastable(b, args[0], args[1])
    });
    fx.lower();

    let ok = |a: &[u64], b: &[u64]| fx.call("ok", &[Value::extents(a), Value::extents(b)]);
    assert_eq!(ok(&[5, 1], &[1, 3]), Value::Bool(true));
    assert_eq!(ok(&[5, 2], &[1, 3]), Value::Bool(false));
    assert_eq!(ok(&[3], &[2, 3]), Value::Bool(true));
    assert_eq!(ok(&[2, 3], &[4]), Value::Bool(false));
    assert_eq!(ok(&[], &[9, 9]), Value::Bool(true));
}

#[test]
fn reduce_clones_body_once_and_runs_it_per_extent() {
    init_tracing();
    let mut fx = Fixture::new();
    let (extents, index) = (fx.types.extents, fx.types.index);
    fx.func("sum", &[extents], index, |b, t, args| {
        let init = arith::const_index(b, 0);
        let reduce = shape::reduce(b, args[0], &[init], t.index, |b, formals| {
            let acc = arith::addi(b, formals[2], formals[1]);
            shape::r#yield(b, &[acc]);
        });
        reduce.result(b.ctx_ref())
    });
    fx.lower();

    assert_eq!(count_ops(&fx.ctx, fx.module, "arith.addi"), 1);
    assert_eq!(count_ops(&fx.ctx, fx.module, "scf.for"), 1);
    assert_eq!(count_dialect(&fx.ctx, fx.module, "shape"), 0);

    let mut interp = fx.interpreter();
    let out = interp
        .call("sum", &[Value::extents(&[3, 4, 5])])
        .expect("interpretation succeeds");
    assert_eq!(out, [Value::Index(12)]);
    assert_eq!(interp.op_count("arith.addi"), 3);
}

#[test]
fn reduce_with_several_accumulators() {
    let mut fx = Fixture::new();
    let (extents, index) = (fx.types.extents, fx.types.index);
    // Product of extents, weighted by position: returns sum(i * e_i) + prod(e_i).
    fx.func("fold", &[extents], index, |b, t, args| {
        let zero = arith::const_index(b, 0);
        let one = arith::const_index(b, 1);
        let reduce = shape::reduce(b, args[0], &[zero, one], t.index, |b, formals| {
            let weighted = arith::muli(b, formals[0], formals[1]);
            let sum = arith::addi(b, formals[2], weighted);
            let product = arith::muli(b, formals[3], formals[1]);
            shape::r#yield(b, &[sum, product]);
        });
        let results = reduce.results(b.ctx_ref()).to_vec();
        arith::addi(b, results[0], results[1])
    });
    fx.lower();

    // 0*2 + 1*3 + 2*4 = 11; 2*3*4 = 24
    assert_eq!(fx.call("fold", &[Value::extents(&[2, 3, 4])]), Value::Index(35));
    assert_eq!(fx.call("fold", &[Value::extents(&[])]), Value::Index(1));
}

#[test]
fn constants_lower_to_arith() {
    let mut fx = Fixture::new();
    let (extents, index) = (fx.types.extents, fx.types.index);
    fx.func("shape", &[], extents, |b, t, _| {
        shape::const_shape(b, &[2, 3, 4], t.extents)
    });
    fx.func("size", &[], index, |b, t, _| shape::const_size(b, 7, t.index));
    fx.func("arith", &[index, index], index, |b, t, args| {
        let sum = shape::add(b, args[0], args[1], t.index);
        shape::mul(b, sum, args[1], t.index)
    });
    fx.lower();

    assert_eq!(
        fx.call("shape", &[]).as_extents().expect("extent tensor"),
        [2, 3, 4]
    );
    assert_eq!(fx.call("size", &[]), Value::Index(7));
    assert_eq!(
        fx.call("arith", &[Value::Index(2), Value::Index(3)]),
        Value::Index(15)
    );
}

#[test]
fn any_forwards_its_first_input() {
    let mut fx = Fixture::new();
    let extents = fx.types.extents;
    let f = fx.func("any", &[extents, extents], extents, |b, t, args| {
        shape::any(b, &[args[0], args[1]], t.extents)
    });
    fx.lower();

    let entry = fx.ctx.region(f.body(&fx.ctx)).blocks[0];
    let ops = fx.ctx.block(entry).ops.to_vec();
    assert_eq!(ops.len(), 1, "only func.return remains");
    assert_eq!(fx.ctx.op_operands(ops[0]), [fx.ctx.block_arg(entry, 0)]);

    let out = fx.call("any", &[Value::extents(&[1, 2]), Value::extents(&[1, 2])]);
    assert_eq!(out.as_extents(), Some(vec![1, 2]));
}

#[test]
fn shape_of_and_get_extent_agree_with_and_without_forwarding() {
    for forward in [true, false] {
        let mut fx = Fixture::new();
        let f32 = fx.types.f32;
        let data = tensor::ranked_type(&mut fx.ctx, f32, &[Some(2), None]);
        let index = fx.types.index;
        fx.func("extent", &[data], index, |b, t, args| {
            let s = shape::shape_of(b, args[0], t.extents);
            let one = arith::const_index(b, 1);
            shape::get_extent(b, s, one, t.index)
        });
        fx.func("shape", &[data], fx.types.extents, |b, t, args| {
            shape::shape_of(b, args[0], t.extents)
        });
        fx.lower_with(&ShapeLoweringConfig {
            forward_shape_of_extents: forward,
            ..Default::default()
        });

        let mut interp = fx.interpreter();
        let out = interp
            .call("extent", &[Value::zeros(&[2, 3])])
            .expect("interpretation succeeds");
        assert_eq!(out, [Value::Index(3)], "forward = {forward}");
        let extracts = interp.op_count("tensor.extract");
        assert_eq!(extracts, usize::from(!forward), "forward = {forward}");

        let shape = fx.call("shape", &[Value::zeros(&[2, 3])]);
        assert_eq!(shape.as_extents(), Some(vec![2, 3]));
    }
}

#[test]
fn shape_of_unranked_tensor_generates_extents() {
    let mut fx = Fixture::new();
    let f32 = fx.types.f32;
    let data = tensor::unranked_type(&mut fx.ctx, f32);
    fx.func("shape", &[data], fx.types.extents, |b, t, args| {
        shape::shape_of(b, args[0], t.extents)
    });
    fx.lower();

    assert_eq!(count_ops(&fx.ctx, fx.module, "tensor.generate"), 1);
    let shape = fx.call("shape", &[Value::zeros(&[4, 1, 2])]);
    assert_eq!(shape.as_extents(), Some(vec![4, 1, 2]));
}

#[test]
fn to_extent_tensor_casts_ranked_input() {
    let mut fx = Fixture::new();
    let index = fx.types.index;
    let fixed = tensor::ranked_type(&mut fx.ctx, index, &[Some(2)]);
    fx.func("convert", &[fixed], fx.types.extents, |b, t, args| {
        shape::to_extent_tensor(b, args[0], t.extents)
    });
    fx.lower();

    assert_eq!(count_ops(&fx.ctx, fx.module, "tensor.cast"), 1);
    let out = fx.call("convert", &[Value::extents(&[6, 7])]);
    assert_eq!(out.as_extents(), Some(vec![6, 7]));
}

#[test]
fn error_carrying_types_are_left_as_residue() {
    let mut fx = Fixture::new();
    let (shape_ty, size, extents) = (fx.types.shape, fx.types.size, fx.types.extents);
    fx.func("rank", &[shape_ty], size, |b, t, args| {
        shape::rank(b, args[0], t.size)
    });
    fx.func("bcast", &[extents, extents], shape_ty, |b, t, args| {
        shape::broadcast(b, &[args[0], args[1]], t.shape)
    });
    fx.func("convert", &[size], fx.types.index, |b, _, args| {
        shape::size_to_index(b, args[0])
    });
    let before = fx.print();

    let report = fx.lower();
    assert_eq!(fx.print(), before);
    assert_eq!(report.rewrites, 0);
    let residue: Vec<String> = report
        .residue
        .iter()
        .map(|op| format!("{}.{}", op.dialect, op.name))
        .collect();
    assert_eq!(
        residue,
        ["shape.rank", "shape.broadcast", "shape.size_to_index"]
    );
}

#[test]
fn reduce_over_sizes_keeps_its_body() {
    let mut fx = Fixture::new();
    let (extents, index) = (fx.types.extents, fx.types.index);
    fx.func("sum", &[extents], index, |b, t, args| {
        let init = arith::const_index(b, 0);
        let reduce = shape::reduce(b, args[0], &[init], t.size, |b, formals| {
            let extent = shape::size_to_index(b, formals[1]);
            let acc = arith::addi(b, formals[2], extent);
            shape::r#yield(b, &[acc]);
        });
        reduce.result(b.ctx_ref())
    });

    let report = fx.lower();
    assert_eq!(report.residue.len(), 1);
    assert_eq!(report.residue[0].name, "reduce");
    assert_eq!(count_ops(&fx.ctx, fx.module, "shape.size_to_index"), 1);
    assert_eq!(count_ops(&fx.ctx, fx.module, "shape.yield"), 1);
}

#[test]
fn index_conversions_forward_their_operand() {
    let mut fx = Fixture::new();
    let index = fx.types.index;
    let f = fx.func("roundtrip", &[index], index, |b, t, args| {
        let as_index = shape::index_to_size(b, args[0], t.index);
        shape::size_to_index(b, as_index)
    });
    let report = fx.lower();
    assert!(report.residue.is_empty());

    let entry = fx.ctx.region(f.body(&fx.ctx)).blocks[0];
    let ops = fx.ctx.block(entry).ops.to_vec();
    assert_eq!(ops.len(), 1);
    assert_eq!(fx.call("roundtrip", &[Value::Index(9)]), Value::Index(9));
}

#[test]
fn unlowerable_ops_fail_the_stage() {
    let mut fx = Fixture::new();
    let index = fx.types.index;
    let unranked = tensor::unranked_type(&mut fx.ctx, index);
    fx.func("convert", &[unranked], fx.types.extents, |b, t, args| {
        shape::to_extent_tensor(b, args[0], t.extents)
    });

    let err = lower_shape_to_standard(&mut fx.ctx, fx.module, &ShapeLoweringConfig::default())
        .unwrap_err();
    let names: Vec<String> = err
        .illegal_operations()
        .iter()
        .map(|op| format!("{}.{}", op.dialect, op.name))
        .collect();
    assert_eq!(names, ["shape.to_extent_tensor"]);
    assert!(
        err.to_string()
            .starts_with("Illegal operations remain after lowering: shape.to_extent_tensor (op")
    );
}

#[test]
fn lowering_requires_a_module() {
    let mut fx = Fixture::new();
    let index = fx.types.index;
    let f = fx.func("id", &[index], index, |_, _, args| args[0]);

    let err = lower_module_op(&mut fx.ctx, f.op_ref(), &ShapeLoweringConfig::default())
        .unwrap_err();
    assert!(matches!(err.kind(), LoweringErrorKind::NotAModule(_)));
}

#[test]
fn iteration_cap_is_respected() {
    let mut fx = Fixture::new();
    let (extents, index) = (fx.types.extents, fx.types.index);
    fx.func("rank", &[extents], index, |b, t, args| {
        let s = shape::any(b, &[args[0]], t.extents);
        shape::rank(b, s, t.index)
    });
    let report = fx.lower_with(&ShapeLoweringConfig {
        max_iterations: 1,
        ..Default::default()
    });
    assert_eq!(report.iterations, 1);
    assert_eq!(report.rewrites, 2);
    assert!(!report.reached_fixpoint);
    assert_eq!(fx.call("rank", &[Value::extents(&[1, 1])]), Value::Index(2));
}
