//! Dialect definitions: typed op wrappers, type helpers and constructors.

pub mod arith;
pub mod core;
pub mod func;
pub mod scf;
pub mod shape;
pub mod tensor;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{BlockSink, Builder};
    use crate::context::{BlockData, IrContext};
    use crate::ops::DialectOp;
    use crate::types::Attribute;

    #[test]
    fn tensor_type_decodes_dims() {
        let mut ctx = IrContext::new();
        let f32 = core::f32_type(&mut ctx);
        let ty = tensor::ranked_type(&mut ctx, f32, &[Some(2), None]);

        let decoded = tensor::TensorType::from_type(&ctx, ty).expect("ranked tensor");
        assert_eq!(decoded.rank(), Some(2));
        assert_eq!(decoded.elem(), f32);
        assert_eq!(decoded.intern(&mut ctx), ty);
        assert_eq!(tensor::static_extent(&ctx, ty, 0), Some(2));
        assert_eq!(tensor::static_extent(&ctx, ty, 1), None);

        let unranked = tensor::unranked_type(&mut ctx, f32);
        assert_eq!(
            tensor::TensorType::from_type(&ctx, unranked),
            Some(tensor::TensorType::Unranked { elem: f32 })
        );
        assert_eq!(tensor::TensorType::from_type(&ctx, f32), None);
    }

    #[test]
    fn error_carrying_types() {
        let mut ctx = IrContext::new();
        let shape_ty = shape::shape_type(&mut ctx);
        let size_ty = shape::size_type(&mut ctx);
        let witness = shape::witness_type(&mut ctx);
        let extents = tensor::extent_tensor_type(&mut ctx);

        assert!(shape::is_error_carrying(&ctx, shape_ty));
        assert!(shape::is_error_carrying(&ctx, size_ty));
        assert!(!shape::is_error_carrying(&ctx, witness));
        assert!(!shape::is_error_carrying(&ctx, extents));
    }

    #[test]
    fn constructors_round_trip() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let block = ctx.create_block(BlockData::new(loc, []));
        let extents = tensor::extent_tensor_type(&mut ctx);
        let mut sink = BlockSink(block);
        let mut b = Builder::new(&mut ctx, &mut sink, loc);

        let s = shape::const_shape(&mut b, &[2, 3], extents);
        let two = arith::const_index(&mut b, 2);
        let cmp = arith::cmpi(&mut b, arith::CmpPredicate::Ule, two, two);
        let index = core::index_type(b.ctx());
        let red = shape::reduce(&mut b, s, &[two], index, |b, args| {
            let sum = arith::addi(b, args[1], args[2]);
            shape::r#yield(b, &[sum]);
        });

        let const_shape = ctx.defining_op(s).expect("op result");
        let const_shape = shape::ConstShape::from_op(&ctx, const_shape).expect("const_shape");
        assert_eq!(const_shape.extents(&ctx).as_deref(), Some(&[2, 3][..]));

        let cmp = arith::CmpI::from_op(&ctx, ctx.defining_op(cmp).expect("op result"))
            .expect("cmpi");
        assert_eq!(cmp.predicate(&ctx), Some(arith::CmpPredicate::Ule));
        assert_eq!(
            cmp.attr(&ctx, "predicate"),
            Some(&Attribute::Symbol(crate::Symbol::new("ule")))
        );

        assert_eq!(red.shape(&ctx), s);
        assert_eq!(red.inits(&ctx), &[two]);
        let body = red.single_block(&ctx).expect("single block body");
        assert_eq!(ctx.block_args(body).len(), 3);
        assert_eq!(ctx.block(block).ops.len(), 4);
    }

    #[test]
    fn for_loop_carries_values() {
        let mut ctx = IrContext::new();
        let loc = ctx.location("test");
        let block = ctx.create_block(BlockData::new(loc, []));
        let mut sink = BlockSink(block);
        let mut b = Builder::new(&mut ctx, &mut sink, loc);

        let zero = arith::const_index(&mut b, 0);
        let one = arith::const_index(&mut b, 1);
        let init = arith::const_bool(&mut b, true);
        let lp = scf::r#for(&mut b, zero, one, one, &[init], |b, iv, iters| {
            let _ = iv;
            scf::r#yield(b, iters);
        });

        assert_eq!(lp.inits(&ctx), &[init]);
        assert_eq!(lp.step(&ctx), one);
        let i1 = core::i1_type(&mut ctx);
        assert_eq!(ctx.op_result_types(lp.op_ref()), &[i1]);
    }
}
