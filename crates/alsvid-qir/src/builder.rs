//! Append-only instruction builder for populating function bodies.
//!
//! The circuit writer rebuilds operation bodies through this builder: it
//! resets the body to a single entry block and appends instructions,
//! allocating fresh locals for every produced value.

use crate::module::{Block, Function, Inst, Op, Operand};
use crate::types::Type;

/// Builds a single entry block into a function.
pub struct Builder<'f> {
    function: &'f mut Function,
    block: Block,
}

impl<'f> Builder<'f> {
    /// Start rebuilding `function`: the existing body is dropped and a fresh
    /// entry block is opened.
    pub fn rebuild(function: &'f mut Function) -> Self {
        function.reset_body();
        Self {
            function,
            block: Block::new("entry"),
        }
    }

    /// The local bound to parameter `index`.
    pub fn param(&self, index: usize) -> Operand {
        Operand::Local(self.function.params[index].id)
    }

    /// The type of parameter `index`.
    pub fn param_type(&self, index: usize) -> &Type {
        &self.function.params[index].ty
    }

    fn push_value(&mut self, op: Op) -> Operand {
        let result = self.function.new_local();
        self.block.insts.push(Inst {
            result: Some(result),
            op,
        });
        Operand::Local(result)
    }

    fn push_void(&mut self, op: Op) {
        self.block.insts.push(Inst { result: None, op });
    }

    /// Append a call producing a value.
    pub fn call(&mut self, ret: Type, callee: &str, args: Vec<(Type, Operand)>) -> Operand {
        self.push_value(Op::Call {
            ret,
            callee: callee.to_string(),
            args,
        })
    }

    /// Append a void call.
    pub fn call_void(&mut self, callee: &str, args: Vec<(Type, Operand)>) {
        self.push_void(Op::Call {
            ret: Type::Void,
            callee: callee.to_string(),
            args,
        });
    }

    /// Append a load of `ty` through a `ty*` pointer.
    pub fn load(&mut self, ty: Type, ptr: Operand) -> Operand {
        self.push_value(Op::Load { ty, ptr })
    }

    /// Append a bitcast.
    pub fn bitcast(&mut self, from: Type, value: Operand, to: Type) -> Operand {
        self.push_value(Op::BitCast { from, value, to })
    }

    /// Append a struct field address computation: `getelementptr %T, %T* p, i32 0, i32 field`.
    pub fn struct_gep(&mut self, struct_name: &str, ptr: Operand, field: u32) -> Operand {
        let ty = Type::named(struct_name);
        self.push_value(Op::GetElementPtr {
            ty,
            ptr,
            indices: vec![
                (Type::Int(32), Operand::Int { bits: 32, value: 0 }),
                (
                    Type::Int(32),
                    Operand::Int {
                        bits: 32,
                        value: u64::from(field),
                    },
                ),
            ],
        })
    }

    /// Close the block with `ret void` and install it as the function body.
    pub fn finish(mut self) {
        self.push_void(Op::Ret { value: None });
        self.function.blocks.push(self.block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::Op;

    #[test]
    fn test_rebuild_replaces_body() {
        let mut f = Function::new("op", vec![Type::named("Qubit").pointer_to()], Type::Void);
        f.blocks.push(Block::new("old"));

        let mut b = Builder::rebuild(&mut f);
        let q = b.param(0);
        b.call_void("__quantum__qis__x__body", vec![(Type::named("Qubit").pointer_to(), q)]);
        b.finish();

        assert_eq!(f.blocks.len(), 1);
        assert_eq!(f.blocks[0].label, "entry");
        assert_eq!(f.blocks[0].insts.len(), 2);
        assert!(matches!(
            f.blocks[0].insts.last().unwrap().op,
            Op::Ret { value: None }
        ));
    }

    #[test]
    fn test_struct_gep_indices() {
        let mut f = Function::new(
            "op",
            vec![Type::named("Tup").pointer_to()],
            Type::Void,
        );
        let mut b = Builder::rebuild(&mut f);
        let p = b.param(0);
        let gep = b.struct_gep("Tup", p, 2);
        assert!(gep.local().is_some());
        b.finish();

        match &f.blocks[0].insts[0].op {
            Op::GetElementPtr { indices, .. } => {
                assert_eq!(indices[0].1.constant(), Some(0));
                assert_eq!(indices[1].1.constant(), Some(2));
            }
            other => panic!("expected gep, got {other:?}"),
        }
    }
}
