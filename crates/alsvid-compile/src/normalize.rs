//! Register-to-memory normalization.
//!
//! The block walker handles control flow by recursing into branch successors
//! and merging one-bit results with an ITE; it has no notion of φ-functions.
//! This pass demotes every φ to a stack slot: an `alloca` in the entry
//! block, a `store` of each incoming value at the end of its predecessor,
//! and a `load` where the φ stood. Values that merely live across blocks
//! resolve through the walker's persistent value map and need no demotion.
//!
//! The pass is idempotent: a function without φs is returned untouched, so
//! reruns produce the same XAG.

use alsvid_qir::{Function, Inst, Op};
use tracing::debug;

/// Demote all φ-functions in `function` to store/load chains.
///
/// Returns true if the function was changed.
pub fn demote_phis(function: &mut Function) -> bool {
    struct DemotedPhi {
        block: usize,
        inst: usize,
        slot: alsvid_qir::LocalId,
        ty: alsvid_qir::Type,
        incoming: Vec<(alsvid_qir::Operand, String)>,
    }

    let mut demoted = Vec::new();
    for (block_index, block) in function.blocks.iter().enumerate() {
        for (inst_index, inst) in block.insts.iter().enumerate() {
            if let Op::Phi { ty, incoming } = &inst.op {
                demoted.push(DemotedPhi {
                    block: block_index,
                    inst: inst_index,
                    slot: alsvid_qir::LocalId(0), // assigned below
                    ty: ty.clone(),
                    incoming: incoming.clone(),
                });
            }
        }
    }

    if demoted.is_empty() {
        return false;
    }
    debug!(
        function = function.name.as_str(),
        phis = demoted.len(),
        "demoting phis to stack slots"
    );

    for phi in &mut demoted {
        phi.slot = function.new_local();
    }

    // Allocas go to the top of the entry block, in φ order.
    for (offset, phi) in demoted.iter().enumerate() {
        function.blocks[0].insts.insert(
            offset,
            Inst {
                result: Some(phi.slot),
                op: Op::Alloca { ty: phi.ty.clone() },
            },
        );
    }

    // Stores go in front of each predecessor's terminator.
    for phi in &demoted {
        for (value, pred_label) in &phi.incoming {
            let pred = function
                .block_index(pred_label)
                .expect("phi predecessor label exists");
            let block = &mut function.blocks[pred];
            let at = block.insts.len().saturating_sub(1);
            block.insts.insert(
                at,
                Inst {
                    result: None,
                    op: Op::Store {
                        ty: phi.ty.clone(),
                        value: value.clone(),
                        ptr: alsvid_qir::Operand::Local(phi.slot),
                    },
                },
            );
        }
    }

    // The φ itself becomes a load from the slot. Entry-block insertions
    // shifted instruction indices, account for them.
    for phi in &demoted {
        let shift = if phi.block == 0 { demoted.len() } else { 0 };
        let inst = &mut function.blocks[phi.block].insts[phi.inst + shift];
        debug_assert!(matches!(inst.op, Op::Phi { .. }));
        inst.op = Op::Load {
            ty: phi.ty.clone(),
            ptr: alsvid_qir::Operand::Local(phi.slot),
        };
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_qir::parse;

    #[test]
    fn test_no_phis_is_untouched() {
        let source = r"
            define i1 @f(i1 %a) {
              ret i1 %a
            }
        ";
        let mut module = parse(source).unwrap();
        let before = module.functions[0].clone();
        assert!(!demote_phis(&mut module.functions[0]));
        assert_eq!(module.functions[0], before);
    }

    #[test]
    fn test_demote_single_phi() {
        let source = r"
            define i1 @f(i1 %c, i1 %a, i1 %b) {
            entry:
              br i1 %c, label %then, label %else
            then:
              br label %merge
            else:
              br label %merge
            merge:
              %r = phi i1 [ %a, %then ], [ %b, %else ]
              ret i1 %r
            }
        ";
        let mut module = parse(source).unwrap();
        let f = &mut module.functions[0];
        assert!(demote_phis(f));

        // entry gained an alloca
        assert!(matches!(f.blocks[0].insts[0].op, Op::Alloca { .. }));
        // both predecessors store before their terminator
        for label in ["then", "else"] {
            let block = &f.blocks[f.block_index(label).unwrap()];
            assert!(matches!(block.insts[0].op, Op::Store { .. }));
            assert!(block.terminator().is_some());
        }
        // the phi became a load
        let merge = &f.blocks[f.block_index("merge").unwrap()];
        assert!(matches!(merge.insts[0].op, Op::Load { .. }));

        // idempotent
        let after = f.clone();
        assert!(!demote_phis(f));
        assert_eq!(*f, after);
    }
}
