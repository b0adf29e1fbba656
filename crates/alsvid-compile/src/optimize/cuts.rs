//! Cut rewriting with an AND-count cost function.
//!
//! Enumerates priority cuts per gate (size-bounded, limit-bounded, merged
//! pairwise from the fanin cut sets with dominated cuts removed), computes
//! each cut's local function by cone simulation, and rebuilds the network
//! bottom-up. A gate is replaced by the resynthesized cut with the largest
//! AND saving over its cone, when that saving is strictly positive; the
//! replacement is trial-built with checkpoint/rollback so structural
//! sharing is priced correctly, and bypassed cone copies dangle until the
//! final cleanup.

use itertools::Itertools;
use rustc_hash::FxHashMap;
use tracing::debug;

use alsvid_xag::{Node, NodeId, Signal, TruthTable, Xag};

use super::resynth::Resynthesizer;
use super::XagPass;

/// The cut-rewriting pass: cut size 5, cut limit 12, `mc_cost`.
pub struct CutRewriting {
    cut_size: usize,
    cut_limit: usize,
}

impl CutRewriting {
    /// Create the pass with the standard parameters.
    pub fn new() -> Self {
        Self {
            cut_size: 5,
            cut_limit: 12,
        }
    }
}

impl Default for CutRewriting {
    fn default() -> Self {
        Self::new()
    }
}

impl XagPass for CutRewriting {
    fn name(&self) -> &str {
        "cut-rewriting"
    }

    fn run(&self, xag: &Xag) -> Xag {
        let mut resyn = Resynthesizer::new();
        let mut out = Xag::new();
        let mut map: Vec<Option<Signal>> = vec![None; xag.len()];
        map[0] = Some(out.constant(false));
        for &pi in xag.pis() {
            map[pi.index()] = Some(out.create_pi());
        }

        let mut cuts: Vec<Vec<Vec<NodeId>>> = vec![Vec::new(); xag.len()];
        for index in 0..xag.len() {
            let id = NodeId(index as u32);
            let Some([a, b]) = xag.node(id).fanins() else {
                cuts[index] = vec![vec![id]];
                continue;
            };

            cuts[index] = self.merge_cuts(id, &cuts[a.node().index()], &cuts[b.node().index()]);
            map[index] = Some(self.rewrite_gate(xag, &mut out, &map, &cuts[index], id, &mut resyn));
        }

        for po in xag.pos() {
            let mapped = map[po.node().index()].expect("output cone mapped")
                ^ po.is_complemented();
            out.create_po(mapped);
        }
        let out = out.cleanup_dangling();

        // mc_cost contract: never hand back a worse network
        if out.and_count() > xag.and_count() {
            debug!("cut rewriting made things worse, keeping the input");
            xag.clone()
        } else {
            out
        }
    }
}

impl CutRewriting {
    /// Pairwise-merge the fanin cut sets into this node's cut set.
    fn merge_cuts(
        &self,
        id: NodeId,
        left: &[Vec<NodeId>],
        right: &[Vec<NodeId>],
    ) -> Vec<Vec<NodeId>> {
        let mut merged: Vec<Vec<NodeId>> = left
            .iter()
            .cartesian_product(right)
            .map(|(a, b)| {
                a.iter()
                    .merge(b.iter())
                    .dedup()
                    .copied()
                    .collect::<Vec<_>>()
            })
            .filter(|leaves| leaves.len() <= self.cut_size)
            .collect();
        merged.sort();
        merged.dedup();

        // dominance: a cut is redundant if another cut's leaves are a subset
        let dominated: Vec<bool> = merged
            .iter()
            .map(|cut| {
                merged.iter().any(|other| {
                    other != cut && other.iter().all(|leaf| cut.binary_search(leaf).is_ok())
                })
            })
            .collect();
        let mut kept: Vec<Vec<NodeId>> = merged
            .into_iter()
            .zip(dominated)
            .filter_map(|(cut, dominated)| (!dominated).then_some(cut))
            .collect();

        kept.sort_by_key(|cut| cut.len());
        kept.truncate(self.cut_limit);
        // the trivial cut stands for the node itself in fanout merges
        kept.push(vec![id]);
        kept
    }

    /// Map one gate into the rebuilt network, choosing between a direct
    /// copy and the cheapest cut resynthesis.
    ///
    /// A cut replaces the gate when its resynthesized AND cost is strictly
    /// below the AND count of the cut's cone: the cone's copies then dangle
    /// in the rebuilt network and the final cleanup drops them.
    fn rewrite_gate(
        &self,
        xag: &Xag,
        out: &mut Xag,
        map: &[Option<Signal>],
        cuts: &[Vec<NodeId>],
        id: NodeId,
        resyn: &mut Resynthesizer,
    ) -> Signal {
        let [a, b] = xag.node(id).fanins().expect("gate node");
        let fanin_a = map[a.node().index()].expect("fanin mapped") ^ a.is_complemented();
        let fanin_b = map[b.node().index()].expect("fanin mapped") ^ b.is_complemented();

        // the cut whose resynthesis saves the most ANDs over its cone
        let mut best: Option<(usize, usize, &Vec<NodeId>, TruthTable)> = None;
        for leaves in cuts.iter().filter(|leaves| leaves.len() >= 2) {
            let tt = cut_function(xag, id, leaves);
            let estimate = resyn.cost(&tt) as usize;
            let cone = cone_and_count(xag, id, leaves);
            if estimate >= cone {
                continue;
            }
            let gain = cone - estimate;
            if best.as_ref().is_none_or(|(g, ..)| gain > *g) {
                best = Some((gain, cone, leaves, tt));
            }
        }

        if let Some((_, cone, leaves, tt)) = best {
            let inputs: Vec<Signal> = leaves
                .iter()
                .map(|leaf| map[leaf.index()].expect("cut leaves mapped"))
                .collect();

            // trial build: sharing can only make the cut cheaper than the
            // estimate, but guard against it coming out worse
            let checkpoint = out.checkpoint();
            let before = out.and_count();
            let cut_signal = resyn.synthesize(out, &tt, &inputs);
            if out.and_count() - before < cone {
                return cut_signal;
            }
            out.rollback(checkpoint);
        }

        match xag.node(id) {
            Node::And(..) => out.create_and(fanin_a, fanin_b),
            Node::Xor(..) => out.create_xor(fanin_a, fanin_b),
            _ => unreachable!("gate node"),
        }
    }
}

/// Number of AND gates in the cone of `root` above the cut leaves.
fn cone_and_count(xag: &Xag, root: NodeId, leaves: &[NodeId]) -> usize {
    let mut visited = vec![root];
    let mut stack = vec![root];
    let mut count = 0;
    while let Some(node) = stack.pop() {
        if xag.is_and(node) {
            count += 1;
        }
        if let Some([a, b]) = xag.node(node).fanins() {
            for fanin in [a.node(), b.node()] {
                if !leaves.contains(&fanin) && !visited.contains(&fanin) {
                    visited.push(fanin);
                    stack.push(fanin);
                }
            }
        }
    }
    count
}

/// The local function of `root` in terms of the cut leaves.
fn cut_function(xag: &Xag, root: NodeId, leaves: &[NodeId]) -> TruthTable {
    let num_vars = leaves.len() as u32;
    let mut memo: FxHashMap<NodeId, TruthTable> = leaves
        .iter()
        .enumerate()
        .map(|(position, leaf)| (*leaf, TruthTable::var(num_vars, position as u32)))
        .collect();
    cone_tt(xag, root, num_vars, &mut memo)
}

fn cone_tt(
    xag: &Xag,
    node: NodeId,
    num_vars: u32,
    memo: &mut FxHashMap<NodeId, TruthTable>,
) -> TruthTable {
    if let Some(tt) = memo.get(&node) {
        return tt.clone();
    }
    let [a, b] = xag
        .node(node)
        .fanins()
        .expect("cut cone bottoms out at the leaves");
    let ta = {
        let tt = cone_tt(xag, a.node(), num_vars, memo);
        if a.is_complemented() { tt.not() } else { tt }
    };
    let tb = {
        let tt = cone_tt(xag, b.node(), num_vars, memo);
        if b.is_complemented() { tt.not() } else { tt }
    };
    let tt = match xag.node(node) {
        Node::And(..) => ta.and(&tb),
        Node::Xor(..) => ta.xor(&tb),
        _ => unreachable!("cut cone bottoms out at the leaves"),
    };
    memo.insert(node, tt.clone());
    tt
}
