//! The abstract XAG: n-ary XOR nodes and PO-only complementation.
//!
//! Edges of the abstract form carry no complement flag at all; the only
//! complement bits live in the primary-output list. XOR nodes are flat:
//! their fanins are base nodes (inputs and ANDs), never other XORs, so a
//! node's linear fanin is directly readable.

use rustc_hash::FxHashMap;

use crate::network::{Node, NodeId, Signal, Xag};

/// Index of a node in an abstract XAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AId(pub u32);

impl AId {
    /// The index as a usize.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// An abstract-XAG node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ANode {
    /// A primary input with its creation index.
    Input(u32),
    /// A 2-input AND over base nodes.
    And([AId; 2]),
    /// An n-ary XOR over base nodes, fan-in >= 2, sorted.
    Xor(Vec<AId>),
}

/// A primary output: a node reference (or the constant, for `None`) plus
/// the only complement flag of the representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct APo {
    /// The driven node; `None` means constant false before complementation.
    pub node: Option<AId>,
    /// Whether the output edge is complemented.
    pub complemented: bool,
}

/// An XAG normalized to n-ary XORs with complementation pushed to the POs.
#[derive(Debug, Clone, Default)]
pub struct AbstractXag {
    nodes: Vec<ANode>,
    inputs: Vec<AId>,
    outputs: Vec<APo>,
}

impl AbstractXag {
    /// Convert an XAG into abstract form.
    ///
    /// Every signal is tracked as a parity bit plus a sorted set of base
    /// nodes whose XOR it equals. AND gates over compound or complemented
    /// sides are normalized with `(a ⊕ 1) ∧ b = (a ∧ b) ⊕ b`, so each XAG
    /// AND maps to at most one abstract AND: the count is preserved except
    /// for degenerate gates whose sides resolve to a constant or to equal
    /// linear forms, which fold away.
    pub fn from_xag(xag: &Xag) -> Self {
        Converter::new(xag).run()
    }

    /// Number of primary inputs.
    pub fn num_pis(&self) -> usize {
        self.inputs.len()
    }

    /// Primary inputs in creation order.
    pub fn pis(&self) -> &[AId] {
        &self.inputs
    }

    /// Primary outputs in creation order.
    pub fn pos(&self) -> &[APo] {
        &self.outputs
    }

    /// The node behind an id.
    pub fn node(&self, id: AId) -> &ANode {
        &self.nodes[id.index()]
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the network has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the node is an AND gate.
    pub fn is_and(&self, id: AId) -> bool {
        matches!(self.node(id), ANode::And(..))
    }

    /// Whether the node is an n-ary XOR gate.
    pub fn is_xor(&self, id: AId) -> bool {
        matches!(self.node(id), ANode::Xor(..))
    }

    /// AND nodes in topological (index) order.
    pub fn and_nodes(&self) -> Vec<AId> {
        (0..self.nodes.len() as u32)
            .map(AId)
            .filter(|id| self.is_and(*id))
            .collect()
    }

    /// Number of AND gates: the multiplicative complexity.
    pub fn and_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, ANode::And(..)))
            .count()
    }

    /// The fanins of an AND node.
    pub fn and_fanins(&self, id: AId) -> [AId; 2] {
        match self.node(id) {
            ANode::And(fanins) => *fanins,
            other => panic!("and_fanins on non-AND node: {other:?}"),
        }
    }

    /// The set of base nodes reachable through XOR-only paths: the node's
    /// own fanins for an XOR, the node itself otherwise.
    pub fn linear_fanin(&self, id: AId) -> Vec<AId> {
        match self.node(id) {
            ANode::Xor(fanins) => fanins.clone(),
            _ => vec![id],
        }
    }

    /// Evaluate all primary outputs for one input assignment.
    pub fn simulate(&self, assignment: &[bool]) -> Vec<bool> {
        assert_eq!(assignment.len(), self.num_pis());
        let mut values = vec![false; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            values[index] = match node {
                ANode::Input(i) => assignment[*i as usize],
                ANode::And([a, b]) => values[a.index()] && values[b.index()],
                ANode::Xor(fanins) => fanins
                    .iter()
                    .fold(false, |acc, f| acc ^ values[f.index()]),
            };
        }
        self.outputs
            .iter()
            .map(|po| {
                let value = po.node.map(|id| values[id.index()]).unwrap_or(false);
                value ^ po.complemented
            })
            .collect()
    }
}

/// A signal of the source XAG expressed as parity plus a sorted base set.
type LinearForm = (Vec<u32>, bool);

struct Converter<'x> {
    xag: &'x Xag,
    nodes: Vec<ANode>,
    inputs: Vec<AId>,
    forms: Vec<LinearForm>,
    xor_cache: FxHashMap<Vec<u32>, AId>,
}

impl<'x> Converter<'x> {
    fn new(xag: &'x Xag) -> Self {
        Self {
            xag,
            nodes: Vec::new(),
            inputs: Vec::new(),
            forms: Vec::with_capacity(xag.len()),
            xor_cache: FxHashMap::default(),
        }
    }

    fn run(mut self) -> AbstractXag {
        for index in 0..self.xag.len() {
            let form = match self.xag.node(NodeId(index as u32)) {
                Node::Constant => (vec![], false),
                Node::Input(i) => {
                    let id = AId(self.nodes.len() as u32);
                    self.nodes.push(ANode::Input(*i));
                    self.inputs.push(id);
                    (vec![id.0], false)
                }
                Node::Xor(a, b) => {
                    let fa = self.edge_form(*a);
                    let fb = self.edge_form(*b);
                    (symmetric_difference(&fa.0, &fb.0), fa.1 ^ fb.1)
                }
                Node::And(a, b) => {
                    let fa = self.edge_form(*a);
                    let fb = self.edge_form(*b);
                    self.convert_and(fa, fb)
                }
            };
            self.forms.push(form);
        }

        let pos = self.xag.pos().to_vec();
        let mut outputs = Vec::with_capacity(pos.len());
        for po in pos {
            let (set, parity) = self.edge_form(po);
            outputs.push(APo {
                node: self.node_for_set(&set),
                complemented: parity,
            });
        }

        AbstractXag {
            nodes: self.nodes,
            inputs: self.inputs,
            outputs,
        }
    }

    fn edge_form(&self, signal: Signal) -> LinearForm {
        let (set, parity) = &self.forms[signal.node().index()];
        (set.clone(), parity ^ signal.is_complemented())
    }

    fn convert_and(&mut self, (sa, pa): LinearForm, (sb, pb): LinearForm) -> LinearForm {
        // A degenerate constant side folds the gate away instead of
        // producing an AND over nothing.
        if sa.is_empty() {
            return if pa { (sb, pb) } else { (vec![], false) };
        }
        if sb.is_empty() {
            return if pb { (sa, pa) } else { (vec![], false) };
        }
        // Structurally distinct XOR trees can resolve to the same linear
        // form; folding here keeps the writer's AND fanins distinct.
        if sa == sb {
            return if pa == pb { (sa, pa) } else { (vec![], false) };
        }

        let left = self.node_for_set(&sa).expect("nonempty set");
        let right = self.node_for_set(&sb).expect("nonempty set");
        let id = AId(self.nodes.len() as u32);
        self.nodes.push(ANode::And([left, right]));

        // (xor(sa) ^ pa) & (xor(sb) ^ pb)
        //   = and ^ pa*xor(sb) ^ pb*xor(sa) ^ pa*pb
        let mut set = vec![id.0];
        if pa {
            set = symmetric_difference(&set, &sb);
        }
        if pb {
            set = symmetric_difference(&set, &sa);
        }
        (set, pa && pb)
    }

    fn node_for_set(&mut self, set: &[u32]) -> Option<AId> {
        match set {
            [] => None,
            [single] => Some(AId(*single)),
            _ => {
                if let Some(&id) = self.xor_cache.get(set) {
                    return Some(id);
                }
                let id = AId(self.nodes.len() as u32);
                self.nodes
                    .push(ANode::Xor(set.iter().map(|raw| AId(*raw)).collect()));
                self.xor_cache.insert(set.to_vec(), id);
                Some(id)
            }
        }
    }
}

/// Symmetric difference of two sorted sets: XOR over GF(2) linear forms.
fn symmetric_difference(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_equivalent(xag: &Xag, axag: &AbstractXag) {
        let n = xag.num_pis();
        assert!(n <= 10, "exhaustive check only for small networks");
        for bits in 0..1u32 << n {
            let assignment: Vec<bool> = (0..n).map(|i| bits >> i & 1 == 1).collect();
            assert_eq!(
                xag.simulate(&assignment),
                axag.simulate(&assignment),
                "assignment {bits:b}"
            );
        }
    }

    #[test]
    fn test_identity_conversion() {
        let mut xag = Xag::new();
        let a = xag.create_pi();
        xag.create_po(a);

        let axag = AbstractXag::from_xag(&xag);
        assert_eq!(axag.and_count(), 0);
        assert_eq!(axag.pos().len(), 1);
        assert!(!axag.pos()[0].complemented);
        assert_equivalent(&xag, &axag);
    }

    #[test]
    fn test_xor_chain_fuses() {
        let mut xag = Xag::new();
        let signals: Vec<_> = (0..5).map(|_| xag.create_pi()).collect();
        let parity = xag.create_nary_xor(&signals);
        xag.create_po(parity);

        let axag = AbstractXag::from_xag(&xag);
        assert_eq!(axag.and_count(), 0);
        let po = axag.pos()[0];
        let fanin = axag.linear_fanin(po.node.unwrap());
        assert_eq!(fanin.len(), 5);
        assert_equivalent(&xag, &axag);
    }

    #[test]
    fn test_complement_pushed_to_po() {
        let mut xag = Xag::new();
        let a = xag.create_pi();
        let b = xag.create_pi();
        // !(a & !b): complemented edges internally
        let g = xag.create_and(a, !b);
        xag.create_po(!g);

        let axag = AbstractXag::from_xag(&xag);
        assert_eq!(axag.and_count(), 1);
        assert_equivalent(&xag, &axag);
    }

    #[test]
    fn test_and_count_preserved() {
        let mut xag = Xag::new();
        let a = xag.create_pi();
        let b = xag.create_pi();
        let c = xag.create_pi();
        let m = xag.create_maj(a, b, c);
        let x = xag.create_xor(m, c);
        let g = xag.create_and(x, !a);
        xag.create_po(g);
        xag.create_po(!m);

        let before = xag.and_count();
        let axag = AbstractXag::from_xag(&xag);
        assert_eq!(axag.and_count(), before);
        assert_equivalent(&xag, &axag);
    }

    #[test]
    fn test_and_over_equal_linear_forms_folds() {
        // a ⊕ (b ⊕ c) and (a ⊕ b) ⊕ c are distinct nodes but the same
        // linear form; their AND must fold to the form itself
        let mut xag = Xag::new();
        let a = xag.create_pi();
        let b = xag.create_pi();
        let c = xag.create_pi();
        let ab = xag.create_xor(a, b);
        let left = xag.create_xor(ab, c);
        let bc = xag.create_xor(b, c);
        let right = xag.create_xor(a, bc);
        assert_ne!(left, right);

        let and = xag.create_and(left, right);
        xag.create_po(and);
        // and the complemented pairing is constant false
        let never = xag.create_and(left, !right);
        xag.create_po(never);

        let axag = AbstractXag::from_xag(&xag);
        assert_eq!(axag.and_count(), 0);
        assert!(axag.pos()[1].node.is_none());
        assert!(!axag.pos()[1].complemented);
        assert_equivalent(&xag, &axag);
    }

    #[test]
    fn test_constant_po() {
        let mut xag = Xag::new();
        let _ = xag.create_pi();
        let t = xag.constant(true);
        xag.create_po(t);

        let axag = AbstractXag::from_xag(&xag);
        let po = axag.pos()[0];
        assert!(po.node.is_none());
        assert!(po.complemented);
        assert_equivalent(&xag, &axag);
    }

    #[test]
    fn test_xor_nodes_are_flat_and_wide() {
        let mut xag = Xag::new();
        let a = xag.create_pi();
        let b = xag.create_pi();
        let c = xag.create_pi();
        let d = xag.create_pi();
        let ab = xag.create_xor(a, b);
        let abc = xag.create_xor(ab, c);
        let abcd = xag.create_xor(abc, d);
        let and = xag.create_and(abcd, a);
        xag.create_po(and);

        let axag = AbstractXag::from_xag(&xag);
        for id in (0..axag.len() as u32).map(AId) {
            if let ANode::Xor(fanins) = axag.node(id) {
                assert!(fanins.len() >= 2);
                for f in fanins {
                    assert!(!axag.is_xor(*f), "XOR fanins must be base nodes");
                }
            }
        }
        assert_equivalent(&xag, &axag);
    }
}
