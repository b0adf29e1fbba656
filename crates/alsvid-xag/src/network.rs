//! The XOR-AND graph.
//!
//! Nodes live in a flat vector and are only ever appended, so a node's index
//! is always greater than the indices of its fanins and plain index order is
//! a valid topological order. Complementation lives on edges ([`Signal`]s),
//! never as inverter nodes. `create_and`/`create_xor` constant-fold and
//! structurally hash, so identical subcircuits share nodes.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::truth::TruthTable;

/// Index of a node in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// The node index as a usize.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A reference to a node with a complementation flag: the edge type of the
/// graph. Equality of the packed word defines structural identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Signal(u32);

impl Signal {
    /// Build a signal from a node and a complement flag.
    pub fn new(node: NodeId, complemented: bool) -> Self {
        Signal(node.0 << 1 | u32::from(complemented))
    }

    /// The referenced node.
    pub fn node(self) -> NodeId {
        NodeId(self.0 >> 1)
    }

    /// Whether the edge is complemented.
    pub fn is_complemented(self) -> bool {
        self.0 & 1 == 1
    }

    /// This signal with the complement flag cleared.
    #[must_use]
    pub fn plain(self) -> Self {
        Signal(self.0 & !1)
    }

    /// The raw packed word, used as a hash key.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::ops::Not for Signal {
    type Output = Signal;

    fn not(self) -> Signal {
        Signal(self.0 ^ 1)
    }
}

impl std::ops::BitXor<bool> for Signal {
    type Output = Signal;

    fn bitxor(self, complement: bool) -> Signal {
        Signal(self.0 ^ u32::from(complement))
    }
}

/// An XAG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Node {
    /// The canonical constant node (node 0, value false).
    Constant,
    /// A primary input with its creation index.
    Input(u32),
    /// A 2-input AND gate.
    And(Signal, Signal),
    /// A 2-input XOR gate.
    Xor(Signal, Signal),
}

impl Node {
    /// Fanin signals for gate nodes.
    pub fn fanins(&self) -> Option<[Signal; 2]> {
        match self {
            Node::And(a, b) | Node::Xor(a, b) => Some([*a, *b]),
            _ => None,
        }
    }
}

/// Rollback point for trial rewrites, see [`Xag::checkpoint`].
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint {
    nodes: usize,
}

/// An XOR-AND graph with primary inputs, a canonical constant, and an
/// ordered primary-output list.
#[derive(Debug, Clone, Default)]
pub struct Xag {
    nodes: Vec<Node>,
    inputs: Vec<NodeId>,
    outputs: Vec<Signal>,
    strash: FxHashMap<(bool, u32, u32), NodeId>,
}

impl Xag {
    /// Create a network containing only the constant node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Constant],
            inputs: Vec::new(),
            outputs: Vec::new(),
            strash: FxHashMap::default(),
        }
    }

    /// The constant signal of the given value.
    pub fn constant(&self, value: bool) -> Signal {
        Signal::new(NodeId(0), value)
    }

    /// Append a primary input.
    pub fn create_pi(&mut self) -> Signal {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::Input(self.inputs.len() as u32));
        self.inputs.push(id);
        Signal::new(id, false)
    }

    /// Record a primary output. Outputs keep insertion order and may repeat.
    pub fn create_po(&mut self, signal: Signal) {
        self.outputs.push(signal);
    }

    fn push_gate(&mut self, is_and: bool, a: Signal, b: Signal) -> NodeId {
        let key = (is_and, a.raw(), b.raw());
        if let Some(&id) = self.strash.get(&key) {
            return id;
        }
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(if is_and {
            Node::And(a, b)
        } else {
            Node::Xor(a, b)
        });
        self.strash.insert(key, id);
        id
    }

    /// Create (or reuse) an AND gate.
    pub fn create_and(&mut self, a: Signal, b: Signal) -> Signal {
        // constant folding
        if a.node() == NodeId(0) {
            return if a.is_complemented() { b } else { self.constant(false) };
        }
        if b.node() == NodeId(0) {
            return if b.is_complemented() { a } else { self.constant(false) };
        }
        if a == b {
            return a;
        }
        if a == !b {
            return self.constant(false);
        }

        let (a, b) = if a.raw() <= b.raw() { (a, b) } else { (b, a) };
        Signal::new(self.push_gate(true, a, b), false)
    }

    /// Create (or reuse) an XOR gate. Complementation is normalized onto the
    /// output edge so both polarities share one node.
    pub fn create_xor(&mut self, a: Signal, b: Signal) -> Signal {
        let complement = a.is_complemented() ^ b.is_complemented();
        let (a, b) = (a.plain(), b.plain());

        if a == b {
            return self.constant(complement);
        }
        if a.node() == NodeId(0) {
            return b ^ complement;
        }
        if b.node() == NodeId(0) {
            return a ^ complement;
        }

        let (a, b) = if a.raw() <= b.raw() { (a, b) } else { (b, a) };
        Signal::new(self.push_gate(false, a, b), false) ^ complement
    }

    /// NOT is a complemented edge.
    pub fn create_not(&self, a: Signal) -> Signal {
        !a
    }

    /// OR via De Morgan.
    pub fn create_or(&mut self, a: Signal, b: Signal) -> Signal {
        !self.create_and(!a, !b)
    }

    /// XNOR is a complemented XOR edge.
    pub fn create_xnor(&mut self, a: Signal, b: Signal) -> Signal {
        !self.create_xor(a, b)
    }

    /// If-then-else: `cond ? t : e`, one AND gate.
    pub fn create_ite(&mut self, cond: Signal, t: Signal, e: Signal) -> Signal {
        let te = self.create_xor(t, e);
        let gated = self.create_and(cond, te);
        self.create_xor(gated, e)
    }

    /// Majority of three, one AND gate.
    pub fn create_maj(&mut self, a: Signal, b: Signal, c: Signal) -> Signal {
        let ab = self.create_xor(a, b);
        let bc = self.create_xor(b, c);
        let gated = self.create_and(ab, bc);
        self.create_xor(gated, b)
    }

    /// N-ary AND as a balanced tree. Empty input yields constant true.
    pub fn create_nary_and(&mut self, signals: &[Signal]) -> Signal {
        self.nary(signals, self.constant(true), Self::create_and)
    }

    /// N-ary OR as a balanced tree. Empty input yields constant false.
    pub fn create_nary_or(&mut self, signals: &[Signal]) -> Signal {
        self.nary(signals, self.constant(false), Self::create_or)
    }

    /// N-ary XOR as a balanced tree. Empty input yields constant false.
    pub fn create_nary_xor(&mut self, signals: &[Signal]) -> Signal {
        self.nary(signals, self.constant(false), Self::create_xor)
    }

    fn nary(
        &mut self,
        signals: &[Signal],
        empty: Signal,
        combine: fn(&mut Self, Signal, Signal) -> Signal,
    ) -> Signal {
        match signals {
            [] => empty,
            [single] => *single,
            _ => {
                let mut layer = signals.to_vec();
                while layer.len() > 1 {
                    let mut next = Vec::with_capacity(layer.len().div_ceil(2));
                    for pair in layer.chunks(2) {
                        next.push(match pair {
                            [a, b] => combine(self, *a, *b),
                            [a] => *a,
                            _ => unreachable!("chunks(2)"),
                        });
                    }
                    layer = next;
                }
                layer[0]
            }
        }
    }

    /// The node behind an id.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Number of nodes including the constant and inputs.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the network holds only the constant node.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Number of primary inputs.
    pub fn num_pis(&self) -> usize {
        self.inputs.len()
    }

    /// Primary inputs in creation order.
    pub fn pis(&self) -> &[NodeId] {
        &self.inputs
    }

    /// Primary outputs in creation order.
    pub fn pos(&self) -> &[Signal] {
        &self.outputs
    }

    /// Iterate over gate node ids in topological (index) order.
    pub fn gates(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().enumerate().filter_map(|(i, node)| {
            matches!(node, Node::And(..) | Node::Xor(..)).then(|| NodeId(i as u32))
        })
    }

    /// Number of gates (ANDs plus XORs).
    pub fn num_gates(&self) -> usize {
        self.gates().count()
    }

    /// Number of AND gates: the multiplicative complexity.
    pub fn and_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|node| matches!(node, Node::And(..)))
            .count()
    }

    /// Whether the node is an AND gate.
    pub fn is_and(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::And(..))
    }

    /// Whether the node is an XOR gate.
    pub fn is_xor(&self, id: NodeId) -> bool {
        matches!(self.node(id), Node::Xor(..))
    }

    /// Record a rollback point before a trial rewrite.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            nodes: self.nodes.len(),
        }
    }

    /// Discard all nodes created after `checkpoint`.
    ///
    /// Inputs and outputs must not have been touched since the checkpoint.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        for index in checkpoint.nodes..self.nodes.len() {
            if let Some([a, b]) = self.nodes[index].fanins() {
                let is_and = matches!(self.nodes[index], Node::And(..));
                self.strash.remove(&(is_and, a.raw(), b.raw()));
            }
        }
        self.nodes.truncate(checkpoint.nodes);
    }

    /// Evaluate all primary outputs for one input assignment.
    pub fn simulate(&self, assignment: &[bool]) -> Vec<bool> {
        assert_eq!(assignment.len(), self.num_pis());
        let mut values = vec![false; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            values[index] = match node {
                Node::Constant => false,
                Node::Input(i) => assignment[*i as usize],
                Node::And(a, b) => self.edge(&values, *a) && self.edge(&values, *b),
                Node::Xor(a, b) => self.edge(&values, *a) ^ self.edge(&values, *b),
            };
        }
        self.outputs
            .iter()
            .map(|po| values[po.node().index()] ^ po.is_complemented())
            .collect()
    }

    fn edge(&self, values: &[bool], signal: Signal) -> bool {
        values[signal.node().index()] ^ signal.is_complemented()
    }

    /// Compute the truth table of every primary output over all inputs.
    ///
    /// Intended for the collapse step; callers bound the input count.
    pub fn simulate_truth_tables(&self) -> Vec<TruthTable> {
        let num_vars = self.num_pis() as u32;
        let mut tables: Vec<TruthTable> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let tt = match node {
                Node::Constant => TruthTable::constant(num_vars, false),
                Node::Input(i) => TruthTable::var(num_vars, *i),
                Node::And(a, b) => self.edge_tt(&tables, *a).and(&self.edge_tt(&tables, *b)),
                Node::Xor(a, b) => self.edge_tt(&tables, *a).xor(&self.edge_tt(&tables, *b)),
            };
            tables.push(tt);
        }
        self.outputs
            .iter()
            .map(|po| {
                let tt = tables[po.node().index()].clone();
                if po.is_complemented() { tt.not() } else { tt }
            })
            .collect()
    }

    fn edge_tt(&self, tables: &[TruthTable], signal: Signal) -> TruthTable {
        let tt = tables[signal.node().index()].clone();
        if signal.is_complemented() { tt.not() } else { tt }
    }

    /// Rebuild the network keeping only nodes reachable from the outputs.
    ///
    /// All primary inputs are preserved in order even when dangling, as the
    /// reader relies on the PI count matching the source signature.
    #[must_use]
    pub fn cleanup_dangling(&self) -> Xag {
        let mut out = Xag::new();
        let mut map: Vec<Option<Signal>> = vec![None; self.nodes.len()];
        map[0] = Some(out.constant(false));
        for &pi in &self.inputs {
            map[pi.index()] = Some(out.create_pi());
        }

        let mut reachable = vec![false; self.nodes.len()];
        let mut stack: Vec<NodeId> = self.outputs.iter().map(|po| po.node()).collect();
        while let Some(id) = stack.pop() {
            if reachable[id.index()] {
                continue;
            }
            reachable[id.index()] = true;
            if let Some([a, b]) = self.node(id).fanins() {
                stack.push(a.node());
                stack.push(b.node());
            }
        }

        for (index, node) in self.nodes.iter().enumerate() {
            if !reachable[index] || map[index].is_some() {
                continue;
            }
            if let Some([a, b]) = node.fanins() {
                let a = map[a.node().index()].expect("fanin mapped before use")
                    ^ a.is_complemented();
                let b = map[b.node().index()].expect("fanin mapped before use")
                    ^ b.is_complemented();
                let mapped = match node {
                    Node::And(..) => out.create_and(a, b),
                    Node::Xor(..) => out.create_xor(a, b),
                    _ => unreachable!("gate node"),
                };
                map[index] = Some(mapped);
            }
        }

        for po in &self.outputs {
            let mapped = map[po.node().index()].expect("output cone mapped")
                ^ po.is_complemented();
            out.create_po(mapped);
        }
        out
    }
}
