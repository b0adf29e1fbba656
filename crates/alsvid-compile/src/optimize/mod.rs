//! XAG optimization: minimizing multiplicative complexity.
//!
//! Optimization is organized as pluggable passes with a fixed contract:
//! a pass receives an XAG, returns an XAG computing the same functions,
//! and never increases the AND count — a pass that cannot improve the
//! network returns it unchanged. The standard pipeline collapses small
//! networks to truth tables and resynthesizes them, then runs cut
//! rewriting; both are driven by the truth-table synthesizer in
//! [`resynth`].

mod cuts;
mod resynth;

pub use cuts::CutRewriting;
pub use resynth::Resynthesizer;

use rustc_hash::FxHashMap;
use tracing::debug;

use alsvid_xag::{Signal, TruthTable, Xag};

/// An XAG-to-XAG optimization pass.
///
/// Contract: the result computes the same primary outputs over the same
/// primary inputs, and `result.and_count() <= input.and_count()`.
pub trait XagPass {
    /// The pass name, for diagnostics.
    fn name(&self) -> &str;

    /// Run the pass.
    fn run(&self, xag: &Xag) -> Xag;
}

/// Collapse-and-resynthesize for networks with at most 8 inputs.
///
/// The whole network is collapsed into one truth table per output. Up to
/// 5 inputs the table is synthesized directly; above that a Shannon
/// decomposition with pivot width 5 splits it into small subfunctions
/// first. The result depends only on the computed functions, which makes
/// this stage canonical: any two implementations of the same function
/// leave with the same AND count.
pub struct CollapseResynthesis {
    max_inputs: usize,
    pivot_width: usize,
}

impl CollapseResynthesis {
    /// Create the pass with the standard parameters.
    pub fn new() -> Self {
        Self {
            max_inputs: 8,
            pivot_width: 5,
        }
    }
}

impl Default for CollapseResynthesis {
    fn default() -> Self {
        Self::new()
    }
}

impl XagPass for CollapseResynthesis {
    fn name(&self) -> &str {
        "collapse-resynthesis"
    }

    fn run(&self, xag: &Xag) -> Xag {
        if xag.num_pis() > self.max_inputs {
            return xag.clone();
        }

        let tables = xag.simulate_truth_tables();
        let mut out = Xag::new();
        let inputs: Vec<Signal> = (0..xag.num_pis()).map(|_| out.create_pi()).collect();

        let mut resyn = Resynthesizer::new();
        // one memo across all outputs, so equal subfunctions share nodes
        let mut memo: FxHashMap<TruthTable, Signal> = FxHashMap::default();
        for table in &tables {
            let signal = self.shannon(&mut out, table, &inputs, &mut resyn, &mut memo);
            out.create_po(signal);
        }

        if out.and_count() > xag.and_count() {
            xag.clone()
        } else {
            out
        }
    }
}

impl CollapseResynthesis {
    fn shannon(
        &self,
        out: &mut Xag,
        table: &TruthTable,
        inputs: &[Signal],
        resyn: &mut Resynthesizer,
        memo: &mut FxHashMap<TruthTable, Signal>,
    ) -> Signal {
        let support = table.support();
        if support.len() <= self.pivot_width {
            return resyn.synthesize_with_memo(out, table, inputs, memo);
        }
        let pivot = *support.last().expect("nonempty support");
        let low = table.cofactor(pivot, false);
        let high = table.cofactor(pivot, true);
        let low_signal = self.shannon(out, &low, inputs, resyn, memo);
        let high_signal = self.shannon(out, &high, inputs, resyn, memo);
        out.create_ite(inputs[pivot as usize], high_signal, low_signal)
    }
}

/// A sequence of passes with the AND-count contract enforced between them.
pub struct Optimizer {
    passes: Vec<Box<dyn XagPass>>,
}

impl Optimizer {
    /// The standard pipeline: collapse-resynthesis, then cut rewriting.
    pub fn standard() -> Self {
        Self {
            passes: vec![
                Box::new(CollapseResynthesis::new()),
                Box::new(CutRewriting::new()),
            ],
        }
    }

    /// An empty pipeline (returns inputs unchanged).
    pub fn empty() -> Self {
        Self { passes: vec![] }
    }

    /// Append a pass.
    pub fn add_pass(&mut self, pass: impl XagPass + 'static) {
        self.passes.push(Box::new(pass));
    }

    /// Run all passes, keeping each result only if it honors the contract.
    pub fn run(&self, mut xag: Xag) -> Xag {
        for pass in &self.passes {
            let before = xag.and_count();
            let result = pass.run(&xag);
            let after = result.and_count();
            debug!(pass = pass.name(), before, after, "optimization pass");
            if after <= before {
                xag = result.cleanup_dangling();
            }
        }
        xag
    }
}
