//! Truth-table resynthesis minimizing AND count.
//!
//! This is the database behind collapse and cut rewriting: a deterministic
//! synthesizer from truth tables to XAG subcircuits.
//!
//! - affine functions become XOR chains (zero ANDs);
//! - degree-2 functions are decomposed into products of affine forms by
//!   symplectic elimination of the quadratic coefficient matrix, which
//!   needs rank/2 ANDs and is optimal for quadratics (majority-of-3 comes
//!   out as `(a ⊕ c)(b ⊕ c) ⊕ c`, one AND);
//! - higher degrees fall back to a positive Davio expansion
//!   `f = f0 ⊕ x·(f0 ⊕ f1)` on the support variable of least memoized
//!   cost.
//!
//! Costs and synthesized signals are memoized by truth table, so equal
//! subfunctions share both the estimate and the synthesized nodes. The
//! result depends only on the truth table, which keeps the collapse stage
//! canonical.

use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

use alsvid_xag::{Signal, TruthTable, Xag};

/// An XOR of variables plus an optional complement.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AffineForm {
    vars: Vec<u32>,
    constant: bool,
}

/// How a truth table is realized.
enum Decomposition {
    Affine(AffineForm),
    /// Products of variable sets, plus an affine remainder.
    Quadratic(Vec<(Vec<u32>, Vec<u32>)>, AffineForm),
    /// Positive Davio expansion on the given variable.
    Davio(u32),
}

/// Memoizing AND-count-aware truth-table synthesizer.
pub struct Resynthesizer {
    cost_cache: FxHashMap<TruthTable, u32>,
}

impl Resynthesizer {
    /// Create a synthesizer with empty caches.
    pub fn new() -> Self {
        Self {
            cost_cache: FxHashMap::default(),
        }
    }

    /// The number of AND gates [`Self::synthesize`] will spend on `tt`,
    /// ignoring sharing with already-present nodes.
    pub fn cost(&mut self, tt: &TruthTable) -> u32 {
        if let Some(&cost) = self.cost_cache.get(tt) {
            return cost;
        }
        let cost = match self.decompose(tt) {
            Decomposition::Affine(_) => 0,
            Decomposition::Quadratic(products, _) => products.len() as u32,
            Decomposition::Davio(var) => {
                let f0 = tt.cofactor(var, false);
                let difference = f0.xor(&tt.cofactor(var, true));
                1 + self.cost(&f0) + self.cost(&difference)
            }
        };
        self.cost_cache.insert(tt.clone(), cost);
        cost
    }

    /// Synthesize `tt` over the given input signals.
    pub fn synthesize(&mut self, xag: &mut Xag, tt: &TruthTable, inputs: &[Signal]) -> Signal {
        let mut memo = FxHashMap::default();
        self.synthesize_with_memo(xag, tt, inputs, &mut memo)
    }

    /// Synthesize with an external signal memo, shared between calls that
    /// use the same input signals (the collapse stage shares one memo
    /// across all outputs so equal subfunctions reuse nodes).
    pub fn synthesize_with_memo(
        &mut self,
        xag: &mut Xag,
        tt: &TruthTable,
        inputs: &[Signal],
        memo: &mut FxHashMap<TruthTable, Signal>,
    ) -> Signal {
        if let Some(&signal) = memo.get(tt) {
            return signal;
        }
        let signal = match self.decompose(tt) {
            Decomposition::Affine(form) => self.affine_signal(xag, &form, inputs),
            Decomposition::Quadratic(products, remainder) => {
                let mut terms = Vec::with_capacity(products.len() + remainder.vars.len());
                for (u, v) in &products {
                    let left = self.vars_xor(xag, u, inputs);
                    let right = self.vars_xor(xag, v, inputs);
                    terms.push(xag.create_and(left, right));
                }
                terms.extend(remainder.vars.iter().map(|v| inputs[*v as usize]));
                xag.create_nary_xor(&terms) ^ remainder.constant
            }
            Decomposition::Davio(var) => {
                let f0 = tt.cofactor(var, false);
                let difference = f0.xor(&tt.cofactor(var, true));
                let base = self.synthesize_with_memo(xag, &f0, inputs, memo);
                let delta = self.synthesize_with_memo(xag, &difference, inputs, memo);
                let gated = xag.create_and(inputs[var as usize], delta);
                xag.create_xor(base, gated)
            }
        };
        memo.insert(tt.clone(), signal);
        signal
    }

    fn affine_signal(&self, xag: &mut Xag, form: &AffineForm, inputs: &[Signal]) -> Signal {
        let signals: Vec<Signal> = form.vars.iter().map(|v| inputs[*v as usize]).collect();
        xag.create_nary_xor(&signals) ^ form.constant
    }

    fn vars_xor(&self, xag: &mut Xag, vars: &[u32], inputs: &[Signal]) -> Signal {
        let signals: Vec<Signal> = vars.iter().map(|v| inputs[*v as usize]).collect();
        xag.create_nary_xor(&signals)
    }

    fn decompose(&mut self, tt: &TruthTable) -> Decomposition {
        let anf = tt.anf();
        let degree = anf
            .iter()
            .enumerate()
            .filter(|(_, c)| **c)
            .map(|(m, _)| m.count_ones())
            .max()
            .unwrap_or(0);

        if degree <= 1 {
            return Decomposition::Affine(affine_from_anf(&anf));
        }
        if degree == 2 {
            let (products, remainder) = decompose_quadratic(&anf, tt.num_vars());
            return Decomposition::Quadratic(products, remainder);
        }

        // Davio on the support variable with the cheapest cofactors.
        let best = tt
            .support()
            .into_iter()
            .map(|var| {
                let f0 = tt.cofactor(var, false);
                let difference = f0.xor(&tt.cofactor(var, true));
                (self.cost(&f0) + self.cost(&difference), var)
            })
            .min()
            .expect("degree >= 3 implies nonempty support");
        Decomposition::Davio(best.1)
    }
}

impl Default for Resynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

fn affine_from_anf(anf: &[bool]) -> AffineForm {
    let vars = anf
        .iter()
        .enumerate()
        .filter(|(mask, c)| **c && mask.count_ones() == 1)
        .map(|(mask, _)| mask.trailing_zeros())
        .collect();
    AffineForm {
        vars,
        constant: anf[0],
    }
}

/// Symplectic elimination of a quadratic form over GF(2).
///
/// Repeatedly picks a monomial `x_i x_j`, factors
/// `Q = (x_i ⊕ B)(x_j ⊕ A') ⊕ A'B ⊕ S` where `A'`/`B` are the remaining
/// partners of `x_i`/`x_j`, and folds the residue `A'B` back into the
/// form. Every step removes one product; the loop runs rank/2 times.
fn decompose_quadratic(anf: &[bool], num_vars: u32) -> (Vec<(Vec<u32>, Vec<u32>)>, AffineForm) {
    let mut quadratic: BTreeSet<(u32, u32)> = BTreeSet::new();
    let mut linear = vec![false; num_vars as usize];
    for (mask, coefficient) in anf.iter().enumerate() {
        if !coefficient {
            continue;
        }
        match mask.count_ones() {
            0 => {}
            1 => linear[mask.trailing_zeros() as usize] ^= true,
            2 => {
                let low = mask.trailing_zeros();
                let high = (usize::BITS - 1) - mask.leading_zeros();
                quadratic.insert((low, high));
            }
            _ => unreachable!("caller checked degree == 2"),
        }
    }

    let mut products = Vec::new();
    while let Some(&(i, j)) = quadratic.iter().next() {
        let partners = |quadratic: &BTreeSet<(u32, u32)>, var: u32, except: u32| -> Vec<u32> {
            quadratic
                .iter()
                .filter_map(|&(x, y)| {
                    if x == var && y != except {
                        Some(y)
                    } else if y == var && x != except {
                        Some(x)
                    } else {
                        None
                    }
                })
                .collect()
        };
        let a_prime = partners(&quadratic, i, j);
        let b = partners(&quadratic, j, i);

        quadratic.retain(|&(x, y)| x != i && y != i && x != j && y != j);

        let mut left = vec![i];
        left.extend(&b);
        left.sort_unstable();
        let mut right = vec![j];
        right.extend(&a_prime);
        right.sort_unstable();
        products.push((left, right));

        // fold the residue A'B back in
        for &a in &a_prime {
            for &bb in &b {
                if a == bb {
                    linear[a as usize] ^= true;
                } else {
                    let pair = (a.min(bb), a.max(bb));
                    if !quadratic.remove(&pair) {
                        quadratic.insert(pair);
                    }
                }
            }
        }
    }

    let remainder = AffineForm {
        vars: (0..num_vars).filter(|v| linear[*v as usize]).collect(),
        constant: anf[0],
    };
    (products, remainder)
}
