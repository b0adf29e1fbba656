//! Bit-vector circuit generators.
//!
//! Words are little-endian: bit 0 of a value sits at index 0 of its signal
//! vector. The in-place ripple constructions operate on the first operand's
//! vector, matching the reader's conventions for ADD, MUL and SGT.

use crate::network::{Signal, Xag};

/// The bits of `value` as constant signals, little-endian.
pub fn constant_word(xag: &Xag, value: u64, width: u32) -> Vec<Signal> {
    (0..width)
        .map(|i| xag.constant(value >> i & 1 == 1))
        .collect()
}

/// Bitwise multiplexer: `cond ? when_true : when_false`.
pub fn mux_vector(
    xag: &mut Xag,
    cond: Signal,
    when_true: &[Signal],
    when_false: &[Signal],
) -> Vec<Signal> {
    assert_eq!(when_true.len(), when_false.len());
    when_true
        .iter()
        .zip(when_false)
        .map(|(t, e)| xag.create_ite(cond, *t, *e))
        .collect()
}

/// One-bit full adder; returns (sum, carry-out). Costs one AND gate.
pub fn full_adder(xag: &mut Xag, a: Signal, b: Signal, carry: Signal) -> (Signal, Signal) {
    let ab = xag.create_xor(a, b);
    let sum = xag.create_xor(ab, carry);
    let carry_out = xag.create_maj(a, b, carry);
    (sum, carry_out)
}

/// Ripple-carry addition in place on `a`; `carry` carries in and out.
pub fn carry_ripple_adder_inplace(
    xag: &mut Xag,
    a: &mut [Signal],
    b: &[Signal],
    carry: &mut Signal,
) {
    assert_eq!(a.len(), b.len());
    for (ai, bi) in a.iter_mut().zip(b) {
        let (sum, carry_out) = full_adder(xag, *ai, *bi, *carry);
        *ai = sum;
        *carry = carry_out;
    }
}

/// Ripple-borrow subtraction in place on `a` (`a := a - b`), implemented as
/// addition of the complement. With `carry` initialized to true, the final
/// carry is true iff no borrow occurred (`a >= b` unsigned).
pub fn carry_ripple_subtractor_inplace(
    xag: &mut Xag,
    a: &mut [Signal],
    b: &[Signal],
    carry: &mut Signal,
) {
    assert_eq!(a.len(), b.len());
    for (ai, bi) in a.iter_mut().zip(b) {
        let (sum, carry_out) = full_adder(xag, *ai, !*bi, *carry);
        *ai = sum;
        *carry = carry_out;
    }
}

/// Addition modulo `2^k` in place on `a`: ripple carry, final carry dropped.
pub fn modular_adder_inplace(xag: &mut Xag, a: &mut [Signal], b: &[Signal]) {
    let mut carry = xag.constant(false);
    carry_ripple_adder_inplace(xag, a, b, &mut carry);
}

/// Addition modulo a constant `modulus` in place on `a`.
///
/// Operands are assumed already reduced below the modulus: the sum is
/// computed with one extra bit, the modulus is conditionally subtracted.
pub fn modular_adder_with_modulus_inplace(
    xag: &mut Xag,
    a: &mut Vec<Signal>,
    b: &[Signal],
    modulus: u64,
) {
    let width = a.len();
    let mut carry = xag.constant(false);
    carry_ripple_adder_inplace(xag, a, b, &mut carry);
    a.push(carry);

    reduce_once_inplace(xag, a, modulus);
    a.truncate(width);
}

/// Doubling modulo a constant `modulus` in place on `a`.
pub fn modular_doubling_inplace(xag: &mut Xag, a: &mut Vec<Signal>, modulus: u64) {
    let width = a.len();
    a.insert(0, xag.constant(false));

    reduce_once_inplace(xag, a, modulus);
    a.truncate(width);
}

/// Subtract `modulus` from the extended word `a` when `a >= modulus`.
fn reduce_once_inplace(xag: &mut Xag, a: &mut [Signal], modulus: u64) {
    let modulus_word = constant_word(xag, modulus, a.len() as u32);
    let mut difference = a.to_vec();
    let mut no_borrow = xag.constant(true);
    carry_ripple_subtractor_inplace(xag, &mut difference, &modulus_word, &mut no_borrow);
    let reduced = mux_vector(xag, no_borrow, &difference, a);
    a.copy_from_slice(&reduced);
}

/// Multiplication modulo a constant `modulus`: double-and-add over the bits
/// of `a`, most significant first. Operands are assumed reduced.
pub fn modular_multiplier(
    xag: &mut Xag,
    a: &[Signal],
    b: &[Signal],
    modulus: u64,
) -> Vec<Signal> {
    assert_eq!(a.len(), b.len());
    let mut accumulator = vec![xag.constant(false); a.len()];
    for &bit in a.iter().rev() {
        modular_doubling_inplace(xag, &mut accumulator, modulus);
        let mut with_addend = accumulator.clone();
        modular_adder_with_modulus_inplace(xag, &mut with_addend, b, modulus);
        accumulator = mux_vector(xag, bit, &with_addend, &accumulator);
    }
    accumulator
}
