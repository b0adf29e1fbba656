//! End-to-end oracle synthesis scenarios.
//!
//! Each test parses a complete QIR module, runs the driver, and executes
//! the emitted operation body on computational-basis states: inputs must
//! be preserved, outputs xor-accumulate the classical function, ancillae
//! return to |0⟩ and alias counts balance.

mod common;

use alsvid_compile::compile_module;
use alsvid_qir::{parse, print};
use common::{run_boolean_oracle, run_operation, Value};

fn compile(source: &str) -> alsvid_qir::Module {
    let mut module = parse(source).unwrap();
    compile_module(&mut module).unwrap();
    module
}

const PRELUDE: &str = r"
    %Qubit = type opaque
    %Array = type opaque
    %TupleHeader = type { i32 }
";

#[test]
fn identity_on_one_boolean_is_a_single_cnot() {
    let source = format!(
        "{PRELUDE}
        define i1 @Demo__Classical__Id__body(i1 %a) {{
          ret i1 %a
        }}
        define void @Demo__Id__body(%Qubit* %input, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    for bit in [false, true] {
        let (output, evaluation) = run_boolean_oracle(&module, "Demo__Id__body", &[bit]);
        assert_eq!(output, bit);
        // a single CNOT from input to output, no ancilla allocation
        assert_eq!(evaluation.gate_counts.cnot, 1);
        assert_eq!(evaluation.gate_counts.ccnot, 0);
        assert_eq!(evaluation.gate_counts.x, 0);
        assert!(evaluation.ancillas.is_empty());
    }
}

#[test]
fn majority_of_three_uses_one_ancilla() {
    let source = format!(
        "{PRELUDE}
        %MajInput = type {{ %Qubit*, %Qubit*, %Qubit* }}
        define i1 @Demo__Classical__Maj__body(i1 %a, i1 %b, i1 %c) {{
          %0 = and i1 %a, %b
          %1 = and i1 %a, %c
          %2 = and i1 %b, %c
          %3 = or i1 %0, %1
          %4 = or i1 %3, %2
          ret i1 %4
        }}
        define void @Demo__Maj__body(%MajInput* %args, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    for bits in 0..8u32 {
        let inputs: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
        let expected = inputs.iter().filter(|v| **v).count() >= 2;
        let (output, evaluation) = run_boolean_oracle(&module, "Demo__Maj__body", &inputs);
        assert_eq!(output, expected, "majority of {inputs:?}");

        // optimized to one AND: one ancilla, one Toffoli computed and one
        // uncomputed
        assert_eq!(evaluation.ancillas.len(), 1);
        assert_eq!(evaluation.gate_counts.ccnot, 2);
    }
}

#[test]
fn xor_of_five_needs_no_ancilla() {
    let source = format!(
        "{PRELUDE}
        %XorInput = type {{ %Qubit*, %Qubit*, %Qubit*, %Qubit*, %Qubit* }}
        define i1 @Demo__Classical__Parity__body(i1 %a, i1 %b, i1 %c, i1 %d, i1 %e) {{
          %0 = xor i1 %a, %b
          %1 = xor i1 %0, %c
          %2 = xor i1 %1, %d
          %3 = xor i1 %2, %e
          ret i1 %3
        }}
        define void @Demo__Parity__body(%XorInput* %args, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    for bits in 0..32u32 {
        let inputs: Vec<bool> = (0..5).map(|i| bits >> i & 1 == 1).collect();
        let expected = inputs.iter().filter(|v| **v).count() % 2 == 1;
        let (output, evaluation) = run_boolean_oracle(&module, "Demo__Parity__body", &inputs);
        assert_eq!(output, expected, "parity of {inputs:?}");

        // pure XOR function: five CNOTs into the output, nothing else
        assert!(evaluation.ancillas.is_empty());
        assert_eq!(evaluation.gate_counts.cnot, 5);
        assert_eq!(evaluation.gate_counts.ccnot, 0);
    }
}

#[test]
fn equality_on_two_64_bit_integers() {
    let source = format!(
        "{PRELUDE}
        %EqInput = type {{ %Array*, %Array* }}
        define i1 @Demo__Classical__Eq__body(i64 %x, i64 %y) {{
          %0 = icmp eq i64 %x, %y
          ret i1 %0
        }}
        define void @Demo__Eq__body(%EqInput* %args, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    let run = |x: u64, y: u64| {
        let mut state: Vec<bool> = (0..64)
            .map(|i| x >> i & 1 == 1)
            .chain((0..64).map(|i| y >> i & 1 == 1))
            .collect();
        state.push(false);

        let evaluation = run_operation(
            &module,
            "Demo__Eq__body",
            [
                Value::Tuple(vec![
                    Value::Array((0..64).collect()),
                    Value::Array((64..128).collect()),
                ]),
                Value::Qubit(128),
            ],
            state,
        );
        assert!(evaluation.ancillas_clean());
        assert_eq!(evaluation.outstanding_arrays, 0);
        assert_eq!(evaluation.alias_balance, 0);
        // after optimization the AND count is at most 63, and the circuit's
        // Toffoli count matches it (compute plus uncompute)
        assert!(evaluation.ancillas.len() <= 63);
        assert_eq!(evaluation.gate_counts.ccnot, 2 * evaluation.ancillas.len());
        evaluation.state[128]
    };

    assert!(run(0, 0));
    assert!(run(42, 42));
    assert!(run(u64::MAX, u64::MAX));
    assert!(!run(42, 43));
    assert!(!run(0, u64::MAX));
    assert!(!run(1 << 63, 0));
}

#[test]
fn integer_identity_copies_all_64_bits() {
    let source = format!(
        "{PRELUDE}
        define i64 @Demo__Classical__IdInt__body(i64 %x) {{
          ret i64 %x
        }}
        define void @Demo__IdInt__body(%Array* %input, %Array* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    for x in [0u64, 1, 42, u64::MAX, 1 << 63] {
        let mut state: Vec<bool> = (0..64).map(|i| x >> i & 1 == 1).collect();
        state.extend(std::iter::repeat(false).take(64));

        let evaluation = run_operation(
            &module,
            "Demo__IdInt__body",
            [
                Value::Array((0..64).collect()),
                Value::Array((64..128).collect()),
            ],
            state,
        );

        // every output bit mirrors its input bit, one CNOT per wire
        for i in 0..64 {
            assert_eq!(evaluation.state[64 + i], x >> i & 1 == 1, "bit {i} of {x}");
            assert_eq!(evaluation.state[i], x >> i & 1 == 1, "input bit {i} of {x}");
        }
        assert!(evaluation.ancillas.is_empty());
        assert_eq!(evaluation.gate_counts.cnot, 64);
        assert_eq!(evaluation.gate_counts.ccnot, 0);
    }
}

#[test]
fn tuple_return_of_two_booleans() {
    let source = format!(
        "{PRELUDE}
        %PairInput = type {{ %Qubit*, %Qubit* }}
        %PairOutput = type {{ %Qubit*, %Qubit* }}
        %Pair = type {{ %TupleHeader, i1, i1 }}
        declare %TupleHeader* @__quantum__rt__tuple_create(i64)
        define %TupleHeader* @Demo__Classical__Pair__body(i1 %a, i1 %b) {{
          %0 = call %TupleHeader* @__quantum__rt__tuple_create(i64 ptrtoint (%Pair* getelementptr (%Pair, %Pair* null, i32 1) to i64))
          %1 = bitcast %TupleHeader* %0 to %Pair*
          %2 = getelementptr %Pair, %Pair* %1, i32 0, i32 1
          %3 = getelementptr %Pair, %Pair* %1, i32 0, i32 2
          %4 = xor i1 %a, %b
          %5 = xor i1 %4, true
          store i1 %5, i1* %2
          %6 = and i1 %a, %b
          store i1 %6, i1* %3
          ret %TupleHeader* %0
        }}
        define void @Demo__Pair__body(%PairInput* %args, %PairOutput* %results) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    for bits in 0..4u32 {
        let inputs: Vec<bool> = (0..2).map(|i| bits >> i & 1 == 1).collect();
        let mut state = inputs.clone();
        state.extend([false, false]);

        let evaluation = run_operation(
            &module,
            "Demo__Pair__body",
            [
                Value::Tuple(vec![Value::Qubit(0), Value::Qubit(1)]),
                Value::Tuple(vec![Value::Qubit(2), Value::Qubit(3)]),
            ],
            state,
        );

        // outputs: (a xnor b, a and b); the complemented first output gets
        // its final X
        assert_eq!(evaluation.state[2], !(inputs[0] ^ inputs[1]), "{inputs:?}");
        assert_eq!(evaluation.state[3], inputs[0] && inputs[1], "{inputs:?}");
        assert_eq!(evaluation.state[..2], inputs[..]);
        assert!(evaluation.ancillas_clean());
        assert!(evaluation.gate_counts.x >= 1);
        assert_eq!(evaluation.alias_balance, 0);
    }
}

#[test]
fn nested_classical_call_is_inlined() {
    let source = format!(
        "{PRELUDE}
        %NestInput = type {{ %Qubit*, %Qubit*, %Qubit* }}
        define i1 @Demo__Classical__Inner__body(i1 %x, i1 %y) {{
          %0 = and i1 %x, %y
          ret i1 %0
        }}
        define i1 @Demo__Classical__Outer__body(i1 %a, i1 %b, i1 %c) {{
          %0 = call i1 @Demo__Classical__Inner__body(i1 %a, i1 %b)
          %1 = xor i1 %0, %c
          ret i1 %1
        }}
        define void @Demo__Outer__body(%NestInput* %args, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    // only the operation matching Outer exists; Inner has no operation and
    // is left as the classical function it was
    assert!(module.function("Demo__Inner__body").is_none());
    let inner = module.function("Demo__Classical__Inner__body").unwrap();
    assert!(!inner.is_declaration());

    for bits in 0..8u32 {
        let inputs: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
        let expected = (inputs[0] && inputs[1]) ^ inputs[2];
        let (output, _) = run_boolean_oracle(&module, "Demo__Outer__body", &inputs);
        assert_eq!(output, expected, "inlined call on {inputs:?}");
    }
}

#[test]
fn branching_source_compiles_through_ite() {
    let source = format!(
        "{PRELUDE}
        %PickInput = type {{ %Qubit*, %Qubit*, %Qubit* }}
        define i1 @Demo__Classical__Pick__body(i1 %c, i1 %a, i1 %b) {{
        entry:
          br i1 %c, label %then, label %else
        then:
          ret i1 %a
        else:
          ret i1 %b
        }}
        define void @Demo__Pick__body(%PickInput* %args, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    for bits in 0..8u32 {
        let inputs: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
        let expected = if inputs[0] { inputs[1] } else { inputs[2] };
        let (output, evaluation) = run_boolean_oracle(&module, "Demo__Pick__body", &inputs);
        assert_eq!(output, expected, "select on {inputs:?}");
        // ITE is a single AND after optimization
        assert_eq!(evaluation.ancillas.len(), 1);
    }
}

#[test]
fn phi_functions_are_demoted_and_compiled() {
    let source = format!(
        "{PRELUDE}
        %SelInput = type {{ %Qubit*, %Qubit*, %Qubit* }}
        define i1 @Demo__Classical__Sel__body(i1 %c, i1 %a, i1 %b) {{
        entry:
          br i1 %c, label %then, label %else
        then:
          br label %merge
        else:
          br label %merge
        merge:
          %r = phi i1 [ %a, %then ], [ %b, %else ]
          ret i1 %r
        }}
        define void @Demo__Sel__body(%SelInput* %args, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    for bits in 0..8u32 {
        let inputs: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
        let expected = if inputs[0] { inputs[1] } else { inputs[2] };
        let (output, _) = run_boolean_oracle(&module, "Demo__Sel__body", &inputs);
        assert_eq!(output, expected, "phi merge on {inputs:?}");
    }
}

#[test]
fn unpaired_operations_are_left_alone() {
    let source = format!(
        "{PRELUDE}
        define i1 @Demo__Classical__Id__body(i1 %a) {{
          ret i1 %a
        }}
        define void @Demo__Id__body(%Qubit* %input, %Qubit* %output) {{
          ret void
        }}
        define void @Demo__Unrelated__body(%Qubit* %q) {{
          ret void
        }}
        "
    );
    let module = compile(&source);

    let unrelated = module.function("Demo__Unrelated__body").unwrap();
    assert_eq!(unrelated.blocks.len(), 1);
    assert_eq!(unrelated.blocks[0].insts.len(), 1);
}

#[test]
fn synthesized_module_round_trips_through_the_printer() {
    let source = format!(
        "{PRELUDE}
        define i1 @Demo__Classical__Id__body(i1 %a) {{
          ret i1 %a
        }}
        define void @Demo__Id__body(%Qubit* %input, %Qubit* %output) {{
          ret void
        }}
        "
    );
    let module = compile(&source);
    let printed = print(&module);
    assert!(printed.contains("Microsoft__Quantum__Intrinsic__CNOT__body"));

    // the printed module parses again and the circuit still evaluates
    let reparsed = parse(&printed).unwrap();
    let (output, _) = run_boolean_oracle(&reparsed, "Demo__Id__body", &[true]);
    assert!(output);
}
