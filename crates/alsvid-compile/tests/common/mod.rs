//! Classical evaluation of emitted reversible circuits.
//!
//! Emitted operation bodies only contain struct/array plumbing and X, CNOT
//! and CCNOT calls, so they can be executed exactly on computational-basis
//! states with a bit vector per qubit. The machine tracks allocation,
//! release and alias-count bookkeeping so tests can assert the Bennett
//! cleanup contract.

// each test binary uses a subset of these helpers
#![allow(dead_code)]

use std::collections::HashMap;

use alsvid_qir::{Module, Op, Operand};

/// A value bound to an operation parameter.
#[derive(Debug, Clone)]
pub enum Value {
    /// A single qubit (index into the machine state).
    Qubit(usize),
    /// A qubit array.
    Array(Vec<usize>),
    /// A tuple of qubits/arrays.
    Tuple(Vec<Value>),
    /// A pointer to a tuple field or array element.
    Ptr(Box<Value>),
}

impl Value {
    fn qubit(&self) -> usize {
        match self {
            Value::Qubit(index) => *index,
            other => panic!("expected a qubit value, got {other:?}"),
        }
    }

    fn array(&self) -> &[usize] {
        match self {
            Value::Array(indices) => indices,
            other => panic!("expected an array value, got {other:?}"),
        }
    }
}

/// Result of running an operation body on a basis state.
pub struct Evaluation {
    /// Qubit states after the run.
    pub state: Vec<bool>,
    /// Indices of runtime-allocated ancilla qubits.
    pub ancillas: Vec<usize>,
    /// Number of allocate calls minus release calls.
    pub outstanding_arrays: i64,
    /// Net alias-count updates.
    pub alias_balance: i64,
    /// Emitted gate counts (x, cnot, ccnot).
    pub gate_counts: GateCounts,
}

/// Gate counts observed during evaluation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GateCounts {
    pub x: usize,
    pub cnot: usize,
    pub ccnot: usize,
}

impl Evaluation {
    /// Every runtime-allocated ancilla is back in |0⟩.
    pub fn ancillas_clean(&self) -> bool {
        self.ancillas.iter().all(|index| !self.state[*index])
    }
}

/// Execute the body of `operation` with the two parameters bound to the
/// given values over `state`.
pub fn run_operation(
    module: &Module,
    operation: &str,
    parameters: [Value; 2],
    mut state: Vec<bool>,
) -> Evaluation {
    let function = module
        .function(operation)
        .unwrap_or_else(|| panic!("operation @{operation} not found"));
    assert!(
        !function.is_declaration(),
        "operation @{operation} has no body"
    );
    assert_eq!(function.blocks.len(), 1, "writer emits one entry block");

    let mut env: HashMap<u32, Value> = HashMap::new();
    for (param, value) in function.params.iter().zip(parameters) {
        env.insert(param.id.0, value);
    }

    let mut ancillas = Vec::new();
    let mut outstanding_arrays = 0i64;
    let mut alias_balance = 0i64;
    let mut gate_counts = GateCounts::default();

    let resolve = |env: &HashMap<u32, Value>, operand: &Operand| -> Value {
        match operand {
            Operand::Local(id) => env
                .get(&id.0)
                .unwrap_or_else(|| panic!("unbound local {id}"))
                .clone(),
            other => panic!("expected a local operand, got {other:?}"),
        }
    };
    let int_of = |operand: &Operand| -> i64 {
        operand.constant().expect("expected an integer constant") as i64
    };

    for inst in &function.blocks[0].insts {
        match &inst.op {
            Op::GetElementPtr { ptr, indices, .. } => {
                let tuple = resolve(&env, ptr);
                let Value::Tuple(fields) = tuple else {
                    panic!("getelementptr on a non-tuple value");
                };
                assert_eq!(int_of(&indices[0].1), 0);
                let field = int_of(&indices[1].1) as usize;
                env.insert(
                    inst.result.unwrap().0,
                    Value::Ptr(Box::new(fields[field].clone())),
                );
            }

            Op::Load { ptr, .. } => {
                let value = match resolve(&env, ptr) {
                    Value::Ptr(inner) => *inner,
                    other => panic!("load through a non-pointer value: {other:?}"),
                };
                env.insert(inst.result.unwrap().0, value);
            }

            Op::BitCast { value, .. } => {
                let value = resolve(&env, value);
                env.insert(inst.result.unwrap().0, value);
            }

            Op::Call { callee, args, .. } => match callee.as_str() {
                "__quantum__rt__array_get_element_ptr_1d" => {
                    let array = resolve(&env, &args[0].1);
                    let index = int_of(&args[1].1) as usize;
                    let qubit = array.array()[index];
                    env.insert(
                        inst.result.unwrap().0,
                        Value::Ptr(Box::new(Value::Qubit(qubit))),
                    );
                }
                "__quantum__rt__qubit_allocate_array" => {
                    let count = int_of(&args[0].1) as usize;
                    let base = state.len();
                    state.extend(std::iter::repeat(false).take(count));
                    let indices: Vec<usize> = (base..base + count).collect();
                    ancillas.extend(&indices);
                    outstanding_arrays += 1;
                    env.insert(inst.result.unwrap().0, Value::Array(indices));
                }
                "__quantum__rt__qubit_release_array" => {
                    outstanding_arrays -= 1;
                }
                "__quantum__rt__array_update_alias_count" => {
                    alias_balance += int_of(&args[1].1);
                }
                "__quantum__qis__x__body" => {
                    let target = resolve(&env, &args[0].1).qubit();
                    state[target] = !state[target];
                    gate_counts.x += 1;
                }
                "Microsoft__Quantum__Intrinsic__CNOT__body" => {
                    let control = resolve(&env, &args[0].1).qubit();
                    let target = resolve(&env, &args[1].1).qubit();
                    state[target] ^= state[control];
                    gate_counts.cnot += 1;
                }
                "Microsoft__Quantum__Intrinsic__CCNOT__body" => {
                    let first = resolve(&env, &args[0].1).qubit();
                    let second = resolve(&env, &args[1].1).qubit();
                    let target = resolve(&env, &args[2].1).qubit();
                    state[target] ^= state[first] && state[second];
                    gate_counts.ccnot += 1;
                }
                other => panic!("unexpected runtime call @{other}"),
            },

            Op::Ret { value: None } => break,

            other => panic!("unexpected instruction in emitted body: {other:?}"),
        }
    }

    Evaluation {
        state,
        ancillas,
        outstanding_arrays,
        alias_balance,
        gate_counts,
    }
}

/// Build the standard single-output harness: `n` input qubits holding
/// `input_bits`, one output qubit in |0⟩, parameters bound per the source
/// signature shape (direct for one Boolean argument, tuple otherwise).
pub fn run_boolean_oracle(module: &Module, operation: &str, input_bits: &[bool]) -> (bool, Evaluation) {
    let n = input_bits.len();
    let mut state = input_bits.to_vec();
    state.push(false);
    let output = n;

    let input_value = if n == 1 {
        Value::Qubit(0)
    } else {
        Value::Tuple((0..n).map(Value::Qubit).collect())
    };

    let evaluation = run_operation(
        module,
        operation,
        [input_value, Value::Qubit(output)],
        state,
    );

    // inputs are preserved on computational-basis states
    for (index, bit) in input_bits.iter().enumerate() {
        assert_eq!(
            evaluation.state[index], *bit,
            "input qubit {index} was not preserved"
        );
    }
    assert!(evaluation.ancillas_clean(), "ancillas not returned to |0⟩");
    assert_eq!(evaluation.outstanding_arrays, 0, "unreleased ancilla array");
    assert_eq!(evaluation.alias_balance, 0, "unbalanced alias counts");

    (evaluation.state[output], evaluation)
}
