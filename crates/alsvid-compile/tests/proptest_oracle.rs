//! Property test: random classical functions round-trip through synthesis.
//!
//! Generates random Boolean expressions over three inputs, lowers them to
//! IR text, compiles the module, and checks the emitted circuit against
//! direct evaluation on every basis state — inputs preserved, output
//! xor-accumulated, ancillae clean.

mod common;

use proptest::prelude::*;

use alsvid_compile::compile_module;
use alsvid_qir::parse;
use common::run_boolean_oracle;

#[derive(Debug, Clone)]
enum Expr {
    Var(usize),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Xor(Box<Expr>, Box<Expr>),
}

impl Expr {
    fn eval(&self, inputs: &[bool]) -> bool {
        match self {
            Expr::Var(index) => inputs[*index],
            Expr::Not(inner) => !inner.eval(inputs),
            Expr::And(a, b) => a.eval(inputs) && b.eval(inputs),
            Expr::Or(a, b) => a.eval(inputs) || b.eval(inputs),
            Expr::Xor(a, b) => a.eval(inputs) ^ b.eval(inputs),
        }
    }

    /// Emit SSA lines for this expression; returns the value name.
    fn emit(&self, lines: &mut Vec<String>, counter: &mut usize) -> String {
        match self {
            Expr::Var(index) => format!("%a{index}"),
            Expr::Not(inner) => {
                let value = inner.emit(lines, counter);
                fresh(lines, counter, format!("xor i1 {value}, true"))
            }
            Expr::And(a, b) => {
                let (a, b) = (a.emit(lines, counter), b.emit(lines, counter));
                fresh(lines, counter, format!("and i1 {a}, {b}"))
            }
            Expr::Or(a, b) => {
                let (a, b) = (a.emit(lines, counter), b.emit(lines, counter));
                fresh(lines, counter, format!("or i1 {a}, {b}"))
            }
            Expr::Xor(a, b) => {
                let (a, b) = (a.emit(lines, counter), b.emit(lines, counter));
                fresh(lines, counter, format!("xor i1 {a}, {b}"))
            }
        }
    }
}

fn fresh(lines: &mut Vec<String>, counter: &mut usize, line: String) -> String {
    let name = format!("%t{counter}");
    *counter += 1;
    lines.push(format!("  {name} = {line}"));
    name
}

fn expr_strategy(num_vars: usize) -> impl Strategy<Value = Expr> {
    let leaf = (0..num_vars).prop_map(Expr::Var);
    leaf.prop_recursive(5, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| Expr::Not(Box::new(e))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Expr::And(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| Expr::Or(Box::new(a), Box::new(b))),
            (inner.clone(), inner).prop_map(|(a, b)| Expr::Xor(Box::new(a), Box::new(b))),
        ]
    })
}

fn module_source(expr: &Expr, num_vars: usize) -> String {
    let mut lines = Vec::new();
    let mut counter = 0;
    let result = expr.emit(&mut lines, &mut counter);
    let body = lines.join("\n");

    let params = (0..num_vars)
        .map(|i| format!("i1 %a{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let fields = (0..num_vars)
        .map(|_| "%Qubit*")
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "%Qubit = type opaque
%Array = type opaque
%TupleHeader = type {{ i32 }}
%Input = type {{ {fields} }}
define i1 @Prop__Classical__F__body({params}) {{
{body}
  ret i1 {result}
}}
define void @Prop__F__body(%Input* %args, %Qubit* %output) {{
  ret void
}}
"
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn synthesized_circuit_matches_direct_evaluation(expr in expr_strategy(3)) {
        let source = module_source(&expr, 3);
        let mut module = parse(&source).unwrap();
        compile_module(&mut module).unwrap();

        for bits in 0..8u32 {
            let inputs: Vec<bool> = (0..3).map(|i| bits >> i & 1 == 1).collect();
            let expected = expr.eval(&inputs);
            let (output, evaluation) =
                run_boolean_oracle(&module, "Prop__F__body", &inputs);
            prop_assert_eq!(output, expected, "inputs {:?}", inputs);
            prop_assert!(evaluation.ancillas_clean());
        }
    }

    #[test]
    fn optimizer_is_canonical_for_equal_functions(expr in expr_strategy(3)) {
        // compiling the same function twice yields the same Toffoli count
        let source = module_source(&expr, 3);

        let mut first = parse(&source).unwrap();
        compile_module(&mut first).unwrap();
        let mut second = parse(&source).unwrap();
        compile_module(&mut second).unwrap();

        let inputs = [false, true, false];
        let (_, eval_first) = run_boolean_oracle(&first, "Prop__F__body", &inputs);
        let (_, eval_second) = run_boolean_oracle(&second, "Prop__F__body", &inputs);
        prop_assert_eq!(eval_first.gate_counts, eval_second.gate_counts);
        prop_assert_eq!(eval_first.ancillas.len(), eval_second.ancillas.len());
    }
}
