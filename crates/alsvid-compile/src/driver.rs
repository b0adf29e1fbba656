//! Pair discovery and per-pair orchestration.
//!
//! The driver scans the module for (classical function, operation) pairs
//! by name convention, then runs read → optimize → write for each pair.
//! Pairs are independent (each one reads its classical function's body and
//! writes only its own operation's body) and are processed sequentially.

use rustc_hash::FxHashMap;
use tracing::debug;

use alsvid_qir::Module;
use alsvid_xag::AbstractXag;

use crate::error::CompileResult;
use crate::normalize::demote_phis;
use crate::optimize::Optimizer;
use crate::reader::read_function;
use crate::writer::{write_operation, QirContext};

/// Find which classical functions should be synthesized into which
/// operations.
///
/// For every function whose name ends with `__body` and does not start
/// with `__`, the qualified path (suffix stripped) is recorded. An
/// operation `Ns__Name__body` pairs with the classical function
/// `Ns__Classical__Name__body`: the literal token `Classical` inserted
/// before the last `__`-separated component.
pub fn find_function_pairs(module: &Module) -> Vec<(usize, usize)> {
    let mut qualified: FxHashMap<String, usize> = FxHashMap::default();
    for (index, function) in module.functions.iter().enumerate() {
        if let Some(path) = candidate_path(&function.name) {
            qualified.insert(path.to_string(), index);
        }
    }

    let mut pairs = Vec::new();
    for (operation_index, function) in module.functions.iter().enumerate() {
        let Some(path) = candidate_path(&function.name) else {
            continue;
        };
        let mut parts: Vec<&str> = path.split("__").collect();
        parts.insert(parts.len() - 1, "Classical");
        let classical_path = parts.join("__");

        if let Some(&classical_index) = qualified.get(&classical_path) {
            pairs.push((classical_index, operation_index));
        }
    }
    pairs
}

fn candidate_path(name: &str) -> Option<&str> {
    if name.starts_with("__") {
        return None;
    }
    name.strip_suffix("__body")
}

/// Synthesize every discovered pair in the module, in place.
///
/// Diagnostics go to standard output with an `[i]` prefix; the first error
/// aborts the whole compilation.
pub fn compile_module(module: &mut Module) -> CompileResult<()> {
    let context = QirContext::prepare(module)?;

    // normalize every defined candidate function once, before any pair is
    // read; the pass is idempotent so rereads see the same body
    for index in 0..module.functions.len() {
        let function = &mut module.functions[index];
        if !function.is_declaration() && !function.name.starts_with("__") {
            demote_phis(function);
        }
    }

    let pairs = find_function_pairs(module);
    debug!(pairs = pairs.len(), "discovered synthesis pairs");

    for (classical_index, operation_index) in pairs {
        println!(
            "[i] generate operation {} from function {}",
            module.functions[operation_index].name, module.functions[classical_index].name
        );

        println!(
            "[i] process function {}",
            module.functions[classical_index].name
        );
        let xag = read_function(module, classical_index)?;

        let initial_ands = xag.and_count();
        println!(
            "[i] initial XAG from IR: {} AND gates, {} XOR gates",
            initial_ands,
            xag.num_gates() - initial_ands
        );

        let optimized = Optimizer::standard().run(xag);
        let optimized_ands = optimized.and_count();
        println!(
            "[i] optimized XAG:         {} AND gates, {} XOR gates",
            optimized_ands,
            optimized.num_gates() - optimized_ands
        );

        let axag = AbstractXag::from_xag(&optimized);
        debug_assert!(axag.and_count() <= optimized_ands);

        write_operation(module, &context, &axag, classical_index, operation_index)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alsvid_qir::parse;

    #[test]
    fn test_pair_discovery() {
        let source = r"
            %Qubit = type opaque
            %Array = type opaque
            define i1 @Demo__Classical__Maj__body(i1 %a, i1 %b, i1 %c) {
              ret i1 %a
            }
            define void @Demo__Maj__body(%Qubit* %in, %Qubit* %out) {
              ret void
            }
            define i1 @Demo__Classical__Other__body(i1 %a) {
              ret i1 %a
            }
            declare void @__quantum__qis__x__body(%Qubit*)
        ";
        let module = parse(source).unwrap();
        let pairs = find_function_pairs(&module);
        assert_eq!(pairs.len(), 1);
        let (classical, operation) = pairs[0];
        assert_eq!(
            module.functions[classical].name,
            "Demo__Classical__Maj__body"
        );
        assert_eq!(module.functions[operation].name, "Demo__Maj__body");
    }

    #[test]
    fn test_double_underscore_names_are_skipped() {
        let source = r"
            define i1 @__internal__body(i1 %a) {
              ret i1 %a
            }
        ";
        let module = parse(source).unwrap();
        assert!(find_function_pairs(&module).is_empty());
    }

    #[test]
    fn test_classical_function_is_not_its_own_operation() {
        // Demo__Classical__Maj__body splits into a path that would need
        // Demo__Classical__Classical__Maj__body; no self-pairing
        let source = r"
            define i1 @Demo__Classical__Maj__body(i1 %a) {
              ret i1 %a
            }
        ";
        let module = parse(source).unwrap();
        assert!(find_function_pairs(&module).is_empty());
    }

    #[test]
    fn test_nested_namespaces() {
        let source = r"
            define i1 @A__B__Classical__F__body(i1 %x) {
              ret i1 %x
            }
            define void @A__B__F__body(i1 %in, i1 %out) {
              ret void
            }
        ";
        let module = parse(source).unwrap();
        let pairs = find_function_pairs(&module);
        assert_eq!(pairs.len(), 1);
    }
}
