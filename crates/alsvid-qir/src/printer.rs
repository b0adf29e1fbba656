//! Serializes a module back to textual IR.
//!
//! Locals are renumbered `%0, %1, ...` per function in definition order
//! (parameters first, then instruction results), so modules rebuilt by the
//! circuit writer print with stable names.

use rustc_hash::FxHashMap;

use crate::module::{Function, Inst, LocalId, Module, Op, Operand};
use crate::types::Type;

/// Print a module as textual IR.
pub fn print(module: &Module) -> String {
    let mut printer = Printer::new();
    printer.print_module(module);
    printer.output
}

struct Printer {
    output: String,
    names: FxHashMap<LocalId, u32>,
}

impl Printer {
    fn new() -> Self {
        Self {
            output: String::new(),
            names: FxHashMap::default(),
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn print_module(&mut self, module: &Module) {
        for def in module.types.iter() {
            if def.opaque {
                self.writeln(&format!("%{} = type opaque", def.name));
            } else {
                let fields = def
                    .fields
                    .iter()
                    .map(Type::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                self.writeln(&format!("%{} = type {{ {fields} }}", def.name));
            }
        }
        if module.types.iter().next().is_some() {
            self.writeln("");
        }

        for function in &module.functions {
            if function.is_declaration() {
                self.print_declaration(function);
            } else {
                self.print_definition(function);
            }
            self.writeln("");
        }

        // drop the final blank line
        if self.output.ends_with("\n\n") {
            self.output.pop();
        }
    }

    fn print_declaration(&mut self, function: &Function) {
        let params = function
            .params
            .iter()
            .map(|p| p.ty.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.writeln(&format!("declare {} @{}({params})", function.ret, function.name));
    }

    fn print_definition(&mut self, function: &Function) {
        self.assign_names(function);

        let params = function
            .params
            .iter()
            .map(|p| format!("{} {}", p.ty, self.name(p.id)))
            .collect::<Vec<_>>()
            .join(", ");
        self.writeln(&format!(
            "define {} @{}({params}) {{",
            function.ret, function.name
        ));

        for (index, block) in function.blocks.iter().enumerate() {
            if index > 0 {
                self.writeln(&format!("{}:", block.label));
            }
            for inst in &block.insts {
                let line = self.format_inst(inst);
                self.writeln(&format!("  {line}"));
            }
        }
        self.writeln("}");
    }

    /// Number parameters first, then instruction results, in order.
    fn assign_names(&mut self, function: &Function) {
        self.names.clear();
        let mut next = 0u32;
        for param in &function.params {
            self.names.insert(param.id, next);
            next += 1;
        }
        for block in &function.blocks {
            for inst in &block.insts {
                if let Some(result) = inst.result {
                    self.names.insert(result, next);
                    next += 1;
                }
            }
        }
    }

    fn name(&self, id: LocalId) -> String {
        match self.names.get(&id) {
            Some(n) => format!("%{n}"),
            None => format!("%u{}", id.0),
        }
    }

    fn operand(&self, op: &Operand) -> String {
        match op {
            Operand::Local(id) => self.name(*id),
            Operand::Int { bits: 1, value } => {
                if *value & 1 == 1 { "true" } else { "false" }.to_string()
            }
            Operand::Int { value, .. } => format!("{}", *value as i64),
            Operand::Null(_) => "null".to_string(),
            Operand::Global(name) => format!("@{name}"),
            Operand::SizeOf(name) => format!(
                "ptrtoint (%{name}* getelementptr (%{name}, %{name}* null, i32 1) to i64)"
            ),
        }
    }

    fn format_inst(&self, inst: &Inst) -> String {
        let body = self.format_op(&inst.op);
        match inst.result {
            Some(result) => format!("{} = {body}", self.name(result)),
            None => body,
        }
    }

    fn format_op(&self, op: &Op) -> String {
        match op {
            Op::Binary { op, ty, lhs, rhs } => format!(
                "{} {ty} {}, {}",
                op.mnemonic(),
                self.operand(lhs),
                self.operand(rhs)
            ),
            Op::Icmp { pred, ty, lhs, rhs } => format!(
                "icmp {} {ty} {}, {}",
                pred.mnemonic(),
                self.operand(lhs),
                self.operand(rhs)
            ),
            Op::Select {
                ty,
                cond,
                if_true,
                if_false,
            } => format!(
                "select i1 {}, {ty} {}, {ty} {}",
                self.operand(cond),
                self.operand(if_true),
                self.operand(if_false)
            ),
            Op::Br { target } => format!("br label %{target}"),
            Op::CondBr {
                cond,
                if_true,
                if_false,
            } => format!(
                "br i1 {}, label %{if_true}, label %{if_false}",
                self.operand(cond)
            ),
            Op::Ret { value: None } => "ret void".to_string(),
            Op::Ret {
                value: Some((ty, value)),
            } => format!("ret {ty} {}", self.operand(value)),
            Op::Call { ret, callee, args } => {
                let args = args
                    .iter()
                    .map(|(ty, value)| format!("{ty} {}", self.operand(value)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("call {ret} @{callee}({args})")
            }
            Op::Alloca { ty } => format!("alloca {ty}"),
            Op::Load { ty, ptr } => format!("load {ty}, {ty}* {}", self.operand(ptr)),
            Op::Store { ty, value, ptr } => format!(
                "store {ty} {}, {ty}* {}",
                self.operand(value),
                self.operand(ptr)
            ),
            Op::BitCast { from, value, to } => {
                format!("bitcast {from} {} to {to}", self.operand(value))
            }
            Op::GetElementPtr { ty, ptr, indices } => {
                let indices = indices
                    .iter()
                    .map(|(ity, value)| format!(", {ity} {}", self.operand(value)))
                    .collect::<String>();
                format!("getelementptr {ty}, {ty}* {}{indices}", self.operand(ptr))
            }
            Op::Phi { ty, incoming } => {
                let arms = incoming
                    .iter()
                    .map(|(value, label)| format!("[ {}, %{label} ]", self.operand(value)))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("phi {ty} {arms}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_round_trip_simple() {
        let source = r"
            %Qubit = type opaque
            declare void @__quantum__qis__x__body(%Qubit*)
            define i1 @f(i1 %a, i1 %b) {
            entry:
              %0 = xor i1 %a, %b
              ret i1 %0
            }
        ";
        let module = parse(source).unwrap();
        let printed = print(&module);
        let reparsed = parse(&printed).unwrap();
        assert_eq!(module.functions.len(), reparsed.functions.len());
        assert_eq!(
            module.function("f").unwrap().blocks,
            reparsed.function("f").unwrap().blocks
        );
    }

    #[test]
    fn test_locals_renumbered_in_order() {
        let source = r"
            define i1 @f(i1 %x) {
              %t = xor i1 %x, true
              %u = and i1 %t, %x
              ret i1 %u
            }
        ";
        let printed = print(&parse(source).unwrap());
        assert!(printed.contains("%1 = xor i1 %0, true"));
        assert!(printed.contains("%2 = and i1 %1, %0"));
        assert!(printed.contains("ret i1 %2"));
    }

    #[test]
    fn test_print_branches() {
        let source = r"
            define i1 @f(i1 %c, i1 %a, i1 %b) {
            entry:
              br i1 %c, label %then, label %else
            then:
              ret i1 %a
            else:
              ret i1 %b
            }
        ";
        let printed = print(&parse(source).unwrap());
        assert!(printed.contains("br i1 %0, label %then, label %else"));
        assert!(printed.contains("then:"));
        assert!(printed.contains("else:"));
        // round trip again
        let module = parse(&printed).unwrap();
        assert_eq!(module.function("f").unwrap().blocks.len(), 3);
    }

    #[test]
    fn test_print_sizeof_round_trip() {
        let source = r"
            %TupleHeader = type { i32 }
            %Tup = type { %TupleHeader, i1 }
            declare %TupleHeader* @__quantum__rt__tuple_create(i64)
            define %TupleHeader* @f() {
              %0 = call %TupleHeader* @__quantum__rt__tuple_create(i64 ptrtoint (%Tup* getelementptr (%Tup, %Tup* null, i32 1) to i64))
              ret %TupleHeader* %0
            }
        ";
        let module = parse(source).unwrap();
        let printed = print(&module);
        assert!(printed.contains("ptrtoint (%Tup* getelementptr (%Tup, %Tup* null, i32 1) to i64)"));
        parse(&printed).unwrap();
    }
}
