//! Emitting reversible circuits into operation bodies.
//!
//! The writer expands an abstract XAG into a single entry block of X, CNOT
//! and CCNOT calls: ancillae are borrowed from the runtime allocator (one
//! per AND gate), every AND is computed through the in-place linear-fanin
//! trick, outputs are copied out with CNOT chains, and the whole AND
//! sequence is replayed in reverse to return every ancilla to |0⟩ before
//! release (Bennett compute/uncompute).

use tracing::debug;

use alsvid_qir::{Builder, Module, Operand, Type};
use alsvid_xag::{AId, AbstractXag};

use crate::error::{CompileError, CompileResult};
use crate::runtime;

/// QIR types and runtime functions the writer emits calls to.
///
/// Prepared once per module: checks that the `%Qubit` and `%Array` types
/// exist and inserts any missing runtime declarations.
pub struct QirContext {
    qubit_ptr: Type,
    array_ptr: Type,
    byte_ptr: Type,
}

impl QirContext {
    /// Validate the module's QIR types and declare the runtime functions.
    pub fn prepare(module: &mut Module) -> CompileResult<Self> {
        for name in ["Qubit", "Array"] {
            if !module.types.contains(name) {
                return Err(CompileError::MissingType(name.into()));
            }
        }

        let qubit_ptr = Type::named("Qubit").pointer_to();
        let array_ptr = Type::named("Array").pointer_to();
        let byte_ptr = Type::Int(8).pointer_to();

        module.declare_if_missing(runtime::X, vec![qubit_ptr.clone()], Type::Void);
        module.declare_if_missing(
            runtime::CNOT,
            vec![qubit_ptr.clone(), qubit_ptr.clone()],
            Type::Void,
        );
        module.declare_if_missing(
            runtime::CCNOT,
            vec![qubit_ptr.clone(), qubit_ptr.clone(), qubit_ptr.clone()],
            Type::Void,
        );
        module.declare_if_missing(
            runtime::ALLOCATE_ARRAY,
            vec![Type::Int(64)],
            array_ptr.clone(),
        );
        module.declare_if_missing(
            runtime::UPDATE_ALIAS_COUNT,
            vec![array_ptr.clone(), Type::Int(32)],
            Type::Void,
        );
        module.declare_if_missing(runtime::RELEASE_ARRAY, vec![array_ptr.clone()], Type::Void);
        module.declare_if_missing(
            runtime::GET_ELEMENT_PTR,
            vec![array_ptr.clone(), Type::Int(64)],
            byte_ptr.clone(),
        );

        Ok(Self {
            qubit_ptr,
            array_ptr,
            byte_ptr,
        })
    }
}

/// Populate the operation at `target_index` with the reversible circuit for
/// `axag`, whose PIs/POs correspond to the source function at
/// `source_index`.
pub fn write_operation(
    module: &mut Module,
    context: &QirContext,
    axag: &AbstractXag,
    source_index: usize,
    target_index: usize,
) -> CompileResult<()> {
    let source_params: Vec<Type> = module.functions[source_index]
        .params
        .iter()
        .map(|p| p.ty.clone())
        .collect();
    let source_ret = module.functions[source_index].ret.clone();

    let operation = module.functions[target_index].name.clone();
    let target_params: Vec<Type> = module.functions[target_index]
        .params
        .iter()
        .map(|p| p.ty.clone())
        .collect();
    if target_params.len() != 2 {
        return Err(CompileError::Operation {
            operation,
            detail: format!(
                "expected (input, output) parameters, got {}",
                target_params.len()
            ),
        });
    }

    // tuple layouts are validated against the type table up front, before
    // the function is mutably borrowed for rebuilding
    if source_params.len() > 1 {
        let in_struct = target_params[0].pointee_struct().ok_or_else(|| {
            CompileError::Operation {
                operation: operation.clone(),
                detail: "first parameter is not a tuple pointer".into(),
            }
        })?;
        let fields = module
            .types
            .get(in_struct)
            .map(|def| def.fields.len())
            .unwrap_or(0);
        if fields < source_params.len() {
            return Err(CompileError::Operation {
                operation,
                detail: format!("input tuple %{in_struct} has too few fields"),
            });
        }
    }
    if source_ret.pointee_struct() == Some("TupleHeader") {
        let out_struct = target_params[1].pointee_struct().ok_or_else(|| {
            CompileError::Operation {
                operation: operation.clone(),
                detail: "second parameter is not a tuple pointer".into(),
            }
        })?;
        let fields = module
            .types
            .get(out_struct)
            .map(|def| def.fields.len())
            .unwrap_or(0);
        if fields < axag.pos().len() {
            return Err(CompileError::Operation {
                operation,
                detail: format!("output tuple %{out_struct} has too few fields"),
            });
        }
    }

    let writer = Writer { context, axag };
    let function = &mut module.functions[target_index];
    let mut builder = Builder::rebuild(function);

    let inputs = writer.load_inputs(&mut builder, &source_params, &target_params)?;
    if inputs.len() != axag.num_pis() {
        return Err(CompileError::Operation {
            operation,
            detail: format!(
                "{} input qubits for {} primary inputs",
                inputs.len(),
                axag.num_pis()
            ),
        });
    }
    let outputs = writer.load_outputs(&mut builder, &source_ret, &target_params);

    // one ancilla per AND gate
    let num_ands = axag.and_count();
    let temporaries = (num_ands > 0).then(|| {
        let array = builder.call(
            context.array_ptr.clone(),
            runtime::ALLOCATE_ARRAY,
            vec![(
                Type::Int(64),
                Operand::Int {
                    bits: 64,
                    value: num_ands as u64,
                },
            )],
        );
        builder.call_void(
            runtime::UPDATE_ALIAS_COUNT,
            vec![
                (context.array_ptr.clone(), array.clone()),
                (Type::Int(32), Operand::Int { bits: 32, value: 1 }),
            ],
        );
        array
    });

    let mut node_qubit: Vec<Option<Operand>> = vec![None; axag.len()];
    for (position, pi) in axag.pis().iter().enumerate() {
        node_qubit[pi.index()] = Some(inputs[position].clone());
    }

    // compute pass, in topological order
    let and_nodes = axag.and_nodes();
    for (index, &node) in and_nodes.iter().enumerate() {
        writer.translate_and_gate(
            &mut builder,
            &mut node_qubit,
            temporaries.as_ref(),
            node,
            index,
            true,
        );
    }

    // copy out to the output qubits
    for (position, po) in axag.pos().iter().enumerate() {
        if let Some(node) = po.node {
            for leaf in axag.linear_fanin(node) {
                let control = node_qubit[leaf.index()].clone().expect("leaf on a qubit");
                writer.cnot(&mut builder, control, outputs[position].clone());
            }
        }
        if po.complemented {
            writer.x(&mut builder, outputs[position].clone());
        }
    }

    // uncompute pass, in reverse topological order
    for (index, &node) in and_nodes.iter().enumerate().rev() {
        writer.translate_and_gate(
            &mut builder,
            &mut node_qubit,
            temporaries.as_ref(),
            node,
            index,
            false,
        );
    }

    if let Some(array) = temporaries {
        builder.call_void(
            runtime::RELEASE_ARRAY,
            vec![(context.array_ptr.clone(), array.clone())],
        );
        builder.call_void(
            runtime::UPDATE_ALIAS_COUNT,
            vec![
                (context.array_ptr.clone(), array),
                (
                    Type::Int(32),
                    Operand::Int {
                        bits: 32,
                        value: -1i64 as u64,
                    },
                ),
            ],
        );
    }

    builder.finish();
    debug!(
        operation = module.functions[target_index].name.as_str(),
        ands = num_ands,
        "emitted reversible circuit"
    );
    Ok(())
}

struct Writer<'a> {
    context: &'a QirContext,
    axag: &'a AbstractXag,
}

impl Writer<'_> {
    /// Bind every primary input to a qubit value loaded from the
    /// operation's first parameter.
    fn load_inputs(
        &self,
        builder: &mut Builder<'_>,
        source_params: &[Type],
        target_params: &[Type],
    ) -> CompileResult<Vec<Operand>> {
        let mut inputs = Vec::with_capacity(self.axag.num_pis());

        if source_params.len() == 1 {
            // single argument: the parameter is the qubit or array itself
            match &source_params[0] {
                ty if ty.is_int(1) => inputs.push(builder.param(0)),
                _ => {
                    let array = builder.param(0);
                    self.load_array_qubits(builder, array, &mut inputs);
                }
            }
            return Ok(inputs);
        }

        let in_struct = target_params[0]
            .pointee_struct()
            .expect("validated by write_operation")
            .to_string();
        for (position, param) in source_params.iter().enumerate() {
            let field = builder.struct_gep(&in_struct, builder.param(0), position as u32);
            if param.is_int(1) {
                let qubit = builder.load(self.context.qubit_ptr.clone(), field);
                inputs.push(qubit);
            } else {
                let array = builder.load(self.context.array_ptr.clone(), field);
                self.load_array_qubits(builder, array, &mut inputs);
            }
        }
        Ok(inputs)
    }

    /// Load the output qubits from the operation's second parameter.
    fn load_outputs(
        &self,
        builder: &mut Builder<'_>,
        source_ret: &Type,
        target_params: &[Type],
    ) -> Vec<Operand> {
        if source_ret.is_int(1) {
            return vec![builder.param(1)];
        }
        if source_ret.is_int(64) {
            let array = builder.param(1);
            let mut outputs = Vec::with_capacity(64);
            self.load_array_qubits(builder, array, &mut outputs);
            return outputs;
        }

        let out_struct = target_params[1]
            .pointee_struct()
            .expect("validated by write_operation")
            .to_string();
        (0..self.axag.pos().len())
            .map(|position| {
                let field = builder.struct_gep(&out_struct, builder.param(1), position as u32);
                builder.load(self.context.qubit_ptr.clone(), field)
            })
            .collect()
    }

    /// Load the 64 qubits of a qubit array, index order.
    fn load_array_qubits(
        &self,
        builder: &mut Builder<'_>,
        array: Operand,
        into: &mut Vec<Operand>,
    ) {
        for index in 0..64u64 {
            let qubit = self.load_array_element(builder, array.clone(), index);
            into.push(qubit);
        }
    }

    fn load_array_element(
        &self,
        builder: &mut Builder<'_>,
        array: Operand,
        index: u64,
    ) -> Operand {
        let element = builder.call(
            self.context.byte_ptr.clone(),
            runtime::GET_ELEMENT_PTR,
            vec![
                (self.context.array_ptr.clone(), array),
                (
                    Type::Int(64),
                    Operand::Int {
                        bits: 64,
                        value: index,
                    },
                ),
            ],
        );
        let cast = builder.bitcast(
            self.context.byte_ptr.clone(),
            element,
            self.context.qubit_ptr.clone().pointer_to(),
        );
        builder.load(self.context.qubit_ptr.clone(), cast)
    }

    /// Translate one AND gate, used for both compute and uncompute.
    ///
    /// Each side's linear fanin is XORed in place onto a target qubit, the
    /// CCNOT stores the conjunction on the ancilla, and the preparation
    /// CNOTs are replayed in reverse to restore the targets. Targets are
    /// chosen from the set differences of the two sides; when one side's
    /// fanin is contained in the other's, the subset's target is folded
    /// into the superset's target with one extra CNOT.
    fn translate_and_gate(
        &self,
        builder: &mut Builder<'_>,
        node_qubit: &mut [Option<Operand>],
        temporaries: Option<&Operand>,
        node: AId,
        index: usize,
        compute: bool,
    ) {
        let [left, right] = self.axag.and_fanins(node);
        let side_left = self.axag.linear_fanin(left);
        let side_right = self.axag.linear_fanin(right);
        let only_left = difference(&side_left, &side_right);
        let only_right = difference(&side_right, &side_left);

        // (control, target) preparation sequence
        let mut pairs: Vec<(AId, AId)> = Vec::new();
        let (target_left, target_right) = match (only_left.first(), only_right.first()) {
            (Some(&target_left), Some(&target_right)) => {
                pairs.extend(others(&side_left, target_left).map(|q| (q, target_left)));
                pairs.extend(others(&side_right, target_right).map(|q| (q, target_right)));
                (target_left, target_right)
            }
            (None, Some(&target_right)) => {
                // left fanin ⊆ right fanin
                let target_left = side_left[0];
                pairs.extend(others(&side_left, target_left).map(|q| (q, target_left)));
                pairs.extend(others(&only_right, target_right).map(|q| (q, target_right)));
                pairs.push((target_left, target_right));
                (target_left, target_right)
            }
            (Some(&target_left), None) => {
                // right fanin ⊆ left fanin
                let target_right = side_right[0];
                pairs.extend(others(&side_right, target_right).map(|q| (q, target_right)));
                pairs.extend(others(&only_left, target_left).map(|q| (q, target_left)));
                pairs.push((target_right, target_left));
                (target_left, target_right)
            }
            (None, None) => unreachable!("AND sides with equal linear fanin fold away"),
        };

        for (control, target) in &pairs {
            let control = node_qubit[control.index()].clone().expect("leaf on a qubit");
            let target = node_qubit[target.index()].clone().expect("leaf on a qubit");
            self.cnot(builder, control, target);
        }

        let array = temporaries.expect("AND gates imply an ancilla array");
        let ancilla = self.load_array_element(builder, array.clone(), index as u64);
        let control_left = node_qubit[target_left.index()].clone().expect("leaf on a qubit");
        let control_right = node_qubit[target_right.index()]
            .clone()
            .expect("leaf on a qubit");
        builder.call_void(
            runtime::CCNOT,
            vec![
                (self.context.qubit_ptr.clone(), control_left),
                (self.context.qubit_ptr.clone(), control_right),
                (self.context.qubit_ptr.clone(), ancilla.clone()),
            ],
        );
        if compute {
            node_qubit[node.index()] = Some(ancilla);
        }

        for (control, target) in pairs.iter().rev() {
            let control = node_qubit[control.index()].clone().expect("leaf on a qubit");
            let target = node_qubit[target.index()].clone().expect("leaf on a qubit");
            self.cnot(builder, control, target);
        }
    }

    fn cnot(&self, builder: &mut Builder<'_>, control: Operand, target: Operand) {
        builder.call_void(
            runtime::CNOT,
            vec![
                (self.context.qubit_ptr.clone(), control),
                (self.context.qubit_ptr.clone(), target),
            ],
        );
    }

    fn x(&self, builder: &mut Builder<'_>, target: Operand) {
        builder.call_void(runtime::X, vec![(self.context.qubit_ptr.clone(), target)]);
    }
}

/// Elements of sorted `a` not in sorted `b`.
fn difference(a: &[AId], b: &[AId]) -> Vec<AId> {
    let mut out = Vec::new();
    let mut j = 0;
    for &x in a {
        while j < b.len() && b[j] < x {
            j += 1;
        }
        if j >= b.len() || b[j] != x {
            out.push(x);
        }
    }
    out
}

/// All elements of a side except its target.
fn others<'s>(side: &'s [AId], target: AId) -> impl Iterator<Item = AId> + 's {
    side.iter().copied().filter(move |q| *q != target)
}
