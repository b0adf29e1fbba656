//! Lowering classical IR functions into XOR-AND graphs.
//!
//! The reader walks the entry block of a (previously normalized) classical
//! function, mapping every IR value to a little-endian vector of graph
//! signals: one signal for an i1, sixty-four for an i64. Branches recurse
//! into both successors and merge one-bit results with an ITE on the
//! condition; calls to other classical functions are inlined recursively
//! with a fresh frame.

use rustc_hash::FxHashMap;
use tracing::debug;

use alsvid_qir::{
    BinaryOp, Function, IcmpPred, Inst, LocalId, Module, Op, Operand, Type,
};
use alsvid_xag::generators::{
    carry_ripple_subtractor_inplace, constant_word, modular_adder_inplace,
    modular_adder_with_modulus_inplace, modular_multiplier, mux_vector,
};
use alsvid_xag::{Signal, Xag};

use crate::error::{CompileError, CompileResult};
use crate::runtime;

/// Check whether a function signature is supported as a classical source:
/// parameters restricted to i1/i64, return type i1, i64, or `%TupleHeader*`.
pub fn supported_signature(function: &Function) -> bool {
    for param in &function.params {
        if !param.ty.is_int(1) && !param.ty.is_int(64) {
            return false;
        }
    }
    function.ret.is_int(1)
        || function.ret.is_int(64)
        || function.ret.pointee_struct() == Some("TupleHeader")
}

/// Lower the classical function at `index` into an XAG.
///
/// Primary inputs are bound to the parameters in order; primary outputs are
/// the bits of the returned value. Dangling nodes are cleaned up before the
/// network is returned.
pub fn read_function(module: &Module, index: usize) -> CompileResult<Xag> {
    let function = &module.functions[index];
    if !supported_signature(function) {
        return Err(CompileError::Signature {
            function: function.name.clone(),
        });
    }

    let mut reader = Reader {
        module,
        xag: Xag::new(),
        call_stack: vec![index],
    };

    let mut arguments = Vec::with_capacity(function.params.len());
    for param in &function.params {
        let width = if param.ty.is_int(1) { 1 } else { 64 };
        arguments.push((0..width).map(|_| reader.xag.create_pi()).collect());
    }

    let outputs = reader.process_function(function, arguments)?;
    for signal in outputs {
        reader.xag.create_po(signal);
    }

    debug!(
        function = function.name.as_str(),
        pis = reader.xag.num_pis(),
        gates = reader.xag.num_gates(),
        "lowered function"
    );
    Ok(reader.xag.cleanup_dangling())
}

/// Per-invocation reader state: one value frame per inlined call.
struct Frame {
    /// Value-to-signal map, dense over the function's locals.
    values: Vec<Option<Vec<Signal>>>,
    /// Tuple-header aliases: bitcast result -> original tuple value.
    tuple_alias: FxHashMap<LocalId, LocalId>,
    /// Tuple-element cursors: GEP result -> (tuple value, element offset).
    tuple_slots: FxHashMap<LocalId, (LocalId, usize)>,
}

impl Frame {
    fn new(num_locals: usize) -> Self {
        Self {
            values: vec![None; num_locals],
            tuple_alias: FxHashMap::default(),
            tuple_slots: FxHashMap::default(),
        }
    }
}

struct Reader<'m> {
    module: &'m Module,
    xag: Xag,
    call_stack: Vec<usize>,
}

impl<'m> Reader<'m> {
    fn process_function(
        &mut self,
        function: &'m Function,
        arguments: Vec<Vec<Signal>>,
    ) -> CompileResult<Vec<Signal>> {
        let mut frame = Frame::new(function.num_locals());
        for (param, argument) in function.params.iter().zip(arguments) {
            frame.values[param.id.index()] = Some(argument);
        }
        self.process_block(function, &mut frame, 0)
    }

    fn process_block(
        &mut self,
        function: &'m Function,
        frame: &mut Frame,
        block_index: usize,
    ) -> CompileResult<Vec<Signal>> {
        let block = &function.blocks[block_index];
        let mut terminator_value: Option<Vec<Signal>> = None;

        for (position, inst) in block.insts.iter().enumerate() {
            match &inst.op {
                Op::Binary {
                    op: op @ (BinaryOp::And | BinaryOp::Or | BinaryOp::Xor),
                    lhs,
                    rhs,
                    ..
                } => {
                    let lhs = self.signal_vector(function, frame, lhs)?;
                    let rhs = self.signal_vector(function, frame, rhs)?;
                    if lhs.len() != rhs.len() {
                        return Err(self.shape(function, "bitwise operation", format!(
                            "operand widths differ ({} vs {})",
                            lhs.len(),
                            rhs.len()
                        )));
                    }
                    let combine = match op {
                        BinaryOp::And => Xag::create_and,
                        BinaryOp::Or => Xag::create_or,
                        _ => Xag::create_xor,
                    };
                    let result = lhs
                        .iter()
                        .zip(&rhs)
                        .map(|(a, b)| combine(&mut self.xag, *a, *b))
                        .collect();
                    bind(frame, inst, result);
                }

                Op::Binary {
                    op: BinaryOp::Add,
                    lhs,
                    rhs,
                    ..
                } => {
                    let mut accumulator = self.signal_vector(function, frame, lhs)?;
                    let addend = self.signal_vector(function, frame, rhs)?;
                    modular_adder_inplace(&mut self.xag, &mut accumulator, &addend);
                    bind(frame, inst, accumulator);
                }

                Op::Binary {
                    op: BinaryOp::Mul, ..
                } => {
                    // A bare multiplication has no modulus; it must be
                    // reduced by the srem that immediately follows it.
                    if !srem_follows(block.insts.get(position + 1), inst.result) {
                        return Err(self.shape(
                            function,
                            "mul",
                            "64-bit mul must be reduced by an immediately \
                             following srem with a constant divisor"
                                .into(),
                        ));
                    }
                }

                Op::Binary {
                    op: BinaryOp::Srem,
                    lhs,
                    rhs,
                    ..
                } => {
                    let previous = position.checked_sub(1).map(|p| &block.insts[p]);
                    let result = self.process_srem(function, frame, previous, lhs, rhs)?;
                    bind(frame, inst, result);
                }

                Op::Icmp { pred, lhs, rhs, .. } => {
                    let result = self.process_icmp(function, frame, *pred, lhs, rhs)?;
                    bind(frame, inst, result);
                }

                Op::Select {
                    cond,
                    if_true,
                    if_false,
                    ..
                } => {
                    let cond = self.first_signal(function, frame, cond)?;
                    let if_true = self.signal_vector(function, frame, if_true)?;
                    let if_false = self.signal_vector(function, frame, if_false)?;
                    if if_true.len() != if_false.len() {
                        return Err(self.shape(function, "select", format!(
                            "operand widths differ ({} vs {})",
                            if_true.len(),
                            if_false.len()
                        )));
                    }
                    let result = if if_true.len() == 1 {
                        vec![self.xag.create_ite(cond, if_true[0], if_false[0])]
                    } else {
                        mux_vector(&mut self.xag, cond, &if_true, &if_false)
                    };
                    bind(frame, inst, result);
                }

                Op::Br { target } => {
                    let successor = self.block_target(function, target)?;
                    terminator_value = Some(self.process_block(function, frame, successor)?);
                }

                Op::CondBr {
                    cond,
                    if_true,
                    if_false,
                } => {
                    let cond = self.first_signal(function, frame, cond)?;
                    let then_index = self.block_target(function, if_true)?;
                    let else_index = self.block_target(function, if_false)?;
                    let then_value = self.process_block(function, frame, then_index)?;
                    let else_value = self.process_block(function, frame, else_index)?;
                    let (then_bit, else_bit) = match (then_value.first(), else_value.first()) {
                        (Some(t), Some(e)) => (*t, *e),
                        _ => {
                            return Err(self.shape(
                                function,
                                "br",
                                "conditional branch arms must produce a value".into(),
                            ));
                        }
                    };
                    let merged = self.xag.create_ite(cond, then_bit, else_bit);
                    terminator_value = Some(vec![merged]);
                }

                Op::Ret { value } => {
                    let Some((_, operand)) = value else {
                        return Err(self.shape(function, "ret", "void return".into()));
                    };
                    terminator_value = Some(self.signal_vector(function, frame, operand)?);
                }

                Op::Call { callee, args, .. } => {
                    let result = self.process_call(function, frame, callee, args)?;
                    bind(frame, inst, result);
                }

                Op::Alloca { ty } => {
                    if !ty.is_int(1) {
                        return Err(self.shape(
                            function,
                            "alloca",
                            format!("only scalar i1 stack slots are supported, got {ty}"),
                        ));
                    }
                    bind(frame, inst, vec![self.xag.constant(false)]);
                }

                Op::Load { ptr, .. } => {
                    let value = self.signal_vector(function, frame, ptr)?;
                    bind(frame, inst, value);
                }

                Op::Store { value, ptr, .. } => {
                    self.process_store(function, frame, value, ptr)?;
                }

                Op::BitCast { value, to, .. } => {
                    self.process_bitcast(function, frame, inst, value, to)?;
                }

                Op::GetElementPtr { ptr, indices, .. } => {
                    self.process_gep(function, frame, inst, ptr, indices)?;
                }

                Op::Phi { .. } => {
                    return Err(CompileError::Opcode {
                        function: function.name.clone(),
                        opcode: "phi (normalization did not run)".into(),
                    });
                }
            }
        }

        terminator_value.ok_or_else(|| {
            self.shape(function, "block", format!(
                "block %{} has no terminator value",
                function.blocks[block_index].label
            ))
        })
    }

    fn process_icmp(
        &mut self,
        function: &'m Function,
        frame: &mut Frame,
        pred: IcmpPred,
        lhs: &Operand,
        rhs: &Operand,
    ) -> CompileResult<Vec<Signal>> {
        match pred {
            IcmpPred::Eq => {
                let lhs = self.signal_vector(function, frame, lhs)?;
                let rhs = self.signal_vector(function, frame, rhs)?;
                let xnors: Vec<Signal> = lhs
                    .iter()
                    .zip(&rhs)
                    .map(|(a, b)| self.xag.create_xnor(*a, *b))
                    .collect();
                Ok(vec![self.xag.create_nary_and(&xnors)])
            }
            IcmpPred::Ne => {
                let lhs = self.signal_vector(function, frame, lhs)?;
                let rhs = self.signal_vector(function, frame, rhs)?;
                let xors: Vec<Signal> = lhs
                    .iter()
                    .zip(&rhs)
                    .map(|(a, b)| self.xag.create_xor(*a, *b))
                    .collect();
                Ok(vec![self.xag.create_nary_or(&xors)])
            }
            IcmpPred::Sgt => {
                // rhs - lhs with an initial borrow; the borrow-out decides.
                let mut difference = self.signal_vector(function, frame, rhs)?;
                let subtrahend = self.signal_vector(function, frame, lhs)?;
                let mut carry = self.xag.constant(true);
                carry_ripple_subtractor_inplace(
                    &mut self.xag,
                    &mut difference,
                    &subtrahend,
                    &mut carry,
                );
                Ok(vec![carry])
            }
            other => Err(CompileError::Predicate {
                function: function.name.clone(),
                predicate: other.mnemonic().into(),
            }),
        }
    }

    fn process_srem(
        &mut self,
        function: &'m Function,
        frame: &mut Frame,
        previous: Option<&Inst>,
        lhs: &Operand,
        rhs: &Operand,
    ) -> CompileResult<Vec<Signal>> {
        let Some(modulus) = rhs.constant().filter(|m| *m > 0) else {
            return Err(self.shape(
                function,
                "srem",
                "divisor must be a positive constant".into(),
            ));
        };

        // srem annotates the immediately preceding add or mul: the
        // unreduced result is replaced by a modular variant built from the
        // original operands.
        let Some(previous) = previous else {
            return Err(self.shape(function, "srem", "no preceding instruction".into()));
        };
        let dividend = lhs.local();
        if dividend.is_none() || previous.result != dividend {
            return Err(self.shape(
                function,
                "srem",
                "dividend must be the immediately preceding instruction".into(),
            ));
        }

        match &previous.op {
            Op::Binary {
                op: BinaryOp::Add,
                lhs: a,
                rhs: b,
                ..
            } => {
                let mut accumulator = self.signal_vector(function, frame, a)?;
                let addend = self.signal_vector(function, frame, b)?;
                modular_adder_with_modulus_inplace(
                    &mut self.xag,
                    &mut accumulator,
                    &addend,
                    modulus,
                );
                Ok(accumulator)
            }
            Op::Binary {
                op: BinaryOp::Mul,
                lhs: a,
                rhs: b,
                ..
            } => {
                let multiplicand = self.signal_vector(function, frame, a)?;
                let multiplier = self.signal_vector(function, frame, b)?;
                Ok(modular_multiplier(
                    &mut self.xag,
                    &multiplicand,
                    &multiplier,
                    modulus,
                ))
            }
            _ => Err(self.shape(
                function,
                "srem",
                "dividend must come from an add or mul".into(),
            )),
        }
    }

    fn process_call(
        &mut self,
        function: &'m Function,
        frame: &mut Frame,
        callee: &str,
        args: &[(Type, Operand)],
    ) -> CompileResult<Vec<Signal>> {
        if callee == runtime::TUPLE_CREATE {
            return self.process_tuple_create(function, args);
        }

        let Some(callee_index) = self.module.function_index(callee) else {
            return Err(self.shape(
                function,
                "call",
                format!("unsupported function call to @{callee}"),
            ));
        };
        let callee_fn = &self.module.functions[callee_index];
        if callee_fn.is_declaration() || !supported_signature(callee_fn) {
            return Err(self.shape(
                function,
                "call",
                format!("unsupported function call to @{callee}"),
            ));
        }
        if self.call_stack.contains(&callee_index) {
            return Err(self.shape(
                function,
                "call",
                format!("recursive call to @{callee}"),
            ));
        }

        let mut arguments = Vec::with_capacity(args.len());
        for (_, operand) in args {
            arguments.push(self.signal_vector(function, frame, operand)?);
        }

        self.call_stack.push(callee_index);
        let result = self.process_function(callee_fn, arguments);
        self.call_stack.pop();
        result
    }

    fn process_tuple_create(
        &mut self,
        function: &'m Function,
        args: &[(Type, Operand)],
    ) -> CompileResult<Vec<Signal>> {
        let Some((_, Operand::SizeOf(struct_name))) = args.first() else {
            return Err(self.shape(
                function,
                "tuple_create",
                "argument must be the sizeof constant expression".into(),
            ));
        };
        let Some(def) = self.module.types.get(struct_name) else {
            return Err(CompileError::MissingType(struct_name.clone()));
        };
        let header_then_bools = def.fields.first() == Some(&Type::named("TupleHeader"))
            && def.fields[1..].iter().all(|field| field.is_int(1));
        if !header_then_bools {
            return Err(self.shape(
                function,
                "tuple_create",
                format!("%{struct_name} is not a Boolean tuple"),
            ));
        }
        Ok(vec![self.xag.constant(false); def.fields.len() - 1])
    }

    fn process_store(
        &mut self,
        function: &'m Function,
        frame: &mut Frame,
        value: &Operand,
        ptr: &Operand,
    ) -> CompileResult<()> {
        let Some(ptr) = ptr.local() else {
            return Err(self.shape(function, "store", "destination is not a local".into()));
        };

        if let Some((base, offset)) = frame.tuple_slots.get(&ptr).copied() {
            let signal = self.first_signal(function, frame, value)?;
            let slots = frame.values[base.index()]
                .as_mut()
                .expect("tuple storage bound at tuple_create");
            if offset >= slots.len() {
                return Err(self.shape(
                    function,
                    "store",
                    format!("tuple element {offset} out of range"),
                ));
            }
            slots[offset] = signal;
        } else {
            let vector = self.signal_vector(function, frame, value)?;
            frame.values[ptr.index()] = Some(vector);
        }
        Ok(())
    }

    fn process_bitcast(
        &mut self,
        function: &'m Function,
        frame: &mut Frame,
        inst: &Inst,
        value: &Operand,
        to: &Type,
    ) -> CompileResult<()> {
        let result = inst.result.expect("bitcast produces a value");

        if let Some(source) = value.local() {
            if frame.values[source.index()].is_some() {
                frame.tuple_alias.insert(result, source);
                return Ok(());
            }
            if let Some(base) = frame.tuple_alias.get(&source).copied() {
                frame.tuple_alias.insert(result, base);
                return Ok(());
            }
        }
        if let (Some(constant), Type::Int(bits)) = (value.constant(), to) {
            frame.values[result.index()] =
                Some(constant_word(&self.xag, constant, *bits));
            return Ok(());
        }
        Err(self.shape(
            function,
            "bitcast",
            "source is neither a known value nor an integer constant".into(),
        ))
    }

    fn process_gep(
        &mut self,
        function: &'m Function,
        frame: &mut Frame,
        inst: &Inst,
        ptr: &Operand,
        indices: &[(Type, Operand)],
    ) -> CompileResult<()> {
        let result = inst.result.expect("gep produces a value");
        let base = ptr
            .local()
            .and_then(|p| frame.tuple_alias.get(&p).copied())
            .ok_or_else(|| {
                self.shape(
                    function,
                    "getelementptr",
                    "pointer is not a known tuple header".into(),
                )
            })?;

        let constants: Vec<u64> = indices
            .iter()
            .map(|(_, index)| index.constant())
            .collect::<Option<_>>()
            .ok_or_else(|| {
                self.shape(function, "getelementptr", "indices must be constants".into())
            })?;
        let [first, element] = constants.as_slice() else {
            return Err(self.shape(
                function,
                "getelementptr",
                format!("expected exactly two indices, got {}", constants.len()),
            ));
        };
        if *first != 0 {
            return Err(self.shape(
                function,
                "getelementptr",
                "first index must be zero".into(),
            ));
        }
        if *element == 0 {
            return Err(self.shape(
                function,
                "getelementptr",
                "element zero is the tuple header".into(),
            ));
        }

        frame
            .tuple_slots
            .insert(result, (base, *element as usize - 1));
        Ok(())
    }

    fn signal_vector(
        &mut self,
        function: &'m Function,
        frame: &Frame,
        operand: &Operand,
    ) -> CompileResult<Vec<Signal>> {
        match operand {
            Operand::Local(id) => {
                if let Some(vector) = &frame.values[id.index()] {
                    return Ok(vector.clone());
                }
                if let Some(base) = frame.tuple_alias.get(id) {
                    if let Some(vector) = &frame.values[base.index()] {
                        return Ok(vector.clone());
                    }
                }
                Err(self.shape(
                    function,
                    "operand",
                    format!("cannot find value for local {id}"),
                ))
            }
            Operand::Int { bits: 1, value } => {
                Ok(vec![self.xag.constant(value & 1 == 1)])
            }
            Operand::Int { bits, value } => Ok(constant_word(&self.xag, *value, *bits)),
            other => Err(self.shape(
                function,
                "operand",
                format!("unsupported operand {other:?}"),
            )),
        }
    }

    fn first_signal(
        &mut self,
        function: &'m Function,
        frame: &Frame,
        operand: &Operand,
    ) -> CompileResult<Signal> {
        let vector = self.signal_vector(function, frame, operand)?;
        vector.first().copied().ok_or_else(|| {
            self.shape(function, "operand", "expected a single-bit value".into())
        })
    }

    fn block_target(&self, function: &Function, label: &str) -> CompileResult<usize> {
        function.block_index(label).ok_or_else(|| {
            self.shape(function, "br", format!("unknown block label %{label}"))
        })
    }

    fn shape(&self, function: &Function, construct: &'static str, detail: String) -> CompileError {
        CompileError::Shape {
            function: function.name.clone(),
            construct,
            detail,
        }
    }
}

fn bind(frame: &mut Frame, inst: &Inst, value: Vec<Signal>) {
    if let Some(result) = inst.result {
        frame.values[result.index()] = Some(value);
    }
}

/// Whether `next` is an srem whose dividend is `result` and whose divisor
/// is constant: the only consumer a bare mul may have.
fn srem_follows(next: Option<&Inst>, result: Option<LocalId>) -> bool {
    let Some(Inst {
        op:
            Op::Binary {
                op: BinaryOp::Srem,
                lhs,
                rhs,
                ..
            },
        ..
    }) = next
    else {
        return false;
    };
    lhs.local().is_some() && lhs.local() == result && rhs.constant().is_some()
}
