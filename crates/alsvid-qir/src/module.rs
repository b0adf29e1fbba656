//! Module, function and instruction data model.
//!
//! Locals carry dense per-function ids assigned in parse order, so reader
//! state can live in flat vectors instead of pointer-keyed maps.

use rustc_hash::FxHashMap;
use std::fmt;

use crate::types::{Type, TypeTable};

/// Dense identifier for a local value within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalId(pub u32);

impl LocalId {
    /// The id as a usize index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// An instruction operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A local value.
    Local(LocalId),
    /// An integer constant of the given width.
    Int { bits: u32, value: u64 },
    /// A null pointer of the given type.
    Null(Type),
    /// A reference to a global (function) symbol.
    Global(String),
    /// The QIR sizeof idiom:
    /// `ptrtoint (%T* getelementptr (%T, %T* null, i32 1) to i64)`.
    SizeOf(String),
}

impl Operand {
    /// The local id, if this operand is a local.
    pub fn local(&self) -> Option<LocalId> {
        match self {
            Operand::Local(id) => Some(*id),
            _ => None,
        }
    }

    /// The constant value, if this operand is an integer constant.
    pub fn constant(&self) -> Option<u64> {
        match self {
            Operand::Int { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Two-operand integer operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Xor,
    Add,
    Mul,
    Srem,
}

impl BinaryOp {
    /// The IR mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Add => "add",
            BinaryOp::Mul => "mul",
            BinaryOp::Srem => "srem",
        }
    }
}

/// Integer comparison predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcmpPred {
    Eq,
    Ne,
    Sgt,
    Sge,
    Slt,
    Sle,
    Ugt,
    Uge,
    Ult,
    Ule,
}

impl IcmpPred {
    /// The IR mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            IcmpPred::Eq => "eq",
            IcmpPred::Ne => "ne",
            IcmpPred::Sgt => "sgt",
            IcmpPred::Sge => "sge",
            IcmpPred::Slt => "slt",
            IcmpPred::Sle => "sle",
            IcmpPred::Ugt => "ugt",
            IcmpPred::Uge => "uge",
            IcmpPred::Ult => "ult",
            IcmpPred::Ule => "ule",
        }
    }
}

/// An instruction operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    /// `and`/`or`/`xor`/`add`/`mul`/`srem` on integers.
    Binary {
        op: BinaryOp,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    /// `icmp <pred> <ty> <lhs>, <rhs>`.
    Icmp {
        pred: IcmpPred,
        ty: Type,
        lhs: Operand,
        rhs: Operand,
    },
    /// `select i1 <cond>, <ty> <a>, <ty> <b>`.
    Select {
        ty: Type,
        cond: Operand,
        if_true: Operand,
        if_false: Operand,
    },
    /// Unconditional branch to a labeled block.
    Br { target: String },
    /// Conditional branch.
    CondBr {
        cond: Operand,
        if_true: String,
        if_false: String,
    },
    /// Return, with an optional typed value.
    Ret { value: Option<(Type, Operand)> },
    /// Call of a global function.
    Call {
        ret: Type,
        callee: String,
        args: Vec<(Type, Operand)>,
    },
    /// Stack slot allocation.
    Alloca { ty: Type },
    /// `load <ty>, <ty>* <ptr>`.
    Load { ty: Type, ptr: Operand },
    /// `store <ty> <value>, <ty>* <ptr>`.
    Store {
        ty: Type,
        value: Operand,
        ptr: Operand,
    },
    /// `bitcast <from> <value> to <to>`.
    BitCast {
        from: Type,
        value: Operand,
        to: Type,
    },
    /// `getelementptr <ty>, <ty>* <ptr>, <indices...>`.
    GetElementPtr {
        ty: Type,
        ptr: Operand,
        indices: Vec<(Type, Operand)>,
    },
    /// `phi <ty> [ <value>, %<label> ], ...`.
    Phi {
        ty: Type,
        incoming: Vec<(Operand, String)>,
    },
}

impl Op {
    /// The instruction mnemonic, used in diagnostics.
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Op::Binary { op, .. } => op.mnemonic(),
            Op::Icmp { .. } => "icmp",
            Op::Select { .. } => "select",
            Op::Br { .. } | Op::CondBr { .. } => "br",
            Op::Ret { .. } => "ret",
            Op::Call { .. } => "call",
            Op::Alloca { .. } => "alloca",
            Op::Load { .. } => "load",
            Op::Store { .. } => "store",
            Op::BitCast { .. } => "bitcast",
            Op::GetElementPtr { .. } => "getelementptr",
            Op::Phi { .. } => "phi",
        }
    }

    /// Whether this operation terminates a basic block.
    pub fn is_terminator(&self) -> bool {
        matches!(self, Op::Br { .. } | Op::CondBr { .. } | Op::Ret { .. })
    }
}

/// An instruction: an operation plus its result local, if it produces one.
#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    /// The result local, `None` for void operations.
    pub result: Option<LocalId>,
    /// The operation.
    pub op: Op,
}

/// A labeled basic block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    /// The block label.
    pub label: String,
    /// Instructions, the last of which is the terminator.
    pub insts: Vec<Inst>,
}

impl Block {
    /// Create an empty block with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            insts: Vec::new(),
        }
    }

    /// The terminator instruction, if the block is nonempty.
    pub fn terminator(&self) -> Option<&Inst> {
        self.insts.last().filter(|inst| inst.op.is_terminator())
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    /// Parameter type.
    pub ty: Type,
    /// The local bound to this parameter.
    pub id: LocalId,
}

/// A function definition or declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    /// The linkage name, without the leading `@`.
    pub name: String,
    /// Parameters, bound to locals `0..n`.
    pub params: Vec<Param>,
    /// Return type.
    pub ret: Type,
    /// Basic blocks; empty for declarations. Block 0 is the entry block.
    pub blocks: Vec<Block>,
    num_locals: u32,
}

impl Function {
    /// Create a function with the given signature and no body.
    pub fn new(name: impl Into<String>, param_types: Vec<Type>, ret: Type) -> Self {
        let params = param_types
            .into_iter()
            .enumerate()
            .map(|(i, ty)| Param {
                ty,
                id: LocalId(i as u32),
            })
            .collect::<Vec<_>>();
        let num_locals = params.len() as u32;
        Self {
            name: name.into(),
            params,
            ret,
            blocks: Vec::new(),
            num_locals,
        }
    }

    /// Whether this function is a declaration (no body).
    pub fn is_declaration(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Allocate a fresh local id.
    pub fn new_local(&mut self) -> LocalId {
        let id = LocalId(self.num_locals);
        self.num_locals += 1;
        id
    }

    /// The number of locals in this function.
    pub fn num_locals(&self) -> usize {
        self.num_locals as usize
    }

    /// The entry block.
    pub fn entry(&self) -> Option<&Block> {
        self.blocks.first()
    }

    /// Find a block index by label.
    pub fn block_index(&self, label: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.label == label)
    }

    /// Drop the body and reset the local counter to the parameters.
    ///
    /// Used by the circuit writer before repopulating an operation.
    pub fn reset_body(&mut self) {
        self.blocks.clear();
        self.num_locals = self.params.len() as u32;
    }
}

/// A parsed QIR module: the type table plus all functions.
#[derive(Debug, Clone, Default)]
pub struct Module {
    /// Named struct types.
    pub types: TypeTable,
    /// All declarations and definitions, in source order.
    pub functions: Vec<Function>,
    by_name: FxHashMap<String, usize>,
}

impl Module {
    /// Create an empty module.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function. Returns its index, or `None` if the name is taken.
    pub fn add_function(&mut self, function: Function) -> Option<usize> {
        if self.by_name.contains_key(&function.name) {
            return None;
        }
        let index = self.functions.len();
        self.by_name.insert(function.name.clone(), index);
        self.functions.push(function);
        Some(index)
    }

    /// Find a function index by name.
    pub fn function_index(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Find a function by name.
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.function_index(name).map(|i| &self.functions[i])
    }

    /// Ensure a declaration with the given signature exists.
    ///
    /// An existing function of the same name is left untouched.
    pub fn declare_if_missing(&mut self, name: &str, param_types: Vec<Type>, ret: Type) {
        if self.by_name.contains_key(name) {
            return;
        }
        let function = Function::new(name, param_types, ret);
        self.add_function(function);
    }
}
