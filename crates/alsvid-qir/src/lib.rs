//! QIR module model for Alsvid
//!
//! This crate provides the data model, parser and printer for the subset of
//! LLVM-style textual IR that QIR oracle modules use. It is the host
//! representation the oracle compiler reads classical functions from and
//! writes synthesized operation bodies into.
//!
//! # Supported subset
//!
//! | Feature | Example |
//! |---------|---------|
//! | Opaque and struct types | `%Qubit = type opaque` |
//! | Declarations | `declare void @__quantum__qis__x__body(%Qubit*)` |
//! | Definitions | `define i1 @Ns__F__body(i1 %a) { ... }` |
//! | Integer logic | `and`, `or`, `xor`, `add`, `mul`, `srem` |
//! | Comparisons | `icmp eq/ne/sgt/... i64 %x, %y` |
//! | Control flow | `br`, conditional `br`, `ret`, `phi` |
//! | Memory | `alloca`, `load`, `store`, `bitcast`, `getelementptr` |
//! | Calls | `call i1 @Ns__Helper__body(i1 %a)` |
//! | QIR sizeof idiom | `ptrtoint (%T* getelementptr (%T, %T* null, i32 1) to i64)` |
//!
//! # Example
//!
//! ```rust
//! use alsvid_qir::{parse, print};
//!
//! let source = r"
//!     define i1 @Test__Id__body(i1 %a) {
//!     entry:
//!       ret i1 %a
//!     }
//! ";
//!
//! let module = parse(source).unwrap();
//! assert_eq!(module.functions.len(), 1);
//!
//! let printed = print(&module);
//! assert!(printed.contains("define i1 @Test__Id__body(i1 %0)"));
//! ```

pub mod builder;
pub mod error;
pub mod lexer;
pub mod module;
pub mod parser;
pub mod printer;
pub mod types;

pub use builder::Builder;
pub use error::{ParseError, ParseResult};
pub use module::{
    BinaryOp, Block, Function, IcmpPred, Inst, LocalId, Module, Op, Operand, Param,
};
pub use parser::parse;
pub use printer::print;
pub use types::{StructDef, Type, TypeTable};
