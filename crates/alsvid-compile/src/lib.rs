//! Oracle synthesis pipeline for Alsvid
//!
//! This crate turns classical Boolean functions inside a QIR module into
//! reversible quantum circuits emitted into matching operation bodies.
//!
//! # Pipeline
//!
//! ```text
//! QIR module
//!     │
//!     ├── driver: find (classical, operation) pairs by name convention
//!     │
//!     ▼   per pair
//! ┌──────────┐    ┌───────────────┐    ┌──────────────────────┐
//! │  reader  │ ─▶ │   optimizer   │ ─▶ │        writer        │
//! │ IR → XAG │    │ XAG → XAG     │    │ abstract XAG → gates │
//! └──────────┘    └───────────────┘    └──────────────────────┘
//!                  collapse + resynth     X / CNOT / CCNOT with
//!                  cut rewriting          Bennett uncompute
//! ```
//!
//! The optimizer minimizes multiplicative complexity (the AND-gate count),
//! because every AND costs an ancilla qubit and a Toffoli in the emitted
//! circuit; XORs compile to CNOT chains.
//!
//! # Example
//!
//! ```rust
//! use alsvid_qir::{parse, print};
//!
//! let source = r"
//!     %Qubit = type opaque
//!     %Array = type opaque
//!     define i1 @Demo__Classical__Id__body(i1 %a) {
//!       ret i1 %a
//!     }
//!     define void @Demo__Id__body(%Qubit* %input, %Qubit* %output) {
//!       ret void
//!     }
//! ";
//!
//! let mut module = parse(source).unwrap();
//! alsvid_compile::compile_module(&mut module).unwrap();
//!
//! // the identity oracle is a single CNOT from input to output
//! let printed = print(&module);
//! assert!(printed.contains("Microsoft__Quantum__Intrinsic__CNOT__body"));
//! ```

pub mod driver;
pub mod error;
pub mod normalize;
pub mod optimize;
pub mod reader;
pub mod runtime;
pub mod writer;

pub use driver::{compile_module, find_function_pairs};
pub use error::{CompileError, CompileResult};
pub use optimize::{CollapseResynthesis, CutRewriting, Optimizer, Resynthesizer, XagPass};
pub use reader::read_function;
pub use writer::{write_operation, QirContext};
