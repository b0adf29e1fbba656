//! XOR-AND graph core for Alsvid
//!
//! This crate provides the Boolean-network layer of the oracle compiler:
//!
//! - [`Xag`]: the XOR-AND graph the reader lowers classical IR into —
//!   2-input AND and XOR gates, complemented edges, structural hashing,
//!   topological iteration, dangling cleanup;
//! - [`TruthTable`]: dynamically sized truth tables used by the optimizer's
//!   collapse and resynthesis steps;
//! - [`generators`]: bit-vector constructions (ripple adders/subtractors,
//!   modular arithmetic, multiplexers) matching the reader's little-endian
//!   word convention;
//! - [`AbstractXag`]: the normalized form the circuit writer consumes —
//!   n-ary XOR nodes and complementation on primary-output edges only.
//!
//! # Example
//!
//! ```rust
//! use alsvid_xag::{AbstractXag, Xag};
//!
//! let mut xag = Xag::new();
//! let a = xag.create_pi();
//! let b = xag.create_pi();
//! let c = xag.create_pi();
//! let majority = xag.create_maj(a, b, c);
//! xag.create_po(majority);
//!
//! // one AND gate is enough for majority
//! assert_eq!(xag.and_count(), 1);
//!
//! // the abstract form preserves the AND count exactly
//! let axag = AbstractXag::from_xag(&xag);
//! assert_eq!(axag.and_count(), 1);
//! ```

pub mod abstract_xag;
pub mod generators;
pub mod network;
pub mod truth;

pub use abstract_xag::{AId, ANode, APo, AbstractXag};
pub use network::{Checkpoint, Node, NodeId, Signal, Xag};
pub use truth::TruthTable;
