//! QIR runtime symbol names consumed by the pipeline.

/// Pauli-X intrinsic.
pub const X: &str = "__quantum__qis__x__body";

/// CNOT operation.
pub const CNOT: &str = "Microsoft__Quantum__Intrinsic__CNOT__body";

/// Toffoli operation.
pub const CCNOT: &str = "Microsoft__Quantum__Intrinsic__CCNOT__body";

/// Qubit array allocation.
pub const ALLOCATE_ARRAY: &str = "__quantum__rt__qubit_allocate_array";

/// Qubit array release.
pub const RELEASE_ARRAY: &str = "__quantum__rt__qubit_release_array";

/// Array alias-count bookkeeping.
pub const UPDATE_ALIAS_COUNT: &str = "__quantum__rt__array_update_alias_count";

/// Array element access.
pub const GET_ELEMENT_PTR: &str = "__quantum__rt__array_get_element_ptr_1d";

/// Tuple allocation, consumed by the reader's tuple-return protocol.
pub const TUPLE_CREATE: &str = "__quantum__rt__tuple_create";
