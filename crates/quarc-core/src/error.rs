//! Construction-time errors.
//!
//! Everything here is a deterministic encoding-time failure: a precondition
//! checkable without running a solver. Division by a divisor that is only
//! *possibly* zero at solve time is not an error at all; it encodes as a
//! guarded `ite` (see [`NumFactory::divide`](crate::factory::NumFactory::divide)).

use crate::matrix::Dimensions;
use crate::value::Label;

/// Error raised while building the circuit DAG.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FactoryError {
    /// Division by a literal constant zero, detectable without solving.
    #[error("cannot divide by zero: {0} / 0")]
    DivisionByZero(i64),
    /// Modulo by a literal constant zero, detectable without solving.
    #[error("cannot divide by zero: {0} % 0")]
    ModuloByZero(i64),
    /// Negative count passed to bulk variable allocation.
    #[error("expected num_vars >= 0, given num_vars = {0}")]
    NegativeVariableCount(i64),
    /// Lookup of a variable label that was never allocated.
    #[error("expected a variable label, given label = {0}")]
    UnknownVariable(Label),
    /// An operation requiring a variable was handed a derived gate.
    #[error("expected a variable operand, given the node labelled {0}")]
    NotAVariable(Label),
    /// A matrix cell index outside the dimensions' capacity.
    #[error("index {index} out of bounds for capacity {capacity}")]
    IndexOutOfBounds {
        /// The offending index.
        index: usize,
        /// The matrix capacity it must stay below.
        capacity: usize,
    },
    /// Comparison of two matrices with different shapes.
    #[error("dimension mismatch: {0} vs {1}")]
    DimensionMismatch(Dimensions, Dimensions),
    /// A binary matrix entry that is not statically {0,1}-valued.
    #[error("expected a 0/1 entry for a binary matrix, given the node labelled {0}")]
    NonBinaryEntry(Label),
}

/// Result type for circuit construction.
pub type Result<T> = std::result::Result<T, FactoryError>;
