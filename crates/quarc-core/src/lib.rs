//! Symbolic arithmetic-boolean circuit construction for quantitative
//! relational model finding.
//!
//! A [`NumFactory`] builds a shared DAG of integer-valued and boolean-valued
//! nodes: weighted relation entries become numeric variables, and relational
//! operations become arithmetic and comparison gates over sparse matrices.
//! The finished circuit is handed to an SMT backend for solving. Every
//! constructor canonicalizes on the way in; constant operands fold, identity
//! operands vanish, and the shared ZERO/ONE singletons make "no gate was
//! built" checkable by pointer identity.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod accum;
mod boolean;
mod error;
mod factory;
mod matrix;
mod sparse;
mod value;

pub use accum::{BoolAccumulator, NumAccumulator};
pub use boolean::{BoolOp, BoolRef, BoolValue};
pub use error::{FactoryError, Result};
pub use factory::NumFactory;
pub use matrix::{BinMatrix, Dimensions, NumMatrix};
pub use sparse::SparseSeq;
pub use value::{AritOp, CmpOp, Correlation, Label, NumRef, NumValue, UnaryOp};
