//! Dense-dimensioned views over sparse symbolic cells.
//!
//! A matrix pairs a [`Dimensions`] shape with a [`SparseSeq`] of cells;
//! every index inside the capacity that holds no explicit cell reads as the
//! ZERO constant. [`BinMatrix`] additionally guarantees that every stored
//! cell is statically {0,1}-valued.

use std::fmt;
use std::sync::Arc;

use crate::error::{FactoryError, Result};
use crate::sparse::SparseSeq;
use crate::value::{NumRef, NumValue};

/// Shape of a relational matrix: one size per dimension. The capacity is the
/// product of the sizes and cell indices range over `0..capacity`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dimensions {
    sizes: Vec<usize>,
}

impl Dimensions {
    /// A shape with the given per-dimension sizes.
    ///
    /// # Panics
    ///
    /// Panics when `sizes` is empty; a matrix needs at least one dimension.
    pub fn new(sizes: Vec<usize>) -> Self {
        assert!(!sizes.is_empty(), "a matrix needs at least one dimension");
        Dimensions { sizes }
    }

    /// A square shape: `arity` dimensions of the same `size` (the common
    /// case for a relation over a single universe of atoms).
    pub fn square(arity: usize, size: usize) -> Self {
        Dimensions::new(vec![size; arity])
    }

    /// Number of dimensions.
    pub fn arity(&self) -> usize {
        self.sizes.len()
    }

    /// Size of dimension `d`.
    pub fn size(&self, d: usize) -> usize {
        self.sizes[d]
    }

    /// Total number of cells: the product of the per-dimension sizes.
    pub fn capacity(&self) -> usize {
        self.sizes.iter().product()
    }

    /// True when `index` addresses a cell inside this shape.
    pub fn validate(&self, index: usize) -> bool {
        index < self.capacity()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for s in &self.sizes {
            if !first {
                write!(f, "x")?;
            }
            write!(f, "{}", s)?;
            first = false;
        }
        Ok(())
    }
}

/// A matrix of symbolic numeric cells with implicit-ZERO defaults.
#[derive(Debug, Clone)]
pub struct NumMatrix {
    dims: Dimensions,
    zero: NumRef,
    cells: SparseSeq<NumRef>,
}

impl NumMatrix {
    pub(crate) fn new(dims: Dimensions, zero: NumRef) -> Self {
        NumMatrix {
            dims,
            zero,
            cells: SparseSeq::new(),
        }
    }

    /// The matrix shape.
    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    /// Store `value` at `index`. Storing the ZERO singleton clears the cell
    /// back to its implicit default.
    pub fn set(&mut self, index: usize, value: NumRef) -> Result<()> {
        if !self.dims.validate(index) {
            return Err(FactoryError::IndexOutOfBounds {
                index,
                capacity: self.dims.capacity(),
            });
        }
        if Arc::ptr_eq(&value, &self.zero) {
            self.cells.remove(index);
        } else {
            self.cells.put(index, value);
        }
        Ok(())
    }

    /// The cell at `index`; implicit entries read as the ZERO constant.
    pub fn get(&self, index: usize) -> Result<NumRef> {
        if !self.dims.validate(index) {
            return Err(FactoryError::IndexOutOfBounds {
                index,
                capacity: self.dims.capacity(),
            });
        }
        Ok(self
            .cells
            .get(index)
            .cloned()
            .unwrap_or_else(|| self.zero.clone()))
    }

    /// The explicit cells, as the sparse row the comparator consumes.
    pub fn cells(&self) -> &SparseSeq<NumRef> {
        &self.cells
    }

    /// Number of explicitly stored cells.
    pub fn density(&self) -> usize {
        self.cells.len()
    }
}

impl fmt::Display for NumMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:", self.dims)?;
        for (i, v) in self.cells.iter() {
            write!(f, " {}={}", i, v)?;
        }
        write!(f, "]")
    }
}

/// A numeric matrix whose entries are statically known to range over {0,1}:
/// the shared ZERO/ONE constants or [`NumValue::Binary01`] pairs.
#[derive(Debug, Clone)]
pub struct BinMatrix {
    inner: NumMatrix,
}

impl BinMatrix {
    pub(crate) fn new(dims: Dimensions, zero: NumRef) -> Self {
        BinMatrix {
            inner: NumMatrix::new(dims, zero),
        }
    }

    /// The matrix shape.
    pub fn dimensions(&self) -> &Dimensions {
        self.inner.dimensions()
    }

    /// Store `value` at `index`, rejecting anything not statically
    /// {0,1}-valued.
    pub fn set(&mut self, index: usize, value: NumRef) -> Result<()> {
        let ok = match &*value {
            NumValue::Const { value: c, .. } => *c == 0 || *c == 1,
            NumValue::Binary01 { .. } => true,
            _ => false,
        };
        if !ok {
            return Err(FactoryError::NonBinaryEntry(value.label()));
        }
        self.inner.set(index, value)
    }

    /// The cell at `index`; implicit entries read as the ZERO constant.
    pub fn get(&self, index: usize) -> Result<NumRef> {
        self.inner.get(index)
    }

    /// The explicit cells, as the sparse row the comparator consumes.
    pub fn cells(&self) -> &SparseSeq<NumRef> {
        self.inner.cells()
    }

    /// View this matrix as a plain numeric matrix.
    pub fn as_num(&self) -> &NumMatrix {
        &self.inner
    }
}
