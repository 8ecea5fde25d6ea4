//! Ordered sparse index-to-value sequences.
//!
//! One `SparseSeq` represents the non-default entries of one row of a
//! quantitative relation: indices not present are implicitly the domain's
//! default (ZERO for numeric rows). Iteration is always in increasing index
//! order, which the matrix comparator relies on.

use std::collections::BTreeMap;

/// An ordered mapping from non-negative index to value, with an implicit
/// default at every absent index.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SparseSeq<V> {
    entries: BTreeMap<usize, V>,
}

impl<V> SparseSeq<V> {
    /// Create an empty sequence.
    pub fn new() -> Self {
        SparseSeq {
            entries: BTreeMap::new(),
        }
    }

    /// Insert `value` at `index`, returning the displaced value if any.
    pub fn put(&mut self, index: usize, value: V) -> Option<V> {
        self.entries.insert(index, value)
    }

    /// Remove the entry at `index`, returning it if present.
    pub fn remove(&mut self, index: usize) -> Option<V> {
        self.entries.remove(&index)
    }

    /// The value at `index`, if explicitly present.
    pub fn get(&self, index: usize) -> Option<&V> {
        self.entries.get(&index)
    }

    /// True when `index` holds an explicit entry.
    pub fn contains_index(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    /// Number of explicit entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no explicit entry exists.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Smallest populated index.
    pub fn min_index(&self) -> Option<usize> {
        self.entries.keys().next().copied()
    }

    /// Largest populated index.
    pub fn max_index(&self) -> Option<usize> {
        self.entries.keys().next_back().copied()
    }

    /// Iterate the populated indices in increasing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    /// Iterate `(index, value)` pairs in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &V)> {
        self.entries.iter().map(|(i, v)| (*i, v))
    }

    /// Iterate the values in increasing index order.
    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.values()
    }
}

impl<V: Clone> SparseSeq<V> {
    /// Full-value clone of `self` with `default` inserted at every index of
    /// `indices` that `self` does not populate.
    ///
    /// Used by the matrix comparator to zero-pad two rows onto the union of
    /// their index sets before elementwise comparison.
    pub fn padded<I>(&self, indices: I, default: &V) -> SparseSeq<V>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut out = self.clone();
        for i in indices {
            out.entries.entry(i).or_insert_with(|| default.clone());
        }
        out
    }
}

impl<V> FromIterator<(usize, V)> for SparseSeq<V> {
    fn from_iter<T: IntoIterator<Item = (usize, V)>>(iter: T) -> Self {
        SparseSeq {
            entries: iter.into_iter().collect(),
        }
    }
}
