//! Transient accumulators for associative n-ary folds.
//!
//! One accumulator exists per fold call: operands are gathered, then
//! [`NumFactory::accumulate`](crate::factory::NumFactory::accumulate) or
//! [`NumFactory::accumulate_bool`](crate::factory::NumFactory::accumulate_bool)
//! finalizes it into an immutable node and the accumulator is consumed.
//! Accumulators are never part of the persisted DAG.

use crate::boolean::{BoolOp, BoolRef};
use crate::value::{AritOp, NumRef};

/// Builder for one associative numeric fold (PLUS, MINUS or TIMES).
#[derive(Debug)]
pub struct NumAccumulator {
    op: AritOp,
    items: Vec<NumRef>,
}

impl NumAccumulator {
    /// Create an empty accumulator for the given operator.
    ///
    /// `op` must be one of the associative accumulator operators; DIV and
    /// MOD have no n-ary form.
    pub fn new(op: AritOp) -> Self {
        debug_assert!(op.is_nary(), "{} has no n-ary gate", op);
        NumAccumulator {
            op,
            items: Vec::new(),
        }
    }

    /// The fold's operator.
    pub fn op(&self) -> AritOp {
        self.op
    }

    /// Append an operand. Operands keep their insertion order; MINUS folds
    /// are left-associative so order is significant.
    pub fn add(&mut self, value: NumRef) {
        self.items.push(value);
    }

    /// Number of operands gathered so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no operand has been added.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate the gathered operands in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, NumRef> {
        self.items.iter()
    }

    pub(crate) fn into_items(self) -> Vec<NumRef> {
        self.items
    }
}

/// Builder for one associative boolean fold (AND or OR).
///
/// Adding the operator's identity constant is a no-op. Adding the absorbing
/// constant saturates the accumulator: the operand list is cleared and every
/// later `add` is ignored. [`BoolAccumulator::add`] reports saturation so the
/// caller can stop producing operands; the short-circuit is observable from
/// outside.
#[derive(Debug)]
pub struct BoolAccumulator {
    op: BoolOp,
    items: Vec<BoolRef>,
    saturated: bool,
}

impl BoolAccumulator {
    /// Create an empty accumulator for the given connective.
    pub fn new(op: BoolOp) -> Self {
        BoolAccumulator {
            op,
            items: Vec::new(),
            saturated: false,
        }
    }

    /// The fold's connective.
    pub fn op(&self) -> BoolOp {
        self.op
    }

    /// Append an operand, returning `true` when the accumulator is saturated
    /// after the call (the whole fold is the absorbing constant and no
    /// further operand needs to be built or examined).
    pub fn add(&mut self, value: BoolRef) -> bool {
        if self.saturated {
            return true;
        }
        match value.as_const() {
            Some(c) if c == self.op.absorbing() => {
                self.items.clear();
                self.saturated = true;
            }
            Some(_) => {} // identity element, drop it
            None => self.items.push(value),
        }
        self.saturated
    }

    /// True when an absorbing constant collapsed the fold.
    pub fn is_saturated(&self) -> bool {
        self.saturated
    }

    /// Number of surviving (non-constant) operands.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no non-constant operand survived.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate the surviving operands in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, BoolRef> {
        self.items.iter()
    }

    pub(crate) fn into_items(self) -> Vec<BoolRef> {
        self.items
    }
}
