//! The factory front door: canonicalizing constructors, lifting between the
//! boolean and numeric domains, n-ary accumulation, and sparse matrix
//! comparison.
//!
//! One factory instance encodes one circuit for one solving session. It owns
//! the monotonic label counter, the label-to-variable arena, the shared
//! constant singletons, and the max-primary-variable watermark that the
//! solving backend uses to partition primary decisions from auxiliary
//! encoding variables. Construction is single-threaded and synchronous; the
//! finished DAG is handed off read-only.

use std::sync::Arc;

use hashbrown::HashMap;

use crate::accum::{BoolAccumulator, NumAccumulator};
use crate::boolean::{BoolOp, BoolRef, BoolValue};
use crate::error::{FactoryError, Result};
use crate::matrix::{BinMatrix, Dimensions, NumMatrix};
use crate::sparse::SparseSeq;
use crate::value::{AritOp, CmpOp, Correlation, Label, NumRef, NumValue, UnaryOp};

/// Arena entry for one numeric variable. The correlation flag is the one
/// piece of post-construction mutable state in the whole DAG.
#[derive(Debug)]
struct VarEntry {
    node: NumRef,
    correlation: Correlation,
    /// Set once `to_bool` constrains the variable to {0,1}.
    binary: bool,
}

/// Factory for numeric values, boolean values and matrices over them.
///
/// Integer-valued: constants are exact `i64`s, folding uses truncating
/// integer division, and the float entry point rounds toward integer
/// semantics on the way in (an assumption on the caller, not a guarded
/// check).
#[derive(Debug)]
pub struct NumFactory {
    /// Next label to hand out; label 0 is reserved for the singletons.
    next_label: u32,
    /// Highest label assigned to a primary variable (not a derived gate).
    max_primary: u32,
    zero: NumRef,
    one: NumRef,
    true_val: BoolRef,
    false_val: BoolRef,
    vars: HashMap<Label, VarEntry>,
}

impl Default for NumFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl NumFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        NumFactory {
            next_label: 1,
            max_primary: 0,
            zero: Arc::new(NumValue::Const {
                label: Label(0),
                value: 0,
            }),
            one: Arc::new(NumValue::Const {
                label: Label(0),
                value: 1,
            }),
            true_val: Arc::new(BoolValue::Const(true)),
            false_val: Arc::new(BoolValue::Const(false)),
            vars: HashMap::new(),
        }
    }

    /// Create a factory pre-populated with `num_vars` fresh variables.
    pub fn with_variables(num_vars: i64) -> Result<Self> {
        let mut f = Self::new();
        f.add_variables(num_vars)?;
        Ok(f)
    }

    fn fresh_label(&mut self) -> Label {
        let l = Label(self.next_label);
        self.next_label += 1;
        l
    }

    // ------------------------------------------------------------------
    // Constants and variables
    // ------------------------------------------------------------------

    /// The canonical ZERO constant.
    pub fn zero(&self) -> NumRef {
        self.zero.clone()
    }

    /// The canonical ONE constant.
    pub fn one(&self) -> NumRef {
        self.one.clone()
    }

    /// The canonical TRUE constant.
    pub fn true_value(&self) -> BoolRef {
        self.true_val.clone()
    }

    /// The canonical FALSE constant.
    pub fn false_value(&self) -> BoolRef {
        self.false_val.clone()
    }

    /// The boolean constant for `b`.
    pub fn bool_const(&self, b: bool) -> BoolRef {
        if b {
            self.true_value()
        } else {
            self.false_value()
        }
    }

    /// The constant representing `value`. Values 0 and 1 always answer with
    /// the shared singletons; any other value allocates a fresh label.
    pub fn constant(&mut self, value: i64) -> NumRef {
        match value {
            0 => self.zero(),
            1 => self.one(),
            _ => {
                let label = self.fresh_label();
                Arc::new(NumValue::Const { label, value })
            }
        }
    }

    /// The constant for a floating-point weight, truncated toward zero.
    /// Assumes the input carries an integral value; no rounding check is
    /// performed.
    pub fn constant_f64(&mut self, value: f64) -> NumRef {
        self.constant(value as i64)
    }

    /// Allocate a fresh primary variable and advance the watermark.
    pub fn fresh_variable(&mut self) -> NumRef {
        self.make_variable(Correlation::Unconstrained)
    }

    fn make_variable(&mut self, correlation: Correlation) -> NumRef {
        let label = self.fresh_label();
        let node: NumRef = Arc::new(NumValue::Var { label });
        self.vars.insert(
            label,
            VarEntry {
                node: node.clone(),
                correlation,
                binary: false,
            },
        );
        self.max_primary = self.max_primary.max(label.0);
        node
    }

    /// Allocate `num_vars` fresh variables.
    pub fn add_variables(&mut self, num_vars: i64) -> Result<()> {
        if num_vars < 0 {
            return Err(FactoryError::NegativeVariableCount(num_vars));
        }
        for _ in 0..num_vars {
            self.fresh_variable();
        }
        Ok(())
    }

    /// The variable with the given label.
    pub fn variable(&self, label: Label) -> Result<NumRef> {
        self.vars
            .get(&label)
            .map(|e| e.node.clone())
            .ok_or(FactoryError::UnknownVariable(label))
    }

    /// Number of variables allocated so far.
    pub fn number_of_variables(&self) -> usize {
        self.vars.len()
    }

    /// The correlation flag of the given variable; unknown labels answer
    /// unconstrained.
    pub fn correlation(&self, label: Label) -> Correlation {
        self.vars
            .get(&label)
            .map(|e| e.correlation)
            .unwrap_or(Correlation::Unconstrained)
    }

    /// True when `to_bool` has constrained the variable to {0,1}.
    pub fn is_binary(&self, label: Label) -> bool {
        self.vars.get(&label).map(|e| e.binary).unwrap_or(false)
    }

    /// Allocate a fresh variable that is strictly true from the boolean
    /// point of view (its value is known non-zero without solving).
    pub fn true_variable(&mut self) -> NumRef {
        self.make_variable(Correlation::True)
    }

    /// The strictly-true variable with the given label: an existing variable
    /// is promoted in place (the one permitted post-construction mutation);
    /// an unknown label is created fresh, advancing the counter past
    /// externally supplied ids so later labels stay unique.
    pub fn true_variable_with(&mut self, id: Label) -> NumRef {
        if id.0 >= self.next_label {
            self.next_label = id.0 + 1;
        }
        if let Some(entry) = self.vars.get_mut(&id) {
            entry.correlation = Correlation::True;
            return entry.node.clone();
        }
        let node: NumRef = Arc::new(NumValue::Var { label: id });
        self.vars.insert(
            id,
            VarEntry {
                node: node.clone(),
                correlation: Correlation::True,
                binary: false,
            },
        );
        self.max_primary = self.max_primary.max(id.0);
        node
    }

    /// The highest label held by a primary variable, the boundary the
    /// solving backend uses to separate the primary decision space from
    /// auxiliary encoding variables.
    pub fn max_variable(&self) -> u32 {
        self.max_primary
    }

    // ------------------------------------------------------------------
    // Lifting between the boolean and numeric domains
    // ------------------------------------------------------------------

    /// Constrain the variable `v` to {0,1} and pair it with a boolean
    /// variable of the same label: two lenses on one decision, never two
    /// independently-solved variables.
    pub fn to_bool(&mut self, v: &NumRef) -> Result<NumRef> {
        match &**v {
            NumValue::Var { label } => {
                let entry = self
                    .vars
                    .get_mut(label)
                    .ok_or(FactoryError::UnknownVariable(*label))?;
                entry.binary = true;
                let twin: BoolRef = Arc::new(BoolValue::Var { label: *label });
                Ok(Arc::new(NumValue::Binary01 {
                    num: v.clone(),
                    twin,
                }))
            }
            _ => Err(FactoryError::NotAVariable(v.label())),
        }
    }

    /// Lift a boolean value into a binary {0,1} numeric value:
    /// `TRUE -> 1`, `FALSE -> 0`, else `{ b ? 1 : 0, b }` where the `ite`
    /// reuses `b`'s label.
    pub fn to_binary(&mut self, b: &BoolRef) -> NumRef {
        match b.as_const() {
            Some(true) => self.one(),
            Some(false) => self.zero(),
            None => {
                let num: NumRef = Arc::new(NumValue::Ite {
                    label: b.label(),
                    cond: b.clone(),
                    then: self.one(),
                    els: self.zero(),
                });
                Arc::new(NumValue::Binary01 {
                    num,
                    twin: b.clone(),
                })
            }
        }
    }

    /// Lift a boolean value into the numeric realm:
    /// `TRUE -> fresh strictly-true variable`, `FALSE -> 0`, else
    /// `b ? trueVar(b.label) : 0`.
    pub fn lift(&mut self, b: &BoolRef) -> NumRef {
        match b.as_const() {
            Some(true) => self.true_variable(),
            Some(false) => self.zero(),
            None => {
                let then = self.true_variable_with(b.label());
                let label = self.fresh_label();
                Arc::new(NumValue::Ite {
                    label,
                    cond: b.clone(),
                    then,
                    els: self.zero(),
                })
            }
        }
    }

    /// Drop a numeric value into the boolean domain. Constants and flagged
    /// variables answer a constant without allocating; a paired {0,1} value
    /// answers its stored twin; everything else becomes `v != 0`.
    pub fn drop_bool(&mut self, v: &NumRef) -> BoolRef {
        match &**v {
            NumValue::Const { value, .. } => self.bool_const(*value != 0),
            NumValue::Var { label } => match self.correlation(*label) {
                Correlation::True => self.true_value(),
                Correlation::False => self.false_value(),
                Correlation::Unconstrained => {
                    let zero = self.zero();
                    self.neq(v, &zero)
                }
            },
            NumValue::Binary01 { twin, .. } => twin.clone(),
            _ => {
                let zero = self.zero();
                self.neq(v, &zero)
            }
        }
    }

    /// Drop a numeric value into its boolean meaning, staying in the numeric
    /// domain: `v != 0 ? 1 : 0`, with the same shortcuts as [`Self::drop_bool`].
    pub fn drop_num(&mut self, v: &NumRef) -> NumRef {
        match &**v {
            NumValue::Const { value, .. } => {
                if *value == 0 {
                    self.zero()
                } else {
                    self.one()
                }
            }
            NumValue::Var { label } => match self.correlation(*label) {
                Correlation::True => self.one(),
                Correlation::False => self.zero(),
                Correlation::Unconstrained => self.drop_num_gate(v),
            },
            NumValue::Binary01 { .. } => v.clone(),
            _ => self.drop_num_gate(v),
        }
    }

    fn drop_num_gate(&mut self, v: &NumRef) -> NumRef {
        let zero = self.zero();
        let one = self.one();
        let is_zero = self.eq(v, &zero);
        self.ite(&is_zero, &zero, &one)
    }

    // ------------------------------------------------------------------
    // Arithmetic constructors
    // ------------------------------------------------------------------

    /// `v0 + v1`, with `x + 0 = x` identities and constant folding.
    pub fn plus(&mut self, v0: &NumRef, v1: &NumRef) -> NumRef {
        if Arc::ptr_eq(v0, &self.zero) {
            return v1.clone();
        }
        if Arc::ptr_eq(v1, &self.zero) {
            return v0.clone();
        }
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            return self.constant(AritOp::Plus.apply(a, b));
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Binary {
            op: AritOp::Plus,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `v0 - v1`; `x - 0 = x`, `0 - x = -x`, constant folding.
    pub fn minus(&mut self, v0: &NumRef, v1: &NumRef) -> NumRef {
        if Arc::ptr_eq(v1, &self.zero) {
            return v0.clone();
        }
        if Arc::ptr_eq(v0, &self.zero) {
            return self.negate(v1);
        }
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            return self.constant(AritOp::Minus.apply(a, b));
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Binary {
            op: AritOp::Minus,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `v0 * v1`; `1 * x = x`, `0 * x = 0`, constant folding.
    pub fn times(&mut self, v0: &NumRef, v1: &NumRef) -> NumRef {
        if v0.as_const() == Some(1) {
            return v1.clone();
        }
        if v1.as_const() == Some(1) {
            return v0.clone();
        }
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            return self.constant(AritOp::Times.apply(a, b));
        }
        if Arc::ptr_eq(v0, &self.zero) || Arc::ptr_eq(v1, &self.zero) {
            return self.zero();
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Binary {
            op: AritOp::Times,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `v0 / v1`. Division by the ONE singleton passes `v0` through without
    /// a gate; a literal zero divisor is a fatal construction error; a
    /// divisor that may be zero only at solve time encodes as
    /// `ite(v1 = 0, 0, v0 / v1)` instead of ever performing an undefined
    /// operation.
    pub fn divide(&mut self, v0: &NumRef, v1: &NumRef) -> Result<NumRef> {
        if Arc::ptr_eq(v1, &self.one) {
            return Ok(v0.clone());
        }
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            if b == 0 {
                return Err(FactoryError::DivisionByZero(a));
            }
            return Ok(self.constant(a.wrapping_div(b)));
        }
        let zero = self.zero();
        let guard = self.eq(v1, &zero);
        let label = self.fresh_label();
        let gate: NumRef = Arc::new(NumValue::Binary {
            op: AritOp::Div,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        });
        Ok(self.ite(&guard, &zero, &gate))
    }

    /// `v0 % v1`; `x % 1 = 0`, `x % x = 1`, literal zero divisor fatal,
    /// possibly-zero divisor guarded exactly like [`Self::divide`].
    pub fn modulo(&mut self, v0: &NumRef, v1: &NumRef) -> Result<NumRef> {
        if Arc::ptr_eq(v1, &self.one) {
            return Ok(self.zero());
        }
        if Arc::ptr_eq(v0, v1) {
            return Ok(self.one());
        }
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            if b == 0 {
                return Err(FactoryError::ModuloByZero(a));
            }
            return Ok(self.constant(a.wrapping_rem(b)));
        }
        let zero = self.zero();
        let guard = self.eq(v1, &zero);
        let label = self.fresh_label();
        let gate: NumRef = Arc::new(NumValue::Binary {
            op: AritOp::Mod,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        });
        Ok(self.ite(&guard, &zero, &gate))
    }

    /// `-v`; folds constants and collapses double negation.
    pub fn negate(&mut self, v: &NumRef) -> NumRef {
        if let Some(c) = v.as_const() {
            return self.constant(c.wrapping_neg());
        }
        if let NumValue::Unary {
            op: UnaryOp::Neg,
            arg,
            ..
        } = &**v
        {
            return arg.clone();
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Unary {
            op: UnaryOp::Neg,
            label,
            arg: v.clone(),
        })
    }

    /// `abs(v)`; folds constants, `abs(abs(x)) = abs(x)`.
    pub fn abs(&mut self, v: &NumRef) -> NumRef {
        if let Some(c) = v.as_const() {
            return if c >= 0 {
                v.clone()
            } else {
                self.constant(c.wrapping_abs())
            };
        }
        if let NumValue::Unary {
            op: UnaryOp::Abs, ..
        } = &**v
        {
            return v.clone();
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Unary {
            op: UnaryOp::Abs,
            label,
            arg: v.clone(),
        })
    }

    /// `sgn(v)` in {-1, 0, 1}; folds constants, `sgn(sgn(x)) = sgn(x)`.
    pub fn signum(&mut self, v: &NumRef) -> NumRef {
        if let Some(c) = v.as_const() {
            return match c.signum() {
                0 => self.zero(),
                1 => self.one(),
                _ => self.constant(-1),
            };
        }
        if let NumValue::Unary {
            op: UnaryOp::Sgn, ..
        } = &**v
        {
            return v.clone();
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Unary {
            op: UnaryOp::Sgn,
            label,
            arg: v.clone(),
        })
    }

    /// `min(v0, v1)`; two constants answer the smaller operand itself.
    pub fn minimum(&mut self, v0: &NumRef, v1: &NumRef) -> NumRef {
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            return if a > b { v1.clone() } else { v0.clone() };
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Min {
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `max(v0, v1)`; two constants answer the larger operand itself.
    pub fn maximum(&mut self, v0: &NumRef, v1: &NumRef) -> NumRef {
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            return if a < b { v1.clone() } else { v0.clone() };
        }
        let label = self.fresh_label();
        Arc::new(NumValue::Max {
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `v0 + v1 + .. + vn` through the accumulator.
    pub fn plus_all(&mut self, inputs: &[NumRef]) -> NumRef {
        self.fold_all(AritOp::Plus, inputs)
    }

    /// `v0 - v1 - .. - vn` (left-associative) through the accumulator.
    pub fn minus_all(&mut self, inputs: &[NumRef]) -> NumRef {
        self.fold_all(AritOp::Minus, inputs)
    }

    /// `v0 * v1 * .. * vn` through the accumulator.
    pub fn times_all(&mut self, inputs: &[NumRef]) -> NumRef {
        self.fold_all(AritOp::Times, inputs)
    }

    fn fold_all(&mut self, op: AritOp, inputs: &[NumRef]) -> NumRef {
        let mut g = NumAccumulator::new(op);
        for v in inputs {
            g.add(v.clone());
        }
        self.accumulate(g)
    }

    // ------------------------------------------------------------------
    // Accumulation
    // ------------------------------------------------------------------

    /// Finalize a numeric accumulator into an immutable value.
    ///
    /// Constants fold for as long as every operand seen is constant; the
    /// first non-constant operand stops folding and the gathered structure
    /// is emitted as-is. All-constant folds (including the empty fold, which
    /// is 0) answer a constant; a single surviving operand passes through
    /// unchanged; two become a binary gate; three or more an n-ary gate.
    pub fn accumulate(&mut self, g: NumAccumulator) -> NumRef {
        let mut is_const = true;
        let mut value = 0i64;
        let mut it = g.iter();
        if let Some(first) = it.next() {
            match first.as_const() {
                Some(c) => value = c,
                None => is_const = false,
            }
            while is_const {
                match it.next() {
                    Some(v) => match v.as_const() {
                        Some(c) => value = g.op().apply(value, c),
                        None => is_const = false,
                    },
                    None => break,
                }
            }
        }
        if is_const {
            return self.constant(value);
        }

        let op = g.op();
        let mut items = g.into_items();
        match items.len() {
            1 => items.swap_remove(0),
            2 => {
                let rhs = items.swap_remove(1);
                let lhs = items.swap_remove(0);
                let label = self.fresh_label();
                Arc::new(NumValue::Binary {
                    op,
                    label,
                    lhs,
                    rhs,
                })
            }
            _ => {
                let label = self.fresh_label();
                Arc::new(NumValue::Nary {
                    op,
                    label,
                    args: items,
                })
            }
        }
    }

    /// Finalize a boolean accumulator into an immutable value. A saturated
    /// accumulator answers the absorbing constant; an empty one the identity
    /// constant; one surviving operand passes through; otherwise a binary or
    /// n-ary gate is allocated.
    pub fn accumulate_bool(&mut self, g: BoolAccumulator) -> BoolRef {
        let op = g.op();
        if g.is_saturated() {
            return self.bool_const(op.absorbing());
        }
        let mut items = g.into_items();
        match items.len() {
            0 => self.bool_const(op.identity()),
            1 => items.swap_remove(0),
            2 => {
                let rhs = items.swap_remove(1);
                let lhs = items.swap_remove(0);
                let label = self.fresh_label();
                Arc::new(BoolValue::Binary {
                    op,
                    label,
                    lhs,
                    rhs,
                })
            }
            _ => {
                let label = self.fresh_label();
                Arc::new(BoolValue::Nary {
                    op,
                    label,
                    args: items,
                })
            }
        }
    }

    // ------------------------------------------------------------------
    // Boolean connectives
    // ------------------------------------------------------------------

    /// `v0 && v1` with short-circuit constants.
    pub fn and(&mut self, v0: &BoolRef, v1: &BoolRef) -> BoolRef {
        if v0.as_const() == Some(false) || v1.as_const() == Some(false) {
            return self.false_value();
        }
        if v0.as_const() == Some(true) {
            return v1.clone();
        }
        if v1.as_const() == Some(true) {
            return v0.clone();
        }
        let label = self.fresh_label();
        Arc::new(BoolValue::Binary {
            op: BoolOp::And,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `v0 || v1` with short-circuit constants.
    pub fn or(&mut self, v0: &BoolRef, v1: &BoolRef) -> BoolRef {
        if v0.as_const() == Some(true) || v1.as_const() == Some(true) {
            return self.true_value();
        }
        if v0.as_const() == Some(false) {
            return v1.clone();
        }
        if v1.as_const() == Some(false) {
            return v0.clone();
        }
        let label = self.fresh_label();
        Arc::new(BoolValue::Binary {
            op: BoolOp::Or,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `!v`; flips constants and collapses double negation.
    pub fn not(&mut self, v: &BoolRef) -> BoolRef {
        match &**v {
            BoolValue::Const(b) => self.bool_const(!b),
            BoolValue::Not { arg, .. } => arg.clone(),
            _ => {
                let label = self.fresh_label();
                Arc::new(BoolValue::Not {
                    label,
                    arg: v.clone(),
                })
            }
        }
    }

    /// `v0 => v1`, as `!v0 || v1`.
    pub fn implies(&mut self, v0: &BoolRef, v1: &BoolRef) -> BoolRef {
        let n = self.not(v0);
        self.or(&n, v1)
    }

    /// `v0 <=> v1`, as `(v0 => v1) && (v1 => v0)`.
    pub fn iff(&mut self, v0: &BoolRef, v1: &BoolRef) -> BoolRef {
        let fwd = self.implies(v0, v1);
        let bwd = self.implies(v1, v0);
        self.and(&fwd, &bwd)
    }

    /// Conjunction of all inputs. Stops consuming the iterator the moment
    /// the accumulator saturates on FALSE, so later operands are never
    /// produced or examined.
    pub fn and_all<I>(&mut self, inputs: I) -> BoolRef
    where
        I: IntoIterator<Item = BoolRef>,
    {
        let mut g = BoolAccumulator::new(BoolOp::And);
        for b in inputs {
            if g.add(b) {
                return self.false_value();
            }
        }
        self.accumulate_bool(g)
    }

    /// Disjunction of all inputs, short-circuiting on TRUE.
    pub fn or_all<I>(&mut self, inputs: I) -> BoolRef
    where
        I: IntoIterator<Item = BoolRef>,
    {
        let mut g = BoolAccumulator::new(BoolOp::Or);
        for b in inputs {
            if g.add(b) {
                return self.true_value();
            }
        }
        self.accumulate_bool(g)
    }

    /// Conjunction of the negations of all inputs, short-circuiting on a
    /// TRUE input.
    pub fn nand_all<I>(&mut self, inputs: I) -> BoolRef
    where
        I: IntoIterator<Item = BoolRef>,
    {
        let mut g = BoolAccumulator::new(BoolOp::And);
        for b in inputs {
            let n = self.not(&b);
            if g.add(n) {
                return self.false_value();
            }
        }
        self.accumulate_bool(g)
    }

    // ------------------------------------------------------------------
    // Comparisons and choice
    // ------------------------------------------------------------------

    /// Compare two values: identical operands fold by operator
    /// inclusiveness, two constants fold exactly, anything else allocates a
    /// comparison gate.
    fn cmp_values(&mut self, op: CmpOp, v0: &NumRef, v1: &NumRef) -> BoolRef {
        if Arc::ptr_eq(v0, v1) {
            return self.bool_const(op.is_inclusive());
        }
        if let (Some(a), Some(b)) = (v0.as_const(), v1.as_const()) {
            return self.bool_const(op.apply(a, b));
        }
        let label = self.fresh_label();
        Arc::new(BoolValue::Cmp {
            op,
            label,
            lhs: v0.clone(),
            rhs: v1.clone(),
        })
    }

    /// `v0 = v1`.
    pub fn eq(&mut self, v0: &NumRef, v1: &NumRef) -> BoolRef {
        self.cmp_values(CmpOp::Eq, v0, v1)
    }

    /// `v0 != v1`, as the negation of equality.
    pub fn neq(&mut self, v0: &NumRef, v1: &NumRef) -> BoolRef {
        let e = self.eq(v0, v1);
        self.not(&e)
    }

    /// `v0 < v1`.
    pub fn lt(&mut self, v0: &NumRef, v1: &NumRef) -> BoolRef {
        self.cmp_values(CmpOp::Lt, v0, v1)
    }

    /// `v0 <= v1`.
    pub fn lte(&mut self, v0: &NumRef, v1: &NumRef) -> BoolRef {
        self.cmp_values(CmpOp::Lte, v0, v1)
    }

    /// `v0 > v1`.
    pub fn gt(&mut self, v0: &NumRef, v1: &NumRef) -> BoolRef {
        self.cmp_values(CmpOp::Gt, v0, v1)
    }

    /// `v0 >= v1`.
    pub fn gte(&mut self, v0: &NumRef, v1: &NumRef) -> BoolRef {
        self.cmp_values(CmpOp::Gte, v0, v1)
    }

    /// `condition ? v0 : v1`; degenerates to `v0` when both branches are
    /// the same node or the condition is a boolean constant.
    pub fn ite(&mut self, condition: &BoolRef, v0: &NumRef, v1: &NumRef) -> NumRef {
        if Arc::ptr_eq(v0, v1) {
            return v0.clone();
        }
        match condition.as_const() {
            Some(true) => v0.clone(),
            Some(false) => v1.clone(),
            None => {
                let label = self.fresh_label();
                Arc::new(NumValue::Ite {
                    label,
                    cond: condition.clone(),
                    then: v0.clone(),
                    els: v1.clone(),
                })
            }
        }
    }

    /// `condition ? v : 0`.
    pub fn implies_num(&mut self, condition: &BoolRef, v: &NumRef) -> NumRef {
        let zero = self.zero();
        self.ite(condition, v, &zero)
    }

    // ------------------------------------------------------------------
    // Sparse matrix comparison
    // ------------------------------------------------------------------

    /// Compare two sparse rows under `op`.
    ///
    /// Both rows are zero-padded onto the union of their index sets, then:
    /// `=`, `<=`, `>=` take a conjunction over every union index; strict
    /// `<`/`>` take `(non-strict holds everywhere) && (strict holds
    /// somewhere)`. Either side short-circuits on its absorbing constant.
    /// Two empty rows compare vacuously: TRUE for the inclusive operators,
    /// FALSE for the strict ones (no index can witness strictness). Fully
    /// constant rows fold to a boolean constant without allocating a gate.
    pub fn cmp_seq(&mut self, op: CmpOp, m: &SparseSeq<NumRef>, n: &SparseSeq<NumRef>) -> BoolRef {
        if m.is_empty() && n.is_empty() {
            return self.bool_const(op.is_inclusive());
        }
        let zero = self.zero();
        let m_z = m.padded(n.indices(), &zero);
        let n_z = n.padded(m.indices(), &zero);

        match op {
            CmpOp::Lt | CmpOp::Gt => {
                let forall = self.cmp_gate(BoolOp::And, op.relaxed(), &m_z, &n_z);
                if forall.as_const() == Some(false) {
                    return forall;
                }
                let exists = self.cmp_gate(BoolOp::Or, op, &m_z, &n_z);
                self.and(&forall, &exists)
            }
            _ => self.cmp_gate(BoolOp::And, op, &m_z, &n_z),
        }
    }

    /// Build one side of a row comparison: a `gate`-connective fold of the
    /// elementwise comparison at every index, short-circuiting on the
    /// connective's absorbing constant.
    ///
    /// Expects both rows already padded onto the same index set; an index
    /// somehow missing from `n_z` reads as the implicit zero.
    fn cmp_gate(
        &mut self,
        gate: BoolOp,
        op: CmpOp,
        m_z: &SparseSeq<NumRef>,
        n_z: &SparseSeq<NumRef>,
    ) -> BoolRef {
        let zero = self.zero();
        let mut g = BoolAccumulator::new(gate);
        for (i, vm) in m_z.iter() {
            let vn = n_z.get(i).cloned().unwrap_or_else(|| zero.clone());
            let c = self.cmp_values(op, vm, &vn);
            if g.add(c) {
                return self.bool_const(gate.absorbing());
            }
        }
        self.accumulate_bool(g)
    }

    /// Compare every explicit entry of a sparse row against a single scalar:
    /// `forall i in m.indices | m[i] op v`, AND-folded with FALSE
    /// short-circuit.
    ///
    /// An empty row reads as one implicit zero: with a constant `v` the
    /// whole comparison folds to `0 op v`; with a strictly-false variable to
    /// `0 op 0`; with a strictly-true variable the non-negative-weight
    /// assumption applies and only `<`/`<=` hold.
    pub fn cmp_seq_scalar(&mut self, op: CmpOp, m: &SparseSeq<NumRef>, v: &NumRef) -> BoolRef {
        if m.is_empty() {
            match &**v {
                NumValue::Const { value, .. } => {
                    return self.bool_const(op.apply(0, *value));
                }
                NumValue::Var { label } => match self.correlation(*label) {
                    Correlation::False => return self.bool_const(op.apply(0, 0)),
                    Correlation::True => {
                        return self.bool_const(matches!(op, CmpOp::Lt | CmpOp::Lte));
                    }
                    Correlation::Unconstrained => {}
                },
                _ => {}
            }
        }
        let mut g = BoolAccumulator::new(BoolOp::And);
        for (_i, vm) in m.iter() {
            let c = self.cmp_values(op, vm, v);
            if g.add(c) {
                return self.false_value();
            }
        }
        self.accumulate_bool(g)
    }

    /// Constrain a whole row to be semi-negative. Weights never go below
    /// zero, so the row must equal the all-zero row: an AND-fold of
    /// `m[i] = 0` over the explicit entries, short-circuiting on FALSE.
    pub fn semi_negative(&mut self, m: &SparseSeq<NumRef>) -> BoolRef {
        let zero = self.zero();
        let mut g = BoolAccumulator::new(BoolOp::And);
        for (_i, v) in m.iter() {
            let c = self.cmp_values(CmpOp::Eq, v, &zero);
            if g.add(c) {
                return self.false_value();
            }
        }
        self.accumulate_bool(g)
    }

    // ------------------------------------------------------------------
    // Matrices
    // ------------------------------------------------------------------

    /// An empty numeric matrix of the given shape.
    pub fn matrix(&self, d: Dimensions) -> NumMatrix {
        NumMatrix::new(d, self.zero())
    }

    /// An empty binary matrix of the given shape.
    pub fn binary_matrix(&self, d: Dimensions) -> BinMatrix {
        BinMatrix::new(d, self.zero())
    }

    /// A numeric matrix with the ONE constant stored at every index of
    /// `one_indices`.
    pub fn matrix_with_ones(&self, d: Dimensions, one_indices: &[usize]) -> Result<NumMatrix> {
        let mut m = self.matrix(d);
        for &i in one_indices {
            m.set(i, self.one())?;
        }
        Ok(m)
    }

    /// A binary matrix with the ONE constant stored at every index of
    /// `one_indices`.
    pub fn binary_matrix_with_ones(
        &self,
        d: Dimensions,
        one_indices: &[usize],
    ) -> Result<BinMatrix> {
        let mut m = self.binary_matrix(d);
        for &i in one_indices {
            m.set(i, self.one())?;
        }
        Ok(m)
    }

    /// A numeric matrix with the same value stored at every index of
    /// `indices`.
    pub fn constant_matrix(
        &self,
        d: Dimensions,
        indices: &[usize],
        v: &NumRef,
    ) -> Result<NumMatrix> {
        let mut m = self.matrix(d);
        for &i in indices {
            m.set(i, v.clone())?;
        }
        Ok(m)
    }

    /// Compare two whole matrices under `op`; their shapes must agree.
    pub fn matrix_cmp(&mut self, op: CmpOp, m: &NumMatrix, n: &NumMatrix) -> Result<BoolRef> {
        if m.dimensions() != n.dimensions() {
            return Err(FactoryError::DimensionMismatch(
                m.dimensions().clone(),
                n.dimensions().clone(),
            ));
        }
        Ok(self.cmp_seq(op, m.cells(), n.cells()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn seq(f: &mut NumFactory, entries: &[(usize, i64)]) -> SparseSeq<NumRef> {
        entries.iter().map(|&(i, v)| (i, f.constant(v))).collect()
    }

    #[test]
    fn constants_zero_and_one_are_singletons() {
        let mut f = NumFactory::new();
        assert!(Arc::ptr_eq(&f.constant(0), &f.zero()));
        assert!(Arc::ptr_eq(&f.constant(1), &f.one()));
        // folding down to 0 or 1 answers the singletons too
        let a = f.constant(3);
        let b = f.constant(-3);
        let sum = f.plus(&a, &b);
        assert!(Arc::ptr_eq(&sum, &f.zero()));
        let c = f.constant(7);
        let d = f.constant(6);
        let diff = f.minus(&c, &d);
        assert!(Arc::ptr_eq(&diff, &f.one()));
    }

    #[test]
    fn distinct_constants_get_distinct_labels() {
        let mut f = NumFactory::new();
        let a = f.constant(5);
        let b = f.constant(5);
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(a.label() < b.label());
    }

    #[test]
    fn identity_shortcuts_return_the_operand_itself() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let zero = f.zero();
        let one = f.one();

        let s = f.plus(&x, &zero);
        assert!(Arc::ptr_eq(&s, &x));
        let s = f.plus(&zero, &x);
        assert!(Arc::ptr_eq(&s, &x));
        let s = f.minus(&x, &zero);
        assert!(Arc::ptr_eq(&s, &x));
        let s = f.times(&x, &one);
        assert!(Arc::ptr_eq(&s, &x));
        let s = f.times(&one, &x);
        assert!(Arc::ptr_eq(&s, &x));
        let s = f.divide(&x, &one).unwrap();
        assert!(Arc::ptr_eq(&s, &x));

        let s = f.times(&x, &zero);
        assert!(Arc::ptr_eq(&s, &f.zero()));
        let s = f.modulo(&x, &one).unwrap();
        assert!(Arc::ptr_eq(&s, &f.zero()));
        let s = f.modulo(&x, &x).unwrap();
        assert!(Arc::ptr_eq(&s, &f.one()));
    }

    #[test]
    fn constant_folding_matches_integer_arithmetic() {
        let mut f = NumFactory::new();
        let cases = [
            (AritOp::Plus, 12, 5, 17),
            (AritOp::Minus, 12, 5, 7),
            (AritOp::Times, 12, 5, 60),
            (AritOp::Div, 12, 5, 2),
            (AritOp::Mod, 12, 5, 2),
            (AritOp::Div, -12, 5, -2),
            (AritOp::Mod, -12, 5, -2),
        ];
        for (op, a, b, expect) in cases {
            let va = f.constant(a);
            let vb = f.constant(b);
            let r = match op {
                AritOp::Plus => f.plus(&va, &vb),
                AritOp::Minus => f.minus(&va, &vb),
                AritOp::Times => f.times(&va, &vb),
                AritOp::Div => f.divide(&va, &vb).unwrap(),
                AritOp::Mod => f.modulo(&va, &vb).unwrap(),
            };
            assert_eq!(r.as_const(), Some(expect), "{} {} {}", a, op, b);
        }
    }

    #[test]
    fn literal_zero_divisor_is_fatal() {
        let mut f = NumFactory::new();
        let a = f.constant(9);
        let z = f.zero();
        assert_eq!(f.divide(&a, &z), Err(FactoryError::DivisionByZero(9)));
        assert_eq!(f.modulo(&a, &z), Err(FactoryError::ModuloByZero(9)));
    }

    #[test]
    fn symbolic_zero_divisor_is_guarded_not_fatal() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let y = f.fresh_variable();
        let q = f.divide(&x, &y).unwrap();
        assert!(matches!(&*q, NumValue::Ite { .. }));

        let mut env = HashMap::new();
        env.insert(x.label(), 7);
        env.insert(y.label(), 2);
        assert_eq!(q.evaluate(&env), 3);
        env.insert(y.label(), 0);
        assert_eq!(q.evaluate(&env), 0);

        let r = f.modulo(&x, &y).unwrap();
        env.insert(y.label(), 4);
        assert_eq!(r.evaluate(&env), 3);
        env.insert(y.label(), 0);
        assert_eq!(r.evaluate(&env), 0);
    }

    #[test]
    fn unary_folding_and_collapse() {
        let mut f = NumFactory::new();
        let c = f.constant(-4);
        assert_eq!(f.negate(&c).as_const(), Some(4));
        assert_eq!(f.abs(&c).as_const(), Some(4));
        assert_eq!(f.signum(&c).as_const(), Some(-1));
        let nine = f.constant(9);
        let sgn = f.signum(&nine);
        assert!(Arc::ptr_eq(&sgn, &f.one()));

        let x = f.fresh_variable();
        let neg = f.negate(&x);
        let back = f.negate(&neg);
        assert!(Arc::ptr_eq(&back, &x));
        let a = f.abs(&x);
        let aa = f.abs(&a);
        assert!(Arc::ptr_eq(&aa, &a));
        let s = f.signum(&x);
        let ss = f.signum(&s);
        assert!(Arc::ptr_eq(&ss, &s));
    }

    #[test]
    fn extremum_folding_returns_an_operand() {
        let mut f = NumFactory::new();
        let a = f.constant(3);
        let b = f.constant(8);
        let mn = f.minimum(&a, &b);
        assert!(Arc::ptr_eq(&mn, &a));
        let mx = f.maximum(&a, &b);
        assert!(Arc::ptr_eq(&mx, &b));
        // ties answer the left operand
        let c = f.constant(3);
        let tie = f.minimum(&a, &c);
        assert!(Arc::ptr_eq(&tie, &a));

        let x = f.fresh_variable();
        assert!(matches!(&*f.minimum(&a, &x), NumValue::Min { .. }));
        assert!(matches!(&*f.maximum(&a, &x), NumValue::Max { .. }));
    }

    #[test]
    fn labels_are_strictly_increasing_and_watermark_tracks_variables() {
        let mut f = NumFactory::new();
        let vars: Vec<NumRef> = (0..5).map(|_| f.fresh_variable()).collect();
        for w in vars.windows(2) {
            assert!(w[0].label() < w[1].label());
        }
        assert_eq!(f.max_variable(), 5);
        assert_eq!(f.number_of_variables(), 5);

        // derived gates advance the counter but not the watermark
        let s = f.plus(&vars[0], &vars[1]);
        assert!(s.label().0 > 5);
        assert_eq!(f.max_variable(), 5);
    }

    #[test]
    fn true_variable_updates_the_watermark() {
        let mut f = NumFactory::new();
        f.add_variables(2).unwrap();
        let t = f.true_variable();
        assert_eq!(f.max_variable(), t.label().0);
        assert_eq!(f.correlation(t.label()), Correlation::True);
    }

    #[test]
    fn true_variable_with_reflags_or_creates() {
        let mut f = NumFactory::new();
        let v = f.fresh_variable();
        assert_eq!(f.correlation(v.label()), Correlation::Unconstrained);
        let same = f.true_variable_with(v.label());
        assert!(Arc::ptr_eq(&same, &v));
        assert_eq!(f.correlation(v.label()), Correlation::True);

        // an external id advances the counter so later labels stay unique
        let ext = f.true_variable_with(Label(40));
        assert_eq!(ext.label(), Label(40));
        let next = f.fresh_variable();
        assert!(next.label().0 > 40);
        assert_eq!(f.max_variable(), next.label().0);
    }

    #[test]
    fn variable_lookup_and_bulk_allocation_preconditions() {
        let mut f = NumFactory::new();
        assert_eq!(
            f.add_variables(-1),
            Err(FactoryError::NegativeVariableCount(-1))
        );
        f.add_variables(3).unwrap();
        let v2 = f.variable(Label(2)).unwrap();
        assert_eq!(v2.label(), Label(2));
        assert_eq!(
            f.variable(Label(9)),
            Err(FactoryError::UnknownVariable(Label(9)))
        );

        let g = NumFactory::with_variables(4).unwrap();
        assert_eq!(g.number_of_variables(), 4);
        assert_eq!(g.max_variable(), 4);
    }

    #[test]
    fn drop_of_constants_and_flagged_variables_allocates_nothing() {
        let mut f = NumFactory::new();
        let five = f.constant(5);
        let before = f.next_label;
        let d = f.drop_bool(&five);
        assert!(Arc::ptr_eq(&d, &f.true_value()));
        let z = f.zero();
        let d = f.drop_bool(&z);
        assert!(Arc::ptr_eq(&d, &f.false_value()));

        let t = f.true_variable();
        let d = f.drop_bool(&t);
        assert!(Arc::ptr_eq(&d, &f.true_value()));
        assert_eq!(f.next_label, before + 1); // only the variable itself
    }

    #[test]
    fn drop_of_a_strictly_false_variable_is_false() {
        let mut f = NumFactory::new();
        let v = f.fresh_variable();
        f.vars.get_mut(&v.label()).unwrap().correlation = Correlation::False;
        let d = f.drop_bool(&v);
        assert!(Arc::ptr_eq(&d, &f.false_value()));
        assert!(Arc::ptr_eq(&f.drop_num(&v), &f.zero()));
    }

    #[test]
    fn drop_of_an_unconstrained_value_compares_against_zero() {
        let mut f = NumFactory::new();
        let v = f.fresh_variable();
        let d = f.drop_bool(&v);
        match &*d {
            BoolValue::Not { arg, .. } => {
                assert!(matches!(&**arg, BoolValue::Cmp { op: CmpOp::Eq, .. }));
            }
            other => panic!("expected negated equality, got {}", other),
        }
    }

    #[test]
    fn lift_then_drop_round_trips_constants() {
        let mut f = NumFactory::new();
        let t = f.true_value();
        let lifted = f.lift(&t);
        let back = f.drop_bool(&lifted);
        assert!(Arc::ptr_eq(&back, &f.true_value()));

        let fl = f.false_value();
        let lifted = f.lift(&fl);
        assert!(Arc::ptr_eq(&lifted, &f.zero()));
        let back = f.drop_bool(&lifted);
        assert!(Arc::ptr_eq(&back, &f.false_value()));
    }

    #[test]
    fn drop_num_normalizes_constants() {
        let mut f = NumFactory::new();
        for (input, expect_one) in [(0, false), (1, true), (9, true), (-3, true)] {
            let c = f.constant(input);
            let d = f.drop_num(&c);
            if expect_one {
                assert!(Arc::ptr_eq(&d, &f.one()));
            } else {
                assert!(Arc::ptr_eq(&d, &f.zero()));
            }
        }
    }

    #[test]
    fn to_bool_pairs_the_variable_with_its_twin() {
        let mut f = NumFactory::new();
        let v = f.fresh_variable();
        let paired = f.to_bool(&v).unwrap();
        assert!(f.is_binary(v.label()));
        match &*paired {
            NumValue::Binary01 { num, twin } => {
                assert!(Arc::ptr_eq(num, &v));
                assert_eq!(twin.label(), v.label());
            }
            other => panic!("expected a paired value, got {}", other),
        }
        // dropping the pair answers the stored twin without a new gate
        let before = f.next_label;
        let d = f.drop_bool(&paired);
        assert_eq!(d.label(), v.label());
        assert_eq!(f.next_label, before);
        let dn = f.drop_num(&paired);
        assert!(Arc::ptr_eq(&dn, &paired));

        let gate = f.plus(&v, &v);
        assert_eq!(
            f.to_bool(&gate),
            Err(FactoryError::NotAVariable(gate.label()))
        );
    }

    #[test]
    fn to_binary_inverts_drop() {
        let mut f = NumFactory::new();
        let t = f.true_value();
        assert!(Arc::ptr_eq(&f.to_binary(&t), &f.one()));
        let fl = f.false_value();
        assert!(Arc::ptr_eq(&f.to_binary(&fl), &f.zero()));

        // dropNum(toBinary(drop(c))) == (c == 0 ? 0 : 1)
        for c in [-7, 0, 1, 42] {
            let v = f.constant(c);
            let dropped = f.drop_bool(&v);
            let bin = f.to_binary(&dropped);
            let norm = f.drop_num(&bin);
            let expect = if c == 0 { f.zero() } else { f.one() };
            assert!(Arc::ptr_eq(&norm, &expect), "weight {}", c);
        }
    }

    #[test]
    fn to_binary_of_a_formula_shares_its_label() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let zero = f.zero();
        let b = f.neq(&x, &zero);
        let bin = f.to_binary(&b);
        match &*bin {
            NumValue::Binary01 { num, twin } => {
                assert_eq!(num.label(), b.label());
                assert!(Arc::ptr_eq(twin, &b));
            }
            other => panic!("expected a paired value, got {}", other),
        }
    }

    #[test]
    fn accumulate_folds_all_constant_operands() {
        let mut f = NumFactory::new();
        let mut g = NumAccumulator::new(AritOp::Plus);
        for v in [2, 3, 7] {
            let c = f.constant(v);
            g.add(c);
        }
        assert_eq!(f.accumulate(g).as_const(), Some(12));

        let mut g = NumAccumulator::new(AritOp::Minus);
        for v in [10, 3, 2] {
            let c = f.constant(v);
            g.add(c);
        }
        assert_eq!(f.accumulate(g).as_const(), Some(5));

        // the empty fold is 0
        let g = NumAccumulator::new(AritOp::Plus);
        assert!(Arc::ptr_eq(&f.accumulate(g), &f.zero()));
    }

    #[test]
    fn accumulate_passes_a_single_operand_through() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let mut g = NumAccumulator::new(AritOp::Times);
        g.add(x.clone());
        let out = f.accumulate(g);
        assert!(Arc::ptr_eq(&out, &x));
    }

    #[test]
    fn accumulate_emits_binary_then_nary_gates() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let y = f.fresh_variable();
        let mut g = NumAccumulator::new(AritOp::Plus);
        g.add(x.clone());
        g.add(y.clone());
        assert!(matches!(
            &*f.accumulate(g),
            NumValue::Binary {
                op: AritOp::Plus,
                ..
            }
        ));

        let two = f.constant(2);
        let mut g = NumAccumulator::new(AritOp::Plus);
        g.add(two); // constant operands survive into the gate
        g.add(x.clone());
        g.add(y.clone());
        match &*f.accumulate(g) {
            NumValue::Nary { op, args, .. } => {
                assert_eq!(*op, AritOp::Plus);
                assert_eq!(args.len(), 3);
                assert_eq!(args[0].as_const(), Some(2));
            }
            other => panic!("expected an n-ary gate, got {}", other),
        }
    }

    #[test]
    fn nary_helpers_fold_and_evaluate() {
        let mut f = NumFactory::new();
        let consts: Vec<NumRef> = [4, 5, 6].iter().map(|&v| f.constant(v)).collect();
        assert_eq!(f.plus_all(&consts).as_const(), Some(15));
        assert_eq!(f.times_all(&consts).as_const(), Some(120));
        assert_eq!(f.minus_all(&consts).as_const(), Some(-7));

        let x = f.fresh_variable();
        let mixed = vec![consts[0].clone(), x.clone(), consts[1].clone()];
        let gate = f.plus_all(&mixed);
        let mut env = HashMap::new();
        env.insert(x.label(), 100);
        assert_eq!(gate.evaluate(&env), 109);
    }

    #[test]
    fn and_all_short_circuits_without_consuming_the_rest() {
        let mut f = NumFactory::new();
        let pulled = Cell::new(0usize);
        let fv = f.false_value();
        let tv = f.true_value();
        // if the fold reached past FALSE this iterator would hand out
        // operands and bump the counter
        let ops = [fv, tv.clone(), tv].into_iter().inspect(|_| {
            pulled.set(pulled.get() + 1);
        });
        let out = f.and_all(ops);
        assert!(Arc::ptr_eq(&out, &f.false_value()));
        assert_eq!(pulled.get(), 1);
    }

    #[test]
    fn or_all_short_circuits_on_true() {
        let mut f = NumFactory::new();
        let pulled = Cell::new(0usize);
        let x = f.fresh_variable();
        let zero = f.zero();
        let cmp = f.neq(&x, &zero);
        let tv = f.true_value();
        let fv = f.false_value();
        let ops = [cmp, tv, fv].into_iter().inspect(|_| {
            pulled.set(pulled.get() + 1);
        });
        let out = f.or_all(ops);
        assert!(Arc::ptr_eq(&out, &f.true_value()));
        assert_eq!(pulled.get(), 2);
    }

    #[test]
    fn nand_all_short_circuits_on_a_true_input() {
        let mut f = NumFactory::new();
        let pulled = Cell::new(0usize);
        let x = f.fresh_variable();
        let zero = f.zero();
        let cmp = f.lt(&x, &zero);
        let tv = f.true_value();
        let fv = f.false_value();
        // not(TRUE) is the absorbing FALSE, so the third operand is never
        // produced
        let ops = [cmp.clone(), tv, fv].into_iter().inspect(|_| {
            pulled.set(pulled.get() + 1);
        });
        let out = f.nand_all(ops);
        assert!(Arc::ptr_eq(&out, &f.false_value()));
        assert_eq!(pulled.get(), 2);

        // without an absorbing input every operand is negated into the fold
        let out = f.nand_all([cmp.clone()]);
        match &*out {
            BoolValue::Not { arg, .. } => assert!(Arc::ptr_eq(arg, &cmp)),
            other => panic!("expected a negation, got {}", other),
        }
    }

    #[test]
    fn lift_of_a_formula_guards_a_strictly_true_variable() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let zero = f.zero();
        let b = f.neq(&x, &zero);
        let lifted = f.lift(&b);
        match &*lifted {
            NumValue::Ite {
                label,
                cond,
                then,
                els,
            } => {
                assert!(Arc::ptr_eq(cond, &b));
                // the strictly-true variable shares the guard's label
                assert_eq!(then.label(), b.label());
                assert!(matches!(&**then, NumValue::Var { .. }));
                assert!(Arc::ptr_eq(els, &f.zero()));
                assert!(label.0 > b.label().0);
            }
            other => panic!("expected a guarded choice, got {}", other),
        }
        assert_eq!(f.correlation(b.label()), Correlation::True);
        assert_eq!(f.max_variable(), b.label().0);

        let mut env = HashMap::new();
        env.insert(x.label(), 5);
        env.insert(b.label(), 3);
        assert_eq!(lifted.evaluate(&env), 3);
        env.insert(x.label(), 0);
        assert_eq!(lifted.evaluate(&env), 0);

        // dropping the lifted value goes back through a zero comparison
        let d = f.drop_bool(&lifted);
        env.insert(x.label(), 5);
        assert!(d.evaluate(&env));
        env.insert(x.label(), 0);
        assert!(!d.evaluate(&env));
    }

    #[test]
    fn boolean_connectives_short_circuit() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let zero = f.zero();
        let b = f.neq(&x, &zero);
        let t = f.true_value();
        let fl = f.false_value();

        let r = f.and(&fl, &b);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
        let r = f.and(&t, &b);
        assert!(Arc::ptr_eq(&r, &b));
        let r = f.or(&t, &b);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.or(&fl, &b);
        assert!(Arc::ptr_eq(&r, &b));

        let n = f.not(&b);
        let nn = f.not(&n);
        assert!(Arc::ptr_eq(&nn, &b));

        let imp = f.implies(&fl, &b);
        assert!(Arc::ptr_eq(&imp, &f.true_value()));
        let same = f.iff(&b, &b);
        // no complement detection in the connective layer, so a gate is built
        assert!(!same.is_const());
    }

    #[test]
    fn comparisons_fold_on_identity_and_constants() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let r = f.eq(&x, &x);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.lte(&x, &x);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.lt(&x, &x);
        assert!(Arc::ptr_eq(&r, &f.false_value()));

        let a = f.constant(3);
        let b = f.constant(5);
        let r = f.lt(&a, &b);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.gte(&a, &b);
        assert!(Arc::ptr_eq(&r, &f.false_value()));

        let r = f.lt(&a, &x);
        assert!(matches!(&*r, BoolValue::Cmp { op: CmpOp::Lt, .. }));
    }

    #[test]
    fn ite_degenerates_on_equal_branches_and_constant_guards() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let y = f.fresh_variable();
        let zero = f.zero();
        let cond = f.neq(&y, &zero);
        let r = f.ite(&cond, &x, &x);
        assert!(Arc::ptr_eq(&r, &x));
        let t = f.true_value();
        let r = f.ite(&t, &x, &y);
        assert!(Arc::ptr_eq(&r, &x));
        let fl = f.false_value();
        let r = f.ite(&fl, &x, &y);
        assert!(Arc::ptr_eq(&r, &y));
        let r = f.implies_num(&cond, &x);
        assert!(matches!(&*r, NumValue::Ite { .. }));
    }

    #[test]
    fn cmp_seq_on_the_reference_rows() {
        let mut f = NumFactory::new();
        let m = seq(&mut f, &[(0, 3), (2, 5)]);
        let n = seq(&mut f, &[(0, 3), (1, 0), (2, 7)]);

        let r = f.cmp_seq(CmpOp::Lte, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.cmp_seq(CmpOp::Lt, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.cmp_seq(CmpOp::Eq, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
        let r = f.cmp_seq(CmpOp::Gt, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
        let r = f.cmp_seq(CmpOp::Gte, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
    }

    #[test]
    fn cmp_seq_zero_pads_differing_domains() {
        let mut f = NumFactory::new();
        // {1: 4} vs {}: the implicit zeros decide
        let m = seq(&mut f, &[(1, 4)]);
        let n = SparseSeq::new();
        let r = f.cmp_seq(CmpOp::Gt, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.cmp_seq(CmpOp::Lt, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
        let r = f.cmp_seq(CmpOp::Eq, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
    }

    #[test]
    fn cmp_seq_strictness_needs_a_witness() {
        let mut f = NumFactory::new();
        let m = seq(&mut f, &[(0, 3), (1, 1)]);
        let n = seq(&mut f, &[(0, 3), (1, 1)]);
        // equal rows: <= holds, < lacks a strict witness
        let r = f.cmp_seq(CmpOp::Lte, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.cmp_seq(CmpOp::Lt, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
    }

    #[test]
    fn cmp_seq_of_two_empty_rows() {
        let mut f = NumFactory::new();
        let m: SparseSeq<NumRef> = SparseSeq::new();
        let n: SparseSeq<NumRef> = SparseSeq::new();
        for op in [CmpOp::Eq, CmpOp::Lte, CmpOp::Gte] {
            let r = f.cmp_seq(op, &m, &n);
            assert!(Arc::ptr_eq(&r, &f.true_value()), "{}", op);
        }
        for op in [CmpOp::Lt, CmpOp::Gt] {
            let r = f.cmp_seq(op, &m, &n);
            assert!(Arc::ptr_eq(&r, &f.false_value()), "{}", op);
        }
    }

    #[test]
    fn constant_rows_fold_without_allocating_gates() {
        let mut f = NumFactory::new();
        let m = seq(&mut f, &[(0, 1), (3, 2)]);
        let n = seq(&mut f, &[(0, 2), (3, 4)]);
        let before = f.next_label;
        let r = f.cmp_seq(CmpOp::Lt, &m, &n);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        assert_eq!(f.next_label, before);
    }

    #[test]
    fn symbolic_rows_build_a_guarding_formula() {
        let mut f = NumFactory::new();
        let x = f.fresh_variable();
        let y = f.fresh_variable();
        let mut m = SparseSeq::new();
        m.put(0, x.clone());
        m.put(1, y.clone());
        let n = seq(&mut f, &[(0, 3), (1, 5)]);

        let r = f.cmp_seq(CmpOp::Eq, &m, &n);
        let mut env = HashMap::new();
        env.insert(x.label(), 3);
        env.insert(y.label(), 5);
        assert!(r.evaluate(&env));
        env.insert(y.label(), 6);
        assert!(!r.evaluate(&env));

        let r = f.cmp_seq(CmpOp::Lt, &m, &n);
        env.insert(x.label(), 3);
        env.insert(y.label(), 4);
        assert!(r.evaluate(&env)); // 3 <= 3, 4 < 5
        env.insert(y.label(), 5);
        assert!(!r.evaluate(&env)); // no strict witness
    }

    #[test]
    fn cmp_seq_scalar_compares_explicit_entries_only() {
        let mut f = NumFactory::new();
        let m = seq(&mut f, &[(0, 2), (4, 3)]);
        let five = f.constant(5);
        let r = f.cmp_seq_scalar(CmpOp::Lt, &m, &five);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let three = f.constant(3);
        let r = f.cmp_seq_scalar(CmpOp::Lt, &m, &three);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
    }

    #[test]
    fn cmp_seq_scalar_on_an_empty_row() {
        let mut f = NumFactory::new();
        let m: SparseSeq<NumRef> = SparseSeq::new();
        let five = f.constant(5);
        let r = f.cmp_seq_scalar(CmpOp::Lt, &m, &five);
        assert!(Arc::ptr_eq(&r, &f.true_value())); // 0 < 5
        let r = f.cmp_seq_scalar(CmpOp::Gte, &m, &five);
        assert!(Arc::ptr_eq(&r, &f.false_value()));

        let neg = f.constant(-2);
        let r = f.cmp_seq_scalar(CmpOp::Gt, &m, &neg);
        assert!(Arc::ptr_eq(&r, &f.true_value())); // 0 > -2

        let z = f.zero();
        let r = f.cmp_seq_scalar(CmpOp::Eq, &m, &z);
        assert!(Arc::ptr_eq(&r, &f.true_value()));

        let t = f.true_variable();
        let r = f.cmp_seq_scalar(CmpOp::Lt, &m, &t);
        assert!(Arc::ptr_eq(&r, &f.true_value()));
        let r = f.cmp_seq_scalar(CmpOp::Eq, &m, &t);
        assert!(Arc::ptr_eq(&r, &f.false_value()));
    }

    #[test]
    fn semi_negative_requires_the_zero_row() {
        let mut f = NumFactory::new();
        let m = seq(&mut f, &[(0, 0), (1, 3)]);
        let r = f.semi_negative(&m);
        assert!(Arc::ptr_eq(&r, &f.false_value()));

        let x = f.fresh_variable();
        let mut m = SparseSeq::new();
        m.put(2, x.clone());
        let r = f.semi_negative(&m);
        let mut env = HashMap::new();
        env.insert(x.label(), 0);
        assert!(r.evaluate(&env));
        env.insert(x.label(), 1);
        assert!(!r.evaluate(&env));
    }

    #[test]
    fn matrix_cmp_checks_shapes() {
        let mut f = NumFactory::new();
        let m = f
            .matrix_with_ones(Dimensions::square(1, 3), &[0, 2])
            .unwrap();
        let n = f
            .matrix_with_ones(Dimensions::square(1, 3), &[0, 2])
            .unwrap();
        let r = f.matrix_cmp(CmpOp::Eq, &m, &n).unwrap();
        assert!(Arc::ptr_eq(&r, &f.true_value()));

        let wide = f.matrix(Dimensions::square(2, 3));
        let err = f.matrix_cmp(CmpOp::Eq, &m, &wide).unwrap_err();
        assert!(matches!(err, FactoryError::DimensionMismatch(_, _)));
    }

    #[test]
    fn constant_f64_truncates_toward_integer_semantics() {
        let mut f = NumFactory::new();
        assert_eq!(f.constant_f64(3.9).as_const(), Some(3));
        assert!(Arc::ptr_eq(&f.constant_f64(0.2), &f.zero()));
        assert!(Arc::ptr_eq(&f.constant_f64(1.0), &f.one()));
    }

    #[test]
    fn error_messages_name_the_offender() {
        let mut f = NumFactory::new();
        let a = f.constant(9);
        let z = f.zero();
        let err = f.divide(&a, &z).unwrap_err();
        assert_eq!(err.to_string(), "cannot divide by zero: 9 / 0");
        let err = f.variable(Label(77)).unwrap_err();
        assert_eq!(err.to_string(), "expected a variable label, given label = 77");
    }
}
