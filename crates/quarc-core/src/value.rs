//! The numeric value hierarchy: symbolic DAG nodes for weighted formulas.
//!
//! Every node other than the two canonical constants carries a unique,
//! monotonically increasing [`Label`] assigned at construction time by the
//! [`NumFactory`](crate::factory::NumFactory). Nodes are immutable and hold
//! only forward references to their operands, so the structure is a strict
//! DAG. Sharing is structural: equal-looking nodes built by unrelated calls
//! keep distinct labels, and simplification tests against the ZERO/ONE
//! singletons by identity (`Arc::ptr_eq`), never by value equality.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::boolean::BoolRef;

/// Shared handle to a numeric DAG node.
pub type NumRef = Arc<NumValue>;

/// Unique identifier of a variable or gate within one factory instance.
///
/// Label 0 is reserved for the shared constant singletons; variables and
/// gates start at 1 and only ever grow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(pub u32);

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Binary (and, for the associative subset, n-ary) arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AritOp {
    /// Addition.
    Plus,
    /// Subtraction.
    Minus,
    /// Multiplication.
    Times,
    /// Truncating integer division.
    Div,
    /// Remainder.
    Mod,
}

impl AritOp {
    /// True for the operators accepted by the n-ary accumulator
    /// (folded left to right).
    pub fn is_nary(self) -> bool {
        matches!(self, AritOp::Plus | AritOp::Minus | AritOp::Times)
    }

    /// Apply the operator to two constants.
    ///
    /// Arithmetic wraps on overflow, and division or modulo by zero yields 0,
    /// matching the unguarded arithmetic a solved instance exhibits when the
    /// symbolic guard selected the zero branch. The factory's constructors
    /// reject *literal* zero divisors before ever reaching this function.
    pub fn apply(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            AritOp::Plus => lhs.wrapping_add(rhs),
            AritOp::Minus => lhs.wrapping_sub(rhs),
            AritOp::Times => lhs.wrapping_mul(rhs),
            AritOp::Div => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_div(rhs)
                }
            }
            AritOp::Mod => {
                if rhs == 0 {
                    0
                } else {
                    lhs.wrapping_rem(rhs)
                }
            }
        }
    }
}

impl fmt::Display for AritOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AritOp::Plus => "+",
            AritOp::Minus => "-",
            AritOp::Times => "*",
            AritOp::Div => "/",
            AritOp::Mod => "%",
        };
        write!(f, "{}", s)
    }
}

/// Unary arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Absolute value.
    Abs,
    /// Sign function (-1, 0 or 1).
    Sgn,
}

impl UnaryOp {
    /// Apply the operator to a constant. Negation and absolute value wrap
    /// on `i64::MIN`.
    pub fn apply(self, v: i64) -> i64 {
        match self {
            UnaryOp::Neg => v.wrapping_neg(),
            UnaryOp::Abs => v.wrapping_abs(),
            UnaryOp::Sgn => v.signum(),
        }
    }
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Abs => "abs",
            UnaryOp::Sgn => "sgn",
        };
        write!(f, "{}", s)
    }
}

/// Comparison operator between two numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CmpOp {
    /// Equality.
    Eq,
    /// Strictly less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Strictly greater than.
    Gt,
    /// Greater than or equal.
    Gte,
}

impl CmpOp {
    /// True when the operator admits equal operands, so that `x op x` folds
    /// to TRUE rather than FALSE.
    pub fn is_inclusive(self) -> bool {
        matches!(self, CmpOp::Eq | CmpOp::Lte | CmpOp::Gte)
    }

    /// The non-strict operator used on the forall side of a strict
    /// whole-matrix comparison (`<` relaxes to `<=`, `>` to `>=`).
    pub fn relaxed(self) -> CmpOp {
        match self {
            CmpOp::Lt => CmpOp::Lte,
            CmpOp::Gt => CmpOp::Gte,
            other => other,
        }
    }

    /// Apply the operator to two constants.
    pub fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            CmpOp::Eq => lhs == rhs,
            CmpOp::Lt => lhs < rhs,
            CmpOp::Lte => lhs <= rhs,
            CmpOp::Gt => lhs > rhs,
            CmpOp::Gte => lhs >= rhs,
        }
    }
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CmpOp::Eq => "=",
            CmpOp::Lt => "<",
            CmpOp::Lte => "<=",
            CmpOp::Gt => ">",
            CmpOp::Gte => ">=",
        };
        write!(f, "{}", s)
    }
}

/// Boolean correlation of a numeric variable: whether its boolean projection
/// (`v != 0`) is known to hold or to fail without solving.
///
/// The flag lives in the factory's variable arena, not in the shared node,
/// so promoting a variable to strictly-true mutates a single arena entry
/// while every `Arc` referencing the node stays untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correlation {
    /// No static knowledge; dropping the variable allocates a comparison.
    Unconstrained,
    /// The variable is known non-zero; it drops to the TRUE constant.
    True,
    /// The variable is known zero; it drops to the FALSE constant.
    False,
}

/// A symbolic numeric expression node.
///
/// Constructed exclusively through [`NumFactory`](crate::factory::NumFactory)
/// so that the canonicalization shortcuts and label discipline always apply.
#[derive(Debug, PartialEq)]
pub enum NumValue {
    /// A literal value. The factory keeps exactly one shared instance each
    /// for 0 and 1 (both under the reserved label 0).
    Const {
        /// Node label (0 for the shared singletons).
        label: Label,
        /// The literal value.
        value: i64,
    },
    /// A free variable; its correlation flag is held by the factory arena.
    Var {
        /// Node label, doubling as the arena key.
        label: Label,
    },
    /// NEG, ABS or SGN over one operand.
    Unary {
        /// The operator.
        op: UnaryOp,
        /// Node label.
        label: Label,
        /// The operand.
        arg: NumRef,
    },
    /// A binary arithmetic gate, produced only when folding does not apply.
    Binary {
        /// The operator.
        op: AritOp,
        /// Node label.
        label: Label,
        /// Left operand.
        lhs: NumRef,
        /// Right operand.
        rhs: NumRef,
    },
    /// An associative gate over three or more operands, folded left to right.
    Nary {
        /// The operator (PLUS, MINUS or TIMES).
        op: AritOp,
        /// Node label.
        label: Label,
        /// The operands, in accumulation order.
        args: Vec<NumRef>,
    },
    /// Ternary choice conditioned on a boolean formula.
    Ite {
        /// Node label.
        label: Label,
        /// The guard.
        cond: BoolRef,
        /// Value when the guard holds.
        then: NumRef,
        /// Value when the guard fails.
        els: NumRef,
    },
    /// Binary minimum.
    Min {
        /// Node label.
        label: Label,
        /// Left operand.
        lhs: NumRef,
        /// Right operand.
        rhs: NumRef,
    },
    /// Binary maximum.
    Max {
        /// Node label.
        label: Label,
        /// Left operand.
        lhs: NumRef,
        /// Right operand.
        rhs: NumRef,
    },
    /// A value statically known to range over {0,1}, paired with its boolean
    /// twin. The two views name the same underlying decision: the twin
    /// shares the numeric node's label (or conversely, see
    /// [`NumFactory::to_binary`](crate::factory::NumFactory::to_binary)).
    Binary01 {
        /// The {0,1}-valued numeric view.
        num: NumRef,
        /// The boolean view of the same decision.
        twin: BoolRef,
    },
}

impl NumValue {
    /// The node's label. A [`NumValue::Binary01`] pair answers with its
    /// numeric view's label.
    pub fn label(&self) -> Label {
        match self {
            NumValue::Const { label, .. }
            | NumValue::Var { label }
            | NumValue::Unary { label, .. }
            | NumValue::Binary { label, .. }
            | NumValue::Nary { label, .. }
            | NumValue::Ite { label, .. }
            | NumValue::Min { label, .. }
            | NumValue::Max { label, .. } => *label,
            NumValue::Binary01 { num, .. } => num.label(),
        }
    }

    /// The literal value, when this node is a constant.
    pub fn as_const(&self) -> Option<i64> {
        match self {
            NumValue::Const { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// True when this node is a constant.
    pub fn is_const(&self) -> bool {
        matches!(self, NumValue::Const { .. })
    }

    /// Evaluate the DAG under a variable assignment (label to value).
    /// Unassigned variables read as 0.
    ///
    /// Division and modulo evaluate their unguarded arithmetic directly
    /// (zero divisor yields 0); factory-built divisions wrap the gate in an
    /// `ite` guard, so the guard decides before the raw operation is reached.
    pub fn evaluate(&self, env: &HashMap<Label, i64>) -> i64 {
        match self {
            NumValue::Const { value, .. } => *value,
            NumValue::Var { label } => env.get(label).copied().unwrap_or(0),
            NumValue::Unary { op, arg, .. } => op.apply(arg.evaluate(env)),
            NumValue::Binary { op, lhs, rhs, .. } => op.apply(lhs.evaluate(env), rhs.evaluate(env)),
            NumValue::Nary { op, args, .. } => {
                let mut it = args.iter();
                let first = it.next().map(|v| v.evaluate(env)).unwrap_or(0);
                it.fold(first, |acc, v| op.apply(acc, v.evaluate(env)))
            }
            NumValue::Ite { cond, then, els, .. } => {
                if cond.evaluate(env) {
                    then.evaluate(env)
                } else {
                    els.evaluate(env)
                }
            }
            NumValue::Min { lhs, rhs, .. } => lhs.evaluate(env).min(rhs.evaluate(env)),
            NumValue::Max { lhs, rhs, .. } => lhs.evaluate(env).max(rhs.evaluate(env)),
            NumValue::Binary01 { num, .. } => num.evaluate(env),
        }
    }
}

impl fmt::Display for NumValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumValue::Const { value, .. } => write!(f, "{}", value),
            NumValue::Var { label } => write!(f, "v{}", label),
            NumValue::Unary { op, arg, .. } => write!(f, "({} {})", op, arg),
            NumValue::Binary { op, lhs, rhs, .. } => write!(f, "({} {} {})", op, lhs, rhs),
            NumValue::Nary { op, args, .. } => {
                write!(f, "({}", op)?;
                for a in args {
                    write!(f, " {}", a)?;
                }
                write!(f, ")")
            }
            NumValue::Ite { cond, then, els, .. } => {
                write!(f, "(ite {} {} {})", cond, then, els)
            }
            NumValue::Min { lhs, rhs, .. } => write!(f, "(min {} {})", lhs, rhs),
            NumValue::Max { lhs, rhs, .. } => write!(f, "(max {} {})", lhs, rhs),
            NumValue::Binary01 { num, .. } => write!(f, "{}", num),
        }
    }
}
