//! Boolean circuit substrate.
//!
//! The quantitative engine composes, rather than reimplements, a small
//! boolean gate layer: constants, variables, NOT, binary and n-ary AND/OR
//! gates, and comparison gates over numeric operands (the one place where
//! the boolean domain refers back into the numeric one). Short-circuiting
//! n-ary construction goes through [`BoolAccumulator`](crate::accum::BoolAccumulator)
//! and the factory's `and_all`/`or_all`.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::value::{CmpOp, Label, NumRef};

/// Shared handle to a boolean DAG node.
pub type BoolRef = Arc<BoolValue>;

/// Boolean AND/OR, the two accumulator-foldable connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolOp {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}

impl BoolOp {
    /// The identity element: TRUE for AND, FALSE for OR. Adding it to an
    /// accumulator is a no-op.
    pub fn identity(self) -> bool {
        matches!(self, BoolOp::And)
    }

    /// The absorbing element: FALSE for AND, TRUE for OR. Encountering it
    /// collapses the whole fold.
    pub fn absorbing(self) -> bool {
        matches!(self, BoolOp::Or)
    }
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BoolOp::And => "and",
            BoolOp::Or => "or",
        };
        write!(f, "{}", s)
    }
}

/// A boolean-valued DAG node.
///
/// Constructed through [`NumFactory`](crate::factory::NumFactory); the TRUE
/// and FALSE constants are shared singletons owned by the factory.
#[derive(Debug, PartialEq)]
pub enum BoolValue {
    /// TRUE or FALSE. The factory keeps one shared instance of each.
    Const(bool),
    /// A boolean variable. When produced by
    /// [`NumFactory::to_bool`](crate::factory::NumFactory::to_bool) it shares
    /// its label with the numeric variable it mirrors.
    Var {
        /// Node label.
        label: Label,
    },
    /// Logical negation.
    Not {
        /// Node label.
        label: Label,
        /// The negated formula.
        arg: BoolRef,
    },
    /// Binary AND/OR gate.
    Binary {
        /// The connective.
        op: BoolOp,
        /// Node label.
        label: Label,
        /// Left operand.
        lhs: BoolRef,
        /// Right operand.
        rhs: BoolRef,
    },
    /// N-ary AND/OR gate produced by accumulation.
    Nary {
        /// The connective.
        op: BoolOp,
        /// Node label.
        label: Label,
        /// The operands, in accumulation order.
        args: Vec<BoolRef>,
    },
    /// A relational comparison between two numeric values, produced only
    /// when neither side folds.
    Cmp {
        /// The comparison operator.
        op: CmpOp,
        /// Node label.
        label: Label,
        /// Left operand.
        lhs: NumRef,
        /// Right operand.
        rhs: NumRef,
    },
}

impl BoolValue {
    /// The node's label; the constants answer with the reserved label 0.
    pub fn label(&self) -> Label {
        match self {
            BoolValue::Const(_) => Label(0),
            BoolValue::Var { label }
            | BoolValue::Not { label, .. }
            | BoolValue::Binary { label, .. }
            | BoolValue::Nary { label, .. }
            | BoolValue::Cmp { label, .. } => *label,
        }
    }

    /// The literal truth value, when this node is a constant.
    pub fn as_const(&self) -> Option<bool> {
        match self {
            BoolValue::Const(b) => Some(*b),
            _ => None,
        }
    }

    /// True when this node is a constant.
    pub fn is_const(&self) -> bool {
        matches!(self, BoolValue::Const(_))
    }

    /// Evaluate the formula under a variable assignment (label to numeric
    /// value; a boolean variable reads as the truth of `value != 0`, keeping
    /// the two views of a paired decision consistent). Unassigned variables
    /// read as 0, hence false.
    pub fn evaluate(&self, env: &HashMap<Label, i64>) -> bool {
        match self {
            BoolValue::Const(b) => *b,
            BoolValue::Var { label } => env.get(label).copied().unwrap_or(0) != 0,
            BoolValue::Not { arg, .. } => !arg.evaluate(env),
            BoolValue::Binary { op, lhs, rhs, .. } => match op {
                BoolOp::And => lhs.evaluate(env) && rhs.evaluate(env),
                BoolOp::Or => lhs.evaluate(env) || rhs.evaluate(env),
            },
            BoolValue::Nary { op, args, .. } => match op {
                BoolOp::And => args.iter().all(|a| a.evaluate(env)),
                BoolOp::Or => args.iter().any(|a| a.evaluate(env)),
            },
            BoolValue::Cmp { op, lhs, rhs, .. } => op.apply(lhs.evaluate(env), rhs.evaluate(env)),
        }
    }
}

impl fmt::Display for BoolValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoolValue::Const(b) => write!(f, "{}", b),
            BoolValue::Var { label } => write!(f, "b{}", label),
            BoolValue::Not { arg, .. } => write!(f, "(not {})", arg),
            BoolValue::Binary { op, lhs, rhs, .. } => write!(f, "({} {} {})", op, lhs, rhs),
            BoolValue::Nary { op, args, .. } => {
                write!(f, "({}", op)?;
                for a in args {
                    write!(f, " {}", a)?;
                }
                write!(f, ")")
            }
            BoolValue::Cmp { op, lhs, rhs, .. } => write!(f, "({} {} {})", op, lhs, rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::NumValue;

    #[test]
    fn op_identity_and_absorbing() {
        assert!(BoolOp::And.identity());
        assert!(!BoolOp::And.absorbing());
        assert!(!BoolOp::Or.identity());
        assert!(BoolOp::Or.absorbing());
    }

    #[test]
    fn evaluate_cmp_gate() {
        let x = Arc::new(NumValue::Var { label: Label(1) });
        let y = Arc::new(NumValue::Var { label: Label(2) });
        let cmp = BoolValue::Cmp {
            op: CmpOp::Lt,
            label: Label(3),
            lhs: x,
            rhs: y,
        };
        let mut env = HashMap::new();
        env.insert(Label(1), 3);
        env.insert(Label(2), 5);
        assert!(cmp.evaluate(&env));
        env.insert(Label(2), 2);
        assert!(!cmp.evaluate(&env));
    }

    #[test]
    fn evaluate_nary_or() {
        let args: Vec<BoolRef> = (1..=3)
            .map(|i| Arc::new(BoolValue::Var { label: Label(i) }))
            .collect();
        let gate = BoolValue::Nary {
            op: BoolOp::Or,
            label: Label(4),
            args,
        };
        let mut env = HashMap::new();
        assert!(!gate.evaluate(&env));
        env.insert(Label(2), 7);
        assert!(gate.evaluate(&env));
    }

    #[test]
    fn display_renders_prefix_forms() {
        let a = Arc::new(BoolValue::Var { label: Label(1) });
        let b = Arc::new(BoolValue::Var { label: Label(2) });
        let gate = BoolValue::Binary {
            op: BoolOp::And,
            label: Label(3),
            lhs: a,
            rhs: b,
        };
        assert_eq!(gate.to_string(), "(and b1 b2)");
    }
}
