//! Constraint inference from enclosing `if` conditions
//!
//! Inside `if (x > 5) { ... }` the reference `x` is known to be above 5;
//! inside the `else` branch it is known not to be. Only comparisons of the
//! name against a numeric literal are understood.

use crate::constraint::{FloatRangeConstraint, IntRangeConstraint, RangeConstraint};
use crate::model::{CompareOp, Condition, ConstantValue, Guard, Operand};
use tracing::trace;

/// Result of applying guards to a declared constraint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Refinement {
    pub constraint: Option<RangeConstraint>,
    /// Whether any guard contributed to `constraint`
    pub inferred: bool,
}

/// Constraint on `name` implied by `condition` being true.
///
/// `previous` is the constraint known so far; `!=` can only trim one of its
/// ends since ranges are contiguous.
pub fn infer(
    condition: &Condition,
    name: &str,
    previous: Option<&RangeConstraint>,
) -> Option<RangeConstraint> {
    match condition {
        Condition::And(left, right) => {
            let left = infer(left, name, previous);
            let right = infer(right, name, previous);
            match (left, right) {
                (Some(left), Some(right)) => Some(right.and(&left)),
                (left, right) => left.or(right),
            }
        }
        Condition::Compare { left, op, right } => match (left, right) {
            (Operand::Name(n), Operand::Number(value)) if n == name => compare(*op, value, previous),
            (Operand::Number(value), Operand::Name(n)) if n == name => {
                compare(op.flipped(), value, previous)
            }
            _ => None,
        },
        Condition::Or(..) | Condition::Not(_) | Condition::Other => None,
    }
}

fn compare(op: CompareOp, value: &ConstantValue, previous: Option<&RangeConstraint>) -> Option<RangeConstraint> {
    match value {
        ConstantValue::Float(number) => {
            let number = *number;
            if number.is_infinite() || number.is_nan() {
                return None;
            }
            let range = match op {
                CompareOp::Gt => FloatRangeConstraint::greater_than(number),
                CompareOp::Ge => FloatRangeConstraint::at_least(number),
                CompareOp::Lt => FloatRangeConstraint::less_than(number),
                CompareOp::Le => FloatRangeConstraint::at_most(number),
                CompareOp::Eq => FloatRangeConstraint::range(number, number),
                CompareOp::Ne => return None,
            };
            Some(RangeConstraint::Float(range))
        }
        ConstantValue::Int(number) => {
            let number = *number;
            if number == i64::MIN || number == i64::MAX {
                return None;
            }
            let range = match op {
                CompareOp::Gt => IntRangeConstraint::greater_than(number),
                CompareOp::Ge => IntRangeConstraint::at_least(number),
                CompareOp::Lt => IntRangeConstraint::less_than(number),
                CompareOp::Le => IntRangeConstraint::at_most(number),
                CompareOp::Eq => IntRangeConstraint::range(number, number),
                CompareOp::Ne => match previous {
                    Some(RangeConstraint::Int(previous)) if previous.from == number => {
                        IntRangeConstraint::range(previous.from + 1, previous.to)
                    }
                    Some(RangeConstraint::Int(previous)) if previous.to == number => {
                        IntRangeConstraint::range(previous.from, previous.to - 1)
                    }
                    _ => return None,
                },
            };
            Some(RangeConstraint::Int(range))
        }
        ConstantValue::Str(_) | ConstantValue::Array(_) => None,
    }
}

/// Applies `guards` (outermost first) to the declared constraint of `name`
pub fn refine(declared: Option<RangeConstraint>, guards: &[Guard], name: &str) -> Refinement {
    let mut current = declared;
    let mut inferred = false;

    for guard in guards {
        let Some(implied) = infer(&guard.condition, name, current.as_ref()) else {
            continue;
        };
        trace!("Guard on {} implies {}", name, implied.describe());
        inferred = true;
        current = if guard.then_branch {
            Some(match current {
                Some(known) => known.and(&implied),
                None => implied,
            })
        } else {
            // Without a declared constraint the complement is not a single range
            current.and_then(|known| known.remove(&implied))
        };
    }

    Refinement {
        constraint: current,
        inferred,
    }
}
