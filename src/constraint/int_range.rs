//! Integer ranges (`@IntRange`).

use super::float_range::FloatRangeConstraint;
use super::{capitalize_label, join_actual_label};

/// Closed integer interval `[from, to]`.
///
/// An absent lower bound is `i64::MIN` and an absent upper bound is
/// `i64::MAX`, matching the defaults of the `@IntRange` annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntRangeConstraint {
    pub from: i64,
    pub to: i64,
}

impl IntRangeConstraint {
    pub fn range(from: i64, to: i64) -> Self {
        Self { from, to }
    }

    pub fn at_least(value: i64) -> Self {
        Self::range(value, i64::MAX)
    }

    pub fn at_most(value: i64) -> Self {
        Self::range(i64::MIN, value)
    }

    pub fn greater_than(value: i64) -> Self {
        Self::at_least(value.saturating_add(1))
    }

    pub fn less_than(value: i64) -> Self {
        Self::at_most(value.saturating_sub(1))
    }

    pub fn has_lower_bound(&self) -> bool {
        self.from != i64::MIN
    }

    pub fn has_upper_bound(&self) -> bool {
        self.to != i64::MAX
    }

    /// True iff exactly one bound is present.
    pub fn is_infinite(&self) -> bool {
        self.has_lower_bound() != self.has_upper_bound()
    }

    pub fn is_possible(&self) -> bool {
        self.from <= self.to
    }

    pub fn is_valid(&self, value: i64) -> bool {
        value >= self.from && value <= self.to
    }

    pub fn contains(&self, other: &IntRangeConstraint) -> bool {
        other.from >= self.from && other.to <= self.to
    }

    pub fn contains_float(&self, other: &FloatRangeConstraint) -> bool {
        self.to_float().contains(other)
    }

    pub fn and(&self, other: &IntRangeConstraint) -> IntRangeConstraint {
        Self::range(self.from.max(other.from), self.to.min(other.to))
    }

    /// Subtracts `other`, which must cover exactly one end of this range.
    pub fn remove(&self, other: &IntRangeConstraint) -> Option<IntRangeConstraint> {
        if other.to < self.from || other.from > self.to {
            return None;
        }
        let covers_from = other.from <= self.from;
        let covers_to = other.to >= self.to;
        match (covers_from, covers_to) {
            (true, false) => Some(Self::range(other.to.saturating_add(1), self.to)),
            (false, true) => Some(Self::range(self.from, other.from.saturating_sub(1))),
            _ => None,
        }
    }

    /// The same interval as a closed floating range.
    pub fn to_float(&self) -> FloatRangeConstraint {
        let from = if self.has_lower_bound() {
            self.from as f64
        } else {
            f64::NEG_INFINITY
        };
        let to = if self.has_upper_bound() {
            self.to as f64
        } else {
            f64::INFINITY
        };
        FloatRangeConstraint::new(from, to, true, true)
    }

    /// Bounds without the "Value must be" prefix, e.g. `≥ 1 and ≤ 5`.
    pub fn bounds_text(&self) -> String {
        match (self.has_lower_bound(), self.has_upper_bound()) {
            (true, true) => format!("≥ {} and ≤ {}", self.from, self.to),
            (true, false) => format!("≥ {}", self.from),
            (false, true) => format!("≤ {}", self.to),
            (false, false) => "any value".to_string(),
        }
    }

    pub fn describe(&self) -> String {
        self.describe_with_prefix(None, None)
    }

    pub fn describe_value(&self, value: i64) -> String {
        self.describe_with_prefix(None, Some(value))
    }

    /// Describes the range; with a value, only the violated bound is shown.
    ///
    /// `prefix` replaces the default `"Value must be "`, which lets typedef
    /// checks append `"or value must be "` to their own message.
    pub fn describe_with_prefix(&self, prefix: Option<&str>, value: Option<i64>) -> String {
        let mut sb = String::with_capacity(32);
        sb.push_str(prefix.unwrap_or("Value must be "));

        if let Some(value) = value {
            if value < self.from {
                sb.push_str(&format!("≥ {} (was {})", self.from, value));
                return sb;
            } else if value > self.to {
                sb.push_str(&format!("≤ {} (was {})", self.to, value));
                return sb;
            }
        }

        sb.push_str(&self.bounds_text());
        if !self.is_possible() {
            sb.push_str(" (not possible)");
        }
        if let Some(value) = value {
            sb.push_str(&format!(" (is {})", value));
        }
        sb
    }

    pub fn describe_delta(
        &self,
        actual: &IntRangeConstraint,
        actual_label: &str,
        allowed_label: &str,
    ) -> String {
        format!(
            "{} must be {} but {}can be {}",
            capitalize_label(allowed_label, "Value"),
            self.bounds_text(),
            join_actual_label(actual_label),
            self.violation_text(actual)
        )
    }

    fn violation_text(&self, actual: &IntRangeConstraint) -> String {
        if actual.from < self.from {
            if !actual.has_lower_bound() {
                format!("< {}", self.from)
            } else if actual.to < self.from {
                point_or_range(actual.from, actual.to)
            } else {
                point_or_range(actual.from, self.from.saturating_sub(1))
            }
        } else if actual.to > self.to {
            if !actual.has_upper_bound() {
                format!("> {}", self.to)
            } else if actual.from > self.to {
                point_or_range(actual.from, actual.to)
            } else {
                point_or_range(self.to.saturating_add(1), actual.to)
            }
        } else {
            actual.bounds_text()
        }
    }
}

fn point_or_range(from: i64, to: i64) -> String {
    if from == to {
        from.to_string()
    } else {
        IntRangeConstraint::range(from, to).bounds_text()
    }
}

impl std::fmt::Display for IntRangeConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}
