//! Floating-point ranges (`@FloatRange`) with per-bound inclusivity.

use super::format::{format_double, strip_float_suffix};
use super::int_range::IntRangeConstraint;
use super::{capitalize_label, join_actual_label};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRangeConstraint {
    pub from: f64,
    pub to: f64,
    pub from_inclusive: bool,
    pub to_inclusive: bool,
}

impl FloatRangeConstraint {
    pub fn new(from: f64, to: f64, from_inclusive: bool, to_inclusive: bool) -> Self {
        Self {
            from,
            to,
            from_inclusive,
            to_inclusive,
        }
    }

    pub fn range(from: f64, to: f64) -> Self {
        Self::new(from, to, true, true)
    }

    pub fn at_least(value: f64) -> Self {
        Self::new(value, f64::INFINITY, true, true)
    }

    pub fn at_most(value: f64) -> Self {
        Self::new(f64::NEG_INFINITY, value, true, true)
    }

    pub fn greater_than(value: f64) -> Self {
        Self::new(value, f64::INFINITY, false, true)
    }

    pub fn less_than(value: f64) -> Self {
        Self::new(f64::NEG_INFINITY, value, true, false)
    }

    pub fn has_lower_bound(&self) -> bool {
        self.from != f64::NEG_INFINITY
    }

    pub fn has_upper_bound(&self) -> bool {
        self.to != f64::INFINITY
    }

    pub fn is_infinite(&self) -> bool {
        self.has_lower_bound() != self.has_upper_bound()
    }

    pub fn is_possible(&self) -> bool {
        self.from < self.to || (self.from == self.to && self.from_inclusive && self.to_inclusive)
    }

    pub fn is_valid(&self, value: f64) -> bool {
        !self.below_lower(value) && !self.above_upper(value)
    }

    fn below_lower(&self, value: f64) -> bool {
        if self.from_inclusive {
            value < self.from
        } else {
            value <= self.from
        }
    }

    fn above_upper(&self, value: f64) -> bool {
        if self.to_inclusive {
            value > self.to
        } else {
            value >= self.to
        }
    }

    /// True when `other` starts strictly below this range.
    fn extends_below(&self, other: &FloatRangeConstraint) -> bool {
        if !self.has_lower_bound() {
            return false;
        }
        other.from < self.from
            || (other.from == self.from && other.from_inclusive && !self.from_inclusive)
    }

    /// True when `other` ends strictly above this range.
    fn extends_above(&self, other: &FloatRangeConstraint) -> bool {
        if !self.has_upper_bound() {
            return false;
        }
        other.to > self.to || (other.to == self.to && other.to_inclusive && !self.to_inclusive)
    }

    pub fn contains(&self, other: &FloatRangeConstraint) -> bool {
        !self.extends_below(other) && !self.extends_above(other)
    }

    pub fn contains_int(&self, other: &IntRangeConstraint) -> bool {
        self.contains(&other.to_float())
    }

    pub fn and(&self, other: &FloatRangeConstraint) -> FloatRangeConstraint {
        let (from, from_inclusive) = if self.from > other.from {
            (self.from, self.from_inclusive)
        } else if self.from < other.from {
            (other.from, other.from_inclusive)
        } else {
            (self.from, self.from_inclusive && other.from_inclusive)
        };
        let (to, to_inclusive) = if self.to < other.to {
            (self.to, self.to_inclusive)
        } else if self.to > other.to {
            (other.to, other.to_inclusive)
        } else {
            (self.to, self.to_inclusive && other.to_inclusive)
        };
        Self::new(from, to, from_inclusive, to_inclusive)
    }

    /// Subtracts `other`, which must cover exactly one end of this range.
    /// The new bound is exclusive of the removed values.
    pub fn remove(&self, other: &FloatRangeConstraint) -> Option<FloatRangeConstraint> {
        let disjoint_below = other.to < self.from
            || (other.to == self.from && !(other.to_inclusive && self.from_inclusive));
        let disjoint_above = other.from > self.to
            || (other.from == self.to && !(other.from_inclusive && self.to_inclusive));
        if disjoint_below || disjoint_above {
            return None;
        }

        let covers_from = !other.has_lower_bound()
            || other.from < self.from
            || (other.from == self.from && (other.from_inclusive || !self.from_inclusive));
        let covers_to = !other.has_upper_bound()
            || other.to > self.to
            || (other.to == self.to && (other.to_inclusive || !self.to_inclusive));

        match (covers_from, covers_to) {
            (true, false) => Some(Self::new(
                other.to,
                self.to,
                !other.to_inclusive,
                self.to_inclusive,
            )),
            (false, true) => Some(Self::new(
                self.from,
                other.from,
                self.from_inclusive,
                !other.from_inclusive,
            )),
            _ => None,
        }
    }

    /// Integer values inside this range: `[1.0, 5.0)` becomes `[1, 4]`.
    ///
    /// Bounds beyond the `i64` domain saturate and a NaN bound counts as
    /// absent.
    pub fn to_int(&self) -> IntRangeConstraint {
        let from = if !self.has_lower_bound() || self.from.is_nan() {
            i64::MIN
        } else if self.from_inclusive {
            saturating_int(self.from.ceil())
        } else {
            saturating_int(self.from.floor()).saturating_add(1)
        };
        let to = if !self.has_upper_bound() || self.to.is_nan() {
            i64::MAX
        } else if self.to_inclusive {
            saturating_int(self.to.floor())
        } else {
            saturating_int(self.to.ceil()).saturating_sub(1)
        };
        IntRangeConstraint::range(from, to)
    }

    fn lower_text(&self) -> String {
        let op = if self.from_inclusive { "≥" } else { ">" };
        format!("{} {}", op, format_double(self.from))
    }

    fn upper_text(&self) -> String {
        let op = if self.to_inclusive { "≤" } else { "<" };
        format!("{} {}", op, format_double(self.to))
    }

    pub fn bounds_text(&self) -> String {
        match (self.has_lower_bound(), self.has_upper_bound()) {
            (true, true) => format!("{} and {}", self.lower_text(), self.upper_text()),
            (true, false) => self.lower_text(),
            (false, true) => self.upper_text(),
            (false, false) => "any value".to_string(),
        }
    }

    pub fn describe(&self) -> String {
        let mut sb = format!("Value must be {}", self.bounds_text());
        if !self.is_possible() {
            sb.push_str(" (not possible)");
        }
        sb
    }

    /// Describes the range against `value`. When `source` holds the literal
    /// text of the value it is printed instead of the parsed number.
    pub fn describe_value(&self, value: f64, source: Option<&str>) -> String {
        let shown = match source {
            Some(text) => strip_float_suffix(text.trim()).to_string(),
            None => format_double(value),
        };
        if self.has_lower_bound() && self.below_lower(value) {
            return format!("Value must be {} (was {})", self.lower_text(), shown);
        }
        if self.has_upper_bound() && self.above_upper(value) {
            return format!("Value must be {} (was {})", self.upper_text(), shown);
        }
        format!("{} (is {})", self.describe(), shown)
    }

    pub fn describe_delta(
        &self,
        actual: &FloatRangeConstraint,
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

    fn violation_text(&self, actual: &FloatRangeConstraint) -> String {
        if self.extends_below(actual) {
            if !actual.has_lower_bound() {
                let op = if self.from_inclusive { "<" } else { "≤" };
                format!("{} {}", op, format_double(self.from))
            } else if actual.to < self.from
                || (actual.to == self.from && !(actual.to_inclusive && self.from_inclusive))
            {
                actual.point_or_bounds()
            } else {
                Self::new(actual.from, self.from, actual.from_inclusive, !self.from_inclusive)
                    .point_or_bounds()
            }
        } else if self.extends_above(actual) {
            if !actual.has_upper_bound() {
                let op = if self.to_inclusive { ">" } else { "≥" };
                format!("{} {}", op, format_double(self.to))
            } else if actual.from > self.to
                || (actual.from == self.to && !(actual.from_inclusive && self.to_inclusive))
            {
                actual.point_or_bounds()
            } else {
                Self::new(self.to, actual.to, !self.to_inclusive, actual.to_inclusive)
                    .point_or_bounds()
            }
        } else {
            actual.bounds_text()
        }
    }

    fn point_or_bounds(&self) -> String {
        if self.from == self.to && self.from_inclusive && self.to_inclusive {
            format_double(self.from)
        } else {
            self.bounds_text()
        }
    }
}

fn saturating_int(value: f64) -> i64 {
    if value >= i64::MAX as f64 {
        i64::MAX
    } else if value <= i64::MIN as f64 {
        i64::MIN
    } else {
        value as i64
    }
}

impl std::fmt::Display for FloatRangeConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(FloatRangeConstraint::range(1.0, 5.0).describe(), "Value must be ≥ 1.0 and ≤ 5.0");
        assert_eq!(FloatRangeConstraint::at_least(2.5).describe(), "Value must be ≥ 2.5");
        assert_eq!(FloatRangeConstraint::greater_than(2.5).describe(), "Value must be > 2.5");
        assert_eq!(FloatRangeConstraint::less_than(7.0).describe(), "Value must be < 7.0");
        assert_eq!(
            FloatRangeConstraint::new(0.0, 1.0, false, false).describe(),
            "Value must be > 0.0 and < 1.0"
        );
    }

    #[test]
    fn test_describe_value() {
        assert_eq!(
            FloatRangeConstraint::greater_than(2.5).describe_value(2.5, None),
            "Value must be > 2.5 (was 2.5)"
        );
        assert_eq!(
            FloatRangeConstraint::range(10.0, 100.0).describe_value(552.0, Some("552")),
            "Value must be ≤ 100.0 (was 552)"
        );
        assert_eq!(
            FloatRangeConstraint::at_least(2.5).describe_value(2.49, Some("2.49f")),
            "Value must be ≥ 2.5 (was 2.49)"
        );
        assert_eq!(
            FloatRangeConstraint::range(1.0, 5.0).describe_value(3.0, None),
            "Value must be ≥ 1.0 and ≤ 5.0 (is 3.0)"
        );
    }

    #[test]
    fn test_contains_strictness() {
        assert!(!FloatRangeConstraint::greater_than(4.0).contains(&FloatRangeConstraint::at_least(4.0)));
        assert!(FloatRangeConstraint::at_least(4.0).contains(&FloatRangeConstraint::greater_than(4.0)));
        assert!(FloatRangeConstraint::at_least(4.0).contains(&FloatRangeConstraint::at_least(4.0)));
        assert!(!FloatRangeConstraint::less_than(4.0).contains(&FloatRangeConstraint::at_most(4.0)));
        assert!(FloatRangeConstraint::range(1.0, 5.0).contains(&FloatRangeConstraint::range(2.0, 4.0)));
        assert!(!FloatRangeConstraint::range(1.0, 5.0).contains(&FloatRangeConstraint::at_least(2.0)));
        assert!(!FloatRangeConstraint::at_least(1.0).contains(&FloatRangeConstraint::at_most(4.0)));
    }

    #[test]
    fn test_contains_int() {
        let range = FloatRangeConstraint::range(0.0, 1.0);
        assert!(range.contains_int(&IntRangeConstraint::range(0, 1)));
        assert!(!range.contains_int(&IntRangeConstraint::range(0, 2)));
        let open = FloatRangeConstraint::new(0.0, 1.0, false, true);
        assert!(!open.contains_int(&IntRangeConstraint::range(0, 1)));
    }

    #[test]
    fn test_and() {
        let result = FloatRangeConstraint::at_least(2.0).and(&FloatRangeConstraint::at_most(-1.0));
        assert!(!result.is_possible());
        assert_eq!(result.describe(), "Value must be ≥ 2.0 and ≤ -1.0 (not possible)");

        let result = FloatRangeConstraint::at_least(1.0).and(&FloatRangeConstraint::greater_than(1.0));
        assert_eq!(result, FloatRangeConstraint::greater_than(1.0));

        let range = FloatRangeConstraint::new(0.0, 1.0, false, true);
        assert_eq!(range.and(&range), range);
    }

    #[test]
    fn test_remove() {
        let range = FloatRangeConstraint::at_least(-1.0);
        let removed = range.remove(&FloatRangeConstraint::range(-1.0, -1.0));
        assert_eq!(removed, Some(FloatRangeConstraint::greater_than(-1.0)));
        assert_eq!(removed.map(|r| r.describe()).as_deref(), Some("Value must be > -1.0"));
        assert_eq!(range.remove(&FloatRangeConstraint::range(-2.0, -2.0)), None);

        let range = FloatRangeConstraint::range(0.0, 10.0);
        assert_eq!(
            range.remove(&FloatRangeConstraint::at_least(5.0)),
            Some(FloatRangeConstraint::new(0.0, 5.0, true, false))
        );
        assert_eq!(range.remove(&FloatRangeConstraint::range(2.0, 3.0)), None);
        assert_eq!(range.remove(&FloatRangeConstraint::range(-1.0, 11.0)), None);
    }

    #[test]
    fn test_to_int() {
        assert_eq!(
            FloatRangeConstraint::new(1.0, 5.0, true, false).to_int(),
            IntRangeConstraint::range(1, 4)
        );
        assert_eq!(
            FloatRangeConstraint::new(0.5, 4.5, false, true).to_int(),
            IntRangeConstraint::range(1, 4)
        );
        assert_eq!(FloatRangeConstraint::at_least(2.0).to_int(), IntRangeConstraint::at_least(2));
    }

    #[test]
    fn test_to_int_huge_bounds() {
        let converted = FloatRangeConstraint::greater_than(1e20).to_int();
        assert_eq!(converted.from, i64::MAX);
        assert!(!converted.has_upper_bound());

        let converted = FloatRangeConstraint::less_than(-1e20).to_int();
        assert_eq!(converted.to, i64::MIN);
        assert!(!converted.has_lower_bound());

        let nan = FloatRangeConstraint::new(f64::NAN, 5.0, true, true).to_int();
        assert_eq!(nan, IntRangeConstraint::at_most(5));

        let int = crate::constraint::RangeConstraint::Int(IntRangeConstraint::range(0, 10));
        let huge = crate::constraint::RangeConstraint::Float(FloatRangeConstraint::greater_than(1e20));
        assert_eq!(
            int.describe_delta(&huge, "`x`", ""),
            "Value must be ≥ 0 and ≤ 10 but `x` can be > 10"
        );
    }

    #[test]
    fn test_describe_delta() {
        assert_eq!(
            FloatRangeConstraint::range(1.0, 5.0).describe_delta(&FloatRangeConstraint::range(2.0, 6.0), "", ""),
            "Value must be ≥ 1.0 and ≤ 5.0 but can be > 5.0 and ≤ 6.0"
        );
        assert_eq!(
            FloatRangeConstraint::at_least(0.0).describe_delta(&FloatRangeConstraint::at_most(3.0), "`x`", ""),
            "Value must be ≥ 0.0 but `x` can be < 0.0"
        );
        assert_eq!(
            FloatRangeConstraint::greater_than(0.0).describe_delta(&FloatRangeConstraint::at_least(0.0), "`x`", ""),
            "Value must be > 0.0 but `x` can be 0.0"
        );
        assert_eq!(
            FloatRangeConstraint::range(10.0, 20.0).describe_delta(&FloatRangeConstraint::range(30.0, 40.0), "", ""),
            "Value must be ≥ 10.0 and ≤ 20.0 but can be ≥ 30.0 and ≤ 40.0"
        );
    }
}
