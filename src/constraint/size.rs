//! Size constraints (`@Size`) for string lengths and array/collection sizes.

use super::int_range::IntRangeConstraint;
use super::capitalize_label;
use super::join_actual_label;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeConstraint {
    pub min: i64,
    pub max: i64,
    pub multiple: i64,
}

impl Default for SizeConstraint {
    fn default() -> Self {
        Self {
            min: i64::MIN,
            max: i64::MAX,
            multiple: 1,
        }
    }
}

impl SizeConstraint {
    pub fn new(min: i64, max: i64, multiple: i64) -> Self {
        Self { min, max, multiple }
    }

    pub fn exactly(size: i64) -> Self {
        Self::new(size, size, 1)
    }

    pub fn min(min: i64) -> Self {
        Self {
            min,
            ..Self::default()
        }
    }

    pub fn max(max: i64) -> Self {
        Self {
            max,
            ..Self::default()
        }
    }

    pub fn multiple(multiple: i64) -> Self {
        Self {
            multiple,
            ..Self::default()
        }
    }

    pub fn with_multiple(mut self, multiple: i64) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn from_int(range: &IntRangeConstraint) -> Self {
        Self::new(range.from, range.to, 1)
    }

    pub fn to_int(&self) -> IntRangeConstraint {
        IntRangeConstraint::range(self.min, self.max)
    }

    pub fn has_min(&self) -> bool {
        self.min != i64::MIN
    }

    pub fn has_max(&self) -> bool {
        self.max != i64::MAX
    }

    pub fn is_exact(&self) -> bool {
        self.has_min() && self.min == self.max
    }

    pub fn is_infinite(&self) -> bool {
        self.has_min() != self.has_max()
    }

    pub fn is_possible(&self) -> bool {
        self.min <= self.max
    }

    pub fn is_valid(&self, size: i64) -> bool {
        size >= self.min && size <= self.max && (self.multiple <= 1 || size % self.multiple == 0)
    }

    pub fn contains(&self, other: &SizeConstraint) -> bool {
        if other.min < self.min || other.max > self.max {
            return false;
        }
        if self.multiple <= 1 {
            return true;
        }
        if other.is_exact() {
            other.min % self.multiple == 0
        } else {
            other.multiple % self.multiple == 0
        }
    }

    pub fn and(&self, other: &SizeConstraint) -> SizeConstraint {
        Self::new(
            self.min.max(other.min),
            self.max.min(other.max),
            lcm(self.multiple.max(1), other.multiple.max(1)),
        )
    }

    /// Removes a size interval covering exactly one end of this constraint.
    pub fn remove(&self, other: &SizeConstraint) -> Option<SizeConstraint> {
        self.to_int()
            .remove(&other.to_int())
            .map(|range| Self::new(range.from, range.to, self.multiple))
    }

    fn clauses(&self) -> Vec<String> {
        let mut clauses = Vec::new();
        if self.is_exact() {
            clauses.push(format!("exactly {}", self.min));
        } else {
            if self.has_min() {
                clauses.push(format!("at least {}", self.min));
            }
            if self.has_max() {
                clauses.push(format!("at most {}", self.max));
            }
        }
        if self.multiple > 1 {
            clauses.push(format!("a multiple of {}", self.multiple));
        }
        clauses
    }

    fn clause_text(&self) -> String {
        let clauses = self.clauses();
        if clauses.is_empty() {
            "any size".to_string()
        } else {
            clauses.join(" and ")
        }
    }

    pub fn describe(&self) -> String {
        let mut sb = format!("Size must be {}", self.clause_text());
        if !self.is_possible() {
            sb.push_str(" (not possible)");
        }
        sb
    }

    /// Explains why `actual` does not satisfy this constraint. `unit` is
    /// `length` for strings and `size` for arrays and collections.
    pub fn describe_value(&self, unit: &str, actual: i64) -> String {
        if self.is_exact() && actual != self.min {
            return format!("Expected {} {} (was {})", unit, self.min, actual);
        }
        if actual < self.min {
            return format!("Expected {} ≥ {} (was {})", unit, self.min, actual);
        }
        if actual > self.max {
            return format!("Expected {} ≤ {} (was {})", unit, self.max, actual);
        }
        if self.multiple > 1 && actual % self.multiple != 0 {
            let below = (actual / self.multiple) * self.multiple;
            let above = below + self.multiple;
            return format!(
                "Expected {} to be a multiple of {} (was {} and should be either {} or {})",
                unit, self.multiple, actual, below, above
            );
        }
        format!("Expected {} {} (is {})", unit, self.clause_text(), actual)
    }

    pub fn describe_delta(
        &self,
        actual: &SizeConstraint,
        actual_label: &str,
        allowed_label: &str,
    ) -> String {
        let subject = if allowed_label.trim().is_empty() {
            "Size".to_string()
        } else {
            format!("{} size", capitalize_label(allowed_label, ""))
        };
        format!(
            "{} must be {} but {}can be {}",
            subject,
            self.clause_text(),
            join_actual_label(actual_label),
            actual.clause_text()
        )
    }
}

fn gcd(a: i64, b: i64) -> i64 {
    if b == 0 {
        a.abs()
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: i64, b: i64) -> i64 {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b)).saturating_mul(b).abs()
}

impl std::fmt::Display for SizeConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(SizeConstraint::exactly(5).describe(), "Size must be exactly 5");
        assert_eq!(SizeConstraint::min(3).describe(), "Size must be at least 3");
        assert_eq!(SizeConstraint::max(10).describe(), "Size must be at most 10");
        assert_eq!(
            SizeConstraint::min(3).with_multiple(2).describe(),
            "Size must be at least 3 and a multiple of 2"
        );
    }

    #[test]
    fn test_describe_value() {
        assert_eq!(SizeConstraint::exactly(5).describe_value("length", 4), "Expected length 5 (was 4)");
        assert_eq!(SizeConstraint::min(5).describe_value("size", 4), "Expected size ≥ 5 (was 4)");
        assert_eq!(SizeConstraint::max(8).describe_value("size", 9), "Expected size ≤ 8 (was 9)");
        assert_eq!(
            SizeConstraint::multiple(3).describe_value("size", 4),
            "Expected size to be a multiple of 3 (was 4 and should be either 3 or 6)"
        );
    }

    #[test]
    fn test_is_valid() {
        let size = SizeConstraint::new(2, 10, 2);
        assert!(size.is_valid(4));
        assert!(!size.is_valid(5));
        assert!(!size.is_valid(12));
        assert!(!size.is_valid(0));
    }

    #[test]
    fn test_contains() {
        assert!(SizeConstraint::min(3).contains(&SizeConstraint::min(4)));
        assert!(!SizeConstraint::min(3).contains(&SizeConstraint::min(2)));
        assert!(SizeConstraint::multiple(2).contains(&SizeConstraint::multiple(4)));
        assert!(!SizeConstraint::multiple(2).contains(&SizeConstraint::multiple(3)));
        assert!(SizeConstraint::multiple(3).contains(&SizeConstraint::exactly(6)));
        assert!(!SizeConstraint::multiple(3).contains(&SizeConstraint::exactly(4)));
        assert!(!SizeConstraint::exactly(5).contains(&SizeConstraint::min(5)));
    }

    #[test]
    fn test_and() {
        let result = SizeConstraint::min(3).with_multiple(2).and(&SizeConstraint::max(10).with_multiple(3));
        assert_eq!(result, SizeConstraint::new(3, 10, 6));
        let size = SizeConstraint::new(1, 4, 2);
        assert_eq!(size.and(&size), size);
    }

    #[test]
    fn test_remove() {
        let size = SizeConstraint::new(0, 10, 1);
        assert_eq!(
            size.remove(&SizeConstraint::new(0, 0, 1)),
            Some(SizeConstraint::new(1, 10, 1))
        );
        assert_eq!(size.remove(&SizeConstraint::new(3, 4, 1)), None);
    }

    #[test]
    fn test_describe_delta() {
        let allowed = SizeConstraint::min(3).with_multiple(2);
        assert_eq!(
            allowed.describe_delta(&SizeConstraint::multiple(3), "`x`", ""),
            "Size must be at least 3 and a multiple of 2 but `x` can be a multiple of 3"
        );
        assert_eq!(
            SizeConstraint::max(10).describe_delta(&SizeConstraint::max(12), "", "the parameter "),
            "The parameter size must be at most 10 but can be at most 12"
        );
    }
}
