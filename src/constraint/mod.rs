//! Range constraint algebra
//!
//! Immutable interval values describing what an annotated parameter,
//! field or return value may hold, together with containment,
//! intersection, subtraction and the human readable descriptions used in
//! lint messages.

mod float_range;
mod format;
mod int_range;
mod size;

pub use float_range::FloatRangeConstraint;
pub use format::{format_double, strip_float_suffix};
pub use int_range::IntRangeConstraint;
pub use size::SizeConstraint;

/// A constraint of any kind.
///
/// Operations on two different kinds convert the argument into the kind of
/// the receiver first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeConstraint {
    Int(IntRangeConstraint),
    Float(FloatRangeConstraint),
    Size(SizeConstraint),
}

impl RangeConstraint {
    pub fn kind(&self) -> &'static str {
        match self {
            RangeConstraint::Int(_) => "int",
            RangeConstraint::Float(_) => "float",
            RangeConstraint::Size(_) => "size",
        }
    }

    pub fn as_int(&self) -> IntRangeConstraint {
        match self {
            RangeConstraint::Int(r) => *r,
            RangeConstraint::Float(r) => r.to_int(),
            RangeConstraint::Size(s) => s.to_int(),
        }
    }

    pub fn as_float(&self) -> FloatRangeConstraint {
        match self {
            RangeConstraint::Int(r) => r.to_float(),
            RangeConstraint::Float(r) => *r,
            RangeConstraint::Size(s) => s.to_int().to_float(),
        }
    }

    pub fn as_size(&self) -> SizeConstraint {
        match self {
            RangeConstraint::Int(r) => SizeConstraint::from_int(r),
            RangeConstraint::Float(r) => SizeConstraint::from_int(&r.to_int()),
            RangeConstraint::Size(s) => *s,
        }
    }

    /// Whether every value allowed by `other` is allowed by `self`.
    ///
    /// Returns `None` when `other` cannot be expressed in the kind of
    /// `self`, which only happens for a floating range without any integer
    /// value compared against a size constraint.
    pub fn contains(&self, other: &RangeConstraint) -> Option<bool> {
        match (self, other) {
            (RangeConstraint::Int(a), RangeConstraint::Int(b)) => Some(a.contains(b)),
            (RangeConstraint::Int(a), RangeConstraint::Float(b)) => Some(a.contains_float(b)),
            (RangeConstraint::Int(a), RangeConstraint::Size(b)) => Some(a.contains(&b.to_int())),
            (RangeConstraint::Float(a), RangeConstraint::Int(b)) => Some(a.contains_int(b)),
            (RangeConstraint::Float(a), RangeConstraint::Float(b)) => Some(a.contains(b)),
            (RangeConstraint::Float(a), RangeConstraint::Size(b)) => {
                Some(a.contains_int(&b.to_int()))
            }
            (RangeConstraint::Size(a), RangeConstraint::Size(b)) => Some(a.contains(b)),
            (RangeConstraint::Size(a), RangeConstraint::Int(b)) => {
                Some(a.contains(&SizeConstraint::from_int(b)))
            }
            (RangeConstraint::Size(a), RangeConstraint::Float(b)) => {
                let converted = b.to_int();
                if !converted.is_possible() {
                    return None;
                }
                Some(a.contains(&SizeConstraint::from_int(&converted)))
            }
        }
    }

    pub fn and(&self, other: &RangeConstraint) -> RangeConstraint {
        match self {
            RangeConstraint::Int(a) => RangeConstraint::Int(a.and(&other.as_int())),
            RangeConstraint::Float(a) => RangeConstraint::Float(a.and(&other.as_float())),
            RangeConstraint::Size(a) => RangeConstraint::Size(a.and(&other.as_size())),
        }
    }

    /// Removes `other` from one end of `self`; `None` if nothing sensible
    /// remains (fully covered, disjoint or a hole in the middle).
    pub fn remove(&self, other: &RangeConstraint) -> Option<RangeConstraint> {
        match self {
            RangeConstraint::Int(a) => a.remove(&other.as_int()).map(RangeConstraint::Int),
            RangeConstraint::Float(a) => a.remove(&other.as_float()).map(RangeConstraint::Float),
            RangeConstraint::Size(a) => a.remove(&other.as_size()).map(RangeConstraint::Size),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            RangeConstraint::Int(r) => r.describe(),
            RangeConstraint::Float(r) => r.describe(),
            RangeConstraint::Size(s) => s.describe(),
        }
    }

    /// Explains which values of `actual` fall outside `self`.
    pub fn describe_delta(
        &self,
        actual: &RangeConstraint,
        actual_label: &str,
        allowed_label: &str,
    ) -> String {
        match (self, actual) {
            (RangeConstraint::Int(a), _) => {
                a.describe_delta(&actual.as_int(), actual_label, allowed_label)
            }
            (RangeConstraint::Float(a), _) => {
                a.describe_delta(&actual.as_float(), actual_label, allowed_label)
            }
            (RangeConstraint::Size(a), _) => {
                a.describe_delta(&actual.as_size(), actual_label, allowed_label)
            }
        }
    }

    /// True iff exactly one bound is present.
    pub fn is_infinite(&self) -> bool {
        match self {
            RangeConstraint::Int(r) => r.is_infinite(),
            RangeConstraint::Float(r) => r.is_infinite(),
            RangeConstraint::Size(s) => s.is_infinite(),
        }
    }

    pub fn is_possible(&self) -> bool {
        match self {
            RangeConstraint::Int(r) => r.is_possible(),
            RangeConstraint::Float(r) => r.is_possible(),
            RangeConstraint::Size(s) => s.is_possible(),
        }
    }
}

impl From<IntRangeConstraint> for RangeConstraint {
    fn from(range: IntRangeConstraint) -> Self {
        RangeConstraint::Int(range)
    }
}

impl From<FloatRangeConstraint> for RangeConstraint {
    fn from(range: FloatRangeConstraint) -> Self {
        RangeConstraint::Float(range)
    }
}

impl From<SizeConstraint> for RangeConstraint {
    fn from(size: SizeConstraint) -> Self {
        RangeConstraint::Size(size)
    }
}

impl std::fmt::Display for RangeConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// `"the parameter "` -> `"The parameter"`; empty labels use `default`.
pub(crate) fn capitalize_label(label: &str, default: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        return default.to_string();
    }
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => default.to_string(),
    }
}

/// Actual label followed by a single space, or nothing.
pub(crate) fn join_actual_label(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        String::new()
    } else {
        format!("{} ", label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_contains() {
        let int = RangeConstraint::from(IntRangeConstraint::range(1, 5));
        let float = RangeConstraint::from(FloatRangeConstraint::range(2.0, 4.0));
        assert_eq!(int.contains(&float), Some(true));
        assert_eq!(float.contains(&int), Some(false));

        let size = RangeConstraint::from(SizeConstraint::min(1));
        let empty = RangeConstraint::from(FloatRangeConstraint::new(0.2, 0.8, true, true));
        assert_eq!(size.contains(&empty), None);
        assert_eq!(
            size.contains(&RangeConstraint::from(IntRangeConstraint::range(2, 3))),
            Some(true)
        );
    }

    #[test]
    fn test_mixed_remove() {
        let float = RangeConstraint::from(FloatRangeConstraint::at_least(-1.0));
        let removed = float.remove(&RangeConstraint::from(IntRangeConstraint::range(-1, -1)));
        assert_eq!(
            removed,
            Some(RangeConstraint::from(FloatRangeConstraint::greater_than(-1.0)))
        );
        assert_eq!(
            float.remove(&RangeConstraint::from(IntRangeConstraint::range(-2, -2))),
            None
        );
    }

    #[test]
    fn test_mixed_and() {
        let int = RangeConstraint::from(IntRangeConstraint::range(0, 10));
        let float = RangeConstraint::from(FloatRangeConstraint::new(2.5, 7.0, true, false));
        assert_eq!(
            int.and(&float),
            RangeConstraint::from(IntRangeConstraint::range(3, 6))
        );
    }

    #[test]
    fn test_describe_delta_dispatch() {
        let allowed = RangeConstraint::from(FloatRangeConstraint::range(1.0, 5.0));
        let actual = RangeConstraint::from(IntRangeConstraint::range(2, 6));
        assert_eq!(
            allowed.describe_delta(&actual, "", ""),
            "Value must be ≥ 1.0 and ≤ 5.0 but can be > 5.0 and ≤ 6.0"
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(capitalize_label("the parameter ", "Value"), "The parameter");
        assert_eq!(capitalize_label("", "Value"), "Value");
        assert_eq!(join_actual_label("`foo`"), "`foo` ");
        assert_eq!(join_actual_label("  "), "");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_int_range_containment(a in -100i64..100, b in -100i64..100, c in -100i64..100, d in -100i64..100) {
            let outer = IntRangeConstraint::range(a, b);
            let inner = IntRangeConstraint::range(c, d);
            prop_assert_eq!(outer.contains(&inner), a <= c && d <= b);
        }

        #[test]
        fn prop_at_least_containment(n in -1000i64..1000, m in -1000i64..1000) {
            prop_assert_eq!(IntRangeConstraint::at_least(n).contains(&IntRangeConstraint::at_least(m)), m >= n);
            prop_assert_eq!(IntRangeConstraint::at_most(n).contains(&IntRangeConstraint::at_most(m)), m <= n);
        }

        #[test]
        fn prop_bounded_never_contains_one_sided(a in -100i64..100, len in 0i64..100, x in -200i64..200) {
            let bounded = IntRangeConstraint::range(a, a + len);
            prop_assert!(!bounded.contains(&IntRangeConstraint::at_least(x)));
            prop_assert!(!bounded.contains(&IntRangeConstraint::at_most(x)));
        }

        #[test]
        fn prop_and_is_idempotent(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6, fi: bool, ti: bool) {
            let range = FloatRangeConstraint::new(a, b, fi, ti);
            prop_assert_eq!(range.and(&range), range);
        }

        #[test]
        fn prop_and_is_contained_in_both(a in -50i64..50, b in -50i64..50, c in -50i64..50, d in -50i64..50) {
            let left = IntRangeConstraint::range(a.min(b), a.max(b));
            let right = IntRangeConstraint::range(c.min(d), c.max(d));
            let both = left.and(&right);
            if both.is_possible() {
                prop_assert!(left.contains(&both));
                prop_assert!(right.contains(&both));
            }
        }

        #[test]
        fn prop_remove_leaves_disjoint_rest(a in -50i64..50, len in 1i64..50, cut in 0i64..50) {
            let range = IntRangeConstraint::range(a, a + len);
            let head = IntRangeConstraint::range(a - 10, a + cut.min(len - 1));
            if let Some(rest) = range.remove(&head) {
                prop_assert!(range.contains(&rest));
                prop_assert!(rest.from > head.to);
            }
        }

        #[test]
        fn prop_describe_value_mentions_value(a in -100i64..100, len in 0i64..100, v in -300i64..300) {
            let range = IntRangeConstraint::range(a, a + len);
            let text = range.describe_value(v);
            if range.is_valid(v) {
                let expected = format!("(is {})", v);
                prop_assert!(text.ends_with(&expected));
            } else {
                let expected = format!("(was {})", v);
                prop_assert!(text.ends_with(&expected));
            }
        }
    }
}
