//! Range search computation (§4.3): collapsing attribute checks into a
//! per-attribute interval, which region lookup then uses for pruning.

use std::collections::HashMap;

use hyperbase_types::{AttributeCheck, Predicate, Value};

/// An attribute's collapsed search range. `None` on either side means
/// unbounded (half-open) on that side.
#[derive(Debug, Clone)]
pub struct Range {
    pub lower: Option<Value>,
    pub upper: Option<Value>,
}

impl Range {
    fn unbounded() -> Self {
        Self { lower: None, upper: None }
    }

    fn from_check(check: &AttributeCheck) -> Option<Self> {
        match check.predicate {
            Predicate::Equals => Some(Self { lower: Some(check.value.clone()), upper: Some(check.value.clone()) }),
            Predicate::LessThan | Predicate::LessEqual => {
                Some(Self { lower: None, upper: Some(check.value.clone()) })
            }
            Predicate::GreaterThan | Predicate::GreaterEqual => {
                Some(Self { lower: Some(check.value.clone()), upper: None })
            }
            _ => None,
        }
    }

    /// Intersects `other` into `self`, taking the maximum lower bound and
    /// minimum upper bound. Returns `false` if the bounds now cross (the
    /// attribute, and therefore the whole search, is unsatisfiable).
    fn intersect(&mut self, other: &Self) -> bool {
        self.lower = max_bound(self.lower.take(), other.lower.clone());
        self.upper = min_bound(self.upper.take(), other.upper.clone());
        match (&self.lower, &self.upper) {
            (Some(lo), Some(hi)) => !matches!(lo.compare(hi), Some(std::cmp::Ordering::Greater)),
            _ => true,
        }
    }
}

fn max_bound(a: Option<Value>, b: Option<Value>) -> Option<Value> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(a), Some(b)) => match a.compare(&b) {
            Some(std::cmp::Ordering::Less) => Some(b),
            _ => Some(a),
        },
    }
}

fn min_bound(a: Option<Value>, b: Option<Value>) -> Option<Value> {
    match (a, b) {
        (None, x) | (x, None) => x,
        (Some(a), Some(b)) => match a.compare(&b) {
            Some(std::cmp::Ordering::Greater) => Some(b),
            _ => Some(a),
        },
    }
}

/// Groups attribute checks by attribute number (dropping document-typed
/// attributes) and intersects the contributed ranges per attribute.
/// Returns `None` if any attribute's range is unsatisfiable — the caller
/// must treat the whole search as pruning to the empty set.
#[must_use]
pub fn compute_ranges(checks: &[AttributeCheck]) -> Option<HashMap<usize, Range>> {
    let mut ranges: HashMap<usize, Range> = HashMap::new();
    for check in checks {
        if check.datatype.is_document() {
            continue;
        }
        let Some(contributed) = Range::from_check(check) else { continue };
        let entry = ranges.entry(check.attr).or_insert_with(Range::unbounded);
        if !entry.intersect(&contributed) {
            return None;
        }
    }
    Some(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyperbase_types::Predicate;

    fn check(attr: usize, value: i64, predicate: Predicate) -> AttributeCheck {
        AttributeCheck::new(attr, Value::Int64(value), predicate)
    }

    #[test]
    fn equals_produces_point_range() {
        let ranges = compute_ranges(&[check(1, 5, Predicate::Equals)]).unwrap();
        let r = &ranges[&1];
        assert_eq!(r.lower, Some(Value::Int64(5)));
        assert_eq!(r.upper, Some(Value::Int64(5)));
    }

    #[test]
    fn crossing_bounds_is_unsatisfiable() {
        let checks = [check(1, 10, Predicate::GreaterThan), check(1, 5, Predicate::LessThan)];
        assert!(compute_ranges(&checks).is_none());
    }

    #[test]
    fn non_overlapping_attrs_are_independent() {
        let checks = [check(1, 5, Predicate::Equals), check(2, 1_000_000_000, Predicate::GreaterThan)];
        let ranges = compute_ranges(&checks).unwrap();
        assert_eq!(ranges.len(), 2);
        assert!(ranges[&2].upper.is_none());
    }

    #[test]
    fn document_typed_check_is_dropped() {
        let mut c = check(1, 5, Predicate::Equals);
        c.datatype = hyperbase_types::DataType::Document;
        let ranges = compute_ranges(std::slice::from_ref(&c)).unwrap();
        assert!(ranges.is_empty());
    }

    use test_case::test_case;

    #[test_case(Predicate::LessThan, None, Some(5); "less_than_is_upper_bounded_only")]
    #[test_case(Predicate::LessEqual, None, Some(5); "less_equal_is_upper_bounded_only")]
    #[test_case(Predicate::GreaterThan, Some(5), None; "greater_than_is_lower_bounded_only")]
    #[test_case(Predicate::GreaterEqual, Some(5), None; "greater_equal_is_lower_bounded_only")]
    fn comparison_predicates_produce_one_sided_ranges(
        predicate: Predicate,
        expect_lower: Option<i64>,
        expect_upper: Option<i64>,
    ) {
        let ranges = compute_ranges(&[check(1, 5, predicate)]).unwrap();
        let r = &ranges[&1];
        assert_eq!(r.lower, expect_lower.map(Value::Int64));
        assert_eq!(r.upper, expect_upper.map(Value::Int64));
    }

    #[test_case(Predicate::Regex; "regex_has_no_range")]
    #[test_case(Predicate::Contains; "contains_has_no_range")]
    #[test_case(Predicate::Fail; "fail_has_no_range")]
    fn non_comparison_predicates_contribute_no_range(predicate: Predicate) {
        let ranges = compute_ranges(&[check(1, 5, predicate)]).unwrap();
        assert!(!ranges.contains_key(&1));
    }
}
