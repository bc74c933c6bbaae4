//! Combining per-leg replies into one aggregate result (§4.2 "Aggregation").

use hyperbase_types::{Funcall, FuncallName, Value};
use hyperbase_wire::SearchItemFrame;

/// Combines two partial `SUM` results the way the server-side `NUM_ADD`
/// funcall combines a stored value with an argument: `None` behaves as the
/// additive identity, and incompatible types fail the combine (§4.2 "sum:
/// sum, filtered by attribute position and datatype").
#[must_use]
pub fn combine_sums(acc: Option<Value>, next: Option<Value>) -> Option<Value> {
    match (acc, next) {
        (None, other) | (other, None) => other,
        (Some(a), Some(b)) => numeric_add(&a, &b),
    }
}

fn numeric_add(a: &Value, b: &Value) -> Option<Value> {
    let f = Funcall {
        attr: 0,
        name: FuncallName::NumAdd,
        arg1: Some(b.clone()),
        arg1_type: Some(b.datatype()),
        arg2: None,
        arg2_type: None,
    };
    f.apply(Some(a))
}

/// Merges per-leg sorted-search slices into one list, ordered by
/// `sort_attr` as `maximize` dictates, truncated back to `limit` (§4.2
/// "sorted_search: the heap is sized to exactly `limit`... final output is
/// sorted opposite to the heap").
///
/// Each leg has already applied its own top-`limit` cut server-side; the
/// client only needs to merge and re-truncate, not maintain a live heap,
/// since legs arrive as complete slices rather than one item at a time.
#[must_use]
pub fn merge_sorted_search(
    mut items: Vec<SearchItemFrame>,
    limit: u64,
    sort_attr: usize,
    maximize: bool,
) -> Vec<SearchItemFrame> {
    items.sort_by(|a, b| {
        let ord = compare_at(a, b, sort_attr);
        if maximize { ord.reverse() } else { ord }
    });
    items.truncate(limit as usize);
    items
}

fn compare_at(a: &SearchItemFrame, b: &SearchItemFrame, sort_attr: usize) -> std::cmp::Ordering {
    let (Some(av), Some(bv)) = (a.attrs.get(sort_attr), b.attrs.get(sort_attr)) else {
        return std::cmp::Ordering::Equal;
    };
    av.compare(bv).unwrap_or(std::cmp::Ordering::Equal)
}

/// Concatenates per-server descriptions in a deterministic order (§4.2
/// "search_describe: concatenate... in a deterministic order (by virtual
/// server id)"). Callers collect `(virtual_server_id, description)` pairs
/// as replies arrive and sort by the id before calling this.
#[must_use]
pub fn describe_in_order(mut legs: Vec<(u64, String)>) -> String {
    legs.sort_by_key(|(virt, _)| *virt);
    legs.into_iter().map(|(_, text)| text).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_sums_adds_integers() {
        assert_eq!(combine_sums(Some(Value::Int64(2)), Some(Value::Int64(3))), Some(Value::Int64(5)));
    }

    #[test]
    fn combine_sums_treats_none_as_identity() {
        assert_eq!(combine_sums(None, Some(Value::Int64(3))), Some(Value::Int64(3)));
        assert_eq!(combine_sums(Some(Value::Int64(3)), None), Some(Value::Int64(3)));
    }

    #[test]
    fn merge_sorted_search_truncates_to_limit_descending() {
        let items = vec![
            SearchItemFrame { key: Value::Int64(1), attrs: vec![Value::Int64(10)] },
            SearchItemFrame { key: Value::Int64(2), attrs: vec![Value::Int64(30)] },
            SearchItemFrame { key: Value::Int64(3), attrs: vec![Value::Int64(20)] },
        ];
        let merged = merge_sorted_search(items, 2, 0, true);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].key, Value::Int64(2));
        assert_eq!(merged[1].key, Value::Int64(3));
    }

    #[test]
    fn describe_in_order_sorts_by_virtual_server_id() {
        let legs = vec![(5, "b".to_string()), (1, "a".to_string())];
        assert_eq!(describe_in_order(legs), "a\nb");
    }
}
