use std::cmp::Ordering;

use itertools::Itertools;
use serde_json::Value;

use crate::comparison::sort_order;
use crate::expression::{Direction, OrderKey, Select};

/// Orders and truncates matched entries.
///
/// `document` projects each entry onto its metadata. Without ordering keys the
/// input order is kept; with them the sort is stable, so ties keep their
/// input order too.
pub fn select<T, F>(select: Option<&Select>, matched: Vec<T>, document: F) -> Vec<T>
where
    F: Fn(&T) -> &Value,
{
    let Some(select) = select else {
        return matched;
    };
    let total = matched.len();
    let mut selected: Vec<T> = if select.ordering.is_empty() {
        matched
    } else {
        matched
            .into_iter()
            .sorted_by(|a, b| compare_documents(&select.ordering, document(a), document(b)))
            .collect()
    };
    if let Some(limit) = select.limit {
        selected.truncate(limit);
    }
    tracing::debug!(matched = total, selected = selected.len(), "selected recipients");
    selected
}

/// Multi-key comparison: the first key that differs decides.
pub fn compare_documents(ordering: &[OrderKey], a: &Value, b: &Value) -> Ordering {
    ordering
        .iter()
        .map(|key| compare_key(key, a, b))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

// Absent keys go last whichever way the key is sorted.
fn compare_key(key: &OrderKey, a: &Value, b: &Value) -> Ordering {
    match (key.path.resolve(a), key.path.resolve(b)) {
        (Some(x), Some(y)) => match key.direction {
            Direction::Ascending => sort_order(x, y),
            Direction::Descending => sort_order(x, y).reverse(),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
