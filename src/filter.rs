use serde_json::Value;

use crate::expression::{CompiledQuery, Expr};

/// Does `document` satisfy the query's filter? A query without a filter
/// matches every document.
pub fn matches(query: &CompiledQuery, document: &Value) -> bool {
    let matched = query
        .filter()
        .map_or(true, |expr| eval_filter(expr, document));
    tracing::trace!(query = query.name().unwrap_or("<unnamed>"), matched, "evaluated document");
    matched
}

/// Evaluate one node. Never fails: anything unresolvable is `false`.
pub fn eval_filter(expr: &Expr, document: &Value) -> bool {
    match expr {
        Expr::Comparison { op, path, operand } => {
            let right = operand.resolve(document);
            match (path.resolve(document), right) {
                (Some(left), Some(right)) => op.compare(left, right),
                (None, right) => op.matches_absent(right),
                (Some(_), None) => false,
            }
        }
        Expr::Logical { op, children } => {
            let mut results = children.iter().map(|child| eval_filter(child, document));
            op.combine(&mut results)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::context::Context;
    use crate::operators::Registry;
    use serde_json::json;

    fn query(filter: Value) -> CompiledQuery {
        compile(&Registry::new(), &Context::default(), &json!({ "filter": filter })).unwrap()
    }

    fn cmp(op: &str, path: &str, value: Value) -> Value {
        json!({"op": op, "path": path, "value": {"value": value}})
    }

    #[test]
    fn scenario_equal_nested_string() {
        let q = query(cmp("$eq", "/foo/bar", json!("baz")));
        assert!(matches(&q, &json!({"foo": {"bar": "baz"}})));
        assert!(!matches(&q, &json!({"foo": {"bar": "qux"}})));
    }

    #[test]
    fn scenario_and_of_negations() {
        let q = query(json!({"op": "$and", "value": [
            cmp("$ne", "/foo/bar", json!(123)),
            cmp("$ne", "/foo/baz", json!(456)),
        ]}));
        assert!(!matches(&q, &json!({"foo": {"bar": 123, "baz": 456}})));
        assert!(matches(&q, &json!({"foo": {"bar": 1, "baz": 2}})));
    }

    #[test]
    fn scenario_relational() {
        let doc = json!({"key": 70});
        assert!(matches(&query(cmp("$gt", "/key", json!(69))), &doc));
        assert!(!matches(&query(cmp("$lt", "/key", json!(69))), &doc));
    }

    #[test]
    fn absent_path_is_false_for_every_builtin_comparison() {
        let doc = json!({"foo": {"bar": 1}});
        for op in ["$eq", "$ne", "$lt", "$gt", "$le", "$ge", "$contains", "$ncontains"] {
            assert!(!matches(&query(cmp(op, "/foo/quux", json!(1))), &doc), "{op}");
        }
        for op in ["$in", "$nin"] {
            assert!(!matches(&query(cmp(op, "/foo/quux", json!([1]))), &doc), "{op}");
        }
    }

    #[test]
    fn unresolved_reference_is_false() {
        let q = query(json!({"op": "$ne", "path": "/foo/bar", "value": {"path": "/nope"}}));
        assert!(!matches(&q, &json!({"foo": {"bar": 1}})));
    }

    #[test]
    fn reference_compares_within_same_document() {
        let q = query(json!({"op": "$eq", "path": "/a", "value": {"path": "/b"}}));
        assert!(matches(&q, &json!({"a": 5, "b": 5.0})));
        assert!(!matches(&q, &json!({"a": 5, "b": 6})));
    }

    #[test]
    fn exists_sees_absence() {
        let present = query(cmp("$exists", "/a", json!(true)));
        let missing = query(cmp("$exists", "/a", json!(false)));
        let with_a = json!({"a": null});
        let without_a = json!({"b": 1});
        assert!(matches(&present, &with_a));
        assert!(!matches(&present, &without_a));
        assert!(!matches(&missing, &with_a));
        assert!(matches(&missing, &without_a));
    }

    #[test]
    fn type_mismatch_excludes() {
        let q = query(cmp("$lt", "/key", json!("70")));
        assert!(!matches(&q, &json!({"key": 1})));
    }

    #[test]
    fn nested_logical() {
        let q = query(json!({"op": "$or", "value": [
            {"op": "$and", "value": [cmp("$eq", "/foo/bar", json!(123)), cmp("$eq", "/foo/baz", json!(456))]},
            {"op": "$not", "value": [cmp("$exists", "/foo", json!(true))]},
        ]}));
        assert!(matches(&q, &json!({"foo": {"bar": 123, "baz": 456}})));
        assert!(!matches(&q, &json!({"foo": {"bar": 123, "baz": 0}})));
        assert!(matches(&q, &json!({"other": true})));
    }

    #[test]
    fn no_filter_matches_anything() {
        let q = CompiledQuery::default();
        assert!(matches(&q, &json!(null)));
        assert!(matches(&q, &json!({"a": [1, 2]})));
    }
}
