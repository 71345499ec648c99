use metaroute::{Combinator, Comparator, Engine, Registry, RegistrationError};
use serde_json::{json, Value};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct Substring;
impl Comparator for Substring {
    fn name(&self) -> &str {
        "ext$substring"
    }
    fn compare(&self, left: &Value, right: &Value) -> bool {
        match (left.as_str(), right.as_str()) {
            (Some(l), Some(r)) => l.contains(r),
            _ => false,
        }
    }
}

// Matches documents that lack the path entirely.
struct Missing;
impl Comparator for Missing {
    fn name(&self) -> &str {
        "ext$missing"
    }
    fn compare(&self, _left: &Value, _right: &Value) -> bool {
        false
    }
    fn matches_absent(&self, _right: Option<&Value>) -> bool {
        true
    }
}

// Counts how many child results it pulls before answering.
struct CountingFirst {
    pulled: Arc<AtomicUsize>,
}
impl Combinator for CountingFirst {
    fn name(&self) -> &str {
        "ext$first"
    }
    fn arity(&self) -> RangeInclusive<usize> {
        1..=3
    }
    fn combine(&self, results: &mut dyn Iterator<Item = bool>) -> bool {
        let first = results.next().unwrap_or(false);
        self.pulled.fetch_add(1, Ordering::SeqCst);
        first
    }
}

fn engine_with_extensions(pulled: Arc<AtomicUsize>) -> Engine {
    let mut registry = Registry::new();
    registry.register_comparator(Substring).unwrap();
    registry.register_comparator(Missing).unwrap();
    registry.register_combinator(CountingFirst { pulled }).unwrap();
    Engine::new(registry)
}

#[test]
fn test_extension_comparison() {
    let engine = engine_with_extensions(Arc::default());
    let q = engine
        .compile(&json!({"filter": {"op": "ext$substring", "path": "/foo/quux", "value": {"value": "baz"}}}))
        .unwrap();
    assert!(engine.matches(&q, &json!({"foo": {"quux": "rebaze"}})));
    assert!(!engine.matches(&q, &json!({"foo": {"quux": "nope"}})));
    assert!(!engine.matches(&q, &json!({"foo": {}})));
}

#[test]
fn test_absence_checking_extension() {
    let engine = engine_with_extensions(Arc::default());
    let q = engine
        .compile(&json!({"filter": {"op": "ext$missing", "path": "/token", "value": {"value": null}}}))
        .unwrap();
    assert!(engine.matches(&q, &json!({})));
    assert!(!engine.matches(&q, &json!({"token": "x"})));
}

#[test]
fn test_extension_combinator_controls_evaluation() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let engine = engine_with_extensions(pulled.clone());
    let q = engine
        .compile(&json!({"filter": {"op": "ext$first", "value": [
            {"op": "$eq", "path": "/a", "value": {"value": 1}},
            {"op": "$eq", "path": "/b", "value": {"value": 1}}
        ]}}))
        .unwrap();
    assert!(engine.matches(&q, &json!({"a": 1, "b": 0})));
    assert!(!engine.matches(&q, &json!({"a": 0, "b": 1})));
    assert_eq!(pulled.load(Ordering::SeqCst), 2);
}

// Pulls every child and records the results in the order they arrive.
struct Recording {
    seen: Arc<Mutex<Vec<bool>>>,
}
impl Combinator for Recording {
    fn name(&self) -> &str {
        "ext$record"
    }
    fn combine(&self, results: &mut dyn Iterator<Item = bool>) -> bool {
        let all: Vec<bool> = results.collect();
        if let Ok(mut seen) = self.seen.lock() {
            seen.extend(&all);
        }
        all.first().copied().unwrap_or(false)
    }
}

#[test]
fn test_extension_combinator_sees_children_in_declared_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut registry = Registry::new();
    registry
        .register_combinator(Recording { seen: seen.clone() })
        .unwrap();
    let engine = Engine::new(registry);
    let q = engine
        .compile(&json!({"filter": {"op": "ext$record", "value": [
            {"op": "$eq", "path": "/a", "value": {"value": 1}},
            {"op": "$eq", "path": "/b", "value": {"value": 1}},
            {"op": "$eq", "path": "/c", "value": {"value": 1}},
            {"op": "$eq", "path": "/d", "value": {"value": 1}}
        ]}}))
        .unwrap();
    assert!(engine.matches(&q, &json!({"a": 1, "b": 0, "c": 1, "d": 0})));
    assert!(!engine.matches(&q, &json!({"a": 0, "b": 0, "c": 0, "d": 1})));
    assert_eq!(
        *seen.lock().unwrap(),
        vec![true, false, true, false, false, false, false, true]
    );
}

#[test]
fn test_extension_arity_is_enforced() {
    let engine = engine_with_extensions(Arc::default());
    let leaf = json!({"op": "$eq", "path": "/a", "value": {"value": 1}});
    let err = engine
        .compile(&json!({"filter": {"op": "ext$first", "value": [leaf.clone(), leaf.clone(), leaf.clone(), leaf]}}))
        .unwrap_err();
    assert!(err.to_string().contains("1 to 3"), "{err}");
}

#[test]
fn test_duplicate_registration_is_fatal() {
    let mut registry = Registry::new();
    registry.register_comparator(Substring).unwrap();
    assert_eq!(
        registry.register_comparator(Substring),
        Err(RegistrationError::Duplicate("ext$substring".into()))
    );
}

#[test]
fn test_same_identifier_across_kinds_is_duplicate() {
    struct Clash;
    impl Combinator for Clash {
        fn name(&self) -> &str {
            "ext$substring"
        }
        fn combine(&self, _: &mut dyn Iterator<Item = bool>) -> bool {
            false
        }
    }
    let mut registry = Registry::new();
    registry.register_comparator(Substring).unwrap();
    assert!(matches!(
        registry.register_combinator(Clash),
        Err(RegistrationError::Duplicate(_))
    ));
}

#[test]
fn test_bare_and_malformed_identifiers_are_rejected() {
    struct Named(&'static str);
    impl Comparator for Named {
        fn name(&self) -> &str {
            self.0
        }
        fn compare(&self, _: &Value, _: &Value) -> bool {
            true
        }
    }
    let mut registry = Registry::new();
    for id in ["$eq", "$custom", "noprefix", "a$b$c", "$", "ext$"] {
        assert!(
            matches!(
                registry.register_comparator(Named(id)),
                Err(RegistrationError::InvalidIdentifier { .. })
            ),
            "{id} was accepted"
        );
    }
}
