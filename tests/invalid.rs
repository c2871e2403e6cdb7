use std::sync::Arc;

use json_template_rewrite as jtr;
use jtr::{Policy, TransformError, ValidationPolicy};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

fn engine(policy: ValidationPolicy, vars: Value) -> jtr::Engine {
    let mut refs = jtr::TableCatalog::new();
    refs.insert("ref:list", json!([1, 2])).unwrap();
    refs.insert("ref:obj", json!({"a": 1})).unwrap();
    let cx = jtr::Context::new(jtr::Vars::try_from(vars).unwrap()).with_refs(Arc::new(refs));
    jtr::Engine::new(jtr::RuleSet::standard(), cx, jtr::EngineOptions::with_policy(policy))
}

fn strict() -> jtr::Engine {
    engine(ValidationPolicy::strict(), json!({"blank": ""}))
}

fn lenient() -> jtr::Engine {
    engine(ValidationPolicy::lenient(), json!({"blank": ""}))
}

#[test]
fn test_malformed_conditional_is_an_error_by_default() {
    let err = strict().clone_value(&json!({"?a=b=c": {"v": 1}}), None).unwrap_err();
    assert!(err.to_string().contains("malformed"), "{err}");
}

#[test]
fn test_malformed_conditional_passes_through_when_ignored() {
    let doc = json!({"?a=b=c": {"v": 1}});
    assert_eq!(lenient().clone_value(&doc, None).unwrap(), doc);
}

#[test]
fn test_malformed_multi_value_key() {
    let doc = json!({"[[p]]a,b": {"v": "{{blank}}"}});
    let err = strict().clone_value(&doc, None).unwrap_err();
    assert!(matches!(err.root(), TransformError::Malformed { kind: "multi-value", .. }));
    assert_eq!(
        lenient().clone_value(&doc, None).unwrap(),
        json!({"[[p]]a,b": {"v": ""}})
    );
}

#[test]
fn test_empty_rendered_key() {
    let doc = json!({"{{blank}}": 1, "kept": 2});
    let err = strict().clone_value(&doc, None).unwrap_err();
    assert!(err.to_string().contains("invalid property name"), "{err}");
    assert_eq!(lenient().clone_value(&doc, None).unwrap(), json!({"kept": 2}));
}

#[test]
fn test_conditional_body_must_be_an_object() {
    let doc = json!({"?x": [1, 2], "kept": true});
    let err = strict().clone_value(&doc, None).unwrap_err();
    assert!(matches!(err.root(), TransformError::InvalidPropertyValue(_)));
    assert_eq!(lenient().clone_value(&doc, None).unwrap(), json!({"kept": true}));
}

#[test]
fn test_reference_spec_must_be_string_or_object() {
    let doc = json!({"ref:obj": 42});
    let err = strict().clone_value(&doc, None).unwrap_err();
    assert!(matches!(err.root(), TransformError::InvalidPropertyValue(_)));
    assert_eq!(lenient().clone_value(&doc, None).unwrap(), json!({}));
}

#[test]
fn test_flattened_reference_must_be_an_object() {
    let err = strict().clone_value(&json!({"ref:list": "default"}), None).unwrap_err();
    assert!(err.to_string().contains("expected an object"), "{err}");
}

#[test]
fn test_undefined_variable() {
    let doc = json!({"a": "{{missing}}", "{{missing}}": 1});
    let err = strict().clone_value(&doc, None).unwrap_err();
    assert_eq!(err.to_string(), "a: undefined variable 'missing'");

    let policy = ValidationPolicy {
        on_undefined_property_value: Policy::Ignore,
        ..ValidationPolicy::strict()
    };
    assert_eq!(
        engine(policy, json!({})).clone_value(&doc, None).unwrap(),
        doc
    );
}

#[test]
fn test_template_syntax_error_is_always_fatal() {
    let err = lenient().clone_value(&json!({"a": ["{{oops"]}), None).unwrap_err();
    assert!(err.to_string().starts_with("a: [0]: template syntax error"), "{err}");
}

#[test]
fn test_target_is_left_partially_merged_on_error() {
    let mut target = serde_json::Map::new();
    let err = strict()
        .merge_into(&mut target, &[json!({"first": 1, "second": "{{missing}}", "third": 3})], None)
        .unwrap_err();
    assert!(err.to_string().contains("missing"));
    assert_eq!(Value::Object(target), json!({"first": 1}));
}
