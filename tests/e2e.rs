use json_template_rewrite as jtr;
use pretty_assertions::assert_eq;
use serde_json::{json, Map, Value};

fn vars(v: Value) -> jtr::Context {
    jtr::Context::new(jtr::Vars::try_from(v).unwrap())
}

fn object(v: Value) -> Map<String, Value> {
    match v {
        Value::Object(m) => m,
        _ => panic!("not an object"),
    }
}

#[test]
fn test_template_rendering_in_keys_and_values() {
    let doc = json!({
        "name": "{{app}}-{{env}}",
        "{{env}}_replicas": "{{replicas}}",
        "nested": [{"url": "https://{{app}}.example.com"}]
    });
    let out = jtr::transform(&doc, vars(json!({"app": "shop", "env": "prod", "replicas": 3}))).unwrap();
    assert_eq!(
        out,
        json!({
            "name": "shop-prod",
            "prod_replicas": "3",
            "nested": [{"url": "https://shop.example.com"}]
        })
    );
}

#[test]
fn test_multi_value_expansion() {
    let doc = json!({"[[p]]=a,b,c": {"tag": "{{p}}"}});
    let out = jtr::transform(&doc, jtr::Context::default()).unwrap();
    assert_eq!(
        out,
        json!({"a": {"tag": "a"}, "b": {"tag": "b"}, "c": {"tag": "c"}})
    );
}

#[test]
fn test_multi_value_list_from_a_variable() {
    let doc = json!({"regions": {"[[r]]={{regions}}": {"bucket": "logs-{{r}}"}}});
    let out = jtr::transform(&doc, vars(json!({"regions": "eu,us"}))).unwrap();
    assert_eq!(
        out,
        json!({"regions": {"eu": {"bucket": "logs-eu"}, "us": {"bucket": "logs-us"}}})
    );
}

#[test]
fn test_multi_value_inner_variable_shadows_outer() {
    let doc = json!({"[[p]]=x": {"inner": "{{p}}"}, "outer": "{{p}}"});
    let out = jtr::transform(&doc, vars(json!({"p": "top"}))).unwrap();
    assert_eq!(out, json!({"x": {"inner": "x"}, "outer": "top"}));
}

#[test]
fn test_array_merge_concatenates() {
    let mut target = object(json!({"k": ["a", "b"]}));
    jtr::Engine::standard(jtr::Context::default())
        .merge_into(&mut target, &[json!({"k": ["x"]})], None)
        .unwrap();
    assert_eq!(Value::Object(target), json!({"k": ["a", "b", "x"]}));
}

#[test]
fn test_object_merge_recurses() {
    let out = jtr::merge_documents(
        &[json!({"child": {"a": 1}}), json!({"child": {"b": 2}})],
        jtr::Context::default(),
    )
    .unwrap();
    assert_eq!(out, json!({"child": {"a": 1, "b": 2}}));
}

#[test]
fn test_type_mismatch_clobbers() {
    let out = jtr::merge_documents(
        &[
            json!({"a": {"x": 1}, "b": [1], "c": 1}),
            json!({"a": 5, "b": {"y": 2}, "c": [3]}),
        ],
        jtr::Context::default(),
    )
    .unwrap();
    assert_eq!(out, json!({"a": 5, "b": {"y": 2}, "c": [3]}));
}

#[test]
fn test_empty_source_leaves_target_unchanged() {
    let before = object(json!({"a": 1, "b": {"c": [1, 2]}}));
    let mut target = before.clone();
    jtr::Engine::standard(jtr::Context::default())
        .merge_into(&mut target, &[json!({})], None)
        .unwrap();
    assert_eq!(target, before);
}

#[test]
fn test_merge_sources_are_rendered_under_runtime_vars() {
    let engine = jtr::Engine::standard(vars(json!({"env": "dev"})));
    let runtime = jtr::ContextOverrides::vars(jtr::Vars::try_from(json!({"env": "prod"})).unwrap());
    let out = engine
        .merge_new(&[json!({"env": "{{env}}"}), json!({"tags": ["{{env}}"]})], Some(&runtime))
        .unwrap();
    assert_eq!(out, json!({"env": "prod", "tags": ["prod"]}));
}

#[test]
fn test_everything_together() {
    let mut refs = jtr::TableCatalog::new();
    refs.insert("ref:probe", json!({"probe": {"path": "/healthz", "port": "{{port}}"}}))
        .unwrap();
    let cx = vars(json!({"env": "prod", "port": 8080})).with_refs(std::sync::Arc::new(refs));

    let doc = json!({
        "service": "api",
        "ref:probe": "default",
        "?env=prod": {"replicas": 5},
        "?default": {"replicas": 1},
        "[[zone]]=a,b": {"name": "api-{{zone}}"}
    });
    let out = jtr::transform(&doc, cx).unwrap();
    assert_eq!(
        out,
        json!({
            "service": "api",
            "probe": {"path": "/healthz", "port": "8080"},
            "a": {"name": "api-a"},
            "b": {"name": "api-b"},
            "replicas": 5
        })
    );
}
