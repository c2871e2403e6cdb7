use itertools::Itertools;
use serde_json::{Map, Value};
use tracing::trace;

use super::{PropertyOutcome, Rule};
use crate::config::Policy;
use crate::context::Context;
use crate::engine::Engine;
use crate::errors::TransformError;

const OPEN: &str = "[[";
const DELIMITER: &str = "]]=";

/// Expands `"[[name]]=a,b,c": body` into one sibling property per listed
/// value, each holding `body` cloned with `name` bound to that value.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiValueRule;

/// Variable name and listed values of a multi-value key.
fn parse_key(key: &str) -> Option<Result<(&str, Vec<&str>), TransformError>> {
    let rest = key.strip_prefix(OPEN)?;
    let parts: Vec<&str> = rest.split(DELIMITER).collect();
    let parsed = match parts[..] {
        [name, list] if !name.trim().is_empty() => {
            let items = list
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .collect_vec();
            Ok((name.trim(), items))
        }
        _ => Err(TransformError::Malformed {
            kind: "multi-value",
            key: key.to_string(),
        }),
    };
    Some(parsed)
}

impl Rule for MultiValueRule {
    fn name(&self) -> &'static str {
        "multi-value"
    }

    fn edit_property(&self, key: &str, value: &Value, cx: &Context, engine: &Engine) -> PropertyOutcome {
        let (name, items) = match parse_key(key) {
            None => return PropertyOutcome::Inapplicable,
            Some(Ok(parsed)) => parsed,
            Some(Err(e)) => {
                return match engine.policy().on_invalid_property_name {
                    Policy::Error => PropertyOutcome::Error(e),
                    Policy::Ignore => PropertyOutcome::Inapplicable,
                }
            }
        };

        let mut fragment = Map::new();
        for item in items {
            let child = cx.bind(name, Value::String(item.to_string()));
            match engine.clone_in(value, &child) {
                Ok(Some(cloned)) => {
                    fragment.insert(item.to_string(), cloned);
                }
                Ok(None) => trace!(item, "multi-value item ignored"),
                Err(e) => return PropertyOutcome::Error(e.at(item)),
            }
        }
        PropertyOutcome::Success(fragment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_name_and_trimmed_items() {
        let (name, items) = parse_key("[[ p ]]=a, b ,,c").unwrap().unwrap();
        assert_eq!(name, "p");
        assert_eq!(items, vec!["a", "b", "c"]);
    }

    #[test]
    fn non_multi_value_keys_are_skipped() {
        assert!(parse_key("p]]=a").is_none());
        assert!(parse_key("[p]=a").is_none());
    }

    #[test]
    fn missing_or_repeated_delimiter_is_malformed() {
        for key in ["[[p]]", "[[p]]=a]]=b", "[[]]=a", "[[p]=a"] {
            let err = parse_key(key).unwrap().unwrap_err();
            assert!(err.to_string().contains("malformed"), "{key}");
        }
    }
}
