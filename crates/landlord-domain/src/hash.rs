use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config_value::ConfigValue;

/// SHA-256 hex digest of the canonical encoding of `config`.
///
/// Canonical means: object keys sorted, no whitespace, and `null`/`{}`
/// normalized to the same representation, so `ConfigHash({}) ==
/// ConfigHash(null)`.
pub fn compute_config_hash(config: &ConfigValue) -> String {
    let normalized = normalize(config.as_value().clone());
    let canonical = sort_keys(normalized);
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    let digest = Sha256::digest(&bytes);
    format!("{:x}", digest)
}

/// Collapse the empty-object/null distinction the invariant requires.
fn normalize(v: Value) -> Value {
    match &v {
        Value::Object(map) if map.is_empty() => Value::Null,
        _ => v,
    }
}

fn sort_keys(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let sorted: std::collections::BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Hash the combination of DesiredConfig and ComputeConfig exactly as it will
/// be serialized into a workflow input — the `WorkflowConfigHash` stored on
/// the tenant and the value config drift is detected against.
pub fn compute_desired_hash(desired: &ConfigValue, compute: Option<&ConfigValue>) -> String {
    let combined = match compute {
        Some(c) => desired.merged(c),
        None => desired.clone(),
    };
    compute_config_hash(&combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_object_and_null_hash_equal() {
        let empty = ConfigValue(json!({}));
        let null = ConfigValue(json!(null));
        assert_eq!(compute_config_hash(&empty), compute_config_hash(&null));
    }

    #[test]
    fn key_order_does_not_affect_hash() {
        let a = ConfigValue(json!({"image": "nginx", "port": 80}));
        let b = ConfigValue(json!({"port": 80, "image": "nginx"}));
        assert_eq!(compute_config_hash(&a), compute_config_hash(&b));
    }

    #[test]
    fn value_change_changes_hash() {
        let a = ConfigValue(json!({"image": "nginx:1.24"}));
        let b = ConfigValue(json!({"image": "nginx:1.25"}));
        assert_ne!(compute_config_hash(&a), compute_config_hash(&b));
    }

    #[test]
    fn deterministic_across_repeated_calls() {
        let c = ConfigValue(json!({"a": [1, 2, {"b": "c"}], "d": null}));
        assert_eq!(compute_config_hash(&c), compute_config_hash(&c));
    }

    proptest::proptest! {
        #[test]
        fn hash_is_deterministic(s in "[a-z]{1,10}", n in 0i64..1000) {
            let c = ConfigValue(json!({"key": s, "num": n}));
            proptest::prop_assert_eq!(compute_config_hash(&c), compute_config_hash(&c));
        }
    }
}
