use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schemaless, JSON-compatible configuration blob.
///
/// `DesiredConfig`, `ComputeConfig`, and `ObservedConfig` are all this shape:
/// an unbounded nested mapping the operator (or a provider) hands us and that
/// we never interpret structurally, only hash and forward. Newtype over
/// `serde_json::Value` rather than a bespoke enum — the tagged union
/// (null|bool|number|string|array|object) is exactly what `Value` already is,
/// and round-tripping through `Value` is what every store and provider
/// boundary in this workspace does anyway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ConfigValue(pub Value);

impl ConfigValue {
    pub fn null() -> Self {
        ConfigValue(Value::Null)
    }

    pub fn object(map: BTreeMap<String, ConfigValue>) -> Self {
        let obj = map.into_iter().map(|(k, v)| (k, v.0)).collect();
        ConfigValue(Value::Object(obj))
    }

    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Merge `other` on top of `self`, object keys from `other` winning.
    /// Non-object values are simply replaced. Used to combine DesiredConfig
    /// and ComputeConfig into the single payload a workflow execution is
    /// triggered with.
    pub fn merged(&self, other: &ConfigValue) -> ConfigValue {
        match (&self.0, &other.0) {
            (Value::Object(a), Value::Object(b)) => {
                let mut merged = a.clone();
                for (k, v) in b {
                    merged.insert(k.clone(), v.clone());
                }
                ConfigValue(Value::Object(merged))
            }
            _ => other.clone(),
        }
    }
}

impl From<Value> for ConfigValue {
    fn from(v: Value) -> Self {
        ConfigValue(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_prefers_other_keys() {
        let a = ConfigValue(json!({"image": "nginx:1.24", "env": {"FOO": "bar"}}));
        let b = ConfigValue(json!({"image": "nginx:1.25"}));
        let merged = a.merged(&b);
        assert_eq!(merged.0["image"], json!("nginx:1.25"));
        assert_eq!(merged.0["env"]["FOO"], json!("bar"));
    }

    #[test]
    fn merge_non_object_replaces() {
        let a = ConfigValue(json!("a"));
        let b = ConfigValue(json!("b"));
        assert_eq!(a.merged(&b).0, json!("b"));
    }
}
