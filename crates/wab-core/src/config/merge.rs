use serde_json::{Map, Value};

/// Back-fill every key of `defaults` into `loaded`, recursively.
///
/// Where both sides hold a section the merge recurses; otherwise the loaded value
/// wins. The one exception is a default section shadowed by a loaded non-section:
/// the default section is kept so that every default key stays reachable.
/// Keys only present in `loaded` are preserved after the default keys.
pub fn merge_with_defaults(
    defaults: &Map<String, Value>,
    loaded: &Map<String, Value>,
) -> Map<String, Value> {
    let mut out = Map::new();

    for (key, default) in defaults {
        let merged = match (default, loaded.get(key)) {
            (Value::Object(d), Some(Value::Object(l))) => Value::Object(merge_with_defaults(d, l)),
            (Value::Object(_), Some(other)) => {
                tracing::warn!(key = %key, found = %other, "config section replaced by a scalar; restoring defaults");
                default.clone()
            }
            (_, Some(l)) => l.clone(),
            (d, None) => d.clone(),
        };
        out.insert(key.clone(), merged);
    }

    for (key, value) in loaded {
        if !out.contains_key(key) {
            out.insert(key.clone(), value.clone());
        }
    }

    out
}

/// Merge `overrides` into `base`; overrides win on conflicting leaves.
pub fn deep_merge(base: &mut Map<String, Value>, overrides: &Map<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(key), value) {
            (Some(Value::Object(b)), Value::Object(o)) => deep_merge(b, o),
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    fn assert_keys_superset(defaults: &Map<String, Value>, merged: &Map<String, Value>) {
        for (k, v) in defaults {
            let got = merged.get(k).unwrap_or_else(|| panic!("missing key {k}"));
            if let (Value::Object(d), Value::Object(m)) = (v, got) {
                assert_keys_superset(d, m);
            }
        }
    }

    #[test]
    fn fills_missing_keys_and_keeps_user_values() {
        let defaults = obj(json!({"bot": {"prefix": ".", "name": "wab"}, "features": {"a": false}}));
        let loaded = obj(json!({"bot": {"prefix": "!", "extra": 1}, "custom": true}));

        let merged = merge_with_defaults(&defaults, &loaded);
        assert_eq!(merged["bot"]["prefix"], json!("!"));
        assert_eq!(merged["bot"]["name"], json!("wab"));
        assert_eq!(merged["bot"]["extra"], json!(1));
        assert_eq!(merged["features"]["a"], json!(false));
        assert_eq!(merged["custom"], json!(true));
    }

    #[test]
    fn merge_is_total_over_default_keys() {
        let defaults = super::super::defaults::default_document();
        let inputs = [
            json!({}),
            json!({"bot": {}}),
            json!({"features": 5, "warnings": {"action": "ban"}}),
            json!({"call_guard": {"nested": {"deep": 1}}, "anti_link": []}),
        ];
        for input in inputs {
            let merged = merge_with_defaults(&defaults, &obj(input));
            assert_keys_superset(&defaults, &merged);
        }
    }

    #[test]
    fn loaded_scalar_beats_default_scalar_and_list() {
        let defaults = obj(json!({"disabled_commands": [], "x": 1}));
        let loaded = obj(json!({"disabled_commands": ["ping"], "x": "one"}));
        let merged = merge_with_defaults(&defaults, &loaded);
        assert_eq!(merged["disabled_commands"], json!(["ping"]));
        assert_eq!(merged["x"], json!("one"));
    }

    #[test]
    fn deep_merge_overrides_leaves_and_keeps_siblings() {
        let mut base = obj(json!({"bot": {"prefix": ".", "name": "wab"}, "list": [1]}));
        let overrides = obj(json!({"bot": {"prefix": "#"}, "list": [2, 3], "new": {"k": true}}));
        deep_merge(&mut base, &overrides);
        assert_eq!(
            Value::Object(base),
            json!({"bot": {"prefix": "#", "name": "wab"}, "list": [2, 3], "new": {"k": true}})
        );
    }
}
