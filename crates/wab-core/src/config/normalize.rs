use serde_json::{Map, Value};

const LOGIN_METHODS: [&str; 2] = ["QR", "PAIR_CODE"];
const ANTI_LINK_ACTIONS: [&str; 3] = ["warn", "delete", "kick"];
const CALL_GUARD_ACTIONS: [&str; 2] = ["off", "block"];

const DEFAULT_CALL_DELAY_SECS: i64 = 3;
const MAX_CALL_DELAY_SECS: i64 = 60;

/// Coerce values that older releases accepted into the currently supported set.
///
/// Idempotent. Returns `true` if any value changed (caller re-saves).
pub fn normalize_legacy_values(doc: &mut Map<String, Value>) -> bool {
    let mut changed = false;
    changed |= coerce(doc, "bot", "login_method", login_method);
    changed |= coerce(doc, "anti_link", "action", anti_link_action);
    changed |= coerce(doc, "warnings", "action", |_| Value::from("kick"));
    changed |= coerce(doc, "call_guard", "action", call_guard_action);
    changed |= coerce(doc, "call_guard", "delay_seconds", call_delay);
    changed
}

fn coerce(
    doc: &mut Map<String, Value>,
    section: &str,
    key: &str,
    f: impl Fn(Option<&Value>) -> Value,
) -> bool {
    let Some(Value::Object(section_map)) = doc.get_mut(section) else {
        return false;
    };

    let next = f(section_map.get(key));
    if section_map.get(key) == Some(&next) {
        return false;
    }

    tracing::info!(
        setting = %format!("{section}.{key}"),
        from = ?section_map.get(key),
        to = %next,
        "normalized legacy config value"
    );
    section_map.insert(key.to_string(), next);
    true
}

fn login_method(v: Option<&Value>) -> Value {
    let upper = v
        .and_then(Value::as_str)
        .map(|s| s.trim().to_uppercase())
        .unwrap_or_default();
    if LOGIN_METHODS.contains(&upper.as_str()) {
        Value::from(upper)
    } else {
        Value::from("QR")
    }
}

fn anti_link_action(v: Option<&Value>) -> Value {
    let lower = lower_str(v);
    match lower.as_str() {
        s if ANTI_LINK_ACTIONS.contains(&s) => Value::from(lower),
        "ban" | "mute" => Value::from("kick"),
        _ => Value::from("warn"),
    }
}

fn call_guard_action(v: Option<&Value>) -> Value {
    let lower = lower_str(v);
    if CALL_GUARD_ACTIONS.contains(&lower.as_str()) {
        Value::from(lower)
    } else {
        Value::from("block")
    }
}

/// Whole seconds in `[0, 60]`; numeric strings count, anything else is 3.
fn call_delay(v: Option<&Value>) -> Value {
    let secs = match v {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    let clamped = match secs {
        Some(s) if s.is_finite() => (s.trunc() as i64).clamp(0, MAX_CALL_DELAY_SECS),
        Some(s) if s == f64::INFINITY => MAX_CALL_DELAY_SECS,
        Some(s) if s == f64::NEG_INFINITY => 0,
        _ => DEFAULT_CALL_DELAY_SECS,
    };
    Value::from(clamped)
}

fn lower_str(v: Option<&Value>) -> String {
    v.and_then(Value::as_str)
        .map(|s| s.trim().to_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn legacy_anti_link_actions_map_to_kick() {
        for legacy in ["ban", "mute", "BAN"] {
            let mut d = doc(json!({"anti_link": {"action": legacy}}));
            assert!(normalize_legacy_values(&mut d));
            assert_eq!(d["anti_link"]["action"], json!("kick"));
        }

        let mut d = doc(json!({"anti_link": {"action": "explode"}}));
        normalize_legacy_values(&mut d);
        assert_eq!(d["anti_link"]["action"], json!("warn"));
    }

    #[test]
    fn call_delay_is_clamped_or_defaulted() {
        let cases = [
            (json!(999), json!(60)),
            (json!(-4), json!(0)),
            (json!("abc"), json!(3)),
            (json!("12"), json!(12)),
            (json!(7.9), json!(7)),
            (json!(null), json!(3)),
        ];
        for (input, expected) in cases {
            let mut d = doc(json!({"call_guard": {"action": "block", "delay_seconds": input}}));
            normalize_legacy_values(&mut d);
            assert_eq!(d["call_guard"]["delay_seconds"], expected);
        }
    }

    #[test]
    fn login_method_is_uppercased_or_reset() {
        let mut d = doc(json!({"bot": {"login_method": "pair_code"}}));
        assert!(normalize_legacy_values(&mut d));
        assert_eq!(d["bot"]["login_method"], json!("PAIR_CODE"));

        let mut d = doc(json!({"bot": {"login_method": "sms"}}));
        normalize_legacy_values(&mut d);
        assert_eq!(d["bot"]["login_method"], json!("QR"));
    }

    #[test]
    fn warnings_action_is_forced_and_call_guard_action_defaults_to_block() {
        let mut d = doc(json!({
            "warnings": {"action": "ban"},
            "call_guard": {"action": "reject", "delay_seconds": 3}
        }));
        normalize_legacy_values(&mut d);
        assert_eq!(d["warnings"]["action"], json!("kick"));
        assert_eq!(d["call_guard"]["action"], json!("block"));
    }

    #[test]
    fn normalization_is_idempotent() {
        let mut d = super::super::defaults::default_document();
        assert!(!normalize_legacy_values(&mut d));

        let mut d = doc(json!({
            "bot": {"login_method": "qr"},
            "anti_link": {"action": "mute"},
            "warnings": {"action": "warn"},
            "call_guard": {"action": "OFF", "delay_seconds": "999"}
        }));
        assert!(normalize_legacy_values(&mut d));
        assert!(!normalize_legacy_values(&mut d));
    }

    #[test]
    fn missing_sections_are_left_alone() {
        let mut d = doc(json!({"bot": "not a section"}));
        assert!(!normalize_legacy_values(&mut d));
        assert_eq!(d["bot"], json!("not a section"));
    }
}
