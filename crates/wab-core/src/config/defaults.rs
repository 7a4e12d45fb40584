use serde_json::{json, Map, Value};

/// Reserved top-level key; always serialized first.
pub const SCHEMA_KEY: &str = "$schema";

/// Schema reference written when a document has none.
pub const DEFAULT_SCHEMA_REF: &str = "./config.schema.json";

/// Built-in default document.
///
/// Every key here is guaranteed to exist in the loaded document after `load()`.
pub fn default_document() -> Map<String, Value> {
    let doc = json!({
        "$schema": DEFAULT_SCHEMA_REF,
        "bot": {
            "name": "wab",
            "prefix": ".",
            "owner_jid": "",
            "login_method": "QR",
            "public_mode": false
        },
        "logging": {
            "level": "info",
            "log_messages": false
        },
        "features": {
            "auto_read": false,
            "auto_typing": false,
            "auto_react": false,
            "anti_call": true,
            "ai_reply": false
        },
        "anti_link": {
            "enabled": false,
            "action": "warn",
            "allow_list": []
        },
        "anti_delete": {
            "enabled": false,
            "notify_owner": true
        },
        "warnings": {
            "max_warnings": 3,
            "action": "kick"
        },
        "call_guard": {
            "action": "block",
            "delay_seconds": 3,
            "message": "Calls are not accepted. Your call has been rejected automatically."
        },
        "rate_limit": {
            "enabled": true,
            "user_cooldown_secs": 3,
            "command_cooldown_secs": 2,
            "burst_limit": 5,
            "burst_window_secs": 10
        },
        "disabled_commands": []
    });

    match doc {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Return `doc` with `$schema` as its first key, inserting the default reference
/// when missing. Relative order of the other keys is kept.
pub fn ensure_schema_first(doc: Map<String, Value>) -> Map<String, Value> {
    if schema_is_first(&doc) {
        return doc;
    }

    let schema = doc
        .get(SCHEMA_KEY)
        .cloned()
        .unwrap_or_else(|| Value::String(DEFAULT_SCHEMA_REF.to_string()));

    let mut out = Map::new();
    out.insert(SCHEMA_KEY.to_string(), schema);
    for (key, value) in doc {
        if key != SCHEMA_KEY {
            out.insert(key, value);
        }
    }
    out
}

pub fn schema_is_first(doc: &Map<String, Value>) -> bool {
    doc.keys().next().map(String::as_str) == Some(SCHEMA_KEY)
}
