use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use serde_json::{json, Map, Value};

/// `{"ok": true}`
pub fn ok(status: StatusCode) -> impl IntoResponse {
    (status, Json(json!({ "ok": true })))
}

/// `{"ok": true, <field>: <value>}`
pub fn ok_with<T: Serialize>(status: StatusCode, field: &str, value: T) -> impl IntoResponse {
    let mut body = Map::new();
    body.insert("ok".to_string(), Value::Bool(true));
    match serde_json::to_value(value) {
        Ok(value) => {
            body.insert(field.to_string(), value);
        }
        Err(err) => tracing::error!(field, error = %err, "failed to serialize response field"),
    }
    (status, Json(Value::Object(body)))
}

/// `{"ok": false, "error": <code>}` plus `warn` when present.
pub fn error(status: StatusCode, code: &str, warn: Option<String>) -> impl IntoResponse {
    let mut body = json!({ "ok": false, "error": code });
    if let Some(warn) = warn {
        body["warn"] = Value::String(warn);
    }
    (status, Json(body))
}
