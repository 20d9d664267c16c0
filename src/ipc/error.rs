use crate::error::TrackerError;
use serde_json::json;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

pub fn tracker_err(id: &str, e: &TrackerError) -> serde_json::Value {
    if let TrackerError::Store(inner) = e {
        tracing::warn!(request = id, error = %inner, "store call failed");
    }
    err(id, e.code(), e.to_string(), e.details())
}
