use crate::db::SqliteStore;
use crate::error::TrackerResult;
use crate::ipc::error::{err, ok, tracker_err};
use crate::ipc::types::{AppState, Request};
use crate::scope::{SchoolYear, Scope};
use chrono::{Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

pub type HandlerResult<T> = Result<T, JsonValue>;

pub fn store<'a>(state: &'a AppState, req: &Request) -> HandlerResult<&'a SqliteStore> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn session_user(state: &AppState, req: &Request) -> HandlerResult<String> {
    state
        .session
        .as_ref()
        .map(|s| s.user_id.clone())
        .ok_or_else(|| err(&req.id, "no_session", "open a session first", None))
}

/// Session scope, optionally pointed at another year via `params.schoolYear`.
pub fn scope(state: &AppState, req: &Request) -> HandlerResult<Scope> {
    let Some(identity) = state.session.as_ref() else {
        return Err(err(&req.id, "no_session", "open a session first", None));
    };
    let scope = Scope::resolve(identity).map_err(|e| tracker_err(&req.id, &e))?;
    match optional_str(req, "schoolYear") {
        Some(raw) => {
            let year = SchoolYear::parse(&raw).map_err(|e| tracker_err(&req.id, &e))?;
            Ok(scope.with_year(year))
        }
        None => Ok(scope),
    }
}

pub fn required_str(req: &Request, key: &str) -> HandlerResult<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn required_object(req: &Request, key: &str) -> HandlerResult<Map<String, JsonValue>> {
    match req.params.get(key) {
        Some(JsonValue::Object(map)) => Ok(map.clone()),
        Some(_) => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an object", key),
            None,
        )),
        None => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

/// Deserializes `params[key]` into a typed draft or patch.
pub fn typed_param<T: DeserializeOwned>(req: &Request, key: &str) -> HandlerResult<T> {
    let raw = required_object(req, key)?;
    serde_json::from_value(JsonValue::Object(raw)).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid {}: {}", key, e),
            Some(serde_json::json!({ "field": key })),
        )
    })
}

pub fn period_param(req: &Request) -> HandlerResult<u8> {
    req.params
        .get("period")
        .and_then(|v| v.as_u64())
        .and_then(|n| u8::try_from(n).ok())
        .ok_or_else(|| err(&req.id, "bad_params", "missing or invalid period", None))
}

fn parse_date(req: &Request, key: &str, raw: &str) -> HandlerResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        err(
            &req.id,
            "bad_params",
            format!("{} must be YYYY-MM-DD", key),
            Some(serde_json::json!({ "field": key })),
        )
    })
}

pub fn optional_date(req: &Request, key: &str) -> HandlerResult<Option<NaiveDate>> {
    match optional_str(req, key) {
        Some(raw) => parse_date(req, key, &raw).map(Some),
        None => Ok(None),
    }
}

/// `params.today` when given, else the local calendar date.
pub fn today(req: &Request) -> HandlerResult<NaiveDate> {
    Ok(optional_date(req, "today")?.unwrap_or_else(|| Local::now().date_naive()))
}

pub fn to_json<T: Serialize>(req: &Request, value: &T) -> HandlerResult<JsonValue> {
    serde_json::to_value(value)
        .map_err(|e| err(&req.id, "store_failed", format!("encode result: {}", e), None))
}

/// Maps a core call's outcome to a response.
pub fn respond<T: Serialize>(req: &Request, result: TrackerResult<T>) -> JsonValue {
    match result {
        Ok(v) => match to_json(req, &v) {
            Ok(json) => ok(&req.id, json),
            Err(resp) => resp,
        },
        Err(e) => tracker_err(&req.id, &e),
    }
}

/// Both arms already hold a complete response.
pub fn reply(result: HandlerResult<JsonValue>) -> JsonValue {
    match result {
        Ok(v) | Err(v) => v,
    }
}
