use crate::db;
use crate::error::{TrackerError, TrackerResult};
use crate::ipc::error::{err, ok, tracker_err};
use crate::ipc::helpers::{optional_str, reply, required_str, today, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::profile;
use crate::scope::{SchoolYear, Scope, StaticIdentity};
use chrono::NaiveDate;
use serde_json::{json, Value as JsonValue};
use std::path::{Path, PathBuf};
use tracing::info;

/// Opens (or creates) the workspace database and makes it current.
/// The previous connection, if any, is dropped only on success.
pub fn open_workspace(state: &mut AppState, path: &Path) -> anyhow::Result<()> {
    let store = db::open_db(path)?;
    state.workspace = Some(path.to_path_buf());
    state.db = Some(store);
    info!(workspace = %path.display(), "workspace opened");
    Ok(())
}

/// Installs the session identity. Without an explicit year the profile's
/// current year is used, falling back to the school year containing `today`.
pub fn open_session(
    state: &mut AppState,
    user_id: &str,
    school_year: Option<SchoolYear>,
    today: NaiveDate,
) -> TrackerResult<Scope> {
    let pinned = school_year.is_some();
    let year = match school_year {
        Some(y) => y,
        None => profile_year(state, user_id)?.unwrap_or_else(|| SchoolYear::default_for(today)),
    };
    let scope = Scope::new(user_id, year)?;
    state.session = Some(StaticIdentity {
        user_id: scope.user_id().to_string(),
        school_year: scope.school_year().clone(),
    });
    state.session_pinned = pinned;
    info!(user = scope.user_id(), year = %scope.school_year(), pinned, "session opened");
    Ok(scope)
}

/// Moves an unpinned session of `user_id` to the profile's current year.
pub fn follow_profile_year(state: &mut AppState, user_id: &str, year: &SchoolYear) {
    if state.session_pinned {
        return;
    }
    let Some(session) = state.session.as_mut() else {
        return;
    };
    if session.user_id != user_id || &session.school_year == year {
        return;
    }
    info!(user = user_id, from = %session.school_year, to = %year, "session follows profile year");
    session.school_year = year.clone();
}

fn profile_year(state: &AppState, user_id: &str) -> TrackerResult<Option<SchoolYear>> {
    let Some(store) = state.db.as_ref() else {
        return Ok(None);
    };
    match profile::get_profile(store, user_id) {
        Ok(p) => Ok(Some(p.current_school_year)),
        Err(TrackerError::NotFound { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

fn session_json(state: &AppState) -> JsonValue {
    match state.session.as_ref() {
        Some(s) => json!({ "userId": s.user_id, "schoolYear": s.school_year }),
        None => JsonValue::Null,
    }
}

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "session": session_json(state),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(()) => ok(&req.id, json!({ "workspacePath": path.to_string_lossy() })),
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_session_open(state: &mut AppState, req: &Request) -> HandlerResult<JsonValue> {
    let user_id = required_str(req, "userId")?;
    let year = match optional_str(req, "schoolYear") {
        Some(raw) => Some(SchoolYear::parse(&raw).map_err(|e| tracker_err(&req.id, &e))?),
        None => None,
    };
    let today = today(req)?;
    open_session(state, &user_id, year, today).map_err(|e| tracker_err(&req.id, &e))?;
    Ok(ok(&req.id, session_json(state)))
}

fn handle_session_get(state: &mut AppState, req: &Request) -> HandlerResult<JsonValue> {
    if state.session.is_none() {
        return Err(err(&req.id, "no_session", "open a session first", None));
    }
    Ok(ok(&req.id, session_json(state)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "session.open" => Some(reply(handle_session_open(state, req))),
        "session.get" => Some(reply(handle_session_get(state, req))),
        _ => None,
    }
}
