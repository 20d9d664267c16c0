use crate::calendar::{calendar_entries, entries_on};
use crate::dashboard::dashboard_summary;
use crate::error::{TrackerError, TrackerResult};
use crate::ipc::error::tracker_err;
use crate::ipc::helpers::{optional_date, reply, respond, scope, store, today, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::profile;
use crate::store::DocumentStore;
use serde_json::Value as JsonValue;

/// Users without a profile yet see the average.
fn show_average<S: DocumentStore + ?Sized>(store: &S, user_id: &str) -> TrackerResult<bool> {
    match profile::get_profile(store, user_id) {
        Ok(p) => Ok(p.settings.show_grade_average),
        Err(TrackerError::NotFound { .. }) => Ok(true),
        Err(e) => Err(e),
    }
}

fn handle_dashboard_summary(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let today = today(req)?;
    let show = show_average(store, scope.user_id()).map_err(|e| tracker_err(&req.id, &e))?;
    Ok(respond(req, dashboard_summary(store, &scope, today, show)))
}

fn handle_calendar_entries(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let day = optional_date(req, "date")?;
    let entries = calendar_entries(store, &scope).map(|all| match day {
        Some(d) => entries_on(&all, d).into_iter().cloned().collect(),
        None => all,
    });
    Ok(respond(req, entries))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "dashboard.summary" => handle_dashboard_summary(state, req),
        "calendar.entries" => handle_calendar_entries(state, req),
        _ => return None,
    };
    Some(reply(resp))
}
