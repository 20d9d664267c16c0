use crate::error::TrackerResult;
use crate::ipc::handlers::core::follow_profile_year;
use crate::ipc::helpers::{reply, respond, session_user, store, today, typed_param, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::profile::{self, ProfileDraft, ProfilePatch, SettingsPatch, UserProfile};
use serde_json::Value as JsonValue;

fn follow(state: &mut AppState, user: &str, result: &TrackerResult<UserProfile>) {
    if let Ok(p) = result {
        follow_profile_year(state, user, &p.current_school_year);
    }
}

fn handle_profile_create(state: &mut AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let user = session_user(state, req)?;
    let draft: ProfileDraft = typed_param(req, "profile")?;
    let today = today(req)?;
    let result = profile::create_profile(store, &user, draft, today);
    follow(state, &user, &result);
    Ok(respond(req, result))
}

fn handle_profile_get(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let user = session_user(state, req)?;
    Ok(respond(req, profile::get_profile(store, &user)))
}

fn handle_profile_update(state: &mut AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let user = session_user(state, req)?;
    let patch: ProfilePatch = typed_param(req, "patch")?;
    let result = profile::update_profile(store, &user, &patch);
    follow(state, &user, &result);
    Ok(respond(req, result))
}

fn handle_profile_update_settings(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let user = session_user(state, req)?;
    let patch: SettingsPatch = typed_param(req, "settings")?;
    Ok(respond(req, profile::update_settings(store, &user, &patch)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "profile.create" => handle_profile_create(state, req),
        "profile.get" => handle_profile_get(state, req),
        "profile.update" => handle_profile_update(state, req),
        "profile.updateSettings" => handle_profile_update_settings(state, req),
        _ => return None,
    };
    Some(reply(resp))
}
