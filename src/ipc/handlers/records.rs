//! Create/read/update/delete shared by the subject, grade and event methods.

use crate::ipc::helpers::{
    required_object, required_str, respond, scope, store, typed_param, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::repo::{Record, Repository};
use serde_json::{json, Value as JsonValue};

pub fn handle_list<T: Record>(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    Ok(respond(req, Repository::new(store).list::<T>(&scope)))
}

pub fn handle_get<T: Record>(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let id = required_str(req, "id")?;
    Ok(respond(req, Repository::new(store).get::<T>(&scope, &id)))
}

pub fn handle_create<T: Record>(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let draft: T::Draft = typed_param(req, "record")?;
    Ok(respond(req, Repository::new(store).create::<T>(&scope, &draft)))
}

pub fn handle_update<T: Record>(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let id = required_str(req, "id")?;
    let patch = required_object(req, "patch")?;
    Ok(respond(req, Repository::new(store).update::<T>(&scope, &id, &patch)))
}

pub fn handle_delete<T: Record>(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let id = required_str(req, "id")?;
    let result = Repository::new(store).delete::<T>(&scope, &id);
    Ok(respond(req, result.map(|()| json!({ "deleted": id }))))
}
