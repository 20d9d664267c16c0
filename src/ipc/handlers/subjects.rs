use crate::ipc::handlers::records;
use crate::ipc::helpers::reply;
use crate::ipc::types::{AppState, Request};
use crate::model::Subject;

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "subjects.list" => records::handle_list::<Subject>(state, req),
        "subjects.get" => records::handle_get::<Subject>(state, req),
        "subjects.create" => records::handle_create::<Subject>(state, req),
        "subjects.update" => records::handle_update::<Subject>(state, req),
        "subjects.delete" => records::handle_delete::<Subject>(state, req),
        _ => return None,
    };
    Some(reply(resp))
}
