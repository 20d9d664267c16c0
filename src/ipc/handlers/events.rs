use crate::aggregate::group_by_month;
use crate::ipc::error::tracker_err;
use crate::ipc::handlers::records;
use crate::ipc::helpers::{reply, respond, scope, store, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::model::Event;
use crate::query::{parse_direction, parse_record_filter, EventFilter, SortDirection};
use crate::repo::Repository;
use serde_json::{json, Value as JsonValue};

fn filter_params(req: &Request) -> HandlerResult<(EventFilter, SortDirection)> {
    let filter = parse_record_filter(req.params.get("filters"))
        .map_err(|e| tracker_err(&req.id, &e))?;
    let direction = parse_direction(req.params.get("order"), SortDirection::Ascending)
        .map_err(|e| tracker_err(&req.id, &e))?;
    Ok((filter, direction))
}

fn handle_events_list(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let (filter, direction) = filter_params(req)?;
    Ok(respond(
        req,
        Repository::new(store).list_matching::<Event>(&scope, &filter, direction),
    ))
}

fn handle_events_group_by_month(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let (filter, direction) = filter_params(req)?;
    let events = Repository::new(store).list_matching::<Event>(&scope, &filter, direction);
    Ok(respond(
        req,
        events.map(|events| {
            let groups: Vec<JsonValue> = group_by_month(&events)
                .into_iter()
                .map(|g| {
                    json!({
                        "label": g.label,
                        "year": g.year,
                        "month": g.month,
                        "events": g.records,
                    })
                })
                .collect();
            groups
        }),
    ))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "events.list" => handle_events_list(state, req),
        "events.get" => records::handle_get::<Event>(state, req),
        "events.create" => records::handle_create::<Event>(state, req),
        "events.update" => records::handle_update::<Event>(state, req),
        "events.delete" => records::handle_delete::<Event>(state, req),
        "events.groupByMonth" => handle_events_group_by_month(state, req),
        _ => return None,
    };
    Some(reply(resp))
}
