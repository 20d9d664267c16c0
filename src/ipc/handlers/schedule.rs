use crate::ipc::error::tracker_err;
use crate::ipc::helpers::{
    period_param, reply, required_str, respond, scope, store, typed_param, HandlerResult,
};
use crate::ipc::types::{AppState, Request};
use crate::schedule::{self, DaySchedule, SlotFields, Weekday};
use serde_json::{json, Value as JsonValue};

fn day_param(req: &Request) -> HandlerResult<Weekday> {
    let raw = required_str(req, "day")?;
    Weekday::parse(&raw).map_err(|e| tracker_err(&req.id, &e))
}

fn handle_schedule_week(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    Ok(respond(req, schedule::week(store, &scope)))
}

fn handle_schedule_day(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let day = day_param(req)?;
    let slots = schedule::day_slots(store, &scope, day).map(|slots| DaySchedule {
        day,
        label: day.label(),
        slots,
    });
    Ok(respond(req, slots))
}

fn handle_schedule_set_slot(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let day = day_param(req)?;
    let period = period_param(req)?;
    let fields: SlotFields = typed_param(req, "slot")?;
    Ok(respond(req, schedule::set_slot(store, &scope, day, period, fields)))
}

fn handle_schedule_remove_slot(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let day = day_param(req)?;
    let period = period_param(req)?;
    let removed = schedule::remove_slot(store, &scope, day, period);
    Ok(respond(req, removed.map(|removed| json!({ "removed": removed }))))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "schedule.week" => handle_schedule_week(state, req),
        "schedule.day" => handle_schedule_day(state, req),
        "schedule.setSlot" => handle_schedule_set_slot(state, req),
        "schedule.removeSlot" => handle_schedule_remove_slot(state, req),
        _ => return None,
    };
    Some(reply(resp))
}
