use crate::aggregate::{average_by_subject, round_2_decimals, weighted_average};
use crate::error::TrackerResult;
use crate::ipc::error::tracker_err;
use crate::ipc::handlers::records;
use crate::ipc::helpers::{reply, respond, scope, store, HandlerResult};
use crate::ipc::types::{AppState, Request};
use crate::locale;
use crate::model::{Grade, Subject, SubjectIndex};
use crate::query::{parse_direction, parse_record_filter, GradeFilter, SortDirection};
use crate::repo::Repository;
use crate::scope::Scope;
use crate::store::DocumentStore;
use serde_json::{json, Value as JsonValue};

fn filter_params(req: &Request) -> HandlerResult<(GradeFilter, SortDirection)> {
    let filter = parse_record_filter(req.params.get("filters"))
        .map_err(|e| tracker_err(&req.id, &e))?;
    let direction = parse_direction(req.params.get("order"), SortDirection::Descending)
        .map_err(|e| tracker_err(&req.id, &e))?;
    Ok((filter, direction))
}

fn handle_grades_list(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let (filter, direction) = filter_params(req)?;
    Ok(respond(
        req,
        Repository::new(store).list_matching::<Grade>(&scope, &filter, direction),
    ))
}

fn grade_average<S: DocumentStore + ?Sized>(
    repo: &Repository<'_, S>,
    scope: &Scope,
    filter: &GradeFilter,
    direction: SortDirection,
) -> TrackerResult<JsonValue> {
    let grades: Vec<Grade> = repo.list_matching(scope, filter, direction)?;
    let subjects: Vec<Subject> = repo.list(scope)?;
    let index = SubjectIndex::new(&subjects);
    let average = weighted_average(&grades);
    let by_subject: Vec<JsonValue> = average_by_subject(&grades)
        .into_iter()
        .map(|a| {
            json!({
                "subjectId": a.subject_id,
                "subjectName": index.name_of(&a.subject_id),
                "average": round_2_decimals(a.average),
                "gradeCount": a.grade_count,
            })
        })
        .collect();
    Ok(json!({
        "average": average,
        "rounded": round_2_decimals(average),
        "display": locale::format_average(average),
        "gradeCount": grades.len(),
        "bySubject": by_subject,
    }))
}

fn handle_grades_average(state: &AppState, req: &Request) -> HandlerResult<JsonValue> {
    let store = store(state, req)?;
    let scope = scope(state, req)?;
    let (filter, direction) = filter_params(req)?;
    let repo = Repository::new(store);
    Ok(respond(req, grade_average(&repo, &scope, &filter, direction)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let resp = match req.method.as_str() {
        "grades.list" => handle_grades_list(state, req),
        "grades.get" => records::handle_get::<Grade>(state, req),
        "grades.create" => records::handle_create::<Grade>(state, req),
        "grades.update" => records::handle_update::<Grade>(state, req),
        "grades.delete" => records::handle_delete::<Grade>(state, req),
        "grades.average" => handle_grades_average(state, req),
        _ => return None,
    };
    Some(reply(resp))
}
