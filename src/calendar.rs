use crate::error::TrackerResult;
use crate::locale;
use crate::model::{Event, Grade, Subject, SubjectIndex};
use crate::repo::Repository;
use crate::scope::Scope;
use crate::store::DocumentStore;
use chrono::NaiveDate;
use serde::Serialize;

pub const GRADE_ENTRY_KIND: &str = "grade";

/// One marker on the calendar: either an event or a grade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    /// Event type, or `"grade"`.
    pub kind: &'static str,
    /// Display name of `kind`; grades show their grade kind.
    pub kind_label: &'static str,
    pub date_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CalendarEntry {
    fn from_event(e: Event) -> Self {
        Self {
            id: e.id,
            title: e.title,
            date: e.date,
            kind: e.event_type.as_str(),
            kind_label: e.event_type.label(),
            date_label: locale::format_date(e.date),
            subject_id: e.subject_id,
            value: None,
            description: e.description,
        }
    }

    fn from_grade(g: Grade, index: &SubjectIndex) -> Self {
        Self {
            title: format!("Voto {} - {}", g.value, index.name_of(&g.subject_id)),
            id: g.id,
            date: g.date,
            kind: GRADE_ENTRY_KIND,
            kind_label: g.kind.label(),
            date_label: locale::format_date(g.date),
            subject_id: Some(g.subject_id),
            value: Some(g.value),
            description: g.description,
        }
    }

    pub fn is_grade(&self) -> bool {
        self.kind == GRADE_ENTRY_KIND
    }
}

/// Events and grades of the scope in one list, ascending by date.
pub fn calendar_entries<S: DocumentStore + ?Sized>(
    store: &S,
    scope: &Scope,
) -> TrackerResult<Vec<CalendarEntry>> {
    let repo = Repository::new(store);
    let subjects: Vec<Subject> = repo.list(scope)?;
    let index = SubjectIndex::new(&subjects);
    let events: Vec<Event> = repo.list(scope)?;
    let grades: Vec<Grade> = repo.list(scope)?;

    let mut entries: Vec<CalendarEntry> = events
        .into_iter()
        .map(CalendarEntry::from_event)
        .chain(grades.into_iter().map(|g| CalendarEntry::from_grade(g, &index)))
        .collect();
    entries.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    Ok(entries)
}

pub fn entries_on(entries: &[CalendarEntry], date: NaiveDate) -> Vec<&CalendarEntry> {
    entries.iter().filter(|e| e.date == date).collect()
}
