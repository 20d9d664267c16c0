use crate::aggregate::{average_by_subject, round_2_decimals, weighted_average, SubjectAverage};
use crate::error::TrackerResult;
use crate::locale;
use crate::model::{Event, Grade, Subject, SubjectIndex};
use crate::query::SortDirection;
use crate::repo::Repository;
use crate::schedule::{self, ScheduleSlot, Weekday};
use crate::scope::Scope;
use crate::store::{DocumentStore, StoreQuery};
use chrono::NaiveDate;
use serde::Serialize;

pub const RECENT_GRADES: usize = 5;
pub const UPCOMING_EVENTS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRow {
    #[serde(flatten)]
    pub grade: Grade,
    pub subject_name: String,
    pub kind_label: &'static str,
    pub date_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRow {
    #[serde(flatten)]
    pub event: Event,
    pub subject_name: Option<String>,
    pub type_label: &'static str,
    pub date_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRow {
    #[serde(flatten)]
    pub slot: ScheduleSlot,
    pub subject_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverageRow {
    #[serde(flatten)]
    pub average: SubjectAverage,
    pub subject_name: String,
    /// The grades point at a subject that no longer exists.
    pub subject_missing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub school_year: String,
    pub today: NaiveDate,
    pub subject_count: usize,
    pub grade_count: usize,
    /// `None` when the profile hides the average.
    pub average: Option<f64>,
    pub subject_averages: Vec<SubjectAverageRow>,
    pub recent_grades: Vec<GradeRow>,
    pub upcoming_events: Vec<EventRow>,
    pub today_lessons: Vec<LessonRow>,
}

pub fn dashboard_summary<S: DocumentStore + ?Sized>(
    store: &S,
    scope: &Scope,
    today: NaiveDate,
    show_average: bool,
) -> TrackerResult<DashboardSummary> {
    let repo = Repository::new(store);
    let subjects: Vec<Subject> = repo.list(scope)?;
    let index = SubjectIndex::new(&subjects);

    let grades: Vec<Grade> = repo.list(scope)?;
    let upcoming: Vec<Event> = repo.query(
        scope,
        &StoreQuery::all()
            .where_range("date", Some(today.to_string().into()), None)
            .order_by("date", SortDirection::Ascending)
            .limit(UPCOMING_EVENTS),
    )?;
    let lessons = match Weekday::of(today) {
        Some(day) => schedule::day_slots(store, scope, day)?,
        None => Vec::new(),
    };

    let average = show_average.then(|| round_2_decimals(weighted_average(&grades)));
    let subject_averages = average_by_subject(&grades)
        .into_iter()
        .map(|a| SubjectAverageRow {
            subject_name: index.name_of(&a.subject_id).to_string(),
            subject_missing: !index.contains(&a.subject_id),
            average: SubjectAverage {
                average: round_2_decimals(a.average),
                ..a
            },
        })
        .collect();

    Ok(DashboardSummary {
        school_year: scope.school_year().to_string(),
        today,
        subject_count: subjects.len(),
        grade_count: grades.len(),
        average,
        subject_averages,
        recent_grades: grades
            .iter()
            .take(RECENT_GRADES)
            .map(|g| GradeRow {
                subject_name: index.name_of(&g.subject_id).to_string(),
                kind_label: g.kind.label(),
                date_label: locale::format_date(g.date),
                grade: g.clone(),
            })
            .collect(),
        upcoming_events: upcoming
            .into_iter()
            .map(|e| EventRow {
                subject_name: e
                    .subject_id
                    .as_deref()
                    .map(|sid| index.name_of(sid).to_string()),
                type_label: e.event_type.label(),
                date_label: locale::format_date(e.date),
                event: e,
            })
            .collect(),
        today_lessons: lessons
            .into_iter()
            .map(|slot| LessonRow {
                subject_name: slot
                    .fields
                    .subject_id
                    .as_deref()
                    .map(|sid| index.name_of(sid).to_string()),
                slot,
            })
            .collect(),
    })
}
