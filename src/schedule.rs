//! Weekly timetable. Each day is one document holding the whole slot list,
//! so writes replace the list wholesale: two sessions editing the same day
//! concurrently will overwrite each other (last write wins).

use crate::error::{StoreError, TrackerError, TrackerResult};
use crate::scope::Scope;
use crate::store::{Collection, DocPath, DocumentStore, Fields};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FIRST_PERIOD: u8 = 1;
pub const LAST_PERIOD: u8 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Self::Monday,
        Self::Tuesday,
        Self::Wednesday,
        Self::Thursday,
        Self::Friday,
        Self::Saturday,
    ];

    /// Document id under `days/`.
    pub fn key(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Monday => "Lunedì",
            Self::Tuesday => "Martedì",
            Self::Wednesday => "Mercoledì",
            Self::Thursday => "Giovedì",
            Self::Friday => "Venerdì",
            Self::Saturday => "Sabato",
        }
    }

    pub fn parse(raw: &str) -> TrackerResult<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.key().eq_ignore_ascii_case(raw.trim()))
            .ok_or_else(|| TrackerError::validation("day", format!("unknown day {:?}", raw)))
    }

    /// No lessons on Sunday.
    pub fn of(date: NaiveDate) -> Option<Self> {
        match date.weekday() {
            chrono::Weekday::Mon => Some(Self::Monday),
            chrono::Weekday::Tue => Some(Self::Tuesday),
            chrono::Weekday::Wed => Some(Self::Wednesday),
            chrono::Weekday::Thu => Some(Self::Thursday),
            chrono::Weekday::Fri => Some(Self::Friday),
            chrono::Weekday::Sat => Some(Self::Saturday),
            chrono::Weekday::Sun => None,
        }
    }
}

/// What the caller supplies for a cell; times are free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub period: u8,
    #[serde(flatten)]
    pub fields: SlotFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub day: Weekday,
    pub label: &'static str,
    pub slots: Vec<ScheduleSlot>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DayDocument {
    #[serde(default)]
    slots: Vec<ScheduleSlot>,
}

fn check_period(period: u8) -> TrackerResult<()> {
    if !(FIRST_PERIOD..=LAST_PERIOD).contains(&period) {
        return Err(TrackerError::validation(
            "period",
            format!("must be in {}..={}", FIRST_PERIOD, LAST_PERIOD),
        ));
    }
    Ok(())
}

fn day_path(scope: &Scope, day: Weekday) -> DocPath {
    DocPath::scoped(scope, Collection::Schedule, day.key())
}

fn load_day<S: DocumentStore + ?Sized>(store: &S, path: &DocPath) -> TrackerResult<Vec<ScheduleSlot>> {
    let Some(doc) = store.get(path)? else {
        return Ok(Vec::new());
    };
    let parsed: DayDocument = serde_json::from_value(serde_json::Value::Object(doc.fields))
        .map_err(StoreError::Body)?;
    Ok(parsed.slots)
}

fn write_day<S: DocumentStore + ?Sized>(
    store: &S,
    path: &DocPath,
    slots: Vec<ScheduleSlot>,
) -> TrackerResult<()> {
    let body = serde_json::to_value(DayDocument { slots }).map_err(StoreError::Body)?;
    let fields: Fields = match body {
        serde_json::Value::Object(map) => map,
        _ => Fields::new(),
    };
    store.set(path, fields)?;
    Ok(())
}

pub fn day_slots<S: DocumentStore + ?Sized>(
    store: &S,
    scope: &Scope,
    day: Weekday,
) -> TrackerResult<Vec<ScheduleSlot>> {
    let mut slots = load_day(store, &day_path(scope, day))?;
    slots.sort_by_key(|s| s.period);
    Ok(slots)
}

pub fn slot<S: DocumentStore + ?Sized>(
    store: &S,
    scope: &Scope,
    day: Weekday,
    period: u8,
) -> TrackerResult<Option<ScheduleSlot>> {
    check_period(period)?;
    Ok(day_slots(store, scope, day)?
        .into_iter()
        .find(|s| s.period == period))
}

/// Monday to Saturday. Days never written read as empty.
pub fn week<S: DocumentStore + ?Sized>(store: &S, scope: &Scope) -> TrackerResult<Vec<DaySchedule>> {
    Weekday::ALL
        .into_iter()
        .map(|day| -> TrackerResult<DaySchedule> {
            Ok(DaySchedule {
                day,
                label: day.label(),
                slots: day_slots(store, scope, day)?,
            })
        })
        .collect()
}

/// Replaces the slot at (day, period) or inserts it, then writes the day back.
pub fn set_slot<S: DocumentStore + ?Sized>(
    store: &S,
    scope: &Scope,
    day: Weekday,
    period: u8,
    fields: SlotFields,
) -> TrackerResult<ScheduleSlot> {
    check_period(period)?;
    let path = day_path(scope, day);
    let mut slots = load_day(store, &path)?;
    let slot = ScheduleSlot { period, fields };
    match slots.iter_mut().find(|s| s.period == period) {
        Some(existing) => *existing = slot.clone(),
        None => slots.push(slot.clone()),
    }
    slots.sort_by_key(|s| s.period);
    let count = slots.len();
    write_day(store, &path, slots)?;
    debug!(day = day.key(), period, slots = count, "schedule slot set");
    Ok(slot)
}

/// Removing an empty cell is a no-op and writes nothing.
pub fn remove_slot<S: DocumentStore + ?Sized>(
    store: &S,
    scope: &Scope,
    day: Weekday,
    period: u8,
) -> TrackerResult<bool> {
    check_period(period)?;
    let path = day_path(scope, day);
    let mut slots = load_day(store, &path)?;
    let before = slots.len();
    slots.retain(|s| s.period != period);
    if slots.len() == before {
        return Ok(false);
    }
    write_day(store, &path, slots)?;
    debug!(day = day.key(), period, "schedule slot removed");
    Ok(true)
}
