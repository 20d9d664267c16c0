use crate::error::{TrackerError, TrackerResult};
use crate::model::{Event, EventType, Grade, GradeKind, Term};
use crate::store::StoreQuery;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

/// A record the filter engine can narrow and order.
pub trait Filterable {
    type Kind: Copy + PartialEq + Serialize + DeserializeOwned;

    /// Stored field holding the kind discriminator.
    const KIND_FIELD: &'static str;

    fn record_id(&self) -> &str;
    fn date(&self) -> NaiveDate;
    fn subject_id(&self) -> Option<&str>;
    fn term(&self) -> Option<Term>;
    fn kind(&self) -> Self::Kind;
}

impl Filterable for Grade {
    type Kind = GradeKind;
    const KIND_FIELD: &'static str = "kind";

    fn record_id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn subject_id(&self) -> Option<&str> {
        Some(&self.subject_id)
    }
    fn term(&self) -> Option<Term> {
        Some(self.term)
    }
    fn kind(&self) -> GradeKind {
        self.kind
    }
}

impl Filterable for Event {
    type Kind = EventType;
    const KIND_FIELD: &'static str = "type";

    fn record_id(&self) -> &str {
        &self.id
    }
    fn date(&self) -> NaiveDate {
        self.date
    }
    fn subject_id(&self) -> Option<&str> {
        self.subject_id.as_deref()
    }
    fn term(&self) -> Option<Term> {
        None
    }
    fn kind(&self) -> EventType {
        self.event_type
    }
}

/// Every recognized filter option. `None` means unset; set options are ANDed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordFilter<K> {
    pub subject_id: Option<String>,
    pub term: Option<Term>,
    pub kind: Option<K>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl<K> Default for RecordFilter<K> {
    fn default() -> Self {
        Self {
            subject_id: None,
            term: None,
            kind: None,
            date_from: None,
            date_to: None,
        }
    }
}

pub type GradeFilter = RecordFilter<GradeKind>;
pub type EventFilter = RecordFilter<EventType>;

impl<K: Copy + PartialEq + Serialize> RecordFilter<K> {
    pub fn is_unset(&self) -> bool {
        self.subject_id.is_none()
            && self.term.is_none()
            && self.kind.is_none()
            && self.date_from.is_none()
            && self.date_to.is_none()
    }

    pub fn matches<R: Filterable<Kind = K>>(&self, record: &R) -> bool {
        if let Some(want) = &self.subject_id {
            if record.subject_id() != Some(want.as_str()) {
                return false;
            }
        }
        if let Some(want) = self.term {
            if record.term() != Some(want) {
                return false;
            }
        }
        if let Some(want) = self.kind {
            if record.kind() != want {
                return false;
            }
        }
        let date = record.date();
        if self.date_from.map(|from| date < from).unwrap_or(false) {
            return false;
        }
        if self.date_to.map(|to| date > to).unwrap_or(false) {
            return false;
        }
        true
    }

    /// Keeps matching records in their input order.
    pub fn apply<R: Filterable<Kind = K> + Clone>(&self, records: &[R]) -> Vec<R> {
        records.iter().filter(|r| self.matches(*r)).cloned().collect()
    }

    /// The same constraints as a store query ordered by date.
    pub fn to_store_query(&self, kind_field: &str, direction: SortDirection) -> StoreQuery {
        let mut q = StoreQuery::all();
        if let Some(s) = &self.subject_id {
            q = q.where_eq("subjectId", s.as_str());
        }
        if let Some(t) = self.term {
            q = q.where_eq("term", u8::from(t));
        }
        if let Some(k) = self.kind {
            if let Ok(v) = serde_json::to_value(k) {
                q = q.where_eq(kind_field, v);
            }
        }
        q.where_range(
            "date",
            self.date_from.map(|d| d.to_string().into()),
            self.date_to.map(|d| d.to_string().into()),
        )
        .order_by("date", direction)
    }
}

/// Date order with ascending id as the tie-break in both directions.
pub fn order_by_date<R: Filterable>(records: &mut [R], direction: SortDirection) {
    records.sort_by(|a, b| {
        let by_date = match direction {
            SortDirection::Ascending => a.date().cmp(&b.date()),
            SortDirection::Descending => b.date().cmp(&a.date()),
        };
        by_date.then_with(|| a.record_id().cmp(b.record_id()))
    });
}

fn is_unset_marker(v: &serde_json::Value) -> bool {
    match v {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => {
            let t = s.trim();
            t.is_empty() || t.eq_ignore_ascii_case("ALL")
        }
        _ => false,
    }
}

fn parse_date_option(v: &serde_json::Value, key: &str) -> TrackerResult<NaiveDate> {
    let Some(s) = v.as_str() else {
        return Err(TrackerError::validation(key, "must be a YYYY-MM-DD string"));
    };
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| TrackerError::validation(key, format!("invalid date {:?}", s)))
}

/// Reads filter options as the presentation layer sends them: missing,
/// `null`, `""` and `"ALL"` leave an option unset.
pub fn parse_record_filter<K>(raw: Option<&serde_json::Value>) -> TrackerResult<RecordFilter<K>>
where
    K: Copy + PartialEq + Serialize + DeserializeOwned,
{
    let Some(raw) = raw else {
        return Ok(RecordFilter::default());
    };
    if raw.is_null() {
        return Ok(RecordFilter::default());
    }
    let Some(obj) = raw.as_object() else {
        return Err(TrackerError::validation("filters", "must be an object"));
    };

    let mut filter = RecordFilter::default();
    for (key, v) in obj {
        if is_unset_marker(v) {
            continue;
        }
        match key.as_str() {
            "subjectId" => {
                let Some(s) = v.as_str() else {
                    return Err(TrackerError::validation("subjectId", "must be a string"));
                };
                filter.subject_id = Some(s.trim().to_string());
            }
            "term" => {
                // The term select sends "1"/"2" as strings.
                let n = match v {
                    serde_json::Value::String(s) => s.trim().parse::<u8>().ok(),
                    other => other.as_u64().and_then(|n| u8::try_from(n).ok()),
                };
                let term = n
                    .and_then(|n| Term::try_from(n).ok())
                    .ok_or_else(|| TrackerError::validation("term", "must be 1, 2 or 'ALL'"))?;
                filter.term = Some(term);
            }
            "kind" | "type" => {
                let kind = serde_json::from_value::<K>(v.clone()).map_err(|_| {
                    TrackerError::validation(key.as_str(), format!("unknown value {}", v))
                })?;
                filter.kind = Some(kind);
            }
            "dateFrom" => filter.date_from = Some(parse_date_option(v, "dateFrom")?),
            "dateTo" => filter.date_to = Some(parse_date_option(v, "dateTo")?),
            other => {
                return Err(TrackerError::validation(
                    other,
                    "unrecognized filter option",
                ))
            }
        }
    }

    if let (Some(from), Some(to)) = (filter.date_from, filter.date_to) {
        if from > to {
            return Err(TrackerError::validation("dateFrom", "must not be after dateTo"));
        }
    }
    Ok(filter)
}

pub fn parse_direction(raw: Option<&serde_json::Value>, default: SortDirection) -> TrackerResult<SortDirection> {
    match raw {
        None => Ok(default),
        Some(v) if v.is_null() => Ok(default),
        Some(v) => serde_json::from_value(v.clone()).map_err(|_| {
            TrackerError::validation("order", "must be 'ascending' or 'descending'")
        }),
    }
}
