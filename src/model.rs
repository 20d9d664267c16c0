use crate::error::{TrackerError, TrackerResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pre-I/O checks on drafts and patches.
pub trait Validate {
    fn validate(&self) -> TrackerResult<()>;
}

fn require_text(field: &str, v: &str) -> TrackerResult<()> {
    if v.trim().is_empty() {
        return Err(TrackerError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn require_finite(field: &str, v: f64) -> TrackerResult<()> {
    if !v.is_finite() {
        return Err(TrackerError::validation(field, "must be a finite number"));
    }
    Ok(())
}

fn require_positive_weight(v: f64) -> TrackerResult<()> {
    if !v.is_finite() || v <= 0.0 {
        return Err(TrackerError::validation("weight", "must be greater than 0"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GradeKind {
    Written,
    Oral,
    Practical,
    Other,
}

impl Default for GradeKind {
    fn default() -> Self {
        Self::Written
    }
}

impl GradeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Written => "written",
            Self::Oral => "oral",
            Self::Practical => "practical",
            Self::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Written => "Scritto",
            Self::Oral => "Orale",
            Self::Practical => "Pratico",
            Self::Other => "Altro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Event,
    Test,
    Assignment,
    Substitution,
    Other,
}

impl Default for EventType {
    fn default() -> Self {
        Self::Event
    }
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Event => "event",
            Self::Test => "test",
            Self::Assignment => "assignment",
            Self::Substitution => "substitution",
            Self::Other => "other",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Event => "Evento",
            Self::Test => "Verifica",
            Self::Assignment => "Compito",
            Self::Substitution => "Supplenza",
            Self::Other => "Altro",
        }
    }
}

/// Grading period (quadrimestre). Serialized as the bare number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Term {
    First,
    Second,
}

impl Default for Term {
    fn default() -> Self {
        Self::First
    }
}

impl TryFrom<u8> for Term {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            other => Err(format!("term must be 1 or 2, got {}", other)),
        }
    }
}

impl From<Term> for u8 {
    fn from(value: Term) -> Self {
        match value {
            Term::First => 1,
            Term::Second => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubjectDraft {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Validate for SubjectDraft {
    fn validate(&self) -> TrackerResult<()> {
        require_text("name", &self.name)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SubjectPatch {
    pub name: Option<String>,
    pub teacher: Option<String>,
    pub color_tag: Option<String>,
    pub notes: Option<String>,
}

impl Validate for SubjectPatch {
    fn validate(&self) -> TrackerResult<()> {
        if let Some(name) = &self.name {
            require_text("name", name)?;
        }
        Ok(())
    }
}

fn default_weight() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub id: String,
    pub subject_id: String,
    pub value: f64,
    /// Absent on some stored records; counts as 1.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub date: NaiveDate,
    pub kind: GradeKind,
    pub term: Term,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradeDraft {
    pub subject_id: String,
    pub value: f64,
    #[serde(default = "default_weight")]
    pub weight: f64,
    pub date: NaiveDate,
    #[serde(default)]
    pub kind: GradeKind,
    #[serde(default)]
    pub term: Term,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for GradeDraft {
    fn validate(&self) -> TrackerResult<()> {
        require_text("subjectId", &self.subject_id)?;
        require_finite("value", self.value)?;
        require_positive_weight(self.weight)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GradePatch {
    pub subject_id: Option<String>,
    pub value: Option<f64>,
    pub weight: Option<f64>,
    pub date: Option<NaiveDate>,
    pub kind: Option<GradeKind>,
    pub term: Option<Term>,
    pub description: Option<String>,
}

impl Validate for GradePatch {
    fn validate(&self) -> TrackerResult<()> {
        if let Some(s) = &self.subject_id {
            require_text("subjectId", s)?;
        }
        if let Some(v) = self.value {
            require_finite("value", v)?;
        }
        if let Some(w) = self.weight {
            require_positive_weight(w)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventDraft {
    pub title: String,
    pub date: NaiveDate,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Validate for EventDraft {
    fn validate(&self) -> TrackerResult<()> {
        require_text("title", &self.title)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub event_type: Option<EventType>,
    pub subject_id: Option<String>,
    pub description: Option<String>,
}

impl Validate for EventPatch {
    fn validate(&self) -> TrackerResult<()> {
        if let Some(t) = &self.title {
            require_text("title", t)?;
        }
        Ok(())
    }
}

pub const UNKNOWN_SUBJECT: &str = "N/D";

/// Name lookup over a loaded subject list. Dangling ids are not an error.
#[derive(Debug, Clone, Default)]
pub struct SubjectIndex {
    names: HashMap<String, String>,
}

impl SubjectIndex {
    pub fn new(subjects: &[Subject]) -> Self {
        Self {
            names: subjects
                .iter()
                .map(|s| (s.id.clone(), s.name.clone()))
                .collect(),
        }
    }

    pub fn name_of(&self, subject_id: &str) -> &str {
        self.names
            .get(subject_id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_SUBJECT)
    }

    pub fn contains(&self, subject_id: &str) -> bool {
        self.names.contains_key(subject_id)
    }
}
