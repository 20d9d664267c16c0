use crate::locale;
use crate::model::{Event, Grade};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

pub trait Weighted {
    fn value(&self) -> f64;
    /// `None` counts as 1.
    fn weight(&self) -> Option<f64>;
}

pub trait Dated {
    fn date(&self) -> NaiveDate;
}

impl Weighted for Grade {
    fn value(&self) -> f64 {
        self.value
    }
    fn weight(&self) -> Option<f64> {
        self.weight
    }
}

impl Dated for Grade {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Dated for Event {
    fn date(&self) -> NaiveDate {
        self.date
    }
}

fn effective_weight(w: Option<f64>) -> Option<f64> {
    match w {
        None => Some(1.0),
        Some(w) if w.is_finite() && w > 0.0 => Some(w),
        // Weight 0 (or a corrupt stored weight) excludes the record.
        Some(_) => None,
    }
}

/// `Σ value·weight / Σ weight`, or 0 when nothing counts.
pub fn weighted_average<'a, R, I>(records: I) -> f64
where
    R: Weighted + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut sum: f64 = 0.0;
    let mut weights: f64 = 0.0;
    for r in records {
        let Some(w) = effective_weight(r.weight()) else {
            continue;
        };
        let v = r.value();
        if !v.is_finite() {
            continue;
        }
        sum += v * w;
        weights += w;
    }
    if weights > 0.0 {
        sum / weights
    } else {
        0.0
    }
}

pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthGroup<'a, R> {
    pub label: String,
    pub year: i32,
    pub month: u32,
    pub records: Vec<&'a R>,
}

/// Buckets records by calendar month in first-seen order. A month that
/// reappears later joins its existing bucket.
pub fn group_by_month<'a, R, I>(records: I) -> Vec<MonthGroup<'a, R>>
where
    R: Dated + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let mut groups: Vec<MonthGroup<'a, R>> = Vec::new();
    let mut slot: HashMap<(i32, u32), usize> = HashMap::new();
    for r in records {
        let d = r.date();
        let key = (d.year(), d.month());
        let idx = *slot.entry(key).or_insert_with(|| {
            groups.push(MonthGroup {
                label: locale::month_year_label(d),
                year: key.0,
                month: key.1,
                records: Vec::new(),
            });
            groups.len() - 1
        });
        groups[idx].records.push(r);
    }
    groups
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectAverage {
    pub subject_id: String,
    pub average: f64,
    pub grade_count: usize,
}

/// Per-subject weighted averages, subjects in first-seen order.
pub fn average_by_subject(grades: &[Grade]) -> Vec<SubjectAverage> {
    let mut order: Vec<&str> = Vec::new();
    let mut buckets: HashMap<&str, Vec<&Grade>> = HashMap::new();
    for g in grades {
        let bucket = buckets.entry(g.subject_id.as_str()).or_default();
        if bucket.is_empty() {
            order.push(g.subject_id.as_str());
        }
        bucket.push(g);
    }
    order
        .into_iter()
        .map(|sid| {
            let bucket = buckets.get(sid).map(Vec::as_slice).unwrap_or(&[]);
            SubjectAverage {
                subject_id: sid.to_string(),
                average: weighted_average(bucket.iter().copied()),
                grade_count: bucket.len(),
            }
        })
        .collect()
}
