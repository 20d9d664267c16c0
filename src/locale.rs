//! Display strings for the one supported locale (it-IT).

use chrono::{Datelike, NaiveDate};

const MONTHS: [&str; 12] = [
    "gennaio",
    "febbraio",
    "marzo",
    "aprile",
    "maggio",
    "giugno",
    "luglio",
    "agosto",
    "settembre",
    "ottobre",
    "novembre",
    "dicembre",
];

pub fn month_name(month: u32) -> &'static str {
    MONTHS
        .get(month.saturating_sub(1) as usize)
        .copied()
        .unwrap_or("")
}

/// `"settembre 2024"`, the `{ month: 'long', year: 'numeric' }` rendering.
pub fn month_year_label(date: NaiveDate) -> String {
    format!("{} {}", month_name(date.month()), date.year())
}

/// `dd/mm/yyyy`
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Two-decimal rendering used for averages.
pub fn format_average(avg: f64) -> String {
    format!("{:.2}", avg)
}
