pub mod core;
pub mod dashboard;
pub mod events;
pub mod grades;
pub mod profile;
mod records;
pub mod schedule;
pub mod subjects;
