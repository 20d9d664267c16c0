use std::path::PathBuf;

use crate::db::SqliteStore;
use crate::scope::StaticIdentity;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<SqliteStore>,
    /// Installed by `session.open`; every scoped call resolves through it.
    pub session: Option<StaticIdentity>,
    /// Set when the session was opened with an explicit year; the profile's
    /// current year no longer moves it.
    pub session_pinned: bool,
}
