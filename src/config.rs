use crate::scope::SchoolYear;
use anyhow::Context;
use std::path::PathBuf;

pub const WORKSPACE_VAR: &str = "TRACKERD_WORKSPACE";
pub const USER_VAR: &str = "TRACKERD_USER";
pub const SCHOOL_YEAR_VAR: &str = "TRACKERD_SCHOOL_YEAR";
pub const LOG_VAR: &str = "TRACKERD_LOG";

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Start-up settings for the sidecar process.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Opened before the first request when set.
    pub workspace: Option<PathBuf>,
    /// Pre-opened session user.
    pub user_id: Option<String>,
    /// Year for the pre-opened session; today's school year when unset.
    pub school_year: Option<SchoolYear>,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: None,
            user_id: None,
            school_year: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values behave like unset ones.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let school_year = match get(SCHOOL_YEAR_VAR) {
            Some(raw) => Some(
                SchoolYear::parse(&raw)
                    .with_context(|| format!("{} is not a school year: {:?}", SCHOOL_YEAR_VAR, raw))?,
            ),
            None => None,
        };
        if school_year.is_some() && get(USER_VAR).is_none() {
            anyhow::bail!("{} requires {} to be set", SCHOOL_YEAR_VAR, USER_VAR);
        }

        Ok(Self {
            workspace: get(WORKSPACE_VAR).map(PathBuf::from),
            user_id: get(USER_VAR),
            school_year,
            log_filter: get(LOG_VAR).unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}
