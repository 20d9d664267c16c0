use crate::error::{TrackerError, TrackerResult};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// School-year token, always `"YYYY-YYYY"` with consecutive years.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchoolYear(String);

impl SchoolYear {
    pub fn parse(raw: &str) -> TrackerResult<Self> {
        let t = raw.trim();
        let bad = || TrackerError::validation("schoolYear", format!("expected YYYY-YYYY, got {t:?}"));
        let (a, b) = t.split_once('-').ok_or_else(bad)?;
        if a.len() != 4 || b.len() != 4 {
            return Err(bad());
        }
        if !a.bytes().chain(b.bytes()).all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let start: i32 = a.parse().map_err(|_| bad())?;
        let end: i32 = b.parse().map_err(|_| bad())?;
        if end != start + 1 {
            return Err(TrackerError::validation(
                "schoolYear",
                format!("{t} does not span consecutive years"),
            ));
        }
        Ok(Self(t.to_string()))
    }

    pub fn starting_in(year: i32) -> Self {
        Self(format!("{:04}-{:04}", year, year + 1))
    }

    /// Default active year for a fresh profile: the one starting in `today`'s calendar year.
    pub fn default_for(today: NaiveDate) -> Self {
        Self::starting_in(today.year())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SchoolYear {
    type Error = TrackerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SchoolYear> for String {
    fn from(value: SchoolYear) -> Self {
        value.0
    }
}

impl fmt::Display for SchoolYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Partition key for every record except the profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    user_id: String,
    school_year: SchoolYear,
}

impl Scope {
    pub fn new(user_id: impl Into<String>, school_year: SchoolYear) -> TrackerResult<Self> {
        let user_id = user_id.into();
        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(TrackerError::validation("userId", "must not be empty"));
        }
        if user_id.contains('/') {
            return Err(TrackerError::validation("userId", "must not contain '/'"));
        }
        Ok(Self {
            user_id: user_id.to_string(),
            school_year,
        })
    }

    pub fn resolve(identity: &dyn IdentityProvider) -> TrackerResult<Self> {
        let Some(user_id) = identity.current_user_id() else {
            return Err(TrackerError::validation("userId", "no current user"));
        };
        Self::new(user_id, identity.current_school_year())
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn school_year(&self) -> &SchoolYear {
        &self.school_year
    }

    /// Same user, different active year. Existing records stay where they are.
    pub fn with_year(&self, school_year: SchoolYear) -> Self {
        Self {
            user_id: self.user_id.clone(),
            school_year,
        }
    }
}

pub trait IdentityProvider {
    fn current_user_id(&self) -> Option<String>;
    fn current_school_year(&self) -> SchoolYear;
}

#[derive(Debug, Clone)]
pub struct StaticIdentity {
    pub user_id: String,
    pub school_year: SchoolYear,
}

impl IdentityProvider for StaticIdentity {
    fn current_user_id(&self) -> Option<String> {
        Some(self.user_id.clone())
    }

    fn current_school_year(&self) -> SchoolYear {
        self.school_year.clone()
    }
}
