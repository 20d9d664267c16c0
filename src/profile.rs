use crate::error::{StoreError, TrackerError, TrackerResult};
use crate::model::Validate;
use crate::scope::SchoolYear;
use crate::store::{DocPath, DocumentStore, Fields, USERS_COLLECTION};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "enabled")]
    pub event_notifications: bool,
    #[serde(default = "enabled")]
    pub grade_notifications: bool,
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "enabled")]
    pub show_grade_average: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            event_notifications: true,
            grade_notifications: true,
            dark_mode: false,
            show_grade_average: true,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SettingsPatch {
    pub event_notifications: Option<bool>,
    pub grade_notifications: Option<bool>,
    pub dark_mode: Option<bool>,
    pub show_grade_average: Option<bool>,
}

impl SettingsPatch {
    fn apply(&self, s: &mut Settings) {
        if let Some(v) = self.event_notifications {
            s.event_notifications = v;
        }
        if let Some(v) = self.grade_notifications {
            s.grade_notifications = v;
        }
        if let Some(v) = self.dark_mode {
            s.dark_mode = v;
        }
        if let Some(v) = self.show_grade_average {
            s.show_grade_average = v;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub surname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub school: String,
    #[serde(rename = "class", default)]
    pub class_name: String,
    pub current_school_year: SchoolYear,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Registration form contents.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfileDraft {
    pub name: String,
    pub surname: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub school: Option<String>,
    #[serde(rename = "class", default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub current_school_year: Option<SchoolYear>,
}

impl Validate for ProfileDraft {
    fn validate(&self) -> TrackerResult<()> {
        if self.name.trim().is_empty() {
            return Err(TrackerError::validation("name", "must not be empty"));
        }
        if self.surname.trim().is_empty() {
            return Err(TrackerError::validation("surname", "must not be empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub surname: Option<String>,
    pub school: Option<String>,
    #[serde(rename = "class")]
    pub class_name: Option<String>,
    pub current_school_year: Option<SchoolYear>,
}

impl Validate for ProfilePatch {
    fn validate(&self) -> TrackerResult<()> {
        if let Some(n) = &self.name {
            if n.trim().is_empty() {
                return Err(TrackerError::validation("name", "must not be empty"));
            }
        }
        if let Some(n) = &self.surname {
            if n.trim().is_empty() {
                return Err(TrackerError::validation("surname", "must not be empty"));
            }
        }
        Ok(())
    }
}

fn profile_path(user_id: &str) -> TrackerResult<DocPath> {
    if user_id.trim().is_empty() {
        return Err(TrackerError::validation("userId", "must not be empty"));
    }
    Ok(DocPath::new(USERS_COLLECTION, user_id.trim()))
}

fn to_fields<T: Serialize>(v: &T) -> TrackerResult<Fields> {
    match serde_json::to_value(v).map_err(StoreError::Body)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::Rejected("profile did not serialize to an object".into()).into()),
    }
}

pub fn get_profile<S: DocumentStore + ?Sized>(store: &S, user_id: &str) -> TrackerResult<UserProfile> {
    let path = profile_path(user_id)?;
    let Some(doc) = store.get(&path)? else {
        return Err(TrackerError::not_found(USERS_COLLECTION, user_id));
    };
    serde_json::from_value(serde_json::Value::Object(doc.fields))
        .map_err(|e| StoreError::Body(e).into())
}

/// Writes a fresh profile. `today` picks the default school year.
pub fn create_profile<S: DocumentStore + ?Sized>(
    store: &S,
    user_id: &str,
    draft: ProfileDraft,
    today: NaiveDate,
) -> TrackerResult<UserProfile> {
    draft.validate()?;
    let path = profile_path(user_id)?;
    let profile = UserProfile {
        name: draft.name.trim().to_string(),
        surname: draft.surname.trim().to_string(),
        email: draft.email,
        school: draft.school.unwrap_or_default(),
        class_name: draft.class_name.unwrap_or_default(),
        current_school_year: draft
            .current_school_year
            .unwrap_or_else(|| SchoolYear::default_for(today)),
        settings: Settings::default(),
        created_at: Some(Utc::now()),
        updated_at: None,
    };
    store.set(&path, to_fields(&profile)?)?;
    info!(user = %path.id, year = %profile.current_school_year, "profile created");
    Ok(profile)
}

pub fn update_profile<S: DocumentStore + ?Sized>(
    store: &S,
    user_id: &str,
    patch: &ProfilePatch,
) -> TrackerResult<UserProfile> {
    patch.validate()?;
    let path = profile_path(user_id)?;
    let mut profile = get_profile(store, user_id)?;
    if let Some(v) = &patch.name {
        profile.name = v.trim().to_string();
    }
    if let Some(v) = &patch.surname {
        profile.surname = v.trim().to_string();
    }
    if let Some(v) = &patch.school {
        profile.school = v.trim().to_string();
    }
    if let Some(v) = &patch.class_name {
        profile.class_name = v.trim().to_string();
    }
    if let Some(v) = &patch.current_school_year {
        profile.current_school_year = v.clone();
    }
    profile.updated_at = Some(Utc::now());
    write_partial(
        store,
        &path,
        &profile,
        &[
            "name",
            "surname",
            "school",
            "class",
            "currentSchoolYear",
            "updatedAt",
        ],
    )?;
    Ok(profile)
}

pub fn update_settings<S: DocumentStore + ?Sized>(
    store: &S,
    user_id: &str,
    patch: &SettingsPatch,
) -> TrackerResult<UserProfile> {
    let path = profile_path(user_id)?;
    let mut profile = get_profile(store, user_id)?;
    patch.apply(&mut profile.settings);
    profile.updated_at = Some(Utc::now());
    write_partial(store, &path, &profile, &["settings", "updatedAt"])?;
    Ok(profile)
}

/// Sends only the named top-level fields, leaving anything else on the
/// stored document alone.
fn write_partial<S: DocumentStore + ?Sized>(
    store: &S,
    path: &DocPath,
    profile: &UserProfile,
    keys: &[&str],
) -> TrackerResult<()> {
    let all = to_fields(profile)?;
    let patch: Fields = all
        .into_iter()
        .filter(|(k, _)| keys.contains(&k.as_str()))
        .collect();
    if !store.update(path, &patch)? {
        return Err(TrackerError::not_found(USERS_COLLECTION, path.id.clone()));
    }
    Ok(())
}
