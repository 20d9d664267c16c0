//! Document store seam. Every collection lives under a slash-separated path
//! built from the scope; bodies are JSON objects.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::query::SortDirection;
use crate::scope::Scope;
use serde_json::{Map, Value};
use std::cmp::Ordering;

pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Subjects,
    Grades,
    Events,
    Schedule,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Self::Subjects => "subjects",
            Self::Grades => "grades",
            Self::Events => "events",
            Self::Schedule => "schedule",
        }
    }

    fn leaf(self) -> &'static str {
        match self {
            Self::Schedule => "days",
            other => other.name(),
        }
    }

    /// `{collection}/{userId}/years/{schoolYear}/{leaf}`
    pub fn path(self, scope: &Scope) -> String {
        format!(
            "{}/{}/years/{}/{}",
            self.name(),
            scope.user_id(),
            scope.school_year(),
            self.leaf()
        )
    }
}

pub const USERS_COLLECTION: &str = "users";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPath {
    pub collection: String,
    pub id: String,
}

impl DocPath {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn scoped(scope: &Scope, collection: Collection, id: impl Into<String>) -> Self {
        Self::new(collection.path(scope), id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

/// Inclusive bounds on one field. Either side may be open.
#[derive(Debug, Clone, PartialEq)]
pub struct RangePredicate {
    pub field: String,
    pub lower: Option<Value>,
    pub upper: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreQuery {
    pub equals: Vec<(String, Value)>,
    pub ranges: Vec<RangePredicate>,
    pub order_by: Option<(String, SortDirection)>,
    pub limit: Option<usize>,
}

impl StoreQuery {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.equals.push((field.to_string(), value.into()));
        self
    }

    pub fn where_range(mut self, field: &str, lower: Option<Value>, upper: Option<Value>) -> Self {
        if lower.is_some() || upper.is_some() {
            self.ranges.push(RangePredicate {
                field: field.to_string(),
                lower,
                upper,
            });
        }
        self
    }

    pub fn order_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        let eq_ok = self.equals.iter().all(|(field, want)| match fields.get(field) {
            Some(have) => compare_values(Some(have), Some(want)) == Ordering::Equal,
            None => false,
        });
        if !eq_ok {
            return false;
        }
        self.ranges.iter().all(|r| {
            let Some(have) = fields.get(&r.field).filter(|v| !v.is_null()) else {
                return false;
            };
            let above = r
                .lower
                .as_ref()
                .map(|lo| compare_values(Some(have), Some(lo)) != Ordering::Less)
                .unwrap_or(true);
            let below = r
                .upper
                .as_ref()
                .map(|hi| compare_values(Some(have), Some(hi)) != Ordering::Greater)
                .unwrap_or(true);
            above && below
        })
    }
}

/// Ordering that mirrors SQLite's: missing/null < numbers < text, ids break ties.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) | Some(Value::Number(_)) => 1,
            Some(Value::String(_)) => 2,
            Some(_) => 3,
        }
    }
    fn as_f64(v: &Value) -> Option<f64> {
        match v {
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    match rank(a).cmp(&rank(b)) {
        Ordering::Equal => {}
        other => return other,
    }
    match (a, b) {
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(x), Some(y)) => match (as_f64(x), as_f64(y)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => x.to_string().cmp(&y.to_string()),
        },
        _ => Ordering::Equal,
    }
}

pub fn sort_documents(docs: &mut [Document], order_by: Option<&(String, SortDirection)>) {
    docs.sort_by(|a, b| {
        let primary = match order_by {
            Some((field, direction)) => {
                let o = compare_values(a.fields.get(field), b.fields.get(field));
                match direction {
                    SortDirection::Ascending => o,
                    SortDirection::Descending => o.reverse(),
                }
            }
            None => Ordering::Equal,
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });
}

/// Applies a partial update in place. `null` removes the key.
pub fn merge_fields(target: &mut Fields, patch: &Fields) {
    for (k, v) in patch {
        if v.is_null() {
            target.remove(k);
        } else {
            target.insert(k.clone(), v.clone());
        }
    }
}

/// Collection-scoped document access. Implementations must make each
/// individual call atomic; nothing else is coordinated.
pub trait DocumentStore {
    fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError>;

    fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Document>, StoreError>;

    /// Inserts a new document under a store-assigned id.
    fn create(&self, collection: &str, fields: Fields) -> Result<Document, StoreError>;

    /// Writes the whole document, creating it if needed.
    fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError>;

    /// Merges `patch` into an existing document. Returns `false` if it does not exist.
    fn update(&self, path: &DocPath, patch: &Fields) -> Result<bool, StoreError>;

    /// Returns `false` if there was nothing to delete.
    fn delete(&self, path: &DocPath) -> Result<bool, StoreError>;
}
