use crate::error::{StoreError, TrackerError, TrackerResult};
use crate::model::{
    Event, EventDraft, EventPatch, Grade, GradeDraft, GradePatch, Subject, SubjectDraft,
    SubjectPatch, Validate,
};
use crate::query::{order_by_date, Filterable, RecordFilter, SortDirection};
use crate::scope::Scope;
use crate::store::{Collection, DocPath, Document, DocumentStore, Fields, StoreQuery};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// A record type stored as one document per record in a scoped collection.
pub trait Record: Serialize + DeserializeOwned + Clone + Debug {
    const COLLECTION: Collection;
    /// Fields a patch may not clear with `null`.
    const REQUIRED: &'static [&'static str];
    /// Date order used by `list`; `None` keeps store id order.
    const DEFAULT_ORDER: Option<SortDirection>;

    type Draft: Serialize + DeserializeOwned + Validate;
    type Patch: Serialize + DeserializeOwned + Validate;

    fn id(&self) -> &str;
}

impl Record for Subject {
    const COLLECTION: Collection = Collection::Subjects;
    const REQUIRED: &'static [&'static str] = &["name"];
    const DEFAULT_ORDER: Option<SortDirection> = None;
    type Draft = SubjectDraft;
    type Patch = SubjectPatch;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Grade {
    const COLLECTION: Collection = Collection::Grades;
    const REQUIRED: &'static [&'static str] = &["subjectId", "value", "date", "kind", "term"];
    const DEFAULT_ORDER: Option<SortDirection> = Some(SortDirection::Descending);
    type Draft = GradeDraft;
    type Patch = GradePatch;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Event {
    const COLLECTION: Collection = Collection::Events;
    const REQUIRED: &'static [&'static str] = &["title", "date", "type"];
    const DEFAULT_ORDER: Option<SortDirection> = Some(SortDirection::Ascending);
    type Draft = EventDraft;
    type Patch = EventPatch;

    fn id(&self) -> &str {
        &self.id
    }
}

fn decode<T: Record>(doc: Document) -> TrackerResult<T> {
    let mut fields = doc.fields;
    fields.insert("id".to_string(), serde_json::Value::String(doc.id));
    serde_json::from_value(serde_json::Value::Object(fields))
        .map_err(|e| TrackerError::Store(StoreError::Body(e)))
}

fn encode<D: Serialize>(draft: &D) -> TrackerResult<Fields> {
    match serde_json::to_value(draft).map_err(StoreError::Body)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::Rejected("record did not serialize to an object".into()).into()),
    }
}

/// Validates a patch and returns it in stored form: every provided key is
/// re-encoded from the typed patch, so dates land zero-padded. `null`
/// passes through to clear the field.
fn check_patch<T: Record>(patch: &Fields) -> TrackerResult<Fields> {
    if patch.contains_key("id") {
        return Err(TrackerError::validation("id", "is assigned by the store"));
    }
    for field in T::REQUIRED {
        if patch.get(*field).map(|v| v.is_null()).unwrap_or(false) {
            return Err(TrackerError::validation(*field, "is required and cannot be cleared"));
        }
    }
    let typed: T::Patch = serde_json::from_value(serde_json::Value::Object(patch.clone()))
        .map_err(|e| TrackerError::validation("patch", e.to_string()))?;
    typed.validate()?;

    let encoded = encode(&typed)?;
    let mut normalized = Fields::new();
    for (key, raw) in patch {
        let value = if raw.is_null() {
            serde_json::Value::Null
        } else {
            encoded.get(key).cloned().ok_or_else(|| {
                StoreError::Rejected(format!("patch field {key} did not survive encoding"))
            })?
        };
        normalized.insert(key.clone(), value);
    }
    Ok(normalized)
}

/// Create/read/update/delete over the collections of one store. Every call
/// takes the scope explicitly and goes straight to the store.
pub struct Repository<'s, S: ?Sized> {
    store: &'s S,
}

impl<'s, S: DocumentStore + ?Sized> Repository<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &'s S {
        self.store
    }

    /// Fresh fetch in the record type's default order.
    pub fn list<T: Record>(&self, scope: &Scope) -> TrackerResult<Vec<T>> {
        let query = match T::DEFAULT_ORDER {
            Some(direction) => StoreQuery::all().order_by("date", direction),
            None => StoreQuery::all(),
        };
        self.query(scope, &query)
    }

    pub fn query<T: Record>(&self, scope: &Scope, query: &StoreQuery) -> TrackerResult<Vec<T>> {
        let collection = T::COLLECTION.path(scope);
        let docs = self.store.query(&collection, query)?;
        debug!(collection = %collection, count = docs.len(), "listed records");
        docs.into_iter().map(decode::<T>).collect()
    }

    /// Pushes `filter` down to the store, then re-applies it in memory so
    /// the result does not depend on how strictly the backend compares.
    pub fn list_matching<T>(
        &self,
        scope: &Scope,
        filter: &RecordFilter<T::Kind>,
        direction: SortDirection,
    ) -> TrackerResult<Vec<T>>
    where
        T: Record + Filterable,
    {
        let query = filter.to_store_query(T::KIND_FIELD, direction);
        let fetched: Vec<T> = self.query(scope, &query)?;
        let mut out = filter.apply(&fetched);
        order_by_date(&mut out, direction);
        Ok(out)
    }

    pub fn get<T: Record>(&self, scope: &Scope, id: &str) -> TrackerResult<T> {
        let path = DocPath::scoped(scope, T::COLLECTION, id);
        match self.store.get(&path)? {
            Some(doc) => decode(doc),
            None => Err(TrackerError::not_found(T::COLLECTION.name(), id)),
        }
    }

    pub fn create<T: Record>(&self, scope: &Scope, draft: &T::Draft) -> TrackerResult<T> {
        draft.validate()?;
        let fields = encode(draft)?;
        let collection = T::COLLECTION.path(scope);
        let doc = self.store.create(&collection, fields)?;
        debug!(collection = %collection, id = %doc.id, "created record");
        decode(doc)
    }

    /// Partial update. The patch is checked before any I/O; `null` clears
    /// an optional field.
    pub fn update<T: Record>(&self, scope: &Scope, id: &str, patch: &Fields) -> TrackerResult<T> {
        let patch = check_patch::<T>(patch)?;
        let path = DocPath::scoped(scope, T::COLLECTION, id);
        if !self.store.update(&path, &patch)? {
            return Err(TrackerError::not_found(T::COLLECTION.name(), id));
        }
        debug!(collection = %path.collection, id = %id, fields = patch.len(), "updated record");
        self.get(scope, id)
    }

    /// Deleting an absent id is `NotFound`. Nothing referencing the record is touched.
    pub fn delete<T: Record>(&self, scope: &Scope, id: &str) -> TrackerResult<()> {
        let path = DocPath::scoped(scope, T::COLLECTION, id);
        if !self.store.delete(&path)? {
            return Err(TrackerError::not_found(T::COLLECTION.name(), id));
        }
        debug!(collection = %path.collection, id = %id, "deleted record");
        Ok(())
    }
}
