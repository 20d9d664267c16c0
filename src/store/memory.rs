use super::{merge_fields, sort_documents, DocPath, Document, DocumentStore, Fields, StoreQuery};
use crate::error::StoreError;
use std::collections::BTreeMap;
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, BTreeMap<String, Fields>>,
    offline: bool,
}

/// In-process store. Ids iterate in ascending order, same as the SQLite backend.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every call fails with `StoreError::Rejected`.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.offline = offline;
        }
    }

    pub fn document_count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.collections.get(collection).map_or(0, |c| c.len()))
            .unwrap_or(0)
    }

    fn with<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> Result<T, StoreError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| StoreError::Rejected("memory store lock poisoned".into()))?;
        if inner.offline {
            return Err(StoreError::Rejected("store offline".into()));
        }
        Ok(f(&mut inner))
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        self.with(|inner| {
            inner
                .collections
                .get(&path.collection)
                .and_then(|c| c.get(&path.id))
                .map(|fields| Document {
                    id: path.id.clone(),
                    fields: fields.clone(),
                })
        })
    }

    fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Document>, StoreError> {
        let mut docs = self.with(|inner| {
            inner
                .collections
                .get(collection)
                .map(|c| {
                    c.iter()
                        .filter(|(_, fields)| query.matches(fields))
                        .map(|(id, fields)| Document {
                            id: id.clone(),
                            fields: fields.clone(),
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default()
        })?;
        sort_documents(&mut docs, query.order_by.as_ref());
        if let Some(n) = query.limit {
            docs.truncate(n);
        }
        Ok(docs)
    }

    fn create(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.with(|inner| {
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.clone(), fields.clone());
        })?;
        Ok(Document { id, fields })
    }

    fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        self.with(|inner| {
            inner
                .collections
                .entry(path.collection.clone())
                .or_default()
                .insert(path.id.clone(), fields);
        })
    }

    fn update(&self, path: &DocPath, patch: &Fields) -> Result<bool, StoreError> {
        self.with(|inner| {
            match inner
                .collections
                .get_mut(&path.collection)
                .and_then(|c| c.get_mut(&path.id))
            {
                Some(existing) => {
                    merge_fields(existing, patch);
                    true
                }
                None => false,
            }
        })
    }

    fn delete(&self, path: &DocPath) -> Result<bool, StoreError> {
        self.with(|inner| {
            inner
                .collections
                .get_mut(&path.collection)
                .and_then(|c| c.remove(&path.id))
                .is_some()
        })
    }
}
