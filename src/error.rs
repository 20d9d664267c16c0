use thiserror::Error;

/// Failure reported by a document store backend. Always propagated as-is.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("document body error: {0}")]
    Body(#[from] serde_json::Error),

    #[error("store rejected operation: {0}")]
    Rejected(String),
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("{collection} record not found: {id}")]
    NotFound { collection: String, id: String },

    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type TrackerResult<T> = Result<T, TrackerError>;

impl TrackerError {
    pub fn not_found(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            collection: collection.into(),
            id: id.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Stable code surfaced to the presentation layer.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Validation { .. } => "bad_params",
            Self::Store(_) => "store_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::NotFound { collection, id } => Some(serde_json::json!({
                "collection": collection,
                "id": id,
            })),
            Self::Validation { field, .. } => Some(serde_json::json!({ "field": field })),
            Self::Store(_) => None,
        }
    }
}
