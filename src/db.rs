use crate::error::StoreError;
use crate::query::SortDirection;
use crate::store::{merge_fields, DocPath, Document, DocumentStore, Fields, StoreQuery};
use anyhow::Context;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use uuid::Uuid;

pub const DB_FILE_NAME: &str = "tracker.sqlite3";

/// Document store backed by one SQLite table. Bodies are JSON text and
/// predicates run through `json_extract`.
pub struct SqliteStore {
    conn: Connection,
}

pub fn open_db(workspace: &Path) -> anyhow::Result<SqliteStore> {
    std::fs::create_dir_all(workspace)
        .with_context(|| format!("failed to create workspace {}", workspace.to_string_lossy()))?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.to_string_lossy()))?;
    init_schema(&conn)?;
    Ok(SqliteStore { conn })
}

impl SqliteStore {
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn init_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents(
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            body TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY(collection, id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection_date
         ON documents(collection, json_extract(body, '$.date'))",
        [],
    )?;
    Ok(())
}

fn now_stamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn json_path(field: &str) -> Value {
    Value::Text(format!("$.{}", field))
}

fn to_sql_value(v: &serde_json::Value) -> Result<Value, StoreError> {
    Ok(match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Integer(i64::from(*b)),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Real(n.as_f64().unwrap_or(0.0)),
        },
        serde_json::Value::String(s) => Value::Text(s.clone()),
        other => {
            return Err(StoreError::Rejected(format!(
                "cannot compare against non-scalar value {}",
                other
            )))
        }
    })
}

fn parse_body(body: &str) -> Result<Fields, StoreError> {
    match serde_json::from_str::<serde_json::Value>(body)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(StoreError::Rejected("document body is not an object".into())),
    }
}

fn encode_body(fields: &Fields) -> Result<String, StoreError> {
    Ok(serde_json::to_string(fields)?)
}

impl DocumentStore for SqliteStore {
    fn get(&self, path: &DocPath) -> Result<Option<Document>, StoreError> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM documents WHERE collection = ? AND id = ?",
                (&path.collection, &path.id),
                |r| r.get(0),
            )
            .optional()?;
        body.map(|b| {
            Ok(Document {
                id: path.id.clone(),
                fields: parse_body(&b)?,
            })
        })
        .transpose()
    }

    fn query(&self, collection: &str, query: &StoreQuery) -> Result<Vec<Document>, StoreError> {
        let mut sql = String::from("SELECT id, body FROM documents WHERE collection = ?");
        let mut bind: Vec<Value> = vec![Value::Text(collection.to_string())];

        for (field, want) in &query.equals {
            let v = to_sql_value(want)?;
            if v == Value::Null {
                sql.push_str(" AND json_extract(body, ?) IS NULL");
                bind.push(json_path(field));
            } else {
                sql.push_str(" AND json_extract(body, ?) = ?");
                bind.push(json_path(field));
                bind.push(v);
            }
        }
        for r in &query.ranges {
            if let Some(lo) = &r.lower {
                sql.push_str(" AND json_extract(body, ?) >= ?");
                bind.push(json_path(&r.field));
                bind.push(to_sql_value(lo)?);
            }
            if let Some(hi) = &r.upper {
                sql.push_str(" AND json_extract(body, ?) <= ?");
                bind.push(json_path(&r.field));
                bind.push(to_sql_value(hi)?);
            }
        }
        match &query.order_by {
            Some((field, direction)) => {
                let dir = match direction {
                    SortDirection::Ascending => "ASC",
                    SortDirection::Descending => "DESC",
                };
                sql.push_str(&format!(" ORDER BY json_extract(body, ?) {}, id ASC", dir));
                bind.push(json_path(field));
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }
        if let Some(n) = query.limit {
            sql.push_str(" LIMIT ?");
            bind.push(Value::Integer(i64::try_from(n).unwrap_or(i64::MAX)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(bind), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, body)| {
                Ok(Document {
                    id,
                    fields: parse_body(&body)?,
                })
            })
            .collect()
    }

    fn create(&self, collection: &str, fields: Fields) -> Result<Document, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO documents(collection, id, body, updated_at) VALUES(?, ?, ?, ?)",
            (collection, &id, encode_body(&fields)?, now_stamp()),
        )?;
        Ok(Document { id, fields })
    }

    fn set(&self, path: &DocPath, fields: Fields) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO documents(collection, id, body, updated_at) VALUES(?, ?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET
               body = excluded.body,
               updated_at = excluded.updated_at",
            (&path.collection, &path.id, encode_body(&fields)?, now_stamp()),
        )?;
        Ok(())
    }

    fn update(&self, path: &DocPath, patch: &Fields) -> Result<bool, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let body: Option<String> = tx
            .query_row(
                "SELECT body FROM documents WHERE collection = ? AND id = ?",
                (&path.collection, &path.id),
                |r| r.get(0),
            )
            .optional()?;
        let Some(body) = body else {
            return Ok(false);
        };
        let mut fields = parse_body(&body)?;
        merge_fields(&mut fields, patch);
        tx.execute(
            "UPDATE documents SET body = ?, updated_at = ? WHERE collection = ? AND id = ?",
            (encode_body(&fields)?, now_stamp(), &path.collection, &path.id),
        )?;
        tx.commit()?;
        Ok(true)
    }

    fn delete(&self, path: &DocPath) -> Result<bool, StoreError> {
        let n = self.conn.execute(
            "DELETE FROM documents WHERE collection = ? AND id = ?",
            (&path.collection, &path.id),
        )?;
        Ok(n > 0)
    }
}
