//! Database module for noteshare
//!
//! A schema-less document store on SQLite, shaped after the hosted
//! document database the site was built against:
//! - Collections of JSON documents keyed by generated string ids
//! - Equality filters, bounded id IN-filters and field ordering
//! - Partial (merge-patch) updates and atomic counter increments
//! - Server-side timestamps on insert and update

mod query;
mod schema;

pub use query::{Direction, Filter, Query, MAX_IN_FILTER};

use std::cell::Cell;
use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::error::{StoreError, StoreResult};
use crate::types::{Collection, StoreStats};

/// Current time in the fixed-width form stored in documents
pub fn server_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// A stored document: its id plus the JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// Deserialize the body with the id merged in as `id`
    pub fn into_typed<T: DeserializeOwned>(self) -> StoreResult<T> {
        let mut data = self.data;
        if let Value::Object(ref mut map) = data {
            map.insert("id".to_string(), Value::String(self.id));
        }
        Ok(serde_json::from_value(data)?)
    }
}

/// Database handle for the document store
pub struct Database {
    conn: Connection,
    query_count: Cell<u64>,
}

impl Database {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn,
            query_count: Cell::new(0),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn,
            query_count: Cell::new(0),
        };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    /// Number of read queries issued since the handle was opened
    pub fn query_count(&self) -> u64 {
        self.query_count.get()
    }

    fn record_read(&self) {
        self.query_count.set(self.query_count.get() + 1);
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a document by id
    pub fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<Document>> {
        self.record_read();
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND id = ?2",
                params![collection.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;

        match data {
            Some(raw) => Ok(Some(Document {
                id: id.to_string(),
                data: serde_json::from_str(&raw)?,
            })),
            None => Ok(None),
        }
    }

    /// Get a document by id, deserialized
    pub fn get_as<T: DeserializeOwned>(&self, collection: Collection, id: &str) -> StoreResult<Option<T>> {
        self.get(collection, id)?.map(Document::into_typed).transpose()
    }

    /// Run a query against a collection
    pub fn query(&self, collection: Collection, query: &Query) -> StoreResult<Vec<Document>> {
        let (sql, params) = query.to_sql(collection)?;
        self.record_read();
        debug!(
            "query {} ({} filters)",
            collection.as_str(),
            query.filters().len()
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut documents = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            documents.push(Document {
                id,
                data: serde_json::from_str(&raw)?,
            });
        }
        Ok(documents)
    }

    /// Run a query against a collection, deserializing every document
    pub fn query_as<T: DeserializeOwned>(
        &self,
        collection: Collection,
        query: &Query,
    ) -> StoreResult<Vec<T>> {
        self.query(collection, query)?
            .into_iter()
            .map(Document::into_typed)
            .collect()
    }

    /// Count the documents in a collection
    pub fn count(&self, collection: Collection) -> StoreResult<u64> {
        self.record_read();
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM documents WHERE collection = ?1",
            params![collection.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a document under a generated id and return the id
    ///
    /// `createdAt` is stamped with the server time unless the body sets it.
    pub fn insert<T: Serialize>(&self, collection: Collection, body: &T) -> StoreResult<String> {
        let mut data = to_object(body)?;
        data.entry("createdAt")
            .or_insert_with(|| Value::String(server_timestamp()));

        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO documents (collection, id, data) VALUES (?1, ?2, ?3)",
            params![collection.as_str(), id, Value::Object(data).to_string()],
        )?;
        debug!("insert {}/{}", collection.as_str(), id);
        Ok(id)
    }

    /// Merge `patch` into a stored document and stamp `updatedAt`
    pub fn update<T: Serialize>(&self, collection: Collection, id: &str, patch: &T) -> StoreResult<()> {
        let mut data = to_object(patch)?;
        data.insert("updatedAt".to_string(), Value::String(server_timestamp()));

        let changed = self.conn.execute(
            "UPDATE documents SET data = json_patch(data, ?3) WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id, Value::Object(data).to_string()],
        )?;
        if changed == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    /// Atomically add `by` to a numeric field (a missing field counts as 0)
    pub fn increment(&self, collection: Collection, id: &str, field: &str, by: i64) -> StoreResult<()> {
        let path = query::field_path(field)?;
        let sql = format!(
            "UPDATE documents SET data = json_set(data, '{path}', COALESCE(json_extract(data, '{path}'), 0) + ?3) \
             WHERE collection = ?1 AND id = ?2"
        );
        let changed = self
            .conn
            .execute(&sql, params![collection.as_str(), id, by])?;
        if changed == 0 {
            return Err(not_found(collection, id));
        }
        Ok(())
    }

    /// Delete a document; returns whether anything was removed
    pub fn delete(&self, collection: Collection, id: &str) -> StoreResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND id = ?2",
            params![collection.as_str(), id],
        )?;
        debug!("delete {}/{} ({} removed)", collection.as_str(), id, changed);
        Ok(changed > 0)
    }

    /// Run `f` atomically; any error rolls back every write made inside it
    pub fn transaction<T, F>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&Database) -> StoreResult<T>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let out = f(self)?;
        tx.commit()?;
        Ok(out)
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get document counts per collection and the database size
    pub fn get_stats(&self) -> StoreResult<StoreStats> {
        let mut stmt = self
            .conn
            .prepare("SELECT collection, COUNT(*) FROM documents GROUP BY collection")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
        })?;

        let mut counts = Vec::new();
        for row in rows {
            let (name, n) = row?;
            match Collection::from_str(&name) {
                Some(collection) => counts.push((collection, n)),
                None => debug!("ignoring unknown collection '{}'", name),
            }
        }

        let collections = Collection::ALL
            .iter()
            .map(|c| {
                let n = counts
                    .iter()
                    .find(|(collection, _)| collection == c)
                    .map(|(_, n)| *n)
                    .unwrap_or(0);
                (*c, n)
            })
            .collect();

        let db_size_bytes = self
            .conn
            .query_row(
                "SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()",
                [],
                |row| row.get::<_, i64>(0),
            )
            .unwrap_or(0) as u64;

        Ok(StoreStats {
            collections,
            db_size_bytes,
        })
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> StoreResult<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

fn to_object<T: Serialize>(body: &T) -> StoreResult<Map<String, Value>> {
    match serde_json::to_value(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidQuery(
            "document body must be a JSON object".to_string(),
        )),
    }
}

fn not_found(collection: Collection, id: &str) -> StoreError {
    StoreError::NotFound {
        collection,
        id: id.to_string(),
    }
}
