//! Typed access to the five collections
//!
//! `Catalog` is the per-collection client over the document store. Every
//! write that introduces a reference (subject -> branch, note -> subject)
//! checks that the referenced document exists before touching the store.
//! Deletes do not cascade, except a note taking its stats records with it.

mod branches;
mod notes;
mod subjects;

use crate::db::{Database, Query};
use crate::error::{StoreError, StoreResult};
use crate::types::{Collection, NoteStats, SearchLog};

/// Typed operations on the note catalog
pub struct Catalog<'a> {
    db: &'a Database,
}

impl<'a> Catalog<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    // =========================================================================
    // Stats and logs
    // =========================================================================

    /// Stats records kept for a note (normally exactly one)
    pub fn stats_for_note(&self, note_id: &str) -> StoreResult<Vec<NoteStats>> {
        self.db
            .query_as(Collection::NoteStats, &Query::new().eq("noteId", note_id))
    }

    /// Append a search log entry
    pub fn log_search(
        &self,
        query: &str,
        results_count: u64,
        user_agent: Option<&str>,
    ) -> StoreResult<String> {
        let mut body = serde_json::json!({
            "query": query.trim().to_lowercase(),
            "timestamp": crate::db::server_timestamp(),
            "resultsCount": results_count,
        });
        if let Some(agent) = user_agent {
            body["userAgent"] = serde_json::Value::String(agent.to_string());
        }
        self.db.insert(Collection::SearchLogs, &body)
    }

    /// All search logs, oldest first
    pub fn search_logs(&self) -> StoreResult<Vec<SearchLog>> {
        self.db.query_as(Collection::SearchLogs, &Query::new())
    }

    fn require(&self, collection: Collection, id: &str) -> StoreResult<()> {
        if self.db.get(collection, id)?.is_none() {
            return Err(StoreError::DanglingReference {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Trim a required text field, rejecting it when blank
fn required(value: &str, what: &str) -> StoreResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Validation(format!("{} is required", what)));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional text field, dropping it when blank
fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
