//! Core type definitions for noteshare
//!
//! Defines the documents kept in the store and the views derived from them:
//! - Collections: the five document collections
//! - Documents: branches, subjects, notes, note stats, search logs
//! - Derived views: dashboard totals, search results, admin listings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest and highest year a subject can belong to
pub const YEARS: std::ops::RangeInclusive<u32> = 1..=4;

/// Lowest and highest semester a subject can belong to
pub const SEMESTERS: std::ops::RangeInclusive<u32> = 1..=8;

/// The document collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Branches,
    Subjects,
    Notes,
    NoteStats,
    SearchLogs,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::Branches,
        Collection::Subjects,
        Collection::Notes,
        Collection::NoteStats,
        Collection::SearchLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Branches => "branches",
            Collection::Subjects => "subjects",
            Collection::Notes => "notes",
            Collection::NoteStats => "noteStats",
            Collection::SearchLogs => "searchLogs",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "branches" => Some(Collection::Branches),
            "subjects" => Some(Collection::Subjects),
            "notes" => Some(Collection::Notes),
            "noteStats" => Some(Collection::NoteStats),
            "searchLogs" => Some(Collection::SearchLogs),
            _ => None,
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which public counter of a note is being bumped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterKind {
    Views,
    Downloads,
}

impl CounterKind {
    /// Counter field on both the note and its stats record
    pub fn field(&self) -> &'static str {
        match self {
            CounterKind::Views => "views",
            CounterKind::Downloads => "downloads",
        }
    }

    /// Timestamp field stamped on the stats record when the counter moves
    pub fn stamp_field(&self) -> &'static str {
        match self {
            CounterKind::Views => "lastViewed",
            CounterKind::Downloads => "lastDownloaded",
        }
    }
}

// =========================================================================
// Stored documents
// =========================================================================

/// An academic discipline grouping (e.g. Computer Science)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Branch {
    pub id: String,
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A course within a branch, scoped to a year and semester
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Owning branch id
    pub branch: String,
    pub year: u32,
    pub semester: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// An uploaded PDF attached to a subject
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub subject_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub pdf_url: String,
    #[serde(default)]
    pub is_published: bool,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Parallel per-note counter record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteStats {
    pub id: String,
    pub note_id: String,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_viewed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_downloaded: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Append-only record of a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLog {
    pub id: String,
    pub query: String,
    pub timestamp: DateTime<Utc>,
    pub results_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

// =========================================================================
// Write payloads
// =========================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBranch {
    pub name: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSubject {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub branch: String,
    pub year: u32,
    pub semester: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub subject_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    pub pdf_url: String,
    #[serde(default)]
    pub is_published: bool,
}

/// Partial branch update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial subject update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial note update; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_published: Option<bool>,
}

// =========================================================================
// Derived views
// =========================================================================

/// Totals shown on the home page and the admin dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_branches: u64,
    pub total_subjects: u64,
    pub total_notes: u64,
    pub total_views: u64,
    pub total_downloads: u64,
    pub trending_notes: Vec<Note>,
}

/// Matches for one search query
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub notes: Vec<Note>,
    pub subjects: Vec<Subject>,
}

impl SearchResults {
    pub fn total(&self) -> usize {
        self.notes.len() + self.subjects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Admin listing row: a note with its subject's name resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteWithSubject {
    #[serde(flatten)]
    pub note: Note,
    pub subject_name: Option<String>,
}

/// Document counts per collection
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub collections: Vec<(Collection, u64)>,
    pub db_size_bytes: u64,
}

impl StoreStats {
    pub fn count(&self, collection: Collection) -> u64 {
        self.collections
            .iter()
            .find(|(c, _)| *c == collection)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_round_trip_names() {
        for collection in Collection::ALL {
            assert_eq!(Collection::from_str(collection.as_str()), Some(collection));
        }
        assert_eq!(Collection::from_str("users"), None);
        assert_eq!(Collection::NoteStats.to_string(), "noteStats");
    }

    #[test]
    fn test_counter_kind_fields() {
        assert_eq!(CounterKind::Views.field(), "views");
        assert_eq!(CounterKind::Downloads.field(), "downloads");
        assert_eq!(CounterKind::Views.stamp_field(), "lastViewed");
        assert_eq!(CounterKind::Downloads.stamp_field(), "lastDownloaded");
    }

    #[test]
    fn test_note_deserializes_with_missing_counters() {
        let json = r#"{
            "id": "n1",
            "subjectId": "s1",
            "title": "Graphs",
            "pdfUrl": "https://files.example/graphs.pdf",
            "isPublished": true
        }"#;
        let note: Note = serde_json::from_str(json).unwrap();
        assert_eq!(note.views, 0);
        assert_eq!(note.downloads, 0);
        assert!(note.description.is_none());
        assert!(note.created_at.is_none());
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let patch = NotePatch {
            title: Some("Trees".to_string()),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "title": "Trees" }));
    }

    #[test]
    fn test_new_subject_serializes_camel_case() {
        let subject = NewSubject {
            name: "Compilers".to_string(),
            code: Some("CS401".to_string()),
            branch: "b1".to_string(),
            year: 4,
            semester: 7,
            description: None,
        };
        let json = serde_json::to_value(&subject).unwrap();
        assert_eq!(json["branch"], "b1");
        assert_eq!(json["semester"], 7);
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_store_stats_count_lookup() {
        let stats = StoreStats {
            collections: vec![(Collection::Notes, 3), (Collection::Branches, 1)],
            db_size_bytes: 0,
        };
        assert_eq!(stats.count(Collection::Notes), 3);
        assert_eq!(stats.count(Collection::SearchLogs), 0);
    }

    #[test]
    fn test_search_results_total() {
        let results = SearchResults::default();
        assert!(results.is_empty());
        assert_eq!(results.total(), 0);
    }
}
