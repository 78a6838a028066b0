//! Substring search over subjects and published notes
//!
//! A linear scan: both collections are loaded and filtered in memory with a
//! case-insensitive substring test. Results keep collection order (subjects
//! by name, notes newest first). Every non-empty search is logged.

use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::db::Database;
use crate::error::StoreResult;
use crate::types::{Note, SearchResults, Subject};

/// Search operations on the note catalog
pub struct Searcher<'a> {
    db: &'a Database,
}

impl<'a> Searcher<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Find subjects and published notes whose text contains `query`
    ///
    /// A blank query returns nothing without reading the store. A failed log
    /// write is reported through `tracing` only.
    pub fn search(&self, query: &str, user_agent: Option<&str>) -> StoreResult<SearchResults> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(SearchResults::default());
        }

        let catalog = Catalog::new(self.db);
        let subjects: Vec<Subject> = catalog
            .all_subjects()?
            .into_iter()
            .filter(|s| subject_matches(s, &needle))
            .collect();
        let notes: Vec<Note> = catalog
            .published_notes()?
            .into_iter()
            .filter(|n| note_matches(n, &needle))
            .collect();

        let results = SearchResults { notes, subjects };
        debug!("search '{}' matched {} documents", needle, results.total());

        if let Err(e) = catalog.log_search(&needle, results.total() as u64, user_agent) {
            warn!("Failed to log search '{}': {}", needle, e);
        }

        Ok(results)
    }
}

fn contains(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn subject_matches(subject: &Subject, needle: &str) -> bool {
    contains(Some(subject.name.as_str()), needle) || contains(subject.code.as_deref(), needle)
}

fn note_matches(note: &Note, needle: &str) -> bool {
    contains(Some(note.title.as_str()), needle)
        || contains(note.description.as_deref(), needle)
        || contains(note.unit.as_deref(), needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{note_in, seed_subject};
    use crate::types::Collection;

    #[test]
    fn test_search_matches_note_titles() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        let catalog = Catalog::new(&db);
        let hit = catalog
            .add_note(&note_in(&subject, "Data Structures Unit 1", true))
            .unwrap();
        catalog
            .add_note(&note_in(&subject, "Operating Systems", true))
            .unwrap();

        let results = Searcher::new(&db).search("data", None).unwrap();
        assert_eq!(results.notes.len(), 1);
        assert_eq!(results.notes[0].id, hit);
        // The seeded subject is named "Data Structures"
        assert_eq!(results.subjects.len(), 1);
    }

    #[test]
    fn test_blank_query_skips_store() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        Catalog::new(&db)
            .add_note(&note_in(&subject, "Data Structures Unit 1", true))
            .unwrap();

        let searcher = Searcher::new(&db);
        for query in ["", "   "] {
            let before = db.query_count();
            let results = searcher.search(query, None).unwrap();
            assert!(results.is_empty());
            assert_eq!(db.query_count(), before);
        }
        assert_eq!(db.count(Collection::SearchLogs).unwrap(), 0);
    }

    #[test]
    fn test_search_is_case_insensitive_across_fields() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        let catalog = Catalog::new(&db);
        let mut by_unit = note_in(&subject, "Trees", true);
        by_unit.unit = Some("UNIT 4".to_string());
        let unit_hit = catalog.add_note(&by_unit).unwrap();
        let mut by_description = note_in(&subject, "Graphs", true);
        by_description.description = Some("Covers BFS and unit tests".to_string());
        let description_hit = catalog.add_note(&by_description).unwrap();

        let results = Searcher::new(&db).search("  Unit ", None).unwrap();
        let mut ids: Vec<String> = results.notes.into_iter().map(|n| n.id).collect();
        ids.sort();
        let mut expected = vec![unit_hit, description_hit];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_search_matches_subject_code_and_skips_drafts() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        Catalog::new(&db)
            .add_note(&note_in(&subject, "cs201 draft", false))
            .unwrap();

        let results = Searcher::new(&db).search("cs201", None).unwrap();
        assert_eq!(results.subjects.len(), 1);
        assert_eq!(results.subjects[0].id, subject);
        assert!(results.notes.is_empty());
    }

    #[test]
    fn test_search_logs_query_and_count() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        Catalog::new(&db)
            .add_note(&note_in(&subject, "Data Structures Unit 1", true))
            .unwrap();

        Searcher::new(&db)
            .search(" DATA ", Some("test-agent"))
            .unwrap();

        let logs = Catalog::new(&db).search_logs().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].query, "data");
        assert_eq!(logs[0].results_count, 2);
        assert_eq!(logs[0].user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn test_failed_log_write_is_swallowed() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        Catalog::new(&db)
            .add_note(&note_in(&subject, "Data Structures Unit 1", true))
            .unwrap();
        db.execute_batch(
            "CREATE TRIGGER reject_logs BEFORE INSERT ON documents \
             WHEN NEW.collection = 'searchLogs' \
             BEGIN SELECT RAISE(ABORT, 'log store unavailable'); END;",
        )
        .unwrap();

        let results = Searcher::new(&db).search("data", None).unwrap();
        assert_eq!(results.notes.len(), 1);
        assert_eq!(db.count(Collection::SearchLogs).unwrap(), 0);
    }
}
