//! View and download counters
//!
//! A note carries its own `views`/`downloads` fields and a parallel
//! `noteStats` record. Both are bumped inside one transaction so a failed
//! stats write never leaves the note counter ahead of its stats. A note
//! without a stats record still counts; its stats simply stay absent.
//!
//! [`HitFilter`] sits in front of the public endpoints and admits one hit
//! per (session, note, counter) within a time window.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::debug;

use crate::db::{server_timestamp, Database, Query};
use crate::error::StoreResult;
use crate::types::{Collection, CounterKind};

/// Entries kept before expired hits are swept
const PRUNE_THRESHOLD: usize = 1024;

/// Counter operations on notes
pub struct Counters<'a> {
    db: &'a Database,
}

impl<'a> Counters<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    pub fn increment_views(&self, note_id: &str) -> StoreResult<bool> {
        self.increment(note_id, CounterKind::Views)
    }

    pub fn increment_downloads(&self, note_id: &str) -> StoreResult<bool> {
        self.increment(note_id, CounterKind::Downloads)
    }

    /// Bump a note counter and its stats record
    ///
    /// Returns whether a stats record was found and updated. Fails with
    /// `NotFound` when the note itself does not exist.
    pub fn increment(&self, note_id: &str, kind: CounterKind) -> StoreResult<bool> {
        self.db.transaction(|db| {
            db.increment(Collection::Notes, note_id, kind.field(), 1)?;

            let stats = db.query(Collection::NoteStats, &Query::new().eq("noteId", note_id))?;
            let Some(stat) = stats.first() else {
                debug!("no stats record for note {}", note_id);
                return Ok(false);
            };

            db.increment(Collection::NoteStats, &stat.id, kind.field(), 1)?;
            let mut stamp = Map::new();
            stamp.insert(
                kind.stamp_field().to_string(),
                Value::String(server_timestamp()),
            );
            db.update(Collection::NoteStats, &stat.id, &stamp)?;
            Ok(true)
        })
    }
}

/// Admits at most one counter hit per (session, note, kind) per window
#[derive(Debug)]
pub struct HitFilter {
    window: Duration,
    seen: HashMap<(String, String, CounterKind), Instant>,
    last_sweep: Option<Instant>,
    sweeps: u64,
}

impl HitFilter {
    /// A zero window admits every hit
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
            last_sweep: None,
            sweeps: 0,
        }
    }

    /// Whether this hit should be counted; records it if so
    pub fn admit(&mut self, session: &str, note_id: &str, kind: CounterKind, now: Instant) -> bool {
        if self.window.is_zero() {
            return true;
        }
        if self.seen.len() >= PRUNE_THRESHOLD && self.sweep_due(now) {
            self.prune(now);
        }

        let key = (session.to_string(), note_id.to_string(), kind);
        match self.seen.get(&key) {
            Some(&at) if now.saturating_duration_since(at) < self.window => false,
            _ => {
                self.seen.insert(key, now);
                true
            }
        }
    }

    /// Number of hits currently remembered
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// At most one sweep per window; entries younger than that cannot expire
    fn sweep_due(&self, now: Instant) -> bool {
        self.last_sweep
            .map_or(true, |at| now.saturating_duration_since(at) >= self.window)
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        let before = self.seen.len();
        self.seen
            .retain(|_, at| now.saturating_duration_since(*at) < window);
        self.last_sweep = Some(now);
        self.sweeps += 1;
        debug!("hit filter sweep dropped {} of {}", before - self.seen.len(), before);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::error::StoreError;
    use crate::fixtures::{note_in, seed_subject};
    use serde_json::json;

    fn seeded_note(db: &Database) -> String {
        let (_, subject) = seed_subject(db);
        Catalog::new(db)
            .add_note(&note_in(&subject, "Sorting", true))
            .unwrap()
    }

    #[test]
    fn test_views_and_downloads_increment_both_records() {
        let db = Database::in_memory().unwrap();
        let note = seeded_note(&db);
        db.update(Collection::Notes, &note, &json!({ "views": 7, "downloads": 2 }))
            .unwrap();

        let counters = Counters::new(&db);
        assert!(counters.increment_views(&note).unwrap());
        assert!(counters.increment_views(&note).unwrap());
        assert!(counters.increment_downloads(&note).unwrap());

        let catalog = Catalog::new(&db);
        let updated = catalog.note(&note).unwrap().unwrap();
        assert_eq!(updated.views, 9);
        assert_eq!(updated.downloads, 3);

        // The stats record started at zero and only sees the increments
        let stats = catalog.stats_for_note(&note).unwrap();
        assert_eq!(stats[0].views, 2);
        assert_eq!(stats[0].downloads, 1);
        assert!(stats[0].last_viewed.is_some());
        assert!(stats[0].last_downloaded.is_some());
    }

    #[test]
    fn test_missing_stats_record_lets_counters_diverge() {
        let db = Database::in_memory().unwrap();
        let note = seeded_note(&db);
        let catalog = Catalog::new(&db);
        for stat in catalog.stats_for_note(&note).unwrap() {
            db.delete(Collection::NoteStats, &stat.id).unwrap();
        }

        assert!(!Counters::new(&db).increment_views(&note).unwrap());
        assert_eq!(catalog.note(&note).unwrap().unwrap().views, 1);
        assert!(catalog.stats_for_note(&note).unwrap().is_empty());
    }

    #[test]
    fn test_failed_stats_write_rolls_back_note_counter() {
        let db = Database::in_memory().unwrap();
        let note = seeded_note(&db);
        db.execute_batch(
            "CREATE TRIGGER reject_stats BEFORE UPDATE ON documents \
             WHEN NEW.collection = 'noteStats' \
             BEGIN SELECT RAISE(ABORT, 'stats store unavailable'); END;",
        )
        .unwrap();

        let err = Counters::new(&db).increment_downloads(&note).unwrap_err();
        assert!(matches!(err, StoreError::Sqlite(_)));

        let catalog = Catalog::new(&db);
        assert_eq!(catalog.note(&note).unwrap().unwrap().downloads, 0);
        assert_eq!(catalog.stats_for_note(&note).unwrap()[0].downloads, 0);
    }

    #[test]
    fn test_increment_unknown_note_is_not_found() {
        let db = Database::in_memory().unwrap();
        let err = Counters::new(&db).increment_views("ghost").unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_hit_filter_admits_once_per_window() {
        let mut filter = HitFilter::new(Duration::from_secs(60));
        let start = Instant::now();

        assert!(filter.admit("s1", "n1", CounterKind::Views, start));
        assert!(!filter.admit("s1", "n1", CounterKind::Views, start + Duration::from_secs(30)));
        // Different kind, note or session are independent
        assert!(filter.admit("s1", "n1", CounterKind::Downloads, start));
        assert!(filter.admit("s1", "n2", CounterKind::Views, start));
        assert!(filter.admit("s2", "n1", CounterKind::Views, start));
        // Counted again once the window has passed
        assert!(filter.admit("s1", "n1", CounterKind::Views, start + Duration::from_secs(61)));
    }

    #[test]
    fn test_hit_filter_zero_window_admits_everything() {
        let mut filter = HitFilter::new(Duration::ZERO);
        let now = Instant::now();
        assert!(filter.admit("s", "n", CounterKind::Views, now));
        assert!(filter.admit("s", "n", CounterKind::Views, now));
        assert!(filter.is_empty());
    }

    #[test]
    fn test_hit_filter_prunes_expired_entries() {
        let mut filter = HitFilter::new(Duration::from_secs(10));
        let start = Instant::now();
        for i in 0..PRUNE_THRESHOLD {
            filter.admit("s", &format!("n{}", i), CounterKind::Views, start);
        }
        assert_eq!(filter.len(), PRUNE_THRESHOLD);

        let later = start + Duration::from_secs(11);
        assert!(filter.admit("s", "fresh", CounterKind::Views, later));
        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn test_hit_filter_sweeps_live_entries_once_per_window() {
        let mut filter = HitFilter::new(Duration::from_secs(60));
        let start = Instant::now();
        for i in 0..PRUNE_THRESHOLD {
            filter.admit(&format!("s{}", i), "n", CounterKind::Views, start);
        }

        // First admit over the threshold sweeps, but every entry is live
        let soon = start + Duration::from_secs(1);
        assert!(filter.admit("rotating-0", "n", CounterKind::Views, soon));
        assert_eq!(filter.sweeps, 1);
        assert_eq!(filter.len(), PRUNE_THRESHOLD + 1);

        // Further admits within the window do not rescan the map
        for i in 1..500 {
            let at = soon + Duration::from_millis(i);
            assert!(filter.admit(&format!("rotating-{}", i), "n", CounterKind::Views, at));
        }
        assert_eq!(filter.sweeps, 1);
        assert_eq!(filter.len(), PRUNE_THRESHOLD + 500);

        // A window later the next sweep drops everything that expired
        let later = soon + Duration::from_secs(60);
        assert!(filter.admit("late", "n", CounterKind::Views, later));
        assert_eq!(filter.sweeps, 2);
        assert!(filter.len() < PRUNE_THRESHOLD);
    }
}
