//! Cross-collection views
//!
//! Computes which branches and subjects have content, the years and
//! semesters available under a branch, the dashboard totals and the
//! trending list. Nothing is cached: every call re-reads the collections
//! it needs.

use std::collections::{BTreeSet, HashSet};

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::catalog::Catalog;
use crate::db::{Database, Direction, Query, MAX_IN_FILTER};
use crate::error::StoreResult;
use crate::types::{Branch, Collection, DashboardStats, Note, Subject};

/// Number of trending notes shown when the caller does not ask for a limit
pub const DEFAULT_TRENDING_LIMIT: usize = 5;

/// Aggregation operations on the note catalog
pub struct Aggregator<'a> {
    db: &'a Database,
}

impl<'a> Aggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Branches referenced by at least one subject, ordered by name
    pub fn branches_with_notes(&self) -> StoreResult<Vec<Branch>> {
        let subjects: Vec<Subject> = self.db.query_as(Collection::Subjects, &Query::new())?;
        let ids = distinct(subjects.iter().map(|s| s.branch.as_str()));
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut branches: Vec<Branch> = self.fetch_by_ids(Collection::Branches, &ids)?;
        branches.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(branches)
    }

    /// Subjects with at least one published note, ordered by name
    pub fn subjects_with_notes(&self) -> StoreResult<Vec<Subject>> {
        let notes = Catalog::new(self.db).published_notes()?;
        let ids = distinct(notes.iter().map(|n| n.subject_id.as_str()));
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut subjects: Vec<Subject> = self.fetch_by_ids(Collection::Subjects, &ids)?;
        subjects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(subjects)
    }

    /// Years that have at least one subject in the branch, ascending
    pub fn available_years(&self, branch_id: &str) -> StoreResult<Vec<u32>> {
        let subjects = Catalog::new(self.db).subjects_by_branch(branch_id)?;
        let years: BTreeSet<u32> = subjects.iter().map(|s| s.year).collect();
        Ok(years.into_iter().collect())
    }

    /// Semesters that have at least one subject in the branch (and year), ascending
    pub fn available_semesters(&self, branch_id: &str, year: Option<u32>) -> StoreResult<Vec<u32>> {
        let catalog = Catalog::new(self.db);
        let subjects = match year {
            Some(year) => catalog.subjects_by_branch_and_year(branch_id, year)?,
            None => catalog.subjects_by_branch(branch_id)?,
        };
        let semesters: BTreeSet<u32> = subjects.iter().map(|s| s.semester).collect();
        Ok(semesters.into_iter().collect())
    }

    /// Collection totals, summed counters and the trending slice
    pub fn dashboard_stats(&self) -> StoreResult<DashboardStats> {
        let total_branches = self.db.count(Collection::Branches)?;
        let total_subjects = self.db.count(Collection::Subjects)?;
        let notes: Vec<Note> = self.db.query_as(Collection::Notes, &Query::new())?;

        let total_views = notes.iter().map(|n| n.views).sum();
        let total_downloads = notes.iter().map(|n| n.downloads).sum();

        Ok(DashboardStats {
            total_branches,
            total_subjects,
            total_notes: notes.len() as u64,
            total_views,
            total_downloads,
            trending_notes: self.trending_notes(DEFAULT_TRENDING_LIMIT)?,
        })
    }

    /// Published notes by downloads, then views, both descending
    pub fn trending_notes(&self, limit: usize) -> StoreResult<Vec<Note>> {
        let notes: Vec<Note> = self.db.query_as(
            Collection::Notes,
            &Query::new()
                .eq("isPublished", true)
                .order_by("downloads", Direction::Desc)
                .order_by("views", Direction::Desc),
        )?;
        Ok(notes.into_iter().take(limit).collect())
    }

    /// Fetch documents by id, one IN-filter query per batch of ids
    fn fetch_by_ids<T: DeserializeOwned>(&self, collection: Collection, ids: &[String]) -> StoreResult<Vec<T>> {
        let mut documents = Vec::with_capacity(ids.len());
        for batch in ids.chunks(MAX_IN_FILTER) {
            debug!("fetching {} {} by id", batch.len(), collection.as_str());
            let found: Vec<T> =
                self.db
                    .query_as(collection, &Query::new().id_in(batch.iter().cloned()))?;
            documents.extend(found);
        }
        Ok(documents)
    }
}

/// Distinct ids in order of first appearance
fn distinct<'s>(ids: impl Iterator<Item = &'s str>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id))
        .map(str::to_string)
        .collect()
}
