//! Note operations

use serde_json::json;
use tracing::info;

use super::{optional, required, Catalog};
use crate::db::{Direction, Query};
use crate::error::StoreResult;
use crate::types::{Collection, NewNote, Note, NotePatch, NoteWithSubject};

impl<'a> Catalog<'a> {
    /// Published notes, newest first
    pub fn published_notes(&self) -> StoreResult<Vec<Note>> {
        self.db.query_as(
            Collection::Notes,
            &Query::new()
                .eq("isPublished", true)
                .order_by("createdAt", Direction::Desc),
        )
    }

    /// Every note including unpublished ones, newest first
    pub fn all_notes(&self) -> StoreResult<Vec<Note>> {
        self.db.query_as(
            Collection::Notes,
            &Query::new().order_by("createdAt", Direction::Desc),
        )
    }

    /// Published notes of a subject, newest first
    pub fn notes_by_subject(&self, subject_id: &str) -> StoreResult<Vec<Note>> {
        self.db.query_as(
            Collection::Notes,
            &Query::new()
                .eq("subjectId", subject_id)
                .eq("isPublished", true)
                .order_by("createdAt", Direction::Desc),
        )
    }

    pub fn note(&self, id: &str) -> StoreResult<Option<Note>> {
        self.db.get_as(Collection::Notes, id)
    }

    /// Every note with its subject name resolved, for the admin listing
    pub fn notes_with_subjects(&self) -> StoreResult<Vec<NoteWithSubject>> {
        let subjects = self.all_subjects()?;
        let notes = self.all_notes()?;
        Ok(notes
            .into_iter()
            .map(|note| {
                let subject_name = subjects
                    .iter()
                    .find(|s| s.id == note.subject_id)
                    .map(|s| s.name.clone());
                NoteWithSubject { note, subject_name }
            })
            .collect())
    }

    /// Add a note under an existing subject together with its zeroed stats record
    pub fn add_note(&self, note: &NewNote) -> StoreResult<String> {
        let title = required(&note.title, "note title")?;
        let pdf_url = required(&note.pdf_url, "PDF URL")?;
        self.require(Collection::Subjects, &note.subject_id)?;

        let mut body = json!({
            "subjectId": note.subject_id,
            "title": title,
            "pdfUrl": pdf_url,
            "isPublished": note.is_published,
            "views": 0,
            "downloads": 0,
        });
        if let Some(description) = optional(note.description.as_deref()) {
            body["description"] = json!(description);
        }
        if let Some(unit) = optional(note.unit.as_deref()) {
            body["unit"] = json!(unit);
        }

        let id = self.db.transaction(|db| {
            let id = db.insert(Collection::Notes, &body)?;
            db.insert(
                Collection::NoteStats,
                &json!({ "noteId": id, "views": 0, "downloads": 0 }),
            )?;
            Ok(id)
        })?;
        info!("Added note {} ({})", title, id);
        Ok(id)
    }

    pub fn update_note(&self, id: &str, patch: &NotePatch) -> StoreResult<()> {
        let mut patch = patch.clone();
        if let Some(ref title) = patch.title {
            patch.title = Some(required(title, "note title")?);
        }
        if let Some(ref subject) = patch.subject_id {
            self.require(Collection::Subjects, subject)?;
        }
        self.db.update(Collection::Notes, id, &patch)
    }

    pub fn set_published(&self, id: &str, is_published: bool) -> StoreResult<()> {
        self.db
            .update(Collection::Notes, id, &json!({ "isPublished": is_published }))?;
        info!(
            "Note {} {}",
            id,
            if is_published { "published" } else { "unpublished" }
        );
        Ok(())
    }

    /// Delete a note and every stats record pointing at it
    pub fn delete_note(&self, id: &str) -> StoreResult<bool> {
        let removed = self.db.transaction(|db| {
            let removed = db.delete(Collection::Notes, id)?;
            let stats = db.query(Collection::NoteStats, &Query::new().eq("noteId", id))?;
            for stat in stats {
                db.delete(Collection::NoteStats, &stat.id)?;
            }
            Ok(removed)
        })?;
        if removed {
            info!("Deleted note {}", id);
        }
        Ok(removed)
    }
}
