//! Subject operations

use serde_json::json;
use tracing::info;

use super::{optional, required, Catalog};
use crate::db::{Direction, Query};
use crate::error::{StoreError, StoreResult};
use crate::types::{Collection, NewSubject, Subject, SubjectPatch, SEMESTERS, YEARS};

impl<'a> Catalog<'a> {
    /// All subjects ordered by name
    pub fn all_subjects(&self) -> StoreResult<Vec<Subject>> {
        self.db.query_as(
            Collection::Subjects,
            &Query::new().order_by("name", Direction::Asc),
        )
    }

    pub fn subject(&self, id: &str) -> StoreResult<Option<Subject>> {
        self.db.get_as(Collection::Subjects, id)
    }

    /// Subjects of a branch ordered by name
    pub fn subjects_by_branch(&self, branch_id: &str) -> StoreResult<Vec<Subject>> {
        self.db.query_as(
            Collection::Subjects,
            &Query::new()
                .eq("branch", branch_id)
                .order_by("name", Direction::Asc),
        )
    }

    /// Subjects of a branch and year ordered by semester, then name
    pub fn subjects_by_branch_and_year(&self, branch_id: &str, year: u32) -> StoreResult<Vec<Subject>> {
        self.db.query_as(
            Collection::Subjects,
            &Query::new()
                .eq("branch", branch_id)
                .eq("year", year)
                .order_by("semester", Direction::Asc)
                .order_by("name", Direction::Asc),
        )
    }

    /// Subjects of a branch, year and semester ordered by name
    pub fn subjects_by_branch_year_semester(
        &self,
        branch_id: &str,
        year: u32,
        semester: u32,
    ) -> StoreResult<Vec<Subject>> {
        self.db.query_as(
            Collection::Subjects,
            &Query::new()
                .eq("branch", branch_id)
                .eq("year", year)
                .eq("semester", semester)
                .order_by("name", Direction::Asc),
        )
    }

    /// Add a subject under an existing branch
    pub fn add_subject(&self, subject: &NewSubject) -> StoreResult<String> {
        let name = required(&subject.name, "subject name")?;
        check_term(subject.year, subject.semester)?;
        self.require(Collection::Branches, &subject.branch)?;

        let mut body = json!({
            "name": name,
            "branch": subject.branch,
            "year": subject.year,
            "semester": subject.semester,
        });
        if let Some(code) = optional(subject.code.as_deref()) {
            body["code"] = json!(code);
        }
        if let Some(description) = optional(subject.description.as_deref()) {
            body["description"] = json!(description);
        }

        let id = self.db.insert(Collection::Subjects, &body)?;
        info!("Added subject {} ({})", name, id);
        Ok(id)
    }

    pub fn update_subject(&self, id: &str, patch: &SubjectPatch) -> StoreResult<()> {
        let mut patch = patch.clone();
        if let Some(ref name) = patch.name {
            patch.name = Some(required(name, "subject name")?);
        }
        if patch.year.is_some() || patch.semester.is_some() {
            let current = self
                .subject(id)?
                .ok_or_else(|| StoreError::NotFound {
                    collection: Collection::Subjects,
                    id: id.to_string(),
                })?;
            check_term(
                patch.year.unwrap_or(current.year),
                patch.semester.unwrap_or(current.semester),
            )?;
        }
        if let Some(ref branch) = patch.branch {
            self.require(Collection::Branches, branch)?;
        }
        self.db.update(Collection::Subjects, id, &patch)
    }

    /// Delete a subject; its notes are left in place
    pub fn delete_subject(&self, id: &str) -> StoreResult<bool> {
        let removed = self.db.delete(Collection::Subjects, id)?;
        if removed {
            info!("Deleted subject {}", id);
        }
        Ok(removed)
    }
}

fn check_term(year: u32, semester: u32) -> StoreResult<()> {
    if !YEARS.contains(&year) {
        return Err(StoreError::Validation(format!(
            "year must be between {} and {}",
            YEARS.start(),
            YEARS.end()
        )));
    }
    if !SEMESTERS.contains(&semester) {
        return Err(StoreError::Validation(format!(
            "semester must be between {} and {}",
            SEMESTERS.start(),
            SEMESTERS.end()
        )));
    }
    Ok(())
}
