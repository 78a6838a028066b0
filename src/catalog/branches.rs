//! Branch operations

use serde_json::json;
use tracing::info;

use super::{optional, required, Catalog};
use crate::db::{Direction, Query};
use crate::error::StoreResult;
use crate::types::{Branch, BranchPatch, Collection, NewBranch};

impl<'a> Catalog<'a> {
    /// All branches ordered by name
    pub fn all_branches(&self) -> StoreResult<Vec<Branch>> {
        self.db.query_as(
            Collection::Branches,
            &Query::new().order_by("name", Direction::Asc),
        )
    }

    pub fn branch(&self, id: &str) -> StoreResult<Option<Branch>> {
        self.db.get_as(Collection::Branches, id)
    }

    /// Add a branch; the short code is stored lowercased
    pub fn add_branch(&self, branch: &NewBranch) -> StoreResult<String> {
        let name = required(&branch.name, "branch name")?;
        let code = required(&branch.code, "branch code")?.to_lowercase();
        let mut body = json!({ "name": name, "code": code });
        if let Some(description) = optional(branch.description.as_deref()) {
            body["description"] = json!(description);
        }

        let id = self.db.insert(Collection::Branches, &body)?;
        info!("Added branch {} ({})", name, id);
        Ok(id)
    }

    pub fn update_branch(&self, id: &str, patch: &BranchPatch) -> StoreResult<()> {
        let mut patch = patch.clone();
        if let Some(ref name) = patch.name {
            patch.name = Some(required(name, "branch name")?);
        }
        if let Some(ref code) = patch.code {
            patch.code = Some(required(code, "branch code")?.to_lowercase());
        }
        self.db.update(Collection::Branches, id, &patch)
    }

    /// Delete a branch; its subjects are left in place
    pub fn delete_branch(&self, id: &str) -> StoreResult<bool> {
        let removed = self.db.delete(Collection::Branches, id)?;
        if removed {
            info!("Deleted branch {}", id);
        }
        Ok(removed)
    }
}
