//! Database location and opening

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::db::Database;

const DB_DIR: &str = ".noteshare";
const DB_FILE: &str = "notes.db";

/// Database path under a data root
pub fn database_path(root: &str) -> PathBuf {
    PathBuf::from(root).join(DB_DIR).join(DB_FILE)
}

/// Open or create the database under a data root
pub fn open_root_database(root: &str) -> Result<Database> {
    let dir = PathBuf::from(root).join(DB_DIR);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Could not create {}", dir.display()))?;
    let db_path = database_path(root);
    Database::open(&db_path).with_context(|| format!("Could not open {}", db_path.display()))
}

/// Canonicalize and validate a directory path
pub fn canonicalize_path(path: &str) -> Result<String> {
    let canonical = Path::new(path)
        .canonicalize()
        .with_context(|| format!("Invalid path: {}", path))?;
    Ok(canonical.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Collection, NewBranch};
    use tempfile::TempDir;

    #[test]
    fn test_open_root_database_creates_directory() {
        let dir = TempDir::new().unwrap();
        let root = canonicalize_path(dir.path().to_str().unwrap()).unwrap();

        {
            let db = open_root_database(&root).unwrap();
            db.insert(
                Collection::Branches,
                &NewBranch {
                    name: "Mechanical".to_string(),
                    code: "me".to_string(),
                    description: None,
                },
            )
            .unwrap();
        }

        assert!(database_path(&root).exists());
        let db = open_root_database(&root).unwrap();
        assert_eq!(db.count(Collection::Branches).unwrap(), 1);
    }

    #[test]
    fn test_canonicalize_rejects_missing_path() {
        assert!(canonicalize_path("/definitely/not/here").is_err());
    }
}
