//! Command implementations for CLI operations

use anyhow::{Context, Result};
use tracing::info;

use crate::aggregate::Aggregator;
use crate::config::Config;
use crate::db::Database;
use crate::search::Searcher;
use crate::types::Collection;
use crate::upload::format_file_size;

use super::db_utils::{canonicalize_path, database_path, open_root_database};

/// Open the database for a read-only command, or explain why there is none
fn open_existing(path: &str) -> Result<Option<Database>> {
    let root = canonicalize_path(path)?;
    let db_path = database_path(&root);
    if !db_path.exists() {
        println!("No database found at {}", db_path.display());
        println!("Start the server with 'noteshare serve' to create one.");
        return Ok(None);
    }
    Ok(Some(Database::open(&db_path)?))
}

/// Show document counts for a data root
pub fn status_command(path: &str) -> Result<()> {
    let Some(db) = open_existing(path)? else {
        return Ok(());
    };
    let stats = db.get_stats()?;
    let totals = Aggregator::new(&db).dashboard_stats()?;

    println!("noteshare Status");
    println!("================");
    println!("Database: {}", database_path(&canonicalize_path(path)?).display());
    println!("Size: {}", format_file_size(stats.db_size_bytes));
    println!();
    for (collection, count) in &stats.collections {
        println!("  {}: {}", collection.as_str(), count);
    }
    println!();
    println!("Views: {}", totals.total_views);
    println!("Downloads: {}", totals.total_downloads);

    Ok(())
}

/// Search subjects and published notes
pub fn search_command(path: &str, query: &str) -> Result<()> {
    let Some(db) = open_existing(path)? else {
        return Ok(());
    };
    let results = Searcher::new(&db).search(query, Some("noteshare-cli"))?;

    if results.is_empty() {
        println!("Nothing found matching '{}'", query.trim());
        return Ok(());
    }

    println!("Found {} results matching '{}':\n", results.total(), query.trim());
    for subject in &results.subjects {
        match &subject.code {
            Some(code) => println!("  subject {} ({}) - year {}, semester {}", subject.name, code, subject.year, subject.semester),
            None => println!("  subject {} - year {}, semester {}", subject.name, subject.year, subject.semester),
        }
    }
    for note in &results.notes {
        println!("  note {} - {}", note.title, note.pdf_url);
        if let Some(ref description) = note.description {
            let line = description.lines().next().unwrap_or(description);
            if line.chars().count() > 80 {
                let short: String = line.chars().take(80).collect();
                println!("    {}...", short);
            } else {
                println!("    {}", line);
            }
        }
    }

    Ok(())
}

/// List the most downloaded published notes
pub fn trending_command(path: &str, limit: usize) -> Result<()> {
    let Some(db) = open_existing(path)? else {
        return Ok(());
    };
    let notes = Aggregator::new(&db).trending_notes(limit)?;

    if notes.is_empty() {
        println!("No published notes yet");
        return Ok(());
    }

    println!("Top {} notes:\n", notes.len());
    for (rank, note) in notes.iter().enumerate() {
        println!(
            "  {}. {} - {} downloads, {} views",
            rank + 1,
            note.title,
            note.downloads,
            note.views
        );
    }

    Ok(())
}

/// Open the database the server will use
///
/// Returns the data root alongside the handle.
pub fn initialize_server_database(config: &Config) -> Result<(String, Database)> {
    let root = match &config.root {
        Some(root) => root.clone(),
        None => std::env::current_dir()
            .context("Could not determine data root")?
            .display()
            .to_string(),
    };
    let root = canonicalize_path(&root)?;

    let db = if config.in_memory {
        info!("Using in-memory database (no filesystem writes)");
        Database::in_memory()?
    } else {
        open_root_database(&root)?
    };

    let stats = db.get_stats()?;
    if stats.count(Collection::Notes) == 0 {
        info!("No notes yet, add some from the admin API");
    } else {
        info!(
            "Catalog loaded: {} branches, {} subjects, {} notes",
            stats.count(Collection::Branches),
            stats.count(Collection::Subjects),
            stats.count(Collection::Notes)
        );
    }

    Ok((root, db))
}
