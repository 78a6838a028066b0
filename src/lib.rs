//! noteshare: study notes organized by branch, year and semester
//!
//! Students browse PDF notes by branch (e.g. Computer Science), year and
//! semester, search them, and see what is trending. Admins manage the
//! catalog and upload PDFs to a hosted file store. Everything is kept as
//! schema-less JSON documents in SQLite.
//!
//! ## Layers
//!
//! - `db`: document store over SQLite (get/query/insert/update/delete)
//! - `catalog`: typed per-collection operations with reference checks
//! - `aggregate`: branches/subjects with notes, years, semesters, trending
//! - `search`: substring search over subjects and published notes
//! - `counters`: view/download counters and the repeat-hit filter
//! - `upload`: PDF validation and hosted uploads
//! - `api`: the HTTP API, with `auth` guarding admin routes
//!
//! ## HTTP API
//!
//! - `GET /api/home` - Branches with notes and dashboard totals
//! - `GET /api/branches/{id}/years/{year}` - Subjects and semesters for a year
//! - `GET /api/search?q=` - Search subjects and notes
//! - `GET /api/trending` - Most downloaded notes
//! - `POST /api/notes/{id}/view` - Count a view
//! - `/api/admin/*` - Catalog management and uploads

pub mod aggregate;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod counters;
pub mod db;
pub mod error;
pub mod search;
pub mod types;
pub mod upload;

#[cfg(test)]
mod fixtures;
