//! Public browsing, search and counter routes

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AppState, SessionKey};
use crate::aggregate::{Aggregator, DEFAULT_TRENDING_LIMIT};
use crate::catalog::Catalog;
use crate::counters::Counters;
use crate::error::AppError;
use crate::search::Searcher;
use crate::types::{Branch, CounterKind, DashboardStats, Note, SearchResults, Subject, YEARS};

/// Upper bound on `?limit=` for trending notes
const MAX_TRENDING_LIMIT: usize = 50;

#[derive(Serialize)]
pub struct HomePage {
    pub branches: Vec<Branch>,
    pub stats: DashboardStats,
}

#[derive(Serialize)]
pub struct BranchPage {
    pub branch: Branch,
    pub years: Vec<u32>,
}

#[derive(Serialize)]
pub struct YearPage {
    pub branch: Branch,
    pub year: u32,
    pub subjects: Vec<Subject>,
    pub semesters: Vec<u32>,
}

#[derive(Serialize)]
pub struct SubjectPage {
    pub subject: Subject,
    pub branch: Option<Branch>,
    pub notes: Vec<Note>,
}

#[derive(Serialize)]
pub struct CounterResponse {
    pub counted: bool,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct TrendingParams {
    pub limit: Option<usize>,
}

pub async fn home(State(state): State<AppState>) -> Result<Json<HomePage>, AppError> {
    let db = state.store()?;
    let aggregator = Aggregator::new(&db);
    Ok(Json(HomePage {
        branches: aggregator.branches_with_notes()?,
        stats: aggregator.dashboard_stats()?,
    }))
}

pub async fn branches(State(state): State<AppState>) -> Result<Json<Vec<Branch>>, AppError> {
    let db = state.store()?;
    Ok(Json(Catalog::new(&db).all_branches()?))
}

pub async fn branch(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BranchPage>, AppError> {
    let db = state.store()?;
    let branch = Catalog::new(&db)
        .branch(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Branch {}", id)))?;
    let years = Aggregator::new(&db).available_years(&id)?;
    Ok(Json(BranchPage { branch, years }))
}

pub async fn branch_year(
    State(state): State<AppState>,
    Path((id, year)): Path<(String, String)>,
) -> Result<Json<YearPage>, AppError> {
    let year = parse_year(&year)?;

    let db = state.store()?;
    let catalog = Catalog::new(&db);
    let branch = catalog
        .branch(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Branch {}", id)))?;
    let subjects = catalog.subjects_by_branch_and_year(&id, year)?;
    let semesters = Aggregator::new(&db).available_semesters(&id, Some(year))?;
    Ok(Json(YearPage {
        branch,
        year,
        subjects,
        semesters,
    }))
}

/// Path years outside 1..=4, numeric or not, are a JSON 400
fn parse_year(raw: &str) -> Result<u32, AppError> {
    raw.parse::<u32>()
        .ok()
        .filter(|year| YEARS.contains(year))
        .ok_or_else(|| {
            AppError::BadRequest(format!(
                "Year must be between {} and {}",
                YEARS.start(),
                YEARS.end()
            ))
        })
}

pub async fn subjects(State(state): State<AppState>) -> Result<Json<Vec<Subject>>, AppError> {
    let db = state.store()?;
    Ok(Json(Aggregator::new(&db).subjects_with_notes()?))
}

pub async fn subject(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SubjectPage>, AppError> {
    let db = state.store()?;
    let catalog = Catalog::new(&db);
    let subject = catalog
        .subject(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Subject {}", id)))?;
    let branch = catalog.branch(&subject.branch)?;
    let notes = catalog.notes_by_subject(&id)?;
    Ok(Json(SubjectPage {
        subject,
        branch,
        notes,
    }))
}

pub async fn search(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResults>, AppError> {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let db = state.store()?;
    Ok(Json(Searcher::new(&db).search(&params.q, user_agent)?))
}

pub async fn trending(
    State(state): State<AppState>,
    Query(params): Query<TrendingParams>,
) -> Result<Json<Vec<Note>>, AppError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_TRENDING_LIMIT)
        .min(MAX_TRENDING_LIMIT);
    let db = state.store()?;
    Ok(Json(Aggregator::new(&db).trending_notes(limit)?))
}

pub async fn record_view(
    State(state): State<AppState>,
    session: SessionKey,
    Path(id): Path<String>,
) -> Result<Json<CounterResponse>, AppError> {
    record_hit(&state, &session, &id, CounterKind::Views)
}

pub async fn record_download(
    State(state): State<AppState>,
    session: SessionKey,
    Path(id): Path<String>,
) -> Result<Json<CounterResponse>, AppError> {
    record_hit(&state, &session, &id, CounterKind::Downloads)
}

fn record_hit(
    state: &AppState,
    session: &SessionKey,
    note_id: &str,
    kind: CounterKind,
) -> Result<Json<CounterResponse>, AppError> {
    let admitted = state
        .hits
        .lock()
        .map_err(|e| AppError::Internal(format!("hit filter lock poisoned: {}", e)))?
        .admit(&session.0, note_id, kind, Instant::now());
    if !admitted {
        debug!("Repeat {} hit on {} from {}", kind.field(), note_id, session.0);
        return Ok(Json(CounterResponse { counted: false }));
    }

    let db = state.store()?;
    Counters::new(&db).increment(note_id, kind)?;
    Ok(Json(CounterResponse { counted: true }))
}
