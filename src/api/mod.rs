//! HTTP API
//!
//! Public routes serve the browsing pages, search, trending and the
//! view/download counters. Admin routes manage the catalog and require an
//! [`AdminSession`](crate::auth::AdminSession).
//!
//! The store sits behind a `std::sync::Mutex`; handlers take it only for
//! synchronous store work and never hold it across an `.await`.

mod admin;
mod public;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{ConnectInfo, DefaultBodyLimit, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

use crate::config::Config;
use crate::counters::HitFilter;
use crate::db::Database;
use crate::error::{AppError, StoreError, UploadError};
use crate::upload::FileHost;

/// Header a client may send to identify its browsing session
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared state for every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub config: Arc<Config>,
    /// File host for uploads; `None` when uploads are not configured
    pub host: Option<Arc<dyn FileHost>>,
    pub hits: Arc<Mutex<HitFilter>>,
}

impl AppState {
    pub fn new(db: Database, config: Config, host: Option<Arc<dyn FileHost>>) -> Self {
        let hits = HitFilter::new(config.hit_window);
        Self {
            db: Arc::new(Mutex::new(db)),
            config: Arc::new(config),
            host,
            hits: Arc::new(Mutex::new(hits)),
        }
    }

    /// Lock the store for synchronous work
    pub(crate) fn store(&self) -> Result<MutexGuard<'_, Database>, AppError> {
        self.db
            .lock()
            .map_err(|e| AppError::Internal(format!("store lock poisoned: {}", e)))
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any);
    let body_limit = state.config.body_limit_bytes();

    Router::new()
        // Public
        .route("/api/home", get(public::home))
        .route("/api/branches", get(public::branches))
        .route("/api/branches/{id}", get(public::branch))
        .route("/api/branches/{id}/years/{year}", get(public::branch_year))
        .route("/api/subjects", get(public::subjects))
        .route("/api/subjects/{id}", get(public::subject))
        .route("/api/search", get(public::search))
        .route("/api/trending", get(public::trending))
        .route("/api/notes/{id}/view", post(public::record_view))
        .route("/api/notes/{id}/download", post(public::record_download))
        // Admin
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/notes", get(admin::notes).post(admin::upload_note))
        .route("/api/admin/branches", post(admin::add_branch))
        .route(
            "/api/admin/branches/{id}",
            patch(admin::update_branch).delete(admin::delete_branch),
        )
        .route("/api/admin/subjects", post(admin::add_subject))
        .route(
            "/api/admin/subjects/{id}",
            patch(admin::update_subject).delete(admin::delete_subject),
        )
        .route(
            "/api/admin/notes/{id}",
            patch(admin::update_note).delete(admin::delete_note),
        )
        .route("/api/admin/notes/{id}/publish", post(admin::publish_note))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .with_state(state)
}

/// Who is hitting a counter: the session header, else the peer address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKey(pub String);

impl<S: Send + Sync> FromRequestParts<S> for SessionKey {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let from_header = parts
            .headers
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| format!("session:{}", v));
        if let Some(key) = from_header {
            return Ok(SessionKey(key));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| format!("peer:{}", addr.ip()))
            .unwrap_or_else(|| "anonymous".to_string());
        Ok(SessionKey(peer))
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Store(e) => match e {
                StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
                StoreError::InvalidQuery(_)
                | StoreError::DanglingReference { .. }
                | StoreError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                StoreError::Sqlite(_) | StoreError::Serialization(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::Upload(e) => match e {
                UploadError::InvalidType
                | UploadError::TooLarge { .. }
                | UploadError::MissingField(_) => StatusCode::BAD_REQUEST,
                UploadError::Rejected(_) | UploadError::Network => StatusCode::BAD_GATEWAY,
                UploadError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
