//! Admin authorization
//!
//! An admin request carries both:
//! - `Authorization: Bearer <token>` matching the configured admin token
//! - `x-admin-email` naming an allow-listed address (case-insensitive)
//!
//! Without a configured token every admin request is refused.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use tracing::warn;

use crate::api::AppState;
use crate::error::AppError;

pub const ADMIN_EMAIL_HEADER: &str = "x-admin-email";

/// An authorized admin, identified by email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub email: String,
}

pub fn is_admin_email(email: &str, allow_list: &[String]) -> bool {
    let email = email.trim();
    !email.is_empty() && allow_list.iter().any(|a| a.eq_ignore_ascii_case(email))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Check request headers against the admin token and allow-list
pub fn authorize(
    headers: &HeaderMap,
    admin_token: Option<&str>,
    allow_list: &[String],
) -> Result<AdminSession, AppError> {
    let Some(expected) = admin_token else {
        return Err(AppError::Unauthorized);
    };
    if bearer_token(headers) != Some(expected) {
        return Err(AppError::Unauthorized);
    }

    let email = headers
        .get(ADMIN_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !is_admin_email(email, allow_list) {
        warn!("Rejected admin request for '{}'", email);
        return Err(AppError::Unauthorized);
    }

    Ok(AdminSession {
        email: email.trim().to_lowercase(),
    })
}

impl FromRequestParts<AppState> for AdminSession {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        authorize(
            &parts.headers,
            state.config.admin_token.as_deref(),
            &state.config.admin_emails,
        )
    }
}
