//! Admin catalog management routes
//!
//! Every handler takes an [`AdminSession`], so unauthorized requests are
//! rejected before the store is touched.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::AppState;
use crate::aggregate::Aggregator;
use crate::auth::AdminSession;
use crate::catalog::Catalog;
use crate::error::{AppError, UploadError};
use crate::types::{
    BranchPatch, DashboardStats, NewBranch, NewSubject, NotePatch, NoteWithSubject, SubjectPatch,
};
use crate::upload::{extract_public_id, upload_and_record, NoteUpload, PdfFile};

#[derive(Serialize)]
pub struct Created {
    pub id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub is_published: bool,
}

pub async fn dashboard(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<DashboardStats>, AppError> {
    let db = state.store()?;
    Ok(Json(Aggregator::new(&db).dashboard_stats()?))
}

pub async fn notes(
    _admin: AdminSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<NoteWithSubject>>, AppError> {
    let db = state.store()?;
    Ok(Json(Catalog::new(&db).notes_with_subjects()?))
}

// =========================================================================
// Branches
// =========================================================================

pub async fn add_branch(
    admin: AdminSession,
    State(state): State<AppState>,
    Json(branch): Json<NewBranch>,
) -> Result<(StatusCode, Json<Created>), AppError> {
    let db = state.store()?;
    let id = Catalog::new(&db).add_branch(&branch)?;
    info!("{} added branch {}", admin.email, id);
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn update_branch(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<BranchPatch>,
) -> Result<StatusCode, AppError> {
    let db = state.store()?;
    Catalog::new(&db).update_branch(&id, &patch)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_branch(
    admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let db = state.store()?;
    if !Catalog::new(&db).delete_branch(&id)? {
        return Err(AppError::NotFound(format!("Branch {}", id)));
    }
    info!("{} deleted branch {}", admin.email, id);
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Subjects
// =========================================================================

pub async fn add_subject(
    admin: AdminSession,
    State(state): State<AppState>,
    Json(subject): Json<NewSubject>,
) -> Result<(StatusCode, Json<Created>), AppError> {
    let db = state.store()?;
    let id = Catalog::new(&db).add_subject(&subject)?;
    info!("{} added subject {}", admin.email, id);
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn update_subject(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<SubjectPatch>,
) -> Result<StatusCode, AppError> {
    let db = state.store()?;
    Catalog::new(&db).update_subject(&id, &patch)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_subject(
    admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let db = state.store()?;
    if !Catalog::new(&db).delete_subject(&id)? {
        return Err(AppError::NotFound(format!("Subject {}", id)));
    }
    info!("{} deleted subject {}", admin.email, id);
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Notes
// =========================================================================

pub async fn upload_note(
    admin: AdminSession,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Created>), AppError> {
    let Some(host) = state.host.clone() else {
        return Err(UploadError::NotConfigured.into());
    };

    let mut upload = NoteUpload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            let file_name = field.file_name().unwrap_or("upload.pdf").to_string();
            let content_type = field.content_type().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
            upload.file = Some(PdfFile {
                file_name,
                content_type,
                bytes: bytes.to_vec(),
            });
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        let value = value.trim().to_string();
        match name.as_str() {
            "subjectId" => upload.subject_id = value,
            "title" => upload.title = value,
            "description" => upload.description = Some(value).filter(|v| !v.is_empty()),
            "unit" => upload.unit = Some(value).filter(|v| !v.is_empty()),
            _ => {}
        }
    }

    let id = upload_and_record(
        &state.db,
        host.as_ref(),
        upload,
        &state.config.upload_folder,
        state.config.max_upload_mb,
    )
    .await?;
    info!("{} uploaded note {}", admin.email, id);
    Ok((StatusCode::CREATED, Json(Created { id })))
}

pub async fn update_note(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<NotePatch>,
) -> Result<StatusCode, AppError> {
    let db = state.store()?;
    Catalog::new(&db).update_note(&id, &patch)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_note(
    _admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PublishRequest>,
) -> Result<StatusCode, AppError> {
    let db = state.store()?;
    Catalog::new(&db).set_published(&id, request.is_published)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_note(
    admin: AdminSession,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let db = state.store()?;
    let catalog = Catalog::new(&db);
    let note = catalog
        .note(&id)?
        .ok_or_else(|| AppError::NotFound(format!("Note {}", id)))?;
    catalog.delete_note(&id)?;

    match extract_public_id(&note.pdf_url) {
        Some(public_id) => info!(
            "{} deleted note {}; hosted file {} is kept",
            admin.email, id, public_id
        ),
        None => info!("{} deleted note {}", admin.email, id),
    }
    Ok(StatusCode::NO_CONTENT)
}
