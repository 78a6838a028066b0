//! PDF uploads to the hosted file store
//!
//! Files and the target subject are validated locally before any network
//! call, sent to the file host, and only then recorded as a note. A note
//! that fails to record after a successful upload leaves the remote file in
//! place.

use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::db::Database;
use crate::error::{AppError, StoreError, UploadError};
use crate::types::{Collection, NewNote};

/// The only content type accepted for notes
pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Default upload size limit in MiB
pub const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

/// A PDF received from an admin, not yet uploaded
#[derive(Debug, Clone)]
pub struct PdfFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// What the file host returns for a stored file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedFile {
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub bytes: u64,
}

/// Admin upload form: the note fields plus the file
#[derive(Debug, Clone, Default)]
pub struct NoteUpload {
    pub subject_id: String,
    pub title: String,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub file: Option<PdfFile>,
}

/// Check type and size before anything leaves the process
pub fn validate_pdf(content_type: &str, size: u64, max_mb: u64) -> Result<(), UploadError> {
    if content_type != PDF_CONTENT_TYPE {
        return Err(UploadError::InvalidType);
    }
    if size > max_mb.saturating_mul(1024 * 1024) {
        return Err(UploadError::TooLarge { max_mb });
    }
    Ok(())
}

/// Human-readable file size, e.g. `1.5 MB`
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let exponent = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exponent as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[exponent])
}

/// Recover the host's public id from a delivery URL
///
/// Takes the path after the `upload` segment, drops a leading `v<digits>`
/// version and the file extension.
pub fn extract_public_id(url: &str) -> Option<String> {
    let parsed = reqwest::Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    let upload_index = segments.iter().position(|s| *s == "upload")?;

    let mut parts: Vec<String> = segments[upload_index + 1..]
        .iter()
        .map(|s| s.to_string())
        .collect();
    if parts.first().is_some_and(|p| is_version(p)) {
        parts.remove(0);
    }
    if let Some(last) = parts.last_mut() {
        if let Some(dot) = last.rfind('.') {
            last.truncate(dot);
        }
    }
    Some(parts.join("/"))
}

fn is_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// A place PDFs can be stored
#[async_trait]
pub trait FileHost: Send + Sync {
    async fn upload_pdf(&self, file: &PdfFile, folder: &str) -> Result<UploadedFile, UploadError>;
}

/// Unsigned uploads to a Cloudinary upload preset
pub struct CloudinaryClient {
    http: reqwest::Client,
    cloud_name: String,
    upload_preset: String,
}

impl CloudinaryClient {
    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}/raw/upload", CLOUDINARY_API, self.cloud_name)
    }
}

#[derive(Deserialize)]
struct HostError {
    error: Option<HostErrorBody>,
}

#[derive(Deserialize)]
struct HostErrorBody {
    message: Option<String>,
}

#[async_trait]
impl FileHost for CloudinaryClient {
    async fn upload_pdf(&self, file: &PdfFile, folder: &str) -> Result<UploadedFile, UploadError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.file_name.clone())
            .mime_str(PDF_CONTENT_TYPE)
            .map_err(|_| UploadError::InvalidType)?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", folder.to_string())
            .text("resource_type", "raw")
            .text("timestamp", chrono::Utc::now().timestamp().to_string());

        let response = self
            .http
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                warn!("Upload transport error: {}", e);
                UploadError::Network
            })?;

        if !response.status().is_success() {
            let message = response
                .json::<HostError>()
                .await
                .ok()
                .and_then(|body| body.error)
                .and_then(|error| error.message)
                .unwrap_or_else(|| "Upload failed".to_string());
            return Err(UploadError::Rejected(message));
        }

        response.json::<UploadedFile>().await.map_err(|e| {
            warn!("Unreadable upload response: {}", e);
            UploadError::Rejected("Upload failed".to_string())
        })
    }
}

/// Upload the form's PDF and record it as a published note
///
/// The store lock is taken briefly to check the subject, then again after
/// the upload has finished; it is never held across the upload.
pub async fn upload_and_record(
    db: &Mutex<Database>,
    host: &dyn FileHost,
    upload: NoteUpload,
    folder: &str,
    max_mb: u64,
) -> Result<String, AppError> {
    if upload.subject_id.trim().is_empty() {
        return Err(UploadError::MissingField("a subject").into());
    }
    if upload.title.trim().is_empty() {
        return Err(UploadError::MissingField("a note title").into());
    }
    let file = upload.file.ok_or(UploadError::MissingField("a PDF file"))?;
    validate_pdf(&file.content_type, file.bytes.len() as u64, max_mb)?;

    {
        let db = db
            .lock()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        if Catalog::new(&db).subject(&upload.subject_id)?.is_none() {
            return Err(StoreError::DanglingReference {
                collection: Collection::Subjects,
                id: upload.subject_id,
            }
            .into());
        }
    }

    let uploaded = host.upload_pdf(&file, folder).await?;
    info!(
        "Uploaded {} ({}) as {}",
        file.file_name,
        format_file_size(file.bytes.len() as u64),
        uploaded.public_id
    );

    let note = NewNote {
        subject_id: upload.subject_id,
        title: upload.title,
        description: upload.description,
        unit: upload.unit,
        pdf_url: uploaded.secure_url,
        is_published: true,
    };
    let db = db
        .lock()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let id = Catalog::new(&db).add_note(&note)?;
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::seed_subject;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubHost {
        result: Result<UploadedFile, UploadError>,
        calls: AtomicUsize,
    }

    impl StubHost {
        fn accepting() -> Self {
            Self {
                result: Ok(UploadedFile {
                    secure_url: "https://res.cloudinary.com/demo/raw/upload/v17/notes/heaps.pdf"
                        .to_string(),
                    public_id: "notes/heaps".to_string(),
                    bytes: 4,
                }),
                calls: AtomicUsize::new(0),
            }
        }

        fn rejecting(message: &str) -> Self {
            Self {
                result: Err(UploadError::Rejected(message.to_string())),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FileHost for StubHost {
        async fn upload_pdf(&self, _file: &PdfFile, _folder: &str) -> Result<UploadedFile, UploadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result.clone()
        }
    }

    fn pdf(bytes: usize) -> PdfFile {
        PdfFile {
            file_name: "heaps.pdf".to_string(),
            content_type: PDF_CONTENT_TYPE.to_string(),
            bytes: vec![b'%'; bytes],
        }
    }

    fn form(subject: &str, file: Option<PdfFile>) -> NoteUpload {
        NoteUpload {
            subject_id: subject.to_string(),
            title: "Heaps".to_string(),
            description: Some("Binary heaps".to_string()),
            unit: Some("Unit 3".to_string()),
            file,
        }
    }

    #[test]
    fn test_validate_pdf() {
        assert!(validate_pdf(PDF_CONTENT_TYPE, 1024, 50).is_ok());
        assert!(validate_pdf(PDF_CONTENT_TYPE, 50 * 1024 * 1024, 50).is_ok());
        assert_eq!(
            validate_pdf("image/png", 10, 50),
            Err(UploadError::InvalidType)
        );
        assert_eq!(
            validate_pdf(PDF_CONTENT_TYPE, 50 * 1024 * 1024 + 1, 50),
            Err(UploadError::TooLarge { max_mb: 50 })
        );
        assert_eq!(
            UploadError::TooLarge { max_mb: 50 }.to_string(),
            "File size must be less than 50MB"
        );
    }

    #[test]
    fn test_format_file_size() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3 GB");
    }

    #[test]
    fn test_extract_public_id() {
        assert_eq!(
            extract_public_id("https://res.cloudinary.com/demo/raw/upload/v1712345/notes/dsa-unit1.pdf"),
            Some("notes/dsa-unit1".to_string())
        );
        assert_eq!(
            extract_public_id("https://res.cloudinary.com/demo/raw/upload/notes/os.pdf"),
            Some("notes/os".to_string())
        );
        assert_eq!(
            extract_public_id("https://res.cloudinary.com/demo/raw/fetch/notes/os.pdf"),
            None
        );
        assert_eq!(extract_public_id("not a url"), None);
    }

    #[tokio::test]
    async fn test_upload_and_record_stores_secure_url() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        let db = Mutex::new(db);
        let host = StubHost::accepting();

        let id = upload_and_record(&db, &host, form(&subject, Some(pdf(4))), "notes", 50)
            .await
            .unwrap();

        let db = db.lock().unwrap();
        let note = Catalog::new(&db).note(&id).unwrap().unwrap();
        assert_eq!(
            note.pdf_url,
            "https://res.cloudinary.com/demo/raw/upload/v17/notes/heaps.pdf"
        );
        assert!(note.is_published);
        assert_eq!(note.unit.as_deref(), Some("Unit 3"));
        assert_eq!(host.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_invalid_file_never_reaches_host() {
        let db = Mutex::new(Database::in_memory().unwrap());
        let host = StubHost::accepting();
        let mut file = pdf(4);
        file.content_type = "text/plain".to_string();

        let err = upload_and_record(&db, &host, form("s1", Some(file)), "notes", 50)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upload(UploadError::InvalidType)));

        let err = upload_and_record(&db, &host, form("s1", None), "notes", 50)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Upload(UploadError::MissingField(_))));
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rejected_upload_records_nothing() {
        let db = Database::in_memory().unwrap();
        let (_, subject) = seed_subject(&db);
        let db = Mutex::new(db);
        let host = StubHost::rejecting("Upload preset not found");

        let err = upload_and_record(&db, &host, form(&subject, Some(pdf(4))), "notes", 50)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upload preset not found");

        let db = db.lock().unwrap();
        assert!(Catalog::new(&db).all_notes().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_subject_is_rejected_before_upload() {
        let db = Mutex::new(Database::in_memory().unwrap());
        let host = StubHost::accepting();

        let err = upload_and_record(&db, &host, form("ghost", Some(pdf(4))), "notes", 50)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Store(StoreError::DanglingReference {
                collection: Collection::Subjects,
                ..
            })
        ));
        assert_eq!(host.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_validate_pdf_with_huge_limit_does_not_overflow() {
        assert!(validate_pdf(PDF_CONTENT_TYPE, u64::MAX, u64::MAX).is_ok());
    }
}
