// src/web/handlers/document_handlers.rs
use chrono::Utc;
use rocket::form::Form;
use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use tracing::{error, info, warn};

use crate::core::{DatabaseConfig, FsOps};
use crate::documents::{
    DocumentFilter, DocumentRepository, DocumentType, DocumentUpdate, NewDocument,
};
use crate::utils::{sanitize_filename, validate_image_file};
use crate::web::handlers::database_error;
use crate::web::types::{
    ActionResponse, ApiError, DataResponse, DocumentData, DocumentUploadForm, LinkDocumentRequest,
    ServerConfig, StandardErrorResponse,
};

fn invalid_doc_type(value: &str) -> ApiError {
    StandardErrorResponse::new(
        format!("Unknown document type: {}", value),
        "INVALID_DOC_TYPE".to_string(),
        vec![format!(
            "Use one of: {}",
            DocumentType::ALL
                .iter()
                .map(|t| t.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )],
    )
    .with_status(Status::BadRequest)
}

fn not_found(id: i64) -> ApiError {
    StandardErrorResponse::new(
        format!("Document {} not found", id),
        "DOCUMENT_NOT_FOUND".to_string(),
        vec!["List documents to see available ids".to_string()],
    )
    .with_status(Status::NotFound)
}

fn clean_field(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

pub async fn upload_document_handler(
    mut upload: Form<DocumentUploadForm<'_>>,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<status::Created<Json<DataResponse<DocumentData>>>, ApiError> {
    let doc_type: DocumentType = upload
        .doc_type
        .parse()
        .map_err(|_| invalid_doc_type(&upload.doc_type))?;

    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        database_error()
    })?;

    let mut new_document = NewDocument {
        doc_type,
        title: clean_field(&upload.title),
        external_url: clean_field(&upload.external_url),
        description: clean_field(&upload.description),
        ..Default::default()
    };

    // Stored path relative to the media root, kept for cleanup on failure
    let mut stored_file = None;

    if let Some(file) = upload.file.as_mut() {
        let filename = sanitize_filename(
            file.raw_name()
                .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str())
                .unwrap_or("upload"),
        );

        if doc_type == DocumentType::ProfileImage {
            if let Err(e) = validate_image_file(&filename) {
                return Err(StandardErrorResponse::new(
                    e.to_string(),
                    "INVALID_FILE_TYPE".to_string(),
                    vec!["Supported formats: PNG, JPEG, JPG".to_string()],
                )
                .with_status(Status::BadRequest));
            }
        }

        let relative = FsOps::upload_relative_path(
            &config.media_root,
            &doc_type.as_str().to_lowercase(),
            &filename,
            Utc::now(),
        );
        let target = config.media_root.join(&relative);

        let saved = match target.parent() {
            Some(parent) => FsOps::ensure_dir_exists(parent).await,
            None => Ok(()),
        };
        if let Err(e) = saved {
            error!("Failed to prepare upload directory: {}", e);
            return Err(file_save_error());
        }

        let size_bytes = file.len();
        if let Err(e) = file.move_copy_to(&target).await {
            error!("Failed to save uploaded file {}: {}", target.display(), e);
            return Err(file_save_error());
        }

        new_document.original_name = relative
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        new_document.size_bytes = i64::try_from(size_bytes).unwrap_or(i64::MAX);
        new_document.file_path = Some(relative.to_string_lossy().replace('\\', "/"));
        stored_file = Some(target);
    }

    match DocumentRepository::new(pool).create(&new_document).await {
        Ok(document) => {
            info!("Uploaded document #{} ({})", document.id, document.doc_type);
            let location = format!("/api/documents/{}", document.id);
            Ok(status::Created::new(location).body(Json(DataResponse::success(
                format!("{} uploaded", document.doc_type.label()),
                DocumentData::from(&document),
            ))))
        }
        Err(e) => {
            error!("Failed to store document: {}", e);
            if let Some(path) = stored_file {
                FsOps::remove_file_quietly(&path).await;
            }
            Err(database_error())
        }
    }
}

fn file_save_error() -> ApiError {
    StandardErrorResponse::new(
        "Failed to save uploaded file".to_string(),
        "FILE_SAVE_ERROR".to_string(),
        vec!["Try uploading the file again".to_string()],
    )
    .with_status(Status::InternalServerError)
}

pub async fn list_documents_handler(
    doc_type: Option<String>,
    search: Option<String>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<DocumentData>>>, ApiError> {
    let doc_type = match doc_type.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        Some(value) => Some(
            value
                .parse::<DocumentType>()
                .map_err(|_| invalid_doc_type(value))?,
        ),
        None => None,
    };

    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        database_error()
    })?;

    let filter = DocumentFilter { doc_type, search };
    match DocumentRepository::new(pool).list(&filter).await {
        Ok(documents) => Ok(Json(DataResponse::success(
            format!("{} documents", documents.len()),
            documents.iter().map(DocumentData::from).collect(),
        ))),
        Err(e) => {
            error!("Failed to list documents: {}", e);
            Err(database_error())
        }
    }
}

pub async fn get_document_handler(
    id: i64,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<DocumentData>>, ApiError> {
    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        database_error()
    })?;

    match DocumentRepository::new(pool).get(id).await {
        Ok(Some(document)) => Ok(Json(DataResponse::success(
            document.display_name().to_string(),
            DocumentData::from(&document),
        ))),
        Ok(None) => Err(not_found(id)),
        Err(e) => {
            error!("Failed to load document {}: {}", id, e);
            Err(database_error())
        }
    }
}

pub async fn delete_document_handler(
    id: i64,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, ApiError> {
    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        database_error()
    })?;

    match DocumentRepository::new(pool).delete(id).await {
        Ok(Some(document)) => {
            if let Some(file_path) = &document.file_path {
                FsOps::remove_file_quietly(&config.media_root.join(file_path)).await;
            }
            Ok(Json(ActionResponse::success(
                format!("Document '{}' deleted", document.display_name()),
                "deleted".to_string(),
            )))
        }
        Ok(None) => {
            warn!("Delete requested for missing document {}", id);
            Err(not_found(id))
        }
        Err(e) => {
            error!("Failed to delete document {}: {}", id, e);
            Err(database_error())
        }
    }
}

pub async fn create_link_document_handler(
    request: Json<LinkDocumentRequest>,
    db_config: &State<DatabaseConfig>,
) -> Result<status::Created<Json<DataResponse<DocumentData>>>, ApiError> {
    let request = request.into_inner();
    let doc_type: DocumentType = request
        .doc_type
        .parse()
        .map_err(|_| invalid_doc_type(&request.doc_type))?;

    let external_url = clean_field(&request.external_url);
    if external_url.is_empty() {
        return Err(StandardErrorResponse::new(
            "external_url is required for documents without a file".to_string(),
            "MISSING_EXTERNAL_URL".to_string(),
            vec!["Upload a file as multipart/form-data instead".to_string()],
        )
        .with_status(Status::BadRequest));
    }

    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        database_error()
    })?;

    let new_document = NewDocument {
        doc_type,
        title: clean_field(&request.title),
        external_url,
        description: clean_field(&request.description),
        ..Default::default()
    };

    match DocumentRepository::new(pool).create(&new_document).await {
        Ok(document) => {
            info!("Created link document #{} ({})", document.id, document.doc_type);
            let location = format!("/api/documents/{}", document.id);
            Ok(status::Created::new(location).body(Json(DataResponse::success(
                format!("{} added", document.doc_type.label()),
                DocumentData::from(&document),
            ))))
        }
        Err(e) => {
            error!("Failed to store document: {}", e);
            Err(database_error())
        }
    }
}

pub async fn update_document_handler(
    id: i64,
    changes: Json<DocumentUpdate>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<DocumentData>>, ApiError> {
    let trimmed = |value: &Option<String>| value.as_deref().map(|v| v.trim().to_string());
    let changes = DocumentUpdate {
        title: trimmed(&changes.title),
        description: trimmed(&changes.description),
        external_url: trimmed(&changes.external_url),
    };

    if changes.title.as_deref() == Some("") {
        return Err(StandardErrorResponse::new(
            "Title cannot be blank".to_string(),
            "INVALID_TITLE".to_string(),
            vec!["Send a non-empty title or omit the field".to_string()],
        )
        .with_status(Status::BadRequest));
    }

    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        database_error()
    })?;

    match DocumentRepository::new(pool).update(id, &changes).await {
        Ok(Some(document)) => Ok(Json(DataResponse::success(
            format!("Document '{}' updated", document.display_name()),
            DocumentData::from(&document),
        ))),
        Ok(None) => {
            warn!("Update requested for missing document {}", id);
            Err(not_found(id))
        }
        Err(e) => {
            error!("Failed to update document {}: {}", id, e);
            Err(database_error())
        }
    }
}
