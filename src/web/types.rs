// src/web/types.rs

use chrono::{DateTime, Utc};
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};
use rocket::Request;
use std::convert::Infallible;
use std::path::PathBuf;

use crate::documents::{Document, DocumentType};
use crate::environment::LlmConfig;

pub struct ServerConfig {
    pub media_root: PathBuf,
    pub llm: LlmConfig,
    pub result_limit: usize,
    pub cache_ttl_hours: i64,
    /// Used to build absolute URLs when the request carries no Host header
    pub port: u16,
}

/// Errors in the envelope used by the document endpoints
pub type ApiError = status::Custom<Json<StandardErrorResponse>>;

/// Errors as `{detail}` for the job, profile and assistant endpoints
pub type DetailError = status::Custom<Json<DetailResponse>>;

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Data,
    Action,
    Error,
}

#[derive(Debug, Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DetailResponse {
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

/// Document as exposed over HTTP; `file` is the public `/media/...` URL
#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DocumentData {
    pub id: i64,
    pub doc_type: DocumentType,
    pub title: String,
    pub file: Option<String>,
    pub external_url: String,
    pub description: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl From<&Document> for DocumentData {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            doc_type: doc.doc_type,
            title: doc.title.clone(),
            file: doc.file_url(),
            external_url: doc.external_url.clone(),
            description: doc.description.clone(),
            original_name: doc.original_name.clone(),
            size_bytes: doc.size_bytes,
            uploaded_at: doc.uploaded_at,
        }
    }
}

#[derive(FromForm)]
pub struct DocumentUploadForm<'f> {
    pub doc_type: String,
    pub title: Option<String>,
    pub external_url: Option<String>,
    pub description: Option<String>,
    pub file: Option<TempFile<'f>>,
}

/// JSON body for documents that carry only a link, such as projects
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct LinkDocumentRequest {
    #[serde(default = "default_link_doc_type")]
    pub doc_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_link_doc_type() -> String {
    DocumentType::Project.as_str().to_string()
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct AgentChatRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct AgentChatReply {
    pub reply: String,
}

/// `scheme://host[:port]` the client used to reach us
pub struct PublicBaseUrl(pub String);

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PublicBaseUrl {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        if let Some(host) = request.host() {
            return Outcome::Success(PublicBaseUrl(format!("http://{}", host)));
        }

        let port = request
            .rocket()
            .state::<ServerConfig>()
            .map(|config| config.port)
            .unwrap_or(8000);
        Outcome::Success(PublicBaseUrl(format!("http://127.0.0.1:{}", port)))
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
        }
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
        }
    }
}

impl StandardErrorResponse {
    pub fn new(error: String, error_code: String, suggestions: Vec<String>) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
        }
    }

    pub fn with_status(self, status: Status) -> ApiError {
        status::Custom(status, Json(self))
    }
}

impl DetailResponse {
    pub fn error(status: Status, detail: impl Into<String>) -> DetailError {
        status::Custom(
            status,
            Json(Self {
                detail: detail.into(),
                raw: None,
            }),
        )
    }

    pub fn with_raw(status: Status, detail: impl Into<String>, raw: String) -> DetailError {
        status::Custom(
            status,
            Json(Self {
                detail: detail.into(),
                raw: Some(raw),
            }),
        )
    }
}
