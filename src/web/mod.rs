// src/web/mod.rs

pub mod handlers;
pub mod types;

pub use types::*;

use crate::core::DatabaseConfig;
use crate::documents::DocumentUpdate;
use crate::environment::EnvironmentConfig;
use crate::jobs::{JobQuerySummary, JobQueryView, JobSource, LinkedInClient, MatchJobsRequest};
use anyhow::Result;
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::fs::FileServer;
use rocket::http::{Header, Status};
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{catchers, delete, get, options, patch, post, routes, Build, Request, Response, Rocket, State};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, PATCH, DELETE, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

#[post("/jobs/match", data = "<request>")]
pub async fn match_jobs(
    request: Option<Json<MatchJobsRequest>>,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
    job_source: &State<Arc<dyn JobSource>>,
) -> Result<Json<JobQueryView>, DetailError> {
    handlers::match_jobs_handler(request, config, db_config, job_source).await
}

#[get("/jobs/history?<limit>")]
pub async fn job_history(
    limit: Option<i64>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<JobQuerySummary>>>, ApiError> {
    handlers::job_history_handler(limit, db_config).await
}

#[post("/documents", format = "json", data = "<request>")]
pub async fn create_link_document(
    request: Json<LinkDocumentRequest>,
    db_config: &State<DatabaseConfig>,
) -> Result<status::Created<Json<DataResponse<DocumentData>>>, ApiError> {
    handlers::create_link_document_handler(request, db_config).await
}

#[post("/documents", data = "<upload>", rank = 2)]
pub async fn upload_document(
    upload: Form<DocumentUploadForm<'_>>,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<status::Created<Json<DataResponse<DocumentData>>>, ApiError> {
    handlers::upload_document_handler(upload, config, db_config).await
}

#[get("/documents?<doc_type>&<search>")]
pub async fn list_documents(
    doc_type: Option<String>,
    search: Option<String>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<DocumentData>>>, ApiError> {
    handlers::list_documents_handler(doc_type, search, db_config).await
}

#[get("/documents/<id>")]
pub async fn get_document(
    id: i64,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<DocumentData>>, ApiError> {
    handlers::get_document_handler(id, db_config).await
}

#[patch("/documents/<id>", format = "json", data = "<changes>")]
pub async fn update_document(
    id: i64,
    changes: Json<DocumentUpdate>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<DocumentData>>, ApiError> {
    handlers::update_document_handler(id, changes, db_config).await
}

#[delete("/documents/<id>")]
pub async fn delete_document(
    id: i64,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::delete_document_handler(id, config, db_config).await
}

#[post("/profile/generate")]
pub async fn generate_profile(
    base_url: PublicBaseUrl,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<Value>, DetailError> {
    handlers::generate_profile_handler(base_url, config, db_config).await
}

#[post("/agent/chat", data = "<request>")]
pub async fn agent_chat(
    request: Option<Json<AgentChatRequest>>,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<AgentChatReply>, DetailError> {
    handlers::agent_chat_handler(request, config, db_config).await
}

#[get("/health")]
pub async fn health(db_config: &State<DatabaseConfig>) -> Json<&'static str> {
    handlers::health_handler(db_config).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the request path".to_string()],
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request could not be processed".to_string(),
        "UNPROCESSABLE".to_string(),
        vec![
            "Uploads must be multipart/form-data with a doc_type field".to_string(),
            "Verify all required fields are present".to_string(),
        ],
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
    ))
}

/// Assemble the application; the caller owns pool and job source so tests can
/// swap them.
pub fn build_rocket(
    server_config: ServerConfig,
    db_config: DatabaseConfig,
    job_source: Arc<dyn JobSource>,
) -> Rocket<Build> {
    let media_root = server_config.media_root.clone();

    rocket::build()
        .attach(Cors)
        .manage(server_config)
        .manage(db_config)
        .manage(job_source)
        .register(
            "/api",
            catchers![bad_request, not_found, unprocessable, internal_error],
        )
        .mount(
            "/api",
            routes![
                match_jobs,
                job_history,
                create_link_document,
                upload_document,
                list_documents,
                get_document,
                update_document,
                delete_document,
                generate_profile,
                agent_chat,
                health,
                options,
            ],
        )
        .mount("/media", FileServer::from(media_root))
}

// Main server start function
pub async fn start_web_server(config: EnvironmentConfig, port: u16) -> Result<()> {
    config.ensure_directories().await?;

    let mut db_config = DatabaseConfig::new(config.database_path.clone());
    if let Err(e) = db_config.init_pool().await {
        error!("Failed to initialize database: {}", e);
        return Err(e);
    }

    let job_source: Arc<dyn JobSource> = Arc::new(LinkedInClient::new(&config.job_board)?);

    let server_config = ServerConfig {
        media_root: config.media_root.clone(),
        llm: config.llm.clone(),
        result_limit: config.job_board.result_limit,
        cache_ttl_hours: config.job_board.cache_ttl_hours,
        port,
    };

    info!("Starting portfolio API server on 0.0.0.0:{}", port);
    info!("Database: {}", db_config.database_path.display());
    info!("Media root: {}", config.media_root.display());
    if config.llm.api_key.is_none() {
        info!("OPENAI_API_KEY not set; profile generation and assistant will answer 500");
    }

    let figment = rocket::Config::figment()
        .merge(("address", "0.0.0.0"))
        .merge(("port", port));

    build_rocket(server_config, db_config, job_source)
        .configure(figment)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket failed to launch: {}", e))?;

    Ok(())
}
