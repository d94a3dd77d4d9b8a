// src/web/handlers/profile_handlers.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::core::DatabaseConfig;
use crate::portfolio::{AssistantError, CvAssistant, LlmError, ProfileBuilder, ProfileError};
use crate::web::types::{
    AgentChatReply, AgentChatRequest, DetailError, DetailResponse, PublicBaseUrl, ServerConfig,
};

fn llm_failure(e: LlmError) -> DetailError {
    match e {
        LlmError::MissingApiKey => {
            error!("LLM call attempted without OPENAI_API_KEY");
            DetailResponse::error(Status::InternalServerError, e.to_string())
        }
        other => {
            warn!("LLM call failed: {}", other);
            DetailResponse::error(Status::BadGateway, other.to_string())
        }
    }
}

fn storage_failure(e: anyhow::Error) -> DetailError {
    error!("Storage failure: {:#}", e);
    DetailResponse::error(Status::InternalServerError, "Failed to read stored documents")
}

pub async fn generate_profile_handler(
    base_url: PublicBaseUrl,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<Value>, DetailError> {
    let pool = db_config.pool().map_err(storage_failure)?;

    let builder = ProfileBuilder::new(pool, &config.media_root, &config.llm);
    match builder.generate(&base_url.0).await {
        Ok(payload) => {
            info!("Generated portfolio profile");
            Ok(Json(payload))
        }
        Err(e @ (ProfileError::NoCv | ProfileError::UnreadableCv)) => {
            Err(DetailResponse::error(Status::BadRequest, e.to_string()))
        }
        Err(ProfileError::Llm(e)) => Err(llm_failure(e)),
        Err(ProfileError::MalformedReply { detail, raw }) => {
            warn!("Model reply rejected: {}", detail);
            Err(DetailResponse::with_raw(Status::BadGateway, detail, raw))
        }
        Err(ProfileError::Storage(e)) => Err(storage_failure(e)),
    }
}

pub async fn agent_chat_handler(
    request: Option<Json<AgentChatRequest>>,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<AgentChatReply>, DetailError> {
    let message = request.map(|r| r.into_inner().message).unwrap_or_default();
    let pool = db_config.pool().map_err(storage_failure)?;

    match CvAssistant::new(pool, &config.media_root, &config.llm)
        .reply(&message)
        .await
    {
        Ok(reply) => Ok(Json(AgentChatReply { reply })),
        Err(e @ AssistantError::EmptyMessage) => {
            Err(DetailResponse::error(Status::BadRequest, e.to_string()))
        }
        Err(AssistantError::Llm(e)) => Err(llm_failure(e)),
        Err(AssistantError::Storage(e)) => Err(storage_failure(e)),
    }
}
