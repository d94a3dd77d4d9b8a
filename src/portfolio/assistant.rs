// src/portfolio/assistant.rs
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use super::llm_client::{ChatMessage, LlmClient, LlmError};
use crate::documents::latest_cv_text;
use crate::environment::LlmConfig;
use crate::utils::truncate_chars;

pub const CV_CONTEXT_CHARS: usize = 8_000;
const TEMPERATURE: f32 = 0.2;

const BASE_SYSTEM: &str = "You are the Portfolio Assistant. Be concise and helpful. \
Answer questions about the user's background/skills/experience strictly from the CV context. \
If something isn't in the CV, say you don't have that detail.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("message is required")]
    EmptyMessage,

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Single-turn question answering over the latest CV
pub struct CvAssistant<'a> {
    pool: &'a SqlitePool,
    media_root: &'a Path,
    llm: &'a LlmConfig,
}

impl<'a> CvAssistant<'a> {
    pub fn new(pool: &'a SqlitePool, media_root: &'a Path, llm: &'a LlmConfig) -> Self {
        Self {
            pool,
            media_root,
            llm,
        }
    }

    pub async fn reply(&self, message: &str) -> Result<String, AssistantError> {
        let question = message.trim();
        if question.is_empty() {
            return Err(AssistantError::EmptyMessage);
        }

        let cv_text = latest_cv_text(self.pool, self.media_root).await?;
        let messages = build_messages(cv_text.as_deref(), question);

        let reply = match ask(self.llm, &messages).await {
            Ok(reply) => reply,
            Err(primary) => match self.llm.fallback() {
                Some(fallback) => {
                    warn!("{} failed ({}), asking {}", self.llm.model, primary, fallback.model);
                    ask(&fallback, &messages).await?
                }
                None => return Err(primary.into()),
            },
        };

        info!("Assistant answered a {} char question", question.len());
        Ok(reply)
    }
}

async fn ask(config: &LlmConfig, messages: &[ChatMessage]) -> Result<String, LlmError> {
    LlmClient::new(config)?
        .complete(messages, Some(TEMPERATURE))
        .await
}

pub fn build_messages(cv_text: Option<&str>, question: &str) -> Vec<ChatMessage> {
    let context = cv_text
        .map(|text| truncate_chars(text, CV_CONTEXT_CHARS))
        .unwrap_or("No CV found or unreadable.");

    vec![
        ChatMessage::system(format!(
            "{}\n\n<CV_CONTEXT>\n{}\n</CV_CONTEXT>\n",
            BASE_SYSTEM, context
        )),
        ChatMessage::user(question),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Database;
    use crate::test_support::serve_once;

    #[test]
    fn cv_context_is_truncated() {
        let cv = "x".repeat(9_000);
        let messages = build_messages(Some(&cv), "What do I do?");

        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains(&"x".repeat(8_000)));
        assert!(!messages[0].content.contains(&"x".repeat(8_001)));
        assert_eq!(messages[1], ChatMessage::user("What do I do?"));
    }

    #[test]
    fn missing_cv_uses_marker() {
        let messages = build_messages(None, "hi");
        assert!(messages[0]
            .content
            .contains("<CV_CONTEXT>\nNo CV found or unreadable.\n</CV_CONTEXT>"));
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let db = Database::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = LlmConfig::default();

        let err = CvAssistant::new(db.pool(), dir.path(), &config)
            .reply("   ")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "message is required");
    }

    #[tokio::test]
    async fn secondary_model_answers_when_primary_fails() {
        let db = Database::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (primary_url, primary) = serve_once(
            "503 Service Unavailable",
            "application/json",
            "overloaded".to_string(),
        )
        .await;
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "From the backup"}}]
        })
        .to_string();
        let (fallback_url, fallback) = serve_once("200 OK", "application/json", body).await;

        let config = LlmConfig {
            api_url: primary_url,
            api_key: Some("sk-test".to_string()),
            fallback_api_url: fallback_url,
            fallback_model: "gemini-test".to_string(),
            fallback_api_key: Some("gem-test".to_string()),
            timeout_seconds: 5,
            ..Default::default()
        };

        let reply = CvAssistant::new(db.pool(), dir.path(), &config)
            .reply("Where am I based?")
            .await
            .unwrap();
        assert_eq!(reply, "From the backup");

        primary.await.unwrap();
        let request = fallback.await.unwrap();
        assert!(request.contains(r#""model":"gemini-test""#));
        assert!(request.to_lowercase().contains("authorization: bearer gem-test"));
    }

    #[tokio::test]
    async fn primary_error_surfaces_without_a_secondary_key() {
        let db = Database::in_memory().await.unwrap();
        let dir = tempfile::tempdir().unwrap();
        let (url, _server) =
            serve_once("500 Internal Server Error", "application/json", "boom".to_string()).await;

        let config = LlmConfig {
            api_url: url,
            api_key: Some("sk-test".to_string()),
            timeout_seconds: 5,
            ..Default::default()
        };

        let err = CvAssistant::new(db.pool(), dir.path(), &config)
            .reply("hi")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Llm(LlmError::Status { .. })
        ));
    }
}
