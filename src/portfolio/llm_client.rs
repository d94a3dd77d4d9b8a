// src/portfolio/llm_client.rs
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};

use crate::environment::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OPENAI_API_KEY not set.")]
    MissingApiKey,

    #[error("LLM request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("LLM response contained no message")]
    EmptyResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions client
pub struct LlmClient {
    client: Client,
    api_url: String,
    model: String,
    api_key: String,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(LlmError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature,
        };

        info!(
            "Sending {} messages to {} ({})",
            messages.len(),
            self.api_url,
            self.model
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("LLM API error {}: {}", status, body);
            return Err(LlmError::Status { status, body });
        }

        let completion: ChatResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        info!("Received {} chars from LLM", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;

    fn config(api_url: String) -> LlmConfig {
        LlmConfig {
            api_url,
            api_key: Some("sk-test".to_string()),
            timeout_seconds: 5,
            ..Default::default()
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        let err = LlmClient::new(&LlmConfig::default()).err().unwrap();
        assert!(matches!(err, LlmError::MissingApiKey));
        assert_eq!(err.to_string(), "OPENAI_API_KEY not set.");
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let body = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Hello there"}}]
        })
        .to_string();
        let (url, server) = serve_once("200 OK", "application/json", body).await;

        let client = LlmClient::new(&config(format!("{}/v1/", url))).unwrap();
        let reply = client
            .complete(&[ChatMessage::system("be brief"), ChatMessage::user("hi")], Some(0.2))
            .await
            .unwrap();
        assert_eq!(reply, "Hello there");

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(request.contains(r#""model":"gpt-4o-mini""#));
        assert!(request.contains(r#""temperature":0.2"#));
        assert!(request.contains(r#"{"role":"user","content":"hi"}"#));
    }

    #[tokio::test]
    async fn error_status_carries_body() {
        let (url, _server) =
            serve_once("401 Unauthorized", "application/json", "bad key".to_string()).await;

        let err = LlmClient::new(&config(url))
            .unwrap()
            .complete(&[ChatMessage::user("hi")], None)
            .await
            .unwrap_err();

        match err {
            LlmError::Status { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let (url, _server) =
            serve_once("200 OK", "application/json", r#"{"choices":[]}"#.to_string()).await;

        let err = LlmClient::new(&config(url))
            .unwrap()
            .complete(&[ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }
}
