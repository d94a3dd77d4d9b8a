// src/portfolio/profile_builder.rs
//! Latest CV -> structured profile JSON plus a ready-to-embed HTML section

use regex::Regex;
use serde_json::Value;
use sqlx::SqlitePool;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

use super::llm_client::{ChatMessage, LlmClient, LlmError};
use crate::documents::{latest_cv_text, DocumentRepository, DocumentType};
use crate::environment::LlmConfig;
use crate::utils::truncate_chars;

pub const CV_CHAR_LIMIT: usize = 30_000;
const RAW_EXCERPT_CHARS: usize = 2_000;

const SYSTEM_PROMPT: &str = "You are a portfolio builder. Parse the user's CV text and return a single JSON object with exactly \
two keys: 'profile' and 'html'.\n\
profile must be: {name, title, summary, skills: string[], experience: [{company, role, start, end, bullets: string[]}], \
education: [{school, degree, start, end}], links: {linkedin?, github?, website?}}\n\
html must be a responsive DARK MODE section using inline CSS only. Colors: background #0f172a, \
panels #1e293b, text #f1f5f9, accents #8b5cf6/#7c3aed.";

static TRAILING_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\{.*\}\s*$").expect("valid trailing object pattern"));

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("No CV uploaded yet.")]
    NoCv,

    #[error("Could not extract text from the CV.")]
    UnreadableCv,

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The model answered, but not with the expected object
    #[error("{detail}")]
    MalformedReply { detail: &'static str, raw: String },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub struct ProfileBuilder<'a> {
    pool: &'a SqlitePool,
    media_root: &'a Path,
    llm: &'a LlmConfig,
}

impl<'a> ProfileBuilder<'a> {
    pub fn new(pool: &'a SqlitePool, media_root: &'a Path, llm: &'a LlmConfig) -> Self {
        Self {
            pool,
            media_root,
            llm,
        }
    }

    /// Build `{profile, html}` from the newest CV. `base_url` makes the photo
    /// URL absolute (`http://host:port`).
    pub async fn generate(&self, base_url: &str) -> Result<Value, ProfileError> {
        let documents = DocumentRepository::new(self.pool);
        if documents.latest(DocumentType::Cv).await?.is_none() {
            return Err(ProfileError::NoCv);
        }

        let cv_text = latest_cv_text(self.pool, self.media_root)
            .await?
            .ok_or(ProfileError::UnreadableCv)?;

        let client = LlmClient::new(self.llm)?;
        let messages = [
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Here is the user's CV text:\n\n{}",
                truncate_chars(&cv_text, CV_CHAR_LIMIT)
            )),
        ];

        let reply = client.complete(&messages, None).await?;
        let mut payload = parse_profile_reply(&reply)?;

        if let Some(image) = documents.latest_image().await? {
            if let (Some(url), Some(profile)) = (
                image.file_url(),
                payload.get_mut("profile").and_then(Value::as_object_mut),
            ) {
                let photo = format!("{}{}", base_url.trim_end_matches('/'), url);
                info!("Attaching profile photo {}", photo);
                profile.insert("photo".to_string(), Value::String(photo));
            }
        }

        Ok(payload)
    }
}

/// Parse the model's reply into an object with `profile` and `html` keys.
/// Code fences are stripped; if the text still is not JSON, the trailing
/// `{...}` block is tried.
pub fn parse_profile_reply(raw: &str) -> Result<Value, ProfileError> {
    let mut text = raw;
    if text.starts_with("```") {
        text = text.trim_matches(|c| c == '`' || c == ' ' || c == '\n');
        if text
            .get(..4)
            .is_some_and(|tag| tag.eq_ignore_ascii_case("json"))
        {
            text = text[4..].trim_start();
        }
    }

    let malformed = |detail: &'static str| ProfileError::MalformedReply {
        detail,
        raw: truncate_chars(text, RAW_EXCERPT_CHARS).to_string(),
    };

    let payload: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(_) => {
            let candidate = TRAILING_OBJECT
                .find(text)
                .ok_or_else(|| malformed("Model did not return JSON"))?;
            serde_json::from_str(candidate.as_str()).map_err(|e| {
                warn!("Trailing object in model reply is not JSON: {}", e);
                malformed("Model did not return JSON")
            })?
        }
    };

    let has_keys = payload
        .as_object()
        .is_some_and(|map| map.contains_key("profile") && map.contains_key("html"));
    if !has_keys {
        return Err(malformed("Malformed JSON from model"));
    }

    Ok(payload)
}
