// src/portfolio/mod.rs
//! LLM-backed features built on the latest CV

pub mod assistant;
pub mod llm_client;
pub mod profile_builder;

pub use assistant::{AssistantError, CvAssistant};
pub use llm_client::{ChatMessage, LlmClient, LlmError};
pub use profile_builder::{parse_profile_reply, ProfileBuilder, ProfileError};
