// src/environment.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

const CONFIG_FILE: &str = "config.yaml";

pub const DEFAULT_SEARCH_URL: &str =
    "https://www.linkedin.com/jobs-guest/jobs/api/seeMoreJobPostings/search";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub media_root: PathBuf,
    pub database_path: PathBuf,
    pub log_file: PathBuf,
    #[serde(default)]
    pub job_board: JobBoardConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobBoardConfig {
    pub search_url: String,
    pub timeout_seconds: u64,
    pub result_limit: usize,
    pub cache_ttl_hours: i64,
}

impl Default for JobBoardConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.to_string(),
            timeout_seconds: 20,
            result_limit: 10,
            cache_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub timeout_seconds: u64,
    /// Filled from `OPENAI_API_KEY`, never read from the yaml file.
    #[serde(skip)]
    pub api_key: Option<String>,
    /// OpenAI-compatible endpoint tried when the primary call fails
    pub fallback_api_url: String,
    pub fallback_model: String,
    /// Filled from `GEMINI_API_KEY`; no key means no fallback.
    #[serde(skip)]
    pub fallback_api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            timeout_seconds: 120,
            api_key: None,
            fallback_api_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            fallback_model: "gemini-1.5-flash".to_string(),
            fallback_api_key: None,
        }
    }
}

impl LlmConfig {
    /// Settings for the secondary model, when its key is configured
    pub fn fallback(&self) -> Option<LlmConfig> {
        let key = self.fallback_api_key.clone().filter(|key| !key.is_empty())?;
        Some(LlmConfig {
            api_url: self.fallback_api_url.clone(),
            model: self.fallback_model.clone(),
            timeout_seconds: self.timeout_seconds,
            api_key: Some(key),
            fallback_api_key: None,
            ..self.clone()
        })
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentConfig,
    production: EnvironmentConfig,
}

impl EnvironmentConfig {
    /// Load configuration based on environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let config_path = PathBuf::from(CONFIG_FILE);
        if !config_path.exists() {
            anyhow::bail!("config.yaml not found in current directory. Server cannot start without configuration.");
        }

        let config_content =
            std::fs::read_to_string(&config_path).context("Failed to read config.yaml")?;

        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        let config = Self::from_yaml(&config_content, &environment, &current_dir)?;
        Ok(config.with_env_overrides())
    }

    fn get_environment() -> String {
        std::env::var("PORTFOLIO_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Parse a config document and pick the section for `environment`.
    /// Relative paths are resolved against `base_dir`.
    pub fn from_yaml(content: &str, environment: &str, base_dir: &Path) -> Result<Self> {
        let config_file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse config.yaml")?;

        let env_config = match environment {
            "production" => config_file.production,
            _ => config_file.local,
        };

        Ok(Self {
            media_root: Self::resolve_path(&env_config.media_root, base_dir),
            database_path: Self::resolve_path(&env_config.database_path, base_dir),
            log_file: Self::resolve_path(&env_config.log_file, base_dir),
            ..env_config
        })
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("JOB_BOARD_SEARCH_URL") {
            self.job_board.search_url = url;
        }
        self.llm.api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .map(|key| sanitize_api_key(&key))
            .filter(|key| !key.is_empty());
        self.llm.fallback_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .map(|key| sanitize_api_key(&key))
            .filter(|key| !key.is_empty());
        self
    }

    fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Ensure all configured directories exist
    pub async fn ensure_directories(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.media_root)
            .await
            .with_context(|| format!("Failed to create directory: {}", self.media_root.display()))?;

        for file in [&self.database_path, &self.log_file] {
            if let Some(parent) = file.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        info!("All configured directories ensured to exist");
        Ok(())
    }
}

/// Strip whitespace and zero-width characters that tend to sneak into pasted keys.
pub fn sanitize_api_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '\u{200b}' | '\u{200c}' | '\u{200d}' | '\u{feff}'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
local:
  media_root: media
  database_path: data/portfolio.db
  log_file: logs/api.log
  job_board:
    search_url: http://127.0.0.1:9999/search
    timeout_seconds: 5
    result_limit: 3
    cache_ttl_hours: 24
production:
  media_root: /app/media
  database_path: /app/data/portfolio.db
  log_file: /var/log/portfolio/api.log
"#;

    #[test]
    fn local_section_resolves_relative_paths() {
        let config = EnvironmentConfig::from_yaml(SAMPLE, "local", Path::new("/srv/app")).unwrap();

        assert_eq!(config.media_root, PathBuf::from("/srv/app/media"));
        assert_eq!(config.database_path, PathBuf::from("/srv/app/data/portfolio.db"));
        assert_eq!(config.job_board.result_limit, 3);
        assert_eq!(config.job_board.search_url, "http://127.0.0.1:9999/search");
    }

    #[test]
    fn production_section_falls_back_to_defaults() {
        let config =
            EnvironmentConfig::from_yaml(SAMPLE, "production", Path::new("/srv/app")).unwrap();

        assert_eq!(config.media_root, PathBuf::from("/app/media"));
        assert_eq!(config.job_board.search_url, DEFAULT_SEARCH_URL);
        assert_eq!(config.job_board.timeout_seconds, 20);
        assert_eq!(config.job_board.cache_ttl_hours, 24);
        assert_eq!(config.llm.model, "gpt-4o-mini");
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn unknown_environment_uses_local() {
        let config = EnvironmentConfig::from_yaml(SAMPLE, "staging", Path::new("/srv")).unwrap();
        assert_eq!(config.log_file, PathBuf::from("/srv/logs/api.log"));
    }

    #[test]
    fn sanitize_api_key_drops_invisible_characters() {
        assert_eq!(sanitize_api_key(" sk-abc\u{200b}123\n"), "sk-abc123");
    }

    #[test]
    fn fallback_model_needs_its_own_key() {
        let mut llm = LlmConfig {
            api_key: Some("sk-primary".to_string()),
            ..Default::default()
        };
        assert!(llm.fallback().is_none());

        llm.fallback_api_key = Some("gem-key".to_string());
        let fallback = llm.fallback().unwrap();
        assert_eq!(fallback.model, "gemini-1.5-flash");
        assert_eq!(fallback.api_key.as_deref(), Some("gem-key"));
        assert!(fallback.api_url.starts_with("https://generativelanguage.googleapis.com/"));
        assert!(fallback.fallback().is_none());
    }
}
