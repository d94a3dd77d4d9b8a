// src/core/fs_ops.rs
//! File system operations for the media root

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

pub struct FsOps;

impl FsOps {
    /// Ensure directory exists
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            info!("Created directory: {}", path.display());
        }
        Ok(())
    }

    /// Write bytes, creating parent directories as needed
    pub async fn write_bytes(path: &Path, content: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        info!("Written file: {}", path.display());
        Ok(())
    }

    /// Remove a file if it is still there; failures are only logged
    pub async fn remove_file_quietly(path: &Path) {
        if path.exists() {
            if let Err(e) = fs::remove_file(path).await {
                warn!("Failed to remove {}: {}", path.display(), e);
            } else {
                info!("Removed file: {}", path.display());
            }
        }
    }

    /// Relative storage path for an upload: `uploads/YYYY/MM/DD/<prefix>_<filename>`.
    /// A short random suffix is added when the name is already taken.
    pub fn upload_relative_path(
        media_root: &Path,
        prefix: &str,
        filename: &str,
        now: DateTime<Utc>,
    ) -> PathBuf {
        let dir = PathBuf::from("uploads").join(now.format("%Y/%m/%d").to_string());
        let candidate = dir.join(format!("{}_{}", prefix, filename));
        if !media_root.join(&candidate).exists() {
            return candidate;
        }

        let path = Path::new(filename);
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let unique = match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => format!("{}_{}_{}.{}", prefix, stem, &suffix[..7], ext),
            None => format!("{}_{}_{}", prefix, stem, &suffix[..7]),
        };
        dir.join(unique)
    }
}
