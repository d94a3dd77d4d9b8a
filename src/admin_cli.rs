// src/admin_cli.rs
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::core::{Database, FsOps};
use crate::documents::extractor::{clean_lines, try_extract_text};
use crate::documents::{DocumentFilter, DocumentRepository, DocumentType, NewDocument};
use crate::environment::EnvironmentConfig;
use crate::jobs::{
    infer, JobMatcher, JobQueryView, JobRepository, LinkedInClient, MatchError, MatchJobsRequest,
};
use crate::utils::sanitize_filename;

#[derive(Parser)]
#[command(name = "portfolio-admin")]
#[command(about = "Operate the portfolio backend: documents, CV text and job matching")]
pub struct AdminCli {
    #[command(subcommand)]
    pub command: AdminCommand,

    /// Overrides `database_path` from config.yaml
    #[arg(long)]
    pub database_path: Option<PathBuf>,

    /// Overrides `media_root` from config.yaml
    #[arg(long)]
    pub media_root: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum AdminCommand {
    /// Create directories and database tables
    Init,
    /// Store a local file as a document
    Upload {
        file: PathBuf,
        #[arg(long, default_value = "OTHER")]
        doc_type: String,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        external_url: String,
    },
    /// Show the most recent document of a type
    Latest {
        #[arg(long, default_value = "CV")]
        doc_type: String,
    },
    /// List documents, newest first
    Documents {
        #[arg(long)]
        doc_type: Option<String>,
        #[arg(long)]
        search: Option<String>,
    },
    /// Match jobs for the latest CV and print them as JSON
    MatchJobs {
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        location: Option<String>,
        /// LinkedIn `li_at` cookie value
        #[arg(long)]
        cookie: Option<String>,
    },
    /// Show recent job searches
    History {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Print the text extracted from a file
    Extract {
        file: PathBuf,
        /// Also print the inferred role and location
        #[arg(long)]
        infer: bool,
    },
}

pub async fn handle_admin_command(cli: AdminCli) -> Result<()> {
    match cli.command {
        AdminCommand::Extract { file, infer: show_inference } => extract_command(&file, show_inference),
        command => {
            let mut config = EnvironmentConfig::load()?;
            if let Some(path) = cli.database_path {
                config.database_path = path;
            }
            if let Some(path) = cli.media_root {
                config.media_root = path;
            }
            run_with_database(&config, command).await
        }
    }
}

async fn run_with_database(config: &EnvironmentConfig, command: AdminCommand) -> Result<()> {
    config.ensure_directories().await?;
    let db = Database::open(&config.database_path).await?;
    let pool = db.pool();
    let documents = DocumentRepository::new(pool);

    match command {
        AdminCommand::Init => {
            db.health_check().await?;
            info!("✅ Database ready at {}", config.database_path.display());
            info!("✅ Media root ready at {}", config.media_root.display());
        }

        AdminCommand::Upload {
            file,
            doc_type,
            title,
            description,
            external_url,
        } => {
            let doc_type: DocumentType = doc_type.parse()?;
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;

            let filename = sanitize_filename(
                &file
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default(),
            );
            let relative = FsOps::upload_relative_path(
                &config.media_root,
                &doc_type.as_str().to_lowercase(),
                &filename,
                Utc::now(),
            );
            FsOps::write_bytes(&config.media_root.join(&relative), &bytes).await?;

            let document = documents
                .create(&NewDocument {
                    doc_type,
                    title,
                    file_path: Some(relative.to_string_lossy().replace('\\', "/")),
                    external_url,
                    description,
                    original_name: relative
                        .file_name()
                        .map(|name| name.to_string_lossy().to_string())
                        .unwrap_or_default(),
                    size_bytes: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
                })
                .await?;

            info!("✅ Document #{} stored", document.id);
            info!("   Type: {}", document.doc_type.label());
            info!("   URL: {}", document.file_url().unwrap_or_default());
        }

        AdminCommand::Latest { doc_type } => {
            let doc_type: DocumentType = doc_type.parse()?;
            match documents.latest(doc_type).await? {
                Some(document) => {
                    info!("#{} [{}] {}", document.id, document.doc_type, document.display_name());
                    info!("   Uploaded: {}", document.uploaded_at.to_rfc3339());
                    if let Some(url) = document.file_url() {
                        info!("   File: {}", url);
                    }
                }
                None => info!("❌ No {} document uploaded", doc_type),
            }
        }

        AdminCommand::Documents { doc_type, search } => {
            let doc_type = doc_type.map(|t| t.parse::<DocumentType>()).transpose()?;
            let list = documents.list(&DocumentFilter { doc_type, search }).await?;

            if list.is_empty() {
                info!("No documents found");
            }
            for document in list {
                info!(
                    "#{:<4} {:<15} {:<40} {}",
                    document.id,
                    document.doc_type.as_str(),
                    document.display_name(),
                    document.uploaded_at.format("%Y-%m-%d %H:%M")
                );
            }
        }

        AdminCommand::MatchJobs {
            role,
            location,
            cookie,
        } => {
            let client = LinkedInClient::new(&config.job_board)?;
            let matcher = JobMatcher::new(pool, &config.media_root, &client)
                .with_cache_ttl_hours(config.job_board.cache_ttl_hours)
                .with_limit(config.job_board.result_limit);

            let request = MatchJobsRequest {
                cookie,
                override_role: role,
                override_location: location,
            };

            match matcher.match_jobs(&request).await {
                Ok(outcome) => {
                    info!(
                        "✅ {} jobs for '{}' in '{}'{}",
                        outcome.postings.len(),
                        outcome.query.role,
                        outcome.query.location,
                        if outcome.from_cache { " (cached)" } else { "" }
                    );
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&JobQueryView::from(&outcome))?
                    );
                }
                Err(MatchError::NoCv) => {
                    warn!("❌ No CV found or unreadable. Upload one with `portfolio-admin upload --doc-type CV <file>`");
                }
                Err(e) => {
                    error!("Job match failed: {}", e);
                    return Err(e.into());
                }
            }
        }

        AdminCommand::History { limit } => {
            let history = JobRepository::new(pool).history(limit).await?;
            if history.is_empty() {
                info!("No job searches yet");
            }
            for entry in history {
                info!(
                    "#{:<4} {} | {} in {} | {} postings",
                    entry.id,
                    entry.created_at.format("%Y-%m-%d %H:%M"),
                    entry.role,
                    entry.location,
                    entry.posting_count
                );
            }
        }

        AdminCommand::Extract { file, infer: show_inference } => extract_command(&file, show_inference)?,
    }

    Ok(())
}

fn extract_command(file: &Path, show_inference: bool) -> Result<()> {
    let text = match try_extract_text(file) {
        Ok(text) => clean_lines(&text),
        Err(e) => {
            error!("❌ {}", e);
            anyhow::bail!("Text extraction failed for {}", file.display());
        }
    };

    println!("{}", text);

    if show_inference {
        let (role, location) = infer(&text);
        info!("Role: {}", role);
        info!("Location: {}", location);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_match_jobs_arguments() {
        let cli = AdminCli::try_parse_from([
            "portfolio-admin",
            "--database-path",
            "/tmp/test.db",
            "match-jobs",
            "--role",
            "Data Engineer",
            "--cookie",
            "abc",
        ])
        .unwrap();

        assert_eq!(cli.database_path, Some(PathBuf::from("/tmp/test.db")));
        match cli.command {
            AdminCommand::MatchJobs {
                role,
                location,
                cookie,
            } => {
                assert_eq!(role.as_deref(), Some("Data Engineer"));
                assert_eq!(location, None);
                assert_eq!(cookie.as_deref(), Some("abc"));
            }
            _ => panic!("expected match-jobs"),
        }
    }

    #[test]
    fn upload_defaults_to_other() {
        let cli = AdminCli::try_parse_from(["portfolio-admin", "upload", "cv.pdf"]).unwrap();
        match cli.command {
            AdminCommand::Upload { file, doc_type, .. } => {
                assert_eq!(file, PathBuf::from("cv.pdf"));
                assert_eq!(doc_type, "OTHER");
            }
            _ => panic!("expected upload"),
        }
    }

    #[test]
    fn extract_reads_plain_text_without_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cv.txt");
        std::fs::write(&path, "Jane\nData Analyst\nLocation: Pune").unwrap();

        assert!(extract_command(&path, true).is_ok());
        assert!(extract_command(&dir.path().join("missing.txt"), false).is_err());
    }
}
