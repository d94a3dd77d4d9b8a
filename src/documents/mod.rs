// src/documents/mod.rs
//! Uploaded documents: model, persistence and text extraction

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod extractor;
pub mod store;

pub use extractor::{extract_text, latest_cv_text, ExtractError};
pub use store::{DocumentFilter, DocumentRepository};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "CV")]
    Cv,
    #[serde(rename = "CERTIFICATE")]
    Certificate,
    #[serde(rename = "RECOMMENDATION")]
    Recommendation,
    #[serde(rename = "PROFILE_IMAGE")]
    ProfileImage,
    #[serde(rename = "PROJECT")]
    Project,
    #[default]
    #[serde(rename = "OTHER")]
    Other,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::Cv,
        DocumentType::Certificate,
        DocumentType::Recommendation,
        DocumentType::ProfileImage,
        DocumentType::Project,
        DocumentType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Cv => "CV",
            DocumentType::Certificate => "CERTIFICATE",
            DocumentType::Recommendation => "RECOMMENDATION",
            DocumentType::ProfileImage => "PROFILE_IMAGE",
            DocumentType::Project => "PROJECT",
            DocumentType::Other => "OTHER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DocumentType::Cv => "CV / Résumé",
            DocumentType::Certificate => "Certificate",
            DocumentType::Recommendation => "Recommendation Letter",
            DocumentType::ProfileImage => "Profile Image",
            DocumentType::Project => "Project",
            DocumentType::Other => "Other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        DocumentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Unknown document type: {}. Use one of: CV, CERTIFICATE, RECOMMENDATION, PROFILE_IMAGE, PROJECT, OTHER",
                    s
                )
            })
    }
}

/// A stored upload. Project rows may be link-only, so `file_path` is optional.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: i64,
    pub doc_type: DocumentType,
    pub title: String,
    /// Relative to the media root
    pub file_path: Option<String>,
    pub external_url: String,
    pub description: String,
    pub original_name: String,
    pub size_bytes: i64,
    pub uploaded_at: DateTime<Utc>,
}

impl Document {
    /// Public URL of the stored file, as served under `/media`
    pub fn file_url(&self) -> Option<String> {
        self.file_path
            .as_deref()
            .map(|path| format!("/media/{}", path.trim_start_matches('/')))
    }

    pub fn display_name(&self) -> &str {
        if !self.title.is_empty() {
            &self.title
        } else if !self.original_name.is_empty() {
            &self.original_name
        } else {
            "Untitled"
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub doc_type: DocumentType,
    pub title: String,
    pub file_path: Option<String>,
    pub external_url: String,
    pub description: String,
    pub original_name: String,
    pub size_bytes: i64,
}

/// Partial edit of a stored document; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DocumentUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub external_url: Option<String>,
}
