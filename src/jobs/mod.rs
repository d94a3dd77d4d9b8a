// src/jobs/mod.rs
//! CV-driven job matching: role/location inference, job board scraping and a
//! 24 hour result cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod inference;
pub mod linkedin;
pub mod matcher;
pub mod store;

pub use inference::infer;
pub use linkedin::{JobBoardError, JobSource, LinkedInClient};
pub use matcher::{JobMatcher, MatchError, MatchOutcome};
pub use store::{JobPosting, JobQuery, JobQuerySummary, JobRepository};

/// A listing as parsed from the job board, before it is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedJob {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub via: String,
}

/// Body of a match request; every field is optional
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchJobsRequest {
    /// Value of the `li_at` session cookie
    #[serde(default)]
    pub cookie: Option<String>,
    #[serde(default)]
    pub override_role: Option<String>,
    #[serde(default)]
    pub override_location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobPostingView {
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub via: String,
    pub created_at: DateTime<Utc>,
}

/// Wire shape of a query with its postings
#[derive(Debug, Serialize)]
pub struct JobQueryView {
    pub role: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub jobs: Vec<JobPostingView>,
}

impl From<&MatchOutcome> for JobQueryView {
    fn from(outcome: &MatchOutcome) -> Self {
        Self {
            role: outcome.query.role.clone(),
            location: outcome.query.location.clone(),
            created_at: outcome.query.created_at,
            jobs: outcome
                .postings
                .iter()
                .map(|posting| JobPostingView {
                    job_id: posting.job_id.clone(),
                    title: posting.title.clone(),
                    company: posting.company.clone(),
                    location: posting.location.clone(),
                    url: posting.url.clone(),
                    via: posting.via.clone(),
                    created_at: posting.created_at,
                })
                .collect(),
        }
    }
}
