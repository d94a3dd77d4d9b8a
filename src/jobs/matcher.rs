// src/jobs/matcher.rs
//! Latest CV -> role/location -> cached or freshly scraped job list

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

use super::inference::infer;
use super::linkedin::{JobBoardError, JobSource};
use super::store::{JobPosting, JobQuery, JobRepository};
use super::MatchJobsRequest;
use crate::documents::latest_cv_text;

pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;
pub const DEFAULT_RESULT_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("No CV found or unreadable.")]
    NoCv,

    #[error("{source_name} fetch failed: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: JobBoardError,
    },

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug)]
pub struct MatchOutcome {
    pub query: JobQuery,
    pub postings: Vec<JobPosting>,
    pub from_cache: bool,
}

pub struct JobMatcher<'a> {
    pool: &'a SqlitePool,
    media_root: &'a Path,
    source: &'a dyn JobSource,
    cache_ttl: Duration,
    limit: usize,
}

impl<'a> JobMatcher<'a> {
    pub fn new(pool: &'a SqlitePool, media_root: &'a Path, source: &'a dyn JobSource) -> Self {
        Self {
            pool,
            media_root,
            source,
            cache_ttl: Duration::hours(DEFAULT_CACHE_TTL_HOURS),
            limit: DEFAULT_RESULT_LIMIT,
        }
    }

    pub fn with_cache_ttl_hours(mut self, hours: i64) -> Self {
        self.cache_ttl = Duration::hours(hours);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Serve jobs for the newest CV. A query younger than the cache TTL with
    /// at least one posting is returned as is; otherwise the source is hit and
    /// a new query is stored. Nothing is written when the fetch fails.
    pub async fn match_jobs(&self, request: &MatchJobsRequest) -> Result<MatchOutcome, MatchError> {
        let cv_text = latest_cv_text(self.pool, self.media_root)
            .await?
            .ok_or(MatchError::NoCv)?;

        let (inferred_role, inferred_location) = infer(&cv_text);
        let role = non_blank(request.override_role.as_deref())
            .map(str::to_string)
            .unwrap_or(inferred_role);
        let location = non_blank(request.override_location.as_deref())
            .map(str::to_string)
            .unwrap_or(inferred_location);
        let cookie = non_blank(request.cookie.as_deref());

        let now = Utc::now();
        let repo = JobRepository::new(self.pool);

        if let Some(cached) = repo
            .find_recent_query(&role, &location, now - self.cache_ttl)
            .await?
        {
            let postings = repo.postings_for(cached.id).await?;
            if !postings.is_empty() {
                info!(
                    "Serving {} cached jobs for '{}' in '{}' (query #{})",
                    postings.len(),
                    role,
                    location,
                    cached.id
                );
                return Ok(MatchOutcome {
                    query: cached,
                    postings,
                    from_cache: true,
                });
            }
        }

        let scraped = self
            .source
            .search(&role, &location, cookie, self.limit)
            .await
            .map_err(|error| {
                warn!("{} fetch failed: {}", self.source.name(), error);
                MatchError::Fetch {
                    source_name: self.source.name().to_string(),
                    error,
                }
            })?;

        let query = repo.create_query(&role, &location, now).await?;
        let postings = repo.insert_postings(query.id, &scraped, now).await?;

        Ok(MatchOutcome {
            query,
            postings,
            from_cache: false,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
