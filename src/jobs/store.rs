// src/jobs/store.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use super::ScrapedJob;

// Served by idx_job_queries_lookup; role and location are NOCASE columns.
const RECENT_QUERY_SQL: &str = r#"
    SELECT id, role, location, created_at FROM job_queries
    WHERE role = ? COLLATE NOCASE
      AND location = ? COLLATE NOCASE
      AND created_at >= ?
    ORDER BY created_at DESC, id DESC
    LIMIT 1
"#;

/// One executed search; its postings hang off it
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct JobQuery {
    pub id: i64,
    pub role: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct JobPosting {
    pub id: i64,
    pub query_id: i64,
    pub job_id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub via: String,
    pub created_at: DateTime<Utc>,
}

/// History row: a query and how many postings it produced
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct JobQuerySummary {
    pub id: i64,
    pub role: String,
    pub location: String,
    pub created_at: DateTime<Utc>,
    pub posting_count: i64,
}

pub struct JobRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> JobRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Newest query for this role and location created at or after `since`.
    /// Role and location compare case-insensitively.
    pub async fn find_recent_query(
        &self,
        role: &str,
        location: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<JobQuery>> {
        let query = sqlx::query_as::<_, JobQuery>(RECENT_QUERY_SQL)
        .bind(role)
        .bind(location)
        .bind(since)
        .fetch_optional(self.pool)
        .await
        .context("Failed to look up cached job query")?;

        Ok(query)
    }

    pub async fn create_query(
        &self,
        role: &str,
        location: &str,
        created_at: DateTime<Utc>,
    ) -> Result<JobQuery> {
        let result =
            sqlx::query("INSERT INTO job_queries (role, location, created_at) VALUES (?, ?, ?)")
                .bind(role)
                .bind(location)
                .bind(created_at)
                .execute(self.pool)
                .await
                .context("Failed to insert job query")?;

        let query = JobQuery {
            id: result.last_insert_rowid(),
            role: role.to_string(),
            location: location.to_string(),
            created_at,
        };

        debug!("Created job query #{} ({} / {})", query.id, role, location);
        Ok(query)
    }

    /// Insert all postings for a query in one transaction. A duplicate
    /// `(query_id, job_id)` fails the whole batch.
    pub async fn insert_postings(
        &self,
        query_id: i64,
        jobs: &[ScrapedJob],
        created_at: DateTime<Utc>,
    ) -> Result<Vec<JobPosting>> {
        let mut tx = self.pool.begin().await?;
        let mut postings = Vec::with_capacity(jobs.len());

        for job in jobs {
            let result = sqlx::query(
                r#"
                INSERT INTO job_postings (query_id, job_id, title, company, location, url, via, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(query_id)
            .bind(&job.job_id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.url)
            .bind(&job.via)
            .bind(created_at)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to insert posting {} for query #{}", job.job_id, query_id))?;

            postings.push(JobPosting {
                id: result.last_insert_rowid(),
                query_id,
                job_id: job.job_id.clone(),
                title: job.title.clone(),
                company: job.company.clone(),
                location: job.location.clone(),
                url: job.url.clone(),
                via: job.via.clone(),
                created_at,
            });
        }

        tx.commit().await?;

        info!("Stored {} postings for query #{}", postings.len(), query_id);
        Ok(postings)
    }

    /// Postings in insertion order
    pub async fn postings_for(&self, query_id: i64) -> Result<Vec<JobPosting>> {
        let postings = sqlx::query_as::<_, JobPosting>(
            r#"
            SELECT id, query_id, job_id, title, company, location, url, via, created_at
            FROM job_postings
            WHERE query_id = ?
            ORDER BY id
            "#,
        )
        .bind(query_id)
        .fetch_all(self.pool)
        .await?;

        Ok(postings)
    }

    /// Most recent queries first
    pub async fn history(&self, limit: i64) -> Result<Vec<JobQuerySummary>> {
        let rows = sqlx::query_as::<_, JobQuerySummary>(
            r#"
            SELECT q.id, q.role, q.location, q.created_at, COUNT(p.id) AS posting_count
            FROM job_queries q
            LEFT JOIN job_postings p ON p.query_id = q.id
            GROUP BY q.id
            ORDER BY q.created_at DESC, q.id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn get_query(&self, id: i64) -> Result<Option<JobQuery>> {
        let query = sqlx::query_as::<_, JobQuery>(
            "SELECT id, role, location, created_at FROM job_queries WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(query)
    }
}
