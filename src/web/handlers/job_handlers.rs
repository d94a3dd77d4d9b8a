// src/web/handlers/job_handlers.rs
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::core::DatabaseConfig;
use crate::jobs::{
    JobMatcher, JobQuerySummary, JobQueryView, JobRepository, JobSource, MatchError,
    MatchJobsRequest,
};
use crate::web::handlers::database_error;
use crate::web::types::{ApiError, DataResponse, DetailError, DetailResponse, ServerConfig};

const DEFAULT_HISTORY_LIMIT: i64 = 20;
const MAX_HISTORY_LIMIT: i64 = 100;

pub async fn match_jobs_handler(
    request: Option<Json<MatchJobsRequest>>,
    config: &State<ServerConfig>,
    db_config: &State<DatabaseConfig>,
    job_source: &State<Arc<dyn JobSource>>,
) -> Result<Json<JobQueryView>, DetailError> {
    let request = request.map(Json::into_inner).unwrap_or_default();

    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        DetailResponse::error(Status::InternalServerError, "Database connection failed")
    })?;

    let matcher = JobMatcher::new(pool, &config.media_root, job_source.inner().as_ref())
        .with_cache_ttl_hours(config.cache_ttl_hours)
        .with_limit(config.result_limit);

    match matcher.match_jobs(&request).await {
        Ok(outcome) => {
            info!(
                "Returning {} jobs for '{}' in '{}' (cached: {})",
                outcome.postings.len(),
                outcome.query.role,
                outcome.query.location,
                outcome.from_cache
            );
            Ok(Json(JobQueryView::from(&outcome)))
        }
        Err(e @ MatchError::NoCv) => {
            warn!("Job match requested without a readable CV");
            Err(DetailResponse::error(Status::BadRequest, e.to_string()))
        }
        Err(e @ MatchError::Fetch { .. }) => {
            Err(DetailResponse::error(Status::BadGateway, e.to_string()))
        }
        Err(MatchError::Storage(e)) => {
            error!("Job match storage failure: {:#}", e);
            Err(DetailResponse::error(
                Status::InternalServerError,
                "Failed to store job results",
            ))
        }
    }
}

pub async fn job_history_handler(
    limit: Option<i64>,
    db_config: &State<DatabaseConfig>,
) -> Result<Json<DataResponse<Vec<JobQuerySummary>>>, ApiError> {
    let limit = limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);

    let pool = db_config.pool().map_err(|e| {
        error!("Database connection failed: {}", e);
        database_error()
    })?;

    match JobRepository::new(pool).history(limit).await {
        Ok(history) => Ok(Json(DataResponse::success(
            format!("{} recent job searches", history.len()),
            history,
        ))),
        Err(e) => {
            error!("Failed to load job history: {}", e);
            Err(database_error())
        }
    }
}
