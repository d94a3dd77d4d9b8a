pub mod document_handlers;
pub mod job_handlers;
pub mod profile_handlers;
pub mod system_handlers;

pub use document_handlers::*;
pub use job_handlers::*;
pub use profile_handlers::*;
pub use system_handlers::*;

use rocket::http::Status;

use crate::web::types::{ApiError, StandardErrorResponse};

pub fn database_error() -> ApiError {
    StandardErrorResponse::new(
        "Database connection failed".to_string(),
        "DATABASE_ERROR".to_string(),
        vec!["Try again in a few moments".to_string()],
    )
    .with_status(Status::InternalServerError)
}
