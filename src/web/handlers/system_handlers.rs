// src/web/handlers/system_handlers.rs
use rocket::serde::json::Json;
use rocket::State;
use tracing::{info, warn};

use crate::core::{ping, DatabaseConfig};

pub async fn health_handler(db_config: &State<DatabaseConfig>) -> Json<&'static str> {
    match db_config.pool() {
        Ok(pool) => match ping(pool).await {
            Ok(()) => info!("Health check: database reachable"),
            Err(e) => warn!("Health check: {:#}", e),
        },
        Err(e) => warn!("Health check: {}", e),
    }
    Json("OK")
}
