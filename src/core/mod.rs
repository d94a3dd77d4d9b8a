// src/core/mod.rs
//! Shared infrastructure: database and file system

pub mod database;
pub mod fs_ops;

pub use database::{ping, Database, DatabaseConfig};
pub use fs_ops::FsOps;
