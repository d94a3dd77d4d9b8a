// src/lib.rs
//! Backend for a personal portfolio site: stored documents, CV text
//! extraction, LLM-assisted profile generation and CV-driven job matching.

pub mod admin_cli;
pub mod core;
pub mod documents;
pub mod environment;
pub mod jobs;
pub mod portfolio;
pub mod utils;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

pub use environment::EnvironmentConfig;
pub use web::{build_rocket, start_web_server};
