//! Traffic Router
//!
//! Routes each inbound visit to the highest-value target whose acceptance
//! rules admit it and whose daily quota is not yet used up. Targets and quota
//! counters live in Redis (or in process memory for single-instance use).

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
