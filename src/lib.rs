//! Library Management System
//!
//! REST JSON API for a book catalog with concurrency-safe lending, plus
//! ticket visibility resolution and notification addressing over an
//! organisational hierarchy.

use std::sync::Arc;

use sqlx::PgPool;

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod tickets;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
    pub pool: PgPool,
}
