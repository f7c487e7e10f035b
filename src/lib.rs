//! Todo CRUD API: axum handlers over a SQLite-backed repository.

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod repository;
pub mod response;
pub mod route;
pub mod schema;
pub mod server;
pub mod telemetry;
pub mod validation;

use repository::TodoRepository;

// Struct representing the application state
pub struct AppState {
    repo: Arc<dyn TodoRepository>,
}

impl AppState {
    pub fn new(repo: Arc<dyn TodoRepository>) -> Self {
        Self { repo }
    }
}
