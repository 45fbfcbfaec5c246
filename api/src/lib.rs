pub mod config;
pub mod constants;
pub mod domain;
pub mod error;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod services;
pub mod store;
pub mod worker;

use std::sync::Arc;

use sqlx::PgPool;

use scheduler::PostScheduler;
use services::threads::Publisher;
use store::AutomationStore;

/// Shared state for route handlers
pub struct AppState {
    pub db: PgPool,
    pub store: Arc<dyn AutomationStore>,
    pub publisher: Arc<dyn Publisher>,
    pub scheduler: Arc<PostScheduler>,
    pub service_token: String,
}
