use std::sync::Arc;

use config::Config;
use inference::SentimentClassifier;
use session::SessionStore;
use sqlx::PgPool;

pub mod config;
pub mod database;
pub mod error;
pub mod inference;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod session;
pub mod templates;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub sessions: SessionStore,
    pub classifier: Arc<SentimentClassifier>,
}
