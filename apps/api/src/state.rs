use sqlx::AnyPool;

use crate::config::Config;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: AnyPool,
    pub config: Config,
}
