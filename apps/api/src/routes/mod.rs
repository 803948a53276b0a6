pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::applications::{handlers, pages};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // HTML surface
        .route("/", get(pages::index))
        .route("/applications", post(pages::create))
        .route("/applications/:id/edit", post(pages::edit))
        .route("/applications/:id/status", post(pages::update_status))
        .route("/applications/:id/delete", post(pages::delete))
        // JSON API
        .route(
            "/api/applications",
            get(handlers::list).post(handlers::create),
        )
        .route("/api/applications/paged", get(handlers::list_paged))
        .route(
            "/api/applications/:id",
            get(handlers::get)
                .patch(handlers::update)
                .delete(handlers::delete),
        )
        .with_state(state)
}
