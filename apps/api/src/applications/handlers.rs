use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::applications::store::{self, ApplicationChanges};
use crate::applications::validation::{validate_changes, CreateApplication, PageQuery};
use crate::errors::AppError;
use crate::models::application::JobApplication;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct PagedApplications {
    pub items: Vec<JobApplication>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
    pub has_more: bool,
}

/// GET /api/applications
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<JobApplication>>, AppError> {
    Ok(Json(store::list_all(&state.db).await?))
}

/// GET /api/applications/paged
pub async fn list_paged(
    State(state): State<AppState>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<PagedApplications>, AppError> {
    let Query(params) = query?;
    let page = params.validate()?;

    let total = store::count(&state.db, &page.filter).await?;
    let items = store::list_page(&state.db, &page.filter, page.limit, page.offset).await?;

    Ok(Json(PagedApplications {
        items,
        total,
        limit: page.limit,
        offset: page.offset,
        has_more: page.offset.saturating_add(page.limit) < total,
    }))
}

/// GET /api/applications/:id
pub async fn get(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<JobApplication>, AppError> {
    let Path(id) = path?;
    Ok(Json(store::get(&state.db, id).await?))
}

/// POST /api/applications
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<CreateApplication>, JsonRejection>,
) -> Result<(StatusCode, Json<JobApplication>), AppError> {
    let Json(req) = body?;
    let new = req.validate()?;
    let created = store::create(&state.db, new, state.config.duplicate_match).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// PATCH /api/applications/:id
pub async fn update(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<ApplicationChanges>, JsonRejection>,
) -> Result<Json<JobApplication>, AppError> {
    let Path(id) = path?;
    let Json(req) = body?;
    let changes = validate_changes(req)?;
    Ok(Json(store::update(&state.db, id, changes).await?))
}

/// DELETE /api/applications/:id
pub async fn delete(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let Path(id) = path?;
    store::delete(&state.db, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
