use axum::{
    extract::{
        rejection::{FormRejection, PathRejection},
        Path, State,
    },
    response::{Html, Response},
    Form,
};
use tracing::warn;

use crate::applications::store;
use crate::applications::validation::{ApplicationForm, EditForm, StatusForm};
use crate::applications::views::{
    back_to_listing, inline_error, removed, render_index, render_row, ResponseMode,
};
use crate::errors::AppError;
use crate::models::application::JobApplication;
use crate::state::AppState;

type IdPath = Result<Path<i64>, PathRejection>;

/// GET /
pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let applications = store::list_all(&state.db).await?;
    render_index(&applications)
}

/// POST /applications
pub async fn create(
    State(state): State<AppState>,
    mode: ResponseMode,
    form: Result<Form<ApplicationForm>, FormRejection>,
) -> Result<Response, AppError> {
    let outcome = async {
        let Form(form) = form?;
        let new = form.validate()?;
        let created = store::create(&state.db, new, state.config.duplicate_match).await?;
        Ok::<_, AppError>(created)
    }
    .await;

    answer_with_row(mode, outcome, "Create")
}

/// POST /applications/:id/edit
pub async fn edit(
    State(state): State<AppState>,
    path: IdPath,
    mode: ResponseMode,
    form: Result<Form<EditForm>, FormRejection>,
) -> Result<Response, AppError> {
    let outcome = async {
        let Path(id) = path?;
        let Form(form) = form?;
        let changes = form.validate()?;
        Ok::<_, AppError>(store::update(&state.db, id, changes).await?)
    }
    .await;

    answer_with_row(mode, outcome, "Edit")
}

/// POST /applications/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    path: IdPath,
    mode: ResponseMode,
    form: Result<Form<StatusForm>, FormRejection>,
) -> Result<Response, AppError> {
    let outcome = async {
        let Path(id) = path?;
        let Form(form) = form?;
        let changes = form.validate()?;
        Ok::<_, AppError>(store::update(&state.db, id, changes).await?)
    }
    .await;

    answer_with_row(mode, outcome, "Status change")
}

/// POST /applications/:id/delete
pub async fn delete(
    State(state): State<AppState>,
    path: IdPath,
    mode: ResponseMode,
) -> Result<Response, AppError> {
    let outcome = async {
        let Path(id) = path?;
        Ok::<_, AppError>(store::delete(&state.db, id).await?)
    }
    .await;

    match mode {
        ResponseMode::Fragment => match outcome {
            Ok(_) => Ok(removed()),
            Err(e) => inline_error(e),
        },
        ResponseMode::Page => {
            if let Err(e) = outcome {
                warn!("Delete from form failed: {e}");
            }
            Ok(back_to_listing())
        }
    }
}

fn answer_with_row(
    mode: ResponseMode,
    outcome: Result<JobApplication, AppError>,
    action: &str,
) -> Result<Response, AppError> {
    match mode {
        ResponseMode::Fragment => match outcome {
            Ok(app) => render_row(&app),
            Err(e) => inline_error(e),
        },
        ResponseMode::Page => {
            if let Err(e) = outcome {
                warn!("{action} from form failed: {e}");
            }
            Ok(back_to_listing())
        }
    }
}
