use askama::Template;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
};
use std::convert::Infallible;

use crate::errors::AppError;
use crate::models::application::{ApplicationStatus, JobApplication};

/// Element on the full page that receives inline error fragments.
pub const ERROR_REGION: &str = "#form-error";

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage<'a> {
    pub applications: &'a [JobApplication],
    pub statuses: &'a [ApplicationStatus],
}

#[derive(Template)]
#[template(path = "partials/row.html")]
pub struct ApplicationRow<'a> {
    pub app: &'a JobApplication,
}

#[derive(Template)]
#[template(path = "partials/form_error.html")]
pub struct FormError<'a> {
    pub message: &'a str,
}

/// How an HTML write should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// Normal browser navigation: redirect back to the listing.
    Page,
    /// In-page script: answer with just the affected markup.
    Fragment,
}

impl ResponseMode {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let htmx = headers
            .get("hx-request")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let xhr = headers
            .get("x-requested-with")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"));

        if htmx || xhr {
            ResponseMode::Fragment
        } else {
            ResponseMode::Page
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ResponseMode
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ResponseMode::from_headers(&parts.headers))
    }
}

pub fn render_index(applications: &[JobApplication]) -> Result<Html<String>, AppError> {
    let page = IndexPage {
        applications,
        statuses: &ApplicationStatus::ALL,
    };
    Ok(Html(page.render()?))
}

pub fn render_row(app: &JobApplication) -> Result<Response, AppError> {
    Ok(Html(ApplicationRow { app }.render()?).into_response())
}

/// Redirect-after-write back to the listing.
pub fn back_to_listing() -> Response {
    Redirect::to("/").into_response()
}

/// Renders a user-facing failure into the inline error region. Server faults
/// have nothing to show the user and are passed through.
pub fn inline_error(err: AppError) -> Result<Response, AppError> {
    let Some(message) = err.public_message().map(str::to_string) else {
        return Err(err);
    };

    let body = FormError { message: &message }.render()?;
    let mut response = (err.status(), Html(body)).into_response();
    let headers = response.headers_mut();
    headers.insert("hx-retarget", HeaderValue::from_static(ERROR_REGION));
    headers.insert("hx-reswap", HeaderValue::from_static("innerHTML"));
    Ok(response)
}

/// Empty body for a removed row.
pub fn removed() -> Response {
    (StatusCode::OK, Html(String::new())).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::application::now;

    fn sample() -> JobApplication {
        JobApplication {
            id: 42,
            company: "Acme <Rockets>".into(),
            role: "Engineer".into(),
            status: ApplicationStatus::Offer,
            created_at: now(),
            updated_at: now(),
        }
    }

    #[test]
    fn test_response_mode_detection() {
        let mut headers = HeaderMap::new();
        assert_eq!(ResponseMode::from_headers(&headers), ResponseMode::Page);

        headers.insert("hx-request", HeaderValue::from_static("true"));
        assert_eq!(ResponseMode::from_headers(&headers), ResponseMode::Fragment);

        let mut headers = HeaderMap::new();
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));
        assert_eq!(ResponseMode::from_headers(&headers), ResponseMode::Fragment);

        let mut headers = HeaderMap::new();
        headers.insert("hx-request", HeaderValue::from_static("false"));
        assert_eq!(ResponseMode::from_headers(&headers), ResponseMode::Page);
    }

    #[test]
    fn test_row_escapes_and_selects_status() {
        let app = sample();
        let html = ApplicationRow { app: &app }.render().unwrap();

        assert!(html.contains(r#"id="application-42""#));
        assert!(html.contains("Acme &lt;Rockets&gt;"));
        assert!(html.contains(r#"<option value="Offer" selected>"#));
        assert!(html.contains(r#"action="/applications/42/delete""#));
    }

    #[test]
    fn test_index_lists_rows() {
        let apps = vec![sample()];
        let Html(html) = render_index(&apps).unwrap();
        assert!(html.contains(r#"id="form-error""#));
        assert!(html.contains(r#"id="application-42""#));
    }

    #[test]
    fn test_inline_error_targets_error_region() {
        let response = inline_error(AppError::Conflict("already there".into())).unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()["hx-retarget"], ERROR_REGION);
    }

    #[test]
    fn test_inline_error_passes_server_faults_through() {
        let err = inline_error(AppError::Internal(anyhow::anyhow!("boom"))).unwrap_err();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
