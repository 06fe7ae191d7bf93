use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::desk::ApplicationDesk;
use super::domain::{ApplicantId, JobId};
use super::gateway::{ApplicantDirectory, ApplicationGateway, JobDirectory};
use super::guard::SubmissionKey;
use super::orchestrator::{RetryError, SubmitRejected};
use super::progress::{report, ProgressReport};
use super::session::SubmissionSession;

/// Session plus its presentation projection, as returned to the UI.
#[derive(Debug, Clone, Serialize)]
pub struct SessionEnvelope {
    pub session: SubmissionSession,
    pub progress: ProgressReport,
}

impl From<SubmissionSession> for SessionEnvelope {
    fn from(session: SubmissionSession) -> Self {
        let progress = report(&session);
        Self { session, progress }
    }
}

/// Router builder exposing submit, retry, status, abandon and applied-set refresh.
pub fn application_router<J, P, G>(desk: Arc<ApplicationDesk<J, P, G>>) -> Router
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    Router::new()
        .route(
            "/api/v1/applicants/:applicant_id/jobs/:job_id/application",
            post(submit_handler::<J, P, G>)
                .get(status_handler::<J, P, G>)
                .delete(abandon_handler::<J, P, G>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/jobs/:job_id/application/retry",
            post(retry_handler::<J, P, G>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/applied/refresh",
            post(refresh_handler::<J, P, G>),
        )
        .with_state(desk)
}

fn parse_key(applicant_id: &str, job_id: &str) -> Result<SubmissionKey, Response> {
    let applicant_id = applicant_id.parse::<ApplicantId>().map_err(bad_request)?;
    let job_id = job_id.parse::<JobId>().map_err(bad_request)?;
    Ok(SubmissionKey::new(applicant_id, job_id))
}

fn bad_request(error: impl std::fmt::Display) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "kind": "invalid_input",
    });
    (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response()
}

fn conflict(error: impl std::fmt::Display, kind: &str) -> Response {
    let payload = json!({
        "error": error.to_string(),
        "kind": kind,
    });
    (StatusCode::CONFLICT, axum::Json(payload)).into_response()
}

pub(crate) async fn submit_handler<J, P, G>(
    State(desk): State<Arc<ApplicationDesk<J, P, G>>>,
    Path((applicant_id, job_id)): Path<(String, String)>,
) -> Response
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    let key = match parse_key(&applicant_id, &job_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match desk.apply(key.job_id, key.applicant_id).await {
        Ok(session) => (StatusCode::OK, axum::Json(SessionEnvelope::from(session))).into_response(),
        Err(error @ SubmitRejected::Busy(_)) => conflict(error, "busy"),
    }
}

pub(crate) async fn retry_handler<J, P, G>(
    State(desk): State<Arc<ApplicationDesk<J, P, G>>>,
    Path((applicant_id, job_id)): Path<(String, String)>,
) -> Response
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    let key = match parse_key(&applicant_id, &job_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match desk.retry(key).await {
        Ok(session) => (StatusCode::OK, axum::Json(SessionEnvelope::from(session))).into_response(),
        Err(error @ RetryError::NoSession { .. }) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error @ RetryError::NotRetryable { .. }) => conflict(error, "not_retryable"),
        Err(error @ RetryError::Busy(_)) => conflict(error, "busy"),
    }
}

pub(crate) async fn status_handler<J, P, G>(
    State(desk): State<Arc<ApplicationDesk<J, P, G>>>,
    Path((applicant_id, job_id)): Path<(String, String)>,
) -> Response
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    let key = match parse_key(&applicant_id, &job_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match desk.session(key) {
        Some(session) => {
            (StatusCode::OK, axum::Json(SessionEnvelope::from(session))).into_response()
        }
        None => {
            let payload = json!({
                "error": format!("no submission session recorded for {key}"),
                "applied": desk.applied().contains(key.applicant_id, key.job_id),
            });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn abandon_handler<J, P, G>(
    State(desk): State<Arc<ApplicationDesk<J, P, G>>>,
    Path((applicant_id, job_id)): Path<(String, String)>,
) -> Response
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    let key = match parse_key(&applicant_id, &job_id) {
        Ok(key) => key,
        Err(response) => return response,
    };

    match desk.abandon(key) {
        Ok(Some(session)) => {
            (StatusCode::OK, axum::Json(SessionEnvelope::from(session))).into_response()
        }
        Ok(None) => {
            let payload = json!({ "error": format!("no submission session recorded for {key}") });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(error) => conflict(error, "busy"),
    }
}

pub(crate) async fn refresh_handler<J, P, G>(
    State(desk): State<Arc<ApplicationDesk<J, P, G>>>,
    Path(applicant_id): Path<String>,
) -> Response
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    let applicant_id = match applicant_id.parse::<ApplicantId>() {
        Ok(id) => id,
        Err(error) => return bad_request(error),
    };

    match desk.refresh_applied(applicant_id).await {
        Ok(added) => {
            let payload = json!({
                "added": added,
                "applied_job_ids": desk.applied().snapshot(applicant_id),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => {
            let payload = json!({ "error": error.to_string() });
            (StatusCode::BAD_GATEWAY, axum::Json(payload)).into_response()
        }
    }
}
