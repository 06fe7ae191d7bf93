use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use hirelink::workflows::applications::{
    application_router, ApplicantDirectory, ApplicationDesk, ApplicationGateway, JobDirectory,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_application_routes<J, P, G>(
    desk: Arc<ApplicationDesk<J, P, G>>,
) -> axum::Router
where
    J: JobDirectory + 'static,
    P: ApplicantDirectory + 'static,
    G: ApplicationGateway + 'static,
{
    application_router(desk)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::InMemoryRecruitment;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn router(state: AppState) -> axum::Router {
        let backend = Arc::new(InMemoryRecruitment::seeded());
        let desk = Arc::new(ApplicationDesk::new(
            backend.clone(),
            backend.clone(),
            backend,
        ));
        with_application_routes(desk).layer(Extension(state))
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn readiness_tracks_the_flag() {
        let state = app_state(false);
        let (status, _) = readiness_status(state.clone()).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        state.readiness.store(true, Ordering::Release);
        let (status, payload) = readiness_status(state).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload["status"], "ready");
    }

    async fn readiness_status(state: AppState) -> (StatusCode, serde_json::Value) {
        let response = router(state)
            .oneshot(Request::get("/ready").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        let status = response.status();
        (status, body_json(response).await)
    }

    #[tokio::test]
    async fn health_and_metrics_are_served_next_to_application_routes() {
        let app = router(app_state(true));

        let health = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(body_json(health).await["status"], "ok");

        let metrics = app
            .clone()
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("route executes");
        assert_eq!(metrics.status(), StatusCode::OK);
        assert_eq!(
            metrics.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );

        let submitted = app
            .oneshot(
                Request::post("/api/v1/applicants/9/jobs/42/application")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(submitted.status(), StatusCode::OK);
        assert_eq!(body_json(submitted).await["progress"]["phase"], "success");
    }
}
