//! `POST /invocations`: the assistant entry point over HTTP.
//!
//! Every request gets an `AssistantResponse` body, including malformed ones.
//! The status code follows the error class: 400 for validation, 503 when the
//! directory or hosted model is unavailable, 500 for routing failures.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use campusdesk_agent::runtime::{AssistantRequest, AssistantResponse, AssistantRuntime};
use tracing::warn;

#[derive(Clone)]
pub struct InvocationState {
    runtime: AssistantRuntime,
}

pub fn router(runtime: AssistantRuntime) -> Router {
    Router::new().route("/invocations", post(invoke)).with_state(InvocationState { runtime })
}

pub async fn invoke(
    State(state): State<InvocationState>,
    payload: Result<Json<AssistantRequest>, JsonRejection>,
) -> (StatusCode, Json<AssistantResponse>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(
                event_name = "http.invocations.bad_body",
                error = %rejection.body_text(),
                "request body is not a valid invocation"
            );
            // An absent prompt is rejected by the runtime with a validation error.
            AssistantRequest::default()
        }
    };

    let response = state.runtime.handle(request).await;
    (status_for(&response), Json(response))
}

fn status_for(response: &AssistantResponse) -> StatusCode {
    match response.error_class.as_deref() {
        None => StatusCode::OK,
        Some("validation") => StatusCode::BAD_REQUEST,
        Some("service_unavailable") => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use campusdesk_agent::runtime::AssistantRuntime;
    use campusdesk_core::config::AppConfig;
    use campusdesk_db::{
        connect_with_settings, migrations, seed_demo_data, DbPool, SqlDirectoryRepository,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    use super::router;

    async fn seeded_runtime() -> (DbPool, AssistantRuntime) {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("pool should connect");
        migrations::run_pending(&pool).await.expect("migrations");
        seed_demo_data(&pool).await.expect("seed");
        let directory = Arc::new(SqlDirectoryRepository::new(pool.clone()));
        let runtime = AssistantRuntime::from_config(&AppConfig::default(), directory)
            .expect("keyword runtime needs no model client");
        (pool, runtime)
    }

    async fn post(runtime: AssistantRuntime, body: &str) -> (StatusCode, Value) {
        let response = router(runtime)
            .oneshot(
                Request::post("/invocations")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn multi_domain_question_is_answered_and_then_cached() {
        let (pool, runtime) = seeded_runtime().await;
        let body = r#"{"prompt":"When is registration and how much are fees?","session_id":"web-1"}"#;

        let (status, first) = post(runtime.clone(), body).await;
        let (_, second) = post(runtime, body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["session_id"], "web-1");
        assert_eq!(first["cached"], false);
        assert_eq!(first["domains"], serde_json::json!(["calendar", "financial"]));
        assert!(first["response"]
            .as_str()
            .unwrap_or_default()
            .starts_with("I've consulted multiple departments for your query:"));
        assert!(first.get("error").is_none());
        assert_eq!(second["cached"], true);
        assert_eq!(second["response"], first["response"]);

        pool.close().await;
    }

    #[tokio::test]
    async fn empty_prompt_is_a_bad_request_with_structured_body() {
        let (pool, runtime) = seeded_runtime().await;

        let (status, body) = post(runtime, r#"{"prompt":"   "}"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_class"], "validation");
        assert!(body["session_id"].as_str().unwrap_or_default().starts_with("anon_"));
        assert!(body.get("response").is_none());

        pool.close().await;
    }

    #[tokio::test]
    async fn malformed_json_still_gets_a_structured_response() {
        let (pool, runtime) = seeded_runtime().await;

        let (status, body) = post(runtime, "{not json").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error_class"], "validation");

        pool.close().await;
    }

    #[tokio::test]
    async fn store_outage_maps_to_service_unavailable() {
        let (pool, runtime) = seeded_runtime().await;
        pool.close().await;

        let (status, body) = post(runtime, r#"{"prompt":"How much is school fees?"}"#).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error_class"], "service_unavailable");
    }
}
