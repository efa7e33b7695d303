use axum::{
    extract::State,
    http::Method,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{Map, Value};

use crate::api::errors::{ApiError, BACKEND_UNREACHABLE};
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;
use crate::schemas::submission::SubmitInterviewBody;
use crate::services::backend::{BackendError, BackendReply, BackendRequest};

const ANSWER_SERVER_ERROR: &str =
    "Lỗi máy chủ nội bộ khi nộp câu trả lời. Vui lòng thử lại.";
const END_SERVER_ERROR: &str =
    "Lỗi máy chủ nội bộ. Vui lòng thử lại sau hoặc liên hệ quản trị viên.";
const CONNECT_ERROR: &str =
    "Không thể kết nối đến máy chủ. Vui lòng kiểm tra kết nối mạng hoặc liên hệ quản trị viên.";
const TIMEOUT_ERROR: &str = "Yêu cầu quá thời gian chờ. Vui lòng thử lại.";

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/history", get(history))
        .route("/results", get(results))
        .route("/result-status", get(result_status))
        .route("/submit-interview", post(submit_interview))
}

async fn history(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(&state, inbound, "results.history", "/api/history".into(), "Failed to get history")
        .await
}

async fn results(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(&state, inbound, "results.list", "/api/results".into(), "Failed to get results")
        .await
}

async fn result_status(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "results.status",
        "/api/result-status".into(),
        "Failed to get result status",
    )
    .await
}

/// Submits every answer in order, then ends the session. The first backend
/// failure is relayed and stops the sequence.
async fn submit_interview(
    State(state): State<AppState>,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    let payload: SubmitInterviewBody = serde_json::from_slice(&inbound.body)
        .map_err(|_| ApiError::BadRequest("Invalid JSON body".to_string()))?;
    let id = payload.session_segment().ok_or_else(|| ApiError::missing_param("student_session_id"))?;
    let raw_id = payload.student_session_id.clone();
    let authorization = inbound.authorization;

    for answer in payload.answers.into_iter().flatten() {
        let request = BackendRequest::new(
            "submit_interview.answer",
            Method::POST,
            format!("/api/student-sessions/{id}/answer"),
        )
        .authorization(authorization.clone())
        .json(&answer.into_payload())
        .map_err(|err| ApiError::internal(err, "Failed to encode answer"))?;

        let reply = state.backend().send(request).await.map_err(submit_failure)?;
        if !reply.status.is_success() {
            return Ok(relay_failure(reply, ANSWER_SERVER_ERROR, "Failed to submit answer"));
        }
    }

    let request = BackendRequest::new(
        "submit_interview.end",
        Method::POST,
        format!("/api/student-sessions/{id}/end"),
    )
    .authorization(authorization)
    .timeout(state.settings().backend().evaluation_timeout);

    let reply = state.backend().send(request).await.map_err(submit_failure)?;
    if !reply.status.is_success() {
        return Ok(relay_failure(reply, END_SERVER_ERROR, "Failed to end session"));
    }

    let end = match serde_json::from_slice::<Value>(&reply.body) {
        Ok(Value::Object(map)) => map,
        Ok(_) => Map::new(),
        Err(_) => {
            let text = String::from_utf8_lossy(&reply.body);
            let excerpt: String = text.chars().take(200).collect();
            return Err(ApiError::Internal(format!("Invalid response from backend: {excerpt}")));
        }
    };

    let mut merged = Map::new();
    merged.insert("queued".to_string(), Value::Bool(false));
    merged.insert("log_file".to_string(), raw_id.clone());
    merged.insert("student_session_id".to_string(), raw_id);
    merged.insert("completed".to_string(), Value::Bool(true));
    merged.extend(end);

    Ok(Json(Value::Object(merged)).into_response())
}

/// Like [`proxy::relay`], but an HTML error page from the backend becomes a
/// readable message.
fn relay_failure(reply: BackendReply, server_error: &str, fallback: &str) -> Response {
    if serde_json::from_slice::<Value>(&reply.body).is_err() {
        let text = String::from_utf8_lossy(&reply.body);
        if text.contains("Internal Server Error") {
            let body = crate::api::errors::ErrorBody { error: server_error.to_string() };
            return (reply.status, Json(body)).into_response();
        }
    }
    proxy::relay(reply, fallback)
}

fn submit_failure(err: BackendError) -> ApiError {
    match err {
        BackendError::Timeout(_) => ApiError::GatewayTimeout(TIMEOUT_ERROR.to_string()),
        BackendError::Connect(_) => {
            tracing::error!(error = %err, "Submit interview could not reach backend");
            ApiError::Internal(CONNECT_ERROR.to_string())
        }
        BackendError::Transport(_) => ApiError::internal(err, BACKEND_UNREACHABLE),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::http::{Method, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::ANSWER_SERVER_ERROR;
    use crate::test_support::{self, MockBackend};

    #[tokio::test]
    async fn submits_answers_then_ends_session() {
        let _guard = test_support::env_lock().await;
        let answers = Arc::new(AtomicUsize::new(0));
        let seen = answers.clone();
        let backend = MockBackend::start(
            Router::new()
                .route(
                    "/api/student-sessions/:id/answer",
                    post(move |Json(body): Json<Value>| {
                        let seen = seen.clone();
                        async move {
                            assert!(body["answer"].is_string());
                            seen.fetch_add(1, Ordering::SeqCst);
                            Json(json!({"ok": true}))
                        }
                    }),
                )
                .route(
                    "/api/student-sessions/:id/end",
                    post(|| async { Json(json!({"score_total": 9.0, "completed": true})) }),
                ),
        )
        .await;
        let app = test_support::app_for(&backend.url());

        let response = app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/submit-interview",
                Some("tok"),
                Some(json!({
                    "student_session_id": 21,
                    "answers": [
                        {"question_id": 1, "answer": "first"},
                        {"id": 2, "response": "second"}
                    ]
                })),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(answers.load(Ordering::SeqCst), 2);
        let body = test_support::read_json(response).await;
        assert_eq!(body["queued"], false);
        assert_eq!(body["log_file"], 21);
        assert_eq!(body["score_total"], 9.0);
    }

    #[tokio::test]
    async fn html_failure_becomes_readable_message() {
        let _guard = test_support::env_lock().await;
        let backend = MockBackend::start(Router::new().route(
            "/api/student-sessions/:id/answer",
            post(|| async {
                (StatusCode::INTERNAL_SERVER_ERROR, "<h1>Internal Server Error</h1>")
            }),
        ))
        .await;
        let app = test_support::app_for(&backend.url());

        let response = app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/submit-interview",
                Some("tok"),
                Some(json!({"student_session_id": "21", "answers": [{"question_id": 1, "answer": "x"}]})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = test_support::read_json(response).await;
        assert_eq!(body["error"], ANSWER_SERVER_ERROR);
    }

    #[tokio::test]
    async fn missing_session_id_is_rejected() {
        let _guard = test_support::env_lock().await;
        let app = test_support::app_for("http://127.0.0.1:9");

        let response = app
            .oneshot(test_support::json_request(
                Method::POST,
                "/api/submit-interview",
                Some("tok"),
                Some(json!({"answers": []})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = test_support::read_json(response).await;
        assert_eq!(body["error"], "student_session_id is required");
    }
}
