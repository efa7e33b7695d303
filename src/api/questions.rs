use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::params::PathParams;
use crate::api::proxy::{self, Inbound};
use crate::core::state::AppState;
use crate::schemas::question::{BackendNextQuestion, StudentQuestionView};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/generate", post(generate))
        .route("/approve", post(approve))
        .route("/generate-answers", post(generate_answers))
        .route("/approve-answers", post(approve_answers))
        .route("/session/:id", get(for_session))
        .route("/student-question/:id", get(student_question))
        .route("/:id", put(update).delete(remove))
        .route("/:id/answer", put(update_answer))
}

async fn generate(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "questions.generate",
        "/api/questions/generate".into(),
        "Failed to generate questions",
    )
    .await
}

async fn approve(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "questions.approve",
        "/api/questions/approve".into(),
        "Failed to approve questions",
    )
    .await
}

async fn generate_answers(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "questions.generate_answers",
        "/api/questions/generate-answers".into(),
        "Failed to generate answers",
    )
    .await
}

async fn approve_answers(State(state): State<AppState>, inbound: Inbound) -> Response {
    proxy::forward(
        &state,
        inbound,
        "questions.approve_answers",
        "/api/questions/approve-answers".into(),
        "Failed to approve answers",
    )
    .await
}

/// The optional `?status=` filter rides along in the forwarded query string.
async fn for_session(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "session_id",
        "questions.session",
        |id| format!("/api/questions/session/{id}"),
        "Failed to get questions",
    )
    .await
}

async fn update(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "question_id",
        "questions.update",
        |id| format!("/api/questions/{id}"),
        "Failed to update question",
    )
    .await
}

async fn remove(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "question_id",
        "questions.delete",
        |id| format!("/api/questions/{id}"),
        "Failed to delete question",
    )
    .await
}

async fn update_answer(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    proxy::forward_with_id(
        &state,
        params,
        inbound,
        "question_id",
        "questions.update_answer",
        |id| format!("/api/questions/{id}/answer"),
        "Failed to update answer",
    )
    .await
}

/// Next question for a student session, reshaped into the list form the
/// interview page renders.
async fn student_question(
    State(state): State<AppState>,
    params: PathParams,
    inbound: Inbound,
) -> Result<Response, ApiError> {
    let params = params.resolve().await;
    let id = params.require("id", "student_session_id")?;

    let request = inbound
        .into_backend("questions.student_question", format!("/api/student-sessions/{id}/question"));
    let reply = state.backend().send(request).await.map_err(proxy::backend_failure)?;

    if !reply.status.is_success() {
        return Ok(proxy::relay(reply, "Failed to get question"));
    }

    let data: BackendNextQuestion = serde_json::from_slice(&reply.body)
        .map_err(|err| ApiError::internal(err, "Invalid question payload from backend"))?;

    Ok(Json(StudentQuestionView::from_backend(id, data)).into_response())
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use axum::routing::{get, put};
    use axum::{Json, Router};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{self, MockBackend};

    #[tokio::test]
    async fn student_question_is_reshaped() {
        let _guard = test_support::env_lock().await;
        let backend = MockBackend::start(Router::new().route(
            "/api/student-sessions/:id/question",
            get(|| async {
                Json(json!({
                    "question_id": 31,
                    "question": "Explain TCP slow start.",
                    "question_number": 2,
                    "total_questions": 5,
                    "question_type": "open"
                }))
            }),
        ))
        .await;
        let app = test_support::app_for(&backend.url());

        let response = app
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/questions/student-question/77",
                Some("tok"),
                None,
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["filename"], "77");
        assert_eq!(body["completed"], false);
        assert_eq!(body["questions"][0]["id"], 31);
        assert_eq!(body["questions"][0]["text"], "Explain TCP slow start.");
        assert_eq!(body["total_questions"], 5);
    }

    #[tokio::test]
    async fn completed_session_has_no_questions() {
        let _guard = test_support::env_lock().await;
        let backend = MockBackend::start(Router::new().route(
            "/api/student-sessions/:id/question",
            get(|| async { Json(json!({"completed": true, "total_questions": 5})) }),
        ))
        .await;
        let app = test_support::app_for(&backend.url());

        let response = app
            .oneshot(test_support::json_request(
                Method::GET,
                "/api/questions/student-question/77",
                Some("tok"),
                None,
            ))
            .await
            .expect("response");

        let body = test_support::read_json(response).await;
        assert_eq!(body["completed"], true);
        assert_eq!(body["questions"], json!([]));
    }

    #[tokio::test]
    async fn update_answer_forwards_method_and_body() {
        let _guard = test_support::env_lock().await;
        let backend = MockBackend::start(Router::new().route(
            "/api/questions/:id/answer",
            put(|Json(body): Json<serde_json::Value>| async move {
                Json(json!({"updated": body["reference_answer"]}))
            }),
        ))
        .await;
        let app = test_support::app_for(&backend.url());

        let response = app
            .oneshot(test_support::json_request(
                Method::PUT,
                "/api/questions/5/answer",
                Some("tok"),
                Some(json!({"reference_answer": "ACK clocking"})),
            ))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = test_support::read_json(response).await;
        assert_eq!(body["updated"], "ACK clocking");
    }
}
