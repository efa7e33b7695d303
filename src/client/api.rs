use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use crate::client::messages;
use crate::client::pipeline::{FormPart, OutboundRequest, RequestPipeline};
use crate::client::response::ClientError;
use crate::client::types::{
    AnswerSubmission, EndSessionResponse, ExamSessionRequest, FileUpload,
    GenerateQuestionsRequest, InterviewSessionRequest, InterviewSubmission, JoinSessionRequest,
    LoginRequest, LoginResponse, MaterialUpload, NextQuestion, PracticeSessionRequest, Question,
    QuestionSelection, QuestionUpdate, RefreshRequest, RefreshResponse, RegisterRequest,
    SessionDetail, SessionFilter, StudentQuestionSet, StudentSession, SubmitInterviewPayload,
};

/// The listing call can hang on a cold backend; give up after this long.
const SESSIONS_TIMEOUT: Duration = Duration::from_secs(30);

/// Typed catalog of BFF calls. Cheap to clone; clones share one pipeline.
#[derive(Debug, Clone)]
pub struct ApiClient {
    pipeline: Arc<RequestPipeline>,
}

impl ApiClient {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline: Arc::new(pipeline) }
    }

    pub fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    async fn get<T: DeserializeOwned>(&self, path: String) -> Result<T, ClientError> {
        self.pipeline.call(self.pipeline.authorized(Method::GET, path)).await
    }

    async fn send_empty<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
    ) -> Result<T, ClientError> {
        self.pipeline.call(self.pipeline.authorized(method, path)).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: String,
        payload: &impl serde::Serialize,
    ) -> Result<T, ClientError> {
        let request = self.pipeline.authorized(method, path).json(payload)?;
        self.pipeline.call(request).await
    }

    async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        parts: Vec<FormPart>,
    ) -> Result<T, ClientError> {
        let request = self.pipeline.authorized(Method::POST, path).multipart(parts);
        self.pipeline.call(request).await
    }

    /// Unauthenticated call that skips the refresh-and-retry step.
    async fn public<T: DeserializeOwned>(&self, request: OutboundRequest) -> Result<T, ClientError> {
        let response = self.pipeline.execute(&request, false).await?;
        self.pipeline.handle_response(response)
    }

    // Authentication

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let payload = LoginRequest { email: email.to_string(), password: password.to_string() };
        self.public(OutboundRequest::new(Method::POST, "/api/auth/login").json(&payload)?).await
    }

    pub async fn register(&self, payload: &RegisterRequest) -> Result<Value, ClientError> {
        self.public(OutboundRequest::new(Method::POST, "/api/auth/register").json(payload)?).await
    }

    pub async fn logout(&self) -> Result<Value, ClientError> {
        self.send_empty(Method::POST, "/api/auth/logout".into()).await
    }

    pub async fn current_user(&self) -> Result<Value, ClientError> {
        self.get("/api/auth/user".into()).await
    }

    /// Explicit refresh with a caller-supplied token; does not touch the store.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshResponse, ClientError> {
        let payload = RefreshRequest { refresh_token: refresh_token.to_string() };
        self.public(OutboundRequest::new(Method::POST, "/api/auth/refresh").json(&payload)?).await
    }

    // Sessions

    pub async fn create_practice_session(
        &self,
        payload: &PracticeSessionRequest,
    ) -> Result<Value, ClientError> {
        self.send_json(Method::POST, "/api/sessions/practice".into(), payload).await
    }

    pub async fn create_interview_session(
        &self,
        payload: &InterviewSessionRequest,
    ) -> Result<Value, ClientError> {
        self.send_json(Method::POST, "/api/sessions/interview".into(), payload).await
    }

    pub async fn create_exam_session(
        &self,
        payload: &ExamSessionRequest,
    ) -> Result<Value, ClientError> {
        self.send_json(Method::POST, "/api/sessions/exam".into(), payload).await
    }

    pub async fn upload_cv(&self, file: FileUpload, session_id: &str) -> Result<Value, ClientError> {
        let parts = vec![FormPart::file("file", file), FormPart::text("session_id", session_id)];
        self.upload("/api/upload-cv", parts).await
    }

    pub async fn upload_jd(&self, file: FileUpload, session_id: &str) -> Result<Value, ClientError> {
        let parts = vec![FormPart::file("file", file), FormPart::text("session_id", session_id)];
        self.upload("/api/sessions/interview/upload-jd", parts).await
    }

    pub async fn sessions(&self, filter: &SessionFilter) -> Result<Value, ClientError> {
        let request = self
            .pipeline
            .authorized(Method::GET, "/api/sessions")
            .query(filter.query())
            .timeout(SESSIONS_TIMEOUT);
        self.pipeline.call(request).await
    }

    pub async fn session(&self, session_id: i64) -> Result<SessionDetail, ClientError> {
        self.get(format!("/api/sessions/{session_id}")).await
    }

    pub async fn session_students(&self, session_id: i64) -> Result<Value, ClientError> {
        self.get(format!("/api/review/sessions/{session_id}/students")).await
    }

    pub async fn finalize_session(&self, session_id: i64) -> Result<Value, ClientError> {
        self.send_empty(Method::POST, format!("/api/sessions/{session_id}/finalize")).await
    }

    pub async fn generate_script(&self, session_id: i64) -> Result<Value, ClientError> {
        self.send_empty(Method::POST, format!("/api/sessions/{session_id}/generate-script")).await
    }

    // Student flow

    pub async fn join_session(
        &self,
        session_id: i64,
        password: Option<&str>,
    ) -> Result<Value, ClientError> {
        let payload =
            JoinSessionRequest { session_id, password: password.unwrap_or_default().to_string() };
        self.send_json(Method::POST, "/api/student-sessions/join".into(), &payload).await
    }

    pub async fn start_session(&self, student_session_id: i64) -> Result<Value, ClientError> {
        self.send_empty(Method::POST, format!("/api/student-sessions/{student_session_id}/start"))
            .await
    }

    pub async fn next_question(&self, student_session_id: i64) -> Result<NextQuestion, ClientError> {
        self.get(format!("/api/student-sessions/{student_session_id}/question")).await
    }

    pub async fn submit_answer(
        &self,
        student_session_id: i64,
        question_id: i64,
        answer: &str,
    ) -> Result<Value, ClientError> {
        let payload = AnswerSubmission { question_id, answer: answer.to_string() };
        self.send_json(
            Method::POST,
            format!("/api/student-sessions/{student_session_id}/answer"),
            &payload,
        )
        .await
    }

    pub async fn end_session(
        &self,
        student_session_id: i64,
    ) -> Result<EndSessionResponse, ClientError> {
        self.send_empty(Method::POST, format!("/api/student-sessions/{student_session_id}/end"))
            .await
    }

    pub async fn student_session(
        &self,
        student_session_id: i64,
    ) -> Result<StudentSession, ClientError> {
        self.get(format!("/api/student-sessions/{student_session_id}")).await
    }

    pub async fn history(&self) -> Result<Value, ClientError> {
        self.get("/api/history".into()).await
    }

    pub async fn result_status(&self, student_session_id: &str) -> Result<Value, ClientError> {
        let request = self
            .pipeline
            .authorized(Method::GET, "/api/result-status")
            .query(vec![("student_session_id".to_string(), student_session_id.to_string())]);
        self.pipeline.call(request).await
    }

    pub async fn results(&self) -> Result<Value, ClientError> {
        self.get("/api/results".into()).await
    }

    pub async fn submit_interview(
        &self,
        submission: InterviewSubmission,
    ) -> Result<Value, ClientError> {
        let payload = SubmitInterviewPayload::from(submission);
        self.send_json(Method::POST, "/api/submit-interview".into(), &payload).await
    }

    /// Older pages address a session by "filename", which is now the
    /// student session id.
    pub async fn questions_by_filename(&self, filename: &str) -> Result<NextQuestion, ClientError> {
        self.next_question(parse_student_session_id(filename)?).await
    }

    pub async fn result(&self, filename: &str) -> Result<StudentSession, ClientError> {
        self.student_session(parse_student_session_id(filename)?).await
    }

    // Materials

    pub async fn upload_material(&self, upload: MaterialUpload) -> Result<Value, ClientError> {
        let mut parts = vec![FormPart::file("file", upload.file), FormPart::text("title", upload.title)];
        if let Some(description) = upload.description.filter(|value| !value.is_empty()) {
            parts.push(FormPart::text("description", description));
        }
        parts.push(FormPart::text("is_public", upload.is_public.to_string()));
        self.upload("/api/upload-material", parts).await
    }

    pub async fn materials(&self) -> Result<Value, ClientError> {
        self.get("/api/materials".into()).await
    }

    pub async fn delete_material(&self, material_id: i64) -> Result<Value, ClientError> {
        self.send_empty(Method::DELETE, format!("/api/materials/{material_id}")).await
    }

    // Dashboards

    pub async fn student_dashboard(&self, student_id: i64) -> Result<Value, ClientError> {
        self.get(format!("/api/dashboard/students/{student_id}")).await
    }

    pub async fn lecturer_dashboard(&self, lecturer_id: i64) -> Result<Value, ClientError> {
        self.get(format!("/api/dashboard/lecturers/{lecturer_id}")).await
    }

    // Review

    pub async fn review_sessions(&self) -> Result<Value, ClientError> {
        self.get("/api/review/sessions".into()).await
    }

    pub async fn student_session_detail(
        &self,
        student_session_id: i64,
    ) -> Result<Value, ClientError> {
        self.get(format!("/api/review/student-sessions/{student_session_id}")).await
    }

    pub async fn update_answer_score(&self, answer_id: i64, score: f64) -> Result<Value, ClientError> {
        self.send_json(
            Method::PUT,
            format!("/api/review/answers/{answer_id}/score"),
            &json!({ "lecturer_score": score }),
        )
        .await
    }

    pub async fn update_answer_feedback(
        &self,
        answer_id: i64,
        feedback: &str,
    ) -> Result<Value, ClientError> {
        self.send_json(
            Method::PUT,
            format!("/api/review/answers/{answer_id}/feedback"),
            &json!({ "lecturer_feedback": feedback }),
        )
        .await
    }

    pub async fn update_overall_feedback(
        &self,
        student_session_id: i64,
        feedback: &str,
    ) -> Result<Value, ClientError> {
        self.send_json(
            Method::PUT,
            format!("/api/review/student-sessions/{student_session_id}/overall"),
            &json!({ "lecturer_feedback": feedback }),
        )
        .await
    }

    // Questions

    pub async fn generate_questions(
        &self,
        session_id: i64,
        num_questions: Option<u32>,
    ) -> Result<Value, ClientError> {
        let payload = GenerateQuestionsRequest { session_id, num_questions };
        self.send_json(Method::POST, "/api/questions/generate".into(), &payload).await
    }

    pub async fn questions(
        &self,
        session_id: i64,
        status: Option<&str>,
    ) -> Result<Vec<Question>, ClientError> {
        let mut request =
            self.pipeline.authorized(Method::GET, format!("/api/questions/session/{session_id}"));
        if let Some(status) = status.filter(|value| !value.is_empty()) {
            request = request.query(vec![("status".to_string(), status.to_string())]);
        }
        let questions: Option<Vec<Question>> = self.pipeline.call(request).await?;
        Ok(questions.unwrap_or_default())
    }

    pub async fn update_question(
        &self,
        question_id: i64,
        update: &QuestionUpdate,
    ) -> Result<Value, ClientError> {
        self.send_json(Method::PUT, format!("/api/questions/{question_id}"), update).await
    }

    pub async fn delete_question(&self, question_id: i64) -> Result<Value, ClientError> {
        self.send_empty(Method::DELETE, format!("/api/questions/{question_id}")).await
    }

    pub async fn approve_questions(
        &self,
        session_id: i64,
        question_ids: Option<Vec<i64>>,
    ) -> Result<Value, ClientError> {
        let payload = QuestionSelection { session_id, question_ids };
        self.send_json(Method::POST, "/api/questions/approve".into(), &payload).await
    }

    pub async fn generate_answers(
        &self,
        session_id: i64,
        question_ids: Option<Vec<i64>>,
    ) -> Result<Value, ClientError> {
        let payload = QuestionSelection { session_id, question_ids };
        self.send_json(Method::POST, "/api/questions/generate-answers".into(), &payload).await
    }

    pub async fn update_answer(
        &self,
        question_id: i64,
        reference_answer: &str,
    ) -> Result<Value, ClientError> {
        self.send_json(
            Method::PUT,
            format!("/api/questions/{question_id}/answer"),
            &json!({ "reference_answer": reference_answer }),
        )
        .await
    }

    pub async fn approve_answers(
        &self,
        session_id: i64,
        question_ids: Option<Vec<i64>>,
    ) -> Result<Value, ClientError> {
        let payload = QuestionSelection { session_id, question_ids };
        self.send_json(Method::POST, "/api/questions/approve-answers".into(), &payload).await
    }

    pub async fn student_question(
        &self,
        student_session_id: i64,
    ) -> Result<StudentQuestionSet, ClientError> {
        self.get(format!("/api/questions/student-question/{student_session_id}")).await
    }
}

/// Whether grading of a student session has produced a score yet.
#[async_trait]
pub trait CompletionCheck: Send + Sync + 'static {
    async fn is_graded(&self, student_session_id: i64) -> Result<bool, ClientError>;
}

#[async_trait]
impl CompletionCheck for ApiClient {
    async fn is_graded(&self, student_session_id: i64) -> Result<bool, ClientError> {
        Ok(self.student_session(student_session_id).await?.is_graded())
    }
}

/// Loads a student session with its graded answers.
#[async_trait]
pub trait SessionLookup: Send + Sync + 'static {
    async fn graded_session(&self, student_session_id: i64) -> Result<StudentSession, ClientError>;
}

#[async_trait]
impl SessionLookup for ApiClient {
    async fn graded_session(&self, student_session_id: i64) -> Result<StudentSession, ClientError> {
        self.student_session(student_session_id).await
    }
}

/// Leading-digits parse: `"42"` and `"42.log"` are both session 42.
pub(crate) fn parse_student_session_id(raw: &str) -> Result<i64, ClientError> {
    let raw = raw.trim();
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, raw.strip_prefix('+').unwrap_or(raw)),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    digits[..end]
        .parse::<i64>()
        .map(|value| sign * value)
        .map_err(|_| ClientError::InvalidInput(messages::INVALID_STUDENT_SESSION.to_string()))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::{Path, Query};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};

    use super::{parse_student_session_id, ApiClient};
    use crate::client::navigation::PageLocation;
    use crate::client::pipeline::{ClientConfig, RequestPipeline};
    use crate::client::response::ClientError;
    use crate::client::token_store::{Credentials, MemoryTokenStore, TokenStore};
    use crate::client::types::SessionFilter;
    use crate::test_support::MockBackend;

    fn client(url: &str) -> ApiClient {
        let store = Arc::new(MemoryTokenStore::new());
        store.set(Credentials::new("a1", None));
        let navigator = Arc::new(PageLocation::new("", "/teacher/exams"));
        ApiClient::new(RequestPipeline::new(ClientConfig::new(url), store, navigator).expect("pipeline"))
    }

    #[test]
    fn legacy_ids_parse_leading_digits() {
        assert_eq!(parse_student_session_id("42").unwrap(), 42);
        assert_eq!(parse_student_session_id("42.log").unwrap(), 42);
        assert_eq!(
            parse_student_session_id("result.log").unwrap_err(),
            ClientError::InvalidInput("Invalid student_session_id".into())
        );
    }

    #[tokio::test]
    async fn invalid_filename_fails_without_network() {
        let api = client("http://127.0.0.1:9");
        let err = api.result("abc").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid student_session_id");
    }

    #[tokio::test]
    async fn sessions_sends_filters() {
        let mock = MockBackend::start(Router::new().route(
            "/api/sessions",
            get(|Query(query): Query<std::collections::HashMap<String, String>>| async move {
                Json(json!({"type": query.get("type"), "created_by": query.get("created_by")}))
            }),
        ))
        .await;
        let api = client(&mock.url());

        let filter = SessionFilter { session_type: Some("exam".into()), created_by: Some(7) };
        let echoed = api.sessions(&filter).await.expect("sessions");
        assert_eq!(echoed, json!({"type": "exam", "created_by": "7"}));
    }

    #[tokio::test]
    async fn student_session_reports_grading() {
        let mock = MockBackend::start(Router::new().route(
            "/api/student-sessions/:id",
            get(|Path(id): Path<i64>| async move {
                if id == 1 {
                    Json(json!({"student_session_id": 1, "score_total": 8.5}))
                } else {
                    Json(json!({"student_session_id": id, "score_total": null}))
                }
            }),
        ))
        .await;
        let api = client(&mock.url());

        assert!(api.student_session(1).await.expect("graded").is_graded());
        assert!(!api.student_session(2).await.expect("pending").is_graded());
    }

    #[tokio::test]
    async fn backend_errors_surface_message() {
        let mock = MockBackend::start(Router::new().route(
            "/api/questions/session/:id",
            get(|| async { (StatusCode::NOT_FOUND, Json(json!({"error": "Session not found"}))) }),
        ))
        .await;
        let api = client(&mock.url());

        let err = api.questions(3, None).await.unwrap_err();
        assert_eq!(err, ClientError::Backend { status: 404, message: "Session not found".into() });
    }

    #[tokio::test]
    async fn questions_tolerate_null_listing() {
        let mock = MockBackend::start(Router::new().route(
            "/api/questions/session/:id",
            get(|| async { Json(Value::Null) }),
        ))
        .await;
        let api = client(&mock.url());

        assert!(api.questions(3, Some("draft")).await.expect("questions").is_empty());
    }
}
