use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub lecturer_code: Option<String>,
    #[serde(default)]
    pub student_code: Option<String>,
}

/// Registration form. `role` is the backend role, `STUDENT` or `LECTURER`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lecturer_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RefreshRequest {
    pub(crate) refresh_token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PracticeSessionRequest {
    pub session_name: String,
    pub course_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material_id: Option<i64>,
    pub difficulty_level: String,
    pub time_limit: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewSessionRequest {
    pub session_name: String,
    pub position: String,
    pub level: String,
    pub cv_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jd_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_questions: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExamSessionRequest {
    pub session_name: String,
    pub course_name: String,
    pub material_id: i64,
    pub difficulty_level: String,
    pub password: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

/// Filters for the session listing.
#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub session_type: Option<String>,
    pub created_by: Option<i64>,
}

impl SessionFilter {
    pub(crate) fn query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(session_type) = self.session_type.as_ref().filter(|value| !value.is_empty()) {
            query.push(("type".to_string(), session_type.clone()));
        }
        if let Some(created_by) = self.created_by.filter(|value| *value != 0) {
            query.push(("created_by".to_string(), created_by.to_string()));
        }
        query
    }
}

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct MaterialUpload {
    pub file: FileUpload,
    pub title: String,
    pub description: Option<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct JoinSessionRequest {
    pub(crate) session_id: i64,
    pub(crate) password: String,
}

/// One answer as the backend expects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub question_id: i64,
    pub answer: String,
}

/// Whole-interview submission. Older pages send `responses` instead of
/// `answers`; both are accepted and `answers` wins.
#[derive(Debug, Clone, Default)]
pub struct InterviewSubmission {
    pub student_session_id: i64,
    pub answers: Option<Vec<AnswerSubmission>>,
    pub responses: Option<Vec<AnswerSubmission>>,
    pub candidate_name: Option<String>,
    pub candidate_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SubmitInterviewPayload {
    pub(crate) student_session_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) answers: Option<Vec<AnswerSubmission>>,
}

impl From<InterviewSubmission> for SubmitInterviewPayload {
    fn from(submission: InterviewSubmission) -> Self {
        Self {
            student_session_id: submission.student_session_id,
            answers: submission.answers.or(submission.responses),
        }
    }
}

/// A student's attempt. `score_total` appears once grading has finished.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentSession {
    #[serde(default)]
    pub student_session_id: Option<i64>,
    #[serde(default)]
    pub score_total: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StudentSession {
    pub fn is_graded(&self) -> bool {
        self.score_total.is_some()
    }
}

/// The backend's next-question payload.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NextQuestion {
    #[serde(default)]
    pub question_id: Option<i64>,
    #[serde(default)]
    pub question: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub question_number: Option<u32>,
    #[serde(default)]
    pub total_questions: Option<u32>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

impl NextQuestion {
    pub fn is_finished(&self) -> bool {
        self.completed || self.question_id.map_or(true, |id| id == 0)
    }

    pub fn prompt(&self) -> &str {
        self.question.as_deref().or(self.text.as_deref()).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EndSessionResponse {
    #[serde(default)]
    pub score_total: Option<f64>,
    #[serde(default)]
    pub warning: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QuestionUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct QuestionSelection {
    pub(crate) session_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) question_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct GenerateQuestionsRequest {
    pub(crate) session_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) num_questions: Option<u32>,
}

/// Exam session as shown in the teacher workspace.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionDetail {
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub session_name: Option<String>,
    #[serde(default)]
    pub session_type: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub questions_count: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    pub question_id: i64,
    #[serde(default)]
    pub session_id: Option<i64>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub question_type: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub reference_answer: Option<String>,
}

/// Student-question view produced by the BFF reshape.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuestionSet {
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub questions: Vec<StudentQuestionEntry>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub question_number: Option<u32>,
    #[serde(default)]
    pub total_questions: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuestionEntry {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}
