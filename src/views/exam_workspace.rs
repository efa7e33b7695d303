use serde_json::Value;

use crate::client::api::ApiClient;
use crate::client::messages;
use crate::client::response::ClientError;
use crate::client::types::{Question, QuestionUpdate, SessionDetail};

pub const DEFAULT_QUESTION_COUNT: u32 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Tab {
    #[default]
    Overview,
    Questions,
    Students,
}

/// Workflow states of an exam session, as reported by the backend.
pub mod status {
    pub const REVIEWING_QUESTIONS: &str = "reviewing_questions";
    pub const REVIEWING_ANSWERS: &str = "reviewing_answers";
    pub const DRAFT: &str = "draft";
    pub const ANSWERS_GENERATED: &str = "answers_generated";
}

/// Teacher page for one exam session: overview, question bank review and
/// the enrolled students.
#[derive(Debug, Clone)]
pub struct ExamWorkspace {
    api: ApiClient,
    session_id: Option<i64>,
    session: Option<SessionDetail>,
    students: Vec<Value>,
    questions: Vec<Question>,
    tab: Tab,
    selected: Vec<i64>,
    editing_question: Option<i64>,
    editing_answer: Option<i64>,
    num_questions: u32,
    busy: bool,
    error: Option<String>,
}

impl ExamWorkspace {
    /// `raw_id` is the route segment; anything that is not a positive
    /// integer leaves the workspace in an error state.
    pub fn new(api: ApiClient, raw_id: &str) -> Self {
        let session_id = raw_id.trim().parse::<i64>().ok().filter(|id| *id > 0);
        Self {
            api,
            session_id,
            session: None,
            students: Vec::new(),
            questions: Vec::new(),
            tab: Tab::default(),
            selected: Vec::new(),
            editing_question: None,
            editing_answer: None,
            num_questions: DEFAULT_QUESTION_COUNT,
            busy: false,
            error: None,
        }
    }

    pub fn session(&self) -> Option<&SessionDetail> {
        self.session.as_ref()
    }

    pub fn students(&self) -> &[Value] {
        &self.students
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn set_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    pub fn selected(&self) -> &[i64] {
        &self.selected
    }

    pub fn num_questions(&self) -> u32 {
        self.num_questions
    }

    pub fn set_num_questions(&mut self, count: u32) {
        self.num_questions = count.max(1);
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn editing_question(&self) -> Option<i64> {
        self.editing_question
    }

    pub fn editing_answer(&self) -> Option<i64> {
        self.editing_answer
    }

    /// Only one question can be in edit mode at a time.
    pub fn toggle_edit_question(&mut self, question_id: i64) {
        self.editing_question =
            if self.editing_question == Some(question_id) { None } else { Some(question_id) };
    }

    pub fn toggle_edit_answer(&mut self, question_id: i64) {
        self.editing_answer =
            if self.editing_answer == Some(question_id) { None } else { Some(question_id) };
    }

    pub fn toggle_selection(&mut self, question_id: i64) {
        if let Some(index) = self.selected.iter().position(|id| *id == question_id) {
            self.selected.remove(index);
        } else {
            self.selected.push(question_id);
        }
    }

    /// Questions the current workflow step lets the teacher approve.
    pub fn selectable(&self) -> Vec<i64> {
        let stage = self.session.as_ref().and_then(|session| session.status.as_deref());
        self.questions
            .iter()
            .filter(|question| match stage {
                Some(status::REVIEWING_QUESTIONS) => question.status == status::DRAFT,
                Some(status::REVIEWING_ANSWERS) => {
                    question.status == status::ANSWERS_GENERATED
                        && question.reference_answer.as_deref().is_some_and(|answer| !answer.is_empty())
                }
                _ => false,
            })
            .map(|question| question.question_id)
            .collect()
    }

    /// Selects every selectable question, or clears the selection when it
    /// already covers them all.
    pub fn toggle_select_all(&mut self) {
        let selectable = self.selectable();
        let covers_all = self.selected.len() == selectable.len()
            && selectable.iter().all(|id| self.selected.contains(id));
        self.selected = if covers_all { Vec::new() } else { selectable };
    }

    /// Loads the session, then students and questions. Only a session
    /// failure is shown to the teacher.
    pub async fn load(&mut self) {
        self.load_session().await;
        self.load_students().await;
        self.load_questions().await;
    }

    async fn load_session(&mut self) {
        let Some(session_id) = self.session_id else {
            self.error = Some(messages::INVALID_EXAM_ID.to_string());
            return;
        };
        self.error = None;
        match self.api.session(session_id).await {
            Ok(detail) if detail.session_id.is_some() => self.session = Some(detail),
            Ok(_) => self.error = Some(messages::EXAM_MISSING.to_string()),
            Err(err) => {
                tracing::warn!(session_id, error = %err, "failed to load exam session");
                self.error = Some(session_error(&err));
            }
        }
    }

    async fn load_students(&mut self) {
        let Some(session_id) = self.session_id else { return };
        match self.api.session_students(session_id).await {
            Ok(Value::Array(students)) => self.students = students,
            Ok(_) => self.students.clear(),
            Err(err) => tracing::warn!(session_id, error = %err, "failed to load students"),
        }
    }

    async fn load_questions(&mut self) {
        let Some(session_id) = self.session_id else { return };
        match self.api.questions(session_id, None).await {
            Ok(questions) => self.questions = questions,
            Err(err) => tracing::warn!(session_id, error = %err, "failed to load questions"),
        }
    }

    async fn reload(&mut self) {
        self.load_session().await;
        self.load_questions().await;
    }

    pub async fn generate_questions(&mut self) -> bool {
        let Some(session_id) = self.session_id else { return false };
        let count = self.num_questions;
        self.workflow_step(messages::GENERATE_QUESTIONS_FAILED, |api| async move {
            api.generate_questions(session_id, Some(count)).await
        })
        .await
    }

    /// Approves the selected questions, or all drafts when none are
    /// selected.
    pub async fn approve_questions(&mut self) -> bool {
        let Some(session_id) = self.session_id else { return false };
        let selection = self.take_selection();
        self.workflow_step(messages::APPROVE_QUESTIONS_FAILED, |api| async move {
            api.approve_questions(session_id, selection).await
        })
        .await
    }

    pub async fn generate_answers(&mut self) -> bool {
        let Some(session_id) = self.session_id else { return false };
        self.workflow_step(messages::GENERATE_ANSWERS_FAILED, |api| async move {
            api.generate_answers(session_id, None).await
        })
        .await
    }

    pub async fn approve_answers(&mut self) -> bool {
        let Some(session_id) = self.session_id else { return false };
        let selection = self.take_selection();
        self.workflow_step(messages::APPROVE_ANSWERS_FAILED, |api| async move {
            api.approve_answers(session_id, selection).await
        })
        .await
    }

    pub async fn update_question(&mut self, question_id: i64, update: QuestionUpdate) -> bool {
        match self.api.update_question(question_id, &update).await {
            Ok(_) => {
                self.editing_question = None;
                self.load_questions().await;
                true
            }
            Err(err) => self.fail(messages::UPDATE_QUESTION_FAILED, &err),
        }
    }

    pub async fn delete_question(&mut self, question_id: i64) -> bool {
        match self.api.delete_question(question_id).await {
            Ok(_) => {
                self.selected.retain(|id| *id != question_id);
                self.load_questions().await;
                self.load_session().await;
                true
            }
            Err(err) => self.fail(messages::DELETE_QUESTION_FAILED, &err),
        }
    }

    pub async fn update_answer(&mut self, question_id: i64, reference_answer: &str) -> bool {
        match self.api.update_answer(question_id, reference_answer).await {
            Ok(_) => {
                self.editing_answer = None;
                self.load_questions().await;
                true
            }
            Err(err) => self.fail(messages::UPDATE_ANSWER_FAILED, &err),
        }
    }

    fn take_selection(&mut self) -> Option<Vec<i64>> {
        let selection = std::mem::take(&mut self.selected);
        (!selection.is_empty()).then_some(selection)
    }

    async fn workflow_step<F, Fut>(&mut self, fallback: &str, call: F) -> bool
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: std::future::Future<Output = Result<Value, ClientError>>,
    {
        self.busy = true;
        self.error = None;
        let outcome = call(self.api.clone()).await;
        let succeeded = match outcome {
            Ok(_) => {
                self.reload().await;
                true
            }
            Err(err) => self.fail(fallback, &err),
        };
        self.busy = false;
        succeeded
    }

    fn fail(&mut self, fallback: &str, err: &ClientError) -> bool {
        tracing::warn!(session_id = ?self.session_id, error = %err, "exam workspace action failed");
        let message = err.to_string();
        self.error = Some(if message.is_empty() { fallback.to_string() } else { message });
        false
    }
}

fn session_error(err: &ClientError) -> String {
    let message = err.to_string();
    match err.status() {
        Some(404) => messages::EXAM_NOT_FOUND.to_string(),
        Some(401) => messages::EXAM_REAUTH.to_string(),
        Some(403) => messages::EXAM_FORBIDDEN.to_string(),
        _ if message.contains("not found") => messages::EXAM_NOT_FOUND.to_string(),
        _ => message,
    }
}
