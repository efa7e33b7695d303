use crate::client::api::ApiClient;
use crate::client::messages;
use crate::client::response::{ClientError, ROLE_SELECTION};
use crate::client::types::NextQuestion;

/// How the interview ended. Every variant has already navigated to the
/// results page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishOutcome {
    Completed,
    /// Ending failed, but the session already carries a score.
    AlreadyGraded,
    /// Ending failed and grading state is unknown; `notice` tells the
    /// student to check the results page.
    CheckResults { notice: String },
}

#[derive(Debug, Clone)]
pub struct InterviewView {
    api: ApiClient,
    student_session_id: i64,
    current: Option<NextQuestion>,
    answer: String,
    question_number: u32,
    total_questions: u32,
    completed: bool,
    error: Option<String>,
}

impl InterviewView {
    /// Opens the interview named by the `student_session_id` query value.
    /// Without one the student is sent back to role selection.
    pub async fn mount(api: ApiClient, raw_id: Option<&str>) -> Result<Self, String> {
        let Some(raw_id) = raw_id.filter(|value| !value.trim().is_empty()) else {
            api.pipeline().navigator().push(ROLE_SELECTION);
            return Err(messages::INVALID_SESSION_ID.to_string());
        };
        let student_session_id = raw_id
            .trim()
            .parse::<i64>()
            .map_err(|_| messages::INVALID_SESSION_ID.to_string())?;

        let mut view = Self {
            api,
            student_session_id,
            current: None,
            answer: String::new(),
            question_number: 0,
            total_questions: 0,
            completed: false,
            error: None,
        };
        view.load_next().await;
        Ok(view)
    }

    pub fn current_question(&self) -> Option<&NextQuestion> {
        self.current.as_ref()
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.answer = answer.into();
    }

    /// `(question_number, total_questions)`.
    pub fn progress(&self) -> (u32, u32) {
        (self.question_number, self.total_questions)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn is_last_question(&self) -> bool {
        self.total_questions > 0 && self.question_number == self.total_questions
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load_next(&mut self) {
        self.error = None;
        match self.api.next_question(self.student_session_id).await {
            Ok(question) if question.is_finished() => {
                self.completed = true;
                self.current = None;
            }
            Ok(question) => {
                self.question_number = question.question_number.unwrap_or(0);
                self.total_questions = question.total_questions.unwrap_or(0);
                self.current = Some(question);
                self.answer.clear();
            }
            Err(err) => {
                tracing::warn!(student_session_id = self.student_session_id, error = %err, "failed to load question");
                self.error = Some(format!("{}{err}", messages::QUESTION_LOAD_FAILED));
            }
        }
    }

    /// Submits the current answer and moves to the next question.
    pub async fn next(&mut self) -> Result<(), String> {
        let Some(question_id) = self.current.as_ref().and_then(|question| question.question_id) else {
            return Err(messages::ANSWER_REQUIRED.to_string());
        };
        if self.answer.trim().is_empty() {
            return Err(messages::ANSWER_REQUIRED.to_string());
        }

        self.api
            .submit_answer(self.student_session_id, question_id, &self.answer)
            .await
            .map_err(|err| format!("{}{err}", messages::ANSWER_SUBMIT_FAILED))?;
        self.load_next().await;
        Ok(())
    }

    /// Submits any pending answer, ends the session and goes to the results
    /// page. Failures never strand the student here.
    pub async fn finish(&mut self) -> FinishOutcome {
        let results_page = format!("/student/results/{}", self.student_session_id);
        let navigator = self.api.pipeline().navigator().clone();

        if let Some(question_id) = self.current.as_ref().and_then(|question| question.question_id) {
            if !self.answer.trim().is_empty() {
                if let Err(err) =
                    self.api.submit_answer(self.student_session_id, question_id, &self.answer).await
                {
                    tracing::warn!(error = %err, "final answer not accepted, ending anyway");
                }
            }
        }

        let err = match self.api.end_session(self.student_session_id).await {
            Ok(result) => {
                if !result.warnings.is_empty() || result.warning.is_some() || result.error.is_some() {
                    tracing::warn!(
                        warnings = ?result.warnings,
                        warning = ?result.warning,
                        error = ?result.error,
                        "evaluation finished with warnings"
                    );
                }
                navigator.push(&results_page);
                return FinishOutcome::Completed;
            }
            Err(err) => err,
        };

        tracing::warn!(student_session_id = self.student_session_id, error = %err, "ending session failed");
        match self.api.student_session(self.student_session_id).await {
            Ok(session) if session.is_graded() => {
                navigator.push(&results_page);
                return FinishOutcome::AlreadyGraded;
            }
            Ok(_) => {}
            Err(check) => tracing::warn!(error = %check, "could not check for existing results"),
        }

        let notice = finish_notice(&err);
        self.error = Some(notice.clone());
        navigator.push(&results_page);
        FinishOutcome::CheckResults { notice }
    }
}

/// Timeouts, dropped connections and server errors may still have produced
/// grades, so each gets a "check results" notice.
fn finish_notice(err: &ClientError) -> String {
    let message = err.to_string();
    match err {
        ClientError::Timeout | ClientError::Backend { status: 504, .. } => {
            messages::CONNECTION_DROPPED.to_string()
        }
        ClientError::Network { detail }
            if detail.contains("reset") || detail.contains("socket hang up") =>
        {
            messages::CONNECTION_DROPPED.to_string()
        }
        ClientError::Network { .. } => messages::CONNECTION_ERROR.to_string(),
        ClientError::Backend { status, .. } if *status >= 500 => messages::SERVER_ERROR.to_string(),
        _ if message.is_empty() => {
            format!("{}{}", messages::GRADING_FAILED, messages::CHECK_RESULTS_SUFFIX)
        }
        _ => format!("{message}{}", messages::CHECK_RESULTS_SUFFIX),
    }
}
