use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the backend returns for `GET /api/student-sessions/{id}/question`.
#[derive(Debug, Deserialize)]
pub(crate) struct BackendNextQuestion {
    #[serde(default)]
    pub(crate) question_id: Value,
    #[serde(default)]
    pub(crate) question: Option<String>,
    #[serde(default)]
    pub(crate) question_number: Option<i64>,
    #[serde(default)]
    pub(crate) total_questions: Option<i64>,
    #[serde(default)]
    pub(crate) question_type: Option<String>,
    #[serde(default)]
    pub(crate) completed: bool,
}

/// Shape the interview page consumes: a one-element question list.
#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionView {
    pub(crate) filename: String,
    pub(crate) questions: Vec<StudentQuestionItem>,
    pub(crate) completed: bool,
    pub(crate) question_number: Option<i64>,
    pub(crate) total_questions: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct StudentQuestionItem {
    pub(crate) id: Value,
    pub(crate) question: Option<String>,
    pub(crate) text: Option<String>,
    pub(crate) question_number: Option<i64>,
    pub(crate) total_questions: Option<i64>,
    pub(crate) question_type: Option<String>,
}

impl StudentQuestionView {
    pub(crate) fn from_backend(filename: &str, data: BackendNextQuestion) -> Self {
        let questions = if data.completed {
            Vec::new()
        } else {
            vec![StudentQuestionItem {
                id: data.question_id,
                question: data.question.clone(),
                text: data.question,
                question_number: data.question_number,
                total_questions: data.total_questions,
                question_type: data.question_type,
            }]
        };

        Self {
            filename: filename.to_string(),
            questions,
            completed: data.completed,
            question_number: data.question_number,
            total_questions: data.total_questions,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct OverallFeedback {
    #[serde(default)]
    pub(crate) lecturer_feedback: Option<String>,
}
