use serde::Deserialize;
use serde_json::{json, Value};

/// `POST /api/submit-interview` body. Older pages send `id`/`response`
/// instead of `question_id`/`answer` inside each answer.
#[derive(Debug, Deserialize)]
pub(crate) struct SubmitInterviewBody {
    #[serde(default)]
    pub(crate) student_session_id: Value,
    #[serde(default)]
    pub(crate) answers: Option<Vec<SubmittedAnswer>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmittedAnswer {
    #[serde(default)]
    question_id: Value,
    #[serde(default)]
    id: Value,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    response: Option<String>,
}

impl SubmitInterviewBody {
    /// The session id as a path segment; numbers and non-empty strings only.
    pub(crate) fn session_segment(&self) -> Option<String> {
        let segment = match &self.student_session_id {
            Value::Number(number) => number.to_string(),
            Value::String(text) => text.trim().to_string(),
            _ => return None,
        };

        if segment.is_empty() || segment.contains(['/', '?', '#']) {
            return None;
        }
        Some(segment)
    }
}

impl SubmittedAnswer {
    pub(crate) fn into_payload(self) -> Value {
        let question_id = if is_blank(&self.question_id) { self.id } else { self.question_id };
        let answer = self.answer.filter(|value| !value.is_empty()).or(self.response);
        json!({ "question_id": question_id, "answer": answer })
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::Number(number) => number.as_i64() == Some(0),
        Value::String(text) => text.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{SubmitInterviewBody, SubmittedAnswer};

    #[test]
    fn legacy_answer_fields_are_mapped() {
        let legacy: SubmittedAnswer =
            serde_json::from_value(json!({"id": 4, "response": "B-trees"})).expect("answer");
        assert_eq!(legacy.into_payload(), json!({"question_id": 4, "answer": "B-trees"}));

        let current: SubmittedAnswer =
            serde_json::from_value(json!({"question_id": 5, "answer": "LSM"})).expect("answer");
        assert_eq!(current.into_payload(), json!({"question_id": 5, "answer": "LSM"}));
    }

    #[test]
    fn session_segment_accepts_numbers_and_strings() {
        let numeric: SubmitInterviewBody =
            serde_json::from_value(json!({"student_session_id": 12})).expect("body");
        assert_eq!(numeric.session_segment().as_deref(), Some("12"));

        let text: SubmitInterviewBody =
            serde_json::from_value(json!({"student_session_id": "12"})).expect("body");
        assert_eq!(text.session_segment().as_deref(), Some("12"));

        let missing: SubmitInterviewBody = serde_json::from_value(json!({})).expect("body");
        assert_eq!(missing.session_segment(), None);
    }
}
