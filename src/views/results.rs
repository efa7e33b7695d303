use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::client::api::{parse_student_session_id, SessionLookup};
use crate::client::messages;
use crate::client::types::StudentSession;
use crate::views::polling::{GRADING_TIMEOUT, POLL_INTERVAL};

/// A graded attempt shaped for the results page.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSummary {
    pub filename: String,
    pub overall_score: f64,
    pub summary: String,
    pub details: Vec<ResultDetail>,
    pub session_name: Option<String>,
    pub session_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultDetail {
    pub question_id: Option<i64>,
    pub score: f64,
    pub notes: String,
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultState {
    Loading,
    Grading { attempts: u32, last_error: Option<String> },
    Ready(ResultSummary),
    /// Grading outlived the wait. The page stays put and shows `message`.
    TimedOut { message: String },
    Error(String),
}

#[derive(Debug, Default, Deserialize)]
struct GradedAnswer {
    #[serde(default)]
    question_id: Option<i64>,
    #[serde(default)]
    ai_score: Option<f64>,
    #[serde(default)]
    lecturer_score: Option<f64>,
    #[serde(default)]
    ai_feedback: Option<String>,
    #[serde(default)]
    lecturer_feedback: Option<String>,
    #[serde(default)]
    question: Option<String>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    answer_text: Option<String>,
}

fn first_score(scores: [Option<f64>; 2]) -> f64 {
    scores.into_iter().flatten().find(|score| *score != 0.0).unwrap_or(0.0)
}

fn first_text(texts: [Option<String>; 2]) -> String {
    texts.into_iter().flatten().find(|text| !text.is_empty()).unwrap_or_default()
}

impl From<GradedAnswer> for ResultDetail {
    fn from(answer: GradedAnswer) -> Self {
        Self {
            question_id: answer.question_id,
            score: first_score([answer.ai_score, answer.lecturer_score]),
            notes: first_text([answer.ai_feedback, answer.lecturer_feedback]),
            question: answer.question.unwrap_or_default(),
            answer: first_text([answer.answer, answer.answer_text]),
        }
    }
}

impl ResultSummary {
    /// `None` while grading is still running.
    pub fn from_session(filename: &str, session: &StudentSession) -> Option<Self> {
        let score_total = session.score_total?;
        let text = |key: &str| session.extra.get(key).and_then(Value::as_str).map(str::to_string);

        let details = match session.extra.get("answers") {
            Some(Value::Array(answers)) => answers
                .iter()
                .map(|answer| {
                    GradedAnswer::deserialize(answer).unwrap_or_else(|err| {
                        tracing::warn!(error = %err, "unreadable graded answer");
                        GradedAnswer::default()
                    })
                })
                .map(ResultDetail::from)
                .collect(),
            _ => Vec::new(),
        };

        Some(Self {
            filename: filename.to_string(),
            overall_score: score_total,
            summary: overall_feedback(session.extra.get("ai_overall_feedback")),
            details,
            session_name: text("session_name"),
            session_type: text("session_type"),
        })
    }
}

/// The overall feedback is either plain text or a structured report.
fn overall_feedback(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Object(report)) => ["overall_feedback", "strengths"]
            .iter()
            .filter_map(|key| report.get(*key).and_then(Value::as_str))
            .find(|text| !text.is_empty())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

/// Results page for one attempt. Keeps loading until a score exists, for
/// students who land here before grading finishes. Unlike
/// [`GradingPoller`](crate::views::GradingPoller) it never navigates.
#[derive(Debug)]
pub struct ResultView {
    state: watch::Receiver<ResultState>,
    task: Option<JoinHandle<()>>,
}

impl ResultView {
    /// Must be called inside a Tokio runtime.
    pub fn mount<S: SessionLookup>(filename: &str, source: Arc<S>) -> Self {
        let Ok(student_session_id) = parse_student_session_id(filename) else {
            let (_, state) =
                watch::channel(ResultState::Error(messages::INVALID_SESSION_ID.to_string()));
            return Self { state, task: None };
        };

        let (tx, state) = watch::channel(ResultState::Loading);
        let task = tokio::spawn(load(filename.to_string(), student_session_id, source, tx));
        Self { state, task: Some(task) }
    }

    pub fn state(&self) -> ResultState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultState> {
        self.state.clone()
    }
}

impl Drop for ResultView {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn load<S: SessionLookup>(
    filename: String,
    student_session_id: i64,
    source: Arc<S>,
    tx: watch::Sender<ResultState>,
) {
    let mut attempts = 0;
    let mut last_error = None;

    let deadline = time::sleep_until(Instant::now() + GRADING_TIMEOUT);
    tokio::pin!(deadline);
    let mut ticks = time::interval(POLL_INTERVAL);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let loaded = tokio::select! {
            biased;
            _ = &mut deadline => break,
            _ = ticks.tick() => {
                attempts += 1;
                tokio::select! {
                    biased;
                    _ = &mut deadline => break,
                    loaded = source.graded_session(student_session_id) => loaded,
                }
            }
        };

        match loaded {
            Ok(session) => {
                if let Some(summary) = ResultSummary::from_session(&filename, &session) {
                    tx.send_replace(ResultState::Ready(summary));
                    return;
                }
            }
            Err(err) => {
                tracing::warn!(student_session_id, error = %err, "failed to load results");
                last_error = Some(err.to_string());
            }
        }
        tx.send_replace(ResultState::Grading { attempts, last_error: last_error.clone() });
    }

    tracing::info!(student_session_id, attempts, "results still not graded, stopped waiting");
    tx.send_replace(ResultState::TimedOut { message: messages::GRADING_TIMEOUT.to_string() });
}
