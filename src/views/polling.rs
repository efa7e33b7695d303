use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::client::api::{parse_student_session_id, CompletionCheck};
use crate::client::messages;
use crate::client::navigation::Navigator;

pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
pub const GRADING_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const REDIRECT_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    Loading,
    Polling { attempts: u32, last_error: Option<String> },
    Done,
    TimedOut { message: String },
    Error(String),
}

/// Waits for grading of one student session to finish, then moves on to
/// the results page. Dropping the poller stops every pending check and
/// timer.
#[derive(Debug)]
pub struct GradingPoller {
    state: watch::Receiver<PollState>,
    task: Option<JoinHandle<()>>,
}

impl GradingPoller {
    /// Mounts the poller for the session named in the URL. Must be called
    /// inside a Tokio runtime.
    pub fn mount<C: CompletionCheck>(
        raw_id: &str,
        checker: Arc<C>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let Ok(student_session_id) = parse_student_session_id(raw_id) else {
            let (_, state) = watch::channel(PollState::Error(messages::INVALID_SESSION_ID.to_string()));
            return Self { state, task: None };
        };

        let (tx, state) = watch::channel(PollState::Loading);
        let task = tokio::spawn(poll(student_session_id, checker, navigator, tx));
        Self { state, task: Some(task) }
    }

    pub fn state(&self) -> PollState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }
}

impl Drop for GradingPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn poll<C: CompletionCheck>(
    student_session_id: i64,
    checker: Arc<C>,
    navigator: Arc<dyn Navigator>,
    tx: watch::Sender<PollState>,
) {
    let results_page = format!("/student/results/{student_session_id}");
    let mut attempts = 0;
    let mut last_error = None;

    // The deadline bounds in-flight checks too, so a hung request cannot
    // keep the student on this page.
    let deadline = time::sleep_until(Instant::now() + GRADING_TIMEOUT);
    tokio::pin!(deadline);
    let mut ticks = time::interval(POLL_INTERVAL);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        let graded = tokio::select! {
            biased;
            _ = &mut deadline => break,
            _ = ticks.tick() => {
                attempts += 1;
                tokio::select! {
                    biased;
                    _ = &mut deadline => break,
                    graded = checker.is_graded(student_session_id) => graded,
                }
            }
        };

        match graded {
            Ok(true) => {
                tx.send_replace(PollState::Done);
                navigator.push(&results_page);
                return;
            }
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(student_session_id, error = %err, "grading status check failed");
                last_error = Some(err.to_string());
            }
        }
        tx.send_replace(PollState::Polling { attempts, last_error: last_error.clone() });
    }

    tracing::info!(student_session_id, attempts, "grading still running, giving up on polling");
    tx.send_replace(PollState::TimedOut { message: messages::GRADING_TIMEOUT.to_string() });
    time::sleep(REDIRECT_DELAY).await;
    navigator.push(&results_page);
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{GradingPoller, PollState};
    use crate::client::api::CompletionCheck;
    use crate::client::navigation::{Navigation, PageLocation};
    use crate::client::response::ClientError;

    /// Reports "not graded" `pending` times, then "graded".
    struct Countdown {
        pending: usize,
        calls: AtomicUsize,
    }

    impl Countdown {
        fn new(pending: usize) -> Arc<Self> {
            Arc::new(Self { pending, calls: AtomicUsize::new(0) })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CompletionCheck for Countdown {
        async fn is_graded(&self, _student_session_id: i64) -> Result<bool, ClientError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(call >= self.pending)
        }
    }

    struct Flaky {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionCheck for Flaky {
        async fn is_graded(&self, _student_session_id: i64) -> Result<bool, ClientError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Network { detail: "connection reset".into() })
        }
    }

    /// Answers "not graded" once, then never answers again.
    struct Stalls {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CompletionCheck for Stalls {
        async fn is_graded(&self, _student_session_id: i64) -> Result<bool, ClientError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                return Ok(false);
            }
            std::future::pending().await
        }
    }

    fn page() -> Arc<PageLocation> {
        Arc::new(PageLocation::new("", "/student/wait/12"))
    }

    #[tokio::test(start_paused = true)]
    async fn two_pending_polls_then_done_is_three_checks() {
        let checker = Countdown::new(2);
        let location = page();
        let poller = GradingPoller::mount("12", checker.clone(), location.clone());

        let mut state = poller.subscribe();
        state.wait_for(|state| *state == PollState::Done).await.expect("done");

        assert_eq!(checker.calls(), 3);
        assert_eq!(location.last(), Some(Navigation::Push("/student/results/12".into())));
    }

    #[tokio::test(start_paused = true)]
    async fn unmount_stops_polling() {
        let checker = Countdown::new(usize::MAX);
        let poller = GradingPoller::mount("12", checker.clone(), page());

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(checker.calls(), 2);

        drop(poller);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(checker.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_five_minutes_and_redirects() {
        let checker = Countdown::new(usize::MAX);
        let location = page();
        let poller = GradingPoller::mount("12", checker.clone(), location.clone());

        let mut state = poller.subscribe();
        state
            .wait_for(|state| matches!(state, PollState::TimedOut { .. }))
            .await
            .expect("timed out");
        assert!(location.history().is_empty());

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert_eq!(location.last(), Some(Navigation::Push("/student/results/12".into())));
        assert!((99..=101).contains(&checker.calls()));
    }

    #[tokio::test(start_paused = true)]
    async fn hung_check_still_times_out_and_redirects() {
        let checker = Arc::new(Stalls { calls: AtomicUsize::new(0) });
        let location = page();
        let poller = GradingPoller::mount("12", checker.clone(), location.clone());

        tokio::time::sleep(Duration::from_secs(5 * 60 + 1)).await;
        assert_eq!(
            poller.state(),
            PollState::TimedOut {
                message: "Chấm điểm mất quá nhiều thời gian. Vui lòng thử lại sau.".into()
            }
        );
        assert!(location.history().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(location.last(), Some(Navigation::Push("/student/results/12".into())));
        assert_eq!(checker.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn check_errors_keep_polling() {
        let checker = Arc::new(Flaky { calls: AtomicUsize::new(0) });
        let poller = GradingPoller::mount("12", checker.clone(), page());

        tokio::time::sleep(Duration::from_millis(6500)).await;
        assert_eq!(checker.calls.load(Ordering::SeqCst), 3);
        match poller.state() {
            PollState::Polling { attempts, last_error } => {
                assert_eq!(attempts, 3);
                assert!(last_error.is_some());
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[tokio::test]
    async fn invalid_id_is_an_error() {
        let poller = GradingPoller::mount("abc", Countdown::new(0), page());
        assert_eq!(poller.state(), PollState::Error("Invalid session ID".into()));
    }
}
