//! Page state machines driven by the client library.

pub mod exam_workspace;
pub mod interview;
pub mod login;
pub mod polling;
pub mod results;

pub use exam_workspace::{ExamWorkspace, Tab};
pub use interview::{FinishOutcome, InterviewView};
pub use login::{LoginForm, LoginView, Portal};
pub use polling::{GradingPoller, PollState};
pub use results::{ResultDetail, ResultState, ResultSummary, ResultView};
