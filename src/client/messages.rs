//! User-facing strings. The product ships in Vietnamese; a few backend
//! phrases are kept in English because pages match on them.

pub(crate) const SESSION_EXPIRED: &str = "Phiên đăng nhập đã hết hạn. Vui lòng đăng nhập lại.";
pub(crate) const INVALID_CREDENTIALS: &str = "Sai email hoặc mật khẩu";
pub(crate) const FORBIDDEN: &str = "Bạn không có quyền truy cập trang này";
pub(crate) const NETWORK_ERROR: &str =
    "Không thể kết nối đến máy chủ. Vui lòng kiểm tra kết nối mạng.";
pub(crate) const READ_TIMEOUT: &str = "The read operation timed out";
pub(crate) const INVALID_STUDENT_SESSION: &str = "Invalid student_session_id";
pub(crate) const INVALID_SESSION_ID: &str = "Invalid session ID";

// Login pages.
pub(crate) const LOGIN_FAILED: &str = "Đăng nhập thất bại. Vui lòng thử lại.";
pub(crate) const WRONG_CREDENTIALS: &str = "Sai email hoặc mật khẩu. Vui lòng thử lại.";
pub(crate) const ROLE_MISMATCH: &str = "Sai email hoặc mật khẩu.";
pub(crate) const CREDENTIALS_REQUIRED: &str = "Vui lòng nhập email và mật khẩu.";
pub(crate) const EMAIL_INVALID: &str = "Email không hợp lệ";

// Grading wait page.
pub(crate) const GRADING_TIMEOUT: &str = "Chấm điểm mất quá nhiều thời gian. Vui lòng thử lại sau.";

// Interview page.
pub(crate) const ANSWER_REQUIRED: &str =
    "Vui lòng nhập câu trả lời trước khi chuyển sang câu hỏi tiếp theo";
pub(crate) const QUESTION_LOAD_FAILED: &str = "Không thể tải câu hỏi: ";
pub(crate) const ANSWER_SUBMIT_FAILED: &str = "Có lỗi xảy ra khi nộp câu trả lời: ";
pub(crate) const CONNECTION_DROPPED: &str =
    "Kết nối bị ngắt. Bạn sẽ được chuyển đến trang kết quả để kiểm tra.";
pub(crate) const CONNECTION_ERROR: &str =
    "Lỗi kết nối. Bạn sẽ được chuyển đến trang kết quả để kiểm tra.";
pub(crate) const SERVER_ERROR: &str =
    "Lỗi máy chủ. Bạn sẽ được chuyển đến trang kết quả để kiểm tra.";
pub(crate) const GRADING_FAILED: &str = "Có lỗi xảy ra khi chấm điểm";
pub(crate) const CHECK_RESULTS_SUFFIX: &str = " Bạn sẽ được chuyển đến trang kết quả để kiểm tra.";

// Teacher exam workspace.
pub(crate) const INVALID_EXAM_ID: &str = "Session ID không hợp lệ";
pub(crate) const EXAM_MISSING: &str = "Không tìm thấy thông tin buổi thi";
pub(crate) const EXAM_NOT_FOUND: &str = "Không tìm thấy buổi thi. Vui lòng kiểm tra lại session ID.";
pub(crate) const EXAM_REAUTH: &str =
    "Bạn không có quyền truy cập buổi thi này. Vui lòng đăng nhập lại.";
pub(crate) const EXAM_FORBIDDEN: &str = "Bạn không có quyền xem buổi thi này.";
pub(crate) const GENERATE_QUESTIONS_FAILED: &str = "Không thể tạo câu hỏi";
pub(crate) const APPROVE_QUESTIONS_FAILED: &str = "Không thể duyệt câu hỏi";
pub(crate) const GENERATE_ANSWERS_FAILED: &str = "Không thể tạo đáp án";
pub(crate) const APPROVE_ANSWERS_FAILED: &str = "Không thể duyệt đáp án";
pub(crate) const UPDATE_QUESTION_FAILED: &str = "Không thể cập nhật câu hỏi";
pub(crate) const DELETE_QUESTION_FAILED: &str = "Không thể xóa câu hỏi";
pub(crate) const UPDATE_ANSWER_FAILED: &str = "Không thể cập nhật đáp án";
