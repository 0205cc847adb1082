mod exam;
mod question;
mod result;

pub use exam::{AttemptStatus, AttemptedExam};
pub use question::{AnswerState, AttemptedQuestion};
pub use result::{ChoiceReview, ExamResult, QuestionReview, PASS_MARK_PERCENT};
