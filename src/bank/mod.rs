mod dto;
mod loader;
mod models;

pub use loader::{BankError, QuestionBank};
pub use models::{Choice, Exam, Question};
