mod exams;

pub use exams::{ExamRepository, FileExamRepository, RepositoryError};
