use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::bank::dto::BankFile;
use crate::bank::models::{Exam, Question};

#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read question bank at {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question bank at {path} has invalid format: {source}")]
    InvalidFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("question bank at {path} contains no questions")]
    Empty { path: PathBuf },
    #[error("unknown exam id {0}")]
    UnknownExam(i64),
}

/// The loaded question bank, partitioned into consecutive fixed-size exams.
/// Questions that do not fill a whole exam are left out, matching the way
/// the bank content is authored (a multiple of the exam size).
#[derive(Debug, Clone)]
pub struct QuestionBank {
    exams: Vec<Exam>,
}

impl QuestionBank {
    pub async fn load(path: impl AsRef<Path>, exam_size: usize) -> Result<Self, BankError> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| BankError::Unreadable { path: path.to_path_buf(), source })?;
        let file: BankFile = serde_json::from_str(&raw)
            .map_err(|source| BankError::InvalidFormat { path: path.to_path_buf(), source })?;

        let questions: Vec<Question> =
            file.data.into_iter().map(|raw| raw.into_model()).collect();
        if questions.is_empty() {
            return Err(BankError::Empty { path: path.to_path_buf() });
        }

        Ok(Self::partition(questions, exam_size))
    }

    pub fn partition(questions: Vec<Question>, exam_size: usize) -> Self {
        let exam_count = questions.len() / exam_size;
        let mut exams = Vec::with_capacity(exam_count);
        for index in 0..exam_count {
            let start = index * exam_size;
            let end = start + exam_size;
            exams.push(Exam { id: index as i64, questions: questions[start..end].to_vec() });
        }
        Self { exams }
    }

    pub fn exam(&self, id: i64) -> Result<&Exam, BankError> {
        self.exams
            .iter()
            .find(|exam| exam.id == id)
            .ok_or(BankError::UnknownExam(id))
    }

    pub fn exams(&self) -> &[Exam] {
        &self.exams
    }
}
