use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::attempt::{AnswerState, AttemptStatus, AttemptedExam, AttemptedQuestion, ExamResult};
use crate::bank::{BankError, Exam, QuestionBank};
use crate::core::config::Settings;
use crate::core::time::format_rfc3339;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Bank(#[from] BankError),
    #[error("failed to persist {kind} {id}: {source}")]
    Write {
        kind: &'static str,
        id: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {kind} {id}: {source}")]
    Encode {
        kind: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistence collaborator the attempt engine depends on. Loads exam
/// content and stores finished attempts/results; each operation fails
/// independently.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    async fn load_exam(&self, exam_id: i64) -> Result<Exam, RepositoryError>;
    async fn save_attempt(&self, attempt: &AttemptedExam) -> Result<(), RepositoryError>;
    async fn save_result(&self, result: &ExamResult) -> Result<(), RepositoryError>;
}

/// File-backed repository: exams come from the bundled question bank,
/// attempts and results are written as one JSON document each under the
/// configured data directory.
pub struct FileExamRepository {
    bank: QuestionBank,
    data_dir: PathBuf,
}

impl FileExamRepository {
    pub fn new(bank: QuestionBank, data_dir: impl Into<PathBuf>) -> Self {
        Self { bank, data_dir: data_dir.into() }
    }

    pub async fn open(settings: &Settings) -> Result<Self, RepositoryError> {
        let bank = QuestionBank::load(&settings.bank().path, settings.bank().exam_size).await?;
        Ok(Self::new(bank, settings.storage().data_dir.clone()))
    }

    pub fn bank(&self) -> &QuestionBank {
        &self.bank
    }

    async fn write_json(
        &self,
        kind: &'static str,
        id: &str,
        subdir: &str,
        payload: &impl Serialize,
    ) -> Result<(), RepositoryError> {
        let encoded = serde_json::to_vec_pretty(payload).map_err(|source| {
            RepositoryError::Encode { kind, id: id.to_string(), source }
        })?;
        let dir = self.data_dir.join(subdir);
        let write = async {
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(dir.join(format!("{id}.json")), encoded).await
        };
        write
            .await
            .map_err(|source| RepositoryError::Write { kind, id: id.to_string(), source })
    }
}

#[async_trait]
impl ExamRepository for FileExamRepository {
    async fn load_exam(&self, exam_id: i64) -> Result<Exam, RepositoryError> {
        Ok(self.bank.exam(exam_id)?.clone())
    }

    async fn save_attempt(&self, attempt: &AttemptedExam) -> Result<(), RepositoryError> {
        let record = AttemptRecord::from_attempt(attempt);
        self.write_json("attempt", attempt.id(), "attempts", &record).await
    }

    async fn save_result(&self, result: &ExamResult) -> Result<(), RepositoryError> {
        let record = ResultRecord::from_result(result);
        self.write_json("result", result.id(), "results", &record).await
    }
}

/// Stored form of an attempt. Selections are keyed by choice title, which
/// is unique within a question's choice list.
#[derive(Debug, Serialize, Deserialize)]
struct AttemptRecord {
    id: String,
    exam_id: i64,
    status: AttemptStatus,
    date_attempted: String,
    duration_seconds: f64,
    questions: Vec<QuestionAttemptRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct QuestionAttemptRecord {
    question_id: String,
    bookmarked: bool,
    selections: Vec<SelectionRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SelectionRecord {
    title: String,
    state: AnswerState,
}

#[derive(Debug, Serialize, Deserialize)]
struct ResultRecord {
    id: String,
    exam_id: i64,
    score: String,
    score_percentage: f64,
    passed: bool,
    prompt: String,
    date_attempted: String,
}

impl AttemptRecord {
    fn from_attempt(attempt: &AttemptedExam) -> Self {
        Self {
            id: attempt.id().to_string(),
            exam_id: attempt.exam_id(),
            status: attempt.status(),
            date_attempted: format_rfc3339(attempt.date_attempted()),
            duration_seconds: attempt.duration().as_seconds_f64(),
            questions: attempt.questions().iter().map(QuestionAttemptRecord::from_ledger).collect(),
        }
    }
}

impl QuestionAttemptRecord {
    fn from_ledger(question: &AttemptedQuestion) -> Self {
        let mut selections: Vec<SelectionRecord> = question
            .selected_choices()
            .iter()
            .map(|(choice, state)| SelectionRecord { title: choice.title.clone(), state: *state })
            .collect();
        selections.sort_by(|a, b| a.title.cmp(&b.title));

        Self {
            question_id: question.id().to_string(),
            bookmarked: question.bookmarked(),
            selections,
        }
    }
}

impl ResultRecord {
    fn from_result(result: &ExamResult) -> Self {
        Self {
            id: result.id().to_string(),
            exam_id: result.exam_id(),
            score: result.score_summary(),
            score_percentage: result.score_percentage(),
            passed: result.passed(),
            prompt: result.prompt().to_string(),
            date_attempted: format_rfc3339(result.date()),
        }
    }
}
