use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::attempt::question::{AnswerState, AttemptedQuestion};
use crate::bank::Exam;
use crate::core::time::now_utc;

/// Attempt-level lifecycle status. Driven exclusively by the exam session's
/// transitions, never inferred from the per-question ledgers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Unattempted,
    Started,
    Paused,
    Attempted,
    Finished,
    DidNotFinish,
}

/// One run through an exam: the per-question ledgers plus attempt-level
/// status and timing, with the aggregate scoring derived on read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptedExam {
    id: String,
    exam_id: i64,
    questions: Vec<AttemptedQuestion>,
    status: AttemptStatus,
    date_attempted: OffsetDateTime,
    duration: Duration,
}

impl AttemptedExam {
    pub fn new(
        exam_id: i64,
        questions: Vec<AttemptedQuestion>,
        status: AttemptStatus,
        date_attempted: OffsetDateTime,
        duration: Duration,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            exam_id,
            questions,
            status,
            date_attempted,
            duration,
        }
    }

    pub fn from_exam(exam: &Exam) -> Self {
        let questions =
            exam.questions.iter().cloned().map(AttemptedQuestion::new).collect();
        Self::new(exam.id, questions, AttemptStatus::Attempted, now_utc(), Duration::ZERO)
    }

    pub fn update_status(&mut self, status: AttemptStatus) {
        self.status = status;
    }

    pub fn update_date(&mut self, date_attempted: OffsetDateTime) {
        self.date_attempted = date_attempted;
    }

    pub fn update_duration(&mut self, duration: Duration) {
        self.duration = duration;
    }

    /// Marks the attempt finished, stamping duration and completion date in
    /// one step; no partially updated state is observable.
    pub fn finish(&mut self, duration: Duration) {
        self.status = AttemptStatus::Finished;
        self.duration = duration;
        self.date_attempted = now_utc();
    }

    /// Questions that were fully answered with every selection correct. The
    /// fully-answered check keeps untouched questions (vacuously "correct"
    /// ledgers) out of this bucket.
    pub fn correct_questions(&self) -> Vec<&AttemptedQuestion> {
        self.questions
            .iter()
            .filter(|question| question.is_fully_answered() && question.is_answered_correctly())
            .collect()
    }

    /// Questions with no correct selection at all. Distinct from "has a
    /// wrong selection": a partially-correct multi-answer question lands in
    /// neither bucket.
    pub fn incorrect_questions(&self) -> Vec<&AttemptedQuestion> {
        self.questions
            .iter()
            .filter(|question| {
                question
                    .selected_choices()
                    .values()
                    .all(|state| *state != AnswerState::Correct)
            })
            .collect()
    }

    pub fn unanswered_questions(&self) -> Vec<&AttemptedQuestion> {
        self.questions.iter().filter(|question| !question.is_fully_answered()).collect()
    }

    /// Fraction of questions answered fully and correctly, in `0.0..=1.0`.
    /// An empty exam scores exactly zero.
    pub fn score(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        self.correct_questions().len() as f64 / self.questions.len() as f64
    }

    pub fn score_percentage(&self) -> f64 {
        (self.score() * 100.0).clamp(0.0, 100.0)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exam_id(&self) -> i64 {
        self.exam_id
    }

    pub fn questions(&self) -> &[AttemptedQuestion] {
        &self.questions
    }

    pub fn status(&self) -> AttemptStatus {
        self.status
    }

    pub fn date_attempted(&self) -> OffsetDateTime {
        self.date_attempted
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}
