use time::OffsetDateTime;
use uuid::Uuid;

use crate::attempt::exam::{AttemptStatus, AttemptedExam};
use crate::attempt::question::{AnswerState, AttemptedQuestion};
use crate::core::time::{format_medium_date, format_short_date};

pub const PASS_MARK_PERCENT: f64 = 75.0;

/// Display-ready projection of a finished attempt. Pure read model: every
/// property is derived from the wrapped [`AttemptedExam`].
#[derive(Debug, Clone)]
pub struct ExamResult {
    id: String,
    exam_id: i64,
    exam: AttemptedExam,
}

/// Read-only review row for one question, with the judged (or revealed)
/// state of every choice.
#[derive(Debug, Clone)]
pub struct QuestionReview {
    pub title: String,
    pub hint: String,
    pub bookmarked: bool,
    pub answered_correctly: bool,
    pub choices: Vec<ChoiceReview>,
}

#[derive(Debug, Clone)]
pub struct ChoiceReview {
    pub title: String,
    pub state: AnswerState,
}

impl ExamResult {
    pub fn new(exam: AttemptedExam) -> Self {
        Self { id: Uuid::new_v4().to_string(), exam_id: exam.exam_id(), exam }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn exam_id(&self) -> i64 {
        self.exam_id
    }

    pub fn exam(&self) -> &AttemptedExam {
        &self.exam
    }

    pub fn status(&self) -> AttemptStatus {
        self.exam.status()
    }

    pub fn date(&self) -> OffsetDateTime {
        self.exam.date_attempted()
    }

    pub fn score_percentage(&self) -> f64 {
        self.exam.score_percentage()
    }

    pub fn passed(&self) -> bool {
        self.exam.score_percentage() >= PASS_MARK_PERCENT
    }

    pub fn prompt(&self) -> &'static str {
        if self.passed() {
            "Congratulation! You've passed the test"
        } else {
            "Your score is below the 75% pass mark"
        }
    }

    /// Percentage rendered for display, "-" when nothing was scored.
    pub fn formatted_score(&self) -> String {
        let percentage = self.exam.score_percentage();
        if percentage > 0.0 {
            format!("{percentage:.0} %")
        } else {
            "-".to_string()
        }
    }

    /// Correct-over-total rendering, e.g. "18 / 24".
    pub fn score_summary(&self) -> String {
        format!("{} / {}", self.exam.correct_questions().len(), self.exam.questions().len())
    }

    pub fn formatted_date(&self) -> String {
        format_medium_date(self.exam.date_attempted())
    }

    pub fn chart_date(&self) -> String {
        format_short_date(self.exam.date_attempted())
    }

    pub fn correct_questions(&self) -> Vec<&AttemptedQuestion> {
        self.exam.correct_questions()
    }

    pub fn incorrect_questions(&self) -> Vec<&AttemptedQuestion> {
        self.exam.incorrect_questions()
    }

    /// Per-question rows for the review screen. Unselected correct choices
    /// are revealed as `Correct`; unselected wrong choices stay
    /// `NotAttempted`.
    pub fn question_reviews(&self) -> Vec<QuestionReview> {
        self.exam
            .questions()
            .iter()
            .map(|question| QuestionReview {
                title: question.title().to_string(),
                hint: question.hint().to_string(),
                bookmarked: question.bookmarked(),
                answered_correctly: question.is_fully_answered()
                    && question.is_answered_correctly(),
                choices: question
                    .choices()
                    .iter()
                    .map(|choice| ChoiceReview {
                        title: choice.title.clone(),
                        state: question.state_of(choice).unwrap_or(if choice.is_answer {
                            AnswerState::Correct
                        } else {
                            AnswerState::NotAttempted
                        }),
                    })
                    .collect(),
            })
            .collect()
    }
}
