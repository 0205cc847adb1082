use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use time::Duration;

use crate::attempt::{AnswerState, AttemptStatus, AttemptedExam, AttemptedQuestion, ExamResult};
use crate::bank::{Choice, Exam, Question};
use crate::core::time::now_utc;
use crate::repositories::{ExamRepository, RepositoryError};
use crate::session::QuestionOwner;

pub(crate) fn make_single_answer_question(id: &str, correct_index: usize) -> Question {
    make_question(id, &format!("Single answer question {id}"), &[correct_index])
}

pub(crate) fn make_multi_answer_question(id: &str, correct_indices: &[usize]) -> Question {
    make_question(id, &format!("Multi answer question {id}"), correct_indices)
}

fn make_question(id: &str, title: &str, correct_indices: &[usize]) -> Question {
    let choices = ["Answer A", "Answer B", "Answer C", "Answer D"]
        .iter()
        .enumerate()
        .map(|(index, choice_title)| Choice::new(*choice_title, correct_indices.contains(&index)))
        .collect();
    Question {
        id: id.to_string(),
        section_id: "section1".to_string(),
        title: title.to_string(),
        hint: Some(format!("Hint for question {id}")),
        choices,
    }
}

pub(crate) fn make_exam(id: i64, question_count: usize, multi_answer_count: usize) -> Exam {
    let questions = (0..question_count)
        .map(|index| {
            if index < multi_answer_count {
                make_multi_answer_question(&format!("q{index}"), &[0, 1])
            } else {
                make_single_answer_question(&format!("q{index}"), 0)
            }
        })
        .collect();
    Exam { id, questions }
}

pub(crate) fn answered_correctly(question: &Question) -> AttemptedQuestion {
    let mut attempted = AttemptedQuestion::new(question.clone());
    for choice in question.answers() {
        attempted.update_selected(choice, AnswerState::Correct);
    }
    attempted
}

pub(crate) fn answered_incorrectly(question: &Question) -> AttemptedQuestion {
    let mut attempted = AttemptedQuestion::new(question.clone());
    if let Some(wrong) = question.choices.iter().find(|choice| !choice.is_answer) {
        attempted.update_selected(wrong, AnswerState::Wrong);
    }
    attempted
}

pub(crate) fn answered_partially(question: &Question) -> AttemptedQuestion {
    let mut attempted = AttemptedQuestion::new(question.clone());
    if let Some(first_correct) = question.answers().next() {
        attempted.update_selected(first_correct, AnswerState::Correct);
    }
    attempted
}

pub(crate) fn answered_one_correct_one_wrong(question: &Question) -> AttemptedQuestion {
    let mut attempted = AttemptedQuestion::new(question.clone());
    if let Some(correct) = question.choices.iter().find(|choice| choice.is_answer) {
        attempted.update_selected(correct, AnswerState::Correct);
    }
    if let Some(wrong) = question.choices.iter().find(|choice| !choice.is_answer) {
        attempted.update_selected(wrong, AnswerState::Wrong);
    }
    attempted
}

pub(crate) fn make_attempted_exam(
    exam_id: i64,
    correct_count: usize,
    incorrect_count: usize,
    unanswered_count: usize,
) -> AttemptedExam {
    let mut questions = Vec::new();
    for index in 0..correct_count {
        let question = make_single_answer_question(&format!("correct{index}"), 0);
        questions.push(answered_correctly(&question));
    }
    for index in 0..incorrect_count {
        let question = make_single_answer_question(&format!("incorrect{index}"), 0);
        questions.push(answered_incorrectly(&question));
    }
    for index in 0..unanswered_count {
        let question = make_single_answer_question(&format!("unanswered{index}"), 0);
        questions.push(AttemptedQuestion::new(question));
    }

    AttemptedExam::new(
        exam_id,
        questions,
        AttemptStatus::Finished,
        now_utc(),
        Duration::seconds(300),
    )
}

pub(crate) fn make_attempted_exam_with_multi_answer(
    exam_id: i64,
    multi_all_correct: usize,
    multi_one_wrong: usize,
    single_correct: usize,
    single_wrong: usize,
) -> AttemptedExam {
    let mut questions = Vec::new();
    for index in 0..multi_all_correct {
        let question = make_multi_answer_question(&format!("multiCorrect{index}"), &[0, 1]);
        questions.push(answered_correctly(&question));
    }
    for index in 0..multi_one_wrong {
        let question = make_multi_answer_question(&format!("multiWrong{index}"), &[0, 1]);
        questions.push(answered_one_correct_one_wrong(&question));
    }
    for index in 0..single_correct {
        let question = make_single_answer_question(&format!("singleCorrect{index}"), 0);
        questions.push(answered_correctly(&question));
    }
    for index in 0..single_wrong {
        let question = make_single_answer_question(&format!("singleWrong{index}"), 0);
        questions.push(answered_incorrectly(&question));
    }

    AttemptedExam::new(
        exam_id,
        questions,
        AttemptStatus::Finished,
        now_utc(),
        Duration::seconds(300),
    )
}

/// Owner stub that counts the notifications it receives.
#[derive(Default)]
pub(crate) struct RecordingOwner {
    progress_calls: AtomicUsize,
    allow_calls: AtomicUsize,
}

impl RecordingOwner {
    pub(crate) fn progress_calls(&self) -> usize {
        self.progress_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn allow_calls(&self) -> usize {
        self.allow_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuestionOwner for RecordingOwner {
    async fn progress_to_next_questions(&self) {
        self.progress_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn allow_progress_to_next_question(&self) {
        self.allow_calls.fetch_add(1, Ordering::SeqCst);
    }
}

/// In-memory repository fake recording everything it is asked to save.
#[derive(Default)]
pub(crate) struct RecordingRepository {
    pub(crate) exam: Option<Exam>,
    pub(crate) fail_saves: bool,
    pub(crate) saved_attempts: Mutex<Vec<AttemptedExam>>,
    pub(crate) saved_results: Mutex<Vec<ExamResult>>,
}

impl RecordingRepository {
    pub(crate) fn with_exam(exam: Exam) -> Self {
        Self { exam: Some(exam), ..Self::default() }
    }

    pub(crate) fn saved_attempts(&self) -> Vec<AttemptedExam> {
        self.saved_attempts.lock().expect("attempts lock").clone()
    }

    pub(crate) fn saved_results(&self) -> Vec<ExamResult> {
        self.saved_results.lock().expect("results lock").clone()
    }

    fn save_error(kind: &'static str, id: &str) -> RepositoryError {
        RepositoryError::Write {
            kind,
            id: id.to_string(),
            source: std::io::Error::other("save rejected"),
        }
    }
}

#[async_trait]
impl ExamRepository for RecordingRepository {
    async fn load_exam(&self, exam_id: i64) -> Result<Exam, RepositoryError> {
        self.exam
            .as_ref()
            .filter(|exam| exam.id == exam_id)
            .cloned()
            .ok_or(RepositoryError::Bank(crate::bank::BankError::UnknownExam(exam_id)))
    }

    async fn save_attempt(&self, attempt: &AttemptedExam) -> Result<(), RepositoryError> {
        if self.fail_saves {
            return Err(Self::save_error("attempt", attempt.id()));
        }
        self.saved_attempts.lock().expect("attempts lock").push(attempt.clone());
        Ok(())
    }

    async fn save_result(&self, result: &ExamResult) -> Result<(), RepositoryError> {
        if self.fail_saves {
            return Err(Self::save_error("result", result.id()));
        }
        self.saved_results.lock().expect("results lock").push(result.clone());
        Ok(())
    }
}
