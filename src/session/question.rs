use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, Weak};

use crate::attempt::{AnswerState, AttemptedQuestion};
use crate::bank::{Choice, Question};
use crate::session::QuestionOwner;

/// Per-question progression controller. Accepts one selection at a time,
/// judges it against the choice's answer flag, and notifies the owner once
/// the question resolves: auto-advance when every required choice was picked
/// correctly, manual advance as soon as a wrong choice is picked.
pub struct QuestionSession {
    index: usize,
    question: Question,
    allow_deselect: bool,
    owner: Weak<dyn QuestionOwner>,
    state: Mutex<LedgerState>,
}

struct LedgerState {
    ledger: AttemptedQuestion,
    attempts: u32,
    show_hint: bool,
}

enum Resolution {
    AutoAdvance,
    ManualAdvance,
    Pending,
}

impl QuestionSession {
    pub fn new(
        question: Question,
        index: usize,
        owner: Weak<dyn QuestionOwner>,
        allow_deselect: bool,
    ) -> Self {
        let ledger = AttemptedQuestion::new(question.clone());
        Self {
            index,
            question,
            allow_deselect,
            owner,
            state: Mutex::new(LedgerState { ledger, attempts: 0, show_hint: false }),
        }
    }

    /// Records one user selection. Calling this on a fully answered question
    /// is an ownership bug in the caller, not a runtime condition, and
    /// panics.
    pub async fn selected(&self, choice: &Choice) {
        let resolution = {
            let mut state = self.state();
            assert!(
                !state.ledger.is_fully_answered(),
                "selecting more answers than the question allows is not supported"
            );

            if self.allow_deselect && state.ledger.state_of(choice).is_some() {
                state.ledger.remove_selected(choice);
                state.attempts = 0;
                state.show_hint = !state.ledger.is_answered_correctly();
                return;
            }

            let judged = if choice.is_answer { AnswerState::Correct } else { AnswerState::Wrong };
            state.ledger.update_selected(choice, judged);

            let resolution = match (choice.is_answer, state.ledger.is_fully_answered()) {
                (true, true) => Resolution::AutoAdvance,
                (true, false) => Resolution::Pending,
                (false, _) => {
                    state.attempts += 1;
                    Resolution::ManualAdvance
                }
            };

            // Hint stays hidden exactly while every recorded judgement is correct.
            state.show_hint = !state.ledger.is_answered_correctly();
            resolution
        };

        match resolution {
            Resolution::AutoAdvance => {
                if let Some(owner) = self.owner.upgrade() {
                    owner.progress_to_next_questions().await;
                }
            }
            Resolution::ManualAdvance => {
                if let Some(owner) = self.owner.upgrade() {
                    owner.allow_progress_to_next_question().await;
                }
            }
            Resolution::Pending => {}
        }
    }

    /// Read model for rendering one choice. Recorded judgements win; while
    /// the question is not answered correctly the correct choices are
    /// revealed, and once it is, unselected choices stay unmarked.
    pub fn state_for(&self, choice: &Choice) -> AnswerState {
        let state = self.state();
        if let Some(recorded) = state.ledger.state_of(choice) {
            return recorded;
        }
        if !state.ledger.is_answered_correctly() {
            return if choice.is_answer { AnswerState::Correct } else { AnswerState::NotAttempted };
        }
        AnswerState::NotAttempted
    }

    pub fn reset(&self) {
        let mut state = self.state();
        state.ledger.update_selected_choices(HashMap::new());
        state.attempts = 0;
        state.show_hint = false;
    }

    /// Snapshots the current selections and bookmark into an independent
    /// ledger value, detached from the live session.
    pub fn finish(&self) -> AttemptedQuestion {
        self.state().ledger.clone()
    }

    pub fn is_fully_answered(&self) -> bool {
        self.state().ledger.is_fully_answered()
    }

    pub fn is_answered_correctly(&self) -> bool {
        self.state().ledger.is_answered_correctly()
    }

    pub fn allow_choice_selection(&self) -> bool {
        !self.is_fully_answered()
    }

    pub fn selected_choices(&self) -> HashMap<Choice, AnswerState> {
        self.state().ledger.selected_choices().clone()
    }

    pub fn show_hint(&self) -> bool {
        self.state().show_hint
    }

    pub fn attempts(&self) -> u32 {
        self.state().attempts
    }

    pub fn bookmark(&self) {
        self.state().ledger.bookmark();
    }

    pub fn bookmarked(&self) -> bool {
        self.state().ledger.bookmarked()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn title(&self) -> &str {
        &self.question.title
    }

    pub fn hint(&self) -> Option<&str> {
        self.question.hint.as_deref()
    }

    pub fn choices(&self) -> &[Choice] {
        &self.question.choices
    }

    pub fn prompt(&self) -> &'static str {
        match self.question.required_count() {
            1 => "Please select ONE answer",
            2 => "Please select TWO answers",
            _ => "Please select MULTIPLE answers",
        }
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
