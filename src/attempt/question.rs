use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bank::{Choice, Question};

/// Judgement recorded for one selected choice. A choice is only ever stored
/// in the ledger as `Correct` or `Wrong`; `NotAttempted` is the read-model
/// value for choices with no recorded selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerState {
    Correct,
    Wrong,
    NotAttempted,
}

/// Per-question answer ledger: which choices the user selected and how each
/// was judged. Copy-on-write value semantics; mutation happens only through
/// the update methods below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptedQuestion {
    id: String,
    question: Question,
    selected_choices: HashMap<Choice, AnswerState>,
    bookmarked: bool,
}

impl AttemptedQuestion {
    pub fn new(question: Question) -> Self {
        Self {
            id: question.id.clone(),
            question,
            selected_choices: HashMap::new(),
            bookmarked: false,
        }
    }

    pub fn with_selected(
        question: Question,
        selected_choices: HashMap<Choice, AnswerState>,
        bookmarked: bool,
    ) -> Self {
        Self { id: question.id.clone(), question, selected_choices, bookmarked }
    }

    /// Every recorded selection was judged correct. Vacuously true on an
    /// empty ledger; aggregation call sites must pair this with
    /// [`Self::is_fully_answered`].
    pub fn is_answered_correctly(&self) -> bool {
        self.selected_choices.values().all(|state| *state == AnswerState::Correct)
    }

    /// The user has made as many selections as the question requires,
    /// regardless of whether they were correct.
    pub fn is_fully_answered(&self) -> bool {
        self.selected_choices.len() == self.question.required_count()
    }

    pub fn update_selected(&mut self, choice: &Choice, state: AnswerState) {
        self.selected_choices.insert(choice.clone(), state);
    }

    pub fn remove_selected(&mut self, choice: &Choice) {
        self.selected_choices.remove(choice);
    }

    pub fn update_selected_choices(&mut self, selected: HashMap<Choice, AnswerState>) {
        self.selected_choices = selected;
    }

    pub fn bookmark(&mut self) {
        self.bookmarked = !self.bookmarked;
    }

    pub fn state_of(&self, choice: &Choice) -> Option<AnswerState> {
        self.selected_choices.get(choice).copied()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn selected_choices(&self) -> &HashMap<Choice, AnswerState> {
        &self.selected_choices
    }

    pub fn bookmarked(&self) -> bool {
        self.bookmarked
    }

    pub fn title(&self) -> &str {
        &self.question.title
    }

    pub fn hint(&self) -> &str {
        self.question.hint.as_deref().unwrap_or("N/A")
    }

    pub fn choices(&self) -> &[Choice] {
        &self.question.choices
    }
}
