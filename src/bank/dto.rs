use serde::Deserialize;

use crate::bank::models::{Choice, Question};

/// Wire schema of the bundled question bank. `correct` carries zero-based
/// choice indices encoded as strings; entries that do not parse as indices
/// are ignored rather than rejected. Bank files also carry `category` and
/// `year` fields the engine has no use for; serde skips them.
#[derive(Debug, Deserialize)]
pub(super) struct RawQuestion {
    pub(super) question_id: String,
    pub(super) book_section_id: String,
    pub(super) question: String,
    pub(super) choices: Vec<String>,
    pub(super) correct: Vec<String>,
    #[serde(default)]
    pub(super) explanation: Explanation,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct Explanation {
    #[serde(default)]
    pub(super) link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BankFile {
    pub(super) data: Vec<RawQuestion>,
}

impl RawQuestion {
    pub(super) fn into_model(self) -> Question {
        let correct: Vec<usize> =
            self.correct.iter().filter_map(|index| index.parse::<usize>().ok()).collect();
        let choices = self
            .choices
            .into_iter()
            .enumerate()
            .map(|(index, title)| Choice { title, is_answer: correct.contains(&index) })
            .collect();

        Question {
            id: self.question_id,
            section_id: self.book_section_id,
            title: self.question,
            hint: self.explanation.link,
            choices,
        }
    }
}
