/// One selectable option within a question. Identity is by value; choice
/// titles are unique within a single question's choice list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Choice {
    pub title: String,
    pub is_answer: bool,
}

impl Choice {
    pub fn new(title: impl Into<String>, is_answer: bool) -> Self {
        Self { title: title.into(), is_answer }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: String,
    pub section_id: String,
    pub title: String,
    pub hint: Option<String>,
    pub choices: Vec<Choice>,
}

impl Question {
    /// Number of selections required to fully answer this question: the
    /// count of choices flagged as correct, always >= 1 in valid content.
    pub fn required_count(&self) -> usize {
        self.choices.iter().filter(|choice| choice.is_answer).count()
    }

    pub fn answers(&self) -> impl Iterator<Item = &Choice> {
        self.choices.iter().filter(|choice| choice.is_answer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exam {
    pub id: i64,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_count_counts_correct_choices() {
        let question = Question {
            id: "q1".to_string(),
            section_id: "s1".to_string(),
            title: "t".to_string(),
            hint: None,
            choices: vec![
                Choice::new("A", true),
                Choice::new("B", true),
                Choice::new("C", false),
                Choice::new("D", false),
            ],
        };
        assert_eq!(question.required_count(), 2);
        assert_eq!(question.answers().count(), 2);
    }
}
