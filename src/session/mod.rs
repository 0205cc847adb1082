mod exam;
mod question;

#[cfg(test)]
mod tests;

pub use exam::ExamSession;
pub use question::QuestionSession;

use async_trait::async_trait;

/// Capability a question session uses to notify its owner once a selection
/// resolves the question. Injected as a weak capability rather than a
/// concrete back-pointer so the per-question state machine stays free of
/// ownership cycles and unit-testable against a stub.
#[async_trait]
pub trait QuestionOwner: Send + Sync {
    /// All required correct choices are selected; the owner reveals the next
    /// question and schedules the timed auto-advance.
    async fn progress_to_next_questions(&self);

    /// A wrong choice was selected; the owner reveals the next question but
    /// leaves navigation to the user.
    async fn allow_progress_to_next_question(&self);
}
