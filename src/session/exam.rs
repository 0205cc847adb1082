use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::attempt::{AttemptStatus, AttemptedExam, AttemptedQuestion, ExamResult};
use crate::bank::Exam;
use crate::core::config::AttemptSettings;
use crate::core::time::now_utc;
use crate::repositories::{ExamRepository, RepositoryError};
use crate::session::question::QuestionSession;
use crate::session::QuestionOwner;

/// Exam-level progression controller: owns the ordered question sessions,
/// tracks the current position, runs the timed auto-advance, and turns the
/// finished attempt into a persisted result.
///
/// Cheap to clone; clones share the same underlying session.
#[derive(Clone)]
pub struct ExamSession {
    inner: Arc<ExamInner>,
}

struct ExamInner {
    exam_id: i64,
    advance_delay: StdDuration,
    repository: Arc<dyn ExamRepository>,
    questions: Vec<Arc<QuestionSession>>,
    state: Mutex<ProgressState>,
    progress_tx: watch::Sender<usize>,
    status_tx: watch::Sender<AttemptStatus>,
    self_ref: Weak<ExamInner>,
}

struct ProgressState {
    progress: usize,
    status: AttemptStatus,
    /// Indices of questions revealed so far, in reveal order; drives the
    /// paged presentation. The progress index is the source of truth for
    /// position.
    available: Vec<usize>,
    duration: Duration,
    /// Monotonic stamp for the pending delayed advance; a stale task bails
    /// out even if it was already past its sleep when superseded.
    generation: u64,
    advance: Option<JoinHandle<()>>,
}

impl ExamSession {
    pub fn new(
        exam: Exam,
        repository: Arc<dyn ExamRepository>,
        settings: &AttemptSettings,
    ) -> Self {
        assert!(!exam.questions.is_empty(), "an exam must have at least one question");

        let (progress_tx, _) = watch::channel(0usize);
        let (status_tx, _) = watch::channel(AttemptStatus::Started);
        let exam_id = exam.id;
        let allow_deselect = settings.allow_deselect;
        let advance_delay = settings.advance_delay();

        let inner = Arc::new_cyclic(|weak: &Weak<ExamInner>| {
            let owner: Weak<dyn QuestionOwner> = weak.clone();
            let questions = exam
                .questions
                .into_iter()
                .enumerate()
                .map(|(index, question)| {
                    Arc::new(QuestionSession::new(question, index, owner.clone(), allow_deselect))
                })
                .collect();

            ExamInner {
                exam_id,
                advance_delay,
                repository,
                questions,
                state: Mutex::new(ProgressState {
                    progress: 0,
                    status: AttemptStatus::Started,
                    available: Vec::new(),
                    duration: Duration::ZERO,
                    generation: 0,
                    advance: None,
                }),
                progress_tx,
                status_tx,
                self_ref: weak.clone(),
            }
        });

        Self { inner }
    }

    /// Loads the exam's questions through the repository and starts a
    /// session. A content failure here is the recoverable
    /// "failed to start exam" condition; the session itself is never
    /// constructed without a valid question list.
    pub async fn load(
        exam_id: i64,
        repository: Arc<dyn ExamRepository>,
        settings: &AttemptSettings,
    ) -> Result<Self, RepositoryError> {
        let exam = repository.load_exam(exam_id).await?;
        Ok(Self::new(exam, repository, settings))
    }

    pub fn exam_id(&self) -> i64 {
        self.inner.exam_id
    }

    pub fn questions(&self) -> &[Arc<QuestionSession>] {
        &self.inner.questions
    }

    pub fn progress(&self) -> usize {
        self.inner.state().progress
    }

    pub fn status(&self) -> AttemptStatus {
        self.inner.state().status
    }

    pub fn progress_title(&self) -> String {
        format!("Question {} of {}", self.progress() + 1, self.inner.questions.len())
    }

    /// The question at the current position. The position is maintained in
    /// `0..questions.len()` by construction; anything else is a sequencing
    /// bug and panics.
    pub fn current_question(&self) -> Arc<QuestionSession> {
        let progress = self.progress();
        self.inner
            .questions
            .get(progress)
            .cloned()
            .unwrap_or_else(|| panic!("question index {progress} out of bounds"))
    }

    /// Questions revealed so far, in reveal order.
    pub fn available_questions(&self) -> Vec<Arc<QuestionSession>> {
        let state = self.inner.state();
        state.available.iter().map(|index| self.inner.questions[*index].clone()).collect()
    }

    pub fn watch_progress(&self) -> watch::Receiver<usize> {
        self.inner.progress_tx.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<AttemptStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Snapshots every question ledger as an independent value.
    pub fn attempted_questions(&self) -> Vec<AttemptedQuestion> {
        self.inner.questions.iter().map(|question| question.finish()).collect()
    }

    /// Builds the result projection from the current snapshots without
    /// ending the session.
    pub fn result(&self) -> ExamResult {
        let (status, duration) = {
            let state = self.inner.state();
            (state.status, state.duration)
        };
        let attempt = AttemptedExam::new(
            self.inner.exam_id,
            self.attempted_questions(),
            status,
            now_utc(),
            duration,
        );
        ExamResult::new(attempt)
    }

    /// Ends the attempt: `DidNotFinish` if any question is not fully
    /// answered, `Finished` otherwise, then persists the attempt and its
    /// result in the background. Persistence failures are logged and
    /// swallowed; the in-memory result stays valid either way.
    pub fn finish_exam(&self, duration: Duration) {
        self.inner.finish_exam(duration);
    }

    /// Puts the session back to its initial, unattempted state. Returns the
    /// session for call chaining.
    pub fn restart_exam(&self) -> &Self {
        for question in &self.inner.questions {
            question.reset();
        }
        {
            let mut state = self.inner.state();
            state.generation += 1;
            if let Some(handle) = state.advance.take() {
                handle.abort();
            }
            state.progress = 0;
            state.status = AttemptStatus::Unattempted;
            state.available.clear();
            state.duration = Duration::ZERO;
        }
        self.inner.progress_tx.send_replace(0);
        self.inner.status_tx.send_replace(AttemptStatus::Unattempted);
        self
    }
}

#[async_trait]
impl QuestionOwner for ExamSession {
    async fn progress_to_next_questions(&self) {
        self.inner.progress_to_next_questions().await;
    }

    async fn allow_progress_to_next_question(&self) {
        self.inner.allow_progress_to_next_question().await;
    }
}

#[async_trait]
impl QuestionOwner for ExamInner {
    async fn progress_to_next_questions(&self) {
        let scheduled = {
            let mut state = self.state();
            let next = state.progress + 1;
            if next < self.questions.len() {
                state.available.push(next);
                state.generation += 1;
                if let Some(handle) = state.advance.take() {
                    handle.abort();
                }
                let task = tokio::spawn(delayed_advance(
                    self.self_ref.clone(),
                    state.generation,
                    self.advance_delay,
                ));
                state.advance = Some(task);
                true
            } else {
                false
            }
        };

        if !scheduled {
            self.finish_exam(Duration::ZERO);
        }
    }

    async fn allow_progress_to_next_question(&self) {
        let revealed = {
            let mut state = self.state();
            let next = state.progress + 1;
            if next < self.questions.len() {
                state.available.push(next);
                true
            } else {
                false
            }
        };

        if !revealed {
            self.finish_exam(Duration::ZERO);
        }
    }
}

impl ExamInner {
    fn finish_exam(&self, duration: Duration) {
        let snapshots: Vec<AttemptedQuestion> =
            self.questions.iter().map(|question| question.finish()).collect();
        let all_answered = snapshots.iter().all(|question| question.is_fully_answered());
        let status =
            if all_answered { AttemptStatus::Finished } else { AttemptStatus::DidNotFinish };

        {
            let mut state = self.state();
            state.generation += 1;
            if let Some(handle) = state.advance.take() {
                handle.abort();
            }
            state.status = status;
            state.duration = duration;
        }
        self.status_tx.send_replace(status);

        let attempt = AttemptedExam::new(self.exam_id, snapshots, status, now_utc(), duration);
        let result = ExamResult::new(attempt.clone());
        let repository = self.repository.clone();
        tokio::spawn(async move {
            if let Err(err) = repository.save_attempt(&attempt).await {
                tracing::error!(
                    error = %err,
                    exam_id = attempt.exam_id(),
                    "Failed to save exam attempt"
                );
            }
            if let Err(err) = repository.save_result(&result).await {
                tracing::error!(
                    error = %err,
                    exam_id = result.exam_id(),
                    "Failed to save exam result"
                );
            }
        });
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One-shot delayed advance. Aborting the handle cancels it at the sleep;
/// the generation check stops a task that was already past the sleep when it
/// was superseded.
async fn delayed_advance(inner: Weak<ExamInner>, generation: u64, delay: StdDuration) {
    tokio::time::sleep(delay).await;
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let mut state = inner.state();
    if state.generation != generation {
        return;
    }
    state.advance = None;
    state.progress += 1;
    inner.progress_tx.send_replace(state.progress);
}
