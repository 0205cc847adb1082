use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::attempt::{AnswerState, AttemptStatus};
use crate::bank::{Choice, Question};
use crate::core::config::AttemptSettings;
use crate::session::{ExamSession, QuestionOwner, QuestionSession};
use crate::test_support::{
    make_exam, make_multi_answer_question, make_single_answer_question, RecordingOwner,
    RecordingRepository,
};

fn settings() -> AttemptSettings {
    AttemptSettings::default()
}

fn question_session(question: &Question, owner: &Arc<RecordingOwner>) -> QuestionSession {
    let owner: Arc<dyn QuestionOwner> = owner.clone();
    let weak: Weak<dyn QuestionOwner> = Arc::downgrade(&owner);
    QuestionSession::new(question.clone(), 0, weak, false)
}

fn deselectable_session(question: &Question, owner: &Arc<RecordingOwner>) -> QuestionSession {
    let owner: Arc<dyn QuestionOwner> = owner.clone();
    let weak: Weak<dyn QuestionOwner> = Arc::downgrade(&owner);
    QuestionSession::new(question.clone(), 0, weak, true)
}

fn correct_choice(question: &Question) -> Choice {
    question.choices.iter().find(|choice| choice.is_answer).cloned().expect("correct choice")
}

fn wrong_choice(question: &Question) -> Choice {
    question.choices.iter().find(|choice| !choice.is_answer).cloned().expect("wrong choice")
}

async fn drain_background_tasks() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// Per-question state machine.

#[tokio::test]
async fn correct_answer_notifies_auto_advance_exactly_once() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    session.selected(&question.choices[0]).await;

    assert!(session.is_answered_correctly());
    assert!(session.is_fully_answered());
    assert_eq!(owner.progress_calls(), 1);
    assert_eq!(owner.allow_calls(), 0);
}

#[tokio::test]
async fn wrong_answer_notifies_manual_advance() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    session.selected(&wrong_choice(&question)).await;

    assert_eq!(owner.progress_calls(), 0);
    assert_eq!(owner.allow_calls(), 1);
    assert_eq!(session.attempts(), 1);
}

#[tokio::test]
async fn wrong_answer_shows_hint_and_correct_answer_does_not() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);

    let wrong_session = question_session(&question, &owner);
    wrong_session.selected(&wrong_choice(&question)).await;
    assert!(wrong_session.show_hint());

    let correct_session = question_session(&question, &owner);
    correct_session.selected(&question.choices[0]).await;
    assert!(!correct_session.show_hint());
}

#[tokio::test]
async fn multi_answer_waits_for_all_required_selections() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_multi_answer_question("q2", &[0, 1]);
    let session = question_session(&question, &owner);

    session.selected(&question.choices[0]).await;
    assert!(!session.is_fully_answered());
    assert_eq!(owner.progress_calls(), 0);
    assert_eq!(owner.allow_calls(), 0);

    session.selected(&question.choices[1]).await;
    assert!(session.is_fully_answered());
    assert_eq!(owner.progress_calls(), 1);
}

#[tokio::test]
async fn multi_answer_with_one_wrong_selection_unlocks_manual_advance() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_multi_answer_question("q2", &[0, 1]);
    let session = question_session(&question, &owner);

    session.selected(&question.choices[0]).await;
    session.selected(&question.choices[2]).await;

    assert!(session.is_fully_answered());
    assert!(!session.is_answered_correctly());
    assert_eq!(owner.progress_calls(), 0);
    assert_eq!(owner.allow_calls(), 1);
    assert!(session.show_hint());
}

#[tokio::test]
async fn selection_is_recorded_in_the_ledger() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    session.selected(&question.choices[0]).await;

    assert_eq!(
        session.selected_choices().get(&question.choices[0]),
        Some(&AnswerState::Correct)
    );
    assert!(!session.allow_choice_selection());
}

#[tokio::test]
#[should_panic(expected = "more answers than the question allows")]
async fn selecting_past_resolution_panics() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    session.selected(&question.choices[0]).await;
    session.selected(&question.choices[1]).await;
}

#[tokio::test]
async fn state_for_reports_recorded_judgements() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    session.selected(&wrong_choice(&question)).await;

    assert_eq!(session.state_for(&question.choices[1]), AnswerState::Wrong);
    // The wrong pick reveals the correct answer.
    assert_eq!(session.state_for(&question.choices[0]), AnswerState::Correct);
}

#[tokio::test]
async fn state_for_does_not_spoil_before_any_selection() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    for choice in session.choices() {
        assert_eq!(session.state_for(choice), AnswerState::NotAttempted);
    }
}

#[tokio::test]
async fn state_for_keeps_unselected_choices_unmarked_after_a_correct_answer() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    session.selected(&question.choices[0]).await;

    assert_eq!(session.state_for(&question.choices[0]), AnswerState::Correct);
    assert_eq!(session.state_for(&question.choices[2]), AnswerState::NotAttempted);
}

#[tokio::test]
async fn reset_clears_selections_hint_and_attempts() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_single_answer_question("q1", 0);
    let session = question_session(&question, &owner);

    session.selected(&wrong_choice(&question)).await;
    assert!(!session.selected_choices().is_empty());

    session.reset();

    assert!(session.selected_choices().is_empty());
    assert!(!session.show_hint());
    assert_eq!(session.attempts(), 0);
}

#[tokio::test]
async fn deselection_removes_the_entry_and_resets_attempts() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_multi_answer_question("q2", &[0, 1]);
    let session = deselectable_session(&question, &owner);

    let wrong = wrong_choice(&question);
    session.selected(&wrong).await;
    assert_eq!(session.attempts(), 1);
    assert!(session.show_hint());

    session.selected(&wrong).await;

    assert!(session.selected_choices().is_empty());
    assert_eq!(session.attempts(), 0);
    assert!(!session.show_hint());
    // No extra owner notification for the deselection.
    assert_eq!(owner.allow_calls(), 1);
}

#[tokio::test]
async fn finish_snapshot_is_detached_from_the_live_session() {
    let owner = Arc::new(RecordingOwner::default());
    let question = make_multi_answer_question("q2", &[0, 1]);
    let session = question_session(&question, &owner);

    session.selected(&question.choices[0]).await;
    let snapshot = session.finish();
    session.selected(&question.choices[1]).await;

    assert_eq!(snapshot.selected_choices().len(), 1);
    assert_eq!(session.selected_choices().len(), 2);
}

#[tokio::test]
async fn selection_without_a_live_owner_still_updates_the_ledger() {
    let question = make_single_answer_question("q1", 0);
    let weak = {
        let owner: Arc<dyn QuestionOwner> = Arc::new(RecordingOwner::default());
        let weak: Weak<dyn QuestionOwner> = Arc::downgrade(&owner);
        weak
    };
    let session = QuestionSession::new(question.clone(), 0, weak, false);

    session.selected(&question.choices[0]).await;

    assert!(session.is_answered_correctly());
}

#[tokio::test]
async fn prompt_matches_required_selection_count() {
    let owner = Arc::new(RecordingOwner::default());

    let one = question_session(&make_single_answer_question("q1", 0), &owner);
    assert_eq!(one.prompt(), "Please select ONE answer");

    let two = question_session(&make_multi_answer_question("q2", &[0, 1]), &owner);
    assert_eq!(two.prompt(), "Please select TWO answers");

    let three = question_session(&make_multi_answer_question("q3", &[0, 1, 2]), &owner);
    assert_eq!(three.prompt(), "Please select MULTIPLE answers");
}

// Exam-level progression.

#[tokio::test]
async fn new_session_starts_at_question_zero() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 4, 0), repository, &settings());

    assert_eq!(session.progress(), 0);
    assert_eq!(session.status(), AttemptStatus::Started);
    assert_eq!(session.questions().len(), 4);
    assert_eq!(session.progress_title(), "Question 1 of 4");
    assert!(session.available_questions().is_empty());
}

#[tokio::test]
#[should_panic(expected = "at least one question")]
async fn empty_exam_is_a_construction_bug() {
    let repository = Arc::new(RecordingRepository::default());
    let exam = crate::bank::Exam { id: 0, questions: Vec::new() };
    let _ = ExamSession::new(exam, repository, &settings());
}

#[tokio::test]
async fn load_surfaces_unknown_exam_as_an_error() {
    let repository = Arc::new(RecordingRepository::with_exam(make_exam(3, 2, 0)));

    assert!(ExamSession::load(3, repository.clone(), &settings()).await.is_ok());
    assert!(ExamSession::load(4, repository, &settings()).await.is_err());
}

#[tokio::test(start_paused = true)]
async fn correct_answer_reveals_next_and_advances_after_the_delay() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 3, 0), repository, &settings());

    let question = session.current_question();
    let choice = correct_choice(question.question());
    question.selected(&choice).await;

    assert_eq!(session.available_questions().len(), 1);
    assert_eq!(session.progress(), 0, "advance must wait for the delay");

    tokio::time::sleep(Duration::from_millis(1100)).await;

    assert_eq!(session.progress(), 1);
    assert_eq!(session.current_question().index(), 1);
    assert_eq!(session.progress_title(), "Question 2 of 3");
}

#[tokio::test(start_paused = true)]
async fn wrong_answer_reveals_next_without_moving() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 3, 0), repository, &settings());

    let question = session.current_question();
    question.selected(&wrong_choice(question.question())).await;

    assert_eq!(session.available_questions().len(), 1);

    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(session.progress(), 0, "manual advance must not move the position");
}

#[tokio::test(start_paused = true)]
async fn rescheduled_advance_supersedes_the_pending_one() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 4, 0), repository, &settings());

    session.progress_to_next_questions().await;
    tokio::time::sleep(Duration::from_millis(500)).await;
    session.progress_to_next_questions().await;

    // Past the first deadline: the superseded advance must not have fired.
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(session.progress(), 0);

    // Past the second deadline: exactly one increment.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(session.progress(), 1);
}

#[tokio::test(start_paused = true)]
async fn progress_updates_are_observable() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 3, 0), repository, &settings());
    let mut progress_rx = session.watch_progress();

    session.progress_to_next_questions().await;
    tokio::time::sleep(Duration::from_millis(1100)).await;

    progress_rx.changed().await.expect("progress update");
    assert_eq!(*progress_rx.borrow(), 1);
}

#[tokio::test(start_paused = true)]
async fn answering_the_last_question_correctly_finishes_the_exam() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 1, 0), repository.clone(), &settings());

    let question = session.current_question();
    question.selected(&correct_choice(question.question())).await;
    drain_background_tasks().await;

    assert_eq!(session.status(), AttemptStatus::Finished);
    assert_eq!(repository.saved_attempts().len(), 1);
    assert_eq!(repository.saved_results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn finish_with_an_unanswered_question_is_did_not_finish() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 2, 0), repository.clone(), &settings());

    let question = session.current_question();
    question.selected(&correct_choice(question.question())).await;

    session.finish_exam(time::Duration::seconds(30));
    drain_background_tasks().await;

    // Question 0 was correct, question 1 was never touched.
    assert_eq!(session.status(), AttemptStatus::DidNotFinish);
    let saved = repository.saved_attempts();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].status(), AttemptStatus::DidNotFinish);
    assert_eq!(saved[0].duration(), time::Duration::seconds(30));
}

#[tokio::test(start_paused = true)]
async fn answering_every_question_correctly_finishes_the_exam() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 2, 0), repository.clone(), &settings());

    let first = session.current_question();
    first.selected(&correct_choice(first.question())).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(session.progress(), 1);

    let second = session.current_question();
    second.selected(&correct_choice(second.question())).await;
    drain_background_tasks().await;

    assert_eq!(session.status(), AttemptStatus::Finished);
    let results = repository.saved_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].score_percentage(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn failed_saves_do_not_disturb_the_in_memory_result() {
    let repository =
        Arc::new(RecordingRepository { fail_saves: true, ..RecordingRepository::default() });
    let session = ExamSession::new(make_exam(0, 1, 0), repository.clone(), &settings());

    let question = session.current_question();
    question.selected(&correct_choice(question.question())).await;
    drain_background_tasks().await;

    assert_eq!(session.status(), AttemptStatus::Finished);
    assert!(repository.saved_attempts().is_empty());
    assert_eq!(session.result().score_percentage(), 100.0);
}

#[tokio::test(start_paused = true)]
async fn restart_returns_the_session_to_its_initial_state() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 3, 0), repository, &settings());

    let question = session.current_question();
    question.selected(&correct_choice(question.question())).await;
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(session.progress(), 1);

    session.restart_exam();

    assert_eq!(session.progress(), 0);
    assert_eq!(session.status(), AttemptStatus::Unattempted);
    assert!(session.available_questions().is_empty());
    assert!(session.questions()[0].selected_choices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn restart_cancels_a_pending_advance() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 3, 0), repository, &settings());

    session.progress_to_next_questions().await;
    session.restart_exam();

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(session.progress(), 0);
}

#[tokio::test(start_paused = true)]
async fn restart_then_finish_with_no_selections_never_finishes_clean() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 2, 0), repository.clone(), &settings());

    let question = session.current_question();
    question.selected(&correct_choice(question.question())).await;
    session.finish_exam(time::Duration::seconds(10));
    drain_background_tasks().await;

    session.restart_exam().finish_exam(time::Duration::ZERO);
    drain_background_tasks().await;

    assert_eq!(session.status(), AttemptStatus::DidNotFinish);
    assert_eq!(repository.saved_attempts().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn result_projects_the_current_snapshots() {
    let repository = Arc::new(RecordingRepository::default());
    let session = ExamSession::new(make_exam(0, 3, 0), repository, &settings());

    let q0 = session.questions()[0].clone();
    q0.selected(&correct_choice(q0.question())).await;
    let q1 = session.questions()[1].clone();
    q1.selected(&wrong_choice(q1.question())).await;

    let result = session.result();

    assert_eq!(result.exam().questions().len(), 3);
    assert_eq!(result.exam().correct_questions().len(), 1);
    assert_eq!(result.exam().unanswered_questions().len(), 1);
}
