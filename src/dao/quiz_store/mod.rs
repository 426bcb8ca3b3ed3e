//! Persistence port for quiz data.
//!
//! The trait is object-safe so the application can hold `Arc<dyn QuizStore>`
//! and swap backends at runtime; every method takes owned arguments and
//! returns a boxed future for the same reason.

use std::time::SystemTime;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        AnswerEntity, OtpEntity, QuestionEntity, QuizEntity, QuizStatus, SessionEntity, UserEntity,
    },
    storage::StorageResult,
};

pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

pub use memory::MemoryStore;

/// Abstraction over the persistence backend.
pub trait QuizStore: Send + Sync {
    /// Persist a new user account.
    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Fetch a user by id.
    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;

    /// Fetch a user by email (exact match on the stored, lowercased form).
    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>>;

    /// Persist a freshly issued one-time code.
    fn insert_otp(&self, otp: OtpEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Atomically find-and-consume a matching unused, unexpired code.
    ///
    /// Returns the consumed record, or `None` when no code matches. A code
    /// can be consumed at most once even under concurrent verification.
    fn consume_otp(
        &self,
        email: String,
        code: String,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<OtpEntity>>>;

    /// Persist a new quiz.
    fn insert_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Fetch a quiz by id.
    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>>;

    /// List every quiz, newest first.
    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizEntity>>>;

    /// Compare-and-set the quiz status, stamping the transition timestamp.
    ///
    /// Returns `false` when the quiz is missing or its status no longer
    /// matches `expected`; the caller treats that as a lost race.
    fn update_quiz_status(
        &self,
        id: Uuid,
        expected: QuizStatus,
        next: QuizStatus,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Persist a new question.
    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Fetch a question by id.
    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>>;

    /// List a quiz's questions ordered by question number.
    fn list_questions(&self, quiz_id: Uuid)
    -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>>;

    /// Compare-and-set the reveal flag of a question.
    ///
    /// Returns `false` when the question is missing or already revealed.
    fn mark_question_revealed(
        &self,
        id: Uuid,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>>;

    /// Persist a new participant session.
    ///
    /// Fails with [`StorageError::Duplicate`](crate::dao::storage::StorageError::Duplicate)
    /// when the user already has a session for the quiz.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Fetch a session by id.
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;

    /// Fetch the session binding a user to a quiz, if any.
    fn find_session_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;

    /// List every session of a quiz in join order.
    fn list_sessions_for_quiz(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>>;

    /// Overwrite a session's running total.
    fn update_session_score(
        &self,
        id: Uuid,
        total_score: u32,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Persist an answer record.
    ///
    /// Fails with [`StorageError::Duplicate`](crate::dao::storage::StorageError::Duplicate)
    /// when an answer already exists for the `(session, question)` pair.
    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>>;

    /// Fetch the answer a session gave to a question, if any.
    fn find_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>>;

    /// List every answer a session has recorded.
    fn list_answers_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>>;

    /// Count the correct answers already recorded for a question.
    fn count_correct_answers(&self, question_id: Uuid)
    -> BoxFuture<'static, StorageResult<u64>>;

    /// Probe backend liveness.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;

    /// Attempt to re-establish the backend connection after a failed probe.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
