//! In-memory [`QuizStore`] used in tests and as the fallback authority when
//! no database is configured.

use std::{sync::Arc, time::SystemTime};

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{
        AnswerEntity, OtpEntity, QuestionEntity, QuizEntity, QuizStatus, SessionEntity, UserEntity,
    },
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult},
};

#[derive(Default)]
struct Inner {
    users: DashMap<Uuid, UserEntity>,
    otps: DashMap<Uuid, OtpEntity>,
    quizzes: DashMap<Uuid, QuizEntity>,
    questions: DashMap<Uuid, QuestionEntity>,
    sessions: DashMap<Uuid, SessionEntity>,
    /// (user_id, quiz_id) -> session id; enforces one session per user per quiz.
    session_keys: DashMap<(Uuid, Uuid), Uuid>,
    /// Keyed by (session_id, question_id); enforces at most one answer.
    answers: DashMap<(Uuid, Uuid), AnswerEntity>,
}

/// DashMap-backed store. Cloning is cheap and shares the underlying maps.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl QuizStore for MemoryStore {
    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.users.insert(user.id, user);
            Ok(())
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.users.get(&id).map(|user| user.clone())) })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .users
                .iter()
                .find(|user| user.email == email)
                .map(|user| user.clone()))
        })
    }

    fn insert_otp(&self, otp: OtpEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.otps.insert(otp.id, otp);
            Ok(())
        })
    }

    fn consume_otp(
        &self,
        email: String,
        code: String,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<OtpEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let candidate = inner
                .otps
                .iter()
                .find(|otp| {
                    otp.email == email && otp.code == code && !otp.is_used && otp.expires_at > now
                })
                .map(|otp| otp.id);

            let Some(id) = candidate else {
                return Ok(None);
            };

            // Re-check under the entry lock so two concurrent verifications
            // cannot both consume the same code.
            match inner.otps.get_mut(&id) {
                Some(mut otp) if !otp.is_used && otp.expires_at > now => {
                    otp.is_used = true;
                    Ok(Some(otp.clone()))
                }
                _ => Ok(None),
            }
        })
    }

    fn insert_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.quizzes.insert(quiz.id, quiz);
            Ok(())
        })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.quizzes.get(&id).map(|quiz| quiz.clone())) })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut quizzes: Vec<QuizEntity> =
                inner.quizzes.iter().map(|quiz| quiz.clone()).collect();
            quizzes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(quizzes)
        })
    }

    fn update_quiz_status(
        &self,
        id: Uuid,
        expected: QuizStatus,
        next: QuizStatus,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.quizzes.get_mut(&id) {
                Some(mut quiz) if quiz.status == expected => {
                    quiz.status = next;
                    match next {
                        QuizStatus::Active => quiz.started_at = Some(at),
                        QuizStatus::Completed => quiz.completed_at = Some(at),
                        QuizStatus::Draft => {}
                    }
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            inner.questions.insert(question.id, question);
            Ok(())
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.questions.get(&id).map(|question| question.clone())) })
    }

    fn list_questions(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut questions: Vec<QuestionEntity> = inner
                .questions
                .iter()
                .filter(|question| question.quiz_id == quiz_id)
                .map(|question| question.clone())
                .collect();
            questions.sort_by_key(|question| question.question_number);
            Ok(questions)
        })
    }

    fn mark_question_revealed(
        &self,
        id: Uuid,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.questions.get_mut(&id) {
                Some(mut question) if !question.is_revealed => {
                    question.is_revealed = true;
                    question.revealed_at = Some(at);
                    Ok(true)
                }
                _ => Ok(false),
            }
        })
    }

    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner
                .session_keys
                .entry((session.user_id, session.quiz_id))
            {
                Entry::Occupied(_) => Err(StorageError::duplicate(format!(
                    "session for user {} in quiz {}",
                    session.user_id, session.quiz_id
                ))),
                Entry::Vacant(slot) => {
                    slot.insert(session.id);
                    inner.sessions.insert(session.id, session);
                    Ok(())
                }
            }
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.sessions.get(&id).map(|session| session.clone())) })
    }

    fn find_session_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let id = inner
                .session_keys
                .get(&(user_id, quiz_id))
                .map(|entry| *entry.value());
            Ok(id.and_then(|id| inner.sessions.get(&id).map(|session| session.clone())))
        })
    }

    fn list_sessions_for_quiz(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut sessions: Vec<SessionEntity> = inner
                .sessions
                .iter()
                .filter(|session| session.quiz_id == quiz_id)
                .map(|session| session.clone())
                .collect();
            sessions.sort_by_key(|session| session.joined_at);
            Ok(sessions)
        })
    }

    fn update_session_score(
        &self,
        id: Uuid,
        total_score: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.sessions.get_mut(&id) {
                Some(mut session) => {
                    session.total_score = total_score;
                    Ok(())
                }
                None => Err(StorageError::unavailable_msg(format!(
                    "session {id} vanished during score update"
                ))),
            }
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            match inner.answers.entry((answer.session_id, answer.question_id)) {
                Entry::Occupied(_) => Err(StorageError::duplicate(format!(
                    "answer of session {} to question {}",
                    answer.session_id, answer.question_id
                ))),
                Entry::Vacant(slot) => {
                    slot.insert(answer);
                    Ok(())
                }
            }
        })
    }

    fn find_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .answers
                .get(&(session_id, question_id))
                .map(|answer| answer.clone()))
        })
    }

    fn list_answers_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let mut answers: Vec<AnswerEntity> = inner
                .answers
                .iter()
                .filter(|answer| answer.session_id == session_id)
                .map(|answer| answer.clone())
                .collect();
            answers.sort_by_key(|answer| answer.submitted_at);
            Ok(answers)
        })
    }

    fn count_correct_answers(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            Ok(inner
                .answers
                .iter()
                .filter(|answer| answer.question_id == question_id && answer.is_correct)
                .count() as u64)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::models::{OptionKey, ScoringMode};

    fn sample_quiz(id: Uuid, created_at: SystemTime) -> QuizEntity {
        QuizEntity {
            id,
            title: "Sample".into(),
            passkey: "letmein".into(),
            status: QuizStatus::Draft,
            default_time_limit_secs: 45,
            scoring_mode: ScoringMode::Standard,
            speed_table: None,
            created_by: Uuid::new_v4(),
            created_at,
            started_at: None,
            completed_at: None,
        }
    }

    fn sample_session(user_id: Uuid, quiz_id: Uuid, joined_at: SystemTime) -> SessionEntity {
        SessionEntity {
            id: Uuid::new_v4(),
            quiz_id,
            user_id,
            joined_at,
            total_score: 0,
            is_active: true,
        }
    }

    fn sample_answer(session_id: Uuid, question_id: Uuid, is_correct: bool) -> AnswerEntity {
        AnswerEntity {
            id: Uuid::new_v4(),
            session_id,
            question_id,
            selected_option: Some(OptionKey::A),
            is_correct,
            points: 0,
            arrival_position: None,
            time_to_answer_secs: 5,
            submitted_at: SystemTime::now(),
        }
    }

    #[tokio::test]
    async fn status_cas_rejects_stale_expectations() {
        let store = MemoryStore::new();
        let quiz = sample_quiz(Uuid::new_v4(), SystemTime::now());
        let id = quiz.id;
        store.insert_quiz(quiz).await.unwrap();

        let now = SystemTime::now();
        assert!(
            store
                .update_quiz_status(id, QuizStatus::Draft, QuizStatus::Active, now)
                .await
                .unwrap()
        );
        // Second start loses the race.
        assert!(
            !store
                .update_quiz_status(id, QuizStatus::Draft, QuizStatus::Active, now)
                .await
                .unwrap()
        );

        let stored = store.find_quiz(id).await.unwrap().unwrap();
        assert_eq!(stored.status, QuizStatus::Active);
        assert_eq!(stored.started_at, Some(now));
    }

    #[tokio::test]
    async fn one_session_per_user_per_quiz() {
        let store = MemoryStore::new();
        let (user, quiz) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .insert_session(sample_session(user, quiz, SystemTime::now()))
            .await
            .unwrap();
        let err = store
            .insert_session(sample_session(user, quiz, SystemTime::now()))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));

        // Same user in a different quiz is fine.
        store
            .insert_session(sample_session(user, Uuid::new_v4(), SystemTime::now()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn one_answer_per_session_per_question() {
        let store = MemoryStore::new();
        let (session, question) = (Uuid::new_v4(), Uuid::new_v4());

        store
            .insert_answer(sample_answer(session, question, true))
            .await
            .unwrap();
        let err = store
            .insert_answer(sample_answer(session, question, false))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Duplicate { .. }));

        assert_eq!(store.count_correct_answers(question).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn otp_is_consumed_exactly_once() {
        let store = MemoryStore::new();
        let now = SystemTime::now();
        store
            .insert_otp(OtpEntity {
                id: Uuid::new_v4(),
                email: "player@example.com".into(),
                code: "123456".into(),
                expires_at: now + Duration::from_secs(600),
                is_used: false,
                created_at: now,
            })
            .await
            .unwrap();

        let first = store
            .consume_otp("player@example.com".into(), "123456".into(), now)
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .consume_otp("player@example.com".into(), "123456".into(), now)
            .await
            .unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn expired_otp_is_rejected() {
        let store = MemoryStore::new();
        let now = SystemTime::now();
        store
            .insert_otp(OtpEntity {
                id: Uuid::new_v4(),
                email: "player@example.com".into(),
                code: "654321".into(),
                expires_at: now,
                is_used: false,
                created_at: now - Duration::from_secs(600),
            })
            .await
            .unwrap();

        let consumed = store
            .consume_otp("player@example.com".into(), "654321".into(), now)
            .await
            .unwrap();
        assert!(consumed.is_none());
    }

    #[tokio::test]
    async fn quizzes_list_newest_first() {
        let store = MemoryStore::new();
        let base = SystemTime::now();
        let older = sample_quiz(Uuid::new_v4(), base);
        let newer = sample_quiz(Uuid::new_v4(), base + Duration::from_secs(60));
        let (older_id, newer_id) = (older.id, newer.id);
        store.insert_quiz(older).await.unwrap();
        store.insert_quiz(newer).await.unwrap();

        let listed = store.list_quizzes().await.unwrap();
        assert_eq!(listed[0].id, newer_id);
        assert_eq!(listed[1].id, older_id);
    }

    #[tokio::test]
    async fn reveal_flag_is_monotonic() {
        let store = MemoryStore::new();
        let question = QuestionEntity {
            id: Uuid::new_v4(),
            quiz_id: Uuid::new_v4(),
            question_number: 1,
            text: "?".into(),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct_option: OptionKey::B,
            is_bonus: false,
            time_limit_secs: 30,
            points: 10,
            is_revealed: false,
            revealed_at: None,
        };
        let id = question.id;
        store.insert_question(question).await.unwrap();

        let now = SystemTime::now();
        assert!(store.mark_question_revealed(id, now).await.unwrap());
        assert!(!store.mark_question_revealed(id, now).await.unwrap());

        let stored = store.find_question(id).await.unwrap().unwrap();
        assert!(stored.is_revealed);
        assert_eq!(stored.revealed_at, Some(now));
    }
}
