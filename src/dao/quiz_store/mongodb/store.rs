//! The [`QuizStore`] implementation backed by MongoDB.

use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{DateTime, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoAnswerDocument, MongoOtpDocument, MongoQuestionDocument, MongoQuizDocument,
        MongoSessionDocument, MongoUserDocument,
    },
};
use crate::dao::{
    models::{
        AnswerEntity, OtpEntity, QuestionEntity, QuizEntity, QuizStatus, SessionEntity, UserEntity,
    },
    quiz_store::QuizStore,
    storage::{StorageError, StorageResult},
};

const USER_COLLECTION: &str = "users";
const OTP_COLLECTION: &str = "otps";
const QUIZ_COLLECTION: &str = "quizzes";
const QUESTION_COLLECTION: &str = "questions";
const SESSION_COLLECTION: &str = "quiz_sessions";
const ANSWER_COLLECTION: &str = "answers";

/// MongoDB-backed store. Cloning shares the connection state.
#[derive(Clone)]
pub struct MongoQuizStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

fn insert_error(collection: &'static str, key: String, err: MongoError) -> StorageError {
    if is_duplicate_key(&err) {
        StorageError::duplicate(key)
    } else {
        MongoDaoError::Write {
            collection,
            source: err,
        }
        .into()
    }
}

fn decode_error(collection: &'static str, message: String) -> StorageError {
    MongoDaoError::Decode {
        collection,
        message,
    }
    .into()
}

impl MongoQuizStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        // One session per user per quiz.
        let sessions = database.collection::<MongoSessionDocument>(SESSION_COLLECTION);
        let session_index = IndexModel::builder()
            .keys(doc! {"user_id": 1, "quiz_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_user_quiz_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        sessions
            .create_index(session_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION,
                index: "user_id,quiz_id",
                source,
            })?;

        // One answer per session per question; this is the backstop behind
        // the in-process submission gate.
        let answers = database.collection::<MongoAnswerDocument>(ANSWER_COLLECTION);
        let answer_index = IndexModel::builder()
            .keys(doc! {"session_id": 1, "question_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("answer_session_question_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        answers
            .create_index(answer_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ANSWER_COLLECTION,
                index: "session_id,question_id",
                source,
            })?;

        let questions = database.collection::<MongoQuestionDocument>(QUESTION_COLLECTION);
        let question_index = IndexModel::builder()
            .keys(doc! {"quiz_id": 1, "question_number": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("question_quiz_idx".to_owned()))
                    .build(),
            )
            .build();
        questions
            .create_index(question_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: QUESTION_COLLECTION,
                index: "quiz_id,question_number",
                source,
            })?;

        let users = database.collection::<MongoUserDocument>(USER_COLLECTION);
        let user_index = IndexModel::builder()
            .keys(doc! {"email": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("user_email_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        users
            .create_index(user_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: USER_COLLECTION,
                index: "email",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn users(&self) -> Collection<MongoUserDocument> {
        self.database().await.collection(USER_COLLECTION)
    }

    async fn otps(&self) -> Collection<MongoOtpDocument> {
        self.database().await.collection(OTP_COLLECTION)
    }

    async fn quizzes(&self) -> Collection<MongoQuizDocument> {
        self.database().await.collection(QUIZ_COLLECTION)
    }

    async fn questions(&self) -> Collection<MongoQuestionDocument> {
        self.database().await.collection(QUESTION_COLLECTION)
    }

    async fn sessions(&self) -> Collection<MongoSessionDocument> {
        self.database().await.collection(SESSION_COLLECTION)
    }

    async fn answers(&self) -> Collection<MongoAnswerDocument> {
        self.database().await.collection(ANSWER_COLLECTION)
    }

    async fn find_quiz_inner(&self, id: Uuid) -> StorageResult<Option<QuizEntity>> {
        let document = self
            .quizzes()
            .await
            .find_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: QUIZ_COLLECTION,
                source,
            })?;

        document
            .map(|doc| {
                doc.try_into()
                    .map_err(|message| decode_error(QUIZ_COLLECTION, message))
            })
            .transpose()
    }

    async fn find_question_inner(&self, id: Uuid) -> StorageResult<Option<QuestionEntity>> {
        let document = self
            .questions()
            .await
            .find_one(doc! {"_id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::Query {
                collection: QUESTION_COLLECTION,
                source,
            })?;

        document
            .map(|doc| {
                doc.try_into()
                    .map_err(|message| decode_error(QUESTION_COLLECTION, message))
            })
            .transpose()
    }
}

impl QuizStore for MongoQuizStore {
    fn insert_user(&self, user: UserEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let email = user.email.clone();
            let document: MongoUserDocument = user.into();
            store
                .users()
                .await
                .insert_one(&document)
                .await
                .map_err(|err| insert_error(USER_COLLECTION, format!("user {email}"), err))?;
            Ok(())
        })
    }

    fn find_user(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .users()
                .await
                .find_one(doc! {"_id": id.to_string()})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: USER_COLLECTION,
                    source,
                })?;

            document
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(USER_COLLECTION, message))
                })
                .transpose()
        })
    }

    fn find_user_by_email(
        &self,
        email: String,
    ) -> BoxFuture<'static, StorageResult<Option<UserEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .users()
                .await
                .find_one(doc! {"email": email})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: USER_COLLECTION,
                    source,
                })?;

            document
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(USER_COLLECTION, message))
                })
                .transpose()
        })
    }

    fn insert_otp(&self, otp: OtpEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = otp.id;
            let document: MongoOtpDocument = otp.into();
            store
                .otps()
                .await
                .insert_one(&document)
                .await
                .map_err(|err| insert_error(OTP_COLLECTION, format!("otp {id}"), err))?;
            Ok(())
        })
    }

    fn consume_otp(
        &self,
        email: String,
        code: String,
        now: SystemTime,
    ) -> BoxFuture<'static, StorageResult<Option<OtpEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let filter = doc! {
                "email": email,
                "code": code,
                "is_used": false,
                "expires_at": { "$gt": DateTime::from_system_time(now) },
            };

            let document = store
                .otps()
                .await
                .find_one_and_update(filter, doc! {"$set": {"is_used": true}})
                .return_document(ReturnDocument::After)
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: OTP_COLLECTION,
                    source,
                })?;

            document
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(OTP_COLLECTION, message))
                })
                .transpose()
        })
    }

    fn insert_quiz(&self, quiz: QuizEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = quiz.id;
            let document: MongoQuizDocument = quiz.into();
            store
                .quizzes()
                .await
                .insert_one(&document)
                .await
                .map_err(|err| insert_error(QUIZ_COLLECTION, format!("quiz {id}"), err))?;
            Ok(())
        })
    }

    fn find_quiz(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_quiz_inner(id).await })
    }

    fn list_quizzes(&self) -> BoxFuture<'static, StorageResult<Vec<QuizEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoQuizDocument> = store
                .quizzes()
                .await
                .find(doc! {})
                .sort(doc! {"created_at": -1})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: QUIZ_COLLECTION,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: QUIZ_COLLECTION,
                    source,
                })?;

            documents
                .into_iter()
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(QUIZ_COLLECTION, message))
                })
                .collect()
        })
    }

    fn update_quiz_status(
        &self,
        id: Uuid,
        expected: QuizStatus,
        next: QuizStatus,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut quiz) = store.find_quiz_inner(id).await? else {
                return Ok(false);
            };
            if quiz.status != expected {
                return Ok(false);
            }

            quiz.status = next;
            match next {
                QuizStatus::Active => quiz.started_at = Some(at),
                QuizStatus::Completed => quiz.completed_at = Some(at),
                QuizStatus::Draft => {}
            }

            // The status precondition in the filter makes the swap atomic;
            // a concurrent transition leaves matched_count at zero.
            let document: MongoQuizDocument = quiz.into();
            let result = store
                .quizzes()
                .await
                .replace_one(
                    doc! {"_id": id.to_string(), "status": expected.as_str()},
                    &document,
                )
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: QUIZ_COLLECTION,
                    source,
                })?;

            Ok(result.matched_count > 0)
        })
    }

    fn insert_question(&self, question: QuestionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let id = question.id;
            let document: MongoQuestionDocument = question.into();
            store
                .questions()
                .await
                .insert_one(&document)
                .await
                .map_err(|err| insert_error(QUESTION_COLLECTION, format!("question {id}"), err))?;
            Ok(())
        })
    }

    fn find_question(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_question_inner(id).await })
    }

    fn list_questions(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<QuestionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoQuestionDocument> = store
                .questions()
                .await
                .find(doc! {"quiz_id": quiz_id.to_string()})
                .sort(doc! {"question_number": 1})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: QUESTION_COLLECTION,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: QUESTION_COLLECTION,
                    source,
                })?;

            documents
                .into_iter()
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(QUESTION_COLLECTION, message))
                })
                .collect()
        })
    }

    fn mark_question_revealed(
        &self,
        id: Uuid,
        at: SystemTime,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut question) = store.find_question_inner(id).await? else {
                return Ok(false);
            };
            if question.is_revealed {
                return Ok(false);
            }

            question.is_revealed = true;
            question.revealed_at = Some(at);

            let document: MongoQuestionDocument = question.into();
            let result = store
                .questions()
                .await
                .replace_one(
                    doc! {"_id": id.to_string(), "is_revealed": false},
                    &document,
                )
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: QUESTION_COLLECTION,
                    source,
                })?;

            Ok(result.matched_count > 0)
        })
    }

    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = format!(
                "session for user {} in quiz {}",
                session.user_id, session.quiz_id
            );
            let document: MongoSessionDocument = session.into();
            store
                .sessions()
                .await
                .insert_one(&document)
                .await
                .map_err(|err| insert_error(SESSION_COLLECTION, key, err))?;
            Ok(())
        })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .sessions()
                .await
                .find_one(doc! {"_id": id.to_string()})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: SESSION_COLLECTION,
                    source,
                })?;

            document
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(SESSION_COLLECTION, message))
                })
                .transpose()
        })
    }

    fn find_session_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .sessions()
                .await
                .find_one(doc! {
                    "user_id": user_id.to_string(),
                    "quiz_id": quiz_id.to_string(),
                })
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: SESSION_COLLECTION,
                    source,
                })?;

            document
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(SESSION_COLLECTION, message))
                })
                .transpose()
        })
    }

    fn list_sessions_for_quiz(
        &self,
        quiz_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoSessionDocument> = store
                .sessions()
                .await
                .find(doc! {"quiz_id": quiz_id.to_string()})
                .sort(doc! {"joined_at": 1})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: SESSION_COLLECTION,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: SESSION_COLLECTION,
                    source,
                })?;

            documents
                .into_iter()
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(SESSION_COLLECTION, message))
                })
                .collect()
        })
    }

    fn update_session_score(
        &self,
        id: Uuid,
        total_score: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let result = store
                .sessions()
                .await
                .update_one(
                    doc! {"_id": id.to_string()},
                    doc! {"$set": {"total_score": total_score as i64}},
                )
                .await
                .map_err(|source| MongoDaoError::Write {
                    collection: SESSION_COLLECTION,
                    source,
                })?;

            if result.matched_count == 0 {
                return Err(StorageError::unavailable_msg(format!(
                    "session {id} vanished during score update"
                )));
            }
            Ok(())
        })
    }

    fn insert_answer(&self, answer: AnswerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let key = format!(
                "answer of session {} to question {}",
                answer.session_id, answer.question_id
            );
            let document: MongoAnswerDocument = answer.into();
            store
                .answers()
                .await
                .insert_one(&document)
                .await
                .map_err(|err| insert_error(ANSWER_COLLECTION, key, err))?;
            Ok(())
        })
    }

    fn find_answer(
        &self,
        session_id: Uuid,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .answers()
                .await
                .find_one(doc! {
                    "session_id": session_id.to_string(),
                    "question_id": question_id.to_string(),
                })
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: ANSWER_COLLECTION,
                    source,
                })?;

            document
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(ANSWER_COLLECTION, message))
                })
                .transpose()
        })
    }

    fn list_answers_for_session(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<AnswerEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let documents: Vec<MongoAnswerDocument> = store
                .answers()
                .await
                .find(doc! {"session_id": session_id.to_string()})
                .sort(doc! {"submitted_at": 1})
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: ANSWER_COLLECTION,
                    source,
                })?
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Query {
                    collection: ANSWER_COLLECTION,
                    source,
                })?;

            documents
                .into_iter()
                .map(|doc| {
                    doc.try_into()
                        .map_err(|message| decode_error(ANSWER_COLLECTION, message))
                })
                .collect()
        })
    }

    fn count_correct_answers(
        &self,
        question_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .answers()
                .await
                .count_documents(doc! {
                    "question_id": question_id.to_string(),
                    "is_correct": true,
                })
                .await
                .map_err(|source| {
                    MongoDaoError::Query {
                        collection: ANSWER_COLLECTION,
                        source,
                    }
                    .into()
                })
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}
