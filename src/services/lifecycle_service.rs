//! Quiz and question lifecycle transitions, with their event broadcasts.

use std::time::SystemTime;

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::{QuestionEntity, QuizEntity},
    dto::quiz::{ActionResponse, NextQuestionResponse, QuestionView},
    error::ServiceError,
    services::events,
    state::{SharedState, lifecycle},
};

/// Transition a quiz from draft to active and announce it to the room.
pub async fn start_quiz(
    state: &SharedState,
    quiz_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let quiz = require_quiz(state, quiz_id).await?;
    let next = lifecycle::start(quiz.status)?;

    let updated = store
        .update_quiz_status(quiz_id, quiz.status, next, SystemTime::now())
        .await?;
    if !updated {
        // Lost a race; report the transition error for the current status.
        let current = require_quiz(state, quiz_id).await?;
        return Err(match lifecycle::start(current.status) {
            Err(err) => err.into(),
            Ok(_) => ServiceError::Conflict("quiz status changed concurrently".into()),
        });
    }

    info!(quiz_id = %quiz_id, "quiz started");
    events::broadcast_quiz_started(state, quiz_id);
    Ok(ActionResponse {
        message: "quiz started".into(),
    })
}

/// Transition a quiz from active to completed and announce it to the room.
pub async fn end_quiz(state: &SharedState, quiz_id: Uuid) -> Result<ActionResponse, ServiceError> {
    let store = state.require_store().await?;
    let quiz = require_quiz(state, quiz_id).await?;
    let next = lifecycle::end(quiz.status)?;

    let updated = store
        .update_quiz_status(quiz_id, quiz.status, next, SystemTime::now())
        .await?;
    if !updated {
        let current = require_quiz(state, quiz_id).await?;
        return Err(match lifecycle::end(current.status) {
            Err(err) => err.into(),
            Ok(_) => ServiceError::Conflict("quiz status changed concurrently".into()),
        });
    }

    info!(quiz_id = %quiz_id, "quiz ended");
    events::broadcast_quiz_ended(state, quiz_id);
    Ok(ActionResponse {
        message: "quiz ended".into(),
    })
}

/// Open a question for answers. The broadcast redacts the correct answer for
/// non-admin connections; the returned view is the admin one.
pub async fn reveal_question(
    state: &SharedState,
    quiz_id: Uuid,
    question_id: Uuid,
) -> Result<QuestionView, ServiceError> {
    let store = state.require_store().await?;
    let quiz = require_quiz(state, quiz_id).await?;
    let question = require_question(state, &quiz, question_id).await?;
    lifecycle::ensure_reveal_allowed(&quiz, &question)?;

    let revealed_at = SystemTime::now();
    let updated = store
        .mark_question_revealed(question_id, revealed_at)
        .await?;
    if !updated {
        // A concurrent reveal won; the flag is monotonic, so that is the only
        // way the compare-and-set can fail here.
        return Err(lifecycle::LifecycleError::AlreadyRevealed {
            question_number: question.question_number,
        }
        .into());
    }

    let question = QuestionEntity {
        is_revealed: true,
        revealed_at: Some(revealed_at),
        ..question
    };

    info!(quiz_id = %quiz_id, question_number = question.question_number, "question revealed");
    events::broadcast_question_revealed(state, &question);
    Ok(QuestionView::from_entity(question, true))
}

/// Announce that the answering phase of a revealed question is over.
pub async fn end_question(
    state: &SharedState,
    quiz_id: Uuid,
    question_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let quiz = require_quiz(state, quiz_id).await?;
    let question = require_question(state, &quiz, question_id).await?;

    if !question.is_revealed {
        return Err(lifecycle::LifecycleError::QuestionNotOpen {
            question_number: question.question_number,
        }
        .into());
    }

    events::broadcast_question_ended(state, quiz_id, question_id);
    Ok(ActionResponse {
        message: "question ended".into(),
    })
}

/// Announce that a question is being passed over without a reveal. The
/// question itself is untouched; which question to reveal next stays an
/// explicit admin choice.
pub async fn skip_question(
    state: &SharedState,
    quiz_id: Uuid,
    question_id: Uuid,
) -> Result<ActionResponse, ServiceError> {
    let quiz = require_quiz(state, quiz_id).await?;
    let question = require_question(state, &quiz, question_id).await?;

    if question.is_revealed {
        return Err(lifecycle::LifecycleError::AlreadyRevealed {
            question_number: question.question_number,
        }
        .into());
    }

    info!(quiz_id = %quiz_id, question_number = question.question_number, "question skipped");
    events::broadcast_question_skipped(state, quiz_id, question_id);
    Ok(ActionResponse {
        message: "question skipped".into(),
    })
}

/// The next unrevealed question matching the bonus flag, if any.
pub async fn next_question(
    state: &SharedState,
    quiz_id: Uuid,
    bonus: bool,
) -> Result<NextQuestionResponse, ServiceError> {
    let store = state.require_store().await?;
    require_quiz(state, quiz_id).await?;

    let questions = store.list_questions(quiz_id).await?;
    let question = lifecycle::next_unrevealed(&questions, bonus)
        .cloned()
        .map(|question| QuestionView::from_entity(question, true));

    Ok(NextQuestionResponse { question })
}

async fn require_quiz(state: &SharedState, quiz_id: Uuid) -> Result<QuizEntity, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_quiz(quiz_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("quiz {quiz_id} not found")))
}

async fn require_question(
    state: &SharedState,
    quiz: &QuizEntity,
    question_id: Uuid,
) -> Result<QuestionEntity, ServiceError> {
    let store = state.require_store().await?;
    let question = store
        .find_question(question_id)
        .await?
        .filter(|question| question.quiz_id == quiz.id)
        .ok_or_else(|| {
            ServiceError::NotFound(format!("question {question_id} not found in this quiz"))
        })?;
    Ok(question)
}
