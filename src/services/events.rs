//! Construction and fan-out of realtime quiz events.

use uuid::Uuid;

use crate::{
    dao::models::QuestionEntity,
    dto::{events::ServerEvent, quiz::QuestionView},
    state::SharedState,
};

/// Broadcast that a quiz moved to the active status.
pub fn broadcast_quiz_started(state: &SharedState, quiz_id: Uuid) {
    state
        .rooms()
        .broadcast(quiz_id, &ServerEvent::QuizStarted { quiz_id });
}

/// Broadcast that a quiz moved to the completed status.
pub fn broadcast_quiz_ended(state: &SharedState, quiz_id: Uuid) {
    state
        .rooms()
        .broadcast(quiz_id, &ServerEvent::QuizEnded { quiz_id });
}

/// Broadcast a question reveal; only admin connections see the correct answer.
pub fn broadcast_question_revealed(state: &SharedState, question: &QuestionEntity) {
    let admin_event = ServerEvent::QuestionRevealed {
        question: QuestionView::from_entity(question.clone(), true),
    };
    let public_event = ServerEvent::QuestionRevealed {
        question: QuestionView::from_entity(question.clone(), false),
    };
    state
        .rooms()
        .broadcast_split(question.quiz_id, &admin_event, &public_event);
}

/// Broadcast that the admin closed the answering phase of a question.
pub fn broadcast_question_ended(state: &SharedState, quiz_id: Uuid, question_id: Uuid) {
    state
        .rooms()
        .broadcast(quiz_id, &ServerEvent::QuestionEnded { question_id });
}

/// Broadcast that the admin passed over a question without revealing it.
pub fn broadcast_question_skipped(state: &SharedState, quiz_id: Uuid, question_id: Uuid) {
    state
        .rooms()
        .broadcast(quiz_id, &ServerEvent::QuestionSkipped { question_id });
}

/// Broadcast an accepted answer submission.
pub fn broadcast_answer_submitted(
    state: &SharedState,
    quiz_id: Uuid,
    user_id: Uuid,
    question_id: Uuid,
    is_correct: bool,
    points: u32,
) {
    state.rooms().broadcast(
        quiz_id,
        &ServerEvent::AnswerSubmitted {
            user_id,
            question_id,
            is_correct,
            points,
        },
    );
}
