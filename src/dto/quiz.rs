//! Payloads for quiz management, joining and session inspection.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{AnswerEntity, QuestionEntity, QuizEntity, ScoringMode, SessionEntity},
    dto::{
        auth::UserProfile,
        format_system_time,
        validation::{validate_correct_answer, validate_options},
    },
};

/// Payload used to create a quiz together with its full question list.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CreateQuizRequest {
    #[validate(length(min = 1))]
    pub title: String,
    /// Shared secret participants must present to join.
    #[validate(length(min = 1))]
    pub passkey: String,
    /// Per-question time limit applied when a question does not set its own.
    #[serde(default)]
    pub default_time_limit_secs: Option<u32>,
    #[serde(default)]
    pub scoring_mode: Option<ScoringMode>,
    /// Points by arrival position for `speed` mode; omit for the default table.
    #[serde(default)]
    pub speed_table: Option<Vec<u32>>,
    #[validate(length(min = 1), nested)]
    pub questions: Vec<QuestionInput>,
}

/// Incoming question definition; questions are numbered in input order.
// Serialize is needed by the validator derive on the parent request, which
// embeds offending values in its error parameters.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QuestionInput {
    pub text: String,
    /// Exactly four answer options, in display order A-D.
    pub options: Vec<String>,
    /// Either a bare letter (`"A"`) or the labeled form (`"Option A"`).
    pub correct_answer: String,
    #[serde(default)]
    pub is_bonus: bool,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
    #[serde(default)]
    pub points: Option<u32>,
}

impl Validate for QuestionInput {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if self.text.trim().is_empty() {
            let mut err = validator::ValidationError::new("text_empty");
            err.message = Some("question text must not be blank".into());
            errors.add("text", err);
        }

        if let Err(err) = validate_options(&self.options) {
            errors.add("options", err);
        }

        if let Err(err) = validate_correct_answer(&self.correct_answer) {
            errors.add("correct_answer", err);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Compact quiz projection used in listings.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizSummary {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub scoring_mode: ScoringMode,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<QuizEntity> for QuizSummary {
    fn from(quiz: QuizEntity) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            status: quiz.status.as_str().to_owned(),
            scoring_mode: quiz.scoring_mode,
            created_at: format_system_time(quiz.created_at),
            started_at: quiz.started_at.map(format_system_time),
            completed_at: quiz.completed_at.map(format_system_time),
        }
    }
}

/// Full quiz projection including its questions.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuizDetail {
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub scoring_mode: ScoringMode,
    pub default_time_limit_secs: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_table: Option<Vec<u32>>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Number of participants that joined the quiz.
    pub participant_count: usize,
    pub questions: Vec<QuestionView>,
}

impl QuizDetail {
    /// Build the projection; `include_answers` controls whether the correct
    /// answer of each question is exposed.
    pub fn from_entities(
        quiz: QuizEntity,
        questions: Vec<QuestionEntity>,
        participant_count: usize,
        include_answers: bool,
    ) -> Self {
        Self {
            id: quiz.id,
            title: quiz.title,
            status: quiz.status.as_str().to_owned(),
            scoring_mode: quiz.scoring_mode,
            default_time_limit_secs: quiz.default_time_limit_secs,
            speed_table: quiz
                .speed_table
                .map(|tiers| tiers.into_iter().map(|tier| tier.points).collect()),
            created_at: format_system_time(quiz.created_at),
            started_at: quiz.started_at.map(format_system_time),
            completed_at: quiz.completed_at.map(format_system_time),
            participant_count,
            questions: questions
                .into_iter()
                .map(|question| QuestionView::from_entity(question, include_answers))
                .collect(),
        }
    }
}

/// Question projection; the correct answer is present only for admins.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct QuestionView {
    pub id: Uuid,
    pub question_number: u32,
    pub text: String,
    pub options: Vec<String>,
    pub is_bonus: bool,
    pub time_limit_secs: u32,
    pub points: u32,
    pub is_revealed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revealed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
}

impl QuestionView {
    /// Build the projection, redacting the correct answer unless asked not to.
    pub fn from_entity(question: QuestionEntity, include_answer: bool) -> Self {
        Self {
            id: question.id,
            question_number: question.question_number,
            text: question.text,
            options: question.options.to_vec(),
            is_bonus: question.is_bonus,
            time_limit_secs: question.time_limit_secs,
            points: question.points,
            is_revealed: question.is_revealed,
            revealed_at: question.revealed_at.map(format_system_time),
            correct_answer: include_answer
                .then(|| question.correct_option.as_str().to_owned()),
        }
    }
}

/// Passkey presented when joining a quiz.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct JoinQuizRequest {
    #[validate(length(min = 1))]
    pub passkey: String,
}

/// Public projection of a participant session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: String,
    pub total_score: u32,
    pub is_active: bool,
}

impl From<SessionEntity> for SessionSummary {
    fn from(session: SessionEntity) -> Self {
        Self {
            id: session.id,
            quiz_id: session.quiz_id,
            user_id: session.user_id,
            joined_at: format_system_time(session.joined_at),
            total_score: session.total_score,
            is_active: session.is_active,
        }
    }
}

/// Recorded answer projection.
#[derive(Debug, Serialize, ToSchema)]
pub struct AnswerView {
    pub id: Uuid,
    pub question_id: Uuid,
    /// Canonical option letter, absent for skipped answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_option: Option<String>,
    pub is_correct: bool,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrival_position: Option<u32>,
    pub time_to_answer_secs: u32,
    pub submitted_at: String,
}

impl From<AnswerEntity> for AnswerView {
    fn from(answer: AnswerEntity) -> Self {
        Self {
            id: answer.id,
            question_id: answer.question_id,
            selected_option: answer
                .selected_option
                .map(|option| option.as_str().to_owned()),
            is_correct: answer.is_correct,
            points: answer.points,
            arrival_position: answer.arrival_position,
            time_to_answer_secs: answer.time_to_answer_secs,
            submitted_at: format_system_time(answer.submitted_at),
        }
    }
}

/// Admin view of one session with its user and recorded answers.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionWithAnswers {
    #[serde(flatten)]
    pub session: SessionSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
    pub answers: Vec<AnswerView>,
}

/// Simple acknowledgement payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

/// Next reveal candidate; `question` is null when the quiz is exhausted.
#[derive(Debug, Serialize, ToSchema)]
pub struct NextQuestionResponse {
    pub question: Option<QuestionView>,
}
