//! Wire documents for the MongoDB collections.
//!
//! Entity ids are stored as hyphenated strings so that `doc!` filters can be
//! built with `Uuid::to_string` without worrying about binary subtypes;
//! timestamps are stored as native BSON datetimes.

use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    AnswerEntity, OptionKey, OtpEntity, QuestionEntity, QuizEntity, QuizStatus, ScoringMode,
    SessionEntity, SpeedTierEntity, UserEntity,
};

pub(super) fn parse_id(value: &str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|err| format!("invalid uuid `{value}`: {err}"))
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MongoUserDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    is_admin: bool,
    created_at: DateTime,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            id: value.id.to_string(),
            email: value.email,
            is_admin: value.is_admin,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoUserDocument> for UserEntity {
    type Error = String;

    fn try_from(value: MongoUserDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            email: value.email,
            is_admin: value.is_admin,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MongoOtpDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    code: String,
    expires_at: DateTime,
    is_used: bool,
    created_at: DateTime,
}

impl From<OtpEntity> for MongoOtpDocument {
    fn from(value: OtpEntity) -> Self {
        Self {
            id: value.id.to_string(),
            email: value.email,
            code: value.code,
            expires_at: DateTime::from_system_time(value.expires_at),
            is_used: value.is_used,
            created_at: DateTime::from_system_time(value.created_at),
        }
    }
}

impl TryFrom<MongoOtpDocument> for OtpEntity {
    type Error = String;

    fn try_from(value: MongoOtpDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            email: value.email,
            code: value.code,
            expires_at: value.expires_at.to_system_time(),
            is_used: value.is_used,
            created_at: value.created_at.to_system_time(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MongoQuizDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    passkey: String,
    status: QuizStatus,
    default_time_limit_secs: u32,
    scoring_mode: ScoringMode,
    #[serde(default)]
    speed_table: Option<Vec<SpeedTierEntity>>,
    created_by: String,
    created_at: DateTime,
    #[serde(default)]
    started_at: Option<DateTime>,
    #[serde(default)]
    completed_at: Option<DateTime>,
}

impl From<QuizEntity> for MongoQuizDocument {
    fn from(value: QuizEntity) -> Self {
        Self {
            id: value.id.to_string(),
            title: value.title,
            passkey: value.passkey,
            status: value.status,
            default_time_limit_secs: value.default_time_limit_secs,
            scoring_mode: value.scoring_mode,
            speed_table: value.speed_table,
            created_by: value.created_by.to_string(),
            created_at: DateTime::from_system_time(value.created_at),
            started_at: value.started_at.map(DateTime::from_system_time),
            completed_at: value.completed_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoQuizDocument> for QuizEntity {
    type Error = String;

    fn try_from(value: MongoQuizDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            title: value.title,
            passkey: value.passkey,
            status: value.status,
            default_time_limit_secs: value.default_time_limit_secs,
            scoring_mode: value.scoring_mode,
            speed_table: value.speed_table,
            created_by: parse_id(&value.created_by)?,
            created_at: value.created_at.to_system_time(),
            started_at: value.started_at.map(DateTime::to_system_time),
            completed_at: value.completed_at.map(DateTime::to_system_time),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MongoQuestionDocument {
    #[serde(rename = "_id")]
    id: String,
    quiz_id: String,
    question_number: u32,
    text: String,
    options: [String; OptionKey::COUNT],
    correct_option: OptionKey,
    is_bonus: bool,
    time_limit_secs: u32,
    points: u32,
    is_revealed: bool,
    #[serde(default)]
    revealed_at: Option<DateTime>,
}

impl From<QuestionEntity> for MongoQuestionDocument {
    fn from(value: QuestionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            quiz_id: value.quiz_id.to_string(),
            question_number: value.question_number,
            text: value.text,
            options: value.options,
            correct_option: value.correct_option,
            is_bonus: value.is_bonus,
            time_limit_secs: value.time_limit_secs,
            points: value.points,
            is_revealed: value.is_revealed,
            revealed_at: value.revealed_at.map(DateTime::from_system_time),
        }
    }
}

impl TryFrom<MongoQuestionDocument> for QuestionEntity {
    type Error = String;

    fn try_from(value: MongoQuestionDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            quiz_id: parse_id(&value.quiz_id)?,
            question_number: value.question_number,
            text: value.text,
            options: value.options,
            correct_option: value.correct_option,
            is_bonus: value.is_bonus,
            time_limit_secs: value.time_limit_secs,
            points: value.points,
            is_revealed: value.is_revealed,
            revealed_at: value.revealed_at.map(DateTime::to_system_time),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: String,
    quiz_id: String,
    user_id: String,
    joined_at: DateTime,
    total_score: u32,
    is_active: bool,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id.to_string(),
            quiz_id: value.quiz_id.to_string(),
            user_id: value.user_id.to_string(),
            joined_at: DateTime::from_system_time(value.joined_at),
            total_score: value.total_score,
            is_active: value.is_active,
        }
    }
}

impl TryFrom<MongoSessionDocument> for SessionEntity {
    type Error = String;

    fn try_from(value: MongoSessionDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            quiz_id: parse_id(&value.quiz_id)?,
            user_id: parse_id(&value.user_id)?,
            joined_at: value.joined_at.to_system_time(),
            total_score: value.total_score,
            is_active: value.is_active,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct MongoAnswerDocument {
    #[serde(rename = "_id")]
    id: String,
    session_id: String,
    question_id: String,
    #[serde(default)]
    selected_option: Option<OptionKey>,
    is_correct: bool,
    points: u32,
    #[serde(default)]
    arrival_position: Option<u32>,
    time_to_answer_secs: u32,
    submitted_at: DateTime,
}

impl From<AnswerEntity> for MongoAnswerDocument {
    fn from(value: AnswerEntity) -> Self {
        Self {
            id: value.id.to_string(),
            session_id: value.session_id.to_string(),
            question_id: value.question_id.to_string(),
            selected_option: value.selected_option,
            is_correct: value.is_correct,
            points: value.points,
            arrival_position: value.arrival_position,
            time_to_answer_secs: value.time_to_answer_secs,
            submitted_at: DateTime::from_system_time(value.submitted_at),
        }
    }
}

impl TryFrom<MongoAnswerDocument> for AnswerEntity {
    type Error = String;

    fn try_from(value: MongoAnswerDocument) -> Result<Self, Self::Error> {
        Ok(Self {
            id: parse_id(&value.id)?,
            session_id: parse_id(&value.session_id)?,
            question_id: parse_id(&value.question_id)?,
            selected_option: value.selected_option,
            is_correct: value.is_correct,
            points: value.points,
            arrival_position: value.arrival_position,
            time_to_answer_secs: value.time_to_answer_secs,
            submitted_at: value.submitted_at.to_system_time(),
        })
    }
}
