use std::{fmt, time::SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a quiz. Transitions are monotonic: draft, then active,
/// then completed; `completed` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QuizStatus {
    /// Quiz is being assembled and is invisible to participants.
    Draft,
    /// Quiz is running and can be joined.
    Active,
    /// Quiz has ended; terminal state.
    Completed,
}

impl QuizStatus {
    /// Stable string form matching the serialized representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            QuizStatus::Draft => "draft",
            QuizStatus::Active => "active",
            QuizStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How points are computed for correct answers in a quiz.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMode {
    /// Every correct answer earns the question's base points.
    Standard,
    /// Points depend on the arrival position among correct answers.
    Speed,
    /// Reserved mode; currently scored identically to `standard` because no
    /// penalty rule is defined.
    Negative,
}

/// Canonical identifier of one of the four answer options.
///
/// Entities and comparison logic use this key exclusively; conversions from
/// the wire formats (`"A"` or `"Option A"`) happen at the DTO boundary.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OptionKey {
    #[allow(missing_docs)]
    A,
    #[allow(missing_docs)]
    B,
    #[allow(missing_docs)]
    C,
    #[allow(missing_docs)]
    D,
}

impl OptionKey {
    /// Number of answer options per question.
    pub const COUNT: usize = 4;

    /// Parse an external answer label, accepting both the bare letter and the
    /// `Option X` form in any letter case.
    pub fn parse_label(label: &str) -> Option<Self> {
        // Lowercasing first keeps the prefix comparison free of byte
        // slicing, which would panic on multi-byte input.
        let lowered = label.trim().to_lowercase();
        let letter = match lowered.strip_prefix("option ") {
            Some(rest) => rest.trim(),
            None => lowered.as_str(),
        };

        match letter {
            "a" => Some(OptionKey::A),
            "b" => Some(OptionKey::B),
            "c" => Some(OptionKey::C),
            "d" => Some(OptionKey::D),
            _ => None,
        }
    }

    /// Zero-based index into a question's option list.
    pub fn index(&self) -> usize {
        match self {
            OptionKey::A => 0,
            OptionKey::B => 1,
            OptionKey::C => 2,
            OptionKey::D => 3,
        }
    }

    /// Canonical single-letter form.
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionKey::A => "A",
            OptionKey::B => "B",
            OptionKey::C => "C",
            OptionKey::D => "D",
        }
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account record for an authenticated user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserEntity {
    /// Primary key.
    pub id: Uuid,
    /// Login email, unique across users.
    pub email: String,
    /// Whether this user may run admin operations.
    pub is_admin: bool,
    /// Account creation timestamp.
    pub created_at: SystemTime,
}

/// One-time login code issued during the email exchange.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OtpEntity {
    /// Primary key.
    pub id: Uuid,
    /// Email the code was issued for.
    pub email: String,
    /// Six-digit code.
    pub code: String,
    /// Moment after which the code is rejected.
    pub expires_at: SystemTime,
    /// Whether the code has already been consumed.
    pub is_used: bool,
    /// Issuance timestamp.
    pub created_at: SystemTime,
}

/// Single tier of a position-based speed scoring table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SpeedTierEntity {
    /// Points awarded at this arrival position; the last tier is the
    /// catch-all for every later position.
    pub points: u32,
}

/// Quiz definition and lifecycle state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizEntity {
    /// Primary key.
    pub id: Uuid,
    /// Display title.
    pub title: String,
    /// Shared secret gating participant join. Immutable once created.
    pub passkey: String,
    /// Current lifecycle status.
    pub status: QuizStatus,
    /// Time limit applied to questions that do not override it.
    pub default_time_limit_secs: u32,
    /// Scoring mode for correct answers.
    pub scoring_mode: ScoringMode,
    /// Ordered points-by-position table used in `speed` mode; `None` selects
    /// the built-in default table.
    pub speed_table: Option<Vec<SpeedTierEntity>>,
    /// User who created the quiz.
    pub created_by: Uuid,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Stamped when the quiz transitions to active.
    pub started_at: Option<SystemTime>,
    /// Stamped when the quiz transitions to completed.
    pub completed_at: Option<SystemTime>,
}

/// One question of a quiz, with exactly four answer options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionEntity {
    /// Primary key.
    pub id: Uuid,
    /// Owning quiz.
    pub quiz_id: Uuid,
    /// 1-based position in the quiz; dense per quiz.
    pub question_number: u32,
    /// Question text shown to participants.
    pub text: String,
    /// The four answer options, indexed by [`OptionKey`].
    pub options: [String; OptionKey::COUNT],
    /// Which option is correct.
    pub correct_option: OptionKey,
    /// Bonus questions double the awarded points.
    pub is_bonus: bool,
    /// Answering window length in seconds, counted from reveal.
    pub time_limit_secs: u32,
    /// Base points in `standard` scoring mode.
    pub points: u32,
    /// Monotonic reveal flag; never reset once true.
    pub is_revealed: bool,
    /// Stamped when the question is revealed.
    pub revealed_at: Option<SystemTime>,
}

/// Binding of one user to one quiz, created on first join.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key.
    pub id: Uuid,
    /// Quiz this session belongs to.
    pub quiz_id: Uuid,
    /// Participant.
    pub user_id: Uuid,
    /// Join timestamp, used as the final leaderboard tie-break.
    pub joined_at: SystemTime,
    /// Running total, kept equal to the sum of this session's answer points.
    pub total_score: u32,
    /// Cleared when a participant is removed by an admin.
    pub is_active: bool,
}

/// Immutable record of one submission for one (session, question) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerEntity {
    /// Primary key.
    pub id: Uuid,
    /// Submitting session.
    pub session_id: Uuid,
    /// Targeted question.
    pub question_id: Uuid,
    /// Chosen option; `None` means the participant skipped or timed out.
    pub selected_option: Option<OptionKey>,
    /// Whether the selected option matched the correct one.
    pub is_correct: bool,
    /// Points awarded by the scoring policy.
    pub points: u32,
    /// 1-based rank among correct answers to this question; `None` for
    /// incorrect or skipped submissions.
    pub arrival_position: Option<u32>,
    /// Client-reported time to answer, in seconds.
    pub time_to_answer_secs: u32,
    /// Server-side arrival timestamp.
    pub submitted_at: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_letters() {
        assert_eq!(OptionKey::parse_label("A"), Some(OptionKey::A));
        assert_eq!(OptionKey::parse_label("d"), Some(OptionKey::D));
        assert_eq!(OptionKey::parse_label(" B "), Some(OptionKey::B));
    }

    #[test]
    fn parses_labeled_form() {
        assert_eq!(OptionKey::parse_label("Option C"), Some(OptionKey::C));
        assert_eq!(OptionKey::parse_label("option b"), Some(OptionKey::B));
        assert_eq!(OptionKey::parse_label("OPTION A"), Some(OptionKey::A));
    }

    #[test]
    fn both_encodings_normalize_to_the_same_key() {
        assert_eq!(
            OptionKey::parse_label("Option B"),
            OptionKey::parse_label("B")
        );
    }

    #[test]
    fn rejects_unknown_labels() {
        assert_eq!(OptionKey::parse_label("E"), None);
        assert_eq!(OptionKey::parse_label("Option E"), None);
        assert_eq!(OptionKey::parse_label("Choice A"), None);
        assert_eq!(OptionKey::parse_label(""), None);
        assert_eq!(OptionKey::parse_label("AB"), None);
    }

    #[test]
    fn rejects_multi_byte_labels_without_panicking() {
        assert_eq!(OptionKey::parse_label("Optioné"), None);
        assert_eq!(OptionKey::parse_label("Option é"), None);
        assert_eq!(OptionKey::parse_label("é"), None);
        assert_eq!(OptionKey::parse_label("réponse A"), None);
    }

    #[test]
    fn index_matches_option_order() {
        assert_eq!(OptionKey::A.index(), 0);
        assert_eq!(OptionKey::D.index(), 3);
    }
}
