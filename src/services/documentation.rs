use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quiz Live Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::auth::send_otp,
        crate::routes::auth::verify_otp,
        crate::routes::auth::me,
        crate::routes::quiz::create_quiz,
        crate::routes::quiz::list_quizzes,
        crate::routes::quiz::get_quiz,
        crate::routes::quiz::join_quiz,
        crate::routes::quiz::leaderboard,
        crate::routes::quiz::user_session,
        crate::routes::admin::start_quiz,
        crate::routes::admin::end_quiz,
        crate::routes::admin::reveal_question,
        crate::routes::admin::end_question,
        crate::routes::admin::skip_question,
        crate::routes::admin::next_question,
        crate::routes::admin::list_sessions,
        crate::routes::answer::submit_answer,
        crate::routes::websocket::ws_handler,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::auth::SendOtpRequest,
            crate::dto::auth::OtpIssuedResponse,
            crate::dto::auth::VerifyOtpRequest,
            crate::dto::auth::UserProfile,
            crate::dto::auth::AuthResponse,
            crate::dto::quiz::CreateQuizRequest,
            crate::dto::quiz::QuestionInput,
            crate::dto::quiz::QuizSummary,
            crate::dto::quiz::QuizDetail,
            crate::dto::quiz::QuestionView,
            crate::dto::quiz::JoinQuizRequest,
            crate::dto::quiz::SessionSummary,
            crate::dto::quiz::AnswerView,
            crate::dto::quiz::SessionWithAnswers,
            crate::dto::quiz::ActionResponse,
            crate::dto::quiz::NextQuestionResponse,
            crate::dto::answer::SubmitAnswerRequest,
            crate::dto::answer::SubmitAnswerResponse,
            crate::dto::leaderboard::LeaderboardEntry,
            crate::dto::events::ServerEvent,
            crate::dao::models::ScoringMode,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Email one-time-code authentication"),
        (name = "quiz", description = "Quiz discovery, joining, and standings"),
        (name = "admin", description = "Live quiz lifecycle controls"),
        (name = "answer", description = "Answer submission"),
        (name = "ws", description = "WebSocket quiz room stream"),
    )
)]
pub struct ApiDoc;
