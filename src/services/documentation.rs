use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Quick Quiz Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::room_stream,
        crate::routes::rooms::create_room,
        crate::routes::rooms::join_room,
        crate::routes::rooms::submit_answer,
        crate::routes::public::get_room_by_code,
        crate::routes::public::get_room_phase,
        crate::routes::public::get_players,
        crate::routes::host::start,
        crate::routes::host::reveal,
        crate::routes::host::next,
        crate::routes::host::pause,
        crate::routes::host::resume,
        crate::routes::host::reset,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::phase::VisibleRoomPhase,
            crate::dto::common::PlayerSummary,
            crate::dto::common::QuestionSnapshot,
            crate::dto::common::RoomPhaseSnapshot,
            crate::dto::public::PlayersResponse,
            crate::dto::rooms::CreateRoomRequest,
            crate::dto::rooms::QuizInput,
            crate::dto::rooms::QuestionInput,
            crate::dto::rooms::CreateRoomResponse,
            crate::dto::rooms::JoinRoomRequest,
            crate::dto::rooms::JoinRoomResponse,
            crate::dto::rooms::AnswerRequest,
            crate::dto::rooms::AnswerResponse,
            crate::dto::rooms::HostActionResponse,
            crate::dto::rooms::RoomSummary,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "rooms", description = "Room creation, joining, and answers"),
        (name = "host", description = "Host-only room controls"),
        (name = "public", description = "Read-only room state"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
