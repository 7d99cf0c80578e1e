use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use axum_valid::Valid;

use crate::{
    dto::room::{CreateRoomRequest, CreateRoomResponse, RoomDetail, RoomSummary, StatsResponse},
    error::AppError,
    services::room_service,
    state::SharedState,
};

/// Routes handling room provisioning and lookup.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/rooms", get(list_rooms).post(create_room))
        .route("/rooms/{code}", get(room_detail))
        .route("/stats", get(stats))
}

/// Provision a new room ahead of the creator's WebSocket join.
#[utoipa::path(
    post,
    path = "/rooms",
    tag = "rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, description = "Room created", body = CreateRoomResponse),
        (status = 400, description = "Missing or blank player name"),
        (status = 409, description = "Requested room code already taken")
    )
)]
pub async fn create_room(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateRoomRequest>>,
) -> Result<(StatusCode, Json<CreateRoomResponse>), AppError> {
    let response = room_service::create_room(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// List all live rooms.
#[utoipa::path(
    get,
    path = "/rooms",
    tag = "rooms",
    responses((status = 200, description = "Live rooms", body = [RoomSummary]))
)]
pub async fn list_rooms(State(state): State<SharedState>) -> Json<Vec<RoomSummary>> {
    Json(room_service::list_rooms(&state).await)
}

/// Full detail for one room.
#[utoipa::path(
    get,
    path = "/rooms/{code}",
    tag = "rooms",
    params(("code" = String, Path, description = "Room code to look up")),
    responses(
        (status = 200, description = "Room detail", body = RoomDetail),
        (status = 404, description = "Room not found")
    )
)]
pub async fn room_detail(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<RoomDetail>, AppError> {
    Ok(Json(room_service::room_detail(&state, &code).await?))
}

/// Process-wide room and player counters.
#[utoipa::path(
    get,
    path = "/stats",
    tag = "rooms",
    responses((status = 200, description = "Server counters", body = StatsResponse))
)]
pub async fn stats(State(state): State<SharedState>) -> Json<StatsResponse> {
    Json(room_service::stats(&state).await)
}
