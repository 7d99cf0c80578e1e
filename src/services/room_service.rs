//! Room provisioning and read-only room views backing the REST surface.

use tracing::info;

use crate::{
    dto::room::{CreateRoomRequest, CreateRoomResponse, RoomDetail, RoomSummary, StatsResponse},
    error::ServiceError,
    state::SharedState,
};

/// Provision a room ahead of the creator's WebSocket join.
///
/// The creating player's name is only informational here: host status is
/// assigned when the first connection joins over the WebSocket.
pub async fn create_room(
    state: &SharedState,
    request: CreateRoomRequest,
) -> Result<CreateRoomResponse, ServiceError> {
    let player_name = request.player_name.trim().to_string();
    if player_name.is_empty() {
        return Err(ServiceError::InvalidInput("player name is required".into()));
    }

    let code = state
        .registry()
        .create(request.room_code.as_deref())
        .await?;

    info!(
        code = %code,
        player = %player_name,
        custom_code = request.room_code.is_some(),
        "room created"
    );

    Ok(CreateRoomResponse {
        room_code: code,
        player_name,
    })
}

/// Summaries of all live rooms.
pub async fn list_rooms(state: &SharedState) -> Vec<RoomSummary> {
    let rooms = state.registry().rooms().read().await;
    rooms.values().map(RoomSummary::from).collect()
}

/// Full detail for one room, or `NotFound`.
pub async fn room_detail(state: &SharedState, code: &str) -> Result<RoomDetail, ServiceError> {
    let code = code.to_uppercase();
    let rooms = state.registry().rooms().read().await;
    rooms
        .get(&code)
        .map(RoomDetail::from)
        .ok_or_else(|| ServiceError::NotFound(format!("room `{code}` not found")))
}

/// Process-wide counters: rooms, connected players, running games.
pub async fn stats(state: &SharedState) -> StatsResponse {
    let rooms = state.registry().rooms().read().await;
    StatsResponse {
        total_rooms: rooms.len(),
        total_players: state.sessions().len(),
        active_games: rooms.values().filter(|room| room.is_started()).count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, state::AppState};

    fn state() -> SharedState {
        AppState::new(AppConfig::default())
    }

    fn request(name: &str, code: Option<&str>) -> CreateRoomRequest {
        CreateRoomRequest {
            player_name: name.into(),
            room_code: code.map(Into::into),
        }
    }

    #[tokio::test]
    async fn create_trims_name_and_returns_code() {
        let state = state();
        let response = create_room(&state, request("  Alice  ", None)).await.unwrap();
        assert_eq!(response.player_name, "Alice");
        assert_eq!(response.room_code.len(), 6);
    }

    #[tokio::test]
    async fn blank_name_is_rejected_without_creating_a_room() {
        let state = state();
        let err = create_room(&state, request("   ", None)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(list_rooms(&state).await.is_empty());
    }

    #[tokio::test]
    async fn occupied_custom_code_conflicts() {
        let state = state();
        create_room(&state, request("Alice", Some("MATCH1"))).await.unwrap();
        let err = create_room(&state, request("Bob", Some("match1")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::RoomAlreadyExists(_)));
    }

    #[tokio::test]
    async fn detail_of_unknown_room_is_not_found() {
        let state = state();
        let err = room_detail(&state, "NOPE42").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn stats_count_rooms_and_games() {
        let state = state();
        create_room(&state, request("Alice", Some("ROOM01"))).await.unwrap();
        create_room(&state, request("Bob", Some("ROOM02"))).await.unwrap();

        {
            let mut rooms = state.registry().rooms().write().await;
            rooms.get_mut("ROOM01").unwrap().start_game().unwrap();
        }

        let stats = stats(&state).await;
        assert_eq!(stats.total_rooms, 2);
        assert_eq!(stats.active_games, 1);
        assert_eq!(stats.total_players, 0);
    }
}
