use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        format_system_time,
        validation::{validate_player_name, validate_room_code},
    },
    state::room::{Player, Room},
};

/// Payload used to provision a new room over REST.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRoomRequest {
    /// Name of the player creating the room (informational until they join).
    pub player_name: String,
    /// Optional custom code; a fresh one is generated when omitted.
    #[serde(default)]
    pub room_code: Option<String>,
}

impl Validate for CreateRoomRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_player_name(&self.player_name) {
            errors.add("player_name", e);
        }

        if let Some(ref code) = self.room_code {
            if let Err(e) = validate_room_code(code) {
                errors.add("room_code", e);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Response returned once a room has been provisioned.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateRoomResponse {
    /// Code to share with other players.
    pub room_code: String,
    /// Trimmed name of the creating player.
    pub player_name: String,
}

/// One-line room entry for the room listing.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSummary {
    pub room_code: String,
    pub player_count: usize,
    pub is_started: bool,
    pub created_at: String,
}

impl From<&Room> for RoomSummary {
    fn from(room: &Room) -> Self {
        Self {
            room_code: room.code().to_string(),
            player_count: room.player_count(),
            is_started: room.is_started(),
            created_at: format_system_time(room.created_at()),
        }
    }
}

/// Full room detail including the roster.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoomDetail {
    pub room_code: String,
    pub player_count: usize,
    pub is_started: bool,
    pub players: Vec<PlayerSummary>,
    pub created_at: String,
}

impl From<&Room> for RoomDetail {
    fn from(room: &Room) -> Self {
        Self {
            room_code: room.code().to_string(),
            player_count: room.player_count(),
            is_started: room.is_started(),
            players: PlayerSummary::roster(room),
            created_at: format_system_time(room.created_at()),
        }
    }
}

/// Public projection of a player shared with every room member.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Session id of the player's connection.
    pub id: Uuid,
    pub name: String,
    pub is_ready: bool,
    pub score: u32,
    pub lines: u32,
    pub level: u32,
    pub is_game_over: bool,
}

impl From<(Uuid, &Player)> for PlayerSummary {
    fn from((id, player): (Uuid, &Player)) -> Self {
        Self {
            id,
            name: player.name.clone(),
            is_ready: player.is_ready,
            score: player.snapshot.score,
            lines: player.snapshot.lines,
            level: player.snapshot.level,
            is_game_over: player.snapshot.game_over,
        }
    }
}

impl PlayerSummary {
    /// Roster in join order.
    pub fn roster(room: &Room) -> Vec<Self> {
        room.players()
            .iter()
            .map(|(id, player)| (*id, player).into())
            .collect()
    }

    /// Roster ranked by descending score, ties in join order.
    pub fn ranked(room: &Room) -> Vec<Self> {
        room.ranked().into_iter().map(Into::into).collect()
    }
}

/// Process-wide counters exposed at `/stats`.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatsResponse {
    pub total_rooms: usize,
    pub total_players: usize,
    pub active_games: usize,
}
