use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{dto::room::PlayerSummary, state::room::GameSnapshot};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Commands accepted from game clients over the WebSocket.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this connection to a room under a display name.
    Join {
        /// Code of the room to join, matched case-insensitively.
        room_code: String,
        /// Display name, unique within the room.
        player_name: String,
    },
    /// Start (or restart) the room's game.
    Start,
    /// Report the sender's current game state.
    StateUpdate {
        /// Full snapshot; the grid is relayed to peers untouched.
        #[serde(flatten)]
        snapshot: GameSnapshot,
    },
    /// Flip the sender's lobby ready flag.
    ToggleReady,
    /// Ask for a sender-only summary of the joined room.
    RoomInfo,
    /// Leave the current room without closing the connection.
    Leave,
    /// Any unrecognized command; answered with an error event.
    #[serde(other)]
    Unknown,
}

/// Why a game ended for the whole room.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GameEndReason {
    /// Every player in the room reached game-over.
    AllPlayersGameOver,
}

#[derive(Debug, Serialize, ToSchema)]
/// Events pushed to game clients over the WebSocket.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sender-only acknowledgement of a successful join.
    RoomJoined {
        room_code: String,
        players: Vec<PlayerSummary>,
        is_host: bool,
    },
    /// Broadcast to the whole room when a player joins.
    PlayerJoined {
        room_code: String,
        players: Vec<PlayerSummary>,
        new_player: String,
    },
    /// Broadcast to the whole room when a game starts; roster is reset.
    GameStarted {
        room_code: String,
        players: Vec<PlayerSummary>,
        started_by: String,
    },
    /// Relay of a peer's snapshot, sent to everyone but the reporter.
    PlayerStateUpdated {
        player_id: Uuid,
        player_name: String,
        game_state: GameSnapshot,
    },
    /// Broadcast when a player's snapshot first turns game-over.
    PlayerGameOver {
        player_id: Uuid,
        player_name: String,
        final_score: u32,
        players_remaining: usize,
        total_players: usize,
        /// Roster ranked by descending score.
        all_players: Vec<PlayerSummary>,
    },
    /// Broadcast when a single player outlives every other entrant.
    GameWinner {
        winner: PlayerSummary,
        final_scores: Vec<PlayerSummary>,
        total_players: usize,
    },
    /// Broadcast when every player reached game-over.
    GameEnded {
        /// Nominal winner: the top scorer.
        winner: PlayerSummary,
        final_scores: Vec<PlayerSummary>,
        total_players: usize,
        reason: GameEndReason,
    },
    /// Broadcast to the whole waiting room when a ready flag flips.
    PlayerReadyChanged {
        player_id: Uuid,
        is_ready: bool,
        players: Vec<PlayerSummary>,
    },
    /// Sender-only summary of the joined room.
    RoomInfo {
        room_code: String,
        is_host: bool,
        is_started: bool,
        players: Vec<PlayerSummary>,
    },
    /// Broadcast to the remaining members when a player leaves.
    PlayerLeft {
        room_code: String,
        player_name: String,
        players: Vec<PlayerSummary>,
    },
    /// Sent to the offending connection only; never broadcast.
    Error { message: String },
}
