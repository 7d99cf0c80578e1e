//! Room entity: the set of connected players, the room phase, and each
//! player's last-reported game state.

use std::time::SystemTime;

use axum::extract::ws::Message;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use utoipa::ToSchema;
use uuid::Uuid;

/// Number of rows in a fresh, empty board snapshot.
pub const BOARD_ROWS: usize = 20;
/// Number of columns in a fresh, empty board snapshot.
pub const BOARD_COLS: usize = 10;

/// Coarse lifecycle phase of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomPhase {
    /// Pre-game: joins are allowed, no gameplay state updates are accepted.
    Waiting,
    /// A game is in progress: joins are rejected, state updates are accepted.
    Playing,
}

/// Errors returned by room mutations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The room reached its configured player capacity.
    #[error("room is full (max {capacity} players)")]
    Full {
        /// Configured capacity of the room.
        capacity: usize,
    },
    /// Another live player in the room already uses this display name.
    #[error("player name `{0}` already exists in room")]
    DuplicateName(String),
    /// The operation is only allowed before the game starts.
    #[error("game already started")]
    GameInProgress,
}

/// Last game-state payload a player reported.
///
/// The grid is opaque to the server: it is relayed to peers untouched and
/// never validated. Only `score` and `game_over` feed the win/loss verdict.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GameSnapshot {
    /// Raw board contents as reported by the client.
    #[schema(value_type = Object)]
    pub grid: serde_json::Value,
    /// Current score.
    pub score: u32,
    /// Total lines cleared.
    pub lines: u32,
    /// Current level.
    pub level: u32,
    /// Whether the player topped out.
    pub game_over: bool,
}

impl GameSnapshot {
    /// A fresh snapshot with an empty board, zero score, and the player alive.
    pub fn fresh() -> Self {
        let row = serde_json::Value::Array(vec![serde_json::Value::Null; BOARD_COLS]);
        Self {
            grid: serde_json::Value::Array(vec![row; BOARD_ROWS]),
            score: 0,
            lines: 0,
            level: 0,
            game_over: false,
        }
    }
}

/// A named participant bound to one room and one live connection.
#[derive(Debug)]
pub struct Player {
    /// Display name, unique within the room.
    pub name: String,
    /// Writer channel of the player's WebSocket connection.
    pub tx: mpsc::UnboundedSender<Message>,
    /// Lobby ready flag, only meaningful while the room is waiting.
    pub is_ready: bool,
    /// Last game-state snapshot reported by this player.
    pub snapshot: GameSnapshot,
    /// Timestamp of the last accepted state update.
    pub last_update: SystemTime,
}

/// Outcome of an accepted state update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateUpdateOutcome {
    /// True when this specific update transitioned the player into game-over.
    pub newly_eliminated: bool,
}

/// An isolated multiplayer match session identified by a short code.
///
/// The room exclusively owns its players; iteration order over the player map
/// is join order, which also breaks score ties in ranked views.
#[derive(Debug)]
pub struct Room {
    code: String,
    phase: RoomPhase,
    created_at: SystemTime,
    host: Option<Uuid>,
    capacity: usize,
    players: IndexMap<Uuid, Player>,
}

impl Room {
    /// Create an empty room in the waiting phase.
    pub fn new(code: String, capacity: usize) -> Self {
        Self {
            code,
            phase: RoomPhase::Waiting,
            created_at: SystemTime::now(),
            host: None,
            capacity,
            players: IndexMap::new(),
        }
    }

    /// Short shareable code identifying this room.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Current phase of the room.
    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    /// Whether a game is currently in progress.
    pub fn is_started(&self) -> bool {
        self.phase == RoomPhase::Playing
    }

    /// Creation timestamp of the room.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Session of the first-joined player. Informational only: the host
    /// carries no authority over gameplay commands unless the host-only
    /// policy flag is enabled.
    pub fn host(&self) -> Option<Uuid> {
        self.host
    }

    /// Whether the given session currently holds host status.
    pub fn is_host(&self, session_id: Uuid) -> bool {
        self.host == Some(session_id)
    }

    /// Number of connected players.
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    /// Whether the room has no players left.
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Look up a player by session id.
    pub fn player(&self, session_id: Uuid) -> Option<&Player> {
        self.players.get(&session_id)
    }

    /// All players in join order.
    pub fn players(&self) -> &IndexMap<Uuid, Player> {
        &self.players
    }

    /// Players sorted by descending score. The sort is stable, so ties keep
    /// join order.
    pub fn ranked(&self) -> Vec<(Uuid, &Player)> {
        let mut ranked: Vec<(Uuid, &Player)> =
            self.players.iter().map(|(id, p)| (*id, p)).collect();
        ranked.sort_by(|a, b| b.1.snapshot.score.cmp(&a.1.snapshot.score));
        ranked
    }

    /// Admit a player into the room with a fresh snapshot.
    ///
    /// The first player to join becomes the host. Joins are rejected once the
    /// game started, at capacity, or when the display name is taken.
    pub fn add_player(
        &mut self,
        session_id: Uuid,
        name: String,
        tx: mpsc::UnboundedSender<Message>,
    ) -> Result<(), RoomError> {
        if self.phase == RoomPhase::Playing {
            return Err(RoomError::GameInProgress);
        }
        if self.players.len() >= self.capacity {
            return Err(RoomError::Full {
                capacity: self.capacity,
            });
        }
        if self.players.values().any(|p| p.name == name) {
            return Err(RoomError::DuplicateName(name));
        }

        if self.players.is_empty() {
            self.host = Some(session_id);
        }

        self.players.insert(
            session_id,
            Player {
                name,
                tx,
                is_ready: false,
                snapshot: GameSnapshot::fresh(),
                last_update: SystemTime::now(),
            },
        );
        Ok(())
    }

    /// Remove a player, returning it if it was present.
    ///
    /// Removing an absent session is a no-op. When the departing player held
    /// host status, it transfers to the first remaining player in join order.
    pub fn remove_player(&mut self, session_id: Uuid) -> Option<Player> {
        let removed = self.players.shift_remove(&session_id)?;

        if self.host == Some(session_id) {
            self.host = self.players.keys().next().copied();
        }
        Some(removed)
    }

    /// Start (or restart) the game, resetting every player's snapshot.
    ///
    /// Rejected while a game is already in progress.
    pub fn start_game(&mut self) -> Result<(), RoomError> {
        if self.phase == RoomPhase::Playing {
            return Err(RoomError::GameInProgress);
        }

        self.phase = RoomPhase::Playing;
        let now = SystemTime::now();
        for player in self.players.values_mut() {
            player.snapshot = GameSnapshot::fresh();
            player.last_update = now;
        }
        Ok(())
    }

    /// Terminate the current game and return to the waiting phase, keeping
    /// final snapshots intact for display.
    pub fn finish_game(&mut self) {
        self.phase = RoomPhase::Waiting;
        for player in self.players.values_mut() {
            player.is_ready = false;
        }
    }

    /// Overwrite a player's stored snapshot with a newly reported one.
    ///
    /// Returns `None` when the room is not playing or the session is unknown.
    /// A snapshot that was already game-over never flips back to alive within
    /// the same game; the flag is pinned until a room-wide restart.
    pub fn update_player_state(
        &mut self,
        session_id: Uuid,
        mut snapshot: GameSnapshot,
    ) -> Option<StateUpdateOutcome> {
        if self.phase != RoomPhase::Playing {
            return None;
        }
        let player = self.players.get_mut(&session_id)?;

        let was_game_over = player.snapshot.game_over;
        if was_game_over {
            snapshot.game_over = true;
        }
        player.snapshot = snapshot;
        player.last_update = SystemTime::now();

        Some(StateUpdateOutcome {
            newly_eliminated: !was_game_over && player.snapshot.game_over,
        })
    }

    /// Shift the creation timestamp into the past, for sweep tests.
    #[cfg(test)]
    pub(crate) fn backdate(&mut self, age: std::time::Duration) {
        self.created_at = SystemTime::now() - age;
    }

    /// Toggle a player's lobby ready flag, returning the new value.
    ///
    /// Only meaningful while the room is waiting; `None` otherwise.
    pub fn toggle_ready(&mut self, session_id: Uuid) -> Option<bool> {
        if self.phase == RoomPhase::Playing {
            return None;
        }
        let player = self.players.get_mut(&session_id)?;
        player.is_ready = !player.is_ready;
        Some(player.is_ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> mpsc::UnboundedSender<Message> {
        let (tx, _rx) = mpsc::unbounded_channel();
        tx
    }

    fn room_with(names: &[&str]) -> (Room, Vec<Uuid>) {
        let mut room = Room::new("ABC123".into(), 8);
        let ids: Vec<Uuid> = names
            .iter()
            .map(|name| {
                let id = Uuid::new_v4();
                room.add_player(id, (*name).into(), channel()).unwrap();
                id
            })
            .collect();
        (room, ids)
    }

    fn snapshot(score: u32, game_over: bool) -> GameSnapshot {
        GameSnapshot {
            score,
            game_over,
            ..GameSnapshot::fresh()
        }
    }

    #[test]
    fn first_player_becomes_host() {
        let (room, ids) = room_with(&["Alice", "Bob"]);
        assert!(room.is_host(ids[0]));
        assert!(!room.is_host(ids[1]));
    }

    #[test]
    fn ninth_join_is_rejected_and_roster_unchanged() {
        let names: Vec<String> = (0..8).map(|i| format!("p{i}")).collect();
        let name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let (mut room, _) = room_with(&name_refs);

        let err = room
            .add_player(Uuid::new_v4(), "late".into(), channel())
            .unwrap_err();
        assert_eq!(err, RoomError::Full { capacity: 8 });
        assert_eq!(room.player_count(), 8);
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let (mut room, _) = room_with(&["Alice"]);
        let err = room
            .add_player(Uuid::new_v4(), "Alice".into(), channel())
            .unwrap_err();
        assert_eq!(err, RoomError::DuplicateName("Alice".into()));
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn join_rejected_while_playing() {
        let (mut room, _) = room_with(&["Alice"]);
        room.start_game().unwrap();
        let err = room
            .add_player(Uuid::new_v4(), "Bob".into(), channel())
            .unwrap_err();
        assert_eq!(err, RoomError::GameInProgress);
    }

    #[test]
    fn start_resets_all_snapshots_and_rejects_restart_mid_game() {
        let (mut room, ids) = room_with(&["Alice", "Bob"]);
        room.start_game().unwrap();
        room.update_player_state(ids[1], snapshot(500, true));

        assert_eq!(room.start_game().unwrap_err(), RoomError::GameInProgress);

        room.finish_game();
        room.start_game().unwrap();
        for player in room.players().values() {
            assert_eq!(player.snapshot.score, 0);
            assert!(!player.snapshot.game_over);
        }
        assert_eq!(room.phase(), RoomPhase::Playing);
    }

    #[test]
    fn updates_ignored_while_waiting() {
        let (mut room, ids) = room_with(&["Alice"]);
        assert!(room.update_player_state(ids[0], snapshot(100, false)).is_none());
        assert_eq!(room.player(ids[0]).unwrap().snapshot.score, 0);
    }

    #[test]
    fn game_over_flag_never_resurrects() {
        let (mut room, ids) = room_with(&["Alice", "Bob"]);
        room.start_game().unwrap();

        let outcome = room
            .update_player_state(ids[0], snapshot(300, true))
            .unwrap();
        assert!(outcome.newly_eliminated);

        // A later update claiming the player is alive again is pinned dead.
        let outcome = room
            .update_player_state(ids[0], snapshot(350, false))
            .unwrap();
        assert!(!outcome.newly_eliminated);
        assert!(room.player(ids[0]).unwrap().snapshot.game_over);
    }

    #[test]
    fn host_transfers_to_first_remaining_player() {
        let (mut room, ids) = room_with(&["Alice", "Bob", "Carol"]);
        room.remove_player(ids[0]);
        assert!(room.is_host(ids[1]));
    }

    #[test]
    fn removing_absent_player_is_a_noop() {
        let (mut room, ids) = room_with(&["Alice"]);
        room.remove_player(ids[0]);
        assert!(room.remove_player(ids[0]).is_none());
        assert!(room.is_empty());
        assert_eq!(room.host(), None);
    }

    #[test]
    fn ranked_sorts_by_score_with_ties_in_join_order() {
        let (mut room, ids) = room_with(&["Alice", "Bob", "Carol"]);
        room.start_game().unwrap();
        room.update_player_state(ids[0], snapshot(100, false));
        room.update_player_state(ids[1], snapshot(400, false));
        room.update_player_state(ids[2], snapshot(100, false));

        let ranked = room.ranked();
        let names: Vec<&str> = ranked.iter().map(|(_, p)| p.name.as_str()).collect();
        assert_eq!(names, vec!["Bob", "Alice", "Carol"]);
    }

    #[test]
    fn ready_toggle_only_while_waiting() {
        let (mut room, ids) = room_with(&["Alice"]);
        assert_eq!(room.toggle_ready(ids[0]), Some(true));
        assert_eq!(room.toggle_ready(ids[0]), Some(false));

        room.start_game().unwrap();
        assert_eq!(room.toggle_ready(ids[0]), None);
    }
}
