//! WebSocket event router: receives client commands, mutates room state, and
//! broadcasts the resulting events to the right recipients.
//!
//! Every command takes the registry write lock for its full duration, so the
//! mutation and all broadcasts it triggers land before the next command for
//! the same room is processed.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        room::PlayerSummary,
        validation::{validate_player_name, validate_room_code},
        ws::{ClientMessage, GameEndReason, ServerMessage},
    },
    error::ServiceError,
    state::{
        SessionId, SessionInfo, SharedState,
        room::{GameSnapshot, Room},
        verdict::{self, Verdict},
    },
};

/// Internal error type for command handling.
///
/// Each variant is rendered into an `error` event for the offending
/// connection only; none of them is broadcast or tears the connection down.
#[derive(Debug, Error)]
enum CommandError {
    /// Command other than join received before the connection joined a room.
    #[error("join a room first")]
    NotJoined,
    /// A second join while already bound to a room.
    #[error("already joined room `{0}`")]
    AlreadyJoined(String),
    /// Message type the router does not understand.
    #[error("unsupported message type")]
    Unsupported,
    /// Domain-level rejection (room full, duplicate name, ...).
    #[error("{0}")]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle for an individual game WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let session_id: SessionId = Uuid::new_v4();
    info!(session = %session_id, "player connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(command) => {
                    if let Err(err) = dispatch(&state, session_id, &outbound_tx, command).await {
                        warn!(session = %session_id, error = %err, "command rejected");
                        send_to(
                            &outbound_tx,
                            &ServerMessage::Error {
                                message: err.to_string(),
                            },
                        );
                    }
                }
                Err(err) => {
                    warn!(session = %session_id, error = %err, "failed to parse client message");
                    send_to(
                        &outbound_tx,
                        &ServerMessage::Error {
                            message: "malformed message".into(),
                        },
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {}
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(session = %session_id, error = %err, "websocket error");
                break;
            }
        }
    }

    // Disconnect cleanup mirrors an explicit leave.
    remove_from_room(&state, session_id).await;
    info!(session = %session_id, "player disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Route one parsed command to its handler.
async fn dispatch(
    state: &SharedState,
    session_id: SessionId,
    tx: &mpsc::UnboundedSender<Message>,
    command: ClientMessage,
) -> Result<(), CommandError> {
    match command {
        ClientMessage::Join {
            room_code,
            player_name,
        } => handle_join(state, session_id, tx, &room_code, &player_name).await,
        ClientMessage::Start => handle_start(state, session_id).await,
        ClientMessage::StateUpdate { snapshot } => {
            handle_state_update(state, session_id, snapshot).await
        }
        ClientMessage::ToggleReady => handle_toggle_ready(state, session_id).await,
        ClientMessage::RoomInfo => handle_room_info(state, session_id, tx).await,
        ClientMessage::Leave => {
            remove_from_room(state, session_id).await;
            Ok(())
        }
        ClientMessage::Unknown => Err(CommandError::Unsupported),
    }
}

/// Bind a connection to a room, creating the room on demand when the code is
/// unknown and recreation is enabled.
async fn handle_join(
    state: &SharedState,
    session_id: SessionId,
    tx: &mpsc::UnboundedSender<Message>,
    room_code: &str,
    player_name: &str,
) -> Result<(), CommandError> {
    if let Some(existing) = state.sessions().get(&session_id) {
        return Err(CommandError::AlreadyJoined(existing.room_code.clone()));
    }

    validate_player_name(player_name)
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    validate_room_code(room_code).map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let name = player_name.trim().to_string();
    let code = room_code.to_uppercase();

    let mut rooms = state.registry().rooms().write().await;
    if !rooms.contains_key(&code) {
        if !state.config().recreate_missing_rooms() {
            return Err(ServiceError::NotFound(format!("room `{code}` not found")).into());
        }
        // Deliberate leniency: a stale link recreates the room under its old
        // code so clients survive a server restart.
        warn!(code = %code, "join referenced unknown room; recreating");
        let room = state.registry().blank_room(&code);
        rooms.insert(code.clone(), room);
    }
    let Some(room) = rooms.get_mut(&code) else {
        return Ok(());
    };

    room.add_player(session_id, name.clone(), tx.clone())
        .map_err(ServiceError::from)?;

    state.sessions().insert(
        session_id,
        SessionInfo {
            room_code: code.clone(),
            player_name: name.clone(),
        },
    );

    let players = PlayerSummary::roster(room);
    broadcast(
        room,
        &ServerMessage::PlayerJoined {
            room_code: code.clone(),
            players: players.clone(),
            new_player: name.clone(),
        },
    );
    send_to(
        tx,
        &ServerMessage::RoomJoined {
            room_code: code.clone(),
            players,
            is_host: room.is_host(session_id),
        },
    );

    info!(code = %code, player = %name, total = room.player_count(), "player joined room");
    Ok(())
}

/// Start the room's game and broadcast the reset roster.
async fn handle_start(state: &SharedState, session_id: SessionId) -> Result<(), CommandError> {
    let info = session_info(state, session_id)?;

    let mut rooms = state.registry().rooms().write().await;
    let Some(room) = rooms.get_mut(&info.room_code) else {
        warn!(code = %info.room_code, "start for a room that no longer exists");
        return Ok(());
    };

    if state.config().host_only_controls() && !room.is_host(session_id) {
        return Err(
            ServiceError::InvalidState("only the host may start the game".into()).into(),
        );
    }

    room.start_game().map_err(ServiceError::from)?;

    broadcast(
        room,
        &ServerMessage::GameStarted {
            room_code: info.room_code.clone(),
            players: PlayerSummary::roster(room),
            started_by: info.player_name.clone(),
        },
    );

    info!(
        code = %info.room_code,
        started_by = %info.player_name,
        total = room.player_count(),
        "game started"
    );
    Ok(())
}

/// Store a player's snapshot, relay it to peers, and settle the verdict.
///
/// Broadcast order within this one command is fixed: state relay to peers,
/// then the elimination notice if this update topped the player out, then the
/// winner/ended event when the verdict is terminal.
async fn handle_state_update(
    state: &SharedState,
    session_id: SessionId,
    snapshot: GameSnapshot,
) -> Result<(), CommandError> {
    let info = session_info(state, session_id)?;

    let mut rooms = state.registry().rooms().write().await;
    let Some(room) = rooms.get_mut(&info.room_code) else {
        return Ok(());
    };

    // Silently dropped while the room is waiting, matching the pre-game and
    // post-game lulls where clients may still flush a last update.
    let Some(outcome) = room.update_player_state(session_id, snapshot) else {
        return Ok(());
    };
    let Some(stored) = room.player(session_id).map(|p| p.snapshot.clone()) else {
        return Ok(());
    };

    broadcast_except(
        room,
        session_id,
        &ServerMessage::PlayerStateUpdated {
            player_id: session_id,
            player_name: info.player_name.clone(),
            game_state: stored.clone(),
        },
    );

    if outcome.newly_eliminated {
        let alive = room
            .players()
            .values()
            .filter(|p| !p.snapshot.game_over)
            .count();
        broadcast(
            room,
            &ServerMessage::PlayerGameOver {
                player_id: session_id,
                player_name: info.player_name.clone(),
                final_score: stored.score,
                players_remaining: alive,
                total_players: room.player_count(),
                all_players: PlayerSummary::ranked(room),
            },
        );
        info!(
            code = %info.room_code,
            player = %info.player_name,
            remaining = alive,
            "player eliminated"
        );
    }

    settle_verdict(&info.room_code, room);
    Ok(())
}

/// Run the win/loss evaluator and, on a terminal verdict, broadcast it and
/// return the room to the waiting phase.
fn settle_verdict(room_code: &str, room: &mut Room) {
    match verdict::evaluate(room.players()) {
        Verdict::Continue => {}
        Verdict::Winner { session_id } => {
            let Some(winner) = room
                .player(session_id)
                .map(|p| PlayerSummary::from((session_id, p)))
            else {
                return;
            };
            broadcast(
                room,
                &ServerMessage::GameWinner {
                    winner: winner.clone(),
                    final_scores: PlayerSummary::ranked(room),
                    total_players: room.player_count(),
                },
            );
            room.finish_game();
            info!(code = %room_code, winner = %winner.name, "game won");
        }
        Verdict::AllOut { winner } => {
            let Some(winner) = room
                .player(winner)
                .map(|p| PlayerSummary::from((winner, p)))
            else {
                return;
            };
            broadcast(
                room,
                &ServerMessage::GameEnded {
                    winner: winner.clone(),
                    final_scores: PlayerSummary::ranked(room),
                    total_players: room.player_count(),
                    reason: GameEndReason::AllPlayersGameOver,
                },
            );
            room.finish_game();
            info!(code = %room_code, top_scorer = %winner.name, "all players game over");
        }
    }
}

/// Flip the sender's lobby ready flag and broadcast the refreshed roster.
async fn handle_toggle_ready(
    state: &SharedState,
    session_id: SessionId,
) -> Result<(), CommandError> {
    let info = session_info(state, session_id)?;

    let mut rooms = state.registry().rooms().write().await;
    let Some(room) = rooms.get_mut(&info.room_code) else {
        return Ok(());
    };
    // Ignored mid-game.
    let Some(is_ready) = room.toggle_ready(session_id) else {
        return Ok(());
    };

    broadcast(
        room,
        &ServerMessage::PlayerReadyChanged {
            player_id: session_id,
            is_ready,
            players: PlayerSummary::roster(room),
        },
    );
    Ok(())
}

/// Reply to the sender with a summary of its room.
async fn handle_room_info(
    state: &SharedState,
    session_id: SessionId,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), CommandError> {
    let info = session_info(state, session_id)?;

    let rooms = state.registry().rooms().read().await;
    let Some(room) = rooms.get(&info.room_code) else {
        return Ok(());
    };

    send_to(
        tx,
        &ServerMessage::RoomInfo {
            room_code: info.room_code.clone(),
            is_host: room.is_host(session_id),
            is_started: room.is_started(),
            players: PlayerSummary::roster(room),
        },
    );
    Ok(())
}

/// Detach a session from its room, deleting the room when it empties.
///
/// Shared by the explicit leave command and the disconnect path; calling it
/// for a session that never joined (or already left) is a no-op.
async fn remove_from_room(state: &SharedState, session_id: SessionId) {
    let Some((_, info)) = state.sessions().remove(&session_id) else {
        return;
    };

    let mut rooms = state.registry().rooms().write().await;
    let Some(room) = rooms.get_mut(&info.room_code) else {
        return;
    };

    room.remove_player(session_id);

    if room.is_empty() {
        rooms.remove(&info.room_code);
        info!(code = %info.room_code, "room deleted (empty)");
    } else {
        broadcast(
            room,
            &ServerMessage::PlayerLeft {
                room_code: info.room_code.clone(),
                player_name: info.player_name.clone(),
                players: PlayerSummary::roster(room),
            },
        );
        info!(
            code = %info.room_code,
            player = %info.player_name,
            remaining = room.player_count(),
            "player left room"
        );
    }
}

/// Resolve which room and name a connection belongs to.
fn session_info(state: &SharedState, session_id: SessionId) -> Result<SessionInfo, CommandError> {
    state
        .sessions()
        .get(&session_id)
        .map(|entry| entry.value().clone())
        .ok_or(CommandError::NotJoined)
}

/// Serialize an event and push it to a single connection.
///
/// A closed writer means the peer's own handler is already cleaning up, so
/// send failures are ignored here.
fn send_to(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
        }
    }
}

/// Push an event to every connection in the room.
fn broadcast(room: &Room, message: &ServerMessage) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
            return;
        }
    };
    for player in room.players().values() {
        let _ = player.tx.send(Message::Text(payload.clone().into()));
    }
}

/// Push an event to every connection in the room except `skip`.
fn broadcast_except(room: &Room, skip: SessionId, message: &ServerMessage) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
            return;
        }
    };
    for (id, player) in room.players() {
        if *id != skip {
            let _ = player.tx.send(Message::Text(payload.clone().into()));
        }
    }
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
