//! Shared application state: the room registry and the connection session
//! tracker.

pub mod registry;
pub mod room;
pub mod verdict;

use std::sync::Arc;

use dashmap::DashMap;
use uuid::Uuid;

use crate::{config::AppConfig, state::registry::RoomRegistry};

/// Cheap-to-clone handle on the application state.
pub type SharedState = Arc<AppState>;

/// Transient identifier of one live WebSocket connection.
pub type SessionId = Uuid;

#[derive(Debug, Clone)]
/// Where a live connection belongs: which room, under which display name.
///
/// Exists only while the connection is open; resolved on every inbound
/// command and used to clean up after a disconnect.
pub struct SessionInfo {
    /// Code of the room the connection joined.
    pub room_code: String,
    /// Display name the connection joined under.
    pub player_name: String,
}

/// Central application state storing the room registry, the session tracker,
/// and the runtime configuration.
pub struct AppState {
    config: AppConfig,
    registry: RoomRegistry,
    sessions: DashMap<SessionId, SessionInfo>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        let registry = RoomRegistry::new(
            config.room_code_length(),
            config.max_players_per_room(),
        );
        Arc::new(Self {
            config,
            registry,
            sessions: DashMap::new(),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of live rooms.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Tracker of live connections keyed by session id.
    pub fn sessions(&self) -> &DashMap<SessionId, SessionInfo> {
        &self.sessions
    }
}
