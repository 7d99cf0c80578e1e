//! Room registry: the single source of truth for all live rooms.

use std::{collections::HashMap, time::Duration};

use rand::Rng;
use tokio::sync::RwLock;

use crate::{error::ServiceError, state::room::Room};

/// Alphabet used for generated room codes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Process-wide mapping of room code to room, owned by the application state
/// and injected into the routers rather than living in a global.
///
/// All room mutations, including the ones performed by the WebSocket router,
/// funnel through the write half of the inner lock. Holding it across an
/// entire command (mutation plus broadcast computation) is what serializes
/// commands per room.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Room>>,
    code_length: usize,
    room_capacity: usize,
}

impl RoomRegistry {
    /// Create an empty registry with the given code length and room capacity.
    pub fn new(code_length: usize, room_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            code_length,
            room_capacity,
        }
    }

    /// Direct access to the room map. The WebSocket router takes the write
    /// half for the full duration of each command.
    pub fn rooms(&self) -> &RwLock<HashMap<String, Room>> {
        &self.rooms
    }

    /// Build an empty waiting-phase room for `code` without registering it.
    ///
    /// Used by the join path to recreate a missing room in place, inside an
    /// already-held write guard.
    pub fn blank_room(&self, code: &str) -> Room {
        Room::new(code.to_string(), self.room_capacity)
    }

    /// Create a new empty room and return its code.
    ///
    /// A requested code is uppercased first and fails when occupied; otherwise
    /// a fresh code is generated, collision-checked against the live map. The
    /// retry loop is a safety net: with 36^6 codes, collisions are rare.
    pub async fn create(&self, requested_code: Option<&str>) -> Result<String, ServiceError> {
        let mut rooms = self.rooms.write().await;

        let code = match requested_code {
            Some(requested) => {
                let code = requested.to_uppercase();
                if rooms.contains_key(&code) {
                    return Err(ServiceError::RoomAlreadyExists(code));
                }
                code
            }
            None => loop {
                let candidate = self.generate_code();
                if !rooms.contains_key(&candidate) {
                    break candidate;
                }
            },
        };

        rooms.insert(code.clone(), self.blank_room(&code));
        Ok(code)
    }

    /// Remove a room. Idempotent: deleting an unknown code is a no-op.
    pub async fn delete(&self, code: &str) -> bool {
        self.rooms.write().await.remove(code).is_some()
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Delete rooms that have stayed empty longer than `timeout`, returning
    /// the reclaimed codes.
    ///
    /// Rooms are normally deleted the moment their last player leaves; this
    /// sweep only reclaims leftovers from crashed connections.
    pub async fn sweep_idle(&self, timeout: Duration) -> Vec<String> {
        let mut rooms = self.rooms.write().await;
        let expired: Vec<String> = rooms
            .iter()
            .filter(|(_, room)| {
                room.is_empty()
                    && room
                        .created_at()
                        .elapsed()
                        .is_ok_and(|age| age > timeout)
            })
            .map(|(code, _)| code.clone())
            .collect();

        for code in &expired {
            rooms.remove(code);
        }
        expired
    }

    fn generate_code(&self) -> String {
        let mut rng = rand::rng();
        (0..self.code_length)
            .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(6, 8)
    }

    #[tokio::test]
    async fn generated_codes_are_unique_and_well_formed() {
        let registry = registry();
        let first = registry.create(None).await.unwrap();
        let second = registry.create(None).await.unwrap();

        assert_ne!(first, second);
        for code in [&first, &second] {
            assert_eq!(code.len(), 6);
            assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
        }
        assert_eq!(registry.room_count().await, 2);
    }

    #[tokio::test]
    async fn requested_code_is_uppercased_and_conflicts_are_rejected() {
        let registry = registry();
        let code = registry.create(Some("abc123")).await.unwrap();
        assert_eq!(code, "ABC123");

        let err = registry.create(Some("ABC123")).await.unwrap_err();
        assert!(matches!(err, ServiceError::RoomAlreadyExists(_)));
        assert_eq!(registry.room_count().await, 1);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let registry = registry();
        let code = registry.create(None).await.unwrap();

        assert!(registry.delete(&code).await);
        assert!(!registry.delete(&code).await);
        assert_eq!(registry.room_count().await, 0);
    }

    #[tokio::test]
    async fn sweep_reclaims_only_old_empty_rooms() {
        let registry = registry();
        let stale = registry.create(Some("STALE0")).await.unwrap();
        let fresh = registry.create(Some("FRESH0")).await.unwrap();

        {
            let mut rooms = registry.rooms().write().await;
            rooms
                .get_mut(&stale)
                .unwrap()
                .backdate(Duration::from_secs(600));
        }

        let removed = registry.sweep_idle(Duration::from_secs(300)).await;
        assert_eq!(removed, vec![stale]);
        assert_eq!(registry.room_count().await, 1);
        assert!(registry.rooms().read().await.contains_key(&fresh));
    }
}
