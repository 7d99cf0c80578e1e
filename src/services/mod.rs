/// OpenAPI documentation generation.
pub mod documentation;
/// Room provisioning, listing, and stats behind the REST surface.
pub mod room_service;
/// Idle-room cleanup task.
pub mod sweeper;
/// WebSocket connection handling and event routing.
pub mod websocket_service;
