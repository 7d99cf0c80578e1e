//! Background sweep reclaiming rooms that stayed empty past the idle timeout.

use tokio::time::{MissedTickBehavior, interval};
use tracing::info;

use crate::state::SharedState;

/// Periodically delete long-empty rooms.
///
/// Rooms are deleted the moment their last player leaves; this task is a
/// safety net for rooms orphaned by crashed connections. It takes the same
/// registry lock as command processing, so a sweep never interleaves with a
/// half-applied command.
pub async fn run_idle_sweeper(state: SharedState) {
    let mut ticker = interval(state.config().sweep_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let removed = state
            .registry()
            .sweep_idle(state.config().idle_room_timeout())
            .await;
        if !removed.is_empty() {
            info!(count = removed.len(), codes = ?removed, "cleaned up idle rooms");
        }
    }
}
