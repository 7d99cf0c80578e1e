//! Win/loss evaluation over a room's player snapshots.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::state::room::Player;

/// Terminal decision derived from the current snapshots of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// More than one player still alive (or nobody joined yet); play on.
    Continue,
    /// Exactly one player is alive out of several: a single-player victory.
    Winner {
        /// Session of the lone alive player.
        session_id: Uuid,
    },
    /// Every player reached game-over, including the solo-room case.
    AllOut {
        /// Top scorer, ties broken by join order. Nominal winner only.
        winner: Uuid,
    },
}

/// Decide whether the room's game just ended.
///
/// Pure function, run after every accepted state update regardless of whether
/// that update changed a game-over flag. A single-player room reaching
/// game-over ends through [`Verdict::AllOut`], never [`Verdict::Winner`]:
/// victory requires at least two entrants.
pub fn evaluate(players: &IndexMap<Uuid, Player>) -> Verdict {
    let total = players.len();
    if total == 0 {
        return Verdict::Continue;
    }

    let mut alive = players
        .iter()
        .filter(|(_, player)| !player.snapshot.game_over);

    match (alive.next(), alive.next()) {
        (Some((&session_id, _)), None) if total > 1 => Verdict::Winner { session_id },
        (None, _) => match top_scorer(players) {
            Some(winner) => Verdict::AllOut { winner },
            None => Verdict::Continue,
        },
        _ => Verdict::Continue,
    }
}

/// Highest-scoring player; strict comparison keeps the first occurrence on ties.
fn top_scorer(players: &IndexMap<Uuid, Player>) -> Option<Uuid> {
    let mut best: Option<(Uuid, u32)> = None;
    for (id, player) in players {
        let score = player.snapshot.score;
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((*id, score));
        }
    }
    best.map(|(id, _)| id)
}

#[cfg(test)]
mod tests {
    use axum::extract::ws::Message;
    use tokio::sync::mpsc;

    use super::*;
    use crate::state::room::GameSnapshot;

    fn player(name: &str, score: u32, game_over: bool) -> Player {
        let (tx, _rx) = mpsc::unbounded_channel::<Message>();
        Player {
            name: name.into(),
            tx,
            is_ready: false,
            snapshot: GameSnapshot {
                score,
                game_over,
                ..GameSnapshot::fresh()
            },
            last_update: std::time::SystemTime::now(),
        }
    }

    fn roster(entries: Vec<Player>) -> IndexMap<Uuid, Player> {
        entries
            .into_iter()
            .map(|player| (Uuid::new_v4(), player))
            .collect()
    }

    #[test]
    fn empty_room_continues() {
        assert_eq!(evaluate(&IndexMap::new()), Verdict::Continue);
    }

    #[test]
    fn game_continues_while_several_players_alive() {
        let players = roster(vec![
            player("Alice", 100, false),
            player("Bob", 500, true),
            player("Carol", 0, false),
        ]);
        assert_eq!(evaluate(&players), Verdict::Continue);
    }

    #[test]
    fn lone_survivor_of_a_multiplayer_room_wins() {
        let players = roster(vec![player("Alice", 100, false), player("Bob", 500, true)]);
        let alice = *players.keys().next().unwrap();
        assert_eq!(evaluate(&players), Verdict::Winner { session_id: alice });
    }

    #[test]
    fn all_out_names_top_scorer_as_nominal_winner() {
        let players = roster(vec![
            player("Alice", 200, true),
            player("Bob", 900, true),
            player("Carol", 400, true),
        ]);
        let bob = *players.keys().nth(1).unwrap();
        assert_eq!(evaluate(&players), Verdict::AllOut { winner: bob });
    }

    #[test]
    fn all_out_tie_keeps_first_in_join_order() {
        let players = roster(vec![player("Alice", 300, true), player("Bob", 300, true)]);
        let alice = *players.keys().next().unwrap();
        assert_eq!(evaluate(&players), Verdict::AllOut { winner: alice });
    }

    #[test]
    fn solo_room_game_over_ends_as_all_out_not_winner() {
        let players = roster(vec![player("Alice", 700, true)]);
        let alice = *players.keys().next().unwrap();
        assert_eq!(evaluate(&players), Verdict::AllOut { winner: alice });
    }

    #[test]
    fn solo_room_alive_player_continues() {
        let players = roster(vec![player("Alice", 700, false)]);
        assert_eq!(evaluate(&players), Verdict::Continue);
    }

    #[test]
    fn alive_and_game_over_counts_partition_the_roster() {
        let players = roster(vec![
            player("Alice", 1, false),
            player("Bob", 2, true),
            player("Carol", 3, false),
            player("Dave", 4, true),
        ]);
        let alive = players.values().filter(|p| !p.snapshot.game_over).count();
        let out = players.values().filter(|p| p.snapshot.game_over).count();
        assert_eq!(alive + out, players.len());
    }
}
