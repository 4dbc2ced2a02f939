use tokio::time::{interval, sleep, Duration};

use crate::game::room::{GamePhase, TickOutcome};
use crate::room::registry::RoomHandle;

/// Drive the per-second round countdown. The epoch pins the turn this
/// ticker belongs to: any phase transition bumps it, and the first tick
/// that observes a mismatch exits without touching the room. This is what
/// keeps a tick from a finished round out of the next one.
pub fn spawn_round_timer(room: RoomHandle, epoch: u64) {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(1));
        // The first interval tick completes immediately; skip it so the
        // countdown starts a full second after word selection.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let mut guard = room.lock().await;
            if guard.epoch() != epoch {
                return;
            }
            match guard.tick(&mut rand::thread_rng()) {
                TickOutcome::Running => {}
                TickOutcome::RoundOver { epoch: next } => {
                    drop(guard);
                    schedule_next_turn(room, next, super::room::NEXT_TURN_DELAY_SECS);
                    return;
                }
            }
        }
    });
}

/// Advance to the next turn after the scoreboard delay, unless the room
/// has moved on (epoch mismatch) in the meantime.
pub fn schedule_next_turn(room: RoomHandle, epoch: u64, delay_secs: u64) {
    tokio::spawn(async move {
        sleep(Duration::from_secs(delay_secs)).await;
        let mut guard = room.lock().await;
        if guard.epoch() == epoch && guard.phase() == GamePhase::RoundOver {
            guard.next_turn();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::room::{GameRoom, RoundEnd, NEXT_TURN_DELAY_SECS};
    use crate::room::player::{Player, PlayerId};
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::Arc;
    use tokio::sync::{mpsc, Mutex};

    async fn drawing_room() -> (RoomHandle, Vec<PlayerId>, u64) {
        let mut room = GameRoom::new("TIMERTST".to_string());
        let mut ids = Vec::new();
        for i in 0..2 {
            let (tx, _rx) = mpsc::unbounded_channel();
            let player = Player::new(format!("P{i}"), "🐶".to_string(), None, i == 0, tx);
            ids.push(room.add_player(player).unwrap());
        }
        room.start_game(ids[0]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let options = room.word_options(ids[0], &mut rng).unwrap();
        let word = options[0].clone();
        let epoch = room.select_word(ids[0], &word).unwrap();
        (Arc::new(Mutex::new(room)), ids, epoch)
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_counts_down_and_times_out() {
        let (room, _ids, epoch) = drawing_room().await;
        let draw_time = room.lock().await.settings().draw_time as u64;

        spawn_round_timer(room.clone(), epoch);

        sleep(Duration::from_secs(draw_time / 2)).await;
        {
            let guard = room.lock().await;
            assert_eq!(guard.phase(), GamePhase::Drawing);
            assert!(guard.state_for(PlayerId::nil()).time_left < draw_time as u32);
        }

        sleep(Duration::from_secs(draw_time)).await;
        assert_eq!(room.lock().await.phase(), GamePhase::RoundOver);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_schedules_next_turn() {
        let (room, _ids, epoch) = drawing_room().await;
        let draw_time = room.lock().await.settings().draw_time as u64;

        spawn_round_timer(room.clone(), epoch);

        sleep(Duration::from_secs(draw_time + NEXT_TURN_DELAY_SECS + 2)).await;
        let guard = room.lock().await;
        assert_eq!(guard.phase(), GamePhase::WordSelect);
        // The pencil moved to the second player.
        assert!(guard.players()[1].is_drawer);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_ticker_never_touches_the_room() {
        let (room, _ids, epoch) = drawing_room().await;
        let draw_time = room.lock().await.settings().draw_time as u32;

        spawn_round_timer(room.clone(), epoch.wrapping_sub(1));

        sleep(Duration::from_secs(10)).await;
        let guard = room.lock().await;
        assert_eq!(guard.phase(), GamePhase::Drawing);
        assert_eq!(guard.state_for(PlayerId::nil()).time_left, draw_time);
    }

    #[tokio::test(start_paused = true)]
    async fn test_early_round_end_cancels_ticker() {
        let (room, _ids, epoch) = drawing_room().await;

        spawn_round_timer(room.clone(), epoch);
        sleep(Duration::from_secs(3)).await;

        // A transition (e.g. collective win) bumps the epoch; the ticker
        // must go quiet even though the room re-enters Drawing later.
        let next = room.lock().await.end_round(RoundEnd::AllGuessed);
        let time_left_after_end = 0;

        sleep(Duration::from_secs(3)).await;
        let guard = room.lock().await;
        assert_eq!(guard.phase(), GamePhase::RoundOver);
        assert_eq!(guard.state_for(PlayerId::nil()).time_left, time_left_after_end);
        assert_eq!(guard.epoch(), next);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_next_turn_is_a_noop() {
        let (room, _ids, _epoch) = drawing_room().await;
        let epoch = room.lock().await.end_round(RoundEnd::Timeout);

        schedule_next_turn(room.clone(), epoch.wrapping_add(99), NEXT_TURN_DELAY_SECS);
        sleep(Duration::from_secs(NEXT_TURN_DELAY_SECS + 2)).await;
        assert_eq!(room.lock().await.phase(), GamePhase::RoundOver);
    }
}
