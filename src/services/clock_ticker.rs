use std::{
    collections::HashMap,
    time::{Duration, Instant},
};

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::{
    services::game_service,
    sports::ClockDirection,
    state::{
        SharedState,
        game::{GameCode, GameStatus, TimeValue},
        session::GameSession,
    },
};

/// Running time gathered before it is committed to a game.
///
/// Every committed tick is persisted, so this bounds the store writes per game.
const COMMIT_EVERY_MILLIS: u64 = 1_000;

/// Elapsed time not yet applied to a game's clocks.
#[derive(Debug, Default)]
struct TickCarry {
    game_millis: u64,
    secondary_millis: u64,
}

/// Advance the running clocks of every live game scored through this process, forever.
pub async fn run(state: SharedState, period: Duration) {
    info!(period_ms = period.as_millis() as u64, "clock ticker started");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut carries: HashMap<GameCode, TickCarry> = HashMap::new();
    let mut last = Instant::now();

    loop {
        ticker.tick().await;
        let now = Instant::now();
        let elapsed = now - last;
        last = now;
        tick_attached(&state, &mut carries, elapsed).await;
    }
}

/// One tick over the attached games. Games only watched here are left to their scorer.
async fn tick_attached(
    state: &SharedState,
    carries: &mut HashMap<GameCode, TickCarry>,
    elapsed: Duration,
) {
    let sessions: Vec<_> = state
        .sessions()
        .into_iter()
        .filter(|session| session.is_controlling())
        .collect();
    carries.retain(|code, _| sessions.iter().any(|session| session.code() == code));

    for session in sessions {
        let carry = carries.entry(session.code().clone()).or_default();
        tick_session(state, &session, carry, elapsed).await;
    }
}

async fn tick_session(
    state: &SharedState,
    session: &GameSession,
    carry: &mut TickCarry,
    elapsed: Duration,
) {
    let mut engine = session.engine().lock().await;
    let game = engine.game();
    if game.status != GameStatus::Live {
        *carry = TickCarry::default();
        return;
    }

    let elapsed_millis = elapsed.as_millis() as u64;
    let clock = &game.state.clock;
    let direction = game.settings.rules.timing.clock_direction;
    let running_secondary = clock.secondary.filter(|_| clock.secondary_running);

    if clock.game_running {
        carry.game_millis += elapsed_millis;
    } else {
        carry.game_millis = 0;
    }
    if running_secondary.is_some() {
        carry.secondary_millis += elapsed_millis;
    } else {
        carry.secondary_millis = 0;
    }

    // a game clock running out is committed right away so the period ends on time
    let remaining_millis = clock.game.as_tenths() * 100;
    let game_expires = clock.game_running
        && direction == ClockDirection::Down
        && remaining_millis > 0
        && remaining_millis <= carry.game_millis;
    let due = carry.game_millis >= COMMIT_EVERY_MILLIS
        || carry.secondary_millis >= COMMIT_EVERY_MILLIS
        || game_expires;
    if !due {
        return;
    }

    let current_game = clock.game.as_tenths();
    let game_running = clock.game_running;
    let mut changed = false;

    let tenths = carry.game_millis / 100;
    carry.game_millis %= 100;
    if game_running && tenths > 0 {
        let next = match direction {
            ClockDirection::Down => current_game.saturating_sub(tenths),
            ClockDirection::Up => current_game + tenths,
        };
        if let Ok(outcome) = engine.update_game_time(TimeValue::from_tenths(next)) {
            changed |= outcome.is_valid();
        }
    }

    let seconds = carry.secondary_millis / 1_000;
    carry.secondary_millis %= 1_000;
    if let Some(current) = running_secondary.filter(|_| seconds > 0) {
        let next = current.saturating_sub(u32::try_from(seconds).unwrap_or(u32::MAX));
        if let Ok(outcome) = engine.update_secondary_clock(next) {
            changed |= outcome.is_valid();
        }
    }

    if changed {
        let status = game_service::persist_snapshot(state, engine.game()).await;
        debug!(
            code = %session.code(),
            clock = %engine.game().state.clock.game,
            persisted = status.persisted,
            "clock tick committed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::game_store::{GameStore, memory::MemoryGameStore},
        dto::command::GameCommand,
        sports::registry::SportRegistry,
        state::{AppState, game::Side},
    };

    async fn backend(store: &MemoryGameStore) -> SharedState {
        let state = AppState::new(AppConfig::default(), SportRegistry::builtin(&[]).unwrap());
        state.set_game_store(Arc::new(store.clone())).await;
        state.update_degraded(false);
        state
    }

    async fn live_game(state: &SharedState) -> Arc<GameSession> {
        let request = serde_json::from_str(
            r#"{"sport": "basketball", "gameName": "Tick", "teamA": {"name": "A"}, "teamB": {"name": "B"}}"#,
        )
        .unwrap();
        let view = game_service::create_game(state, request).await.unwrap();
        for command in [GameCommand::Start, GameCommand::ToggleGameClock] {
            game_service::execute_command(state, &view.code, command)
                .await
                .unwrap();
        }
        game_service::attach(state, &view.code).await.unwrap()
    }

    #[tokio::test]
    async fn tick_runs_both_clocks_down_and_persists() {
        let store = MemoryGameStore::new();
        let state = backend(&store).await;
        let session = live_game(&state).await;
        let mut carry = TickCarry::default();

        tick_session(&state, &session, &mut carry, Duration::from_millis(1_550)).await;

        let engine = session.engine().lock().await;
        let clock = &engine.game().state.clock;
        assert_eq!(clock.game, TimeValue::from_tenths(10 * 600 - 15));
        assert_eq!(clock.secondary, Some(23));
        assert_eq!(carry.game_millis, 50);
        assert_eq!(carry.secondary_millis, 550);

        let stored = store.find_game(session.code().clone()).await.unwrap().unwrap();
        assert_eq!(stored, *engine.game());
    }

    #[tokio::test]
    async fn short_ticks_are_gathered_before_committing() {
        let store = MemoryGameStore::new();
        let state = backend(&store).await;
        let session = live_game(&state).await;
        let before = session.engine().lock().await.snapshot();
        let mut carry = TickCarry::default();

        for _ in 0..9 {
            tick_session(&state, &session, &mut carry, Duration::from_millis(100)).await;
        }
        assert_eq!(*session.engine().lock().await.snapshot(), *before);

        tick_session(&state, &session, &mut carry, Duration::from_millis(100)).await;
        let engine = session.engine().lock().await;
        assert_eq!(engine.game().state.clock.game, TimeValue::from_tenths(10 * 600 - 10));
        let stored = store.find_game(session.code().clone()).await.unwrap().unwrap();
        assert_eq!(stored.last_update, engine.game().last_update);
    }

    #[tokio::test]
    async fn expiring_clock_is_committed_without_waiting() {
        let store = MemoryGameStore::new();
        let state = backend(&store).await;
        let session = live_game(&state).await;
        session
            .engine()
            .lock()
            .await
            .update_game_time(TimeValue::from_tenths(3))
            .unwrap();
        let mut carry = TickCarry::default();

        tick_session(&state, &session, &mut carry, Duration::from_millis(300)).await;

        let engine = session.engine().lock().await;
        assert_eq!(engine.game().state.clock.game.as_tenths(), 0);
        let stored = store.find_game(session.code().clone()).await.unwrap().unwrap();
        assert_eq!(stored.state.clock.game.as_tenths(), 0);
    }

    #[tokio::test]
    async fn stopped_clock_does_not_move() {
        let store = MemoryGameStore::new();
        let state = backend(&store).await;
        let session = live_game(&state).await;
        game_service::execute_command(&state, session.code().as_str(), GameCommand::ToggleGameClock)
            .await
            .unwrap();
        let before = session.engine().lock().await.game().state.clock.clone();

        let mut carry = TickCarry::default();
        tick_session(&state, &session, &mut carry, Duration::from_secs(3)).await;

        assert_eq!(session.engine().lock().await.game().state.clock, before);
    }

    #[tokio::test]
    async fn watching_instances_leave_the_clock_to_the_scorer() {
        let store = MemoryGameStore::new();
        let scorer = backend(&store).await;
        let viewer = backend(&store).await;
        let session = live_game(&scorer).await;
        let code = session.code().as_str().to_owned();
        let watched = game_service::attach(&viewer, &code).await.unwrap();
        assert!(session.is_controlling());
        assert!(!watched.is_controlling());

        game_service::execute_command(
            &scorer,
            &code,
            GameCommand::RecordScore {
                side: Side::A,
                action_id: "three_pointer".into(),
                player_id: None,
            },
        )
        .await
        .unwrap();
        // the viewer ticks before its watch has delivered the new score
        let mut carries = HashMap::new();
        tick_attached(&viewer, &mut carries, Duration::from_secs(2)).await;
        assert!(carries.is_empty());

        timeout(Duration::from_secs(2), async {
            while watched.engine().lock().await.game().team(Side::A).score != 3 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("viewer never saw the score");

        let stored = store.find_game(session.code().clone()).await.unwrap().unwrap();
        assert_eq!(stored.team(Side::A).score, 3);
        assert_eq!(session.engine().lock().await.game().team(Side::A).score, 3);
        assert!(!watched.is_controlling());
    }
}
