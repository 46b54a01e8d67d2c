use std::{
    collections::HashSet,
    sync::{Arc, Weak},
};

use tracing::{debug, info, warn};

use crate::{
    dao::storage::StorageError,
    dto::{
        command::GameCommand,
        game::{
            CommandOutcome, CreateGameRequest, GameView, PlayerInput, PlayerStatsResponse,
            SyncStatus, WinnerResponse, decided_winner,
        },
        sports::SportSummary,
    },
    error::ServiceError,
    services::sse_events,
    sports::{GameSetup, SportConfig},
    state::{
        AppState, SharedState, SseHub,
        engine::GameEngine,
        game::{Game, GameCode, GameStatus, Side},
        session::GameSession,
    },
    sync::{Reconciled, SyncAdapter, SyncError, reconcile},
};

/// Fresh codes drawn before giving up on creation.
const MAX_CODE_ATTEMPTS: usize = 8;

/// Enabled sports with their rules and catalogs.
pub fn list_sports(state: &SharedState) -> Vec<SportSummary> {
    state
        .registry()
        .enabled_configs()
        .map(|config| SportSummary::from(config.as_ref()))
        .collect()
}

/// Create a game in `setup` status, store it under a fresh code and attach it.
pub async fn create_game(
    state: &SharedState,
    request: CreateGameRequest,
) -> Result<GameView, ServiceError> {
    let config = state.registry().get(&request.sport)?;
    let setup = request.into_setup(state.config());
    check_rosters(&setup, &config)?;
    let sync = state.require_sync().await?;

    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let game = config.create_game(GameCode::generate(), setup.clone());
        match sync.create(&game).await {
            Ok(()) => {
                info!(code = %game.code, sport = %game.sport, "game created");
                let session = attach_engine(state, &sync, GameEngine::new(game, config));
                session.take_control();
                let engine = session.engine().lock().await;
                return Ok(GameView::from(&*engine));
            }
            Err(SyncError::Storage(StorageError::AlreadyExists { code })) => {
                debug!(code = %code, attempt, "game code already taken; drawing another");
            }
            Err(err) => return Err(err.into()),
        }
    }

    warn!(attempts = MAX_CODE_ATTEMPTS, "could not allocate a free game code");
    Err(ServiceError::CodesExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    })
}

/// Current view of a game, attaching it from the store when needed.
pub async fn get_game(state: &SharedState, code: &str) -> Result<GameView, ServiceError> {
    let session = attach(state, code).await?;
    let engine = session.engine().lock().await;
    Ok(GameView::from(&*engine))
}

/// Remove a game from the store and detach it.
pub async fn delete_game(state: &SharedState, code: &str) -> Result<(), ServiceError> {
    let code = parse_code(code)?;
    let sync = state.require_sync().await?;
    let existed = sync.delete(&code).await?;

    if let Some(session) = state.detach_session(&code) {
        sse_events::broadcast_game_closed(&session, "game deleted");
    }

    if !existed {
        return Err(ServiceError::NotFound(format!("game `{code}` not found")));
    }
    info!(code = %code, "game deleted");
    Ok(())
}

/// Apply a scorer command and push the resulting snapshot.
///
/// The engine lock is held until the store answers, so snapshots of one game reach the
/// store in the order they were produced. A failed push keeps the new local state.
pub async fn execute_command(
    state: &SharedState,
    code: &str,
    command: GameCommand,
) -> Result<CommandOutcome, ServiceError> {
    let session = attach(state, code).await?;
    let name = command.name();

    let mut engine = session.engine().lock().await;
    command.apply(&mut engine)?.into_result()?;
    session.take_control();
    let sync = persist_snapshot(state, engine.game()).await;
    let view = GameView::from(&*engine);
    drop(engine);

    debug!(code = %session.code(), command = name, persisted = sync.persisted, "command applied");
    Ok(CommandOutcome { game: view, sync })
}

/// Add a player to a side's roster.
pub async fn add_player(
    state: &SharedState,
    code: &str,
    side: Side,
    input: PlayerInput,
) -> Result<CommandOutcome, ServiceError> {
    let session = attach(state, code).await?;

    let mut engine = session.engine().lock().await;
    engine.add_player(side, input.into()).into_result()?;
    session.take_control();
    let sync = persist_snapshot(state, engine.game()).await;
    let view = GameView::from(&*engine);
    drop(engine);

    Ok(CommandOutcome { game: view, sync })
}

/// Whether the game is over, and who won it.
pub async fn winner(state: &SharedState, code: &str) -> Result<WinnerResponse, ServiceError> {
    let session = attach(state, code).await?;
    let engine = session.engine().lock().await;
    let game_over = engine.game().status == GameStatus::Completed || engine.should_end_game();

    Ok(WinnerResponse {
        game_over,
        winner: decided_winner(engine.game(), engine.config()),
    })
}

/// Stored and derived stats of one player.
pub async fn player_stats(
    state: &SharedState,
    code: &str,
    side: Side,
    player_id: &str,
) -> Result<PlayerStatsResponse, ServiceError> {
    let session = attach(state, code).await?;
    let engine = session.engine().lock().await;

    let not_found = || ServiceError::NotFound(format!("player `{player_id}` not found on side {side}"));
    let player = engine.game().team(side).player(player_id).ok_or_else(not_found)?;
    let derived = engine.derived_stats(side, player_id).ok_or_else(not_found)?;

    Ok(PlayerStatsResponse {
        player_id: player.id.clone(),
        side,
        stats: player.stats.clone(),
        derived,
    })
}

/// Session of `code`, loading the game from the store when it is not attached yet.
pub async fn attach(state: &SharedState, code: &str) -> Result<Arc<GameSession>, ServiceError> {
    let code = parse_code(code)?;
    if let Some(session) = state.session(&code) {
        return Ok(session);
    }

    let sync = state.require_sync().await?;
    let Some(game) = sync.load(&code).await? else {
        return Err(ServiceError::NotFound(format!("game `{code}` not found")));
    };
    let config = state.registry().get(&game.sport)?;
    info!(code = %code, sport = %game.sport, "game loaded from store");

    Ok(attach_engine(state, &sync, GameEngine::new(game, config)))
}

/// Push a snapshot, turning failures into a sync status for the caller.
pub async fn persist_snapshot(state: &AppState, game: &Game) -> SyncStatus {
    match state.sync().await {
        Ok(sync) => SyncStatus::from_result(&sync.persist(game).await),
        Err(err) => {
            warn!(code = %game.code, error = %err, "snapshot kept local");
            SyncStatus::failed(err)
        }
    }
}

fn attach_engine(state: &SharedState, sync: &SyncAdapter, engine: GameEngine) -> Arc<GameSession> {
    let hub = SseHub::default();
    sse_events::spawn_snapshot_forwarder(&engine, hub.clone());

    let (session, attached) = state.attach_session(GameSession::new(engine, hub));
    if !attached {
        // another request won the race; our engine is dropped with its forwarder
        return session;
    }

    let weak_state = Arc::downgrade(state);
    let weak_session = Arc::downgrade(&session);
    let subscription = sync.subscribe(session.code().clone(), move |change| {
        on_remote_change(weak_state.clone(), weak_session.clone(), change)
    });
    session.set_watch(subscription);
    debug!(code = %session.code(), "game attached");

    session
}

async fn on_remote_change(
    state: Weak<AppState>,
    session: Weak<GameSession>,
    change: Option<Game>,
) {
    let Some(session) = session.upgrade() else {
        return;
    };

    match change {
        Some(remote) => {
            let mut engine = session.engine().lock().await;
            match reconcile(&mut engine, remote) {
                Ok(Reconciled::Applied) => {
                    if session.release_control() {
                        info!(code = %session.code(), "game scored elsewhere; local clocks stopped");
                    }
                    debug!(code = %session.code(), "applied remote snapshot");
                }
                Ok(Reconciled::Stale) => {}
                Err(err) => {
                    warn!(code = %session.code(), error = %err, "ignoring remote snapshot");
                }
            }
        }
        None => {
            sse_events::broadcast_game_closed(&session, "game no longer exists in store");
            if let Some(state) = state.upgrade() {
                state.detach_session(session.code());
            }
        }
    }
}

fn parse_code(code: &str) -> Result<GameCode, ServiceError> {
    GameCode::parse(code).map_err(|err| ServiceError::InvalidInput(err.to_string()))
}

fn check_rosters(setup: &GameSetup, config: &SportConfig) -> Result<(), ServiceError> {
    let max_players = config.rules.team.max_players as usize;

    for (side, team) in [(Side::A, &setup.team_a), (Side::B, &setup.team_b)] {
        if team.players.len() > max_players {
            return Err(ServiceError::InvalidInput(format!(
                "roster for side {side} is full ({max_players} players)"
            )));
        }

        let mut seen_ids = HashSet::new();
        for id in team.players.iter().filter_map(|player| player.id.as_deref()) {
            if !seen_ids.insert(id) {
                return Err(ServiceError::InvalidInput(format!(
                    "player `{id}` listed twice on side {side}"
                )));
            }
        }
    }

    Ok(())
}
