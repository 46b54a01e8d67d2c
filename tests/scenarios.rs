use std::{sync::Arc, time::Duration};

use multisport_score_back::{
    config::AppConfig,
    dao::game_store::{GameStore, memory::MemoryGameStore},
    dto::{command::GameCommand, game::CreateGameRequest},
    error::ServiceError,
    services::game_service,
    sports::registry::{RegistryError, SportRegistry},
    state::{AppState, SharedState, game::Side},
};
use tokio::time::{sleep, timeout};

async fn backend(store: &MemoryGameStore) -> SharedState {
    let state = AppState::new(AppConfig::default(), SportRegistry::builtin(&[]).unwrap());
    state.set_game_store(Arc::new(store.clone())).await;
    state.update_degraded(false);
    state
}

fn request(sport: &str) -> CreateGameRequest {
    serde_json::from_value(serde_json::json!({
        "sport": sport,
        "gameName": "Friday league",
        "teamA": { "name": "Hawks" },
        "teamB": { "name": "Owls" }
    }))
    .unwrap()
}

async fn run(state: &SharedState, code: &str, command: GameCommand) {
    let outcome = game_service::execute_command(state, code, command)
        .await
        .unwrap();
    assert!(outcome.sync.persisted, "{:?}", outcome.sync.error);
}

#[tokio::test]
async fn basketball_scoring_and_undo() {
    let store = MemoryGameStore::new();
    let state = backend(&store).await;
    let view = game_service::create_game(&state, request("basketball"))
        .await
        .unwrap();
    let code = view.code.clone();

    run(&state, &code, GameCommand::Start).await;
    run(
        &state,
        &code,
        GameCommand::RecordScore {
            side: Side::A,
            action_id: "three_pointer".into(),
            player_id: None,
        },
    )
    .await;
    run(
        &state,
        &code,
        GameCommand::RecordViolation {
            side: Side::A,
            violation_id: "personal_foul".into(),
            player_id: None,
        },
    )
    .await;

    let view = game_service::get_game(&state, &code).await.unwrap();
    assert_eq!((view.score_a, view.score_b), (3, 1));

    run(&state, &code, GameCommand::UndoLastAction).await;

    let game = game_service::get_game(&state, &code).await.unwrap().game;
    assert_eq!(game.team(Side::A).score, 3);
    assert_eq!(game.team(Side::B).score, 0);
    assert_eq!(game.action_log.len(), 2);
    assert!(game.action_log[1].undone);
    assert!(!game.action_log[0].undone);
    // undo only reverts the score
    assert_eq!(
        game.team(Side::A).stats.number("foulsThisQuarter"),
        Some(1)
    );

    let stored = store.find_game(game.code.clone()).await.unwrap().unwrap();
    assert_eq!(stored.last_update, game.last_update);
}

#[tokio::test]
async fn unknown_sport_is_refused() {
    let store = MemoryGameStore::new();
    let state = backend(&store).await;

    let err = game_service::create_game(&state, request("curling"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Registry(RegistryError::UnknownSport(ref sport)) if sport == "curling"
    ));
    assert!(store.is_empty());
}

#[tokio::test]
async fn remote_changes_reach_other_instances() {
    let store = MemoryGameStore::new();
    let scorer = backend(&store).await;
    let viewer = backend(&store).await;

    let code = game_service::create_game(&scorer, request("basketball"))
        .await
        .unwrap()
        .code;
    game_service::get_game(&viewer, &code).await.unwrap();

    run(&scorer, &code, GameCommand::Start).await;
    run(
        &scorer,
        &code,
        GameCommand::RecordScore {
            side: Side::B,
            action_id: "three_pointer".into(),
            player_id: None,
        },
    )
    .await;

    timeout(Duration::from_secs(2), async {
        loop {
            let view = game_service::get_game(&viewer, &code).await.unwrap();
            if view.score_b == 3 {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("viewer never saw the remote score");

    let local = game_service::get_game(&scorer, &code).await.unwrap().game;
    let remote = game_service::get_game(&viewer, &code).await.unwrap().game;
    assert_eq!(local, remote);
}

#[tokio::test]
async fn offline_store_keeps_local_state() {
    let store = MemoryGameStore::new();
    let state = backend(&store).await;
    let code = game_service::create_game(&state, request("basketball"))
        .await
        .unwrap()
        .code;
    run(&state, &code, GameCommand::Start).await;

    store.set_online(false);
    let outcome = game_service::execute_command(
        &state,
        &code,
        GameCommand::RecordScore {
            side: Side::A,
            action_id: "free_throw".into(),
            player_id: None,
        },
    )
    .await
    .unwrap();

    assert!(!outcome.sync.persisted);
    assert!(outcome.sync.error.is_some());
    assert_eq!(outcome.game.score_a, 1);

    store.set_online(true);
    let stored = store.find_game(outcome.game.game.code.clone()).await.unwrap().unwrap();
    assert_eq!(stored.team(Side::A).score, 0);
}

#[tokio::test]
async fn commands_need_a_live_game() {
    let store = MemoryGameStore::new();
    let state = backend(&store).await;
    let code = game_service::create_game(&state, request("badminton"))
        .await
        .unwrap()
        .code;

    let err = game_service::execute_command(&state, &code, GameCommand::UndoLastAction)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Rejected(_)));
}
