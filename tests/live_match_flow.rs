use std::sync::Arc;

use courtside_back::{
    config::AppConfig,
    dao::match_store::{MatchStore, MemoryMatchStore},
    dto::matches::{
        ChangePeriodRequest, DeclareLineupRequest, FillVacancyRequest, RecordBasketRequest,
        RecordFoulRequest, RecordSubstitutionRequest, RecordTimeoutRequest, ScheduleMatchRequest,
        SetClockRequest,
    },
    error::ServiceError,
    services::{match_service, sse_service},
    state::{AppState, SharedState, state_machine::MatchStatus},
};
use uuid::Uuid;

const HOME: u32 = 1;
const AWAY: u32 = 2;

async fn live_match(state: &SharedState) -> Uuid {
    let id = match_service::schedule_match(
        state,
        ScheduleMatchRequest {
            id: None,
            home_team_id: HOME,
            away_team_id: AWAY,
            rules: None,
        },
    )
    .await
    .unwrap()
    .id;

    for (team_id, first) in [(HOME, 10), (AWAY, 20)] {
        match_service::declare_lineup(
            state,
            id,
            DeclareLineupRequest {
                team_id,
                players: (first..first + 8).collect(),
                starters: (first..first + 5).collect(),
            },
        )
        .await
        .unwrap();
    }
    match_service::start_clock(state, id).await.unwrap();
    id
}

fn foul(player_id: u32, foul_type: &str) -> RecordFoulRequest {
    RecordFoulRequest {
        player_id,
        foul_type: foul_type.into(),
        period: 1,
        clock_secs: 400,
    }
}

#[tokio::test]
async fn full_match_is_scored_broadcast_and_persisted() {
    let store = MemoryMatchStore::new();
    let (state, worker) = AppState::new(
        AppConfig::with_scorer_token("scorer"),
        Arc::new(store.clone()),
    );
    let worker = tokio::spawn(worker.run());

    let id = live_match(&state).await;
    let mut viewer = sse_service::subscribe_match(&state, id).await.unwrap();
    let first = viewer.receiver.recv().await.unwrap();
    assert_eq!(first.event.as_deref(), Some("match.snapshot"));

    let response = match_service::record_basket(
        &state,
        id,
        RecordBasketRequest {
            player_id: 20,
            points: 3,
            period: 1,
            clock_secs: 540,
        },
    )
    .await
    .unwrap();
    assert_eq!(response.snapshot.away.score, 3);
    assert_eq!(
        viewer.receiver.recv().await.unwrap().event.as_deref(),
        Some("basket.scored")
    );

    // Fifth personal foul.
    for code in ["P0", "P1", "P2", "P3"] {
        match_service::record_foul(&state, id, foul(12, code)).await.unwrap();
    }
    let response = match_service::record_foul(&state, id, foul(12, "p2"))
        .await
        .unwrap();
    assert_eq!(response.snapshot.home.on_court.len(), 4);
    assert!(
        response
            .snapshot
            .home
            .on_court
            .iter()
            .all(|line| line.player_id != 12)
    );

    let err = match_service::record_substitution(
        &state,
        id,
        RecordSubstitutionRequest {
            player_in: 12,
            player_out: 10,
            period: 1,
            clock_secs: 390,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotEligible(_)));

    match_service::fill_vacancy(
        &state,
        id,
        FillVacancyRequest {
            player_in: 15,
            period: 1,
            clock_secs: 390,
        },
    )
    .await
    .unwrap();

    match_service::set_clock(&state, id, SetClockRequest { remaining_secs: 0 })
        .await
        .unwrap();
    for new_period in 2..=4 {
        match_service::change_period(&state, id, ChangePeriodRequest { new_period })
            .await
            .unwrap();
    }
    let finished = match_service::change_period(&state, id, ChangePeriodRequest { new_period: 5 })
        .await
        .unwrap();
    assert_eq!(finished.snapshot.status, MatchStatus::Finished);

    let roster = match_service::get_roster(&state, id).await.unwrap();
    let disqualified = roster
        .players
        .iter()
        .find(|line| line.player_id == 12)
        .unwrap();
    assert!(disqualified.is_disqualified);
    assert_eq!(disqualified.personal_fouls, 5);

    let events = match_service::list_events(&state, id).await.unwrap();
    // basket, five fouls, vacancy, three period changes, final whistle
    assert_eq!(events.len(), 11);

    drop(viewer);
    drop(state);
    worker.await.unwrap();
    let stored = store.find_match(id).await.unwrap().unwrap();
    assert_eq!(stored.status, MatchStatus::Finished);
    assert_eq!(store.list_events(id).await.unwrap().len(), 11);
}

#[tokio::test]
async fn timeout_quota_and_finished_match_are_enforced() {
    let (state, _worker) = AppState::new(
        AppConfig::with_scorer_token("scorer"),
        Arc::new(MemoryMatchStore::new()),
    );
    let id = live_match(&state).await;

    let timeout = || RecordTimeoutRequest {
        team_id: HOME,
        period: 1,
        clock_secs: 300,
    };
    match_service::record_timeout(&state, id, timeout())
        .await
        .unwrap();
    match_service::record_timeout(&state, id, timeout())
        .await
        .unwrap();
    let err = match_service::record_timeout(&state, id, timeout())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::QuotaExceeded(_)));
    let snapshot = match_service::get_snapshot(&state, id).await.unwrap();
    assert_eq!(snapshot.home.timeouts_remaining, 0);

    match_service::end_match(&state, id).await.unwrap();
    let err = match_service::record_basket(
        &state,
        id,
        RecordBasketRequest {
            player_id: 10,
            points: 2,
            period: 1,
            clock_secs: 100,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    let err = match_service::record_substitution(
        &state,
        id,
        RecordSubstitutionRequest {
            player_in: 10,
            player_out: 10,
            period: 1,
            clock_secs: 100,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[tokio::test]
async fn matches_do_not_share_state() {
    let (state, _worker) = AppState::new(
        AppConfig::with_scorer_token("scorer"),
        Arc::new(MemoryMatchStore::new()),
    );
    let first = live_match(&state).await;
    let second = live_match(&state).await;

    match_service::record_basket(
        &state,
        first,
        RecordBasketRequest {
            player_id: 10,
            points: 2,
            period: 1,
            clock_secs: 500,
        },
    )
    .await
    .unwrap();

    let summaries = match_service::list_matches(&state).await;
    assert_eq!(summaries.len(), 2);
    let second_snapshot = match_service::get_snapshot(&state, second).await.unwrap();
    assert_eq!(second_snapshot.home.score, 0);
    assert_eq!(
        match_service::get_snapshot(&state, first)
            .await
            .unwrap()
            .home
            .score,
        2
    );
}
