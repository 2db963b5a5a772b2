//! Live match commands and queries.
//!
//! Every command runs under the match's own lock: the mutation, the persistence
//! hand-off and the broadcast all happen before the lock is released, so viewers
//! and the store see changes in command order. None of those steps awaits I/O.

use std::time::Instant;

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dao::models::MatchEntity,
    dto::matches::{
        ChangePeriodRequest, CommandResponse, DeclareLineupRequest, FillVacancyRequest,
        MatchSnapshot, MatchSummary, RecordBasketRequest, RecordFoulRequest,
        RecordSubstitutionRequest, RecordTimeoutRequest, RosterResponse, ScheduleMatchRequest,
        SetClockRequest, TickClockRequest,
    },
    error::ServiceError,
    services::{
        persistence::PersistJob,
        sse_events::{broadcast_outcome, broadcast_snapshot},
    },
    state::{
        SharedState,
        error::MatchResult,
        events::MatchEvent,
        live_match::{CommandOutcome, LiveMatch, Notice},
    },
};

/// Schedule a new match and register it in memory.
pub async fn schedule_match(
    state: &SharedState,
    request: ScheduleMatchRequest,
) -> Result<MatchSnapshot, ServiceError> {
    let id = request.id.unwrap_or_else(Uuid::new_v4);
    if state.contains_match(id) {
        return Err(ServiceError::InvalidInput(format!(
            "match {id} already exists"
        )));
    }
    let rules = request
        .rules
        .unwrap_or_else(|| state.config().default_rules().clone());

    let live = LiveMatch::schedule(id, request.home_team_id, request.away_team_id, rules)?;
    let handle = state.insert_match(live);
    let live = handle.lock().await;
    let snapshot = MatchSnapshot::from(&*live);
    state.persistence().enqueue(PersistJob {
        entity: MatchEntity::from(&*live),
        event: None,
    });
    info!(
        match_id = %id,
        home_team_id = request.home_team_id,
        away_team_id = request.away_team_id,
        "match scheduled"
    );
    Ok(snapshot)
}

/// Register a team's players and starting five.
pub async fn declare_lineup(
    state: &SharedState,
    id: Uuid,
    request: DeclareLineupRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.declare_lineup(request.team_id, &request.players, &request.starters, now)
    })
    .await
}

/// Start the game clock; the first start puts the match in progress.
pub async fn start_clock(state: &SharedState, id: Uuid) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| live.start_clock(now)).await
}

/// Stop the game clock.
pub async fn stop_clock(state: &SharedState, id: Uuid) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| live.stop_clock(now)).await
}

/// Correct the remaining time of the current period.
pub async fn set_clock(
    state: &SharedState,
    id: Uuid,
    request: SetClockRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.set_clock(request.remaining_secs, now)
    })
    .await
}

/// Apply elapsed time reported by the scorer's table.
pub async fn tick_clock(
    state: &SharedState,
    id: Uuid,
    request: TickClockRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.tick_clock(request.elapsed_secs, now)
    })
    .await
}

/// Credit a basket to an on-court player.
pub async fn record_basket(
    state: &SharedState,
    id: Uuid,
    request: RecordBasketRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.record_basket(
            request.player_id,
            request.points,
            request.period,
            request.clock_secs,
            now,
        )
    })
    .await
}

/// Charge a foul to a player.
pub async fn record_foul(
    state: &SharedState,
    id: Uuid,
    request: RecordFoulRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.record_foul(
            request.player_id,
            &request.foul_type,
            request.period,
            request.clock_secs,
            now,
        )
    })
    .await
}

/// Swap two players of the same team.
pub async fn record_substitution(
    state: &SharedState,
    id: Uuid,
    request: RecordSubstitutionRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.record_substitution(
            request.player_in,
            request.player_out,
            request.period,
            request.clock_secs,
            now,
        )
    })
    .await
}

/// Send a player on court into an open slot.
pub async fn fill_vacancy(
    state: &SharedState,
    id: Uuid,
    request: FillVacancyRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.fill_vacancy(request.player_in, request.period, request.clock_secs, now)
    })
    .await
}

/// Charge a timeout to a team.
pub async fn record_timeout(
    state: &SharedState,
    id: Uuid,
    request: RecordTimeoutRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| {
        live.record_timeout(request.team_id, request.period, request.clock_secs, now)
    })
    .await
}

/// Move to the next period, or finish the match when the result is decided.
pub async fn change_period(
    state: &SharedState,
    id: Uuid,
    request: ChangePeriodRequest,
) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| live.change_period(request.new_period, now)).await
}

/// Finish the match whatever the score.
pub async fn end_match(state: &SharedState, id: Uuid) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| live.end_match(now)).await
}

/// Call the match off.
pub async fn cancel_match(state: &SharedState, id: Uuid) -> Result<CommandResponse, ServiceError> {
    run_command(state, id, |live, now| live.cancel(now)).await
}

/// Current snapshot of a match.
pub async fn get_snapshot(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    let handle = state.match_handle(id)?;
    let mut live = handle.lock().await;
    if live.sync_clock(Instant::now()) {
        publish_clock_expiry(state, &live);
    }
    Ok(MatchSnapshot::from(&*live))
}

/// Summaries of every loaded match, oldest first.
pub async fn list_matches(state: &SharedState) -> Vec<MatchSummary> {
    let mut summaries = Vec::new();
    for handle in state.match_handles() {
        let live = handle.lock().await;
        summaries.push((live.created_at(), MatchSummary::from(&*live)));
    }
    summaries.sort_by_key(|(created_at, _)| *created_at);
    summaries.into_iter().map(|(_, summary)| summary).collect()
}

/// Event log of a match in chronological order.
pub async fn list_events(state: &SharedState, id: Uuid) -> Result<Vec<MatchEvent>, ServiceError> {
    let handle = state.match_handle(id)?;
    let live = handle.lock().await;
    Ok(live.chronological_events())
}

/// Full roster with box score lines.
pub async fn get_roster(state: &SharedState, id: Uuid) -> Result<RosterResponse, ServiceError> {
    let handle = state.match_handle(id)?;
    let mut live = handle.lock().await;
    if live.sync_clock(Instant::now()) {
        publish_clock_expiry(state, &live);
    }
    Ok(RosterResponse::from(&*live))
}

/// Load a persisted match back into memory. A match already loaded is left untouched.
pub async fn restore_match(state: &SharedState, id: Uuid) -> Result<MatchSnapshot, ServiceError> {
    if state.contains_match(id) {
        return get_snapshot(state, id).await;
    }

    let store = state.store();
    let Some(entity) = store.find_match(id).await? else {
        return Err(ServiceError::NotFound(format!("match {id} was never stored")));
    };
    let events = store.list_events(id).await?;
    if events.len() as u64 > entity.version {
        warn!(match_id = %id, events = events.len(), version = entity.version, "stored event log is ahead of the match state");
    }

    let handle = state.insert_match(entity.into_live_match(events));
    let live = handle.lock().await;
    let snapshot = MatchSnapshot::from(&*live);
    broadcast_snapshot(state, &snapshot);
    info!(match_id = %id, status = ?live.status(), "match restored from storage");
    Ok(snapshot)
}

/// Persist and announce a period clock that ran out between commands.
///
/// Called under the match lock by reads that sync the clock. No command ran, so
/// the version stays as it is.
pub(crate) fn publish_clock_expiry(state: &SharedState, live: &LiveMatch) {
    let snapshot = MatchSnapshot::from(live);
    state.persistence().enqueue(PersistJob {
        entity: MatchEntity::from(live),
        event: None,
    });
    broadcast_outcome(
        state,
        &snapshot,
        &CommandOutcome {
            event: None,
            notices: vec![Notice::ClockStopped],
        },
    );
    info!(match_id = %snapshot.id, period = snapshot.period, "period clock ran out");
}

/// Run one command under the match lock, then persist and broadcast its outcome.
async fn run_command<F>(
    state: &SharedState,
    id: Uuid,
    command: F,
) -> Result<CommandResponse, ServiceError>
where
    F: FnOnce(&mut LiveMatch, Instant) -> MatchResult<CommandOutcome>,
{
    let handle = state.match_handle(id)?;
    let mut live = handle.lock().await;

    let outcome = command(&mut *live, Instant::now())?;
    let snapshot = MatchSnapshot::from(&*live);
    state.persistence().enqueue(PersistJob {
        entity: MatchEntity::from(&*live),
        event: outcome.event.clone(),
    });
    broadcast_outcome(state, &snapshot, &outcome);
    drop(live);

    if let Some(event) = &outcome.event {
        info!(match_id = %id, event = event.name(), version = snapshot.version, "match event recorded");
    }
    Ok(CommandResponse {
        snapshot,
        event: outcome.event,
    })
}
