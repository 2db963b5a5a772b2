use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dto::{
        matches::MatchSnapshot,
        sse::{ClockEvent, LineupDeclaredEvent, PlayerDisqualifiedEvent, ServerEvent, SnapshotEvent},
    },
    state::{
        SharedState,
        live_match::{CommandOutcome, Notice},
    },
};

pub(crate) const EVENT_SNAPSHOT: &str = "match.snapshot";
const EVENT_PLAYER_DISQUALIFIED: &str = "player.disqualified";
const EVENT_CLOCK_STARTED: &str = "clock.started";
const EVENT_CLOCK_STOPPED: &str = "clock.stopped";
const EVENT_CLOCK_UPDATED: &str = "clock.updated";
const EVENT_MATCH_FINISHED: &str = "match.finished";
const EVENT_MATCH_CANCELLED: &str = "match.cancelled";
const EVENT_LINEUP_DECLARED: &str = "lineup.declared";

/// Publish everything an accepted command changed: its event, its notices, then the fresh snapshot.
///
/// A command that ends the match also closes its topic once the final snapshot is queued.
pub fn broadcast_outcome(state: &SharedState, snapshot: &MatchSnapshot, outcome: &CommandOutcome) {
    let match_id = snapshot.id;
    if let Some(event) = &outcome.event {
        send_match_event(state, match_id, event.name(), event);
    }

    for notice in &outcome.notices {
        match notice {
            Notice::MatchStarted => debug!(%match_id, "match started"),
            Notice::LineupDeclared { team_id } => send_match_event(
                state,
                match_id,
                EVENT_LINEUP_DECLARED,
                &LineupDeclaredEvent {
                    match_id,
                    team_id: *team_id,
                },
            ),
            Notice::ClockStarted => broadcast_clock(state, snapshot, EVENT_CLOCK_STARTED),
            Notice::ClockStopped => broadcast_clock(state, snapshot, EVENT_CLOCK_STOPPED),
            Notice::ClockUpdated => broadcast_clock(state, snapshot, EVENT_CLOCK_UPDATED),
            Notice::PlayerDisqualified { player_id, team_id } => send_match_event(
                state,
                match_id,
                EVENT_PLAYER_DISQUALIFIED,
                &PlayerDisqualifiedEvent {
                    match_id,
                    player_id: *player_id,
                    team_id: *team_id,
                },
            ),
            Notice::MatchFinished => {
                send_match_event(state, match_id, EVENT_MATCH_FINISHED, snapshot)
            }
            Notice::MatchCancelled => {
                send_match_event(state, match_id, EVENT_MATCH_CANCELLED, snapshot)
            }
        }
    }

    broadcast_snapshot(state, snapshot);

    let ended = outcome
        .notices
        .iter()
        .any(|notice| matches!(notice, Notice::MatchFinished | Notice::MatchCancelled));
    if ended {
        let closed = state.broadcaster().close_topic(match_id);
        debug!(%match_id, viewers = closed, "match over; closed its stream topic");
    }
}

/// Publish the full snapshot of a match to its viewers.
pub fn broadcast_snapshot(state: &SharedState, snapshot: &MatchSnapshot) {
    send_match_event(
        state,
        snapshot.id,
        EVENT_SNAPSHOT,
        &SnapshotEvent(snapshot.clone()),
    );
}

fn broadcast_clock(state: &SharedState, snapshot: &MatchSnapshot, name: &str) {
    let payload = ClockEvent {
        match_id: snapshot.id,
        period: snapshot.period,
        clock: snapshot.clock.clone(),
    };
    send_match_event(state, snapshot.id, name, &payload);
}

fn send_match_event(state: &SharedState, match_id: Uuid, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => {
            state.broadcaster().publish(match_id, event);
        }
        Err(err) => warn!(%match_id, event, error = %err, "failed to serialize match SSE payload"),
    }
}
