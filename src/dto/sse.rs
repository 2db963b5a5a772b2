use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::matches::{ClockSnapshot, MatchSnapshot},
    state::roster::{PlayerId, TeamId},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a player is disqualified.
pub struct PlayerDisqualifiedEvent {
    pub match_id: Uuid,
    pub player_id: PlayerId,
    pub team_id: TeamId,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when a team's lineup is registered.
pub struct LineupDeclaredEvent {
    pub match_id: Uuid,
    pub team_id: TeamId,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the clock starts, stops or is corrected.
pub struct ClockEvent {
    pub match_id: Uuid,
    pub period: u8,
    pub clock: ClockSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast after every accepted command and on connection.
pub struct SnapshotEvent(pub MatchSnapshot);
