//! Append-only match event log: one record per accepted scoring action.

use std::{
    cmp::Reverse,
    time::{SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::state::roster::{FoulType, PlayerId, TeamId};

/// Points credited to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BasketEvent {
    /// Scorer.
    pub player_id: PlayerId,
    /// Value of the basket (1, 2 or 3).
    pub points: u8,
    /// Team score after the basket.
    pub team_score: u32,
}

/// Foul charged to a player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FoulEvent {
    /// Offender.
    pub player_id: PlayerId,
    /// Normalized foul code.
    pub foul_type: FoulType,
    /// Personal foul count after the foul.
    pub personal_fouls: u8,
    /// True when this foul disqualified the player.
    pub disqualified: bool,
}

/// Change of players on court.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubstitutionEvent {
    /// Player entering the court.
    pub player_in: PlayerId,
    /// Player leaving the court; absent when a vacant slot was filled.
    pub player_out: Option<PlayerId>,
}

/// Timeout charged to a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeoutEvent {
    /// Timeouts the team still has in the current bracket.
    pub remaining: u8,
    /// Length of the timeout in seconds.
    pub duration_secs: u32,
}

/// Transition between periods, or the end of the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PeriodChangeEvent {
    /// Period that ended.
    pub from: u8,
    /// Period that starts; absent when the match ended.
    pub to: Option<u8>,
    /// Whether the new period is an overtime period.
    pub overtime: bool,
}

/// Payload of a match event, one variant per kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MatchEventKind {
    /// Points scored.
    Basket(BasketEvent),
    /// Foul committed.
    Foul(FoulEvent),
    /// Players swapped or a vacancy filled.
    Substitution(SubstitutionEvent),
    /// Timeout called.
    Timeout(TimeoutEvent),
    /// Period changed or match ended.
    PeriodChange(PeriodChangeEvent),
}

/// Append-only entry of a match's event log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MatchEvent {
    /// Match the event belongs to.
    pub match_id: Uuid,
    /// Insertion order within the match, starting at 1.
    pub sequence: u64,
    /// Team concerned, when the event is team-specific.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    /// Period in which the event happened.
    pub period: u8,
    /// Game clock reading (seconds remaining in the period).
    pub clock_secs: u32,
    /// Wall-clock creation time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
    /// Event payload.
    #[serde(flatten)]
    pub kind: MatchEventKind,
}

impl MatchEvent {
    /// Build an event stamped with the current wall-clock time.
    pub fn new(
        match_id: Uuid,
        sequence: u64,
        team_id: Option<TeamId>,
        period: u8,
        clock_secs: u32,
        kind: MatchEventKind,
    ) -> Self {
        let created_at_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or(0);
        Self {
            match_id,
            sequence,
            team_id,
            period,
            clock_secs,
            created_at_ms,
            kind,
        }
    }

    /// Broadcast name of the event.
    pub fn name(&self) -> &'static str {
        match &self.kind {
            MatchEventKind::Basket(_) => "basket.scored",
            MatchEventKind::Foul(_) => "foul.committed",
            MatchEventKind::Substitution(_) => "substitution",
            MatchEventKind::Timeout(_) => "timeout.called",
            MatchEventKind::PeriodChange(_) => "period.changed",
        }
    }

    /// Chronological key: period, then game clock counting down, then insertion order.
    pub fn order_key(&self) -> (u8, Reverse<u32>, u64) {
        (self.period, Reverse(self.clock_secs), self.sequence)
    }
}
