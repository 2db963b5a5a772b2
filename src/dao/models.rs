use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::{
    events::MatchEvent,
    live_match::{LiveMatch, RestoredMatch, TeamSide, TeamState},
    roster::{FoulType, MadeBaskets, PlayerId, Roster, RosterEntry, TeamId},
    rules::MatchRules,
    state_machine::MatchStatus,
};

/// Persisted form of a live match, without its event log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Stable identifier for the match.
    pub id: Uuid,
    /// Status at the time of the save.
    pub status: MatchStatus,
    /// Number of accepted commands at the time of the save.
    pub version: u64,
    /// Current period.
    pub period: u8,
    /// Rules the match is played under.
    pub rules: MatchRules,
    /// Home team totals.
    pub home: TeamStateEntity,
    /// Away team totals.
    pub away: TeamStateEntity,
    /// Every declared player.
    pub roster: Vec<RosterEntryEntity>,
    /// Remaining seconds on the game clock.
    pub clock_remaining_secs: u32,
    /// Creation time.
    pub created_at: SystemTime,
    /// Tip-off time.
    pub started_at: Option<SystemTime>,
    /// Final whistle or cancellation time.
    pub finished_at: Option<SystemTime>,
    /// Time of this save.
    pub updated_at: SystemTime,
}

/// Team totals as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TeamStateEntity {
    pub team_id: TeamId,
    pub score: u32,
    pub timeouts_remaining: u8,
    pub fouls_by_period: Vec<u8>,
}

/// Roster line as stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RosterEntryEntity {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub is_starter: bool,
    pub is_on_court: bool,
    pub personal_fouls: u8,
    pub last_foul: Option<FoulType>,
    pub made: MadeBaskets,
    pub points: u32,
    /// Playing time including any stint still running at save time.
    pub playing_time_secs: u32,
    pub is_disqualified: bool,
    pub first_period: Option<u8>,
}

impl From<&TeamState> for TeamStateEntity {
    fn from(team: &TeamState) -> Self {
        Self {
            team_id: team.team_id,
            score: team.score,
            timeouts_remaining: team.timeouts_remaining,
            fouls_by_period: team.fouls_by_period.clone(),
        }
    }
}

impl From<TeamStateEntity> for TeamState {
    fn from(entity: TeamStateEntity) -> Self {
        Self {
            team_id: entity.team_id,
            score: entity.score,
            timeouts_remaining: entity.timeouts_remaining,
            fouls_by_period: entity.fouls_by_period,
        }
    }
}

impl RosterEntryEntity {
    fn capture(entry: &RosterEntry, mark: u32) -> Self {
        Self {
            player_id: entry.player_id,
            team_id: entry.team_id,
            is_starter: entry.is_starter,
            is_on_court: entry.is_on_court,
            personal_fouls: entry.personal_fouls,
            last_foul: entry.last_foul,
            made: entry.made,
            points: entry.points,
            playing_time_secs: entry.playing_time_at(mark),
            is_disqualified: entry.is_disqualified,
            first_period: entry.first_period,
        }
    }

    /// Rebuild the in-memory entry, reopening the stint of on-court players at `reopen_at`.
    fn into_entry(self, reopen_at: Option<u32>) -> RosterEntry {
        RosterEntry {
            player_id: self.player_id,
            team_id: self.team_id,
            is_starter: self.is_starter,
            is_on_court: self.is_on_court,
            personal_fouls: self.personal_fouls,
            last_foul: self.last_foul,
            made: self.made,
            points: self.points,
            playing_time_secs: self.playing_time_secs,
            is_disqualified: self.is_disqualified,
            first_period: self.first_period,
            on_court_since: reopen_at.filter(|_| self.is_on_court),
        }
    }
}

impl From<&LiveMatch> for MatchEntity {
    fn from(live: &LiveMatch) -> Self {
        let mark = live.current_mark();
        Self {
            id: live.id(),
            status: live.status(),
            version: live.version(),
            period: live.period(),
            rules: live.rules().clone(),
            home: live.team(TeamSide::Home).into(),
            away: live.team(TeamSide::Away).into(),
            roster: live
                .roster()
                .entries()
                .map(|entry| RosterEntryEntity::capture(entry, mark))
                .collect(),
            clock_remaining_secs: live.clock().remaining_secs(),
            created_at: live.created_at(),
            started_at: live.started_at(),
            finished_at: live.finished_at(),
            updated_at: SystemTime::now(),
        }
    }
}

impl MatchEntity {
    /// Rebuild the live match from this entity and its event log.
    pub fn into_live_match(self, events: Vec<MatchEvent>) -> LiveMatch {
        let played = self
            .rules
            .period_duration(self.period)
            .saturating_sub(self.clock_remaining_secs);
        let mark = self.rules.elapsed_before(self.period) + played;
        let reopen_at = (!self.status.is_terminal()).then_some(mark);
        let roster = Roster::from_entries(
            self.roster
                .into_iter()
                .map(|entity| entity.into_entry(reopen_at)),
        );

        LiveMatch::restore(RestoredMatch {
            id: self.id,
            status: self.status,
            version: self.version,
            period: self.period,
            rules: self.rules,
            home: self.home.into(),
            away: self.away.into(),
            roster,
            clock_remaining_secs: self.clock_remaining_secs,
            events,
            created_at: self.created_at,
            started_at: self.started_at,
            finished_at: self.finished_at,
        })
    }
}
