use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        format_system_time,
        validation::{validate_distinct_players, validate_foul_type},
    },
    state::{
        events::MatchEvent,
        live_match::{LiveMatch, TeamSide},
        roster::{FoulType, PlayerId, RosterEntry, TeamId},
        rules::{ClockSource, MatchRules},
        state_machine::MatchStatus,
    },
};

/// Payload used to schedule a match.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ScheduleMatchRequest {
    /// Optional identifier chosen by the caller; generated when omitted.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    /// Rules for this match; the configured defaults apply when omitted.
    #[serde(default)]
    pub rules: Option<MatchRules>,
}

/// Players of one team and its starting five.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DeclareLineupRequest {
    pub team_id: TeamId,
    #[validate(
        length(min = 5, max = 15, message = "a lineup has 5 to 15 players"),
        custom(function = "validate_distinct_players")
    )]
    pub players: Vec<PlayerId>,
    #[validate(
        length(equal = 5, message = "exactly 5 starters are required"),
        custom(function = "validate_distinct_players")
    )]
    pub starters: Vec<PlayerId>,
}

/// New value of the game clock.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetClockRequest {
    /// Seconds remaining in the current period.
    pub remaining_secs: i64,
}

/// Elapsed time measured by the scorer's table.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct TickClockRequest {
    #[validate(range(min = 1, max = 3600))]
    pub elapsed_secs: u32,
}

/// Basket credited to a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordBasketRequest {
    pub player_id: PlayerId,
    #[validate(range(min = 1, max = 3, message = "a basket is worth 1, 2 or 3 points"))]
    pub points: u8,
    #[validate(range(min = 1))]
    pub period: u8,
    /// Game clock reading (seconds remaining) when the basket was scored.
    pub clock_secs: u32,
}

/// Foul charged to a player.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordFoulRequest {
    pub player_id: PlayerId,
    /// Score sheet code: P0, P1, P2, P3, T, U or D (case-insensitive).
    #[validate(custom(function = "validate_foul_type"))]
    pub foul_type: String,
    #[validate(range(min = 1))]
    pub period: u8,
    pub clock_secs: u32,
}

/// Players swapped on court.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordSubstitutionRequest {
    pub player_in: PlayerId,
    pub player_out: PlayerId,
    #[validate(range(min = 1))]
    pub period: u8,
    pub clock_secs: u32,
}

/// Player sent on court to fill an open slot.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FillVacancyRequest {
    pub player_in: PlayerId,
    #[validate(range(min = 1))]
    pub period: u8,
    pub clock_secs: u32,
}

/// Timeout called by a team.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RecordTimeoutRequest {
    pub team_id: TeamId,
    #[validate(range(min = 1))]
    pub period: u8,
    pub clock_secs: u32,
}

/// Move to the next period.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ChangePeriodRequest {
    #[validate(range(min = 1))]
    pub new_period: u8,
}

/// Complete, consistent read of a match at one point in time.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchSnapshot {
    pub id: Uuid,
    pub status: MatchStatus,
    /// Number of accepted commands; increases with every change.
    pub version: u64,
    pub period: u8,
    pub overtime: bool,
    pub home: TeamSnapshot,
    pub away: TeamSnapshot,
    pub clock: ClockSnapshot,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<String>,
}

/// One team inside a snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TeamSnapshot {
    pub team_id: TeamId,
    pub score: u32,
    pub timeouts_remaining: u8,
    /// Team fouls in the current period.
    pub team_fouls: u8,
    pub lineup_declared: bool,
    pub on_court: Vec<PlayerLine>,
}

/// On-court player with the stats viewers follow live.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerLine {
    pub player_id: PlayerId,
    pub points: u32,
    pub personal_fouls: u8,
    pub playing_time_secs: u32,
}

/// Game clock inside a snapshot.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClockSnapshot {
    pub remaining_secs: u32,
    pub running: bool,
    pub source: ClockSource,
}

/// Response returned by every accepted command.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CommandResponse {
    pub snapshot: MatchSnapshot,
    /// Event appended by the command, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<MatchEvent>,
}

/// Short description of a match for listings.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MatchSummary {
    pub id: Uuid,
    pub status: MatchStatus,
    pub period: u8,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: u32,
    pub away_score: u32,
}

/// Every declared player of a match with full box score.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterResponse {
    pub match_id: Uuid,
    pub players: Vec<RosterLine>,
}

/// Box score line of one player.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RosterLine {
    pub player_id: PlayerId,
    pub team_id: TeamId,
    pub is_starter: bool,
    pub is_on_court: bool,
    pub personal_fouls: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_foul: Option<FoulType>,
    pub free_throws: u32,
    pub two_pointers: u32,
    pub three_pointers: u32,
    pub points: u32,
    pub playing_time_secs: u32,
    pub is_disqualified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_period: Option<u8>,
}

impl From<&LiveMatch> for MatchSnapshot {
    fn from(live: &LiveMatch) -> Self {
        let clock = live.clock();
        Self {
            id: live.id(),
            status: live.status(),
            version: live.version(),
            period: live.period(),
            overtime: live.rules().is_overtime(live.period()),
            home: team_snapshot(live, TeamSide::Home),
            away: team_snapshot(live, TeamSide::Away),
            clock: ClockSnapshot {
                remaining_secs: clock.remaining_secs(),
                running: clock.is_running(),
                source: clock.source(),
            },
            created_at: format_system_time(live.created_at()),
            started_at: live.started_at().map(format_system_time),
            finished_at: live.finished_at().map(format_system_time),
        }
    }
}

fn team_snapshot(live: &LiveMatch, side: TeamSide) -> TeamSnapshot {
    let team = live.team(side);
    let mark = live.current_mark();
    TeamSnapshot {
        team_id: team.team_id,
        score: team.score,
        timeouts_remaining: team.timeouts_remaining,
        team_fouls: team.fouls_in(live.period()),
        lineup_declared: live.roster().has_team(team.team_id),
        on_court: live
            .roster()
            .on_court(team.team_id)
            .map(|entry| PlayerLine {
                player_id: entry.player_id,
                points: entry.points,
                personal_fouls: entry.personal_fouls,
                playing_time_secs: entry.playing_time_at(mark),
            })
            .collect(),
    }
}

impl From<&LiveMatch> for MatchSummary {
    fn from(live: &LiveMatch) -> Self {
        let home = live.team(TeamSide::Home);
        let away = live.team(TeamSide::Away);
        Self {
            id: live.id(),
            status: live.status(),
            period: live.period(),
            home_team_id: home.team_id,
            away_team_id: away.team_id,
            home_score: home.score,
            away_score: away.score,
        }
    }
}

impl From<&LiveMatch> for RosterResponse {
    fn from(live: &LiveMatch) -> Self {
        let mark = live.current_mark();
        Self {
            match_id: live.id(),
            players: live
                .roster()
                .entries()
                .map(|entry| RosterLine::new(entry, mark))
                .collect(),
        }
    }
}

impl RosterLine {
    fn new(entry: &RosterEntry, mark: u32) -> Self {
        Self {
            player_id: entry.player_id,
            team_id: entry.team_id,
            is_starter: entry.is_starter,
            is_on_court: entry.is_on_court,
            personal_fouls: entry.personal_fouls,
            last_foul: entry.last_foul,
            free_throws: entry.made.free_throws,
            two_pointers: entry.made.two_pointers,
            three_pointers: entry.made.three_pointers,
            points: entry.points,
            playing_time_secs: entry.playing_time_at(mark),
            is_disqualified: entry.is_disqualified,
            first_period: entry.first_period,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use validator::Validate;

    use super::*;

    #[test]
    fn lineup_request_rejects_duplicates_and_short_benches() {
        let request = DeclareLineupRequest {
            team_id: 1,
            players: vec![1, 2, 3, 4, 5, 5],
            starters: vec![1, 2, 3, 4, 5],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("players"));

        let request = DeclareLineupRequest {
            team_id: 1,
            players: vec![1, 2, 3],
            starters: vec![1, 2, 3],
        };
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("players"));
        assert!(errors.field_errors().contains_key("starters"));
    }

    #[test]
    fn foul_request_checks_the_code() {
        let request = RecordFoulRequest {
            player_id: 4,
            foul_type: "x".into(),
            period: 1,
            clock_secs: 100,
        };
        assert!(request.validate().is_err());
        let request = RecordFoulRequest {
            foul_type: "u".into(),
            ..request
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn basket_request_bounds_points() {
        let request = RecordBasketRequest {
            player_id: 4,
            points: 4,
            period: 1,
            clock_secs: 100,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn snapshot_lists_on_court_players_per_team() {
        let now = Instant::now();
        let mut live = LiveMatch::schedule(Uuid::new_v4(), 7, 9, MatchRules::default()).unwrap();
        live.declare_lineup(7, &[1, 2, 3, 4, 5, 6], &[1, 2, 3, 4, 5], now)
            .unwrap();
        live.start_clock(now).unwrap();
        live.record_basket(2, 3, 1, 550, now).unwrap();

        let snapshot = MatchSnapshot::from(&live);
        assert_eq!(snapshot.status, MatchStatus::InProgress);
        assert_eq!(snapshot.home.score, 3);
        assert_eq!(snapshot.home.on_court.len(), 5);
        assert!(snapshot.home.lineup_declared);
        assert!(!snapshot.away.lineup_declared);
        assert!(snapshot.away.on_court.is_empty());
        assert!(snapshot.clock.running);
        assert!(snapshot.started_at.is_some());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["status"], "in_progress");
        assert!(json.get("finished_at").is_none());
    }

    #[test]
    fn roster_response_carries_box_score() {
        let now = Instant::now();
        let mut live = LiveMatch::schedule(Uuid::new_v4(), 7, 9, MatchRules::default()).unwrap();
        live.declare_lineup(7, &[1, 2, 3, 4, 5, 6], &[1, 2, 3, 4, 5], now)
            .unwrap();
        live.start_clock(now).unwrap();
        live.record_basket(1, 2, 1, 500, now).unwrap();
        live.record_foul(6, "T", 1, 500, now).unwrap();

        let roster = RosterResponse::from(&live);
        assert_eq!(roster.players.len(), 6);
        let scorer = roster.players.iter().find(|line| line.player_id == 1).unwrap();
        assert_eq!(scorer.two_pointers, 1);
        assert_eq!(scorer.points, 2);
        let bench = roster.players.iter().find(|line| line.player_id == 6).unwrap();
        assert_eq!(bench.last_foul, Some(FoulType::T));
        assert!(!bench.is_on_court);
    }
}
