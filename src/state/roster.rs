//! Per-match lineup tracking: who is on court, fouls, points and playing time.
//!
//! Entries live in a flat arena keyed by player id. Playing time is measured in
//! game seconds using "marks" (seconds of game time elapsed since tip-off), so
//! the tracker never reads a clock on its own.

use std::{fmt, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::error::{MatchError, MatchResult};

/// External identifier of a player.
pub type PlayerId = u32;
/// External identifier of a team.
pub type TeamId = u32;

/// Players a team may have on court at once.
pub const MAX_ON_COURT: usize = 5;
/// Personal fouls that disqualify a player.
pub const PERSONAL_FOUL_LIMIT: u8 = 5;

/// Foul codes used on the score sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum FoulType {
    /// Personal foul, no free throws.
    P0,
    /// Personal foul, one free throw.
    P1,
    /// Personal foul, two free throws.
    P2,
    /// Personal foul, three free throws.
    P3,
    /// Technical foul.
    T,
    /// Unsportsmanlike foul.
    U,
    /// Disqualifying foul.
    D,
}

impl FoulType {
    /// Whether the foul counts toward the personal foul limit.
    pub fn is_personal(self) -> bool {
        matches!(self, FoulType::P0 | FoulType::P1 | FoulType::P2 | FoulType::P3)
    }

    /// Score sheet code.
    pub fn as_str(self) -> &'static str {
        match self {
            FoulType::P0 => "P0",
            FoulType::P1 => "P1",
            FoulType::P2 => "P2",
            FoulType::P3 => "P3",
            FoulType::T => "T",
            FoulType::U => "U",
            FoulType::D => "D",
        }
    }
}

impl fmt::Display for FoulType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FoulType {
    type Err = MatchError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "P0" => Ok(FoulType::P0),
            "P1" => Ok(FoulType::P1),
            "P2" => Ok(FoulType::P2),
            "P3" => Ok(FoulType::P3),
            "T" => Ok(FoulType::T),
            "U" => Ok(FoulType::U),
            "D" => Ok(FoulType::D),
            other => Err(MatchError::InvalidArgument(format!(
                "unknown foul type `{other}`"
            ))),
        }
    }
}

/// Made baskets split by value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MadeBaskets {
    /// Made free throws (1 point).
    pub free_throws: u32,
    /// Made two-point field goals.
    pub two_pointers: u32,
    /// Made three-point field goals.
    pub three_pointers: u32,
}

/// What a foul did to the player it was charged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoulOutcome {
    /// Personal foul count after the foul.
    pub personal_fouls: u8,
    /// True when this foul disqualified the player.
    pub newly_disqualified: bool,
}

/// Per-match record of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    /// Player identifier.
    pub player_id: PlayerId,
    /// Team the player plays for in this match.
    pub team_id: TeamId,
    /// Part of the starting five.
    pub is_starter: bool,
    /// Currently on court.
    pub is_on_court: bool,
    /// Personal fouls charged (0 to 5).
    pub personal_fouls: u8,
    /// Most recent foul of any type.
    pub last_foul: Option<FoulType>,
    /// Made baskets by value.
    pub made: MadeBaskets,
    /// Total points scored.
    pub points: u32,
    /// Playing time of completed stints, in seconds.
    pub playing_time_secs: u32,
    /// Disqualified for the rest of the match.
    pub is_disqualified: bool,
    /// Period the player first stepped on court.
    pub first_period: Option<u8>,
    /// Game-time mark at which the current stint started.
    pub on_court_since: Option<u32>,
}

impl RosterEntry {
    /// Fresh bench entry.
    pub fn new(player_id: PlayerId, team_id: TeamId, is_starter: bool) -> Self {
        Self {
            player_id,
            team_id,
            is_starter,
            is_on_court: false,
            personal_fouls: 0,
            last_foul: None,
            made: MadeBaskets::default(),
            points: 0,
            playing_time_secs: 0,
            is_disqualified: false,
            first_period: None,
            on_court_since: None,
        }
    }

    /// Not disqualified, not already on court, and under the foul limit.
    pub fn can_enter_court(&self) -> bool {
        !self.is_disqualified && !self.is_on_court && self.personal_fouls < PERSONAL_FOUL_LIMIT
    }

    /// Put the player on court and start a stint at `mark`.
    pub fn enter_court(&mut self, period: u8, mark: u32) -> MatchResult<()> {
        if !self.can_enter_court() {
            return Err(MatchError::PlayerNotEligible(format!(
                "player {} cannot enter the court",
                self.player_id
            )));
        }
        self.is_on_court = true;
        self.on_court_since = Some(mark);
        self.first_period.get_or_insert(period);
        Ok(())
    }

    /// Close the running stint at `mark` without changing the on-court flag.
    pub fn close_stint(&mut self, mark: u32) {
        if let Some(since) = self.on_court_since.take() {
            self.playing_time_secs += mark.saturating_sub(since);
        }
    }

    /// Take the player off court, crediting the stint up to `mark`.
    pub fn exit_court(&mut self, mark: u32) {
        self.close_stint(mark);
        self.is_on_court = false;
    }

    /// Playing time including the running stint, as of `mark`.
    pub fn playing_time_at(&self, mark: u32) -> u32 {
        let running = self
            .on_court_since
            .map(|since| mark.saturating_sub(since))
            .unwrap_or(0);
        self.playing_time_secs + running
    }

    /// Charge a foul, disqualifying the player when the limit is reached.
    pub fn add_foul(&mut self, foul: FoulType, mark: u32) -> FoulOutcome {
        self.last_foul = Some(foul);
        if foul.is_personal() {
            self.personal_fouls = (self.personal_fouls + 1).min(PERSONAL_FOUL_LIMIT);
        }

        let reaches_limit = self.personal_fouls >= PERSONAL_FOUL_LIMIT || foul == FoulType::D;
        let newly_disqualified = reaches_limit && !self.is_disqualified;
        if reaches_limit {
            self.is_disqualified = true;
            if self.is_on_court {
                self.exit_court(mark);
            }
        }

        FoulOutcome {
            personal_fouls: self.personal_fouls,
            newly_disqualified,
        }
    }

    /// Credit a made basket worth `points`.
    pub fn add_basket(&mut self, points: u8) -> MatchResult<()> {
        match points {
            1 => self.made.free_throws += 1,
            2 => self.made.two_pointers += 1,
            3 => self.made.three_pointers += 1,
            other => {
                return Err(MatchError::InvalidArgument(format!(
                    "a basket is worth 1, 2 or 3 points, got {other}"
                )));
            }
        }
        self.points += u32::from(points);
        Ok(())
    }
}

/// Arena of roster entries for one match, keyed by player id.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: IndexMap<PlayerId, RosterEntry>,
}

impl Roster {
    /// Empty roster.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a roster from persisted entries.
    pub fn from_entries(entries: impl IntoIterator<Item = RosterEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (entry.player_id, entry))
                .collect(),
        }
    }

    /// Look up a player or fail with `NotFound`.
    pub fn get(&self, player_id: PlayerId) -> MatchResult<&RosterEntry> {
        self.entries
            .get(&player_id)
            .ok_or_else(|| MatchError::NotFound(format!("player {player_id} is not on a roster")))
    }

    /// Mutable lookup or `NotFound`.
    pub fn get_mut(&mut self, player_id: PlayerId) -> MatchResult<&mut RosterEntry> {
        self.entries
            .get_mut(&player_id)
            .ok_or_else(|| MatchError::NotFound(format!("player {player_id} is not on a roster")))
    }

    /// Whether a lineup was declared for `team_id`.
    pub fn has_team(&self, team_id: TeamId) -> bool {
        self.entries.values().any(|entry| entry.team_id == team_id)
    }

    /// All entries in declaration order.
    pub fn entries(&self) -> impl Iterator<Item = &RosterEntry> {
        self.entries.values()
    }

    /// Entries of one team in declaration order.
    pub fn team(&self, team_id: TeamId) -> impl Iterator<Item = &RosterEntry> {
        self.entries
            .values()
            .filter(move |entry| entry.team_id == team_id)
    }

    /// On-court entries of one team.
    pub fn on_court(&self, team_id: TeamId) -> impl Iterator<Item = &RosterEntry> {
        self.team(team_id).filter(|entry| entry.is_on_court)
    }

    /// Number of players of `team_id` on court.
    pub fn on_court_count(&self, team_id: TeamId) -> usize {
        self.on_court(team_id).count()
    }

    /// Register a team's players and put the starters on court at `mark`.
    pub fn declare_team(
        &mut self,
        team_id: TeamId,
        players: &[PlayerId],
        starters: &[PlayerId],
        period: u8,
        mark: u32,
    ) -> MatchResult<()> {
        if self.has_team(team_id) {
            return Err(MatchError::InvalidArgument(format!(
                "lineup for team {team_id} was already declared"
            )));
        }
        if starters.len() != MAX_ON_COURT {
            return Err(MatchError::InvalidArgument(format!(
                "exactly {MAX_ON_COURT} starters are required, got {}",
                starters.len()
            )));
        }

        let mut declared: IndexMap<PlayerId, RosterEntry> = IndexMap::new();
        for &player_id in players {
            if self.entries.contains_key(&player_id) {
                return Err(MatchError::InvalidArgument(format!(
                    "player {player_id} already belongs to a roster in this match"
                )));
            }
            let entry = RosterEntry::new(player_id, team_id, starters.contains(&player_id));
            if declared.insert(player_id, entry).is_some() {
                return Err(MatchError::InvalidArgument(format!(
                    "player {player_id} is listed twice"
                )));
            }
        }

        for (index, starter) in starters.iter().enumerate() {
            if starters[..index].contains(starter) {
                return Err(MatchError::InvalidArgument(format!(
                    "starter {starter} is listed twice"
                )));
            }
            let entry = declared.get_mut(starter).ok_or_else(|| {
                MatchError::InvalidArgument(format!(
                    "starter {starter} is not part of the declared players"
                ))
            })?;
            entry.enter_court(period, mark)?;
        }

        self.entries.extend(declared);
        Ok(())
    }

    /// Put `player_id` on court if eligible and the team has a free slot.
    pub fn enter(&mut self, player_id: PlayerId, period: u8, mark: u32) -> MatchResult<()> {
        let team_id = self.get(player_id)?.team_id;
        if self.on_court_count(team_id) >= MAX_ON_COURT {
            return Err(MatchError::PlayerNotEligible(format!(
                "team {team_id} already has {MAX_ON_COURT} players on court"
            )));
        }
        self.get_mut(player_id)?.enter_court(period, mark)
    }

    /// Move every running stint from `from` to `to`, crediting time up to `from`.
    pub fn rebase_stints(&mut self, from: u32, to: u32) {
        for entry in self.entries.values_mut().filter(|entry| entry.is_on_court) {
            entry.close_stint(from);
            entry.on_court_since = Some(to);
        }
    }

    /// Close every running stint at `mark`, leaving the final lineup flags intact.
    pub fn freeze(&mut self, mark: u32) {
        for entry in self.entries.values_mut() {
            entry.close_stint(mark);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_with_home_team() -> Roster {
        let mut roster = Roster::new();
        roster
            .declare_team(10, &[1, 2, 3, 4, 5, 6, 7], &[1, 2, 3, 4, 5], 1, 0)
            .unwrap();
        roster
    }

    #[test]
    fn foul_type_parsing_is_case_insensitive() {
        assert_eq!("p1".parse::<FoulType>().unwrap(), FoulType::P1);
        assert_eq!(" u ".parse::<FoulType>().unwrap(), FoulType::U);
        assert_eq!("D".parse::<FoulType>().unwrap(), FoulType::D);
        assert!(matches!(
            "P4".parse::<FoulType>(),
            Err(MatchError::InvalidArgument(_))
        ));
    }

    #[test]
    fn starters_are_on_court_after_declaration() {
        let roster = roster_with_home_team();
        assert_eq!(roster.on_court_count(10), 5);
        let starter = roster.get(1).unwrap();
        assert!(starter.is_starter);
        assert_eq!(starter.first_period, Some(1));
        let bench = roster.get(6).unwrap();
        assert!(!bench.is_on_court);
        assert_eq!(bench.first_period, None);
    }

    #[test]
    fn declaration_rejects_bad_starting_five() {
        let mut roster = Roster::new();
        let err = roster
            .declare_team(10, &[1, 2, 3, 4, 5], &[1, 2, 3, 4], 1, 0)
            .unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));

        let err = roster
            .declare_team(10, &[1, 2, 3, 4, 5], &[1, 2, 3, 4, 9], 1, 0)
            .unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));

        let err = roster
            .declare_team(10, &[1, 2, 3, 4, 5], &[1, 2, 3, 4, 4], 1, 0)
            .unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));
        assert_eq!(roster.entries().count(), 0);
    }

    #[test]
    fn player_cannot_join_both_teams() {
        let mut roster = roster_with_home_team();
        let err = roster
            .declare_team(20, &[7, 21, 22, 23, 24], &[7, 21, 22, 23, 24], 1, 0)
            .unwrap_err();
        assert!(matches!(err, MatchError::InvalidArgument(_)));
    }

    #[test]
    fn sixth_player_cannot_enter_a_full_court() {
        let mut roster = roster_with_home_team();
        let err = roster.enter(6, 1, 30).unwrap_err();
        assert!(matches!(err, MatchError::PlayerNotEligible(_)));
        assert_eq!(roster.on_court_count(10), 5);
    }

    #[test]
    fn exit_court_accumulates_playing_time() {
        let mut roster = roster_with_home_team();
        roster.get_mut(1).unwrap().exit_court(125);
        roster.enter(6, 1, 125).unwrap();
        roster.get_mut(6).unwrap().exit_court(200);
        roster.enter(1, 2, 650).unwrap();

        let starter = roster.get(1).unwrap();
        assert_eq!(starter.playing_time_secs, 125);
        assert_eq!(starter.playing_time_at(700), 175);
        assert_eq!(roster.get(6).unwrap().playing_time_secs, 75);
        assert_eq!(roster.get(6).unwrap().first_period, Some(1));
    }

    #[test]
    fn fifth_personal_foul_disqualifies_and_removes_player() {
        let mut roster = roster_with_home_team();
        let entry = roster.get_mut(2).unwrap();
        for _ in 0..4 {
            let outcome = entry.add_foul(FoulType::P1, 100);
            assert!(!outcome.newly_disqualified);
        }
        let outcome = entry.add_foul(FoulType::P2, 300);
        assert_eq!(outcome.personal_fouls, 5);
        assert!(outcome.newly_disqualified);
        assert!(entry.is_disqualified);
        assert!(!entry.is_on_court);
        assert_eq!(entry.playing_time_secs, 300);
        assert!(!entry.can_enter_court());
    }

    #[test]
    fn technical_fouls_do_not_count_as_personal() {
        let mut entry = RosterEntry::new(1, 10, false);
        entry.add_foul(FoulType::T, 0);
        entry.add_foul(FoulType::U, 0);
        assert_eq!(entry.personal_fouls, 0);
        assert_eq!(entry.last_foul, Some(FoulType::U));
        assert!(!entry.is_disqualified);
    }

    #[test]
    fn disqualifying_foul_is_immediate() {
        let mut entry = RosterEntry::new(1, 10, true);
        entry.enter_court(1, 0).unwrap();
        let outcome = entry.add_foul(FoulType::D, 60);
        assert!(outcome.newly_disqualified);
        assert_eq!(outcome.personal_fouls, 0);
        assert!(!entry.is_on_court);
    }

    #[test]
    fn add_basket_tracks_categories() {
        let mut entry = RosterEntry::new(1, 10, true);
        entry.add_basket(3).unwrap();
        entry.add_basket(2).unwrap();
        entry.add_basket(1).unwrap();
        entry.add_basket(2).unwrap();
        assert_eq!(entry.points, 8);
        assert_eq!(
            entry.made,
            MadeBaskets {
                free_throws: 1,
                two_pointers: 2,
                three_pointers: 1,
            }
        );
        assert!(entry.add_basket(4).is_err());
        assert_eq!(entry.points, 8);
    }

    #[test]
    fn rebase_skips_the_gap_between_periods() {
        let mut roster = roster_with_home_team();
        roster.rebase_stints(580, 600);
        roster.freeze(700);
        assert_eq!(roster.get(1).unwrap().playing_time_secs, 680);
        assert!(roster.get(1).unwrap().is_on_court);
    }
}
