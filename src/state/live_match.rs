//! Live match session: status, score, period, lineups and clock of one match.
//!
//! Every command follows the same shape: plan the status transition, validate
//! arguments against the current roster and clock, then mutate and append the
//! resulting event. Nothing is mutated before all checks have passed, so a
//! rejected command leaves the match untouched.

use std::time::{Instant, SystemTime};

use tracing::debug;
use uuid::Uuid;

use crate::state::{
    clock::GameClock,
    error::{MatchError, MatchResult},
    events::{
        BasketEvent, FoulEvent, MatchEvent, MatchEventKind, PeriodChangeEvent, SubstitutionEvent,
        TimeoutEvent,
    },
    roster::{FoulType, PlayerId, Roster, TeamId},
    rules::{ClockSource, MatchRules, TimeoutBracket},
    state_machine::{InvalidTransition, MatchAction, MatchStateMachine, MatchStatus, Plan},
};

/// Home or away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TeamSide {
    /// Home team.
    Home,
    /// Away team.
    Away,
}

/// Running totals of one team in a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamState {
    /// Team identifier.
    pub team_id: TeamId,
    /// Points scored.
    pub score: u32,
    /// Timeouts left in the current bracket.
    pub timeouts_remaining: u8,
    /// Team fouls, indexed by period - 1.
    pub fouls_by_period: Vec<u8>,
}

impl TeamState {
    /// Fresh team with the opening timeout allowance.
    pub fn new(team_id: TeamId, timeouts: u8) -> Self {
        Self {
            team_id,
            score: 0,
            timeouts_remaining: timeouts,
            fouls_by_period: Vec::new(),
        }
    }

    /// Team fouls committed in `period`.
    pub fn fouls_in(&self, period: u8) -> u8 {
        usize::from(period)
            .checked_sub(1)
            .and_then(|index| self.fouls_by_period.get(index))
            .copied()
            .unwrap_or(0)
    }

    fn add_foul(&mut self, period: u8) {
        let index = usize::from(period.max(1) - 1);
        if self.fouls_by_period.len() <= index {
            self.fouls_by_period.resize(index + 1, 0);
        }
        self.fouls_by_period[index] = self.fouls_by_period[index].saturating_add(1);
    }
}

/// Side effects of an accepted command that viewers are told about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A team's lineup was registered.
    LineupDeclared {
        /// Team whose lineup was declared.
        team_id: TeamId,
    },
    /// The match left the scheduled status.
    MatchStarted,
    /// The clock started running.
    ClockStarted,
    /// The clock stopped.
    ClockStopped,
    /// The remaining time was changed without starting or stopping the clock.
    ClockUpdated,
    /// A player was disqualified.
    PlayerDisqualified {
        /// Disqualified player.
        player_id: PlayerId,
        /// Team of the player.
        team_id: TeamId,
    },
    /// The match reached its final result.
    MatchFinished,
    /// The match was called off.
    MatchCancelled,
}

/// Result of an accepted command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Event appended to the log, if the command produces one.
    pub event: Option<MatchEvent>,
    /// Additional notifications for viewers.
    pub notices: Vec<Notice>,
}

/// Persisted parts needed to rebuild a live match.
#[derive(Debug, Clone)]
pub struct RestoredMatch {
    /// Match identifier.
    pub id: Uuid,
    /// Status when persisted.
    pub status: MatchStatus,
    /// Version when persisted.
    pub version: u64,
    /// Current period.
    pub period: u8,
    /// Rules of the match.
    pub rules: MatchRules,
    /// Home team totals.
    pub home: TeamState,
    /// Away team totals.
    pub away: TeamState,
    /// Roster arena.
    pub roster: Roster,
    /// Remaining seconds on the clock.
    pub clock_remaining_secs: u32,
    /// Event log.
    pub events: Vec<MatchEvent>,
    /// Creation time.
    pub created_at: SystemTime,
    /// Tip-off time.
    pub started_at: Option<SystemTime>,
    /// Final whistle time.
    pub finished_at: Option<SystemTime>,
}

/// Single logical unit of mutation for one match.
#[derive(Debug, Clone)]
pub struct LiveMatch {
    id: Uuid,
    machine: MatchStateMachine,
    rules: MatchRules,
    period: u8,
    home: TeamState,
    away: TeamState,
    roster: Roster,
    clock: GameClock,
    events: Vec<MatchEvent>,
    created_at: SystemTime,
    started_at: Option<SystemTime>,
    finished_at: Option<SystemTime>,
}

impl LiveMatch {
    /// Schedule a new match between two distinct teams.
    pub fn schedule(
        id: Uuid,
        home_team: TeamId,
        away_team: TeamId,
        rules: MatchRules,
    ) -> MatchResult<Self> {
        if home_team == away_team {
            return Err(MatchError::InvalidArgument(format!(
                "team {home_team} cannot play against itself"
            )));
        }
        rules.validate()?;

        let opening_quota = rules.timeout_quota(rules.timeout_bracket(1));
        Ok(Self {
            id,
            machine: MatchStateMachine::new(),
            period: 1,
            home: TeamState::new(home_team, opening_quota),
            away: TeamState::new(away_team, opening_quota),
            roster: Roster::new(),
            clock: GameClock::new(rules.period_duration(1), rules.clock_source),
            events: Vec::new(),
            created_at: SystemTime::now(),
            started_at: None,
            finished_at: None,
            rules,
        })
    }

    /// Rebuild a match from its persisted parts. The clock comes back stopped.
    pub fn restore(parts: RestoredMatch) -> Self {
        let mut clock = GameClock::new(parts.clock_remaining_secs, parts.rules.clock_source);
        clock.reset(parts.clock_remaining_secs);
        Self {
            id: parts.id,
            machine: MatchStateMachine::restore(parts.status, parts.version),
            rules: parts.rules,
            period: parts.period,
            home: parts.home,
            away: parts.away,
            roster: parts.roster,
            clock,
            events: parts.events,
            created_at: parts.created_at,
            started_at: parts.started_at,
            finished_at: parts.finished_at,
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// Match identifier.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current status.
    pub fn status(&self) -> MatchStatus {
        self.machine.status()
    }

    /// Number of accepted commands.
    pub fn version(&self) -> u64 {
        self.machine.version()
    }

    /// Current period (1-indexed).
    pub fn period(&self) -> u8 {
        self.period
    }

    /// Rules the match is played under.
    pub fn rules(&self) -> &MatchRules {
        &self.rules
    }

    /// Team totals for one side.
    pub fn team(&self, side: TeamSide) -> &TeamState {
        match side {
            TeamSide::Home => &self.home,
            TeamSide::Away => &self.away,
        }
    }

    /// Roster arena.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Game clock.
    pub fn clock(&self) -> &GameClock {
        &self.clock
    }

    /// Events in insertion order.
    pub fn events(&self) -> &[MatchEvent] {
        &self.events
    }

    /// Events ordered by period, game clock and insertion order.
    pub fn chronological_events(&self) -> Vec<MatchEvent> {
        let mut events = self.events.clone();
        events.sort_by_key(MatchEvent::order_key);
        events
    }

    /// Creation time.
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Tip-off time.
    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    /// Final whistle time.
    pub fn finished_at(&self) -> Option<SystemTime> {
        self.finished_at
    }

    /// Game seconds elapsed since tip-off at the current clock reading.
    pub fn current_mark(&self) -> u32 {
        self.mark_at(self.period, self.clock.remaining_secs())
    }

    /// Apply wall-clock time elapsed since the last command.
    ///
    /// Returns `true` when the period clock ran out and stopped during the sync.
    pub fn sync_clock(&mut self, now: Instant) -> bool {
        self.clock.sync(now)
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Register a team's players and starting five.
    pub fn declare_lineup(
        &mut self,
        team_id: TeamId,
        players: &[PlayerId],
        starters: &[PlayerId],
        now: Instant,
    ) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::DeclareLineup)?;
        self.side_of(team_id)?;
        let mut notices = self.synced_notices(now);

        let mark = self.current_mark();
        self.roster
            .declare_team(team_id, players, starters, self.period, mark)?;
        self.machine.apply(plan);

        notices.push(Notice::LineupDeclared { team_id });
        Ok(CommandOutcome {
            event: None,
            notices,
        })
    }

    /// Start the clock, moving a scheduled match into live play.
    pub fn start_clock(&mut self, now: Instant) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::StartClock)?;
        self.clock.sync(now);
        if self.clock.remaining_secs() == 0 {
            return Err(InvalidTransition {
                from: plan.from,
                action: plan.action,
                reason: "period clock has expired",
            }
            .into());
        }

        let mut notices = Vec::new();
        if plan.from == MatchStatus::Scheduled {
            self.started_at = Some(SystemTime::now());
            notices.push(Notice::MatchStarted);
        }
        self.machine.apply(plan);
        if self.clock.start(now) {
            notices.push(Notice::ClockStarted);
        }

        Ok(CommandOutcome {
            event: None,
            notices,
        })
    }

    /// Stop the clock. Stopping a stopped clock is accepted.
    pub fn stop_clock(&mut self, now: Instant) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::StopClock)?;
        self.machine.apply(plan);

        let mut notices = Vec::new();
        if self.clock.stop(now) {
            notices.push(Notice::ClockStopped);
        }
        Ok(CommandOutcome {
            event: None,
            notices,
        })
    }

    /// Overwrite the remaining time of the current period.
    pub fn set_clock(&mut self, remaining_secs: i64, now: Instant) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::SetClock)?;
        let duration = self.rules.period_duration(self.period);
        if remaining_secs > i64::from(duration) {
            return Err(MatchError::InvalidArgument(format!(
                "period {} lasts {duration}s, cannot show {remaining_secs}s",
                self.period
            )));
        }

        let was_running = self.clock.is_running();
        self.clock.sync(now);
        self.clock.set_remaining(remaining_secs)?;
        self.machine.apply(plan);

        let mut notices = vec![Notice::ClockUpdated];
        if was_running && !self.clock.is_running() {
            notices.push(Notice::ClockStopped);
        }
        Ok(CommandOutcome {
            event: None,
            notices,
        })
    }

    /// Apply externally measured elapsed time.
    pub fn tick_clock(&mut self, secs: u32, _now: Instant) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::TickClock)?;
        if self.clock.source() != ClockSource::ExternalTicks {
            return Err(InvalidTransition {
                from: plan.from,
                action: plan.action,
                reason: "clock is driven by wall-clock time",
            }
            .into());
        }
        if secs == 0 {
            return Err(MatchError::InvalidArgument(
                "a tick must advance the clock".into(),
            ));
        }

        let was_running = self.clock.is_running();
        self.clock.tick(secs);
        self.machine.apply(plan);

        let mut notices = vec![Notice::ClockUpdated];
        if was_running && !self.clock.is_running() {
            notices.push(Notice::ClockStopped);
        }
        Ok(CommandOutcome {
            event: None,
            notices,
        })
    }

    /// Credit `points` to an on-court player.
    pub fn record_basket(
        &mut self,
        player_id: PlayerId,
        points: u8,
        period: u8,
        clock_secs: u32,
        now: Instant,
    ) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::RecordBasket)?;
        if !(1..=3).contains(&points) {
            return Err(MatchError::InvalidArgument(format!(
                "a basket is worth 1, 2 or 3 points, got {points}"
            )));
        }
        self.validate_moment(period, clock_secs)?;

        let entry = self.roster.get(player_id)?;
        if entry.is_disqualified {
            return Err(MatchError::PlayerNotEligible(format!(
                "player {player_id} is disqualified"
            )));
        }
        if !entry.is_on_court {
            return Err(MatchError::PlayerNotEligible(format!(
                "player {player_id} is not on court"
            )));
        }
        let team_id = entry.team_id;
        let side = self.side_of(team_id)?;

        let notices = self.synced_notices(now);
        self.roster.get_mut(player_id)?.add_basket(points)?;
        let team = self.team_mut(side);
        team.score += u32::from(points);
        let team_score = team.score;

        let event = self.commit(
            plan,
            Some(team_id),
            period,
            clock_secs,
            MatchEventKind::Basket(BasketEvent {
                player_id,
                points,
                team_score,
            }),
        );
        debug!(match_id = %self.id, player_id, points, team_score, "basket recorded");

        Ok(CommandOutcome {
            event: Some(event),
            notices,
        })
    }

    /// Charge a foul. A fifth personal or a disqualifying foul removes the player.
    pub fn record_foul(
        &mut self,
        player_id: PlayerId,
        foul_type: &str,
        period: u8,
        clock_secs: u32,
        now: Instant,
    ) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::RecordFoul)?;
        let foul: FoulType = foul_type.parse()?;
        self.validate_moment(period, clock_secs)?;

        let entry = self.roster.get(player_id)?;
        if entry.is_disqualified {
            return Err(MatchError::PlayerNotEligible(format!(
                "player {player_id} is already disqualified"
            )));
        }
        let team_id = entry.team_id;
        let side = self.side_of(team_id)?;

        let mut notices = self.synced_notices(now);
        let mark = self.lineup_mark(period, clock_secs, Some(player_id));
        let outcome = self.roster.get_mut(player_id)?.add_foul(foul, mark);
        self.team_mut(side).add_foul(period);

        let event = self.commit(
            plan,
            Some(team_id),
            period,
            clock_secs,
            MatchEventKind::Foul(FoulEvent {
                player_id,
                foul_type: foul,
                personal_fouls: outcome.personal_fouls,
                disqualified: outcome.newly_disqualified,
            }),
        );

        if outcome.newly_disqualified {
            debug!(match_id = %self.id, player_id, foul = %foul, "player disqualified");
            notices.push(Notice::PlayerDisqualified { player_id, team_id });
        }

        Ok(CommandOutcome {
            event: Some(event),
            notices,
        })
    }

    /// Swap an on-court player for an eligible team mate.
    pub fn record_substitution(
        &mut self,
        player_in: PlayerId,
        player_out: PlayerId,
        period: u8,
        clock_secs: u32,
        now: Instant,
    ) -> MatchResult<CommandOutcome> {
        if player_in == player_out {
            return Err(MatchError::InvalidArgument(format!(
                "player {player_in} cannot replace themselves"
            )));
        }
        let plan = self.machine.plan(MatchAction::RecordSubstitution)?;
        self.validate_moment(period, clock_secs)?;

        let outgoing = self.roster.get(player_out)?;
        let incoming = self.roster.get(player_in)?;
        if outgoing.team_id != incoming.team_id {
            return Err(MatchError::InvalidArgument(format!(
                "players {player_in} and {player_out} play for different teams"
            )));
        }
        if !outgoing.is_on_court {
            return Err(MatchError::PlayerNotEligible(format!(
                "player {player_out} is not on court"
            )));
        }
        if !incoming.can_enter_court() {
            return Err(MatchError::PlayerNotEligible(format!(
                "player {player_in} cannot enter the court"
            )));
        }
        let team_id = incoming.team_id;

        let notices = self.synced_notices(now);
        let mark = self.lineup_mark(period, clock_secs, Some(player_out));
        self.roster.get_mut(player_out)?.exit_court(mark);
        self.roster.enter(player_in, period, mark)?;

        let event = self.commit(
            plan,
            Some(team_id),
            period,
            clock_secs,
            MatchEventKind::Substitution(SubstitutionEvent {
                player_in,
                player_out: Some(player_out),
            }),
        );
        Ok(CommandOutcome {
            event: Some(event),
            notices,
        })
    }

    /// Put an eligible player on court when the team has an open slot.
    pub fn fill_vacancy(
        &mut self,
        player_in: PlayerId,
        period: u8,
        clock_secs: u32,
        now: Instant,
    ) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::FillVacancy)?;
        self.validate_moment(period, clock_secs)?;
        let team_id = self.roster.get(player_in)?.team_id;

        let notices = self.synced_notices(now);
        let mark = self.lineup_mark(period, clock_secs, None);
        self.roster.enter(player_in, period, mark)?;

        let event = self.commit(
            plan,
            Some(team_id),
            period,
            clock_secs,
            MatchEventKind::Substitution(SubstitutionEvent {
                player_in,
                player_out: None,
            }),
        );
        Ok(CommandOutcome {
            event: Some(event),
            notices,
        })
    }

    /// Charge a timeout to a team and stop the clock.
    pub fn record_timeout(
        &mut self,
        team_id: TeamId,
        period: u8,
        clock_secs: u32,
        now: Instant,
    ) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::RecordTimeout)?;
        self.validate_moment(period, clock_secs)?;
        let side = self.side_of(team_id)?;
        if self.team(side).timeouts_remaining == 0 {
            return Err(MatchError::QuotaExceeded(format!(
                "team {team_id} has no timeouts left in period {}",
                self.period
            )));
        }

        let team = self.team_mut(side);
        team.timeouts_remaining -= 1;
        let remaining = team.timeouts_remaining;

        let mut notices = Vec::new();
        if self.clock.stop(now) {
            notices.push(Notice::ClockStopped);
        }
        let event = self.commit(
            plan,
            Some(team_id),
            period,
            clock_secs,
            MatchEventKind::Timeout(TimeoutEvent {
                remaining,
                duration_secs: self.rules.timeout_duration_secs,
            }),
        );
        Ok(CommandOutcome {
            event: Some(event),
            notices,
        })
    }

    /// Move to `new_period`, enter overtime on a tie, or finish the match.
    pub fn change_period(&mut self, new_period: u8, now: Instant) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::ChangePeriod)?;
        if u16::from(new_period) != u16::from(self.period) + 1 {
            return Err(MatchError::InvalidArgument(format!(
                "period {new_period} does not follow period {}",
                self.period
            )));
        }

        let from = self.period;
        let regulation_over = from >= self.rules.regulation_periods;
        let decisive = self.home.score != self.away.score;
        if regulation_over && decisive {
            let finish = self.machine.plan(MatchAction::Finish)?;
            return Ok(self.finish(finish, now));
        }
        if new_period > self.rules.max_period() {
            return Err(MatchError::InvalidArgument(format!(
                "period {new_period} exceeds the ceiling of {} periods",
                self.rules.max_period()
            )));
        }

        let mut notices = Vec::new();
        if self.clock.stop(now) {
            notices.push(Notice::ClockStopped);
        }
        let clock_secs = self.clock.remaining_secs();
        let end_mark = self.current_mark();
        self.roster
            .rebase_stints(end_mark, self.rules.elapsed_before(new_period));

        if self.rules.timeout_bracket(new_period) != self.rules.timeout_bracket(from) {
            let quota = self
                .rules
                .timeout_quota(self.rules.timeout_bracket(new_period));
            self.home.timeouts_remaining = quota;
            self.away.timeouts_remaining = quota;
        }
        self.period = new_period;
        self.clock.reset(self.rules.period_duration(new_period));
        notices.push(Notice::ClockUpdated);

        let event = self.commit(
            plan,
            None,
            from,
            clock_secs,
            MatchEventKind::PeriodChange(PeriodChangeEvent {
                from,
                to: Some(new_period),
                overtime: self.rules.is_overtime(new_period),
            }),
        );
        Ok(CommandOutcome {
            event: Some(event),
            notices,
        })
    }

    /// End live play explicitly, whatever the score.
    pub fn end_match(&mut self, now: Instant) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::Finish)?;
        Ok(self.finish(plan, now))
    }

    /// Call the match off.
    pub fn cancel(&mut self, now: Instant) -> MatchResult<CommandOutcome> {
        let plan = self.machine.plan(MatchAction::Cancel)?;
        let mut notices = Vec::new();
        if self.clock.stop(now) {
            notices.push(Notice::ClockStopped);
        }
        let mark = self.current_mark();
        self.roster.freeze(mark);
        self.finished_at = Some(SystemTime::now());
        self.machine.apply(plan);
        notices.push(Notice::MatchCancelled);

        Ok(CommandOutcome {
            event: None,
            notices,
        })
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn finish(&mut self, plan: Plan, now: Instant) -> CommandOutcome {
        let mut notices = Vec::new();
        if self.clock.stop(now) {
            notices.push(Notice::ClockStopped);
        }
        let clock_secs = self.clock.remaining_secs();
        let mark = self.current_mark();
        self.roster.freeze(mark);
        self.finished_at = Some(SystemTime::now());

        let period = self.period;
        let event = self.commit(
            plan,
            None,
            period,
            clock_secs,
            MatchEventKind::PeriodChange(PeriodChangeEvent {
                from: period,
                to: None,
                overtime: false,
            }),
        );
        notices.push(Notice::MatchFinished);

        CommandOutcome {
            event: Some(event),
            notices,
        }
    }

    fn commit(
        &mut self,
        plan: Plan,
        team_id: Option<TeamId>,
        period: u8,
        clock_secs: u32,
        kind: MatchEventKind,
    ) -> MatchEvent {
        self.machine.apply(plan);
        let sequence = self.events.len() as u64 + 1;
        let event = MatchEvent::new(self.id, sequence, team_id, period, clock_secs, kind);
        self.events.push(event.clone());
        event
    }

    fn validate_moment(&self, period: u8, clock_secs: u32) -> MatchResult<()> {
        if period == 0 || period > self.period || period > self.rules.max_period() {
            return Err(MatchError::InvalidArgument(format!(
                "period {period} is outside 1..={}",
                self.period
            )));
        }
        let duration = self.rules.period_duration(period);
        if clock_secs > duration {
            return Err(MatchError::InvalidArgument(format!(
                "clock time {clock_secs}s exceeds the {duration}s of period {period}"
            )));
        }
        Ok(())
    }

    fn mark_at(&self, period: u8, clock_secs: u32) -> u32 {
        let played = self
            .rules
            .period_duration(period)
            .saturating_sub(clock_secs);
        self.rules.elapsed_before(period).saturating_add(played)
    }

    /// Mark at which a lineup change reported at `period`/`clock_secs` takes effect.
    ///
    /// Stints are rebased at every period change, so a change entered late for an
    /// earlier period takes effect no earlier than the start of the current period
    /// and of the stint it closes.
    fn lineup_mark(&self, period: u8, clock_secs: u32, outgoing: Option<PlayerId>) -> u32 {
        let stint_start = outgoing
            .and_then(|player_id| self.roster.get(player_id).ok())
            .and_then(|entry| entry.on_court_since)
            .unwrap_or(0);
        let floor = stint_start.max(self.rules.elapsed_before(self.period));
        self.mark_at(period, clock_secs).max(floor)
    }

    fn synced_notices(&mut self, now: Instant) -> Vec<Notice> {
        if self.clock.sync(now) {
            vec![Notice::ClockStopped]
        } else {
            Vec::new()
        }
    }

    fn side_of(&self, team_id: TeamId) -> MatchResult<TeamSide> {
        if self.home.team_id == team_id {
            Ok(TeamSide::Home)
        } else if self.away.team_id == team_id {
            Ok(TeamSide::Away)
        } else {
            Err(MatchError::NotFound(format!(
                "team {team_id} does not play in match {}",
                self.id
            )))
        }
    }

    fn team_mut(&mut self, side: TeamSide) -> &mut TeamState {
        match side {
            TeamSide::Home => &mut self.home,
            TeamSide::Away => &mut self.away,
        }
    }
}
