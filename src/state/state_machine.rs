//! Match status transitions and the version counter of accepted commands.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    /// Match is planned; lineups can be declared, the clock has never run.
    Scheduled,
    /// Live play: scoring, fouls, substitutions and timeouts are accepted.
    InProgress,
    /// Final whistle; the match is frozen.
    Finished,
    /// Match was called off before or during play; the match is frozen.
    Cancelled,
}

impl MatchStatus {
    /// Whether no further command can be applied.
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Cancelled)
    }
}

/// Commands that can be submitted against a live match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    /// Register a team's roster and starting five.
    DeclareLineup,
    /// Start (or resume) the game clock.
    StartClock,
    /// Stop the game clock.
    StopClock,
    /// Overwrite the remaining time of the current period.
    SetClock,
    /// Advance the clock by an externally measured amount of time.
    TickClock,
    /// Credit points to an on-court player.
    RecordBasket,
    /// Charge a foul to a player.
    RecordFoul,
    /// Swap an on-court player for a bench player.
    RecordSubstitution,
    /// Put a bench player on court into a vacant slot.
    FillVacancy,
    /// Charge a timeout to a team.
    RecordTimeout,
    /// Move to the next period (or finish the match).
    ChangePeriod,
    /// End live play and freeze the result.
    Finish,
    /// Call the match off.
    Cancel,
}

/// Error returned when an action is not legal in the current status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {action:?} cannot be applied while {from:?} ({reason})")]
pub struct InvalidTransition {
    /// Status of the match when the action was received.
    pub from: MatchStatus,
    /// The rejected action.
    pub action: MatchAction,
    /// Short explanation of why the action is rejected.
    pub reason: &'static str,
}

impl InvalidTransition {
    fn not_allowed(from: MatchStatus, action: MatchAction) -> Self {
        Self {
            from,
            action,
            reason: "not allowed in this status",
        }
    }
}

/// A validated transition that has not been applied yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    /// Status the match is currently in.
    pub from: MatchStatus,
    /// Status the match will be in once the plan is applied.
    pub to: MatchStatus,
    /// Action that produced this plan.
    pub action: MatchAction,
    /// Version number after applying this plan.
    pub version_next: u64,
}

/// Status machine of a single match.
///
/// Every accepted command is planned first, then applied once the caller has
/// finished its own validation, so a rejected command never bumps the version.
#[derive(Debug, Clone)]
pub struct MatchStateMachine {
    status: MatchStatus,
    version: u64,
}

impl Default for MatchStateMachine {
    fn default() -> Self {
        Self {
            status: MatchStatus::Scheduled,
            version: 0,
        }
    }
}

impl MatchStateMachine {
    /// Create a state machine in the scheduled status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a state machine from persisted values.
    pub fn restore(status: MatchStatus, version: u64) -> Self {
        Self { status, version }
    }

    /// Current status.
    pub fn status(&self) -> MatchStatus {
        self.status
    }

    /// Number of commands applied so far.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Validate that `action` may run in the current status.
    pub fn plan(&self, action: MatchAction) -> Result<Plan, InvalidTransition> {
        let to = self.compute_transition(action)?;
        Ok(Plan {
            from: self.status,
            to,
            action,
            version_next: self.version + 1,
        })
    }

    /// Apply a plan produced by [`MatchStateMachine::plan`], returning the new status.
    pub fn apply(&mut self, plan: Plan) -> MatchStatus {
        debug_assert_eq!(self.status, plan.from, "plan applied on a changed status");
        debug_assert_eq!(self.version + 1, plan.version_next, "plan applied twice");
        self.status = plan.to;
        self.version = plan.version_next;
        self.status
    }

    fn compute_transition(&self, action: MatchAction) -> Result<MatchStatus, InvalidTransition> {
        use MatchAction::*;
        use MatchStatus::*;

        let next = match (self.status, action) {
            (Scheduled | InProgress, StartClock) => InProgress,
            (Scheduled | InProgress, StopClock | SetClock | DeclareLineup) => self.status,
            (
                InProgress,
                TickClock | RecordBasket | RecordFoul | RecordSubstitution | FillVacancy
                | RecordTimeout | ChangePeriod,
            ) => InProgress,
            (InProgress, Finish) => Finished,
            (Scheduled | InProgress, Cancel) => Cancelled,
            (from, action) => return Err(InvalidTransition::not_allowed(from, action)),
        };

        Ok(next)
    }
}
