//! Competition rules: period lengths, overtime ceiling and timeout allowances.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::error::{MatchError, MatchResult};

/// How elapsed time reaches the game clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// The clock consumes the wall-clock delta between start and the next command.
    #[default]
    WallClock,
    /// The clock only moves on explicit tick commands from the scorer's table.
    ExternalTicks,
}

/// Timeout allowance window a period belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutBracket {
    /// Periods of the first half of regulation.
    FirstHalf,
    /// Periods of the second half of regulation.
    SecondHalf,
    /// A single overtime period (each one has its own allowance).
    Overtime(u8),
}

/// Competition rules a match is played under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MatchRules {
    /// Number of regulation periods.
    pub regulation_periods: u8,
    /// Length of a regulation period in seconds.
    pub period_duration_secs: u32,
    /// Length of an overtime period in seconds.
    pub overtime_duration_secs: u32,
    /// Highest number of overtime periods that may be played.
    pub max_overtime_periods: u8,
    /// Length of a timeout in seconds.
    pub timeout_duration_secs: u32,
    /// Timeouts per team in the first half.
    pub timeouts_first_half: u8,
    /// Timeouts per team in the second half.
    pub timeouts_second_half: u8,
    /// Timeouts per team in each overtime period.
    pub timeouts_per_overtime: u8,
    /// Where the clock's elapsed time comes from.
    #[serde(default)]
    pub clock_source: ClockSource,
}

impl Default for MatchRules {
    fn default() -> Self {
        Self {
            regulation_periods: 4,
            period_duration_secs: 600,
            overtime_duration_secs: 300,
            max_overtime_periods: 4,
            timeout_duration_secs: 60,
            timeouts_first_half: 2,
            timeouts_second_half: 3,
            timeouts_per_overtime: 1,
            clock_source: ClockSource::WallClock,
        }
    }
}

impl MatchRules {
    /// Reject rule sets a match cannot be played under.
    pub fn validate(&self) -> MatchResult<()> {
        if self.regulation_periods == 0 {
            return Err(MatchError::InvalidArgument(
                "at least one regulation period is required".into(),
            ));
        }
        if self.period_duration_secs == 0 {
            return Err(MatchError::InvalidArgument(
                "period duration must be positive".into(),
            ));
        }
        if self.max_overtime_periods > 0 && self.overtime_duration_secs == 0 {
            return Err(MatchError::InvalidArgument(
                "overtime duration must be positive when overtime is allowed".into(),
            ));
        }
        if self
            .regulation_periods
            .checked_add(self.max_overtime_periods)
            .is_none()
        {
            return Err(MatchError::InvalidArgument(
                "too many periods configured".into(),
            ));
        }
        if self.total_game_secs().is_none() {
            return Err(MatchError::InvalidArgument(
                "period durations add up beyond the longest playable match".into(),
            ));
        }
        Ok(())
    }

    /// Game seconds of a match played to the last allowed overtime, if that fits in `u32`.
    pub fn total_game_secs(&self) -> Option<u32> {
        let regulation = u32::from(self.regulation_periods).checked_mul(self.period_duration_secs)?;
        let overtime =
            u32::from(self.max_overtime_periods).checked_mul(self.overtime_duration_secs)?;
        regulation.checked_add(overtime)
    }

    /// Highest period number, overtime included.
    pub fn max_period(&self) -> u8 {
        self.regulation_periods
            .saturating_add(self.max_overtime_periods)
    }

    /// Whether `period` is an overtime period.
    pub fn is_overtime(&self, period: u8) -> bool {
        period > self.regulation_periods
    }

    /// Full length of `period` in seconds.
    pub fn period_duration(&self, period: u8) -> u32 {
        if self.is_overtime(period) {
            self.overtime_duration_secs
        } else {
            self.period_duration_secs
        }
    }

    /// Seconds of game time played before `period` starts.
    ///
    /// Saturates instead of overflowing; rules that pass [`MatchRules::validate`]
    /// never reach the ceiling for periods up to [`MatchRules::max_period`].
    pub fn elapsed_before(&self, period: u8) -> u32 {
        let completed = u32::from(period.saturating_sub(1));
        let regulation = completed.min(u32::from(self.regulation_periods));
        let overtime = completed - regulation;
        regulation
            .saturating_mul(self.period_duration_secs)
            .saturating_add(overtime.saturating_mul(self.overtime_duration_secs))
    }

    /// Timeout allowance window `period` falls into.
    pub fn timeout_bracket(&self, period: u8) -> TimeoutBracket {
        if self.is_overtime(period) {
            TimeoutBracket::Overtime(period)
        } else if period <= self.regulation_periods / 2 {
            TimeoutBracket::FirstHalf
        } else {
            TimeoutBracket::SecondHalf
        }
    }

    /// Timeouts each team receives when a bracket opens.
    pub fn timeout_quota(&self, bracket: TimeoutBracket) -> u8 {
        match bracket {
            TimeoutBracket::FirstHalf => self.timeouts_first_half,
            TimeoutBracket::SecondHalf => self.timeouts_second_half,
            TimeoutBracket::Overtime(_) => self.timeouts_per_overtime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_spans_regulation_and_overtime() {
        let rules = MatchRules::default();
        assert_eq!(rules.elapsed_before(1), 0);
        assert_eq!(rules.elapsed_before(3), 1200);
        assert_eq!(rules.elapsed_before(5), 2400);
        assert_eq!(rules.elapsed_before(6), 2700);
    }

    #[test]
    fn brackets_follow_halves_then_each_overtime() {
        let rules = MatchRules::default();
        assert_eq!(rules.timeout_bracket(1), TimeoutBracket::FirstHalf);
        assert_eq!(rules.timeout_bracket(2), TimeoutBracket::FirstHalf);
        assert_eq!(rules.timeout_bracket(3), TimeoutBracket::SecondHalf);
        assert_eq!(rules.timeout_bracket(4), TimeoutBracket::SecondHalf);
        assert_eq!(rules.timeout_bracket(5), TimeoutBracket::Overtime(5));
        assert_eq!(rules.timeout_quota(TimeoutBracket::SecondHalf), 3);
    }

    #[test]
    fn overtime_uses_its_own_duration() {
        let rules = MatchRules::default();
        assert_eq!(rules.period_duration(4), 600);
        assert_eq!(rules.period_duration(5), 300);
        assert_eq!(rules.max_period(), 8);
    }

    #[test]
    fn rejects_unplayable_rules() {
        let rules = MatchRules {
            regulation_periods: 0,
            ..MatchRules::default()
        };
        assert!(rules.validate().is_err());

        let rules = MatchRules {
            overtime_duration_secs: 0,
            ..MatchRules::default()
        };
        assert!(rules.validate().is_err());

        let rules = MatchRules {
            overtime_duration_secs: 0,
            max_overtime_periods: 0,
            ..MatchRules::default()
        };
        assert!(rules.validate().is_ok());
    }

    #[test]
    fn rejects_durations_beyond_the_clock_range() {
        let rules = MatchRules {
            period_duration_secs: u32::MAX / 2 + 1,
            ..MatchRules::default()
        };
        assert!(rules.total_game_secs().is_none());
        assert!(matches!(
            rules.validate(),
            Err(MatchError::InvalidArgument(_))
        ));

        let rules = MatchRules {
            overtime_duration_secs: u32::MAX / 4,
            ..MatchRules::default()
        };
        assert!(rules.validate().is_err());
        assert_eq!(MatchRules::default().total_game_secs(), Some(3600));
    }
}
