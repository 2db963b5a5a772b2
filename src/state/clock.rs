//! Countdown game clock driven by wall-clock syncs or explicit ticks.

use std::time::{Duration, Instant};

use crate::state::{
    error::{MatchError, MatchResult},
    rules::ClockSource,
};

/// Countdown clock of the current period.
///
/// The clock never runs a timer of its own: elapsed time is applied when a
/// caller syncs it (wall-clock source) or ticks it (external source).
#[derive(Debug, Clone)]
pub struct GameClock {
    remaining_secs: u32,
    running: bool,
    source: ClockSource,
    last_sync: Option<Instant>,
}

impl GameClock {
    /// Stopped clock showing `remaining_secs`.
    pub fn new(remaining_secs: u32, source: ClockSource) -> Self {
        Self {
            remaining_secs,
            running: false,
            source,
            last_sync: None,
        }
    }

    /// Seconds left in the current period.
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Whether the clock is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Where elapsed time comes from.
    pub fn source(&self) -> ClockSource {
        self.source
    }

    /// Start the clock. Returns `false` when it was already running.
    pub fn start(&mut self, now: Instant) -> bool {
        if self.running {
            return false;
        }
        self.running = true;
        self.last_sync = Some(now);
        true
    }

    /// Stop the clock after consuming elapsed time. Returns `false` when it was already stopped.
    ///
    /// A clock that runs out while catching up still counts as stopped by this call.
    pub fn stop(&mut self, now: Instant) -> bool {
        let was_running = self.running;
        self.sync(now);
        self.halt();
        was_running
    }

    /// Consume whole seconds elapsed since the last sync when driven by wall-clock time.
    ///
    /// Returns `true` when the elapsed time ran the clock out and stopped it.
    pub fn sync(&mut self, now: Instant) -> bool {
        if !self.running || self.source != ClockSource::WallClock {
            return false;
        }
        let Some(last) = self.last_sync else {
            self.last_sync = Some(now);
            return false;
        };

        let whole = now.saturating_duration_since(last).as_secs();
        if whole == 0 {
            return false;
        }
        // Keep the sub-second remainder for the next sync.
        self.last_sync = Some(last + Duration::from_secs(whole));
        self.consume(u32::try_from(whole).unwrap_or(u32::MAX));
        !self.running
    }

    /// Apply externally measured elapsed time.
    pub fn tick(&mut self, secs: u32) {
        self.consume(secs);
    }

    /// Overwrite the remaining time.
    pub fn set_remaining(&mut self, secs: i64) -> MatchResult<()> {
        if secs < 0 {
            return Err(MatchError::InvalidArgument(format!(
                "remaining time cannot be negative, got {secs}"
            )));
        }
        self.remaining_secs = u32::try_from(secs).map_err(|_| {
            MatchError::InvalidArgument(format!("remaining time {secs} is out of range"))
        })?;
        if self.remaining_secs == 0 {
            self.halt();
        }
        Ok(())
    }

    /// Stop the clock and show a fresh period of `secs`.
    pub fn reset(&mut self, secs: u32) {
        self.remaining_secs = secs;
        self.halt();
    }

    fn consume(&mut self, secs: u32) {
        self.remaining_secs = self.remaining_secs.saturating_sub(secs);
        if self.remaining_secs == 0 {
            self.halt();
        }
    }

    fn halt(&mut self) {
        self.running = false;
        self.last_sync = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_and_stop_toggle_running() {
        let now = Instant::now();
        let mut clock = GameClock::new(600, ClockSource::WallClock);
        assert!(clock.start(now));
        assert!(!clock.start(now));
        assert!(clock.is_running());
        assert!(clock.stop(now));
        assert!(!clock.stop(now));
        assert_eq!(clock.remaining_secs(), 600);
    }

    #[test]
    fn sync_consumes_wall_clock_time_and_keeps_remainder() {
        let start = Instant::now();
        let mut clock = GameClock::new(600, ClockSource::WallClock);
        clock.start(start);

        clock.sync(start + Duration::from_millis(1_500));
        assert_eq!(clock.remaining_secs(), 599);
        clock.sync(start + Duration::from_millis(2_100));
        assert_eq!(clock.remaining_secs(), 598);
    }

    #[test]
    fn stopped_clock_ignores_elapsed_time() {
        let start = Instant::now();
        let mut clock = GameClock::new(600, ClockSource::WallClock);
        clock.start(start);
        clock.stop(start + Duration::from_secs(10));
        clock.sync(start + Duration::from_secs(60));
        assert_eq!(clock.remaining_secs(), 590);
    }

    #[test]
    fn clock_stops_at_zero() {
        let start = Instant::now();
        let mut clock = GameClock::new(5, ClockSource::WallClock);
        clock.start(start);
        assert!(clock.sync(start + Duration::from_secs(30)));
        assert_eq!(clock.remaining_secs(), 0);
        assert!(!clock.is_running());
        assert!(!clock.sync(start + Duration::from_secs(40)));
    }

    #[test]
    fn stop_reports_a_clock_that_ran_out_meanwhile() {
        let start = Instant::now();
        let mut clock = GameClock::new(5, ClockSource::WallClock);
        clock.start(start);
        assert!(clock.stop(start + Duration::from_secs(30)));
        assert_eq!(clock.remaining_secs(), 0);
        assert!(!clock.stop(start + Duration::from_secs(31)));
    }

    #[test]
    fn external_source_only_moves_on_ticks() {
        let start = Instant::now();
        let mut clock = GameClock::new(600, ClockSource::ExternalTicks);
        clock.start(start);
        clock.sync(start + Duration::from_secs(30));
        assert_eq!(clock.remaining_secs(), 600);
        clock.tick(12);
        assert_eq!(clock.remaining_secs(), 588);
        assert!(clock.is_running());
    }

    #[test]
    fn set_remaining_rejects_negative_values() {
        let mut clock = GameClock::new(600, ClockSource::WallClock);
        assert!(matches!(
            clock.set_remaining(-1),
            Err(MatchError::InvalidArgument(_))
        ));
        assert_eq!(clock.remaining_secs(), 600);
        clock.set_remaining(42).unwrap();
        assert_eq!(clock.remaining_secs(), 42);
    }

    #[test]
    fn reset_stops_the_clock() {
        let mut clock = GameClock::new(10, ClockSource::WallClock);
        clock.start(Instant::now());
        clock.reset(600);
        assert!(!clock.is_running());
        assert_eq!(clock.remaining_secs(), 600);
    }
}
