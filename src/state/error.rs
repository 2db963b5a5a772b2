//! Typed failures of the match core.

use thiserror::Error;

use crate::state::state_machine::InvalidTransition;

/// Result alias for live match operations.
pub type MatchResult<T> = Result<T, MatchError>;

/// Typed failures of the live match core.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Unknown match, player or team identifier.
    #[error("not found: {0}")]
    NotFound(String),
    /// Malformed input such as a bad point value or a non-sequential period.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Operation not legal in the current match status.
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// Player is disqualified, off court, or already on court as applicable.
    #[error("player not eligible: {0}")]
    PlayerNotEligible(String),
    /// Timeout quota exhausted for the current bracket.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),
}
