//! Validation helpers for DTOs.

use std::collections::HashSet;

use validator::ValidationError;

use crate::state::roster::{FoulType, PlayerId};

/// Validates that a foul code is one of the score sheet codes (P0-P3, T, U, D), in any case.
///
/// # Examples
///
/// ```ignore
/// validate_foul_type("p2") // Ok
/// validate_foul_type("D")  // Ok
/// validate_foul_type("P4") // Err
/// ```
pub fn validate_foul_type(code: &str) -> Result<(), ValidationError> {
    if code.parse::<FoulType>().is_err() {
        let mut err = ValidationError::new("foul_type");
        err.message = Some(format!("Unknown foul type `{}`", code.trim()).into());
        return Err(err);
    }
    Ok(())
}

/// Validates that a list of player ids has no duplicates.
pub fn validate_distinct_players(ids: &[PlayerId]) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(ids.len());
    if let Some(duplicate) = ids.iter().find(|id| !seen.insert(**id)) {
        let mut err = ValidationError::new("duplicate_player");
        err.message = Some(format!("Player {duplicate} is listed more than once").into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_foul_type_valid() {
        for code in ["P0", "p1", "P2", "p3", "T", "u", " D "] {
            assert!(validate_foul_type(code).is_ok(), "{code}");
        }
    }

    #[test]
    fn test_validate_foul_type_invalid() {
        assert!(validate_foul_type("").is_err());
        assert!(validate_foul_type("P4").is_err());
        assert!(validate_foul_type("technical").is_err());
    }

    #[test]
    fn test_validate_distinct_players() {
        assert!(validate_distinct_players(&[4, 5, 6, 7, 8]).is_ok());
        assert!(validate_distinct_players(&[]).is_ok());
        let err = validate_distinct_players(&[4, 5, 4]).unwrap_err();
        assert_eq!(err.code, "duplicate_player");
    }
}
