//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a pushed gamertag is non-blank.
///
/// Length and character set are not restricted here: whether the name is
/// acceptable is decided by the match it targets, which only takes one of its
/// own players.
///
/// # Examples
///
/// ```ignore
/// validate_gamertag("Daigo")   // Ok
/// validate_gamertag("   ")     // Err - blank
/// ```
pub fn validate_gamertag(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("gamertag_blank");
        err.message = Some("Gamertag must not be blank".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_gamertag_valid() {
        assert!(validate_gamertag("Daigo").is_ok());
        assert!(validate_gamertag("Punk 2").is_ok());
        assert!(validate_gamertag(&"x".repeat(200)).is_ok());
    }

    #[test]
    fn test_validate_gamertag_blank() {
        assert!(validate_gamertag("").is_err()); // empty
        assert!(validate_gamertag("   ").is_err()); // blank
        assert!(validate_gamertag("\t\n").is_err()); // whitespace only
    }
}
