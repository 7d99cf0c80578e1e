//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest accepted display name.
const MAX_PLAYER_NAME_LENGTH: usize = 24;
/// Longest accepted custom room code.
const MAX_ROOM_CODE_LENGTH: usize = 12;

/// Validates that a player display name is non-blank and reasonably short.
pub fn validate_player_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        let mut err = ValidationError::new("player_name_blank");
        err.message = Some("Player name is required".into());
        return Err(err);
    }

    if name.len() > MAX_PLAYER_NAME_LENGTH {
        let mut err = ValidationError::new("player_name_length");
        err.message = Some(
            format!("Player name must be at most {MAX_PLAYER_NAME_LENGTH} characters").into(),
        );
        return Err(err);
    }

    Ok(())
}

/// Validates that a room code is non-empty alphanumeric ASCII.
///
/// Codes are matched case-insensitively; the server uppercases them before
/// any registry lookup.
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.is_empty() || code.len() > MAX_ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!("Room code must be between 1 and {MAX_ROOM_CODE_LENGTH} characters").into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only letters and digits".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_name_rejects_blank() {
        assert!(validate_player_name("").is_err());
        assert!(validate_player_name("   ").is_err());
        assert!(validate_player_name("Alice").is_ok());
    }

    #[test]
    fn player_name_rejects_overlong() {
        assert!(validate_player_name(&"x".repeat(24)).is_ok());
        assert!(validate_player_name(&"x".repeat(25)).is_err());
    }

    #[test]
    fn room_code_accepts_mixed_case_alphanumerics() {
        assert!(validate_room_code("ABC123").is_ok());
        assert!(validate_room_code("abc123").is_ok());
    }

    #[test]
    fn room_code_rejects_bad_shapes() {
        assert!(validate_room_code("").is_err());
        assert!(validate_room_code("ABCDEFGHIJKLM").is_err()); // too long
        assert!(validate_room_code("AB 123").is_err()); // space
        assert!(validate_room_code("AB-123").is_err()); // punctuation
    }
}
