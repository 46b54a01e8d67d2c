//! Validation helpers for DTOs.

use validator::ValidationError;

/// Longest catalog identifier accepted in a command.
pub const MAX_IDENTIFIER_LEN: usize = 64;

/// Whether `color` is a `#RRGGBB` hex color.
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Validates that a team color is written as `#RRGGBB`.
///
/// # Examples
///
/// ```ignore
/// validate_hex_color("#EF4444") // Ok
/// validate_hex_color("EF4444")  // Err - missing '#'
/// validate_hex_color("#EF44")   // Err - too short
/// ```
pub fn validate_hex_color(color: &str) -> Result<(), ValidationError> {
    if is_hex_color(color) {
        return Ok(());
    }

    let mut err = ValidationError::new("hex_color");
    err.message = Some(format!("Color must look like #RRGGBB (got {color:?})").into());
    Err(err)
}

/// Validates a catalog identifier (action, violation or event id) or player id.
pub fn validate_identifier(id: &str) -> Result<(), ValidationError> {
    if id.is_empty() || id.len() > MAX_IDENTIFIER_LEN {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some(
            format!("Identifier must be 1 to {MAX_IDENTIFIER_LEN} characters (got {})", id.len())
                .into(),
        );
        return Err(err);
    }

    if id.chars().any(char::is_whitespace) {
        let mut err = ValidationError::new("identifier_format");
        err.message = Some("Identifier must not contain whitespace".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_hex_color_valid() {
        assert!(validate_hex_color("#EF4444").is_ok());
        assert!(validate_hex_color("#3b82f6").is_ok());
    }

    #[test]
    fn test_validate_hex_color_invalid() {
        assert!(validate_hex_color("EF4444").is_err()); // no hash
        assert!(validate_hex_color("#EF44").is_err()); // too short
        assert!(validate_hex_color("#GG4444").is_err()); // not hex
        assert!(validate_hex_color("").is_err());
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("three_pointer").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("two words").is_err());
        assert!(validate_identifier(&"x".repeat(MAX_IDENTIFIER_LEN + 1)).is_err());
    }
}
