use std::time::{Duration, UNIX_EPOCH};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Scorer commands.
pub mod command;
/// Game creation input and game views.
pub mod game;
/// Health check body.
pub mod health;
/// Sport listings.
pub mod sports;
/// Payloads pushed over SSE.
pub mod sse;
pub mod validation;

fn format_epoch_millis(millis: u64) -> String {
    OffsetDateTime::from(UNIX_EPOCH + Duration::from_millis(millis))
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_millis_format_as_rfc3339() {
        assert_eq!(format_epoch_millis(0), "1970-01-01T00:00:00Z");
        assert_eq!(
            format_epoch_millis(1_700_000_000_123),
            "2023-11-14T22:13:20.123Z"
        );
    }
}
