use chrono::{DateTime, NaiveDate, Utc};

use crate::error::{DexError, DexResult};

/// Parses a due date given either as a calendar day (`2025-04-30`, taken
/// as midnight UTC) or as a full RFC 3339 timestamp.
pub fn parse_due_date(raw: &str) -> DexResult<DateTime<Utc>> {
    let trimmed = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        && let Some(midnight) = date.and_hms_opt(0, 0, 0)
    {
        return Ok(midnight.and_utc());
    }

    DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| {
            DexError::invalid(format!(
                "invalid due date {raw:?}; expected YYYY-MM-DD or RFC 3339"
            ))
        })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn calendar_days_are_midnight_utc() {
        assert_eq!(
            parse_due_date("2025-04-30").unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 30, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn rfc3339_is_normalized_to_utc() {
        assert_eq!(
            parse_due_date("2025-04-30T10:00:00+02:00").unwrap(),
            Utc.with_ymd_and_hms(2025, 4, 30, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn garbage_is_invalid_argument() {
        assert!(matches!(
            parse_due_date("next tuesday"),
            Err(DexError::InvalidArgument(_))
        ));
        assert!(parse_due_date("2025-02-30").is_err());
    }
}
