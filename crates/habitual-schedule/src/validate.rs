//! Validation of two-part times (`HH:MM` and `M:SS`).

use chrono::Duration;

use crate::{TimeField, ValidationError};

/// Durations at or above this many minutes may not carry extra seconds.
pub const MAX_DURATION_MINUTES: i32 = 2;

/// Split a two-part time into its integer halves.
///
/// Whitespace is rejected before anything else, then the separator, then
/// the digits. No range checks happen here.
pub fn validate_two_part(raw: &str) -> Result<(i32, i32), ValidationError> {
    if raw.chars().any(char::is_whitespace) {
        return Err(ValidationError::Whitespace(raw.to_string()));
    }

    let mut parts = raw.split(':');
    let (first, second) = match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(second), None) => (first, second),
        _ => return Err(ValidationError::Format(raw.to_string())),
    };

    let parse = |part: &str| {
        part.parse::<i32>()
            .map_err(|_| ValidationError::NotNumeric(raw.to_string()))
    };
    Ok((parse(first)?, parse(second)?))
}

/// Validate an `HH:MM` time of day, returning `(hour, minute)`.
pub fn validate_time_of_day(raw: &str) -> Result<(u8, u8), ValidationError> {
    let (hour, minute) = validate_two_part(raw)?;

    let hour = clock_value(hour, 24)
        .ok_or(ValidationError::TimeOfDayRange { field: TimeField::Hour })?;
    let minute = clock_value(minute, 60)
        .ok_or(ValidationError::TimeOfDayRange { field: TimeField::Minute })?;

    Ok((hour, minute))
}

/// Validate an `M:SS` duration.
///
/// Minutes and seconds must each be below 60, and a duration of two minutes
/// or more may not carry any seconds.
pub fn validate_duration(raw: &str) -> Result<Duration, ValidationError> {
    let (minutes, seconds) = validate_two_part(raw)?;

    clock_value(minutes, 60).ok_or(ValidationError::DurationRange {
        field: TimeField::Minute,
    })?;
    clock_value(seconds, 60).ok_or(ValidationError::DurationRange {
        field: TimeField::Second,
    })?;

    if minutes >= MAX_DURATION_MINUTES && seconds > 0 {
        return Err(ValidationError::DurationCap);
    }

    Ok(Duration::seconds(i64::from(minutes) * 60 + i64::from(seconds)))
}

fn clock_value(value: i32, limit: i32) -> Option<u8> {
    if (0..limit).contains(&value) {
        u8::try_from(value).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    // === Unit Tests ===

    #[test]
    fn test_two_part_ok() {
        assert_eq!(validate_two_part("18:30").unwrap(), (18, 30));
        assert_eq!(validate_two_part("0:0").unwrap(), (0, 0));
    }

    #[test_case("18 :30", ValidationError::Whitespace("18 :30".into()) ; "space")]
    #[test_case("18:\t30", ValidationError::Whitespace("18:\t30".into()) ; "tab")]
    #[test_case("1830", ValidationError::Format("1830".into()) ; "no separator")]
    #[test_case("18.30", ValidationError::Format("18.30".into()) ; "wrong separator")]
    #[test_case("18:30:00", ValidationError::Format("18:30:00".into()) ; "too many parts")]
    #[test_case("ab:30", ValidationError::NotNumeric("ab:30".into()) ; "letters")]
    #[test_case(":30", ValidationError::NotNumeric(":30".into()) ; "empty part")]
    fn test_two_part_errors(raw: &str, expected: ValidationError) {
        assert_eq!(validate_two_part(raw).unwrap_err(), expected);
    }

    #[test]
    fn test_whitespace_checked_before_format() {
        // Both malformed and spaced: whitespace wins
        assert!(matches!(
            validate_two_part("18 30"),
            Err(ValidationError::Whitespace(_))
        ));
    }

    #[test_case("24:00", TimeField::Hour ; "hour too large")]
    #[test_case("-1:00", TimeField::Hour ; "negative hour")]
    #[test_case("12:60", TimeField::Minute ; "minute too large")]
    #[test_case("12:-5", TimeField::Minute ; "negative minute")]
    fn test_time_of_day_range(raw: &str, field: TimeField) {
        assert_eq!(
            validate_time_of_day(raw).unwrap_err(),
            ValidationError::TimeOfDayRange { field }
        );
    }

    #[test]
    fn test_time_of_day_message_names_field() {
        let err = validate_time_of_day("25:00").unwrap_err();
        assert_eq!(
            err.to_string(),
            "hour value cannot be less than 0 or greater than 23"
        );
    }

    #[test]
    fn test_duration_cap() {
        assert_eq!(validate_duration("2:01").unwrap_err(), ValidationError::DurationCap);
        assert_eq!(validate_duration("1:59").unwrap().num_seconds(), 119);
        assert_eq!(validate_duration("2:00").unwrap().num_seconds(), 120);
    }

    #[test_case("60:00", TimeField::Minute ; "minutes out of range")]
    #[test_case("1:60", TimeField::Second ; "seconds out of range")]
    fn test_duration_range(raw: &str, field: TimeField) {
        assert_eq!(
            validate_duration(raw).unwrap_err(),
            ValidationError::DurationRange { field }
        );
    }

    // === Property-Based Tests ===

    proptest! {
        // Every clock time in range comes back unchanged
        #[test]
        fn valid_time_of_day_roundtrips(hour in 0u8..24, minute in 0u8..60) {
            let raw = format!("{hour}:{minute}");
            prop_assert_eq!(validate_time_of_day(&raw).unwrap(), (hour, minute));
        }

        // Zero-padded input parses the same as bare digits
        #[test]
        fn padded_time_of_day_parses(hour in 0u8..24, minute in 0u8..60) {
            let raw = format!("{hour:02}:{minute:02}");
            prop_assert_eq!(validate_time_of_day(&raw).unwrap(), (hour, minute));
        }

        // Durations under two minutes always pass and keep their length
        #[test]
        fn short_durations_pass(minutes in 0i64..2, seconds in 0i64..60) {
            let raw = format!("{minutes}:{seconds:02}");
            let duration = validate_duration(&raw).unwrap();
            prop_assert_eq!(duration.num_seconds(), minutes * 60 + seconds);
        }

        // Anything with a space in it is rejected as whitespace
        #[test]
        fn whitespace_always_rejected(prefix in "[0-9]{0,2}", suffix in "[0-9:]{0,3}") {
            let raw = format!("{prefix} {suffix}");
            prop_assert!(matches!(
                validate_two_part(&raw),
                Err(ValidationError::Whitespace(_))
            ));
        }
    }
}
