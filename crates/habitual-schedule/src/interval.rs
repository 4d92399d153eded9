//! Parsing of `D/H/M` recurrence intervals.

use crate::{IntervalUnit, ValidationError};

/// Interval used when none is given: every day.
pub const DEFAULT_INTERVAL: (IntervalUnit, u8) = (IntervalUnit::Day, 1);

/// Parse a `days/hours/minutes` interval into its single step unit.
///
/// Missing or empty input yields [`DEFAULT_INTERVAL`]. Otherwise exactly one
/// field must be non-zero and within its unit's bound.
pub fn parse_interval(raw: Option<&str>) -> Result<(IntervalUnit, u8), ValidationError> {
    let raw = match raw {
        Some(raw) if !raw.is_empty() => raw,
        _ => return Ok(DEFAULT_INTERVAL),
    };

    if raw.chars().any(char::is_whitespace) {
        return Err(ValidationError::Whitespace(raw.to_string()));
    }

    let fields = raw
        .split('/')
        .map(str::parse::<i32>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ValidationError::IntervalFormat(raw.to_string()))?;
    let [day, hour, minute] = fields[..] else {
        return Err(ValidationError::IntervalFormat(raw.to_string()));
    };

    select_unit(day, hour, minute)
}

fn select_unit(day: i32, hour: i32, minute: i32) -> Result<(IntervalUnit, u8), ValidationError> {
    let set: Vec<(IntervalUnit, i32)> = [
        (IntervalUnit::Day, day),
        (IntervalUnit::Hour, hour),
        (IntervalUnit::Minute, minute),
    ]
    .into_iter()
    .filter(|(_, value)| *value != 0)
    .collect();

    let (unit, value) = match set[..] {
        [] => return Err(ValidationError::EmptyInterval),
        [single] => single,
        _ => return Err(ValidationError::MultipleUnits),
    };

    // Upper bounds are exclusive: day < 8, hour < 23, minute < 59
    let limit = i32::from(unit.max_step()) + 1;
    if !(0..limit).contains(&value) {
        return Err(ValidationError::IntervalOutOfRange { unit });
    }

    u8::try_from(value)
        .map(|every| (unit, every))
        .map_err(|_| ValidationError::IntervalOutOfRange { unit })
}
