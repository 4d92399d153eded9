//! Human-readable periodicity phrases for reminder messages.

use serde::{Deserialize, Serialize};

use crate::{CronField, Crontab, IntervalUnit};

/// Grammatical number selected for a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluralForm {
    /// 1, 21, 31, ... (but not 11).
    One,
    /// 2-4, 22-24, 32-34, ... (but not 12-14).
    Few,
    /// Everything else.
    Many,
}

impl PluralForm {
    pub fn for_count(n: u32) -> Self {
        let (tens, units) = (n % 100, n % 10);
        if units == 1 && tens != 11 {
            Self::One
        } else if (2..=4).contains(&units) && !(12..=14).contains(&tens) {
            Self::Few
        } else {
            Self::Many
        }
    }
}

/// Output language for phrases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    #[default]
    English,
    Russian,
}

/// Describe how often a schedule fires, e.g. "every 2 days".
///
/// The day step takes precedence, then the hour step, then the minute step.
/// A schedule without any step fires once a day.
pub fn describe(crontab: &Crontab, language: Language) -> String {
    let (unit, n) = match (crontab.day_of_month, crontab.hour, crontab.minute) {
        (CronField::Step(n), _, _) => (IntervalUnit::Day, n),
        (_, CronField::Step(n), _) => (IntervalUnit::Hour, n),
        (_, _, CronField::Step(n)) => (IntervalUnit::Minute, n),
        _ => (IntervalUnit::Day, 1),
    };
    let n = u32::from(n);
    let form = PluralForm::for_count(n);

    match language {
        Language::English => english(unit, n),
        Language::Russian => russian(unit, form, n),
    }
}

fn english(unit: IntervalUnit, n: u32) -> String {
    if n == 1 {
        return format!("every {unit}");
    }
    format!("every {n} {unit}s")
}

fn russian(unit: IntervalUnit, form: PluralForm, n: u32) -> String {
    match (unit, form) {
        (IntervalUnit::Day, PluralForm::One) if n == 1 => "Каждый день".to_string(),
        (IntervalUnit::Day, PluralForm::One) => format!("Каждый {n} день"),
        (IntervalUnit::Day, PluralForm::Few) => format!("Каждые {n} дня"),
        (IntervalUnit::Day, PluralForm::Many) => format!("Каждые {n} дней"),
        (IntervalUnit::Hour, PluralForm::One) if n == 1 => "Каждый час".to_string(),
        (IntervalUnit::Hour, PluralForm::One) => format!("Каждый {n} час"),
        (IntervalUnit::Hour, PluralForm::Few) => format!("Каждые {n} часа"),
        (IntervalUnit::Hour, PluralForm::Many) => format!("Каждые {n} часов"),
        (IntervalUnit::Minute, PluralForm::One) if n == 1 => "Каждую минуту".to_string(),
        (IntervalUnit::Minute, PluralForm::One) => format!("Каждую {n} минуту"),
        (IntervalUnit::Minute, PluralForm::Few) => format!("Каждые {n} минуты"),
        (IntervalUnit::Minute, PluralForm::Many) => format!("Каждые {n} минут"),
    }
}
