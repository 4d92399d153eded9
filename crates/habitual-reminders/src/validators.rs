//! Field validators for habit drafts.
//!
//! Each validator is an independent function over a [`DraftContext`]. All of
//! them run on every draft and their failures are collected, so a caller can
//! report several problems at once.

use std::collections::BTreeMap;
use std::fmt;

use habitual_schedule::{parse_interval, validate_duration, validate_time_of_day};
use serde::{Deserialize, Serialize};

use crate::{Habit, HabitId};

/// Field name a validation failure is reported under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Interval,
    Date,
    RelatedHabit,
    IsNiceHabit,
    Error,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Interval => "interval",
            Self::Date => "date",
            Self::RelatedHabit => "related_habit",
            Self::IsNiceHabit => "is_nice_habit",
            Self::Error => "error",
        })
    }
}

/// One failed rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: Field,
    pub message: String,
}

impl FieldError {
    pub fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Every failed rule for one draft.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn push(&mut self, error: FieldError) {
        self.errors.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Messages grouped by field, in the shape API clients receive.
    pub fn by_field(&self) -> BTreeMap<Field, Vec<String>> {
        let mut map: BTreeMap<Field, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            map.entry(error.field).or_default().push(error.message.clone());
        }
        map
    }

    /// Messages reported under `field`.
    pub fn messages(&self, field: Field) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.by_field().serialize(serializer)
    }
}

/// Raw habit input. Every field is optional so the same struct serves
/// creation and partial updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HabitDraft {
    pub place: Option<String>,
    pub action: Option<String>,
    /// `HH:MM`
    pub time_to_do: Option<String>,
    /// `D/H/M`
    pub interval: Option<String>,
    /// `M:SS`
    pub time_to_done: Option<String>,
    pub is_nice_habit: Option<bool>,
    pub related_habit: Option<HabitId>,
    pub reward: Option<String>,
    pub is_published: Option<bool>,
}

/// A draft together with the records its rules refer to.
#[derive(Debug, Clone, Copy)]
pub struct DraftContext<'a> {
    pub draft: &'a HabitDraft,
    /// The habit named by `draft.related_habit`, when it exists.
    pub related: Option<&'a Habit>,
    /// The habit being updated, absent on creation.
    pub current: Option<&'a Habit>,
}

impl DraftContext<'_> {
    /// Related habit after the draft is applied to the current habit.
    pub fn related_habit(&self) -> Option<HabitId> {
        self.draft
            .related_habit
            .or(self.current.and_then(|h| h.related_habit))
    }

    /// Whether a non-empty reward remains after the draft is applied.
    /// An empty reward in the draft clears the current one.
    pub fn has_reward(&self) -> bool {
        match self.draft.reward.as_deref() {
            Some(reward) => !reward.is_empty(),
            None => self
                .current
                .and_then(|h| h.reward.as_deref())
                .is_some_and(|r| !r.is_empty()),
        }
    }

    pub fn is_nice_habit(&self) -> bool {
        self.draft
            .is_nice_habit
            .or(self.current.map(|h| h.is_nice_habit))
            .unwrap_or(false)
    }
}

/// A single rule over a draft.
pub type Validator = fn(&DraftContext<'_>) -> Result<(), FieldError>;

/// Every rule a habit draft must pass.
pub const VALIDATORS: &[Validator] = &[
    validate_interval,
    validate_time_to_do,
    validate_time_to_done,
    validate_reward_or_related,
    validate_nice_habit,
    validate_related_is_nice,
    validate_related_publicity,
];

/// Run every validator and collect the failures.
pub fn validate_draft(ctx: &DraftContext<'_>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    for validator in VALIDATORS {
        if let Err(error) = validator(ctx) {
            errors.push(error);
        }
    }
    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

pub fn validate_interval(ctx: &DraftContext<'_>) -> Result<(), FieldError> {
    match ctx.draft.interval.as_deref() {
        Some(raw) => parse_interval(Some(raw))
            .map(|_| ())
            .map_err(|e| FieldError::new(Field::Interval, e.to_string())),
        None => Ok(()),
    }
}

pub fn validate_time_to_do(ctx: &DraftContext<'_>) -> Result<(), FieldError> {
    match ctx.draft.time_to_do.as_deref() {
        Some(raw) => validate_time_of_day(raw)
            .map(|_| ())
            .map_err(|e| FieldError::new(Field::Date, e.to_string())),
        None => Ok(()),
    }
}

pub fn validate_time_to_done(ctx: &DraftContext<'_>) -> Result<(), FieldError> {
    match ctx.draft.time_to_done.as_deref() {
        Some(raw) => validate_duration(raw)
            .map(|_| ())
            .map_err(|e| FieldError::new(Field::Date, e.to_string())),
        None => Ok(()),
    }
}

pub fn validate_reward_or_related(ctx: &DraftContext<'_>) -> Result<(), FieldError> {
    if ctx.related_habit().is_some() && ctx.has_reward() {
        return Err(FieldError::new(
            Field::Error,
            "related_habit and reward cannot be set together",
        ));
    }
    Ok(())
}

pub fn validate_nice_habit(ctx: &DraftContext<'_>) -> Result<(), FieldError> {
    if ctx.is_nice_habit() && (ctx.has_reward() || ctx.related_habit().is_some()) {
        return Err(FieldError::new(
            Field::IsNiceHabit,
            "a nice habit cannot have a reward or a related habit",
        ));
    }
    Ok(())
}

pub fn validate_related_is_nice(ctx: &DraftContext<'_>) -> Result<(), FieldError> {
    let Some(id) = ctx.draft.related_habit else {
        return Ok(());
    };
    match ctx.related {
        None => Err(FieldError::new(
            Field::RelatedHabit,
            format!("related habit {id} does not exist"),
        )),
        Some(related) if !related.is_nice_habit => Err(FieldError::new(
            Field::RelatedHabit,
            "a related habit can only be a nice habit",
        )),
        Some(_) => Ok(()),
    }
}

/// The draft's effective publicity must equal the related habit's.
pub fn validate_related_publicity(ctx: &DraftContext<'_>) -> Result<(), FieldError> {
    let Some(related) = ctx.related else {
        return Ok(());
    };
    let is_published = ctx
        .draft
        .is_published
        .or(ctx.current.map(|h| h.is_published))
        .unwrap_or(false);
    if is_published != related.is_published {
        return Err(FieldError::new(
            Field::RelatedHabit,
            "the related habit and the current one cannot have different publicity",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OwnerId;
    use habitual_schedule::{IntervalUnit, RecurrenceInterval, ScheduleId, TimeOfDay};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn habit(id: i64, is_nice_habit: bool, is_published: bool) -> Habit {
        Habit {
            id: HabitId(id),
            owner_id: OwnerId(1),
            place: "home".to_string(),
            action: "read".to_string(),
            time_to_do: TimeOfDay {
                id: ScheduleId(1),
                hour: 18,
                minute: 30,
            },
            interval: RecurrenceInterval {
                id: ScheduleId(2),
                unit: IntervalUnit::Day,
                every: 1,
            },
            time_to_done_secs: 60,
            is_nice_habit,
            related_habit: None,
            reward: None,
            is_published,
        }
    }

    fn ctx<'a>(draft: &'a HabitDraft, related: Option<&'a Habit>) -> DraftContext<'a> {
        DraftContext {
            draft,
            related,
            current: None,
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        let draft = HabitDraft {
            place: Some("park".to_string()),
            action: Some("walk".to_string()),
            time_to_do: Some("18:41".to_string()),
            interval: Some("2/0/0".to_string()),
            time_to_done: Some("1:32".to_string()),
            is_nice_habit: Some(false),
            reward: Some("cake".to_string()),
            ..Default::default()
        };
        assert!(validate_draft(&ctx(&draft, None)).is_ok());
    }

    #[test]
    fn test_errors_are_collected_per_field() {
        let draft = HabitDraft {
            time_to_do: Some("25:00".to_string()),
            interval: Some("7/20/0".to_string()),
            time_to_done: Some("2:01".to_string()),
            ..Default::default()
        };
        let errors = validate_draft(&ctx(&draft, None)).unwrap_err();

        assert_eq!(
            errors.messages(Field::Interval),
            vec!["an interval cannot set days, hours or minutes at the same time"]
        );
        assert_eq!(
            errors.messages(Field::Date),
            vec![
                "hour value cannot be less than 0 or greater than 23",
                "more than two minutes were given",
            ]
        );
        assert_eq!(errors.errors().len(), 3);
    }

    #[test]
    fn test_reward_and_related_conflict() {
        let related = habit(2, true, false);
        let draft = HabitDraft {
            related_habit: Some(related.id),
            reward: Some("cake".to_string()),
            ..Default::default()
        };
        let err = validate_reward_or_related(&ctx(&draft, Some(&related))).unwrap_err();
        assert_eq!(err.field, Field::Error);
    }

    #[test]
    fn test_nice_habit_cannot_have_reward() {
        let draft = HabitDraft {
            is_nice_habit: Some(true),
            reward: Some("cake".to_string()),
            ..Default::default()
        };
        let err = validate_nice_habit(&ctx(&draft, None)).unwrap_err();
        assert_eq!(err.field, Field::IsNiceHabit);

        let plain = HabitDraft {
            is_nice_habit: Some(true),
            ..Default::default()
        };
        assert!(validate_nice_habit(&ctx(&plain, None)).is_ok());
    }

    #[test]
    fn test_related_habit_must_be_nice() {
        let useful = habit(2, false, false);
        let draft = HabitDraft {
            related_habit: Some(useful.id),
            ..Default::default()
        };
        let err = validate_related_is_nice(&ctx(&draft, Some(&useful))).unwrap_err();
        assert_eq!(err.message, "a related habit can only be a nice habit");
    }

    #[test]
    fn test_missing_related_habit_is_reported() {
        let draft = HabitDraft {
            related_habit: Some(HabitId(99)),
            ..Default::default()
        };
        let err = validate_related_is_nice(&ctx(&draft, None)).unwrap_err();
        assert_eq!(err.field, Field::RelatedHabit);
    }

    #[test]
    fn test_related_publicity_must_match() {
        let public_nice = habit(2, true, true);
        let draft = HabitDraft {
            related_habit: Some(public_nice.id),
            is_published: Some(false),
            ..Default::default()
        };
        assert!(validate_related_publicity(&ctx(&draft, Some(&public_nice))).is_err());

        // An update that leaves publicity alone uses the current value
        let current = habit(1, false, true);
        let partial = HabitDraft {
            related_habit: Some(public_nice.id),
            ..Default::default()
        };
        let with_current = DraftContext {
            draft: &partial,
            related: Some(&public_nice),
            current: Some(&current),
        };
        assert!(validate_related_publicity(&with_current).is_ok());
    }

    #[test]
    fn test_partial_update_checks_stored_fields() {
        let nice = habit(2, true, false);
        let mut rewarded = habit(1, false, false);
        rewarded.reward = Some("cake".to_string());

        let link = HabitDraft {
            related_habit: Some(nice.id),
            ..Default::default()
        };
        let linking = DraftContext {
            draft: &link,
            related: Some(&nice),
            current: Some(&rewarded),
        };
        let err = validate_reward_or_related(&linking).unwrap_err();
        assert_eq!(err.field, Field::Error);

        // Clearing the reward in the same update is allowed
        let swap = HabitDraft {
            related_habit: Some(nice.id),
            reward: Some(String::new()),
            ..Default::default()
        };
        let swapping = DraftContext {
            draft: &swap,
            related: Some(&nice),
            current: Some(&rewarded),
        };
        assert!(validate_draft(&swapping).is_ok());

        let make_nice = HabitDraft {
            is_nice_habit: Some(true),
            ..Default::default()
        };
        let flipping = DraftContext {
            draft: &make_nice,
            related: None,
            current: Some(&rewarded),
        };
        let err = validate_nice_habit(&flipping).unwrap_err();
        assert_eq!(err.field, Field::IsNiceHabit);
    }

    #[test]
    fn test_errors_serialize_by_field() {
        let mut errors = ValidationErrors::default();
        errors.push(FieldError::new(Field::Interval, "a"));
        errors.push(FieldError::new(Field::Date, "b"));
        errors.push(FieldError::new(Field::Date, "c"));

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({"interval": ["a"], "date": ["b", "c"]}));
    }

    #[test_case(HabitDraft { interval: Some("0/0/0".into()), ..Default::default() }, Field::Interval ; "empty interval")]
    #[test_case(HabitDraft { interval: Some("8/0/0".into()), ..Default::default() }, Field::Interval ; "day out of range")]
    #[test_case(HabitDraft { time_to_do: Some("18-30".into()), ..Default::default() }, Field::Date ; "wrong separator")]
    #[test_case(HabitDraft { time_to_done: Some("1:60".into()), ..Default::default() }, Field::Date ; "seconds out of range")]
    #[test_case(HabitDraft { is_nice_habit: Some(true), related_habit: Some(HabitId(3)), ..Default::default() }, Field::IsNiceHabit ; "nice habit with related")]
    fn test_draft_error_field(draft: HabitDraft, field: Field) {
        let errors = validate_draft(&ctx(&draft, None)).unwrap_err();
        assert!(!errors.messages(field).is_empty(), "{errors}");
    }
}
