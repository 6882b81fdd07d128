use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::consts::{DATE_TIME_FORMAT, RRULE_ID_PREFIX};
use crate::encode::encode;
use crate::options::RuleError;
use crate::types::{DayLabel, EndMode, Frequency, Mode, MonthName, Which};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Error type for form-state updates.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The dotted path does not name a field of the form.
    #[error("Unknown form field: {0}")]
    UnknownField(String),

    /// The value does not fit the field it was written to.
    #[error("Invalid value for {path}: {source}")]
    InvalidValue {
        path: String,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

/// Options recognised when a form is created.
///
/// Every key is optional, so `{}` is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Frequencies offered, the first one preselected
    #[serde(alias = "frequency")]
    pub repeat: Option<Vec<Frequency>>,
    /// Restricts yearly rules to a single mode
    pub yearly: Option<Mode>,
    /// Restricts monthly rules to a single mode
    pub monthly: Option<Mode>,
    /// End modes offered, the first one preselected
    pub end: Option<Vec<EndMode>>,
    /// Hides the start section and leaves `DTSTART` out of the rule (default `true`)
    pub hide_start: Option<bool>,
    pub hide_end: bool,
    pub hide_error: bool,
    pub week_starts_on_sunday: bool,
}

impl GeneratorConfig {
    /// Reads a configuration from its JSON form.
    ///
    /// # Errors
    /// Returns the `serde_json` error for malformed JSON or unknown option values.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn default_frequency(&self) -> Frequency {
        self.repeat
            .as_ref()
            .and_then(|list| list.first().copied())
            .unwrap_or(Frequency::Yearly)
    }

    fn default_end_mode(&self) -> EndMode {
        self.end
            .as_ref()
            .and_then(|list| list.first().copied())
            .unwrap_or(EndMode::Never)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateOptions {
    pub week_starts_on_sunday: bool,
    /// Date-picker handle owned by the host, carried through untouched
    #[serde(default)]
    pub calendar_component: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateField {
    pub date: String,
    pub options: DateOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartState {
    pub on_date: DateField,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeOptions {
    pub modes: Option<Mode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyOn {
    pub month: MonthName,
    pub day: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearlyOnThe {
    pub month: MonthName,
    pub day: DayLabel,
    pub which: Which,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearlyState {
    pub mode: Mode,
    pub on: YearlyOn,
    pub on_the: YearlyOnThe,
    pub options: ModeOptions,
}

impl YearlyState {
    /// With a configured mode only that mode is offered
    pub fn is_mode_available(&self, mode: Mode) -> bool {
        self.options.modes.is_none_or(|only| only == mode)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyOn {
    pub day: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyOnThe {
    pub day: DayLabel,
    pub which: Which,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyState {
    pub mode: Mode,
    pub interval: u16,
    pub on: MonthlyOn,
    pub on_the: MonthlyOnThe,
    pub options: ModeOptions,
}

impl MonthlyState {
    pub fn is_mode_available(&self, mode: Mode) -> bool {
        self.options.modes.is_none_or(|only| only == mode)
    }
}

/// One flag per weekday
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDays {
    pub mon: bool,
    pub tue: bool,
    pub wed: bool,
    pub thu: bool,
    pub fri: bool,
    pub sat: bool,
    pub sun: bool,
}

impl WeekDays {
    /// Flags for the given weekday indices (Monday = 0); other values are ignored
    pub fn from_indices(indices: &[u8]) -> Self {
        let has = |index: u8| indices.contains(&index);
        Self {
            mon: has(0),
            tue: has(1),
            wed: has(2),
            thu: has(3),
            fri: has(4),
            sat: has(5),
            sun: has(6),
        }
    }

    /// Indices of the set flags, Monday first
    pub fn indices(&self) -> Vec<u8> {
        [
            self.mon, self.tue, self.wed, self.thu, self.fri, self.sat, self.sun,
        ]
        .into_iter()
        .zip(0u8..)
        .filter_map(|(active, index)| active.then_some(index))
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyOptions {
    pub week_starts_on_sunday: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklyState {
    pub interval: u16,
    pub days: WeekDays,
    pub options: WeeklyOptions,
}

/// Daily and hourly rules only carry an interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalState {
    pub interval: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatOptions {
    pub frequency: Option<Vec<Frequency>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatState {
    pub frequency: Frequency,
    pub yearly: YearlyState,
    pub monthly: MonthlyState,
    pub weekly: WeeklyState,
    pub daily: IntervalState,
    pub hourly: IntervalState,
    pub options: RepeatOptions,
}

impl RepeatState {
    /// Without a configured list every frequency is offered
    pub fn is_frequency_available(&self, frequency: Frequency) -> bool {
        self.options
            .frequency
            .as_ref()
            .is_none_or(|list| list.contains(&frequency))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndOptions {
    pub modes: Option<Vec<EndMode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndState {
    pub mode: EndMode,
    pub after: u32,
    pub on_date: DateField,
    pub options: EndOptions,
}

impl EndState {
    pub fn is_mode_available(&self, mode: EndMode) -> bool {
        self.options
            .modes
            .as_ref()
            .is_none_or(|list| list.contains(&mode))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    pub hide_start: bool,
    pub hide_end: bool,
    pub hide_error: bool,
    pub week_starts_on_sunday: bool,
}

impl FormOptions {
    pub const fn shows_start(&self) -> bool {
        !self.hide_start
    }

    pub const fn shows_end(&self) -> bool {
        !self.hide_end
    }
}

/// Rule text that failed to decode, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormError {
    pub value: String,
    pub message: String,
}

/// The complete state of a recurrence form.
///
/// Branches of `repeat` that are not selected keep their values, so switching
/// the frequency back and forth loses nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormState {
    pub start: StartState,
    pub repeat: RepeatState,
    pub end: EndState,
    pub options: FormOptions,
    pub error: Option<FormError>,
}

impl FormState {
    /// Default state for `config`, with both dates set to now
    pub fn from_config(config: &GeneratorConfig, calendar_component: Option<Value>) -> Self {
        Self::from_config_at(config, calendar_component, Utc::now())
    }

    /// Default state for `config`, with both dates set to `now`
    pub fn from_config_at(
        config: &GeneratorConfig,
        calendar_component: Option<Value>,
        now: DateTime<Utc>,
    ) -> Self {
        let week_starts_on_sunday = config.week_starts_on_sunday;
        let date_field = || DateField {
            date: now.format(DATE_TIME_FORMAT).to_string(),
            options: DateOptions {
                week_starts_on_sunday,
                calendar_component: calendar_component.clone(),
            },
        };

        Self {
            start: StartState {
                on_date: date_field(),
            },
            repeat: RepeatState {
                frequency: config.default_frequency(),
                yearly: YearlyState {
                    mode: config.yearly.unwrap_or(Mode::On),
                    on: YearlyOn {
                        month: MonthName::Jan,
                        day: 1,
                    },
                    on_the: YearlyOnThe {
                        month: MonthName::Jan,
                        day: DayLabel::Monday,
                        which: Which::First,
                    },
                    options: ModeOptions {
                        modes: config.yearly,
                    },
                },
                monthly: MonthlyState {
                    mode: config.monthly.unwrap_or(Mode::On),
                    interval: 1,
                    on: MonthlyOn { day: 1 },
                    on_the: MonthlyOnThe {
                        day: DayLabel::Monday,
                        which: Which::First,
                    },
                    options: ModeOptions {
                        modes: config.monthly,
                    },
                },
                weekly: WeeklyState {
                    interval: 1,
                    days: WeekDays::default(),
                    options: WeeklyOptions {
                        week_starts_on_sunday,
                    },
                },
                daily: IntervalState { interval: 1 },
                hourly: IntervalState { interval: 1 },
                options: RepeatOptions {
                    frequency: config.repeat.clone(),
                },
            },
            end: EndState {
                mode: config.default_end_mode(),
                after: 1,
                on_date: date_field(),
                options: EndOptions {
                    modes: config.end.clone(),
                },
            },
            options: FormOptions {
                hide_start: config.hide_start.unwrap_or(true),
                hide_end: config.hide_end,
                hide_error: config.hide_error,
                week_starts_on_sunday,
            },
            error: None,
        }
    }

    /// Returns a copy with the field at `path` (e.g. `repeat.monthly.interval`)
    /// replaced by `value`. `self` is left as it was.
    ///
    /// # Errors
    /// Returns `StateError::UnknownField` when the path names no field and
    /// `StateError::InvalidValue` when the value does not fit the field.
    pub fn with_field(&self, path: &str, value: Value) -> Result<Self, StateError> {
        let mut tree = serde_json::to_value(self)?;
        let slot = path
            .split('.')
            .try_fold(&mut tree, |node, segment| node.get_mut(segment))
            .ok_or_else(|| StateError::UnknownField(path.to_owned()))?;
        *slot = value;

        serde_json::from_value(tree).map_err(|source| StateError::InvalidValue {
            path: path.to_owned(),
            source,
        })
    }
}

impl Default for FormState {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default(), None)
    }
}

/// A freshly configured form: its identifier, state, and the rule text of that state
#[derive(Debug, Clone, PartialEq)]
pub struct InitialState {
    pub id: String,
    pub data: FormState,
    pub rrule: String,
}

/// Builds the starting state of a form from its configuration.
///
/// An empty or missing `id` is replaced by a process-unique `rrule-<n>`.
///
/// # Errors
/// Returns `RuleError` if the default state cannot be encoded.
pub fn initialize(
    config: &GeneratorConfig,
    calendar_component: Option<Value>,
    id: Option<&str>,
) -> Result<InitialState, RuleError> {
    let id = match id {
        Some(id) if !id.is_empty() => id.to_owned(),
        _ => next_id(),
    };
    let data = FormState::from_config(config, calendar_component);
    let rrule = encode(&data)?;
    tracing::trace!("Initialized {} with {}", id, rrule);

    Ok(InitialState { id, data, rrule })
}

fn next_id() -> String {
    format!(
        "{RRULE_ID_PREFIX}{}",
        NEXT_ID.fetch_add(1, Ordering::Relaxed)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_defaults_from_empty_config() {
        let config = GeneratorConfig::from_json("{}").unwrap();
        let state = FormState::from_config_at(&config, None, fixed_now());

        assert_eq!(state.repeat.frequency, Frequency::Yearly);
        assert_eq!(state.repeat.yearly.mode, Mode::On);
        assert_eq!(state.repeat.monthly.mode, Mode::On);
        assert_eq!(state.end.mode, EndMode::Never);
        assert_eq!(state.end.after, 1);
        assert!(state.options.hide_start);
        assert!(!state.options.hide_end);
        assert!(!state.options.shows_start());
        assert!(state.options.shows_end());
        assert_eq!(state.start.on_date.date, "2024-03-05 09:30");
        assert_eq!(state.end.on_date.date, "2024-03-05 09:30");
        assert_eq!(state.error, None);
        assert!(state.repeat.is_frequency_available(Frequency::Hourly));
        assert!(state.end.is_mode_available(EndMode::OnDate));
    }

    #[test]
    fn test_config_selects_first_entries() {
        let config = GeneratorConfig::from_json(
            r#"{
                "repeat": ["Weekly", "Daily"],
                "yearly": "on the",
                "monthly": "on the",
                "end": ["After", "Never"],
                "hideStart": false,
                "hideError": true,
                "weekStartsOnSunday": true
            }"#,
        )
        .unwrap();
        let state = FormState::from_config_at(&config, Some(json!("picker")), fixed_now());

        assert_eq!(state.repeat.frequency, Frequency::Weekly);
        assert_eq!(state.repeat.yearly.mode, Mode::OnThe);
        assert_eq!(state.repeat.monthly.mode, Mode::OnThe);
        assert_eq!(state.end.mode, EndMode::After);
        assert!(!state.options.hide_start);
        assert!(state.options.hide_error);
        assert!(state.options.week_starts_on_sunday);
        assert!(state.repeat.weekly.options.week_starts_on_sunday);
        assert_eq!(
            state.start.on_date.options.calendar_component,
            Some(json!("picker"))
        );

        assert!(state.repeat.is_frequency_available(Frequency::Daily));
        assert!(!state.repeat.is_frequency_available(Frequency::Yearly));
        assert!(state.repeat.yearly.is_mode_available(Mode::OnThe));
        assert!(!state.repeat.yearly.is_mode_available(Mode::On));
        assert!(!state.end.is_mode_available(EndMode::OnDate));
    }

    #[test]
    fn test_frequency_alias_and_invalid_config() {
        let config = GeneratorConfig::from_json(r#"{"frequency": ["Monthly"]}"#).unwrap();
        assert_eq!(config.repeat, Some(vec![Frequency::Monthly]));

        assert!(GeneratorConfig::from_json(r#"{"repeat": ["Fortnightly"]}"#).is_err());
        assert!(GeneratorConfig::from_json(r#"{"end": "Never"}"#).is_err());
    }

    #[test]
    fn test_serialized_shape() {
        let state = FormState::from_config_at(&GeneratorConfig::default(), None, fixed_now());
        let tree = serde_json::to_value(&state).unwrap();

        assert_eq!(tree["repeat"]["frequency"], json!("Yearly"));
        assert_eq!(tree["repeat"]["yearly"]["onThe"]["which"], json!("First"));
        assert_eq!(tree["repeat"]["weekly"]["days"]["sun"], json!(false));
        assert_eq!(tree["end"]["mode"], json!("Never"));
        assert_eq!(tree["start"]["onDate"]["options"]["weekStartsOnSunday"], json!(false));
        assert_eq!(tree["options"]["hideStart"], json!(true));
        assert_eq!(tree["error"], Value::Null);
        assert_eq!(
            tree["start"]["onDate"]["options"]["calendarComponent"],
            Value::Null
        );
    }

    #[test]
    fn test_with_field_sets_absent_calendar_component() {
        let state = FormState::from_config_at(&GeneratorConfig::default(), None, fixed_now());
        let edited = state
            .with_field(
                "start.onDate.options.calendarComponent",
                json!({ "kind": "picker" }),
            )
            .unwrap();

        assert_eq!(
            edited.start.on_date.options.calendar_component,
            Some(json!({ "kind": "picker" }))
        );
        assert_eq!(edited.end.on_date.options.calendar_component, None);
    }

    #[test]
    fn test_with_field_leaves_receiver_untouched() {
        let state = FormState::from_config_at(&GeneratorConfig::default(), None, fixed_now());
        let edited = state
            .with_field("repeat.monthly.interval", json!(5))
            .unwrap();

        assert_eq!(edited.repeat.monthly.interval, 5);
        assert_eq!(state.repeat.monthly.interval, 1);
        assert_eq!(edited.repeat.weekly, state.repeat.weekly);
    }

    #[test]
    fn test_with_field_enum_values() {
        let state = FormState::from_config_at(&GeneratorConfig::default(), None, fixed_now());
        let edited = state
            .with_field("end.mode", json!("On date"))
            .unwrap()
            .with_field("repeat.yearly.onThe.day", json!("Weekend day"))
            .unwrap();

        assert_eq!(edited.end.mode, EndMode::OnDate);
        assert_eq!(edited.repeat.yearly.on_the.day, DayLabel::WeekendDay);
    }

    #[test]
    fn test_with_field_errors() {
        let state = FormState::from_config_at(&GeneratorConfig::default(), None, fixed_now());

        assert!(matches!(
            state.with_field("repeat.fortnightly.interval", json!(2)),
            Err(StateError::UnknownField(path)) if path == "repeat.fortnightly.interval"
        ));
        assert!(matches!(
            state.with_field("repeat.frequency", json!("Minutely")),
            Err(StateError::InvalidValue { .. })
        ));
        assert!(matches!(
            state.with_field("repeat.weekly.interval", json!("two")),
            Err(StateError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_week_days_indices() {
        let days = WeekDays::from_indices(&[1, 3, 9]);
        assert!(days.tue && days.thu);
        assert!(!days.mon && !days.sun);
        assert_eq!(days.indices(), vec![1, 3]);
        assert!(WeekDays::default().indices().is_empty());
    }

    #[test]
    fn test_initialize_ids() {
        let given = initialize(&GeneratorConfig::default(), None, Some("standup")).unwrap();
        assert_eq!(given.id, "standup");

        let first = initialize(&GeneratorConfig::default(), None, None).unwrap();
        let second = initialize(&GeneratorConfig::default(), None, Some("")).unwrap();
        assert!(first.id.starts_with(RRULE_ID_PREFIX));
        assert!(second.id.starts_with(RRULE_ID_PREFIX));
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_initialize_encodes_default_state() {
        let initial = initialize(&GeneratorConfig::default(), None, None).unwrap();
        assert_eq!(initial.rrule, "RRULE:FREQ=YEARLY;BYMONTH=1;BYMONTHDAY=1");
    }
}
