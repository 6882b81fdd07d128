//! Form-state model for iCalendar recurrence rules.
//!
//! A recurrence form is described by a nested [`FormState`]. Rule text such as
//! `RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH` is turned into that state with
//! [`decode`] and back with [`encode`]; [`RRuleGenerator`] keeps the two in step
//! for a mounted form.
//!
//! ```
//! use rrule_form::{FormState, Frequency, decode, encode};
//!
//! let state = decode(&FormState::default(), "RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH");
//! assert_eq!(state.repeat.frequency, Frequency::Weekly);
//! assert_eq!(
//!     encode(&state).unwrap(),
//!     "RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH"
//! );
//! ```

mod consts;
mod decode;
mod encode;
mod generator;
mod guard;
mod options;
mod prelude;
mod state;
mod translate;
mod types;

pub use consts::*;
pub use decode::{decode, derive_field};
pub use encode::encode;
pub use generator::{ChangeCallback, GeneratorError, GeneratorProps, RRuleGenerator};
pub use guard::{FieldChange, guard, numeric_field_handler};
pub use options::{RuleError, RuleOptions, WeekdaySpec};
pub use state::{
    DateField, DateOptions, EndOptions, EndState, FormError, FormOptions, FormState,
    GeneratorConfig, InitialState, IntervalState, ModeOptions, MonthlyOn, MonthlyOnThe,
    MonthlyState, RepeatOptions, RepeatState, StartState, StateError, WeekDays, WeeklyOptions,
    WeeklyState, YearlyOn, YearlyOnThe, YearlyState, initialize,
};
pub use translate::{TranslateFn, Translations, translate};
pub use types::{DayLabel, EndMode, Frequency, Mode, MonthName, Weekday, Which};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn form(config: &GeneratorConfig) -> FormState {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap();
        FormState::from_config_at(config, None, now)
    }

    #[test]
    fn test_weekly_tuesday_thursday() {
        let mut state = form(&GeneratorConfig::default());
        state.repeat.frequency = Frequency::Weekly;
        state.repeat.weekly.interval = 2;
        state.repeat.weekly.days.tue = true;
        state.repeat.weekly.days.thu = true;

        let text = encode(&state).unwrap();
        assert!(text.contains("FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH"));

        let options: RuleOptions = text.parse().unwrap();
        assert_eq!(options.weekday_indices(), vec![1, 3]);

        let decoded = decode(&form(&GeneratorConfig::default()), &text);
        assert_eq!(decoded.repeat.weekly.interval, 2);
        assert_eq!(decoded.repeat.weekly.days.indices(), vec![1, 3]);
    }

    #[test]
    fn test_monthly_last_friday() {
        let mut state = form(&GeneratorConfig::default());
        state.repeat.frequency = Frequency::Monthly;
        state.repeat.monthly.mode = Mode::OnThe;
        state.repeat.monthly.on_the.which = Which::Last;
        state.repeat.monthly.on_the.day = DayLabel::Friday;

        let text = encode(&state).unwrap();
        let options: RuleOptions = text.parse().unwrap();
        assert_eq!(options.bysetpos, vec![-1]);
        assert_eq!(options.weekday_indices(), vec![4]);

        let decoded = decode(&form(&GeneratorConfig::default()), &text);
        assert_eq!(decoded.repeat.monthly.on_the.which, Which::Last);
        assert_eq!(decoded.repeat.monthly.on_the.day, DayLabel::Friday);
    }

    #[test]
    fn test_frequency_isolation_through_field_edits() {
        let mut state = form(&GeneratorConfig::default());
        state.repeat.frequency = Frequency::Weekly;
        let before = encode(&state).unwrap();

        let edited = state
            .with_field("repeat.monthly.interval", json!(5))
            .unwrap();
        assert_eq!(edited.repeat.monthly.interval, 5);
        assert_eq!(encode(&edited).unwrap(), before);
        assert!(!before.contains("MONTHLY"));
    }

    #[test]
    fn test_configured_form_round_trip() {
        let config = GeneratorConfig::from_json(
            r#"{
                "repeat": ["Monthly", "Weekly"],
                "monthly": "on",
                "end": ["After", "Never"],
                "hideStart": false,
                "weekStartsOnSunday": true
            }"#,
        )
        .unwrap();
        let state = form(&config);
        assert_eq!(state.repeat.frequency, Frequency::Monthly);
        assert_eq!(state.end.mode, EndMode::After);
        assert!(!state.repeat.is_frequency_available(Frequency::Yearly));
        assert!(!state.repeat.monthly.is_mode_available(Mode::OnThe));

        let text = encode(&state).unwrap();
        assert_eq!(
            text,
            "DTSTART:20240305T093000Z\nRRULE:FREQ=MONTHLY;INTERVAL=1;WKST=SU;COUNT=1;BYMONTHDAY=1"
        );

        let decoded = decode(&form(&GeneratorConfig::default()), &text);
        assert_eq!(decoded.repeat.frequency, Frequency::Monthly);
        assert_eq!(decoded.end.mode, EndMode::After);
        assert_eq!(decoded.start.on_date.date, "2024-03-05 09:30");
        assert!(decoded.options.week_starts_on_sunday);
    }
}
