use serde_json::Value;

use crate::decode::decode;
use crate::encode::encode;
use crate::guard::{FieldChange, guard};
use crate::options::RuleError;
use crate::state::{FormState, GeneratorConfig, InitialState, StateError, initialize};
use crate::translate::Translations;

/// Receives the rule text after every successful edit
pub type ChangeCallback = Box<dyn FnMut(&str)>;

/// Error type for the form controller.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// The owner supplied no change callback.
    #[error("RRuleGenerator requires an on_change callback")]
    MissingOnChange,

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    State(#[from] StateError),
}

/// Everything the owner of a form hands over when creating it.
#[derive(Default)]
pub struct GeneratorProps {
    /// Rule text the form starts from; empty means the configured defaults
    pub value: String,
    pub config: GeneratorConfig,
    pub on_change: Option<ChangeCallback>,
    /// Passed through to both date fields untouched
    pub calendar_component: Option<Value>,
    pub id: Option<String>,
}

/// A mounted recurrence form.
///
/// Holds the form state and keeps it in step with the owner's rule text in
/// both directions: incoming text is decoded into the state, and every field
/// edit is encoded and reported through the change callback.
pub struct RRuleGenerator {
    id: String,
    state: FormState,
    value: String,
    on_change: ChangeCallback,
}

impl RRuleGenerator {
    /// Creates the form and decodes `props.value` into it.
    ///
    /// # Errors
    /// Returns `GeneratorError::MissingOnChange` when no callback is given,
    /// and `GeneratorError::Rule` if the default state cannot be encoded.
    pub fn new(props: GeneratorProps) -> Result<Self, GeneratorError> {
        let on_change = props.on_change.ok_or(GeneratorError::MissingOnChange)?;
        let InitialState { id, data, .. } =
            initialize(&props.config, props.calendar_component, props.id.as_deref())?;

        let mut generator = Self {
            id,
            state: data,
            value: String::new(),
            on_change,
        };
        generator.receive_value(&props.value);
        Ok(generator)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub const fn state(&self) -> &FormState {
        &self.state
    }

    /// The last rule text received from the owner or reported to it
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Takes a new rule text from the owner.
    ///
    /// Empty text and text equal to the current value are ignored.
    pub fn receive_value(&mut self, value: &str) {
        if value.is_empty() || value == self.value {
            return;
        }
        tracing::debug!("{}: decoding {:?}", self.id, value);
        self.state = decode(&self.state, value);
        value.clone_into(&mut self.value);
    }

    /// Applies a field edit, re-encodes the rule and reports it to the owner.
    ///
    /// Edits of a branch that is not selected are kept, even though they do not
    /// show in the rule text.
    ///
    /// # Errors
    /// Returns `GeneratorError::State` for an unknown field or a value of the
    /// wrong shape, and `GeneratorError::Rule` when the edited state cannot be
    /// encoded. The form is left unchanged in both cases.
    pub fn handle_change(&mut self, change: FieldChange) -> Result<(), GeneratorError> {
        let FieldChange { name, value } = change;
        let state = self.state.with_field(&name, value)?;
        let rrule = encode(&state).inspect_err(|err| {
            tracing::warn!("{}: could not encode after editing {}: {}", self.id, name, err);
        })?;

        tracing::trace!("{}: {} changed, rule is now {}", self.id, name, rrule);
        self.state = state;
        (self.on_change)(&rrule);
        self.value = rrule;
        Ok(())
    }

    /// Applies free-text input for a numeric field, dropping anything the
    /// guard rejects.
    ///
    /// # Errors
    /// See [`RRuleGenerator::handle_change`].
    pub fn handle_numeric_input(&mut self, name: &str, raw: &str) -> Result<(), GeneratorError> {
        match guard(name, raw) {
            Some(change) => self.handle_change(change),
            None => Ok(()),
        }
    }

    /// Message for the last rule text that failed to decode, unless errors are hidden
    pub fn error_message(&self, translations: &Translations) -> Option<String> {
        if self.state.options.hide_error {
            return None;
        }
        let error = self.state.error.as_ref()?;
        translations.translate("invalid_rrule", &[("value", &error.value)])
    }
}

impl std::fmt::Debug for RRuleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RRuleGenerator")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EndMode, Frequency};
    use serde_json::json;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_props(value: &str) -> (GeneratorProps, Rc<RefCell<Vec<String>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let props = GeneratorProps {
            value: value.to_owned(),
            on_change: Some(Box::new(move |rrule: &str| {
                sink.borrow_mut().push(rrule.to_owned());
            })),
            ..GeneratorProps::default()
        };
        (props, seen)
    }

    #[test]
    fn test_missing_callback_is_fatal() {
        let result = RRuleGenerator::new(GeneratorProps::default());
        assert!(matches!(result, Err(GeneratorError::MissingOnChange)));
    }

    #[test]
    fn test_initial_value_is_decoded_without_notifying() {
        let (props, seen) = recording_props("RRULE:FREQ=WEEKLY;INTERVAL=2;BYDAY=TU,TH");
        let generator = RRuleGenerator::new(props).unwrap();

        assert_eq!(generator.state().repeat.frequency, Frequency::Weekly);
        assert_eq!(generator.state().repeat.weekly.interval, 2);
        assert!(generator.id().starts_with("rrule-"));
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_explicit_id_is_kept() {
        let (mut props, _) = recording_props("");
        props.id = Some("meeting-rule".to_owned());
        let generator = RRuleGenerator::new(props).unwrap();
        assert_eq!(generator.id(), "meeting-rule");
    }

    #[test]
    fn test_edit_encodes_and_notifies() {
        let (props, seen) = recording_props("");
        let mut generator = RRuleGenerator::new(props).unwrap();

        generator
            .handle_change(FieldChange::new("repeat.frequency", "Daily"))
            .unwrap();
        generator
            .handle_change(FieldChange::new("repeat.daily.interval", 3))
            .unwrap();

        assert_eq!(
            *seen.borrow(),
            vec![
                "RRULE:FREQ=DAILY;INTERVAL=1".to_owned(),
                "RRULE:FREQ=DAILY;INTERVAL=3".to_owned(),
            ]
        );
        assert_eq!(generator.value(), "RRULE:FREQ=DAILY;INTERVAL=3");
    }

    #[test]
    fn test_inactive_branch_edit_is_stored() {
        let (props, seen) = recording_props("RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO");
        let mut generator = RRuleGenerator::new(props).unwrap();

        generator
            .handle_change(FieldChange::new("repeat.monthly.interval", 5))
            .unwrap();

        assert_eq!(generator.state().repeat.monthly.interval, 5);
        assert_eq!(
            *seen.borrow(),
            vec!["RRULE:FREQ=WEEKLY;INTERVAL=1;BYDAY=MO".to_owned()]
        );
    }

    #[test]
    fn test_echoed_value_is_not_decoded_again() {
        let (props, _) = recording_props("");
        let mut generator = RRuleGenerator::new(props).unwrap();
        generator
            .handle_change(FieldChange::new("end.mode", "After"))
            .unwrap();
        let before = generator.state().clone();

        let echoed = generator.value().to_owned();
        generator.receive_value(&echoed);
        generator.receive_value("");
        assert_eq!(*generator.state(), before);

        generator.receive_value("RRULE:FREQ=HOURLY;INTERVAL=4");
        assert_eq!(generator.state().repeat.frequency, Frequency::Hourly);
        assert_eq!(generator.state().end.mode, EndMode::Never);
    }

    #[test]
    fn test_rejected_edits_leave_state() {
        let (props, seen) = recording_props("");
        let mut generator = RRuleGenerator::new(props).unwrap();
        let before = generator.state().clone();

        assert!(matches!(
            generator.handle_change(FieldChange::new("repeat.fortnightly", 1)),
            Err(GeneratorError::State(StateError::UnknownField(_)))
        ));
        assert!(matches!(
            generator.handle_change(FieldChange::new("repeat.daily.interval", "many")),
            Err(GeneratorError::State(StateError::InvalidValue { .. }))
        ));
        assert_eq!(*generator.state(), before);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_encoder_errors_propagate() {
        let (props, seen) = recording_props("");
        let mut generator = RRuleGenerator::new(props).unwrap();
        generator
            .handle_change(FieldChange::new("end.mode", "On date"))
            .unwrap();
        seen.borrow_mut().clear();

        let result = generator.handle_change(FieldChange::new("end.onDate.date", "someday"));
        assert!(matches!(
            result,
            Err(GeneratorError::Rule(RuleError::InvalidDateTime(_)))
        ));
        assert_eq!(generator.state().end.mode, EndMode::OnDate);
        assert!(seen.borrow().is_empty());
    }

    #[test]
    fn test_numeric_input_goes_through_guard() {
        let (props, seen) = recording_props("RRULE:FREQ=DAILY;INTERVAL=1");
        let mut generator = RRuleGenerator::new(props).unwrap();

        generator
            .handle_numeric_input("repeat.daily.interval", "0")
            .unwrap();
        generator
            .handle_numeric_input("repeat.daily.interval", "abc")
            .unwrap();
        assert!(seen.borrow().is_empty());
        assert_eq!(generator.state().repeat.daily.interval, 1);

        generator
            .handle_numeric_input("repeat.daily.interval", "12")
            .unwrap();
        assert_eq!(
            *seen.borrow(),
            vec!["RRULE:FREQ=DAILY;INTERVAL=12".to_owned()]
        );
    }

    #[test]
    fn test_error_message() {
        let (props, _) = recording_props("NOT_AN_RRULE");
        let generator = RRuleGenerator::new(props).unwrap();
        let message = generator.error_message(&Translations::english()).unwrap();
        assert!(message.contains("'NOT_AN_RRULE' is not a correct RRule string"));

        let (mut props, _) = recording_props("NOT_AN_RRULE");
        props.config = GeneratorConfig::from_json(r#"{"hideError": true}"#).unwrap();
        let hidden = RRuleGenerator::new(props).unwrap();
        assert!(hidden.state().error.is_some());
        assert_eq!(hidden.error_message(&Translations::english()), None);
    }

    #[test]
    fn test_calendar_component_passes_through() {
        let (mut props, _) = recording_props("");
        props.calendar_component = Some(json!({ "kind": "picker" }));
        let generator = RRuleGenerator::new(props).unwrap();
        assert_eq!(
            generator.state().start.on_date.options.calendar_component,
            Some(json!({ "kind": "picker" }))
        );
    }
}
