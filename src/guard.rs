use serde_json::Value;

use crate::consts::{INTERVAL_LIMIT, MIN_INTERVAL};

/// An edit of one form field, addressed by its dotted path (`repeat.weekly.interval`).
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    pub name: String,
    pub value: Value,
}

impl FieldChange {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Filters free-text input for a numeric field.
///
/// Returns the change to apply when `raw` reads as a whole number in
/// `MIN_INTERVAL..INTERVAL_LIMIT`; anything else is dropped without error.
pub fn guard(name: &str, raw: &str) -> Option<FieldChange> {
    let trimmed = raw.trim();
    let number = if trimmed.is_empty() {
        0.0
    } else {
        trimmed.parse::<f64>().ok()?
    };

    let in_range =
        number >= f64::from(MIN_INTERVAL) && number < f64::from(INTERVAL_LIMIT);
    if number.is_nan() || !in_range || number.fract() != 0.0 {
        tracing::debug!("Rejected numeric input {:?} for {}", raw, name);
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let value = number as u16;
    Some(FieldChange::new(name, value))
}

/// Wraps a change handler so that it only ever sees guarded numeric input.
pub fn numeric_field_handler<F>(mut callback: F) -> impl FnMut(&str, &str)
where
    F: FnMut(FieldChange),
{
    move |name, raw| {
        if let Some(change) = guard(name, raw) {
            callback(change);
        }
    }
}
