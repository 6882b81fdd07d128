use std::fmt;

use serde_json::{Value, json};

/// Signature of a caller-supplied translation function
pub type TranslateFn = dyn Fn(&str, &[(&str, &str)]) -> String + Send + Sync;

/// Source of the labels shown by the form.
pub enum Translations {
    /// Every lookup is delegated to the function, replacements included
    Function(Box<TranslateFn>),
    /// Nested table of labels addressed by dotted keys (`repeat.weekly.label`).
    /// A table that is not a JSON object translates nothing.
    Table(Value),
}

impl Translations {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&str, &[(&str, &str)]) -> String + Send + Sync + 'static,
    {
        Self::Function(Box::new(f))
    }

    pub const fn table(table: Value) -> Self {
        Self::Table(table)
    }

    /// Built-in English labels
    pub fn english() -> Self {
        Self::Table(english_table())
    }

    /// Resolves `key`, filling `%{name}` placeholders from `replacements`.
    ///
    /// Table lookups fall back to `[translation missing '<key>']`.
    /// Each replacement is applied to the label as found in the table, so when
    /// several are given only the last one shows up in the result.
    pub fn translate(&self, key: &str, replacements: &[(&str, &str)]) -> Option<String> {
        match self {
            Self::Function(f) => Some(f(key, replacements)),
            Self::Table(table @ Value::Object(_)) => {
                let text = lookup(table, key)
                    .map_or_else(|| format!("[translation missing '{key}']"), str::to_owned);
                Some(replace_placeholders(&text, replacements))
            }
            Self::Table(_) => None,
        }
    }
}

impl Default for Translations {
    fn default() -> Self {
        Self::english()
    }
}

impl fmt::Debug for Translations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(_) => f.write_str("Translations::Function(..)"),
            Self::Table(table) => f.debug_tuple("Translations::Table").field(table).finish(),
        }
    }
}

/// Free-function form of [`Translations::translate`]
pub fn translate(
    translations: &Translations,
    key: &str,
    replacements: &[(&str, &str)],
) -> Option<String> {
    translations.translate(key, replacements)
}

/// A key stored literally (dots included) wins over a nested path
fn lookup<'a>(table: &'a Value, key: &str) -> Option<&'a str> {
    if let Some(text) = table.get(key) {
        return text.as_str();
    }
    key.split('.')
        .try_fold(table, |node, segment| node.get(segment))
        .and_then(Value::as_str)
}

fn replace_placeholders(text: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = text.to_owned();
    for (name, value) in replacements {
        result = text.replacen(&format!("%{{{name}}}"), value, 1);
    }
    result
}

fn english_table() -> Value {
    json!({
        "locale": "en",
        "invalid_rrule": "You provided an invalid RRule value to component. '%{value}' is not a correct RRule string.",
        "months": {
            "jan": "Jan",
            "feb": "Feb",
            "mar": "Mar",
            "apr": "Apr",
            "may": "May",
            "jun": "Jun",
            "jul": "Jul",
            "aug": "Aug",
            "sep": "Sep",
            "oct": "Oct",
            "nov": "Nov",
            "dec": "Dec"
        },
        "days": {
            "monday": "Monday",
            "tuesday": "Tuesday",
            "wednesday": "Wednesday",
            "thursday": "Thursday",
            "friday": "Friday",
            "saturday": "Saturday",
            "sunday": "Sunday",
            "day": "Day",
            "weekday": "Weekday",
            "weekend day": "Weekend day"
        },
        "numerals": {
            "first": "First",
            "second": "Second",
            "third": "Third",
            "fourth": "Fourth",
            "last": "Last"
        },
        "start": {
            "label": "Start",
            "tooltip": "Datetime DTSTART from which the recurrence starts"
        },
        "repeat": {
            "label": "Repeat",
            "yearly": {
                "label": "Yearly",
                "on": "on",
                "on_the": "on the",
                "of": "of"
            },
            "monthly": {
                "label": "Monthly",
                "every": "every",
                "months": "month(s)",
                "on_day": "on day",
                "on_the": "on the"
            },
            "weekly": {
                "label": "Weekly",
                "every": "every",
                "weeks": "week(s)"
            },
            "daily": {
                "label": "Daily",
                "every": "every",
                "days": "day(s)"
            },
            "hourly": {
                "label": "Hourly",
                "every": "every",
                "hours": "hour(s)"
            }
        },
        "end": {
            "label": "End",
            "tooltip": "Datetime UNTIL after which the recurrence ends",
            "never": "Never",
            "after": "After",
            "on_date": "On date",
            "executions": "executions."
        }
    })
}
