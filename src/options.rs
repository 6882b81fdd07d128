use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::consts::{
    DTSTART_PREFIX, FREQUENCY_NAMES, LIST_SEPARATOR, MAX_MONTHDAY, MAX_SETPOS,
    MAX_WEEKDAY_ORDINAL, PART_SEPARATOR, RRULE_DATE_FORMAT, RRULE_FLOATING_FORMAT, RRULE_PREFIX,
    RRULE_TIMESTAMP_FORMAT,
};
use crate::types::Weekday;

/// Properties that are valid in a rule but have no place in the form.
/// They are accepted and dropped.
const UNMAPPED_PROPERTIES: [&str; 6] = [
    "BYHOUR",
    "BYMINUTE",
    "BYSECOND",
    "BYYEARDAY",
    "BYWEEKNO",
    "BYEASTER",
];

/// Error type for rule text and rule options.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("Empty rule string")]
    EmptyInput,

    /// A rule part without `=`.
    #[error("Invalid rule part (expected KEY=VALUE): {0}")]
    MissingSeparator(String),

    #[error("Unknown RRULE property '{0}'")]
    UnknownProperty(String),

    #[error("Invalid {key} value: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid date-time: {0}")]
    InvalidDateTime(String),

    #[error("Unsupported line: {0}")]
    UnsupportedLine(String),

    #[error("FREQ is required")]
    MissingFrequency,

    #[error("{key} out of range: {value}")]
    OutOfRange { key: &'static str, value: i64 },

    #[error("COUNT and UNTIL cannot both be set")]
    CountWithUntil,
}

/// A `BYDAY` entry: a weekday with an optional ordinal (`-1FR` is the last Friday).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdaySpec {
    pub weekday: Weekday,
    pub n: Option<i8>,
}

impl WeekdaySpec {
    pub const fn new(weekday: Weekday) -> Self {
        Self { weekday, n: None }
    }
}

impl From<Weekday> for WeekdaySpec {
    fn from(weekday: Weekday) -> Self {
        Self::new(weekday)
    }
}

impl fmt::Display for WeekdaySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.n {
            Some(n) => write!(f, "{n}{}", self.weekday.code()),
            None => f.write_str(self.weekday.code()),
        }
    }
}

impl FromStr for WeekdaySpec {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RuleError::InvalidValue {
            key: "BYDAY".to_owned(),
            value: s.to_owned(),
        };
        let trimmed = s.trim();
        let split = trimmed.len().checked_sub(2).ok_or_else(invalid)?;
        if !trimmed.is_char_boundary(split) {
            return Err(invalid());
        }
        let (ordinal, code) = trimmed.split_at(split);
        let weekday = Weekday::from_code(code).ok_or_else(invalid)?;
        let n = if ordinal.is_empty() {
            None
        } else {
            Some(ordinal.trim_start_matches('+').parse::<i8>().map_err(|_| invalid())?)
        };
        Ok(Self { weekday, n })
    }
}

/// The options of a recurrence rule, holding only what the rule text states.
///
/// `freq` is the numeric frequency code: 0 = YEARLY, 1 = MONTHLY, 2 = WEEKLY,
/// 3 = DAILY, 4 = HOURLY, 5 = MINUTELY, 6 = SECONDLY.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleOptions {
    pub freq: Option<u8>,
    pub dtstart: Option<DateTime<Utc>>,
    pub interval: Option<u32>,
    pub wkst: Option<Weekday>,
    pub count: Option<u32>,
    pub until: Option<DateTime<Utc>>,
    pub bysetpos: Vec<i16>,
    pub bymonth: Vec<u8>,
    pub bymonthday: Vec<i8>,
    pub byweekday: Vec<WeekdaySpec>,
}

impl RuleOptions {
    /// Pins the start of the rule, replacing any `DTSTART` the text carried
    pub fn with_dtstart(mut self, dtstart: DateTime<Utc>) -> Self {
        self.dtstart = Some(dtstart);
        self
    }

    /// Weekday indices named by `BYDAY`, ordinals dropped
    pub fn weekday_indices(&self) -> Vec<u8> {
        self.byweekday.iter().map(|spec| spec.weekday.index()).collect()
    }

    /// Checks the combination of options before they are turned into rule text.
    ///
    /// # Errors
    /// Returns `RuleError` for a missing or unknown frequency, a zero interval,
    /// out-of-range `BY*` values, or `COUNT` together with `UNTIL`.
    pub fn validate(&self) -> Result<(), RuleError> {
        let freq = self.freq.ok_or(RuleError::MissingFrequency)?;
        if usize::from(freq) >= FREQUENCY_NAMES.len() {
            return Err(RuleError::OutOfRange {
                key: "FREQ",
                value: i64::from(freq),
            });
        }
        if self.interval == Some(0) {
            return Err(RuleError::OutOfRange {
                key: "INTERVAL",
                value: 0,
            });
        }
        if let Some(&month) = self.bymonth.iter().find(|m| !(1..=12).contains(*m)) {
            return Err(RuleError::OutOfRange {
                key: "BYMONTH",
                value: i64::from(month),
            });
        }
        if let Some(&day) = self
            .bymonthday
            .iter()
            .find(|d| **d == 0 || d.unsigned_abs() > MAX_MONTHDAY.unsigned_abs())
        {
            return Err(RuleError::OutOfRange {
                key: "BYMONTHDAY",
                value: i64::from(day),
            });
        }
        if let Some(&pos) = self
            .bysetpos
            .iter()
            .find(|p| **p == 0 || p.unsigned_abs() > MAX_SETPOS.unsigned_abs())
        {
            return Err(RuleError::OutOfRange {
                key: "BYSETPOS",
                value: i64::from(pos),
            });
        }
        if let Some(n) = self
            .byweekday
            .iter()
            .filter_map(|spec| spec.n)
            .find(|n| *n == 0 || n.unsigned_abs() > MAX_WEEKDAY_ORDINAL.unsigned_abs())
        {
            return Err(RuleError::OutOfRange {
                key: "BYDAY",
                value: i64::from(n),
            });
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(RuleError::CountWithUntil);
        }
        Ok(())
    }

    /// Validates the options and renders them as rule text.
    ///
    /// # Errors
    /// See [`RuleOptions::validate`].
    pub fn to_rule_string(&self) -> Result<String, RuleError> {
        self.validate()?;
        Ok(self.to_string())
    }

    fn rule_parts(&self) -> Vec<String> {
        let mut parts = Vec::new();

        if let Some(name) = self
            .freq
            .and_then(|freq| FREQUENCY_NAMES.get(usize::from(freq)))
        {
            parts.push(format!("FREQ={name}"));
        }
        if let Some(interval) = self.interval {
            parts.push(format!("INTERVAL={interval}"));
        }
        if let Some(wkst) = self.wkst {
            parts.push(format!("WKST={}", wkst.code()));
        }
        if let Some(count) = self.count {
            parts.push(format!("COUNT={count}"));
        }
        if let Some(until) = self.until {
            parts.push(format!("UNTIL={}", until.format(RRULE_TIMESTAMP_FORMAT)));
        }
        if !self.bysetpos.is_empty() {
            parts.push(format!("BYSETPOS={}", join_list(&self.bysetpos)));
        }
        if !self.bymonth.is_empty() {
            parts.push(format!("BYMONTH={}", join_list(&self.bymonth)));
        }
        if !self.bymonthday.is_empty() {
            parts.push(format!("BYMONTHDAY={}", join_list(&self.bymonthday)));
        }
        if !self.byweekday.is_empty() {
            parts.push(format!("BYDAY={}", join_list(&self.byweekday)));
        }

        parts
    }

    fn parse_rule(&mut self, rule: &str) -> Result<(), RuleError> {
        for part in rule.split(PART_SEPARATOR).map(str::trim) {
            if part.is_empty() {
                continue;
            }
            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| RuleError::MissingSeparator(part.to_owned()))?;
            let key = key.trim().to_ascii_uppercase();
            let value = value.trim();

            match key.as_str() {
                "FREQ" => {
                    let code = FREQUENCY_NAMES
                        .iter()
                        .position(|name| name.eq_ignore_ascii_case(value))
                        .and_then(|code| u8::try_from(code).ok())
                        .ok_or_else(|| invalid_value(&key, value))?;
                    self.freq = Some(code);
                }
                "INTERVAL" => self.interval = Some(parse_number(&key, value)?),
                "COUNT" => self.count = Some(parse_number(&key, value)?),
                "UNTIL" => self.until = Some(parse_timestamp(value)?),
                "WKST" => {
                    self.wkst =
                        Some(Weekday::from_code(value).ok_or_else(|| invalid_value(&key, value))?);
                }
                "BYSETPOS" => self.bysetpos = parse_list(&key, value)?,
                "BYMONTH" => self.bymonth = parse_list(&key, value)?,
                "BYMONTHDAY" => self.bymonthday = parse_list(&key, value)?,
                "BYDAY" => {
                    self.byweekday = value
                        .split(LIST_SEPARATOR)
                        .map(str::parse)
                        .collect::<Result<_, _>>()?;
                }
                other if UNMAPPED_PROPERTIES.contains(&other) => {
                    tracing::debug!("Dropping RRULE property with no form field: {}", other);
                }
                other => return Err(RuleError::UnknownProperty(other.to_owned())),
            }
        }
        Ok(())
    }
}

impl FromStr for RuleOptions {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RuleError::EmptyInput);
        }

        let mut options = Self::default();
        for line in trimmed.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let upper = line.to_ascii_uppercase();
            if upper.starts_with(RRULE_PREFIX) {
                options.parse_rule(&line[RRULE_PREFIX.len()..])?;
            } else if upper.starts_with(DTSTART_PREFIX) {
                options.dtstart = Some(parse_dtstart_line(line)?);
            } else if line.contains(':') {
                return Err(RuleError::UnsupportedLine(line.to_owned()));
            } else {
                // Bare rule without the `RRULE:` prefix
                options.parse_rule(line)?;
            }
        }
        Ok(options)
    }
}

impl fmt::Display for RuleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(dtstart) = self.dtstart {
            writeln!(
                f,
                "{DTSTART_PREFIX}:{}",
                dtstart.format(RRULE_TIMESTAMP_FORMAT)
            )?;
        }
        write!(f, "{RRULE_PREFIX}{}", self.rule_parts().join(";"))
    }
}

fn invalid_value(key: &str, value: &str) -> RuleError {
    RuleError::InvalidValue {
        key: key.to_owned(),
        value: value.to_owned(),
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, RuleError> {
    value.parse().map_err(|_| invalid_value(key, value))
}

fn parse_list<T: FromStr>(key: &str, value: &str) -> Result<Vec<T>, RuleError> {
    value
        .split(LIST_SEPARATOR)
        .map(|item| {
            let item = item.trim();
            item.trim_start_matches('+')
                .parse()
                .map_err(|_| invalid_value(key, item))
        })
        .collect()
}

fn join_list<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// `DTSTART:<ts>` or `DTSTART;TZID=...:<ts>`.
/// Zone parameters are not interpreted; the time is read as UTC.
fn parse_dtstart_line(line: &str) -> Result<DateTime<Utc>, RuleError> {
    let (head, value) = line
        .split_once(':')
        .ok_or_else(|| RuleError::InvalidDateTime(line.to_owned()))?;
    if head.contains(';') {
        tracing::debug!("Reading DTSTART with parameters as UTC: {}", head);
    }
    parse_timestamp(value.trim())
}

/// Parses `YYYYMMDDTHHMMSSZ`, floating `YYYYMMDDTHHMMSS`, or `YYYYMMDD`
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RuleError> {
    let invalid = || RuleError::InvalidDateTime(value.to_owned());

    if let Some(utc) = value.strip_suffix('Z') {
        NaiveDateTime::parse_from_str(utc, RRULE_FLOATING_FORMAT)
            .map(|dt| dt.and_utc())
            .map_err(|_| invalid())
    } else if value.len() == 8 {
        NaiveDate::parse_from_str(value, RRULE_DATE_FORMAT)
            .map(|date| date.and_time(NaiveTime::MIN).and_utc())
            .map_err(|_| invalid())
    } else {
        NaiveDateTime::parse_from_str(value, RRULE_FLOATING_FORMAT)
            .map(|dt| dt.and_utc())
            .map_err(|_| invalid())
    }
}
