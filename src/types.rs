use crate::consts::{FREQUENCY_NAMES, MONTHS, WEEKDAY_CODES};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level recurrence granularity offered by the form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Frequency {
    #[display(fmt = "Yearly")]
    Yearly,
    #[display(fmt = "Monthly")]
    Monthly,
    #[display(fmt = "Weekly")]
    Weekly,
    #[display(fmt = "Daily")]
    Daily,
    #[display(fmt = "Hourly")]
    Hourly,
}

impl Frequency {
    pub const ALL: [Self; 5] = [
        Self::Yearly,
        Self::Monthly,
        Self::Weekly,
        Self::Daily,
        Self::Hourly,
    ];

    /// Numeric `FREQ` code (YEARLY = 0 ... HOURLY = 4)
    pub const fn code(self) -> u8 {
        match self {
            Self::Yearly => 0,
            Self::Monthly => 1,
            Self::Weekly => 2,
            Self::Daily => 3,
            Self::Hourly => 4,
        }
    }

    /// Maps a `FREQ` code back to a form frequency.
    /// Codes the form cannot show (minutely, secondly) yield `None`.
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Yearly),
            1 => Some(Self::Monthly),
            2 => Some(Self::Weekly),
            3 => Some(Self::Daily),
            4 => Some(Self::Hourly),
            _ => None,
        }
    }

    /// Name used in rule text (`WEEKLY`, ...)
    pub const fn rule_name(self) -> &'static str {
        FREQUENCY_NAMES[self.code() as usize]
    }
}

/// How a yearly or monthly rule picks its day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Mode {
    /// A fixed day of the month
    #[serde(rename = "on")]
    #[display(fmt = "on")]
    On,
    /// The nth weekday (or day class) of the month
    #[serde(rename = "on the")]
    #[display(fmt = "on the")]
    OnThe,
}

/// How the recurrence terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum EndMode {
    #[display(fmt = "Never")]
    Never,
    #[display(fmt = "After")]
    After,
    #[serde(rename = "On date")]
    #[display(fmt = "On date")]
    OnDate,
}

/// Ordinal selector combined with a day label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum Which {
    #[display(fmt = "First")]
    First,
    #[display(fmt = "Second")]
    Second,
    #[display(fmt = "Third")]
    Third,
    #[display(fmt = "Fourth")]
    Fourth,
    #[display(fmt = "Last")]
    Last,
}

impl Which {
    /// `BYSETPOS` value for this ordinal
    pub const fn setpos(self) -> i16 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Fourth => 4,
            Self::Last => -1,
        }
    }

    pub const fn from_setpos(setpos: i16) -> Option<Self> {
        match setpos {
            1 => Some(Self::First),
            2 => Some(Self::Second),
            3 => Some(Self::Third),
            4 => Some(Self::Fourth),
            -1 => Some(Self::Last),
            _ => None,
        }
    }
}

/// Day picked by an "on the" rule: a single weekday or one of three day classes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
pub enum DayLabel {
    #[display(fmt = "Monday")]
    Monday,
    #[display(fmt = "Tuesday")]
    Tuesday,
    #[display(fmt = "Wednesday")]
    Wednesday,
    #[display(fmt = "Thursday")]
    Thursday,
    #[display(fmt = "Friday")]
    Friday,
    #[display(fmt = "Saturday")]
    Saturday,
    #[display(fmt = "Sunday")]
    Sunday,
    /// Any day of the week
    #[display(fmt = "Day")]
    Day,
    /// Monday through Friday
    #[display(fmt = "Weekday")]
    Weekday,
    /// Saturday and Sunday
    #[serde(rename = "Weekend day")]
    #[display(fmt = "Weekend day")]
    WeekendDay,
}

impl DayLabel {
    /// Weekday indices (Monday = 0) this label stands for
    pub const fn weekdays(self) -> &'static [u8] {
        match self {
            Self::Monday => &[0],
            Self::Tuesday => &[1],
            Self::Wednesday => &[2],
            Self::Thursday => &[3],
            Self::Friday => &[4],
            Self::Saturday => &[5],
            Self::Sunday => &[6],
            Self::Day => &[0, 1, 2, 3, 4, 5, 6],
            Self::Weekday => &[0, 1, 2, 3, 4],
            Self::WeekendDay => &[5, 6],
        }
    }

    /// Collapses a weekday set into the label that names it.
    ///
    /// Sets without a label (e.g. Monday and Wednesday) return `None`;
    /// the form has no way to show them.
    pub fn from_weekdays(weekdays: &[u8]) -> Option<Self> {
        let mut sorted = weekdays.to_vec();
        sorted.sort_unstable();
        let key = sorted
            .iter()
            .map(u8::to_string)
            .collect::<Vec<_>>()
            .join(",");

        match key.as_str() {
            "0" => Some(Self::Monday),
            "1" => Some(Self::Tuesday),
            "2" => Some(Self::Wednesday),
            "3" => Some(Self::Thursday),
            "4" => Some(Self::Friday),
            "5" => Some(Self::Saturday),
            "6" => Some(Self::Sunday),
            "0,1,2,3,4,5,6" => Some(Self::Day),
            "0,1,2,3,4" => Some(Self::Weekday),
            "5,6" => Some(Self::WeekendDay),
            _ => None,
        }
    }
}

/// Month of the year as the form names it
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Serialize, Deserialize)]
pub enum MonthName {
    #[display(fmt = "Jan")]
    Jan,
    #[display(fmt = "Feb")]
    Feb,
    #[display(fmt = "Mar")]
    Mar,
    #[display(fmt = "Apr")]
    Apr,
    #[display(fmt = "May")]
    May,
    #[display(fmt = "Jun")]
    Jun,
    #[display(fmt = "Jul")]
    Jul,
    #[display(fmt = "Aug")]
    Aug,
    #[display(fmt = "Sep")]
    Sep,
    #[display(fmt = "Oct")]
    Oct,
    #[display(fmt = "Nov")]
    Nov,
    #[display(fmt = "Dec")]
    Dec,
}

impl MonthName {
    const ALL: [Self; 12] = [
        Self::Jan,
        Self::Feb,
        Self::Mar,
        Self::Apr,
        Self::May,
        Self::Jun,
        Self::Jul,
        Self::Aug,
        Self::Sep,
        Self::Oct,
        Self::Nov,
        Self::Dec,
    ];

    /// Month number, January = 1
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }

    pub fn from_number(number: u8) -> Option<Self> {
        Self::ALL.get(usize::from(number.checked_sub(1)?)).copied()
    }

    pub const fn abbreviation(self) -> &'static str {
        MONTHS[self as usize]
    }
}

/// Day of the week, Monday = 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Weekday(u8);

impl Weekday {
    pub const SUNDAY: Self = Self(6);

    /// Creates a weekday from its index, Monday = 0 ... Sunday = 6
    pub const fn new(index: u8) -> Option<Self> {
        if index < 7 { Some(Self(index)) } else { None }
    }

    #[inline]
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Two-letter code (`MO`, `TU`, ...)
    pub const fn code(self) -> &'static str {
        WEEKDAY_CODES[self.0 as usize]
    }

    pub fn from_code(code: &str) -> Option<Self> {
        WEEKDAY_CODES
            .iter()
            .position(|c| c.eq_ignore_ascii_case(code))
            .and_then(|index| u8::try_from(index).ok())
            .map(Self)
    }
}

impl TryFrom<u8> for Weekday {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("Invalid weekday index: {value} (must be 0-6)"))
    }
}

impl From<Weekday> for u8 {
    fn from(weekday: Weekday) -> Self {
        weekday.0
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
