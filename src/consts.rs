/// Smallest value accepted by an interval field
pub const MIN_INTERVAL: u16 = 1;

/// Exclusive upper limit for interval fields (three digits at most)
pub const INTERVAL_LIMIT: u16 = 1000;

/// Prefix of generated form identifiers
pub const RRULE_ID_PREFIX: &str = "rrule-";

/// Format used for the dates held in form state
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Additional formats accepted when reading a form date
pub const ACCEPTED_DATE_TIME_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Date-only format accepted when reading a form date
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// UTC timestamp format of `DTSTART` and `UNTIL`
pub const RRULE_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Floating (zone-less) timestamp format of `DTSTART` and `UNTIL`
pub const RRULE_FLOATING_FORMAT: &str = "%Y%m%dT%H%M%S";

/// Date-only value format of `DTSTART` and `UNTIL`
pub const RRULE_DATE_FORMAT: &str = "%Y%m%d";

/// Prefix of the rule line
pub const RRULE_PREFIX: &str = "RRULE:";

/// Prefix of the start line
pub const DTSTART_PREFIX: &str = "DTSTART";

/// Separator between rule parts
pub const PART_SEPARATOR: char = ';';

/// Separator between list values inside a rule part
pub const LIST_SEPARATOR: char = ',';

/// Month abbreviations used by the form, January first
pub const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Two-letter weekday codes, Monday first (index is the weekday number)
pub const WEEKDAY_CODES: [&str; 7] = ["MO", "TU", "WE", "TH", "FR", "SA", "SU"];

/// Frequency names in code order (`FREQ` code is the index)
pub const FREQUENCY_NAMES: [&str; 7] = [
    "YEARLY", "MONTHLY", "WEEKLY", "DAILY", "HOURLY", "MINUTELY", "SECONDLY",
];

/// Week-start index that marks a week beginning on Sunday
pub const SUNDAY_WKST: u8 = 6;

/// Largest `BYSETPOS` magnitude
pub const MAX_SETPOS: i16 = 366;

/// Largest `BYMONTHDAY` magnitude
pub const MAX_MONTHDAY: i8 = 31;

/// Largest ordinal attached to a `BYDAY` entry
pub const MAX_WEEKDAY_ORDINAL: i8 = 53;
