//! Rule text to form state.
//!
//! Every field is derived on its own: when the rule does not speak to a field
//! (another frequency, or the attribute is absent or has no form equivalent),
//! the field keeps its previous value.

use chrono::{DateTime, Utc};

use crate::consts::{DATE_TIME_FORMAT, SUNDAY_WKST};
use crate::options::RuleOptions;
use crate::state::{FormError, FormState, WeekDays};
use crate::types::{DayLabel, EndMode, Frequency, Mode, MonthName, Which};

/// Returns `extract()` when `applies` holds and the extractor yields a value,
/// `previous` otherwise.
pub fn derive_field<T>(applies: bool, extract: impl FnOnce() -> Option<T>, previous: T) -> T {
    if applies {
        extract().unwrap_or(previous)
    } else {
        previous
    }
}

/// Applies rule text to `current`.
///
/// Empty text leaves the state as it is. Text that does not parse is recorded
/// in `error` and every other field is kept.
pub fn decode(current: &FormState, text: &str) -> FormState {
    if text.is_empty() {
        return current.clone();
    }

    match text.parse::<RuleOptions>() {
        Ok(rule) => decode_options(current, &rule),
        Err(err) => {
            tracing::debug!("Keeping previous form state, rule did not parse: {}", err);
            FormState {
                error: Some(FormError {
                    value: text.to_owned(),
                    message: err.to_string(),
                }),
                ..current.clone()
            }
        }
    }
}

fn decode_options(current: &FormState, rule: &RuleOptions) -> FormState {
    let is = |frequency: Frequency| rule.freq == Some(frequency.code());
    let weekdays = rule.weekday_indices();
    let has_monthday = !rule.bymonthday.is_empty();
    let has_weekday = !weekdays.is_empty();

    // Only WKST=SU is read; any other week start keeps the previous setting
    let week_starts_on_sunday = derive_field(
        rule.wkst.is_some(),
        || {
            rule.wkst
                .filter(|wkst| wkst.index() == SUNDAY_WKST)
                .map(|_| true)
        },
        current.options.week_starts_on_sunday,
    );

    let mut next = current.clone();
    next.error = None;
    next.options.week_starts_on_sunday = week_starts_on_sunday;

    // start
    next.start.on_date.date = derive_field(
        rule.dtstart.is_some(),
        || rule.dtstart.map(format_date),
        current.start.on_date.date.clone(),
    );
    next.start.on_date.options.week_starts_on_sunday = week_starts_on_sunday;

    // repeat
    let repeat = &current.repeat;
    next.repeat.frequency = derive_field(
        true,
        || rule.freq.and_then(Frequency::from_code),
        repeat.frequency,
    );

    let yearly = &mut next.repeat.yearly;
    let in_yearly = is(Frequency::Yearly);
    yearly.mode = derive_field(
        in_yearly && !rule.bymonth.is_empty(),
        || Some(if has_monthday { Mode::On } else { Mode::OnThe }),
        repeat.yearly.mode,
    );
    yearly.on.month = derive_field(
        in_yearly && has_monthday,
        || first_month(rule),
        repeat.yearly.on.month,
    );
    yearly.on.day = derive_field(
        in_yearly && has_monthday,
        || first_monthday(rule),
        repeat.yearly.on.day,
    );
    yearly.on_the.month = derive_field(
        in_yearly && has_weekday,
        || first_month(rule),
        repeat.yearly.on_the.month,
    );
    yearly.on_the.day = derive_field(
        in_yearly && has_weekday,
        || DayLabel::from_weekdays(&weekdays),
        repeat.yearly.on_the.day,
    );
    yearly.on_the.which = derive_field(
        in_yearly && has_weekday,
        || first_which(rule),
        repeat.yearly.on_the.which,
    );

    let monthly = &mut next.repeat.monthly;
    let in_monthly = is(Frequency::Monthly);
    monthly.mode = derive_field(
        in_monthly,
        || Some(if has_monthday { Mode::On } else { Mode::OnThe }),
        repeat.monthly.mode,
    );
    monthly.interval = derive_field(in_monthly, || interval(rule), repeat.monthly.interval);
    monthly.on.day = derive_field(
        in_monthly && has_monthday,
        || first_monthday(rule),
        repeat.monthly.on.day,
    );
    monthly.on_the.day = derive_field(
        in_monthly && has_weekday,
        || DayLabel::from_weekdays(&weekdays),
        repeat.monthly.on_the.day,
    );
    monthly.on_the.which = derive_field(
        in_monthly && !rule.bysetpos.is_empty(),
        || first_which(rule),
        repeat.monthly.on_the.which,
    );

    let weekly = &mut next.repeat.weekly;
    let in_weekly = is(Frequency::Weekly);
    weekly.interval = derive_field(in_weekly, || interval(rule), repeat.weekly.interval);
    weekly.days = derive_field(
        in_weekly,
        || Some(WeekDays::from_indices(&weekdays)),
        repeat.weekly.days,
    );
    weekly.options.week_starts_on_sunday = week_starts_on_sunday;

    next.repeat.daily.interval = derive_field(
        is(Frequency::Daily),
        || interval(rule),
        repeat.daily.interval,
    );
    next.repeat.hourly.interval = derive_field(
        is(Frequency::Hourly),
        || interval(rule),
        repeat.hourly.interval,
    );

    // end
    next.end.mode = if rule.count.is_some() {
        EndMode::After
    } else if rule.until.is_some() {
        EndMode::OnDate
    } else {
        EndMode::Never
    };
    next.end.after = derive_field(rule.count.is_some(), || rule.count, current.end.after);
    next.end.on_date.date = derive_field(
        rule.until.is_some(),
        || rule.until.map(format_date),
        current.end.on_date.date.clone(),
    );
    next.end.on_date.options.week_starts_on_sunday = week_starts_on_sunday;

    next
}

fn format_date(date: DateTime<Utc>) -> String {
    date.format(DATE_TIME_FORMAT).to_string()
}

fn interval(rule: &RuleOptions) -> Option<u16> {
    rule.interval.and_then(|value| u16::try_from(value).ok())
}

fn first_month(rule: &RuleOptions) -> Option<MonthName> {
    rule.bymonth.first().copied().and_then(MonthName::from_number)
}

/// Negative days (counted from the month's end) have no form equivalent
fn first_monthday(rule: &RuleOptions) -> Option<u8> {
    rule.bymonthday
        .first()
        .and_then(|day| u8::try_from(*day).ok())
}

fn first_which(rule: &RuleOptions) -> Option<Which> {
    rule.bysetpos.first().copied().and_then(Which::from_setpos)
}
