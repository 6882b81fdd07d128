//! Form state to rule text.
//!
//! Only the selected `repeat` branch and the selected end mode reach the rule;
//! everything else in the state is ignored here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};

use crate::consts::{ACCEPTED_DATE_TIME_FORMATS, DATE_FORMAT};
use crate::options::{RuleError, RuleOptions, WeekdaySpec};
use crate::state::{
    EndState, FormOptions, FormState, MonthlyState, RepeatState, StartState, WeeklyState,
    YearlyState,
};
use crate::types::{DayLabel, EndMode, Frequency, Mode, Weekday, Which};

/// Serializes `state` into rule text.
///
/// # Errors
/// Returns `RuleError` when the selected fields do not form a valid rule
/// (a zero interval, a day of month past 31, an end date that is not a date).
pub fn encode(state: &FormState) -> Result<String, RuleError> {
    let options = compute_options(state)?;
    let text = options.to_rule_string()?;
    tracing::trace!("Encoded {} rule: {}", state.repeat.frequency, text);
    Ok(text)
}

fn compute_options(state: &FormState) -> Result<RuleOptions, RuleError> {
    let mut options = RuleOptions {
        dtstart: Some(compute_start(&state.start)),
        ..RuleOptions::default()
    };
    compute_repeat(&state.repeat, &mut options)?;
    compute_end(&state.end, &mut options)?;
    compute_global(state.options, &mut options);
    Ok(options)
}

fn compute_start(start: &StartState) -> DateTime<Utc> {
    parse_form_date(&start.on_date.date).unwrap_or_else(|| Utc::now().trunc_subsecs(0))
}

fn compute_repeat(repeat: &RepeatState, options: &mut RuleOptions) -> Result<(), RuleError> {
    options.freq = Some(repeat.frequency.code());

    match repeat.frequency {
        Frequency::Yearly => compute_yearly(&repeat.yearly, options)?,
        Frequency::Monthly => compute_monthly(&repeat.monthly, options)?,
        Frequency::Weekly => compute_weekly(&repeat.weekly, options),
        Frequency::Daily => options.interval = Some(u32::from(repeat.daily.interval)),
        Frequency::Hourly => options.interval = Some(u32::from(repeat.hourly.interval)),
    }
    Ok(())
}

fn compute_yearly(yearly: &YearlyState, options: &mut RuleOptions) -> Result<(), RuleError> {
    match yearly.mode {
        Mode::On => {
            options.bymonth = vec![yearly.on.month.number()];
            options.bymonthday = vec![month_day(yearly.on.day)?];
        }
        Mode::OnThe => {
            compute_on_the(yearly.on_the.which, yearly.on_the.day, options);
            options.bymonth = vec![yearly.on_the.month.number()];
        }
    }
    Ok(())
}

fn compute_monthly(monthly: &MonthlyState, options: &mut RuleOptions) -> Result<(), RuleError> {
    options.interval = Some(u32::from(monthly.interval));
    match monthly.mode {
        Mode::On => options.bymonthday = vec![month_day(monthly.on.day)?],
        Mode::OnThe => compute_on_the(monthly.on_the.which, monthly.on_the.day, options),
    }
    Ok(())
}

fn compute_on_the(which: Which, day: DayLabel, options: &mut RuleOptions) {
    options.bysetpos = vec![which.setpos()];
    options.byweekday = weekday_specs(day.weekdays());
}

fn compute_weekly(weekly: &WeeklyState, options: &mut RuleOptions) {
    options.interval = Some(u32::from(weekly.interval));
    options.byweekday = weekday_specs(&weekly.days.indices());
}

fn compute_end(end: &EndState, options: &mut RuleOptions) -> Result<(), RuleError> {
    match end.mode {
        EndMode::Never => {}
        EndMode::After => options.count = Some(end.after),
        EndMode::OnDate => {
            let until = parse_form_date(&end.on_date.date)
                .ok_or_else(|| RuleError::InvalidDateTime(end.on_date.date.clone()))?;
            options.until = Some(until);
        }
    }
    Ok(())
}

fn compute_global(form: FormOptions, options: &mut RuleOptions) {
    if form.hide_start {
        options.dtstart = None;
    }
    if form.week_starts_on_sunday {
        options.wkst = Some(Weekday::SUNDAY);
    }
}

fn month_day(day: u8) -> Result<i8, RuleError> {
    i8::try_from(day).map_err(|_| RuleError::OutOfRange {
        key: "BYMONTHDAY",
        value: i64::from(day),
    })
}

fn weekday_specs(indices: &[u8]) -> Vec<WeekdaySpec> {
    indices
        .iter()
        .filter_map(|index| Weekday::new(*index))
        .map(WeekdaySpec::new)
        .collect()
}

/// Reads a form date: RFC 3339, `YYYY-MM-DD HH:MM`, `YYYY-MM-DDTHH:MM:SS`,
/// or a bare `YYYY-MM-DD`. Zone-less values are taken as UTC.
pub(crate) fn parse_form_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ACCEPTED_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .map(|dt| dt.and_utc())
}
